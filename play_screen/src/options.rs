use clap::{Args, Parser, Subcommand};
use play_screen::Screen;
use std::path::PathBuf;

/// Play media on up to four screens and control each player
#[derive(Parser)]
#[command(name = "play_screen")]
#[command(version)]
#[command(after_help = "Examples:\n  \
    play_screen play https://youtube.com/watch?v=... --screen 2\n  \
    play_screen volume 50 --screen 1\n  \
    play_screen seek -30 --relative\n  \
    play_screen info --screen 2")]
#[command(arg_required_else_help = true)]
pub struct Options {
    #[command(subcommand)]
    pub command: Command,

    /// Runtime configuration file (YAML).
    #[arg(long, short = 'c', value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output (INFO level logging).
    /// Use RUST_LOG env var for debug-level logging.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Play a URL or file, replacing whatever plays on the screen
    Play(PlayArgs),
    /// Pause playback
    Pause(ScreenArgs),
    /// Resume playback
    Resume(ScreenArgs),
    /// Toggle play/pause
    #[command(alias = "playpause")]
    Toggle(ScreenArgs),
    /// Stop the player
    #[command(alias = "quit")]
    Stop(ScreenArgs),
    /// Next item in the playlist
    Next(ScreenArgs),
    /// Previous item in the playlist
    #[command(alias = "previous")]
    Prev(ScreenArgs),
    /// Toggle fullscreen
    #[command(alias = "fs")]
    Fullscreen(ScreenArgs),
    /// Set the volume (clamped to 0-100)
    #[command(alias = "vol")]
    Volume(VolumeArgs),
    /// Seek to a position in seconds
    Seek(SeekArgs),
    /// Read a single player property
    Get(GetArgs),
    /// Show playback information as JSON
    #[command(alias = "status")]
    Info(ScreenArgs),
    /// List screens whose player answers, as JSON
    #[command(alias = "ls")]
    List,
}

#[derive(Args, Clone, Copy)]
pub struct ScreenArgs {
    /// Target screen (1-4)
    #[arg(long, short = 's', default_value = "1")]
    pub screen: Screen,
}

#[derive(Args)]
pub struct PlayArgs {
    /// URL or path to play; several words are joined with spaces
    #[arg(required = true)]
    pub source: Vec<String>,

    /// Print the player command line instead of starting it
    #[arg(long)]
    pub print_shell: bool,

    #[command(flatten)]
    pub target: ScreenArgs,
}

#[derive(Args)]
pub struct VolumeArgs {
    /// Volume level
    #[arg(allow_negative_numbers = true)]
    pub volume: i64,

    #[command(flatten)]
    pub target: ScreenArgs,
}

#[derive(Args)]
pub struct SeekArgs {
    /// Position, or offset with --relative, in seconds
    #[arg(allow_negative_numbers = true)]
    pub seconds: f64,

    /// Seek relative to the current position
    #[arg(long, short = 'r')]
    pub relative: bool,

    #[command(flatten)]
    pub target: ScreenArgs,
}

#[derive(Args)]
pub struct GetArgs {
    /// Property name, e.g. time-pos
    pub property: String,

    #[command(flatten)]
    pub target: ScreenArgs,
}
