mod options;

use crate::options::{Command, Options, ScreenArgs};
use clap::Parser;
use eyre::Context;
use play_screen::{load_config, Config, PlayerSupervisor, Screen};
use serde::Serialize;
use std::{
    io::{self, prelude::*},
    path::PathBuf,
};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::debug;

fn main() -> eyre::Result<()> {
    let opts = Options::parse();

    // RUST_LOG takes precedence over --verbose.
    let default_level = if opts.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    let config = load_config(opts.config.as_deref())?;

    if let Command::Play(args) = &opts.command {
        if args.print_shell {
            return print_shell(&config, args.target.screen, &args.source.join(" "));
        }
    }

    Runtime::new()?.block_on(run(opts.command, config))?;

    Ok(())
}

/// Print the player command line for a source without starting it.
fn print_shell(config: &Config, screen: Screen, source: &str) -> eyre::Result<()> {
    let cmdline = play_screen::process::PlayerCommandLine::new(config, screen, source);
    let mut stdout = io::stdout();
    writeln!(stdout, "#!/bin/sh")?;
    stdout.write_all(&cmdline.to_shell())?;
    stdout.write_all(b"\n")?;
    Ok(())
}

async fn run(command: Command, config: Config) -> eyre::Result<()> {
    let supervisor = PlayerSupervisor::new(config);

    match command {
        Command::Play(args) => {
            let source = args.source.join(" ");
            let screen = args.target.screen;

            let cancel = CancellationToken::new();
            let ctrl_c = {
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        cancel.cancel();
                    }
                })
            };
            let result = supervisor.play(&cancel, &source, screen).await;
            ctrl_c.abort();

            let instance = result.wrap_err_with(|| format!("play failed on {screen}"))?;
            println!(
                "Playing on screen {} (PID {}): {}",
                screen.number(),
                instance.pid,
                instance.source
            );
        }
        Command::Pause(ScreenArgs { screen }) => {
            supervisor.pause(screen).await.wrap_err("pause failed")?;
            println!("Paused screen {}", screen.number());
        }
        Command::Resume(ScreenArgs { screen }) => {
            supervisor.resume(screen).await.wrap_err("resume failed")?;
            println!("Resumed screen {}", screen.number());
        }
        Command::Toggle(ScreenArgs { screen }) => {
            supervisor
                .play_pause(screen)
                .await
                .wrap_err("toggle failed")?;
            println!("Toggled play/pause on screen {}", screen.number());
        }
        Command::Stop(ScreenArgs { screen }) => {
            // Players started by an earlier invocation are not registered here.
            match supervisor.stop(screen).await? {
                Some(stopped) => debug!("stopped: {:?}", stopped.shutdown),
                None => supervisor.quit(screen).await.wrap_err("stop failed")?,
            }
            println!("Stopped screen {}", screen.number());
        }
        Command::Next(ScreenArgs { screen }) => {
            supervisor.next(screen).await.wrap_err("next failed")?;
            println!("Next on screen {}", screen.number());
        }
        Command::Prev(ScreenArgs { screen }) => {
            supervisor.prev(screen).await.wrap_err("prev failed")?;
            println!("Previous on screen {}", screen.number());
        }
        Command::Fullscreen(ScreenArgs { screen }) => {
            supervisor
                .fullscreen(screen)
                .await
                .wrap_err("fullscreen failed")?;
            println!("Toggled fullscreen on screen {}", screen.number());
        }
        Command::Volume(args) => {
            let screen = args.target.screen;
            supervisor
                .set_volume(screen, args.volume)
                .await
                .wrap_err("volume failed")?;
            println!(
                "Volume set to {} on screen {}",
                args.volume.clamp(0, 100),
                screen.number()
            );
        }
        Command::Seek(args) => {
            let screen = args.target.screen;
            supervisor
                .seek(screen, args.seconds, args.relative)
                .await
                .wrap_err("seek failed")?;
            let mode = if args.relative { "by" } else { "to" };
            println!("Seeked {mode} {}s on screen {}", args.seconds, screen.number());
        }
        Command::Get(args) => {
            let value = supervisor
                .get_property(args.target.screen, &args.property)
                .await
                .wrap_err_with(|| format!("unable to read {}", args.property))?;
            print_json(&value)?;
        }
        Command::Info(ScreenArgs { screen }) => {
            print_json(&supervisor.playback_info(screen).await)?;
        }
        Command::List => {
            print_json(&list_screens(&supervisor).await)?;
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct ScreenEntry {
    screen: Screen,
    socket_path: PathBuf,
    pid: Option<u64>,
    source: Option<String>,
}

/// Screens whose control socket answers, whether or not this process started the player.
async fn list_screens(supervisor: &PlayerSupervisor) -> Vec<ScreenEntry> {
    let mut entries = vec![];

    for screen in Screen::all() {
        let Ok(source) = supervisor.get_property(screen, "path").await else {
            continue;
        };
        let pid = supervisor
            .get_property(screen, "pid")
            .await
            .ok()
            .and_then(|pid| pid.as_u64());

        entries.push(ScreenEntry {
            screen,
            socket_path: supervisor.config().socket_path(screen),
            pid,
            source: source.as_str().map(str::to_owned),
        });
    }

    entries
}

fn print_json<T: Serialize>(value: &T) -> eyre::Result<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
