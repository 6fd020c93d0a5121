//! Stand-in player for play_screen
//!
//! Understands the command line play_screen gives to mpv, binds the
//! `--input-ipc-server` socket and answers newline-delimited JSON commands
//! from a property table. It exits on "quit". Used by the integration tests
//! and for dry runs on machines without mpv.
//!
//! Extra flags:
//!   --mock-startup-delay-ms=N   wait N ms before binding the socket
//!   --mock-fail-property=NAME   answer get_property NAME with an error
//!   --mock-ignore-quit          keep running after "quit"

use eyre::{Context, Result};
use play_screen::ipc::{Request, Response};
use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{UnixListener, UnixStream},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod state;

use state::{MockPlayer, Outcome};

#[derive(Debug, Default)]
struct MockConfig {
    socket_path: Option<PathBuf>,
    profile: Option<String>,
    volume: f64,
    source: Option<String>,
    startup_delay: Duration,
    fail_property: Option<String>,
    ignore_quit: bool,
}

impl MockConfig {
    fn from_args() -> Result<Self> {
        let mut config = MockConfig {
            volume: 100.0,
            ..MockConfig::default()
        };
        let mut args = std::env::args().skip(1);

        while let Some(arg) = args.next() {
            if arg == "--" {
                config.source = args.next();
                break;
            }

            let (key, value) = match arg.split_once('=') {
                Some((key, value)) => (key, Some(value)),
                None => (arg.as_str(), None),
            };

            match (key, value) {
                ("--input-ipc-server", Some(path)) => config.socket_path = Some(path.into()),
                ("--profile", Some(profile)) => config.profile = Some(profile.to_string()),
                ("--volume", Some(volume)) => {
                    config.volume = volume.parse().wrap_err("Failed to parse --volume")?;
                }
                ("--mock-startup-delay-ms", Some(ms)) => {
                    let ms: u64 = ms
                        .parse()
                        .wrap_err("Failed to parse --mock-startup-delay-ms")?;
                    config.startup_delay = Duration::from_millis(ms);
                }
                ("--mock-fail-property", Some(name)) => {
                    config.fail_property = Some(name.to_string());
                }
                ("--mock-ignore-quit", None) => config.ignore_quit = true,
                (key, _) if key.starts_with("--") => debug!("ignoring option {arg}"),
                _ => config.source = Some(arg.clone()),
            }
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = MockConfig::from_args().wrap_err("Failed to parse arguments")?;
    let Some(socket_path) = config.socket_path.clone() else {
        eyre::bail!("Usage: play_screen_mock_player --input-ipc-server=<path> [options] -- <source>");
    };
    let source = config.source.clone().unwrap_or_default();

    if !config.startup_delay.is_zero() {
        tokio::time::sleep(config.startup_delay).await;
    }

    // A killed predecessor leaves its socket file behind.
    if socket_path.exists() {
        std::fs::remove_file(&socket_path)
            .wrap_err_with(|| format!("unable to remove {}", socket_path.display()))?;
    }
    let listener = UnixListener::bind(&socket_path)
        .wrap_err_with(|| format!("unable to bind {}", socket_path.display()))?;

    info!(
        "serving {source:?} on {} (profile {:?})",
        socket_path.display(),
        config.profile
    );

    let player = Arc::new(Mutex::new(MockPlayer::new(
        &source,
        config.volume,
        config.fail_property,
        config.ignore_quit,
    )));
    let quit = CancellationToken::new();

    loop {
        tokio::select! {
            _ = quit.cancelled() => break,
            accepted = listener.accept() => {
                let (stream, _) = accepted.wrap_err("accept failed")?;
                let player = player.clone();
                let quit = quit.clone();
                tokio::spawn(async move {
                    if let Err(err) = serve_client(stream, player, quit).await {
                        warn!("client error: {err:#}");
                    }
                });
            }
        }
    }

    let _ = std::fs::remove_file(&socket_path);
    info!("quit");
    Ok(())
}

async fn serve_client(
    mut stream: UnixStream,
    player: Arc<Mutex<MockPlayer>>,
    quit: CancellationToken,
) -> Result<()> {
    let (reader, mut writer) = stream.split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let (response, outcome) = match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                let mut player = player.lock().unwrap_or_else(|err| err.into_inner());
                player.handle(&request)
            }
            Err(err) => {
                debug!("malformed request {line:?}: {err}");
                (Response::failure("invalid parameter"), Outcome::Continue)
            }
        };

        let mut payload = serde_json::to_vec(&response)?;
        payload.push(b'\n');
        writer.write_all(&payload).await?;
        writer.flush().await?;

        if let Outcome::Quit = outcome {
            quit.cancel();
            break;
        }
    }

    Ok(())
}
