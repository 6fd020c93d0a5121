//! One-shot request/response exchanges over a player's control socket
//!
//! Every call dials a fresh connection, writes a single request line, reads a
//! single response line and closes. Nothing is pooled, so responses never need
//! correlation identifiers.

use super::{
    error::ChannelError,
    protocol::{Request, Response},
};
use serde_json::Value;
use std::{path::Path, time::Duration};
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::UnixStream,
};
use tracing::trace;

/// Upper bound on the bytes read while waiting for a response line
pub const MAX_RESPONSE_BYTES: usize = 64 * 1024;

/// Send `request` to the socket at `socket_path` and decode the reply.
///
/// `timeout` bounds the whole exchange: dial, write and read.
pub async fn send(
    socket_path: &Path,
    request: &Request,
    timeout: Duration,
) -> Result<Response, ChannelError> {
    match tokio::time::timeout(timeout, exchange(socket_path, request)).await {
        Ok(result) => result,
        Err(_) => Err(ChannelError::Timeout {
            path: socket_path.to_path_buf(),
            timeout,
        }),
    }
}

/// Check that the socket file exists and accepts a connection within `timeout`.
pub async fn probe(socket_path: &Path, timeout: Duration) -> bool {
    if tokio::fs::metadata(socket_path).await.is_err() {
        return false;
    }

    matches!(
        tokio::time::timeout(timeout, UnixStream::connect(socket_path)).await,
        Ok(Ok(_))
    )
}

async fn exchange(socket_path: &Path, request: &Request) -> Result<Response, ChannelError> {
    let mut payload = serde_json::to_vec(request).map_err(ChannelError::Encode)?;
    payload.push(b'\n');

    let mut stream =
        UnixStream::connect(socket_path)
            .await
            .map_err(|source| ChannelError::Connect {
                path: socket_path.to_path_buf(),
                source,
            })?;
    let (reader, mut writer) = stream.split();

    writer
        .write_all(&payload)
        .await
        .map_err(ChannelError::Write)?;
    writer.flush().await.map_err(ChannelError::Write)?;

    let mut reader = BufReader::new(reader).take(MAX_RESPONSE_BYTES as u64);
    let mut line = String::new();

    loop {
        line.clear();
        let count = reader
            .read_line(&mut line)
            .await
            .map_err(ChannelError::Read)?;

        if count == 0 || !line.ends_with('\n') {
            if reader.limit() == 0 {
                return Err(ChannelError::TooLarge {
                    limit: MAX_RESPONSE_BYTES,
                });
            }
            if count == 0 {
                return Err(ChannelError::Closed);
            }
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let value: Value = serde_json::from_str(trimmed).map_err(ChannelError::Decode)?;

        // The player broadcasts events to every client, including fresh ones.
        if value.get("event").is_some() {
            trace!("skipping event line on {}: {trimmed}", socket_path.display());
            continue;
        }

        return serde_json::from_value(value).map_err(ChannelError::Decode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::protocol::Command;
    use serde_json::json;
    use tokio::{
        io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
        net::UnixListener,
    };

    /// Accept one connection, hand back the request line, and write `reply` verbatim.
    fn serve_once(listener: UnixListener, reply: &'static str) -> tokio::task::JoinHandle<String> {
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let (reader, mut writer) = stream.split();
            let mut line = String::new();
            BufReader::new(reader).read_line(&mut line).await.unwrap();
            writer.write_all(reply.as_bytes()).await.unwrap();
            line
        })
    }

    #[tokio::test]
    async fn test_send_writes_one_line_and_decodes_reply() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sock");
        let listener = UnixListener::bind(&path).unwrap();
        let server = serve_once(listener, "{\"data\":80.0,\"error\":\"success\"}\n");

        let request = Command::get_property("volume").to_request();
        let response = send(&path, &request, Duration::from_secs(2)).await.unwrap();

        assert!(response.is_success());
        assert_eq!(response.data, Some(json!(80.0)));

        let line = server.await.unwrap();
        assert_eq!(line, "{\"command\":[\"get_property\",\"volume\"]}\n");
    }

    #[tokio::test]
    async fn test_send_skips_event_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sock");
        let listener = UnixListener::bind(&path).unwrap();
        let _server = serve_once(
            listener,
            "{\"event\":\"playback-restart\"}\n{\"data\":true,\"error\":\"success\"}\n",
        );

        let request = Command::get_property("pause").to_request();
        let response = send(&path, &request, Duration::from_secs(2)).await.unwrap();
        assert_eq!(response.data, Some(json!(true)));
    }

    #[tokio::test]
    async fn test_send_reports_closed_connection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sock");
        let listener = UnixListener::bind(&path).unwrap();
        let _server = serve_once(listener, "");

        let err = send(&path, &Command::Quit.to_request(), Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Closed), "{err:?}");
    }

    #[tokio::test]
    async fn test_send_rejects_oversized_reply() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sock");
        let listener = UnixListener::bind(&path).unwrap();
        let _server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let (reader, mut writer) = stream.split();
            let mut line = String::new();
            BufReader::new(reader).read_line(&mut line).await.unwrap();
            // No newline anywhere in the reply.
            let _ = writer.write_all(&vec![b'a'; MAX_RESPONSE_BYTES + 16]).await;
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let err = send(
            &path,
            &Command::get_property("playlist").to_request(),
            Duration::from_secs(2),
        )
        .await
        .unwrap_err();
        match err {
            ChannelError::TooLarge { limit } => assert_eq!(limit, MAX_RESPONSE_BYTES),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_times_out_on_silent_peer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sock");
        let listener = UnixListener::bind(&path).unwrap();
        let _server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(stream);
        });

        let err = send(
            &path,
            &Command::TogglePause.to_request(),
            Duration::from_millis(200),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ChannelError::Timeout { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_send_to_missing_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent");

        let err = send(&path, &Command::Quit.to_request(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Connect { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_probe() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sock");
        assert!(!probe(&path, Duration::from_millis(100)).await);

        let _listener = UnixListener::bind(&path).unwrap();
        assert!(probe(&path, Duration::from_millis(100)).await);
    }
}
