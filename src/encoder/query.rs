//! TCP query port: one short-lived connection per request, line
//! protocol `GET\n` -> `<angle>\n`.

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::RwLock;

/// Serves `GET\n` -> `<angle>\n` on `port`, reading the latest angle
/// from `latest_angle`. Bind failure is logged and swallowed — the
/// daemon continues in file-only mode.
pub async fn serve(port: u16, latest_angle: Arc<RwLock<f64>>) {
    let listener = match TcpListener::bind(("0.0.0.0", port)).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::warn!(port, error = %e, "TCP query port bind failed, continuing file-only");
            return;
        }
    };

    loop {
        let (socket, _addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(error = %e, "TCP accept failed");
                continue;
            }
        };
        let latest_angle = latest_angle.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, latest_angle).await {
                tracing::debug!(error = %e, "TCP query connection ended with error");
            }
        });
    }
}

async fn handle_connection(
    socket: tokio::net::TcpStream,
    latest_angle: Arc<RwLock<f64>>,
) -> std::io::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut lines = BufReader::new(reader).lines();
    if let Some(line) = lines.next_line().await? {
        let response = if line.trim() == "GET" {
            format!("{}\n", *latest_angle.read().await)
        } else {
            "OK\n".to_string()
        };
        writer.write_all(response.as_bytes()).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt as _};
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn get_returns_the_latest_angle() {
        let latest_angle = Arc::new(RwLock::new(123.5));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let (socket, _) = listener.accept().await.unwrap();
                let latest = latest_angle.clone();
                tokio::spawn(handle_connection(socket, latest));
            }
        });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"GET\n").await.unwrap();
        let mut buf = [0u8; 64];
        let n = stream.read(&mut buf).await.unwrap();
        let response = String::from_utf8_lossy(&buf[..n]);
        assert_eq!(response.trim(), "123.5");
    }
}
