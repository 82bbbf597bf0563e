use log::{debug, info};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::utils::{P2PError, Result};

pub struct Transport;

impl Transport {
    pub async fn connect(addr: &str) -> Result<TcpStream> {
        let stream = TcpStream::connect(addr).await.map_err(|e| {
            P2PError::ConnectionFailed(format!("Failed to connect to {}: {}", addr, e))
        })?;

        debug!("Connected to {}", addr);
        Ok(stream)
    }

    pub async fn listen(port: u16) -> Result<TcpListener> {
        Self::listen_on(&format!("0.0.0.0:{}", port)).await
    }

    pub async fn listen_on(addr: &str) -> Result<TcpListener> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| P2PError::NetworkError(format!("Failed to bind to {}: {}", addr, e)))?;

        info!("Listening on {}", listener.local_addr()?);
        Ok(listener)
    }

    /// Reads a single request: up to the first newline, end of stream, or `max_size` bytes.
    pub async fn read_request(stream: &mut TcpStream, max_size: usize) -> Result<String> {
        let mut reader = BufReader::new(stream.take(max_size as u64));
        let mut buf = Vec::new();
        reader
            .read_until(b'\n', &mut buf)
            .await
            .map_err(|e| P2PError::NetworkError(format!("Failed to read request: {}", e)))?;

        if buf.is_empty() {
            return Err(P2PError::NetworkError(
                "Connection closed before a request arrived".to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Reads a single newline-terminated response line.
    pub async fn read_line(stream: &mut TcpStream) -> Result<String> {
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        let n = reader
            .read_line(&mut line)
            .await
            .map_err(|e| P2PError::NetworkError(format!("Failed to read response: {}", e)))?;

        if n == 0 {
            return Err(P2PError::InvalidResponse(
                "Connection closed without a response".to_string(),
            ));
        }
        Ok(line)
    }

    pub async fn send_line(stream: &mut TcpStream, line: &str) -> Result<()> {
        stream
            .write_all(line.as_bytes())
            .await
            .map_err(|e| P2PError::NetworkError(format!("Failed to write: {}", e)))?;
        stream.flush().await?;
        Ok(())
    }
}
