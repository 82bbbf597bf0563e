use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{Duration, sleep};

use crate::core::protocol::{MAX_REQUEST_SIZE, TRANSFER_NOT_FOUND, TransferRequest};
use crate::network::Transport;
use crate::storage::FileManager;
use crate::utils::{P2PError, Result};

/// Answers `send:<name>` with the raw bytes of `<name>.txt`, then closes the connection.
pub struct Uploader {
    file_manager: Arc<FileManager>,
}

impl Uploader {
    pub fn new(file_manager: Arc<FileManager>) -> Self {
        Self { file_manager }
    }

    pub async fn serve(self: Arc<Self>, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("Transfer connection from: {}", addr);
                    let uploader = self.clone();

                    tokio::spawn(async move {
                        if let Err(e) = uploader.handle_connection(stream, addr).await {
                            warn!("Transfer to {} failed: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    pub async fn handle_connection(&self, mut stream: TcpStream, addr: SocketAddr) -> Result<()> {
        let message = Transport::read_request(&mut stream, MAX_REQUEST_SIZE).await?;

        match TransferRequest::parse(&message)? {
            TransferRequest::Send { name } => self.send_file(&mut stream, &name, addr).await,
        }
    }

    async fn send_file(&self, stream: &mut TcpStream, name: &str, addr: SocketAddr) -> Result<()> {
        let mut file = match self.file_manager.open(name).await {
            Ok(file) => file,
            Err(e) => {
                warn!("Cannot serve {} to {}: {}", name, addr, e);
                return Transport::send_line(stream, TRANSFER_NOT_FOUND).await;
            }
        };

        let sent = tokio::io::copy(&mut file, stream)
            .await
            .map_err(|e| P2PError::TransferFailure(format!("Failed to send {}: {}", name, e)))?;

        info!("Sent {} ({} bytes) to {}", name, sent, addr);
        Ok(())
    }
}
