use log::info;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use crate::core::config::FetchRoute;
use crate::core::protocol::TransferRequest;
use crate::network::Transport;
use crate::storage::FileManager;
use crate::utils::{P2PError, Result};

/// Pulls a whole file from another peer's transfer server into the local storage directory.
pub struct Downloader {
    file_manager: Arc<FileManager>,
    route: FetchRoute,
}

impl Downloader {
    pub fn new(file_manager: Arc<FileManager>, route: FetchRoute) -> Self {
        Self {
            file_manager,
            route,
        }
    }

    /// Copies every byte the remote peer sends until it closes the connection into
    /// `<name>.txt`, replacing any existing copy only once the whole stream has arrived.
    /// Returns the local path and byte count.
    pub async fn fetch(&self, address: &str, name: &str) -> Result<(PathBuf, u64)> {
        let target = dial_target(address, self.route)?;
        self.file_manager.path_for(name)?;

        let mut stream = Transport::connect(&target).await?;
        let request = TransferRequest::Send {
            name: name.to_string(),
        };
        Transport::send_line(&mut stream, &request.encode()).await?;

        let mut file = self.file_manager.create_partial(name).await?;
        let copied = async {
            let received = tokio::io::copy(&mut stream, &mut file).await?;
            file.flush().await?;
            Ok::<u64, std::io::Error>(received)
        }
        .await;
        drop(file);

        let received = match copied {
            Ok(received) => received,
            Err(e) => {
                self.file_manager.discard_partial(name).await;
                return Err(P2PError::TransferFailure(format!(
                    "Failed to receive {}: {}",
                    name, e
                )));
            }
        };
        let path = self.file_manager.commit_partial(name).await?;

        info!("Received {} ({} bytes) from {}", name, received, target);
        Ok((path, received))
    }
}

/// Socket address to dial for an owner address reported by the index.
///
/// The loopback route keeps only the trailing port and ignores the advertised host.
pub fn dial_target(address: &str, route: FetchRoute) -> Result<String> {
    let address = address.trim();
    let port = address
        .rsplit(':')
        .next()
        .map(str::trim)
        .and_then(|p| p.parse::<u16>().ok())
        .ok_or_else(|| P2PError::InvalidResponse(format!("No port in address: {:?}", address)))?;

    match route {
        FetchRoute::Loopback => Ok(format!("127.0.0.1:{}", port)),
        FetchRoute::Advertised => {
            let (host, _) = address.rsplit_once(':').ok_or_else(|| {
                P2PError::InvalidResponse(format!("No host in address: {:?}", address))
            })?;
            let host = host.trim_start_matches('[').trim_end_matches(']');
            let ip = host
                .parse()
                .map_err(|_| P2PError::InvalidResponse(format!("Invalid host: {:?}", host)))?;
            Ok(SocketAddr::new(ip, port).to_string())
        }
    }
}
