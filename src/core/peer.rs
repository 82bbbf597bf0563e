use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::config::PeerConfig;
use crate::core::protocol::{IndexRequest, IndexResponse};
use crate::network::Transport;
use crate::storage::FileManager;
use crate::transfer::Downloader;
use crate::utils::{P2PError, Result};

/// Result of a search, including the fetch it triggers on a hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Fetched {
        owner: String,
        path: PathBuf,
        bytes: u64,
    },
    /// The index answered with something other than a hit; the raw line is kept.
    NotFound(String),
}

/// Client side of a peer: talks to the index server and pulls files from other peers.
pub struct PeerClient {
    config: PeerConfig,
    file_manager: Arc<FileManager>,
    downloader: Downloader,
}

impl PeerClient {
    pub fn new(config: PeerConfig, file_manager: Arc<FileManager>) -> Self {
        let downloader = Downloader::new(file_manager.clone(), config.fetch_route);
        Self {
            config,
            file_manager,
            downloader,
        }
    }

    pub fn config(&self) -> &PeerConfig {
        &self.config
    }

    /// Announces this peer's transfer port to the index. Returns the raw response line.
    pub async fn register_client(&self) -> Result<String> {
        self.request(&IndexRequest::RegisterClient {
            port: self.config.port.to_string(),
        })
        .await
    }

    /// Publishes `name` if `<name>.txt` exists locally; otherwise fails before any network call.
    pub async fn publish_file(&self, name: &str) -> Result<String> {
        if !self.file_manager.exists(name).await {
            warn!("Refusing to publish {}: no local copy", name);
            return Err(P2PError::LocalFileMissing(name.to_string()));
        }

        self.request(&IndexRequest::RegisterFile {
            name: name.to_string(),
            port: self.config.port.to_string(),
        })
        .await
    }

    /// Looks `name` up on the index and, on a hit, downloads it from the owner.
    pub async fn search_file(&self, name: &str) -> Result<SearchOutcome> {
        let response = self
            .request(&IndexRequest::SearchFile {
                name: name.to_string(),
            })
            .await?;

        match IndexResponse::owner_address(&response) {
            Some(owner) => {
                info!("File {} found at {}", name, owner);
                let (path, bytes) = self.fetch(owner, name).await?;
                Ok(SearchOutcome::Fetched {
                    owner: owner.to_string(),
                    path,
                    bytes,
                })
            }
            None => {
                debug!("Search for {} missed: {}", name, response.trim());
                Ok(SearchOutcome::NotFound(response))
            }
        }
    }

    pub async fn fetch(&self, address: &str, name: &str) -> Result<(PathBuf, u64)> {
        self.downloader.fetch(address, name).await
    }

    /// One connection, one request, one response line.
    async fn request(&self, request: &IndexRequest) -> Result<String> {
        let mut stream = Transport::connect(&self.config.index_addr).await?;
        Transport::send_line(&mut stream, &request.encode()).await?;
        Transport::read_line(&mut stream).await
    }
}
