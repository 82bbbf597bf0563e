use log::{debug, error, info, warn};
use std::net::{IpAddr, SocketAddr};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{Duration, sleep};

use crate::core::config::{AddressSource, IndexConfig};
use crate::core::protocol::{IndexRequest, IndexResponse, MAX_REQUEST_SIZE};
use crate::network::Transport;
use crate::storage::IndexStore;
use crate::utils::{P2PError, Result};

/// Central directory service: one short-lived connection per request.
pub struct IndexServer {
    config: IndexConfig,
    store: IndexStore,
}

impl IndexServer {
    pub fn new(config: IndexConfig, store: IndexStore) -> Self {
        Self { config, store }
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Binds the configured port and serves until Ctrl+C.
    pub async fn start(&self) -> Result<()> {
        info!(
            "Starting index server on port {} (peer addresses from {:?} side)",
            self.config.port, self.config.address_source
        );
        let listener = Transport::listen(self.config.port).await?;

        tokio::select! {
            _ = self.serve(listener) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down index server");
            }
        }
        Ok(())
    }

    /// Accept loop. Each connection is handled on its own task.
    pub async fn serve(&self, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("New index connection from: {}", addr);

                    let store = self.store.clone();
                    let source = self.config.address_source;

                    tokio::spawn(async move {
                        let result = Self::handle_connection(stream, addr, store, source).await;
                        if let Err(e) = result {
                            warn!("Index connection from {} failed: {}", addr, e);
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

    async fn handle_connection(
        mut stream: TcpStream,
        addr: SocketAddr,
        store: IndexStore,
        source: AddressSource,
    ) -> Result<()> {
        let observed_ip = match source {
            AddressSource::Remote => addr.ip(),
            AddressSource::Local => stream.local_addr()?.ip(),
        };

        let message = Transport::read_request(&mut stream, MAX_REQUEST_SIZE).await?;

        let response = match IndexRequest::parse(&message) {
            Ok(request) => tokio::task::spawn_blocking(move || {
                Self::dispatch(&store, &request, observed_ip)
            })
            .await
            .map_err(|e| P2PError::StoreError(format!("Store task failed: {}", e)))?,
            Err(e) => {
                warn!("Rejected request from {}: {}", addr, e);
                IndexResponse::from(&e)
            }
        };

        Transport::send_line(&mut stream, &response.encode()).await
    }

    /// Applies one request to the store. Every failure is logged and mapped to a response line.
    pub fn dispatch(
        store: &IndexStore,
        request: &IndexRequest,
        observed_ip: IpAddr,
    ) -> IndexResponse {
        match request {
            IndexRequest::RegisterClient { port } => {
                let address = match peer_address(observed_ip, port) {
                    Ok(address) => address,
                    Err(e) => {
                        warn!("Error registering client: {}", e);
                        return IndexResponse::ClientRegistrationFailed;
                    }
                };
                match store.registry().register(&address) {
                    Ok(id) => {
                        info!("Client registered: {} (id {})", address, id);
                        IndexResponse::ClientRegistered
                    }
                    Err(e) => {
                        warn!("Error registering client {}: {}", address, e);
                        IndexResponse::ClientRegistrationFailed
                    }
                }
            }
            IndexRequest::RegisterFile { name, port } => {
                let address = match peer_address(observed_ip, port) {
                    Ok(address) => address,
                    Err(e) => {
                        warn!("Error finding client: {}", e);
                        return IndexResponse::ClientNotFound;
                    }
                };
                let owner = match store.registry().lookup(&address) {
                    Ok(id) => id,
                    Err(e) => {
                        warn!("Error finding client {}: {}", address, e);
                        return IndexResponse::ClientNotFound;
                    }
                };
                match store.directory().publish(owner, name) {
                    Ok(record) => {
                        info!("File registered: {} (owner {})", record.name, address);
                        IndexResponse::FileRegistered
                    }
                    Err(e) => {
                        warn!("Error registering file {}: {}", name, e);
                        IndexResponse::FileRegistrationFailed
                    }
                }
            }
            IndexRequest::SearchFile { name } => match store.directory().find(name) {
                Ok(address) => {
                    debug!("File {} found at {}", name, address);
                    IndexResponse::FileFound(address)
                }
                Err(P2PError::RecordNotFound(_)) => {
                    info!("File not found: {}", name);
                    IndexResponse::FileNotFound
                }
                Err(e) => {
                    error!("Error searching for file {}: {}", name, e);
                    IndexResponse::SearchFailed
                }
            },
        }
    }
}

/// Address a peer is known by: observed host plus the port it announced.
pub fn peer_address(ip: IpAddr, port: &str) -> Result<String> {
    let port = port
        .trim()
        .parse::<u16>()
        .map_err(|_| P2PError::MalformedRequest(format!("invalid port: {:?}", port)))?;
    Ok(SocketAddr::new(ip, port).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    fn register(store: &IndexStore, port: &str) -> IndexResponse {
        IndexServer::dispatch(
            store,
            &IndexRequest::RegisterClient {
                port: port.to_string(),
            },
            LOCALHOST,
        )
    }

    fn publish(store: &IndexStore, name: &str, port: &str) -> IndexResponse {
        IndexServer::dispatch(
            store,
            &IndexRequest::RegisterFile {
                name: name.to_string(),
                port: port.to_string(),
            },
            LOCALHOST,
        )
    }

    fn search(store: &IndexStore, name: &str) -> IndexResponse {
        IndexServer::dispatch(
            store,
            &IndexRequest::SearchFile {
                name: name.to_string(),
            },
            LOCALHOST,
        )
    }

    #[test]
    fn test_peer_address_formats() {
        assert_eq!(peer_address(LOCALHOST, "9001").unwrap(), "127.0.0.1:9001");
        assert_eq!(peer_address("::1".parse().unwrap(), "9001").unwrap(), "[::1]:9001");
        assert!(peer_address(LOCALHOST, "").is_err());
        assert!(peer_address(LOCALHOST, "70000").is_err());
    }

    #[test]
    fn test_bad_port_on_register_client() {
        let store = IndexStore::open_in_memory().unwrap();
        assert_eq!(register(&store, "notaport"), IndexResponse::ClientRegistrationFailed);
        assert_eq!(register(&store, ""), IndexResponse::ClientRegistrationFailed);
        assert!(store.registry().list().unwrap().is_empty());
    }

    #[test]
    fn test_bad_port_on_register_file() {
        let store = IndexStore::open_in_memory().unwrap();
        register(&store, "9001");
        assert_eq!(publish(&store, "report", ""), IndexResponse::ClientNotFound);
        assert_eq!(publish(&store, "report", "x"), IndexResponse::ClientNotFound);
        assert!(store.directory().list().unwrap().is_empty());
    }

    #[test]
    fn test_register_twice_is_duplicate() {
        let store = IndexStore::open_in_memory().unwrap();
        assert_eq!(register(&store, "9001"), IndexResponse::ClientRegistered);
        assert_eq!(register(&store, "9001"), IndexResponse::ClientRegistrationFailed);
        assert_eq!(store.registry().list().unwrap().len(), 1);
    }

    #[test]
    fn test_publish_then_search_returns_owner() {
        let store = IndexStore::open_in_memory().unwrap();
        register(&store, "9001");
        assert_eq!(publish(&store, "report", "9001"), IndexResponse::FileRegistered);
        assert_eq!(
            search(&store, "report"),
            IndexResponse::FileFound("127.0.0.1:9001".to_string())
        );
    }

    #[test]
    fn test_publish_without_registration() {
        let store = IndexStore::open_in_memory().unwrap();
        assert_eq!(publish(&store, "report", "9001"), IndexResponse::ClientNotFound);
        assert!(store.directory().list().unwrap().is_empty());
    }

    #[test]
    fn test_publish_from_other_port_is_unknown() {
        let store = IndexStore::open_in_memory().unwrap();
        register(&store, "9001");
        assert_eq!(publish(&store, "report", "9002"), IndexResponse::ClientNotFound);
    }

    #[test]
    fn test_search_unpublished_name() {
        let store = IndexStore::open_in_memory().unwrap();
        register(&store, "9001");
        publish(&store, "report", "9001");

        let response = search(&store, "missing");
        assert_eq!(response, IndexResponse::FileNotFound);
        assert!(IndexResponse::owner_address(&response.encode()).is_none());
    }
}
