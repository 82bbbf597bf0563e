use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_INDEX_PORT: u16 = 8082;
pub const DEFAULT_PEER_PORT: u16 = 8081;

/// Which end of an accepted index connection supplies the host part of a peer address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AddressSource {
    /// The caller's observed remote address.
    #[default]
    Remote,
    /// The index server's own local address, so every registration lands on the server host.
    Local,
}

/// Where a peer dials after the index reports an owner address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FetchRoute {
    /// Ignore the advertised host and always dial 127.0.0.1.
    #[default]
    Loopback,
    /// Dial the host advertised by the index.
    Advertised,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexConfig {
    pub port: u16,
    pub db_path: PathBuf,
    pub address_source: AddressSource,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_INDEX_PORT,
            db_path: PathBuf::from("./clients.db"),
            address_source: AddressSource::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PeerConfig {
    /// Port the transfer server listens on; also announced to the index.
    pub port: u16,
    pub shared_dir: PathBuf,
    pub index_addr: String,
    pub fetch_route: FetchRoute,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PEER_PORT,
            shared_dir: PathBuf::from("./shared"),
            index_addr: format!("127.0.0.1:{}", DEFAULT_INDEX_PORT),
            fetch_route: FetchRoute::default(),
        }
    }
}
