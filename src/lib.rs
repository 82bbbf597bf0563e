//! Mini P2P Index
//!
//! A centralized index server that records which peer holds which file name, and peer nodes
//! that register, publish, search, and then transfer file bytes directly between themselves.

pub mod core;
pub mod network;
pub mod storage;
pub mod transfer;
pub mod utils;

// Re-export main types
pub use core::{IndexConfig, IndexServer, Node, PeerClient, PeerConfig};
pub use storage::{FileManager, IndexStore};
pub use utils::{
    error::{P2PError, Result},
    setup_logging,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
