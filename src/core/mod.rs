pub mod config;
pub mod index;
pub mod node;
pub mod peer;
pub mod protocol;

pub use config::{AddressSource, FetchRoute, IndexConfig, PeerConfig};
pub use index::IndexServer;
pub use node::Node;
pub use peer::{PeerClient, SearchOutcome};
pub use protocol::{IndexRequest, IndexResponse, TransferRequest};
