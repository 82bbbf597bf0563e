pub mod database;
pub mod directory;
pub mod file_manager;
pub mod registry;

pub use database::IndexStore;
pub use directory::{FileDirectory, FileRecord};
pub use file_manager::FileManager;
pub use registry::{AddressRegistry, ClientRecord};
