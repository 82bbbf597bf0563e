use clap::{Parser, Subcommand};
use log::LevelFilter;
use mini_p2p_index::core::{AddressSource, FetchRoute};
use mini_p2p_index::{IndexConfig, IndexServer, IndexStore, Node, PeerConfig, Result};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mini-p2p-index")]
#[command(about = "Peer-to-peer file sharing through a central index server")]
#[command(version)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the index server
    Index {
        /// Port to listen on
        #[arg(short, long, default_value = "8082")]
        port: u16,
        /// SQLite database holding clients and files
        #[arg(long, default_value = "./clients.db")]
        db: PathBuf,
        /// Which end of a connection supplies a registering peer's host
        #[arg(long, value_enum, default_value_t = AddressSource::Remote)]
        address_source: AddressSource,
    },
    /// Run a peer: transfer server plus interactive menu
    Peer {
        /// Port the transfer server listens on
        #[arg(short, long, default_value = "8081")]
        port: u16,
        /// Directory holding <name>.txt files
        #[arg(short, long, default_value = "./shared")]
        dir: PathBuf,
        /// Index server address (host:port)
        #[arg(short, long, default_value = "127.0.0.1:8082")]
        index: String,
        /// Dial loopback or the owner's advertised host when fetching
        #[arg(long, value_enum, default_value_t = FetchRoute::Loopback)]
        fetch_route: FetchRoute,
    },
    /// Print every registered client and published file as JSON
    Dump {
        /// SQLite database holding clients and files
        #[arg(long, default_value = "./clients.db")]
        db: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    mini_p2p_index::setup_logging(if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });

    match cli.command {
        Commands::Index {
            port,
            db,
            address_source,
        } => {
            let config = IndexConfig {
                port,
                db_path: db,
                address_source,
            };

            let store = IndexStore::open(&config.db_path)?;
            let server = IndexServer::new(config, store);
            server.start().await?;
        }
        Commands::Peer {
            port,
            dir,
            index,
            fetch_route,
        } => {
            let config = PeerConfig {
                port,
                shared_dir: dir,
                index_addr: index,
                fetch_route,
            };

            let node = Node::new(config).await?;
            node.start().await?;
        }
        Commands::Dump { db } => {
            let store = IndexStore::open(&db)?;
            let dump = serde_json::json!({
                "clients": store.registry().list()?,
                "files": store.directory().list()?,
            });
            println!("{}", serde_json::to_string_pretty(&dump)?);
        }
    }

    Ok(())
}
