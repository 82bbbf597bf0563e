use log::{info, warn};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use crate::core::config::PeerConfig;
use crate::core::peer::{PeerClient, SearchOutcome};
use crate::network::Transport;
use crate::storage::FileManager;
use crate::transfer::Uploader;
use crate::utils::{P2PError, Result};

pub const MENU_PROMPT: &str = "Choose an option: [join | publish | search]";

/// A peer process: the transfer server and the interactive client run side by side.
pub struct Node {
    pub config: PeerConfig,
    client: PeerClient,
    uploader: Arc<Uploader>,
}

impl Node {
    pub async fn new(config: PeerConfig) -> Result<Self> {
        let file_manager = Arc::new(FileManager::new(config.shared_dir.clone()).await?);
        let client = PeerClient::new(config.clone(), file_manager.clone());
        let uploader = Arc::new(Uploader::new(file_manager));

        Ok(Self {
            config,
            client,
            uploader,
        })
    }

    pub fn client(&self) -> &PeerClient {
        &self.client
    }

    pub fn uploader(&self) -> Arc<Uploader> {
        self.uploader.clone()
    }

    pub async fn start(&self) -> Result<()> {
        info!(
            "Starting peer on port {} (index {}, files in {:?})",
            self.config.port, self.config.index_addr, self.config.shared_dir
        );

        let listener = Transport::listen(self.config.port).await?;
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();

        tokio::select! {
            _ = async {
                tokio::join!(self.serve_transfers(listener), self.menu_task(stdin, stdout))
            } => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down");
            }
        }

        Ok(())
    }

    pub async fn serve_transfers(&self, listener: TcpListener) {
        self.uploader.clone().serve(listener).await;
    }

    /// Runs the menu to completion; a failure ends only the menu, never the transfer server.
    pub async fn menu_task<R, W>(&self, input: R, output: W)
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        if let Err(e) = self.run_menu(input, output).await {
            warn!("Interactive menu stopped: {}", e);
        }
    }

    /// Reads one option per line until input ends. Every outcome is printed and the menu repeats.
    pub async fn run_menu<R, W>(&self, mut input: R, mut output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        loop {
            write_line(&mut output, MENU_PROMPT).await?;
            let Some(option) = read_input(&mut input).await? else {
                info!("Input closed, menu stopped");
                return Ok(());
            };

            let message = match option.as_str() {
                "join" => self.join().await,
                "publish" => {
                    write_line(&mut output, "Enter the file name to publish:").await?;
                    match read_input(&mut input).await? {
                        Some(name) => self.publish(&name).await,
                        None => return Ok(()),
                    }
                }
                "search" => {
                    write_line(&mut output, "Enter the file name to search:").await?;
                    match read_input(&mut input).await? {
                        Some(name) => self.search(&name).await,
                        None => return Ok(()),
                    }
                }
                _ => "Invalid option. Please choose again.".to_string(),
            };

            write_line(&mut output, &message).await?;
        }
    }

    async fn join(&self) -> String {
        match self.client.register_client().await {
            Ok(response) => format!("Server response: {}", response.trim_end()),
            Err(e) => {
                warn!("Join failed: {}", e);
                format!("Error registering with the index server: {}", e)
            }
        }
    }

    async fn publish(&self, name: &str) -> String {
        match self.client.publish_file(name).await {
            Ok(response) => format!("Server response: {}", response.trim_end()),
            Err(P2PError::LocalFileMissing(_)) => "File does not exist.".to_string(),
            Err(e) => {
                warn!("Publish of {} failed: {}", name, e);
                format!("Error publishing file: {}", e)
            }
        }
    }

    async fn search(&self, name: &str) -> String {
        match self.client.search_file(name).await {
            Ok(SearchOutcome::Fetched { owner, path, bytes }) => format!(
                "File found at: {}\nFile received successfully ({} bytes written to {}).",
                owner,
                bytes,
                path.display()
            ),
            Ok(SearchOutcome::NotFound(_)) => "File not found.".to_string(),
            Err(e) => {
                warn!("Search for {} failed: {}", name, e);
                format!("Error searching for file: {}", e)
            }
        }
    }
}

async fn read_input<R: AsyncBufRead + Unpin>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, line: &str) -> Result<()> {
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    async fn node_with_dead_index(dir: &std::path::Path) -> Node {
        // Nothing listens on port 1, so any network call fails fast.
        let config = PeerConfig {
            port: 9101,
            shared_dir: dir.to_path_buf(),
            index_addr: "127.0.0.1:1".to_string(),
            ..PeerConfig::default()
        };
        Node::new(config).await.unwrap()
    }

    async fn run(node: &Node, script: &str) -> String {
        let mut output = Vec::new();
        node.run_menu(Cursor::new(script.as_bytes().to_vec()), &mut output)
            .await
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_option_reprompts() {
        let dir = tempfile::tempdir().unwrap();
        let node = node_with_dead_index(dir.path()).await;

        let output = run(&node, "dance\n").await;
        assert!(output.contains("Invalid option. Please choose again."));
        assert_eq!(output.matches(MENU_PROMPT).count(), 2);
    }

    #[tokio::test]
    async fn test_publish_missing_file_stays_local() {
        let dir = tempfile::tempdir().unwrap();
        let node = node_with_dead_index(dir.path()).await;

        let output = run(&node, "publish\nghost\n").await;
        assert!(output.contains("File does not exist."));
        assert!(!output.contains("Error publishing file"));
    }

    #[tokio::test]
    async fn test_network_errors_return_to_menu() {
        let dir = tempfile::tempdir().unwrap();
        let node = node_with_dead_index(dir.path()).await;

        let output = run(&node, "join\nsearch\nreport\n").await;
        assert!(output.contains("Error registering with the index server"));
        assert!(output.contains("Error searching for file"));
        assert_eq!(output.matches(MENU_PROMPT).count(), 3);
    }

    #[tokio::test]
    async fn test_output_failure_ends_menu_with_error() {
        let dir = tempfile::tempdir().unwrap();
        let node = node_with_dead_index(dir.path()).await;

        let (writer, reader) = tokio::io::duplex(64);
        drop(reader);

        let input = Cursor::new(b"join\n".to_vec());
        let err = node.run_menu(input, writer).await.unwrap_err();
        assert!(matches!(err, P2PError::IoError(_)));

        let (writer, reader) = tokio::io::duplex(64);
        drop(reader);
        node.menu_task(Cursor::new(b"join\n".to_vec()), writer).await;
    }
}
