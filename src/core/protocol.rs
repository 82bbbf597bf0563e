//! Line-oriented wire formats for the index protocol and the peer transfer protocol.
//!
//! Every message is ASCII text with colon-separated fields, terminated by a newline.

use std::fmt;

use crate::utils::{P2PError, Result};

pub const FOUND_PREFIX: &str = "File found, owner IP and Port:";
pub const TRANSFER_NOT_FOUND: &str = "Error: file not found\n";

/// Largest request either server reads from a connection.
pub const MAX_REQUEST_SIZE: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexRequest {
    /// Ports stay as sent; the index validates them while deriving the peer address.
    RegisterClient { port: String },
    RegisterFile { name: String, port: String },
    SearchFile { name: String },
}

impl IndexRequest {
    pub fn parse(line: &str) -> Result<Self> {
        let message = line.trim();
        let parts: Vec<&str> = message.split(':').collect();
        if parts.len() < 3 {
            return Err(P2PError::MalformedRequest(format!(
                "expected 3 fields, got {}: {:?}",
                parts.len(),
                message
            )));
        }

        let (command, data, port) = (parts[0], parts[1], parts[2]);
        match command {
            "register_client" => Ok(IndexRequest::RegisterClient {
                port: port.to_string(),
            }),
            "register_file" => Ok(IndexRequest::RegisterFile {
                name: data.to_string(),
                port: port.to_string(),
            }),
            "search_file" => Ok(IndexRequest::SearchFile {
                name: data.to_string(),
            }),
            other => Err(P2PError::UnknownCommand(other.to_string())),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            IndexRequest::RegisterClient { port } => format!("register_client::{}\n", port),
            IndexRequest::RegisterFile { name, port } => {
                format!("register_file:{}:{}\n", name, port)
            }
            IndexRequest::SearchFile { name } => format!("search_file:{}:\n", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexResponse {
    ClientRegistered,
    ClientRegistrationFailed,
    FileRegistered,
    ClientNotFound,
    FileRegistrationFailed,
    FileFound(String),
    FileNotFound,
    SearchFailed,
    UnknownCommand,
    InvalidCommand,
}

impl IndexResponse {
    /// Owner address carried by a raw "file found" response line.
    pub fn owner_address(line: &str) -> Option<&str> {
        line.strip_prefix(FOUND_PREFIX)
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
    }

    pub fn encode(&self) -> String {
        format!("{}\n", self)
    }
}

impl fmt::Display for IndexResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexResponse::ClientRegistered => f.write_str("Client registered successfully"),
            IndexResponse::ClientRegistrationFailed => f.write_str("Error registering client"),
            IndexResponse::FileRegistered => f.write_str("File registered successfully"),
            IndexResponse::ClientNotFound => f.write_str("Error finding client"),
            IndexResponse::FileRegistrationFailed => f.write_str("Error registering file"),
            IndexResponse::FileFound(address) => write!(f, "{}{}", FOUND_PREFIX, address),
            IndexResponse::FileNotFound => f.write_str("File not found"),
            IndexResponse::SearchFailed => f.write_str("Error searching for file"),
            IndexResponse::UnknownCommand => f.write_str("Unknown command"),
            IndexResponse::InvalidCommand => f.write_str("Invalid command"),
        }
    }
}

impl From<&P2PError> for IndexResponse {
    fn from(err: &P2PError) -> Self {
        match err {
            P2PError::UnknownCommand(_) => IndexResponse::UnknownCommand,
            _ => IndexResponse::InvalidCommand,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferRequest {
    Send { name: String },
}

impl TransferRequest {
    pub fn parse(line: &str) -> Result<Self> {
        let message = line.trim();
        let parts: Vec<&str> = message.split(':').collect();
        if parts.len() < 2 {
            return Err(P2PError::MalformedRequest(format!(
                "invalid transfer request: {:?}",
                message
            )));
        }

        match parts[0] {
            "send" => Ok(TransferRequest::Send {
                name: parts[1].to_string(),
            }),
            other => Err(P2PError::UnknownCommand(other.to_string())),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            TransferRequest::Send { name } => format!("send:{}\n", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_index_requests() {
        assert_eq!(
            IndexRequest::parse("register_client::9001\n").unwrap(),
            IndexRequest::RegisterClient {
                port: "9001".to_string()
            }
        );
        assert_eq!(
            IndexRequest::parse("register_file:report:9001\n").unwrap(),
            IndexRequest::RegisterFile {
                name: "report".to_string(),
                port: "9001".to_string()
            }
        );
        assert_eq!(
            IndexRequest::parse("search_file:report:\n").unwrap(),
            IndexRequest::SearchFile {
                name: "report".to_string()
            }
        );
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let req = IndexRequest::parse("search_file:report:x:y").unwrap();
        assert_eq!(
            req,
            IndexRequest::SearchFile {
                name: "report".to_string()
            }
        );
    }

    #[test]
    fn test_too_few_fields_is_malformed() {
        let err = IndexRequest::parse("search_file:report").unwrap_err();
        assert!(matches!(err, P2PError::MalformedRequest(_)));
        assert_eq!(IndexResponse::from(&err), IndexResponse::InvalidCommand);

        let err = IndexRequest::parse("").unwrap_err();
        assert!(matches!(err, P2PError::MalformedRequest(_)));
    }

    #[test]
    fn test_unknown_verb() {
        let err = IndexRequest::parse("delete_file:report:9001").unwrap_err();
        assert!(matches!(err, P2PError::UnknownCommand(ref c) if c == "delete_file"));
        assert_eq!(IndexResponse::from(&err), IndexResponse::UnknownCommand);
    }

    #[test]
    fn test_bad_port_still_parses() {
        assert_eq!(
            IndexRequest::parse("register_file:report:\n").unwrap(),
            IndexRequest::RegisterFile {
                name: "report".to_string(),
                port: String::new()
            }
        );
        assert!(IndexRequest::parse("register_client::notaport").is_ok());
    }

    #[test]
    fn test_encoded_requests_match_wire_grammar() {
        assert_eq!(
            IndexRequest::RegisterClient {
                port: "8081".to_string()
            }
            .encode(),
            "register_client::8081\n"
        );
        assert_eq!(
            IndexRequest::SearchFile {
                name: "notes".to_string()
            }
            .encode(),
            "search_file:notes:\n"
        );
        assert_eq!(
            TransferRequest::Send {
                name: "notes".to_string()
            }
            .encode(),
            "send:notes\n"
        );
    }

    #[test]
    fn test_response_lines() {
        assert_eq!(
            IndexResponse::ClientRegistered.encode(),
            "Client registered successfully\n"
        );
        assert_eq!(
            IndexResponse::FileFound("127.0.0.1:9001".to_string()).encode(),
            "File found, owner IP and Port:127.0.0.1:9001\n"
        );
        assert_eq!(IndexResponse::FileNotFound.encode(), "File not found\n");
    }

    #[test]
    fn test_owner_address_extraction() {
        assert_eq!(
            IndexResponse::owner_address("File found, owner IP and Port:127.0.0.1:9001\n"),
            Some("127.0.0.1:9001")
        );
        assert_eq!(IndexResponse::owner_address("File not found\n"), None);
        assert_eq!(IndexResponse::owner_address(FOUND_PREFIX), None);
    }

    #[test]
    fn test_parse_transfer_request() {
        assert_eq!(
            TransferRequest::parse("send:report\n").unwrap(),
            TransferRequest::Send {
                name: "report".to_string()
            }
        );
        assert!(matches!(
            TransferRequest::parse("send").unwrap_err(),
            P2PError::MalformedRequest(_)
        ));
        assert!(matches!(
            TransferRequest::parse("recv:report").unwrap_err(),
            P2PError::UnknownCommand(_)
        ));
    }
}
