//! Source entries
//!
//! A source entry names one remote file to follow: the host to reach, an
//! optional jump host, and the absolute path of the file. The entry also
//! serves as the descriptor the engine hands to the transport layer.

use serde::Deserialize;

/// Default SSH port
const DEFAULT_SSH_PORT: u16 = 22;

/// One log source to follow
///
/// ```toml
/// [[sources]]
/// name = "api-prod"
/// file = "/var/log/api.log"
///
/// [sources.host]
/// address = "10.0.0.12"
/// username = "deploy"
/// password = "secret"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SourceEntry {
    /// Human name; also the source id used for attach/detach
    pub name: String,

    /// Absolute path of the file on the remote host
    pub file: String,

    /// Host the file lives on
    pub host: HostConfig,

    /// Optional jump host to tunnel through
    #[serde(default)]
    pub jump_host: Option<HostConfig>,
}

/// A remote host identity with its credentials
///
/// Either `key` (with an optional `passphrase`) or `password` must be
/// usable; when both are present the key wins.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct HostConfig {
    /// Host address, without port
    pub address: String,

    /// SSH port
    /// Default: 22
    #[serde(default = "default_port")]
    pub port: u16,

    /// User to authenticate as
    pub username: String,

    /// Password, for password authentication
    #[serde(default)]
    pub password: Option<String>,

    /// Path to a private key file, for key authentication
    #[serde(default)]
    pub key: Option<String>,

    /// Passphrase for an encrypted key file
    #[serde(default)]
    pub passphrase: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: DEFAULT_SSH_PORT,
            username: String::new(),
            password: None,
            key: None,
            passphrase: None,
        }
    }
}

impl HostConfig {
    /// `address:port` endpoint string
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// The credential material that identifies this login
    ///
    /// The key path when key auth is configured, the password otherwise.
    /// Two hosts with equal endpoint, user and credential material share a
    /// transport session.
    pub fn credential(&self) -> &str {
        match self.key.as_deref() {
            Some(key) => key,
            None => self.password.as_deref().unwrap_or(""),
        }
    }
}
