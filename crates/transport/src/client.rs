//! SSH shell client
//!
//! One `ShellClient` wraps one authenticated SSH connection. Commands run on
//! a fresh session channel each; stdout, stderr and the exit status are
//! captured in full before returning. Dialing supports password and key
//! authentication, directly or through a jump host (a direct-tcpip tunnel
//! opened on the jump connection).

use std::sync::Arc;
use std::time::Duration;

use russh::client::{self, Handle};
use russh::ChannelMsg;
use tokio::sync::Mutex;
use tokio::time::timeout;

use tailmux_config::HostConfig;

use crate::error::{Result, TransportError};

/// Connect timeout for the TCP/SSH dial
const DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Command used to probe that a session is still usable
///
/// Writes to both stdout and stderr and exits cleanly, so a healthy session
/// produces output on both streams with status 0.
const LIVENESS_PROBE: &str = "echo ok; echo err 1>&2";

/// Captured output of one remote command
#[derive(Debug, Default, Clone)]
pub struct ExecOutput {
    /// Everything the command wrote to stdout
    pub stdout: Vec<u8>,
    /// Everything the command wrote to stderr
    pub stderr: Vec<u8>,
    /// Exit status, if the server reported one
    pub exit_status: Option<u32>,
}

impl ExecOutput {
    /// Stdout as lossy UTF-8
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Stderr as lossy UTF-8, trimmed
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_owned()
    }

    /// True when the command exited 0 and wrote nothing to stderr
    pub fn clean(&self) -> bool {
        self.stderr.is_empty() && self.exit_status.unwrap_or(0) == 0
    }
}

/// Accepts any server host key
///
/// Host key verification is the operator's concern (known_hosts is not
/// consulted); the credential material in the config is what gates access.
struct AcceptingHandler;

#[async_trait::async_trait]
impl client::Handler for AcceptingHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &russh_keys::key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        Ok(true)
    }
}

/// One authenticated SSH connection
///
/// Cheap to share (`Arc` it); `exec` serialises channel opens on an internal
/// lock, which is fine at the engine's polling rates.
pub struct ShellClient {
    /// The authenticated session
    handle: Mutex<Handle<AcceptingHandler>>,

    /// Jump-host session the tunnel runs over; kept alive for the lifetime
    /// of the target session
    jump: Option<Mutex<Handle<AcceptingHandler>>>,

    /// `address:port`, for logging
    endpoint: String,
}

impl ShellClient {
    /// Dial and authenticate, optionally through a jump host
    pub async fn dial(host: &HostConfig, jump_host: Option<&HostConfig>) -> Result<Self> {
        let config = Arc::new(client::Config::default());

        match jump_host {
            None => {
                let mut handle = dial_direct(Arc::clone(&config), host).await?;
                authenticate(&mut handle, host).await?;
                Ok(Self {
                    handle: Mutex::new(handle),
                    jump: None,
                    endpoint: host.endpoint(),
                })
            }
            Some(jump) => {
                let mut jump_handle = dial_direct(Arc::clone(&config), jump).await?;
                authenticate(&mut jump_handle, jump).await?;

                // Tunnel to the target through the jump connection, then run
                // the SSH handshake for the target over that stream.
                let channel = jump_handle
                    .channel_open_direct_tcpip(
                        host.address.clone(),
                        u32::from(host.port),
                        "127.0.0.1",
                        0,
                    )
                    .await?;

                let dial = client::connect_stream(config, channel.into_stream(), AcceptingHandler);
                let mut handle = timeout(DIAL_TIMEOUT, dial)
                    .await
                    .map_err(|_| TransportError::DialTimeout {
                        endpoint: host.endpoint(),
                    })?
                    .map_err(|e| TransportError::Dial {
                        endpoint: host.endpoint(),
                        source: e,
                    })?;
                authenticate(&mut handle, host).await?;

                tracing::info!(
                    endpoint = %host.endpoint(),
                    jump = %jump.endpoint(),
                    "connected through jump host"
                );

                Ok(Self {
                    handle: Mutex::new(handle),
                    jump: Some(Mutex::new(jump_handle)),
                    endpoint: host.endpoint(),
                })
            }
        }
    }

    /// The `address:port` this client is connected to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run a command and capture its complete output
    ///
    /// Session-layer faults (channel refused, connection torn down) come
    /// back as `Err`; whatever the command itself prints, including to
    /// stderr, is data in the returned [`ExecOutput`].
    pub async fn exec(&self, command: &str) -> Result<ExecOutput> {
        let handle = self.handle.lock().await;
        let mut channel = handle.channel_open_session().await?;
        channel.exec(true, command).await?;
        drop(handle);

        let mut output = ExecOutput::default();

        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => {
                    output.stdout.extend_from_slice(data);
                }
                ChannelMsg::ExtendedData { ref data, ext: 1 } => {
                    output.stderr.extend_from_slice(data);
                }
                ChannelMsg::ExitStatus { exit_status } => {
                    output.exit_status = Some(exit_status);
                }
                _ => {}
            }
        }

        tracing::trace!(
            endpoint = %self.endpoint,
            command,
            stdout_len = output.stdout.len(),
            stderr_len = output.stderr.len(),
            exit_status = ?output.exit_status,
            "command completed"
        );

        Ok(output)
    }

    /// Probe whether the session still runs commands
    pub async fn is_alive(&self) -> bool {
        match self.exec(LIVENESS_PROBE).await {
            Ok(output) => output.exit_status.unwrap_or(1) == 0,
            Err(_) => false,
        }
    }

    /// Close the session (and the jump session, if any)
    ///
    /// Errors are ignored; a connection that refuses to close cleanly is
    /// already gone.
    pub async fn close(&self) {
        let handle = self.handle.lock().await;
        let _ = handle
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await;
        drop(handle);

        if let Some(ref jump) = self.jump {
            let jump = jump.lock().await;
            let _ = jump
                .disconnect(russh::Disconnect::ByApplication, "", "en")
                .await;
        }
    }
}

impl std::fmt::Debug for ShellClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellClient")
            .field("endpoint", &self.endpoint)
            .field("jump", &self.jump.is_some())
            .finish()
    }
}

/// TCP-dial a host with the connect timeout applied
async fn dial_direct(
    config: Arc<client::Config>,
    host: &HostConfig,
) -> Result<Handle<AcceptingHandler>> {
    let dial = client::connect(config, (host.address.as_str(), host.port), AcceptingHandler);

    timeout(DIAL_TIMEOUT, dial)
        .await
        .map_err(|_| TransportError::DialTimeout {
            endpoint: host.endpoint(),
        })?
        .map_err(|e| TransportError::Dial {
            endpoint: host.endpoint(),
            source: e,
        })
}

/// Authenticate a freshly dialed session with the host's credentials
///
/// A configured key file wins over a password; the passphrase is only used
/// to decrypt the key.
async fn authenticate(handle: &mut Handle<AcceptingHandler>, host: &HostConfig) -> Result<()> {
    let authenticated = match host.key.as_deref() {
        Some(path) => {
            let key = russh_keys::load_secret_key(path, host.passphrase.as_deref()).map_err(
                |e| TransportError::Key {
                    path: path.to_owned(),
                    source: e,
                },
            )?;
            handle
                .authenticate_publickey(host.username.clone(), Arc::new(key))
                .await?
        }
        None => {
            handle
                .authenticate_password(
                    host.username.clone(),
                    host.password.clone().unwrap_or_default(),
                )
                .await?
        }
    };

    if !authenticated {
        return Err(TransportError::Auth {
            username: host.username.clone(),
            endpoint: host.endpoint(),
        });
    }

    tracing::info!(
        endpoint = %host.endpoint(),
        username = %host.username,
        auth = if host.key.is_some() { "key" } else { "password" },
        "connected"
    );

    Ok(())
}
