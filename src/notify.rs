// src/notify.rs

//! Readiness / stopping notifications for the init system.
//!
//! [`SystemdNotifier`] implements the `sd_notify` datagram protocol directly:
//! one `KEY=VALUE` message sent to the socket named by `$NOTIFY_SOCKET`.
//! Tests substitute their own [`Notifier`].

use std::fmt;

use tracing::debug;

use crate::errors::Result;

/// Environment variable systemd uses to pass the notification socket.
pub const NOTIFY_SOCKET_ENV: &str = "NOTIFY_SOCKET";

/// State reported to the init system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyState {
    Ready,
    Stopping,
}

impl NotifyState {
    /// Wire form of the state.
    pub fn as_message(self) -> &'static str {
        match self {
            NotifyState::Ready => "READY=1",
            NotifyState::Stopping => "STOPPING=1",
        }
    }
}

impl fmt::Display for NotifyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_message())
    }
}

/// Fire-and-forget channel to the init system.
///
/// Errors are returned for logging only; callers never treat them as fatal.
pub trait Notifier: Send + Sync {
    fn notify(&self, state: NotifyState) -> Result<()>;
}

/// `sd_notify` over a Unix datagram socket.
#[derive(Debug, Clone, Default)]
pub struct SystemdNotifier {
    socket: Option<String>,
}

impl SystemdNotifier {
    /// Read the socket address from `$NOTIFY_SOCKET`.
    ///
    /// Without it (not started by systemd, or `Type=` is not `notify`) every
    /// notification is a no-op.
    pub fn from_env() -> Self {
        Self::new(std::env::var(NOTIFY_SOCKET_ENV).ok())
    }

    pub fn new(socket: Option<String>) -> Self {
        Self {
            socket: socket.filter(|s| !s.is_empty()),
        }
    }

    pub fn socket(&self) -> Option<&str> {
        self.socket.as_deref()
    }
}

impl Notifier for SystemdNotifier {
    fn notify(&self, state: NotifyState) -> Result<()> {
        let Some(socket) = &self.socket else {
            debug!(%state, "no {NOTIFY_SOCKET_ENV} set; skipping notification");
            return Ok(());
        };
        send_datagram(socket, state.as_message())
    }
}

#[cfg(unix)]
fn send_datagram(socket: &str, message: &str) -> Result<()> {
    use std::os::unix::net::UnixDatagram;

    let sock = UnixDatagram::unbound()?;

    #[cfg(target_os = "linux")]
    if let Some(name) = socket.strip_prefix('@') {
        use std::os::linux::net::SocketAddrExt;
        use std::os::unix::net::SocketAddr;

        let addr = SocketAddr::from_abstract_name(name.as_bytes())?;
        sock.send_to_addr(message.as_bytes(), &addr)?;
        return Ok(());
    }

    sock.send_to(message.as_bytes(), socket)?;
    Ok(())
}

#[cfg(not(unix))]
fn send_datagram(socket: &str, message: &str) -> Result<()> {
    debug!(socket, message, "sd_notify is unsupported on this platform");
    Ok(())
}
