//! Unix domain socket plumbing.
//!
//! The client side only ever connects; [`SocketListener`] exists so a
//! service (or a test double standing in for one) can be hosted on the
//! same path conventions.

use std::path::Path;

use tokio::net::{UnixListener, UnixStream};

use crate::error::Result;

/// Generate a unique socket path for this process.
///
/// Format: `{tmp}/extphone-{pid}-{random}.sock`
pub fn generate_socket_path() -> String {
    let dir = std::env::temp_dir();
    let name = format!("extphone-{}-{:x}.sock", std::process::id(), rand_u64());
    dir.join(name).to_string_lossy().into_owned()
}

fn rand_u64() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static SEQ: AtomicU64 = AtomicU64::new(0);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    nanos.wrapping_mul(0x517cc1b727220a95) ^ (seq << 48) ^ std::process::id() as u64
}

/// Connect to the service socket.
pub async fn connect_socket(path: &str) -> Result<UnixStream> {
    Ok(UnixStream::connect(path).await?)
}

/// Listening end of a service socket. Removes the socket file on drop.
pub struct SocketListener {
    listener: UnixListener,
    path: String,
}

impl SocketListener {
    /// Bind to `path`, replacing a leftover socket file.
    pub async fn bind(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            std::fs::remove_file(path)?;
        }
        let listener = UnixListener::bind(path)?;
        tracing::debug!(path, "service socket bound");
        Ok(Self {
            listener,
            path: path.to_string(),
        })
    }

    /// Accept one connection.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self.listener.accept().await?;
        Ok(stream)
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Drop for SocketListener {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
