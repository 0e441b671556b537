//! The `mymouse` device node, a Unix socket standing in for a char device
//!
//! Protocol, one byte per command:
//!
//! * [`READ_REQUEST`] - reply with exactly one byte, the last raw button
//!   mask, taken destructively
//! * any other byte - a write, accepted and discarded
//!
//! End of stream is the release.

use crate::state::ButtonLatch;
use log::{error, info, trace, warn};
use std::io::{ErrorKind, Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_NODE_PATH: &str = "/run/mymouse.sock";

/// Command byte requesting the last button mask
pub const READ_REQUEST: u8 = 0x00;

pub struct MouseNode {
    listener: UnixListener,
    path: PathBuf,
    latch: Arc<ButtonLatch>,
}

/// Keeps the node path registered, unlinks it on drop
///
/// Returned by [`MouseNode::spawn`]; the daemon holds it for as long as the
/// node should exist. The listener thread itself never exits on its own, so
/// unregistration belongs to the guard, not the thread.
#[must_use = "the node is unregistered as soon as this `NodeGuard` is dropped"]
pub struct NodeGuard {
    path: PathBuf,
}

impl Drop for NodeGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!("mymouse node unregistered at {}", self.path.display()),
            Err(e) => warn!("failed to remove {} - {:?}", self.path.display(), e),
        }
    }
}

impl MouseNode {
    /// Register the node
    ///
    /// A leftover socket file from an unclean exit is detected by connecting
    /// to it: a live daemon accepts, a stale file refuses. Stale files are
    /// removed and the path is bound again.
    pub fn bind(path: impl AsRef<Path>, latch: Arc<ButtonLatch>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let listener = match UnixListener::bind(&path) {
            Ok(listener) => listener,
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                if UnixStream::connect(&path).is_ok() {
                    return Err(e);
                }
                info!("removing stale mymouse node at {}", path.display());
                std::fs::remove_file(&path)?;
                UnixListener::bind(&path)?
            }
            Err(e) => return Err(e),
        };

        info!("mymouse node registered at {}", path.display());
        Ok(Self {
            listener,
            path,
            latch,
        })
    }

    /// Serve clients on a background thread
    pub fn spawn(self) -> NodeGuard {
        let guard = NodeGuard {
            path: self.path.clone(),
        };
        std::thread::spawn(move || self.listen());
        guard
    }

    fn listen(&self) {
        loop {
            match self.listener.accept() {
                Ok((stream, _)) => {
                    trace!("mymouse node opened");
                    let latch = Arc::clone(&self.latch);
                    std::thread::spawn(move || handle_client(stream, &latch));
                }
                Err(e) => {
                    error!("error {:?} while listening on mymouse node", e);
                    return;
                }
            }
        }
    }
}

fn handle_client(mut stream: UnixStream, latch: &ButtonLatch) {
    let mut command = [0u8; 1];
    loop {
        match stream.read(&mut command) {
            Ok(0) => {
                trace!("mymouse node released");
                return;
            }
            Ok(_) if command[0] == READ_REQUEST => {
                let mask = latch.take();
                trace!("read, button mask {:02X}", mask);
                if let Err(e) = stream.write_all(&[mask]) {
                    warn!("failed to reply to read - {:?}", e);
                    return;
                }
            }
            Ok(_) => {
                // Writes report success without doing anything
                trace!("write ignored");
            }
            Err(e) => {
                warn!("error {:?} while reading from mymouse client", e);
                return;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::ErrorKind;
    use std::time::Duration;

    fn temp_node_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("mymouse-test-{}-{}.sock", tag, std::process::id()))
    }

    fn read_once(stream: &mut UnixStream) -> u8 {
        stream.write_all(&[READ_REQUEST]).unwrap();
        let mut reply = [0u8; 1];
        stream.read_exact(&mut reply).unwrap();
        reply[0]
    }

    #[test]
    fn read_returns_and_clears_mask() {
        let path = temp_node_path("read");
        let latch = Arc::new(ButtonLatch::new());
        latch.store(0x05);

        let node = MouseNode::bind(&path, Arc::clone(&latch)).unwrap();
        let _guard = node.spawn();

        let mut stream = UnixStream::connect(&path).unwrap();
        assert_eq!(read_once(&mut stream), 0x05);
        assert_eq!(read_once(&mut stream), 0x00);

        latch.store(0x02);
        assert_eq!(read_once(&mut stream), 0x02);
    }

    #[test]
    fn write_is_discarded() {
        let path = temp_node_path("write");
        let latch = Arc::new(ButtonLatch::new());
        latch.store(0x01);

        let node = MouseNode::bind(&path, Arc::clone(&latch)).unwrap();
        let _guard = node.spawn();

        let mut stream = UnixStream::connect(&path).unwrap();
        stream.set_read_timeout(Some(Duration::from_millis(50))).unwrap();

        // A write produces no reply and leaves the latch alone
        stream.write_all(&[0xFF, 0x42]).unwrap();
        let mut reply = [0u8; 1];
        let err = stream.read_exact(&mut reply).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::WouldBlock | ErrorKind::TimedOut
        ));

        assert_eq!(read_once(&mut stream), 0x01);
    }

    #[test]
    fn bind_fails_when_node_is_live() {
        let path = temp_node_path("busy");
        let latch = Arc::new(ButtonLatch::new());

        // A bound listener accepts connections, so the path is not stale
        let _node = MouseNode::bind(&path, Arc::clone(&latch)).unwrap();
        assert!(MouseNode::bind(&path, latch).is_err());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn stale_node_is_replaced() {
        let path = temp_node_path("stale");
        let latch = Arc::new(ButtonLatch::new());

        // An unclean exit leaves the socket file behind with nothing
        // listening on it
        drop(UnixListener::bind(&path).unwrap());
        assert!(path.exists());

        latch.store(0x01);
        let node = MouseNode::bind(&path, Arc::clone(&latch)).unwrap();
        let _guard = node.spawn();

        let mut stream = UnixStream::connect(&path).unwrap();
        assert_eq!(read_once(&mut stream), 0x01);
    }

    #[test]
    fn guard_drop_unregisters_node() {
        let path = temp_node_path("guard");
        let latch = Arc::new(ButtonLatch::new());

        let guard = MouseNode::bind(&path, Arc::clone(&latch)).unwrap().spawn();
        assert!(path.exists());

        drop(guard);
        assert!(!path.exists());

        // The path is free for the next daemon
        let _node = MouseNode::bind(&path, latch).unwrap();
        let _ = std::fs::remove_file(&path);
    }
}
