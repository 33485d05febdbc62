//! Binds one `TcpListener` per configured bridge and accepts connections onto
//! it, one thread per connection (§4.H). Listeners share no state with each
//! other; each owns its own `BridgeEntry` and accept loop.

use std::net::TcpListener;
use std::sync::Arc;
use std::thread;

use crate::bridge;
use crate::config::BridgeEntry;
use crate::errors::BridgeResult;

/// Binds `entry.listener` and accepts connections until the socket errors
/// out. Each accepted connection is handled on its own thread, mirroring the
/// server's per-client threading model.
pub fn run(entry: Arc<BridgeEntry>) -> BridgeResult<()> {
    if !entry.open {
        log::info!("bridge '{}' is disabled, not listening", entry.name);
        return Ok(());
    }

    let listener = TcpListener::bind(entry.listener)?;
    log::info!("bridge '{}' listening on {} -> {}", entry.name, entry.listener, entry.url);

    for incoming in listener.incoming() {
        match incoming {
            Ok(stream) => {
                let entry = entry.clone();
                let peer = stream.peer_addr().unwrap_or(entry.listener);
                thread::spawn(move || {
                    if let Err(e) = bridge::handle_connection(&entry, stream, peer) {
                        log::warn!("bridge '{}' connection from {} ended: {}", entry.name, peer, e);
                    }
                });
            }
            Err(e) => {
                log::warn!("bridge '{}': error accepting connection: {}", entry.name, e);
            }
        }
    }

    Ok(())
}
