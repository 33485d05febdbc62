//! Resolves a bridge's configured `url` into a `SerialDevice` (§6.1, §9
//! open question: the crate has no termios driver of its own).
//!
//! Only `rfc2217://host:port[?opt…]` is supported (§6.3): it opens an
//! outbound `ClientSession` and hands back the `Arc` handle `open()`
//! returns, which implements `SerialDevice` directly - the redirector-chain
//! design the client role was built for. A bare tty path cannot be opened
//! without a platform termios binding this crate does not depend on, so it
//! is reported as a configuration error rather than silently faked.

use std::time::Duration;

use telnet_rfc2217::serial::SerialDevice;
use telnet_rfc2217::ClientSession;

use crate::config::BridgeEntry;
use crate::errors::{BridgeError, ConfigError};

/// Stands in for "infinite" wherever `ClientOptions` needs a concrete
/// `Duration` but the bridge entry configured `timeout = -1`, matching the
/// sentinel `ClientSession::read_bytes` falls back to for its own wait.
const EFFECTIVELY_INFINITE: Duration = Duration::from_secs(3600);

pub fn open_serial_device(entry: &BridgeEntry) -> Result<Box<dyn SerialDevice>, BridgeError> {
    if !entry.url.starts_with("rfc2217://") {
        return Err(BridgeError::Config(ConfigError::InvalidValue {
            key: format!("bridges[{}].url", entry.name),
            value: entry.url.clone(),
        }));
    }

    let (addr, mut opts) = telnet_rfc2217::parse_url(&entry.url).map_err(|e| {
        BridgeError::Config(ConfigError::InvalidValue {
            key: format!("bridges[{}].url", entry.name),
            value: e.to_string(),
        })
    })?;
    // The bridge entry's own `timeout` field, when set, takes priority over
    // whatever the URL's query string asked for.
    opts.network_timeout = entry.timeout.unwrap_or(EFFECTIVELY_INFINITE);

    log::info!("bridge '{}': opening redirector chain to {}", entry.name, addr);
    let session = ClientSession::open(&addr, opts)?;
    Ok(Box::new(session))
}
