//! # telnet-rfc2217
//!
//! Telnet option negotiation (RFC 854) and the RFC 2217 Com Port Control
//! option, built as independent layers:
//!
//! - [`protocol`]: wire constants and value enums, no state.
//! - [`option`]: one Telnet option's negotiation state machine.
//! - [`subnegotiation`]: one RFC 2217 sub-option's requested/acknowledged value.
//! - [`filter`]: separates in-band data from commands/negotiations/subnegotiations.
//! - [`modem`]: modem status byte packing and the notification-suppression rule.
//! - [`timeout`]: a monotonic deadline with infinite/non-blocking/finite modes.
//! - [`error`]: the crate's error taxonomy.
//! - [`serial`]: the `SerialDevice` trait a bridge drives.
//! - [`port_manager`]: the server role, composing the layers above.
//! - [`client_session`]: the client role, composing the same layers.

pub mod client_session;
pub mod error;
pub mod filter;
pub mod modem;
pub mod option;
pub mod port_manager;
pub mod protocol;
pub mod serial;
pub mod subnegotiation;
pub mod timeout;

pub use client_session::{parse_url, ClientOptions, ClientSession};
pub use error::{TelnetError, TelnetResult};
pub use option::{OptionState, TelnetOption, WriteSink};
pub use port_manager::{PortManager, RawConnection};
pub use serial::{SerialDevice, SerialResult};
pub use timeout::Deadline;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!VERSION.is_empty());
    }
}
