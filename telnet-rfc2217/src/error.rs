//! Protocol-layer error taxonomy (§7), mirroring the kind names the
//! specification gives rather than inventing new ones.

use std::fmt;
use std::io;

/// Failure reported by a [`crate::serial::SerialDevice`] implementation.
#[derive(Debug)]
pub struct SerialError(pub String);

impl fmt::Display for SerialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "serial device error: {}", self.0)
    }
}
impl std::error::Error for SerialError {}

/// Raised when mandatory Telnet/RFC2217 options fail to become active within
/// `network_timeout` - either at initial handshake or during reconfiguration.
#[derive(Debug)]
pub struct NegotiationError(pub String);

impl fmt::Display for NegotiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "negotiation error: {}", self.0)
    }
}
impl std::error::Error for NegotiationError {}

/// Raised by `ClientSession::get_modem_state` when no
/// `SERVER_NOTIFY_MODEMSTATE` has ever arrived.
#[derive(Debug, Clone, Copy)]
pub struct NoModemState;

impl fmt::Display for NoModemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "remote sends no NOTIFY_MODEMSTATE")
    }
}
impl std::error::Error for NoModemState {}

/// The single error type the protocol layer (`PortManager`/`ClientSession`)
/// returns from fallible public operations. Each variant corresponds to one
/// row of §7's taxonomy; transport-level causes from `std::io::Error` are
/// folded into `ConnectionLost` or `Serial` depending on which side raised
/// them.
#[derive(Debug)]
pub enum TelnetError {
    Config(String),
    Serial(SerialError),
    Negotiation(NegotiationError),
    Subnegotiation(String),
    Timeout(String),
    NoModemState,
    ConnectionLost,
    Io(io::Error),
}

impl fmt::Display for TelnetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Serial(e) => write!(f, "{}", e),
            Self::Negotiation(e) => write!(f, "{}", e),
            Self::Subnegotiation(msg) => write!(f, "subnegotiation error: {}", msg),
            Self::Timeout(msg) => write!(f, "timeout: {}", msg),
            Self::NoModemState => write!(f, "{}", NoModemState),
            Self::ConnectionLost => write!(f, "connection lost"),
            Self::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for TelnetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Serial(e) => Some(e),
            Self::Negotiation(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TelnetError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => Self::ConnectionLost,
            _ => Self::Io(err),
        }
    }
}

impl From<SerialError> for TelnetError {
    fn from(err: SerialError) -> Self {
        Self::Serial(err)
    }
}

impl From<NegotiationError> for TelnetError {
    fn from(err: NegotiationError) -> Self {
        Self::Negotiation(err)
    }
}

impl From<NoModemState> for TelnetError {
    fn from(_: NoModemState) -> Self {
        Self::NoModemState
    }
}

impl From<crate::subnegotiation::TimeoutError> for TelnetError {
    fn from(err: crate::subnegotiation::TimeoutError) -> Self {
        Self::Timeout(err.to_string())
    }
}

impl From<crate::subnegotiation::RejectedError> for TelnetError {
    fn from(err: crate::subnegotiation::RejectedError) -> Self {
        Self::Subnegotiation(err.to_string())
    }
}

pub type TelnetResult<T> = Result<T, TelnetError>;
