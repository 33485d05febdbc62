//! One error enum per logical layer (§11): configuration, and bridge/IO.
//! The protocol/negotiation layer's own taxonomy lives in
//! `telnet_rfc2217::TelnetError`; `BridgeError` wraps it rather than
//! duplicating it.

use std::fmt;
use std::io;
use std::net::AddrParseError;

use telnet_rfc2217::TelnetError;

/// Failures loading or validating a configuration document (§6.4, §12).
#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Parse(String),
    InvalidValue { key: String, value: String },
    MissingField(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "could not read configuration file: {}", e),
            Self::Parse(msg) => write!(f, "malformed configuration document: {}", msg),
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value '{}' for '{}'", value, key)
            }
            Self::MissingField(key) => write!(f, "missing required field '{}'", key),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Failures at the bridge/IO layer: everything that can go wrong wiring a
/// TCP listener to a `SerialDevice` through the protocol engine.
#[derive(Debug)]
pub enum BridgeError {
    Config(ConfigError),
    Telnet(TelnetError),
    AddrParse(AddrParseError),
    ConnectionLost,
    Io(io::Error),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "{}", e),
            Self::Telnet(e) => write!(f, "{}", e),
            Self::AddrParse(e) => write!(f, "invalid listener address: {}", e),
            Self::ConnectionLost => write!(f, "connection lost"),
            Self::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for BridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Telnet(e) => Some(e),
            Self::AddrParse(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for BridgeError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof | io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => {
                Self::ConnectionLost
            }
            _ => Self::Io(err),
        }
    }
}

impl From<TelnetError> for BridgeError {
    fn from(err: TelnetError) -> Self {
        Self::Telnet(err)
    }
}

impl From<ConfigError> for BridgeError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<AddrParseError> for BridgeError {
    fn from(err: AddrParseError) -> Self {
        Self::AddrParse(err)
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;
