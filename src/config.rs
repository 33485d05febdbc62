//! Typed configuration document (§6.4, §12): one `[server]`-style global
//! section plus a list of bridge entries, each pairing a serial-port URL
//! with a TCP listener address. Parsed as JSON (this crate's existing
//! `serde_json` dependency) and validated eagerly so a malformed document
//! fails before any listener is bound.

use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;
use telnet_rfc2217::protocol::{WireParity, WireStopBits};

use crate::errors::{ConfigError, ConfigResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeMode {
    Rfc2217,
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeOfService {
    Normal,
    LowDelay,
    Throughput,
    Reliability,
    MinCost,
}

#[derive(Debug, Clone)]
pub struct BridgeEntry {
    pub name: String,
    pub url: String,
    pub listener: SocketAddr,
    pub baudrate: u32,
    pub bytesize: u8,
    pub parity: WireParity,
    pub stopbits: WireStopBits,
    pub xonxoff: bool,
    pub rtscts: bool,
    /// `None` means infinite (`timeout = -1` in the document).
    pub timeout: Option<Duration>,
    pub no_delay: bool,
    pub tos: TypeOfService,
    pub mode: BridgeMode,
    pub open: bool,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub log_level: String,
    pub accept_backlog: u32,
    pub shutdown_grace: Duration,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            accept_backlog: 128,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub bridges: Vec<BridgeEntry>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            bridges: vec![BridgeEntry {
                name: "example".to_string(),
                url: "/dev/ttyUSB0".to_string(),
                listener: "0.0.0.0:2217".parse().expect("static listener address"),
                baudrate: 9600,
                bytesize: 8,
                parity: WireParity::None,
                stopbits: WireStopBits::One,
                xonxoff: false,
                rtscts: false,
                timeout: Some(Duration::from_secs(3)),
                no_delay: true,
                tos: TypeOfService::Normal,
                mode: BridgeMode::Rfc2217,
                open: false,
            }],
        }
    }
}

impl AppConfig {
    /// Loads from `path`. A missing file is not an error: it falls back to
    /// [`AppConfig::default`] (a single disabled example bridge) with a
    /// warning logged, mirroring the load-or-default startup idiom (§12).
    pub fn load_from_file(path: &str) -> ConfigResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("configuration file '{}' not found, using defaults", path);
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn parse(content: &str) -> ConfigResult<Self> {
        let raw: RawConfig = serde_json::from_str(content)?;

        let server = ServerSettings {
            log_level: raw.server.log_level.unwrap_or_else(|| "info".to_string()),
            accept_backlog: raw.server.accept_backlog.unwrap_or(128),
            shutdown_grace: Duration::from_secs(raw.server.shutdown_grace_secs.unwrap_or(5)),
        };

        let bridges = raw
            .bridges
            .into_iter()
            .enumerate()
            .map(|(i, entry)| entry.into_bridge_entry(i))
            .collect::<ConfigResult<Vec<_>>>()?;

        Ok(Self { server, bridges })
    }
}

#[derive(Debug, Deserialize, Default)]
struct RawServerSettings {
    log_level: Option<String>,
    accept_backlog: Option<u32>,
    shutdown_grace_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawBridgeEntry {
    name: Option<String>,
    url: String,
    listener: String,
    baudrate: Option<u32>,
    bytesize: Option<u8>,
    parity: Option<String>,
    stopbits: Option<String>,
    xonxoff: Option<bool>,
    rtscts: Option<bool>,
    timeout: Option<i64>,
    no_delay: Option<bool>,
    tos: Option<String>,
    mode: Option<String>,
    open: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    server: RawServerSettings,
    #[serde(default)]
    bridges: Vec<RawBridgeEntry>,
}

impl RawBridgeEntry {
    fn into_bridge_entry(self, index: usize) -> ConfigResult<BridgeEntry> {
        let name = self.name.unwrap_or_else(|| format!("bridge{}", index));

        let listener: SocketAddr = self.listener.parse().map_err(|_| ConfigError::InvalidValue {
            key: "listener".to_string(),
            value: self.listener.clone(),
        })?;

        let parity = match self.parity {
            None => WireParity::None,
            Some(p) => {
                let letter = p.chars().next().ok_or_else(|| ConfigError::InvalidValue {
                    key: "parity".to_string(),
                    value: p.clone(),
                })?;
                WireParity::from_letter(letter).ok_or(ConfigError::InvalidValue {
                    key: "parity".to_string(),
                    value: p,
                })?
            }
        };

        let stopbits = match self.stopbits.as_deref() {
            None | Some("1") => WireStopBits::One,
            Some("2") => WireStopBits::Two,
            Some("1.5") => WireStopBits::OnePointFive,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "stopbits".to_string(),
                    value: other.to_string(),
                })
            }
        };

        let timeout = match self.timeout {
            None => Some(Duration::from_secs(3)),
            Some(-1) => None,
            Some(n) if n >= 0 => Some(Duration::from_secs(n as u64)),
            Some(n) => {
                return Err(ConfigError::InvalidValue {
                    key: "timeout".to_string(),
                    value: n.to_string(),
                })
            }
        };

        let tos = match self.tos.as_deref() {
            None | Some("normal") => TypeOfService::Normal,
            Some("lowdelay") => TypeOfService::LowDelay,
            Some("throughput") => TypeOfService::Throughput,
            Some("reliability") => TypeOfService::Reliability,
            Some("mincost") => TypeOfService::MinCost,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "tos".to_string(),
                    value: other.to_string(),
                })
            }
        };

        let mode = match self.mode.as_deref() {
            None | Some("rfc2217") => BridgeMode::Rfc2217,
            Some("raw") => BridgeMode::Raw,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "mode".to_string(),
                    value: other.to_string(),
                })
            }
        };

        let baudrate = self.baudrate.unwrap_or(9600);
        if baudrate == 0 {
            return Err(ConfigError::InvalidValue {
                key: "baudrate".to_string(),
                value: baudrate.to_string(),
            });
        }

        Ok(BridgeEntry {
            name,
            url: self.url,
            listener,
            baudrate,
            bytesize: self.bytesize.unwrap_or(8),
            parity,
            stopbits,
            xonxoff: self.xonxoff.unwrap_or(false),
            rtscts: self.rtscts.unwrap_or(false),
            timeout,
            no_delay: self.no_delay.unwrap_or(true),
            tos,
            mode,
            open: self.open.unwrap_or(true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_one_disabled_bridge() {
        let config = AppConfig::default();
        assert_eq!(config.bridges.len(), 1);
        assert!(!config.bridges[0].open);
    }

    #[test]
    fn parses_minimal_bridge_entry() {
        let doc = r#"{"bridges":[{"url":"/dev/ttyS0","listener":"127.0.0.1:2217"}]}"#;
        let config = AppConfig::parse(doc).unwrap();
        assert_eq!(config.bridges.len(), 1);
        assert_eq!(config.bridges[0].baudrate, 9600);
        assert_eq!(config.bridges[0].mode, BridgeMode::Rfc2217);
    }

    #[test]
    fn infinite_timeout_is_minus_one() {
        let doc = r#"{"bridges":[{"url":"/dev/ttyS0","listener":"127.0.0.1:2217","timeout":-1}]}"#;
        let config = AppConfig::parse(doc).unwrap();
        assert!(config.bridges[0].timeout.is_none());
    }

    #[test]
    fn invalid_listener_address_fails_fast() {
        let doc = r#"{"bridges":[{"url":"/dev/ttyS0","listener":"not-an-address"}]}"#;
        assert!(AppConfig::parse(doc).is_err());
    }

    #[test]
    fn parity_takes_first_letter_uppercased() {
        let doc = r#"{"bridges":[{"url":"/dev/ttyS0","listener":"127.0.0.1:2217","parity":"even"}]}"#;
        let config = AppConfig::parse(doc).unwrap();
        assert_eq!(config.bridges[0].parity, WireParity::Even);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let doc = r#"{"bridges":[{"url":"/dev/ttyS0","listener":"127.0.0.1:2217","mode":"bogus"}]}"#;
        assert!(AppConfig::parse(doc).is_err());
    }
}
