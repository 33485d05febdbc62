//! serialbridge: bridges local serial devices onto TCP, with full RFC 2217
//! Com Port Control support for remote clients that ask for it.
//!
//! The protocol engine itself - option negotiation, subnegotiation state,
//! the byte filter, modem status tracking - lives in the sibling
//! `telnet_rfc2217` crate. This crate is the application around it:
//! configuration, the per-connection bridge lifecycle, and the listener
//! accept loop.

pub mod bridge;
pub mod config;
pub mod errors;
pub mod listener;
pub mod serial_open;
