//! Wire-level constants for Telnet (RFC 854) and the RFC 2217 Com Port
//! Control option.
//!
//! Everything here is a constant or a thin enum over a constant; there is no
//! state in this module. [`option`](crate::option) and
//! [`subnegotiation`](crate::subnegotiation) build the state machines on top
//! of these bytes.

/// IAC - Interpret As Command. Any data byte equal to 255 must be doubled
/// (`IAC IAC`) so it is not mistaken for a command introducer.
pub const IAC: u8 = 255;

/// Subnegotiation begin / end (RFC 855): `IAC SB <option> <data…> IAC SE`.
pub const SB: u8 = 250;
pub const SE: u8 = 240;

/// Telnet four-way negotiation primitives (RFC 854).
pub const WILL: u8 = 251;
pub const WONT: u8 = 252;
pub const DO: u8 = 253;
pub const DONT: u8 = 254;

/// Other simple Telnet commands that may appear outside negotiation. RFC 2217
/// traffic never relies on these; they are recognized only so that
/// `TelnetFilter` can dispatch them instead of misreading them as data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TelnetCommand {
    NOP = 241,
    DM = 242,
    BRK = 243,
    IP = 244,
    AO = 245,
    AYT = 246,
    EC = 247,
    EL = 248,
    GA = 249,
}

impl TelnetCommand {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            241 => Some(Self::NOP),
            242 => Some(Self::DM),
            243 => Some(Self::BRK),
            244 => Some(Self::IP),
            245 => Some(Self::AO),
            246 => Some(Self::AYT),
            247 => Some(Self::EC),
            248 => Some(Self::EL),
            249 => Some(Self::GA),
            _ => None,
        }
    }
}

/// Telnet option codes relevant to an RFC 2217 bridge. Most peers a bridge
/// talks to only ever bring up ECHO/SGA/BINARY/COM_PORT_OPTION; anything else
/// offered by a remote peer is rejected (see `PortManager`/`ClientSession`).
pub const BINARY: u8 = 0;
pub const ECHO: u8 = 1;
pub const SGA: u8 = 3;
pub const TERMINAL_TYPE: u8 = 24;
pub const NAWS: u8 = 31;

/// The RFC 2217 Com Port Control option.
pub const COM_PORT_OPTION: u8 = 0x2C;

/// RFC 2217 sub-option codes, client → server direction.
pub const SET_BAUDRATE: u8 = 1;
pub const SET_DATASIZE: u8 = 2;
pub const SET_PARITY: u8 = 3;
pub const SET_STOPSIZE: u8 = 4;
pub const SET_CONTROL: u8 = 5;
pub const NOTIFY_LINESTATE: u8 = 6;
pub const NOTIFY_MODEMSTATE: u8 = 7;
pub const FLOWCONTROL_SUSPEND: u8 = 8;
pub const FLOWCONTROL_RESUME: u8 = 9;
pub const SET_LINESTATE_MASK: u8 = 10;
pub const SET_MODEMSTATE_MASK: u8 = 11;
pub const PURGE_DATA: u8 = 12;

/// Server → client acknowledgement codes. RFC 2217 defines these as the
/// matching client code plus 0x64 (100).
pub const SERVER_SET_BAUDRATE: u8 = SET_BAUDRATE + 100;
pub const SERVER_SET_DATASIZE: u8 = SET_DATASIZE + 100;
pub const SERVER_SET_PARITY: u8 = SET_PARITY + 100;
pub const SERVER_SET_STOPSIZE: u8 = SET_STOPSIZE + 100;
pub const SERVER_SET_CONTROL: u8 = SET_CONTROL + 100;
pub const SERVER_NOTIFY_LINESTATE: u8 = NOTIFY_LINESTATE + 100;
pub const SERVER_NOTIFY_MODEMSTATE: u8 = NOTIFY_MODEMSTATE + 100;
pub const SERVER_FLOWCONTROL_SUSPEND: u8 = FLOWCONTROL_SUSPEND + 100;
pub const SERVER_FLOWCONTROL_RESUME: u8 = FLOWCONTROL_RESUME + 100;
pub const SERVER_SET_LINESTATE_MASK: u8 = SET_LINESTATE_MASK + 100;
pub const SERVER_SET_MODEMSTATE_MASK: u8 = SET_MODEMSTATE_MASK + 100;
pub const SERVER_PURGE_DATA: u8 = PURGE_DATA + 100;

/// `SET_CONTROL` payload values (RFC 2217 §3.6).
pub const SET_CONTROL_REQ_FLOW_SETTING: u8 = 0x00;
pub const SET_CONTROL_USE_NO_FLOW_CONTROL: u8 = 0x01;
pub const SET_CONTROL_USE_SW_FLOW_CONTROL: u8 = 0x02;
pub const SET_CONTROL_USE_HW_FLOW_CONTROL: u8 = 0x03;
pub const SET_CONTROL_REQ_BREAK_STATE: u8 = 0x04;
pub const SET_CONTROL_BREAK_ON: u8 = 0x05;
pub const SET_CONTROL_BREAK_OFF: u8 = 0x06;
pub const SET_CONTROL_REQ_DTR: u8 = 0x07;
pub const SET_CONTROL_DTR_ON: u8 = 0x08;
pub const SET_CONTROL_DTR_OFF: u8 = 0x09;
pub const SET_CONTROL_REQ_RTS: u8 = 0x0A;
pub const SET_CONTROL_RTS_ON: u8 = 0x0B;
pub const SET_CONTROL_RTS_OFF: u8 = 0x0C;
// Inbound-flow variants. Acknowledged but not wired to a serial device
// (design note, not an oversight): no server in the wild drives these.
pub const SET_CONTROL_REQ_FLOW_SETTING_IN: u8 = 0x0D;
pub const SET_CONTROL_USE_NO_FLOW_CONTROL_IN: u8 = 0x0E;
pub const SET_CONTROL_USE_SW_FLOW_CONTROL_IN: u8 = 0x0F;
pub const SET_CONTROL_USE_HW_FLOW_CONTROL_IN: u8 = 0x10;
pub const SET_CONTROL_USE_DCD_FLOW_CONTROL: u8 = 0x11;
pub const SET_CONTROL_USE_DTR_FLOW_CONTROL: u8 = 0x12;
pub const SET_CONTROL_USE_DSR_FLOW_CONTROL: u8 = 0x13;

/// Modem status bits, as carried in a `SERVER_NOTIFY_MODEMSTATE` payload.
/// The low nibble carries "changed since last notification" deltas for the
/// same four lines.
pub const MODEMSTATE_MASK_CTS: u8 = 0x10;
pub const MODEMSTATE_MASK_DSR: u8 = 0x20;
pub const MODEMSTATE_MASK_RI: u8 = 0x40;
pub const MODEMSTATE_MASK_CD: u8 = 0x80;
pub const MODEMSTATE_MASK_CTS_CHANGE: u8 = 0x01;
pub const MODEMSTATE_MASK_DSR_CHANGE: u8 = 0x02;
pub const MODEMSTATE_MASK_RI_CHANGE: u8 = 0x04;
pub const MODEMSTATE_MASK_CD_CHANGE: u8 = 0x08;

/// Line status bits, as carried in a `SERVER_NOTIFY_LINESTATE` payload.
pub const LINESTATE_MASK_DATA_READY: u8 = 0x01;
pub const LINESTATE_MASK_OVERRUN_ERROR: u8 = 0x02;
pub const LINESTATE_MASK_PARITY_ERROR: u8 = 0x04;
pub const LINESTATE_MASK_FRAMING_ERROR: u8 = 0x08;
pub const LINESTATE_MASK_BREAK_DETECT: u8 = 0x10;
pub const LINESTATE_MASK_TRANSREG_EMPTY: u8 = 0x20;
pub const LINESTATE_MASK_SHIFTREG_EMPTY: u8 = 0x40;
pub const LINESTATE_MASK_TIMEOUT: u8 = 0x80;

/// `PURGE_DATA` payload values.
pub const PURGE_RECEIVE_BUFFER: u8 = 1;
pub const PURGE_TRANSMIT_BUFFER: u8 = 2;
pub const PURGE_BOTH_BUFFERS: u8 = 3;

/// Parity as carried over the wire by `SET_PARITY`/`SERVER_SET_PARITY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireParity {
    None = 1,
    Odd = 2,
    Even = 3,
    Mark = 4,
    Space = 5,
}

impl WireParity {
    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::None),
            2 => Some(Self::Odd),
            3 => Some(Self::Even),
            4 => Some(Self::Mark),
            5 => Some(Self::Space),
            _ => None,
        }
    }

    /// The first letter of the parity name, upper-cased, as accepted by
    /// configuration documents (§6.4: "`parity` is taken as the first letter
    /// upper-cased").
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'N' => Some(Self::None),
            'O' => Some(Self::Odd),
            'E' => Some(Self::Even),
            'M' => Some(Self::Mark),
            'S' => Some(Self::Space),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Self::None => 'N',
            Self::Odd => 'O',
            Self::Even => 'E',
            Self::Mark => 'M',
            Self::Space => 'S',
        }
    }
}

/// Stop bits as carried over the wire by `SET_STOPSIZE`/`SERVER_SET_STOPSIZE`.
/// Note the wire encodes "one and a half" as 3, not 2 - two is "two".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireStopBits {
    One = 1,
    Two = 2,
    OnePointFive = 3,
}

impl WireStopBits {
    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            3 => Some(Self::OnePointFive),
            _ => None,
        }
    }
}
