//! Byte-level separation of in-band data from Telnet commands and RFC 2217
//! subnegotiation frames.
//!
//! `TelnetFilter` is deliberately free of any RFC 2217 semantics: it only
//! knows the three-state IAC state machine (Testable Property 5). Everything
//! it recognizes as a command, negotiation, or subnegotiation block is handed
//! to a [`FilterSink`] rather than interpreted here, so the same filter
//! serves both `PortManager` (server role) and `ClientSession` (client role).

use crate::protocol::{DO, DONT, IAC, SB, SE, WILL, WONT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterState {
    Normal,
    IacSeen,
    Negotiate,
}

/// Receives the side effects of bytes `TelnetFilter` recognizes as non-data.
pub trait FilterSink {
    fn process_subnegotiation(&mut self, buf: &[u8]);
    fn process_command(&mut self, command: u8);
    fn negotiate_option(&mut self, command: u8, option: u8);
}

pub struct TelnetFilter {
    state: FilterState,
    pending_command: u8,
    suboption: Option<Vec<u8>>,
}

impl Default for TelnetFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl TelnetFilter {
    pub fn new() -> Self {
        Self {
            state: FilterState::Normal,
            pending_command: 0,
            suboption: None,
        }
    }

    /// Feeds `input` through the filter, dispatching side effects to `sink`
    /// and returning the in-band data bytes observed in this chunk. An
    /// unterminated subnegotiation at the end of `input` holds its bytes in
    /// the internal accumulator and emits nothing for them (Testable
    /// Property 5) until a later call supplies the matching `IAC SE`.
    pub fn process(&mut self, input: &[u8], sink: &mut impl FilterSink) -> Vec<u8> {
        let mut data = Vec::with_capacity(input.len());
        for &byte in input {
            match self.state {
                FilterState::Normal => {
                    if byte == IAC {
                        self.state = FilterState::IacSeen;
                    } else if let Some(buf) = self.suboption.as_mut() {
                        buf.push(byte);
                    } else {
                        data.push(byte);
                    }
                }
                FilterState::IacSeen => {
                    if byte == IAC {
                        if let Some(buf) = self.suboption.as_mut() {
                            buf.push(IAC);
                        } else {
                            data.push(IAC);
                        }
                        self.state = FilterState::Normal;
                    } else if byte == SB {
                        self.suboption = Some(Vec::new());
                        self.state = FilterState::Normal;
                    } else if byte == SE {
                        let buf = self.suboption.take().unwrap_or_default();
                        sink.process_subnegotiation(&buf);
                        self.state = FilterState::Normal;
                    } else if matches!(byte, WILL | WONT | DO | DONT) {
                        self.pending_command = byte;
                        self.state = FilterState::Negotiate;
                    } else {
                        sink.process_command(byte);
                        self.state = FilterState::Normal;
                    }
                }
                FilterState::Negotiate => {
                    sink.negotiate_option(self.pending_command, byte);
                    self.state = FilterState::Normal;
                }
            }
        }
        data
    }

    /// Doubles every `IAC` byte in `data`, the inverse transform of
    /// `process`'s NORMAL-mode decoding (Testable Property 1).
    pub fn encode(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(data.len());
        for &b in data {
            out.push(b);
            if b == IAC {
                out.push(IAC);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        subnegotiations: Vec<Vec<u8>>,
        commands: Vec<u8>,
        negotiations: Vec<(u8, u8)>,
    }

    impl FilterSink for RecordingSink {
        fn process_subnegotiation(&mut self, buf: &[u8]) {
            self.subnegotiations.push(buf.to_vec());
        }
        fn process_command(&mut self, command: u8) {
            self.commands.push(command);
        }
        fn negotiate_option(&mut self, command: u8, option: u8) {
            self.negotiations.push((command, option));
        }
    }

    #[test]
    fn plain_data_passes_through() {
        let mut filter = TelnetFilter::new();
        let mut sink = RecordingSink::default();
        let out = filter.process(b"hello", &mut sink);
        assert_eq!(out, b"hello");
    }

    #[test]
    fn doubled_iac_decodes_to_single_byte() {
        let mut filter = TelnetFilter::new();
        let mut sink = RecordingSink::default();
        let out = filter.process(&[0x41, IAC, IAC, 0x42], &mut sink);
        assert_eq!(out, vec![0x41, IAC, 0x42]);
    }

    #[test]
    fn negotiation_is_dispatched_not_emitted() {
        let mut filter = TelnetFilter::new();
        let mut sink = RecordingSink::default();
        let out = filter.process(&[IAC, WILL, 0x2C], &mut sink);
        assert!(out.is_empty());
        assert_eq!(sink.negotiations, vec![(WILL, 0x2C)]);
    }

    #[test]
    fn subnegotiation_is_accumulated_and_dispatched_on_se() {
        let mut filter = TelnetFilter::new();
        let mut sink = RecordingSink::default();
        let out = filter.process(&[IAC, SB, 0x2C, 0x01, 0x00, IAC, SE], &mut sink);
        assert!(out.is_empty());
        assert_eq!(sink.subnegotiations, vec![vec![0x2C, 0x01, 0x00]]);
    }

    #[test]
    fn unterminated_subnegotiation_emits_nothing() {
        let mut filter = TelnetFilter::new();
        let mut sink = RecordingSink::default();
        let out = filter.process(&[IAC, SB, 0x2C, 0x01], &mut sink);
        assert!(out.is_empty());
        assert!(sink.subnegotiations.is_empty());
    }

    #[test]
    fn subnegotiation_can_span_multiple_calls() {
        let mut filter = TelnetFilter::new();
        let mut sink = RecordingSink::default();
        filter.process(&[IAC, SB, 0x2C, 0x01], &mut sink);
        filter.process(&[0x00, IAC, SE], &mut sink);
        assert_eq!(sink.subnegotiations, vec![vec![0x2C, 0x01, 0x00]]);
    }

    #[test]
    fn other_command_is_dispatched() {
        let mut filter = TelnetFilter::new();
        let mut sink = RecordingSink::default();
        filter.process(&[IAC, 241], &mut sink);
        assert_eq!(sink.commands, vec![241]);
    }

    #[test]
    fn filter_returns_to_normal_after_every_sequence() {
        let mut filter = TelnetFilter::new();
        let mut sink = RecordingSink::default();
        filter.process(&[IAC, WILL, 0x01], &mut sink);
        let out = filter.process(b"x", &mut sink);
        assert_eq!(out, b"x");
    }

    #[test]
    fn encode_doubles_iac_bytes() {
        assert_eq!(TelnetFilter::encode(&[0x41, IAC, 0x42]), vec![0x41, IAC, IAC, 0x42]);
    }

    #[test]
    fn encode_decode_round_trips() {
        let original = vec![0x00, IAC, 0xFE, 0x7F, IAC, IAC];
        let encoded = TelnetFilter::encode(&original);
        let mut filter = TelnetFilter::new();
        let mut sink = RecordingSink::default();
        let decoded = filter.process(&encoded, &mut sink);
        assert_eq!(decoded, original);
    }
}
