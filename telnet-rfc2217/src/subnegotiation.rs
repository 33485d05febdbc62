//! RFC 2217 sub-option value tracking.
//!
//! A `TelnetSubnegotiation` is the sub-option analogue of `TelnetOption`: it
//! tracks a *value* rather than a yes/no switch, and activates only when the
//! far end echoes back a value matching (by prefix) what was requested.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::option::WriteSink;
use crate::protocol::{COM_PORT_OPTION, IAC, SB, SE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubState {
    Inactive,
    Requested,
    Active,
    ReallyInactive,
}

/// Returned by [`TelnetSubnegotiation::wait`] when the far end never answers
/// in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutError;

impl std::fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timed out waiting for subnegotiation acknowledgement")
    }
}
impl std::error::Error for TimeoutError {}

/// Raised by [`TelnetSubnegotiation::is_ready`] when the peer rejected the
/// requested value outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedError(pub String);

impl std::fmt::Display for RejectedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "remote rejected value for option {:?}", self.0)
    }
}
impl std::error::Error for RejectedError {}

struct Inner {
    value: Option<Vec<u8>>,
    state: SubState,
}

pub struct TelnetSubnegotiation {
    pub name: &'static str,
    option: u8,
    ack_option: u8,
    inner: Mutex<Inner>,
    event: Condvar,
    sink: Arc<dyn WriteSink>,
}

/// Builds and sends `IAC SB COM_PORT_OPTION <option> <value'> IAC SE`,
/// doubling any `IAC` byte inside `value` (Testable Property 7). Used both by
/// [`TelnetSubnegotiation::set`] (client role, requesting a change) and by the
/// server role replying with an acknowledgement carrying an ack-option code.
pub fn send_subnegotiation_frame(sink: &dyn WriteSink, option: u8, value: &[u8]) {
    let mut frame = Vec::with_capacity(value.len() * 2 + 6);
    frame.push(IAC);
    frame.push(SB);
    frame.push(COM_PORT_OPTION);
    frame.push(option);
    for &b in value {
        frame.push(b);
        if b == IAC {
            frame.push(IAC);
        }
    }
    frame.push(IAC);
    frame.push(SE);
    sink.write_raw(&frame);
}

impl TelnetSubnegotiation {
    pub fn new(name: &'static str, option: u8, ack_option: u8, sink: Arc<dyn WriteSink>) -> Self {
        Self {
            name,
            option,
            ack_option,
            inner: Mutex::new(Inner {
                value: None,
                state: SubState::Inactive,
            }),
            event: Condvar::new(),
            sink,
        }
    }

    pub fn ack_option(&self) -> u8 {
        self.ack_option
    }

    pub fn state(&self) -> SubState {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).state
    }

    /// Request a change of value: records it, marks `Requested`, and sends
    /// `IAC SB COM_PORT_OPTION <option> <value'> IAC SE` with any `IAC` byte
    /// inside `value` doubled (Testable Property 7).
    pub fn set(&self, value: &[u8]) {
        {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.value = Some(value.to_vec());
            inner.state = SubState::Requested;
        }
        self.event.notify_all();

        send_subnegotiation_frame(self.sink.as_ref(), self.option, value);
        log::debug!("SB requesting {} -> {:?}", self.name, value);
    }

    /// Checks an inbound acknowledgement body (already stripped of the
    /// `COM_PORT_OPTION` and ack-option header bytes).
    pub fn check_answer(&self, reply: &[u8]) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let matches = match &inner.value {
            Some(v) => reply.len() >= v.len() && &reply[..v.len()] == v.as_slice(),
            None => false,
        };
        inner.state = if matches {
            SubState::Active
        } else {
            SubState::ReallyInactive
        };
        drop(inner);
        self.event.notify_all();
        log::debug!("SB answer {} -> {:?}", self.name, reply);
    }

    /// `true` once the server has confirmed the requested value.
    /// Returns `Err` if the remote end actively rejected it.
    pub fn is_ready(&self) -> Result<bool, RejectedError> {
        match self.state() {
            SubState::ReallyInactive => Err(RejectedError(self.name.to_string())),
            SubState::Active => Ok(true),
            _ => Ok(false),
        }
    }

    pub fn wait(&self, timeout: Duration) -> Result<(), TimeoutError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if matches!(inner.state, SubState::Active | SubState::ReallyInactive) {
            return Ok(());
        }
        let (guard, result) = self
            .event
            .wait_timeout_while(inner, timeout, |inner| {
                matches!(inner.state, SubState::Requested)
            })
            .unwrap_or_else(|e| e.into_inner());
        drop(guard);
        if result.timed_out() {
            Err(TimeoutError)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for TelnetSubnegotiation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{:?}", self.name, self.state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct RecordingSink(StdMutex<Vec<u8>>);
    impl WriteSink for RecordingSink {
        fn write_raw(&self, frame: &[u8]) {
            self.0.lock().unwrap().extend_from_slice(frame);
        }
    }

    #[test]
    fn set_frames_with_iac_doubling() {
        let sink: Arc<dyn WriteSink> = Arc::new(RecordingSink(StdMutex::new(Vec::new())));
        let sub = TelnetSubnegotiation::new("baudrate", 1, 101, sink.clone());
        sub.set(&[0x00, 0x01, 0xFF, 0x00]);
        assert_eq!(sub.state(), SubState::Requested);
    }

    #[test]
    fn matching_prefix_activates() {
        let sink: Arc<dyn WriteSink> = Arc::new(RecordingSink(StdMutex::new(Vec::new())));
        let sub = TelnetSubnegotiation::new("baudrate", 1, 101, sink);
        sub.set(&[0x00, 0x01, 0xC2, 0x00]);
        sub.check_answer(&[0x00, 0x01, 0xC2, 0x00]);
        assert_eq!(sub.state(), SubState::Active);
        assert_eq!(sub.is_ready().unwrap(), true);
    }

    #[test]
    fn mismatched_reply_marks_really_inactive() {
        let sink: Arc<dyn WriteSink> = Arc::new(RecordingSink(StdMutex::new(Vec::new())));
        let sub = TelnetSubnegotiation::new("baudrate", 1, 101, sink);
        sub.set(&[0x00, 0x01, 0xC2, 0x00]);
        sub.check_answer(&[0x00, 0x00, 0x00, 0x01]);
        assert_eq!(sub.state(), SubState::ReallyInactive);
        assert!(sub.is_ready().is_err());
    }

    #[test]
    fn wait_times_out_without_answer() {
        let sink: Arc<dyn WriteSink> = Arc::new(RecordingSink(StdMutex::new(Vec::new())));
        let sub = TelnetSubnegotiation::new("baudrate", 1, 101, sink);
        sub.set(&[0x00, 0x01, 0xC2, 0x00]);
        assert!(sub.wait(Duration::from_millis(10)).is_err());
    }

    #[test]
    fn wait_returns_once_answered() {
        let sink: Arc<dyn WriteSink> = Arc::new(RecordingSink(StdMutex::new(Vec::new())));
        let sub = TelnetSubnegotiation::new("baudrate", 1, 101, sink);
        sub.set(&[0x00, 0x01, 0xC2, 0x00]);
        sub.check_answer(&[0x00, 0x01, 0xC2, 0x00]);
        assert!(sub.wait(Duration::from_millis(10)).is_ok());
    }
}
