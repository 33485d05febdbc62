//! Per-option Telnet negotiation state.
//!
//! `TelnetOption` tracks exactly one option, from exactly one side's point of
//! view. A server and a client negotiating the same option code each hold
//! their own `TelnetOption` built from the four command octets their role
//! uses to drive it - the state machine itself never changes.

use std::sync::{Arc, Condvar, Mutex};

use crate::protocol::{DO, DONT, WILL, WONT};

/// Negotiation state of one option. `REALLY_INACTIVE` is distinct from
/// `INACTIVE`: it marks an option the far end has actively refused, so a
/// later poke does not re-request it blindly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionState {
    Requested,
    Active,
    Inactive,
    ReallyInactive,
}

/// A one-shot-ish event an option fires when it becomes active, and clears
/// whenever it leaves that state. Waiters block on the `Condvar` with a
/// deadline rather than spinning.
#[derive(Default)]
struct ActiveEvent {
    inner: Mutex<bool>,
    condvar: Condvar,
}

impl ActiveEvent {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(false),
            condvar: Condvar::new(),
        })
    }

    fn set(&self) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *guard = true;
        self.condvar.notify_all();
    }

    fn clear(&self) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *guard = false;
    }

    fn wait_timeout(&self, timeout: std::time::Duration) -> bool {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if *guard {
            return true;
        }
        let (guard, _) = self
            .condvar
            .wait_timeout(guard, timeout)
            .unwrap_or_else(|e| e.into_inner());
        *guard
    }

    fn is_set(&self) -> bool {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A capability to write a raw, already-framed byte sequence to the
/// connection, without going through the user write path. `TelnetOption` and
/// `TelnetSubnegotiation` hold one of these instead of a reference back to
/// their owner, so there is no parent pointer to manage (design note,
/// "No cyclic ownership").
pub trait WriteSink: Send + Sync {
    fn write_raw(&self, frame: &[u8]);
}

/// One Telnet option, tracked from one role's perspective.
///
/// `send_yes`/`send_no` are the commands this side emits (`WILL`/`WONT` if we
/// are offering the option, `DO`/`DONT` if we are requesting the peer enable
/// it). `ack_yes`/`ack_no` are the commands we expect back from the peer that
/// confirm or refuse.
pub struct TelnetOption {
    pub name: &'static str,
    pub option: u8,
    send_yes: u8,
    send_no: u8,
    ack_yes: u8,
    ack_no: u8,
    state: Mutex<OptionState>,
    active_event: Arc<ActiveEvent>,
    sink: Arc<dyn WriteSink>,
    on_activate: Option<Box<dyn Fn() + Send + Sync>>,
    on_deactivate: Option<Box<dyn Fn() + Send + Sync>>,
}

impl TelnetOption {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &'static str,
        option: u8,
        send_yes: u8,
        send_no: u8,
        ack_yes: u8,
        ack_no: u8,
        initial_state: OptionState,
        sink: Arc<dyn WriteSink>,
    ) -> Self {
        Self {
            name,
            option,
            send_yes,
            send_no,
            ack_yes,
            ack_no,
            state: Mutex::new(initial_state),
            active_event: ActiveEvent::new(),
            sink,
            on_activate: None,
            on_deactivate: None,
        }
    }

    pub fn with_callbacks(
        mut self,
        on_activate: impl Fn() + Send + Sync + 'static,
        on_deactivate: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.on_activate = Some(Box::new(on_activate));
        self.on_deactivate = Some(Box::new(on_deactivate));
        self
    }

    pub fn state(&self) -> OptionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn active(&self) -> bool {
        self.state() == OptionState::Active
    }

    pub fn wait_active(&self, timeout: std::time::Duration) -> bool {
        self.active_event.wait_timeout(timeout)
    }

    fn set_state(&self, new_state: OptionState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = new_state;
        if new_state == OptionState::Active {
            self.active_event.set();
        } else {
            self.active_event.clear();
        }
    }

    fn send(&self, command: u8) {
        self.sink.write_raw(&[crate::protocol::IAC, command, self.option]);
    }

    /// Table from §4.B: the only two commands a peer may legally send in
    /// response to our request are our own configured `ack_yes`/`ack_no`.
    /// Anything else is a protocol error and is ignored after logging.
    pub fn process_incoming(&self, command: u8) {
        let current = self.state();
        if command == self.ack_yes {
            match current {
                OptionState::Requested => self.activate(false),
                OptionState::Active => {}
                OptionState::Inactive => self.activate(true),
                OptionState::ReallyInactive => self.send(self.send_no),
            }
        } else if command == self.ack_no {
            match current {
                OptionState::Requested => self.deactivate(false),
                OptionState::Active => self.deactivate(true),
                OptionState::Inactive => {}
                OptionState::ReallyInactive => {}
            }
        } else {
            log::warn!(
                "option {}: unexpected command {} while in state {:?}",
                self.name,
                command,
                current
            );
        }
    }

    pub fn activate(&self, send: bool) {
        self.set_state(OptionState::Active);
        if send {
            self.send(self.send_yes);
        }
        if let Some(cb) = &self.on_activate {
            cb();
        }
    }

    pub fn deactivate(&self, send: bool) {
        self.set_state(OptionState::Inactive);
        if send {
            self.send(self.send_no);
        }
        if let Some(cb) = &self.on_deactivate {
            cb();
        }
    }

    /// Sent once at connection start for any option whose initial state is
    /// `Requested`.
    pub fn send_initial_request(&self) {
        if self.state() == OptionState::Requested {
            self.send(self.send_yes);
        }
    }
}

impl std::fmt::Debug for TelnetOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{:?}", self.name, self.state())
    }
}

/// `true` for the commands this module understands as negotiation verbs;
/// used by `TelnetFilter` to decide whether a command byte starts a
/// negotiation or should be dispatched as a plain command.
pub fn is_negotiation_verb(byte: u8) -> bool {
    matches!(byte, WILL | WONT | DO | DONT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct RecordingSink(Arc<StdMutex<Vec<u8>>>);
    impl WriteSink for RecordingSink {
        fn write_raw(&self, frame: &[u8]) {
            self.0.lock().unwrap().extend_from_slice(frame);
        }
    }

    fn option_with_sink(initial: OptionState) -> (TelnetOption, Arc<StdMutex<Vec<u8>>>) {
        let buf = Arc::new(StdMutex::new(Vec::new()));
        let sink: Arc<dyn WriteSink> = Arc::new(RecordingSink(buf.clone()));
        let opt = TelnetOption::new("test", 0x2C, WILL, WONT, DO, DONT, initial, sink);
        (opt, buf)
    }

    #[test]
    fn requested_ack_yes_activates_without_resend() {
        let (opt, buf) = option_with_sink(OptionState::Requested);
        opt.process_incoming(DO);
        assert_eq!(opt.state(), OptionState::Active);
        assert!(buf.lock().unwrap().is_empty());
    }

    #[test]
    fn requested_ack_no_goes_inactive() {
        let (opt, _) = option_with_sink(OptionState::Requested);
        opt.process_incoming(DONT);
        assert_eq!(opt.state(), OptionState::Inactive);
    }

    #[test]
    fn inactive_ack_yes_activates_and_replies() {
        let (opt, buf) = option_with_sink(OptionState::Inactive);
        opt.process_incoming(DO);
        assert_eq!(opt.state(), OptionState::Active);
        assert_eq!(&buf.lock().unwrap()[..], &[crate::protocol::IAC, WILL, 0x2C]);
    }

    #[test]
    fn active_ack_no_deactivates_and_replies() {
        let (opt, buf) = option_with_sink(OptionState::Active);
        opt.process_incoming(DONT);
        assert_eq!(opt.state(), OptionState::Inactive);
        assert_eq!(&buf.lock().unwrap()[..], &[crate::protocol::IAC, WONT, 0x2C]);
    }

    #[test]
    fn really_inactive_ack_yes_is_refused_again() {
        let (opt, buf) = option_with_sink(OptionState::ReallyInactive);
        opt.process_incoming(DO);
        assert_eq!(opt.state(), OptionState::ReallyInactive);
        assert_eq!(&buf.lock().unwrap()[..], &[crate::protocol::IAC, WONT, 0x2C]);
    }

    #[test]
    fn activation_callback_fires_once_per_activation() {
        let buf = Arc::new(StdMutex::new(Vec::new()));
        let sink: Arc<dyn WriteSink> = Arc::new(RecordingSink(buf.clone()));
        let calls = Arc::new(StdMutex::new(0u32));
        let calls_cloned = calls.clone();
        let opt = TelnetOption::new("test", 0x2C, WILL, WONT, DO, DONT, OptionState::Requested, sink)
            .with_callbacks(move || *calls_cloned.lock().unwrap() += 1, || {});
        opt.process_incoming(DO);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn wait_active_returns_promptly_once_set() {
        let (opt, _) = option_with_sink(OptionState::Requested);
        opt.process_incoming(DO);
        assert!(opt.wait_active(std::time::Duration::from_millis(10)));
    }
}
