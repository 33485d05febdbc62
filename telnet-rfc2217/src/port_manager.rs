//! Server-role RFC 2217 state: owns the fixed set of Telnet options, drives
//! the byte filter over inbound traffic, and reacts to Com Port Control
//! sub-options by calling into a [`SerialDevice`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::filter::{FilterSink, TelnetFilter};
use crate::modem::{self, ModemLines};
use crate::option::{OptionState, TelnetOption, WriteSink};
use crate::protocol::*;
use crate::serial::SerialDevice;
use crate::subnegotiation::send_subnegotiation_frame;

struct ModemNotifyState {
    last_modemstate: u8,
    modemstate_mask: u8,
    linestate_mask: u8,
}

/// Writes directly to the TCP socket, serialized behind a lock so that user
/// data and protocol replies never interleave within a frame (§5, §9).
pub trait RawConnection: Send + Sync {
    fn write_raw(&self, data: &[u8]);
}

struct ConnectionSink(Arc<dyn RawConnection>);
impl WriteSink for ConnectionSink {
    fn write_raw(&self, frame: &[u8]) {
        self.0.write_raw(frame);
    }
}

pub struct PortManager {
    serial: Arc<Mutex<Box<dyn SerialDevice>>>,
    sink: Arc<dyn WriteSink>,
    options: Vec<TelnetOption>,
    client_is_rfc2217: AtomicBool,
    remote_suspend_flow: AtomicBool,
    modem: Mutex<ModemNotifyState>,
    filter: Mutex<TelnetFilter>,
}

impl PortManager {
    /// `serial` is shared with the caller so the serial->tcp pump task can
    /// read the same device this manager writes configuration changes to.
    pub fn new(serial: Arc<Mutex<Box<dyn SerialDevice>>>, connection: Arc<dyn RawConnection>) -> Arc<Self> {
        let sink: Arc<dyn WriteSink> = Arc::new(ConnectionSink(connection));

        let options = vec![
            TelnetOption::new("ECHO", ECHO, WILL, WONT, DO, DONT, OptionState::Requested, sink.clone()),
            TelnetOption::new("we-SGA", SGA, WILL, WONT, DO, DONT, OptionState::Requested, sink.clone()),
            TelnetOption::new("they-SGA", SGA, DO, DONT, WILL, WONT, OptionState::Inactive, sink.clone()),
            TelnetOption::new("we-BINARY", BINARY, WILL, WONT, DO, DONT, OptionState::Inactive, sink.clone()),
            TelnetOption::new(
                "they-BINARY",
                BINARY,
                DO,
                DONT,
                WILL,
                WONT,
                OptionState::Requested,
                sink.clone(),
            ),
            TelnetOption::new(
                "we-RFC2217",
                COM_PORT_OPTION,
                WILL,
                WONT,
                DO,
                DONT,
                OptionState::Requested,
                sink.clone(),
            ),
            TelnetOption::new(
                "they-RFC2217",
                COM_PORT_OPTION,
                DO,
                DONT,
                WILL,
                WONT,
                OptionState::Inactive,
                sink.clone(),
            ),
        ];

        let manager = Arc::new(Self {
            serial,
            sink,
            options,
            client_is_rfc2217: AtomicBool::new(false),
            remote_suspend_flow: AtomicBool::new(false),
            modem: Mutex::new(ModemNotifyState {
                last_modemstate: 0,
                modemstate_mask: 0xFF,
                linestate_mask: 0,
            }),
            filter: Mutex::new(TelnetFilter::new()),
        });

        log::debug!("requesting initial Telnet/RFC2217 options");
        for option in &manager.options {
            option.send_initial_request();
        }
        manager
    }

    /// Runs inbound bytes through the filter, returning in-band data to be
    /// forwarded to the serial device (§4.G step 3, tcp→serial task).
    pub fn filter(&self, input: &[u8]) -> Vec<u8> {
        let mut filter = self.filter.lock().unwrap_or_else(|e| e.into_inner());
        filter.process(input, &mut PortManagerSink(self))
    }

    /// Doubles IAC in outbound serial data before it goes to the socket
    /// (§4.G step 3, serial→tcp task).
    pub fn escape(data: &[u8]) -> Vec<u8> {
        TelnetFilter::encode(data)
    }

    pub fn client_is_rfc2217(&self) -> bool {
        self.client_is_rfc2217.load(Ordering::SeqCst)
    }

    fn negotiate(&self, command: u8, option: u8) {
        let mut known = false;
        for telnet_option in &self.options {
            if telnet_option.option == option {
                known = true;
                telnet_option.process_incoming(command);
                if telnet_option.active()
                    && (telnet_option.name == "we-RFC2217" || telnet_option.name == "they-RFC2217")
                    && !self.client_is_rfc2217.swap(true, Ordering::SeqCst)
                {
                    self.check_modem_lines(true);
                }
            }
        }
        if !known && (command == WILL || command == DO) {
            let reply = if command == WILL { WONT } else { DONT };
            self.sink.write_raw(&[IAC, reply, option]);
            log::warn!("rejected unsupported Telnet option {}", option);
        }
    }

    fn dispatch_subnegotiation(&self, buf: &[u8]) {
        if buf.first().copied() != Some(COM_PORT_OPTION) {
            log::warn!("ignoring subnegotiation for unsupported option: {:?}", buf);
            return;
        }
        let Some(&subcmd) = buf.get(1) else {
            log::warn!("ignoring empty COM_PORT_OPTION subnegotiation");
            return;
        };
        let payload = &buf[2..];
        match subcmd {
            SET_BAUDRATE => self.handle_set_baudrate(payload),
            SET_DATASIZE => self.handle_set_datasize(payload),
            SET_PARITY => self.handle_set_parity(payload),
            SET_STOPSIZE => self.handle_set_stopsize(payload),
            SET_CONTROL => self.handle_set_control(payload),
            NOTIFY_LINESTATE => self.reply(SERVER_NOTIFY_LINESTATE, &[0x00]),
            NOTIFY_MODEMSTATE => self.check_modem_lines(true),
            FLOWCONTROL_SUSPEND => self.remote_suspend_flow.store(true, Ordering::SeqCst),
            FLOWCONTROL_RESUME => self.remote_suspend_flow.store(false, Ordering::SeqCst),
            SET_LINESTATE_MASK => {
                if let Some(&mask) = payload.first() {
                    self.modem.lock().unwrap_or_else(|e| e.into_inner()).linestate_mask = mask;
                }
            }
            SET_MODEMSTATE_MASK => {
                if let Some(&mask) = payload.first() {
                    self.modem.lock().unwrap_or_else(|e| e.into_inner()).modemstate_mask = mask;
                }
            }
            PURGE_DATA => self.handle_purge(payload),
            other => log::warn!("ignoring unknown COM_PORT_OPTION sub-command: {}", other),
        }
    }

    fn reply(&self, ack_option: u8, value: &[u8]) {
        send_subnegotiation_frame(self.sink.as_ref(), ack_option, value);
    }

    fn handle_set_baudrate(&self, payload: &[u8]) {
        if payload.len() < 4 {
            log::warn!("SET_BAUDRATE: short payload");
            return;
        }
        let requested = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
        if requested != 0 {
            let mut serial = self.serial.lock().unwrap_or_else(|e| e.into_inner());
            if let Err(e) = serial.set_baudrate(requested) {
                log::warn!("SET_BAUDRATE {}: {}", requested, e);
            }
        }
        let current = self.serial.lock().unwrap_or_else(|e| e.into_inner()).baudrate();
        self.reply(SERVER_SET_BAUDRATE, &current.to_be_bytes());
    }

    fn handle_set_datasize(&self, payload: &[u8]) {
        if let Some(&requested) = payload.first() {
            if requested != 0 {
                let mut serial = self.serial.lock().unwrap_or_else(|e| e.into_inner());
                if let Err(e) = serial.set_bytesize(requested) {
                    log::warn!("SET_DATASIZE {}: {}", requested, e);
                }
            }
        }
        let current = self.serial.lock().unwrap_or_else(|e| e.into_inner()).bytesize();
        self.reply(SERVER_SET_DATASIZE, &[current]);
    }

    fn handle_set_parity(&self, payload: &[u8]) {
        if let Some(&requested) = payload.first() {
            if requested != 0 {
                match WireParity::from_wire(requested) {
                    Some(parity) => {
                        let mut serial = self.serial.lock().unwrap_or_else(|e| e.into_inner());
                        if let Err(e) = serial.set_parity(parity) {
                            log::warn!("SET_PARITY {:?}: {}", parity, e);
                        }
                    }
                    None => log::warn!("SET_PARITY: invalid value {}", requested),
                }
            }
        }
        let current = self.serial.lock().unwrap_or_else(|e| e.into_inner()).parity();
        self.reply(SERVER_SET_PARITY, &[current as u8]);
    }

    fn handle_set_stopsize(&self, payload: &[u8]) {
        if let Some(&requested) = payload.first() {
            if requested != 0 {
                match WireStopBits::from_wire(requested) {
                    Some(stopbits) => {
                        let mut serial = self.serial.lock().unwrap_or_else(|e| e.into_inner());
                        if let Err(e) = serial.set_stopbits(stopbits) {
                            log::warn!("SET_STOPSIZE {:?}: {}", stopbits, e);
                        }
                    }
                    None => log::warn!("SET_STOPSIZE: invalid value {}", requested),
                }
            }
        }
        let current = self.serial.lock().unwrap_or_else(|e| e.into_inner()).stopbits();
        self.reply(SERVER_SET_STOPSIZE, &[current as u8]);
    }

    fn handle_set_control(&self, payload: &[u8]) {
        let Some(&value) = payload.first() else {
            log::warn!("SET_CONTROL: empty payload");
            return;
        };
        let mut serial = self.serial.lock().unwrap_or_else(|e| e.into_inner());
        match value {
            SET_CONTROL_REQ_FLOW_SETTING => {
                let reply_value = if serial.rtscts() {
                    SET_CONTROL_USE_HW_FLOW_CONTROL
                } else if serial.xonxoff() {
                    SET_CONTROL_USE_SW_FLOW_CONTROL
                } else {
                    SET_CONTROL_USE_NO_FLOW_CONTROL
                };
                drop(serial);
                self.reply(SERVER_SET_CONTROL, &[reply_value]);
            }
            SET_CONTROL_USE_NO_FLOW_CONTROL => {
                let _ = serial.set_xonxoff(false);
                let _ = serial.set_rtscts(false);
                drop(serial);
                self.reply(SERVER_SET_CONTROL, &[value]);
            }
            SET_CONTROL_USE_SW_FLOW_CONTROL => {
                let _ = serial.set_xonxoff(true);
                let _ = serial.set_rtscts(false);
                drop(serial);
                self.reply(SERVER_SET_CONTROL, &[value]);
            }
            SET_CONTROL_USE_HW_FLOW_CONTROL => {
                let _ = serial.set_rtscts(true);
                let _ = serial.set_xonxoff(false);
                drop(serial);
                self.reply(SERVER_SET_CONTROL, &[value]);
            }
            SET_CONTROL_REQ_BREAK_STATE => {
                let reply_value = if serial.break_condition() {
                    SET_CONTROL_BREAK_ON
                } else {
                    SET_CONTROL_BREAK_OFF
                };
                drop(serial);
                self.reply(SERVER_SET_CONTROL, &[reply_value]);
            }
            SET_CONTROL_BREAK_ON => {
                let _ = serial.set_break(true);
                drop(serial);
                self.reply(SERVER_SET_CONTROL, &[value]);
            }
            SET_CONTROL_BREAK_OFF => {
                let _ = serial.set_break(false);
                drop(serial);
                self.reply(SERVER_SET_CONTROL, &[value]);
            }
            SET_CONTROL_REQ_DTR => {
                let reply_value = if serial.dtr() { SET_CONTROL_DTR_ON } else { SET_CONTROL_DTR_OFF };
                drop(serial);
                self.reply(SERVER_SET_CONTROL, &[reply_value]);
            }
            SET_CONTROL_DTR_ON => {
                let _ = serial.set_dtr(true);
                drop(serial);
                self.reply(SERVER_SET_CONTROL, &[value]);
            }
            SET_CONTROL_DTR_OFF => {
                let _ = serial.set_dtr(false);
                drop(serial);
                self.reply(SERVER_SET_CONTROL, &[value]);
            }
            SET_CONTROL_REQ_RTS => {
                let reply_value = if serial.rts() { SET_CONTROL_RTS_ON } else { SET_CONTROL_RTS_OFF };
                drop(serial);
                self.reply(SERVER_SET_CONTROL, &[reply_value]);
            }
            SET_CONTROL_RTS_ON => {
                let _ = serial.set_rts(true);
                drop(serial);
                self.reply(SERVER_SET_CONTROL, &[value]);
            }
            SET_CONTROL_RTS_OFF => {
                let _ = serial.set_rts(false);
                drop(serial);
                self.reply(SERVER_SET_CONTROL, &[value]);
            }
            SET_CONTROL_REQ_FLOW_SETTING_IN..=SET_CONTROL_USE_DSR_FLOW_CONTROL => {
                // Inbound-flow control: acknowledged but not applied to the
                // serial device (design note, open question (b)).
                drop(serial);
                log::debug!("SET_CONTROL inbound-flow value {} acknowledged, not applied", value);
                self.reply(SERVER_SET_CONTROL, &[value]);
            }
            other => {
                drop(serial);
                log::warn!("SET_CONTROL: unrecognized value {}", other);
            }
        }
    }

    fn handle_purge(&self, payload: &[u8]) {
        let Some(&value) = payload.first() else {
            log::warn!("PURGE_DATA: empty payload");
            return;
        };
        let mut serial = self.serial.lock().unwrap_or_else(|e| e.into_inner());
        let result = match value {
            PURGE_RECEIVE_BUFFER => serial.reset_input_buffer(),
            PURGE_TRANSMIT_BUFFER => serial.reset_output_buffer(),
            PURGE_BOTH_BUFFERS => serial.reset_input_buffer().and_then(|_| serial.reset_output_buffer()),
            other => {
                log::warn!("PURGE_DATA: invalid value {}", other);
                return;
            }
        };
        drop(serial);
        if let Err(e) = result {
            log::warn!("PURGE_DATA {}: {}", value, e);
        }
        self.reply(SERVER_PURGE_DATA, &[value]);
    }

    /// Polled at 1 Hz by the Bridge's modem-poll task, and forced whenever
    /// the client first becomes RFC2217-aware or explicitly polls.
    pub fn check_modem_lines(&self, force: bool) {
        let lines = {
            let serial = self.serial.lock().unwrap_or_else(|e| e.into_inner());
            ModemLines {
                cts: serial.cts(),
                dsr: serial.dsr(),
                ri: serial.ri(),
                cd: serial.cd(),
            }
        };
        let current = modem::pack_lines(lines);
        let mut state = self.modem.lock().unwrap_or_else(|e| e.into_inner());
        let previous = state.last_modemstate;
        if modem::should_notify(previous, current, force, self.client_is_rfc2217(), state.modemstate_mask) {
            let payload = modem::notification_payload(previous, lines);
            drop(state);
            self.reply(SERVER_NOTIFY_MODEMSTATE, &[payload]);
            state = self.modem.lock().unwrap_or_else(|e| e.into_inner());
        }
        state.last_modemstate = current & 0xF0;
    }
}

struct PortManagerSink<'a>(&'a PortManager);

impl FilterSink for PortManagerSink<'_> {
    fn process_subnegotiation(&mut self, buf: &[u8]) {
        self.0.dispatch_subnegotiation(buf);
    }

    fn process_command(&mut self, command: u8) {
        log::warn!("ignoring Telnet command: {}", command);
    }

    fn negotiate_option(&mut self, command: u8, option: u8) {
        self.0.negotiate(command, option);
    }
}
