//! Client-role RFC 2217 session: the same negotiation engine as
//! [`crate::port_manager::PortManager`] but driving the other end of the
//! wire, plus the imperative configuration API an RFC 2217 client needs
//! (§4.F). A `ClientSession` also implements [`SerialDevice`] itself, so a
//! bridge's serial side can itself be an outbound RFC 2217 connection -
//! chaining one bridge into another rather than touching real hardware.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::{NegotiationError, SerialError, TelnetError, TelnetResult};
use crate::filter::{FilterSink, TelnetFilter};
use crate::modem::ModemLines;
use crate::option::{OptionState, TelnetOption, WriteSink};
use crate::protocol::*;
use crate::serial::{SerialDevice, SerialResult};
use crate::subnegotiation::{send_subnegotiation_frame, TelnetSubnegotiation};
use crate::timeout::Deadline;

struct SocketSink(Mutex<TcpStream>);
impl WriteSink for SocketSink {
    fn write_raw(&self, frame: &[u8]) {
        let mut stream = self.0.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = stream.write_all(frame) {
            log::warn!("write failed: {}", e);
        }
    }
}

struct ReadBuffer {
    bytes: VecDeque<u8>,
    eof: bool,
}

struct ModemCache {
    state: Option<u8>,
    updated_at: Instant,
}

struct SerialConfig {
    baudrate: u32,
    bytesize: u8,
    parity: WireParity,
    stopbits: WireStopBits,
    dtr: bool,
    rts: bool,
    break_condition: bool,
    xonxoff: bool,
    rtscts: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baudrate: 9600,
            bytesize: 8,
            parity: WireParity::None,
            stopbits: WireStopBits::One,
            dtr: false,
            rts: false,
            break_condition: false,
            xonxoff: false,
            rtscts: false,
        }
    }
}

/// Compatibility and timing knobs, mirroring the query-string options the
/// reference client accepts on its connection URL (§6.3).
///
/// `write_timeout` stays `None` for the lifetime of a `ClientOptions`: it
/// exists so the type mirrors the reference client's configuration surface,
/// but [`ClientOptions::set_write_timeout`] is the only way to touch it and
/// always fails.
#[derive(Debug, Clone, Copy)]
pub struct ClientOptions {
    pub network_timeout: Duration,
    pub poll_modem: bool,
    pub ignore_set_control_answer: bool,
    pub write_timeout: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            network_timeout: Duration::from_secs(3),
            poll_modem: true,
            ignore_set_control_answer: false,
            write_timeout: None,
        }
    }
}

impl ClientOptions {
    /// Always fails: `write_timeout` is explicitly unsupported on the client
    /// side (§9 open question (c)), the same way the reference client raises
    /// `NotImplementedError('write_timeout is currently not supported')`
    /// out of `_reconfigure_port` once `_write_timeout` is anything but
    /// `None`, instead of silently accepting and ignoring the value.
    pub fn set_write_timeout(&mut self, _timeout: Duration) -> TelnetResult<()> {
        Err(TelnetError::Config("write_timeout is not supported".to_string()))
    }
}

/// Parses a `rfc2217://host:port[?opt[&opt…]]` connection URL (§6.3) into a
/// `host:port` pair suitable for [`ClientSession::open`] and the
/// [`ClientOptions`] its query string requested. The scheme must be exactly
/// `rfc2217`, the port must fit in 16 bits, and every query option must be
/// one of `logging`, `ign_set_control`, `poll_modem`, `timeout` - anything
/// else is a configuration error, not a silently ignored option.
pub fn parse_url(url: &str) -> TelnetResult<(String, ClientOptions)> {
    let rest = url
        .strip_prefix("rfc2217://")
        .ok_or_else(|| TelnetError::Config(format!("unsupported scheme in '{}'", url)))?;

    let (authority, query) = match rest.split_once('?') {
        Some((a, q)) => (a, Some(q)),
        None => (rest, None),
    };

    let (_host, port) = authority
        .rsplit_once(':')
        .ok_or_else(|| TelnetError::Config(format!("missing port in '{}'", url)))?;
    port.parse::<u16>()
        .map_err(|_| TelnetError::Config(format!("invalid port '{}' in '{}'", port, url)))?;

    let mut opts = ClientOptions::default();
    for pair in query.into_iter().flat_map(|q| q.split('&')).filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').map(|(k, v)| (k, Some(v))).unwrap_or((pair, None));
        match key {
            "logging" => {
                log::debug!("rfc2217 url requested logging level '{}'", value.unwrap_or("debug"));
            }
            "ign_set_control" => opts.ignore_set_control_answer = true,
            "poll_modem" => opts.poll_modem = true,
            "timeout" => {
                let secs: u64 = value
                    .ok_or_else(|| TelnetError::Config(format!("'timeout' needs a value in '{}'", url)))?
                    .parse()
                    .map_err(|_| TelnetError::Config(format!("invalid 'timeout' value in '{}'", url)))?;
                opts.network_timeout = Duration::from_secs(secs);
            }
            other => return Err(TelnetError::Config(format!("unknown option '{}' in '{}'", other, url))),
        }
    }

    Ok((authority.to_string(), opts))
}

pub struct ClientSession {
    write_sink: Arc<dyn WriteSink>,
    options: Vec<TelnetOption>,
    baudrate_sub: TelnetSubnegotiation,
    datasize_sub: TelnetSubnegotiation,
    parity_sub: TelnetSubnegotiation,
    stopsize_sub: TelnetSubnegotiation,
    control_sub: TelnetSubnegotiation,
    purge_sub: TelnetSubnegotiation,
    filter: Mutex<TelnetFilter>,
    read_buffer: Mutex<ReadBuffer>,
    read_cv: Condvar,
    modem: Mutex<ModemCache>,
    modem_cv: Condvar,
    config: Mutex<SerialConfig>,
    remote_suspend_flow: AtomicBool,
    closing: AtomicBool,
    opts: ClientOptions,
}

impl ClientSession {
    /// Connects to `addr`, requests the two mandatory options (we-BINARY,
    /// we-RFC2217), and waits up to `opts.network_timeout` for both to leave
    /// INACTIVE. The reader task is spawned before any request is sent so
    /// the handshake reply cannot be missed.
    pub fn open(addr: &str, opts: ClientOptions) -> TelnetResult<Arc<Self>> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true).ok();
        let reader_stream = stream.try_clone()?;
        let write_sink: Arc<dyn WriteSink> = Arc::new(SocketSink(Mutex::new(stream)));

        let we_binary = TelnetOption::new(
            "we-BINARY",
            BINARY,
            WILL,
            WONT,
            DO,
            DONT,
            OptionState::Requested,
            write_sink.clone(),
        );
        let we_rfc2217 = TelnetOption::new(
            "we-RFC2217",
            COM_PORT_OPTION,
            WILL,
            WONT,
            DO,
            DONT,
            OptionState::Requested,
            write_sink.clone(),
        );

        let session = Arc::new(Self {
            write_sink: write_sink.clone(),
            baudrate_sub: TelnetSubnegotiation::new("baudrate", SET_BAUDRATE, SERVER_SET_BAUDRATE, write_sink.clone()),
            datasize_sub: TelnetSubnegotiation::new("datasize", SET_DATASIZE, SERVER_SET_DATASIZE, write_sink.clone()),
            parity_sub: TelnetSubnegotiation::new("parity", SET_PARITY, SERVER_SET_PARITY, write_sink.clone()),
            stopsize_sub: TelnetSubnegotiation::new("stopsize", SET_STOPSIZE, SERVER_SET_STOPSIZE, write_sink.clone()),
            control_sub: TelnetSubnegotiation::new("control", SET_CONTROL, SERVER_SET_CONTROL, write_sink.clone()),
            purge_sub: TelnetSubnegotiation::new("purge", PURGE_DATA, SERVER_PURGE_DATA, write_sink.clone()),
            options: vec![we_binary, we_rfc2217],
            filter: Mutex::new(TelnetFilter::new()),
            read_buffer: Mutex::new(ReadBuffer {
                bytes: VecDeque::new(),
                eof: false,
            }),
            read_cv: Condvar::new(),
            modem: Mutex::new(ModemCache {
                state: None,
                updated_at: Instant::now() - Duration::from_secs(3600),
            }),
            modem_cv: Condvar::new(),
            config: Mutex::new(SerialConfig::default()),
            remote_suspend_flow: AtomicBool::new(false),
            closing: AtomicBool::new(false),
            opts,
        });

        Self::spawn_reader(session.clone(), reader_stream);

        for option in &session.options {
            option.send_initial_request();
        }

        let deadline = Instant::now() + opts.network_timeout;
        for option in &session.options {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !option.wait_active(remaining) && option.state() == OptionState::Requested {
                return Err(TelnetError::Negotiation(NegotiationError(format!(
                    "timed out waiting for {} to be acknowledged",
                    option.name
                ))));
            }
        }

        Ok(session)
    }

    fn spawn_reader(session: Arc<Self>, mut stream: TcpStream) {
        std::thread::spawn(move || {
            let mut raw = [0u8; 4096];
            loop {
                match stream.read(&mut raw) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        let data = {
                            let mut filter = session.filter.lock().unwrap_or_else(|e| e.into_inner());
                            let mut sink = ClientSessionSink(&session);
                            filter.process(&raw[..n], &mut sink)
                        };
                        if !data.is_empty() {
                            let mut buf = session.read_buffer.lock().unwrap_or_else(|e| e.into_inner());
                            buf.bytes.extend(data);
                            session.read_cv.notify_all();
                        }
                    }
                }
                if session.closing.load(Ordering::SeqCst) {
                    break;
                }
            }
            let mut buf = session.read_buffer.lock().unwrap_or_else(|e| e.into_inner());
            buf.eof = true;
            session.read_cv.notify_all();
            log::debug!("reader task terminated");
        });
    }

    /// Requests baudrate/bytesize/parity/stopbits together and waits for all
    /// four acknowledgements within `network_timeout`.
    pub fn reconfigure(&self, baud: u32, bytesize: u8, parity: WireParity, stopbits: WireStopBits) -> TelnetResult<()> {
        self.baudrate_sub.set(&baud.to_be_bytes());
        self.datasize_sub.set(&[bytesize]);
        self.parity_sub.set(&[parity as u8]);
        self.stopsize_sub.set(&[stopbits as u8]);

        let deadline = Instant::now() + self.opts.network_timeout;
        for sub in [&self.baudrate_sub, &self.datasize_sub, &self.parity_sub, &self.stopsize_sub] {
            let remaining = deadline.saturating_duration_since(Instant::now());
            sub.wait(remaining)?;
            sub.is_ready()?;
        }
        Ok(())
    }

    /// Issues a single `SET_CONTROL` request. In `ignore_set_control_answer`
    /// compatibility mode, sleeps 100ms and returns without waiting for the
    /// far end to answer - some RFC 2217 servers never send one.
    pub fn set_control(&self, value: u8) -> TelnetResult<()> {
        self.control_sub.set(&[value]);
        if self.opts.ignore_set_control_answer {
            std::thread::sleep(Duration::from_millis(100));
            return Ok(());
        }
        self.control_sub.wait(self.opts.network_timeout)?;
        self.control_sub.is_ready()?;
        Ok(())
    }

    pub fn purge(&self, target: u8) -> TelnetResult<()> {
        self.purge_sub.set(&[target]);
        self.purge_sub.wait(self.opts.network_timeout)?;
        self.purge_sub.is_ready()?;
        Ok(())
    }

    /// Reserved extension point (§9, open question): some deployments expect
    /// a client to announce flow-control readiness after a resume. No RFC
    /// 2217 server in the reference corpus consumes it; retained as a no-op
    /// so callers porting code from the original implementation compile.
    pub fn flow_server_ready(&self) {}

    pub fn read_bytes(&self, n: usize, timeout: Option<Duration>) -> TelnetResult<Vec<u8>> {
        let mut deadline = Deadline::from_option(timeout);
        let mut guard = self.read_buffer.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if !guard.bytes.is_empty() {
                let take = n.min(guard.bytes.len());
                return Ok(guard.bytes.drain(..take).collect());
            }
            if guard.eof {
                return Ok(Vec::new());
            }
            let wait = match deadline.time_left() {
                None => Duration::from_secs(3600),
                Some(d) if d.is_zero() => return Ok(Vec::new()),
                Some(d) => d,
            };
            let (next, result) = self
                .read_cv
                .wait_timeout(guard, wait)
                .unwrap_or_else(|e| e.into_inner());
            guard = next;
            if result.timed_out() && guard.bytes.is_empty() && !guard.eof {
                return Ok(Vec::new());
            }
        }
    }

    pub fn write_bytes(&self, data: &[u8]) -> TelnetResult<usize> {
        if self.remote_suspend_flow.load(Ordering::SeqCst) {
            return Ok(0);
        }
        let encoded = TelnetFilter::encode(data);
        self.write_sink.write_raw(&encoded);
        Ok(data.len())
    }

    pub fn get_modem_state(&self) -> TelnetResult<u8> {
        if self.opts.poll_modem {
            let stale = {
                let cache = self.modem.lock().unwrap_or_else(|e| e.into_inner());
                cache.updated_at.elapsed() > Duration::from_millis(300)
            };
            if stale {
                send_subnegotiation_frame(self.write_sink.as_ref(), NOTIFY_MODEMSTATE, &[]);
                let guard = self.modem.lock().unwrap_or_else(|e| e.into_inner());
                let requested_at = Instant::now();
                let (guard, _) = self
                    .modem_cv
                    .wait_timeout_while(guard, self.opts.network_timeout, |cache| {
                        cache.updated_at < requested_at
                    })
                    .unwrap_or_else(|e| e.into_inner());
                drop(guard);
            }
        }
        let cache = self.modem.lock().unwrap_or_else(|e| e.into_inner());
        cache.state.ok_or(TelnetError::NoModemState)
    }

    fn config_snapshot(&self) -> SerialConfig {
        let c = self.config.lock().unwrap_or_else(|e| e.into_inner());
        SerialConfig {
            baudrate: c.baudrate,
            bytesize: c.bytesize,
            parity: c.parity,
            stopbits: c.stopbits,
            dtr: c.dtr,
            rts: c.rts,
            break_condition: c.break_condition,
            xonxoff: c.xonxoff,
            rtscts: c.rtscts,
        }
    }

    fn to_serial_error(err: TelnetError) -> SerialError {
        SerialError(err.to_string())
    }
}

struct ClientSessionSink<'a>(&'a Arc<ClientSession>);

impl FilterSink for ClientSessionSink<'_> {
    fn process_subnegotiation(&mut self, buf: &[u8]) {
        let session = self.0;
        if buf.first().copied() != Some(COM_PORT_OPTION) {
            return;
        }
        let Some(&ack) = buf.get(1) else { return };
        let payload = &buf[2..];
        match ack {
            SERVER_SET_BAUDRATE if payload.len() >= 4 => {
                let value = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
                session.config.lock().unwrap_or_else(|e| e.into_inner()).baudrate = value;
                session.baudrate_sub.check_answer(payload);
            }
            SERVER_SET_DATASIZE if !payload.is_empty() => {
                session.config.lock().unwrap_or_else(|e| e.into_inner()).bytesize = payload[0];
                session.datasize_sub.check_answer(payload);
            }
            SERVER_SET_PARITY if !payload.is_empty() => {
                if let Some(parity) = WireParity::from_wire(payload[0]) {
                    session.config.lock().unwrap_or_else(|e| e.into_inner()).parity = parity;
                }
                session.parity_sub.check_answer(payload);
            }
            SERVER_SET_STOPSIZE if !payload.is_empty() => {
                if let Some(stopbits) = WireStopBits::from_wire(payload[0]) {
                    session.config.lock().unwrap_or_else(|e| e.into_inner()).stopbits = stopbits;
                }
                session.stopsize_sub.check_answer(payload);
            }
            SERVER_SET_CONTROL if !payload.is_empty() => {
                let mut cfg = session.config.lock().unwrap_or_else(|e| e.into_inner());
                match payload[0] {
                    SET_CONTROL_DTR_ON => cfg.dtr = true,
                    SET_CONTROL_DTR_OFF => cfg.dtr = false,
                    SET_CONTROL_RTS_ON => cfg.rts = true,
                    SET_CONTROL_RTS_OFF => cfg.rts = false,
                    SET_CONTROL_BREAK_ON => cfg.break_condition = true,
                    SET_CONTROL_BREAK_OFF => cfg.break_condition = false,
                    SET_CONTROL_USE_NO_FLOW_CONTROL => {
                        cfg.xonxoff = false;
                        cfg.rtscts = false;
                    }
                    SET_CONTROL_USE_SW_FLOW_CONTROL => {
                        cfg.xonxoff = true;
                        cfg.rtscts = false;
                    }
                    SET_CONTROL_USE_HW_FLOW_CONTROL => {
                        cfg.xonxoff = false;
                        cfg.rtscts = true;
                    }
                    _ => {}
                }
                drop(cfg);
                session.control_sub.check_answer(payload);
            }
            SERVER_PURGE_DATA if !payload.is_empty() => session.purge_sub.check_answer(payload),
            SERVER_NOTIFY_MODEMSTATE if !payload.is_empty() => {
                let mut cache = session.modem.lock().unwrap_or_else(|e| e.into_inner());
                cache.state = Some(payload[0]);
                cache.updated_at = Instant::now();
                drop(cache);
                session.modem_cv.notify_all();
            }
            SERVER_NOTIFY_LINESTATE => {
                log::debug!("remote line status {:?}", payload);
            }
            FLOWCONTROL_SUSPEND => session.remote_suspend_flow.store(true, Ordering::SeqCst),
            FLOWCONTROL_RESUME => session.remote_suspend_flow.store(false, Ordering::SeqCst),
            other => log::warn!("unhandled COM_PORT_OPTION ack {}", other),
        }
    }

    fn process_command(&mut self, command: u8) {
        log::warn!("ignoring Telnet command: {}", command);
    }

    fn negotiate_option(&mut self, command: u8, option: u8) {
        let session = self.0;
        let mut known = false;
        for telnet_option in &session.options {
            if telnet_option.option == option {
                known = true;
                telnet_option.process_incoming(command);
            }
        }
        if !known && (command == WILL || command == DO) {
            let reply = if command == WILL { DONT } else { WONT };
            session.write_sink.write_raw(&[IAC, reply, option]);
        }
    }
}

/// Lets a `ClientSession` stand in for a local tty: the bridge on the far
/// side of this session sees a regular `SerialDevice`, unaware that its
/// backing store is itself another RFC 2217 connection (§4.F).
///
/// Implemented over `Arc<ClientSession>` rather than the bare type: the
/// reader thread spawned by `open()` holds its own clone of the `Arc` for the
/// connection's whole life, so a caller can never recover an owned
/// `ClientSession` to satisfy `&mut self` by unique ownership. Every method
/// below only ever needed `&self` - the struct's fields are already
/// Mutex/Condvar/atomic guarded - so forwarding through the shared handle is
/// sound.
impl SerialDevice for Arc<ClientSession> {
    fn is_open(&self) -> bool {
        !self.closing.load(Ordering::SeqCst)
    }

    fn close(&mut self) -> SerialResult<()> {
        self.closing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> SerialResult<usize> {
        let data = self
            .read_bytes(buf.len(), Some(self.opts.network_timeout))
            .map_err(ClientSession::to_serial_error)?;
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }

    fn write(&mut self, data: &[u8]) -> SerialResult<usize> {
        self.write_bytes(data).map_err(ClientSession::to_serial_error)
    }

    fn baudrate(&self) -> u32 {
        self.config_snapshot().baudrate
    }

    fn set_baudrate(&mut self, baud: u32) -> SerialResult<()> {
        let c = self.config_snapshot();
        self.reconfigure(baud, c.bytesize, c.parity, c.stopbits)
            .map_err(ClientSession::to_serial_error)
    }

    fn bytesize(&self) -> u8 {
        self.config_snapshot().bytesize
    }

    fn set_bytesize(&mut self, bits: u8) -> SerialResult<()> {
        let c = self.config_snapshot();
        self.reconfigure(c.baudrate, bits, c.parity, c.stopbits)
            .map_err(ClientSession::to_serial_error)
    }

    fn parity(&self) -> WireParity {
        self.config_snapshot().parity
    }

    fn set_parity(&mut self, parity: WireParity) -> SerialResult<()> {
        let c = self.config_snapshot();
        self.reconfigure(c.baudrate, c.bytesize, parity, c.stopbits)
            .map_err(ClientSession::to_serial_error)
    }

    fn stopbits(&self) -> WireStopBits {
        self.config_snapshot().stopbits
    }

    fn set_stopbits(&mut self, stopbits: WireStopBits) -> SerialResult<()> {
        let c = self.config_snapshot();
        self.reconfigure(c.baudrate, c.bytesize, c.parity, stopbits)
            .map_err(ClientSession::to_serial_error)
    }

    fn xonxoff(&self) -> bool {
        self.config_snapshot().xonxoff
    }

    fn set_xonxoff(&mut self, enabled: bool) -> SerialResult<()> {
        let value = if enabled {
            SET_CONTROL_USE_SW_FLOW_CONTROL
        } else {
            SET_CONTROL_USE_NO_FLOW_CONTROL
        };
        self.set_control(value).map_err(ClientSession::to_serial_error)
    }

    fn rtscts(&self) -> bool {
        self.config_snapshot().rtscts
    }

    fn set_rtscts(&mut self, enabled: bool) -> SerialResult<()> {
        let value = if enabled {
            SET_CONTROL_USE_HW_FLOW_CONTROL
        } else {
            SET_CONTROL_USE_NO_FLOW_CONTROL
        };
        self.set_control(value).map_err(ClientSession::to_serial_error)
    }

    fn dtr(&self) -> bool {
        self.config_snapshot().dtr
    }

    fn set_dtr(&mut self, level: bool) -> SerialResult<()> {
        let value = if level { SET_CONTROL_DTR_ON } else { SET_CONTROL_DTR_OFF };
        self.set_control(value).map_err(ClientSession::to_serial_error)
    }

    fn rts(&self) -> bool {
        self.config_snapshot().rts
    }

    fn set_rts(&mut self, level: bool) -> SerialResult<()> {
        let value = if level { SET_CONTROL_RTS_ON } else { SET_CONTROL_RTS_OFF };
        self.set_control(value).map_err(ClientSession::to_serial_error)
    }

    fn break_condition(&self) -> bool {
        self.config_snapshot().break_condition
    }

    fn set_break(&mut self, active: bool) -> SerialResult<()> {
        let value = if active { SET_CONTROL_BREAK_ON } else { SET_CONTROL_BREAK_OFF };
        self.set_control(value).map_err(ClientSession::to_serial_error)
    }

    fn cts(&self) -> bool {
        self.get_modem_state().ok().map(|b| b & MODEMSTATE_MASK_CTS != 0).unwrap_or(false)
    }

    fn dsr(&self) -> bool {
        self.get_modem_state().ok().map(|b| b & MODEMSTATE_MASK_DSR != 0).unwrap_or(false)
    }

    fn ri(&self) -> bool {
        self.get_modem_state().ok().map(|b| b & MODEMSTATE_MASK_RI != 0).unwrap_or(false)
    }

    fn cd(&self) -> bool {
        self.get_modem_state().ok().map(|b| b & MODEMSTATE_MASK_CD != 0).unwrap_or(false)
    }

    fn reset_input_buffer(&mut self) -> SerialResult<()> {
        self.purge(PURGE_RECEIVE_BUFFER).map_err(ClientSession::to_serial_error)
    }

    fn reset_output_buffer(&mut self) -> SerialResult<()> {
        self.purge(PURGE_TRANSMIT_BUFFER).map_err(ClientSession::to_serial_error)
    }
}

// `ModemLines` is re-exported for callers assembling a status snapshot from
// `get_modem_state()`'s raw byte without re-deriving the bit weights.
pub fn unpack_modemstate(byte: u8) -> ModemLines {
    ModemLines {
        cts: byte & MODEMSTATE_MASK_CTS != 0,
        dsr: byte & MODEMSTATE_MASK_DSR != 0,
        ri: byte & MODEMSTATE_MASK_RI != 0,
        cd: byte & MODEMSTATE_MASK_CD != 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_modemstate_reads_expected_bits() {
        let lines = unpack_modemstate(MODEMSTATE_MASK_CTS | MODEMSTATE_MASK_CD);
        assert!(lines.cts && lines.cd && !lines.dsr && !lines.ri);
    }

    #[test]
    fn parse_url_splits_host_port_and_applies_defaults() {
        let (addr, opts) = parse_url("rfc2217://192.0.2.5:2217").unwrap();
        assert_eq!(addr, "192.0.2.5:2217");
        assert_eq!(opts.network_timeout, Duration::from_secs(3));
        assert!(!opts.ignore_set_control_answer);
    }

    #[test]
    fn parse_url_applies_query_options() {
        let (addr, opts) = parse_url("rfc2217://host:9999?ign_set_control&timeout=10").unwrap();
        assert_eq!(addr, "host:9999");
        assert!(opts.ignore_set_control_answer);
        assert_eq!(opts.network_timeout, Duration::from_secs(10));
    }

    #[test]
    fn parse_url_rejects_wrong_scheme() {
        assert!(parse_url("telnet://host:23").is_err());
    }

    #[test]
    fn parse_url_rejects_bad_port() {
        assert!(parse_url("rfc2217://host:not-a-port").is_err());
    }

    #[test]
    fn parse_url_rejects_unknown_option() {
        assert!(parse_url("rfc2217://host:2217?bogus=1").is_err());
    }

    #[test]
    fn set_write_timeout_is_rejected() {
        let mut opts = ClientOptions::default();
        assert!(opts.write_timeout.is_none());
        assert!(opts.set_write_timeout(Duration::from_secs(1)).is_err());
        assert!(opts.write_timeout.is_none());
    }
}
