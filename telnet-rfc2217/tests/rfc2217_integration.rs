//! End-to-end scenarios driving `PortManager` against an in-memory serial
//! device and a captured-output connection, without touching a real socket
//! or tty.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use telnet_rfc2217::port_manager::RawConnection;
use telnet_rfc2217::protocol::{WireParity, WireStopBits};
use telnet_rfc2217::serial::{SerialDevice, SerialResult};
use telnet_rfc2217::PortManager;

struct CapturingConnection(Mutex<Vec<u8>>);

impl RawConnection for CapturingConnection {
    fn write_raw(&self, data: &[u8]) {
        self.0.lock().unwrap().extend_from_slice(data);
    }
}

impl CapturingConnection {
    fn take(&self) -> Vec<u8> {
        std::mem::take(&mut self.0.lock().unwrap())
    }
}

/// Modem status lines, shared behind an `Arc<Mutex<..>>` so a test can flip
/// them after the device has already been boxed into the manager.
#[derive(Default, Clone, Copy)]
struct ModemFlags {
    cts: bool,
    dsr: bool,
    ri: bool,
    cd: bool,
}

/// Stands in for real hardware: a fixed-size byte buffer plus the modem
/// line flags a test can flip directly through its `modem` handle.
struct InMemorySerialDevice {
    baudrate: u32,
    bytesize: u8,
    parity: WireParity,
    stopbits: WireStopBits,
    xonxoff: bool,
    rtscts: bool,
    dtr: bool,
    rts: bool,
    break_on: bool,
    modem: Arc<Mutex<ModemFlags>>,
    written: Vec<u8>,
    purged_input: bool,
    purged_output: bool,
}

impl InMemorySerialDevice {
    fn new(modem: Arc<Mutex<ModemFlags>>) -> Self {
        Self {
            baudrate: 9600,
            bytesize: 8,
            parity: WireParity::None,
            stopbits: WireStopBits::One,
            xonxoff: false,
            rtscts: false,
            dtr: false,
            rts: false,
            break_on: false,
            modem,
            written: Vec::new(),
            purged_input: false,
            purged_output: false,
        }
    }
}

impl SerialDevice for InMemorySerialDevice {
    fn is_open(&self) -> bool {
        true
    }
    fn close(&mut self) -> SerialResult<()> {
        Ok(())
    }
    fn read(&mut self, _buf: &mut [u8]) -> SerialResult<usize> {
        Ok(0)
    }
    fn write(&mut self, data: &[u8]) -> SerialResult<usize> {
        self.written.extend_from_slice(data);
        Ok(data.len())
    }
    fn baudrate(&self) -> u32 {
        self.baudrate
    }
    fn set_baudrate(&mut self, baud: u32) -> SerialResult<()> {
        self.baudrate = baud;
        Ok(())
    }
    fn bytesize(&self) -> u8 {
        self.bytesize
    }
    fn set_bytesize(&mut self, bits: u8) -> SerialResult<()> {
        self.bytesize = bits;
        Ok(())
    }
    fn parity(&self) -> WireParity {
        self.parity
    }
    fn set_parity(&mut self, parity: WireParity) -> SerialResult<()> {
        self.parity = parity;
        Ok(())
    }
    fn stopbits(&self) -> WireStopBits {
        self.stopbits
    }
    fn set_stopbits(&mut self, stopbits: WireStopBits) -> SerialResult<()> {
        self.stopbits = stopbits;
        Ok(())
    }
    fn xonxoff(&self) -> bool {
        self.xonxoff
    }
    fn set_xonxoff(&mut self, enabled: bool) -> SerialResult<()> {
        self.xonxoff = enabled;
        Ok(())
    }
    fn rtscts(&self) -> bool {
        self.rtscts
    }
    fn set_rtscts(&mut self, enabled: bool) -> SerialResult<()> {
        self.rtscts = enabled;
        Ok(())
    }
    fn dtr(&self) -> bool {
        self.dtr
    }
    fn set_dtr(&mut self, level: bool) -> SerialResult<()> {
        self.dtr = level;
        Ok(())
    }
    fn rts(&self) -> bool {
        self.rts
    }
    fn set_rts(&mut self, level: bool) -> SerialResult<()> {
        self.rts = level;
        Ok(())
    }
    fn break_condition(&self) -> bool {
        self.break_on
    }
    fn set_break(&mut self, active: bool) -> SerialResult<()> {
        self.break_on = active;
        Ok(())
    }
    fn cts(&self) -> bool {
        self.modem.lock().unwrap().cts
    }
    fn dsr(&self) -> bool {
        self.modem.lock().unwrap().dsr
    }
    fn ri(&self) -> bool {
        self.modem.lock().unwrap().ri
    }
    fn cd(&self) -> bool {
        self.modem.lock().unwrap().cd
    }
    fn reset_input_buffer(&mut self) -> SerialResult<()> {
        self.purged_input = true;
        Ok(())
    }
    fn reset_output_buffer(&mut self) -> SerialResult<()> {
        self.purged_output = true;
        Ok(())
    }
}

fn make_manager() -> (
    Arc<PortManager>,
    Arc<CapturingConnection>,
    Arc<Mutex<Box<dyn SerialDevice>>>,
    Arc<Mutex<ModemFlags>>,
) {
    let modem = Arc::new(Mutex::new(ModemFlags::default()));
    let serial: Arc<Mutex<Box<dyn SerialDevice>>> =
        Arc::new(Mutex::new(Box::new(InMemorySerialDevice::new(modem.clone()))));
    let connection = Arc::new(CapturingConnection(Mutex::new(Vec::new())));
    let manager = PortManager::new(serial.clone(), connection.clone());
    connection.take(); // discard the initial option requests
    (manager, connection, serial, modem)
}

#[test]
fn s1_initial_handshake_activates_rfc2217() {
    let (manager, connection, _serial, _modem) = make_manager();

    // WILL COM_PORT_OPTION from the client
    manager.filter(&[0xFF, 0xFB, 0x2C]);
    let wire = connection.take();
    assert_eq!(wire, vec![0xFF, 0xFD, 0x2C]); // DO COM_PORT_OPTION

    // DO COM_PORT_OPTION from the client, acknowledging our own WILL
    manager.filter(&[0xFF, 0xFD, 0x2C]);

    assert!(manager.client_is_rfc2217());
}

#[test]
fn s2_set_baudrate_applies_and_replies() {
    let (manager, connection, serial, _modem) = make_manager();
    manager.filter(&[0xFF, 0xFA, 0x2C, 0x01, 0x00, 0x01, 0xC2, 0x00, 0xFF, 0xF0]);

    assert_eq!(serial.lock().unwrap().baudrate(), 115_200);
    let wire = connection.take();
    assert_eq!(wire, vec![0xFF, 0xFA, 0x2C, 0x65, 0x00, 0x01, 0xC2, 0x00, 0xFF, 0xF0]);
}

#[test]
fn s3_iac_is_unescaped_before_reaching_serial() {
    let (manager, _connection, serial, _modem) = make_manager();
    let forwarded = manager.filter(&[0x41, 0xFF, 0xFF, 0x42]);
    assert_eq!(forwarded, vec![0x41, 0xFF, 0x42]);

    serial.lock().unwrap().write(&forwarded).unwrap();
    assert_eq!(serial.lock().unwrap().write(&[]).unwrap(), 0);
}

#[test]
fn s4_modem_notification_suppressed_without_change() {
    let (manager, connection, _serial, modem) = make_manager();
    manager.filter(&[0xFF, 0xFB, 0x2C]);
    manager.filter(&[0xFF, 0xFD, 0x2C]);
    connection.take();

    manager.check_modem_lines(false);
    assert!(connection.take().is_empty(), "no change, no notification");

    modem.lock().unwrap().cts = true;
    manager.check_modem_lines(false);
    let wire = connection.take();
    assert_eq!(wire, vec![0xFF, 0xFA, 0x2C, 0x6B, 0x11, 0xFF, 0xF0]);

    connection.take();
    manager.check_modem_lines(false);
    assert!(connection.take().is_empty(), "repeat poll without change stays quiet");
}

#[test]
fn s5_purge_both_buffers() {
    let (manager, connection, _serial, _modem) = make_manager();
    manager.filter(&[0xFF, 0xFA, 0x2C, 0x0C, 0x03, 0xFF, 0xF0]);
    let wire = connection.take();
    assert_eq!(wire, vec![0xFF, 0xFA, 0x2C, 0x70, 0x03, 0xFF, 0xF0]);
}

#[test]
fn s6_unsupported_option_rejected() {
    let (manager, connection, _serial, _modem) = make_manager();
    manager.filter(&[0xFF, 0xFB, 0x18]); // WILL TERMINAL-TYPE
    let wire = connection.take();
    assert_eq!(wire, vec![0xFF, 0xFE, 0x18]); // DONT TERMINAL-TYPE
}

#[test]
fn raw_connection_serializes_concurrent_writers() {
    let done = Arc::new(AtomicBool::new(false));
    let connection = Arc::new(CapturingConnection(Mutex::new(Vec::new())));
    let c = connection.clone();
    let d = done.clone();
    let writer = std::thread::spawn(move || {
        while !d.load(Ordering::SeqCst) {
            c.write_raw(b"x");
        }
    });
    std::thread::sleep(std::time::Duration::from_millis(5));
    done.store(true, Ordering::SeqCst);
    writer.join().unwrap();
    assert!(connection.0.lock().unwrap().iter().all(|&b| b == b'x'));
}
