//! The opaque serial-device interface the bridge is built against (§6.1).
//!
//! Nothing in this crate implements the termios-level driver - it is an
//! external collaborator by design (§1, "Out of scope"). `PortManager` and
//! `ClientSession` are generic over `Box<dyn SerialDevice>`, and a test
//! double or an RFC2217 redirector chain (§4.F: a `ClientSession` can itself
//! satisfy this trait to chain bridges) can stand in for real hardware.

use std::time::Duration;

use crate::error::SerialError;
use crate::protocol::{WireParity, WireStopBits};

pub type SerialResult<T> = Result<T, SerialError>;

/// Byte I/O and termios-level controls over a tty, as consumed by the core.
pub trait SerialDevice: Send {
    fn is_open(&self) -> bool;
    fn close(&mut self) -> SerialResult<()>;

    /// Reads up to `buf.len()` bytes, respecting the device's configured
    /// read timeout. Returns the number of bytes placed into `buf`; `0`
    /// means the device reached EOF/disconnected.
    fn read(&mut self, buf: &mut [u8]) -> SerialResult<usize>;
    fn write(&mut self, data: &[u8]) -> SerialResult<usize>;

    fn baudrate(&self) -> u32;
    fn set_baudrate(&mut self, baud: u32) -> SerialResult<()>;

    fn bytesize(&self) -> u8;
    fn set_bytesize(&mut self, bits: u8) -> SerialResult<()>;

    fn parity(&self) -> WireParity;
    fn set_parity(&mut self, parity: WireParity) -> SerialResult<()>;

    fn stopbits(&self) -> WireStopBits;
    fn set_stopbits(&mut self, stopbits: WireStopBits) -> SerialResult<()>;

    fn xonxoff(&self) -> bool;
    fn set_xonxoff(&mut self, enabled: bool) -> SerialResult<()>;
    fn rtscts(&self) -> bool;
    fn set_rtscts(&mut self, enabled: bool) -> SerialResult<()>;

    fn dtr(&self) -> bool;
    fn set_dtr(&mut self, level: bool) -> SerialResult<()>;
    fn rts(&self) -> bool;
    fn set_rts(&mut self, level: bool) -> SerialResult<()>;
    fn break_condition(&self) -> bool;
    fn set_break(&mut self, active: bool) -> SerialResult<()>;
    fn send_break(&mut self, duration: Duration) -> SerialResult<()> {
        self.set_break(true)?;
        std::thread::sleep(duration);
        self.set_break(false)
    }

    fn cts(&self) -> bool;
    fn dsr(&self) -> bool;
    fn ri(&self) -> bool;
    fn cd(&self) -> bool;

    fn reset_input_buffer(&mut self) -> SerialResult<()>;
    fn reset_output_buffer(&mut self) -> SerialResult<()>;
}
