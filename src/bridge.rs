//! Per-connection bridge lifecycle (§4.G): wires one accepted TCP socket to
//! one `SerialDevice`, either through the full RFC 2217 engine or, in raw
//! mode, as a plain byte pipe.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use telnet_rfc2217::port_manager::RawConnection;
use telnet_rfc2217::serial::SerialDevice;
use telnet_rfc2217::PortManager;

use crate::config::{BridgeEntry, BridgeMode};
use crate::errors::BridgeResult;
use crate::serial_open::open_serial_device;

/// §5 Cancellation: "Bridge.join waits ≤ 7 s for task termination then
/// proceeds to free resources." A pump thread blocked on a dead peer past
/// its read timeout, or one slow to notice `done`, must not wedge teardown
/// forever.
const JOIN_DEADLINE: Duration = Duration::from_secs(7);
const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut)
}

/// Waits up to [`JOIN_DEADLINE`] for `handle` to finish, polling rather than
/// blocking so a thread that never notices `done` cannot hang teardown.
/// Past the deadline the handle is dropped without joining: the OS thread
/// is abandoned to exit on its own, and the caller proceeds to free
/// whatever resources it owns regardless.
fn join_with_deadline(handle: JoinHandle<()>, label: &str) {
    let started = Instant::now();
    loop {
        if handle.is_finished() {
            handle.join().ok();
            return;
        }
        if started.elapsed() >= JOIN_DEADLINE {
            log::warn!("{} did not terminate within {:?}, abandoning it", label, JOIN_DEADLINE);
            return;
        }
        std::thread::sleep(JOIN_POLL_INTERVAL);
    }
}

struct TcpConnection(Mutex<TcpStream>);

impl RawConnection for TcpConnection {
    fn write_raw(&self, data: &[u8]) {
        let mut stream = self.0.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = stream.write_all(data) {
            log::warn!("write to client failed: {}", e);
        }
    }
}

/// Handles one accepted connection end to end: opens the configured serial
/// device, spawns the per-connection tasks, and returns once any of them
/// exits (§4.G point 4).
pub fn handle_connection(entry: &BridgeEntry, stream: TcpStream, peer: std::net::SocketAddr) -> BridgeResult<()> {
    stream.set_nodelay(entry.no_delay).ok();
    // A finite read timeout lets each pump thread notice `done` promptly
    // instead of blocking on the socket past the point its peer stopped
    // caring; `None` (configured `timeout = -1`) keeps the blocking read.
    stream.set_read_timeout(entry.timeout).ok();
    log::debug!("configured ToS {:?} is advisory only on this platform", entry.tos);

    let serial = open_serial_device(entry)?;
    let serial: Arc<Mutex<Box<dyn SerialDevice>>> = Arc::new(Mutex::new(serial));

    log::info!("accepted {} on bridge '{}' from {}", entry.listener, entry.name, peer);

    let result = match entry.mode {
        BridgeMode::Raw => run_raw(serial, stream),
        BridgeMode::Rfc2217 => run_rfc2217(serial, stream),
    };

    log::info!("bridge '{}' connection from {} disconnected", entry.name, peer);
    result
}

fn run_raw(serial: Arc<Mutex<Box<dyn SerialDevice>>>, stream: TcpStream) -> BridgeResult<()> {
    let done = Arc::new(AtomicBool::new(false));

    let serial_to_tcp = {
        let serial = serial.clone();
        let mut tcp_write = stream.try_clone()?;
        let done = done.clone();
        std::thread::spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                if done.load(Ordering::SeqCst) {
                    break;
                }
                let n = match serial.lock().unwrap_or_else(|e| e.into_inner()).read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => n,
                };
                if tcp_write.write_all(&buf[..n]).is_err() {
                    break;
                }
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let tcp_to_serial = {
        let serial = serial.clone();
        let mut tcp_read = stream;
        let done = done.clone();
        std::thread::spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                if done.load(Ordering::SeqCst) {
                    break;
                }
                let n = match tcp_read.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) if is_timeout(&e) => continue,
                    Err(_) => break,
                };
                if serial.lock().unwrap_or_else(|e| e.into_inner()).write(&buf[..n]).is_err() {
                    break;
                }
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    join_with_deadline(serial_to_tcp, "serial_to_tcp pump");
    done.store(true, Ordering::SeqCst);
    join_with_deadline(tcp_to_serial, "tcp_to_serial pump");
    Ok(())
}

fn run_rfc2217(serial: Arc<Mutex<Box<dyn SerialDevice>>>, stream: TcpStream) -> BridgeResult<()> {
    // A single `TcpConnection` funnels both protocol replies and escaped
    // serial data through one lock, so a reply can never land mid-frame
    // inside a chunk of forwarded serial data (§5, §9).
    let connection = Arc::new(TcpConnection(Mutex::new(stream.try_clone()?)));
    let manager = PortManager::new(serial.clone(), connection.clone());

    let done = Arc::new(AtomicBool::new(false));

    let serial_to_tcp = {
        let serial = serial.clone();
        let connection = connection.clone();
        let done = done.clone();
        std::thread::spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                if done.load(Ordering::SeqCst) {
                    break;
                }
                let n = match serial.lock().unwrap_or_else(|e| e.into_inner()).read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => n,
                };
                let escaped = PortManager::escape(&buf[..n]);
                connection.write_raw(&escaped);
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let tcp_to_serial = {
        let serial = serial.clone();
        let manager = manager.clone();
        let mut tcp_read = stream.try_clone()?;
        let done = done.clone();
        std::thread::spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                if done.load(Ordering::SeqCst) {
                    break;
                }
                let n = match tcp_read.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) if is_timeout(&e) => continue,
                    Err(_) => break,
                };
                let data = manager.filter(&buf[..n]);
                if !data.is_empty() && serial.lock().unwrap_or_else(|e| e.into_inner()).write(&data).is_err() {
                    break;
                }
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let modem_poll = {
        let manager = manager.clone();
        let done = done.clone();
        std::thread::spawn(move || {
            while !done.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_secs(1));
                if manager.client_is_rfc2217() {
                    manager.check_modem_lines(false);
                }
            }
        })
    };

    join_with_deadline(serial_to_tcp, "serial_to_tcp pump");
    done.store(true, Ordering::SeqCst);
    join_with_deadline(tcp_to_serial, "tcp_to_serial pump");
    join_with_deadline(modem_poll, "modem poll");
    Ok(())
}
