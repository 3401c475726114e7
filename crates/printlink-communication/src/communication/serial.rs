//! Serial port transport
//!
//! Provides the line transport for direct hardware connection to printer
//! firmware via USB or RS-232.
//!
//! Supports:
//! - Port enumeration and discovery
//! - Baud rate and read timeout configuration
//! - Line reassembly from partial reads

use super::LineTransport;
use printlink_core::TransportError;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use std::time::Duration;

/// Longest run of bytes kept while waiting for a line terminator
const MAX_LINE_LENGTH: usize = 4096;

/// Serial link parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path (e.g., "/dev/ttyUSB0", "COM3")
    pub device: String,
    /// Baud rate
    pub baud_rate: u32,
    /// How long a single read waits for data, in milliseconds
    pub read_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".to_string(),
            baud_rate: 115200,
            read_timeout_ms: 100,
        }
    }
}

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct SerialPortInfo {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port_name: String,

    /// Port description (e.g., "USB Serial Port")
    pub description: String,

    /// Manufacturer name if available
    pub manufacturer: Option<String>,

    /// USB vendor ID if applicable
    pub vid: Option<u16>,

    /// USB product ID if applicable
    pub pid: Option<u16>,
}

impl SerialPortInfo {
    /// Create a new port info
    pub fn new(port_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            description: description.into(),
            manufacturer: None,
            vid: None,
            pid: None,
        }
    }

    /// Set manufacturer
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    /// Set USB IDs
    pub fn with_usb_ids(mut self, vid: u16, pid: u16) -> Self {
        self.vid = Some(vid);
        self.pid = Some(pid);
        self
    }
}

/// List serial ports that could host a printer
///
/// Filters to USB/ACM style devices:
/// - Windows: COM* (e.g., COM1, COM3)
/// - Linux: /dev/ttyUSB*, /dev/ttyACM*
/// - macOS: /dev/cu.usbserial-*, /dev/cu.usbmodem*
pub fn list_ports() -> Result<Vec<SerialPortInfo>, TransportError> {
    let ports = serialport::available_ports().map_err(|e| {
        tracing::error!("Failed to enumerate serial ports: {}", e);
        TransportError::from(io::Error::from(e))
    })?;

    Ok(ports
        .iter()
        .filter(|port| is_printer_port(&port.port_name))
        .map(|port| {
            let info = SerialPortInfo::new(&port.port_name, get_port_description(port));
            match &port.port_type {
                serialport::SerialPortType::UsbPort(usb_info) => {
                    let info = info.with_usb_ids(usb_info.vid, usb_info.pid);
                    match &usb_info.manufacturer {
                        Some(mfg) => info.with_manufacturer(mfg),
                        None => info,
                    }
                }
                _ => info,
            }
        })
        .collect())
}

fn is_printer_port(port_name: &str) -> bool {
    if let Some(number) = port_name.strip_prefix("COM") {
        return !number.is_empty() && number.chars().all(|c| c.is_ascii_digit());
    }

    port_name.starts_with("/dev/ttyUSB")
        || port_name.starts_with("/dev/ttyACM")
        || port_name.starts_with("/dev/cu.usbserial-")
        || port_name.starts_with("/dev/cu.usbmodem")
}

fn get_port_description(port: &serialport::SerialPortInfo) -> String {
    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb_info) => {
            format!(
                "USB {} {}",
                usb_info.manufacturer.as_deref().unwrap_or("Device"),
                usb_info.product.as_deref().unwrap_or("Serial Port")
            )
        }
        serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
        _ => "Serial Port".to_string(),
    }
}

/// Trait for byte stream I/O underneath the serial transport
pub trait ReadWrite: Read + Write + Send {}
impl<T: Read + Write + Send> ReadWrite for T {}

/// Line transport over a serial port
///
/// Partial reads are buffered until a newline arrives. Blank lines and the
/// NUL keep-alive some boards emit are skipped.
pub struct SerialTransport {
    name: String,
    stream: Option<Box<dyn ReadWrite>>,
    pending: Vec<u8>,
}

impl SerialTransport {
    /// Open a serial port with the given parameters
    pub fn open(config: &SerialConfig) -> Result<Self, TransportError> {
        let port = serialport::new(&config.device, config.baud_rate)
            .timeout(Duration::from_millis(config.read_timeout_ms))
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(|e| {
                tracing::warn!("Failed to open serial port {}: {}", config.device, e);
                TransportError::from(io::Error::from(e))
            })?;

        tracing::debug!(
            "Opened serial port {} at {} baud",
            config.device,
            config.baud_rate
        );
        Ok(Self::from_stream(config.device.clone(), port))
    }

    /// Wrap an already open byte stream
    pub fn from_stream(name: impl Into<String>, stream: impl ReadWrite + 'static) -> Self {
        Self {
            name: name.into(),
            stream: Some(Box::new(stream)),
            pending: Vec::with_capacity(256),
        }
    }

    fn take_line(&mut self) -> Option<String> {
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end().trim_end_matches('\0');
            if !line.trim().is_empty() {
                return Some(line.to_string());
            }
        }
        None
    }

    fn discard_overlong(&mut self) {
        if self.pending.len() > MAX_LINE_LENGTH && !self.pending.contains(&b'\n') {
            tracing::warn!(
                "Discarding {} bytes from {} with no line terminator",
                self.pending.len(),
                self.name
            );
            self.pending.clear();
        }
    }

    fn stream(&mut self) -> Result<&mut Box<dyn ReadWrite>, TransportError> {
        self.stream
            .as_mut()
            .ok_or_else(|| TransportError::disconnected("serial port closed"))
    }
}

impl LineTransport for SerialTransport {
    fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        let mut chunk = [0u8; 256];
        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }

            let read = self.stream()?.read(&mut chunk);
            match read {
                Ok(0) => return Err(TransportError::disconnected("end of stream")),
                Ok(n) => {
                    self.pending.extend_from_slice(&chunk[..n]);
                    self.discard_overlong();
                }
                Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                    return Ok(None)
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn write_line(&mut self, text: &str) -> Result<(), TransportError> {
        let mut data = Vec::with_capacity(text.len() + 1);
        data.extend_from_slice(text.trim_end().as_bytes());
        data.push(b'\n');

        let stream = self.stream()?;
        let result = stream.write_all(&data).and_then(|_| stream.flush());
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Err(TransportError::TimedOut),
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.stream.take().is_some() {
            tracing::debug!("Closed serial port {}", self.name);
        }
        self.pending.clear();
        Ok(())
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}
