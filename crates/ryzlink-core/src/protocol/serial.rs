//! Serial port handling
//!
//! Provides port discovery and opens the modem UART as an async stream.

use serialport::{SerialPortInfo, SerialPortType};
use std::collections::BTreeMap;
use tokio_serial::{
    DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt, SerialStream, StopBits,
};
use tracing::{debug, warn};

use super::{ModemError, TransportConfig};

/// USB identity of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsbId {
    /// Vendor ID
    pub vid: u16,
    /// Product ID
    pub pid: u16,
}

/// A serial device the modem may be attached to
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// Device path ("/dev/ttyUSB0") or name ("COM3")
    pub name: String,
    /// Set for USB serial bridges
    pub usb: Option<UsbId>,
    /// Product string reported by the USB bridge
    pub description: Option<String>,
}

impl PortInfo {
    fn from_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            usb: None,
            description: None,
        }
    }
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let mut port = Self::from_name(info.port_name);
        if let SerialPortType::UsbPort(usb) = info.port_type {
            port.usb = Some(UsbId {
                vid: usb.vid,
                pid: usb.pid,
            });
            port.description = usb.product.or(usb.manufacturer);
        }
        port
    }
}

/// Evaluation kits enumerate as USB serial bridges; list those first
fn rank(name: &str) -> (u8, u32, &str) {
    let device = name.rsplit('/').next().unwrap_or(name);
    for (class, prefix) in [(0u8, "ttyUSB"), (1, "ttyACM")] {
        if let Some(index) = device.strip_prefix(prefix) {
            return (class, index.parse().unwrap_or(u32::MAX), device);
        }
    }
    (2, 0, device)
}

/// Serial devices present on this host, bridges first
pub fn list_ports() -> Vec<PortInfo> {
    let mut found: BTreeMap<String, PortInfo> = serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(|info| {
            let port = PortInfo::from(info);
            (port.name.clone(), port)
        })
        .collect();

    // udev can lag behind freshly plugged CDC devices
    #[cfg(target_os = "linux")]
    for entry in std::fs::read_dir("/dev").into_iter().flatten().flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if rank(name).0 < 2 {
            let path = format!("/dev/{name}");
            found
                .entry(path.clone())
                .or_insert_with(|| PortInfo::from_name(path));
        }
    }

    let mut ports: Vec<PortInfo> = found.into_values().collect();
    ports.sort_by(|a, b| rank(&a.name).cmp(&rank(&b.name)));
    ports
}

/// Open the modem UART (8N1, optional RTS/CTS flow control)
pub fn open_port(config: &TransportConfig) -> Result<SerialStream, ModemError> {
    let flow_control = if config.flow_control {
        FlowControl::Hardware
    } else {
        FlowControl::None
    };

    let mut port = tokio_serial::new(&config.port, config.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(flow_control)
        .open_native_async()
        .map_err(|e| match e.kind {
            serialport::ErrorKind::NoDevice => ModemError::PortNotFound(config.port.clone()),
            _ => ModemError::ConnectionError(format!("{}: {}", config.port, e)),
        })?;

    #[cfg(unix)]
    port.set_exclusive(true)
        .map_err(|e| ModemError::ConnectionError(format!("{}: {}", config.port, e)))?;

    // Keep DTR asserted
    if let Err(e) = port.write_data_terminal_ready(true) {
        warn!("open_port: DTR not set on {}: {}", config.port, e);
    }

    debug!(
        "open_port: {} at {} baud, flow control {:?}",
        config.port, config.baud_rate, flow_control
    );

    Ok(port)
}
