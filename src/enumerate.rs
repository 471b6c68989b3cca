//! Listing the serial ports the host knows about.

use std::io::Write;

use log::debug;
use serialport::{SerialPortInfo, SerialPortType, UsbPortInfo};

use crate::error::OsError;
use crate::{Error, Result};

/// Asks the OS for its serial ports.
pub fn available_ports() -> Result<Vec<SerialPortInfo>> {
    let ports = serialport::available_ports()
        .map_err(|e| Error::Enumerate(OsError::capture(e)))?;
    debug!("enumeration found {} port(s)", ports.len());
    Ok(ports)
}

fn describe_usb(info: &UsbPortInfo) -> String {
    let mut description = format!("USB {:04x}:{:04x}", info.vid, info.pid);
    for part in [&info.manufacturer, &info.product].into_iter().flatten() {
        description.push(' ');
        description.push_str(part);
    }
    if let Some(interface) = usb_interface(info) {
        description.push_str(&format!(" interface {}", interface));
    }
    description
}

#[cfg(feature = "usbportinfo-interface")]
fn usb_interface(info: &UsbPortInfo) -> Option<u8> {
    info.interface
}

#[cfg(not(feature = "usbportinfo-interface"))]
fn usb_interface(_info: &UsbPortInfo) -> Option<u8> {
    None
}

fn describe(port_type: &SerialPortType) -> Option<String> {
    match port_type {
        SerialPortType::UsbPort(info) => Some(describe_usb(info)),
        SerialPortType::PciPort => Some("PCI".to_owned()),
        SerialPortType::BluetoothPort => Some("Bluetooth".to_owned()),
        SerialPortType::Unknown => None,
    }
}

/// Prints a count followed by one port per line. An empty list is an error and prints nothing.
pub fn list<W: Write>(ports: &[SerialPortInfo], out: &mut W) -> Result<()> {
    if ports.is_empty() {
        return Err(Error::NoPorts);
    }

    writeln!(out, "{} serial port(s):", ports.len())?;
    for port in ports {
        match describe(&port.port_type) {
            Some(description) => writeln!(out, "  {} ({})", port.port_name, description)?,
            None => writeln!(out, "  {}", port.port_name)?,
        }
    }
    Ok(())
}
