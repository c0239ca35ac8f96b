use std::io::{Read, Write};

use crate::constants;
use crate::error::SerialError;
use crate::serial::{SerialSettings, Uart};

/// [`Uart`] over an operating system serial port
///
/// Transfers block for at most [`constants::serial::BYTE_TIMEOUT`]. A host
/// port has no interrupt sources, so the enable flags are only recorded.
pub struct HostUart {
    port: Box<dyn tokio_serial::SerialPort>,
    interrupts: (bool, bool),
}

impl std::fmt::Debug for HostUart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostUart")
            .field("name", &self.port.name())
            .field("interrupts", &self.interrupts)
            .finish()
    }
}

impl HostUart {
    /// Open a port with the given settings
    pub fn open(path: &str, settings: SerialSettings) -> Result<Self, SerialError> {
        let port = tokio_serial::new(path, settings.baud_rate)
            .data_bits(settings.data_bits.into())
            .flow_control(settings.flow_control.into())
            .stop_bits(settings.stop_bits.into())
            .parity(settings.parity.into())
            .timeout(constants::serial::BYTE_TIMEOUT)
            .open()
            .map_err(|err| SerialError::Open(err.to_string()))?;

        tracing::info!("opened serial port: {}", path);

        Ok(Self {
            port,
            interrupts: (false, false),
        })
    }

    /// Last interrupt enable flags requested by the port
    pub fn interrupts(&self) -> (bool, bool) {
        self.interrupts
    }
}

impl Uart for HostUart {
    fn set_interrupts(&mut self, rx: bool, tx: bool) {
        self.interrupts = (rx, tx);
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), SerialError> {
        match self.port.write(&[byte])? {
            0 => Err(SerialError::Timeout),
            _ => Ok(()),
        }
    }

    fn read_byte(&mut self) -> Result<u8, SerialError> {
        let mut buffer = [0u8; 1];
        match self.port.read(&mut buffer)? {
            0 => Err(SerialError::Timeout),
            _ => Ok(buffer[0]),
        }
    }
}
