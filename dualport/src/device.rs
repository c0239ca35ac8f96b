use crate::constants;
use crate::error::DeviceConfigError;
use crate::serial::{SerialSettings, UartMode};

/// Identity and line settings of the RTU side
///
/// Setters validate their input and return true when the value changed, in
/// which case the protocol engine must be re-initialised for it to take effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct DeviceConfig {
    slave_address: u8,
    baud_rate: u32,
    uart_mode: UartMode,
}

impl DeviceConfig {
    /// Build a validated configuration
    pub fn new(slave_address: u8, baud_rate: u32, uart_mode: UartMode) -> Result<Self, DeviceConfigError> {
        let mut config = Self::default();
        config.set_slave_address(slave_address)?;
        config.set_baud_rate(baud_rate)?;
        config.set_uart_mode(uart_mode);
        Ok(config)
    }

    /// Unicast address the engine answers to
    pub fn slave_address(&self) -> u8 {
        self.slave_address
    }

    /// RTU line speed
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// RTU character format
    pub fn uart_mode(&self) -> UartMode {
        self.uart_mode
    }

    /// Set the slave address, which must lie in 1..=247
    pub fn set_slave_address(&mut self, address: u8) -> Result<bool, DeviceConfigError> {
        if !(constants::serial::MIN_SLAVE_ADDRESS..=constants::serial::MAX_SLAVE_ADDRESS)
            .contains(&address)
        {
            return Err(DeviceConfigError::InvalidSlaveAddress(address));
        }
        Ok(std::mem::replace(&mut self.slave_address, address) != address)
    }

    /// Set the baud rate, which must be non-zero
    pub fn set_baud_rate(&mut self, baud_rate: u32) -> Result<bool, DeviceConfigError> {
        if baud_rate == 0 {
            return Err(DeviceConfigError::InvalidBaudRate(baud_rate));
        }
        Ok(std::mem::replace(&mut self.baud_rate, baud_rate) != baud_rate)
    }

    /// Set the character format
    pub fn set_uart_mode(&mut self, mode: UartMode) -> bool {
        std::mem::replace(&mut self.uart_mode, mode) != mode
    }

    /// Serial settings matching the baud rate and character format
    pub fn serial_settings(&self) -> SerialSettings {
        SerialSettings::new(self.baud_rate, self.uart_mode)
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            slave_address: constants::serial::MIN_SLAVE_ADDRESS,
            baud_rate: constants::serial::DEFAULT_BAUD_RATE,
            uart_mode: UartMode::Mode8N2,
        }
    }
}
