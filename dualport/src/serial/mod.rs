use crate::constants;
use crate::error::SerialError;

#[cfg(feature = "serial")]
mod host;

#[cfg(feature = "serial")]
pub use host::HostUart;

/// UART character frame formats supported by the RTU port
///
/// The digit counts data plus parity bits, so `Mode9O1` is eight data bits
/// followed by an odd parity bit.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum UartMode {
    /// 8 data bits, no parity, 2 stop bits
    #[default]
    Mode8N2,
    /// 8 data bits, odd parity, 1 stop bit
    Mode9O1,
    /// 8 data bits, even parity, 1 stop bit
    Mode9E1,
}

impl UartMode {
    pub(crate) fn parity(self) -> Parity {
        match self {
            UartMode::Mode8N2 => Parity::None,
            UartMode::Mode9O1 => Parity::Odd,
            UartMode::Mode9E1 => Parity::Even,
        }
    }

    pub(crate) fn stop_bits(self) -> StopBits {
        match self {
            UartMode::Mode8N2 => StopBits::Two,
            UartMode::Mode9O1 | UartMode::Mode9E1 => StopBits::One,
        }
    }
}

/// Number of bits per character
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum DataBits {
    /// 5 bits per character
    Five,
    /// 6 bits per character
    Six,
    /// 7 bits per character
    Seven,
    /// 8 bits per character
    Eight,
}

/// Parity checking modes
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum Parity {
    /// No parity bit
    None,
    /// Parity bit sets odd number of 1 bits
    Odd,
    /// Parity bit sets even number of 1 bits
    Even,
}

/// Number of stop bits
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum StopBits {
    /// One stop bit
    One,
    /// Two stop bits
    Two,
}

/// Flow control modes
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum FlowControl {
    /// No flow control
    None,
    /// Flow control using XON/XOFF bytes
    Software,
    /// Flow control using RTS/CTS signals
    Hardware,
}

/// Serial port settings
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct SerialSettings {
    /// Baud rate of the port
    pub baud_rate: u32,
    /// Number of data bits
    pub data_bits: DataBits,
    /// Types of flow control
    pub flow_control: FlowControl,
    /// Number of stop bits
    pub stop_bits: StopBits,
    /// Parity setting
    pub parity: Parity,
}

impl SerialSettings {
    /// Settings for a baud rate and one of the RTU frame formats
    pub fn new(baud_rate: u32, mode: UartMode) -> Self {
        Self {
            baud_rate,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            stop_bits: mode.stop_bits(),
            parity: mode.parity(),
        }
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: constants::serial::DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            stop_bits: StopBits::One,
            parity: Parity::None,
        }
    }
}

#[cfg(feature = "serial")]
impl From<DataBits> for tokio_serial::DataBits {
    fn from(value: DataBits) -> Self {
        match value {
            DataBits::Five => tokio_serial::DataBits::Five,
            DataBits::Six => tokio_serial::DataBits::Six,
            DataBits::Seven => tokio_serial::DataBits::Seven,
            DataBits::Eight => tokio_serial::DataBits::Eight,
        }
    }
}

#[cfg(feature = "serial")]
impl From<FlowControl> for tokio_serial::FlowControl {
    fn from(value: FlowControl) -> Self {
        match value {
            FlowControl::None => tokio_serial::FlowControl::None,
            FlowControl::Software => tokio_serial::FlowControl::Software,
            FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
        }
    }
}

#[cfg(feature = "serial")]
impl From<StopBits> for tokio_serial::StopBits {
    fn from(value: StopBits) -> Self {
        match value {
            StopBits::One => tokio_serial::StopBits::One,
            StopBits::Two => tokio_serial::StopBits::Two,
        }
    }
}

#[cfg(feature = "serial")]
impl From<Parity> for tokio_serial::Parity {
    fn from(value: Parity) -> Self {
        match value {
            Parity::None => tokio_serial::Parity::None,
            Parity::Odd => tokio_serial::Parity::Odd,
            Parity::Even => tokio_serial::Parity::Even,
        }
    }
}

/// The UART primitives the serial byte port is built on
///
/// Implementations must bound every transfer, a byte that cannot be moved
/// within the hardware timeout is reported as [`SerialError::Timeout`].
pub trait Uart: Send {
    /// Enable or disable the receive and transmit-empty interrupt sources
    fn set_interrupts(&mut self, rx: bool, tx: bool);
    /// Transmit one byte
    fn write_byte(&mut self, byte: u8) -> Result<(), SerialError>;
    /// Receive one byte
    fn read_byte(&mut self) -> Result<u8, SerialError>;
}

/// Byte-oriented RTU port over a [`Uart`]
///
/// Holds the two interrupt-enable flags and nothing else, no bytes are buffered.
#[derive(Debug)]
pub struct SerialPort<U> {
    uart: U,
    rx_enabled: bool,
    tx_enabled: bool,
}

impl<U> SerialPort<U>
where
    U: Uart,
{
    /// Wrap a UART with both interrupt sources disabled
    pub fn new(mut uart: U) -> Self {
        uart.set_interrupts(false, false);
        Self {
            uart,
            rx_enabled: false,
            tx_enabled: false,
        }
    }

    /// Toggle the receive and transmit-empty interrupts independently
    pub fn set_enabled(&mut self, rx: bool, tx: bool) {
        if rx != self.rx_enabled || tx != self.tx_enabled {
            tracing::trace!("serial interrupts - rx: {} tx: {}", rx, tx);
        }
        self.rx_enabled = rx;
        self.tx_enabled = tx;
        self.uart.set_interrupts(rx, tx);
    }

    /// Transmit one byte, returning true if it was accepted by the UART
    pub fn put_byte(&mut self, byte: u8) -> bool {
        match self.uart.write_byte(byte) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("unable to transmit byte: {}", err);
                false
            }
        }
    }

    /// Receive one byte, or `None` if no byte arrived in time
    pub fn get_byte(&mut self) -> Option<u8> {
        match self.uart.read_byte() {
            Ok(byte) => Some(byte),
            Err(SerialError::Timeout) => None,
            Err(err) => {
                tracing::warn!("unable to receive byte: {}", err);
                None
            }
        }
    }

    /// State of the receive interrupt
    pub fn rx_enabled(&self) -> bool {
        self.rx_enabled
    }

    /// State of the transmit-empty interrupt
    pub fn tx_enabled(&self) -> bool {
        self.tx_enabled
    }

    /// Access the underlying UART
    pub fn uart(&self) -> &U {
        &self.uart
    }

    /// Mutable access to the underlying UART
    pub fn uart_mut(&mut self) -> &mut U {
        &mut self.uart
    }

    /// Release the underlying UART
    pub fn into_inner(self) -> U {
        self.uart
    }
}
