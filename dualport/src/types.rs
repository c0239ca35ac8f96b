/// The four independent address spaces of the register map
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum RegisterSpace {
    /// Single bit, read-only from the protocol side
    DiscreteInput,
    /// Single bit, read-write
    Coil,
    /// 16-bit word, read-only from the protocol side
    InputRegister,
    /// 16-bit word, read-write
    HoldingRegister,
}

impl RegisterSpace {
    /// All spaces in map order
    pub const ALL: [RegisterSpace; 4] = [
        RegisterSpace::DiscreteInput,
        RegisterSpace::Coil,
        RegisterSpace::InputRegister,
        RegisterSpace::HoldingRegister,
    ];

    /// true for the bit-packed spaces
    pub fn is_bits(self) -> bool {
        match self {
            RegisterSpace::DiscreteInput | RegisterSpace::Coil => true,
            RegisterSpace::InputRegister | RegisterSpace::HoldingRegister => false,
        }
    }

    /// true if a Modbus master is allowed to write the space
    pub fn is_writable_by_master(self) -> bool {
        match self {
            RegisterSpace::Coil | RegisterSpace::HoldingRegister => true,
            RegisterSpace::DiscreteInput | RegisterSpace::InputRegister => false,
        }
    }
}

impl std::fmt::Display for RegisterSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterSpace::DiscreteInput => f.write_str("discrete inputs"),
            RegisterSpace::Coil => f.write_str("coils"),
            RegisterSpace::InputRegister => f.write_str("input registers"),
            RegisterSpace::HoldingRegister => f.write_str("holding registers"),
        }
    }
}

/// Physical transport the protocol engine is currently bound to
///
/// Exactly one mode is active at any instant. The dispatcher only leaves
/// `Rtu` for the duration of a single TCP request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TransportMode {
    /// Serial line
    #[default]
    Rtu,
    /// Ethernet socket
    Tcp,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportMode::Rtu => f.write_str("RTU"),
            TransportMode::Tcp => f.write_str("TCP"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_spaces_are_classified() {
        let bits: Vec<RegisterSpace> = RegisterSpace::ALL
            .iter()
            .copied()
            .filter(|x| x.is_bits())
            .collect();
        assert_eq!(bits, [RegisterSpace::DiscreteInput, RegisterSpace::Coil]);
    }

    #[test]
    fn default_mode_is_rtu() {
        assert_eq!(TransportMode::default(), TransportMode::Rtu);
    }
}
