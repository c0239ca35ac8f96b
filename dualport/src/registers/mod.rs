use crate::constants::map;
use crate::types::RegisterSpace;

pub(crate) mod bits;
mod store;

pub use store::*;

/// Declared bounds of one address space
///
/// `start` is the index of the first object as the application numbers them.
/// The protocol engine hands the store the PDU address plus one, which is
/// converted back by subtracting one before it is compared with these bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct SpaceBounds {
    /// first valid address
    pub start: u16,
    /// number of objects in the space
    pub quantity: u16,
}

impl SpaceBounds {
    /// Create bounds from a start address and a quantity
    pub const fn new(start: u16, quantity: u16) -> Self {
        Self { start, quantity }
    }

    /// Storage offset of a protocol address if the whole range lies in bounds
    ///
    /// Address 0 has no object behind it and is always rejected.
    pub fn protocol_offset_of(&self, address: u16, count: u16) -> Option<usize> {
        self.offset_of(address.checked_sub(1)?, count)
    }

    /// Storage offset of `address` if `[address, address + count)` lies entirely in bounds
    pub fn offset_of(&self, address: u16, count: u16) -> Option<usize> {
        // widen so that neither sum can wrap
        let address = u32::from(address);
        let start = u32::from(self.start);
        let end = start + u32::from(self.quantity);

        if address < start || address + u32::from(count) > end {
            return None;
        }

        Some((address - start) as usize)
    }
}

/// Layout of the four register spaces, fixed when the store is built
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct RegisterMapConfig {
    /// bounds of the discrete inputs
    pub discrete_inputs: SpaceBounds,
    /// bounds of the coils
    pub coils: SpaceBounds,
    /// bounds of the input registers
    pub input_registers: SpaceBounds,
    /// bounds of the holding registers
    pub holding_registers: SpaceBounds,
}

impl RegisterMapConfig {
    /// Bounds of a particular space
    pub fn bounds(&self, space: RegisterSpace) -> SpaceBounds {
        match space {
            RegisterSpace::DiscreteInput => self.discrete_inputs,
            RegisterSpace::Coil => self.coils,
            RegisterSpace::InputRegister => self.input_registers,
            RegisterSpace::HoldingRegister => self.holding_registers,
        }
    }
}

impl Default for RegisterMapConfig {
    fn default() -> Self {
        Self {
            discrete_inputs: SpaceBounds::new(map::DISCRETE_INPUT_START, map::DISCRETE_INPUT_QTY),
            coils: SpaceBounds::new(map::COIL_START, map::COIL_QTY),
            input_registers: SpaceBounds::new(map::INPUT_REG_START, map::INPUT_REG_QTY),
            holding_registers: SpaceBounds::new(map::HOLDING_REG_START, map::HOLDING_REG_QTY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_is_relative_to_start() {
        let bounds = SpaceBounds::new(1, 8);
        assert_eq!(bounds.offset_of(1, 8), Some(0));
        assert_eq!(bounds.offset_of(5, 4), Some(4));
    }

    #[test]
    fn rejects_ranges_outside_bounds() {
        let bounds = SpaceBounds::new(1, 8);
        assert_eq!(bounds.offset_of(0, 1), None);
        assert_eq!(bounds.offset_of(1, 9), None);
        assert_eq!(bounds.offset_of(9, 1), None);
    }

    #[test]
    fn range_check_is_free_from_overflow() {
        let bounds = SpaceBounds::new(0xFFF0, 0x000F);
        assert_eq!(bounds.offset_of(0xFFFF, 0xFFFF), None);
        assert_eq!(bounds.offset_of(0xFFFE, 1), Some(0x000E));
        assert_eq!(bounds.protocol_offset_of(0xFFFF, 1), Some(0x000E));
        assert_eq!(bounds.protocol_offset_of(0xFFFF, 2), None);
    }

    #[test]
    fn protocol_addresses_are_one_above_the_index() {
        let bounds = SpaceBounds::new(1, 4);
        assert_eq!(bounds.protocol_offset_of(0, 1), None);
        assert_eq!(bounds.protocol_offset_of(1, 1), None);
        assert_eq!(bounds.protocol_offset_of(2, 1), Some(0));
        assert_eq!(bounds.protocol_offset_of(5, 1), Some(3));
        assert_eq!(bounds.protocol_offset_of(2, 4), Some(0));
        assert_eq!(bounds.protocol_offset_of(2, 5), None);
        assert_eq!(bounds.protocol_offset_of(6, 1), None);
    }
}
