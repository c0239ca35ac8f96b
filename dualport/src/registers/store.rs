use std::sync::{Arc, Mutex};

use scursor::{ReadCursor, WriteCursor};

use crate::error::RegisterError;
use crate::registers::bits;
use crate::registers::RegisterMapConfig;
use crate::types::RegisterSpace;

/// Register store shared between the poll loop and application code
///
/// All access goes through the one mutex so that a write to one bit can never
/// tear a concurrent write to its neighbours in the same byte.
pub type SharedRegisters = Arc<Mutex<RegisterStore>>;

/// Backing storage for the four register spaces
///
/// Discrete inputs and coils are bit-packed, input and holding registers are
/// signed 16-bit words. Every operation validates the complete range before
/// touching storage.
#[derive(Debug, Clone)]
pub struct RegisterStore {
    map: RegisterMapConfig,
    discrete_inputs: Vec<u8>,
    coils: Vec<u8>,
    input_registers: Vec<i16>,
    holding_registers: Vec<i16>,
}

enum Storage<'a> {
    Bits(&'a [u8]),
    Words(&'a [i16]),
}

enum StorageMut<'a> {
    Bits(&'a mut [u8]),
    Words(&'a mut [i16]),
}

impl RegisterStore {
    /// Allocate zeroed storage for a map
    pub fn new(map: RegisterMapConfig) -> Self {
        Self {
            map,
            discrete_inputs: vec![0; bits::num_bytes_for_bits(map.discrete_inputs.quantity)],
            coils: vec![0; bits::num_bytes_for_bits(map.coils.quantity)],
            input_registers: vec![0; map.input_registers.quantity as usize],
            holding_registers: vec![0; map.holding_registers.quantity as usize],
        }
    }

    /// Allocate zeroed storage wrapped for sharing between tasks
    pub fn shared(map: RegisterMapConfig) -> SharedRegisters {
        Arc::new(Mutex::new(Self::new(map)))
    }

    /// Layout the store was built with
    pub fn map(&self) -> &RegisterMapConfig {
        &self.map
    }

    /// Number of wire bytes a read of `count` objects produces
    pub fn wire_length(space: RegisterSpace, count: u16) -> usize {
        if space.is_bits() {
            bits::num_bytes_for_bits(count)
        } else {
            2 * count as usize
        }
    }

    /// Read `count` objects starting at protocol `address` into their wire representation
    ///
    /// `address` is the PDU address plus one, as the protocol engine hands it
    /// over, so the object at index `start` of a space is reached with
    /// `start + 1`. Bits are packed eight to a byte, least significant bit
    /// first, with the unused high bits of the final byte set to zero. Words
    /// are written high byte first. Returns the number of bytes written to `out`.
    pub fn read(
        &self,
        space: RegisterSpace,
        address: u16,
        count: u16,
        out: &mut [u8],
    ) -> Result<usize, RegisterError> {
        let offset = self.protocol_offset(space, address, count)?;
        self.read_at(space, offset, count, out)
    }

    /// Write `count` objects starting at protocol `address` from their wire representation
    ///
    /// Addresses are numbered as in [`RegisterStore::read`]. For the bit spaces
    /// only the low `count % 8` bits of a trailing partial byte are used, the
    /// remaining bits of the storage byte are preserved.
    pub fn write(
        &mut self,
        space: RegisterSpace,
        address: u16,
        count: u16,
        data: &[u8],
    ) -> Result<(), RegisterError> {
        let offset = self.protocol_offset(space, address, count)?;
        check_length(Self::wire_length(space, count), data.len())?;

        match self.storage_mut(space) {
            StorageMut::Bits(storage) => bits::write_packed(storage, offset, count, data),
            StorageMut::Words(storage) => {
                let mut cursor = ReadCursor::new(data);
                for value in storage[offset..offset + count as usize].iter_mut() {
                    *value = cursor
                        .read_u16_be()
                        .map_err(|_| too_small(space, count, data.len()))?
                        as i16;
                }
            }
        }

        Ok(())
    }

    /// Read `count` objects as application words
    ///
    /// Application addresses start at the space's `start` without the protocol
    /// offset of one. Word spaces yield one element per register. Bit spaces
    /// yield one element per group of eight bits, holding the packed byte in
    /// its low half. Returns the number of elements written to `out`.
    pub fn read_words(
        &self,
        space: RegisterSpace,
        address: u16,
        count: u16,
        out: &mut [i16],
    ) -> Result<usize, RegisterError> {
        let offset = self.offset(space, address, count)?;

        match self.storage(space) {
            Storage::Bits(storage) => {
                let num_bytes = bits::num_bytes_for_bits(count);
                check_length(num_bytes, out.len())?;
                let mut packed = vec![0; num_bytes];
                bits::read_packed(storage, offset, count, &mut packed);
                for (dest, byte) in out.iter_mut().zip(packed) {
                    *dest = i16::from(byte);
                }
                Ok(num_bytes)
            }
            Storage::Words(storage) => {
                let count = count as usize;
                check_length(count, out.len())?;
                out[..count].copy_from_slice(&storage[offset..offset + count]);
                Ok(count)
            }
        }
    }

    /// Write `count` objects from application words
    ///
    /// This is the application side of the map and may write any space,
    /// including the discrete inputs and input registers a master can only read.
    /// Addresses are numbered as in [`RegisterStore::read_words`].
    pub fn write_words(
        &mut self,
        space: RegisterSpace,
        address: u16,
        count: u16,
        data: &[i16],
    ) -> Result<(), RegisterError> {
        let offset = self.offset(space, address, count)?;

        match self.storage_mut(space) {
            StorageMut::Bits(storage) => {
                let num_bytes = bits::num_bytes_for_bits(count);
                check_length(num_bytes, data.len())?;
                let packed: Vec<u8> = data[..num_bytes].iter().map(|x| *x as u8).collect();
                bits::write_packed(storage, offset, count, &packed);
            }
            StorageMut::Words(storage) => {
                let count = count as usize;
                check_length(count, data.len())?;
                storage[offset..offset + count].copy_from_slice(&data[..count]);
            }
        }

        Ok(())
    }

    /// Read a single bit at an application address
    pub fn read_bit(&self, space: RegisterSpace, address: u16) -> Result<bool, RegisterError> {
        let offset = self.offset(space, address, 1)?;
        let mut out = [0u8; 2];
        self.read_at(space, offset, 1, &mut out)?;
        Ok(out[0] & 0x01 != 0)
    }

    /// Read a single register at an application address
    pub fn read_register(&self, space: RegisterSpace, address: u16) -> Result<u16, RegisterError> {
        let offset = self.offset(space, address, 1)?;
        let mut out = [0u8; 2];
        self.read_at(space, offset, 1, &mut out)?;
        Ok(u16::from_be_bytes(out))
    }

    fn read_at(
        &self,
        space: RegisterSpace,
        offset: usize,
        count: u16,
        out: &mut [u8],
    ) -> Result<usize, RegisterError> {
        check_length(Self::wire_length(space, count), out.len())?;

        match self.storage(space) {
            Storage::Bits(storage) => Ok(bits::read_packed(storage, offset, count, out)),
            Storage::Words(storage) => {
                let actual = out.len();
                let mut cursor = WriteCursor::new(out);
                for value in &storage[offset..offset + count as usize] {
                    cursor
                        .write_u16_be(*value as u16)
                        .map_err(|_| too_small(space, count, actual))?;
                }
                Ok(cursor.position())
            }
        }
    }

    fn protocol_offset(
        &self,
        space: RegisterSpace,
        address: u16,
        count: u16,
    ) -> Result<usize, RegisterError> {
        self.map
            .bounds(space)
            .protocol_offset_of(address, count)
            .ok_or(RegisterError::NoSuchRegister {
                space,
                address,
                count,
            })
    }

    fn offset(&self, space: RegisterSpace, address: u16, count: u16) -> Result<usize, RegisterError> {
        self.map
            .bounds(space)
            .offset_of(address, count)
            .ok_or(RegisterError::NoSuchRegister {
                space,
                address,
                count,
            })
    }

    fn storage(&self, space: RegisterSpace) -> Storage<'_> {
        match space {
            RegisterSpace::DiscreteInput => Storage::Bits(&self.discrete_inputs),
            RegisterSpace::Coil => Storage::Bits(&self.coils),
            RegisterSpace::InputRegister => Storage::Words(&self.input_registers),
            RegisterSpace::HoldingRegister => Storage::Words(&self.holding_registers),
        }
    }

    fn storage_mut(&mut self, space: RegisterSpace) -> StorageMut<'_> {
        match space {
            RegisterSpace::DiscreteInput => StorageMut::Bits(&mut self.discrete_inputs),
            RegisterSpace::Coil => StorageMut::Bits(&mut self.coils),
            RegisterSpace::InputRegister => StorageMut::Words(&mut self.input_registers),
            RegisterSpace::HoldingRegister => StorageMut::Words(&mut self.holding_registers),
        }
    }
}

impl Default for RegisterStore {
    fn default() -> Self {
        Self::new(RegisterMapConfig::default())
    }
}

fn check_length(required: usize, actual: usize) -> Result<(), RegisterError> {
    if actual < required {
        return Err(RegisterError::BufferTooSmall { required, actual });
    }
    Ok(())
}

fn too_small(space: RegisterSpace, count: u16, actual: usize) -> RegisterError {
    RegisterError::BufferTooSmall {
        required: RegisterStore::wire_length(space, count),
        actual,
    }
}
