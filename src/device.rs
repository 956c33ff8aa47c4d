//! Register-level access to one device behind an I2C bus handle

use embedded_hal::i2c::{ErrorType, I2c, SevenBitAddress};

use crate::i2c::{I2cBus, I2cError};

/// Source of bus handles for code that opens a fresh handle per transfer.
///
/// The page tester opens and releases the bus around every single operation;
/// other devices hold one handle for their whole lifetime and take a plain
/// [`Device`] instead. Keeping the strategy in the signature makes the
/// difference visible and lets tests substitute a shared in-memory bus.
pub trait OpenBus {
    type Bus: I2c;

    fn open(&self) -> Result<Self::Bus, <Self::Bus as ErrorType>::Error>;
}

/// One chip at a fixed 7-bit address, addressed through register or memory
/// framing.
pub struct Device<B> {
    bus: B,
    address: SevenBitAddress,
}

impl<B: I2c> Device<B> {
    pub fn new(bus: B, address: SevenBitAddress) -> Self {
        Device { bus, address }
    }

    pub fn address(&self) -> SevenBitAddress {
        self.address
    }

    /// Writes one byte to a register: `[reg, value]` on the wire.
    pub fn write_register(&mut self, reg: u8, value: u8) -> Result<(), B::Error> {
        self.bus.write(self.address, &[reg, value])
    }

    /// Reads one byte from a register via a repeated-start transfer.
    pub fn read_register(&mut self, reg: u8) -> Result<u8, B::Error> {
        let mut value = [0u8; 1];
        self.bus.write_read(self.address, &[reg], &mut value)?;
        Ok(value[0])
    }

    /// Sequential read of `buf.len()` bytes starting at `reg`.
    pub fn read_registers(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), B::Error> {
        self.bus.write_read(self.address, &[reg], buf)
    }

    /// Writes `data` at a 16-bit memory address: `[page, offset, data…]` on
    /// the wire, for parts addressed with two address bytes.
    pub fn write_memory(&mut self, page: u8, offset: u8, data: &[u8]) -> Result<(), B::Error> {
        let mut frame = Vec::with_capacity(2 + data.len());
        frame.push(page);
        frame.push(offset);
        frame.extend_from_slice(data);
        self.bus.write(self.address, &frame)
    }

    /// Sequential read of `buf.len()` bytes starting at a 16-bit memory
    /// address.
    pub fn read_memory(&mut self, page: u8, offset: u8, buf: &mut [u8]) -> Result<(), B::Error> {
        self.bus.write_read(self.address, &[page, offset], buf)
    }

    /// Unbinds the device and gives the bus handle back.
    pub fn release(self) -> B {
        self.bus
    }
}

impl Device<I2cBus> {
    /// Opens `/dev/i2c-{unit}` and binds it to `address`. The handle is
    /// released when the device is dropped.
    pub fn open(address: SevenBitAddress, unit: u32) -> Result<Self, I2cError> {
        Ok(Device::new(I2cBus::from_unit(unit)?, address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::i2c::{Mock, Transaction};

    #[test]
    fn write_register_frames_reg_then_value() {
        let mut dev = Device::new(
            Mock::new(&[Transaction::write(0x51, vec![0x10, 0xAB])]),
            0x51,
        );
        dev.write_register(0x10, 0xAB).unwrap();
        dev.release().done();
    }

    #[test]
    fn read_register_uses_repeated_start() {
        let mut dev = Device::new(
            Mock::new(&[Transaction::write_read(0x51, vec![0x10], vec![0x5A])]),
            0x51,
        );
        assert_eq!(dev.read_register(0x10).unwrap(), 0x5A);
        dev.release().done();
    }

    #[test]
    fn read_registers_fills_the_whole_buffer() {
        let mut dev = Device::new(
            Mock::new(&[Transaction::write_read(0x51, vec![0xFA], vec![0x11, 0x22, 0x33])]),
            0x51,
        );
        let mut buf = [0u8; 3];
        dev.read_registers(0xFA, &mut buf).unwrap();
        assert_eq!(buf, [0x11, 0x22, 0x33]);
        dev.release().done();
    }

    #[test]
    fn write_memory_prefixes_both_address_bytes() {
        let mut dev = Device::new(
            Mock::new(&[Transaction::write(0x50, vec![0x02, 0x00, 0xAA, 0xBB])]),
            0x50,
        );
        dev.write_memory(0x02, 0x00, &[0xAA, 0xBB]).unwrap();
        dev.release().done();
    }

    #[test]
    fn read_memory_addresses_then_reads() {
        let mut dev = Device::new(
            Mock::new(&[Transaction::write_read(0x50, vec![0x02, 0x00], vec![0xAA, 0xBB])]),
            0x50,
        );
        let mut buf = [0u8; 2];
        dev.read_memory(0x02, 0x00, &mut buf).unwrap();
        assert_eq!(buf, [0xAA, 0xBB]);
        dev.release().done();
    }
}
