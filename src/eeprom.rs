//! Fill-pattern tests for the carrier and SOM EEPROMs
//!
//! Two devices, two resource strategies:
//!
//! * the M24M-01 carrier EEPROM is exercised page by page with a fresh bus
//!   handle opened around every transfer ([`write_page`]/[`read_page`]);
//! * the SOM identity EEPROM is exercised byte by byte over one handle held
//!   for the whole run ([`ByteTest::run`]).
//!
//! A page-test failure of any kind aborts the run; the byte test only aborts
//! on bus errors and downgrades read-back mismatches to warnings.

use std::{
    fmt,
    io::{self, Write as _},
    ops::RangeInclusive,
    thread,
    time::Duration,
};

use embedded_hal::i2c::{ErrorType, I2c};

use crate::device::{Device, OpenBus};
use crate::i2c::{BusUnit, I2cBus, I2cError};
use crate::pattern::{fill_with_value, is_fill_value};

/// Bus unit the M24M-01 carrier EEPROM sits on.
pub const M24M01_BUS: u32 = 1;
/// The 1-Mbit array answers on two consecutive 7-bit addresses, 256 pages
/// each.
pub const M24M01_SUBADDRS: RangeInclusive<u8> = 0x50..=0x51;
pub const M24M01_PAGES: RangeInclusive<u8> = 0x00..=0xFF;
pub const PAGE_SIZE: usize = 0x100;

/// Bus unit and address of the SOM identity EEPROM.
pub const SOM_BUS: u32 = 0;
pub const SOM_ADDRESS: u8 = 0x51;
/// Byte range exercised by the SOM test; the upper half holds vendor data.
pub const SOM_REGISTERS: RangeInclusive<u8> = 0x00..=0x7F;
/// Start of the factory-programmed EUI-48 field.
pub const MAC_REGISTER: u8 = 0xFA;

/// Patterns written across the full range, one pass each.
pub const FILL_VALUES: [u8; 2] = [0x00, 0xFF];

/// Internal write-cycle time, tW per the M24M-01 and AT24MAC datasheets.
const WRITE_CYCLE: Duration = Duration::from_millis(5);

type BusError<O> = <<O as OpenBus>::Bus as ErrorType>::Error;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum TestError<E> {
    #[error("can't open i2c bus: {0}")]
    Open(E),
    #[error("eeprom write failed: {0}")]
    Write(E),
    #[error("eeprom read failed: {0}")]
    Read(E),
    #[error("read-back mismatch at sub-address {subaddr:#04x}, page {page:#04x}, cell {cell:#04x}")]
    Mismatch { subaddr: u8, page: u8, cell: usize },
}

/// Writes one page at offset 0 of `subaddr`, then waits out the device's
/// internal write cycle. Opens a fresh handle and releases it on return.
pub fn write_page<O: OpenBus>(
    bus: &O,
    subaddr: u8,
    page: u8,
    data: &[u8; PAGE_SIZE],
) -> Result<(), TestError<BusError<O>>> {
    let handle = bus.open().map_err(TestError::Open)?;
    let mut dev = Device::new(handle, subaddr);
    dev.write_memory(page, 0x00, data).map_err(TestError::Write)?;
    thread::sleep(WRITE_CYCLE);
    Ok(())
}

/// Reads one page from offset 0 of `subaddr`. Opens a fresh handle and
/// releases it on return.
pub fn read_page<O: OpenBus>(
    bus: &O,
    subaddr: u8,
    page: u8,
) -> Result<[u8; PAGE_SIZE], TestError<BusError<O>>> {
    let handle = bus.open().map_err(TestError::Open)?;
    let mut dev = Device::new(handle, subaddr);
    let mut data = [0u8; PAGE_SIZE];
    dev.read_memory(page, 0x00, &mut data).map_err(TestError::Read)?;
    Ok(data)
}

/// Write/read/verify sweep over the paged EEPROM.
///
/// The ranges default to the full part; tests narrow them.
pub struct PageTest {
    pub subaddrs: RangeInclusive<u8>,
    pub pages: RangeInclusive<u8>,
}

impl Default for PageTest {
    fn default() -> Self {
        PageTest { subaddrs: M24M01_SUBADDRS, pages: M24M01_PAGES }
    }
}

impl PageTest {
    /// Runs both fill passes over the configured range. The first bus error
    /// or read-back mismatch ends the run.
    pub fn run<O: OpenBus>(&self, bus: &O) -> Result<(), TestError<BusError<O>>> {
        let mut page_buf = [0u8; PAGE_SIZE];
        let total = self.pages.clone().count();
        for &fill in FILL_VALUES.iter() {
            fill_with_value(&mut page_buf, fill);
            for subaddr in self.subaddrs.clone() {
                for (done, page) in self.pages.clone().enumerate() {
                    write_page(bus, subaddr, page, &page_buf)?;
                    let readback = read_page(bus, subaddr, page)?;
                    if !is_fill_value(&readback, fill) {
                        let cell = readback.iter().position(|&b| b != fill).unwrap_or(0);
                        return Err(TestError::Mismatch { subaddr, page, cell });
                    }
                    print!(
                        "write-read {:#04x} sub-address {:#04x} page {:3} ({:3}%)\r",
                        fill,
                        subaddr,
                        page,
                        (done + 1) * 100 / total
                    );
                    io::stdout().flush().ok();
                }
                println!();
            }
        }
        println!("EEPROM M24M01 test OK");
        Ok(())
    }
}

/// Byte-at-a-time write/read/verify sweep over the SOM EEPROM, on a handle
/// the caller keeps open for the whole run.
pub struct ByteTest {
    pub registers: RangeInclusive<u8>,
}

impl Default for ByteTest {
    fn default() -> Self {
        ByteTest { registers: SOM_REGISTERS }
    }
}

impl ByteTest {
    /// Runs both fill passes and returns how many bytes failed to read back.
    /// Mismatches are warnings; only bus errors end the run early.
    pub fn run<B: I2c>(&self, dev: &mut Device<B>) -> Result<usize, TestError<B::Error>> {
        let count = self.registers.clone().count();
        let mut mismatches = 0;
        for &fill in FILL_VALUES.iter() {
            for reg in self.registers.clone() {
                dev.write_register(reg, fill).map_err(TestError::Write)?;
                thread::sleep(WRITE_CYCLE);
                let readback = dev.read_register(reg).map_err(TestError::Read)?;
                if readback != fill {
                    log::warn!(
                        "SOM EEPROM mismatch at byte {:#04x}: wrote {:#04x}, read {:#04x}",
                        reg,
                        fill,
                        readback
                    );
                    mismatches += 1;
                }
            }
            println!("write-read {:#04x} to {} bytes", fill, count);
        }
        println!("EEPROM SOM test OK");
        Ok(mismatches)
    }
}

/// Factory-programmed EUI-48 read from the SOM EEPROM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacAddress(pub [u8; 6]);

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}", a, b, c, d, e, g)
    }
}

/// Reads the 6-byte MAC field. Pure read, no side effects.
pub fn read_mac<B: I2c>(dev: &mut Device<B>) -> Result<MacAddress, TestError<B::Error>> {
    let mut mac = [0u8; 6];
    dev.read_registers(MAC_REGISTER, &mut mac).map_err(TestError::Read)?;
    Ok(MacAddress(mac))
}

/// Full sweep of the carrier EEPROM on the real bus.
pub fn test_m24m01() -> Result<(), TestError<I2cError>> {
    log::info!("testing M24M01 carrier EEPROM on bus {}", M24M01_BUS);
    PageTest::default().run(&BusUnit(M24M01_BUS))
}

/// Full sweep of the SOM EEPROM on the real bus, one handle for the whole
/// run.
pub fn test_som_eeprom() -> Result<usize, TestError<I2cError>> {
    log::info!("testing SOM EEPROM at {:#04x} on bus {}", SOM_ADDRESS, SOM_BUS);
    let handle = I2cBus::from_unit(SOM_BUS).map_err(TestError::Open)?;
    ByteTest::default().run(&mut Device::new(handle, SOM_ADDRESS))
}

/// Reads the SOM MAC address from the real bus.
pub fn som_mac() -> Result<MacAddress, TestError<I2cError>> {
    let handle = I2cBus::from_unit(SOM_BUS).map_err(TestError::Open)?;
    read_mac(&mut Device::new(handle, SOM_ADDRESS))
}
