//! MCP23008 indicator/interrupt expander
//!
//! GP0/GP1 are sense inputs with interrupt-on-change armed against DEFVAL;
//! the remaining pins drive the front-panel LEDs.

use std::{
    io::{self, Write as _},
    time::Duration,
};

use embedded_hal::i2c::I2c;

use crate::device::Device;

/// Bus unit and 7-bit address of the expander.
pub const BUS: u32 = 1;
pub const ADDRESS: u8 = 0x20;

/// LED pattern driven once at startup.
pub const INDICATOR_PATTERN: u8 = 0x28;
/// Settle time after driving the indicator pattern.
pub const SETTLE: Duration = Duration::from_millis(500);

const IODIR: u8 = 0x00;
const IPOL: u8 = 0x01;
const GPINTEN: u8 = 0x02;
const DEFVAL: u8 = 0x03;
const INTCON: u8 = 0x04;
const INTF: u8 = 0x07;
const GPIO: u8 = 0x09;

/// GP0/GP1: direction, interrupt enable, and the DEFVAL comparison value.
const INPUT_PINS: u8 = 0x03;

pub struct Mcp23008<B> {
    dev: Device<B>,
}

impl<B: I2c> Mcp23008<B> {
    pub fn new(bus: B) -> Self {
        Mcp23008 { dev: Device::new(bus, ADDRESS) }
    }

    /// Writes the five configuration registers in order. The first failed
    /// write ends configuration.
    pub fn configure(&mut self) -> Result<(), B::Error> {
        self.dev.write_register(IODIR, INPUT_PINS)?;
        self.dev.write_register(IPOL, 0x00)?;
        self.dev.write_register(GPINTEN, INPUT_PINS)?;
        self.dev.write_register(DEFVAL, INPUT_PINS)?;
        self.dev.write_register(INTCON, INPUT_PINS)?;
        Ok(())
    }

    /// Drives the output latch once.
    pub fn set_indicators(&mut self, pattern: u8) -> Result<(), B::Error> {
        self.dev.write_register(GPIO, pattern)
    }

    /// One poll step: reads the interrupt-flag register and, on a recognized
    /// value (a flagged input pin or both), reads it a second time and
    /// returns that value. The second read also clears a latched flag on
    /// parts that clear on read.
    pub fn poll_once(&mut self) -> Result<Option<u8>, B::Error> {
        match self.dev.read_register(INTF)? {
            1..=3 => self.dev.read_register(INTF).map(Some),
            _ => Ok(None),
        }
    }

    /// Polls the interrupt-flag register until a bus error, printing every
    /// recognized flag value in binary.
    pub fn watch(&mut self) -> Result<(), B::Error> {
        loop {
            if let Some(flags) = self.poll_once()? {
                print!("intf {:08b}\r", flags);
                io::stdout().flush().ok();
            }
        }
    }

    /// Gives the bus handle back.
    pub fn release(self) -> B {
        self.dev.release()
    }
}
