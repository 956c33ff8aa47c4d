//! I2C diagnostics for a SAMA5D27-SOM1 carrier board
//!
//! Fill-pattern tests for the M24M-01 carrier EEPROM and the SOM identity
//! EEPROM, a MAC-address reader, and an MCP23008 indicator/interrupt
//! expander driver, all generic over the [`embedded-hal`] blocking I2C trait.
//! [`i2c::I2cBus`] supplies the real bus through the Linux `i2c-dev`
//! interface.
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal

pub mod device;
pub use device::{Device, OpenBus};

pub mod eeprom;

pub mod i2c;
pub use i2c::{BusUnit, I2cBus, I2cError};

pub mod mcp23008;
pub use mcp23008::Mcp23008;

pub mod pattern;
