//! Carrier-board I2C diagnostics: configure the MCP23008 indicator expander,
//! drive the LED pattern once, then watch its interrupt flags until killed.

use std::thread;

use anyhow::Context;

use i2c_diag::i2c::I2cBus;
use i2c_diag::mcp23008::{self, Mcp23008};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let bus = I2cBus::from_unit(mcp23008::BUS)
        .context("can't open i2c bus for the indicator expander")?;
    let mut expander = Mcp23008::new(bus);
    expander.configure().context("can't configure the indicator expander")?;
    expander
        .set_indicators(mcp23008::INDICATOR_PATTERN)
        .context("can't drive the indicator pattern")?;
    thread::sleep(mcp23008::SETTLE);
    drop(expander);

    log::info!("watching mcp23008 interrupt flags on bus {}", mcp23008::BUS);
    let bus = I2cBus::from_unit(mcp23008::BUS).context("can't reopen i2c bus for polling")?;
    Mcp23008::new(bus).watch().context("interrupt flag poll failed")?;
    Ok(())
}
