//! Register level models of the board's SPI and I2C side, so the drivers
//! can run without hardware (tests, `--simulate`).

mod i2c;
mod register_file;
mod spi;
mod sram;

pub use self::i2c::{
	I2cEvent,
	SimI2c,
	SimI2cRegisters,
	SimTarget,
};

pub use self::register_file::RegisterFile;

pub use self::spi::{
	SimChipSelect,
	SimSpi,
	SimSpiRegisters,
	SpiEvent,
};

pub use self::sram::Sram23k256;

use crate::regs::{
	CLR,
	INV,
	SET,
};

// resolve a write to a register or one of its CLR/SET/INV shadows
fn shadow_write(old: u32, offset: usize, data: u32) -> u32 {
	match offset & 0xc {
		CLR => old & !data,
		SET => old | data,
		INV => old ^ data,
		_ => data,
	}
}
