//! NU32 wiring (PIC32MX250F128B):
//! - SPI1: SCK1, SDI1 and SDO1 to the 23K256 (pins remapped by board
//!   bring-up), chip select on RA0
//! - I2C2: SCL2/SDA2, external pull-ups
//!
//! Register windows are reached through their physical addresses
//! (`/dev/mem`).

use std::sync::atomic::{
	AtomicBool,
	Ordering,
};

use crate::i2c::{
	I2cConfig,
	I2cMaster,
};
use crate::regs::{
	self,
	Mapped,
};
use crate::spi::{
	GpioChipSelect,
	SpiConfig,
	SpiMaster,
};
use crate::PollLimit;

/// peripheral bus clock
pub const PBCLK_HZ: u32 = 80_000_000;
/// I2C pulse gobbler delay
pub const I2C_PGD_NS: u32 = 104;
/// SCK = Pbclk / (2 * (3 + 1)) = 10 MHz
pub const SPI_BAUD_DIVISOR: u16 = 3;
pub const I2C_BUS_HZ: u32 = 100_000;

pub const SPI1_BASE: u64 = 0x1f80_5800;
pub const I2C2_BASE: u64 = 0x1f80_5100;
pub const PORTA_BASE: u64 = 0x1f88_6000;
pub const CS_PIN: u8 = 0;

const SPI_WINDOW: usize = 0x40;
const I2C_WINDOW: usize = 0x70;
const PORT_WINDOW: usize = 0x40;

static TAKEN: AtomicBool = AtomicBool::new(false);

/// Permission to open SPI1; only `Peripherals::take` creates one.
#[derive(Debug)]
pub struct Spi1 {
	_private: (),
}

/// Permission to open I2C2; only `Peripherals::take` creates one.
#[derive(Debug)]
pub struct I2c2 {
	_private: (),
}

#[derive(Debug)]
pub struct Peripherals {
	pub spi1: Spi1,
	pub i2c2: I2c2,
}

impl Peripherals {
	/// `Some` on the first call in a process, `None` afterwards.
	pub fn take() -> Option<Self> {
		if TAKEN.swap(true, Ordering::SeqCst) {
			return None;
		}
		Some(Peripherals {
			spi1: Spi1 { _private: () },
			i2c2: I2c2 { _private: () },
		})
	}
}

pub fn spi_config() -> SpiConfig {
	SpiConfig {
		baud_divisor: SPI_BAUD_DIVISOR,
		.. SpiConfig::default()
	}
}

pub fn i2c_config() -> I2cConfig {
	I2cConfig {
		bus_hz: I2C_BUS_HZ,
		pbclk_hz: PBCLK_HZ,
		pgd_ns: I2C_PGD_NS,
	}
}

pub type BoardSpi = SpiMaster<Mapped, GpioChipSelect<Mapped>>;
pub type BoardI2c = I2cMaster<Mapped>;

fn map(name: &str, base: u64, len: usize) -> crate::AResult<Mapped> {
	with_context!(("couldn't map {} registers at 0x{:08x}", name, base), {
		Ok(regs::open_physical(base, len)?)
	})
}

/// SPI1 in master mode with the chip select on RA0.
pub fn open_spi1(spi1: Spi1, poll: PollLimit) -> crate::AResult<BoardSpi> {
	let _ = spi1;
	let regs = map("SPI1", SPI1_BASE, SPI_WINDOW)?;
	let port = map("PORTA", PORTA_BASE, PORT_WINDOW)?;
	let cs = GpioChipSelect::new(port, CS_PIN);
	SpiMaster::initialize(regs, cs, spi_config(), poll)
}

pub fn open_i2c2(i2c2: I2c2, poll: PollLimit) -> crate::AResult<BoardI2c> {
	let _ = i2c2;
	let regs = map("I2C2", I2C2_BASE, I2C_WINDOW)?;
	I2cMaster::initialize(regs, i2c_config(), poll)
}
