//! Polled SPI master for the PIC32 SPIx peripheral.
//!
//! Only 8-bit, standard buffer mode is used. Every transfer is a single
//! `exchange`: write SPIxBUF, spin on SPIRBF, read SPIxBUF. Framing is the
//! job of the caller, which brackets its exchanges with the chip select
//! line (see `SpiBus::transaction`).

mod chip_select;
mod master;
pub mod registers;

pub use self::chip_select::{
	ChipSelect,
	GpioChipSelect,
};

pub use self::master::{
	ClockEdge,
	ClockPolarity,
	SpiBus,
	SpiConfig,
	SpiMaster,
	Transaction,
};
