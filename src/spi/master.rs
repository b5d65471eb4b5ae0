use std::ops::{
	Deref,
	DerefMut,
};

use super::registers::*;
use super::ChipSelect;
use crate::regs::RegisterBlock;
use crate::PollLimit;

/// Clock level while the bus is idle (CKP).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClockPolarity {
	IdleLow,
	IdleHigh,
}

/// Clock transition on which the master changes its output (CKE); the
/// slave samples on the other one.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClockEdge {
	ActiveToIdle,
	IdleToActive,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SpiConfig {
	pub baud_divisor: u16,
	pub polarity: ClockPolarity,
	pub edge: ClockEdge,
}

impl Default for SpiConfig {
	/// 10 MHz at an 80 MHz peripheral clock, SPI mode 0
	fn default() -> Self {
		SpiConfig {
			baud_divisor: 3,
			polarity: ClockPolarity::IdleLow,
			edge: ClockEdge::ActiveToIdle,
		}
	}
}

impl SpiConfig {
	/// divisor for the fastest SCK not above `sck_hz`:
	/// Fsck = Pbclk / (2 * (BRG + 1))
	pub fn divisor_for(pbclk_hz: u32, sck_hz: u32) -> crate::AResult<u16> {
		ensure!(sck_hz > 0, "SPI clock must not be zero");
		ensure!(sck_hz <= pbclk_hz / 2, "SPI clock {} Hz above Pbclk/2 ({} Hz)", sck_hz, pbclk_hz / 2);
		let double = 2 * u64::from(sck_hz);
		let brg = (u64::from(pbclk_hz) + double - 1) / double - 1;
		ensure!(brg <= u64::from(SPIBRG_MAX), "SPI clock {} Hz too slow for Pbclk {} Hz", sck_hz, pbclk_hz);
		Ok(brg as u16)
	}
}

/// What the memory engine needs from an SPI master.
pub trait SpiBus {
	/// shift `byte` out and return the byte shifted in at the same time
	fn exchange(&mut self, byte: u8) -> crate::AResult<u8>;
	fn select(&mut self);
	fn deselect(&mut self);

	/// select now, deselect when the returned guard is dropped
	fn transaction(&mut self) -> Transaction<'_, Self> {
		self.select();
		Transaction(self)
	}
}

impl<'a, B: ?Sized + SpiBus> SpiBus for &'a mut B {
	fn exchange(&mut self, byte: u8) -> crate::AResult<u8> {
		B::exchange(*self, byte)
	}
	fn select(&mut self) {
		B::select(*self)
	}
	fn deselect(&mut self) {
		B::deselect(*self)
	}
}

/// One chip select frame.
pub struct Transaction<'a, B: ?Sized + SpiBus + 'a>(&'a mut B);

impl<'a, B: ?Sized + SpiBus> Transaction<'a, B> {
	pub fn write(&mut self, data: &[u8]) -> crate::AResult<()> {
		for b in data {
			self.0.exchange(*b)?;
		}
		Ok(())
	}

	// clocks out zeroes while reading
	pub fn read(&mut self, target: &mut [u8]) -> crate::AResult<()> {
		for t in target.iter_mut() {
			*t = self.0.exchange(0)?;
		}
		Ok(())
	}
}

impl<'a, B: ?Sized + SpiBus> Drop for Transaction<'a, B> {
	fn drop(&mut self) {
		self.0.deselect();
	}
}

impl<'a, B: ?Sized + SpiBus> Deref for Transaction<'a, B> {
	type Target = B;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl<'a, B: ?Sized + SpiBus> DerefMut for Transaction<'a, B> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.0
	}
}

/// Polled SPI master on a PIC32 SPIx register block, 8-bit mode.
pub struct SpiMaster<R: RegisterBlock, C: ChipSelect> {
	regs: R,
	cs: C,
	poll: PollLimit,
}

impl<R: RegisterBlock, C: ChipSelect> SpiMaster<R, C> {
	/// Reset the module and bring it up as master; the chip select line is
	/// released first.
	pub fn initialize(mut regs: R, mut cs: C, config: SpiConfig, poll: PollLimit) -> crate::AResult<Self> {
		ensure!(u32::from(config.baud_divisor) <= SPIBRG_MAX,
			"SPI baud divisor {} out of range (max {})", config.baud_divisor, SPIBRG_MAX
		);

		cs.set_asserted(false);

		regs.write_word(SPICON, 0); // off and reset
		regs.read_word(SPIBUF); // drop stale receive data
		regs.write_word(SPIBRG, u32::from(config.baud_divisor));
		regs.clear_bits(SPISTAT, SpiStatus::OVERFLOW);

		let con = *SpiControl::default()
			.set_clock_idle_high(config.polarity == ClockPolarity::IdleHigh)
			.set_output_on_active_to_idle(config.edge == ClockEdge::ActiveToIdle)
			.set_master();
		regs.write_word(SPICON, con.0);
		regs.set_bits(SPICON, SpiControl::default().set_on().0);

		debug!("SPI master up: BRG={} {:?} {:?}", config.baud_divisor, config.polarity, config.edge);

		Ok(SpiMaster { regs, cs, poll })
	}

	pub fn control(&self) -> SpiControl {
		SpiControl(self.regs.read_word(SPICON))
	}

	pub fn status(&self) -> SpiStatus {
		SpiStatus(self.regs.read_word(SPISTAT))
	}

	pub fn poll_limit(&self) -> PollLimit {
		self.poll
	}

	pub fn into_parts(self) -> (R, C) {
		(self.regs, self.cs)
	}
}

impl<R: RegisterBlock, C: ChipSelect> SpiBus for SpiMaster<R, C> {
	fn exchange(&mut self, byte: u8) -> crate::AResult<u8> {
		self.regs.write_word(SPIBUF, u32::from(byte));
		let regs = &self.regs;
		crate::wait_until(self.poll, "SPI receive buffer full", || {
			SpiStatus(regs.read_word(SPISTAT)).is_receive_full()
		})?;
		let received = self.regs.read_word(SPIBUF) as u8;
		trace!("SPI: sent 0x{:02x}, received 0x{:02x}", byte, received);
		Ok(received)
	}

	fn select(&mut self) {
		self.cs.set_asserted(true);
	}

	fn deselect(&mut self) {
		self.cs.set_asserted(false);
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::sim::{SimChipSelect, SimSpi, SimSpiRegisters, SpiEvent};
	use crate::BusError;

	fn master(sim: &SimSpi, poll: PollLimit) -> SpiMaster<SimSpiRegisters, SimChipSelect> {
		let spi = SpiMaster::initialize(sim.registers(), sim.chip_select(), SpiConfig::default(), poll).unwrap();
		sim.clear_events();
		spi
	}

	#[test]
	fn initialize_configures_master() {
		let sim = SimSpi::new();
		let spi = master(&sim, PollLimit::Forever);
		let con = spi.control();
		assert!(con.is_on());
		assert!(con.is_master());
		assert!(con.is_output_on_active_to_idle());
		assert!(!con.is_clock_idle_high());
		assert!(!spi.status().is_overflow());
		assert_eq!(sim.baud_divisor(), 3);
		assert!(!sim.is_selected());
	}

	#[test]
	fn initialize_rejects_large_divisor() {
		let sim = SimSpi::new();
		let config = SpiConfig { baud_divisor: 0x200, ..SpiConfig::default() };
		assert!(SpiMaster::initialize(sim.registers(), sim.chip_select(), config, PollLimit::Forever).is_err());
	}

	#[test]
	fn divisor_from_frequency() {
		assert_eq!(SpiConfig::divisor_for(80_000_000, 10_000_000).unwrap(), 3);
		assert_eq!(SpiConfig::divisor_for(80_000_000, 40_000_000).unwrap(), 0);
		// 9 MHz isn't reachable exactly, round down to 8 MHz
		assert_eq!(SpiConfig::divisor_for(80_000_000, 9_000_000).unwrap(), 4);
		assert!(SpiConfig::divisor_for(80_000_000, 0).is_err());
		assert!(SpiConfig::divisor_for(80_000_000, 50_000_000).is_err());
		assert!(SpiConfig::divisor_for(80_000_000, 1_000).is_err());
	}

	#[test]
	fn transaction_brackets_exchanges() {
		let sim = SimSpi::new();
		let mut spi = master(&sim, PollLimit::Forever);
		{
			let mut tx = spi.transaction();
			tx.exchange(0x05).unwrap();
			tx.exchange(0x00).unwrap();
		}
		let events = sim.events();
		assert_eq!(events.first(), Some(&SpiEvent::Select));
		assert_eq!(events.last(), Some(&SpiEvent::Deselect));
		assert_eq!(events.len(), 4);
		assert!(!sim.is_selected());
	}

	#[test]
	fn exchange_waits_for_receive_buffer() {
		let sim = SimSpi::new();
		sim.set_receive_latency(20);
		let mut spi = master(&sim, PollLimit::Iterations(100));
		spi.select();
		assert_eq!(spi.exchange(0x05).unwrap(), 0xff);
		spi.deselect();
	}

	#[test]
	fn stalled_peripheral_times_out() {
		let sim = SimSpi::new();
		sim.set_stalled(true);
		let mut spi = master(&sim, PollLimit::Iterations(1000));
		let err = spi.exchange(0x00).unwrap_err();
		match err.downcast_ref::<BusError>() {
			Some(BusError::Timeout { polls, .. }) => assert_eq!(*polls, 1000),
			other => panic!("unexpected error {:?}", other),
		}
	}
}
