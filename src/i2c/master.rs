use super::phase::Operation;
use super::registers::*;
use super::Phase;
use crate::regs::RegisterBlock;
use crate::{
	BusError,
	PollLimit,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct I2cConfig {
	/// SCL frequency
	pub bus_hz: u32,
	/// peripheral bus clock feeding the baud rate generator
	pub pbclk_hz: u32,
	/// pulse gobbler delay of the part, from the datasheet
	pub pgd_ns: u32,
}

impl Default for I2cConfig {
	fn default() -> Self {
		I2cConfig {
			bus_hz: 100_000,
			pbclk_hz: 80_000_000,
			pgd_ns: 104,
		}
	}
}

impl I2cConfig {
	/// I2CxBRG = (1 / (2 * Fsck) - PGD) * Pbclk - 2
	///
	/// The product is rounded up, so SCL ends up at or slightly below
	/// `bus_hz`.
	pub fn baud_rate_generator(&self) -> crate::AResult<u16> {
		ensure!(self.bus_hz > 0, "I2C bus clock must not be zero");

		// common denominator 2 * Fsck * 1e9 (PGD is in ns)
		let double_bus = 2 * i128::from(self.bus_hz);
		let pbclk = i128::from(self.pbclk_hz);
		let numerator = pbclk * 1_000_000_000 - i128::from(self.pgd_ns) * pbclk * double_bus;
		let denominator = double_bus * 1_000_000_000;

		let ticks = if numerator > 0 {
			(numerator + denominator - 1) / denominator
		} else {
			numerator / denominator
		};
		let value = ticks - 2;

		if value < 0 || value > i128::from(I2CBRG_MAX) {
			return Err(BusError::BaudRate { value: value as i64, max: I2CBRG_MAX }.into());
		}
		Ok(value as u16)
	}
}

/// Polled I2C master on a PIC32 I2Cx register block.
///
/// Every primitive blocks on its hardware flag and checks the protocol
/// phase first; an operation the phase doesn't allow fails with
/// `BusError::Sequence` and leaves the bus alone.
pub struct I2cMaster<R: RegisterBlock> {
	regs: R,
	poll: PollLimit,
	phase: Phase,
}

impl<R: RegisterBlock> I2cMaster<R> {
	pub fn initialize(mut regs: R, config: I2cConfig, poll: PollLimit) -> crate::AResult<Self> {
		let brg = config.baud_rate_generator()?;

		regs.clear_bits(I2CCON, I2cControl::ON);
		regs.write_word(I2CBRG, u32::from(brg));
		regs.set_bits(I2CCON, I2cControl::ON);

		debug!("I2C master up: {} Hz, BRG={}", config.bus_hz, brg);

		Ok(I2cMaster {
			regs,
			poll,
			phase: Phase::Idle,
		})
	}

	pub fn phase(&self) -> Phase {
		self.phase
	}

	pub fn poll_limit(&self) -> PollLimit {
		self.poll
	}

	pub fn control(&self) -> I2cControl {
		I2cControl(self.regs.read_word(I2CCON))
	}

	pub fn status(&self) -> I2cStatus {
		I2cStatus(self.regs.read_word(I2CSTAT))
	}

	pub fn into_inner(self) -> R {
		self.regs
	}

	fn next_phase(&self, op: Operation) -> crate::AResult<Phase> {
		match self.phase.after(op) {
			Some(next) => Ok(next),
			None => Err(BusError::Sequence { operation: op.name(), phase: self.phase }.into()),
		}
	}

	// set a self-clearing control bit and wait for the hardware to drop it
	fn run_sequence(&mut self, bit: u32, what: &'static str) -> crate::AResult<()> {
		self.regs.set_bits(I2CCON, bit);
		let regs = &self.regs;
		crate::wait_until(self.poll, what, || {
			0 == regs.read_word(I2CCON) & bit
		})
	}

	pub fn start(&mut self) -> crate::AResult<()> {
		let next = self.next_phase(Operation::Start)?;
		self.run_sequence(I2cControl::START, "I2C start condition")?;
		trace!("I2C: START");
		self.phase = next;
		Ok(())
	}

	/// repeated start; keeps the bus, next byte is an address again
	pub fn restart(&mut self) -> crate::AResult<()> {
		let next = self.next_phase(Operation::Restart)?;
		self.run_sequence(I2cControl::RESTART, "I2C restart condition")?;
		trace!("I2C: RESTART");
		self.phase = next;
		Ok(())
	}

	/// Transmit one byte (address or data) and report whether the slave
	/// acknowledged it. A missing ACK is only reported, the frame stays
	/// open either way.
	pub fn send(&mut self, byte: u8) -> crate::AResult<bool> {
		let next = self.next_phase(Operation::Send(byte))?;
		// if an address, bit 0 = 0 for write, 1 for read
		self.regs.write_word(I2CTRN, u32::from(byte));
		let regs = &self.regs;
		crate::wait_until(self.poll, "I2C transmit", || {
			!I2cStatus(regs.read_word(I2CSTAT)).is_transmitting()
		})?;
		let acked = !self.status().is_nack_received();
		self.phase = self.phase.after_send(byte, acked).unwrap_or(next);
		if acked {
			trace!("I2C: sent 0x{:02x}, ACK", byte);
		} else {
			warn!("I2C master: failed to receive ACK for 0x{:02x}", byte);
		}
		Ok(acked)
	}

	pub fn receive(&mut self) -> crate::AResult<u8> {
		let next = self.next_phase(Operation::Receive)?;
		self.regs.set_bits(I2CCON, I2cControl::RECEIVE);
		let regs = &self.regs;
		crate::wait_until(self.poll, "I2C receive buffer full", || {
			I2cStatus(regs.read_word(I2CSTAT)).is_receive_full()
		})?;
		let byte = self.regs.read_word(I2CRCV) as u8;
		trace!("I2C: received 0x{:02x}", byte);
		self.phase = next;
		Ok(byte)
	}

	/// ACK the received byte (more wanted) or NACK it (`is_final`, slave
	/// stops sending).
	pub fn ack(&mut self, is_final: bool) -> crate::AResult<()> {
		let next = self.next_phase(Operation::Ack { is_final })?;
		if is_final {
			self.regs.set_bits(I2CCON, I2cControl::ACK_DATA);
		} else {
			self.regs.clear_bits(I2CCON, I2cControl::ACK_DATA);
		}
		self.run_sequence(I2cControl::ACK_SEQUENCE, "I2C acknowledge sequence")?;
		trace!("I2C: {}", if is_final { "NACK" } else { "ACK" });
		self.phase = next;
		Ok(())
	}

	/// stop condition; the master releases the bus
	pub fn stop(&mut self) -> crate::AResult<()> {
		let next = self.next_phase(Operation::Stop)?;
		self.run_sequence(I2cControl::STOP, "I2C stop condition")?;
		trace!("I2C: STOP");
		self.phase = next;
		Ok(())
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::sim::{I2cEvent, SimI2c, SimI2cRegisters, SimTarget};

	fn master(sim: &SimI2c, poll: PollLimit) -> I2cMaster<SimI2cRegisters> {
		I2cMaster::initialize(sim.registers(), I2cConfig::default(), poll).unwrap()
	}

	fn sequence_error(err: &failure::Error) -> (&'static str, Phase) {
		match err.downcast_ref::<BusError>() {
			Some(BusError::Sequence { operation, phase }) => (*operation, *phase),
			other => panic!("unexpected error {:?}", other),
		}
	}

	#[test]
	fn brg_for_100khz() {
		assert_eq!(I2cConfig::default().baud_rate_generator().unwrap(), 390);
	}

	#[test]
	fn brg_for_400khz() {
		let config = I2cConfig { bus_hz: 400_000, ..I2cConfig::default() };
		assert_eq!(config.baud_rate_generator().unwrap(), 90);
	}

	#[test]
	fn brg_out_of_range() {
		let slow = I2cConfig { bus_hz: 1_000, ..I2cConfig::default() };
		match slow.baud_rate_generator().unwrap_err().downcast_ref::<BusError>() {
			Some(BusError::BaudRate { value, .. }) => assert_eq!(*value, 39_990),
			other => panic!("unexpected error {:?}", other),
		}
		// PGD eats the whole half period
		let fast = I2cConfig { bus_hz: 5_000_000, ..I2cConfig::default() };
		assert!(fast.baud_rate_generator().is_err());
		let zero = I2cConfig { bus_hz: 0, ..I2cConfig::default() };
		assert!(zero.baud_rate_generator().is_err());
	}

	#[test]
	fn initialize_loads_brg_and_enables() {
		let sim = SimI2c::new();
		let i2c = master(&sim, PollLimit::Forever);
		assert_eq!(sim.baud_rate_generator(), 390);
		assert!(i2c.control().is_on());
		assert_eq!(i2c.phase(), Phase::Idle);
	}

	#[test]
	fn nack_is_reported_not_handled() {
		let sim = SimI2c::new();
		sim.add_target(SimTarget::new(0x20).nack_data());
		let mut i2c = master(&sim, PollLimit::Iterations(100));
		i2c.start().unwrap();
		assert!(i2c.send(0x40).unwrap());
		assert!(!i2c.send(0x0a).unwrap());
		// still our turn, nothing was retried or stopped behind our back
		assert_eq!(i2c.phase(), Phase::Transmitting);
		assert!(!i2c.send(0x55).unwrap());
		i2c.stop().unwrap();
		assert_eq!(sim.events(), vec![
			I2cEvent::Start,
			I2cEvent::Write { byte: 0x40, acked: true },
			I2cEvent::Write { byte: 0x0a, acked: false },
			I2cEvent::Write { byte: 0x55, acked: false },
			I2cEvent::Stop,
		]);
	}

	#[test]
	fn missing_slave_nacks_address() {
		let sim = SimI2c::new();
		let mut i2c = master(&sim, PollLimit::Iterations(100));
		i2c.start().unwrap();
		assert!(!i2c.send(0x90).unwrap());
		i2c.stop().unwrap();
	}

	#[test]
	fn restart_keeps_bus() {
		let sim = SimI2c::new();
		sim.add_target(SimTarget::new(0x20).with_registers(&[0x00, 0x11, 0x22]));
		let mut i2c = master(&sim, PollLimit::Iterations(100));
		i2c.start().unwrap();
		let after_start = i2c.phase();
		assert!(i2c.send(0x40).unwrap());
		assert!(i2c.send(0x01).unwrap());
		i2c.restart().unwrap();
		assert_eq!(i2c.phase(), after_start);
		assert!(i2c.phase().is_bus_held());
		assert!(i2c.send(0x41).unwrap());
		assert_eq!(i2c.receive().unwrap(), 0x11);
		i2c.ack(true).unwrap();
		i2c.stop().unwrap();

		let events = sim.events();
		let restart = events.iter().position(|e| *e == I2cEvent::Restart).unwrap();
		let stops: Vec<usize> = events.iter().enumerate()
			.filter(|(_, e)| **e == I2cEvent::Stop)
			.map(|(i, _)| i)
			.collect();
		assert_eq!(stops, vec![events.len() - 1]);
		assert!(restart < stops[0]);
	}

	#[test]
	fn out_of_order_calls_leave_bus_alone() {
		let sim = SimI2c::new();
		let mut i2c = master(&sim, PollLimit::Iterations(100));
		assert_eq!(sequence_error(&i2c.send(0x40).unwrap_err()), ("send", Phase::Idle));
		assert_eq!(sequence_error(&i2c.restart().unwrap_err()), ("restart", Phase::Idle));
		assert_eq!(sequence_error(&i2c.stop().unwrap_err()), ("stop", Phase::Idle));
		i2c.start().unwrap();
		assert_eq!(sequence_error(&i2c.receive().unwrap_err()), ("receive", Phase::Started));
		assert_eq!(sequence_error(&i2c.ack(false).unwrap_err()), ("ack", Phase::Started));
		assert_eq!(sim.events(), vec![I2cEvent::Start]);
	}

	#[test]
	fn slow_hardware_is_waited_for() {
		let sim = SimI2c::new();
		sim.set_latency(25);
		sim.add_target(SimTarget::new(0x20).with_registers(&[0x5a]));
		let mut i2c = master(&sim, PollLimit::Iterations(100));
		i2c.start().unwrap();
		assert!(i2c.send(0x41).unwrap());
		assert_eq!(i2c.receive().unwrap(), 0x5a);
		i2c.ack(true).unwrap();
		i2c.stop().unwrap();
	}

	#[test]
	fn stuck_start_times_out() {
		let sim = SimI2c::new();
		sim.set_stuck(true);
		let mut i2c = master(&sim, PollLimit::Iterations(50));
		let err = i2c.start().unwrap_err();
		match err.downcast_ref::<BusError>() {
			Some(BusError::Timeout { what, polls }) => {
				assert_eq!(*what, "I2C start condition");
				assert_eq!(*polls, 50);
			},
			other => panic!("unexpected error {:?}", other),
		}
		assert_eq!(i2c.phase(), Phase::Idle);
	}

	#[test]
	fn read_must_end_with_nack() {
		let sim = SimI2c::new();
		sim.add_target(SimTarget::new(0x20).with_registers(&[0x11, 0x22]));
		let mut i2c = master(&sim, PollLimit::Iterations(100));
		i2c.start().unwrap();
		assert!(i2c.send(0x41).unwrap());
		assert_eq!(sequence_error(&i2c.stop().unwrap_err()), ("stop", Phase::Receiving));
		assert_eq!(i2c.receive().unwrap(), 0x11);
		i2c.ack(false).unwrap();
		assert_eq!(sequence_error(&i2c.stop().unwrap_err()), ("stop", Phase::Receiving));
		assert_eq!(sequence_error(&i2c.restart().unwrap_err()), ("restart", Phase::Receiving));
		assert_eq!(i2c.receive().unwrap(), 0x22);
		i2c.ack(true).unwrap();
		i2c.stop().unwrap();
		assert_eq!(sim.events(), vec![
			I2cEvent::Start,
			I2cEvent::Write { byte: 0x41, acked: true },
			I2cEvent::Read(0x11),
			I2cEvent::Ack,
			I2cEvent::Read(0x22),
			I2cEvent::Nack,
			I2cEvent::Stop,
		]);
	}

	#[test]
	fn unanswered_read_address_can_stop() {
		let sim = SimI2c::new();
		let mut i2c = master(&sim, PollLimit::Iterations(100));
		i2c.start().unwrap();
		assert!(!i2c.send(0x41).unwrap());
		assert_eq!(i2c.phase(), Phase::Draining);
		assert_eq!(sequence_error(&i2c.receive().unwrap_err()), ("receive", Phase::Draining));
		i2c.stop().unwrap();
		assert_eq!(i2c.phase(), Phase::Idle);
	}
}
