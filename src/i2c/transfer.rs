use super::{
	I2cMaster,
	Operation,
	Phase,
};
use crate::regs::RegisterBlock;
use crate::BusError;

/// first address not reserved by the I2C spec
pub const FIRST_ADDRESS: u8 = 0x08;
/// last address not reserved by the I2C spec
pub const LAST_ADDRESS: u8 = 0x77;

fn check_address(address: u8) -> crate::AResult<()> {
	if address > 0x7f {
		return Err(BusError::AddressOutOfRange { address }.into());
	}
	Ok(())
}

/// address byte for a write to 7-bit `address`
pub fn write_address(address: u8) -> crate::AResult<u8> {
	check_address(address)?;
	Ok(address << 1)
}

/// address byte for a read from 7-bit `address`
pub fn read_address(address: u8) -> crate::AResult<u8> {
	check_address(address)?;
	Ok(address << 1 | 1)
}

// Whole frames built from the primitives. None of them give up on a
// missing ACK: the frame runs to its STOP and the result tells whether
// every byte sent was acknowledged. A read from an address nobody answers
// receives nothing and leaves `target` untouched.
//
// On an error halfway through (a bounded poll running out) they try to
// end the frame: NACK a byte still waiting for its acknowledge, then
// STOP. A receive that timed out can't be ended that way; the master then
// stays in `Phase::Receiving` until the caller finishes the frame.
impl<R: RegisterBlock> I2cMaster<R> {
	fn send_all(&mut self, data: &[u8]) -> crate::AResult<bool> {
		let mut acked = true;
		for b in data {
			acked &= self.send(*b)?;
		}
		Ok(acked)
	}

	// ACK every byte but the last one
	fn receive_all(&mut self, target: &mut [u8]) -> crate::AResult<()> {
		let len = target.len();
		for (i, t) in target.iter_mut().enumerate() {
			*t = self.receive()?;
			self.ack(i + 1 == len)?;
		}
		Ok(())
	}

	fn abandon_frame(&mut self) -> crate::AResult<()> {
		if self.phase() == Phase::ByteReceived {
			self.ack(true)?;
		}
		if self.phase().after(Operation::Stop).is_some() {
			self.stop()?;
		}
		Ok(())
	}

	fn finish<T>(&mut self, result: crate::AResult<T>) -> crate::AResult<T> {
		if result.is_err() {
			if let Err(e) = self.abandon_frame() {
				warn!("I2C: couldn't end the frame after an error: {}", e);
			}
		}
		result
	}

	pub fn write_to(&mut self, address: u8, data: &[u8]) -> crate::AResult<bool> {
		let address = write_address(address)?;
		let result = (|| -> crate::AResult<bool> {
			self.start()?;
			let acked = self.send(address)? & self.send_all(data)?;
			self.stop()?;
			Ok(acked)
		})();
		self.finish(result)
	}

	/// Read `target.len()` bytes, NACKing the last one; `target` must not
	/// be empty.
	pub fn read_from(&mut self, address: u8, target: &mut [u8]) -> crate::AResult<bool> {
		let address = read_address(address)?;
		ensure!(!target.is_empty(), "I2C read from 0x{:02x} needs at least one byte", address >> 1);
		let result = (|| -> crate::AResult<bool> {
			self.start()?;
			let acked = self.send(address)?;
			if acked {
				self.receive_all(target)?;
			}
			self.stop()?;
			Ok(acked)
		})();
		self.finish(result)
	}

	/// Write `data`, then RESTART and read into `target` without releasing
	/// the bus (register reads: `data` is the register number).
	pub fn write_read(&mut self, address: u8, data: &[u8], target: &mut [u8]) -> crate::AResult<bool> {
		let write = write_address(address)?;
		let read = read_address(address)?;
		ensure!(!target.is_empty(), "I2C read from 0x{:02x} needs at least one byte", address);
		let result = (|| -> crate::AResult<bool> {
			self.start()?;
			let written = self.send(write)? & self.send_all(data)?;
			self.restart()?;
			let read_acked = self.send(read)?;
			if read_acked {
				self.receive_all(target)?;
			}
			self.stop()?;
			Ok(written && read_acked)
		})();
		self.finish(result)
	}

	/// true if some slave acknowledges `address`
	pub fn probe(&mut self, address: u8) -> crate::AResult<bool> {
		let address = write_address(address)?;
		let result = (|| -> crate::AResult<bool> {
			self.start()?;
			let acked = self.send(address)?;
			self.stop()?;
			Ok(acked)
		})();
		self.finish(result)
	}

	/// probe every non-reserved address
	pub fn scan(&mut self) -> crate::AResult<Vec<u8>> {
		let mut found = Vec::new();
		for address in FIRST_ADDRESS..=LAST_ADDRESS {
			if self.probe(address)? {
				debug!("I2C: found device at 0x{:02x}", address);
				found.push(address);
			}
		}
		Ok(found)
	}
}
