use std::fmt;

// register offsets within an SPIx block
pub const SPICON: usize = 0x00;
pub const SPISTAT: usize = 0x10;
pub const SPIBUF: usize = 0x20;
pub const SPIBRG: usize = 0x30;

// SPIxCON
const SPICON_MSTEN: u32 = 0x0000_0020; // master mode
const SPICON_CKP:   u32 = 0x0000_0040; // clock idles high
const SPICON_CKE:   u32 = 0x0000_0100; // output changes on active -> idle clock
const SPICON_SMP:   u32 = 0x0000_0200; // sample input at end of data output time
const SPICON_ON:    u32 = 0x0000_8000;

// SPIxSTAT
const SPISTAT_SPIRBF:  u32 = 0x0000_0001; // receive buffer full (read only)
const SPISTAT_SPITBF:  u32 = 0x0000_0002; // transmit buffer full (read only)
const SPISTAT_SPIROV:  u32 = 0x0000_0040; // receive overflow (clear only)
const SPISTAT_SPIBUSY: u32 = 0x0000_0800; // read only

// only the low 9 bits of SPIxBRG are implemented on the MX1xx/2xx parts
pub const SPIBRG_MAX: u32 = 0x1ff;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SpiControl(pub u32);

impl SpiControl {
	pub fn is_on(&self) -> bool {
		0 != self.0 & SPICON_ON
	}
	pub fn set_on(&mut self) -> &mut Self {
		self.0 |= SPICON_ON;
		self
	}

	pub fn is_master(&self) -> bool {
		0 != self.0 & SPICON_MSTEN
	}
	pub fn set_master(&mut self) -> &mut Self {
		self.0 |= SPICON_MSTEN;
		self
	}

	pub fn is_clock_idle_high(&self) -> bool {
		0 != self.0 & SPICON_CKP
	}
	pub fn set_clock_idle_high(&mut self, high: bool) -> &mut Self {
		if high { self.0 |= SPICON_CKP; } else { self.0 &= !SPICON_CKP; }
		self
	}

	pub fn is_output_on_active_to_idle(&self) -> bool {
		0 != self.0 & SPICON_CKE
	}
	pub fn set_output_on_active_to_idle(&mut self, v: bool) -> &mut Self {
		if v { self.0 |= SPICON_CKE; } else { self.0 &= !SPICON_CKE; }
		self
	}

	pub fn is_sample_at_end(&self) -> bool {
		0 != self.0 & SPICON_SMP
	}
}

impl fmt::Debug for SpiControl {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:08x} (", self.0)?;
		if self.is_on() { write!(f, " [ON]")?; }
		if self.is_master() { write!(f, " [MSTEN]")?; }
		if self.is_clock_idle_high() { write!(f, " [CKP]")?; }
		if self.is_output_on_active_to_idle() { write!(f, " [CKE]")?; }
		if self.is_sample_at_end() { write!(f, " [SMP]")?; }
		write!(f, " )")
	}
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SpiStatus(pub u32);

impl SpiStatus {
	pub const OVERFLOW: u32 = SPISTAT_SPIROV;

	pub fn is_receive_full(&self) -> bool {
		0 != self.0 & SPISTAT_SPIRBF
	}
	pub fn is_transmit_full(&self) -> bool {
		0 != self.0 & SPISTAT_SPITBF
	}
	pub fn is_overflow(&self) -> bool {
		0 != self.0 & SPISTAT_SPIROV
	}
	pub fn is_busy(&self) -> bool {
		0 != self.0 & SPISTAT_SPIBUSY
	}

	pub fn with_receive_full(mut self, v: bool) -> Self {
		if v { self.0 |= SPISTAT_SPIRBF; } else { self.0 &= !SPISTAT_SPIRBF; }
		self
	}
}

impl fmt::Debug for SpiStatus {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:08x} (", self.0)?;
		if self.is_receive_full() { write!(f, " [RBF]")?; }
		if self.is_transmit_full() { write!(f, " [TBF]")?; }
		if self.is_overflow() { write!(f, " [ROV]")?; }
		if self.is_busy() { write!(f, " [BUSY]")?; }
		write!(f, " )")
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn control_bits() {
		let con = *SpiControl::default()
			.set_output_on_active_to_idle(true)
			.set_master()
			.set_on();
		assert_eq!(con.0, 0x8120);
		assert!(!con.is_clock_idle_high());
		assert_eq!(format!("{:?}", con), "0x00008120 ( [ON] [MSTEN] [CKE] )");
	}

	#[test]
	fn status_flags() {
		let stat = SpiStatus(0x41);
		assert!(stat.is_receive_full());
		assert!(stat.is_overflow());
		assert!(!stat.is_transmit_full());
		assert!(!stat.with_receive_full(false).is_receive_full());
	}
}
