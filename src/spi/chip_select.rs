use crate::regs::RegisterBlock;

// register offsets within a PORTx block (MX1xx/2xx layout)
pub const ANSEL: usize = 0x00;
pub const TRIS: usize = 0x10;
pub const PORT: usize = 0x20;
pub const LAT: usize = 0x30;

/// The (active low) chip select line of one SPI peripheral.
pub trait ChipSelect {
	/// `true` pulls the line low, `false` releases it high.
	fn set_asserted(&mut self, asserted: bool);
}

impl<'a, C: ?Sized + ChipSelect> ChipSelect for &'a mut C {
	fn set_asserted(&mut self, asserted: bool) {
		C::set_asserted(*self, asserted)
	}
}

/// Chip select driven through a GPIO port pin.
pub struct GpioChipSelect<R: RegisterBlock> {
	port: R,
	mask: u32,
}

impl<R: RegisterBlock> GpioChipSelect<R> {
	/// make `pin` a digital output and drive it high (deselected)
	pub fn new(mut port: R, pin: u8) -> Self {
		assert!(pin < 16);
		let mask = 1u32 << pin;
		port.clear_bits(ANSEL, mask);
		// latch high before enabling the driver so there's no glitch low
		port.set_bits(LAT, mask);
		port.clear_bits(TRIS, mask);
		GpioChipSelect { port, mask }
	}

	/// current output latch level
	pub fn is_high(&self) -> bool {
		0 != self.port.read_word(LAT) & self.mask
	}
}

impl<R: RegisterBlock> ChipSelect for GpioChipSelect<R> {
	fn set_asserted(&mut self, asserted: bool) {
		if asserted {
			self.port.clear_bits(LAT, self.mask);
		} else {
			self.port.set_bits(LAT, self.mask);
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::sim::RegisterFile;

	#[test]
	fn pin_setup_and_levels() {
		let port = RegisterFile::new();
		port.clone().write_word(TRIS, 0xffff);
		port.clone().write_word(ANSEL, 0x0003);

		let mut cs = GpioChipSelect::new(port.clone(), 0);
		assert_eq!(port.get(ANSEL), 0x0002);
		assert_eq!(port.get(TRIS), 0xfffe);
		assert!(cs.is_high());

		cs.set_asserted(true);
		assert!(!cs.is_high());
		assert_eq!(port.get(LAT), 0);
		cs.set_asserted(false);
		assert!(cs.is_high());
	}
}
