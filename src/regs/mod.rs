mod mapped;

pub use self::mapped::Mapped;
pub(crate) use self::mapped::open_physical;

// PIC32 peripheral registers come with atomic shadow registers right
// behind them; writing a mask there clears/sets/inverts those bits.
pub const CLR: usize = 0x4;
pub const SET: usize = 0x8;
pub const INV: usize = 0xc;

/// A window of 32-bit peripheral registers, addressed by byte offset
/// from the start of the window.
pub trait RegisterBlock {
	fn read_word(&self, offset: usize) -> u32;
	fn write_word(&mut self, offset: usize, data: u32);

	fn clear_bits(&mut self, offset: usize, mask: u32) {
		self.write_word(offset + CLR, mask);
	}

	fn set_bits(&mut self, offset: usize, mask: u32) {
		self.write_word(offset + SET, mask);
	}

	fn invert_bits(&mut self, offset: usize, mask: u32) {
		self.write_word(offset + INV, mask);
	}
}

impl<'a, R: ?Sized + RegisterBlock> RegisterBlock for &'a mut R {
	fn read_word(&self, offset: usize) -> u32 {
		R::read_word(*self, offset)
	}
	fn write_word(&mut self, offset: usize, data: u32) {
		R::write_word(*self, offset, data);
	}
	fn clear_bits(&mut self, offset: usize, mask: u32) {
		R::clear_bits(*self, offset, mask);
	}
	fn set_bits(&mut self, offset: usize, mask: u32) {
		R::set_bits(*self, offset, mask);
	}
	fn invert_bits(&mut self, offset: usize, mask: u32) {
		R::invert_bits(*self, offset, mask);
	}
}
