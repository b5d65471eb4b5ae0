//! Behavioural model of a Microchip 23K256 (32 KiB SPI SRAM), as seen
//! from the SO pin: bytes shifted in while CS is low produce one byte
//! shifted out.

use crate::sram::{
	CAPACITY,
	PAGE_SIZE,
	READ_OPCODE,
	READ_STATUS_OPCODE,
	WRITE_OPCODE,
	WRITE_STATUS_OPCODE,
};

// status register: MODE[7:6], bits 5:1 reserved (read as 0), HOLD[0]
const STATUS_MASK: u8 = 0xc1;
const ADDRESS_MASK: u16 = (CAPACITY - 1) as u16;

// SO is high impedance outside of data output; the pull-up wins
const IDLE_OUTPUT: u8 = 0xff;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Direction {
	Read,
	Write,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Frame {
	Deselected,
	Instruction,
	StatusRead,
	StatusWrite,
	AddressHigh(Direction),
	AddressLow(Direction, u8),
	Data(Direction, u16, usize),
	Ignore,
}

#[derive(Clone, Debug)]
pub struct Sram23k256 {
	memory: Vec<u8>,
	status: u8,
	frame: Frame,
}

impl Default for Sram23k256 {
	fn default() -> Self {
		Sram23k256::new()
	}
}

impl Sram23k256 {
	/// powered up: byte mode, HOLD enabled, memory cleared
	pub fn new() -> Self {
		Sram23k256 {
			memory: vec![0u8; CAPACITY],
			status: 0x00,
			frame: Frame::Deselected,
		}
	}

	pub fn status(&self) -> u8 {
		self.status
	}

	pub fn memory(&self) -> &[u8] {
		&self.memory
	}

	pub fn memory_mut(&mut self) -> &mut [u8] {
		&mut self.memory
	}

	pub fn is_selected(&self) -> bool {
		self.frame != Frame::Deselected
	}

	/// falling CS edge: a new instruction follows
	pub fn select(&mut self) {
		self.frame = Frame::Instruction;
	}

	/// rising CS edge: aborts whatever was going on
	pub fn deselect(&mut self) {
		self.frame = Frame::Deselected;
	}

	fn next_address(&self, address: u16) -> u16 {
		match self.status >> 6 {
			0b10 => {
				let page = PAGE_SIZE as u16;
				(address & !(page - 1)) | (address.wrapping_add(1) & (page - 1))
			},
			_ => address.wrapping_add(1) & ADDRESS_MASK,
		}
	}

	// only sequential and page mode keep going after the first byte
	fn keeps_streaming(&self) -> bool {
		match self.status >> 6 {
			0b01 | 0b10 => true,
			_ => false,
		}
	}

	pub fn transfer(&mut self, input: u8) -> u8 {
		let (output, next) = match self.frame {
			Frame::Deselected => (IDLE_OUTPUT, Frame::Deselected),
			Frame::Instruction => {
				let next = match input {
					WRITE_STATUS_OPCODE => Frame::StatusWrite,
					READ_STATUS_OPCODE => Frame::StatusRead,
					WRITE_OPCODE => Frame::AddressHigh(Direction::Write),
					READ_OPCODE => Frame::AddressHigh(Direction::Read),
					_ => Frame::Ignore,
				};
				(IDLE_OUTPUT, next)
			},
			Frame::StatusRead => (self.status, Frame::StatusRead),
			Frame::StatusWrite => {
				self.status = input & STATUS_MASK;
				(IDLE_OUTPUT, Frame::Ignore)
			},
			Frame::AddressHigh(dir) => (IDLE_OUTPUT, Frame::AddressLow(dir, input)),
			Frame::AddressLow(dir, high) => {
				let address = ((u16::from(high) << 8) | u16::from(input)) & ADDRESS_MASK;
				(IDLE_OUTPUT, Frame::Data(dir, address, 0))
			},
			Frame::Data(_, _, done) if done > 0 && !self.keeps_streaming() => (IDLE_OUTPUT, Frame::Ignore),
			Frame::Data(dir, address, done) => {
				let output = match dir {
					Direction::Read => self.memory[address as usize],
					Direction::Write => {
						self.memory[address as usize] = input;
						IDLE_OUTPUT
					},
				};
				(output, Frame::Data(dir, self.next_address(address), done + 1))
			},
			Frame::Ignore => (IDLE_OUTPUT, Frame::Ignore),
		};
		self.frame = next;
		output
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn frame(chip: &mut Sram23k256, bytes: &[u8]) -> Vec<u8> {
		chip.select();
		let out = bytes.iter().map(|b| chip.transfer(*b)).collect();
		chip.deselect();
		out
	}

	#[test]
	fn status_write_then_read() {
		let mut chip = Sram23k256::new();
		frame(&mut chip, &[0x01, 0x41]);
		assert_eq!(frame(&mut chip, &[0x05, 0x00]), vec![0xff, 0x41]);
		// reserved bits stay zero
		frame(&mut chip, &[0x01, 0xff]);
		assert_eq!(chip.status(), 0xc1);
	}

	#[test]
	fn byte_mode_stops_after_one_byte() {
		let mut chip = Sram23k256::new();
		frame(&mut chip, &[0x02, 0x00, 0x10, 1, 2, 3]);
		assert_eq!(&chip.memory()[0x10..0x13], &[1, 0, 0]);
	}

	#[test]
	fn page_mode_wraps_in_page() {
		let mut chip = Sram23k256::new();
		frame(&mut chip, &[0x01, 0x80]);
		frame(&mut chip, &[0x02, 0x00, 0x3f, 0xaa, 0xbb]);
		assert_eq!(chip.memory()[0x3f], 0xaa);
		assert_eq!(chip.memory()[0x20], 0xbb);
		assert_eq!(chip.memory()[0x40], 0x00);
	}

	#[test]
	fn sequential_mode_wraps_at_end() {
		let mut chip = Sram23k256::new();
		frame(&mut chip, &[0x01, 0x41]);
		frame(&mut chip, &[0x02, 0x7f, 0xff, 0x11, 0x22]);
		assert_eq!(chip.memory()[0x7fff], 0x11);
		assert_eq!(chip.memory()[0x0000], 0x22);
		assert_eq!(frame(&mut chip, &[0x03, 0xff, 0xff, 0, 0]), vec![0xff, 0xff, 0xff, 0x11, 0x22]);
	}

	#[test]
	fn deselected_chip_ignores_input() {
		let mut chip = Sram23k256::new();
		assert_eq!(chip.transfer(0x02), 0xff);
		assert!(!chip.is_selected());
		assert!(chip.memory().iter().all(|b| *b == 0));
	}
}
