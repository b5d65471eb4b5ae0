//! Protocol for Microchip 23K256, a 256-kbit SPI SRAM (organized as 32k x 8bit)
//!
//! Every instruction is one chip select frame:
//! - 8-bit instruction
//! - for READ/WRITE: 16-bit address, MSB first (bit 15 is don't care)
//! - data bytes; SO is only driven while data is read
//!
//! Instructions:
//! - 0x01: WRSR, write status register, 1 DATA byte
//! - 0x02: WRITE from address, send DATA
//! - 0x03: READ from address, recv DATA
//! - 0x05: RDSR, read status register, recv 1 DATA byte
//!
//! Status register: MODE[7:6] (0b00 byte, 0b10 page, 0b01 sequential),
//! HOLD[0] (1 = HOLD pin disabled).
//!
//! In sequential mode the chip advances its address after each byte and
//! wraps from 0x7fff to 0x0000; the driver neither checks nor cares.

use std::fmt;
use std::io;

use crate::spi::{
	SpiBus,
	Transaction,
};

pub const WRITE_STATUS_OPCODE: u8 = 0x01; // "WRSR"
pub const WRITE_OPCODE:        u8 = 0x02; // sequential write
pub const READ_OPCODE:         u8 = 0x03; // sequential read
pub const READ_STATUS_OPCODE:  u8 = 0x05; // "RDSR"

pub const CAPACITY: usize = 0x8000;
pub const PAGE_SIZE: usize = 32;

const STATUS_MODE_MASK: u8 = 0xc0;
const STATUS_HOLD_DISABLE: u8 = 0x01;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Mode {
	Byte,
	Page,
	Sequential,
}

impl Mode {
	fn bits(self) -> u8 {
		match self {
			Mode::Byte => 0x00,
			Mode::Page => 0x80,
			Mode::Sequential => 0x40,
		}
	}
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Status(pub u8);

impl Status {
	/// sequential mode, hold disabled: 0x41
	pub const SEQUENTIAL: Status = Status(0x41);

	/// `mode` with the HOLD pin disabled
	pub fn for_mode(mode: Mode) -> Self {
		Status(mode.bits() | STATUS_HOLD_DISABLE)
	}

	/// `None` for the reserved mode 0b11
	pub fn mode(&self) -> Option<Mode> {
		match self.0 & STATUS_MODE_MASK {
			0x00 => Some(Mode::Byte),
			0x80 => Some(Mode::Page),
			0x40 => Some(Mode::Sequential),
			_ => None,
		}
	}

	pub fn is_hold_disabled(&self) -> bool {
		0 != self.0 & STATUS_HOLD_DISABLE
	}
}

impl fmt::Display for Status {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:02x}", self.0)
	}
}

impl fmt::Debug for Status {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:02x} (mode: {:?}", self.0, self.mode())?;
		if self.is_hold_disabled() { write!(f, " [HOLD disabled]")?; }
		write!(f, ")")
	}
}

fn send_address<B: ?Sized + SpiBus>(tx: &mut Transaction<B>, address: u16) -> crate::AResult<()> {
	tx.exchange((address >> 8) as u8)?; // most significant byte first
	tx.exchange(address as u8)?;
	Ok(())
}

pub struct Sram<B: SpiBus> {
	bus: B,
}

impl<B: SpiBus> Sram<B> {
	/// Take over `bus` and switch the chip to sequential mode; the only way
	/// to get an `Sram`, so no data transfer happens before that.
	pub fn configure(bus: B) -> crate::AResult<Self> {
		let mut sram = Sram { bus };
		sram.configure_sequential_mode()?;
		Ok(sram)
	}

	pub fn into_inner(self) -> B {
		self.bus
	}

	pub fn read_status(&mut self) -> crate::AResult<Status> {
		let mut tx = self.bus.transaction();
		tx.exchange(READ_STATUS_OPCODE)?;
		let status = Status(tx.exchange(0)?); // pump out the status byte
		debug!("SRAM status: {:?}", status);
		Ok(status)
	}

	pub fn write_status(&mut self, status: Status) -> crate::AResult<()> {
		debug!("SRAM write status: {:?}", status);
		let mut tx = self.bus.transaction();
		tx.exchange(WRITE_STATUS_OPCODE)?;
		tx.exchange(status.0)?;
		Ok(())
	}

	/// Switch the addressing mode. Byte mode stores only the first byte of
	/// each `write`, page mode wraps within 32-byte pages.
	pub fn set_mode(&mut self, mode: Mode) -> crate::AResult<()> {
		self.write_status(Status::for_mode(mode))
	}

	pub fn configure_sequential_mode(&mut self) -> crate::AResult<()> {
		self.write_status(Status::SEQUENTIAL)
	}

	/// Starts a WRITE frame at `address`; it ends when the writer is dropped.
	pub fn writer<'a>(&'a mut self, address: u16) -> crate::AResult<SramWriter<'a, B>> {
		let mut tx = self.bus.transaction();
		tx.exchange(WRITE_OPCODE)?;
		send_address(&mut tx, address)?;
		Ok(SramWriter { tx })
	}

	/// Starts a READ frame at `address`; it ends when the reader is dropped.
	pub fn reader<'a>(&'a mut self, address: u16) -> crate::AResult<SramReader<'a, B>> {
		let mut tx = self.bus.transaction();
		tx.exchange(READ_OPCODE)?;
		send_address(&mut tx, address)?;
		Ok(SramReader { tx })
	}

	pub fn write(&mut self, address: u16, data: &[u8]) -> crate::AResult<()> {
		debug!("SRAM write {} bytes at 0x{:04x}", data.len(), address);
		self.writer(address)?.write(data)
	}

	pub fn read_into(&mut self, address: u16, target: &mut [u8]) -> crate::AResult<()> {
		debug!("SRAM read {} bytes at 0x{:04x}", target.len(), address);
		self.reader(address)?.read(target)
	}

	pub fn read(&mut self, address: u16, len: usize) -> crate::AResult<Vec<u8>> {
		let mut data = vec![0u8; len];
		self.read_into(address, &mut data)?;
		Ok(data)
	}

	pub fn write_byte(&mut self, address: u16, data: u8) -> crate::AResult<()> {
		self.writer(address)?.write_byte(data)
	}

	pub fn read_byte(&mut self, address: u16) -> crate::AResult<u8> {
		self.reader(address)?.read_byte()
	}
}

/// Configure sequential mode and make sure the chip took it.
pub fn open<B: SpiBus>(bus: B) -> crate::AResult<Sram<B>> {
	let mut sram = Sram::configure(bus)?;
	let status = sram.read_status()?;
	ensure!(status == Status::SEQUENTIAL,
		"SRAM didn't take sequential mode: status {:?} (expected {:?})", status, Status::SEQUENTIAL
	);
	Ok(sram)
}

pub struct SramReader<'a, B: SpiBus + 'a> {
	tx: Transaction<'a, B>,
}

impl<'a, B: SpiBus> SramReader<'a, B> {
	pub fn read_byte(&mut self) -> crate::AResult<u8> {
		self.tx.exchange(0)
	}

	pub fn read(&mut self, target: &mut [u8]) -> crate::AResult<()> {
		self.tx.read(target)
	}
}

impl<'a, B: SpiBus> Iterator for SramReader<'a, B> {
	type Item = crate::AResult<u8>;

	fn next(&mut self) -> Option<Self::Item> {
		Some(self.read_byte())
	}
}

pub struct SramWriter<'a, B: SpiBus + 'a> {
	tx: Transaction<'a, B>,
}

impl<'a, B: SpiBus> SramWriter<'a, B> {
	pub fn write_byte(&mut self, data: u8) -> crate::AResult<()> {
		self.tx.exchange(data)?;
		Ok(())
	}

	pub fn write(&mut self, data: &[u8]) -> crate::AResult<()> {
		self.tx.write(data)
	}
}

impl<'a, B: SpiBus> io::Write for SramWriter<'a, B> {
	fn write(&mut self, data: &[u8]) -> io::Result<usize> {
		SramWriter::write(self, data).map_err(|e| {
			io::Error::new(io::ErrorKind::Other, format!("{:?}", e))
		})?;
		Ok(data.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::sim::Sram23k256;

	#[derive(Clone, Copy, PartialEq, Eq, Debug)]
	enum Call {
		Select,
		Deselect,
		Exchange(u8),
	}

	/// records every call and answers from a 23K256 model
	#[derive(Default)]
	struct RecordingBus {
		calls: Vec<Call>,
		chip: Sram23k256,
	}

	impl SpiBus for RecordingBus {
		fn exchange(&mut self, byte: u8) -> crate::AResult<u8> {
			self.calls.push(Call::Exchange(byte));
			Ok(self.chip.transfer(byte))
		}
		fn select(&mut self) {
			self.calls.push(Call::Select);
			self.chip.select();
		}
		fn deselect(&mut self) {
			self.calls.push(Call::Deselect);
			self.chip.deselect();
		}
	}

	fn frames(calls: &[Call]) -> Vec<Vec<u8>> {
		let mut frames = Vec::new();
		let mut current: Option<Vec<u8>> = None;
		for call in calls {
			match *call {
				Call::Select => {
					assert!(current.is_none(), "select inside an open frame: {:?}", calls);
					current = Some(Vec::new());
				},
				Call::Deselect => {
					frames.push(current.take().expect("deselect without select"));
				},
				Call::Exchange(b) => {
					current.as_mut().expect("exchange outside of a frame").push(b);
				},
			}
		}
		assert!(current.is_none(), "frame left open");
		frames
	}

	#[test]
	fn configure_writes_mode_first() {
		let mut sram = Sram::configure(RecordingBus::default()).unwrap();
		sram.write(0x0010, &[1, 2]).unwrap();
		let bus = sram.into_inner();
		assert_eq!(frames(&bus.calls), vec![
			vec![0x01, 0x41],
			vec![0x02, 0x00, 0x10, 1, 2],
		]);
	}

	#[test]
	fn read_status_frame() {
		let mut sram = Sram::configure(RecordingBus::default()).unwrap();
		assert_eq!(sram.read_status().unwrap(), Status::SEQUENTIAL);
		let bus = sram.into_inner();
		assert_eq!(frames(&bus.calls)[1], vec![0x05, 0x00]);
	}

	#[test]
	fn write_frame_layout() {
		let mut sram = Sram::configure(RecordingBus::default()).unwrap();
		sram.write(0xbeef, b"ab").unwrap();
		let bus = sram.into_inner();
		assert_eq!(frames(&bus.calls)[1], vec![0x02, 0xbe, 0xef, b'a', b'b']);
	}

	#[test]
	fn read_sends_dummy_zeroes() {
		let mut sram = Sram::configure(RecordingBus::default()).unwrap();
		sram.read(0x1234, 3).unwrap();
		let bus = sram.into_inner();
		assert_eq!(frames(&bus.calls)[1], vec![0x03, 0x12, 0x34, 0, 0, 0]);
	}

	#[test]
	fn empty_transfers_still_bracket() {
		let mut sram = Sram::configure(RecordingBus::default()).unwrap();
		sram.write(0x0100, &[]).unwrap();
		assert!(sram.read(0x0100, 0).unwrap().is_empty());
		let bus = sram.into_inner();
		assert_eq!(frames(&bus.calls), vec![
			vec![0x01, 0x41],
			vec![0x02, 0x01, 0x00],
			vec![0x03, 0x01, 0x00],
		]);
	}

	#[test]
	fn each_transaction_selects_once() {
		let mut sram = Sram::configure(RecordingBus::default()).unwrap();
		sram.write(0, &[9; 40]).unwrap();
		sram.read(0, 40).unwrap();
		sram.read_status().unwrap();
		let bus = sram.into_inner();
		let selects = bus.calls.iter().filter(|c| **c == Call::Select).count();
		let deselects = bus.calls.iter().filter(|c| **c == Call::Deselect).count();
		assert_eq!(selects, 4);
		assert_eq!(deselects, 4);
		assert_eq!(frames(&bus.calls).len(), 4);
	}

	#[test]
	fn round_trip_various_lengths() {
		let mut sram = Sram::configure(RecordingBus::default()).unwrap();
		for (address, len) in [(0x0000u16, 1usize), (0x1234, 28), (0x7f00, 256), (0x0000, CAPACITY)].iter() {
			let data: Vec<u8> = (0..*len).map(|i| (i * 7 + *address as usize) as u8).collect();
			sram.write(*address, &data).unwrap();
			assert_eq!(sram.read(*address, *len).unwrap(), data);
		}
	}

	// xorshift32, fixed seed so failures repeat
	struct Noise(u32);

	impl Noise {
		fn next(&mut self) -> u32 {
			self.0 ^= self.0 << 13;
			self.0 ^= self.0 >> 17;
			self.0 ^= self.0 << 5;
			self.0
		}
	}

	#[test]
	fn round_trip_random_frames() {
		let mut noise = Noise(0x2325_6b00);
		let mut sram = Sram::configure(RecordingBus::default()).unwrap();
		let mut expected = vec![0u8; CAPACITY];
		for _ in 0..300 {
			let address = (noise.next() as usize) % CAPACITY;
			let len = (noise.next() as usize) % 700;
			let data: Vec<u8> = (0..len).map(|_| noise.next() as u8).collect();
			sram.write(address as u16, &data).unwrap();
			for (i, b) in data.iter().enumerate() {
				expected[(address + i) % CAPACITY] = *b;
			}
			assert_eq!(sram.read(address as u16, len).unwrap(), data, "at 0x{:04x}, {} bytes", address, len);

			// some other range, possibly overlapping the end of the chip
			let other = (noise.next() as usize) % CAPACITY;
			let other_len = (noise.next() as usize) % 300;
			let want: Vec<u8> = (0..other_len).map(|i| expected[(other + i) % CAPACITY]).collect();
			assert_eq!(sram.read(other as u16, other_len).unwrap(), want, "at 0x{:04x}, {} bytes", other, other_len);
		}
	}

	#[test]
	fn wraps_past_the_end() {
		let mut sram = Sram::configure(RecordingBus::default()).unwrap();
		sram.write(0x7ffe, &[1, 2, 3, 4]).unwrap();
		assert_eq!(sram.read(0x0000, 2).unwrap(), vec![3, 4]);
		assert_eq!(sram.read(0x7ffe, 4).unwrap(), vec![1, 2, 3, 4]);
	}

	#[test]
	fn byte_mode_keeps_first_byte() {
		let mut sram = Sram::configure(RecordingBus::default()).unwrap();
		sram.set_mode(Mode::Byte).unwrap();
		assert_eq!(sram.read_status().unwrap().mode(), Some(Mode::Byte));
		sram.write(0x0200, &[0xaa, 0xbb]).unwrap();
		assert_eq!(sram.read_byte(0x0200).unwrap(), 0xaa);
		assert_eq!(sram.read_byte(0x0201).unwrap(), 0x00);
	}

	#[test]
	fn streaming_writer_and_reader() {
		use std::io::Write;

		let mut sram = Sram::configure(RecordingBus::default()).unwrap();
		{
			let mut w = sram.writer(0x0040).unwrap();
			w.write_all(b"hello ").unwrap();
			SramWriter::write(&mut w, b"world").unwrap();
		}
		let read: crate::AResult<Vec<u8>> = sram.reader(0x0040).unwrap().take(11).collect();
		assert_eq!(read.unwrap(), b"hello world".to_vec());
	}

	#[test]
	fn open_verifies_status() {
		assert!(open(RecordingBus::default()).is_ok());
	}

	#[test]
	fn status_decoding() {
		assert_eq!(Status::for_mode(Mode::Sequential), Status::SEQUENTIAL);
		assert_eq!(Status(0x41).mode(), Some(Mode::Sequential));
		assert_eq!(Status(0x81).mode(), Some(Mode::Page));
		assert_eq!(Status(0xc0).mode(), None);
		assert!(!Status(0x40).is_hold_disabled());
		assert_eq!(format!("{:?}", Status(0x41)), "0x41 (mode: Some(Sequential) [HOLD disabled])");
	}
}
