use std::cell::RefCell;
use std::rc::Rc;

use super::shadow_write;
use crate::i2c::registers::*;
use crate::regs::RegisterBlock;

/// What happened on the simulated bus, in order.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum I2cEvent {
	Start,
	Restart,
	Stop,
	Write {
		byte: u8,
		acked: bool,
	},
	Read(u8),
	Ack,
	Nack,
}

/// A slave with 256 byte registers behind an auto-incrementing register
/// pointer: the first byte written after its address sets the pointer,
/// further bytes are stored, reads continue from the pointer.
#[derive(Clone, Debug)]
pub struct SimTarget {
	address: u8,
	registers: Vec<u8>,
	pointer: u8,
	expect_pointer: bool,
	ack_address: bool,
	ack_data: bool,
}

impl SimTarget {
	pub fn new(address: u8) -> Self {
		assert!(address <= 0x7f);
		SimTarget {
			address,
			registers: vec![0u8; 256],
			pointer: 0,
			expect_pointer: false,
			ack_address: true,
			ack_data: true,
		}
	}

	pub fn with_registers(mut self, values: &[u8]) -> Self {
		self.registers[..values.len()].copy_from_slice(values);
		self
	}

	/// don't answer to our own address at all
	pub fn nack_address(mut self) -> Self {
		self.ack_address = false;
		self
	}

	/// answer to the address, but refuse every data byte
	pub fn nack_data(mut self) -> Self {
		self.ack_data = false;
		self
	}

	pub fn address(&self) -> u8 {
		self.address
	}

	pub fn register(&self, index: u8) -> u8 {
		self.registers[index as usize]
	}

	fn addressed(&mut self, read: bool) -> bool {
		if !read {
			self.expect_pointer = true;
		}
		self.ack_address
	}

	fn write(&mut self, byte: u8) -> bool {
		if !self.ack_data {
			return false;
		}
		if self.expect_pointer {
			self.pointer = byte;
			self.expect_pointer = false;
		} else {
			self.registers[self.pointer as usize] = byte;
			self.pointer = self.pointer.wrapping_add(1);
		}
		true
	}

	fn read(&mut self) -> u8 {
		let byte = self.registers[self.pointer as usize];
		self.pointer = self.pointer.wrapping_add(1);
		byte
	}
}

#[derive(Clone, Copy, Debug)]
struct Pending {
	offset: usize,
	mask: u32,
	set: bool,
	remaining: u32,
}

#[derive(Debug)]
struct State {
	con: u32,
	stat: u32,
	brg: u32,
	rcv: u8,
	latency: u32,
	stuck: bool,
	transmit_stalled: bool,
	pending: Vec<Pending>,
	targets: Vec<SimTarget>,
	// index of the addressed target and whether it's a read
	active: Option<(usize, bool)>,
	expect_address: bool,
	events: Vec<I2cEvent>,
}

impl State {
	fn apply(&mut self, p: Pending) {
		let reg = if p.offset == I2CCON { &mut self.con } else { &mut self.stat };
		if p.set { *reg |= p.mask; } else { *reg &= !p.mask; }
	}

	// hardware finishes `mask` in `offset` after `latency` polls
	fn finish_later(&mut self, offset: usize, mask: u32, set: bool) {
		if self.stuck {
			return;
		}
		let p = Pending { offset, mask, set, remaining: self.latency };
		if 0 == self.latency {
			self.apply(p);
		} else {
			self.pending.push(p);
		}
	}

	fn poll(&mut self, offset: usize) {
		let mut i = 0;
		while i < self.pending.len() {
			if self.pending[i].offset != offset {
				i += 1;
			} else if 0 == self.pending[i].remaining {
				let p = self.pending.remove(i);
				self.apply(p);
			} else {
				self.pending[i].remaining -= 1;
				i += 1;
			}
		}
	}

	fn bus_start(&mut self, event: I2cEvent) {
		self.events.push(event);
		self.active = None;
		self.expect_address = true;
		self.stat = (self.stat | I2cStatus::STARTED) & !I2cStatus::STOPPED;
	}

	fn bus_stop(&mut self) {
		self.events.push(I2cEvent::Stop);
		self.active = None;
		self.expect_address = false;
		self.stat = (self.stat | I2cStatus::STOPPED) & !I2cStatus::STARTED;
	}

	fn bus_write(&mut self, byte: u8) -> bool {
		if self.expect_address {
			self.expect_address = false;
			let address = byte >> 1;
			let read = 0 != byte & 1;
			match self.targets.iter().position(|t| t.address == address) {
				Some(index) => {
					let acked = self.targets[index].addressed(read);
					self.active = if acked { Some((index, read)) } else { None };
					acked
				},
				None => false,
			}
		} else {
			match self.active {
				Some((index, false)) => self.targets[index].write(byte),
				_ => false,
			}
		}
	}

	fn bus_read(&mut self) -> u8 {
		match self.active {
			Some((index, true)) => self.targets[index].read(),
			_ => 0xff, // nobody drives SDA
		}
	}

	fn control_write(&mut self, offset: usize, data: u32) {
		let old = self.con;
		self.con = shadow_write(old, offset, data);
		if !I2cControl(self.con).is_on() {
			self.con &= !I2cControl::SEQUENCES;
			return;
		}
		let triggered = self.con & !old & I2cControl::SEQUENCES;

		if 0 != triggered & I2cControl::START {
			self.bus_start(I2cEvent::Start);
			self.finish_later(I2CCON, I2cControl::START, false);
		}
		if 0 != triggered & I2cControl::RESTART {
			self.bus_start(I2cEvent::Restart);
			self.finish_later(I2CCON, I2cControl::RESTART, false);
		}
		if 0 != triggered & I2cControl::RECEIVE {
			self.rcv = self.bus_read();
			self.events.push(I2cEvent::Read(self.rcv));
			self.con &= !I2cControl::RECEIVE;
			self.finish_later(I2CSTAT, I2cStatus::RECEIVE_FULL, true);
		}
		if 0 != triggered & I2cControl::ACK_SEQUENCE {
			let nack = I2cControl(self.con).is_nack();
			self.events.push(if nack { I2cEvent::Nack } else { I2cEvent::Ack });
			self.finish_later(I2CCON, I2cControl::ACK_SEQUENCE, false);
		}
		if 0 != triggered & I2cControl::STOP {
			self.bus_stop();
			self.finish_later(I2CCON, I2cControl::STOP, false);
		}
	}

	fn transmit(&mut self, byte: u8) {
		if !I2cControl(self.con).is_on() {
			return;
		}
		let acked = self.bus_write(byte);
		self.events.push(I2cEvent::Write { byte, acked });
		if acked {
			self.stat &= !I2cStatus::NACK_RECEIVED;
		} else {
			self.stat |= I2cStatus::NACK_RECEIVED;
		}
		self.stat |= I2cStatus::TRANSMITTING;
		if !self.transmit_stalled {
			self.finish_later(I2CSTAT, I2cStatus::TRANSMITTING, false);
		}
	}
}

/// I2Cx peripheral with any number of `SimTarget`s on the bus.
#[derive(Clone, Debug)]
pub struct SimI2c {
	state: Rc<RefCell<State>>,
}

impl Default for SimI2c {
	fn default() -> Self {
		SimI2c::new()
	}
}

impl SimI2c {
	pub fn new() -> Self {
		SimI2c {
			state: Rc::new(RefCell::new(State {
				con: 0,
				stat: 0,
				brg: 0,
				rcv: 0,
				latency: 0,
				stuck: false,
				transmit_stalled: false,
				pending: Vec::new(),
				targets: Vec::new(),
				active: None,
				expect_address: false,
				events: Vec::new(),
			})),
		}
	}

	pub fn registers(&self) -> SimI2cRegisters {
		SimI2cRegisters { state: self.state.clone() }
	}

	pub fn add_target(&self, target: SimTarget) {
		self.state.borrow_mut().targets.push(target);
	}

	/// number of polls before the hardware finishes a bus event
	pub fn set_latency(&self, polls: u32) {
		self.state.borrow_mut().latency = polls;
	}

	/// bus events never finish, like SCL held low by a slave
	pub fn set_stuck(&self, stuck: bool) {
		self.state.borrow_mut().stuck = stuck;
	}

	/// byte transmissions never finish (a slave stretching SCL forever);
	/// START, STOP and the rest still work
	pub fn set_transmit_stalled(&self, stalled: bool) {
		self.state.borrow_mut().transmit_stalled = stalled;
	}

	pub fn events(&self) -> Vec<I2cEvent> {
		self.state.borrow().events.clone()
	}

	pub fn clear_events(&self) {
		self.state.borrow_mut().events.clear();
	}

	pub fn baud_rate_generator(&self) -> u32 {
		self.state.borrow().brg
	}

	pub fn target_register(&self, address: u8, index: u8) -> Option<u8> {
		self.state.borrow().targets.iter()
			.find(|t| t.address == address)
			.map(|t| t.register(index))
	}
}

pub struct SimI2cRegisters {
	state: Rc<RefCell<State>>,
}

impl RegisterBlock for SimI2cRegisters {
	fn read_word(&self, offset: usize) -> u32 {
		let mut state = self.state.borrow_mut();
		match offset {
			I2CCON => {
				state.poll(I2CCON);
				state.con
			},
			I2CSTAT => {
				state.poll(I2CSTAT);
				state.stat
			},
			I2CBRG => state.brg,
			I2CRCV => {
				state.stat &= !I2cStatus::RECEIVE_FULL;
				u32::from(state.rcv)
			},
			_ => 0,
		}
	}

	fn write_word(&mut self, offset: usize, data: u32) {
		let mut state = self.state.borrow_mut();
		match offset & !0xf {
			I2CCON => state.control_write(offset, data),
			I2CBRG => {
				let brg = shadow_write(state.brg, offset, data) & I2CBRG_MAX;
				state.brg = brg;
			},
			I2CTRN => {
				if offset == I2CTRN {
					state.transmit(data as u8);
				}
			},
			_ => (),
		}
	}
}
