use std::cell::RefCell;
use std::rc::Rc;

use super::{
	Sram23k256,
	shadow_write,
};
use crate::regs::RegisterBlock;
use crate::spi::ChipSelect;
use crate::spi::registers::*;

/// What happened on the simulated bus, in order.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SpiEvent {
	Select,
	Deselect,
	Exchange {
		sent: u8,
		received: u8,
	},
}

#[derive(Debug)]
struct State {
	con: SpiControl,
	stat: SpiStatus,
	brg: u32,
	rx: u8,
	// status reads left until SPIRBF shows up
	rbf_countdown: Option<u32>,
	latency: u32,
	stalled: bool,
	selected: bool,
	chip: Sram23k256,
	events: Vec<SpiEvent>,
}

impl State {
	fn shift(&mut self, sent: u8) {
		if !(self.con.is_on() && self.con.is_master()) {
			return;
		}
		let received = if self.selected { self.chip.transfer(sent) } else { 0xff };
		self.events.push(SpiEvent::Exchange { sent, received });
		if self.stat.is_receive_full() {
			self.stat.0 |= SpiStatus::OVERFLOW;
		}
		self.rx = received;
		if self.stalled {
			return;
		}
		if 0 == self.latency {
			self.stat = self.stat.with_receive_full(true);
		} else {
			self.rbf_countdown = Some(self.latency);
		}
	}

	fn read_status(&mut self) -> SpiStatus {
		match self.rbf_countdown {
			Some(0) => {
				self.rbf_countdown = None;
				self.stat = self.stat.with_receive_full(true);
			},
			Some(n) => self.rbf_countdown = Some(n - 1),
			None => (),
		}
		self.stat
	}
}

/// SPIx peripheral with a 23K256 hanging off its chip select.
#[derive(Clone, Debug)]
pub struct SimSpi {
	state: Rc<RefCell<State>>,
}

impl Default for SimSpi {
	fn default() -> Self {
		SimSpi::new()
	}
}

impl SimSpi {
	pub fn new() -> Self {
		SimSpi::with_chip(Sram23k256::new())
	}

	pub fn with_chip(chip: Sram23k256) -> Self {
		SimSpi {
			state: Rc::new(RefCell::new(State {
				con: SpiControl(0),
				stat: SpiStatus(0),
				brg: 0,
				rx: 0,
				rbf_countdown: None,
				latency: 0,
				stalled: false,
				selected: false,
				chip,
				events: Vec::new(),
			})),
		}
	}

	pub fn registers(&self) -> SimSpiRegisters {
		SimSpiRegisters { state: self.state.clone() }
	}

	pub fn chip_select(&self) -> SimChipSelect {
		SimChipSelect { state: self.state.clone() }
	}

	/// number of SPIxSTAT reads before a received byte shows up
	pub fn set_receive_latency(&self, polls: u32) {
		self.state.borrow_mut().latency = polls;
	}

	/// never signal a received byte, like a dead clock
	pub fn set_stalled(&self, stalled: bool) {
		self.state.borrow_mut().stalled = stalled;
	}

	pub fn events(&self) -> Vec<SpiEvent> {
		self.state.borrow().events.clone()
	}

	pub fn clear_events(&self) {
		self.state.borrow_mut().events.clear();
	}

	pub fn control(&self) -> SpiControl {
		self.state.borrow().con
	}

	pub fn baud_divisor(&self) -> u32 {
		self.state.borrow().brg
	}

	pub fn is_selected(&self) -> bool {
		self.state.borrow().selected
	}

	pub fn chip_status(&self) -> u8 {
		self.state.borrow().chip.status()
	}

	pub fn chip_memory(&self, address: usize, len: usize) -> Vec<u8> {
		self.state.borrow().chip.memory()[address..address + len].to_vec()
	}

	pub fn load_chip_memory(&self, address: usize, data: &[u8]) {
		self.state.borrow_mut().chip.memory_mut()[address..address + data.len()].copy_from_slice(data);
	}
}

pub struct SimSpiRegisters {
	state: Rc<RefCell<State>>,
}

impl RegisterBlock for SimSpiRegisters {
	fn read_word(&self, offset: usize) -> u32 {
		let mut state = self.state.borrow_mut();
		match offset {
			SPICON => state.con.0,
			SPISTAT => state.read_status().0,
			SPIBUF => {
				state.stat = state.stat.with_receive_full(false);
				u32::from(state.rx)
			},
			SPIBRG => state.brg,
			_ => 0,
		}
	}

	fn write_word(&mut self, offset: usize, data: u32) {
		let mut state = self.state.borrow_mut();
		match offset & !0xf {
			SPICON => {
				state.con = SpiControl(shadow_write(state.con.0, offset, data));
				if !state.con.is_on() {
					state.stat = SpiStatus(0);
					state.rbf_countdown = None;
				}
			},
			SPISTAT => {
				// only SPIROV is writable, and only to clear it
				let stat = shadow_write(state.stat.0, offset, data);
				state.stat.0 &= stat | !SpiStatus::OVERFLOW;
			},
			SPIBUF => {
				if offset == SPIBUF {
					state.shift(data as u8);
				}
			},
			SPIBRG => {
				state.brg = shadow_write(state.brg, offset, data) & SPIBRG_MAX;
			},
			_ => (),
		}
	}
}

pub struct SimChipSelect {
	state: Rc<RefCell<State>>,
}

impl ChipSelect for SimChipSelect {
	fn set_asserted(&mut self, asserted: bool) {
		let mut state = self.state.borrow_mut();
		if asserted {
			if !state.selected {
				state.chip.select();
			}
			state.events.push(SpiEvent::Select);
		} else {
			state.chip.deselect();
			state.events.push(SpiEvent::Deselect);
		}
		state.selected = asserted;
	}
}
