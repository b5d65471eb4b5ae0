use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use super::shadow_write;
use crate::regs::RegisterBlock;

/// Plain registers without side effects (GPIO ports and the like);
/// clones share their contents.
#[derive(Clone, Debug, Default)]
pub struct RegisterFile {
	words: Rc<RefCell<BTreeMap<usize, u32>>>,
}

impl RegisterFile {
	pub fn new() -> Self {
		RegisterFile::default()
	}

	pub fn get(&self, offset: usize) -> u32 {
		self.words.borrow().get(&offset).cloned().unwrap_or(0)
	}
}

impl RegisterBlock for RegisterFile {
	fn read_word(&self, offset: usize) -> u32 {
		self.get(offset)
	}

	fn write_word(&mut self, offset: usize, data: u32) {
		let base = offset & !0xf;
		let value = shadow_write(self.get(base), offset, data);
		self.words.borrow_mut().insert(base, value);
	}
}
