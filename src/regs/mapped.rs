use std::ffi::CString;
use std::fs;
use std::io;
use std::os::unix::io::{
	FromRawFd,
};
use std::ptr;

use libc::{
	MAP_SHARED,
	O_CLOEXEC,
	O_RDWR,
	O_SYNC,
	PROT_READ,
	PROT_WRITE,
	c_void,
	mmap,
	munmap,
	off_t,
	open,
	sysconf,
	_SC_PAGESIZE,
};

use super::RegisterBlock;

const DEV_MEM: &str = "/dev/mem";

/// Physical register window mapped from `/dev/mem`.
///
/// Only `board::open_spi1` / `board::open_i2c2` create these, each in
/// exchange for its `Peripherals` token:
///
/// ```compile_fail
/// let spi1 = nu32_bus_master::regs::open_physical(0x1f80_5800, 0x40);
/// ```
#[derive(Debug)]
pub struct Mapped {
	map: ptr::NonNull<u8>, // start of the (page aligned) mapping
	map_len: usize,
	offset: usize, // offset of the register window within the mapping
	len: usize,
	base: u64,
}

impl Drop for Mapped {
	fn drop(&mut self) {
		unsafe {
			let res = munmap(
				self.map.as_ptr() as *mut c_void,
				self.map_len,
			);
			if 0 != res {
				panic!("munmap failed: {}", io::Error::last_os_error());
			}
		}
	}
}

impl Mapped {
	pub fn base(&self) -> u64 {
		self.base
	}

	pub fn len(&self) -> usize {
		self.len
	}

	fn word_ptr(&self, offset: usize) -> *mut u32 {
		assert!(offset & 3 == 0);
		assert!(offset + 3 < self.len);
		unsafe { self.map.as_ptr().add(self.offset + offset) as *mut u32 }
	}

	pub fn read_word(&self, offset: usize) -> u32 {
		unsafe { ptr::read_volatile(self.word_ptr(offset)) }
	}

	pub fn write_word(&mut self, offset: usize, data: u32) {
		unsafe { ptr::write_volatile(self.word_ptr(offset), data) }
	}
}

impl RegisterBlock for Mapped {
	fn read_word(&self, offset: usize) -> u32 {
		Mapped::read_word(self, offset)
	}

	fn write_word(&mut self, offset: usize, data: u32) {
		Mapped::write_word(self, offset, data)
	}
}

// TODO: exclusive open / file locking?
pub(crate) fn open_physical(base: u64, len: usize) -> io::Result<Mapped> {
	let page_size = unsafe { sysconf(_SC_PAGESIZE) };
	if page_size <= 0 {
		return Err(io::Error::last_os_error());
	}
	let page_size = page_size as u64;
	let page_base = base & !(page_size - 1);
	let offset = (base - page_base) as usize;
	let map_len = offset + len;

	let path = CString::new(DEV_MEM)?;

	let fd = unsafe { open(path.as_ptr(), O_RDWR | O_CLOEXEC | O_SYNC) };
	if -1 == fd {
		return Err(io::Error::last_os_error());
	}
	// now get fd managed to prevent resource leak; the mapping stays valid
	// after closing it
	let _f = unsafe { fs::File::from_raw_fd(fd) };

	let area = unsafe {
		mmap(
			ptr::null_mut(),
			map_len,
			PROT_READ | PROT_WRITE,
			MAP_SHARED,
			fd,
			page_base as off_t,
		)
	};

	if area as usize == !0usize {
		return Err(io::Error::last_os_error());
	}
	match ptr::NonNull::new(area as *mut u8) {
		None => panic!("mmap shouldn't return NULL ever"),
		Some(map) => Ok(Mapped {
			map,
			map_len,
			offset,
			len,
			base,
		}),
	}
}
