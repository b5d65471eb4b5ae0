use crate::i2c::Phase;

/// Failures callers may want to match on; everything else is a plain
/// `failure::Error` built with `bail!` / `format_err!`.
#[derive(Debug, Fail)]
pub enum BusError {
	#[fail(display = "gave up after {} polls waiting for {}", polls, what)]
	Timeout {
		what: &'static str,
		polls: u32,
	},

	#[fail(display = "I2C {} not allowed in phase {:?}", operation, phase)]
	Sequence {
		operation: &'static str,
		phase: Phase,
	},

	#[fail(display = "I2C address 0x{:02x} doesn't fit into 7 bits", address)]
	AddressOutOfRange {
		address: u8,
	},

	#[fail(display = "baud rate generator value {} out of range (max 0x{:03x})", value, max)]
	BaudRate {
		value: i64,
		max: u32,
	},
}
