//! Polled I2C master for the PIC32 I2Cx peripheral, fixed master role.
//!
//! A frame looks like this:
//! - START
//! - address byte (7-bit address, bit 0 = 1 for read), slave ACKs
//! - either data bytes sent, each ACKed by the slave
//! - or data bytes received, each ACKed by the master; the last one NACKed
//! - optionally RESTART and another address byte (write register number,
//!   then read)
//! - STOP
//!
//! SCL and SDA need external pull-ups (2k - 10k).

mod master;
mod phase;
pub mod registers;
mod transfer;

pub use self::master::{
	I2cConfig,
	I2cMaster,
};

pub use self::phase::{
	Operation,
	Phase,
};

pub use self::transfer::{
	FIRST_ADDRESS,
	LAST_ADDRESS,
	read_address,
	write_address,
};
