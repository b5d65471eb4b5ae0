use std::fmt;

// register offsets within an I2Cx block
pub const I2CCON: usize = 0x00;
pub const I2CSTAT: usize = 0x10;
pub const I2CADD: usize = 0x20;
pub const I2CMSK: usize = 0x30;
pub const I2CBRG: usize = 0x40;
pub const I2CTRN: usize = 0x50;
pub const I2CRCV: usize = 0x60;

pub const I2CBRG_MAX: u32 = 0xfff;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct I2cControl(pub u32);

impl I2cControl {
	pub const START: u32        = 0x0000_0001; // SEN
	pub const RESTART: u32      = 0x0000_0002; // RSEN
	pub const STOP: u32         = 0x0000_0004; // PEN
	pub const RECEIVE: u32      = 0x0000_0008; // RCEN
	pub const ACK_SEQUENCE: u32 = 0x0000_0010; // ACKEN
	pub const ACK_DATA: u32     = 0x0000_0020; // ACKDT: 1 = NACK
	pub const ON: u32           = 0x0000_8000;

	// all bits the hardware clears by itself once the bus event is done
	pub const SEQUENCES: u32 = 0
		| I2cControl::START
		| I2cControl::RESTART
		| I2cControl::STOP
		| I2cControl::RECEIVE
		| I2cControl::ACK_SEQUENCE
	;

	pub fn is_on(&self) -> bool {
		0 != self.0 & I2cControl::ON
	}
	pub fn is_start(&self) -> bool {
		0 != self.0 & I2cControl::START
	}
	pub fn is_restart(&self) -> bool {
		0 != self.0 & I2cControl::RESTART
	}
	pub fn is_stop(&self) -> bool {
		0 != self.0 & I2cControl::STOP
	}
	pub fn is_receive(&self) -> bool {
		0 != self.0 & I2cControl::RECEIVE
	}
	pub fn is_ack_sequence(&self) -> bool {
		0 != self.0 & I2cControl::ACK_SEQUENCE
	}
	/// true when the next acknowledge sequence sends NACK
	pub fn is_nack(&self) -> bool {
		0 != self.0 & I2cControl::ACK_DATA
	}
	pub fn is_idle(&self) -> bool {
		0 == self.0 & I2cControl::SEQUENCES
	}
}

impl fmt::Debug for I2cControl {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:08x} (", self.0)?;
		if self.is_on() { write!(f, " [ON]")?; }
		if self.is_start() { write!(f, " [SEN]")?; }
		if self.is_restart() { write!(f, " [RSEN]")?; }
		if self.is_stop() { write!(f, " [PEN]")?; }
		if self.is_receive() { write!(f, " [RCEN]")?; }
		if self.is_ack_sequence() { write!(f, " [ACKEN]")?; }
		if self.is_nack() { write!(f, " [ACKDT]")?; }
		write!(f, " )")
	}
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct I2cStatus(pub u32);

impl I2cStatus {
	pub const TRANSMIT_FULL: u32 = 0x0000_0001; // TBF
	pub const RECEIVE_FULL: u32  = 0x0000_0002; // RBF
	pub const STARTED: u32       = 0x0000_0008; // S
	pub const STOPPED: u32       = 0x0000_0010; // P
	pub const COLLISION: u32     = 0x0000_0400; // BCL
	pub const TRANSMITTING: u32  = 0x0000_4000; // TRSTAT
	pub const NACK_RECEIVED: u32 = 0x0000_8000; // ACKSTAT

	pub fn is_transmit_full(&self) -> bool {
		0 != self.0 & I2cStatus::TRANSMIT_FULL
	}
	pub fn is_receive_full(&self) -> bool {
		0 != self.0 & I2cStatus::RECEIVE_FULL
	}
	pub fn is_started(&self) -> bool {
		0 != self.0 & I2cStatus::STARTED
	}
	pub fn is_stopped(&self) -> bool {
		0 != self.0 & I2cStatus::STOPPED
	}
	pub fn is_collision(&self) -> bool {
		0 != self.0 & I2cStatus::COLLISION
	}
	pub fn is_transmitting(&self) -> bool {
		0 != self.0 & I2cStatus::TRANSMITTING
	}
	/// ACKSTAT: the slave didn't pull SDA low for the last byte
	pub fn is_nack_received(&self) -> bool {
		0 != self.0 & I2cStatus::NACK_RECEIVED
	}
}

impl fmt::Debug for I2cStatus {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:08x} (", self.0)?;
		if self.is_transmit_full() { write!(f, " [TBF]")?; }
		if self.is_receive_full() { write!(f, " [RBF]")?; }
		if self.is_started() { write!(f, " [S]")?; }
		if self.is_stopped() { write!(f, " [P]")?; }
		if self.is_collision() { write!(f, " [BCL]")?; }
		if self.is_transmitting() { write!(f, " [TRSTAT]")?; }
		if self.is_nack_received() { write!(f, " [ACKSTAT]")?; }
		write!(f, " )")
	}
}
