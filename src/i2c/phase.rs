/// Where the master is within one I2C frame.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Phase {
	/// bus released (after STOP, or never started)
	Idle,
	/// START or RESTART sent, the address byte comes next
	Started,
	/// address with write bit (or a data byte) sent
	Transmitting,
	/// address with read bit sent, or the previous byte acknowledged
	Receiving,
	/// byte received, ACK/NACK pending
	ByteReceived,
	/// NACK sent (or the read address went unanswered), the slave
	/// doesn't drive SDA anymore
	Draining,
}

impl Default for Phase {
	fn default() -> Self {
		Phase::Idle
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Operation {
	Start,
	Restart,
	Send(u8),
	Receive,
	Ack { is_final: bool },
	Stop,
}

impl Operation {
	pub fn name(&self) -> &'static str {
		match self {
			Operation::Start => "start",
			Operation::Restart => "restart",
			Operation::Send(_) => "send",
			Operation::Receive => "receive",
			Operation::Ack { .. } => "ack",
			Operation::Stop => "stop",
		}
	}
}

impl Phase {
	/// phase after `op`, or `None` if the protocol doesn't allow `op` now
	pub fn after(self, op: Operation) -> Option<Phase> {
		use self::Phase::*;

		match (self, op) {
			(Idle, Operation::Start) => Some(Started),

			// a read only ends after the final NACK
			(Transmitting, Operation::Restart)
			| (Draining, Operation::Restart) => Some(Started),

			// address byte: bit 0 is the R/W flag
			(Started, Operation::Send(address)) => Some(if 0 != address & 1 { Receiving } else { Transmitting }),
			(Transmitting, Operation::Send(_)) => Some(Transmitting),

			(Receiving, Operation::Receive) => Some(ByteReceived),

			(ByteReceived, Operation::Ack { is_final: false }) => Some(Receiving),
			(ByteReceived, Operation::Ack { is_final: true }) => Some(Draining),

			(Started, Operation::Stop)
			| (Transmitting, Operation::Stop)
			| (Draining, Operation::Stop) => Some(Idle),

			_ => None,
		}
	}

	/// Phase after `send(byte)` got (or missed) its ACK: a read address
	/// nobody answered leaves nothing to receive or NACK.
	pub fn after_send(self, byte: u8, acked: bool) -> Option<Phase> {
		match self.after(Operation::Send(byte))? {
			Phase::Receiving if !acked => Some(Phase::Draining),
			next => Some(next),
		}
	}

	/// inside a START ... STOP frame
	pub fn is_bus_held(self) -> bool {
		self != Phase::Idle
	}
}
