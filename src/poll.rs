use crate::BusError;

/// How long a busy-wait on a hardware flag may spin.
///
/// The board firmware spins forever; a bounded limit turns a hung
/// peripheral into a `BusError::Timeout`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PollLimit {
	Forever,
	Iterations(u32),
}

impl Default for PollLimit {
	fn default() -> Self {
		PollLimit::Forever
	}
}

impl PollLimit {
	pub fn from_option(limit: Option<u32>) -> Self {
		match limit {
			None => PollLimit::Forever,
			Some(n) => PollLimit::Iterations(n),
		}
	}
}

/// spin until `ready` returns true
///
/// `ready` is called at least once, even for `Iterations(0)`.
pub fn wait_until<F>(limit: PollLimit, what: &'static str, mut ready: F) -> crate::AResult<()>
where
	F: FnMut() -> bool,
{
	match limit {
		PollLimit::Forever => {
			while !ready() {}
			Ok(())
		},
		PollLimit::Iterations(polls) => {
			if ready() {
				return Ok(());
			}
			for _ in 0..polls {
				if ready() {
					return Ok(());
				}
			}
			Err(BusError::Timeout { what, polls }.into())
		},
	}
}
