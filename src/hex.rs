//! Hex numbers and byte strings on the command line, and hex dumps.

use std::fmt;
use std::str;

fn strip_prefix(s: &str) -> &str {
	if s.starts_with("0x") || s.starts_with("0X") {
		&s[2..]
	} else {
		s
	}
}

macro_rules! hex_number {
	($name:ident, $t:ty, $width:expr) => {
		/// Number parsed as hex, with or without `0x` prefix.
		#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
		pub struct $name(pub $t);

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
				write!(f, "0x{:01$x}", self.0, $width)
			}
		}

		impl str::FromStr for $name {
			type Err = ::failure::Error;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				let digits = strip_prefix(s);
				ensure!(!digits.is_empty(), "empty hex number: {:?}", s);
				let value = with_context!(("invalid hex number: {:?}", s),
					Ok(<$t>::from_str_radix(digits, 16)?)
				)?;
				Ok($name(value))
			}
		}
	};
}

hex_number!(HexU8, u8, 2);
hex_number!(HexU16, u16, 4);

/// Parse bytes written as pairs of hex digits; an optional `0x` prefix
/// and whitespace or `:` between the pairs are ignored.
pub fn parse_bytes(s: &str) -> crate::AResult<Vec<u8>> {
	let digits: Vec<u8> = strip_prefix(s.trim()).bytes()
		.filter(|c| !c.is_ascii_whitespace() && *c != b':')
		.collect();
	ensure!(0 == digits.len() % 2, "odd number of hex digits in {:?}", s);

	let mut result = Vec::with_capacity(digits.len() / 2);
	for pair in digits.chunks(2) {
		let pair = str::from_utf8(pair)?;
		let byte = with_context!(("invalid hex byte {:?} in {:?}", pair, s),
			Ok(u8::from_str_radix(pair, 16)?)
		)?;
		result.push(byte);
	}
	Ok(result)
}

/// Classic 16 bytes per line dump, lines labeled with the memory address
/// of their first byte.
pub struct HexDump<'a> {
	pub address: u32,
	pub data: &'a [u8],
}

impl<'a> fmt::Display for HexDump<'a> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		for (i, b) in self.data.iter().enumerate() {
			if 0 == i % 16 {
				write!(f, "{:04x} ", self.address as usize + i)?;
			} else if 0 == i % 8 {
				write!(f, " ")?;
			}
			write!(f, " {:02x}", b)?;
			if 15 == i % 16 {
				writeln!(f)?;
			}
		}
		if 0 != self.data.len() % 16 {
			writeln!(f)?;
		}
		Ok(())
	}
}
