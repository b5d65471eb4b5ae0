#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate nu32_bus_master;
use nu32_bus_master::*;

use std::process::exit;

use nu32_bus_master::hex::HexU16;
use nu32_bus_master::sim::SimSpi;
use nu32_bus_master::spi::{
	SpiBus,
	SpiMaster,
};

const MESSAGE: &[u8] = b"Help, I'm stuck in the RAM!\0";

fn get_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid paramater {}: {}", name, e);
		e.context(msg).into()
	})
}

// text up to the terminating NUL
fn message_text(data: &[u8]) -> String {
	let end = data.iter().position(|b| 0 == *b).unwrap_or(data.len());
	String::from_utf8_lossy(&data[..end]).into_owned()
}

fn run<B: SpiBus>(bus: B, address: u16) -> AResult<bool> {
	let mut sram = sram::open(bus)?;
	println!("Status {}", sram.read_status()?);

	println!("Writing {:?} to 0x{:04x}", message_text(MESSAGE), address);
	sram.write(address, MESSAGE)?;

	let data = sram.read(address, MESSAGE.len())?;
	println!("Read {:?}", message_text(&data));

	Ok(&data[..] == MESSAGE)
}

fn main_app() -> AResult<bool> {
	let matches = clap_app!(@app (app_from_crate!())
		(@arg simulate: -s --simulate "run against the simulated SPI1 and 23K256 instead of the board")
		(@arg address: -a --address +takes_value "SRAM address to use (hex, default 0x1234)")
	)
		.arg(clap::Arg::with_name("poll-limit")
			.long("poll-limit")
			.takes_value(true)
			.help("give up after N polls of a status flag (default: wait forever)"))
		.get_matches();

	let address: u16 = if matches.is_present("address") {
		get_param::<HexU16>(&matches, "address")?.0
	} else {
		0x1234
	};
	let poll = PollLimit::from_option(if matches.is_present("poll-limit") {
		Some(get_param(&matches, "poll-limit")?)
	} else {
		None
	});

	if matches.is_present("simulate") {
		let sim = SimSpi::new();
		let spi = SpiMaster::initialize(sim.registers(), sim.chip_select(), board::spi_config(), poll)?;
		run(spi, address)
	} else {
		let peripherals = match board::Peripherals::take() {
			Some(p) => p,
			None => bail!("peripherals already taken"),
		};
		let spi = board::open_spi1(peripherals.spi1, poll)?;
		run(spi, address)
	}
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	match main_app() {
		Ok(true) => (),
		Ok(false) => {
			error!("Data read back doesn't match the data written");
			exit(2);
		},
		Err(e) => {
			error!("Error: {}", e);
			exit(1);
		},
	}
}
