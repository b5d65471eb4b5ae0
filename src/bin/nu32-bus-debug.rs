#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate nu32_bus_master;
use nu32_bus_master::*;

use std::process::exit;

use nu32_bus_master::hex::{
	self,
	HexDump,
	HexU8,
	HexU16,
};
use nu32_bus_master::i2c::I2cMaster;
use nu32_bus_master::regs::RegisterBlock;
use nu32_bus_master::sim::{
	SimI2c,
	SimSpi,
	SimTarget,
};
use nu32_bus_master::spi::{
	SpiBus,
	SpiMaster,
};
use nu32_bus_master::sram::Sram;

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

fn take_peripherals() -> AResult<board::Peripherals> {
	match board::Peripherals::take() {
		Some(p) => Ok(p),
		None => bail!("peripherals already taken"),
	}
}

fn sram_status<B: SpiBus>(sram: &mut Sram<B>) -> AResult<()> {
	let status = sram.read_status()?;
	println!("Status {:?}", status);
	Ok(())
}

fn sram_read<B: SpiBus>(sram: &mut Sram<B>, sub_m: &clap::ArgMatches) -> AResult<()> {
	let address: HexU16 = get_param(sub_m, "ADDRESS")?;
	let length: usize = get_param(sub_m, "LENGTH")?;

	let data = sram.read(address.0, length)?;
	print!("{}", HexDump { address: u32::from(address.0), data: &data });
	Ok(())
}

fn sram_write<B: SpiBus>(sram: &mut Sram<B>, sub_m: &clap::ArgMatches) -> AResult<()> {
	let address: HexU16 = get_param(sub_m, "ADDRESS")?;
	let data = match sub_m.value_of("HEXBYTES") {
		Some(s) => hex::parse_bytes(s)?,
		None => bail!("missing parameter HEXBYTES"),
	};

	sram.write(address.0, &data)?;
	println!("Wrote {} bytes to {}", data.len(), address);
	Ok(())
}

fn sram_command<B: SpiBus>(bus: B, matches: &clap::ArgMatches) -> AResult<()> {
	let mut sram = Sram::configure(bus)?;
	match matches.subcommand() {
		("status", _) => sram_status(&mut sram),
		("read", Some(sub_m)) => sram_read(&mut sram, sub_m),
		("write", Some(sub_m)) => sram_write(&mut sram, sub_m),
		(cmd, _) => bail!("not an SRAM subcommand {:?}", cmd),
	}
}

fn i2c_scan<R: RegisterBlock>(i2c: &mut I2cMaster<R>) -> AResult<()> {
	let found = i2c.scan()?;
	if found.is_empty() {
		println!("No I2C devices found");
	}
	for address in found {
		println!("{}", HexU8(address));
	}
	Ok(())
}

fn read_registers<R: RegisterBlock>(i2c: &mut I2cMaster<R>, address: u8, register: u8, length: usize) -> AResult<Vec<u8>> {
	let mut data = vec![0u8; length];
	if !i2c.write_read(address, &[register], &mut data)? {
		bail!("I2C device {} didn't acknowledge", HexU8(address));
	}
	Ok(data)
}

fn i2c_read<R: RegisterBlock>(i2c: &mut I2cMaster<R>, sub_m: &clap::ArgMatches) -> AResult<()> {
	let address: HexU8 = get_param(sub_m, "ADDRESS")?;
	let register: HexU8 = get_param(sub_m, "REGISTER")?;
	let length: usize = get_param(sub_m, "LENGTH")?;

	let data = read_registers(i2c, address.0, register.0, length)?;
	print!("{}", HexDump { address: u32::from(register.0), data: &data });
	Ok(())
}

fn i2c_command<R: RegisterBlock>(mut i2c: I2cMaster<R>, matches: &clap::ArgMatches) -> AResult<()> {
	match matches.subcommand() {
		("i2c_scan", _) => i2c_scan(&mut i2c),
		("i2c_read", Some(sub_m)) => i2c_read(&mut i2c, sub_m),
		(cmd, _) => bail!("not an I2C subcommand {:?}", cmd),
	}
}

// a port expander sized register file on the simulated bus
fn simulated_i2c() -> SimI2c {
	let sim = SimI2c::new();
	sim.add_target(SimTarget::new(0x20).with_registers(&[0xff, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]));
	sim
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(@setting SubcommandRequiredElseHelp)
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@arg simulate: -s --simulate "use the simulated SPI1 and I2C2 instead of the board")
		(@subcommand status =>
			(about: "show SRAM status register")
		)
		(@subcommand read =>
			(about: "hex dump SRAM contents")
			(@arg ADDRESS: +required "SRAM address (hex)")
			(@arg LENGTH: +required "number of bytes")
		)
		(@subcommand write =>
			(about: "write bytes to SRAM")
			(@arg ADDRESS: +required "SRAM address (hex)")
			(@arg HEXBYTES: +required "data as hex digit pairs")
		)
		(@subcommand i2c_scan =>
			(about: "list addresses acknowledged on the I2C bus")
		)
		(@subcommand i2c_read =>
			(about: "read registers from an I2C device")
			(@arg ADDRESS: +required "7-bit device address (hex)")
			(@arg REGISTER: +required "first register (hex)")
			(@arg LENGTH: +required "number of bytes")
		)
	)
		.arg(clap::Arg::with_name("poll-limit")
			.long("poll-limit")
			.takes_value(true)
			.help("give up after N polls of a status flag (default: wait forever)"))
		.get_matches();

	let simulate = matches.is_present("simulate");
	let poll = PollLimit::from_option(if matches.is_present("poll-limit") {
		Some(get_param(&matches, "poll-limit")?)
	} else {
		None
	});

	match matches.subcommand_name() {
		Some("status") | Some("read") | Some("write") => {
			if simulate {
				let sim = SimSpi::new();
				let spi = SpiMaster::initialize(sim.registers(), sim.chip_select(), board::spi_config(), poll)?;
				sram_command(spi, &matches)
			} else {
				let spi = board::open_spi1(take_peripherals()?.spi1, poll)?;
				sram_command(spi, &matches)
			}
		},
		Some("i2c_scan") | Some("i2c_read") => {
			if simulate {
				let sim = simulated_i2c();
				let i2c = I2cMaster::initialize(sim.registers(), board::i2c_config(), poll)?;
				i2c_command(i2c, &matches)
			} else {
				let i2c = board::open_i2c2(take_peripherals()?.i2c2, poll)?;
				i2c_command(i2c, &matches)
			}
		},
		None => bail!("no subcommand"),
		Some(cmd) => bail!("not implemented subcommand {:?}", cmd),
	}
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}
