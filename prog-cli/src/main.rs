// Copyright 2021 Locha Mesh Developers <contact@locha.io>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{fs, io::Write, time::Duration};

use anyhow::{Context, Result};
use clap::{
    crate_authors, crate_version, App, AppSettings, Arg, ArgMatches,
    SubCommand,
};

use mboot::{FillUnit, McuBoot};

mod flash;
mod list;

#[cfg(unix)]
const DEFAULT_PORT: &str = "/dev/ttyACM0";
#[cfg(windows)]
const DEFAULT_PORT: &str = "COM1";

fn main() -> Result<()> {
    let app = App::new("NXP MCU Bootloader Programmer")
        .setting(AppSettings::ColoredHelp)
        .version(crate_version!())
        .author(crate_authors!())
        .about("Programmer for the NXP MCU Bootloader (MBoot/KBoot) over UART and USB-HID")
        .arg(
            Arg::with_name("PORT")
                .short("p")
                .long("port")
                .takes_value(true)
                .default_value(DEFAULT_PORT)
                .help("Serial port to use")
        )
        .arg(
            Arg::with_name("baudrate")
                .short("b")
                .long("baudrate")
                .takes_value(true)
                .default_value("57600")
                .help("Serial port baud rate")
        )
        .arg(
            Arg::with_name("usb")
                .short("u")
                .long("usb")
                .takes_value(true)
                .value_name("VID:PID")
                .help("Connect over USB-HID instead of UART, e.g. 0x15A2:0x0073")
        )
        .arg(
            Arg::with_name("timeout")
                .short("t")
                .long("timeout")
                .takes_value(true)
                .help("Command response timeout in seconds (flash erase defaults to 300 s when unset)")
        )
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .help("Sets the level of verbosity, -v (debug), -vv (trace)")
        )
        .subcommand(
            SubCommand::with_name("list")
                .about("List serial ports and USB-HID bootloader candidates")
                .setting(AppSettings::ColoredHelp)
        )
        .subcommand(
            SubCommand::with_name("info")
                .about("Read and decode all supported bootloader properties")
                .setting(AppSettings::ColoredHelp)
        )
        .subcommand(
            SubCommand::with_name("read")
                .about("Read a memory range")
                .setting(AppSettings::ColoredHelp)
                .arg(Arg::with_name("ADDRESS").required(true).help("Start address"))
                .arg(Arg::with_name("LENGTH").required(true).help("Count of bytes"))
                .arg(Arg::with_name("FILE").help("Write the bytes to this file instead of stdout"))
                .arg(memory_id_arg())
        )
        .subcommand(flash::subcommand())
        .subcommand(
            SubCommand::with_name("erase")
                .about("Erase flash memory")
                .setting(AppSettings::ColoredHelp)
                .arg(
                    Arg::with_name("all")
                        .long("all")
                        .help("Erase the complete flash instead of a region")
                )
                .arg(Arg::with_name("ADDRESS").required_unless("all").help("Region start address"))
                .arg(Arg::with_name("LENGTH").required_unless("all").help("Region length in bytes"))
                .arg(memory_id_arg())
        )
        .subcommand(
            SubCommand::with_name("fill")
                .about("Fill a memory range with a pattern")
                .setting(AppSettings::ColoredHelp)
                .arg(Arg::with_name("ADDRESS").required(true).help("Start address"))
                .arg(Arg::with_name("LENGTH").required(true).help("Count of bytes"))
                .arg(Arg::with_name("PATTERN").required(true).help("Fill pattern"))
                .arg(
                    Arg::with_name("unit")
                        .long("unit")
                        .takes_value(true)
                        .possible_values(&["word", "short", "byte"])
                        .default_value("word")
                        .help("Pattern granularity")
                )
        )
        .subcommand(
            SubCommand::with_name("unlock")
                .about("Disable flash security")
                .setting(AppSettings::ColoredHelp)
                .arg(
                    Arg::with_name("key")
                        .short("k")
                        .long("key")
                        .takes_value(true)
                        .help("Backdoor key, \"S:<8 ASCII chars>\" or \"X:<16 hex chars>\". Without a key the whole flash is mass-erased and unsecured")
                )
        )
        .subcommand(
            SubCommand::with_name("efuse-read")
                .about("Read one word of the OCOTP/program-once region")
                .setting(AppSettings::ColoredHelp)
                .arg(Arg::with_name("INDEX").required(true).help("Fuse index"))
        )
        .subcommand(
            SubCommand::with_name("reset")
                .about("Reset the target")
                .setting(AppSettings::ColoredHelp)
        );

    // When double clicking the binary the binary will be paused. Useful on
    // windows, since the Console window will be closed inmediately.
    #[cfg(windows)]
    let app = app.setting(AppSettings::WaitOnError);

    let matches = app.get_matches();

    init_logger(match matches.occurrences_of("v") {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        2..=u64::MAX => log::LevelFilter::Trace,
    })?;

    if let ("list", Some(_)) = matches.subcommand() {
        return list::list();
    }
    if matches.subcommand_name().is_none() {
        println!("Error: Sub-command required");
        println!("{}", matches.usage());
        return Ok(());
    }

    let mut mcu = open_device(&matches)?;

    let result = match matches.subcommand() {
        ("info", Some(_)) => info(&mut mcu),
        ("read", Some(m)) => read(m, &mut mcu),
        ("write", Some(m)) => flash::write(m, &mut mcu),
        ("erase", Some(m)) => erase(m, &mut mcu),
        ("fill", Some(m)) => fill(m, &mut mcu),
        ("unlock", Some(m)) => unlock(m, &mut mcu),
        ("efuse-read", Some(m)) => efuse_read(m, &mut mcu),
        ("reset", Some(_)) => mcu.reset().context("Couldn't reset the target"),
        _ => unreachable!(),
    };

    mcu.close();
    result
}

fn memory_id_arg() -> Arg<'static, 'static> {
    Arg::with_name("memory-id")
        .short("m")
        .long("memory-id")
        .takes_value(true)
        .default_value("0")
        .help("Memory ID (0 for internal memory, see the MBoot external memory IDs)")
}

fn open_device(matches: &ArgMatches<'_>) -> Result<McuBoot> {
    let mut mcu = McuBoot::new();
    mcu.cli_mode = true;
    if let Some(timeout) = matches.value_of("timeout") {
        let seconds: u64 =
            timeout.parse().context("Invalid timeout, must be seconds")?;
        mcu.timeout = Some(Duration::from_secs(seconds));
    }

    if let Some(vid_pid) = matches.value_of("usb") {
        let (vid, pid) = parse_vid_pid(vid_pid)?;
        log::info!("Opening USB-HID device {:04X}:{:04X}", vid, pid);
        mcu.open_usb(vid, pid)
            .context("Failed to open the USB-HID device")?;
    } else {
        let port = matches.value_of("PORT").unwrap();
        let baudrate: usize = matches
            .value_of("baudrate")
            .unwrap()
            .parse()
            .context("Invalid baud rate")?;
        log::info!("Opening serial port `{}` at {} baud", port, baudrate);
        mcu.open_uart(port, baudrate)
            .with_context(|| format!("Couldn't open serial port `{}`", port))?;
    }

    // Cache the on-chip ranges so destructive commands are validated.
    mcu.get_memory_range()
        .context("Couldn't read the device memory ranges")?;

    Ok(mcu)
}

fn info(mcu: &mut McuBoot) -> Result<()> {
    let info = mcu
        .get_mcu_info(0)
        .context("Couldn't read the device properties")?;
    for (name, value) in info {
        println!("{:<26} {}", name, value);
    }
    Ok(())
}

fn read(matches: &ArgMatches<'_>, mcu: &mut McuBoot) -> Result<()> {
    let address = parse_u32(matches.value_of("ADDRESS").unwrap())?;
    let length = parse_u32(matches.value_of("LENGTH").unwrap())?;
    let memory_id = parse_u32(matches.value_of("memory-id").unwrap())?;

    let data = mcu
        .read_memory(address, length, memory_id)
        .context("Couldn't read memory")?;

    match matches.value_of("FILE") {
        Some(path) => {
            fs::write(path, &data)
                .with_context(|| format!("Couldn't write `{}`", path))?;
            log::info!("Saved {} bytes into `{}`", data.len(), path);
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            for (row, chunk) in data.chunks(16).enumerate() {
                write!(out, " {:08X} |", address as usize + row * 16)?;
                for byte in chunk {
                    write!(out, " {:02X}", byte)?;
                }
                writeln!(out)?;
            }
        }
    }
    Ok(())
}

fn erase(matches: &ArgMatches<'_>, mcu: &mut McuBoot) -> Result<()> {
    let memory_id = parse_u32(matches.value_of("memory-id").unwrap())?;
    if matches.is_present("all") {
        mcu.flash_erase_all(memory_id)
            .context("Couldn't erase flash")?;
        return Ok(());
    }
    let address = parse_u32(matches.value_of("ADDRESS").unwrap())?;
    let length = parse_u32(matches.value_of("LENGTH").unwrap())?;
    mcu.flash_erase_region(address, length, memory_id)
        .context("Couldn't erase the flash region")
}

fn fill(matches: &ArgMatches<'_>, mcu: &mut McuBoot) -> Result<()> {
    let address = parse_u32(matches.value_of("ADDRESS").unwrap())?;
    let length = parse_u32(matches.value_of("LENGTH").unwrap())?;
    let pattern = parse_u32(matches.value_of("PATTERN").unwrap())?;
    let unit = match matches.value_of("unit").unwrap() {
        "short" => FillUnit::Short,
        "byte" => FillUnit::Byte,
        _ => FillUnit::Word,
    };
    mcu.fill_memory(address, length, pattern, unit)
        .context("Couldn't fill memory")
}

fn unlock(matches: &ArgMatches<'_>, mcu: &mut McuBoot) -> Result<()> {
    match matches.value_of("key") {
        Some(key) => {
            let key = mboot::util::check_key(key)
                .context("Invalid backdoor key")?;
            mcu.flash_security_disable(&key)
                .context("Couldn't disable flash security")
        }
        None => mcu
            .flash_erase_all_unsecure()
            .context("Couldn't mass-erase and unsecure the device"),
    }
}

fn efuse_read(matches: &ArgMatches<'_>, mcu: &mut McuBoot) -> Result<()> {
    let index = parse_u32(matches.value_of("INDEX").unwrap())?;
    let word = mcu
        .efuse_read_once(index)
        .context("Couldn't read the fuse word")?;
    println!("OCOTP[{}] = 0x{:08X}", index, word);
    Ok(())
}

fn parse_u32(value: &str) -> Result<u32> {
    let value = value.trim();
    let parsed = if let Some(hex) =
        value.strip_prefix("0x").or_else(|| value.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16)
    } else {
        value.parse()
    };
    parsed.with_context(|| format!("Invalid number `{}`", value))
}

fn parse_vid_pid(value: &str) -> Result<(u16, u16)> {
    let mut parts = value.splitn(2, ':');
    let vid = parts.next().unwrap_or_default();
    let pid = parts
        .next()
        .context("Expected VID:PID, e.g. 0x15A2:0x0073")?;
    Ok((parse_u32(vid)? as u16, parse_u32(pid)? as u16))
}

fn init_logger(level: log::LevelFilter) -> Result<()> {
    let mut logger = env_logger::Builder::from_env("MBOOT_LOG");
    logger.filter_level(level);

    #[cfg(unix)]
    logger.format(log_format_color);
    #[cfg(not(unix))]
    logger.format(log_format_no_color);

    logger.try_init().context("Failed to initialize logger")
}

#[cfg(unix)]
fn log_format_color(
    fmt: &mut env_logger::fmt::Formatter,
    record: &log::Record<'_>,
) -> std::io::Result<()> {
    let level = match record.level() {
        log::Level::Error => ansi_term::Color::Red.bold().paint("ERROR"),
        log::Level::Warn => ansi_term::Color::Yellow.bold().paint("WARN"),
        log::Level::Info => ansi_term::Color::Green.bold().paint("INFO"),
        log::Level::Debug => ansi_term::Color::Cyan.bold().paint("DBG"),
        log::Level::Trace => ansi_term::Color::Cyan.bold().paint("TRACE"),
    };

    writeln!(fmt, "[{}] - {}", level, record.args())
}

#[cfg(not(unix))]
fn log_format_no_color(
    fmt: &mut env_logger::fmt::Formatter,
    record: &log::Record<'_>,
) -> std::io::Result<()> {
    let level = match record.level() {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN",
        log::Level::Info => "INFO",
        log::Level::Debug => "DBG",
        log::Level::Trace => "TRACE",
    };

    writeln!(fmt, "[{}] - {}", level, record.args())
}
