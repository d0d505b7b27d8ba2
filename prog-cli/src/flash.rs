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

use std::{fs::File, io::Read, path::PathBuf};

use anyhow::{bail, Context, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use indicatif::{ProgressBar, ProgressStyle};

use mboot::{EraseMode, McuBoot};

pub fn subcommand() -> App<'static, 'static> {
    SubCommand::with_name("write")
        .about("Write a binary file into memory")
        .setting(AppSettings::ColoredHelp)
        .arg(
            Arg::with_name("BIN")
                .required(true)
                .takes_value(true)
                .help("Binary file to write"),
        )
        .arg(
            Arg::with_name("address")
                .short("a")
                .long("address")
                .required(true)
                .takes_value(true)
                .help("Address in memory where the binary contents will be written"),
        )
        .arg(
            Arg::with_name("write-erase")
                .short("e")
                .long("write-erase")
                .help("Erase the covered flash sectors before writing"),
        )
        .arg(
            Arg::with_name("memory-id")
                .short("m")
                .long("memory-id")
                .takes_value(true)
                .default_value("0")
                .help("Memory ID (0 for internal memory)"),
        )
}

/// Write subcommand entry point.
pub fn write(matches: &ArgMatches<'_>, mcu: &mut McuBoot) -> Result<()> {
    let opts = WriteOpts::from_matches(matches)?;

    let mut binary_file =
        File::open(&opts.binary_path).with_context(|| {
            format!(
                "Couldn't open firmware file: `{}`",
                opts.binary_path.display()
            )
        })?;

    let mut binary = Vec::new();
    binary_file
        .read_to_end(&mut binary)
        .context("Failed to read firmware file contents")?;
    if binary.is_empty() {
        bail!("Firmware file is empty");
    }

    log::info!(
        "Binary file: `{}`",
        opts.binary_path.file_name().unwrap().to_string_lossy()
    );
    log::info!("Binary file size: {} bytes", binary.len());

    let bar = ProgressBar::new(binary.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{prefix} [{bar:40}] {bytes}/{total_bytes}")
            .progress_chars("##-"),
    );
    bar.set_prefix("Writing");

    let progress = bar.clone();
    mcu.set_progress(Some(Box::new(move |transferred, _total| {
        progress.set_position(transferred as u64);
    })));

    let erase = if opts.write_erase {
        EraseMode::Erase
    } else {
        EraseMode::None
    };
    let result = mcu.flash_image(&binary, opts.address, erase, opts.memory_id);
    mcu.set_progress(None);
    bar.finish();

    let written = result.context("Couldn't write the binary")?;
    log::info!("Wrote {} bytes at {:#010X}", written, opts.address);

    Ok(())
}

struct WriteOpts {
    binary_path: PathBuf,
    address: u32,
    write_erase: bool,
    memory_id: u32,
}

impl WriteOpts {
    pub fn from_matches(matches: &ArgMatches<'_>) -> Result<WriteOpts> {
        Ok(WriteOpts {
            binary_path: matches
                .value_of("BIN")
                .unwrap()
                .parse()
                .context("Invalid binary file path")?,
            address: crate::parse_u32(matches.value_of("address").unwrap())
                .context("Invalid write address")?,
            write_erase: matches.is_present("write-erase"),
            memory_id: crate::parse_u32(
                matches.value_of("memory-id").unwrap(),
            )?,
        })
    }
}
