//! # sampledb CLI Entry Point
//!
//! Read-only diagnostics for a sample store file.
//!
//! ## Usage
//!
//! ```bash
//! # Print every (key, value) pair
//! sampledb dump samples.db
//!
//! # Print pairs in [0x8048000, 0x8049000)
//! sampledb dump samples.db --from 0x8048000 --to 0x8049000
//!
//! # Validate the tree, exit code 2 on violations
//! sampledb check samples.db --header-size 128
//!
//! # Page and fill statistics
//! sampledb stats samples.db
//! ```

use eyre::{bail, eyre, Result, WrapErr};
use sampledb::{Key, OpenMode, SampleDb};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Dump,
    Check,
    Stats,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(ExitCode::SUCCESS);
    }

    let mut command: Option<Command> = None;
    let mut db_path: Option<PathBuf> = None;
    let mut header_size = 0usize;
    let mut from: Option<Key> = None;
    let mut to: Option<Key> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                return Ok(ExitCode::SUCCESS);
            }
            "--version" | "-v" => {
                println!("sampledb {}", env!("CARGO_PKG_VERSION"));
                return Ok(ExitCode::SUCCESS);
            }
            "--header-size" => {
                let raw = option_value(&args, &mut i)?;
                header_size = raw
                    .parse()
                    .wrap_err_with(|| format!("invalid --header-size '{}'", raw))?;
            }
            "--from" => from = Some(parse_key(option_value(&args, &mut i)?)?),
            "--to" => to = Some(parse_key(option_value(&args, &mut i)?)?),
            arg if arg.starts_with('-') => {
                bail!("Unknown option: {}", arg);
            }
            word if command.is_none() => {
                command = Some(match word {
                    "dump" => Command::Dump,
                    "check" => Command::Check,
                    "stats" => Command::Stats,
                    other => bail!("Unknown command: {}", other),
                });
            }
            path => {
                if db_path.is_some() {
                    bail!("Multiple store paths specified");
                }
                db_path = Some(PathBuf::from(path));
            }
        }
        i += 1;
    }

    let (command, db_path) = match (command, db_path) {
        (Some(c), Some(p)) => (c, p),
        _ => {
            print_usage();
            return Ok(ExitCode::from(1));
        }
    };

    let mut db = SampleDb::open_with(&db_path, OpenMode::ReadOnly, header_size)
        .wrap_err_with(|| format!("failed to open store at {:?}", db_path))?;

    match command {
        Command::Dump => {
            let lower = from.unwrap_or(0);
            let mut print = |key: Key, value: u32| println!("{:#010x} {}", key, value);
            match to {
                Some(upper) => db.travel(lower, upper, &mut print)?,
                None => db.travel_range(lower.., &mut print)?,
            }
        }
        Command::Check => {
            let violations = db.check()?;
            if !violations.is_empty() {
                for violation in &violations {
                    println!("{}", violation);
                }
                println!("{} violation(s) found", violations.len());
                return Ok(ExitCode::from(2));
            }
            println!("ok");
        }
        Command::Stats => {
            println!("{}", db.stats()?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn option_value<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str> {
    let name = &args[*i];
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| eyre!("{} requires a value", name))
}

fn parse_key(raw: &str) -> Result<Key> {
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => Key::from_str_radix(hex, 16),
        None => raw.parse(),
    };
    parsed.wrap_err_with(|| format!("invalid key '{}'", raw))
}

fn print_usage() {
    println!("sampledb - inspect profiler sample stores");
    println!();
    println!("USAGE:");
    println!("    sampledb <COMMAND> <STORE_PATH> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    dump     Print (key, value) pairs in key order");
    println!("    check    Validate tree structure (exit code 2 on violations)");
    println!("    stats    Print page and fill statistics");
    println!();
    println!("OPTIONS:");
    println!("        --header-size <N>  Caller header size the store was created with");
    println!("        --from <KEY>       First key to dump (decimal or 0x-hex)");
    println!("        --to <KEY>         Dump keys strictly below this one");
    println!("    -h, --help             Print help information");
    println!("    -v, --version          Print version information");
}
