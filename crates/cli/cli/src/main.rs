//! The migration driver binary.
//!
//! Usage: `worldshift <input_base> <input_world_subdir> <output_base>
//! <output_world_subdir>`. The base directories hold the game install
//! (config files); the world subdirectories are resolved against them.

mod driver;
mod profile;

use std::path::PathBuf;
use std::process::ExitCode;

use log::error;


struct Args {
    input_base:   PathBuf,
    input_world:  PathBuf,
    output_base:  PathBuf,
    output_world: PathBuf,
}

fn parse_args() -> Option<Args> {
    let mut args = std::env::args_os().skip(1);
    let parsed = Args {
        input_base:   PathBuf::from(args.next()?),
        input_world:  PathBuf::from(args.next()?),
        output_base:  PathBuf::from(args.next()?),
        output_world: PathBuf::from(args.next()?),
    };
    if args.next().is_some() {
        return None;
    }
    Some(parsed)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(args) = parse_args() else {
        eprintln!("Usage:");
        eprintln!("  worldshift <inbasedir> <inworlddir> <outbasedir> <outworlddir>");
        return ExitCode::FAILURE;
    };

    match driver::run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
