use clap::{Arg, Command as ClapCommand, ArgAction};
use std::path::Path;
use std::process;
use log::error;

use slidepatch::utils::logger::Logger;
use slidepatch::commands::{CommandFactory, SlidepatchCommandFactory};

fn main() {
    let matches = ClapCommand::new("slidepatch")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Extract background-filtered patches from pyramidal whole-slide images")
        .arg(
            Arg::new("input")
                .help("Input slide files (SVS or pyramidal TIFF)")
                .required(true)
                .num_args(1..)
                .index(1),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("TOML configuration file")
                .value_name("FILE")
                .required(false),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Directory for the extracted patches")
                .value_name("DIR")
                .required(false),
        )
        .arg(
            Arg::new("summary")
                .long("summary")
                .help("Summary file (relative names land in the output directory)")
                .value_name("FILE")
                .required(false),
        )
        .arg(
            Arg::new("patch-size")
                .short('p')
                .long("patch-size")
                .help("Patch edge in pixels")
                .value_name("PIXELS")
                .required(false),
        )
        .arg(
            Arg::new("magnification")
                .short('m')
                .long("magnification")
                .help("Target magnification (e.g. 20)")
                .value_name("X")
                .required(false),
        )
        .arg(
            Arg::new("white-threshold")
                .short('w')
                .long("white-threshold")
                .help("Maximum percentage of white pixels in a kept patch (0-100)")
                .value_name("PERCENT")
                .required(false),
        )
        .arg(
            Arg::new("white-max")
                .long("white-max")
                .help("Luma at or above which a pixel is white (default 220)")
                .value_name("VALUE")
                .required(false),
        )
        .arg(
            Arg::new("sampling")
                .short('s')
                .long("sampling")
                .help("Share of grid cells to read, in (0, 1]")
                .value_name("RATE")
                .required(false),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .help("Seed for patch sampling")
                .value_name("SEED")
                .required(false),
        )
        .arg(
            Arg::new("base-magnification")
                .long("base-magnification")
                .help("Magnification to assume for slides without AppMag metadata")
                .value_name("X")
                .required(false),
        )
        .arg(
            Arg::new("workers")
                .short('j')
                .long("workers")
                .help("Number of worker threads")
                .value_name("N")
                .required(false),
        )
        .arg(
            Arg::new("parallel-images")
                .long("parallel-images")
                .help("Process several slides at once")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("inspect")
                .short('i')
                .long("inspect")
                .help("Print the pyramid structure of the inputs instead of extracting")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let logger = match Logger::new(Path::new("slidepatch.log")) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Error initializing logger: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = Logger::init_global_logger(Path::new("slidepatch-global.log"), matches.get_flag("verbose")) {
        eprintln!("Error setting up global logger: {}", e);
        process::exit(1);
    }

    let factory = SlidepatchCommandFactory::new();

    match factory.create_command(&matches, &logger) {
        Ok(command) => {
            if let Err(e) = command.execute() {
                error!("Command execution error: {}", e);
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        Err(e) => {
            error!("Failed to create command: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
}
