//! pocketcycler - serial controller for the GaudiLabs PocketPCR
//!
//! Talks to the thermocycler over USB serial (or a TCP bridge), moving
//! cycling programs between RON files and the device's EEPROM, starting
//! and following runs, reading the heat block and remote-driving the
//! rotary-dial menu.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use pocketcycler_serial::{open, Connection, PocketPcr, Transport};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    // The subcommand arms move their owned arguments out, so the
    // connection arguments are split off first.
    let Cli {
        port, baud, command, ..
    } = cli;

    match command {
        Commands::List => commands::programs::cmd_list(&mut connect(&port, baud)?),
        Commands::Pull { output } => {
            commands::transfer::cmd_pull(&mut connect(&port, baud)?, &output)
        }
        Commands::Push { input, yes } => {
            commands::transfer::cmd_push(&mut connect(&port, baud)?, &input, yes)
        }
        // File-only; no device involved.
        Commands::Show { file } => commands::programs::cmd_show(&file),
        Commands::Temp { watch } => commands::temp::cmd_temp(&mut connect(&port, baud)?, watch),
        Commands::Block { set, off } => {
            commands::temp::cmd_block(&mut connect(&port, baud)?, set, off)
        }
        Commands::Run { program } => {
            commands::run::cmd_run(&mut connect(&port, baud)?, &program)
        }
        Commands::Dial => commands::dial::cmd_dial(&mut connect(&port, baud)?),
    }
}

/// Open the device named by the global connection arguments
fn connect(
    port: &str,
    baud: u32,
) -> Result<PocketPcr<Box<dyn Transport>>, Box<dyn std::error::Error>> {
    let conn: Connection = port.parse()?;
    Ok(open(&conn, baud)?)
}
