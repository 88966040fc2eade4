//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pocketcycler")]
#[command(author, version, about = "PocketPCR thermocycler controller", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Device connection: a serial port path or ip=<host>:<port>
    #[arg(short, long, global = true, default_value = "/dev/ttyACM0")]
    pub port: String,

    /// Serial baud rate (ignored for TCP connections)
    #[arg(long, global = true, default_value_t = 115_200)]
    pub baud: u32,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the programs stored on the device
    List,

    /// Download the device's programs to a file
    Pull {
        /// Output program file (RON format)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Upload a program file to the device, replacing its stored programs
    Push {
        /// Input program file (RON format)
        #[arg(short, long)]
        input: PathBuf,

        /// Overwrite the device without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the programs in a file without touching the device
    Show {
        /// Program file (RON format)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Read the heat block temperature
    Temp {
        /// Keep polling once a second until interrupted
        #[arg(short, long)]
        watch: bool,
    },

    /// Hold the heat block at a fixed temperature, or turn it off
    Block {
        /// Target temperature in degrees Celsius
        #[arg(short, long, conflicts_with = "off")]
        set: Option<f64>,

        /// Turn the heat block off
        #[arg(long)]
        off: bool,
    },

    /// Start a stored program and follow its progress
    Run {
        /// Program to run, by index or by name
        #[arg(short = 'P', long)]
        program: String,
    },

    /// Drive the device's rotary-dial menu interactively
    Dial,
}
