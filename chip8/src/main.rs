use std::error::Error;
use std::path::PathBuf;

use chip8_core::Quirks;
use clap::Parser;

mod keymap;
mod run;

use run::{KeyPress, Settings, DEFAULT_CLOCK_SPEED};

/// Runs a Chip-8 ROM, drawing the display in the terminal
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the ROM file to run
    rom: PathBuf,

    /// Instructions per second; the timers count down once per instruction
    #[arg(long, default_value_t = DEFAULT_CLOCK_SPEED)]
    clock_speed: u64,

    /// Stop after this many instructions
    #[arg(long)]
    cycles: Option<u64>,

    /// Run as fast as possible instead of at the clock speed
    #[arg(long)]
    fast_forward: bool,

    /// Press a key at a given instruction, e.g. `w@120` (repeatable)
    #[arg(long = "press")]
    presses: Vec<KeyPress>,

    /// Don't read the keyboard; use this when stdin isn't a terminal
    #[arg(long)]
    no_keyboard: bool,

    /// Leave I unchanged after FX55/FX65
    #[arg(long)]
    no_index_increment: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    run::run(Settings {
        rom: args.rom,
        clock_speed: args.clock_speed,
        cycles: args.cycles,
        fast_forward: args.fast_forward,
        presses: args.presses,
        keyboard: !args.no_keyboard,
        quirks: Quirks {
            increment_index_on_store: !args.no_index_increment,
        },
    })
}
