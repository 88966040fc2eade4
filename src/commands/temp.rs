//! Temperature readout and manual heat block control

use pocketcycler_serial::protocol::TEMP_POLL_INTERVAL;
use pocketcycler_serial::{PocketPcr, Transport};
use std::time::Instant;

/// Run the temp command: one reading, or a once-a-second watch
pub fn cmd_temp<T: Transport>(
    device: &mut PocketPcr<T>,
    watch: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !watch {
        println!("{:.2} C", device.read_temp()?);
        return Ok(());
    }

    println!("Watching block temperature (Ctrl-C to stop)");
    loop {
        let started = Instant::now();
        match device.read_temp() {
            Ok(temp) => println!("{:.2} C", temp),
            // A missed reading is worth a line, not an exit.
            Err(e) => log::warn!("temperature read failed: {}", e),
        }
        let elapsed = started.elapsed();
        if elapsed < TEMP_POLL_INTERVAL {
            std::thread::sleep(TEMP_POLL_INTERVAL - elapsed);
        }
    }
}

/// Run the block command: hold a temperature or turn the block off
pub fn cmd_block<T: Transport>(
    device: &mut PocketPcr<T>,
    set: Option<f64>,
    off: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match (set, off) {
        (Some(temp), false) => {
            device.set_block_temp(temp)?;
            println!("Holding block at {:.1} C", temp);
            Ok(())
        }
        (None, true) => {
            device.block_off()?;
            println!("Block off");
            Ok(())
        }
        _ => Err("use exactly one of --set <temp> or --off".into()),
    }
}
