//! Run command: start a stored program and follow it to completion

use indicatif::{ProgressBar, ProgressStyle};
use pocketcycler_core::ProgramSet;
use pocketcycler_serial::{
    DialStateMachine, Notification, PocketPcr, RunMonitor, Transport,
};
use std::time::Instant;

/// Run the run command
///
/// Downloads the program list first so the selector can be a name as well
/// as an index, then starts the program and polls its status until the
/// device announces completion.
pub fn cmd_run<T: Transport>(
    device: &mut PocketPcr<T>,
    selector: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let set = device.load_programs()?;
    let index = resolve_program(&set, selector)?;
    let program = set
        .program(index)
        .ok_or_else(|| format!("no program at index {}", index))?;

    println!(
        "Running [{}] {} ({} cycles)",
        index,
        program.name(),
        program.total_cycles()
    );

    let pb = ProgressBar::new(program.total_cycles().max(0) as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] cycle {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut dial = DialStateMachine::new(set.len());
    let mut monitor = RunMonitor::new();

    device.run_program(index)?;
    monitor.on_pcr_start(index, &set, &mut dial);

    loop {
        device.pump()?;
        for event in device.drain_events() {
            match event {
                Notification::PcrDone => {
                    monitor.on_pcr_done(&mut dial);
                    pb.finish_with_message("done");
                    println!("Program finished.");
                    return Ok(());
                }
                Notification::PcrStart { program } => {
                    // The device's own announcement of the start we asked for.
                    log::debug!("device confirmed start of program {}", program);
                }
                Notification::Counter(raw) => dial.device_reported_position(raw),
                Notification::Menu(raw) => dial.device_reported_menu(raw),
                Notification::ButtonPushed => {
                    log::info!("physical button pressed during the run");
                }
            }
        }
        if let Some(status) = monitor.tick(Instant::now(), device)? {
            pb.set_position(status.overall_cycle_index as u64);
            pb.set_message(format!(
                "{:.1}C -> {:.1}C, {}s in block {}",
                status.block_temp,
                status.target_temp,
                status.elapsed_seconds,
                status.block_index
            ));
        }
    }
}

/// Resolve a program selector: a decimal index, or an exact name
fn resolve_program(
    set: &ProgramSet,
    selector: &str,
) -> Result<usize, Box<dyn std::error::Error>> {
    if let Ok(index) = selector.parse::<usize>() {
        if index < set.len() {
            return Ok(index);
        }
        return Err(format!(
            "program index {} out of range (device has {})",
            index,
            set.len()
        )
        .into());
    }
    set.programs()
        .iter()
        .position(|p| p.name() == selector)
        .ok_or_else(|| format!("no program named {:?} on the device", selector).into())
}
