//! Listing and showing program sets

use pocketcycler_core::{ProgramDocument, ProgramSet};
use pocketcycler_serial::{PocketPcr, Transport};
use std::path::Path;

/// Run the list command: download and print the device's programs
pub fn cmd_list<T: Transport>(
    device: &mut PocketPcr<T>,
) -> Result<(), Box<dyn std::error::Error>> {
    let set = device.load_programs()?;
    print_set(&set);
    Ok(())
}

/// Run the show command: print the programs in a file
pub fn cmd_show(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let set = ProgramDocument::load_file(file)?.into_set();
    print_set(&set);
    Ok(())
}

/// Print a program set as an indented listing
pub fn print_set(set: &ProgramSet) {
    if set.is_empty() {
        println!("No programs stored.");
        return;
    }
    println!("{} program(s):", set.len());
    for (index, program) in set.programs().iter().enumerate() {
        println!(
            "  [{}] {} ({} cycles, about {})",
            index,
            program.name(),
            program.total_cycles(),
            format_duration(program.estimated_seconds())
        );
        for cycle in program.cycles() {
            let steps: Vec<String> = cycle
                .blocks()
                .iter()
                .map(|b| format!("{:.1}C/{}s", b.temperature_c, b.hold_seconds))
                .collect();
            println!("      {} x{}", steps.join(" -> "), cycle.repeat_count());
        }
    }
}

/// Render seconds as h:mm:ss or m:ss
pub fn format_duration(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, (seconds / 60) % 60, seconds % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_render_both_forms() {
        assert_eq!(format_duration(59), "0:59");
        assert_eq!(format_duration(61), "1:01");
        assert_eq!(format_duration(3_725), "1:02:05");
    }
}
