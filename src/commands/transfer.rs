//! Pull and push: moving program sets between the device and files

use pocketcycler_core::ProgramDocument;
use pocketcycler_serial::{PocketPcr, Transport};
use std::io::{BufRead, Write};
use std::path::Path;

use crate::commands::programs::print_set;

/// Run the pull command: download the device's programs to a file
pub fn cmd_pull<T: Transport>(
    device: &mut PocketPcr<T>,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let set = device.load_programs()?;
    ProgramDocument::from_set(&set).save_file(output)?;
    println!("Saved {} program(s) to {:?}", set.len(), output);
    Ok(())
}

/// Run the push command: upload a program file, replacing the device's set
///
/// Uploading overwrites every program stored on the device, so without
/// `--yes` the command shows what it is about to write and asks first.
pub fn cmd_push<T: Transport>(
    device: &mut PocketPcr<T>,
    input: &Path,
    yes: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let set = ProgramDocument::load_file(input)?.into_set();
    if set.is_empty() {
        return Err("refusing to push an empty program set".into());
    }

    if !yes {
        print_set(&set);
        if !confirm("Replace ALL programs stored on the device?")? {
            println!("Aborted.");
            return Ok(());
        }
    }

    let written = device.upload_programs(&set)?;
    println!(
        "Uploaded {} program(s) ({} bytes) to the device",
        set.len(),
        written
    );
    Ok(())
}

/// Ask a yes/no question on the terminal; default is no
fn confirm(question: &str) -> Result<bool, Box<dyn std::error::Error>> {
    print!("{} [y/N] ", question);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
