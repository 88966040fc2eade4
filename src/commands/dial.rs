//! Interactive dial command: drive the device's menu from the terminal

use pocketcycler_serial::{
    ClickArbiter, ClickIntent, DialCommand, DialState, DialStateMachine, Notification,
    PocketPcr, Transport,
};
use std::io::BufRead;
use std::sync::mpsc;
use std::time::Instant;

/// Run the dial command
///
/// Keyboard input drives the device; reports from the physical knob come
/// back and move the local mirror directly. The terminal has no detent to
/// rotate, so a lone `p` steps backward once its pairing window expires
/// and a quick `p p` pair is a push, the same disambiguation a pointer
/// click gets. Keys: `+`/`-` rotate, `p` click, `q` quit.
pub fn cmd_dial<T: Transport>(
    device: &mut PocketPcr<T>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Program count bounds selection wraparound.
    let set = device.load_programs()?;
    let mut dial = DialStateMachine::new(set.len());
    let mut arbiter = ClickArbiter::new();

    println!(
        "Dial control: {} program(s) on the device. +/- rotate, p click (pp = push), q quit.",
        set.len()
    );
    print_state(&dial);

    // Stdin blocks, so a reader thread feeds lines through a channel and
    // the poll loop stays responsive to device traffic.
    let (tx, rx) = mpsc::channel::<String>();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    loop {
        let now = Instant::now();

        // Keyboard input: transitions emit the commands the device needs
        // to follow our mirror. Clicks go through the arbiter first.
        match rx.try_recv() {
            Ok(line) => match line.trim() {
                "+" => {
                    send_all(device, &dial.rotate(1))?;
                    print_state(&dial);
                }
                "-" => {
                    send_all(device, &dial.rotate(-1))?;
                    print_state(&dial);
                }
                "p" => {
                    for intent in arbiter.press(now) {
                        send_all(device, &local_click(&mut dial, intent))?;
                        print_state(&dial);
                    }
                }
                "q" => return Ok(()),
                "" => {}
                other => println!("unknown input {:?} (+, -, p or q)", other),
            },
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => return Ok(()),
        }
        if let Some(intent) = arbiter.poll(now) {
            send_all(device, &local_click(&mut dial, intent))?;
            print_state(&dial);
        }

        // Device traffic: reports overwrite the mirror, nothing is echoed.
        device.pump()?;
        for event in device.drain_events() {
            apply_device_event(&mut dial, &event);
            print_state(&dial);
        }
    }
}

/// Apply a device report to the mirror
///
/// The firmware already acted on its side, so a reported button press
/// moves the mirror immediately and the transition's commands are dropped
/// instead of sent.
fn apply_device_event(dial: &mut DialStateMachine, event: &Notification) {
    match event {
        Notification::Counter(raw) => dial.device_reported_position(*raw),
        Notification::Menu(raw) => dial.device_reported_menu(*raw),
        Notification::ButtonPushed => {
            let _ = dial.push_button();
        }
        Notification::PcrStart { .. } => dial.run_started(),
        Notification::PcrDone => dial.run_finished(),
    }
}

/// Apply a resolved local click and return the commands to send
fn local_click(dial: &mut DialStateMachine, intent: ClickIntent) -> Vec<DialCommand> {
    match intent {
        ClickIntent::Push => dial.push_button(),
        ClickIntent::RotateBack => dial.rotate(-1),
    }
}

fn send_all<T: Transport>(
    device: &mut PocketPcr<T>,
    commands: &[DialCommand],
) -> Result<(), Box<dyn std::error::Error>> {
    for command in commands {
        match command {
            DialCommand::PushButton => device.push_button()?,
            DialCommand::PushButtonCancel => device.push_button_cancel()?,
            DialCommand::SetSelector(position) => device.set_selector(*position)?,
        }
    }
    Ok(())
}

fn print_state(dial: &DialStateMachine) {
    match dial.state() {
        DialState::RunIdle { position: 0 } => println!("> info screen"),
        DialState::RunIdle { .. } => println!("> run menu entry"),
        DialState::SelectIdle { position } => {
            println!("> program list, program {} highlighted", position)
        }
        DialState::Running { confirming_cancel } => {
            if confirming_cancel {
                println!("> running (press p to cancel)")
            } else {
                println!("> running")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_button_report_moves_the_mirror_immediately() {
        let mut dial = DialStateMachine::new(3);
        dial.rotate(1); // run menu entry

        // A physical press already happened on the device; the mirror
        // follows at once, no arbiter delay and no commands sent back.
        apply_device_event(&mut dial, &Notification::ButtonPushed);
        assert_eq!(dial.state(), DialState::SelectIdle { position: 0 });
    }

    #[test]
    fn local_clicks_resolve_through_intents() {
        let mut dial = DialStateMachine::new(3);

        // A lone click is a back-step; on the info screen that flips to
        // the run entry and the device is told to follow.
        let commands = local_click(&mut dial, ClickIntent::RotateBack);
        assert_eq!(dial.state(), DialState::RunIdle { position: 1 });
        assert_eq!(commands, vec![DialCommand::SetSelector(1)]);

        // A confirmed push enters the program list.
        let commands = local_click(&mut dial, ClickIntent::Push);
        assert_eq!(dial.state(), DialState::SelectIdle { position: 0 });
        assert_eq!(
            commands,
            vec![DialCommand::PushButton, DialCommand::SetSelector(0)]
        );
    }
}
