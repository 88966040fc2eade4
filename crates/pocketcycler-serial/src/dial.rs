//! Local mirror of the device's rotary dial and menu state
//!
//! The controller keeps its own copy of the dial so a remote operator can
//! drive the device's screen. Rotations and presses mutate the mirror and
//! yield the wire commands that make the device follow; reports pushed by
//! the device (`counter:`, `menu:`) overwrite the mirror silently, with no
//! command echoed back, so the physical knob always wins.

use std::time::{Duration, Instant};

use crate::protocol::DOUBLE_CLICK_WINDOW;

/// Wire command a dial transition asks the caller to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialCommand {
    /// Send `PushButton`
    PushButton,
    /// Send `PushButtonCancel`
    PushButtonCancel,
    /// Send `SetSelector,<n>`
    SetSelector(usize),
}

/// Where the device's menu currently sits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialState {
    /// Top-level menu; position 0 is the info screen, 1 the run entry
    RunIdle {
        /// Top-level position, 0 or 1
        position: u8,
    },
    /// Program selection list
    SelectIdle {
        /// Highlighted program index
        position: usize,
    },
    /// A program is executing
    Running {
        /// The cancel prompt is on screen; the next press confirms it
        confirming_cancel: bool,
    },
}

/// Mirror of the device's dial and menu
///
/// Transitions return the commands to send; the caller owns the link and
/// decides when to put them on the wire.
pub struct DialStateMachine {
    state: DialState,
    /// Program list position remembered across menu levels
    selected: usize,
    /// Number of programs, bounding selection wraparound
    program_count: usize,
}

impl DialStateMachine {
    /// Start at the top-level info screen
    pub fn new(program_count: usize) -> Self {
        Self {
            state: DialState::RunIdle { position: 0 },
            selected: 0,
            program_count,
        }
    }

    /// Current mirrored state
    pub fn state(&self) -> DialState {
        self.state
    }

    /// Highlighted program index
    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Update the wraparound bound after programs were added or removed
    pub fn set_program_count(&mut self, count: usize) {
        self.program_count = count;
        if self.program_count > 0 && self.selected >= self.program_count {
            self.selected = self.program_count - 1;
        }
    }

    /// Rotate the dial by `steps` (positive clockwise)
    ///
    /// Selection moves wrap around at both ends. While a program runs,
    /// rotation toggles the cancel prompt locally and sends nothing; the
    /// device flips its own prompt from its physical encoder.
    pub fn rotate(&mut self, steps: i32) -> Vec<DialCommand> {
        match self.state {
            DialState::RunIdle { position } => {
                // Two top-level entries, so any odd step count flips.
                let next = if steps.rem_euclid(2) == 1 {
                    1 - position
                } else {
                    position
                };
                self.state = DialState::RunIdle { position: next };
                vec![DialCommand::SetSelector(next as usize)]
            }
            DialState::SelectIdle { position } => {
                if self.program_count == 0 {
                    return Vec::new();
                }
                let count = self.program_count as i32;
                let next = (position as i32 + steps).rem_euclid(count) as usize;
                self.selected = next;
                self.state = DialState::SelectIdle { position: next };
                vec![DialCommand::SetSelector(next)]
            }
            DialState::Running { confirming_cancel } => {
                self.state = DialState::Running {
                    confirming_cancel: !confirming_cancel,
                };
                Vec::new()
            }
        }
    }

    /// Press the dial button
    pub fn push_button(&mut self) -> Vec<DialCommand> {
        match self.state {
            DialState::RunIdle { position: 0 } => {
                // Info screen: the press is forwarded, nothing moves.
                vec![DialCommand::PushButton]
            }
            DialState::RunIdle { .. } => {
                // Enter the program list at the remembered selection.
                self.state = DialState::SelectIdle {
                    position: self.selected,
                };
                vec![
                    DialCommand::PushButton,
                    DialCommand::SetSelector(self.selected),
                ]
            }
            DialState::SelectIdle { position } => {
                // Choosing a program returns to the top-level run entry.
                self.selected = position;
                self.state = DialState::RunIdle { position: 1 };
                vec![DialCommand::PushButton, DialCommand::SetSelector(1)]
            }
            DialState::Running { confirming_cancel } => {
                if confirming_cancel {
                    self.state = DialState::RunIdle { position: 1 };
                    vec![DialCommand::PushButtonCancel]
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Apply a `counter:` report from the physical dial
    ///
    /// Overwrites the mirror only; no command goes back, or the device
    /// would move twice. Out-of-range values wrap the way the firmware
    /// steps its selector: past the last entry snaps to 0, before the
    /// first snaps to the last entry.
    pub fn device_reported_position(&mut self, raw: i32) {
        match self.state {
            DialState::RunIdle { .. } => {
                let position = if raw > 1 {
                    0
                } else if raw < 0 {
                    1
                } else {
                    raw as u8
                };
                self.state = DialState::RunIdle { position };
            }
            DialState::SelectIdle { .. } => {
                if self.program_count == 0 {
                    return;
                }
                let last = self.program_count as i32 - 1;
                let position = if raw > last {
                    0
                } else if raw < 0 {
                    last
                } else {
                    raw
                } as usize;
                self.selected = position;
                self.state = DialState::SelectIdle { position };
            }
            DialState::Running { .. } => {
                log::debug!("ignoring counter report while running");
            }
        }
    }

    /// Apply a `menu:` report from the device
    ///
    /// Out-of-range values clamp the way the firmware does: above 1 wraps
    /// to 0, below 0 snaps to 1.
    pub fn device_reported_menu(&mut self, raw: i32) {
        if matches!(self.state, DialState::Running { .. }) {
            log::debug!("ignoring menu report while running");
            return;
        }
        let position = if raw > 1 {
            0
        } else if raw < 0 {
            1
        } else {
            raw as u8
        };
        self.state = DialState::RunIdle { position };
    }

    /// A program started (locally or on the device)
    pub fn run_started(&mut self) {
        self.state = DialState::Running {
            confirming_cancel: false,
        };
    }

    /// The running program finished or was cancelled
    pub fn run_finished(&mut self) {
        self.state = DialState::RunIdle { position: 1 };
    }
}

/// Resolved intent of an operator's click sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickIntent {
    /// A pair of quick clicks: a confirmed push
    Push,
    /// A lone click whose pairing window expired: a back-step
    RotateBack,
}

/// Tells an operator's double click from a lone click
///
/// A pointing device has no detent to rotate, so a lone click steps the
/// dial backward and a second click inside the pairing window turns the
/// pair into a push instead. The arbiter never blocks: `press` records,
/// `poll` resolves expiry on the caller's next tick.
pub struct ClickArbiter {
    armed_at: Option<Instant>,
    window: Duration,
}

impl Default for ClickArbiter {
    fn default() -> Self {
        Self::new()
    }
}

impl ClickArbiter {
    /// Arbiter with the standard pairing window
    pub fn new() -> Self {
        Self {
            armed_at: None,
            window: DOUBLE_CLICK_WINDOW,
        }
    }

    #[cfg(test)]
    fn with_window(window: Duration) -> Self {
        Self {
            armed_at: None,
            window,
        }
    }

    /// Record a press at `now`
    ///
    /// Returns the resolved intents this press settles. A press landing on
    /// an already-expired window first flushes the stale back-step, then
    /// arms a fresh window.
    pub fn press(&mut self, now: Instant) -> Vec<ClickIntent> {
        match self.armed_at.take() {
            Some(armed) if now.duration_since(armed) <= self.window => {
                vec![ClickIntent::Push]
            }
            Some(_) => {
                self.armed_at = Some(now);
                vec![ClickIntent::RotateBack]
            }
            None => {
                self.armed_at = Some(now);
                Vec::new()
            }
        }
    }

    /// Resolve an armed press whose window has expired
    pub fn poll(&mut self, now: Instant) -> Option<ClickIntent> {
        match self.armed_at {
            Some(armed) if now.duration_since(armed) > self.window => {
                self.armed_at = None;
                Some(ClickIntent::RotateBack)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_rotation_flips_between_two_entries() {
        let mut dial = DialStateMachine::new(4);
        assert_eq!(dial.state(), DialState::RunIdle { position: 0 });

        let cmds = dial.rotate(1);
        assert_eq!(dial.state(), DialState::RunIdle { position: 1 });
        assert_eq!(cmds, vec![DialCommand::SetSelector(1)]);

        let cmds = dial.rotate(-1);
        assert_eq!(dial.state(), DialState::RunIdle { position: 0 });
        assert_eq!(cmds, vec![DialCommand::SetSelector(0)]);
    }

    #[test]
    fn selection_wraps_at_both_ends() {
        let mut dial = DialStateMachine::new(3);
        dial.rotate(1); // to run entry
        dial.push_button(); // into the list at selection 0

        let cmds = dial.rotate(-1);
        assert_eq!(dial.state(), DialState::SelectIdle { position: 2 });
        assert_eq!(cmds, vec![DialCommand::SetSelector(2)]);

        let cmds = dial.rotate(1);
        assert_eq!(dial.state(), DialState::SelectIdle { position: 0 });
        assert_eq!(cmds, vec![DialCommand::SetSelector(0)]);
    }

    #[test]
    fn info_screen_press_forwards_without_moving() {
        let mut dial = DialStateMachine::new(3);
        let cmds = dial.push_button();
        assert_eq!(cmds, vec![DialCommand::PushButton]);
        assert_eq!(dial.state(), DialState::RunIdle { position: 0 });
    }

    #[test]
    fn choosing_a_program_returns_to_the_run_entry() {
        let mut dial = DialStateMachine::new(3);
        dial.rotate(1);
        dial.push_button();
        dial.rotate(1); // highlight program 1

        let cmds = dial.push_button();
        assert_eq!(dial.state(), DialState::RunIdle { position: 1 });
        assert_eq!(dial.selected(), 1);
        assert_eq!(
            cmds,
            vec![DialCommand::PushButton, DialCommand::SetSelector(1)]
        );

        // Re-entering the list lands on the remembered program.
        let cmds = dial.push_button();
        assert_eq!(dial.state(), DialState::SelectIdle { position: 1 });
        assert_eq!(
            cmds,
            vec![DialCommand::PushButton, DialCommand::SetSelector(1)]
        );
    }

    #[test]
    fn cancel_needs_a_toggle_then_a_press() {
        let mut dial = DialStateMachine::new(3);
        dial.run_started();

        // A bare press while running does nothing.
        assert!(dial.push_button().is_empty());

        // Rotation toggles the prompt without touching the wire.
        assert!(dial.rotate(1).is_empty());
        assert_eq!(
            dial.state(),
            DialState::Running {
                confirming_cancel: true
            }
        );

        let cmds = dial.push_button();
        assert_eq!(cmds, vec![DialCommand::PushButtonCancel]);
        assert_eq!(dial.state(), DialState::RunIdle { position: 1 });
    }

    #[test]
    fn device_reports_overwrite_without_echo() {
        let mut dial = DialStateMachine::new(3);

        dial.device_reported_position(5);
        assert_eq!(dial.state(), DialState::RunIdle { position: 0 });

        dial.device_reported_menu(-2);
        assert_eq!(dial.state(), DialState::RunIdle { position: 1 });
        dial.device_reported_menu(7);
        assert_eq!(dial.state(), DialState::RunIdle { position: 0 });

        dial.device_reported_menu(1);
        dial.push_button(); // into the list
        dial.device_reported_position(2);
        assert_eq!(dial.state(), DialState::SelectIdle { position: 2 });
        assert_eq!(dial.selected(), 2);
    }

    #[test]
    fn counter_reports_wrap_like_the_selector() {
        let mut dial = DialStateMachine::new(3);

        // Two top-level entries: past 1 snaps to 0, below 0 snaps to 1.
        dial.device_reported_position(2);
        assert_eq!(dial.state(), DialState::RunIdle { position: 0 });
        dial.device_reported_position(-1);
        assert_eq!(dial.state(), DialState::RunIdle { position: 1 });

        // Program list: past the last program snaps to 0, below 0 to the
        // last program.
        dial.push_button();
        dial.device_reported_position(3);
        assert_eq!(dial.state(), DialState::SelectIdle { position: 0 });
        dial.device_reported_position(-2);
        assert_eq!(dial.state(), DialState::SelectIdle { position: 2 });
        assert_eq!(dial.selected(), 2);
    }

    #[test]
    fn reports_are_ignored_while_running() {
        let mut dial = DialStateMachine::new(3);
        dial.run_started();
        dial.device_reported_position(1);
        dial.device_reported_menu(0);
        assert_eq!(
            dial.state(),
            DialState::Running {
                confirming_cancel: false
            }
        );
    }

    #[test]
    fn run_lifecycle_restores_the_run_entry() {
        let mut dial = DialStateMachine::new(3);
        dial.run_started();
        assert_eq!(
            dial.state(),
            DialState::Running {
                confirming_cancel: false
            }
        );
        dial.run_finished();
        assert_eq!(dial.state(), DialState::RunIdle { position: 1 });
    }

    #[test]
    fn shrinking_the_program_list_clamps_the_selection() {
        let mut dial = DialStateMachine::new(5);
        dial.rotate(1);
        dial.push_button();
        dial.rotate(4);
        assert_eq!(dial.selected(), 4);

        dial.set_program_count(2);
        assert_eq!(dial.selected(), 1);
    }

    #[test]
    fn quick_pair_of_presses_is_a_push() {
        let window = Duration::from_millis(350);
        let mut arbiter = ClickArbiter::with_window(window);
        let t0 = Instant::now();

        assert!(arbiter.press(t0).is_empty());
        assert_eq!(
            arbiter.press(t0 + Duration::from_millis(200)),
            vec![ClickIntent::Push]
        );
        // The pair is consumed; nothing resolves later.
        assert_eq!(arbiter.poll(t0 + Duration::from_secs(5)), None);
    }

    #[test]
    fn lone_press_resolves_to_a_back_step() {
        let window = Duration::from_millis(350);
        let mut arbiter = ClickArbiter::with_window(window);
        let t0 = Instant::now();

        assert!(arbiter.press(t0).is_empty());
        assert_eq!(arbiter.poll(t0 + Duration::from_millis(300)), None);
        assert_eq!(
            arbiter.poll(t0 + Duration::from_millis(400)),
            Some(ClickIntent::RotateBack)
        );
        assert_eq!(arbiter.poll(t0 + Duration::from_millis(500)), None);
    }

    #[test]
    fn press_on_a_stale_window_flushes_then_rearms() {
        let window = Duration::from_millis(350);
        let mut arbiter = ClickArbiter::with_window(window);
        let t0 = Instant::now();

        assert!(arbiter.press(t0).is_empty());
        // No poll happened; the next press lands after the window.
        let t1 = t0 + Duration::from_millis(600);
        assert_eq!(arbiter.press(t1), vec![ClickIntent::RotateBack]);
        // The second press armed a fresh window.
        assert_eq!(
            arbiter.press(t1 + Duration::from_millis(100)),
            vec![ClickIntent::Push]
        );
    }
}
