//! Periodic run-status polling while a program executes

use std::time::Instant;

use pocketcycler_core::ProgramSet;

use crate::dial::DialStateMachine;
use crate::error::{Result, SessionError};
use crate::protocol::{RunStatus, RUN_POLL_INTERVAL};
use crate::transport::Transport;
use crate::PocketPcr;

/// Tracks a running program and keeps its status snapshot fresh
///
/// Driven from the caller's poll loop. Every half second it issues one
/// `QueryRunningPCR`, skipping the tick entirely when another query holds
/// the link. A timed-out or short poll keeps the previous snapshot; the
/// `PCR Done` notification ends the watch.
#[derive(Default)]
pub struct RunMonitor {
    status: Option<RunStatus>,
    running_program: Option<String>,
    next_poll: Option<Instant>,
}

impl RunMonitor {
    /// Monitor with no program being watched
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a run is being watched
    pub fn is_running(&self) -> bool {
        self.next_poll.is_some()
    }

    /// Last successfully parsed status snapshot, possibly stale
    pub fn status(&self) -> Option<&RunStatus> {
        self.status.as_ref()
    }

    /// Name of the program being watched, when it is known
    pub fn running_program(&self) -> Option<&str> {
        self.running_program.as_deref()
    }

    /// A `pcrStart:` notification arrived: begin watching
    ///
    /// The dial mirror switches to its running state so local presses map
    /// to the cancel flow.
    pub fn on_pcr_start(
        &mut self,
        program_index: usize,
        programs: &ProgramSet,
        dial: &mut DialStateMachine,
    ) {
        let name = programs
            .program(program_index)
            .map(|p| p.name().to_owned())
            .unwrap_or_else(|| format!("program {}", program_index));
        log::info!("run started: {}", name);
        self.running_program = Some(name);
        self.status = None;
        self.next_poll = Some(Instant::now());
        dial.run_started();
    }

    /// A `PCR Done` notification arrived: stop watching
    pub fn on_pcr_done(&mut self, dial: &mut DialStateMachine) {
        if let Some(name) = self.running_program.take() {
            log::info!("run finished: {}", name);
        }
        self.status = None;
        self.next_poll = None;
        dial.run_finished();
    }

    /// Issue the next status poll when one is due and the link is free
    ///
    /// Returns the fresh snapshot when this tick produced one. A timeout
    /// is a soft miss: the schedule advances and the old snapshot stands.
    pub fn tick<T: Transport>(
        &mut self,
        now: Instant,
        device: &mut PocketPcr<T>,
    ) -> Result<Option<RunStatus>> {
        let due = match self.next_poll {
            Some(at) if now >= at => true,
            _ => false,
        };
        if !due || device.session().query_in_flight() {
            return Ok(None);
        }
        self.next_poll = Some(now + RUN_POLL_INTERVAL);

        match device.query_run_status() {
            Ok(Some(status)) => {
                self.status = Some(status);
                Ok(Some(status))
            }
            Ok(None) => Ok(None),
            Err(SessionError::Timeout) => {
                log::warn!("run status poll timed out; keeping last snapshot");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use pocketcycler_core::{Block, Cycle, Program};
    use std::time::Duration;

    fn three_programs() -> ProgramSet {
        let make = |name: &str| {
            Program::with_cycles(name, vec![Cycle::new(vec![Block::new(95.0, 30)], 1)])
        };
        ProgramSet::from_programs(vec![make("A"), make("B"), make("C")])
    }

    #[test]
    fn start_poll_done_lifecycle() {
        let programs = three_programs();
        let mut dial = DialStateMachine::new(programs.len());
        let mut monitor = RunMonitor::new();
        let mut device = PocketPcr::new(MockTransport::new());

        monitor.on_pcr_start(1, &programs, &mut dial);
        assert!(monitor.is_running());
        assert_eq!(monitor.running_program(), Some("B"));

        device
            .session_mut()
            .transport
            .push_chunk(b"pcrState:0,0,0,0,1,1,1,1,95.00,94.87,3\n");
        let status = monitor.tick(Instant::now(), &mut device).unwrap();
        assert_eq!(status.unwrap().block_temp, 94.87);
        assert_eq!(monitor.status().unwrap().elapsed_seconds, 3);

        monitor.on_pcr_done(&mut dial);
        assert!(!monitor.is_running());
        assert!(monitor.status().is_none());
    }

    #[test]
    fn polls_are_spaced_by_the_interval() {
        let programs = three_programs();
        let mut dial = DialStateMachine::new(programs.len());
        let mut monitor = RunMonitor::new();
        let mut device = PocketPcr::new(MockTransport::new());

        monitor.on_pcr_start(0, &programs, &mut dial);
        let t0 = Instant::now();

        device
            .session_mut()
            .transport
            .push_chunk(b"pcrState:0,0,0,0,1,1,1,1,95.00,94.87,3\n");
        assert!(monitor.tick(t0, &mut device).unwrap().is_some());

        // Immediately afterwards nothing is due; no command goes out.
        let wire_before = device.session().transport.written.len();
        assert!(monitor.tick(t0, &mut device).unwrap().is_none());
        assert_eq!(device.session().transport.written.len(), wire_before);

        // Half a second later the next poll fires.
        device
            .session_mut()
            .transport
            .push_chunk(b"pcrState:0,0,0,0,1,1,1,1,95.00,95.02,4\n");
        let later = t0 + RUN_POLL_INTERVAL + Duration::from_millis(1);
        let status = monitor.tick(later, &mut device).unwrap();
        assert_eq!(status.unwrap().elapsed_seconds, 4);
    }

    #[test]
    fn short_reply_keeps_the_previous_snapshot() {
        let programs = three_programs();
        let mut dial = DialStateMachine::new(programs.len());
        let mut monitor = RunMonitor::new();
        let mut device = PocketPcr::new(MockTransport::new());

        monitor.on_pcr_start(0, &programs, &mut dial);
        let t0 = Instant::now();

        device
            .session_mut()
            .transport
            .push_chunk(b"pcrState:0,0,0,0,1,1,1,1,95.00,94.87,3\n");
        monitor.tick(t0, &mut device).unwrap();

        device.session_mut().transport.push_chunk(b"pcrState:0,1\n");
        let later = t0 + RUN_POLL_INTERVAL + Duration::from_millis(1);
        assert!(monitor.tick(later, &mut device).unwrap().is_none());
        assert_eq!(monitor.status().unwrap().elapsed_seconds, 3);
    }

    #[test]
    fn idle_monitor_never_touches_the_wire() {
        let mut monitor = RunMonitor::new();
        let mut device = PocketPcr::new(MockTransport::new());
        assert!(monitor.tick(Instant::now(), &mut device).unwrap().is_none());
        assert!(device.session().transport.written.is_empty());
    }

    #[test]
    fn unknown_program_index_still_watches() {
        let programs = three_programs();
        let mut dial = DialStateMachine::new(programs.len());
        let mut monitor = RunMonitor::new();
        monitor.on_pcr_start(9, &programs, &mut dial);
        assert_eq!(monitor.running_program(), Some("program 9"));
        assert!(monitor.is_running());
    }
}
