use std::sync::Arc;

use crate::{link::DroneLink, scheduler::StopHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    ShuttingDown,
}

/// Running until the first shutdown request, then terminal.
pub struct Lifecycle {
    phase: Phase,
    link: Arc<dyn DroneLink>,
    stop: StopHandle,
}

impl Lifecycle {
    pub fn new(link: Arc<dyn DroneLink>, stop: StopHandle) -> Self {
        Self {
            phase: Phase::Running,
            link,
            stop,
        }
    }

    #[cfg(test)]
    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    /// Ends the drone link and stops the tick chains. Only the first call does
    /// anything; returns whether this call did the work.
    pub fn shutdown(&mut self, reason: &str) -> bool {
        if self.phase == Phase::ShuttingDown {
            return false;
        }
        self.phase = Phase::ShuttingDown;
        tracing::info!(reason, "cleaning up");

        if let Err(e) = self.link.end() {
            tracing::error!("cleanup failed: {}", e);
        }
        self.stop.stop();
        true
    }
}
