//! Gamepad to RC command translation and the takeoff/land toggle.

use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, SyncSender, TrySendError},
        Arc,
    },
    thread,
    time::Duration,
};

use crate::{
    controller::{ControllerReader, ControllerReading, LEFT_X, LEFT_Y, RIGHT_X, RIGHT_Y},
    error::{TelloError, TickError},
    link::DroneLink,
    scheduler::TickChain,
};

pub const CONTROL_PERIOD: Duration = Duration::from_millis(50);
pub const DEBOUNCE: Duration = Duration::from_millis(150);

/// Velocities for one RC update: lateral, forward/back, vertical, yaw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RcCommand {
    pub lr: i32,
    pub fb: i32,
    pub ud: i32,
    pub yaw: i32,
}

impl RcCommand {
    pub const HOVER: RcCommand = RcCommand {
        lr: 0,
        fb: 0,
        ud: 0,
        yaw: 0,
    };

    /// Right stick flies, left stick climbs and turns. Values pass through unscaled.
    pub fn from_reading(r: &ControllerReading) -> Self {
        Self {
            lr: r.get(RIGHT_X),
            fb: r.get(RIGHT_Y),
            ud: r.get(LEFT_Y),
            yaw: r.get(LEFT_X),
        }
    }

    pub fn is_hover(&self) -> bool {
        *self == Self::HOVER
    }

    /// Always goes out on the wire, so a zero command is an explicit hover rather than silence.
    pub fn send(self, link: &dyn DroneLink) -> Result<(), TelloError> {
        if self.is_hover() {
            tracing::trace!("hover");
        }
        link.send_rc_control(self.lr, self.fb, self.ud, self.yaw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightRequest {
    Takeoff,
    Land,
}

#[derive(Debug)]
pub struct FlightOutcome {
    pub request: FlightRequest,
    pub result: Result<(), TelloError>,
}

/// Runs the blocking takeoff/land calls off the GUI thread and reports back.
/// At most one request is in flight; presses while busy are dropped.
#[derive(Debug)]
pub struct FlightToggle {
    tx: SyncSender<FlightRequest>,
    outcomes: Receiver<FlightOutcome>,
    busy: Arc<AtomicBool>,
}

impl FlightToggle {
    pub fn spawn(link: Arc<dyn DroneLink>) -> io::Result<Self> {
        let (tx, rx) = mpsc::sync_channel::<FlightRequest>(1);
        let (outcome_tx, outcomes) = mpsc::channel();
        let busy = Arc::new(AtomicBool::new(false));
        let worker_busy = busy.clone();

        thread::Builder::new()
            .name("flight-toggle".to_owned())
            .spawn(move || {
                for request in rx {
                    tracing::info!(?request, "flight request started");
                    let result = match request {
                        FlightRequest::Takeoff => link.takeoff(),
                        FlightRequest::Land => link.land(),
                    };
                    worker_busy.store(false, Ordering::SeqCst);
                    if outcome_tx.send(FlightOutcome { request, result }).is_err() {
                        break;
                    }
                }
                tracing::debug!("flight toggle worker finished");
            })?;

        Ok(Self { tx, outcomes, busy })
    }

    /// Lands when airborne, takes off otherwise. Returns the request that was
    /// dispatched, or `None` when the worker is still busy.
    pub fn toggle(&self, link: &dyn DroneLink) -> Option<FlightRequest> {
        let request = if link.is_flying() {
            FlightRequest::Land
        } else {
            FlightRequest::Takeoff
        };
        if self.busy.swap(true, Ordering::SeqCst) {
            tracing::warn!(?request, "flight request still in progress, press ignored");
            return None;
        }
        match self.tx.try_send(request) {
            Ok(()) => Some(request),
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.busy.store(false, Ordering::SeqCst);
                tracing::error!(?request, "flight toggle worker unavailable");
                None
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn try_outcome(&self) -> Option<FlightOutcome> {
        self.outcomes.try_recv().ok()
    }

    #[cfg(test)]
    pub(crate) fn recv_outcome_timeout(&self, timeout: Duration) -> Option<FlightOutcome> {
        self.outcomes.recv_timeout(timeout).ok()
    }
}

/// The 50 ms controller poll. Reads the pad, maps it, sends one RC update.
pub struct ControllerTick<R> {
    reader: R,
    link: Arc<dyn DroneLink>,
    toggle: FlightToggle,
    held: Option<RcCommand>,
}

impl<R: ControllerReader> ControllerTick<R> {
    pub fn new(reader: R, link: Arc<dyn DroneLink>) -> io::Result<Self> {
        let toggle = FlightToggle::spawn(link.clone())?;
        Ok(Self {
            reader,
            link,
            toggle,
            held: None,
        })
    }

    pub fn run_once(&mut self) -> Duration {
        self.log_outcomes();

        // Second half of a debounced tick: the pad isn't read again.
        if let Some(cmd) = self.held.take() {
            if let Err(e) = cmd.send(self.link.as_ref()) {
                tracing::warn!("controller tick failed: {}", e);
            }
            return CONTROL_PERIOD;
        }

        match self.step() {
            Ok(next) => next,
            Err(e) => {
                tracing::warn!("controller tick failed: {}", e);
                CONTROL_PERIOD
            }
        }
    }

    fn step(&mut self) -> Result<Duration, TickError> {
        let reading = self.reader.read()?;
        let cmd = RcCommand::from_reading(&reading);

        if reading.start() {
            if let Some(request) = self.toggle.toggle(self.link.as_ref()) {
                tracing::info!(?request, "start pressed");
            }
            // No RC output until the hold elapses; the drone keeps its last command.
            tracing::debug!(?cmd, "holding rc output for debounce");
            self.held = Some(cmd);
            return Ok(DEBOUNCE);
        }

        tracing::trace!(?cmd, "rc update");
        cmd.send(self.link.as_ref())?;
        Ok(CONTROL_PERIOD)
    }

    fn log_outcomes(&self) {
        while let Some(outcome) = self.toggle.try_outcome() {
            match outcome.result {
                Ok(()) => tracing::info!(request = ?outcome.request, "flight request done"),
                Err(e) => {
                    tracing::error!(request = ?outcome.request, "flight request failed: {}", e)
                }
            }
        }
    }
}

impl<R: ControllerReader, C: ?Sized> TickChain<C> for ControllerTick<R> {
    fn name(&self) -> &'static str {
        "controller"
    }

    fn tick(&mut self, _ctx: &mut C) -> Duration {
        self.run_once()
    }
}
