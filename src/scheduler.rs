//! Cooperative timer for the GUI thread.
//!
//! Each [`TickChain`] returns the delay until it wants to run again. The
//! scheduler never runs a chain twice in one pass, so a chain that asks for a
//! zero delay can't starve the event loop.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

pub trait TickChain<C: ?Sized> {
    fn name(&self) -> &'static str;

    /// Runs one tick and returns the delay before the next one. Errors must be
    /// handled inside; a tick always re-arms.
    fn tick(&mut self, ctx: &mut C) -> Duration;
}

#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

struct Entry<C: ?Sized> {
    chain: Box<dyn TickChain<C>>,
    due: Instant,
    runs: u64,
}

pub struct Scheduler<C: ?Sized> {
    entries: Vec<Entry<C>>,
    stop: StopHandle,
}

impl<C: ?Sized> Default for Scheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ?Sized> Scheduler<C> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            stop: StopHandle::default(),
        }
    }

    /// Adds a chain whose first tick is due at `first_due`.
    pub fn start(&mut self, chain: Box<dyn TickChain<C>>, first_due: Instant) {
        tracing::debug!(chain = chain.name(), "tick chain started");
        self.entries.push(Entry {
            chain,
            due: first_due,
            runs: 0,
        });
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Number of ticks the named chain has run so far.
    #[cfg(test)]
    pub(crate) fn runs(&self, name: &str) -> u64 {
        self.entries
            .iter()
            .filter(|e| e.chain.name() == name)
            .map(|e| e.runs)
            .sum()
    }

    /// Runs every chain due at `now` once and returns the earliest next deadline.
    /// Returns `None` once stopped.
    pub fn run_due(&mut self, now: Instant, ctx: &mut C) -> Option<Instant> {
        if self.is_stopped() {
            return None;
        }
        for entry in self.entries.iter_mut() {
            if entry.due > now {
                continue;
            }
            let delay = entry.chain.tick(ctx);
            entry.runs += 1;
            entry.due = now + delay;
            if self.stop.is_stopped() {
                tracing::debug!(chain = entry.chain.name(), "stopped during tick");
                return None;
            }
        }
        self.next_due()
    }

    pub fn next_due(&self) -> Option<Instant> {
        if self.is_stopped() {
            return None;
        }
        self.entries.iter().map(|e| e.due).min()
    }
}

#[cfg(test)]
mod test {
    use std::time::{Duration, Instant};

    use super::{Scheduler, StopHandle, TickChain};

    struct Every {
        name: &'static str,
        period: Duration,
        fail_on: Option<u32>,
        calls: u32,
        stop: Option<StopHandle>,
    }

    impl TickChain<Vec<&'static str>> for Every {
        fn name(&self) -> &'static str {
            self.name
        }

        fn tick(&mut self, log: &mut Vec<&'static str>) -> Duration {
            self.calls += 1;
            let r: Result<(), &str> = if Some(self.calls) == self.fail_on {
                Err("boom")
            } else {
                Ok(())
            };
            match r {
                Ok(()) => log.push(self.name),
                Err(e) => tracing::warn!("{}", e),
            }
            if let Some(stop) = &self.stop {
                stop.stop();
            }
            self.period
        }
    }

    fn every(name: &'static str, ms: u64) -> Box<Every> {
        Box::new(Every {
            name,
            period: Duration::from_millis(ms),
            fail_on: None,
            calls: 0,
            stop: None,
        })
    }

    #[test]
    fn test_chains_rearm_on_their_own_period() {
        let t0 = Instant::now();
        let mut s: Scheduler<Vec<&'static str>> = Scheduler::new();
        s.start(every("ctrl", 50), t0);
        s.start(every("video", 5), t0);
        let mut log = Vec::new();

        let next = s.run_due(t0, &mut log).unwrap();
        assert_eq!(log, vec!["ctrl", "video"]);
        assert_eq!(next, t0 + Duration::from_millis(5));

        for ms in (5..=50).step_by(5) {
            s.run_due(t0 + Duration::from_millis(ms), &mut log);
        }
        assert_eq!(s.runs("video"), 11);
        assert_eq!(s.runs("ctrl"), 2);
    }

    #[test]
    fn test_failed_tick_still_rearms() {
        let t0 = Instant::now();
        let mut s: Scheduler<Vec<&'static str>> = Scheduler::new();
        let mut chain = every("ctrl", 50);
        chain.fail_on = Some(1);
        s.start(chain, t0);
        let mut log = Vec::new();

        let next = s.run_due(t0, &mut log).unwrap();
        assert!(log.is_empty());
        s.run_due(next, &mut log);
        assert_eq!(log, vec!["ctrl"]);
        assert_eq!(s.runs("ctrl"), 2);
    }

    #[test]
    fn test_nothing_runs_before_due() {
        let t0 = Instant::now();
        let mut s: Scheduler<Vec<&'static str>> = Scheduler::new();
        s.start(every("ctrl", 50), t0 + Duration::from_millis(10));
        let mut log = Vec::new();
        assert_eq!(s.run_due(t0, &mut log), Some(t0 + Duration::from_millis(10)));
        assert!(log.is_empty());
    }

    #[test]
    fn test_stop_handle_halts_everything() {
        let t0 = Instant::now();
        let mut s: Scheduler<Vec<&'static str>> = Scheduler::new();
        let mut chain = every("ctrl", 50);
        chain.stop = Some(s.stop_handle());
        s.start(chain, t0);
        s.start(every("video", 5), t0);
        let mut log = Vec::new();

        assert!(s.run_due(t0, &mut log).is_none());
        assert_eq!(log, vec!["ctrl"]);
        assert!(s.run_due(t0 + Duration::from_secs(1), &mut log).is_none());
        assert_eq!(s.runs("video"), 0);
    }
}
