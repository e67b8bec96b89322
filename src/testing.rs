use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread,
    time::{Duration, Instant},
};

use image::RgbImage;

use crate::{
    controller::{ControllerReader, ControllerReading, SLOTS},
    error::{ControllerError, TelloError},
    link::DroneLink,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Call {
    Connect,
    StreamOn,
    StreamOff,
    Takeoff,
    Land,
    Rc(i32, i32, i32, i32),
    End,
}

/// Records every call. Takeoff and land flip the flight flag like a real drone.
#[derive(Debug, Default)]
pub(crate) struct MockLink {
    pub calls: Mutex<Vec<Call>>,
    pub flying: AtomicBool,
    pub stopped: AtomicBool,
    pub fail_rc: AtomicBool,
    pub fail_end: AtomicBool,
    pub fail_frame: AtomicBool,
    pub frame: Mutex<Option<Arc<RgbImage>>>,
}

impl MockLink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }

    pub fn wait_for(&self, call: Call, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.count(call) > 0 {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl DroneLink for MockLink {
    fn connect(&self) -> Result<(), TelloError> {
        self.record(Call::Connect);
        Ok(())
    }

    fn streamon(&self) -> Result<(), TelloError> {
        self.record(Call::StreamOn);
        Ok(())
    }

    fn streamoff(&self) -> Result<(), TelloError> {
        self.record(Call::StreamOff);
        Ok(())
    }

    fn latest_frame(&self) -> Result<Arc<RgbImage>, TelloError> {
        if self.fail_frame.load(Ordering::SeqCst) {
            return Err(TelloError::Decode("corrupt access unit".to_owned()));
        }
        self.frame.lock().unwrap().clone().ok_or(TelloError::NoFrame)
    }

    fn is_flying(&self) -> bool {
        self.flying.load(Ordering::SeqCst)
    }

    fn takeoff(&self) -> Result<(), TelloError> {
        self.record(Call::Takeoff);
        self.flying.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn land(&self) -> Result<(), TelloError> {
        self.record(Call::Land);
        self.flying.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn send_rc_control(&self, lr: i32, fb: i32, ud: i32, yaw: i32) -> Result<(), TelloError> {
        if self.fail_rc.load(Ordering::SeqCst) {
            return Err(TelloError::NotConnected);
        }
        self.record(Call::Rc(lr, fb, ud, yaw));
        Ok(())
    }

    fn end(&self) -> Result<(), TelloError> {
        self.record(Call::End);
        self.stopped.store(true, Ordering::SeqCst);
        if self.fail_end.load(Ordering::SeqCst) {
            return Err(TelloError::Timeout("land".to_owned()));
        }
        Ok(())
    }
}

/// Plays back a script of readings, then keeps returning the last one.
pub(crate) struct ScriptedReader {
    script: VecDeque<Result<ControllerReading, ControllerError>>,
    last: ControllerReading,
    pub reads: Arc<AtomicUsize>,
}

impl ScriptedReader {
    pub fn new(script: Vec<Result<ControllerReading, ControllerError>>) -> Self {
        Self {
            script: script.into(),
            last: ControllerReading::default(),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ControllerReader for ScriptedReader {
    fn read(&mut self) -> Result<ControllerReading, ControllerError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        match self.script.pop_front() {
            Some(Ok(r)) => {
                self.last = r;
                Ok(r)
            }
            Some(Err(e)) => Err(e),
            None => Ok(self.last),
        }
    }
}

pub(crate) fn reading(slots: &[(usize, i32)]) -> ControllerReading {
    let mut r = [0; SLOTS];
    for (i, v) in slots {
        r[*i] = *v;
    }
    ControllerReading(r)
}
