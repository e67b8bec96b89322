use std::{
    net::UdpSocket,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

use image::RgbImage;

use crate::{
    env,
    error::TelloError,
    link::DroneLink,
    utils,
    video::FrameReader,
};

#[derive(Debug, Clone)]
pub struct TelloConfig {
    pub remote_addr: String,
    pub local_cmd_addr: String,
    pub video_addr: String,
    pub response_timeout: Duration,
    pub takeoff_timeout: Duration,
}

impl TelloConfig {
    pub fn from_env() -> Self {
        let tello_addr = env::ENV_TELLO_ADDR.clone();
        let cmd_port = *env::ENV_TELLO_CMD_PORT;
        Self {
            remote_addr: format!("{tello_addr}:{cmd_port}"),
            local_cmd_addr: format!("0.0.0.0:{}", *env::ENV_TELLO_LOCAL_CMD_PORT),
            video_addr: format!("0.0.0.0:{}", *env::ENV_TELLO_VIDEO_PORT),
            response_timeout: Duration::from_millis(*env::ENV_TELLO_RESPONSE_TIMEOUT_MS),
            takeoff_timeout: Duration::from_millis(*env::ENV_TELLO_TAKEOFF_TIMEOUT_MS),
        }
    }
}

impl Default for TelloConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Tello SDK 2.0 text-protocol link.
#[derive(Debug)]
pub struct Tello {
    config: TelloConfig,
    ctrl_conn: UdpSocket,
    cmd_lock: Mutex<()>,
    connected: AtomicBool,
    flying: AtomicBool,
    streaming: AtomicBool,
    stopped: Arc<AtomicBool>,
    video: Mutex<Option<FrameReader>>,
}

impl Tello {
    pub fn new() -> Result<Self, TelloError> {
        Self::with_config(TelloConfig::from_env())
    }

    pub fn with_config(config: TelloConfig) -> Result<Self, TelloError> {
        let ctrl_conn = utils::udp_sock(&config.local_cmd_addr)?;
        let stopped = Arc::new(AtomicBool::new(false));

        tracing::info!(remote = %config.remote_addr, "tello link created");
        Ok(Self {
            config,
            ctrl_conn,
            cmd_lock: Mutex::new(()),
            connected: AtomicBool::new(false),
            flying: AtomicBool::new(false),
            streaming: AtomicBool::new(false),
            stopped,
            video: Mutex::new(None),
        })
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn check_running(&self) -> Result<(), TelloError> {
        if self.stopped.load(Ordering::Relaxed) {
            return Err(TelloError::Stopped);
        }
        Ok(())
    }

    fn check_connected(&self) -> Result<(), TelloError> {
        self.check_running()?;
        if !self.is_connected() {
            return Err(TelloError::NotConnected);
        }
        Ok(())
    }

    /// Sends `command` and waits for the drone's answer. Only one exchange is in
    /// flight at a time, so answers can't be handed to the wrong caller.
    fn exchange(&self, command: &str, timeout: Duration) -> Result<(), TelloError> {
        let method_name = "exchange";
        let _g = self.cmd_lock.lock().unwrap_or_else(|e| e.into_inner());

        self.drain_stale_responses()?;
        tracing::debug!(method_name, command, "send");
        self.ctrl_conn
            .send_to(command.as_bytes(), &self.config.remote_addr)?;

        let deadline = Instant::now() + timeout;
        let mut buff: [u8; 1024] = [0; 1024];
        let response = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TelloError::Timeout(command.to_owned()));
            }
            self.ctrl_conn.set_read_timeout(Some(remaining))?;
            match self.ctrl_conn.recv(&mut buff) {
                Ok(n) => break String::from_utf8_lossy(&buff[..n]).trim().to_owned(),
                Err(e) if utils::is_timeout(&e) => continue,
                Err(e) => return Err(e.into()),
            }
        };

        tracing::debug!(method_name, command, response = %response, "recv");
        if response.eq_ignore_ascii_case("ok") {
            Ok(())
        } else {
            Err(TelloError::Command {
                command: command.to_owned(),
                response,
            })
        }
    }

    fn drain_stale_responses(&self) -> Result<(), TelloError> {
        let mut buff: [u8; 1024] = [0; 1024];
        self.ctrl_conn.set_nonblocking(true)?;
        while let Ok(n) = self.ctrl_conn.recv(&mut buff) {
            tracing::debug!(
                stale = %String::from_utf8_lossy(&buff[..n]).trim(),
                "discarding late response"
            );
        }
        self.ctrl_conn.set_nonblocking(false)?;
        Ok(())
    }

    fn do_land(&self) -> Result<(), TelloError> {
        self.exchange("land", self.config.response_timeout)?;
        self.flying.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn do_streamoff(&self) -> Result<(), TelloError> {
        self.exchange("streamoff", self.config.response_timeout)?;
        self.streaming.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn join_receivers(&self) {
        if let Some(reader) = self
            .video
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_mut()
        {
            reader.join();
        }
    }
}

impl DroneLink for Tello {
    fn connect(&self) -> Result<(), TelloError> {
        self.check_running()?;
        self.exchange("command", self.config.response_timeout)?;
        self.connected.store(true, Ordering::Relaxed);
        tracing::info!(remote = %self.config.remote_addr, "connected to tello");
        Ok(())
    }

    fn streamon(&self) -> Result<(), TelloError> {
        self.check_connected()?;
        self.exchange("streamon", self.config.response_timeout)?;
        self.streaming.store(true, Ordering::Relaxed);

        let mut video = self.video.lock().unwrap_or_else(|e| e.into_inner());
        if video.is_none() {
            let conn = utils::udp_sock(&self.config.video_addr)?;
            *video = Some(FrameReader::start(conn, self.stopped.clone()));
            tracing::info!(addr = %self.config.video_addr, "video receiver started");
        }
        Ok(())
    }

    fn streamoff(&self) -> Result<(), TelloError> {
        self.check_connected()?;
        self.do_streamoff()
    }

    fn latest_frame(&self) -> Result<Arc<RgbImage>, TelloError> {
        let video = self.video.lock().unwrap_or_else(|e| e.into_inner());
        video.as_ref().ok_or(TelloError::NoFrame)?.frame()
    }

    fn is_flying(&self) -> bool {
        self.flying.load(Ordering::Relaxed)
    }

    fn takeoff(&self) -> Result<(), TelloError> {
        self.check_connected()?;
        self.exchange("takeoff", self.config.takeoff_timeout)?;
        self.flying.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn land(&self) -> Result<(), TelloError> {
        self.check_connected()?;
        self.do_land()
    }

    fn send_rc_control(&self, lr: i32, fb: i32, ud: i32, yaw: i32) -> Result<(), TelloError> {
        self.check_connected()?;
        let cmd = format!(
            "rc {} {} {} {}",
            utils::clamp100(lr),
            utils::clamp100(fb),
            utils::clamp100(ud),
            utils::clamp100(yaw)
        );
        tracing::trace!(cmd = %cmd, "send");
        self.ctrl_conn
            .send_to(cmd.as_bytes(), &self.config.remote_addr)?;
        Ok(())
    }

    fn end(&self) -> Result<(), TelloError> {
        let method_name = "end";
        if self.stopped.swap(true, Ordering::Relaxed) {
            return Ok(());
        }
        tracing::info!(method_name, "stopping tello link");

        let mut result = Ok(());
        if self.is_connected() && self.is_flying() {
            if let Err(e) = self.do_land() {
                tracing::warn!(method_name, "land on exit failed: {}", e);
                result = Err(e);
            }
        }
        if self.is_connected() && self.streaming.load(Ordering::Relaxed) {
            if let Err(e) = self.do_streamoff() {
                tracing::warn!(method_name, "streamoff on exit failed: {}", e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        self.connected.store(false, Ordering::Relaxed);
        self.join_receivers();
        result
    }
}

impl Drop for Tello {
    fn drop(&mut self) {
        self.stopped.store(true, Ordering::Relaxed);
    }
}
