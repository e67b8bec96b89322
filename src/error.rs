use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelloError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no response to '{0}' in time")]
    Timeout(String),

    #[error("command '{command}' failed: {response}")]
    Command { command: String, response: String },

    #[error("drone is not connected")]
    NotConnected,

    #[error("link has been stopped")]
    Stopped,

    #[error("no video frame decoded yet")]
    NoFrame,

    #[error("h264 decode error: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("can't initialize gamepad input: {0}")]
    Init(String),

    #[error("no gamepad connected")]
    NoGamepad,
}

/// Anything that can go wrong inside one controller tick.
#[derive(Debug, Error)]
pub enum TickError {
    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error(transparent)]
    Link(#[from] TelloError),
}
