use std::sync::Arc;

use image::RgbImage;

use crate::error::TelloError;

/// Everything the pilot needs from a drone. Implementations handle their own
/// synchronization, since the flight-toggle worker and the GUI thread both hold
/// the same link.
pub trait DroneLink: Send + Sync {
    fn connect(&self) -> Result<(), TelloError>;
    fn streamon(&self) -> Result<(), TelloError>;
    fn streamoff(&self) -> Result<(), TelloError>;
    /// Newest decoded frame. Returns the same frame again until a newer one is decoded.
    fn latest_frame(&self) -> Result<Arc<RgbImage>, TelloError>;
    fn is_flying(&self) -> bool;
    /// Blocks until the drone confirms.
    fn takeoff(&self) -> Result<(), TelloError>;
    /// Blocks until the drone confirms.
    fn land(&self) -> Result<(), TelloError>;
    fn send_rc_control(&self, lr: i32, fb: i32, ud: i32, yaw: i32) -> Result<(), TelloError>;
    /// Lands if needed and shuts the link down. Later calls are no-ops.
    fn end(&self) -> Result<(), TelloError>;
}
