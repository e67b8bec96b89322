use std::sync::{Arc, RwLock};

pub mod app;
pub mod controller;
pub mod display;
pub(crate) mod env;
pub mod error;
pub mod lifecycle;
pub mod link;
pub mod pilot;
pub mod scheduler;
pub mod tello;
pub(crate) mod utils;
pub mod video;

#[cfg(test)]
pub(crate) mod testing;

#[macro_use]
extern crate lazy_static;

pub use link::DroneLink;
pub use tello::Tello;

/// Latest decoded frame, shared between the frame reader and whoever renders it.
pub type SharedFrame = Arc<RwLock<Option<Arc<image::RgbImage>>>>;
