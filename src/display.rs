use std::{sync::Arc, time::Duration};

use egui::{ColorImage, TextureHandle, TextureOptions};
use image::{imageops, DynamicImage, RgbImage};

use crate::{
    error::TelloError,
    link::DroneLink,
    scheduler::TickChain,
};

pub const RENDER_PERIOD: Duration = Duration::from_millis(5);
pub const TARGET_WIDTH: u32 = 720;
pub const TARGET_HEIGHT: u32 = 480;

/// Where rendered frames end up. The window owns exactly one.
pub trait DisplaySurface {
    fn show(&mut self, image: ColorImage);
}

/// Resizes a decoded frame to the display size and converts RGB to RGBA.
pub fn to_display(frame: &RgbImage) -> ColorImage {
    let resized = imageops::resize(
        frame,
        TARGET_WIDTH,
        TARGET_HEIGHT,
        imageops::FilterType::Triangle,
    );
    let rgba = DynamicImage::ImageRgb8(resized).into_rgba8();
    let (w, h) = rgba.dimensions();
    ColorImage::from_rgba_unmultiplied([w as usize, h as usize], rgba.as_raw())
}

/// The 5 ms render poll.
pub struct VideoTick {
    link: Arc<dyn DroneLink>,
}

impl VideoTick {
    pub fn new(link: Arc<dyn DroneLink>) -> Self {
        Self { link }
    }

    pub fn render(&self, surface: &mut (impl DisplaySurface + ?Sized)) -> Result<(), TelloError> {
        let frame = self.link.latest_frame()?;
        surface.show(to_display(&frame));
        Ok(())
    }
}

impl<C: DisplaySurface + ?Sized> TickChain<C> for VideoTick {
    fn name(&self) -> &'static str {
        "video"
    }

    fn tick(&mut self, surface: &mut C) -> Duration {
        match self.render(surface) {
            Ok(()) => {}
            Err(TelloError::NoFrame) => tracing::debug!("no video frame yet"),
            Err(e) => tracing::warn!("video tick failed: {}", e),
        }
        RENDER_PERIOD
    }
}

/// Display surface backed by a single egui texture.
pub struct TextureSurface {
    ctx: egui::Context,
    texture: Option<TextureHandle>,
}

impl TextureSurface {
    pub fn new(ctx: egui::Context) -> Self {
        Self { ctx, texture: None }
    }

    pub fn texture(&self) -> Option<&TextureHandle> {
        self.texture.as_ref()
    }
}

impl DisplaySurface for TextureSurface {
    fn show(&mut self, image: ColorImage) {
        match self.texture.as_mut() {
            Some(texture) => texture.set(image, TextureOptions::LINEAR),
            None => {
                let texture = self.ctx.load_texture("tello_video", image, TextureOptions::LINEAR);
                self.texture = Some(texture);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::{atomic::Ordering, Arc};

    use egui::{Color32, ColorImage};
    use image::{Rgb, RgbImage};

    use super::{
        to_display, DisplaySurface, VideoTick, RENDER_PERIOD, TARGET_HEIGHT, TARGET_WIDTH,
    };
    use crate::{link::DroneLink, scheduler::TickChain, testing::MockLink};

    impl DisplaySurface for Vec<ColorImage> {
        fn show(&mut self, image: ColorImage) {
            self.push(image);
        }
    }

    #[test]
    fn test_to_display_resizes_and_converts() {
        let frame = RgbImage::from_pixel(96, 72, Rgb([200, 10, 30]));
        let img = to_display(&frame);
        assert_eq!(img.size, [TARGET_WIDTH as usize, TARGET_HEIGHT as usize]);
        assert_eq!(img.pixels[0], Color32::from_rgb(200, 10, 30));
        assert_eq!(img.pixels[img.pixels.len() - 1], Color32::from_rgb(200, 10, 30));
    }

    #[test]
    fn test_tick_shows_latest_frame() {
        let link = MockLink::new();
        let green = RgbImage::from_pixel(64, 48, Rgb([0, 255, 0]));
        *link.frame.lock().unwrap() = Some(Arc::new(green));
        let dyn_link: Arc<dyn DroneLink> = link.clone();
        let mut tick = VideoTick::new(dyn_link);
        let mut shown: Vec<ColorImage> = Vec::new();

        assert_eq!(tick.tick(&mut shown), RENDER_PERIOD);
        // No newer frame: the same one is shown again.
        assert_eq!(tick.tick(&mut shown), RENDER_PERIOD);
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[1].pixels[0], Color32::from_rgb(0, 255, 0));
    }

    #[test]
    fn test_missing_frame_keeps_render_chain_alive() {
        let link = MockLink::new();
        let dyn_link: Arc<dyn DroneLink> = link.clone();
        let mut tick = VideoTick::new(dyn_link);
        let mut shown: Vec<ColorImage> = Vec::new();

        assert_eq!(tick.tick(&mut shown), RENDER_PERIOD);
        assert!(shown.is_empty());

        *link.frame.lock().unwrap() = Some(Arc::new(RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]))));
        assert_eq!(tick.tick(&mut shown), RENDER_PERIOD);
        assert_eq!(shown.len(), 1);
    }

    #[test]
    fn test_decode_failure_shows_nothing_and_rearms() {
        let link = MockLink::new();
        *link.frame.lock().unwrap() = Some(Arc::new(RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]))));
        link.fail_frame.store(true, Ordering::SeqCst);
        let dyn_link: Arc<dyn DroneLink> = link.clone();
        let mut tick = VideoTick::new(dyn_link);
        let mut shown: Vec<ColorImage> = Vec::new();

        assert_eq!(tick.tick(&mut shown), RENDER_PERIOD);
        assert_eq!(tick.tick(&mut shown), RENDER_PERIOD);
        assert!(shown.is_empty());

        link.fail_frame.store(false, Ordering::SeqCst);
        assert_eq!(tick.tick(&mut shown), RENDER_PERIOD);
        assert_eq!(shown.len(), 1);
    }
}
