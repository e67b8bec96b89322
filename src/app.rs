use std::{sync::Arc, time::Instant};

use anyhow::Context as _;

use crate::{
    controller::{ControllerReader, GamepadReader},
    display::{TextureSurface, VideoTick, TARGET_HEIGHT, TARGET_WIDTH},
    lifecycle::Lifecycle,
    link::DroneLink,
    pilot::ControllerTick,
    scheduler::Scheduler,
    tello::Tello,
};

pub const WINDOW_TITLE: &str = "Tello Drone Control GUI with Xbox Game Controller";

type DynError = Box<dyn std::error::Error + Send + Sync>;

pub struct PilotApp {
    scheduler: Scheduler<TextureSurface>,
    surface: TextureSurface,
    lifecycle: Lifecycle,
}

impl PilotApp {
    pub fn new<R: ControllerReader + 'static>(
        ctx: egui::Context,
        reader: R,
        link: Arc<dyn DroneLink>,
    ) -> std::io::Result<Self> {
        let mut scheduler = Scheduler::new();
        let now = Instant::now();
        scheduler.start(Box::new(VideoTick::new(link.clone())), now);
        scheduler.start(Box::new(ControllerTick::new(reader, link.clone())?), now);
        let lifecycle = Lifecycle::new(link, scheduler.stop_handle());

        Ok(Self {
            scheduler,
            surface: TextureSurface::new(ctx),
            lifecycle,
        })
    }

    /// Runs cleanup once the window asks to close.
    fn handle_close(&mut self, close_requested: bool) {
        if close_requested {
            self.lifecycle.shutdown("window closed");
        }
    }
}

impl eframe::App for PilotApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_close(ctx.input(|i| i.viewport().close_requested()));

        let next = self.scheduler.run_due(Instant::now(), &mut self.surface);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(15.0);
                if let Some(texture) = self.surface.texture() {
                    ui.add(egui::Image::new((
                        texture.id(),
                        egui::vec2(TARGET_WIDTH as f32, TARGET_HEIGHT as f32),
                    )));
                }
            });
        });

        if let Some(due) = next {
            ctx.request_repaint_after(due.saturating_duration_since(Instant::now()));
        }
    }
}

impl Drop for PilotApp {
    fn drop(&mut self) {
        self.lifecycle.shutdown("application exit");
    }
}

fn create_app<R: ControllerReader + 'static>(
    cc: &eframe::CreationContext<'_>,
    reader: R,
) -> Result<Box<dyn eframe::App>, DynError> {
    let tello = Tello::new()?;
    tello.connect()?;
    tello.streamon()?;
    let link: Arc<dyn DroneLink> = Arc::new(tello);
    Ok(Box::new(PilotApp::new(cc.egui_ctx.clone(), reader, link)?))
}

/// Opens the controller, the window and the drone link in that order, then
/// runs the GUI loop until the window closes.
pub fn run() -> anyhow::Result<()> {
    let reader = GamepadReader::new().context("can't open game controller")?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size([800.0, 600.0])
            .with_min_inner_size([800.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        WINDOW_TITLE,
        options,
        Box::new(move |cc| create_app(cc, reader)),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}
