use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    setup_logging();
    info!("tello pilot starting");

    if let Err(e) = tello_pilot::app::run() {
        error!("application failed: {e:#}");
        return Err(e);
    }

    info!("tello pilot stopped");
    Ok(())
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let r = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_names(true)
                .with_target(true),
        )
        .with(filter)
        .try_init();
    if let Err(e) = r {
        eprintln!("can't initialize logging: {e}");
    }
}
