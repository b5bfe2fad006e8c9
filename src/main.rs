mod app;
mod clock;
mod config;
mod display;
mod ipc;
mod ledger;
mod surface;
mod theme;
mod timer;
mod util;
mod views;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), iced_layershell::Error> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::load();

    // Advance/reset only ever arrive through this socket.
    match ipc::bind_control_socket() {
        Ok(path) => tracing::info!("listening on {path:?}"),
        Err(e) => {
            tracing::error!("cannot register control socket: {e}");
            std::process::exit(1);
        }
    }

    app::run(config)
}
