//! stile
//!
//! A small stacking X11 window manager: framed clients with title bars,
//! virtual desktops, keyboard bindings and the EWMH/GNOME protocols pagers
//! and taskbars rely on.

mod config;
mod shared;
mod shell;
mod wm;

use std::os::unix::process::CommandExt;
use std::process::Command;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::shell::Headless;
use crate::wm::display::X11Server;
use crate::wm::server::WindowServer;
use crate::wm::settings::Settings;
use crate::wm::{Shutdown, WindowManager};

fn run() -> Result<Shutdown> {
    let config = config::Config::load().context("Failed to load configuration")?;

    let server = X11Server::connect().context("Failed to become the window manager")?;
    let (width, height) = server.screen_size();
    let settings = Settings::from_config(&config, width, height);

    let mut wm = WindowManager::new(server, Headless, settings, &config.keys)
        .context("Failed to initialize window manager")?;
    wm.startup()?;
    let shutdown = wm.run()?;
    wm.release_all()?;
    wm.server.sync()?;
    Ok(shutdown)
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "stile=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting stile");

    match run() {
        Ok(Shutdown::Exit) => {
            info!("Exiting");
            Ok(())
        }
        Ok(Shutdown::Restart) => {
            info!("Restarting");
            let exe = std::env::current_exe().context("Failed to locate own executable")?;
            let err = Command::new(exe).args(std::env::args_os().skip(1)).exec();
            Err(err).context("Failed to re-execute")
        }
        Err(e) => {
            error!("Fatal: {:#}", e);
            Err(e)
        }
    }
}
