//! Window Manager Module
//!
//! The event-driven core: dispatch of server events, border interaction,
//! protocol messages and the lifecycle of managed clients. Everything runs on
//! one thread; one event is fully handled before the next is read.

pub mod buttons;
pub mod client;
pub mod client_flags;
pub mod clients;
pub mod decorations;
pub mod display;
pub mod events;
pub mod ewmh;
pub mod focus;
pub mod hints;
pub mod keyboard;
pub mod lifecycle;
pub mod manage;
pub mod moveresize;
pub mod netwm;
pub mod server;
pub mod session;
pub mod settings;
pub mod stacking;
pub mod state;
pub mod workspace;

#[cfg(test)]
pub mod testing;

use std::time::Instant;

use anyhow::Result;
use tracing::{debug, info};

use crate::config::KeyConfig;
use crate::shell::Shell;
use crate::wm::buttons::BorderClick;
use crate::wm::clients::ClientList;
use crate::wm::ewmh::Atoms;
use crate::wm::keyboard::KeyBindings;
use crate::wm::server::{Window, WindowServer};
use crate::wm::settings::Settings;
use crate::wm::workspace::Desktops;

pub use ewmh::ProtocolMessage;
pub use server::ServerEvent;

/// How the session should end once the event loop stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Exit,
    Restart,
}

pub struct WindowManager<S: WindowServer, H: Shell> {
    pub server: S,
    pub shell: H,
    pub settings: Settings,
    pub atoms: Atoms,
    pub root: Window,

    /// Managed clients
    pub clients: ClientList,

    pub desktops: Desktops,

    /// Click memory for the last border interaction, shared by all frames
    pub border_click: BorderClick,

    /// Last known pointer position (root coordinates)
    pub pointer: (i32, i32),

    /// Time of the last periodic signal
    pub last_signal: Option<Instant>,

    /// Focused client
    pub active: Option<Window>,

    pub keys: KeyBindings,

    /// Set by restart/exit requests
    pub shutdown: Option<Shutdown>,
}

impl<S: WindowServer, H: Shell> WindowManager<S, H> {
    /// Create a new window manager on top of `server`
    pub fn new(mut server: S, shell: H, settings: Settings, keys: &[KeyConfig]) -> Result<Self> {
        let root = server.root();
        let atoms = Atoms::new(|name| server.intern_atom(name))?;
        let keys = KeyBindings::from_config(keys, settings.desktop_count);
        let desktops = Desktops::new(settings.desktop_count);
        debug!("WM: {} key bindings, {} desktops", keys.len(), desktops.count);

        Ok(Self {
            server,
            shell,
            settings,
            atoms,
            root,
            clients: ClientList::new(),
            desktops,
            border_click: BorderClick::default(),
            pointer: (0, 0),
            last_signal: None,
            active: None,
            keys,
            shutdown: None,
        })
    }

    /// Publish root properties, grab keys and adopt existing windows
    pub fn startup(&mut self) -> Result<()> {
        self.write_root_state()?;
        self.grab_keys()?;
        self.manage_existing()?;
        self.restack()?;
        info!("Managing {} existing windows", self.clients.len());
        Ok(())
    }

    /// Run until a restart or exit is requested
    pub fn run(&mut self) -> Result<Shutdown> {
        loop {
            if let Some(event) = self.wait_for_event()? {
                self.process_event(event)?;
            }
            if let Some(shutdown) = self.shutdown {
                info!("Leaving event loop: {:?}", shutdown);
                return Ok(shutdown);
            }
        }
    }

    /// Request the end of the session
    pub fn request_shutdown(&mut self, shutdown: Shutdown) {
        debug!("Shutdown requested: {:?}", shutdown);
        self.shutdown = Some(shutdown);
    }

    pub fn set_pointer(&mut self, x: i32, y: i32) {
        self.pointer = (x, y);
    }
}
