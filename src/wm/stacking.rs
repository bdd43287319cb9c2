//! Stacking Module
//!
//! Z-order of managed frames. Clients are kept in a most-recently-raised
//! list; the order pushed to the server groups them by layer, highest first,
//! keeping that list's order within a layer.

use std::cmp::Reverse;

use anyhow::Result;
use tracing::debug;

use crate::shell::Shell;
use crate::wm::ewmh::XA_WINDOW;
use crate::wm::server::{Window, WindowServer};
use crate::wm::WindowManager;

impl<S: WindowServer, H: Shell> WindowManager<S, H> {
    /// Raise a client to the top of its layer
    pub fn raise_client(&mut self, window: Window) -> Result<()> {
        if !self.clients.contains(window) {
            return Ok(());
        }
        debug!("Raising window 0x{:x}", window);
        self.clients.raise(window);
        self.restack()
    }

    /// Content windows in effective stacking order, topmost first
    pub fn stacking_order(&self) -> Vec<Window> {
        let mut order = self.clients.stacking().to_vec();
        order.sort_by_key(|w| Reverse(self.clients.get(*w).map_or(0, |c| c.layer)));
        order
    }

    /// Push the stacking order to the server and publish it
    pub fn restack(&mut self) -> Result<()> {
        let order = self.stacking_order();
        let frames: Vec<Window> = order
            .iter()
            .filter_map(|w| self.clients.get(*w))
            .map(|c| c.parent)
            .collect();
        if !frames.is_empty() {
            self.server.restack(&frames)?;
        }

        // EWMH wants bottom to top
        let bottom_up: Vec<u32> = order.into_iter().rev().collect();
        self.server
            .set_property32(self.root, self.atoms.net_client_list_stacking, XA_WINDOW, &bottom_up)
    }
}
