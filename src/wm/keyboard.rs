//! Keyboard Module
//!
//! Key bindings from the configuration, passive key grabs on the root and
//! dispatch of bound key presses.

use std::str::FromStr;

use anyhow::Result;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::KeyConfig;
use crate::shell::Shell;
use crate::wm::client_flags::Status;
use crate::wm::server::*;
use crate::wm::{Shutdown, WindowManager};

/// Lock modifiers that must not prevent a binding from matching
const IGNORED_MODIFIERS: u16 = MOD_LOCK | MOD_2;

/// Action bound to a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    Exec(String),
    /// Go to desktop N (1-based), or the next one
    Desktop(Option<u32>),
    Next,
    NextStacked,
    Close,
    Shade,
    Move,
    Resize,
    Min,
    Max,
    Root,
    Window,
    Restart,
    Exit,
    Up,
    Down,
    Left,
    Right,
    Escape,
    Select,
}

impl KeyAction {
    /// Keys only read while the keyboard is grabbed by an interaction
    fn is_interactive(&self) -> bool {
        matches!(
            self,
            Self::Up | Self::Down | Self::Left | Self::Right | Self::Escape | Self::Select
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyParseError {
    #[error("unknown key action '{0}'")]
    UnknownAction(String),
    #[error("invalid desktop in '{0}'")]
    BadDesktop(String),
    #[error("unknown key '{0}'")]
    UnknownKey(String),
    #[error("unknown modifier '{0}'")]
    UnknownModifier(char),
}

impl FromStr for KeyAction {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(command) = s.strip_prefix("exec:") {
            return Ok(Self::Exec(command.to_string()));
        }
        if let Some(number) = s.strip_prefix("desktop#") {
            return match number.parse::<u32>() {
                Ok(n) if n > 0 => Ok(Self::Desktop(Some(n))),
                _ => Err(KeyParseError::BadDesktop(s.to_string())),
            };
        }
        let action = match s.to_ascii_lowercase().as_str() {
            "desktop" => Self::Desktop(None),
            "next" => Self::Next,
            "nextstacked" => Self::NextStacked,
            "close" => Self::Close,
            "shade" => Self::Shade,
            "move" => Self::Move,
            "resize" => Self::Resize,
            "min" => Self::Min,
            "max" => Self::Max,
            "root" => Self::Root,
            "window" => Self::Window,
            "restart" => Self::Restart,
            "exit" => Self::Exit,
            "up" => Self::Up,
            "down" => Self::Down,
            "left" => Self::Left,
            "right" => Self::Right,
            "escape" => Self::Escape,
            "select" => Self::Select,
            _ => return Err(KeyParseError::UnknownAction(s.to_string())),
        };
        Ok(action)
    }
}

/// Keysym for a key name. Single characters map to their Latin-1 keysym.
pub fn keysym_from_name(name: &str) -> Option<u32> {
    let named = match name {
        "BackSpace" => 0xff08,
        "Tab" => 0xff09,
        "Return" => 0xff0d,
        "Pause" => 0xff13,
        "Escape" => 0xff1b,
        "Home" => 0xff50,
        "Left" => 0xff51,
        "Up" => 0xff52,
        "Right" => 0xff53,
        "Down" => 0xff54,
        "Prior" => 0xff55,
        "Next" => 0xff56,
        "End" => 0xff57,
        "Print" => 0xff61,
        "Insert" => 0xff63,
        "Delete" => 0xffff,
        "space" => 0x20,
        _ => {
            if let Some(n) = name.strip_prefix('F').and_then(|n| n.parse::<u32>().ok()) {
                return (1..=35).contains(&n).then(|| 0xffbe + n - 1);
            }
            let mut chars = name.chars();
            return match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_graphic() => Some(c.to_ascii_lowercase() as u32),
                _ => None,
            };
        }
    };
    Some(named)
}

/// Modifier mask from its letters: A (alt), C (control), S (shift),
/// 1 and 4 (Mod1, Mod4)
pub fn parse_mask(mask: &str) -> Result<u16, KeyParseError> {
    mask.chars().try_fold(0u16, |acc, c| {
        let bit = match c {
            'A' | '1' => MOD_1,
            'C' => MOD_CONTROL,
            'S' => MOD_SHIFT,
            '4' => MOD_4,
            other => return Err(KeyParseError::UnknownModifier(other)),
        };
        Ok(acc | bit)
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    pub mask: u16,
    pub keysym: u32,
    pub action: KeyAction,
}

impl KeyBinding {
    pub fn parse(config: &KeyConfig) -> Result<Self, KeyParseError> {
        let mask = parse_mask(&config.mask)?;
        let keysym = keysym_from_name(&config.key).ok_or_else(|| KeyParseError::UnknownKey(config.key.clone()))?;
        let action = config.action.parse()?;
        Ok(Self { mask, keysym, action })
    }
}

#[derive(Debug, Clone, Default)]
pub struct KeyBindings {
    bindings: Vec<KeyBinding>,
}

impl KeyBindings {
    /// Build bindings, skipping (and logging) invalid entries. A `#` key
    /// with a `desktop#` action expands into one binding per desktop on
    /// the digit keys.
    pub fn from_config(keys: &[KeyConfig], desktop_count: u32) -> Self {
        let mut bindings = Vec::new();
        for key in keys {
            if key.key == "#" {
                for n in 1..=desktop_count.min(9) {
                    let expanded = KeyConfig {
                        mask: key.mask.clone(),
                        key: n.to_string(),
                        action: format!("{}{}", key.action, n),
                    };
                    match KeyBinding::parse(&expanded) {
                        Ok(binding) => bindings.push(binding),
                        Err(err) => warn!("Skipping key binding {:?}: {}", key, err),
                    }
                }
                continue;
            }
            match KeyBinding::parse(key) {
                Ok(binding) => bindings.push(binding),
                Err(err) => warn!("Skipping key binding {:?}: {}", key, err),
            }
        }
        Self { bindings }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn lookup(&self, keysym: u32, state: u16) -> Option<&KeyAction> {
        let state = state & !IGNORED_MODIFIERS & (MOD_SHIFT | MOD_CONTROL | MOD_1 | MOD_4);
        self.bindings
            .iter()
            .find(|b| b.keysym == keysym && b.mask == state)
            .map(|b| &b.action)
    }
}

impl<S: WindowServer, H: Shell> WindowManager<S, H> {
    /// Grab every bound key on the root, with and without the lock modifiers
    pub fn grab_keys(&mut self) -> Result<()> {
        let mut grabbed = 0;
        for binding in self.keys.bindings.iter().filter(|b| !b.action.is_interactive()) {
            for keycode in self.server.keycodes_for(binding.keysym)? {
                for extra in [0, MOD_LOCK, MOD_2, MOD_LOCK | MOD_2] {
                    self.server.grab_key(self.root, binding.mask | extra, keycode)?;
                }
                grabbed += 1;
            }
        }
        info!("Grabbed {} keys", grabbed);
        Ok(())
    }

    /// Action bound to a key press, if any
    pub fn key_action(&mut self, event: &KeyEvent) -> Result<Option<KeyAction>> {
        let keysym = self.server.keysym_for(event.keycode)?;
        Ok(self.keys.lookup(keysym, event.state).cloned())
    }

    pub(crate) fn handle_key_press(&mut self, event: &KeyEvent) -> Result<()> {
        let Some(action) = self.key_action(event)? else {
            return Ok(());
        };
        debug!("Key action {:?}", action);
        let active = self.active;

        match action {
            KeyAction::Exec(command) => self.shell.run_command(&command),
            KeyAction::Desktop(Some(n)) => self.change_desktop(n - 1)?,
            KeyAction::Desktop(None) => self.next_desktop()?,
            KeyAction::Next => self.focus_next()?,
            KeyAction::NextStacked => self.focus_next_stacked()?,
            KeyAction::Root => {
                self.shell.show_root_menu(BUTTON_LEFT, 0, 0);
            }
            KeyAction::Restart => self.request_shutdown(Shutdown::Restart),
            KeyAction::Exit => self.request_shutdown(Shutdown::Exit),
            KeyAction::Up
            | KeyAction::Down
            | KeyAction::Left
            | KeyAction::Right
            | KeyAction::Escape
            | KeyAction::Select => {}
            action => {
                if let Some(window) = active {
                    self.apply_to_active(window, action)?;
                }
            }
        }
        Ok(())
    }

    fn apply_to_active(&mut self, window: Window, action: KeyAction) -> Result<()> {
        match action {
            KeyAction::Close => self.delete_client(window)?,
            KeyAction::Shade => {
                if self.clients.get(window).is_some_and(|c| c.status.contains(Status::SHADED)) {
                    self.unshade_client(window)?;
                } else {
                    self.shade_client(window)?;
                }
            }
            KeyAction::Move => {
                self.move_client_keyboard(window)?;
            }
            KeyAction::Resize => {
                self.resize_client_keyboard(window)?;
            }
            KeyAction::Min => self.minimize_client(window)?,
            KeyAction::Max => self.maximize_client(window)?,
            KeyAction::Window => {
                if let Some(client) = self.clients.get(window) {
                    let (x, y) = (client.geometry.x, client.geometry.y);
                    self.shell.show_window_menu(window, x, y);
                }
            }
            _ => {}
        }
        Ok(())
    }
}
