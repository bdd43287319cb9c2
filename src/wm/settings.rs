//! Settings Module
//!
//! Runtime parameters the event handlers consult, resolved once from the
//! configuration file and the screen size.

use tracing::warn;

use crate::config::Config;
use crate::shared::Geometry;

/// Focus policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusModel {
    /// Focus follows clicks
    #[default]
    Click,
    /// Focus follows the pointer into a window and stays there
    Sloppy,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub focus_model: FocusModel,
    pub border_width: u32,
    pub title_height: u32,
    /// Double click window, milliseconds
    pub double_click_speed: u32,
    /// Double click slack, pixels
    pub double_click_delta: u32,
    pub desktop_count: u32,
    pub move_step: u32,
    pub screen: Geometry,
    pub frame_background: u32,
}

impl Settings {
    pub fn from_config(config: &Config, screen_width: u32, screen_height: u32) -> Self {
        let behavior = &config.behavior;
        let focus_model = match behavior.focus_model.as_str() {
            "click" => FocusModel::Click,
            "sloppy" => FocusModel::Sloppy,
            other => {
                warn!("Unknown focus model {:?}, using click", other);
                FocusModel::Click
            }
        };
        Self {
            focus_model,
            border_width: config.decorations.border_width,
            title_height: config.decorations.title_height,
            double_click_speed: behavior.double_click_speed,
            double_click_delta: behavior.double_click_delta,
            desktop_count: behavior.desktop_count.max(1),
            move_step: behavior.move_step.max(1),
            screen: Geometry::new(0, 0, screen_width, screen_height),
            frame_background: config.decorations.background,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&Config::default(), 1024, 768)
    }
}
