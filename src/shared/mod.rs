//! Types shared between the window manager core and its collaborators

pub mod window_state;

pub use window_state::{Borders, Geometry};
