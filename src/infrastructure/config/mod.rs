//! Preference store adapters

mod xdg;

pub use xdg::{XdgPreferenceStore, APP_DIR};
