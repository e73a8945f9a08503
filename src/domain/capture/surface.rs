//! Display surface value object

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::InvalidSurfaceError;

/// All capture surfaces
pub const ALL_SURFACES: &[Surface] = &[Surface::Tab, Surface::Window, Surface::Screen];

/// What the display stream is acquired from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    #[default]
    Tab,
    Window,
    Screen,
}

impl Surface {
    /// Get the string identifier for this surface
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tab => "tab",
            Self::Window => "window",
            Self::Screen => "screen",
        }
    }

    /// Tab capture needs a stream id issued by the privileged context
    pub const fn requires_stream_id(&self) -> bool {
        matches!(self, Self::Tab)
    }
}

impl FromStr for Surface {
    type Err = InvalidSurfaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tab" => Ok(Self::Tab),
            "window" => Ok(Self::Window),
            "screen" | "monitor" => Ok(Self::Screen),
            _ => Err(InvalidSurfaceError {
                input: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_surfaces() {
        assert_eq!("tab".parse::<Surface>().unwrap(), Surface::Tab);
        assert_eq!(" Window ".parse::<Surface>().unwrap(), Surface::Window);
        assert_eq!("monitor".parse::<Surface>().unwrap(), Surface::Screen);
    }

    #[test]
    fn parse_invalid_surface() {
        let err = "desktop".parse::<Surface>().unwrap_err();
        assert!(err.to_string().contains("desktop"));
    }

    #[test]
    fn only_tab_requires_stream_id() {
        assert!(Surface::Tab.requires_stream_id());
        assert!(!Surface::Window.requires_stream_id());
        assert!(!Surface::Screen.requires_stream_id());
    }
}
