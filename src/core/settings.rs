use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{CoreError, Result};
use super::store::{StoreKey, ValueStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelPosition {
    Left,
    #[default]
    Right,
}

impl fmt::Display for PanelPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanelPosition::Left => write!(f, "left"),
            PanelPosition::Right => write!(f, "right"),
        }
    }
}

impl FromStr for PanelPosition {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "left" => Ok(PanelPosition::Left),
            "right" => Ok(PanelPosition::Right),
            other => Err(CoreError::InvalidValue(format!(
                "panel position must be left or right, got {}",
                other
            ))),
        }
    }
}

/// Global toggles. Persisted, never part of the compiled text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub enabled: bool,
    pub panel_position: PanelPosition,
    pub auto_update_relationships: bool,
    /// 0-100, how far automatic updates move a relationship
    pub relationship_update_strength: u8,
    /// Echo every compiled prompt for inspection
    pub show_prompt_in_chat: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            enabled: true,
            panel_position: PanelPosition::Right,
            auto_update_relationships: true,
            relationship_update_strength: 50,
            show_prompt_in_chat: false,
        }
    }
}

impl Settings {
    pub fn load<S: ValueStore>(store: &S) -> Self {
        store.load(&StoreKey::Settings).unwrap_or_default()
    }

    pub fn save<S: ValueStore>(&self, store: &mut S) -> Result<()> {
        store.set(&StoreKey::Settings, self)
    }

    pub fn set_relationship_update_strength(&mut self, strength: i64) {
        self.relationship_update_strength = strength.clamp(0, 100) as u8;
    }
}
