//! Light/dark theme preference.

use std::fmt;
use std::str::FromStr;

use crate::storage::Storage;

/// Durable-storage key the preference is kept under.
pub const THEME_KEY: &str = "theme";

/// The two display themes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    /// Light background.
    Light,
    /// Dark background; used when nothing is stored.
    #[default]
    Dark,
}

impl Theme {
    /// The other theme.
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// The value written to storage for this theme.
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Interpret a stored value: only `"light"` selects the light theme.
    pub fn from_stored(value: Option<&str>) -> Self {
        match value {
            Some("light") => Theme::Light,
            _ => Theme::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(format!("Invalid theme: {s}. Valid options: light, dark")),
        }
    }
}

/// Two-state switch that persists its value.
///
/// The observable attribute mirrors a `data-theme` attribute: present with
/// value `light` for the light theme, absent for the dark one.
pub struct ThemeSwitch<S: Storage> {
    storage: S,
    attribute: Option<Theme>,
}

impl<S: Storage> ThemeSwitch<S> {
    /// Creates a switch and applies the persisted preference, if any.
    pub fn load(storage: S) -> Self {
        let stored = match storage.get_item(THEME_KEY) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %err, "could not read theme preference");
                None
            }
        };
        let attribute = match Theme::from_stored(stored.as_deref()) {
            Theme::Light => Some(Theme::Light),
            Theme::Dark => None,
        };
        Self { storage, attribute }
    }

    /// The theme currently applied.
    pub fn current(&self) -> Theme {
        self.attribute.unwrap_or(Theme::Dark)
    }

    /// The observable attribute value.
    pub fn data_theme(&self) -> Option<&'static str> {
        self.attribute.map(Theme::as_str)
    }

    /// Flip the theme, persist the new value, and return it.
    pub fn toggle(&mut self) -> Theme {
        let next = if self.attribute == Some(Theme::Light) {
            self.attribute = None;
            Theme::Dark
        } else {
            self.attribute = Some(Theme::Light);
            Theme::Light
        };
        if let Err(err) = self.storage.set_item(THEME_KEY, next.as_str()) {
            tracing::warn!(error = %err, "could not persist theme preference");
        }
        next
    }
}
