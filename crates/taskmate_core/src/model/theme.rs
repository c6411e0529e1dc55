//! Theme mode and color palettes.
//!
//! # Invariants
//! - Exactly two palettes exist; the mode alone selects one.
//! - Persisted form is the literal `"dark"` or `"light"`.

/// Light/dark selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn from_dark(is_dark: bool) -> Self {
        if is_dark {
            Self::Dark
        } else {
            Self::Light
        }
    }

    pub fn is_dark(self) -> bool {
        matches!(self, Self::Dark)
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// Stored value under the `theme` key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// Only the exact literal `"dark"` selects dark mode; anything else is light.
    pub fn from_stored(value: Option<&str>) -> Self {
        Self::from_dark(value == Some("dark"))
    }

    /// Palette for this mode.
    pub fn colors(self) -> &'static ColorPalette {
        match self {
            Self::Light => &LIGHT_PALETTE,
            Self::Dark => &DARK_PALETTE,
        }
    }
}

/// Semantic color slots consumed by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorPalette {
    pub background: &'static str,
    pub surface: &'static str,
    pub text: &'static str,
    pub text_secondary: &'static str,
    pub border: &'static str,
    pub primary: &'static str,
    pub success: &'static str,
    pub error: &'static str,
    pub warning: &'static str,
}

pub const LIGHT_PALETTE: ColorPalette = ColorPalette {
    background: "#f5f5f5",
    surface: "#ffffff",
    text: "#000000",
    text_secondary: "#666666",
    border: "#e0e0e0",
    primary: "#2196F3",
    success: "#4CAF50",
    error: "#f44336",
    warning: "#ff9800",
};

pub const DARK_PALETTE: ColorPalette = ColorPalette {
    background: "#1a1a1a",
    surface: "#2a2a2a",
    text: "#ffffff",
    text_secondary: "#999999",
    border: "#333333",
    primary: "#2196F3",
    success: "#4CAF50",
    error: "#f44336",
    warning: "#ff9800",
};

/// Snapshot delivered to theme subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeState {
    pub mode: ThemeMode,
    pub colors: &'static ColorPalette,
}

impl ThemeState {
    pub fn new(mode: ThemeMode) -> Self {
        Self {
            mode,
            colors: mode.colors(),
        }
    }

    pub fn is_dark_mode(&self) -> bool {
        self.mode.is_dark()
    }
}

impl Default for ThemeState {
    fn default() -> Self {
        Self::new(ThemeMode::default())
    }
}
