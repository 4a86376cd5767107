//! Theme Palette
//!
//! Static light/dark color palette consumed by rendering code. The store
//! treats color identifiers as data: unrecognized names pass through as
//! opaque values rather than being rejected.

/// Light or dark rendering variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorScheme {
    /// Light canvas background
    Light,
    /// Dark canvas background
    Dark,
}

/// (name, light variant, dark variant)
const PALETTE: &[(&str, &str, &str)] = &[
    ("black", "#1d1d1d", "#e1e1e1"),
    ("grey", "#adb5bd", "#93989f"),
    ("light-violet", "#e599f7", "#b583c9"),
    ("violet", "#ae3ec9", "#9c46b9"),
    ("blue", "#4263eb", "#4f72fc"),
    ("light-blue", "#4dabf7", "#588fc9"),
    ("yellow", "#ffc078", "#cba371"),
    ("orange", "#f76707", "#bf612e"),
    ("green", "#099268", "#3b7b5e"),
    ("light-green", "#40c057", "#599f57"),
    ("light-red", "#ff8787", "#c67877"),
    ("red", "#e03131", "#aa3c37"),
    ("white", "#ffffff", "#1d1d1d"),
];

/// The static color lookup table supplied to rendering
#[derive(Debug, Clone, Copy, Default)]
pub struct Palette;

impl Palette {
    /// Resolve a color name to its hex value for a scheme.
    ///
    /// Unknown names are returned unchanged so callers can store raw hex
    /// values or newer color names without the core rejecting them.
    #[must_use]
    pub fn resolve<'a>(&self, name: &'a str, scheme: ColorScheme) -> &'a str {
        PALETTE
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(_, light, dark)| match scheme {
                ColorScheme::Light => *light,
                ColorScheme::Dark => *dark,
            })
            .unwrap_or(name)
    }

    /// Whether a color name is part of the palette
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        PALETTE.iter().any(|(n, _, _)| *n == name)
    }

    /// All palette color names
    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        PALETTE.iter().map(|(n, _, _)| *n)
    }
}
