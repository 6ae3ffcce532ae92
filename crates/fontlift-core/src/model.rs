//! Font data model shared by configuration, providers, and the CSS pipeline.
//!
//! Raw (`FontFaceData`, `FontSource`) types mirror what site authors and providers hand us;
//! the `Normalized*` types are what the rest of the crate works with: `src` and
//! `unicode_range` are always lists and string shorthands are already parsed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider name that opts a family out of font management entirely.
pub const NO_PROVIDER: &str = "none";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteFontSource {
    pub url: String,
    #[serde(
        default,
        rename = "originalURL",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech: Option<String>,
}

impl RemoteFontSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            original_url: None,
            format: None,
            tech: None,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_tech(mut self, tech: impl Into<String>) -> Self {
        self.tech = Some(tech.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalFontSource {
    pub name: String,
}

/// A font source as written in configuration or returned by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FontSource {
    Remote(RemoteFontSource),
    Local(LocalFontSource),
    /// `"https://…/a.woff2"`, `"/fonts/a.woff2"` or a local face name.
    Shorthand(String),
}

impl From<&str> for FontSource {
    fn from(value: &str) -> Self {
        Self::Shorthand(value.to_string())
    }
}

impl From<RemoteFontSource> for FontSource {
    fn from(value: RemoteFontSource) -> Self {
        Self::Remote(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NormalizedFontSource {
    Remote(RemoteFontSource),
    Local(LocalFontSource),
}

impl NormalizedFontSource {
    pub fn as_remote(&self) -> Option<&RemoteFontSource> {
        match self {
            Self::Remote(remote) => Some(remote),
            Self::Local(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(v) => vec![v],
            Self::Many(v) => v,
        }
    }
}

impl<T> From<T> for OneOrMany<T> {
    fn from(value: T) -> Self {
        Self::One(value)
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(value: Vec<T>) -> Self {
        Self::Many(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontDisplay {
    Auto,
    Block,
    #[default]
    Swap,
    Fallback,
    Optional,
}

impl FontDisplay {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Block => "block",
            Self::Swap => "swap",
            Self::Fallback => "fallback",
            Self::Optional => "optional",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FontWeight {
    Number(f64),
    Range(f64, f64),
    Keyword(String),
}

impl fmt::Display for FontWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Range(lo, hi) => write!(f, "{lo} {hi}"),
            Self::Keyword(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    Normal,
    Italic,
    Oblique,
}

impl FontStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Italic => "italic",
            Self::Oblique => "oblique",
        }
    }
}

/// One `@font-face` candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontFaceData {
    pub src: OneOrMany<FontSource>,
    #[serde(default)]
    pub display: FontDisplay,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<FontWeight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stretch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unicode_range: Option<OneOrMany<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_settings: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation_settings: Option<String>,
}

impl FontFaceData {
    pub fn new(src: impl Into<OneOrMany<FontSource>>) -> Self {
        Self {
            src: src.into(),
            display: FontDisplay::default(),
            weight: None,
            stretch: None,
            style: None,
            unicode_range: None,
            feature_settings: None,
            variation_settings: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedFontFaceData {
    pub src: Vec<NormalizedFontSource>,
    #[serde(default)]
    pub display: FontDisplay,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<FontWeight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stretch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unicode_range: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_settings: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation_settings: Option<String>,
}

impl NormalizedFontFaceData {
    pub fn first_remote(&self) -> Option<&RemoteFontSource> {
        self.src.iter().find_map(NormalizedFontSource::as_remote)
    }
}

/// The unit of information returned per family resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FontFaceResolution {
    pub fonts: Vec<NormalizedFontFaceData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallbacks: Option<Vec<String>>,
}

/// Normalized per-resolution parameters handed to providers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolveFontFacesOptions {
    pub weights: Vec<String>,
    pub styles: Vec<FontStyle>,
    pub subsets: Vec<String>,
    pub fallbacks: Vec<String>,
}

/// CSS generic font family keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenericFamily {
    Serif,
    SansSerif,
    Monospace,
    Cursive,
    Fantasy,
    SystemUi,
    UiSerif,
    UiSansSerif,
    UiMonospace,
    UiRounded,
    Emoji,
    Math,
    Fangsong,
}

impl GenericFamily {
    pub const ALL: [GenericFamily; 13] = [
        Self::Serif,
        Self::SansSerif,
        Self::Monospace,
        Self::Cursive,
        Self::Fantasy,
        Self::SystemUi,
        Self::UiSerif,
        Self::UiSansSerif,
        Self::UiMonospace,
        Self::UiRounded,
        Self::Emoji,
        Self::Math,
        Self::Fangsong,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Serif => "serif",
            Self::SansSerif => "sans-serif",
            Self::Monospace => "monospace",
            Self::Cursive => "cursive",
            Self::Fantasy => "fantasy",
            Self::SystemUi => "system-ui",
            Self::UiSerif => "ui-serif",
            Self::UiSansSerif => "ui-sans-serif",
            Self::UiMonospace => "ui-monospace",
            Self::UiRounded => "ui-rounded",
            Self::Emoji => "emoji",
            Self::Math => "math",
            Self::Fangsong => "fangsong",
        }
    }

    /// Matches a CSS identifier against the generic keywords (ASCII case-insensitive).
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(keyword))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WeightValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for WeightValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// An author-supplied face for a family; no provider is consulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontFamilyManualOverride {
    pub name: String,
    #[serde(default)]
    pub global: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallbacks: Option<Vec<String>>,
    #[serde(flatten)]
    pub face: FontFaceData,
}

/// Routes a family to a named provider and/or narrows what gets resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontFamilyProviderOverride {
    pub name: String,
    #[serde(default)]
    pub global: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<WeightValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<Vec<FontStyle>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsets: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallbacks: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FontFamilyOverride {
    Manual(FontFamilyManualOverride),
    Provider(FontFamilyProviderOverride),
}

impl FontFamilyOverride {
    pub fn name(&self) -> &str {
        match self {
            Self::Manual(o) => &o.name,
            Self::Provider(o) => &o.name,
        }
    }

    pub fn is_global(&self) -> bool {
        match self {
            Self::Manual(o) => o.global,
            Self::Provider(o) => o.global,
        }
    }

    pub fn fallbacks(&self) -> Option<&[String]> {
        match self {
            Self::Manual(o) => o.fallbacks.as_deref(),
            Self::Provider(o) => o.fallbacks.as_deref(),
        }
    }
}
