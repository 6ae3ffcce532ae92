//! Configuration surface and option normalization.

use crate::model::{FontFamilyOverride, FontStyle, GenericFamily, WeightValue};
use crate::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_ASSETS_PREFIX: &str = "/_fonts";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontOptions {
    #[serde(default)]
    pub families: Vec<FontFamilyOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<AssetsOptions>,
    /// Site base path, used to build dev-server font URLs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default)]
    pub experimental: ExperimentalOptions,
}

impl FontOptions {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|err| Error::InvalidOptions {
            message: err.to_string(),
        })
    }

    pub fn assets_prefix(&self) -> &str {
        self.assets
            .as_ref()
            .and_then(|a| a.prefix.as_deref())
            .unwrap_or(DEFAULT_ASSETS_PREFIX)
    }

    pub fn base(&self) -> &str {
        self.base.as_deref().unwrap_or("/")
    }

    pub fn family(&self, name: &str) -> Option<&FontFamilyOverride> {
        self.families.iter().find(|f| f.name() == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultsOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<WeightValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<Vec<FontStyle>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsets: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallbacks: Option<FallbacksOption>,
    /// Provider names tried, in order, for families without an explicit provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub providers: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FallbacksOption {
    /// One list applied to every generic family.
    All(Vec<String>),
    ByGeneric(HashMap<GenericFamily, Vec<String>>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetsOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentalOptions {
    #[serde(default, rename = "processCSSVariables")]
    pub process_css_variables: bool,
    #[serde(default)]
    pub add_preload_links: bool,
}

/// Global resolution defaults after merging user options over the built-in values.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedDefaults {
    pub weights: Vec<String>,
    pub styles: Vec<FontStyle>,
    pub subsets: Vec<String>,
    pub fallbacks: IndexMap<GenericFamily, Vec<String>>,
    pub providers: Option<Vec<String>>,
}

impl NormalizedDefaults {
    pub fn fallbacks_for(&self, generic: GenericFamily) -> &[String] {
        self.fallbacks
            .get(&generic)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

const DEFAULT_SUBSETS: [&str; 7] = [
    "cyrillic-ext",
    "cyrillic",
    "greek-ext",
    "greek",
    "vietnamese",
    "latin-ext",
    "latin",
];

pub fn default_fallbacks(generic: GenericFamily) -> &'static [&'static str] {
    match generic {
        GenericFamily::Serif | GenericFamily::UiSerif => &["Times New Roman"],
        GenericFamily::SansSerif | GenericFamily::UiSansSerif => &["Arial"],
        GenericFamily::Monospace | GenericFamily::UiMonospace => &["Courier New"],
        GenericFamily::SystemUi => &[
            "BlinkMacSystemFont",
            "Segoe UI",
            "Roboto",
            "Helvetica Neue",
            "Arial",
        ],
        GenericFamily::Cursive
        | GenericFamily::Fantasy
        | GenericFamily::UiRounded
        | GenericFamily::Emoji
        | GenericFamily::Math
        | GenericFamily::Fangsong => &[],
    }
}

pub fn normalize_options(options: &FontOptions) -> NormalizedDefaults {
    let defaults = options.defaults.clone().unwrap_or_default();

    let weights = match defaults.weights {
        Some(weights) => weights.iter().map(ToString::to_string).collect(),
        None => vec!["400".to_string()],
    };
    let styles = defaults
        .styles
        .unwrap_or_else(|| vec![FontStyle::Normal, FontStyle::Italic]);
    let subsets = defaults
        .subsets
        .unwrap_or_else(|| DEFAULT_SUBSETS.iter().map(|s| s.to_string()).collect());

    let mut fallbacks = IndexMap::new();
    for generic in GenericFamily::ALL {
        let list = match &defaults.fallbacks {
            Some(FallbacksOption::All(all)) => all.clone(),
            Some(FallbacksOption::ByGeneric(map)) => match map.get(&generic) {
                Some(list) => list.clone(),
                None => owned(default_fallbacks(generic)),
            },
            None => owned(default_fallbacks(generic)),
        };
        fallbacks.insert(generic, list);
    }

    NormalizedDefaults {
        weights,
        styles,
        subsets,
        fallbacks,
        providers: defaults.providers,
    }
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Whether the host runs a dev server or a production build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BuildMode {
    #[default]
    Dev,
    Build,
}

impl BuildMode {
    pub fn is_dev(self) -> bool {
        matches!(self, Self::Dev)
    }
}
