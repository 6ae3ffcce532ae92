//! Public asset strategy: rewrites remote font sources to proxied URLs under the assets prefix
//! and remembers where each proxied file originally came from.

use crate::config::BuildMode;
use crate::model::{
    FontFaceData, FontSource, LocalFontSource, NormalizedFontFaceData, NormalizedFontSource,
    RemoteFontSource,
};
use base64::Engine as _;
use indexmap::IndexMap;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::{Mutex, OnceLock, PoisonError};

fn protocol_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:[A-Za-z][A-Za-z0-9+.-]*:)?//").expect("valid regex"))
}

/// `https://…`, `http://…` and protocol-relative `//…` URLs.
pub fn has_protocol(url: &str) -> bool {
    protocol_regex().is_match(url)
}

pub fn extension_to_format(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "woff2" => Some("woff2"),
        "woff" => Some("woff"),
        "otf" => Some("opentype"),
        "ttf" => Some("truetype"),
        "eot" => Some("embedded-opentype"),
        "svg" => Some("svg"),
        _ => None,
    }
}

pub fn format_to_extension(format: &str) -> Option<&'static str> {
    match format {
        "woff2" => Some(".woff2"),
        "woff" => Some(".woff"),
        "opentype" => Some(".otf"),
        "truetype" => Some(".ttf"),
        "embedded-opentype" => Some(".eot"),
        "svg" => Some(".svg"),
        _ => None,
    }
}

fn strip_query(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

/// Last path segment split into `(stem, ".ext")`.
fn split_basename(url: &str) -> (String, String) {
    let basename = url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .unwrap_or_else(|| {
            strip_query(url)
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string()
        });
    match basename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            (stem.to_string(), format!(".{ext}"))
        }
        _ => (basename, String::new()),
    }
}

/// Parses a string source: URLs and absolute paths become remote sources (with a format guessed
/// from the extension), anything else names a locally installed face.
pub fn parse_font(shorthand: &str) -> NormalizedFontSource {
    let shorthand = shorthand.trim();
    if shorthand.starts_with('/') || has_protocol(shorthand) {
        let (_, ext) = split_basename(shorthand);
        let format = extension_to_format(ext.trim_start_matches('.')).map(str::to_string);
        return NormalizedFontSource::Remote(RemoteFontSource {
            url: shorthand.to_string(),
            original_url: None,
            format,
            tech: None,
        });
    }
    NormalizedFontSource::Local(LocalFontSource {
        name: shorthand.to_string(),
    })
}

/// Stable 10-character content hash of a remote source (all fields, including `originalURL`).
pub fn source_hash(source: &RemoteFontSource) -> String {
    let serialized = serde_json::to_vec(source).unwrap_or_else(|_| source.url.as_bytes().to_vec());
    let digest = Sha256::digest(&serialized);
    base64::engine::general_purpose::STANDARD
        .encode(digest)
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(10)
        .collect()
}

/// `<basename>-<hash><ext>`; the extension falls back to one derived from `format`.
pub fn cache_filename(source: &RemoteFontSource) -> String {
    let (stem, ext) = split_basename(&source.url);
    let ext = if ext.is_empty() {
        source
            .format
            .as_deref()
            .and_then(format_to_extension)
            .unwrap_or_default()
            .to_string()
    } else {
        ext
    };
    [stem, format!("{}{ext}", source_hash(source))]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Joins URL path segments onto `base` with exactly one `/` between them.
pub fn join_url(base: &str, segments: &[&str]) -> String {
    let mut out = base.trim_end_matches('/').to_string();
    for segment in segments {
        let segment = segment.trim_matches('/');
        if segment.is_empty() {
            continue;
        }
        out.push('/');
        out.push_str(segment);
    }
    out
}

#[derive(Debug)]
pub struct PublicAssets {
    prefix: String,
    base: String,
    mode: BuildMode,
    rendered: Mutex<IndexMap<String, String>>,
}

impl PublicAssets {
    pub fn new(prefix: impl Into<String>, base: impl Into<String>, mode: BuildMode) -> Self {
        Self {
            prefix: prefix.into(),
            base: base.into(),
            mode,
            rendered: Mutex::new(IndexMap::new()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// URL under which the proxied file is served to the page.
    pub fn public_url(&self, filename: &str) -> String {
        match self.mode {
            BuildMode::Dev => join_url(&self.base, &[&self.prefix, filename]),
            BuildMode::Build => join_url(&self.prefix, &[filename]),
        }
    }

    pub fn normalize_font_data(
        &self,
        faces: impl IntoIterator<Item = FontFaceData>,
    ) -> Vec<NormalizedFontFaceData> {
        faces
            .into_iter()
            .map(|face| NormalizedFontFaceData {
                src: face
                    .src
                    .into_vec()
                    .into_iter()
                    .map(|src| self.normalize_source(src))
                    .collect(),
                display: face.display,
                weight: face.weight,
                stretch: face.stretch,
                style: face.style,
                unicode_range: face.unicode_range.map(|r| r.into_vec()),
                feature_settings: face.feature_settings,
                variation_settings: face.variation_settings,
            })
            .collect()
    }

    fn normalize_source(&self, source: FontSource) -> NormalizedFontSource {
        let mut remote = match source {
            FontSource::Shorthand(s) => match parse_font(&s) {
                NormalizedFontSource::Remote(remote) => remote,
                local => return local,
            },
            FontSource::Local(local) => return NormalizedFontSource::Local(local),
            FontSource::Remote(remote) => remote,
        };
        if !has_protocol(&remote.url) {
            return NormalizedFontSource::Remote(remote);
        }

        if remote.url.starts_with("//") {
            remote.url = format!("https:{}", remote.url);
        }
        let file = cache_filename(&remote);
        self.lock().insert(file.clone(), remote.url.clone());
        remote.original_url = Some(std::mem::replace(&mut remote.url, self.public_url(&file)));
        NormalizedFontSource::Remote(remote)
    }

    pub fn original_url(&self, filename: &str) -> Option<String> {
        self.lock().get(filename).cloned()
    }

    /// Snapshot of `filename → original URL`, in first-seen order.
    pub fn rendered_urls(&self) -> IndexMap<String, String> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, IndexMap<String, String>> {
        self.rendered.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
