//! `@font-face` text synthesis. Pure functions; no I/O.

use super::metrics::{FontMetricsTable, metric_overrides, to_percentage};
use crate::model::{NormalizedFontFaceData, NormalizedFontSource};

/// A metric-adjusted local face standing in for `family` while it loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackFace {
    /// System font the fallback renders with, e.g. `Arial`.
    pub font: String,
    /// Family name the fallback is declared under, e.g. `Brand Fallback: Arial`.
    pub name: String,
}

impl FallbackFace {
    pub fn for_family(family: &str, font: &str) -> Self {
        Self {
            font: font.to_string(),
            name: format!("{family} Fallback: {font}"),
        }
    }
}

pub(crate) fn quote_css_string(value: &str) -> String {
    quote_css_string_with(value, '"')
}

/// Wraps `value` in `quote`, escaping the quote, backslashes and newlines.
fn quote_css_string_with(value: &str, quote: char) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\a "),
            _ if ch == quote => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out.push(quote);
    out
}

fn render_src(sources: &[NormalizedFontSource]) -> String {
    sources
        .iter()
        .map(|source| match source {
            NormalizedFontSource::Remote(remote) => {
                let mut rendered = format!("url({})", quote_css_string(&remote.url));
                if let Some(format) = &remote.format {
                    rendered.push_str(&format!(" format({})", quote_css_string(format)));
                }
                if let Some(tech) = &remote.tech {
                    rendered.push_str(&format!(" tech({})", quote_css_string(tech)));
                }
                rendered
            }
            NormalizedFontSource::Local(local) => {
                format!("local({})", quote_css_string(&local.name))
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn render_font_face(family: &str, face: &NormalizedFontFaceData) -> String {
    let mut lines = vec![
        "@font-face {".to_string(),
        format!("  font-family: {};", quote_css_string_with(family, '\'')),
        format!("  src: {};", render_src(&face.src)),
        format!("  font-display: {};", face.display.as_str()),
    ];
    if let Some(ranges) = face.unicode_range.as_ref().filter(|r| !r.is_empty()) {
        lines.push(format!("  unicode-range: {};", ranges.join(", ")));
    }
    if let Some(weight) = &face.weight {
        lines.push(format!("  font-weight: {weight};"));
    }
    let optional = [
        ("font-style", &face.style),
        ("font-stretch", &face.stretch),
        ("font-feature-settings", &face.feature_settings),
        ("font-variation-settings", &face.variation_settings),
    ];
    for (property, value) in optional {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            lines.push(format!("  {property}: {value};"));
        }
    }
    lines.push("}".to_string());
    lines.join("\n")
}

/// Metric-compatible `@font-face` blocks for each fallback of `family`.
///
/// Returns nothing when the primary family has no known metrics.
pub fn render_font_fallbacks(
    family: &str,
    _face: &NormalizedFontFaceData,
    fallbacks: &[FallbackFace],
    metrics: &FontMetricsTable,
) -> Vec<String> {
    if fallbacks.is_empty() {
        return Vec::new();
    }
    let Some(primary) = metrics.get(family) else {
        return Vec::new();
    };

    fallbacks
        .iter()
        .map(|fallback| {
            let o = metric_overrides(primary, metrics.get(&fallback.font));
            format!(
                "@font-face {{\n  font-family: {};\n  src: local({});\n  size-adjust: {};\n  ascent-override: {};\n  descent-override: {};\n  line-gap-override: {};\n}}\n",
                quote_css_string(&fallback.name),
                quote_css_string(&fallback.font),
                to_percentage(o.size_adjust),
                to_percentage(o.ascent),
                to_percentage(o.descent),
                to_percentage(o.line_gap),
            )
        })
        .collect()
}
