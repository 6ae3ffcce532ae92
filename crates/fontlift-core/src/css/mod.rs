//! CSS-level building blocks: scanning, `@font-face` synthesis, metric fallbacks, minification,
//! and offset-stable text editing.

pub mod edit;
pub mod metrics;
pub mod minify;
pub mod parse;
pub mod render;

pub use edit::EditBuffer;
pub use metrics::{FontMetrics, FontMetricsTable};
pub use minify::{CssMinifier, WhitespaceMinifier, minify_css};
pub use parse::{
    Declaration, DeclarationValue, Span, ValueItem, existing_font_face_families,
    extract_end_of_first_child, extract_font_families, extract_generic, parse_declarations,
};
pub use render::{FallbackFace, render_font_face, render_font_fallbacks};
