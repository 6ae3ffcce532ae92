//! CSS rewriter: injects `@font-face` blocks and metric fallbacks for the families a stylesheet
//! uses.
//!
//! A rewrite runs in three phases. The scan collects one request per qualifying declaration
//! with offsets into the original text, every request is resolved concurrently, and the edits
//! are applied in scan order against the untouched source.

use crate::css::render::quote_css_string;
use crate::css::{
    CssMinifier, Declaration, EditBuffer, FallbackFace, FontMetricsTable,
    existing_font_face_families, extract_end_of_first_child, extract_font_families,
    extract_generic, parse_declarations, render_font_face, render_font_fallbacks,
};
use crate::model::FontFaceResolution;
use crate::resolve::FallbackOptions;
use crate::tracker::ChunkTracker;
use crate::Result;
use futures::future::{BoxFuture, join_all};
use regex::Regex;
use rustc_hash::FxHashSet;
use std::sync::OnceLock;

fn css_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\.(?:css|scss|sass|postcss|pcss|less|stylus|styl)(?:\?[^.]+)?$")
            .expect("valid regex")
    })
}

fn skip_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"/node_modules/(?:vite-plugin-vue-inspector)/").expect("valid regex")
    })
}

/// Stylesheet-like module ids, optionally with a query (`a.css?inline`).
pub fn is_css(id: &str) -> bool {
    css_id_regex().is_match(id)
}

/// Whether the rewriter should look at module `id` at all.
pub fn should_transform(id: &str) -> bool {
    is_css(id) && !skip_regex().is_match(id)
}

/// Resolves one family for the rewriter. `Ok(None)` leaves the family unmanaged.
pub trait FontFaceResolver: Send + Sync {
    fn resolve_font_face<'a>(
        &'a self,
        family: &'a str,
        fallback: Option<&'a FallbackOptions>,
    ) -> BoxFuture<'a, Result<Option<FontFaceResolution>>>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Dev output keeps declarations readable; build output minifies them.
    pub dev: bool,
    /// Also treat custom properties (`--x: "Foo", serif`) as family lists.
    pub process_css_variables: bool,
}

/// Declaration texts already injected into one file.
#[derive(Debug, Clone, Default)]
pub struct DeclarationCache {
    seen: FxHashSet<String>,
}

impl DeclarationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, declaration: &str) -> bool {
        self.seen.contains(declaration)
    }

    /// Returns `false` when the text was already present.
    pub fn add(&mut self, declaration: &str) -> bool {
        if self.has(declaration) {
            return false;
        }
        self.seen.insert(declaration.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// One qualifying declaration found by the scan.
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyRequest {
    pub family: String,
    pub fallback: FallbackOptions,
    /// Where extra fallback names are spliced, relative to the original text.
    pub insert_at: Option<usize>,
}

/// Finds the declarations whose first family should get synthesized faces.
pub fn scan_requests(css: &str, process_css_variables: bool) -> Vec<FamilyRequest> {
    let declarations = parse_declarations(css);
    let existing = existing_font_face_families(&declarations);
    declarations
        .iter()
        .filter(|d| is_candidate(d, process_css_variables))
        .filter_map(|d| {
            let mut families = extract_font_families(d).into_iter();
            let family = families.next()?;
            if existing.contains(&family) {
                return None;
            }
            Some(FamilyRequest {
                family,
                fallback: FallbackOptions {
                    fallbacks: families.collect(),
                    generic: extract_generic(d),
                },
                insert_at: extract_end_of_first_child(d),
            })
        })
        .collect()
}

fn is_candidate(declaration: &Declaration, process_css_variables: bool) -> bool {
    if declaration.in_font_face || declaration.is_raw() {
        return false;
    }
    declaration.is_font_family() || (process_css_variables && declaration.is_custom_property())
}

pub struct FontFamilyInjector<'a> {
    resolver: &'a dyn FontFaceResolver,
    tracker: &'a ChunkTracker,
    minifier: &'a dyn CssMinifier,
    metrics: &'a FontMetricsTable,
    options: RewriteOptions,
}

impl<'a> FontFamilyInjector<'a> {
    pub fn new(
        resolver: &'a dyn FontFaceResolver,
        tracker: &'a ChunkTracker,
        minifier: &'a dyn CssMinifier,
        metrics: &'a FontMetricsTable,
        options: RewriteOptions,
    ) -> Self {
        Self {
            resolver,
            tracker,
            minifier,
            metrics,
            options,
        }
    }

    /// Rewritten text for module `id`, or `None` when nothing was injected.
    pub async fn transform(&self, code: &str, id: &str) -> Option<String> {
        if !self.options.process_css_variables && !code.contains("font-family:") {
            return None;
        }
        let edits = self.rewrite(code, id).await;
        edits.has_changed().then(|| edits.render())
    }

    pub async fn rewrite<'c>(&self, code: &'c str, id: &str) -> EditBuffer<'c> {
        let requests = scan_requests(code, self.options.process_css_variables);
        let resolutions = join_all(requests.iter().map(|request| self.resolve(request))).await;

        let mut buffer = EditBuffer::new(code);
        let mut cache = DeclarationCache::new();
        let mut pending = Vec::new();
        for (request, resolution) in requests.iter().zip(resolutions) {
            let Some(resolution) = resolution else {
                continue;
            };
            pending.push(self.apply(&mut buffer, &mut cache, request, resolution, id));
        }

        let prefaces = join_all(pending.iter().map(|texts| self.finish(texts))).await;
        for preface in prefaces {
            buffer.prepend(preface);
        }
        buffer
    }

    async fn resolve(&self, request: &FamilyRequest) -> Option<FontFaceResolution> {
        match self
            .resolver
            .resolve_font_face(&request.family, Some(&request.fallback))
            .await
        {
            Ok(Some(resolution)) if !resolution.fonts.is_empty() => Some(resolution),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!("Could not resolve font family `{}`: {err}", request.family);
                None
            }
        }
    }

    /// Records URLs, splices fallback names, and returns the new declaration texts.
    fn apply(
        &self,
        buffer: &mut EditBuffer<'_>,
        cache: &mut DeclarationCache,
        request: &FamilyRequest,
        resolution: FontFaceResolution,
        id: &str,
    ) -> Vec<String> {
        let family = request.family.as_str();
        let fallbacks: Vec<FallbackFace> = resolution
            .fallbacks
            .unwrap_or_default()
            .iter()
            .map(|font| FallbackFace::for_family(family, font))
            .collect();

        let mut declarations = Vec::new();
        let mut insert_families = false;
        for font in &resolution.fonts {
            if let Some(remote) = font.first_remote() {
                self.tracker.record(id, &remote.url);
            }
            let fallback_declarations =
                render_font_fallbacks(family, font, &fallbacks, self.metrics);
            insert_families |= !fallback_declarations.is_empty();
            for declaration in
                std::iter::once(render_font_face(family, font)).chain(fallback_declarations)
            {
                if cache.add(&declaration) {
                    declarations.push(declaration);
                }
            }
        }

        if let (true, Some(offset)) = (insert_families, request.insert_at) {
            let names: Vec<String> = fallbacks.iter().map(|f| quote_css_string(&f.name)).collect();
            buffer.insert_left(offset, format!(", {}", names.join(", ")));
        }
        declarations
    }

    async fn finish(&self, declarations: &[String]) -> String {
        if self.options.dev {
            return declarations.iter().map(|d| format!("{d}\n")).collect();
        }
        let minified = join_all(declarations.iter().map(|d| self.minify(d))).await;
        minified.concat()
    }

    async fn minify(&self, declaration: &str) -> String {
        match self.minifier.minify(declaration).await {
            Ok(minified) if !minified.is_empty() => minified,
            Ok(_) => declaration.to_string(),
            Err(err) => {
                tracing::warn!("Keeping unminified font declaration: {err}");
                declaration.to_string()
            }
        }
    }
}
