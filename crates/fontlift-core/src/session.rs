//! Per-build context object.
//!
//! A [`BuildSession`] owns every piece of state that lives for one dev-server process or one
//! production build: the proxied-URL registry, the module→URL map, the per-build resolution
//! cache, and the two-tier font byte cache. Host bundler hooks map onto its methods.

use crate::assets::{PublicAssets, has_protocol, join_url};
use crate::config::{BuildMode, FontOptions, normalize_options};
use crate::css::{CssMinifier, FontMetricsTable, WhitespaceMinifier, render_font_face};
use crate::download::{FontAssetCache, FontFetcher, OfflineFetcher};
use crate::model::{FontFaceResolution, FontFamilyOverride, GenericFamily};
use crate::provider::{FontProvider, ProviderRegistry};
use crate::resolve::{FallbackOptions, FontResolver};
use crate::storage::{CacheStorage, CachedDataOptions, MemoryStorage};
use crate::tracker::{ChunkTracker, module_id_without_query};
use crate::transform::{
    FontFaceResolver, FontFamilyInjector, RewriteOptions, is_css, should_transform,
};
use crate::{Error, Result};
use futures::future::{BoxFuture, try_join_all};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Virtual module id of the stylesheet holding every `global` family.
pub const GLOBAL_STYLESHEET_ID: &str = "virtual:fontlift/main.css";

/// Served with every proxied font; filenames are content-addressed.
pub const FONT_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Side-effect import the host injects at its page-render entry.
pub fn global_import() -> String {
    format!("import \"{GLOBAL_STYLESHEET_ID}\";")
}

pub fn font_content_type(filename: &str) -> &'static str {
    let ext = filename.rsplit_once('.').map(|(_, ext)| ext).unwrap_or_default();
    match ext.to_ascii_lowercase().as_str() {
        "woff2" => "font/woff2",
        "woff" => "font/woff",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// A finished output chunk as reported by the host bundler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedChunk {
    pub facade_module_id: Option<String>,
    pub module_ids: Vec<String>,
}

/// One emitted asset of a finished bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleAsset {
    pub file_name: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontResponse {
    pub body: Arc<[u8]>,
    pub content_type: &'static str,
    pub cache_control: &'static str,
}

type ResolutionCache = FxHashMap<(String, Option<GenericFamily>), Option<FontFaceResolution>>;

pub struct BuildSession {
    options: FontOptions,
    mode: BuildMode,
    resolver: FontResolver,
    assets: Arc<PublicAssets>,
    tracker: ChunkTracker,
    fonts: FontAssetCache,
    minifier: Arc<dyn CssMinifier>,
    metrics: FontMetricsTable,
    resolutions: Mutex<ResolutionCache>,
}

impl std::fmt::Debug for BuildSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildSession")
            .field("mode", &self.mode)
            .field("providers", self.resolver.providers())
            .field("assets", &self.assets)
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

impl BuildSession {
    pub fn builder(options: FontOptions) -> BuildSessionBuilder {
        BuildSessionBuilder::new(options)
    }

    pub fn options(&self) -> &FontOptions {
        &self.options
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    pub fn assets(&self) -> &PublicAssets {
        &self.assets
    }

    pub fn tracker(&self) -> &ChunkTracker {
        &self.tracker
    }

    pub fn font_cache(&self) -> &FontAssetCache {
        &self.fonts
    }

    pub fn resolver(&self) -> &FontResolver {
        &self.resolver
    }

    pub fn rewrite_options(&self) -> RewriteOptions {
        RewriteOptions {
            dev: self.mode.is_dev(),
            process_css_variables: self.options.experimental.process_css_variables,
        }
    }

    /// Runs every provider's `setup` once. Call before the first transform.
    pub async fn setup(&self) -> Result<()> {
        self.resolver.providers().setup_all(&self.options).await
    }

    /// Drops all per-build state; the persistent font cache survives.
    pub fn reset(&self) {
        self.assets.clear();
        self.tracker.clear();
        self.fonts.clear_memory();
        self.lock_resolutions().clear();
    }

    fn injector(&self, options: RewriteOptions) -> FontFamilyInjector<'_> {
        FontFamilyInjector::new(
            self,
            &self.tracker,
            self.minifier.as_ref(),
            &self.metrics,
            options,
        )
    }

    /// Module transform hook. Returns `None` when `id` is not a stylesheet or nothing changed.
    pub async fn transform(&self, code: &str, id: &str) -> Option<String> {
        if !should_transform(id) {
            return None;
        }
        self.injector(self.rewrite_options()).transform(code, id).await
    }

    /// Unions the font URLs of every module in `chunk` into its facade module id.
    pub fn render_chunk(&self, chunk: &RenderedChunk) {
        let Some(facade) = chunk.facade_module_id.as_deref() else {
            return;
        };
        self.tracker
            .merge(chunk.module_ids.iter().map(String::as_str), facade);
    }

    /// Rewrites every CSS asset of a finished bundle in place; returns how many changed.
    pub async fn transform_bundle(&self, bundle: &mut [BundleAsset]) -> usize {
        let injector = self.injector(RewriteOptions {
            dev: false,
            ..self.rewrite_options()
        });
        let mut changed = 0;
        for asset in bundle.iter_mut().filter(|a| is_css(&a.file_name)) {
            let rewritten = {
                let edits = injector.rewrite(&asset.source, &asset.file_name).await;
                edits.has_changed().then(|| edits.render())
            };
            if let Some(source) = rewritten {
                asset.source = source;
                changed += 1;
            }
        }
        changed
    }

    /// Plain `@font-face` blocks for every family marked `global`.
    pub async fn global_stylesheet(&self) -> String {
        let mut css = String::new();
        for family in self.options.families.iter().filter(|f| f.is_global()) {
            let Some(resolution) = self.resolver.resolve(family.name(), Some(family), None).await
            else {
                continue;
            };
            for font in &resolution.fonts {
                css.push_str(&render_font_face(family.name(), font));
                css.push('\n');
            }
        }
        css
    }

    /// Answers a dev-server request for a proxied font.
    ///
    /// `Ok(None)` means the path is not ours (outside the prefix or an unknown filename).
    pub async fn serve_font(&self, request_path: &str) -> Result<Option<FontResponse>> {
        let mount = join_url(self.assets.base(), &[self.assets.prefix()]);
        let path = module_id_without_query(request_path);
        let Some(filename) = path
            .strip_prefix(mount.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            return Ok(None);
        };
        if filename.is_empty() || filename.contains('/') {
            return Ok(None);
        }
        let Some(url) = self.assets.original_url(filename) else {
            return Ok(None);
        };
        let body = self.fonts.get(filename, &url).await?;
        Ok(Some(FontResponse {
            body,
            content_type: font_content_type(filename),
            cache_control: FONT_CACHE_CONTROL,
        }))
    }

    /// Directory under `out_dir` that proxied fonts are written to.
    pub fn fonts_dir(&self, out_dir: &Path) -> PathBuf {
        let mut dir = out_dir.to_path_buf();
        for segment in prefix_segments(self.assets.prefix()) {
            dir.push(segment);
        }
        dir
    }

    /// Wipes the fonts directory under `out_dir` and writes one file per proxied font.
    ///
    /// A font that cannot be fetched fails the whole emission.
    pub async fn emit_fonts(&self, out_dir: &Path) -> Result<usize> {
        let dir = self.fonts_dir(out_dir);
        // Never wipe the build output itself.
        if dir == out_dir {
            return Err(Error::InvalidOptions {
                message: format!(
                    "assets prefix `{}` does not name a directory",
                    self.assets.prefix()
                ),
            });
        }
        if dir.exists() {
            std::fs::remove_dir_all(&dir).map_err(|e| Error::cache_io(&dir, e))?;
        }
        let rendered = self.assets.rendered_urls();
        if rendered.is_empty() {
            return Ok(0);
        }
        std::fs::create_dir_all(&dir).map_err(|e| Error::cache_io(&dir, e))?;

        let written = try_join_all(rendered.iter().map(|(filename, url)| {
            let target = dir.join(filename);
            async move {
                let bytes = self.fonts.get(filename, url).await?;
                std::fs::write(&target, &bytes).map_err(|e| Error::cache_io(target, e))
            }
        }))
        .await?;
        Ok(written.len())
    }

    /// `<link rel="preload">` tags for the fonts recorded against `chunk_id`.
    ///
    /// Empty unless `experimental.addPreloadLinks` is set.
    pub fn preload_links(&self, chunk_id: &str) -> Vec<String> {
        if !self.options.experimental.add_preload_links {
            return Vec::new();
        }
        self.tracker
            .urls_for_chunk(chunk_id)
            .iter()
            .map(|url| {
                format!(
                    "<link rel=\"preload\" as=\"font\" href=\"{url}\" type=\"{}\" crossorigin>",
                    font_content_type(url)
                )
            })
            .collect()
    }

    fn lock_resolutions(&self) -> MutexGuard<'_, ResolutionCache> {
        self.resolutions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl FontFaceResolver for BuildSession {
    fn resolve_font_face<'a>(
        &'a self,
        family: &'a str,
        fallback: Option<&'a FallbackOptions>,
    ) -> BoxFuture<'a, Result<Option<FontFaceResolution>>> {
        Box::pin(async move {
            let font_override = self.options.family(family);
            // Global families live in the global stylesheet.
            if font_override.is_some_and(FontFamilyOverride::is_global) {
                return Ok(None);
            }

            let key = (family.to_string(), fallback.and_then(|f| f.generic));
            let cached = self.lock_resolutions().get(&key).cloned();
            if let Some(resolution) = cached {
                return Ok(resolution);
            }
            let resolution = self.resolver.resolve(family, font_override, fallback).await;
            self.lock_resolutions().insert(key, resolution.clone());
            Ok(resolution)
        })
    }
}

pub struct BuildSessionBuilder {
    options: FontOptions,
    mode: BuildMode,
    providers: ProviderRegistry,
    storage: Option<Arc<dyn CacheStorage>>,
    fetcher: Option<Arc<dyn FontFetcher>>,
    minifier: Option<Arc<dyn CssMinifier>>,
    metrics: FontMetricsTable,
    cache_options: CachedDataOptions,
}

impl BuildSessionBuilder {
    pub fn new(options: FontOptions) -> Self {
        Self {
            options,
            mode: BuildMode::default(),
            providers: ProviderRegistry::new(),
            storage: None,
            fetcher: None,
            minifier: None,
            metrics: FontMetricsTable::builtin(),
            cache_options: CachedDataOptions::default(),
        }
    }

    pub fn mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn provider(mut self, provider: impl FontProvider + 'static) -> Self {
        self.providers.add_provider(provider);
        self
    }

    pub fn provider_arc(mut self, provider: Arc<dyn FontProvider>) -> Self {
        self.providers.add(provider);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn CacheStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn FontFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn minifier(mut self, minifier: Arc<dyn CssMinifier>) -> Self {
        self.minifier = Some(minifier);
        self
    }

    pub fn metrics(mut self, metrics: FontMetricsTable) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn cache_options(mut self, options: CachedDataOptions) -> Self {
        self.cache_options = options;
        self
    }

    pub fn build(self) -> Result<BuildSession> {
        validate(&self.options, &self.providers)?;

        let defaults = normalize_options(&self.options);
        let assets = Arc::new(PublicAssets::new(
            self.options.assets_prefix(),
            self.options.base(),
            self.mode,
        ));
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));
        let fetcher = self.fetcher.unwrap_or_else(|| Arc::new(OfflineFetcher));
        tracing::debug!(
            providers = self.providers.len(),
            families = self.options.families.len(),
            "font build session created"
        );
        Ok(BuildSession {
            resolver: FontResolver::new(defaults, self.providers, Arc::clone(&assets)),
            assets,
            tracker: ChunkTracker::new(),
            fonts: FontAssetCache::with_options(storage, fetcher, self.cache_options),
            minifier: self
                .minifier
                .unwrap_or_else(|| Arc::new(WhitespaceMinifier)),
            metrics: self.metrics,
            mode: self.mode,
            options: self.options,
            resolutions: Mutex::new(FxHashMap::default()),
        })
    }
}

/// Path segments of an assets prefix; absolute prefixes contribute their URL path.
fn prefix_segments(prefix: &str) -> Vec<String> {
    let path = if has_protocol(prefix) {
        let absolute = if prefix.starts_with("//") {
            format!("https:{prefix}")
        } else {
            prefix.to_string()
        };
        url::Url::parse(&absolute)
            .map(|u| u.path().to_string())
            .unwrap_or_default()
    } else {
        prefix.to_string()
    };
    path.split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .map(str::to_string)
        .collect()
}

fn validate(options: &FontOptions, providers: &ProviderRegistry) -> Result<()> {
    let prefix = options.assets_prefix();
    if prefix_segments(prefix).is_empty() {
        return Err(Error::InvalidOptions {
            message: format!("assets prefix `{prefix}` does not name a directory"),
        });
    }
    if let Some(family) = options.families.iter().find(|f| f.name().trim().is_empty()) {
        return Err(Error::InvalidOptions {
            message: format!("font family override with empty name: {family:?}"),
        });
    }
    let order = options
        .defaults
        .as_ref()
        .and_then(|d| d.providers.as_deref())
        .unwrap_or_default();
    if let Some(unknown) = order.iter().find(|name| providers.get(name).is_none()) {
        return Err(Error::InvalidOptions {
            message: format!("unknown default provider `{unknown}`"),
        });
    }
    Ok(())
}
