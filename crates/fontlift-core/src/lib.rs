#![forbid(unsafe_code)]

//! Build-time web font optimization (headless).
//!
//! Design goals:
//! - rewrite stylesheets so every used font family gets `@font-face` rules and metric-matched
//!   fallbacks, without touching the author's own `@font-face` blocks
//! - proxy remote font binaries under a local prefix, downloading each one at most once
//! - runtime-agnostic async APIs (no specific executor required)

pub mod assets;
pub mod config;
pub mod css;
pub mod download;
pub mod error;
pub mod model;
pub mod provider;
pub mod resolve;
pub mod session;
pub mod storage;
pub mod tracker;
pub mod transform;

pub use assets::PublicAssets;
pub use config::{BuildMode, FontOptions, NormalizedDefaults, normalize_options};
pub use css::{CssMinifier, FontMetrics, FontMetricsTable, WhitespaceMinifier};
pub use download::{FontAssetCache, FontFetcher, OfflineFetcher};
pub use error::{Error, Result};
pub use model::{
    FontFaceData, FontFaceResolution, FontFamilyOverride, FontSource, GenericFamily,
    NormalizedFontFaceData, RemoteFontSource, ResolveFontFacesOptions,
};
pub use provider::{FontProvider, ProviderRegistry, ProviderResolution};
pub use resolve::{FallbackOptions, FontResolver};
pub use session::{
    BuildSession, BuildSessionBuilder, BundleAsset, FontResponse, GLOBAL_STYLESHEET_ID,
    RenderedChunk, global_import,
};
pub use storage::{
    CacheStorage, CachedDataOptions, FsStorage, MemoryStorage, cached_data, cached_data_or_else,
};
pub use tracker::ChunkTracker;
pub use transform::{FontFaceResolver, FontFamilyInjector, RewriteOptions};

#[cfg(test)]
mod tests;
