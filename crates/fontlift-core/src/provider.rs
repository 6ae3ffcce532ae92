//! Font provider seam and registry.

use crate::config::FontOptions;
use crate::model::{FontFaceData, ResolveFontFacesOptions};
use crate::{Error, Result};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// What a provider returns for one family.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderResolution {
    pub fonts: Vec<FontFaceData>,
    pub fallbacks: Option<Vec<String>>,
}

/// Translates a family name plus options into concrete font faces (e.g. a remote catalog).
pub trait FontProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Called once per build before any resolution.
    fn setup<'a>(&'a self, _options: &'a FontOptions) -> BoxFuture<'a, Result<()>> {
        Box::pin(futures::future::ready(Ok(())))
    }

    /// `Ok(None)` means the provider does not know the family.
    fn resolve_font_faces<'a>(
        &'a self,
        family: &'a str,
        options: &'a ResolveFontFacesOptions,
    ) -> BoxFuture<'a, Result<Option<ProviderResolution>>>;
}

#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn FontProvider>>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| p.name()))
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, provider: Arc<dyn FontProvider>) {
        self.providers.push(provider);
    }

    pub fn add_provider(&mut self, provider: impl FontProvider + 'static) {
        self.add(Arc::new(provider));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn FontProvider>> {
        self.providers.iter().find(|p| p.name() == name)
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn FontProvider>> {
        self.providers.iter()
    }

    /// Providers tried for families without an explicit provider: `order` when given (unknown
    /// names are skipped), otherwise registration order.
    pub fn default_order(&self, order: Option<&[String]>) -> Vec<&Arc<dyn FontProvider>> {
        match order {
            Some(names) => names.iter().filter_map(|name| self.get(name)).collect(),
            None => self.providers.iter().collect(),
        }
    }

    /// Runs every provider's `setup` concurrently; the first failure wins.
    pub async fn setup_all(&self, options: &FontOptions) -> Result<()> {
        let results =
            futures::future::join_all(self.providers.iter().map(|p| p.setup(options))).await;
        for (provider, result) in self.providers.iter().zip(results) {
            result.map_err(|err| Error::Provider {
                provider: provider.name().to_string(),
                message: err.to_string(),
            })?;
        }
        Ok(())
    }
}
