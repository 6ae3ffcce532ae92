//! Resolution coordinator: turns a family name (plus optional override and fallback context)
//! into normalized font faces through manual data or the provider registry.

use crate::assets::PublicAssets;
use crate::config::NormalizedDefaults;
use crate::model::{
    FontFaceResolution, FontFamilyOverride, GenericFamily, NO_PROVIDER, ResolveFontFacesOptions,
};
use crate::provider::{FontProvider, ProviderRegistry};
use std::sync::Arc;

/// Fallback context taken from the declaration being rewritten.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallbackOptions {
    /// The author's own fallbacks after the primary family.
    pub fallbacks: Vec<String>,
    /// Generic keyword found in the family chain.
    pub generic: Option<GenericFamily>,
}

#[derive(Debug)]
pub struct FontResolver {
    defaults: NormalizedDefaults,
    providers: ProviderRegistry,
    assets: Arc<PublicAssets>,
}

impl FontResolver {
    pub fn new(
        defaults: NormalizedDefaults,
        providers: ProviderRegistry,
        assets: Arc<PublicAssets>,
    ) -> Self {
        Self {
            defaults,
            providers,
            assets,
        }
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn defaults(&self) -> &NormalizedDefaults {
        &self.defaults
    }

    pub async fn resolve(
        &self,
        family: &str,
        font_override: Option<&FontFamilyOverride>,
        fallback: Option<&FallbackOptions>,
    ) -> Option<FontFaceResolution> {
        let fallbacks = match font_override.and_then(FontFamilyOverride::fallbacks) {
            Some(explicit) => explicit.to_vec(),
            None => {
                let generic = fallback
                    .and_then(|f| f.generic)
                    .unwrap_or(GenericFamily::SansSerif);
                self.defaults.fallbacks_for(generic).to_vec()
            }
        };

        let provider_override = match font_override {
            Some(FontFamilyOverride::Manual(manual)) => {
                let fonts = self.assets.normalize_font_data([manual.face.clone()]);
                return Some(FontFaceResolution {
                    fonts,
                    fallbacks: Some(fallbacks),
                });
            }
            Some(FontFamilyOverride::Provider(p)) => Some(p),
            None => None,
        };
        if provider_override.and_then(|p| p.provider.as_deref()) == Some(NO_PROVIDER) {
            return None;
        }

        let mut options = ResolveFontFacesOptions {
            weights: self.defaults.weights.clone(),
            styles: self.defaults.styles.clone(),
            subsets: self.defaults.subsets.clone(),
            fallbacks,
        };
        if let Some(p) = provider_override {
            if let Some(weights) = &p.weights {
                options.weights = weights.iter().map(ToString::to_string).collect();
            }
            if let Some(styles) = &p.styles {
                options.styles = styles.clone();
            }
            if let Some(subsets) = &p.subsets {
                options.subsets = subsets.clone();
            }
        }

        if let Some(name) = provider_override.and_then(|p| p.provider.as_deref()) {
            match self.providers.get(name) {
                Some(provider) => {
                    let resolution = self.query(provider.as_ref(), family, &options).await;
                    if resolution.is_none() {
                        tracing::warn!(
                            "Could not produce font face declaration from `{name}` for font family `{family}`."
                        );
                    }
                    return resolution;
                }
                None => tracing::warn!(
                    "Unknown provider `{name}` for font family `{family}`. Falling back to default providers."
                ),
            }
        }

        let mut tried = 0;
        for provider in self
            .providers
            .default_order(self.defaults.providers.as_deref())
        {
            tried += 1;
            if let Some(resolution) = self.query(provider.as_ref(), family, &options).await {
                return Some(resolution);
            }
        }
        if tried > 0 {
            tracing::warn!(
                "Could not produce font face declaration for font family `{family}` from any of {tried} default providers."
            );
        }
        None
    }

    /// One provider call; errors and empty results both come back as `None`.
    async fn query(
        &self,
        provider: &dyn FontProvider,
        family: &str,
        options: &ResolveFontFacesOptions,
    ) -> Option<FontFaceResolution> {
        let result = match provider.resolve_font_faces(family, options).await {
            Ok(Some(result)) => result,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(
                    "Could not resolve font face for `{family}` from `{}` provider: {err}",
                    provider.name()
                );
                return None;
            }
        };
        let fonts = self.assets.normalize_font_data(result.fonts);
        if fonts.is_empty() {
            return None;
        }
        Some(FontFaceResolution {
            fonts,
            fallbacks: Some(result.fallbacks.unwrap_or_else(|| options.fallbacks.clone())),
        })
    }
}
