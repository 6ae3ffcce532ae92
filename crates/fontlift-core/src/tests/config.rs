use crate::config::*;
use crate::model::{FontFamilyOverride, FontStyle, FontWeight, GenericFamily};

#[test]
fn empty_options_normalize_to_built_in_defaults() {
    let options = FontOptions::from_json_str("{}").unwrap();
    assert_eq!(options.assets_prefix(), DEFAULT_ASSETS_PREFIX);
    assert_eq!(options.base(), "/");
    assert!(!options.experimental.process_css_variables);

    let defaults = normalize_options(&options);
    assert_eq!(defaults.weights, vec!["400".to_string()]);
    assert_eq!(defaults.styles, vec![FontStyle::Normal, FontStyle::Italic]);
    assert_eq!(defaults.subsets.len(), 7);
    assert_eq!(defaults.subsets.last().map(String::as_str), Some("latin"));
    assert_eq!(defaults.fallbacks_for(GenericFamily::Serif), ["Times New Roman"]);
    assert_eq!(defaults.fallbacks_for(GenericFamily::SansSerif), ["Arial"]);
    assert_eq!(defaults.fallbacks_for(GenericFamily::SystemUi).len(), 5);
    assert!(defaults.fallbacks_for(GenericFamily::Emoji).is_empty());
    assert_eq!(defaults.providers, None);
}

#[test]
fn user_defaults_replace_built_in_lists() {
    let options = FontOptions::from_json_str(
        r#"{
            "defaults": {
                "weights": [300, "700"],
                "styles": ["oblique"],
                "subsets": ["latin"],
                "fallbacks": { "serif": ["Georgia"] },
                "providers": ["google"]
            },
            "assets": { "prefix": "/assets/fonts" },
            "base": "/docs/",
            "experimental": { "processCSSVariables": true, "addPreloadLinks": true }
        }"#,
    )
    .unwrap();
    let defaults = normalize_options(&options);
    assert_eq!(defaults.weights, vec!["300".to_string(), "700".to_string()]);
    assert_eq!(defaults.styles, vec![FontStyle::Oblique]);
    assert_eq!(defaults.subsets, vec!["latin".to_string()]);
    assert_eq!(defaults.fallbacks_for(GenericFamily::Serif), ["Georgia"]);
    assert_eq!(defaults.fallbacks_for(GenericFamily::SansSerif), ["Arial"]);
    assert_eq!(defaults.providers, Some(vec!["google".to_string()]));
    assert_eq!(options.assets_prefix(), "/assets/fonts");
    assert_eq!(options.base(), "/docs/");
    assert!(options.experimental.process_css_variables);
    assert!(options.experimental.add_preload_links);
}

#[test]
fn one_fallback_list_applies_to_every_generic() {
    let options =
        FontOptions::from_json_str(r#"{ "defaults": { "fallbacks": ["Verdana"] } }"#).unwrap();
    let defaults = normalize_options(&options);
    for generic in GenericFamily::ALL {
        assert_eq!(defaults.fallbacks_for(generic), ["Verdana"]);
    }
}

#[test]
fn family_overrides_are_manual_or_provider() {
    let options = FontOptions::from_json_str(
        r#"{
            "families": [
                { "name": "Brand", "src": "/fonts/brand.woff2", "weight": [100, 900], "global": true },
                { "name": "Inter", "provider": "google", "weights": [400, 700], "fallbacks": ["Arial"] },
                { "name": "Legacy", "provider": "none" }
            ]
        }"#,
    )
    .unwrap();

    let Some(FontFamilyOverride::Manual(brand)) = options.family("Brand") else {
        panic!("Brand should be a manual override");
    };
    assert!(brand.global);
    assert_eq!(brand.face.weight, Some(FontWeight::Range(100.0, 900.0)));

    let Some(FontFamilyOverride::Provider(inter)) = options.family("Inter") else {
        panic!("Inter should be a provider override");
    };
    assert_eq!(inter.provider.as_deref(), Some("google"));
    assert_eq!(options.family("Inter").unwrap().fallbacks(), Some(&["Arial".to_string()][..]));
    assert!(!options.family("Legacy").unwrap().is_global());
    assert!(options.family("Missing").is_none());
}

#[test]
fn malformed_options_are_invalid() {
    let err = FontOptions::from_json_str(r#"{ "families": 3 }"#).unwrap_err();
    assert!(matches!(err, crate::Error::InvalidOptions { .. }));
}

#[test]
fn build_mode_defaults_to_dev() {
    assert!(BuildMode::default().is_dev());
    assert!(!BuildMode::Build.is_dev());
}
