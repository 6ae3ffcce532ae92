//! Vertical/horizontal font metrics used to size metric-compatible fallbacks.
//!
//! Values are in font units (capsize layout): `descent` is negative.

use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    pub ascent: f64,
    pub descent: f64,
    pub line_gap: f64,
    pub units_per_em: f64,
    pub x_width_avg: f64,
}

impl FontMetrics {
    pub const fn new(
        ascent: f64,
        descent: f64,
        line_gap: f64,
        units_per_em: f64,
        x_width_avg: f64,
    ) -> Self {
        Self {
            ascent,
            descent,
            line_gap,
            units_per_em,
            x_width_avg,
        }
    }

    fn x_avg_ratio(&self) -> f64 {
        if self.units_per_em > 0.0 {
            self.x_width_avg / self.units_per_em
        } else {
            0.0
        }
    }
}

const BUILTIN_METRICS: &[(&str, FontMetrics)] = &[
    ("Arial", FontMetrics::new(1854.0, -434.0, 67.0, 2048.0, 904.0)),
    ("BlinkMacSystemFont", FontMetrics::new(1980.0, -432.0, 0.0, 2048.0, 910.0)),
    ("Courier New", FontMetrics::new(1705.0, -615.0, 0.0, 2048.0, 1229.0)),
    ("Georgia", FontMetrics::new(1878.0, -449.0, 0.0, 2048.0, 913.0)),
    ("Helvetica Neue", FontMetrics::new(952.0, -213.0, 28.0, 1000.0, 450.0)),
    ("Inter", FontMetrics::new(2728.0, -680.0, 0.0, 2816.0, 1335.0)),
    ("Lato", FontMetrics::new(1974.0, -426.0, 0.0, 2000.0, 884.0)),
    ("Merriweather", FontMetrics::new(1968.0, -546.0, 0.0, 2000.0, 1037.0)),
    ("Montserrat", FontMetrics::new(968.0, -251.0, 0.0, 1000.0, 525.0)),
    ("Open Sans", FontMetrics::new(2189.0, -600.0, 0.0, 2048.0, 1071.0)),
    ("Poppins", FontMetrics::new(1050.0, -350.0, 100.0, 1000.0, 516.0)),
    ("Roboto", FontMetrics::new(1900.0, -500.0, 0.0, 2048.0, 911.0)),
    ("Segoe UI", FontMetrics::new(2210.0, -514.0, 0.0, 2048.0, 908.0)),
    ("Times New Roman", FontMetrics::new(1825.0, -443.0, 87.0, 2048.0, 819.0)),
];

/// Case-insensitive family → metrics lookup.
#[derive(Debug, Clone)]
pub struct FontMetricsTable {
    entries: FxHashMap<String, FontMetrics>,
}

impl Default for FontMetricsTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FontMetricsTable {
    pub fn empty() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (family, metrics) in BUILTIN_METRICS {
            table.insert(family, *metrics);
        }
        table
    }

    pub fn insert(&mut self, family: &str, metrics: FontMetrics) {
        self.entries.insert(family.to_ascii_lowercase(), metrics);
    }

    pub fn with_family(mut self, family: &str, metrics: FontMetrics) -> Self {
        self.insert(family, metrics);
        self
    }

    pub fn get(&self, family: &str) -> Option<&FontMetrics> {
        self.entries.get(&family.trim().to_ascii_lowercase())
    }
}

/// Override values (as ratios) that make `fallback` occupy the same box as `primary`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MetricOverrides {
    pub size_adjust: f64,
    pub ascent: f64,
    pub descent: f64,
    pub line_gap: f64,
}

pub(crate) fn metric_overrides(
    primary: &FontMetrics,
    fallback: Option<&FontMetrics>,
) -> MetricOverrides {
    let primary_ratio = primary.x_avg_ratio();
    let size_adjust = match fallback.map(FontMetrics::x_avg_ratio) {
        Some(fallback_ratio) if primary_ratio > 0.0 && fallback_ratio > 0.0 => {
            primary_ratio / fallback_ratio
        }
        _ => 1.0,
    };
    let em = primary.units_per_em * size_adjust;
    MetricOverrides {
        size_adjust,
        ascent: primary.ascent / em,
        descent: primary.descent.abs() / em,
        line_gap: primary.line_gap / em,
    }
}

/// `0.904296875` → `"90.4297%"`.
pub(crate) fn to_percentage(value: f64) -> String {
    let pct = (value * 100.0 * 10_000.0).round() / 10_000.0;
    format!("{pct}%")
}
