//! Per-submission device options.

use crate::config::PrinterConfig;
use std::collections::BTreeMap;

/// Option map passed verbatim to the printing system.
///
/// Precedence, lowest to highest: built-in defaults from `[printer]`,
/// `[printer.options]`, then caller overrides.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrintOptions(BTreeMap<String, String>);

impl PrintOptions {
    pub fn from_config(config: &PrinterConfig) -> Self {
        let mut map = BTreeMap::new();
        map.insert("media".to_string(), config.page_size.clone());
        map.insert("MediaType".to_string(), config.media_type.clone());
        map.insert("Resolution".to_string(), config.resolution.clone());
        map.insert("ColorModel".to_string(), config.color_model.clone());
        map.insert("PageSize".to_string(), config.page_size.clone());
        map.insert(
            "FitToPage".to_string(),
            if config.fit_to_page { "True" } else { "False" }.to_string(),
        );
        map.insert("Scaling".to_string(), config.scaling.to_string());
        for (key, value) in &config.options {
            map.insert(key.clone(), value.clone());
        }
        Self(map)
    }

    /// Return a copy with `overrides` applied on top.
    pub fn with_overrides<K, V>(mut self, overrides: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in overrides {
            self.0.insert(key.into(), value.into());
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_stock_config() {
        let opts = PrintOptions::from_config(&PrinterConfig::default());
        assert_eq!(opts.get("MediaType"), Some("Cardstock"));
        assert_eq!(opts.get("PageSize"), Some("Custom.2.5x3.5in"));
        assert_eq!(opts.get("media"), Some("Custom.2.5x3.5in"));
        assert_eq!(opts.get("Resolution"), Some("300dpi"));
        assert_eq!(opts.get("ColorModel"), Some("RGB"));
        assert_eq!(opts.get("FitToPage"), Some("False"));
        assert_eq!(opts.get("Scaling"), Some("100"));
        assert_eq!(opts.len(), 7);
    }

    #[test]
    fn config_options_override_defaults() {
        let mut config = PrinterConfig::default();
        config.options.insert("MediaType".into(), "Glossy".into());
        config.options.insert("print-quality".into(), "5".into());
        let opts = PrintOptions::from_config(&config);
        assert_eq!(opts.get("MediaType"), Some("Glossy"));
        assert_eq!(opts.get("print-quality"), Some("5"));
    }

    #[test]
    fn caller_overrides_win() {
        let mut config = PrinterConfig::default();
        config.options.insert("ColorModel".into(), "CMYK".into());
        let opts = PrintOptions::from_config(&config)
            .with_overrides([("ColorModel", "Gray"), ("MediaType", "Plain")]);
        assert_eq!(opts.get("ColorModel"), Some("Gray"));
        assert_eq!(opts.get("MediaType"), Some("Plain"));
    }

    #[test]
    fn iteration_is_sorted_by_key() {
        let opts = PrintOptions::default().with_overrides([("b", "2"), ("a", "1")]);
        let keys: Vec<&str> = opts.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
