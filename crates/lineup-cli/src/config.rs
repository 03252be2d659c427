use lineup_core::lifecycle::DEFAULT_MODEL_FILE_NAME;
use lineup_core::types::ParseVariantError;
use lineup_core::{LifecycleConfig, Variant};
use std::path::PathBuf;

/// CLI configuration, loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the trained model (default: $XDG_DATA_HOME/lineup).
    pub data_dir: PathBuf,
    /// Algorithm variant (default: lbph).
    pub variant: Variant,
    /// Model file name inside `data_dir`.
    pub model_file_name: String,
}

impl Config {
    /// Load configuration from `LINEUP_*` environment variables with defaults.
    pub fn from_env() -> Result<Self, ParseVariantError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ParseVariantError> {
        let data_dir = lookup("LINEUP_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                lookup("XDG_DATA_HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| {
                        let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                        PathBuf::from(home).join(".local/share")
                    })
                    .join("lineup")
            });

        let variant = match lookup("LINEUP_VARIANT") {
            Some(v) => v.parse()?,
            None => Variant::Lbph,
        };

        Ok(Self {
            data_dir,
            variant,
            model_file_name: lookup("LINEUP_MODEL_FILE")
                .unwrap_or_else(|| DEFAULT_MODEL_FILE_NAME.to_string()),
        })
    }

    pub fn lifecycle_config(&self) -> LifecycleConfig {
        LifecycleConfig {
            storage_root: self.data_dir.clone(),
            model_file_name: self.model_file_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("HOME", "/home/ada")])).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/home/ada/.local/share/lineup"));
        assert_eq!(config.variant, Variant::Lbph);
        assert_eq!(config.model_file_name, DEFAULT_MODEL_FILE_NAME);
    }

    #[test]
    fn test_xdg_data_home() {
        let config = Config::from_lookup(lookup(&[("XDG_DATA_HOME", "/data"), ("HOME", "/home/ada")])).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/data/lineup"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("LINEUP_DATA_DIR", "/srv/faces"),
            ("LINEUP_VARIANT", "Fisher"),
            ("LINEUP_MODEL_FILE", "fisher.json"),
        ]))
        .unwrap();
        assert_eq!(config.variant, Variant::Fisher);
        assert_eq!(config.lifecycle_config().model_path(), PathBuf::from("/srv/faces/fisher.json"));
    }

    #[test]
    fn test_bad_variant() {
        assert!(Config::from_lookup(lookup(&[("LINEUP_VARIANT", "haar")])).is_err());
    }
}
