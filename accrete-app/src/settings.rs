//! Patch configuration from an optional JSON file plus command line overrides.

use crate::errors::AppError;
use accrete_core::{PatchConfig, StrategyKind};
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use tracing::debug;

/// Values given on the command line; each one wins over the file.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub step: Option<usize>,
    pub strategy: Option<StrategyKind>,
}

/// Read `path` (if any), apply `overrides` and validate the result.
///
/// Fields missing from the file keep their defaults.
pub fn load_patch_config(path: Option<&Path>, overrides: Overrides) -> Result<PatchConfig, AppError> {
    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|source| AppError::ConfigRead {
                path: path.to_path_buf(),
                source,
            })?;
            let config: PatchConfig =
                serde_json::from_str(&text).map_err(|source| AppError::ConfigParse {
                    path: path.to_path_buf(),
                    source,
                })?;
            debug!("Loaded config from {}", path.display());
            config
        }
        None => PatchConfig::default(),
    };

    if let Some(step) = overrides.step {
        config = config.with_step(NonZeroUsize::new(step).ok_or(AppError::ZeroStep)?);
    }
    if let Some(strategy) = overrides.strategy {
        config = config.with_strategy(strategy);
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_without_file() {
        let config = load_patch_config(None, Overrides::default()).unwrap();
        assert_eq!(config, PatchConfig::default());
    }

    #[test]
    fn test_file_values_and_overrides() {
        let file = config_file(r#"{ "step": 5, "strategy": "greedy_grid", "excluded_classes": [0] }"#);

        let from_file = load_patch_config(Some(file.path()), Overrides::default()).unwrap();
        assert_eq!(from_file.step.get(), 5);
        assert_eq!(from_file.strategy, StrategyKind::GreedyGrid);
        assert_eq!(from_file.excluded_classes.len(), 1);

        let overridden = load_patch_config(
            Some(file.path()),
            Overrides {
                step: Some(1),
                strategy: Some(StrategyKind::Default),
            },
        )
        .unwrap();
        assert_eq!(overridden.step.get(), 1);
        assert_eq!(overridden.strategy, StrategyKind::Default);
        assert_eq!(overridden.excluded_classes, from_file.excluded_classes);
    }

    #[test]
    fn test_rejects_zero_step_and_bad_files() {
        let zero = Overrides {
            step: Some(0),
            strategy: None,
        };
        assert!(matches!(load_patch_config(None, zero), Err(AppError::ZeroStep)));

        let garbage = config_file("not json");
        assert!(matches!(
            load_patch_config(Some(garbage.path()), Overrides::default()),
            Err(AppError::ConfigParse { .. })
        ));

        let invalid = config_file(r#"{ "greedy_grid": { "voxel_size": 0.0 } }"#);
        assert!(matches!(
            load_patch_config(Some(invalid.path()), Overrides::default()),
            Err(AppError::Patch(_))
        ));

        assert!(matches!(
            load_patch_config(Some(Path::new("/nonexistent/accrete.json")), Overrides::default()),
            Err(AppError::ConfigRead { .. })
        ));
    }
}
