//! Run configuration.
//!
//! # Loading
//!
//! ```text
//! locsync.yaml | locsync.yml | locsync.json   (JSON parses as YAML)
//!   -> RawConfig   (everything optional, camelCase keys)
//!   -> Config      (defaults filled, validated, paths resolved)
//! ```
//!
//! [`Config::from_raw`] is the only constructor. It collects every
//! validation problem instead of stopping at the first one. A `Config` is
//! never mutated after construction; share it as `Arc<Config>`.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError, ValidationError};
use crate::types::FormatTag;

/// Config file names probed, in order, by [`find_config_in`].
pub const CONFIG_FILE_NAMES: &[&str] = &["locsync.yaml", "locsync.yml", "locsync.json"];

pub const DEFAULT_BATCH_SIZE: usize = 15;
pub const DEFAULT_SOURCE_LANGUAGE: &str = "English";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

// ---------------------------------------------------------------------------
// Raw (as authored)
// ---------------------------------------------------------------------------

/// Config exactly as written on disk. Every field is optional here;
/// required-ness is enforced by [`Config::from_raw`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConfig {
    pub batch_size: Option<i64>,
    pub instructions: Option<PathBuf>,
    pub verbose: Option<bool>,
    pub backend: Option<RawBackend>,
    pub source: Option<RawSource>,
    pub targets: Option<Vec<RawTarget>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBackend {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key_env: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSource {
    pub file: Option<PathBuf>,
    pub format: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub outputs: Vec<RawOutput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTarget {
    pub language: Option<String>,
    pub file: Option<PathBuf>,
    pub format: Option<String>,
    pub instructions: Option<PathBuf>,
    #[serde(default)]
    pub outputs: Vec<RawOutput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOutput {
    pub file: Option<PathBuf>,
    pub format: Option<String>,
}

// ---------------------------------------------------------------------------
// Validated
// ---------------------------------------------------------------------------

/// Number of candidates sent per batch call. `1` disables batching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSize(NonZeroUsize);

impl BatchSize {
    pub fn new(size: usize) -> Option<Self> {
        NonZeroUsize::new(size).map(Self)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }

    pub fn is_batching(self) -> bool {
        self.get() > 1
    }
}

impl Default for BatchSize {
    fn default() -> Self {
        Self(NonZeroUsize::MIN.saturating_add(DEFAULT_BATCH_SIZE - 1))
    }
}

/// Translation backend settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub model: String,
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// A secondary materialization of a record set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpec {
    pub file: PathBuf,
    pub format: Option<FormatTag>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub file: PathBuf,
    pub format: Option<FormatTag>,
    pub language: String,
    pub outputs: Vec<OutputSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub language: String,
    pub file: PathBuf,
    pub format: Option<FormatTag>,
    pub instructions: Option<PathBuf>,
    pub outputs: Vec<OutputSpec>,
}

/// Validated, immutable configuration for one synchronization run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Config {
    pub batch_size: BatchSize,
    /// Global instructions file, appended to every target's backend guidance.
    pub instructions: Option<PathBuf>,
    pub verbose: bool,
    pub backend: BackendConfig,
    pub source: SourceSpec,
    pub targets: Vec<TargetSpec>,
    /// Directory relative paths were resolved against.
    pub base_dir: PathBuf,
}

impl Config {
    /// Load and validate a config file. Relative paths inside it are
    /// resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        let raw: RawConfig = serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::from_raw(raw, base_dir)
    }

    /// Fill defaults, validate, and resolve paths. Fails with every problem found.
    pub fn from_raw(raw: RawConfig, base_dir: &Path) -> Result<Self, ConfigError> {
        let mut errors = Vec::new();
        let resolve = |p: &Path| -> PathBuf {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base_dir.join(p)
            }
        };

        let batch_size = match raw.batch_size {
            None => BatchSize::default(),
            Some(n) => match usize::try_from(n).ok().and_then(BatchSize::new) {
                Some(size) => size,
                None => {
                    errors.push(ValidationError::new(
                        "batchSize",
                        format!("must be a positive integer, got {n}"),
                    ));
                    BatchSize::default()
                }
            },
        };

        let raw_source = raw.source.unwrap_or_default();
        let source_file = non_empty_path(raw_source.file.as_deref());
        if source_file.is_none() {
            errors.push(ValidationError::new("source.file", "is required"));
        }
        let source = SourceSpec {
            file: source_file.map(&resolve).unwrap_or_default(),
            format: parse_format(raw_source.format.as_deref(), "source.format", &mut errors),
            language: raw_source
                .language
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SOURCE_LANGUAGE.to_string()),
            outputs: parse_outputs(&raw_source.outputs, "source", &resolve, &mut errors),
        };

        let raw_targets = raw.targets.unwrap_or_default();
        if raw_targets.is_empty() {
            errors.push(ValidationError::new("targets", "at least one target is required"));
        }
        let mut targets = Vec::with_capacity(raw_targets.len());
        let mut seen_files = HashSet::new();
        for (i, target) in raw_targets.into_iter().enumerate() {
            let language = target.language.filter(|l| !l.trim().is_empty());
            if language.is_none() {
                errors.push(ValidationError::new(
                    format!("targets[{i}].language"),
                    "is required",
                ));
            }
            let file = non_empty_path(target.file.as_deref()).map(&resolve);
            match &file {
                None => errors.push(ValidationError::new(
                    format!("targets[{i}].file"),
                    "is required",
                )),
                Some(file) if !seen_files.insert(file.clone()) => {
                    errors.push(ValidationError::new(
                        format!("targets[{i}].file"),
                        format!("{} is used by more than one target", file.display()),
                    ));
                }
                Some(file) if file == &source.file => {
                    errors.push(ValidationError::new(
                        format!("targets[{i}].file"),
                        "must differ from source.file",
                    ));
                }
                Some(_) => {}
            }
            let prefix = format!("targets[{i}]");
            targets.push(TargetSpec {
                language: language.unwrap_or_default(),
                file: file.unwrap_or_default(),
                format: parse_format(
                    target.format.as_deref(),
                    &format!("{prefix}.format"),
                    &mut errors,
                ),
                instructions: non_empty_path(target.instructions.as_deref()).map(&resolve),
                outputs: parse_outputs(&target.outputs, &prefix, &resolve, &mut errors),
            });
        }

        let raw_backend = raw.backend.unwrap_or_default();
        let defaults = BackendConfig::default();
        let backend = BackendConfig {
            model: raw_backend.model.unwrap_or(defaults.model),
            base_url: raw_backend
                .base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            api_key_env: raw_backend.api_key_env.unwrap_or(defaults.api_key_env),
            timeout: raw_backend
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        };
        if backend.timeout.is_zero() {
            errors.push(ValidationError::new(
                "backend.timeoutSecs",
                "must be greater than zero",
            ));
        }

        if !errors.is_empty() {
            return Err(ConfigError::Invalid(errors));
        }

        Ok(Self {
            batch_size,
            instructions: non_empty_path(raw.instructions.as_deref()).map(&resolve),
            verbose: raw.verbose.unwrap_or(false),
            backend,
            source,
            targets,
            base_dir: base_dir.to_path_buf(),
        })
    }

    /// Every file whose change should trigger a re-run in watch mode.
    pub fn input_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.source.file.clone()];
        paths.extend(self.instructions.iter().cloned());
        paths.extend(self.targets.iter().filter_map(|t| t.instructions.clone()));
        paths.sort();
        paths.dedup();
        paths
    }
}

/// Locate the first existing config file in `dir`.
pub fn find_config_in(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Starter config written by `locsync init`.
pub fn starter_config() -> &'static str {
    r#"# locsync configuration
batchSize: 15
# instructions: prompts/global.md
source:
  file: strings/en.csv
  language: English
targets:
  - language: French
    file: strings/fr.csv
  - language: German
    file: strings/de.csv
"#
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn non_empty_path(path: Option<&Path>) -> Option<&Path> {
    path.filter(|p| !p.as_os_str().is_empty())
}

fn parse_format(
    value: Option<&str>,
    field: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<FormatTag> {
    let value = value?;
    match value.parse() {
        Ok(tag) => Some(tag),
        Err(message) => {
            errors.push(ValidationError::new(field, message));
            None
        }
    }
}

fn parse_outputs(
    outputs: &[RawOutput],
    prefix: &str,
    resolve: &impl Fn(&Path) -> PathBuf,
    errors: &mut Vec<ValidationError>,
) -> Vec<OutputSpec> {
    let mut parsed = Vec::with_capacity(outputs.len());
    for (i, output) in outputs.iter().enumerate() {
        let field = format!("{prefix}.outputs[{i}]");
        let Some(file) = non_empty_path(output.file.as_deref()) else {
            errors.push(ValidationError::new(format!("{field}.file"), "is required"));
            continue;
        };
        parsed.push(OutputSpec {
            file: resolve(file),
            format: parse_format(output.format.as_deref(), &format!("{field}.format"), errors),
        });
    }
    parsed
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn minimal() -> RawConfig {
        RawConfig {
            source: Some(RawSource {
                file: Some("en.csv".into()),
                ..Default::default()
            }),
            targets: Some(vec![RawTarget {
                language: Some("French".into()),
                file: Some("fr.csv".into()),
                ..Default::default()
            }]),
            ..Default::default()
        }
    }

    fn problems(err: ConfigError) -> Vec<String> {
        match err {
            ConfigError::Invalid(errors) => errors.into_iter().map(|e| e.field_path).collect(),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_filled() {
        let config = Config::from_raw(minimal(), Path::new("/work")).expect("valid");
        assert_eq!(config.batch_size.get(), DEFAULT_BATCH_SIZE);
        assert_eq!(config.source.language, "English");
        assert_eq!(config.source.file, PathBuf::from("/work/en.csv"));
        assert_eq!(config.targets[0].file, PathBuf::from("/work/fr.csv"));
        assert_eq!(config.backend, BackendConfig::default());
        assert!(!config.verbose);
    }

    #[test]
    fn missing_everything_reports_all_fields() {
        let fields = problems(Config::from_raw(RawConfig::default(), Path::new(".")).unwrap_err());
        assert_eq!(fields, vec!["source.file", "targets"]);
    }

    #[test]
    fn non_positive_batch_size_is_rejected() {
        for n in [0, -3] {
            let mut raw = minimal();
            raw.batch_size = Some(n);
            let fields = problems(Config::from_raw(raw, Path::new(".")).unwrap_err());
            assert_eq!(fields, vec!["batchSize"]);
        }
    }

    #[test]
    fn target_without_language_or_file_is_rejected() {
        let mut raw = minimal();
        raw.targets = Some(vec![RawTarget::default()]);
        let fields = problems(Config::from_raw(raw, Path::new(".")).unwrap_err());
        assert_eq!(fields, vec!["targets[0].language", "targets[0].file"]);
    }

    #[test]
    fn duplicate_target_files_are_rejected() {
        let mut raw = minimal();
        let target = raw.targets.as_ref().unwrap()[0].clone();
        raw.targets = Some(vec![target.clone(), target]);
        let fields = problems(Config::from_raw(raw, Path::new(".")).unwrap_err());
        assert_eq!(fields, vec!["targets[1].file"]);
    }

    #[test]
    fn unknown_format_is_rejected() {
        let mut raw = minimal();
        raw.source.as_mut().unwrap().format = Some("xml".into());
        let fields = problems(Config::from_raw(raw, Path::new(".")).unwrap_err());
        assert_eq!(fields, vec!["source.format"]);
    }

    #[test]
    fn load_reports_not_found() {
        let dir = TempDir::new().expect("tempdir");
        let err = Config::load(&dir.path().join("locsync.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn load_resolves_against_config_dir() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("locsync.yaml");
        std::fs::write(&path, starter_config()).expect("write");
        let config = Config::load(&path).expect("load");
        assert_eq!(config.source.file, dir.path().join("strings/en.csv"));
        assert_eq!(config.targets.len(), 2);
    }

    #[test]
    fn find_config_prefers_yaml() {
        let dir = TempDir::new().expect("tempdir");
        assert!(find_config_in(dir.path()).is_none());
        std::fs::write(dir.path().join("locsync.json"), "{}").expect("write");
        std::fs::write(dir.path().join("locsync.yaml"), "").expect("write");
        assert_eq!(
            find_config_in(dir.path()),
            Some(dir.path().join("locsync.yaml"))
        );
    }

    #[test]
    fn input_paths_include_instructions() {
        let mut raw = minimal();
        raw.instructions = Some("global.md".into());
        raw.targets.as_mut().unwrap()[0].instructions = Some("fr.md".into());
        let config = Config::from_raw(raw, Path::new("/w")).expect("valid");
        assert_eq!(
            config.input_paths(),
            vec![
                PathBuf::from("/w/en.csv"),
                PathBuf::from("/w/fr.md"),
                PathBuf::from("/w/global.md"),
            ]
        );
    }
}
