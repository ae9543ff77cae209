// Configuration module: resolves the step inputs from the environment into a
// single immutable `Config` and expands the filename pattern into the list of
// local files to upload.

use anyhow::{Context, Result};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

pub const FILENAME_INPUT: &str = "filename";
pub const NAME_INPUT: &str = "name";
pub const FOLDER_ID_INPUT: &str = "folderId";
pub const CREDENTIALS_INPUT: &str = "credentials";
pub const OVERWRITE_INPUT: &str = "overwrite";
pub const MIME_TYPE_INPUT: &str = "mimeType";
pub const USE_COMPLETE_SOURCE_NAME_INPUT: &str = "useCompleteSourceFilenameAsName";
pub const MIRROR_DIRECTORY_STRUCTURE_INPUT: &str = "mirrorDirectoryStructure";
pub const NAME_PREFIX_INPUT: &str = "namePrefix";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Input {0} is missing or empty")]
    MissingInput(&'static str),
}

/// Resolved options for one run. Built once in `main` and handed by
/// reference to everything else.
#[derive(Clone)]
pub struct Config {
    pub filename: String,
    pub name: Option<String>,
    pub folder_id: String,
    pub credentials: String,
    pub overwrite: bool,
    pub mime_type: Option<String>,
    pub use_complete_source_name: bool,
    pub mirror_directory_structure: bool,
    pub name_prefix: Option<String>,
}

impl Config {
    /// Read the inputs from `INPUT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup. `lookup` receives
    /// the environment variable name (e.g. `INPUT_FOLDERID`).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let input = |name: &str| -> String {
            lookup(&input_env_name(name))
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };
        let required = |name: &'static str| -> Result<String, ConfigError> {
            let value = input(name);
            if value.is_empty() {
                return Err(ConfigError::MissingInput(name));
            }
            Ok(value)
        };
        let optional = |name: &str| Some(input(name)).filter(|v| !v.is_empty());

        let filename = required(FILENAME_INPUT)?;

        let raw_overwrite = input(OVERWRITE_INPUT);
        if raw_overwrite.is_empty() {
            warn!("Overwrite is disabled.");
        }
        let overwrite = parse_bool(&raw_overwrite);

        let folder_id = required(FOLDER_ID_INPUT)?;
        let credentials = required(CREDENTIALS_INPUT)?;

        Ok(Config {
            filename,
            name: optional(NAME_INPUT),
            folder_id,
            credentials,
            overwrite,
            mime_type: optional(MIME_TYPE_INPUT),
            use_complete_source_name: parse_bool(&input(USE_COMPLETE_SOURCE_NAME_INPUT)),
            mirror_directory_structure: parse_bool(&input(MIRROR_DIRECTORY_STRUCTURE_INPUT)),
            name_prefix: optional(NAME_PREFIX_INPUT),
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("filename", &self.filename)
            .field("name", &self.name)
            .field("folder_id", &self.folder_id)
            .field("credentials", &"<redacted>")
            .field("overwrite", &self.overwrite)
            .field("mime_type", &self.mime_type)
            .field("use_complete_source_name", &self.use_complete_source_name)
            .field("mirror_directory_structure", &self.mirror_directory_structure)
            .field("name_prefix", &self.name_prefix)
            .finish()
    }
}

/// Environment variable holding a step input: `INPUT_` + upper-cased name
/// with spaces replaced by underscores.
pub fn input_env_name(name: &str) -> String {
    format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
}

/// Lenient boolean parsing. Unrecognised values are `false`.
pub fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "t" | "T" | "TRUE" | "true" | "True")
}

/// Expand a shell glob into the matched paths, sorted. A malformed pattern
/// or an empty match is an error.
pub fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let entries = glob::glob(pattern)
        .with_context(|| format!("Invalid filename pattern: {}", pattern))?;
    let files = entries
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to read a path matched by the filename pattern")?;
    info!("Files: {:?}", files);
    if files.is_empty() {
        anyhow::bail!("No file found! pattern: {}", pattern);
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (input_env_name(k), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn complete() -> Vec<(&'static str, &'static str)> {
        vec![
            ("filename", "dist/*.zip"),
            ("folderId", "folder-123"),
            ("credentials", "e30="),
        ]
    }

    #[test]
    fn env_names_follow_runner_convention() {
        assert_eq!(input_env_name("folderId"), "INPUT_FOLDERID");
        assert_eq!(input_env_name("name prefix"), "INPUT_NAME_PREFIX");
    }

    #[test]
    fn each_missing_required_input_is_named() {
        for missing in ["filename", "folderId", "credentials"] {
            let vars: Vec<_> = complete()
                .into_iter()
                .filter(|(k, _)| *k != missing)
                .collect();
            let err = Config::from_lookup(lookup(&vars)).unwrap_err();
            assert_eq!(err, ConfigError::MissingInput(missing));
            assert_eq!(err.to_string(), format!("Input {} is missing or empty", missing));
        }
    }

    #[test]
    fn whitespace_only_counts_as_missing() {
        let mut vars = complete();
        vars[1] = ("folderId", "   ");
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert_eq!(err, ConfigError::MissingInput("folderId"));
    }

    #[test]
    fn optional_inputs_and_flags() {
        let mut vars = complete();
        vars.extend([
            ("overwrite", "true"),
            ("mirrorDirectoryStructure", "1"),
            ("useCompleteSourceFilenameAsName", "yes"),
            ("namePrefix", "nightly-"),
            ("mimeType", ""),
        ]);
        let cfg = Config::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(cfg.filename, "dist/*.zip");
        assert_eq!(cfg.folder_id, "folder-123");
        assert!(cfg.overwrite);
        assert!(cfg.mirror_directory_structure);
        assert!(!cfg.use_complete_source_name);
        assert_eq!(cfg.name_prefix.as_deref(), Some("nightly-"));
        assert_eq!(cfg.mime_type, None);
        assert_eq!(cfg.name, None);
    }

    #[test]
    fn debug_output_hides_credentials() {
        let mut vars = complete();
        vars[2] = ("credentials", "c2VjcmV0LWtleQ==");
        let cfg = Config::from_lookup(lookup(&vars)).unwrap();
        let debug = format!("{:?}", cfg);
        assert!(!debug.contains("c2VjcmV0LWtleQ=="));
        assert!(debug.contains("folder-123"));
    }

    #[test]
    fn parse_bool_accepts_only_known_spellings() {
        for v in ["1", "t", "T", "TRUE", "true", "True"] {
            assert!(parse_bool(v), "{v}");
        }
        for v in ["", "0", "false", "yes", "on", "tRuE"] {
            assert!(!parse_bool(v), "{v}");
        }
    }

    #[test]
    fn expand_pattern_sorts_matches() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.txt", "a.txt", "c.log"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        let pattern = format!("{}/*.txt", dir.path().display());
        let files = expand_pattern(&pattern).unwrap();
        assert_eq!(files, vec![dir.path().join("a.txt"), dir.path().join("b.txt")]);
    }

    #[test]
    fn expand_pattern_without_matches_names_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.nothing", dir.path().display());
        let err = expand_pattern(&pattern).unwrap_err();
        assert_eq!(err.to_string(), format!("No file found! pattern: {}", pattern));
    }

    #[test]
    fn expand_pattern_rejects_malformed_glob() {
        let err = expand_pattern("dist/[*.zip").unwrap_err();
        assert!(err.to_string().starts_with("Invalid filename pattern"));
    }
}
