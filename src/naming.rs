// Destination name resolution. The first matching rule wins:
// complete source path, then prefix + base name, then explicit name, then
// the base name unchanged.

use std::path::Path;

use crate::config::Config;

/// The naming-related subset of the configuration.
#[derive(Debug, Clone, Default)]
pub struct NameOptions {
    pub use_complete_source_name: bool,
    pub name_prefix: Option<String>,
    pub name: Option<String>,
}

impl From<&Config> for NameOptions {
    fn from(config: &Config) -> Self {
        NameOptions {
            use_complete_source_name: config.use_complete_source_name,
            name_prefix: config.name_prefix.clone(),
            name: config.name.clone(),
        }
    }
}

pub fn resolve_name(path: &Path, options: &NameOptions) -> String {
    if options.use_complete_source_name {
        return escape_spaces(&path.to_string_lossy());
    }
    let base = base_name(path);
    if let Some(prefix) = &options.name_prefix {
        return format!("{}{}", prefix, base);
    }
    if let Some(name) = &options.name {
        return name.clone();
    }
    base
}

/// Escape embedded spaces with a backslash.
pub fn escape_spaces(s: &str) -> String {
    s.replace(' ', "\\ ")
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
