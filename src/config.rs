use std::path::{Path, PathBuf};

/// Runtime options of the compiler, mirrored by the CLI flags.
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Config {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub source_type: SourceType,
    pub log_level: Option<String>,
    /// Print the truth table for this state index instead of encoding.
    pub truth_table: Option<usize>,
}

/// Format of the program description file.
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize),
    serde(rename_all = "lowercase")
)]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum SourceType {
    #[default]
    Yaml,
    Json,
}

impl SourceType {
    /// Make a new [`SourceType`] from a given extension.
    pub fn from_extension(s: &str) -> Option<Self> {
        match s {
            "yml" | "yaml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_type_from_path() {
        assert_eq!(SourceType::from_path(Path::new("a/fsm.yaml")), SourceType::Yaml);
        assert_eq!(SourceType::from_path(Path::new("fsm.yml")), SourceType::Yaml);
        assert_eq!(SourceType::from_path(Path::new("fsm.json")), SourceType::Json);
        // Unknown extensions fall back to the default format.
        assert_eq!(SourceType::from_path(Path::new("fsm.txt")), SourceType::Yaml);
        assert_eq!(SourceType::from_path(Path::new("fsm")), SourceType::Yaml);
    }
}
