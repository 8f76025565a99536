//! Maps caller-supplied file paths into the managed output directory.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

const SUFFIX: &str = ".csv";
const FALLBACK_FILE_NAME: &str = "dataset.csv";

#[derive(Debug, Clone)]
pub struct PathResolver {
    /// Absolute output directory.
    root: PathBuf,
    /// The output directory as configured, used to recognise relative paths
    /// that already point inside it.
    prefix: Vec<String>,
}

impl PathResolver {
    pub fn new(output_dir: &Path) -> io::Result<Self> {
        let root = std::path::absolute(output_dir)?;
        let prefix = if output_dir.is_absolute() {
            Vec::new()
        } else {
            normal_components(output_dir).unwrap_or_default()
        };
        Ok(Self { root, prefix })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `file_path` against the output directory, creating it if needed.
    ///
    /// Paths not ending in `.csv` get a name derived from `language`.
    /// Relative paths outside the output directory keep only their file name.
    /// Absolute paths are returned unchanged.
    pub fn resolve(&self, file_path: &str, language: Option<&str>) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.root)?;

        let path = Path::new(file_path);
        if !file_path.ends_with(SUFFIX) {
            return Ok(self.root.join(default_file_name(language)));
        }

        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }

        if let Some(inner) = self.inside_output(path) {
            let resolved = self.root.join(inner);
            if let Some(parent) = resolved.parent() {
                fs::create_dir_all(parent)?;
            }
            return Ok(resolved);
        }

        let name = path.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path has no file name: {file_path}"),
            )
        })?;
        Ok(self.root.join(name))
    }

    /// Returns the part of `path` below the output directory, if `path` is
    /// spelled relative to it and never steps outside.
    fn inside_output(&self, path: &Path) -> Option<PathBuf> {
        if self.prefix.is_empty() {
            return None;
        }
        let parts = normal_components(path)?;
        if parts.len() <= self.prefix.len() || parts[..self.prefix.len()] != self.prefix[..] {
            return None;
        }
        Some(parts[self.prefix.len()..].iter().collect())
    }
}

/// `<language>_dataset.csv`, lower-cased, reduced to a single safe path segment.
pub fn default_file_name(language: Option<&str>) -> String {
    match language.map(str::trim).filter(|l| !l.is_empty()) {
        Some(lang) => {
            let stem: String = lang
                .to_lowercase()
                .chars()
                .map(|c| {
                    if c.is_alphanumeric() || c == '-' || c == '_' {
                        c
                    } else {
                        '_'
                    }
                })
                .collect();
            format!("{stem}_dataset{SUFFIX}")
        }
        None => FALLBACK_FILE_NAME.to_string(),
    }
}

/// Plain components of a relative path, skipping `.`; `None` on `..` or roots.
fn normal_components(path: &Path) -> Option<Vec<String>> {
    let mut out = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(s) => out.push(s.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(out)
}
