//! Version extraction from project manifests at a given ref.
//!
//! Each candidate is probed in order and yields a typed result; the reader
//! collapses those into "first version found, or absent".

use crate::config::ManifestConfig;
use crate::error::ManifestError;
use crate::git::ContentSource;
use tracing::debug;

/// Supported manifest flavors, detected from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// `package.json`: top-level `version`
    PackageJson,
    /// `pyproject.toml` / `project.toml`: `tool.poetry.version`, `project.version`
    /// or top-level `version`
    ProjectToml,
}

impl ManifestFormat {
    pub fn detect(path: &str) -> Option<Self> {
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".json") {
            Some(ManifestFormat::PackageJson)
        } else if lower.ends_with(".toml") {
            Some(ManifestFormat::ProjectToml)
        } else {
            None
        }
    }
}

/// Extract the version string from manifest content
pub fn parse_version(
    format: ManifestFormat,
    path: &str,
    content: &str,
) -> Result<String, ManifestError> {
    let parse_error = |reason: String| ManifestError::Parse {
        path: path.to_string(),
        reason,
    };

    let version = match format {
        ManifestFormat::PackageJson => {
            let value: serde_json::Value =
                serde_json::from_str(content).map_err(|e| parse_error(e.to_string()))?;
            value
                .get("version")
                .and_then(|v| v.as_str())
                .map(str::to_string)
        }
        ManifestFormat::ProjectToml => {
            let table: toml::Table =
                toml::from_str(content).map_err(|e| parse_error(e.to_string()))?;
            toml_version(&table)
        }
    };

    version
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ManifestError::MissingVersion {
            path: path.to_string(),
        })
}

fn toml_version(table: &toml::Table) -> Option<String> {
    let lookup = |keys: &[&str]| -> Option<String> {
        let (last, parents) = keys.split_last()?;
        let mut current = table;
        for key in parents {
            current = current.get(*key)?.as_table()?;
        }
        current.get(*last)?.as_str().map(str::to_string)
    };

    lookup(&["tool", "poetry", "version"])
        .or_else(|| lookup(&["project", "version"]))
        .or_else(|| lookup(&["version"]))
}

/// Reads a version string from the first manifest candidate that has one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestReader {
    project_path: String,
    candidates: Vec<String>,
}

impl ManifestReader {
    pub fn new(project_path: impl Into<String>, candidates: Vec<String>) -> Self {
        ManifestReader {
            project_path: project_path.into(),
            candidates,
        }
    }

    pub fn from_config(config: &ManifestConfig) -> Self {
        ManifestReader::new(config.project_path.clone(), config.candidates.clone())
    }

    /// Candidate paths scoped to the project directory, in probe order
    pub fn candidate_paths(&self) -> Vec<String> {
        let base = self.base();
        self.candidates
            .iter()
            .map(|candidate| {
                let candidate = candidate.trim_start_matches("./");
                if base.is_empty() {
                    candidate.to_string()
                } else {
                    format!("{}/{}", base, candidate)
                }
            })
            .collect()
    }

    /// Probe a single manifest at `rev`
    pub fn probe<S>(&self, source: &S, rev: &str, path: &str) -> Result<String, ManifestError>
    where
        S: ContentSource + ?Sized,
    {
        let format = ManifestFormat::detect(path).ok_or_else(|| {
            ManifestError::UnsupportedFormat {
                path: path.to_string(),
            }
        })?;

        let content = source
            .read_file(rev, path)
            .map_err(|e| ManifestError::Backend {
                path: path.to_string(),
                source: e,
            })?
            .ok_or_else(|| ManifestError::NotFound {
                rev: rev.to_string(),
                path: path.to_string(),
            })?;

        parse_version(format, path, &content)
    }

    fn base(&self) -> &str {
        let base = self
            .project_path
            .trim()
            .trim_start_matches("./")
            .trim_matches('/');
        if base == "." {
            ""
        } else {
            base
        }
    }

    /// Manifests anywhere under the project directory at `rev`, for when no
    /// candidate sits at the expected path.
    ///
    /// Ordered by candidate file name, then shallowest first, then by path.
    pub fn discover_paths<S>(&self, source: &S, rev: &str) -> Vec<String>
    where
        S: ContentSource + ?Sized,
    {
        let files = match source.list_files(rev) {
            Ok(files) => files,
            Err(e) => {
                debug!(rev, reason = %e, "manifest discovery skipped");
                return Vec::new();
            }
        };
        let prefix = match self.base() {
            "" => String::new(),
            base => format!("{}/", base),
        };

        let mut found = Vec::new();
        for candidate in &self.candidates {
            let name = candidate.rsplit('/').next().unwrap_or(candidate);
            let mut matches: Vec<&String> = files
                .iter()
                .filter(|path| path.starts_with(&prefix))
                .filter(|path| path.rsplit('/').next() == Some(name))
                .filter(|path| !found.contains(*path))
                .collect();
            let depth = |path: &str| path.matches('/').count();
            matches.sort_by(|a, b| (depth(a), a).cmp(&(depth(b), b)));
            found.extend(matches.into_iter().cloned());
        }
        found
    }

    /// First version found across the candidates at `rev`, or `None`.
    ///
    /// Candidates at their expected paths win; otherwise the tree is searched
    /// for manifests with a candidate's file name. Never fails: missing and
    /// malformed manifests are skipped.
    pub fn read_version<S>(&self, source: &S, rev: &str) -> Option<String>
    where
        S: ContentSource + ?Sized,
    {
        let expected = self.candidate_paths();
        if let Some(version) = self.first_version(source, rev, &expected) {
            return Some(version);
        }

        let discovered: Vec<String> = self
            .discover_paths(source, rev)
            .into_iter()
            .filter(|path| !expected.contains(path))
            .collect();
        self.first_version(source, rev, &discovered)
    }

    fn first_version<S>(&self, source: &S, rev: &str, paths: &[String]) -> Option<String>
    where
        S: ContentSource + ?Sized,
    {
        for path in paths {
            match self.probe(source, rev, path) {
                Ok(version) => {
                    debug!(rev, path = %path, version = %version, "version detected");
                    return Some(version);
                }
                Err(e) => debug!(rev, path = %path, reason = %e, "manifest skipped"),
            }
        }
        None
    }
}

impl Default for ManifestReader {
    fn default() -> Self {
        ManifestReader::from_config(&ManifestConfig::default())
    }
}
