//! Project scanner for candidate route-bearing source files

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// The project tree could not be read
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Project root not found: {0}")]
    RootMissing(PathBuf),

    #[error("Project root unreadable: {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A candidate file with its content loaded
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the scanned root, used in source locations
    pub relative: String,
    pub content: String,
}

/// Conventional entry points always considered by the auth profiler
pub const ENTRY_POINTS: &[&str] = &[
    "app.js", "server.js", "index.js", "main.js", "app.ts", "server.ts", "index.ts", "main.ts",
];

/// Patterns always excluded, whatever the configuration says
const DEFAULT_EXCLUDES: &[&str] = &["node_modules/**", ".routeprobe/**"];

/// Walks a project tree and returns files likely to declare routes
pub struct SourceScanner {
    root: PathBuf,
    exclude_patterns: GlobSet,
    extensions: Vec<String>,
}

impl SourceScanner {
    /// Create a scanner with default excludes and JS/TS extensions
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let settings = crate::config::Settings::default();
        Self::with_config(root, &settings.scan_exclude, &settings.source_extensions)
    }

    /// Create a scanner with custom exclude patterns and extensions
    pub fn with_config(root: impl Into<PathBuf>, excludes: &[String], extensions: &[String]) -> Self {
        let mut builder = GlobSetBuilder::new();

        for pattern in DEFAULT_EXCLUDES {
            if let Ok(glob) = Glob::new(pattern) {
                builder.add(glob);
            }
        }

        for pattern in excludes {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => tracing::warn!("Ignoring invalid exclude pattern {}: {}", pattern, e),
            }
        }

        Self {
            root: root.into(),
            exclude_patterns: builder.build().unwrap_or_else(|_| GlobSet::empty()),
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the tree and return candidate files in walk order
    ///
    /// Only an unreadable root is an error; unreadable entries below it are
    /// skipped.
    pub fn scan(&self) -> Result<Vec<PathBuf>, ScanError> {
        if !self.root.exists() {
            return Err(ScanError::RootMissing(self.root.clone()));
        }
        std::fs::read_dir(&self.root).map_err(|source| ScanError::RootUnreadable {
            path: self.root.clone(),
            source,
        })?;

        let walker = WalkBuilder::new(&self.root)
            .hidden(true)
            .git_ignore(true)
            .git_exclude(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if self.is_excluded(path) {
                continue;
            }
            if self.is_candidate(path) {
                files.push(path.to_path_buf());
            }
        }

        tracing::debug!("Scanner found {} candidate files", files.len());
        Ok(files)
    }

    /// Scan and load every candidate as text; files that fail to load are skipped
    pub fn load(&self) -> Result<Vec<SourceFile>, ScanError> {
        let files = self.scan()?;
        let mut sources = Vec::with_capacity(files.len());
        for path in files {
            match std::fs::read_to_string(&path) {
                Ok(content) => sources.push(SourceFile {
                    relative: self.relative(&path),
                    path,
                    content,
                }),
                Err(e) => tracing::debug!("Skipping {}: {}", path.display(), e),
            }
        }
        Ok(sources)
    }

    /// Read a single named file under the root (e.g. package.json)
    pub fn read_root_file(&self, name: &str) -> Option<String> {
        std::fs::read_to_string(self.root.join(name)).ok()
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };
        if self.exclude_patterns.is_match(relative) {
            return true;
        }
        relative.components().any(|c| c.as_os_str() == "node_modules")
    }

    /// Source files with a known extension, minus test and probe files
    fn is_candidate(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let lower = name.to_lowercase();
        if lower.contains(".test.") || lower.contains(".spec.") || lower.ends_with(".d.ts") {
            return false;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions.iter().any(|e| e == &ext.to_lowercase())
    }
}
