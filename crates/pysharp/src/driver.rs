//! Batch translation of a source tree.

use crate::config::PysharpConfig;
use ignore::WalkBuilder;
use pysharp_lower::{Diagnostic, ReadError, Reader, Writer};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Target language every translation is written in.
pub const TARGET_LANGUAGE: &str = "csharp";

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("source path does not exist: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("no reader for `.{0}` files")]
    NoReader(String),

    #[error("no writer for language `{0}`")]
    NoWriter(String),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Read { path: PathBuf, source: ReadError },

    #[error("{}: {source}", path.display())]
    Lower { path: PathBuf, source: Diagnostic },

    #[error("watch failed: {0}")]
    Watch(#[from] notify::Error),
}

impl DriverError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        DriverError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Resolved settings for one run: CLI flags layered over configuration.
#[derive(Debug, Clone)]
pub struct Options {
    /// Directory or single file given on the command line.
    pub source: PathBuf,
    /// Directory mirroring the source layout, if outputs are not written in place.
    pub out_dir: Option<PathBuf>,
    pub source_extension: String,
    pub target_extension: String,
    pub respect_gitignore: bool,
}

impl Options {
    pub fn new(source: PathBuf, out_dir: Option<PathBuf>, config: &PysharpConfig) -> Self {
        let root = source_root(&source);
        let out_dir = out_dir.or_else(|| config.output.dir.as_ref().map(|dir| root.join(dir)));
        Self {
            source,
            out_dir,
            source_extension: config.source.extension().to_string(),
            target_extension: config.output.extension().to_string(),
            respect_gitignore: config.source.respect_gitignore(),
        }
    }

    /// Directory that relative output paths are computed from.
    pub fn root(&self) -> PathBuf {
        source_root(&self.source)
    }
}

/// Directory holding `source`, or `source` itself when it is a directory.
pub fn source_root(source: &Path) -> PathBuf {
    if source.is_dir() {
        source.to_path_buf()
    } else {
        source
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Outcome of one successfully translated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub output: PathBuf,
    pub warnings: usize,
}

/// Totals for a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub translated: usize,
    pub failed: usize,
    pub warnings: usize,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    fn record(&mut self, result: &Result<FileOutcome, DriverError>) {
        match result {
            Ok(outcome) => {
                self.translated += 1;
                self.warnings += outcome.warnings;
            }
            Err(_) => self.failed += 1,
        }
    }
}

/// Translates files with the reader for the source extension and the C# writer.
pub struct Driver {
    options: Options,
    reader: &'static dyn Reader,
    writer: &'static dyn Writer,
}

impl Driver {
    pub fn new(options: Options) -> Result<Self, DriverError> {
        if !options.source.exists() {
            return Err(DriverError::MissingSource(options.source));
        }
        let reader = pysharp_lower::reader_for_extension(&options.source_extension)
            .ok_or_else(|| DriverError::NoReader(options.source_extension.clone()))?;
        let writer = pysharp_lower::writer_for_language(TARGET_LANGUAGE)
            .ok_or_else(|| DriverError::NoWriter(TARGET_LANGUAGE.to_string()))?;
        Ok(Self {
            options,
            reader,
            writer,
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Whether `path` names a file this driver translates.
    pub fn is_source(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some(self.options.source_extension.as_str())
    }

    /// All source files under the source path, honouring .gitignore when configured.
    pub fn discover(&self) -> Vec<PathBuf> {
        if self.options.source.is_file() {
            return vec![self.options.source.clone()];
        }

        let walker = WalkBuilder::new(&self.options.source)
            .hidden(true)
            .git_ignore(self.options.respect_gitignore)
            .git_exclude(self.options.respect_gitignore)
            .build();

        let mut files: Vec<PathBuf> = walker
            .flatten()
            .map(|entry| entry.into_path())
            .filter(|path| path.is_file() && self.is_source(path))
            .filter(|path| !self.is_output_location(path))
            .collect();
        files.sort();
        files
    }

    fn is_output_location(&self, path: &Path) -> bool {
        self.options
            .out_dir
            .as_ref()
            .is_some_and(|dir| path.starts_with(dir))
    }

    /// Where the translation of `input` is written.
    pub fn output_path(&self, input: &Path) -> PathBuf {
        let ext = &self.options.target_extension;
        match &self.options.out_dir {
            None => input.with_extension(ext),
            Some(dir) => {
                let root = self.options.root();
                let relative = input
                    .strip_prefix(&root)
                    .ok()
                    .map(Path::to_path_buf)
                    .or_else(|| input.file_name().map(PathBuf::from))
                    .unwrap_or_else(|| input.to_path_buf());
                dir.join(relative).with_extension(ext)
            }
        }
    }

    /// Translate one file. A failing file writes nothing.
    pub fn translate_file(&self, path: &Path) -> Result<FileOutcome, DriverError> {
        let source = std::fs::read_to_string(path).map_err(|e| DriverError::io(path, e))?;
        let module = self.reader.read(&source).map_err(|source| DriverError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let translation = self.writer.write(&module).map_err(|source| DriverError::Lower {
            path: path.to_path_buf(),
            source,
        })?;

        for warning in &translation.warnings {
            tracing::warn!("{}: {}", path.display(), warning);
        }

        let output = self.output_path(path);
        if let Some(parent) = output.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| DriverError::io(parent, e))?;
        }
        let mut text = translation.text;
        text.push('\n');
        std::fs::write(&output, text).map_err(|e| DriverError::io(&output, e))?;

        tracing::info!("{} -> {}", path.display(), output.display());
        Ok(FileOutcome {
            output,
            warnings: translation.warnings.len(),
        })
    }

    /// Delete the output belonging to a removed source file.
    /// Returns whether anything was deleted.
    pub fn remove_output(&self, path: &Path) -> Result<bool, DriverError> {
        let output = self.output_path(path);
        match std::fs::remove_file(&output) {
            Ok(()) => {
                tracing::info!("removed {}", output.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DriverError::io(&output, e)),
        }
    }

    /// Translate every discovered file in parallel. Failures are logged and counted.
    pub fn run_batch(&self) -> BatchReport {
        let files = self.discover();
        tracing::debug!("{} source files under {}", files.len(), self.options.source.display());

        let results: Vec<_> = files.par_iter().map(|path| self.translate_file(path)).collect();

        let mut report = BatchReport::default();
        for result in &results {
            if let Err(e) = result {
                tracing::error!("{e}");
            }
            report.record(result);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn driver(source: &Path, out_dir: Option<PathBuf>) -> Driver {
        let options = Options::new(source.to_path_buf(), out_dir, &PysharpConfig::default());
        Driver::new(options).unwrap()
    }

    #[test]
    fn test_output_next_to_source() {
        let dir = TempDir::new().unwrap();
        let driver = driver(dir.path(), None);
        let input = dir.path().join("Scripts").join("Player.py");
        assert_eq!(
            driver.output_path(&input),
            dir.path().join("Scripts").join("Player.cs")
        );
    }

    #[test]
    fn test_output_mirrored_under_dir() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let driver = driver(dir.path(), Some(out.clone()));
        let input = dir.path().join("Scripts").join("Player.py");
        assert_eq!(
            driver.output_path(&input),
            out.join("Scripts").join("Player.cs")
        );
    }

    #[test]
    fn test_config_output_dir_is_relative_to_root() {
        let dir = TempDir::new().unwrap();
        let config: PysharpConfig = toml::from_str("[output]\ndir = \"Generated\"\n").unwrap();
        let options = Options::new(dir.path().to_path_buf(), None, &config);
        assert_eq!(options.out_dir, Some(dir.path().join("Generated")));
    }

    #[test]
    fn test_missing_source() {
        let options = Options::new(
            PathBuf::from("/nonexistent/pysharp/source"),
            None,
            &PysharpConfig::default(),
        );
        assert!(matches!(
            Driver::new(options),
            Err(DriverError::MissingSource(_))
        ));
    }

    #[test]
    fn test_unknown_source_extension() {
        let dir = TempDir::new().unwrap();
        let config: PysharpConfig = toml::from_str("[source]\nextension = \"rb\"\n").unwrap();
        let options = Options::new(dir.path().to_path_buf(), None, &config);
        assert!(matches!(Driver::new(options), Err(DriverError::NoReader(ext)) if ext == "rb"));
    }

    #[test]
    fn test_source_root_of_bare_file_name() {
        assert_eq!(source_root(Path::new("Player.py")), PathBuf::from("."));
    }
}
