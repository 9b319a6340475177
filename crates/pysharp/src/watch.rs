//! Re-translate sources as they change on disk.
//!
//! Events arrive from the OS watcher over an mpsc channel. A burst of events
//! is collected until the channel stays quiet for the debounce interval, then
//! each touched file is handled once.

use crate::driver::{Driver, DriverError};
use notify::{EventKind, RecursiveMode, Watcher, recommended_watcher};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

/// What happened to a source file within one debounce window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Written,
    Removed,
}

/// Changes collected for one debounce window. Later events for a path win.
#[derive(Debug, Default)]
pub struct Pending {
    changes: BTreeMap<PathBuf, Change>,
}

impl Pending {
    /// Record the source files an event touches.
    pub fn add(&mut self, event: &notify::Event, driver: &Driver) {
        let change = match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) => Change::Written,
            EventKind::Remove(_) => Change::Removed,
            _ => return,
        };
        for path in &event.paths {
            if driver.is_source(path) {
                self.changes.insert(path.clone(), change);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Apply every collected change, returning how many files failed.
    pub fn flush(&mut self, driver: &Driver) -> usize {
        let mut failed = 0;
        for (path, change) in std::mem::take(&mut self.changes) {
            if let Err(e) = apply(driver, &path, change) {
                tracing::error!("{e}");
                failed += 1;
            }
        }
        failed
    }
}

fn apply(driver: &Driver, path: &Path, change: Change) -> Result<(), DriverError> {
    // Renames arrive as modify events on a path that is already gone.
    if change == Change::Removed || !path.exists() {
        driver.remove_output(path)?;
    } else {
        driver.translate_file(path)?;
    }
    Ok(())
}

/// Watch the source root until the watcher shuts down.
pub fn watch(driver: &Driver, debounce: Duration) -> Result<(), DriverError> {
    let (tx, rx) = mpsc::channel();
    let mut watcher = recommended_watcher(move |res| {
        let _ = tx.send(res);
    })?;

    let root = driver.options().root();
    watcher.watch(&root, RecursiveMode::Recursive)?;
    tracing::info!("watching {}", root.display());

    let mut pending = Pending::default();
    loop {
        // Block for the first event of a burst, then drain until quiet.
        let first = match rx.recv() {
            Ok(event) => event,
            Err(_) => return Ok(()),
        };
        collect(first, &mut pending, driver);

        loop {
            match rx.recv_timeout(debounce) {
                Ok(event) => collect(event, &mut pending, driver),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    pending.flush(driver);
                    return Ok(());
                }
            }
        }

        if !pending.is_empty() {
            pending.flush(driver);
        }
    }
}

fn collect(event: notify::Result<notify::Event>, pending: &mut Pending, driver: &Driver) {
    match event {
        Ok(event) => pending.add(&event, driver),
        Err(e) => tracing::warn!("watch error: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PysharpConfig;
    use crate::driver::Options;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use tempfile::TempDir;

    fn driver(root: &Path) -> Driver {
        let options = Options::new(root.to_path_buf(), None, &PysharpConfig::default());
        Driver::new(options).unwrap()
    }

    fn event(kind: EventKind, path: &Path) -> notify::Event {
        notify::Event::new(kind).add_path(path.to_path_buf())
    }

    #[test]
    fn test_only_source_files_are_collected() {
        let dir = TempDir::new().unwrap();
        let driver = driver(dir.path());
        let mut pending = Pending::default();

        pending.add(
            &event(EventKind::Create(CreateKind::File), &dir.path().join("A.cs")),
            &driver,
        );
        assert!(pending.is_empty());

        pending.add(
            &event(EventKind::Create(CreateKind::File), &dir.path().join("A.py")),
            &driver,
        );
        assert!(!pending.is_empty());
    }

    #[test]
    fn test_flush_translates_and_removes() {
        let dir = TempDir::new().unwrap();
        let driver = driver(dir.path());
        let source = dir.path().join("Mover.py");
        std::fs::write(&source, "@public\nclass Mover:\n    pass\n").unwrap();

        let mut pending = Pending::default();
        pending.add(&event(EventKind::Modify(ModifyKind::Any), &source), &driver);
        assert_eq!(pending.flush(&driver), 0);
        let output = dir.path().join("Mover.cs");
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "public class Mover\n{\n}\n"
        );

        std::fs::remove_file(&source).unwrap();
        pending.add(&event(EventKind::Remove(RemoveKind::File), &source), &driver);
        assert_eq!(pending.flush(&driver), 0);
        assert!(!output.exists());
        assert!(pending.is_empty());
    }

    #[test]
    fn test_last_event_in_window_wins() {
        let dir = TempDir::new().unwrap();
        let driver = driver(dir.path());
        let source = dir.path().join("Gone.py");
        std::fs::write(dir.path().join("Gone.cs"), "stale").unwrap();

        let mut pending = Pending::default();
        pending.add(&event(EventKind::Create(CreateKind::File), &source), &driver);
        pending.add(&event(EventKind::Remove(RemoveKind::File), &source), &driver);
        assert_eq!(pending.flush(&driver), 0);
        assert!(!dir.path().join("Gone.cs").exists());
    }

    #[test]
    fn test_failing_file_is_counted() {
        let dir = TempDir::new().unwrap();
        let driver = driver(dir.path());
        let source = dir.path().join("Bad.py");
        std::fs::write(&source, "x = 1, 2\n").unwrap();

        let mut pending = Pending::default();
        pending.add(&event(EventKind::Modify(ModifyKind::Any), &source), &driver);
        assert_eq!(pending.flush(&driver), 1);
        assert!(!dir.path().join("Bad.cs").exists());
    }
}
