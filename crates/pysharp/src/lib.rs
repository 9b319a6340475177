//! Driver for the pysharp translator.
//!
//! Resolves configuration, finds source files, and runs each one through a
//! fresh [`pysharp_lower`] engine. Files are independent, so a batch runs in
//! parallel and one failing file never stops the rest.

pub mod cli;
pub mod config;
pub mod driver;
pub mod watch;

pub use cli::Cli;
pub use config::PysharpConfig;
pub use driver::{BatchReport, Driver, DriverError, FileOutcome, Options};

use std::path::Path;

/// JSON document printed by `--schema`.
pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "config_path": config::PROJECT_CONFIG,
        "format": "toml",
        "schema": schemars::schema_for!(PysharpConfig)
    })
}

/// Run a batch for `source`, then keep watching if asked.
pub fn run(source: &Path, out_dir: Option<&Path>, watch: bool) -> Result<BatchReport, DriverError> {
    let config = PysharpConfig::load(&driver::source_root(source));
    let options = Options::new(source.to_path_buf(), out_dir.map(Path::to_path_buf), &config);
    let driver = Driver::new(options)?;

    let report = driver.run_batch();
    tracing::info!(
        "{} translated, {} failed, {} warnings",
        report.translated,
        report.failed,
        report.warnings
    );

    if watch {
        watch::watch(&driver, config.watch.debounce())?;
    }
    Ok(report)
}
