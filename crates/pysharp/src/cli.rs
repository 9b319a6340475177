//! Command-line arguments.

use clap::Parser;
use std::path::PathBuf;

/// Translate decorator-annotated Python sources to C#.
#[derive(Debug, Parser)]
#[command(name = "pysharp", version, about)]
pub struct Cli {
    /// Source directory or single file
    #[arg(required_unless_present = "schema")]
    pub source: Option<PathBuf>,

    /// Write outputs under DIR, mirroring the source layout
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Keep watching for changes after the initial batch
    #[arg(short, long)]
    pub watch: bool,

    /// Debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Print the configuration JSON schema and exit
    #[arg(long)]
    pub schema: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from(["pysharp", "Assets", "-o", "Generated", "-w", "-d"]);
        assert_eq!(cli.source, Some(PathBuf::from("Assets")));
        assert_eq!(cli.output, Some(PathBuf::from("Generated")));
        assert!(cli.watch);
        assert!(cli.debug);
    }

    #[test]
    fn test_schema_needs_no_source() {
        let cli = Cli::parse_from(["pysharp", "--schema"]);
        assert!(cli.schema);
        assert!(cli.source.is_none());
        assert!(Cli::try_parse_from(["pysharp"]).is_err());
    }
}
