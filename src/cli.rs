/// Command line interface.
use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use crate::config::DEFAULT_CONFIG_PATH;
use crate::discovery::Target;

const EXAMPLES: &str = "Examples:
  gocmt -f /path/to/example.go
  gocmt -f /path/to/dir/
  gocmt -c HEAD
  gocmt -c HEAD^
  gocmt -c commitID1...commitID2";

#[derive(Parser, Debug)]
#[command(
    name = "gocmt",
    version,
    about = "Add missing documentation comments to Go code",
    after_help = EXAMPLES
)]
#[command(group(ArgGroup::new("target").required(true).args(["file", "commit"])))]
pub struct Cli {
    /// File or directory containing Go code
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Commit hash or reference (e.g., HEAD, HEAD^, commitID1...commitID2)
    #[arg(short = 'c', long = "commit", value_name = "REF")]
    pub commit: Option<String>,

    /// Number of concurrent executions (default: 1)
    #[arg(short = 'n', long = "concurrency", value_name = "N")]
    pub concurrency: Option<usize>,

    /// JSON configuration file
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

impl Cli {
    /// The discovery target selected by `-f` or `-c`.
    #[must_use]
    pub fn target(&self) -> Target {
        match (&self.file, &self.commit) {
            (Some(path), _) => Target::Path(path.clone()),
            (None, Some(reference)) => Target::ChangeSet(reference.clone()),
            // clap enforces that exactly one of the two is present.
            (None, None) => Target::Path(PathBuf::from(".")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    #[test]
    fn test_command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_file_mode() {
        let cli = Cli::try_parse_from(["gocmt", "-f", "pkg/", "-n", "4"]).unwrap();
        assert_eq!(cli.target(), Target::Path(PathBuf::from("pkg/")));
        assert_eq!(cli.concurrency, Some(4));
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn test_commit_mode() {
        let cli = Cli::try_parse_from(["gocmt", "-c", "abc123...def456"]).unwrap();
        assert_eq!(cli.target(), Target::ChangeSet("abc123...def456".to_string()));
        assert_eq!(cli.concurrency, None);
    }

    #[test]
    fn test_both_modes_rejected() {
        let err = Cli::try_parse_from(["gocmt", "-f", "a.go", "-c", "HEAD"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_no_mode_rejected() {
        let err = Cli::try_parse_from(["gocmt", "-n", "2"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_help_lists_examples() {
        let help = Cli::command().render_help().to_string();
        assert!(help.contains("gocmt -c HEAD^"));
    }
}
