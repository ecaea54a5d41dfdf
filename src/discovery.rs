/// Target file discovery.
///
/// Files are found either by walking a path or by asking git which files a
/// commit (or `ref1...ref2` range) added, copied, modified or renamed.
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use ignore::WalkBuilder;
use tracing::{debug, info};

use crate::error::{Error, Result};

const SOURCE_SUFFIX: &str = ".go";
const TEST_SUFFIX: &str = "_test.go";

/// Where to look for files. The two modes are never combined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A single file or a directory walked recursively.
    Path(PathBuf),
    /// A commit reference or `ref1...ref2` range.
    ChangeSet(String),
}

/// Whether `path` names a Go source file that is not a test file.
#[must_use]
pub fn is_eligible(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| name.ends_with(SOURCE_SUFFIX) && !name.ends_with(TEST_SUFFIX))
}

/// Enumerate eligible files for `target`. An empty result is not an error.
pub fn discover(target: &Target) -> Result<Vec<PathBuf>> {
    discover_in(target, Path::new("."))
}

/// Like [`discover`], with change-sets resolved in the repository containing
/// `cwd`. Path targets are taken as given.
pub fn discover_in(target: &Target, cwd: &Path) -> Result<Vec<PathBuf>> {
    let files = match target {
        Target::Path(root) => files_under(root)?,
        Target::ChangeSet(reference) => {
            let changed = changed_files(reference, cwd)?;
            let mut files = Vec::new();
            for path in changed {
                if !path.exists() {
                    debug!("Skipping {} (not present in working tree)", path.display());
                    continue;
                }
                files.extend(files_under(&path)?);
            }
            files
        }
    };

    let mut seen = HashSet::new();
    Ok(files.into_iter().filter(|f| seen.insert(f.clone())).collect())
}

/// Eligible files at or below `root`.
fn files_under(root: &Path) -> Result<Vec<PathBuf>> {
    let metadata = std::fs::metadata(root).map_err(|e| {
        Error::Discovery(format!("error accessing {}: {e}", root.display()))
    })?;

    if !metadata.is_dir() {
        return Ok(if is_eligible(root) {
            vec![root.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry
            .map_err(|e| Error::Discovery(format!("error walking {}: {e}", root.display())))?;
        let is_file = entry.file_type().is_some_and(|t| t.is_file());
        if is_file && is_eligible(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

// ── Change-set mode ──────────────────────────────────────────────────

/// Files changed by `reference`, resolved against the repository root that
/// contains `cwd`.
pub fn changed_files(reference: &str, cwd: &Path) -> Result<Vec<PathBuf>> {
    let listing = git(
        cwd,
        &["diff", "--name-only", "--diff-filter=ACMR", reference],
    )?;
    info!("Changed files of {reference}:\n{listing}");

    let toplevel = git(cwd, &["rev-parse", "--show-toplevel"])?;
    let root = PathBuf::from(toplevel.trim());
    Ok(parse_name_only(&listing)
        .into_iter()
        .map(|relative| root.join(relative))
        .collect())
}

/// Split `git diff --name-only` output into paths.
fn parse_name_only(listing: &str) -> Vec<PathBuf> {
    listing
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn git(cwd: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .map_err(|e| Error::Discovery(format!("failed to execute git command: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Discovery(format!(
            "git {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_is_eligible() {
        assert!(is_eligible(Path::new("pkg/server.go")));
        assert!(!is_eligible(Path::new("pkg/server_test.go")));
        assert!(!is_eligible(Path::new("README.md")));
        assert!(!is_eligible(Path::new("pkg/go")));
    }

    #[test]
    fn test_discover_directory() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("internal/store")).unwrap();
        fs::create_dir_all(root.join(".hidden")).unwrap();
        fs::write(root.join("main.go"), "package main\n").unwrap();
        fs::write(root.join("main_test.go"), "package main\n").unwrap();
        fs::write(root.join("notes.txt"), "x").unwrap();
        fs::write(root.join("internal/store/store.go"), "package store\n").unwrap();
        fs::write(root.join(".hidden/gen.go"), "package hidden\n").unwrap();
        fs::write(root.join(".gitignore"), "internal/\n").unwrap();

        let files = discover(&Target::Path(root.to_path_buf())).unwrap();
        let mut names: Vec<String> = files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![".hidden/gen.go", "internal/store/store.go", "main.go"]
        );
    }

    #[test]
    fn test_discover_single_file() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("a.go");
        fs::write(&file, "package a\n").unwrap();
        assert_eq!(discover(&Target::Path(file.clone())).unwrap(), vec![file]);

        let test_file = temp.path().join("a_test.go");
        fs::write(&test_file, "package a\n").unwrap();
        assert!(discover(&Target::Path(test_file)).unwrap().is_empty());
    }

    #[test]
    fn test_discover_empty_directory() {
        let temp = tempdir().unwrap();
        assert!(discover(&Target::Path(temp.path().to_path_buf())).unwrap().is_empty());
    }

    #[test]
    fn test_discover_missing_path() {
        let temp = tempdir().unwrap();
        let err = discover(&Target::Path(temp.path().join("nope"))).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_parse_name_only() {
        let listing = "cmd/main.go\n\n  pkg/util.go \nREADME.md\n";
        assert_eq!(
            parse_name_only(listing),
            vec![
                PathBuf::from("cmd/main.go"),
                PathBuf::from("pkg/util.go"),
                PathBuf::from("README.md"),
            ]
        );
        assert!(parse_name_only("").is_empty());
    }

    #[test]
    fn test_changed_files_outside_repository() {
        let temp = tempdir().unwrap();
        let err = changed_files("HEAD", temp.path()).unwrap_err();
        assert!(matches!(err, Error::Discovery(_)));
    }

    fn git_ok(dir: &Path, args: &[&str]) -> bool {
        Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Initialize a repository in `dir`; `false` when git is not installed.
    fn init_repo(dir: &Path) -> bool {
        if !git_ok(dir, &["init", "-q"]) {
            return false;
        }
        git_ok(dir, &["config", "user.email", "dev@example.com"]);
        git_ok(dir, &["config", "user.name", "dev"]);
        git_ok(dir, &["config", "commit.gpgsign", "false"]);
        true
    }

    #[test]
    fn test_changed_files_in_repository() {
        let temp = tempdir().unwrap();
        let dir = temp.path();
        let run = |args: &[&str]| git_ok(dir, args);
        if !init_repo(dir) {
            return;
        }

        fs::write(dir.join("a.go"), "package a\n").unwrap();
        assert!(run(&["add", "."]));
        assert!(run(&["commit", "-q", "-m", "first"]));

        fs::write(dir.join("a.go"), "package a\n\nvar X = 1\n").unwrap();
        fs::write(dir.join("b_test.go"), "package a\n").unwrap();
        fs::write(dir.join("c.md"), "# c\n").unwrap();
        assert!(run(&["add", "."]));
        assert!(run(&["commit", "-q", "-m", "second"]));

        let changed = changed_files("HEAD^", dir).unwrap();
        let names: Vec<String> = changed
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .collect();
        assert_eq!(names, vec!["a.go", "b_test.go", "c.md"]);
        assert!(changed.iter().all(|p| p.exists()));

        let nothing = changed_files("HEAD", dir).unwrap();
        assert!(nothing.is_empty());

        let err = changed_files("no-such-ref", dir).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_discover_change_set_filters_and_skips_missing() {
        let temp = tempdir().unwrap();
        let dir = temp.path();
        if !init_repo(dir) {
            return;
        }
        fs::write(dir.join("a.go"), "package a\n").unwrap();
        assert!(git_ok(dir, &["add", "."]));
        assert!(git_ok(dir, &["commit", "-q", "-m", "first"]));

        fs::create_dir_all(dir.join("sub")).unwrap();
        fs::write(dir.join("a.go"), "package a\n\nvar X = 1\n").unwrap();
        fs::write(dir.join("a_test.go"), "package a\n").unwrap();
        fs::write(dir.join("notes.md"), "# notes\n").unwrap();
        fs::write(dir.join("sub/gone.go"), "package sub\n").unwrap();
        fs::write(dir.join("sub/kept.go"), "package sub\n").unwrap();
        assert!(git_ok(dir, &["add", "."]));
        assert!(git_ok(dir, &["commit", "-q", "-m", "second"]));
        fs::remove_file(dir.join("sub/gone.go")).unwrap();

        let files = discover_in(&Target::ChangeSet("HEAD^".to_string()), dir).unwrap();
        let names: Vec<String> = files
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .collect();
        assert_eq!(names, vec!["a.go", "kept.go"]);
    }

    #[test]
    fn test_discover_change_set_without_candidates() {
        let temp = tempdir().unwrap();
        let dir = temp.path();
        if !init_repo(dir) {
            return;
        }
        fs::write(dir.join("a.go"), "package a\n").unwrap();
        assert!(git_ok(dir, &["add", "."]));
        assert!(git_ok(dir, &["commit", "-q", "-m", "first"]));
        fs::write(dir.join("a_test.go"), "package a\n").unwrap();
        fs::write(dir.join("README.md"), "# a\n").unwrap();
        assert!(git_ok(dir, &["add", "."]));
        assert!(git_ok(dir, &["commit", "-q", "-m", "docs and tests"]));

        let files = discover_in(&Target::ChangeSet("HEAD^".to_string()), dir).unwrap();
        assert!(files.is_empty());

        let err = discover_in(&Target::ChangeSet("nope^".to_string()), dir).unwrap_err();
        assert!(err.is_fatal());
    }
}
