//! File set expansion
//!
//! Resolves an upload root (a file or a directory, relative to the workspace
//! root) plus an optional glob into the set of files to upload. Every emitted
//! path is relative to the computed root and uses POSIX separators.

use crate::error::{Error, Result};
use globset::{GlobBuilder, GlobMatcher};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Pattern used when the caller gives no glob: every file, dotfiles included.
const MATCH_ALL: &str = "**";

/// Result of expanding one or more upload roots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// Absolute directory every entry of `files` is relative to
    pub absolute_root: PathBuf,
    /// Whether the given root was a directory (false for a single file)
    pub is_directory: bool,
    /// Relative POSIX paths of regular files
    pub files: Vec<String>,
}

impl Expansion {
    /// Absolute path of one of the expanded files
    pub fn source_path(&self, relative: &str) -> PathBuf {
        let joined = relative
            .split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.absolute_root.clone(), |path, segment| path.join(segment));
        lexical_normalize(&joined)
    }
}

/// Split a newline-delimited `path` input into individual roots.
pub fn split_roots(input: &str) -> Vec<&str> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Expand a single root against `workspace`.
///
/// A file root yields exactly its basename, relative to its parent directory.
/// A directory root is walked recursively and filtered through `glob`; the
/// result is sorted and free of duplicates.
pub fn expand(workspace: &Path, root: &str, glob: &str) -> Result<Expansion> {
    let absolute = resolve_root(workspace, root)?;

    let metadata = match std::fs::metadata(&absolute) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::NotFound(absolute));
        }
        Err(e) => return Err(Error::Io(e)),
    };

    if metadata.is_file() {
        if !glob.trim().is_empty() {
            return Err(Error::ConflictingGlob {
                path: absolute,
                glob: glob.to_string(),
            });
        }

        let parent = absolute
            .parent()
            .ok_or_else(|| Error::InvalidInput(format!("{} has no parent directory", absolute.display())))?
            .to_path_buf();
        let name = absolute
            .file_name()
            .ok_or_else(|| Error::InvalidInput(format!("{} has no file name", absolute.display())))?
            .to_str()
            .ok_or_else(|| Error::InvalidInput(format!("{} is not valid UTF-8", absolute.display())))?
            .to_string();

        debug!(root = %absolute.display(), "expanded single file root");
        return Ok(Expansion {
            absolute_root: parent,
            is_directory: false,
            files: vec![name],
        });
    }

    if !metadata.is_dir() {
        return Err(Error::InvalidInput(format!(
            "{} is neither a file nor a directory",
            absolute.display()
        )));
    }

    let matcher = compile_glob(glob)?;
    let mut files = walk_matching(&absolute, &matcher)?;
    files.sort();
    files.dedup();

    debug!(root = %absolute.display(), glob, count = files.len(), "expanded directory root");
    Ok(Expansion {
        absolute_root: absolute,
        is_directory: true,
        files,
    })
}

/// Expand several roots and merge them relative to the workspace root.
///
/// Each root is expanded on its own with the same glob. Files are re-expressed
/// relative to `workspace`, duplicates are dropped and the first-seen order is
/// kept (no re-sort across roots).
pub fn expand_roots(workspace: &Path, roots: &[&str], glob: &str) -> Result<Expansion> {
    let workspace = lexical_normalize(&to_absolute(workspace)?);
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for root in roots {
        let expansion = expand(&workspace, root, glob)?;
        for file in &expansion.files {
            let relative = relative_posix(&expansion.source_path(file), &workspace);
            if seen.insert(relative.clone()) {
                files.push(relative);
            }
        }
    }

    Ok(Expansion {
        absolute_root: workspace,
        is_directory: true,
        files,
    })
}

/// Resolve a caller-supplied root to an absolute, normalized path.
pub fn resolve_root(workspace: &Path, root: &str) -> Result<PathBuf> {
    let workspace = to_absolute(workspace)?;
    Ok(lexical_normalize(&workspace.join(root.trim())))
}

fn compile_glob(glob: &str) -> Result<GlobMatcher> {
    let trimmed = glob.trim();
    let pattern = trimmed.strip_prefix("./").unwrap_or(trimmed);
    let pattern = if pattern.is_empty() { MATCH_ALL } else { pattern };

    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| Error::InvalidGlob {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

    Ok(glob.compile_matcher())
}

fn walk_matching(root: &Path, matcher: &GlobMatcher) -> Result<Vec<String>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if is_broken_link(&e) => {
                warn!(path = ?e.path(), "skipping broken symlink");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| Error::InvalidInput(format!("{} escaped {}", entry.path().display(), root.display())))?;

        // Object keys are UTF-8; a lossy name would point at a file that does not exist
        if relative.to_str().is_none() {
            warn!(path = ?entry.path(), "skipping file with a non UTF-8 name");
            continue;
        }
        let relative = to_posix_path(relative);

        if matcher.is_match(&relative) {
            files.push(relative);
        }
    }

    Ok(files)
}

/// A link whose target is missing, as opposed to a loop or a permission failure.
fn is_broken_link(err: &walkdir::Error) -> bool {
    if err.loop_ancestor().is_some() {
        return false;
    }
    let missing = err
        .io_error()
        .is_some_and(|e| e.kind() == std::io::ErrorKind::NotFound);
    let is_link = err
        .path()
        .and_then(|path| std::fs::symlink_metadata(path).ok())
        .is_some_and(|metadata| metadata.file_type().is_symlink());
    missing && is_link
}

/// Convert a path to absolute without touching the filesystem.
fn to_absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Lexical path normalization: drops `.` and resolves `..` without following symlinks.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut components: Vec<Component> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                } else if !matches!(components.last(), Some(Component::RootDir | Component::Prefix(_))) {
                    components.push(component);
                }
            }
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

/// Convert a relative path to a `/`-separated string.
pub fn to_posix_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// POSIX path of `path` relative to `base`, climbing with `..` when needed.
fn relative_posix(path: &Path, base: &Path) -> String {
    if let Ok(inside) = path.strip_prefix(base) {
        return to_posix_path(inside);
    }

    let path_parts: Vec<Component> = path.components().collect();
    let base_parts: Vec<Component> = base.components().collect();
    let common = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = vec!["..".to_string(); base_parts.len() - common];
    parts.extend(
        path_parts[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("sub/deeper")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join(".hidden"), "h").unwrap();
        fs::write(root.join("sub/b.txt"), "b").unwrap();
        fs::write(root.join("sub/c.md"), "c").unwrap();
        fs::write(root.join("sub/deeper/d.txt"), "d").unwrap();
        dir
    }

    #[test]
    fn test_split_roots() {
        assert_eq!(split_roots("a\n\n  b/c  \n"), vec!["a", "b/c"]);
        assert!(split_roots("   ").is_empty());
    }

    #[test]
    fn test_expand_directory_matches_everything() {
        let dir = fixture();
        let expansion = expand(dir.path(), ".", "").unwrap();

        assert!(expansion.is_directory);
        assert_eq!(
            expansion.files,
            vec![".hidden", "a.txt", "sub/b.txt", "sub/c.md", "sub/deeper/d.txt"]
        );
    }

    #[test]
    fn test_expand_results_are_existing_files() {
        let dir = fixture();
        let expansion = expand(dir.path(), "", "**/*.txt").unwrap();

        let mut sorted = expansion.files.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted, expansion.files);

        for file in &expansion.files {
            assert!(expansion.source_path(file).is_file(), "{file} is not a file");
        }
    }

    #[test]
    fn test_expand_glob_is_relative_to_root() {
        let dir = fixture();

        let top_level = expand(dir.path(), ".", "*.txt").unwrap();
        assert_eq!(top_level.files, vec!["a.txt"]);

        let recursive = expand(dir.path(), ".", "**/*.txt").unwrap();
        assert_eq!(recursive.files, vec!["a.txt", "sub/b.txt", "sub/deeper/d.txt"]);

        let nested = expand(dir.path(), "sub", "*.md").unwrap();
        assert_eq!(nested.files, vec!["c.md"]);
        assert_eq!(nested.absolute_root, dir.path().join("sub"));
    }

    #[test]
    fn test_expand_single_file_root() {
        let dir = fixture();
        let expansion = expand(dir.path(), "sub/b.txt", "").unwrap();

        assert!(!expansion.is_directory);
        assert_eq!(expansion.absolute_root, dir.path().join("sub"));
        assert_eq!(expansion.files, vec!["b.txt"]);
    }

    #[test]
    fn test_expand_file_root_with_glob_conflicts() {
        let dir = fixture();
        let err = expand(dir.path(), "a.txt", "*.txt").unwrap_err();
        assert!(matches!(err, Error::ConflictingGlob { .. }));
    }

    #[test]
    fn test_expand_missing_root() {
        let dir = fixture();
        let err = expand(dir.path(), "nope", "").unwrap_err();
        assert!(matches!(err, Error::NotFound(path) if path.ends_with("nope")));
    }

    #[test]
    fn test_expand_invalid_glob() {
        let dir = fixture();
        let err = expand(dir.path(), ".", "[oops").unwrap_err();
        assert!(matches!(err, Error::InvalidGlob { .. }));
    }

    #[test]
    fn test_expand_absolute_root_ignores_workspace() {
        let dir = fixture();
        let root = dir.path().join("sub");
        let expansion = expand(Path::new("/does/not/matter"), root.to_str().unwrap(), "*.txt").unwrap();
        assert_eq!(expansion.files, vec!["b.txt"]);
    }

    #[test]
    fn test_expand_roots_keeps_first_seen_order() {
        let dir = fixture();
        let expansion = expand_roots(dir.path(), &["sub", "a.txt", "sub/b.txt"], "").unwrap();

        assert_eq!(expansion.absolute_root, dir.path());
        assert_eq!(
            expansion.files,
            vec!["sub/b.txt", "sub/c.md", "sub/deeper/d.txt", "a.txt"]
        );
    }

    #[test]
    fn test_expand_roots_propagates_missing_root() {
        let dir = fixture();
        let err = expand_roots(dir.path(), &["sub", "gone"], "").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_expand_skips_broken_symlink() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("dangling")).unwrap();

        let expansion = expand(dir.path(), ".", "").unwrap();
        assert_eq!(expansion.files, vec!["a.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_expand_follows_file_symlink() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::os::unix::fs::symlink(dir.path().join("a.txt"), dir.path().join("link.txt")).unwrap();

        let expansion = expand(dir.path(), ".", "").unwrap();
        assert_eq!(expansion.files, vec!["a.txt", "link.txt"]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_expand_skips_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join(OsStr::from_bytes(b"bad\xff.txt")), "b").unwrap();

        let expansion = expand(dir.path(), ".", "").unwrap();
        assert_eq!(expansion.files, vec!["a.txt"]);
        for file in &expansion.files {
            assert!(expansion.source_path(file).is_file());
        }
    }

    #[test]
    fn test_lexical_normalize() {
        assert_eq!(lexical_normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(lexical_normalize(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(lexical_normalize(Path::new("../a/b/..")), PathBuf::from("../a"));
    }

    #[test]
    fn test_relative_posix_outside_base() {
        assert_eq!(relative_posix(Path::new("/w/a/b.txt"), Path::new("/w")), "a/b.txt");
        assert_eq!(relative_posix(Path::new("/x/b.txt"), Path::new("/w/y")), "../../x/b.txt");
    }
}
