//! Ignore-file filtering
//!
//! [`filter`] removes files matched by an [`IgnoreSpec`]. [`IgnoreFile`] is the
//! `.gcloudignore` implementation of that predicate, compiled with `globset`.
//!
//! Supported syntax:
//! - blank lines and lines starting with `#` are skipped
//! - `#!include:<file>` reads rules from another file next to the ignore file
//! - `!pattern` re-includes paths excluded by an earlier rule
//! - `pattern/` only matches directories (and so everything beneath them)
//! - a leading or inner `/` anchors the pattern to the ignore file directory,
//!   otherwise it matches at any depth
//!
//! The last matching rule wins. A file inside an ignored directory stays
//! ignored even if a later rule would re-include it.

use crate::error::{Error, Result};
use crate::expand::{lexical_normalize, to_posix_path};
use globset::{GlobBuilder, GlobMatcher};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default ignore file name, looked up in the workspace root
pub const DEFAULT_IGNORE_FILE: &str = ".gcloudignore";

const INCLUDE_DIRECTIVE: &str = "#!include:";

/// Nested `#!include:` limit, guards against include cycles
const MAX_INCLUDE_DEPTH: usize = 8;

/// Predicate deciding whether a relative file path is excluded from upload
pub trait IgnoreSpec {
    /// `Ok(true)` when `relative_path` must not be uploaded.
    fn matches(&self, relative_path: &str) -> Result<bool>;
}

/// Drop every file matched by `ignore`, keeping the input order.
///
/// A predicate failure skips that file instead of aborting the run.
pub fn filter(files: Vec<String>, ignore: Option<&dyn IgnoreSpec>) -> Vec<String> {
    let Some(ignore) = ignore else {
        return files;
    };

    files
        .into_iter()
        .filter(|file| match ignore.matches(file) {
            Ok(true) => {
                debug!(file = %file, "ignored");
                false
            }
            Ok(false) => true,
            Err(e) => {
                warn!(file = %file, error = %e, "could not evaluate ignore rules, skipping file");
                false
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
struct Rule {
    matcher: GlobMatcher,
    negated: bool,
    dir_only: bool,
}

/// Parsed `.gcloudignore` file
#[derive(Debug, Clone)]
pub struct IgnoreFile {
    base: PathBuf,
    rules: Vec<Rule>,
}

impl IgnoreFile {
    /// Load an ignore file; its rules are relative to the directory containing it.
    pub fn load(path: &Path) -> Result<Self> {
        let path = lexical_normalize(&std::env::current_dir()?.join(path));
        let base = path
            .parent()
            .ok_or_else(|| Error::InvalidInput(format!("{} has no parent directory", path.display())))?
            .to_path_buf();

        let mut rules = Vec::new();
        read_rules(&path, &base, &mut rules, 0)?;

        debug!(path = %path.display(), rules = rules.len(), "loaded ignore file");
        Ok(Self { base, rules })
    }

    /// Parse ignore rules from text. `base` is the directory the rules apply to
    /// and the directory `#!include:` targets are resolved against.
    pub fn parse(base: &Path, contents: &str) -> Result<Self> {
        let base = lexical_normalize(&std::env::current_dir()?.join(base));
        let mut rules = Vec::new();
        parse_rules(contents, &base, &mut rules, 0)?;
        Ok(Self { base, rules })
    }

    /// Directory the rules are anchored to
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Number of compiled rules, includes expanded
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether `relative` (POSIX, relative to [`IgnoreFile::base`]) is ignored.
    pub fn is_ignored(&self, relative: &str) -> bool {
        let segments: Vec<&str> = relative
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();

        for depth in 1..=segments.len() {
            let candidate = segments[..depth].join("/");
            let is_dir = depth < segments.len();
            if self.evaluate(&candidate, is_dir) {
                return true;
            }
        }

        false
    }

    /// View of these rules for paths relative to another root directory.
    pub fn rooted_at(&self, root: &Path) -> RootedIgnore<'_> {
        RootedIgnore {
            ignore: self,
            root: root.to_path_buf(),
        }
    }

    fn evaluate(&self, candidate: &str, is_dir: bool) -> bool {
        self.rules
            .iter()
            .filter(|rule| is_dir || !rule.dir_only)
            .filter(|rule| rule.matcher.is_match(candidate))
            .last()
            .map(|rule| !rule.negated)
            .unwrap_or(false)
    }
}

impl IgnoreSpec for IgnoreFile {
    fn matches(&self, relative_path: &str) -> Result<bool> {
        Ok(self.is_ignored(relative_path))
    }
}

/// [`IgnoreFile`] evaluated against paths relative to `root`
#[derive(Debug)]
pub struct RootedIgnore<'a> {
    ignore: &'a IgnoreFile,
    root: PathBuf,
}

impl IgnoreSpec for RootedIgnore<'_> {
    fn matches(&self, relative_path: &str) -> Result<bool> {
        let absolute = lexical_normalize(&self.root.join(relative_path));
        match absolute.strip_prefix(&self.ignore.base) {
            Ok(inside) => Ok(self.ignore.is_ignored(&to_posix_path(inside))),
            // Rules never reach outside their own directory
            Err(_) => Ok(false),
        }
    }
}

fn read_rules(path: &Path, base: &Path, rules: &mut Vec<Rule>, depth: usize) -> Result<()> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(Error::Io(e)),
    };
    parse_rules(&contents, base, rules, depth)
}

fn parse_rules(contents: &str, base: &Path, rules: &mut Vec<Rule>, depth: usize) -> Result<()> {
    for line in contents.lines() {
        let line = line.trim_end();

        if let Some(target) = line.strip_prefix(INCLUDE_DIRECTIVE) {
            if depth >= MAX_INCLUDE_DEPTH {
                return Err(Error::InvalidInput(format!(
                    "ignore file includes nested deeper than {MAX_INCLUDE_DEPTH} levels"
                )));
            }
            read_rules(&base.join(target.trim()), base, rules, depth + 1)?;
            continue;
        }

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        rules.push(parse_rule(line)?);
    }

    Ok(())
}

fn parse_rule(line: &str) -> Result<Rule> {
    let (negated, mut pattern) = match line.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, line),
    };

    // `\#` and `\!` escape a literal leading character
    if pattern.starts_with("\\#") || pattern.starts_with("\\!") {
        pattern = &pattern[1..];
    }

    let dir_only = pattern.len() > 1 && pattern.ends_with('/');
    let pattern = pattern.trim_end_matches('/');

    let anchored = pattern.starts_with('/') || pattern.contains('/');
    let pattern = pattern.trim_start_matches('/');
    let pattern = if anchored {
        pattern.to_string()
    } else {
        format!("**/{pattern}")
    };

    let matcher = GlobBuilder::new(&pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| Error::InvalidGlob {
            pattern: line.to_string(),
            reason: e.to_string(),
        })?
        .compile_matcher();

    Ok(Rule {
        matcher,
        negated,
        dir_only,
    })
}
