//! Upload planning
//!
//! Turns the raw invocation inputs into the list of objects to upload:
//! expand the root(s), drop ignored files, compute each object key. Nothing
//! is uploaded here, so every input error surfaces before the first transfer.

use crate::destination::{compute_destination, parse_destination};
use crate::error::{Error, Result};
use crate::expand::{expand, expand_roots, split_roots, Expansion};
use crate::ignore::{filter, IgnoreFile, IgnoreSpec, DEFAULT_IGNORE_FILE};
use crate::upload::ObjectUpload;
use std::path::PathBuf;
use tracing::{debug, info};

/// Ignore-file handling for a run
#[derive(Debug, Clone)]
pub struct IgnoreSettings {
    pub enabled: bool,
    /// Explicit ignore file; defaults to `.gcloudignore` in the workspace
    pub path: Option<PathBuf>,
}

impl Default for IgnoreSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

/// What to upload and where
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Base directory relative roots are resolved against
    pub workspace: PathBuf,
    /// One or more newline-separated roots
    pub path: String,
    /// `bucket[/prefix]`
    pub destination: String,
    pub glob: String,
    /// Put the root directory name in front of every key
    pub parent: bool,
    pub ignore: IgnoreSettings,
}

/// Result of planning: the target bucket and every object to write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPlan {
    pub bucket: String,
    pub prefix: String,
    pub objects: Vec<ObjectUpload>,
}

/// Build the upload plan for `request`.
pub fn plan_upload(request: &UploadRequest) -> Result<UploadPlan> {
    let destination = parse_destination(&request.destination);
    if destination.bucket.is_empty() {
        return Err(Error::InvalidInput("destination must name a bucket".to_string()));
    }

    let roots = split_roots(&request.path);
    let ignore = load_ignore_file(request)?;

    let objects = match roots.as_slice() {
        [] => return Err(Error::InvalidInput("path is required".to_string())),
        [root] => {
            let expansion = expand(&request.workspace, root, &request.glob)?;
            // A single file is never nested under its own name
            let include_parent = request.parent && expansion.is_directory;
            plan_objects(&expansion, ignore.as_ref(), |file| {
                compute_destination(root, file, &destination.prefix, include_parent)
            })
        }
        _ => {
            let expansion = expand_roots(&request.workspace, &roots, &request.glob)?;
            plan_objects(&expansion, ignore.as_ref(), |file| {
                compute_destination("", file, &destination.prefix, false)
            })
        }
    };

    info!(
        bucket = %destination.bucket,
        prefix = %destination.prefix,
        roots = roots.len(),
        objects = objects.len(),
        "planned upload"
    );

    Ok(UploadPlan {
        bucket: destination.bucket,
        prefix: destination.prefix,
        objects,
    })
}

fn plan_objects(
    expansion: &Expansion,
    ignore: Option<&IgnoreFile>,
    key_for: impl Fn(&str) -> String,
) -> Vec<ObjectUpload> {
    let rooted = ignore.map(|ignore| ignore.rooted_at(&expansion.absolute_root));
    let files = filter(
        expansion.files.clone(),
        rooted.as_ref().map(|r| r as &dyn IgnoreSpec),
    );

    files
        .iter()
        .map(|file| ObjectUpload {
            source: expansion.source_path(file),
            destination: key_for(file),
        })
        .collect()
}

fn load_ignore_file(request: &UploadRequest) -> Result<Option<IgnoreFile>> {
    if !request.ignore.enabled {
        return Ok(None);
    }

    match &request.ignore.path {
        Some(path) => IgnoreFile::load(&request.workspace.join(path)).map(Some),
        None => {
            let path = request.workspace.join(DEFAULT_IGNORE_FILE);
            if path.is_file() {
                IgnoreFile::load(&path).map(Some)
            } else {
                debug!(path = %path.display(), "no ignore file, uploading every matched file");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn workspace() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("site/sub")).unwrap();
        fs::create_dir_all(root.join("other")).unwrap();
        fs::write(root.join("site/a.txt"), "a").unwrap();
        fs::write(root.join("site/sub/b.txt"), "b").unwrap();
        fs::write(root.join("site/debug.log"), "log").unwrap();
        fs::write(root.join("other/c.txt"), "c").unwrap();
        dir
    }

    fn request(dir: &TempDir, path: &str, destination: &str) -> UploadRequest {
        UploadRequest {
            workspace: dir.path().to_path_buf(),
            path: path.to_string(),
            destination: destination.to_string(),
            glob: String::new(),
            parent: false,
            ignore: IgnoreSettings::default(),
        }
    }

    fn keys(plan: &UploadPlan) -> Vec<&str> {
        plan.objects.iter().map(|o| o.destination.as_str()).collect()
    }

    #[test]
    fn test_directory_with_prefix() {
        let dir = workspace();
        let mut req = request(&dir, "site", "bucket/prefix");
        req.glob = "**/*.txt".to_string();

        let plan = plan_upload(&req).unwrap();

        assert_eq!(plan.bucket, "bucket");
        assert_eq!(keys(&plan), vec!["prefix/a.txt", "prefix/sub/b.txt"]);
        assert_eq!(plan.objects[1].source, dir.path().join("site/sub/b.txt"));
    }

    #[test]
    fn test_directory_with_parent() {
        let dir = workspace();
        let mut req = request(&dir, "site", "bucket");
        req.parent = true;

        let plan = plan_upload(&req).unwrap();

        assert_eq!(keys(&plan), vec!["site/a.txt", "site/debug.log", "site/sub/b.txt"]);
    }

    #[test]
    fn test_single_file_never_nests_under_parent() {
        let dir = workspace();
        let mut req = request(&dir, "site/sub/b.txt", "bucket/p");
        req.parent = true;

        let plan = plan_upload(&req).unwrap();

        assert_eq!(keys(&plan), vec!["p/b.txt"]);
    }

    #[test]
    fn test_multiple_roots_merge_relative_to_workspace() {
        let dir = workspace();
        let mut req = request(&dir, "other\nsite/sub\nother/c.txt", "bucket/x");
        req.parent = true;

        let plan = plan_upload(&req).unwrap();

        assert_eq!(keys(&plan), vec!["x/other/c.txt", "x/site/sub/b.txt"]);
    }

    #[test]
    fn test_default_ignore_file_is_applied() {
        let dir = workspace();
        fs::write(dir.path().join(".gcloudignore"), "*.log\n").unwrap();

        let plan = plan_upload(&request(&dir, "site", "bucket")).unwrap();
        assert_eq!(keys(&plan), vec!["a.txt", "sub/b.txt"]);

        let mut disabled = request(&dir, "site", "bucket");
        disabled.ignore.enabled = false;
        assert_eq!(plan_upload(&disabled).unwrap().objects.len(), 3);
    }

    #[test]
    fn test_ignore_file_anchored_to_its_directory() {
        let dir = workspace();
        fs::write(dir.path().join("rules"), "site/sub/\n").unwrap();
        let mut req = request(&dir, "site", "bucket");
        req.ignore.path = Some(PathBuf::from("rules"));

        let plan = plan_upload(&req).unwrap();

        assert_eq!(keys(&plan), vec!["a.txt", "debug.log"]);
    }

    #[test]
    fn test_missing_explicit_ignore_file() {
        let dir = workspace();
        let mut req = request(&dir, "site", "bucket");
        req.ignore.path = Some(PathBuf::from("nope"));

        assert!(matches!(plan_upload(&req), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_input_errors() {
        let dir = workspace();
        assert!(matches!(plan_upload(&request(&dir, "site", "  ")), Err(Error::InvalidInput(_))));
        assert!(matches!(plan_upload(&request(&dir, "\n", "bucket")), Err(Error::InvalidInput(_))));
        assert!(matches!(plan_upload(&request(&dir, "missing", "bucket")), Err(Error::NotFound(_))));

        let mut conflicting = request(&dir, "site/a.txt", "bucket");
        conflicting.glob = "*.txt".to_string();
        assert!(matches!(plan_upload(&conflicting), Err(Error::ConflictingGlob { .. })));
    }
}
