//! Candidate discovery and file moves for static acquisition.

use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use regex::Regex;

use crate::error::PipelineError;

/// Normalize a configured directory to end with a path separator.
#[must_use]
pub fn dir_fmt(dir: &str) -> String {
    if dir.ends_with('/') || dir.ends_with(MAIN_SEPARATOR) {
        dir.to_string()
    } else {
        format!("{dir}{MAIN_SEPARATOR}")
    }
}

/// Compile a filename glob (`*` and `?`) into an anchored regex.
fn glob_regex(pattern: &str) -> Result<Regex, PipelineError> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re)
        .map_err(|e| PipelineError::InvalidConfig(format!("bad suffix pattern '{pattern}': {e}")))
}

/// List regular files in `source` whose name matches `suffix`, sorted by name.
///
/// # Errors
///
/// Returns [`PipelineError::SourceMissing`] if `source` is not a directory.
pub fn list_candidate_files(source: &Path, suffix: &str) -> Result<Vec<String>, PipelineError> {
    if !source.is_dir() {
        return Err(PipelineError::SourceMissing {
            path: source.to_path_buf(),
        });
    }
    let matcher = glob_regex(suffix)?;

    let entries = std::fs::read_dir(source)
        .map_err(|e| PipelineError::io(format!("listing {}", source.display()), e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| PipelineError::io(format!("listing {}", source.display()), e))?;
        let is_file = entry
            .file_type()
            .map_err(|e| PipelineError::io(format!("inspecting {}", entry.path().display()), e))?
            .is_file();
        if !is_file {
            continue;
        }
        // Non-UTF-8 names cannot be matched against the pattern.
        let Ok(name) = entry.file_name().into_string() else {
            tracing::warn!(
                path = %entry.path().display(),
                "Skipping file with a non-UTF-8 name; it stays in the source directory"
            );
            continue;
        };
        if matcher.is_match(&name) {
            files.push(name);
        }
    }
    files.sort();
    Ok(files)
}

/// Move `filename` from `src_dir` to `dest_dir` with a single rename.
///
/// A missing destination is created unless `strict` is set. Returns the new
/// path.
///
/// # Errors
///
/// Returns [`PipelineError::SourceMissing`] if `src_dir` does not exist,
/// [`PipelineError::DestMissing`] if `dest_dir` does not exist and `strict`
/// is set, and [`PipelineError::Io`] if the rename fails.
pub fn move_file(
    src_dir: &Path,
    dest_dir: &Path,
    filename: &str,
    strict: bool,
) -> Result<PathBuf, PipelineError> {
    if !src_dir.is_dir() {
        return Err(PipelineError::SourceMissing {
            path: src_dir.to_path_buf(),
        });
    }
    if !dest_dir.is_dir() {
        if strict {
            return Err(PipelineError::DestMissing {
                path: dest_dir.to_path_buf(),
            });
        }
        std::fs::create_dir_all(dest_dir)
            .map_err(|e| PipelineError::io(format!("creating {}", dest_dir.display()), e))?;
    }

    let from = src_dir.join(filename);
    let to = dest_dir.join(filename);
    std::fs::rename(&from, &to).map_err(|e| {
        PipelineError::io(
            format!("moving {} to {}", from.display(), to.display()),
            e,
        )
    })?;
    tracing::debug!(from = %from.display(), to = %to.display(), "Moved file");
    Ok(to)
}
