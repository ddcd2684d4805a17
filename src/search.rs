//! Recursive regular-expression search over source trees.

use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

/// First line found to match a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub path: PathBuf,
    pub line: usize,
    pub text: String,
}

/// Search `dirs` in order and stop at the first directory with a match.
pub fn first_match_in(dirs: &[PathBuf], pattern: &Regex) -> Option<SearchHit> {
    dirs.iter().find_map(|dir| search_dir(dir, pattern))
}

/// Walk `dir` recursively, in file-name order, and return the first matching
/// line. Files that cannot be read as UTF-8 text are skipped, as are
/// symlinks below the root.
pub fn search_dir(dir: &Path, pattern: &Regex) -> Option<SearchHit> {
    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let Ok(content) = std::fs::read_to_string(entry.path()) else {
            continue;
        };

        if let Some((idx, text)) = content
            .lines()
            .enumerate()
            .find(|(_, line)| pattern.is_match(line))
        {
            return Some(SearchHit {
                path: entry.into_path(),
                line: idx + 1,
                text: text.to_string(),
            });
        }
    }

    None
}
