//! Conflict marker parsing
//!
//! Turns a working-tree file into the ordered list of `<<<<<<<` ...
//! `>>>>>>>` blocks it contains. Only complete marker sequences become
//! hunks; an unterminated or out-of-order block is dropped entirely.

use std::fs;
use std::path::Path;

use crate::models::{ConflictHunk, ConflictedFile};

const OURS_MARKER: &str = "<<<<<<<";
const BASE_MARKER: &str = "|||||||";
const SEPARATOR_MARKER: &str = "=======";
const THEIRS_MARKER: &str = ">>>>>>>";

const DEFAULT_OURS_LABEL: &str = "HEAD";
const DEFAULT_THEIRS_LABEL: &str = "incoming";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Ours,
    Base,
    Theirs,
}

/// Hunk being accumulated between an opening and closing marker
struct OpenHunk {
    start_line: usize,
    ours_label: String,
    base_label: Option<String>,
    ours: Vec<String>,
    base: Option<Vec<String>>,
    theirs: Vec<String>,
}

/// If `line` is the given marker, return the label text that follows it
///
/// A marker is the seven-character run at the start of the line followed by
/// end of line or whitespace, so `========` in a Markdown file is not one.
fn marker_label<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let rest = line.strip_prefix(marker)?;
    match rest.chars().next() {
        None => Some(""),
        Some(c) if c.is_whitespace() => Some(rest.trim()),
        Some(_) => None,
    }
}

fn label_or(label: &str, default: &str) -> String {
    if label.is_empty() {
        default.to_string()
    } else {
        label.to_string()
    }
}

/// Parse raw text into conflict hunks, in file order
pub fn parse_conflict_markers(content: &str) -> Vec<ConflictHunk> {
    let mut hunks = Vec::new();
    let mut section = Section::None;
    let mut open: Option<OpenHunk> = None;

    for (index, line) in content.split('\n').enumerate() {
        if let Some(label) = marker_label(line, OURS_MARKER) {
            if open.is_some() {
                tracing::debug!(line = index, "discarding unterminated conflict hunk");
            }
            open = Some(OpenHunk {
                start_line: index,
                ours_label: label_or(label, DEFAULT_OURS_LABEL),
                base_label: None,
                ours: Vec::new(),
                base: None,
                theirs: Vec::new(),
            });
            section = Section::Ours;
            continue;
        }

        let Some(hunk) = open.as_mut() else {
            // Outside any hunk: not part of a conflict
            continue;
        };

        if section == Section::Ours {
            if let Some(label) = marker_label(line, BASE_MARKER) {
                hunk.base_label = Some(label.to_string());
                hunk.base = Some(Vec::new());
                section = Section::Base;
                continue;
            }
        }

        if matches!(section, Section::Ours | Section::Base)
            && marker_label(line, SEPARATOR_MARKER).is_some()
        {
            section = Section::Theirs;
            continue;
        }

        if let Some(label) = marker_label(line, THEIRS_MARKER) {
            let finished = open.take();
            if section == Section::Theirs {
                if let Some(hunk) = finished {
                    hunks.push(ConflictHunk {
                        id: format!("hunk-{}", hunks.len()),
                        start_line: hunk.start_line,
                        end_line: index,
                        ours_content: hunk.ours,
                        theirs_content: hunk.theirs,
                        base_content: hunk.base,
                        ours_label: hunk.ours_label,
                        theirs_label: label_or(label, DEFAULT_THEIRS_LABEL),
                        base_label: hunk.base_label,
                        resolved: false,
                        resolution: None,
                        resolved_content: None,
                    });
                }
            } else {
                tracing::debug!(line = index, "discarding conflict hunk closed before its separator");
            }
            section = Section::None;
            continue;
        }

        let target = match section {
            Section::Ours => &mut hunk.ours,
            Section::Base => hunk.base.get_or_insert_with(Vec::new),
            Section::Theirs => &mut hunk.theirs,
            Section::None => continue,
        };
        target.push(line.to_string());
    }

    if open.is_some() {
        tracing::debug!("discarding conflict hunk left open at end of file");
    }

    hunks
}

/// Build a `ConflictedFile` from already-loaded text
pub fn conflicted_file_from_content(
    path: &Path,
    repo_root: &Path,
    content: String,
) -> ConflictedFile {
    let hunks = parse_conflict_markers(&content);
    let relative_path = path
        .strip_prefix(repo_root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/");

    ConflictedFile {
        path: path.to_string_lossy().to_string(),
        relative_path,
        resolved: hunks.iter().all(|h| h.resolved),
        hunks,
        original_content: content,
    }
}

/// Read and parse one file; unreadable or non-UTF-8 files yield `None`
pub fn parse_conflicted_file(path: &Path, repo_root: &Path) -> Option<ConflictedFile> {
    match fs::read_to_string(path) {
        Ok(content) => Some(conflicted_file_from_content(path, repo_root, content)),
        Err(e) => {
            tracing::debug!(path = %path.display(), "cannot parse conflicted file: {}", e);
            None
        }
    }
}
