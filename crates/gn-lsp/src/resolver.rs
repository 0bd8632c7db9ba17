//! Label and path resolution for string literals in build files.
//!
//! A path-shaped literal is addressed in three steps: strip the leading
//! slashes, split once on `:` (a colon, even with nothing after it, makes the
//! reference a label lookup instead of a bare path), and pick the base
//! directory from the original spelling: `//` is the build root, a single
//! `/` the filesystem root, anything else the directory of the enclosing
//! file. Filesystem misses of any kind produce empty results, never errors.

use std::fs;
use std::path::{Path, PathBuf};

use gn_engine::{AnalysisEngine, Declare};

use crate::registry;

/// Name of the declaration file looked up inside a referenced directory.
pub(crate) const BUILD_FILE: &str = "BUILD.gn";

/// One completion candidate produced by the resolver.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Candidate {
    Directory(String),
    File(String),
    Label(String),
}

/// A partially typed literal plus the cursor that truncates it.
pub(crate) struct CompletionQuery<'a> {
    /// Raw token text including the opening quote.
    pub(crate) literal: &'a str,
    /// Column where the token (the opening quote) starts, 1-based.
    pub(crate) token_column: u32,
    /// Column of the cursor, 1-based.
    pub(crate) cursor_column: u32,
    /// File containing the literal.
    pub(crate) file: &'a Path,
    /// Build root from the engine context.
    pub(crate) root: &'a Path,
    /// Variable being assigned, if any.
    pub(crate) variable: Option<&'a str>,
}

/// Candidates for the literal under the cursor: labels declared by the
/// referenced BUILD.gn for label references, directory entries for bare
/// paths. Label-classified variables only ever complete to directories and
/// labels, never plain files.
pub(crate) fn complete(engine: &dyn AnalysisEngine, query: &CompletionQuery<'_>) -> Vec<Candidate> {
    let keep = query.cursor_column.saturating_sub(query.token_column) as usize;
    let typed: String = query
        .literal
        .chars()
        .skip(1)
        .take(keep.saturating_sub(1))
        .collect();
    let (path_part, label_part) = split_reference(&typed);
    let base = base_dir(&typed, query.file, query.root);
    let detail = registry::variable_detail(query.variable);
    match label_part {
        Some(_) => {
            if !detail.is_label {
                return Vec::new();
            }
            declared_labels(engine, &join_relative(&base, path_part).join(BUILD_FILE))
        }
        None => {
            // The segment after the last slash is the prefix being typed,
            // not a directory to descend into.
            let relative = match path_part.rfind('/') {
                Some(index) => &path_part[..index + 1],
                None => "",
            };
            list_directory(&join_relative(&base, relative), detail.is_label)
        }
    }
}

/// Filesystem address of a complete (not cursor-truncated) literal, as used
/// by go-to-definition. `label` is the text between the first and second
/// colon, when present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TargetAddress {
    pub(crate) path: PathBuf,
    pub(crate) label: Option<String>,
}

pub(crate) fn definition_address(literal: &str, file: &Path, root: &Path) -> TargetAddress {
    let text = strip_quotes(literal);
    let (path_part, label_part) = split_reference(text);
    TargetAddress {
        path: join_relative(&base_dir(text, file, root), path_part),
        label: label_part.map(str::to_string),
    }
}

/// Removes one leading and one trailing double quote, if present.
pub(crate) fn strip_quotes(text: &str) -> &str {
    let text = text.strip_prefix('"').unwrap_or(text);
    text.strip_suffix('"').unwrap_or(text)
}

/// Target kind and label named by a top-level declaration. The generic
/// `target` declarator names its kind and label in the first two arguments;
/// every other declarator is its own kind and labels with its first argument.
pub(crate) fn declared_label(declare: &Declare) -> (&str, &str) {
    let arg0 = strip_quotes(declare.arguments.first().map(String::as_str).unwrap_or(""));
    let arg1 = strip_quotes(declare.arguments.get(1).map(String::as_str).unwrap_or(""));
    if declare.function == "target" {
        (arg0, arg1)
    } else {
        (declare.function.as_str(), arg0)
    }
}

fn split_reference(text: &str) -> (&str, Option<&str>) {
    let trimmed = text.trim_start_matches('/');
    match trimmed.split_once(':') {
        Some((path, rest)) => (path, Some(rest.split(':').next().unwrap_or(""))),
        None => (trimmed, None),
    }
}

fn base_dir(text: &str, file: &Path, root: &Path) -> PathBuf {
    if text.starts_with("//") {
        root.to_path_buf()
    } else if text.starts_with('/') {
        PathBuf::from("/")
    } else {
        file.parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn join_relative(base: &Path, relative: &str) -> PathBuf {
    if relative.is_empty() {
        base.to_path_buf()
    } else {
        base.join(relative)
    }
}

fn declared_labels(engine: &dyn AnalysisEngine, build_file: &Path) -> Vec<Candidate> {
    let Ok(content) = fs::read_to_string(build_file) else {
        return Vec::new();
    };
    let Some(scope) = engine.parse(build_file, Some(&content)) else {
        return Vec::new();
    };
    let mut candidates = Vec::new();
    for declare in &scope.declares {
        let (target, label) = declared_label(declare);
        if registry::function_detail(Some(target)).is_target && !label.is_empty() {
            candidates.push(Candidate::Label(label.to_string()));
        }
    }
    candidates
}

fn list_directory(directory: &Path, directories_only: bool) -> Vec<Candidate> {
    let Ok(entries) = fs::read_dir(directory) else {
        return Vec::new();
    };
    let mut candidates = Vec::new();
    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        if file_type.is_dir() {
            candidates.push(Candidate::Directory(name));
        } else if !directories_only {
            candidates.push(Candidate::File(name));
        }
    }
    candidates
}
