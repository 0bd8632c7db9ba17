//! Per-file session state.
//!
//! One underlying file can be open in several editor views at once, but the
//! engine keeps exactly one state per file path. The store tracks which views
//! reference each file and forwards `update`/`close` so the engine sees at
//! most one transition per logical change: updates on every edit, close only
//! when the last view goes away.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use gn_engine::{AnalysisEngine, Location, ValidationError};
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range, Url};

struct FileSession {
    views: HashSet<Url>,
    text: String,
}

#[derive(Default)]
pub(crate) struct DocumentStore {
    files: HashMap<PathBuf, FileSession>,
}

impl DocumentStore {
    /// Registers `view` on `file`, pushes the new content into the engine,
    /// and returns the diagnostics the engine reports for it.
    pub(crate) fn open_or_update(
        &mut self,
        engine: &dyn AnalysisEngine,
        file: &Path,
        view: &Url,
        text: String,
    ) -> Vec<Diagnostic> {
        let session = self
            .files
            .entry(file.to_path_buf())
            .or_insert_with(|| FileSession {
                views: HashSet::new(),
                text: String::new(),
            });
        session.views.insert(view.clone());
        session.text = text;
        engine.update(file, &session.text);
        match engine.validate(file) {
            Some(error) => vec![to_diagnostic(&error)],
            None => Vec::new(),
        }
    }

    /// Drops `view` from `file`. Engine state is torn down only when no view
    /// references the file anymore; returns whether that happened.
    pub(crate) fn close_view(
        &mut self,
        engine: &dyn AnalysisEngine,
        file: &Path,
        view: &Url,
    ) -> bool {
        let Some(session) = self.files.get_mut(file) else {
            return false;
        };
        session.views.remove(view);
        if !session.views.is_empty() {
            return false;
        }
        self.files.remove(file);
        engine.close(file);
        true
    }

    pub(crate) fn text(&self, file: &Path) -> Option<&str> {
        self.files.get(file).map(|session| session.text.as_str())
    }

    pub(crate) fn line_count(&self, file: &Path) -> Option<usize> {
        self.text(file).map(|text| text.split('\n').count())
    }

    #[cfg(test)]
    fn views(&self, file: &Path) -> Option<&HashSet<Url>> {
        self.files.get(file).map(|session| &session.views)
    }
}

pub(crate) fn lsp_position(location: &Location) -> Position {
    Position {
        line: location.line.saturating_sub(1),
        character: location.column.saturating_sub(1),
    }
}

pub(crate) fn lsp_range(range: &gn_engine::Range) -> Range {
    let end = match &range.end {
        Some(end) => lsp_position(end),
        // No end reported: cover the rest of the begin line.
        None => Position {
            line: range.begin.line,
            character: 0,
        },
    };
    Range {
        start: lsp_position(&range.begin),
        end,
    }
}

fn to_diagnostic(error: &ValidationError) -> Diagnostic {
    let range = error.ranges.first().cloned().unwrap_or(gn_engine::Range {
        begin: error.location.clone(),
        end: None,
    });
    Diagnostic {
        range: lsp_range(&range),
        severity: Some(DiagnosticSeverity::ERROR),
        code: None,
        code_description: None,
        source: Some("gn-lsp".to_string()),
        message: format!("{}\n{}", error.message, error.help)
            .trim()
            .to_string(),
        related_information: None,
        tags: None,
        data: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::support::{location, span, EngineCall, FakeEngine};

    fn file() -> PathBuf {
        PathBuf::from("/work/project/BUILD.gn")
    }

    fn view(name: &str) -> Url {
        Url::parse(&format!("file:///work/project/BUILD.gn?view={name}")).expect("url")
    }

    #[test]
    fn engine_closes_only_after_the_last_view() {
        let engine = FakeEngine::default();
        let mut store = DocumentStore::default();
        let (first, second) = (view("a"), view("b"));

        store.open_or_update(&engine, &file(), &first, "executable(\"x\") {}".into());
        store.open_or_update(&engine, &file(), &second, "executable(\"x\") {}".into());
        let views = store.views(&file()).expect("session");
        assert!(views.contains(&first) && views.contains(&second));

        assert!(!store.close_view(&engine, &file(), &first));
        let views = store.views(&file()).expect("session");
        assert!(!views.contains(&first) && views.contains(&second));
        assert!(!engine
            .recorded()
            .iter()
            .any(|call| matches!(call, EngineCall::Close(_))));

        assert!(store.close_view(&engine, &file(), &second));
        assert!(store.views(&file()).is_none());
        let closes = engine
            .recorded()
            .into_iter()
            .filter(|call| matches!(call, EngineCall::Close(_)))
            .count();
        assert_eq!(closes, 1);
    }

    #[test]
    fn every_edit_reaches_the_engine_exactly_once() {
        let engine = FakeEngine::default();
        let mut store = DocumentStore::default();
        let editor = view("a");

        store.open_or_update(&engine, &file(), &editor, "a = 1".into());
        store.open_or_update(&engine, &file(), &editor, "a = 2".into());
        let updates = engine
            .recorded()
            .into_iter()
            .filter(|call| matches!(call, EngineCall::Update(_)))
            .count();
        assert_eq!(updates, 2);
        assert_eq!(store.text(&file()), Some("a = 2"));
    }

    #[test]
    fn closing_an_unknown_view_is_harmless() {
        let engine = FakeEngine::default();
        let mut store = DocumentStore::default();
        assert!(!store.close_view(&engine, &file(), &view("a")));
        assert!(engine.recorded().is_empty());
    }

    #[test]
    fn validation_errors_become_one_error_diagnostic() {
        let engine = FakeEngine {
            error: Some(gn_engine::ValidationError {
                location: location(3, 7),
                ranges: vec![span((3, 7), (3, 12))],
                message: "Expected an identifier".into(),
                help: "Variables must be declared before use.".into(),
            }),
            ..FakeEngine::default()
        };
        let mut store = DocumentStore::default();
        let diagnostics = store.open_or_update(&engine, &file(), &view("a"), "x".into());

        assert_eq!(diagnostics.len(), 1);
        let diagnostic = &diagnostics[0];
        assert_eq!(diagnostic.severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(diagnostic.source.as_deref(), Some("gn-lsp"));
        assert_eq!(
            diagnostic.message,
            "Expected an identifier\nVariables must be declared before use."
        );
        assert_eq!(diagnostic.range.start, Position::new(2, 6));
        assert_eq!(diagnostic.range.end, Position::new(2, 11));
    }

    #[test]
    fn errors_without_ranges_anchor_to_the_location_line() {
        let engine = FakeEngine {
            error: Some(gn_engine::ValidationError {
                location: location(3, 7),
                ranges: Vec::new(),
                message: "Unexpected token".into(),
                help: String::new(),
            }),
            ..FakeEngine::default()
        };
        let mut store = DocumentStore::default();
        let diagnostics = store.open_or_update(&engine, &file(), &view("a"), "x".into());

        let diagnostic = &diagnostics[0];
        // Trailing newline from the empty help text must be trimmed away.
        assert_eq!(diagnostic.message, "Unexpected token");
        assert_eq!(diagnostic.range.start, Position::new(2, 6));
        // Open-ended engine ranges run to the end of the begin line.
        assert_eq!(diagnostic.range.end, Position::new(3, 0));
    }

    #[test]
    fn a_clean_file_has_no_diagnostics() {
        let engine = FakeEngine::default();
        let mut store = DocumentStore::default();
        let diagnostics = store.open_or_update(&engine, &file(), &view("a"), "x = 1\n".into());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn line_count_counts_the_trailing_line() {
        let engine = FakeEngine::default();
        let mut store = DocumentStore::default();
        store.open_or_update(&engine, &file(), &view("a"), "a = 1\nb = 2\n".into());
        assert_eq!(store.line_count(&file()), Some(3));
        assert_eq!(store.line_count(Path::new("/elsewhere")), None);
    }

    #[test]
    fn reopening_after_close_starts_a_fresh_session() {
        let engine = FakeEngine::default();
        let mut store = DocumentStore::default();
        let editor = view("a");

        store.open_or_update(&engine, &file(), &editor, "a = 1".into());
        assert!(store.close_view(&engine, &file(), &editor));
        store.open_or_update(&engine, &file(), &editor, "a = 2".into());
        assert_eq!(store.text(&file()), Some("a = 2"));
        assert_eq!(store.views(&file()).map(|views| views.len()), Some(1));
    }
}
