//! Test doubles and fixtures for exercising the server without a real engine.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use gn_engine::{
    AnalysisEngine, Context, Declare, Help, HelpKind, Location, Range, Scope, Token, TokenKind,
    ValidationError,
};

/// State-changing engine calls, in invocation order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum EngineCall {
    Update(PathBuf),
    Close(PathBuf),
    Validate(PathBuf),
}

/// Scripted engine: canned answers for queries, a call log for the
/// state-changing primitives.
#[derive(Default)]
pub(crate) struct FakeEngine {
    pub(crate) context: Option<Context>,
    pub(crate) scope: Option<Scope>,
    pub(crate) help_entries: HashMap<String, Help>,
    pub(crate) error: Option<ValidationError>,
    pub(crate) formatted: Option<String>,
    pub(crate) calls: Mutex<Vec<EngineCall>>,
}

impl FakeEngine {
    pub(crate) fn recorded(&self) -> Vec<EngineCall> {
        self.calls.lock().expect("call log poisoned").clone()
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().expect("call log poisoned").push(call);
    }
}

impl AnalysisEngine for FakeEngine {
    fn update(&self, file: &Path, _content: &str) {
        self.record(EngineCall::Update(file.to_path_buf()));
    }

    fn close(&self, file: &Path) {
        self.record(EngineCall::Close(file.to_path_buf()));
    }

    fn validate(&self, file: &Path) -> Option<ValidationError> {
        self.record(EngineCall::Validate(file.to_path_buf()));
        self.error.clone()
    }

    fn analyze(&self, _file: &Path, _line: u32, _column: u32) -> Option<Context> {
        self.context.clone()
    }

    fn parse(&self, _file: &Path, _content: Option<&str>) -> Option<Scope> {
        self.scope.clone()
    }

    fn format(&self, _file: &Path) -> Option<String> {
        self.formatted.clone()
    }

    fn help(&self, _kind: HelpKind, name: &str) -> Option<Help> {
        self.help_entries.get(name).cloned()
    }
}

pub(crate) fn location(line: u32, column: u32) -> Location {
    Location {
        file: PathBuf::from("BUILD.gn"),
        line,
        column,
    }
}

pub(crate) fn span(begin: (u32, u32), end: (u32, u32)) -> Range {
    Range {
        begin: location(begin.0, begin.1),
        end: Some(location(end.0, end.1)),
    }
}

pub(crate) fn literal_token(value: &str, begin: (u32, u32)) -> Token {
    let end_column = begin.1 + value.chars().count() as u32;
    Token {
        kind: TokenKind::Literal,
        value: value.to_string(),
        range: span(begin, (begin.0, end_column)),
    }
}

pub(crate) fn declare(function: &str, arguments: &[&str], range: Range) -> Declare {
    Declare {
        function: function.to_string(),
        arguments: arguments.iter().map(|argument| argument.to_string()).collect(),
        range,
    }
}
