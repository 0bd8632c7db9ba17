//! Typed seam between the language server and the GN analysis engine.
//!
//! The engine owns tokenizing, parsing, validation, formatting, and the
//! reference help text. It is consumed through the [`AnalysisEngine`] trait;
//! the production implementation in [`native`] loads it as a platform shared
//! library. Every query returns `Option`: a file the engine has never seen,
//! a position outside any node, or a name without documentation is an absent
//! result, never an error.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub mod native;

pub use native::{EngineError, NativeEngine};

/// A point in a source file. Lines and columns are 1-based, the engine's
/// native convention.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
}

/// A span between two locations. A missing `end` covers the rest of the
/// `begin` line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub begin: Location,
    #[serde(default)]
    pub end: Option<Location>,
}

/// Token classification as reported by the engine. Everything that is not an
/// identifier or a literal (operators, braces, comments) comes back as
/// `None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Identifier,
    Literal,
    None,
}

/// The token under or immediately before the queried position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub value: String,
    pub range: Range,
}

/// The innermost function call with a block enclosing a position. Arguments
/// keep their raw source spelling, quotes included; non-literal arguments are
/// reported as empty strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<String>,
}

/// Everything the engine knows about one cursor position: the build root of
/// the file, the token at the cursor, the enclosing declaration, and the
/// variable being assigned. All but `root` are optional since a cursor can
/// sit outside any declaration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub root: PathBuf,
    #[serde(default)]
    pub token: Option<Token>,
    #[serde(default)]
    pub function: Option<FunctionCall>,
    #[serde(default)]
    pub variable: Option<String>,
}

/// One top-level declaration in a parsed file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declare {
    pub function: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    pub range: Range,
}

/// Shape of a node in the engine's outline tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Condition,
    Else,
    Variable,
}

/// A node in the engine's outline tree: a declaration, a conditional branch,
/// or a variable assignment, with the nodes nested inside it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolNode {
    pub kind: SymbolKind,
    pub name: String,
    pub range: Range,
    #[serde(rename = "selectionRange")]
    pub selection_range: Range,
    #[serde(default)]
    pub children: Vec<SymbolNode>,
}

/// A parsed file: the flat declaration list used for label lookup plus the
/// nested outline tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    #[serde(default)]
    pub declares: Vec<Declare>,
    #[serde(default)]
    pub symbols: Vec<SymbolNode>,
}

/// A validation failure reported by the engine. `ranges` may be empty, in
/// which case `location` is the only anchor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub location: Location,
    #[serde(default)]
    pub ranges: Vec<Range>,
    pub message: String,
    #[serde(default)]
    pub help: String,
}

/// Reference documentation for one name. The engine reports an all-empty
/// entry for unknown names; [`Help::is_empty`] is the lookup-miss test.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Help {
    #[serde(default)]
    pub basic: String,
    #[serde(default)]
    pub full: String,
    #[serde(default)]
    pub link: String,
}

impl Help {
    pub fn is_empty(&self) -> bool {
        self.basic.is_empty()
    }
}

/// Which help namespace to search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HelpKind {
    All,
    Function,
    Variable,
}

impl HelpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            HelpKind::All => "all",
            HelpKind::Function => "function",
            HelpKind::Variable => "variable",
        }
    }
}

/// The seven engine primitives. `update`/`close` manage per-file engine
/// state; the rest are queries against it. Implementations must tolerate
/// queries for files that were never updated by returning `None`.
pub trait AnalysisEngine: Send + Sync {
    fn update(&self, file: &Path, content: &str);
    fn close(&self, file: &Path);
    fn validate(&self, file: &Path) -> Option<ValidationError>;
    fn analyze(&self, file: &Path, line: u32, column: u32) -> Option<Context>;
    fn parse(&self, file: &Path, content: Option<&str>) -> Option<Scope>;
    fn format(&self, file: &Path) -> Option<String>;
    fn help(&self, kind: HelpKind, name: &str) -> Option<Help>;
}
