//! LSP server for GN build files, based on tower-lsp.
//!
//! The backend wires editor notifications into the document store and serves
//! completion / hover / definition / outline / formatting requests by
//! combining the engine's per-position context with the static registry and
//! the label resolver. Editor positions are 0-based, engine positions
//! 1-based; the conversion happens once, at the handler boundary.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gn_engine::{AnalysisEngine, Context, FunctionCall, Help, HelpKind, SymbolNode, Token, TokenKind};
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionOptions, CompletionParams, CompletionResponse,
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    DocumentFormattingParams, DocumentSymbol, DocumentSymbolParams, DocumentSymbolResponse,
    Documentation, GotoDefinitionParams, GotoDefinitionResponse, Hover, HoverContents, HoverParams,
    HoverProviderCapability, InitializeParams, InitializeResult, InitializedParams, LocationLink,
    MarkupContent, MarkupKind, MessageType, OneOf, Position, Range, ServerCapabilities, ServerInfo,
    SymbolKind, TextDocumentSyncCapability, TextDocumentSyncKind, TextEdit, Url,
};
use tower_lsp::{Client, LanguageServer};

use crate::document_store::{lsp_range, DocumentStore};
use crate::registry;
use crate::resolver::{self, Candidate, CompletionQuery, TargetAddress};

pub(crate) struct Backend<E> {
    client: Option<Client>,
    engine: Arc<E>,
    store: Arc<RwLock<DocumentStore>>,
}

impl<E: AnalysisEngine> Backend<E> {
    pub(crate) fn new(engine: E) -> Self {
        Self {
            client: None,
            engine: Arc::new(engine),
            store: Arc::new(RwLock::new(DocumentStore::default())),
        }
    }

    pub(crate) fn with_client(&self, client: Client) -> Self {
        Self {
            client: Some(client),
            engine: self.engine.clone(),
            store: self.store.clone(),
        }
    }

    fn client(&self) -> &Client {
        self.client
            .as_ref()
            .expect("LanguageServer used without client")
    }

    async fn log_info(&self, msg: impl Into<String>) {
        let _ = self
            .client()
            .log_message(MessageType::INFO, msg.into())
            .await;
    }

    /// Forwards one view's content to the engine and republishes the file's
    /// diagnostics on that view.
    async fn sync_view(&self, uri: &Url, text: String) {
        let Some(file) = file_path(uri) else { return };
        let diagnostics = {
            let mut store = self.store.write().await;
            store.open_or_update(self.engine.as_ref(), &file, uri, text)
        };
        let _ = self
            .client()
            .publish_diagnostics(uri.clone(), diagnostics, None)
            .await;
    }
}

#[tower_lsp::async_trait]
impl<E: AnalysisEngine + 'static> LanguageServer for Backend<E> {
    async fn initialize(&self, _: InitializeParams) -> Result<InitializeResult> {
        self.log_info("gn-lsp: initialize called").await;
        let capabilities = ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
            completion_provider: Some(CompletionOptions {
                trigger_characters: Some(vec!["\"".into(), "/".into(), ":".into()]),
                resolve_provider: Some(false),
                ..CompletionOptions::default()
            }),
            hover_provider: Some(HoverProviderCapability::Simple(true)),
            definition_provider: Some(OneOf::Left(true)),
            document_formatting_provider: Some(OneOf::Left(true)),
            document_symbol_provider: Some(OneOf::Left(true)),
            ..ServerCapabilities::default()
        };
        Ok(InitializeResult {
            capabilities,
            server_info: Some(ServerInfo {
                name: "gn-lsp".into(),
                version: None,
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.log_info("gn-lsp: initialized notification").await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        self.log_info(format!("gn-lsp: didOpen uri={uri}")).await;
        self.sync_view(&uri, params.text_document.text).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        // Full sync: the last change carries the whole document.
        if let Some(change) = params.content_changes.into_iter().last() {
            self.sync_view(&uri, change.text).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.log_info(format!("gn-lsp: didClose uri={uri}")).await;
        if let Some(file) = file_path(&uri) {
            let mut store = self.store.write().await;
            store.close_view(self.engine.as_ref(), &file, &uri);
        }
        let _ = self
            .client()
            .publish_diagnostics(uri, Vec::new(), None)
            .await;
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let Some(file) = file_path(&uri) else {
            return Ok(None);
        };
        let items = completions(
            self.engine.as_ref(),
            &file,
            position.line + 1,
            position.character + 1,
        );
        if items.is_empty() {
            return Ok(None);
        }
        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let Some(file) = file_path(&uri) else {
            return Ok(None);
        };
        Ok(hover(
            self.engine.as_ref(),
            &file,
            position.line + 1,
            position.character + 1,
        ))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let Some(file) = file_path(&uri) else {
            return Ok(None);
        };
        let links = definition(
            self.engine.as_ref(),
            &file,
            position.line + 1,
            position.character + 1,
        );
        if links.is_empty() {
            return Ok(None);
        }
        Ok(Some(GotoDefinitionResponse::Link(links)))
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let uri = params.text_document.uri;
        let Some(file) = file_path(&uri) else {
            return Ok(None);
        };
        let text = {
            let store = self.store.read().await;
            store.text(&file).map(str::to_owned)
        };
        let Some(scope) = self.engine.parse(&file, text.as_deref()) else {
            return Ok(None);
        };
        let symbols = document_symbols(&scope.symbols);
        if symbols.is_empty() {
            return Ok(None);
        }
        Ok(Some(DocumentSymbolResponse::Nested(symbols)))
    }

    async fn formatting(&self, params: DocumentFormattingParams) -> Result<Option<Vec<TextEdit>>> {
        let uri = params.text_document.uri;
        let Some(file) = file_path(&uri) else {
            return Ok(None);
        };
        let Some(formatted) = self.engine.format(&file) else {
            return Ok(None);
        };
        let lines = {
            let store = self.store.read().await;
            store.line_count(&file).unwrap_or(0)
        };
        Ok(Some(vec![TextEdit {
            range: Range {
                start: Position::new(0, 0),
                end: Position::new(lines as u32, 0),
            },
            new_text: formatted,
        }]))
    }
}

fn file_path(uri: &Url) -> Option<PathBuf> {
    if uri.scheme() != "file" {
        return None;
    }
    uri.to_file_path().ok()
}

/// Completion candidates at a 1-based engine position.
fn completions(engine: &dyn AnalysisEngine, file: &Path, line: u32, column: u32) -> Vec<CompletionItem> {
    let Some(context) = engine.analyze(file, line, column) else {
        return Vec::new();
    };
    match &context.token {
        Some(token) if token.kind == TokenKind::Literal => {
            literal_completions(engine, file, column, &context, token)
        }
        _ => scope_completions(engine, &context),
    }
}

/// Filesystem/label candidates for a string literal in progress. Only
/// input-classified variables complete inside literals.
fn literal_completions(
    engine: &dyn AnalysisEngine,
    file: &Path,
    column: u32,
    context: &Context,
    token: &Token,
) -> Vec<CompletionItem> {
    if !token.value.starts_with('"') {
        return Vec::new();
    }
    if !registry::variable_detail(context.variable.as_deref()).is_input {
        return Vec::new();
    }
    let query = CompletionQuery {
        literal: &token.value,
        token_column: token.range.begin.column,
        cursor_column: column,
        file,
        root: &context.root,
        variable: context.variable.as_deref(),
    };
    resolver::complete(engine, &query)
        .into_iter()
        .map(candidate_completion)
        .collect()
}

/// Vocabulary candidates outside literals: the builtins always, plus either
/// the target-declaring functions (at top level and inside templates) or the
/// variables legal for the enclosing target kind.
fn scope_completions(engine: &dyn AnalysisEngine, context: &Context) -> Vec<CompletionItem> {
    let mut items = Vec::new();
    for name in registry::builtin_functions() {
        items.push(function_completion(engine, name));
    }
    for name in registry::builtin_variables() {
        items.push(variable_completion(engine, name));
    }
    match &context.function {
        Some(function) if function.name == "template" => {
            items.extend(registry::target_functions().map(|name| function_completion(engine, name)));
        }
        Some(function) => {
            let kind = effective_target_kind(function);
            items.extend(
                registry::target_variables(Some(kind))
                    .into_iter()
                    .map(|name| variable_completion(engine, name)),
            );
        }
        None => {
            items.extend(registry::target_functions().map(|name| function_completion(engine, name)));
        }
    }
    items
}

/// The generic `target` declarator names its kind in the first argument;
/// every other declarator is its own kind.
fn effective_target_kind(function: &FunctionCall) -> &str {
    if function.name == "target" {
        resolver::strip_quotes(function.arguments.first().map(String::as_str).unwrap_or(""))
    } else {
        &function.name
    }
}

fn function_completion(engine: &dyn AnalysisEngine, name: &str) -> CompletionItem {
    let detail = registry::function_detail(Some(name));
    let mut item = CompletionItem::default();
    item.label = name.to_string();
    item.kind = Some(if detail.is_target {
        CompletionItemKind::CLASS
    } else {
        CompletionItemKind::FUNCTION
    });
    apply_help(&mut item, engine.help(HelpKind::Function, name));
    item
}

fn variable_completion(engine: &dyn AnalysisEngine, name: &str) -> CompletionItem {
    let detail = registry::variable_detail(Some(name));
    let mut item = CompletionItem::default();
    item.label = name.to_string();
    item.kind = Some(if detail.is_builtin {
        CompletionItemKind::VARIABLE
    } else {
        CompletionItemKind::FIELD
    });
    apply_help(&mut item, engine.help(HelpKind::Variable, name));
    item
}

fn candidate_completion(candidate: Candidate) -> CompletionItem {
    let (label, kind) = match candidate {
        Candidate::Directory(name) => (name, CompletionItemKind::FOLDER),
        Candidate::File(name) => (name, CompletionItemKind::FILE),
        Candidate::Label(name) => (name, CompletionItemKind::CONSTANT),
    };
    let mut item = CompletionItem::default();
    item.label = label;
    item.kind = Some(kind);
    item
}

fn apply_help(item: &mut CompletionItem, help: Option<Help>) {
    let Some(help) = help else { return };
    if !help.basic.is_empty() {
        item.detail = Some(help.basic);
    }
    if !help.link.is_empty() {
        item.documentation = Some(Documentation::MarkupContent(MarkupContent {
            kind: MarkupKind::Markdown,
            value: help.link,
        }));
    }
}

/// Reference documentation for the identifier under the cursor.
fn hover(engine: &dyn AnalysisEngine, file: &Path, line: u32, column: u32) -> Option<Hover> {
    let context = engine.analyze(file, line, column)?;
    let token = context.token?;
    if token.kind != TokenKind::Identifier {
        return None;
    }
    let help = engine.help(HelpKind::All, &token.value)?;
    if help.is_empty() {
        return None;
    }
    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: format!("{}\n{}", help.full, help.link),
        }),
        range: Some(lsp_range(&token.range)),
    })
}

/// Resolves a quoted literal to the file or declaration it names. Directory
/// references land on the declaration matching the label (explicit, or the
/// directory's own name); a file that parses but declares no such label gets
/// the head-of-file fallback span.
fn definition(engine: &dyn AnalysisEngine, file: &Path, line: u32, column: u32) -> Vec<LocationLink> {
    let Some(context) = engine.analyze(file, line, column) else {
        return Vec::new();
    };
    let Some(token) = context.token else {
        return Vec::new();
    };
    if token.kind != TokenKind::Literal || !token.value.starts_with('"') {
        return Vec::new();
    }
    let origin = lsp_range(&token.range);
    let TargetAddress { path, label } = resolver::definition_address(&token.value, file, &context.root);
    let Ok(metadata) = fs::metadata(&path) else {
        return Vec::new();
    };
    if metadata.is_file() {
        return location_link(origin, &path, None).into_iter().collect();
    }
    if !metadata.is_dir() {
        return Vec::new();
    }
    let target = match label {
        Some(label) => label,
        None => path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    let build_file = path.join(resolver::BUILD_FILE);
    let Ok(content) = fs::read_to_string(&build_file) else {
        return Vec::new();
    };
    let Some(scope) = engine.parse(&build_file, Some(&content)) else {
        return Vec::new();
    };
    let declared = scope.declares.iter().find_map(|declare| {
        let (_, label) = resolver::declared_label(declare);
        (label == target).then(|| lsp_range(&declare.range))
    });
    location_link(origin, &build_file, declared).into_iter().collect()
}

fn location_link(origin: Range, path: &Path, range: Option<Range>) -> Option<LocationLink> {
    let uri = Url::from_file_path(path).ok()?;
    // Head-of-file stand-in when no declaration range is known.
    let range = range.unwrap_or(Range {
        start: Position::new(0, 0),
        end: Position::new(2, 0),
    });
    Some(LocationLink {
        origin_selection_range: Some(origin),
        target_uri: uri,
        target_range: range,
        target_selection_range: range,
    })
}

/// Maps the engine's outline tree onto the protocol shape, preserving order
/// and nesting.
fn document_symbols(nodes: &[SymbolNode]) -> Vec<DocumentSymbol> {
    nodes.iter().map(document_symbol).collect()
}

fn document_symbol(node: &SymbolNode) -> DocumentSymbol {
    let children = if node.children.is_empty() {
        None
    } else {
        Some(document_symbols(&node.children))
    };
    #[allow(deprecated)]
    DocumentSymbol {
        name: node.name.clone(),
        detail: None,
        kind: symbol_kind(node.kind),
        tags: None,
        deprecated: None,
        range: lsp_range(&node.range),
        selection_range: lsp_range(&node.selection_range),
        children,
    }
}

fn symbol_kind(kind: gn_engine::SymbolKind) -> SymbolKind {
    match kind {
        gn_engine::SymbolKind::Function => SymbolKind::FUNCTION,
        gn_engine::SymbolKind::Condition => SymbolKind::BOOLEAN,
        gn_engine::SymbolKind::Else => SymbolKind::OPERATOR,
        gn_engine::SymbolKind::Variable => SymbolKind::VARIABLE,
    }
}
