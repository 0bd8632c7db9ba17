//! gn-lsp entry point: loads the analysis engine and serves LSP over stdio.

use std::env;
use std::path::{Path, PathBuf};

use gn_engine::NativeEngine;
use tower_lsp::{LspService, Server};

mod document_store;
mod registry;
mod resolver;
mod server;
#[cfg(test)]
mod support;

#[tokio::main]
async fn main() {
    let path = engine_library_path();
    eprintln!("gn-lsp: loading engine from {}", path.display());
    let engine = match NativeEngine::load(&path) {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("gn-lsp: {err}");
            std::process::exit(1);
        }
    };
    eprintln!("gn-lsp: starting server");
    let backend = server::Backend::new(engine);
    let (stdin, stdout) = (tokio::io::stdin(), tokio::io::stdout());
    let (service, socket) = LspService::new(|client| backend.with_client(client));
    Server::new(stdin, stdout, socket).serve(service).await;
    eprintln!("gn-lsp: server exited");
}

/// `--engine <path>` wins, then `GN_LSP_ENGINE`, then the platform library
/// name next to the server executable.
fn engine_library_path() -> PathBuf {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--engine" {
            if let Some(path) = args.next() {
                return PathBuf::from(path);
            }
        }
    }
    if let Some(path) = env::var_os("GN_LSP_ENGINE") {
        return PathBuf::from(path);
    }
    let library = format!(
        "{}gn_analysis{}",
        env::consts::DLL_PREFIX,
        env::consts::DLL_SUFFIX
    );
    let exe_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    match exe_dir {
        Some(dir) => dir.join(library),
        None => PathBuf::from(library),
    }
}
