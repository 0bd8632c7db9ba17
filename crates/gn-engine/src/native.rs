//! Shared-library binding for the analysis engine.
//!
//! The engine exports C functions that exchange UTF-8 JSON buffers. Results
//! are returned as malloc'd strings released through `gn_dispose`; a null
//! result means the engine has nothing for the query. All calls go through
//! one guard mutex because the engine keeps per-file state and is not
//! required to be thread-safe.

use std::ffi::{c_char, CStr, CString};
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Mutex;

use libloading::Library;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::{AnalysisEngine, Context, Help, HelpKind, Scope, ValidationError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to load engine library {}: {source}", path.display())]
    Load {
        path: PathBuf,
        source: libloading::Error,
    },
    #[error("engine library is missing symbol {name}: {source}")]
    MissingSymbol {
        name: &'static str,
        source: libloading::Error,
    },
}

type UpdateFn = unsafe extern "C" fn(*const c_char, *const c_char);
type CloseFn = unsafe extern "C" fn(*const c_char);
type ValidateFn = unsafe extern "C" fn(*const c_char) -> *mut c_char;
type AnalyzeFn = unsafe extern "C" fn(*const c_char, u32, u32) -> *mut c_char;
type ParseFn = unsafe extern "C" fn(*const c_char, *const c_char) -> *mut c_char;
type FormatFn = unsafe extern "C" fn(*const c_char) -> *mut c_char;
type HelpFn = unsafe extern "C" fn(*const c_char, *const c_char) -> *mut c_char;
type DisposeFn = unsafe extern "C" fn(*mut c_char);

struct Vtable {
    update: UpdateFn,
    close: CloseFn,
    validate: ValidateFn,
    analyze: AnalyzeFn,
    parse: ParseFn,
    format: FormatFn,
    help: HelpFn,
    dispose: DisposeFn,
}

/// The production [`AnalysisEngine`]: the GN engine loaded from a shared
/// library. The library handle must outlive every copied function pointer,
/// so it is kept alongside the vtable for the engine's whole lifetime.
pub struct NativeEngine {
    vtable: Mutex<Vtable>,
    _library: Library,
}

impl NativeEngine {
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let library = unsafe { Library::new(path) }.map_err(|source| EngineError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        let vtable = Vtable {
            update: lookup(&library, "gn_update")?,
            close: lookup(&library, "gn_close")?,
            validate: lookup(&library, "gn_validate")?,
            analyze: lookup(&library, "gn_analyze")?,
            parse: lookup(&library, "gn_parse")?,
            format: lookup(&library, "gn_format")?,
            help: lookup(&library, "gn_help")?,
            dispose: lookup(&library, "gn_dispose")?,
        };
        Ok(Self {
            vtable: Mutex::new(vtable),
            _library: library,
        })
    }

    fn query<T: DeserializeOwned>(
        &self,
        what: &str,
        call: impl FnOnce(&Vtable) -> *mut c_char,
    ) -> Option<T> {
        let vtable = self.vtable.lock().expect("engine call guard poisoned");
        let raw = call(&vtable);
        if raw.is_null() {
            return None;
        }
        let text = unsafe { CStr::from_ptr(raw) }.to_str().ok().map(str::to_owned);
        unsafe { (vtable.dispose)(raw) };
        match serde_json::from_str(&text?) {
            Ok(value) => Some(value),
            Err(err) => {
                eprintln!("gn-lsp: engine returned malformed {what}: {err}");
                None
            }
        }
    }
}

fn lookup<T: Copy>(library: &Library, name: &'static str) -> Result<T, EngineError> {
    unsafe {
        library
            .get::<T>(name.as_bytes())
            .map(|symbol| *symbol)
            .map_err(|source| EngineError::MissingSymbol { name, source })
    }
}

fn c_string(text: &str) -> Option<CString> {
    CString::new(text).ok()
}

fn c_path(path: &Path) -> Option<CString> {
    c_string(&path.to_string_lossy())
}

impl AnalysisEngine for NativeEngine {
    fn update(&self, file: &Path, content: &str) {
        let (Some(file), Some(content)) = (c_path(file), c_string(content)) else {
            return;
        };
        let vtable = self.vtable.lock().expect("engine call guard poisoned");
        unsafe { (vtable.update)(file.as_ptr(), content.as_ptr()) };
    }

    fn close(&self, file: &Path) {
        let Some(file) = c_path(file) else { return };
        let vtable = self.vtable.lock().expect("engine call guard poisoned");
        unsafe { (vtable.close)(file.as_ptr()) };
    }

    fn validate(&self, file: &Path) -> Option<ValidationError> {
        let file = c_path(file)?;
        self.query("validation error", |vtable| unsafe {
            (vtable.validate)(file.as_ptr())
        })
    }

    fn analyze(&self, file: &Path, line: u32, column: u32) -> Option<Context> {
        let file = c_path(file)?;
        self.query("context", |vtable| unsafe {
            (vtable.analyze)(file.as_ptr(), line, column)
        })
    }

    fn parse(&self, file: &Path, content: Option<&str>) -> Option<Scope> {
        let file = c_path(file)?;
        let content = match content {
            Some(content) => Some(c_string(content)?),
            None => None,
        };
        let content_ptr = content
            .as_ref()
            .map(|content| content.as_ptr())
            .unwrap_or(ptr::null());
        self.query("scope", |vtable| unsafe {
            (vtable.parse)(file.as_ptr(), content_ptr)
        })
    }

    fn format(&self, file: &Path) -> Option<String> {
        let file = c_path(file)?;
        self.query::<String>("formatted text", |vtable| unsafe {
            (vtable.format)(file.as_ptr())
        })
        .filter(|text| !text.is_empty())
    }

    fn help(&self, kind: HelpKind, name: &str) -> Option<Help> {
        let kind = c_string(kind.as_str())?;
        let name = c_string(name)?;
        self.query::<Help>("help entry", |vtable| unsafe {
            (vtable.help)(kind.as_ptr(), name.as_ptr())
        })
        .filter(|help| !help.is_empty())
    }
}
