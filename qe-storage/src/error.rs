//! Errors raised by the storage collaborator boundary.
//!
//! These propagate unchanged through `qe-vm`'s `InterpreterError<StorageError>`
//! — this crate never decides whether an I/O failure is recoverable, it just
//! reports what happened.

use thiserror::Error;

/// Failure decoding a symbol table or record framing payload.
#[derive(Debug, Error)]
pub enum SymtabError {
    #[error("expected annotation wrapping $ion_symbol_table, found symbol id {0}")]
    NotASymbolTableAnnotation(u32),
    #[error("truncated symbol table: {context}")]
    Truncated { context: &'static str },
    #[error("shared symbol tables are not supported (annotation symbol id 9)")]
    SharedSymbolTable,
    #[error("malformed UTF-8 in interned string")]
    InvalidUtf8,
}

/// Failure parsing the 4-byte binary record version marker.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("buffer too short for a version marker: need 4 bytes, got {0}")]
    TooShort(usize),
    #[error("bad version marker: expected lead 0xE0 and trailer 0xEA, got [{0:#04x}, _, _, {1:#04x}]")]
    BadMarker(u8, u8),
    #[error(transparent)]
    Symtab(#[from] SymtabError),
}

/// Failure during a garbage-collection pass.
#[derive(Debug, Error)]
pub enum GcError<IoError> {
    #[error("listing {pattern} under {scope}: {source}")]
    Walk {
        scope: String,
        pattern: &'static str,
        #[source]
        source: IoError,
    },
    #[error("removing {path}: {source}")]
    Remove {
        path: String,
        #[source]
        source: IoError,
    },
}
