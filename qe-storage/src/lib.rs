//! External-collaborator contracts for the query engine: symbol table,
//! binary record framing, and garbage collection.
//!
//! Nothing in this crate executes a query; it defines the boundary the
//! interpreter (`qe-vm`) and compiler (`qe-ir`) read and write through, the
//! same kind of boundary a storage crate defines for the state an
//! interpreter reads through at arm's length.

pub mod error;
pub mod gc;
pub mod record;
pub mod symtab;

pub use error::{GcError, RecordError, SymtabError};
pub use gc::{Candidate, GcConfig, IndexView, RemoveFs, ToDelete};
pub use record::{Mappable, PackedBlock, StorageInspect, StorageMutate, StreamHeader, VersionMarker};
pub use symtab::{Symbol, Symtab};
