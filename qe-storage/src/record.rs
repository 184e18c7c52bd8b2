//! Binary record framing and the storage collaborator trait boundary.
//!
//! The trait split below follows a `Mappable` associated-type bundle plus
//! `StorageInspect`/`StorageMutate` traits generic over it, so the VM's
//! storage collaborator can be swapped (in-memory, on-disk, mocked in
//! tests) without the interpreter depending on a concrete backend.

use std::borrow::Cow;

use crate::error::RecordError;
use crate::symtab::Symtab;

/// Version marker lead byte.
pub const VERSION_MARKER_LEAD: u8 = 0xE0;
/// Version marker trailer byte.
pub const VERSION_MARKER_TRAIL: u8 = 0xEA;

/// The 4-byte marker every record stream starts with. Its presence resets
/// symbol-table state for the reader; its absence means the following bytes
/// append to whatever symbol table is already in scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionMarker {
    pub version: u16,
}

impl VersionMarker {
    /// Parses a marker from the front of `bytes`, if one is present.
    ///
    /// Returns `Ok(None)` (not an error) when the stream doesn't open with
    /// `0xE0`, since absence of the marker is meaningful (append mode)
    /// rather than malformed input.
    pub fn parse(bytes: &[u8]) -> Result<(Option<VersionMarker>, &[u8]), RecordError> {
        if bytes.first() != Some(&VERSION_MARKER_LEAD) {
            return Ok((None, bytes));
        }
        if bytes.len() < 4 {
            return Err(RecordError::TooShort(bytes.len()));
        }
        if bytes[3] != VERSION_MARKER_TRAIL {
            return Err(RecordError::BadMarker(bytes[0], bytes[3]));
        }
        let version = u16::from_le_bytes([bytes[1], bytes[2]]);
        Ok((Some(VersionMarker { version }), &bytes[4..]))
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        let [lo, hi] = self.version.to_le_bytes();
        out.extend_from_slice(&[VERSION_MARKER_LEAD, lo, hi, VERSION_MARKER_TRAIL]);
    }
}

/// A decoded record stream prefix: the marker (if any) and the symbol table
/// in effect after applying it.
#[derive(Debug, Clone)]
pub struct StreamHeader {
    pub marker: Option<VersionMarker>,
    pub symtab: Symtab,
}

impl StreamHeader {
    /// Reads a marker, then a symbol-table annotation if the following bytes
    /// are one (see [`crate::symtab::Symtab::unmarshal`]), folding it onto
    /// `base`. If the marker is present, `base` is discarded and replaced
    /// (marker presence resets the table); otherwise the new symbols are
    /// appended onto `base`.
    pub fn read<'a>(bytes: &'a [u8], base: &Symtab) -> Result<(StreamHeader, &'a [u8]), RecordError> {
        let (marker, rest) = VersionMarker::parse(bytes)?;
        let mut symtab = if marker.is_some() {
            Symtab::new()
        } else {
            base.clone()
        };
        let rest = match Symtab::unmarshal(rest, &mut symtab) {
            Ok(rest) => rest,
            Err(SymtabUnmarshalOutcome::NotAnAnnotation) => rest,
            Err(SymtabUnmarshalOutcome::Error(e)) => return Err(e.into()),
        };
        Ok((StreamHeader { marker, symtab }, rest))
    }
}

/// Distinguishes "the next value isn't a symbol table at all" (not an
/// error — callers should leave the bytes alone) from an actual decode
/// failure.
pub(crate) enum SymtabUnmarshalOutcome {
    NotAnAnnotation,
    Error(crate::error::SymtabError),
}

/// Bundles the key/value types for one storage-mapped collection, mirroring
/// `fuel_storage::Mappable`.
pub trait Mappable {
    type Key: ?Sized;
    type SetValue: ?Sized;
    type GetValue: Clone;
}

/// Read-only half of the storage collaborator boundary.
pub trait StorageInspect<Type: Mappable> {
    type Error;

    fn get(&self, key: &Type::Key) -> Result<Option<Cow<'_, Type::GetValue>>, Self::Error>;
    fn contains_key(&self, key: &Type::Key) -> Result<bool, Self::Error>;
}

/// Mutating half of the storage collaborator boundary.
pub trait StorageMutate<Type: Mappable>: StorageInspect<Type> {
    fn insert(
        &mut self,
        key: &Type::Key,
        value: &Type::SetValue,
    ) -> Result<Option<Type::GetValue>, Self::Error>;

    fn remove(&mut self, key: &Type::Key) -> Result<Option<Type::GetValue>, Self::Error>;
}

/// A named block of packed record bytes, keyed by its path within a
/// database/table (the `Mappable` instantiation the GC and VM execution
/// layers read through).
pub struct PackedBlock;

impl Mappable for PackedBlock {
    type Key = str;
    type SetValue = [u8];
    type GetValue = Vec<u8>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_round_trips() {
        let marker = VersionMarker { version: 1 };
        let mut buf = Vec::new();
        marker.write(&mut buf);
        assert_eq!(buf, [0xE0, 0x01, 0x00, 0xEA]);
        let (parsed, rest) = VersionMarker::parse(&buf).unwrap();
        assert_eq!(parsed, Some(marker));
        assert!(rest.is_empty());
    }

    #[test]
    fn absence_of_marker_is_not_an_error() {
        let bytes = [0x01, 0x02, 0x03];
        let (parsed, rest) = VersionMarker::parse(&bytes).unwrap();
        assert_eq!(parsed, None);
        assert_eq!(rest, &bytes);
    }

    #[test]
    fn rejects_bad_trailer() {
        let bytes = [0xE0, 0x01, 0x00, 0x00];
        assert!(VersionMarker::parse(&bytes).is_err());
    }
}
