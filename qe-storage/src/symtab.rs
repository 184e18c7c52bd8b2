//! Symbol table: string <-> small integer, with ten pre-interned system
//! symbols, grounded in `ion/symtab.go`.
//!
//! The wire encoding here is our own — an annotation tag, then a
//! length-prefixed struct of `(field symbol, kind, length-prefixed payload)`
//! triples — rather than full Ion binary. It preserves the shape of an
//! annotation wrapping a struct with a `symbols: [...]` field, unknown
//! fields skipped by length, without pulling in a complete Ion encoder for
//! a format this crate otherwise has no use for.

use std::collections::HashMap;

use crate::error::SymtabError;
use crate::record::SymtabUnmarshalOutcome;

/// An interned symbol id. System symbols occupy `0..SYSTEM_SYMS.len()`;
/// user symbols start at `SYSTEM_SYMS.len()` (10).
pub type Symbol = u32;

/// Pre-interned system symbols, in id order: the fixed system table every
/// symbol table starts with before any user symbol is interned.
pub const SYSTEM_SYMS: [&str; 10] = [
    "$0",
    "$ion",
    "$ion_1_0",
    "$ion_symbol_table",
    "name",
    "version",
    "imports",
    "symbols",
    "max_id",
    "$ion_shared_symbol_table",
];

const SYMBOL_IMPORTS: Symbol = 6;
const SYMBOL_SYMBOLS: Symbol = 7;
const DOLLAR_ION_SYMBOL_TABLE: Symbol = 3;
const DOLLAR_ION_SHARED_SYMBOL_TABLE: Symbol = 9;

const ANNOTATION_TAG: u8 = 0xE1;
const FIELD_KIND_SYMBOL_LIST: u8 = 0;
const FIELD_KIND_SYMBOL: u8 = 1;
const FIELD_KIND_BYTES: u8 = 2;

/// A symbol table: the mutable half (interned strings above the system
/// set) plus the reverse index used by `intern`/`symbolize`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Symtab {
    interned: Vec<String>,
    to_index: HashMap<String, usize>,
}

impl Symtab {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all interned symbols (system symbols are always present and
    /// unaffected).
    pub fn reset(&mut self) {
        self.interned.clear();
        self.to_index.clear();
    }

    /// Looks up the string for a symbol id, if any.
    pub fn get(&self, sym: Symbol) -> Option<&str> {
        let sym = sym as usize;
        if sym < SYSTEM_SYMS.len() {
            return Some(SYSTEM_SYMS[sym]);
        }
        self.interned.get(sym - SYSTEM_SYMS.len()).map(String::as_str)
    }

    /// Total number of interned symbols, system symbols included. An empty
    /// table therefore has `max_id() == 10`.
    pub fn max_id(&self) -> u32 {
        (SYSTEM_SYMS.len() + self.interned.len()) as u32
    }

    /// Interns `s`, returning its existing id if already present.
    pub fn intern(&mut self, s: &str) -> Symbol {
        if let Some(i) = SYSTEM_SYMS.iter().position(|&sys| sys == s) {
            return i as Symbol;
        }
        if let Some(&i) = self.to_index.get(s) {
            return (SYSTEM_SYMS.len() + i) as Symbol;
        }
        let i = self.interned.len();
        self.interned.push(s.to_owned());
        self.to_index.insert(s.to_owned(), i);
        (SYSTEM_SYMS.len() + i) as Symbol
    }

    /// Looks up the id for `s` without interning it.
    pub fn symbolize(&self, s: &str) -> Option<Symbol> {
        if let Some(i) = SYSTEM_SYMS.iter().position(|&sys| sys == s) {
            return Some(i as Symbol);
        }
        self.to_index.get(s).map(|&i| (SYSTEM_SYMS.len() + i) as Symbol)
    }

    /// The lowest id `s` could ever be symbolized as: its system-symbol id
    /// if it is one, or `SYSTEM_SYMS.len()` (10) otherwise.
    pub fn minimum_id(s: &str) -> u32 {
        SYSTEM_SYMS
            .iter()
            .position(|&sys| sys == s)
            .map(|i| i as u32)
            .unwrap_or(SYSTEM_SYMS.len() as u32)
    }

    /// True iff `self` is a superset of `inner` with identical ids for the
    /// shared prefix — i.e. `self` can stand in for `inner` unmodified.
    pub fn contains(&self, inner: &Symtab) -> bool {
        if inner.interned.len() > self.interned.len() {
            return false;
        }
        inner.interned.iter().zip(self.interned.iter()).all(|(a, b)| a == b)
    }

    /// Writes the full table, optionally preceded by the binary version
    /// marker. If `with_bvm` is false and the table has nothing
    /// above the system symbols, nothing is written.
    pub fn marshal(&self, with_bvm: bool) -> Vec<u8> {
        self.marshal_from(0, with_bvm)
    }

    /// Writes only the symbols interned at or above `starting`, an
    /// incremental append. Mirrors a `MarshalPart`-style method,
    /// including its early-return when `starting` doesn't exceed the
    /// system symbol count: that case is meant to be served by
    /// [`Symtab::marshal`] instead.
    pub fn marshal_part(&self, starting: Symbol) -> Vec<u8> {
        self.marshal_from(starting, false)
    }

    fn marshal_from(&self, starting: Symbol, with_bvm: bool) -> Vec<u8> {
        let mut out = Vec::new();
        if with_bvm {
            crate::record::VersionMarker { version: 1 }.write(&mut out);
        }
        let sys_len = SYSTEM_SYMS.len();
        let mut count = 0usize;
        if starting as usize > sys_len {
            count = starting as usize - sys_len;
            if count > self.interned.len() {
                count = self.interned.len();
            }
        }
        let delta = &self.interned[count..];
        if delta.is_empty() && !with_bvm {
            return out;
        }

        let mut body = Vec::new();
        body.extend(DOLLAR_ION_SYMBOL_TABLE.to_le_bytes());

        let field_count: u32 = if with_bvm { 1 } else { 2 };
        body.extend(field_count.to_le_bytes());

        if !with_bvm {
            body.extend(SYMBOL_IMPORTS.to_le_bytes());
            body.push(FIELD_KIND_SYMBOL);
            let payload = DOLLAR_ION_SYMBOL_TABLE.to_le_bytes();
            body.extend((payload.len() as u32).to_le_bytes());
            body.extend(payload);
        }

        body.extend(SYMBOL_SYMBOLS.to_le_bytes());
        body.push(FIELD_KIND_SYMBOL_LIST);
        let mut list_payload = Vec::new();
        list_payload.extend((delta.len() as u32).to_le_bytes());
        for s in delta {
            list_payload.extend((s.len() as u32).to_le_bytes());
            list_payload.extend(s.as_bytes());
        }
        body.extend((list_payload.len() as u32).to_le_bytes());
        body.extend(list_payload);

        out.push(ANNOTATION_TAG);
        out.extend((body.len() as u32).to_le_bytes());
        out.extend(body);
        out
    }

    /// Reads one symbol-table annotation from the front of `bytes`,
    /// appending any new symbols onto `into`. Returns
    /// [`SymtabUnmarshalOutcome::NotAnAnnotation`] (not an error) if `bytes`
    /// doesn't open with the annotation tag at all.
    pub(crate) fn unmarshal<'a>(
        bytes: &'a [u8],
        into: &mut Symtab,
    ) -> Result<&'a [u8], SymtabUnmarshalOutcome> {
        use SymtabUnmarshalOutcome::{Error, NotAnAnnotation};

        if bytes.first() != Some(&ANNOTATION_TAG) {
            return Err(NotAnAnnotation);
        }
        let body_len = read_u32(bytes, 1).ok_or(Error(SymtabError::Truncated {
            context: "annotation length",
        }))? as usize;
        let body_start = 5;
        let body_end = body_start
            .checked_add(body_len)
            .filter(|&e| e <= bytes.len())
            .ok_or(Error(SymtabError::Truncated {
                context: "annotation body",
            }))?;
        let body = &bytes[body_start..body_end];
        let rest = &bytes[body_end..];

        let mut p = 0usize;
        let subject = read_u32(body, p).ok_or(Error(SymtabError::Truncated {
            context: "annotation subject symbol",
        }))?;
        p += 4;
        if subject == DOLLAR_ION_SHARED_SYMBOL_TABLE {
            return Err(Error(SymtabError::SharedSymbolTable));
        }
        if subject != DOLLAR_ION_SYMBOL_TABLE {
            return Err(Error(SymtabError::NotASymbolTableAnnotation(subject)));
        }

        let field_count = read_u32(body, p).ok_or(Error(SymtabError::Truncated {
            context: "field count",
        }))?;
        p += 4;

        for _ in 0..field_count {
            let field_sym = read_u32(body, p).ok_or(Error(SymtabError::Truncated {
                context: "field symbol",
            }))?;
            p += 4;
            let kind = *body.get(p).ok_or(Error(SymtabError::Truncated {
                context: "field kind",
            }))?;
            p += 1;
            let payload_len = read_u32(body, p).ok_or(Error(SymtabError::Truncated {
                context: "field payload length",
            }))? as usize;
            p += 4;
            let payload_end = p.checked_add(payload_len).filter(|&e| e <= body.len()).ok_or(
                Error(SymtabError::Truncated {
                    context: "field payload",
                }),
            )?;
            let payload = &body[p..payload_end];
            p = payload_end;

            if field_sym == SYMBOL_SYMBOLS && kind == FIELD_KIND_SYMBOL_LIST {
                let mut q = 0usize;
                let n = read_u32(payload, q).ok_or(Error(SymtabError::Truncated {
                    context: "symbol list count",
                }))?;
                q += 4;
                for _ in 0..n {
                    let slen = read_u32(payload, q).ok_or(Error(SymtabError::Truncated {
                        context: "symbol string length",
                    }))? as usize;
                    q += 4;
                    let send = q.checked_add(slen).filter(|&e| e <= payload.len()).ok_or(
                        Error(SymtabError::Truncated {
                            context: "symbol string bytes",
                        }),
                    )?;
                    let s = std::str::from_utf8(&payload[q..send])
                        .map_err(|_| Error(SymtabError::InvalidUtf8))?;
                    // An identical string interned twice keeps its first id
                    // (mirrors the source's "what is correct behavior"
                    // comment: append regardless, but only index the first).
                    into.interned.push(s.to_owned());
                    into
                        .to_index
                        .entry(s.to_owned())
                        .or_insert(into.interned.len() - 1);
                    q = send;
                }
            }
            // FIELD_KIND_SYMBOL (imports) and FIELD_KIND_BYTES (unknown
            // fields) are both already skipped by `payload_end` above; we
            // only special-case the symbols list because it's the only
            // field this crate needs to act on.
            let _ = kind == FIELD_KIND_SYMBOL || kind == FIELD_KIND_BYTES;
        }

        Ok(rest)
    }
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let b = bytes.get(at..at + 4)?;
    Some(u32::from_le_bytes(b.try_into().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_symbols_precede_interned_ones() {
        let mut t = Symtab::new();
        assert_eq!(t.get(3), Some("$ion_symbol_table"));
        assert_eq!(t.max_id(), 10);
        let a = t.intern("Make");
        assert_eq!(a, 10);
        assert_eq!(t.get(10), Some("Make"));
        assert_eq!(t.intern("Make"), 10);
    }

    #[test]
    fn marshal_then_unmarshal_round_trips() {
        let mut t = Symtab::new();
        t.intern("Make");
        t.intern("Model");
        t.intern("Ticket");

        let bytes = t.marshal(true);
        let mut dst = Symtab::new();
        let rest = Symtab::unmarshal(&bytes[4..], &mut dst).expect("decodes");
        assert!(rest.is_empty());
        assert_eq!(dst, t);
    }

    #[test]
    fn incremental_marshal_plus_prefix_reconstructs_whole() {
        let mut t = Symtab::new();
        t.intern("a");
        t.intern("b");
        let checkpoint = t.max_id();
        t.intern("c");
        t.intern("d");

        let prefix = {
            let mut only_ab = Symtab::new();
            only_ab.intern("a");
            only_ab.intern("b");
            only_ab.marshal(false)
        };
        let delta = t.marshal_part(checkpoint);

        let mut dst = Symtab::new();
        let rest = Symtab::unmarshal(&prefix, &mut dst).expect("decodes prefix");
        assert!(rest.is_empty());
        let rest = Symtab::unmarshal(&delta, &mut dst).expect("decodes delta");
        assert!(rest.is_empty());
        assert_eq!(dst, t);
    }

    #[test]
    fn shared_symbol_tables_are_rejected() {
        let mut body = Vec::new();
        body.extend(DOLLAR_ION_SHARED_SYMBOL_TABLE.to_le_bytes());
        body.extend(0u32.to_le_bytes());
        let mut bytes = vec![ANNOTATION_TAG];
        bytes.extend((body.len() as u32).to_le_bytes());
        bytes.extend(body);

        let mut dst = Symtab::new();
        let err = Symtab::unmarshal(&bytes, &mut dst).unwrap_err();
        assert!(matches!(
            err,
            SymtabUnmarshalOutcome::Error(SymtabError::SharedSymbolTable)
        ));
    }

    #[test]
    fn unknown_fields_are_skipped_by_length() {
        let mut body = Vec::new();
        body.extend(DOLLAR_ION_SYMBOL_TABLE.to_le_bytes());
        body.extend(1u32.to_le_bytes()); // one field
        body.extend(99u32.to_le_bytes()); // unrecognized field symbol
        body.push(FIELD_KIND_BYTES);
        let junk = b"ignore me";
        body.extend((junk.len() as u32).to_le_bytes());
        body.extend(junk);

        let mut bytes = vec![ANNOTATION_TAG];
        bytes.extend((body.len() as u32).to_le_bytes());
        bytes.extend(body);
        bytes.push(0xff); // trailing byte belonging to the caller

        let mut dst = Symtab::new();
        let rest = Symtab::unmarshal(&bytes, &mut dst).expect("skips unknown field");
        assert_eq!(rest, &[0xff]);
        assert_eq!(dst, Symtab::new());
    }
}
