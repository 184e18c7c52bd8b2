//! VM execution state & error model, grounded field-for-field on
//! `vm/bytecode.go`'s `bytecode` struct.
//!
//! The source struct is deliberately flat because its fields are read
//! directly by hand-written assembly ("XXX struct offsets known to
//! assembly!"); nothing here needs that, so we keep the same fields but
//! give them normal Rust visibility and methods instead of raw-offset
//! access.

use qe_asm::{DictRef, Displacement, Slot, TreeRef};

use crate::alloc::{Arena, PageReclaim, PAGE_SIZE};
use crate::aggregate::{SimpleAggregates, SlotTable};
use crate::error::VmError;
use crate::radix::RadixTree64;
use crate::regs::Registers;

/// Number of bytes the spill area reserves, matching `vm/bytecode.go`'s
/// `spillArea [256]byte` (room for four 64-byte ZMM registers).
pub const SPILL_AREA_SIZE: usize = 256;

/// One compiled query's full execution state: bytecode bytes, value/hash
/// save-restore stacks, string dictionary, radix trees, per-lane bucket
/// scratch, the literal scratch page, outer-scope linkage for correlated
/// execution, and the sticky `(err, errpc, errinfo)` triple opcodes use to
/// signal recoverable/fatal failure.
pub struct Bytecode {
    /// The compiled `(opcode, immediates...)` byte stream.
    pub compiled: Vec<u8>,
    /// Save/restore backing store for `RegOp` spills of `K`/`S`/`V`/`B`,
    /// sized to `vstacksize` bytes and addressed by [`Slot`] (a byte
    /// offset, matching `vm/bytecode.go`'s `vstack []uint64`).
    pub vstack: Vec<u64>,
    /// Save/restore backing store for chained hash composition
    /// (`hashvalue+`'s `Slot` operand), matching `vm/bytecode.go`'s
    /// `hashmem []uint64` — kept as a parallel, separately-sized stack
    /// since `H` is 128 bits/lane where `K`/`S`/`V`/`B` are 64.
    pub hashstack: Vec<(u64, u64)>,
    /// String/literal dictionary, indexed by [`DictRef`] immediates.
    pub dict: Vec<String>,
    /// Radix trees referenced by `hashmember`/`hashlookup`'s [`TreeRef`]
    /// immediate.
    pub trees: Vec<RadixTree64>,
    /// Accumulator state for slotted aggregates, indexed by the same
    /// [`Slot`] an `AggSlot` opcode carries.
    pub slot_aggs: Vec<SlotTable>,
    /// Accumulator state for ungrouped aggregates, keyed internally by
    /// instruction pc (see `aggregate::SimpleAggregates`).
    pub simple_aggs: SimpleAggregates,

    /// The `L` register's backing store across a whole batch — named
    /// `lbuf` in `vm/bytecode.go`, distinct from the live per-instruction
    /// `L` lanes in [`Registers`].
    pub lbuf: [i64; qe_asm::LANES],

    /// Literal-material scratch page, allocated from the VM arena by
    /// `setlit`.
    scratch: Option<Box<[u8]>>,
    scratch_reserve: usize,
    scratch_off: Displacement,

    /// Outer-scope linkage for nested correlated execution: the
    /// enclosing bytecode, plus the 16-lane permutation from outer to
    /// inner bindings.
    pub outer: Option<Box<Bytecode>>,
    pub perm: [i32; qe_asm::LANES],

    /// Register spill area, matching `spillArea [256]byte` — single
    /// instruction at a time, never persisted across opcodes.
    pub spill_area: [u8; SPILL_AREA_SIZE],

    vstacksize: usize,
    hstacksize: usize,

    pub err: Option<VmError>,
    pub errpc: i32,
    pub errinfo: i64,
}

impl Default for Bytecode {
    fn default() -> Bytecode {
        Bytecode {
            compiled: Vec::new(),
            vstack: Vec::new(),
            hashstack: Vec::new(),
            dict: Vec::new(),
            trees: Vec::new(),
            slot_aggs: Vec::new(),
            simple_aggs: SimpleAggregates::new(),
            lbuf: [0; qe_asm::LANES],
            scratch: None,
            scratch_reserve: 0,
            scratch_off: 0,
            outer: None,
            perm: [-1; qe_asm::LANES],
            spill_area: [0; SPILL_AREA_SIZE],
            vstacksize: 0,
            hstacksize: 0,
            err: None,
            errpc: 0,
            errinfo: 0,
        }
    }
}

impl Bytecode {
    pub fn new() -> Bytecode {
        Bytecode::default()
    }

    /// Appends the final `ret` instruction to `compiled`.
    pub fn finalize(&mut self) {
        self.compiled
            .extend_from_slice(&qe_asm::Opcode::Ret.encode());
    }

    pub fn ensure_vstack_size(&mut self, size: usize) {
        self.vstacksize = self.vstacksize.max(size);
    }

    pub fn ensure_hstack_size(&mut self, size: usize) {
        self.hstacksize = self.hstacksize.max(size);
    }

    /// Grows both backing stacks to `ceil(size/8)` 64-bit words.
    pub fn alloc_stacks(&mut self) {
        let vwords = (self.vstacksize + 7) / 8;
        let hwords = (self.hstacksize + 7) / 8;
        self.vstack.resize(vwords, 0);
        self.hashstack.resize(hwords, (0, 0));
    }

    /// `setlit`: reserves an initial prefix of a fresh arena page for
    /// literal material the bytecode can project directly, and records
    /// its arena displacement so opcodes can address it with `litref`.
    /// Mirrors `vm/bytecode.go`'s `setlit`, including its same-page-size
    /// upper bound on what can be reserved as a literal prefix.
    pub fn set_literals<R: PageReclaim>(&mut self, arena: &mut Arena<R>, buf: &[u8]) -> Result<(), VmError> {
        if buf.len() > PAGE_SIZE {
            return Err(VmError::MoreScratch);
        }
        let page = arena.malloc().ok_or(VmError::MoreScratch)?;
        let reserve = buf.len().min(page.len());
        page[..reserve].copy_from_slice(&buf[..reserve]);
        let (displacement, _) = arena
            .displacement(&page[..1])
            .expect("page just allocated from this arena");
        self.scratch = Some(page[..reserve].to_vec().into_boxed_slice());
        self.scratch_reserve = reserve;
        self.scratch_off = displacement;
        Ok(())
    }

    pub fn literal_displacement(&self) -> Displacement {
        self.scratch_off
    }

    pub fn literals(&self) -> &[u8] {
        self.scratch.as_deref().unwrap_or(&[])
    }

    /// Reads a literal by the two hex displacements a `litref` opcode
    /// carries: `(start, end)`, both relative to [`literal_displacement`].
    pub fn read_litref(&self, start: Displacement, end: Displacement) -> Option<&[u8]> {
        let base = self.scratch_off;
        let lo = start.checked_sub(base)? as usize;
        let hi = end.checked_sub(base)? as usize;
        self.literals().get(lo..hi)
    }

    pub fn tree(&self, r: TreeRef) -> Option<&RadixTree64> {
        self.trees.get(r as usize)
    }

    pub fn tree_mut(&mut self, r: TreeRef) -> Option<&mut RadixTree64> {
        self.trees.get_mut(r as usize)
    }

    pub fn slot_table(&mut self, slot: Slot) -> &mut SlotTable {
        let idx = slot as usize;
        if idx >= self.slot_aggs.len() {
            self.slot_aggs.resize_with(idx + 1, SlotTable::new);
        }
        &mut self.slot_aggs[idx]
    }

    pub fn dict_str(&self, r: DictRef) -> Option<&str> {
        self.dict.get(r as usize).map(String::as_str)
    }

    /// Sets the sticky error triple an opcode surfaces.
    pub fn set_error(&mut self, err: VmError, pc: usize, info: i64) {
        self.err = Some(err);
        self.errpc = pc as i32;
        self.errinfo = info;
    }

    pub fn clear_error(&mut self) {
        self.err = None;
        self.errpc = 0;
        self.errinfo = 0;
    }

    /// Diagnostic listing of the compiled program.
    pub fn format(&self) -> String {
        qe_asm::format_program(&self.compiled)
    }

    /// Frees the literal-scratch page and zeroes the state, matching
    /// `vm/bytecode.go`'s `reset`.
    pub fn reset<R: PageReclaim>(&mut self, arena: &mut Arena<R>) {
        if let Some(scratch) = self.scratch.take() {
            // The arena owns the underlying page; our copy in `scratch`
            // is the last reference once `reset` drops it, so there is
            // nothing further to free through `arena` beyond bookkeeping
            // parity with `vm/bytecode.go`'s `Free(b.scratch)` call.
            drop(scratch);
        }
        let _ = arena;
        *self = Bytecode::default();
    }

    pub fn registers(&self) -> Registers {
        Registers::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_appends_ret() {
        let mut bc = Bytecode::new();
        bc.finalize();
        assert_eq!(bc.compiled, qe_asm::Opcode::Ret.encode());
    }

    #[test]
    fn alloc_stacks_rounds_up_to_words() {
        let mut bc = Bytecode::new();
        bc.ensure_vstack_size(20);
        bc.ensure_hstack_size(9);
        bc.alloc_stacks();
        assert_eq!(bc.vstack.len(), 3); // ceil(20/8)
        assert_eq!(bc.hashstack.len(), 2); // ceil(9/8)
    }

    #[test]
    fn set_literals_records_displacement_and_reads_back() {
        let mut arena = Arena::new();
        let mut bc = Bytecode::new();
        bc.set_literals(&mut arena, b"hello").unwrap();
        let base = bc.literal_displacement();
        assert_eq!(bc.read_litref(base, base + 5), Some(&b"hello"[..]));
    }

    #[test]
    fn error_triple_round_trips() {
        let mut bc = Bytecode::new();
        bc.set_error(VmError::NeedRadix(3), 42, 7);
        assert_eq!(bc.err, Some(VmError::NeedRadix(3)));
        assert_eq!(bc.errpc, 42);
        assert_eq!(bc.errinfo, 7);
        bc.clear_error();
        assert_eq!(bc.err, None);
    }
}
