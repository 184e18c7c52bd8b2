//! Opcode table, immediate encodings, and bytecode formatting for the
//! vectorized query VM.
//!
//! This crate is the shared vocabulary between the compiler (`qe-ir` ->
//! bytecode) and the interpreter (`qe-vm`): it owns the [`opcode::Opcode`]
//! enum, its binary encoding, and its diagnostic text rendering, but no
//! execution semantics.

pub mod error;
pub mod format;
pub mod immediate;
pub mod opcode;
pub mod types;

pub use error::ErrorCode;
pub use format::{decode_program, format_program};
pub use immediate::{Immediate, ImmediateShape};
pub use opcode::{
    ArithOp, BoolOp, CmpOp, ConvOp, Opcode, OpMeta, RegName, RegOp, RegSet, SimpleAggOp,
    SlotAggOp, StrOp, TsOp,
};
pub use types::{DictRef, Displacement, Granularity, LaneMask, Lanes, Slot, SymbolId, TreeRef, LANES};
