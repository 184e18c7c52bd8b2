//! The VM page allocator, explicit register file, bytecode execution
//! state, error model, and hash/aggregate kernels.
//!
//! This crate is the bottom of the stack: it never builds a plan or
//! simplifies an expression (that's `qe-ir`), it only runs compiled
//! bytecode (`qe-asm::Opcode`) against one query's worth of rows.

pub mod aggregate;
pub mod alloc;
pub mod bytecode;
pub mod error;
pub mod hash;
pub mod interpreter;
pub mod radix;
pub mod regs;
pub mod value;

pub use aggregate::{SimpleAccumulator, SimpleAggregates, SlotAccumulator, SlotTable};
pub use alloc::{AllocError, Arena, NoReclaim, PageReclaim, PAGE_SIZE};
pub use bytecode::Bytecode;
pub use error::{InterpreterError, VmError};
pub use hash::{hash_value, hash_value_chain};
pub use interpreter::{run, run_with_limit, ExecContext};
pub use radix::{member_mask, Entry, RadixTree64};
pub use regs::{LaneValue, Registers};
pub use value::{decode, encode, find_field, peek_tag, DecodeError, Field, Tag, Value};

#[cfg(unix)]
pub use alloc::UnixReclaim;
