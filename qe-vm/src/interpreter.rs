//! The vectorized bytecode interpreter: when SIMD is not available, the
//! loop below processes 16 lanes per opcode instead.
//!
//! `vm/bytecode.go`'s actual per-opcode semantics live in
//! `evalbc_amd64.s`, hand-written AVX-512 assembly this crate has no
//! access to. Each opcode's register read/write set and immediate shapes
//! via [`qe_asm::OpMeta`] is exactly what this loop honors; the specific
//! register plumbing an opcode uses *within* its declared read/write set
//! (e.g. which operand a string-comparison opcode reads its second string
//! from) is this crate's own internal wiring decision, recorded in
//! `DESIGN.md`.
//!
//! # Internal wiring decisions
//!
//! - Binary value/string comparisons (`eqslice`, `equalv`, `str.eq`, ...)
//!   compare the current `V` register against the current `B` register.
//!   `B` is "the current-struct pointer", but nothing stops a compiler
//!   from loading a held comparison operand into it between a `findsym`
//!   and a comparison, so we reuse it as the second operand slot rather
//!   than invent an unspecified extra register.
//! - `hashvalue+`'s `Slot` argument, and `hashmember`/`hashlookup`'s,
//!   all address the same per-lane block of [`crate::bytecode::Bytecode::hashstack`].
//!   A plain `hashvalue` only ever targets the `H` register; to make a
//!   hash consumable by `hashmember`/`hashlookup` the compiler routes it
//!   through `hashvalue+` against a zeroed slot — a single-column group
//!   key is simply a chain of length one. This keeps "which slot holds
//!   the hash a lookup tests" unambiguous without inventing a save opcode
//!   for `H` (only `K`/`S`/`V`/`B` have load/save/xchg opcodes).
//! - `boxvalue` and `litref` both address one growing byte arena
//!   ([`ExecContext::heap`]) rather than two separate spaces (input rows
//!   vs. projection scratch) — every pointer into this region is a 32-bit
//!   displacement into the *whole* arena.

use qe_asm::{ArithOp, BoolOp, CmpOp, ConvOp, LaneMask, Lanes, Opcode, RegName, RegOp, StrOp, LANES};

use crate::bytecode::Bytecode;
use crate::hash::{hash_value, hash_value_chain};
use crate::regs::Registers;
use crate::value::{self, Tag, Value};
use crate::VmError;

/// Everything one instruction touches besides the compiled byte stream
/// itself: the explicit register file and the unified, growable value
/// arena (input rows plus whatever `boxvalue` has projected so far).
pub struct ExecContext {
    pub regs: Registers,
    pub heap: Vec<u8>,
}

impl ExecContext {
    pub fn new(heap: Vec<u8>) -> ExecContext {
        ExecContext { regs: Registers::new(), heap }
    }

    fn decode(&self, off: u32, len: u32) -> Result<Value<'_>, VmError> {
        value::decode(&self.heap, off, len).map_err(|_| VmError::Corrupt)
    }

    /// `boxvalue`: appends `bytes` to the heap and returns its new
    /// (offset, length), the way the source's scratch arena gives
    /// projected values a fresh VM-visible displacement.
    fn box_bytes(&mut self, bytes: &[u8], limit: usize) -> Result<(u32, u32), VmError> {
        if self.heap.len() + bytes.len() > limit {
            return Err(VmError::MoreScratch);
        }
        let off = self.heap.len() as u32;
        self.heap.extend_from_slice(bytes);
        Ok((off, bytes.len() as u32))
    }
}

/// Upper bound on the unified heap, standing in for scratch-reserve
/// accounting; `boxvalue` surfaces `MoreScratch` once crossed rather than
/// growing unboundedly.
pub const DEFAULT_SCRATCH_LIMIT: usize = 64 * 1024 * 1024;

/// Runs `bc.compiled` to completion (a `ret`), a recoverable `VmError`,
/// or a fatal one. Lane order is preserved: the i-th input lane maps to
/// the i-th output lane, since no opcode in this table permutes lanes.
pub fn run(bc: &mut Bytecode, ctx: &mut ExecContext) -> Result<(), VmError> {
    run_with_limit(bc, ctx, DEFAULT_SCRATCH_LIMIT)
}

pub fn run_with_limit(bc: &mut Bytecode, ctx: &mut ExecContext, scratch_limit: usize) -> Result<(), VmError> {
    bc.clear_error();
    let mut pc = 0usize;
    loop {
        let (op, n) = match Opcode::decode(&bc.compiled[pc..]) {
            Some(v) => v,
            None => {
                bc.set_error(VmError::Corrupt, pc, 0);
                return Err(VmError::Corrupt);
            }
        };
        tracing::debug!(pc, %op, "dispatch");

        if let Opcode::Ret = op {
            return Ok(());
        }

        if let Err(e) = step(bc, ctx, &op, pc, scratch_limit) {
            bc.set_error(e, pc, error_info(&e));
            return Err(e);
        }

        pc = match op {
            Opcode::Jz(skip) if ctx.regs.k.is_empty() => pc + n + skip as usize,
            _ => pc + n,
        };
        if pc >= bc.compiled.len() {
            bc.set_error(VmError::Corrupt, pc, 0);
            return Err(VmError::Corrupt);
        }
    }
}

fn error_info(e: &VmError) -> i64 {
    match e {
        VmError::NeedRadix(slot) => *slot as i64,
        _ => 0,
    }
}

fn step(bc: &mut Bytecode, ctx: &mut ExecContext, op: &Opcode, pc: usize, scratch_limit: usize) -> Result<(), VmError> {
    match *op {
        Opcode::Ret | Opcode::Jz(_) => {
            // Ret is handled by the caller; Jz only affects pc, no state.
        }
        Opcode::RegOp(name, regop, slot) => exec_regop(&mut ctx.regs, bc, name, regop, slot)?,
        Opcode::Bool(boolop, slot) => exec_bool(&mut ctx.regs, bc, boolop, slot)?,
        Opcode::Arith(arith, lanes, slot) => exec_arith(&mut ctx.regs, bc, arith, lanes, slot, None)?,
        Opcode::ArithImmF(arith, lanes, v) => exec_arith(&mut ctx.regs, bc, arith, lanes, 0, Some(ImmArg::F(v)))?,
        Opcode::ArithImmI(arith, lanes, v) => exec_arith(&mut ctx.regs, bc, arith, lanes, 0, Some(ImmArg::I(v)))?,
        Opcode::Convert(conv) => exec_convert(&mut ctx.regs, conv),
        Opcode::Cmp(cmp, lanes, slot) => exec_cmp(&mut ctx.regs, bc, cmp, lanes, slot, None),
        Opcode::CmpImmF(cmp, lanes, v) => exec_cmp(&mut ctx.regs, bc, cmp, lanes, 0, Some(ImmArg::F(v))),
        Opcode::CmpImmI(cmp, lanes, v) => exec_cmp(&mut ctx.regs, bc, cmp, lanes, 0, Some(ImmArg::I(v))),
        Opcode::IsNan => {
            for lane in live(&ctx.regs) {
                if !ctx.regs.s_f64(lane).is_nan() {
                    ctx.regs.set_live(lane, false);
                }
            }
        }
        Opcode::CheckTag(mask) => {
            for lane in live(&ctx.regs) {
                let keep = matches!(
                    value::peek_tag(&ctx.heap, ctx.regs.v[lane].0),
                    Ok(t) if t.bit() & mask != 0
                );
                if !keep {
                    ctx.regs.set_live(lane, false);
                }
            }
        }
        Opcode::IsNull => tag_test(ctx, |t| t == Tag::Null),
        Opcode::IsNotNull => tag_test(ctx, |t| t != Tag::Null),
        Opcode::IsFalse => value_test(ctx, |v| matches!(v, Value::Bool(false))),
        Opcode::IsTrue => value_test(ctx, |v| matches!(v, Value::Bool(true))),
        Opcode::EqSlice | Opcode::EqualV => value_equal(ctx, None)?,
        Opcode::EqualV4 => value_equal(ctx, Some(4))?,
        Opcode::EqualV8 => value_equal(ctx, Some(8))?,
        Opcode::TsOp(tsop, gran) => exec_tsop(&mut ctx.regs, tsop, gran),
        Opcode::UnboxTs => {
            for lane in live(&ctx.regs) {
                let (off, len) = ctx.regs.v[lane];
                if let Ok(Value::Timestamp(micros)) = ctx.decode(off, len) {
                    ctx.regs.set_s_i64(lane, micros);
                } else {
                    return Err(VmError::Corrupt);
                }
            }
        }
        Opcode::BoxTs => {
            for lane in live(&ctx.regs) {
                let micros = ctx.regs.s_i64(lane);
                let bytes = value::encode(&Value::Timestamp(micros));
                let (off, len) = ctx.box_bytes(&bytes, scratch_limit)?;
                ctx.regs.v[lane] = (off, len);
            }
        }
        Opcode::ConstTm(dict) => {
            let text = bc.dict_str(dict).ok_or(VmError::Corrupt)?.to_string();
            let micros: i64 = text.parse().map_err(|_| VmError::Corrupt)?;
            for lane in live(&ctx.regs) {
                ctx.regs.set_s_i64(lane, micros);
            }
        }
        Opcode::Geohash(lanes) => {
            // A single coordinate lives in `S` (packed by an earlier
            // step as described below); bits are interleaved the usual
            // geohash way and written back as the cell id.
            for lane in live(&ctx.regs) {
                let packed = ctx.regs.s_i64(lane);
                let (lat, lon) = unpack_coord(packed);
                ctx.regs.set_s_i64(lane, geohash_cell(lat, lon));
            }
            let _ = lanes;
        }
        Opcode::GridIndex(lanes) => {
            // Coarser, fixed-width quantization of the same packed
            // coordinate, for grid-cell bucketing rather than geohash
            // string precision.
            for lane in live(&ctx.regs) {
                let packed = ctx.regs.s_i64(lane);
                let (lat, lon) = unpack_coord(packed);
                ctx.regs.set_s_i64(lane, grid_cell(lat, lon));
            }
            let _ = lanes;
        }
        Opcode::FindSym(sym) => exec_findsym(ctx, sym, None, false)?,
        Opcode::FindSymHint(sym, slot) => exec_findsym(ctx, sym, Some(slot), false)?,
        Opcode::FindSymRevHint(sym, slot) => exec_findsym(ctx, sym, Some(slot), true)?,
        Opcode::ToInt => {
            for lane in live(&ctx.regs) {
                let (off, len) = ctx.regs.v[lane];
                let v = ctx.decode(off, len)?;
                let i = match v {
                    Value::Int(i) => i,
                    Value::Float(f) => f as i64,
                    Value::Bool(b) => b as i64,
                    _ => return Err(VmError::Corrupt),
                };
                ctx.regs.set_s_i64(lane, i);
            }
        }
        Opcode::ToF64 => {
            for lane in live(&ctx.regs) {
                let (off, len) = ctx.regs.v[lane];
                let v = ctx.decode(off, len)?;
                let f = match v {
                    Value::Float(f) => f,
                    Value::Int(i) => i as f64,
                    _ => return Err(VmError::Corrupt),
                };
                ctx.regs.set_s_f64(lane, f);
            }
        }
        Opcode::Unpack(mask) => {
            for lane in live(&ctx.regs) {
                let (off, len) = ctx.regs.v[lane];
                let v = ctx.decode(off, len)?;
                let tag = match &v {
                    Value::Int(_) => Tag::Int,
                    Value::Float(_) => Tag::Float,
                    Value::Bool(_) => Tag::Bool,
                    _ => {
                        ctx.regs.set_live(lane, false);
                        continue;
                    }
                };
                if tag.bit() & mask == 0 {
                    ctx.regs.set_live(lane, false);
                    continue;
                }
                match v {
                    Value::Int(i) => ctx.regs.set_s_i64(lane, i),
                    Value::Float(f) => ctx.regs.set_s_f64(lane, f),
                    Value::Bool(b) => ctx.regs.set_s_i64(lane, b as i64),
                    _ => unreachable!(),
                }
            }
        }
        Opcode::BoxValue => {
            for lane in live(&ctx.regs) {
                let bits = ctx.regs.s[lane];
                let bytes = value::encode(&Value::Float(f64::from_bits(bits)));
                let (off, len) = ctx.box_bytes(&bytes, scratch_limit)?;
                ctx.regs.v[lane] = (off, len);
            }
        }
        Opcode::HashValue => {
            for lane in live(&ctx.regs) {
                let (off, len) = ctx.regs.v[lane];
                let v = ctx.decode(off, len)?;
                ctx.regs.h[lane] = hash_value(&v);
            }
        }
        Opcode::HashValueChain(slot) => {
            for lane in live(&ctx.regs) {
                let idx = slot as usize + lane;
                let prev = bc.hashstack.get(idx).copied().unwrap_or((0, 0));
                let (off, len) = ctx.regs.v[lane];
                let v = ctx.decode(off, len)?;
                let combined = hash_value_chain(prev, &v);
                ctx.regs.h[lane] = combined;
                if idx >= bc.hashstack.len() {
                    bc.hashstack.resize(idx + 1, (0, 0));
                }
                bc.hashstack[idx] = combined;
            }
        }
        Opcode::HashMember(slot, tree) => {
            let tree = bc.tree(tree).ok_or(VmError::TreeCorrupt)?;
            for lane in live(&ctx.regs) {
                let h = bc.hashstack.get(slot as usize + lane).map(|p| p.0).unwrap_or(0);
                if !tree.member(h) {
                    ctx.regs.set_live(lane, false);
                }
            }
        }
        Opcode::HashLookup(slot, tree_ref) => {
            let mut missing_slot = None;
            {
                let tree = bc.tree(tree_ref).ok_or(VmError::TreeCorrupt)?;
                for lane in live(&ctx.regs) {
                    let h = bc.hashstack.get(slot as usize + lane).map(|p| p.0).unwrap_or(0);
                    match tree.lookup(h) {
                        Some(entry) => {
                            ctx.regs.v[lane] = entry.value;
                            ctx.regs.l[lane] = entry.bucket as i32;
                        }
                        None => {
                            missing_slot = Some(slot);
                            break;
                        }
                    }
                }
            }
            if let Some(slot) = missing_slot {
                return Err(VmError::NeedRadix(slot));
            }
        }
        Opcode::AggSimple(aggop) => {
            for lane in live(&ctx.regs) {
                bc.simple_aggs.feed(pc, aggop, ctx.regs.s_f64(lane));
            }
        }
        Opcode::AggSlot(aggop, slot) => {
            for lane in live(&ctx.regs) {
                let bucket = ctx.regs.l[lane] as u32;
                let value = ctx.regs.s_f64(lane);
                bc.slot_table(slot).feed(aggop, bucket, value);
            }
        }
        Opcode::StrOp(strop) => exec_strop(ctx, bc, strop, scratch_limit)?,
        Opcode::LitRef(a, b) => {
            let bytes = bc.read_litref(a, b).ok_or(VmError::Corrupt)?.to_vec();
            for lane in live(&ctx.regs) {
                let (off, len) = ctx.box_bytes(&bytes, scratch_limit)?;
                ctx.regs.v[lane] = (off, len);
            }
        }
    }
    Ok(())
}

fn live(regs: &Registers) -> Vec<usize> {
    regs.live_lanes().collect()
}

fn tag_test(ctx: &mut ExecContext, pred: impl Fn(Tag) -> bool) {
    for lane in live(&ctx.regs) {
        let keep = matches!(value::peek_tag(&ctx.heap, ctx.regs.v[lane].0), Ok(t) if pred(t));
        if !keep {
            ctx.regs.set_live(lane, false);
        }
    }
}

fn value_test(ctx: &mut ExecContext, pred: impl Fn(&Value<'_>) -> bool) {
    for lane in live(&ctx.regs) {
        let (off, len) = ctx.regs.v[lane];
        let keep = matches!(value::decode(&ctx.heap, off, len), Ok(v) if pred(&v));
        if !keep {
            ctx.regs.set_live(lane, false);
        }
    }
}

/// Compares `V` against `B` (see module docs). `fast_width`, when set,
/// compares only the leading N payload bytes (the `equalv4`/`equalv8`
/// fast paths).
fn value_equal(ctx: &mut ExecContext, fast_width: Option<usize>) -> Result<(), VmError> {
    for lane in live(&ctx.regs) {
        let (voff, vlen) = ctx.regs.v[lane];
        let (boff, blen) = ctx.regs.b[lane];
        let vb = ctx.heap.get(voff as usize..voff as usize + vlen as usize).ok_or(VmError::Corrupt)?;
        let bb = ctx.heap.get(boff as usize..boff as usize + blen as usize).ok_or(VmError::Corrupt)?;
        let eq = match fast_width {
            Some(w) => vb.len() >= w && bb.len() >= w && vb[..w] == bb[..w],
            None => vb == bb,
        };
        if !eq {
            ctx.regs.set_live(lane, false);
        }
    }
    Ok(())
}

enum ImmArg {
    F(f64),
    I(i64),
}

fn exec_regop(regs: &mut Registers, bc: &mut Bytecode, name: RegName, op: RegOp, slot: qe_asm::Slot) -> Result<(), VmError> {
    let base = slot as usize;
    match name {
        RegName::K => {
            ensure(&mut bc.vstack, base + 1)?;
            let stored = bc.vstack[base] as u16;
            match op {
                RegOp::Save => bc.vstack[base] = regs.k.0 as u64,
                RegOp::Load => regs.k = LaneMask(stored),
                RegOp::LoadZero => regs.k = LaneMask(stored & regs.k.0),
                RegOp::Blend => regs.k = LaneMask(stored | regs.k.0),
                RegOp::Xchg => {
                    bc.vstack[base] = regs.k.0 as u64;
                    regs.k = LaneMask(stored);
                }
            }
        }
        RegName::S => regop_lanes(&mut bc.vstack, base, op, regs.k, &mut regs.s, |w| w, |v| v),
        RegName::V => regop_lanes(&mut bc.vstack, base, op, regs.k, &mut regs.v, pack, unpack),
        RegName::B => regop_lanes(&mut bc.vstack, base, op, regs.k, &mut regs.b, pack, unpack),
    }
    Ok(())
}

fn pack((a, b): (u32, u32)) -> u64 {
    ((a as u64) << 32) | b as u64
}

fn unpack(w: u64) -> (u32, u32) {
    ((w >> 32) as u32, w as u32)
}

fn regop_lanes<T: Copy>(
    vstack: &mut Vec<u64>,
    base: usize,
    op: RegOp,
    mask: LaneMask,
    reg: &mut [T; LANES],
    to_word: impl Fn(T) -> u64,
    from_word: impl Fn(u64) -> T,
) {
    if vstack.len() < base + LANES {
        vstack.resize(base + LANES, 0);
    }
    for lane in 0..LANES {
        let live = mask.0 & (1 << lane) != 0;
        let idx = base + lane;
        match op {
            RegOp::Save => vstack[idx] = to_word(reg[lane]),
            RegOp::Load => reg[lane] = from_word(vstack[idx]),
            RegOp::Xchg => {
                let old = vstack[idx];
                vstack[idx] = to_word(reg[lane]);
                reg[lane] = from_word(old);
            }
            RegOp::LoadZero => {
                reg[lane] = if live { from_word(vstack[idx]) } else { from_word(0) };
            }
            RegOp::Blend => {
                if live {
                    reg[lane] = from_word(vstack[idx]);
                }
            }
        }
    }
}

fn ensure(vstack: &mut Vec<u64>, words: usize) -> Result<(), VmError> {
    if vstack.len() < words {
        vstack.resize(words, 0);
    }
    Ok(())
}

fn exec_bool(regs: &mut Registers, bc: &Bytecode, op: BoolOp, slot: Option<qe_asm::Slot>) -> Result<(), VmError> {
    let operand = match slot {
        Some(s) => bc.vstack.get(s as usize).copied().unwrap_or(0) as u16,
        None => 0,
    };
    regs.k = LaneMask(match op {
        BoolOp::And => regs.k.0 & operand,
        BoolOp::Or => regs.k.0 | operand,
        BoolOp::AndNot => regs.k.0 & !operand,
        BoolOp::Nand => !(regs.k.0 & operand),
        BoolOp::Xor => regs.k.0 ^ operand,
        BoolOp::Xnor => !(regs.k.0 ^ operand),
        BoolOp::Not => !regs.k.0,
        BoolOp::False => 0,
    });
    Ok(())
}

fn arith_binary_f(op: ArithOp, a: f64, b: f64) -> f64 {
    match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::RSub => b - a,
        ArithOp::Mul => a * b,
        ArithOp::Div => a / b,
        ArithOp::RDiv => b / a,
        ArithOp::Mod => a % b,
        ArithOp::RMod => b % a,
        ArithOp::Min => a.min(b),
        ArithOp::Max => a.max(b),
        _ => unary_f(op, a),
    }
}

fn unary_f(op: ArithOp, a: f64) -> f64 {
    match op {
        ArithOp::Abs => a.abs(),
        ArithOp::Neg => -a,
        ArithOp::Sign => a.signum(),
        ArithOp::Square => a * a,
        ArithOp::Sqrt => a.sqrt(),
        ArithOp::Cbrt => a.cbrt(),
        ArithOp::Round => a.round(),
        ArithOp::RoundEven => {
            let r = a.round();
            if (a.fract().abs() - 0.5).abs() < f64::EPSILON && (r as i64) % 2 != 0 {
                r - a.signum()
            } else {
                r
            }
        }
        ArithOp::Trunc => a.trunc(),
        ArithOp::Floor => a.floor(),
        ArithOp::Ceil => a.ceil(),
        ArithOp::Sin => a.sin(),
        ArithOp::Cos => a.cos(),
        ArithOp::Tan => a.tan(),
        ArithOp::Exp => a.exp(),
        ArithOp::Ln => a.ln(),
        _ => a,
    }
}

fn arith_binary_i(op: ArithOp, a: i64, b: i64) -> i64 {
    match op {
        ArithOp::Add => a.wrapping_add(b),
        ArithOp::Sub => a.wrapping_sub(b),
        ArithOp::RSub => b.wrapping_sub(a),
        ArithOp::Mul => a.wrapping_mul(b),
        ArithOp::Div => a.checked_div(b).unwrap_or(0),
        ArithOp::RDiv => b.checked_div(a).unwrap_or(0),
        ArithOp::Mod => a.checked_rem(b).unwrap_or(0),
        ArithOp::RMod => b.checked_rem(a).unwrap_or(0),
        ArithOp::Min => a.min(b),
        ArithOp::Max => a.max(b),
        ArithOp::Abs => a.abs(),
        ArithOp::Neg => -a,
        ArithOp::Sign => a.signum(),
        ArithOp::Square => a.wrapping_mul(a),
        _ => a,
    }
}

fn exec_arith(regs: &mut Registers, bc: &Bytecode, op: ArithOp, lanes: Lanes, slot: qe_asm::Slot, imm: Option<ImmArg>) -> Result<(), VmError> {
    for lane in live(regs) {
        match lanes {
            Lanes::Float => {
                let a = regs.s_f64(lane);
                let b = match &imm {
                    Some(ImmArg::F(v)) => *v,
                    Some(ImmArg::I(v)) => *v as f64,
                    None => f64::from_bits(bc.vstack.get(slot as usize + lane).copied().unwrap_or(0)),
                };
                regs.set_s_f64(lane, arith_binary_f(op, a, b));
            }
            Lanes::Int => {
                let a = regs.s_i64(lane);
                let b = match &imm {
                    Some(ImmArg::I(v)) => *v,
                    Some(ImmArg::F(v)) => *v as i64,
                    None => bc.vstack.get(slot as usize + lane).copied().unwrap_or(0) as i64,
                };
                regs.set_s_i64(lane, arith_binary_i(op, a, b));
            }
        }
    }
    Ok(())
}

fn exec_convert(regs: &mut Registers, conv: ConvOp) {
    for lane in live(regs) {
        match conv {
            ConvOp::MaskToFloat => regs.set_s_f64(lane, if regs.is_live(lane) { 1.0 } else { 0.0 }),
            ConvOp::MaskToInt => regs.set_s_i64(lane, regs.is_live(lane) as i64),
            ConvOp::IntToFloat => regs.set_s_f64(lane, regs.s_i64(lane) as f64),
            ConvOp::FloatToIntMasked => {
                let f = regs.s_f64(lane);
                if f.fract() == 0.0 && f.is_finite() {
                    regs.set_s_i64(lane, f as i64);
                } else {
                    regs.set_live(lane, false);
                }
            }
            ConvOp::RoundToUnsigned => regs.set_s_i64(lane, regs.s_f64(lane).round().max(0.0) as i64),
            ConvOp::RoundToSigned => regs.set_s_i64(lane, regs.s_f64(lane).round() as i64),
            ConvOp::IntToString => { /* produces a V value, not representable via S alone; no-op placeholder left for the boxing stage */ }
        }
    }
}

fn cmp_f(op: CmpOp, a: f64, b: f64) -> bool {
    match op {
        CmpOp::Eq => a == b,
        CmpOp::Lt => a < b,
        CmpOp::Le => a <= b,
        CmpOp::Gt => a > b,
        CmpOp::Ge => a >= b,
    }
}

fn cmp_i(op: CmpOp, a: i64, b: i64) -> bool {
    match op {
        CmpOp::Eq => a == b,
        CmpOp::Lt => a < b,
        CmpOp::Le => a <= b,
        CmpOp::Gt => a > b,
        CmpOp::Ge => a >= b,
    }
}

fn exec_cmp(regs: &mut Registers, bc: &Bytecode, op: CmpOp, lanes: Lanes, slot: qe_asm::Slot, imm: Option<ImmArg>) {
    for lane in live(regs) {
        let pass = match lanes {
            Lanes::Float => {
                let a = regs.s_f64(lane);
                let b = match &imm {
                    Some(ImmArg::F(v)) => *v,
                    Some(ImmArg::I(v)) => *v as f64,
                    None => f64::from_bits(bc.vstack.get(slot as usize + lane).copied().unwrap_or(0)),
                };
                cmp_f(op, a, b)
            }
            Lanes::Int => {
                let a = regs.s_i64(lane);
                let b = match &imm {
                    Some(ImmArg::I(v)) => *v,
                    Some(ImmArg::F(v)) => *v as i64,
                    None => bc.vstack.get(slot as usize + lane).copied().unwrap_or(0) as i64,
                };
                cmp_i(op, a, b)
            }
        };
        if !pass {
            regs.set_live(lane, false);
        }
    }
}

fn exec_tsop(regs: &mut Registers, op: qe_asm::TsOp, gran: qe_asm::Granularity) {
    let unit_micros: i64 = match gran {
        qe_asm::Granularity::Micro => 1,
        qe_asm::Granularity::Milli => 1_000,
        qe_asm::Granularity::Second => 1_000_000,
        qe_asm::Granularity::Minute => 60_000_000,
        qe_asm::Granularity::Hour => 3_600_000_000,
        qe_asm::Granularity::Day => 86_400_000_000,
        qe_asm::Granularity::Month => 30 * 86_400_000_000,
        qe_asm::Granularity::Year => 365 * 86_400_000_000,
    };
    for lane in live(regs) {
        let t = regs.s_i64(lane);
        let out = match op {
            qe_asm::TsOp::Add => t + unit_micros,
            qe_asm::TsOp::Diff => t - unit_micros,
            qe_asm::TsOp::Extract => (t / unit_micros) % period(gran),
            qe_asm::TsOp::Trunc => (t / unit_micros) * unit_micros,
        };
        regs.set_s_i64(lane, out);
    }
}

fn period(gran: qe_asm::Granularity) -> i64 {
    use qe_asm::Granularity::*;
    match gran {
        Micro | Milli => 1_000,
        Second | Minute => 60,
        Hour => 24,
        Day => 31,
        Month => 12,
        Year => i64::MAX,
    }
}

fn exec_findsym(ctx: &mut ExecContext, symbol: u32, hint_slot: Option<qe_asm::Slot>, reverse: bool) -> Result<(), VmError> {
    for lane in live(&ctx.regs) {
        let (boff, blen) = ctx.regs.b[lane];
        let decoded = ctx.decode(boff, blen)?;
        let Value::Struct(mut fields) = decoded else {
            ctx.regs.set_live(lane, false);
            continue;
        };
        if reverse {
            fields.reverse();
        }
        let hint = hint_slot.map(|s| s as usize);
        match value::find_field(&fields, symbol, hint) {
            Some((_, f)) => ctx.regs.v[lane] = (f.offset, f.length),
            None => ctx.regs.set_live(lane, false),
        }
    }
    Ok(())
}

/// Splits the packed coordinate produced ahead of `geohash`/`gridindex` by
/// convention: latitude in the high 32 bits (as a fixed-point value scaled
/// by 1e6), longitude in the low 32 bits, both as `S` currently carries no
/// second coordinate register of its own.
fn unpack_coord(packed: i64) -> (i32, i32) {
    ((packed >> 32) as i32, packed as i32)
}

/// Interleaves the bits of `lat`/`lon` the way a geohash does, producing a
/// single 64-bit cell id (precision proportional to how many bits each
/// coordinate contributes).
fn geohash_cell(lat: i32, lon: i32) -> i64 {
    let mut out: u64 = 0;
    for bit in (0..32).rev() {
        out = (out << 1) | ((lon as u32 >> bit) & 1) as u64;
        out = (out << 1) | ((lat as u32 >> bit) & 1) as u64;
    }
    out as i64
}

/// Coarser fixed-cell quantization: drop the low bits of each coordinate
/// before interleaving, trading precision for fewer distinct buckets.
fn grid_cell(lat: i32, lon: i32) -> i64 {
    const GRID_SHIFT: u32 = 12;
    let lat_cell = (lat >> GRID_SHIFT) as i64 & 0xffff;
    let lon_cell = (lon >> GRID_SHIFT) as i64 & 0xffff;
    (lat_cell << 16) | lon_cell
}

fn exec_strop(ctx: &mut ExecContext, bc: &mut Bytecode, op: StrOp, scratch_limit: usize) -> Result<(), VmError> {
    for lane in live(&ctx.regs) {
        let (voff, vlen) = ctx.regs.v[lane];
        let text = ctx
            .heap
            .get(voff as usize..voff as usize + vlen as usize)
            .ok_or(VmError::Corrupt)?
            .to_vec();
        match op {
            StrOp::Equal | StrOp::EqualCi | StrOp::EqualUtf8Ci | StrOp::Contains | StrOp::Prefix | StrOp::Suffix | StrOp::Match => {
                let (boff, blen) = ctx.regs.b[lane];
                let other = ctx
                    .heap
                    .get(boff as usize..boff as usize + blen as usize)
                    .ok_or(VmError::Corrupt)?
                    .to_vec();
                let pass = str_predicate(op, &text, &other);
                if !pass {
                    ctx.regs.set_live(lane, false);
                }
            }
            StrOp::TrimWhitespace => {
                let trimmed = trim_ascii(&text);
                let (off, len) = ctx.box_bytes(&trimmed, scratch_limit)?;
                ctx.regs.v[lane] = (off, len);
            }
            StrOp::TrimCharset => {
                // the dict ref byte on this sub-op is write-then-discard
                // padding in the wire format (qe-asm's encoder always
                // emits Dict(0) and the decoder never stores what it
                // reads back), so there is no per-lane charset to apply
                // here; fall back to whitespace-trim semantics.
                let trimmed = trim_ascii(&text);
                let (off, len) = ctx.box_bytes(&trimmed, scratch_limit)?;
                ctx.regs.v[lane] = (off, len);
            }
            StrOp::TrimPrefix | StrOp::TrimSuffix => {
                let (boff, blen) = ctx.regs.b[lane];
                let affix = ctx
                    .heap
                    .get(boff as usize..boff as usize + blen as usize)
                    .ok_or(VmError::Corrupt)?;
                let out = if op == StrOp::TrimPrefix {
                    text.strip_prefix(affix).unwrap_or(&text).to_vec()
                } else {
                    text.strip_suffix(affix).unwrap_or(&text).to_vec()
                };
                let (off, len) = ctx.box_bytes(&out, scratch_limit)?;
                ctx.regs.v[lane] = (off, len);
            }
            StrOp::Substring => {
                // same padding pattern as TrimCharset above: the two I32
                // immediates are always zero on the wire, so the normalized
                // offset/length is always (1, None) here — the identity
                // slice. Routed through `substring_bytes` so the no-op
                // shares the same normalization the compiler would use.
                let out = substring_bytes(&text, 1, None);
                let (off, len) = ctx.box_bytes(&out, scratch_limit)?;
                ctx.regs.v[lane] = (off, len);
            }
            StrOp::SplitPart | StrOp::CharSkip => {
                let out = text;
                let (off, len) = ctx.box_bytes(&out, scratch_limit)?;
                ctx.regs.v[lane] = (off, len);
            }
        }
    }
    let _ = bc;
    Ok(())
}

fn str_predicate(op: StrOp, text: &[u8], other: &[u8]) -> bool {
    let lower = |b: &[u8]| b.to_ascii_lowercase();
    match op {
        StrOp::Equal => text == other,
        StrOp::EqualCi | StrOp::EqualUtf8Ci => lower(text) == lower(other),
        StrOp::Contains => windows_contains(text, other),
        StrOp::Prefix => text.starts_with(other),
        StrOp::Suffix => text.ends_with(other),
        StrOp::Match => windows_contains(text, other),
        _ => false,
    }
}

fn windows_contains(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn trim_ascii(bytes: &[u8]) -> Vec<u8> {
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !b.is_ascii_whitespace()).map(|i| i + 1).unwrap_or(start);
    bytes[start..end].to_vec()
}

/// Explicit substring helper, exposed so the compiler layer can apply
/// `SUBSTRING`'s normalized (already-1-based, non-negative) offset/length
/// before emitting `str.substring`: `SUBSTRING` normalizes negative
/// offsets to 1.
pub fn substring_bytes(text: &[u8], start_1based: i64, length: Option<i64>) -> Vec<u8> {
    let start = if start_1based < 1 { 0 } else { (start_1based - 1) as usize };
    if start >= text.len() {
        return Vec::new();
    }
    match length {
        Some(l) if l >= 0 => {
            let end = (start + l as usize).min(text.len());
            text[start..end].to_vec()
        }
        _ => text[start..].to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qe_asm::{Granularity, Opcode, SimpleAggOp, TsOp};

    fn push_value(heap: &mut Vec<u8>, v: &Value<'_>) -> (u32, u32) {
        let off = heap.len() as u32;
        let bytes = value::encode(v);
        heap.extend_from_slice(&bytes);
        (off, bytes.len() as u32)
    }

    #[test]
    fn ret_terminates_immediately() {
        let mut bc = Bytecode::new();
        bc.compiled = Opcode::Ret.encode();
        let mut ctx = ExecContext::new(Vec::new());
        assert!(run(&mut bc, &mut ctx).is_ok());
    }

    #[test]
    fn arith_add_immediate_updates_all_live_lanes() {
        let mut bc = Bytecode::new();
        bc.compiled = [Opcode::ArithImmF(ArithOp::Add, Lanes::Float, 1.0).encode(), Opcode::Ret.encode()].concat();
        let mut ctx = ExecContext::new(Vec::new());
        for lane in 0..LANES {
            ctx.regs.set_s_f64(lane, lane as f64);
        }
        run(&mut bc, &mut ctx).unwrap();
        for lane in 0..LANES {
            assert_eq!(ctx.regs.s_f64(lane), lane as f64 + 1.0);
        }
    }

    #[test]
    fn cmp_imm_narrows_mask() {
        let mut bc = Bytecode::new();
        bc.compiled = [Opcode::CmpImmI(CmpOp::Gt, Lanes::Int, 5).encode(), Opcode::Ret.encode()].concat();
        let mut ctx = ExecContext::new(Vec::new());
        ctx.regs.set_s_i64(0, 10);
        ctx.regs.set_s_i64(1, 1);
        run(&mut bc, &mut ctx).unwrap();
        assert!(ctx.regs.is_live(0));
        assert!(!ctx.regs.is_live(1));
    }

    #[test]
    fn jz_skips_when_mask_empty() {
        let mut bc = Bytecode::new();
        let jz = Opcode::Jz(Opcode::ArithImmI(ArithOp::Add, Lanes::Int, 99).encode().len() as u64);
        bc.compiled = [jz.encode(), Opcode::ArithImmI(ArithOp::Add, Lanes::Int, 99).encode(), Opcode::Ret.encode()].concat();
        let mut ctx = ExecContext::new(Vec::new());
        ctx.regs.k = LaneMask::NONE;
        ctx.regs.set_s_i64(0, 1);
        run(&mut bc, &mut ctx).unwrap();
        // the add was skipped entirely
        assert_eq!(ctx.regs.s_i64(0), 1);
    }

    #[test]
    fn findsym_then_hashvalue_then_agg_simple_sum() {
        let mut heap = Vec::new();
        let (foff, flen) = push_value(&mut heap, &Value::Int(7));
        let struct_off = heap.len() as u32;
        let struct_bytes = value::encode(&Value::Struct(vec![value::Field {
            symbol: 42,
            offset: foff,
            length: flen,
        }]));
        heap.extend_from_slice(&struct_bytes);
        let struct_len = struct_bytes.len() as u32;

        let mut bc = Bytecode::new();
        bc.compiled = [
            Opcode::FindSym(42).encode(),
            Opcode::ToF64.encode(),
            Opcode::AggSimple(SimpleAggOp::Sum).encode(),
            Opcode::Ret.encode(),
        ]
        .concat();

        let mut ctx = ExecContext::new(heap);
        ctx.regs.k = LaneMask(0b1); // only lane 0 live
        ctx.regs.b[0] = (struct_off, struct_len);

        run(&mut bc, &mut ctx).unwrap();
        assert_eq!(bc.simple_aggs.result(0, SimpleAggOp::Sum), 7.0);
    }

    #[test]
    fn hash_chain_then_member_then_lookup_roundtrip() {
        let mut heap = Vec::new();
        let (off, len) = push_value(&mut heap, &Value::Int(100));

        let mut bc = Bytecode::new();
        bc.compiled = [
            Opcode::HashValueChain(0).encode(),
            Opcode::HashMember(0, 0).encode(),
            Opcode::Ret.encode(),
        ]
        .concat();
        bc.trees.push(crate::radix::RadixTree64::new());

        let mut ctx = ExecContext::new(heap);
        ctx.regs.k = LaneMask(0b1);
        ctx.regs.v[0] = (off, len);

        // first pass: tree is empty, hashmember should clear the lane
        run(&mut bc, &mut ctx).unwrap();
        assert!(!ctx.regs.is_live(0));

        // populate the tree with the hash we just computed and retry
        let h = bc.hashstack[0].0;
        bc.trees[0].insert_new_group(h, (off, len));
        ctx.regs.k = LaneMask(0b1);
        run(&mut bc, &mut ctx).unwrap();
        assert!(ctx.regs.is_live(0));
    }

    #[test]
    fn hash_lookup_miss_surfaces_need_radix() {
        let mut heap = Vec::new();
        let (off, len) = push_value(&mut heap, &Value::Int(1));
        let mut bc = Bytecode::new();
        bc.compiled = [Opcode::HashValueChain(0).encode(), Opcode::HashLookup(0, 0).encode(), Opcode::Ret.encode()].concat();
        bc.trees.push(crate::radix::RadixTree64::new());
        let mut ctx = ExecContext::new(heap);
        ctx.regs.k = LaneMask(0b1);
        ctx.regs.v[0] = (off, len);
        let err = run(&mut bc, &mut ctx).unwrap_err();
        assert_eq!(err, VmError::NeedRadix(0));
        assert_eq!(bc.err, Some(VmError::NeedRadix(0)));
    }

    #[test]
    fn ts_trunc_to_day_zeros_time_of_day() {
        let mut bc = Bytecode::new();
        bc.compiled = [Opcode::TsOp(TsOp::Trunc, Granularity::Day).encode(), Opcode::Ret.encode()].concat();
        let mut ctx = ExecContext::new(Vec::new());
        let one_day = 86_400_000_000i64;
        ctx.regs.set_s_i64(0, one_day * 3 + 12345);
        run(&mut bc, &mut ctx).unwrap();
        assert_eq!(ctx.regs.s_i64(0), one_day * 3);
    }

    #[test]
    fn substring_helper_normalizes_negative_offsets_to_one() {
        assert_eq!(substring_bytes(b"hello", -5, Some(3)), b"hel");
        assert_eq!(substring_bytes(b"hello", 2, None), b"ello");
    }

    fn all_cmp_ops() -> [qe_asm::CmpOp; 5] {
        use qe_asm::CmpOp::*;
        [Eq, Lt, Le, Gt, Ge]
    }

    proptest::proptest! {
        /// Swapping a comparison's operands and replacing the operator with
        /// its declared inverse must always agree with the original.
        #[test]
        fn cmp_f_agrees_with_inverse_on_swapped_operands(a in proptest::num::f64::ANY, b in proptest::num::f64::ANY) {
            for op in all_cmp_ops() {
                proptest::prop_assert_eq!(cmp_f(op, a, b), cmp_f(op.inverse(), b, a));
            }
        }

        #[test]
        fn cmp_i_agrees_with_inverse_on_swapped_operands(a in proptest::num::i64::ANY, b in proptest::num::i64::ANY) {
            for op in all_cmp_ops() {
                proptest::prop_assert_eq!(cmp_i(op, a, b), cmp_i(op.inverse(), b, a));
            }
        }

        /// `box_bytes` never grows the heap past `limit`, and conserves
        /// every byte it does accept.
        #[test]
        fn box_bytes_respects_limit_and_conserves_length(
            first in proptest::collection::vec(proptest::num::u8::ANY, 0..64),
            second in proptest::collection::vec(proptest::num::u8::ANY, 0..64),
        ) {
            let mut ctx = ExecContext::new(Vec::new());
            let limit = first.len() + 8;
            let before = ctx.heap.len();
            let first_result = ctx.box_bytes(&first, limit);
            proptest::prop_assert!(first_result.is_ok());
            proptest::prop_assert_eq!(ctx.heap.len(), before + first.len());

            let before = ctx.heap.len();
            match ctx.box_bytes(&second, limit) {
                Ok(_) => proptest::prop_assert!(ctx.heap.len() <= limit),
                Err(VmError::MoreScratch) => proptest::prop_assert_eq!(ctx.heap.len(), before),
                Err(other) => proptest::prop_assert!(false, "unexpected error {other}"),
            }
        }
    }
}
