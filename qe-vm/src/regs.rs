//! The VM's implicit typed registers, made explicit so a portable
//! interpreter has somewhere to loop over 16 lanes.
//!
//! `vm/bytecode.go` keeps most of this state in assembly-visible ZMM
//! registers; the struct fields it does expose to Go (`bucket`, `lbuf`,
//! `hashmem`) are mirrored here verbatim. `K`/`S`/`V`/`B` are genuinely
//! implicit in the source (pure SIMD register state with no Go-visible
//! backing array) — we give them one here.

use qe_asm::{Displacement, LaneMask, LANES};

/// One lane's `V` register value: an (offset, length) pair of arena
/// displacements.
pub type LaneValue = (Displacement, Displacement);

/// The full explicit register file for one bytecode execution.
#[derive(Debug, Clone)]
pub struct Registers {
    /// `K`: the live-lane mask.
    pub k: LaneMask,
    /// `S`: per-lane scalar, raw bits — reinterpreted as `f64` or `i64`
    /// depending on the opcode's `Lanes` parameter.
    pub s: [u64; LANES],
    /// `V`: per-lane value pointer.
    pub v: [LaneValue; LANES],
    /// `B`: per-lane current-struct pointer (offset, length).
    pub b: [LaneValue; LANES],
    /// `H`: per-lane 128-bit hash, as (low, high) 64-bit halves —
    /// matches a flat `hashmem []uint64` layout (two words/lane).
    pub h: [(u64, u64); LANES],
    /// `L`: per-lane bucket/location, mirroring `bucket [16]int32`.
    pub l: [i32; LANES],
}

impl Default for Registers {
    fn default() -> Registers {
        Registers {
            k: LaneMask::ALL,
            s: [0; LANES],
            v: [(0, 0); LANES],
            b: [(0, 0); LANES],
            h: [(0, 0); LANES],
            l: [0; LANES],
        }
    }
}

impl Registers {
    pub fn new() -> Registers {
        Registers::default()
    }

    /// Iterates the indices of currently-live lanes.
    pub fn live_lanes(&self) -> impl Iterator<Item = usize> + '_ {
        (0..LANES).filter(move |&lane| self.k.0 & (1 << lane) != 0)
    }

    pub fn set_live(&mut self, lane: usize, live: bool) {
        if live {
            self.k.0 |= 1 << lane;
        } else {
            self.k.0 &= !(1 << lane);
        }
    }

    pub fn is_live(&self, lane: usize) -> bool {
        self.k.0 & (1 << lane) != 0
    }

    pub fn s_f64(&self, lane: usize) -> f64 {
        f64::from_bits(self.s[lane])
    }

    pub fn set_s_f64(&mut self, lane: usize, v: f64) {
        self.s[lane] = v.to_bits();
    }

    pub fn s_i64(&self, lane: usize) -> i64 {
        self.s[lane] as i64
    }

    pub fn set_s_i64(&mut self, lane: usize, v: i64) {
        self.s[lane] = v as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mask_is_all_lanes_live() {
        let regs = Registers::new();
        assert_eq!(regs.live_lanes().count(), LANES);
    }

    #[test]
    fn scalar_round_trips_both_interpretations() {
        let mut regs = Registers::new();
        regs.set_s_f64(0, 3.5);
        assert_eq!(regs.s_f64(0), 3.5);
        regs.set_s_i64(1, -7);
        assert_eq!(regs.s_i64(1), -7);
    }

    #[test]
    fn set_live_toggles_mask_bit() {
        let mut regs = Registers::new();
        regs.set_live(2, false);
        assert!(!regs.is_live(2));
        assert_eq!(regs.live_lanes().count(), LANES - 1);
        regs.set_live(2, true);
        assert!(regs.is_live(2));
    }
}
