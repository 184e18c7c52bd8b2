//! Simple and slotted aggregate kernels.
//!
//! Grounded in `vm/bytecode.go`'s `opaggslot*`/simple-aggregate opcode
//! table entries: slotted aggregates read `K`+`S` and are keyed by the
//! bucket id a prior `hashlookup` left in the `L` register; simple
//! aggregates read `K`+`S` with no grouping key at all, one running
//! accumulator per *appearance* of the opcode in the compiled program
//! (the opcode carries no slot immediate — `AggSimple` has empty
//! immediates — so the accumulator is addressed by the opcode's byte
//! offset in `compiled`, the only stable per-appearance key across
//! repeated batch executions of the same program).

use std::collections::HashMap;

use qe_asm::{SimpleAggOp, SlotAggOp};

/// Running state for one ungrouped aggregate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimpleAccumulator {
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub count: u64,
}

impl Default for SimpleAccumulator {
    fn default() -> SimpleAccumulator {
        SimpleAccumulator {
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            count: 0,
        }
    }
}

impl SimpleAccumulator {
    pub fn feed(&mut self, op: SimpleAggOp, value: f64) {
        match op {
            SimpleAggOp::Sum => self.sum += value,
            SimpleAggOp::Min => self.min = self.min.min(value),
            SimpleAggOp::Max => self.max = self.max.max(value),
            SimpleAggOp::Count => self.count += 1,
        }
    }

    pub fn result(&self, op: SimpleAggOp) -> f64 {
        match op {
            SimpleAggOp::Sum => self.sum,
            SimpleAggOp::Min => self.min,
            SimpleAggOp::Max => self.max,
            SimpleAggOp::Count => self.count as f64,
        }
    }
}

/// The program-wide table of simple-aggregate accumulators, keyed by the
/// byte offset of the `AggSimple` instruction that owns each one.
#[derive(Debug, Default, Clone)]
pub struct SimpleAggregates {
    by_pc: HashMap<usize, SimpleAccumulator>,
}

impl SimpleAggregates {
    pub fn new() -> SimpleAggregates {
        SimpleAggregates::default()
    }

    pub fn feed(&mut self, pc: usize, op: SimpleAggOp, value: f64) {
        self.by_pc.entry(pc).or_default().feed(op, value);
    }

    pub fn result(&self, pc: usize, op: SimpleAggOp) -> f64 {
        self.by_pc.get(&pc).copied().unwrap_or_default().result(op)
    }
}

/// Running state for one grouped aggregate slot; `avg` is carried as
/// `(sum, count)` and divided only at materialization.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SlotAccumulator {
    pub value: f64,
    pub count: u64,
    initialized: bool,
}

impl SlotAccumulator {
    pub fn feed(&mut self, op: SlotAggOp, input: f64) {
        match op {
            SlotAggOp::Add | SlotAggOp::Avg => {
                self.value += input;
                self.count += 1;
            }
            SlotAggOp::Min => {
                self.value = if self.initialized { self.value.min(input) } else { input };
            }
            SlotAggOp::Max => {
                self.value = if self.initialized { self.value.max(input) } else { input };
            }
            SlotAggOp::Count => {
                self.count += 1;
            }
        }
        self.initialized = true;
    }

    pub fn materialize(&self, op: SlotAggOp) -> f64 {
        match op {
            SlotAggOp::Add | SlotAggOp::Min | SlotAggOp::Max => self.value,
            SlotAggOp::Count => self.count as f64,
            SlotAggOp::Avg => {
                if self.count == 0 {
                    0.0
                } else {
                    self.value / self.count as f64
                }
            }
        }
    }
}

/// A dense, per-slot array of per-bucket accumulators. One `SlotTable`
/// exists per distinct `(Slot, SlotAggOp)` pair in the compiled program;
/// buckets grow on demand as `hashlookup`/`hashmember` discover new
/// groups, as a dense contiguous buffer indexed by bucket id.
#[derive(Debug, Default, Clone)]
pub struct SlotTable {
    op: Option<SlotAggOp>,
    buckets: Vec<SlotAccumulator>,
}

impl SlotTable {
    pub fn new() -> SlotTable {
        SlotTable::default()
    }

    fn ensure(&mut self, bucket: u32) -> &mut SlotAccumulator {
        let idx = bucket as usize;
        if idx >= self.buckets.len() {
            self.buckets.resize(idx + 1, SlotAccumulator::default());
        }
        &mut self.buckets[idx]
    }

    pub fn feed(&mut self, op: SlotAggOp, bucket: u32, input: f64) {
        self.op = Some(op);
        self.ensure(bucket).feed(op, input);
    }

    pub fn materialize(&self, bucket: u32) -> f64 {
        let Some(op) = self.op else { return 0.0 };
        self.buckets
            .get(bucket as usize)
            .map(|a| a.materialize(op))
            .unwrap_or(0.0)
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_sum_min_max_count() {
        let mut acc = SimpleAccumulator::default();
        for v in [3.0, 1.0, 4.0, 1.0, 5.0] {
            acc.feed(SimpleAggOp::Sum, v);
            acc.feed(SimpleAggOp::Min, v);
            acc.feed(SimpleAggOp::Max, v);
            acc.feed(SimpleAggOp::Count, v);
        }
        assert_eq!(acc.result(SimpleAggOp::Sum), 14.0);
        assert_eq!(acc.result(SimpleAggOp::Min), 1.0);
        assert_eq!(acc.result(SimpleAggOp::Max), 5.0);
        assert_eq!(acc.result(SimpleAggOp::Count), 5.0);
    }

    #[test]
    fn two_appearances_of_agg_simple_stay_independent() {
        let mut table = SimpleAggregates::new();
        table.feed(100, SimpleAggOp::Max, 10.0);
        table.feed(200, SimpleAggOp::Max, 20.0);
        table.feed(100, SimpleAggOp::Max, 15.0);
        assert_eq!(table.result(100, SimpleAggOp::Max), 15.0);
        assert_eq!(table.result(200, SimpleAggOp::Max), 20.0);
    }

    #[test]
    fn slot_avg_divides_at_materialization() {
        let mut table = SlotTable::new();
        table.feed(SlotAggOp::Avg, 0, 9.0);
        table.feed(SlotAggOp::Avg, 0, 3.0);
        table.feed(SlotAggOp::Avg, 1, 100.0);
        assert_eq!(table.materialize(0), 6.0);
        assert_eq!(table.materialize(1), 100.0);
    }

    #[test]
    fn slot_buckets_grow_on_demand() {
        let mut table = SlotTable::new();
        table.feed(SlotAggOp::Add, 5, 1.0);
        assert_eq!(table.bucket_count(), 6);
        assert_eq!(table.materialize(3), 0.0);
    }
}
