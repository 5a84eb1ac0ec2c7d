//! Queue capacities, admission control, and whole-program ordering.

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use o3sim::{Config, CoreConfig, InstrId, Instruction, ReorderBuffer, Simulator};

use crate::common::{fast_config, InstrBuilder};

#[test]
fn baseline_capacities() {
    let rob = ReorderBuffer::new(&CoreConfig::default());
    assert_eq!(rob.size(), 352);
    assert_eq!(rob.lq_size(), 128);
    assert_eq!(rob.sq_size(), 72);
    assert!(rob.is_empty());
    assert_eq!(rob.occupancy(), 0);
}

#[test]
fn admission_refuses_without_enough_lq_slots() {
    let config = CoreConfig {
        lq_size: 3,
        ..CoreConfig::default()
    };
    let mut rob = ReorderBuffer::new(&config);

    let first = InstrBuilder::new(1).loads(&[0x100, 0x200]).build();
    assert!(rob.would_accept(&first));
    assert!(rob.push_back(first));
    assert_eq!(rob.lq_occupancy(), 2);

    // One free slot left: a two-load instruction must be refused whole.
    let second = InstrBuilder::new(2).loads(&[0x300, 0x400]).build();
    assert!(!rob.would_accept(&second));
    assert!(!rob.push_back(second));

    // A one-load instruction still fits.
    let third = InstrBuilder::new(3).loads(&[0x500]).build();
    assert!(rob.would_accept(&third));
    assert!(rob.push_back(third));
    assert_eq!(rob.lq_occupancy(), 3);
}

#[test]
fn dispatch_backpressure_on_small_rob() {
    let mut config = fast_config();
    config.core.rob_size = 4;
    config.core.dispatch_width = 6;
    let program = (1..=20)
        .map(|id| InstrBuilder::new(id).writes(&[1]).build())
        .collect();
    let mut sim = Simulator::from_config(&config, program);

    while !sim.is_drained() {
        assert!(sim.rob().occupancy() <= 4);
        sim.step();
        assert!(sim.cycle() < 10_000);
    }
    assert_eq!(sim.stats().retired, 20);
}

#[test]
fn store_queue_slots_released_at_retirement() {
    let mut config = fast_config();
    config.core.sq_size = 2;
    let program = (1..=6)
        .map(|id| InstrBuilder::new(id).stores(&[id * 0x40]).build())
        .collect();
    let mut sim = Simulator::from_config(&config, program);
    while !sim.is_drained() {
        assert!(sim.rob().sq_occupancy() <= 2);
        sim.step();
        assert!(sim.cycle() < 10_000);
    }
    assert_eq!(sim.stats().writes_issued, 6);
}

fn build_program(ops: &[(Vec<usize>, Vec<usize>, Option<u64>, Option<u64>)]) -> Vec<Instruction> {
    ops.iter()
        .enumerate()
        .map(|(i, (reads, writes, load, store))| {
            let mut b = InstrBuilder::new(i as u64 + 1).reads(reads).writes(writes);
            if let Some(slot) = *load {
                b = b.loads(&[0x1000 + slot * 64]);
            }
            if let Some(slot) = *store {
                b = b.stores(&[0x1000 + slot * 64]);
            }
            b.build()
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Any well-formed program drains, and retirement is always a strict
    /// program-order prefix: the count never regresses and no instruction
    /// at or below it is still in flight.
    #[test]
    fn random_programs_retire_as_a_strict_prefix(
        ops in proptest::collection::vec(
            (
                proptest::collection::vec(0usize..8, 0..3),
                proptest::collection::vec(0usize..8, 0..2),
                proptest::option::of(0u64..8),
                proptest::option::of(0u64..8),
            ),
            1..40,
        )
    ) {
        let config = {
            let mut c = Config::default();
            c.memory.latency = 3;
            c
        };
        let program = build_program(&ops);
        let total = program.len() as u64;
        let mut sim = Simulator::from_config(&config, program);

        let mut last_retired = 0u64;
        while !sim.is_drained() {
            sim.step();
            let retired = sim.rob().retired_count();
            prop_assert!(retired >= last_retired);
            if retired > 0 {
                prop_assert!(sim.rob().find_in_rob(InstrId(retired)).is_none());
            }
            last_retired = retired;
            prop_assert!(sim.cycle() < 100_000, "program did not drain");
        }
        prop_assert_eq!(sim.stats().retired, total);
    }

    /// LQ/SQ occupancy plus free slots always equals capacity, and never
    /// exceeds it, under arbitrary memory-heavy programs.
    #[test]
    fn queue_occupancy_is_conserved(
        ops in proptest::collection::vec(
            (
                proptest::option::of(0u64..4),
                proptest::option::of(0u64..4),
            ),
            1..30,
        )
    ) {
        let mut config = fast_config();
        config.core.lq_size = 4;
        config.core.sq_size = 3;
        let program = ops
            .iter()
            .enumerate()
            .map(|(i, (load, store))| {
                let mut b = InstrBuilder::new(i as u64 + 1);
                if let Some(slot) = *load {
                    b = b.loads(&[slot * 64]);
                }
                if let Some(slot) = *store {
                    b = b.stores(&[slot * 64]);
                }
                b.build()
            })
            .collect();
        let mut sim = Simulator::from_config(&config, program);

        while !sim.is_drained() {
            sim.step();
            let rob = sim.rob();
            prop_assert!(rob.lq_occupancy() <= rob.lq_size());
            prop_assert!(rob.sq_occupancy() <= rob.sq_size());
            prop_assert!(sim.cycle() < 100_000, "program did not drain");
        }
    }
}
