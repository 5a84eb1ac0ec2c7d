//! Register renaming, reclamation liveness, and pool exhaustion.

use pretty_assertions::assert_eq;

use o3sim::{CoreConfig, InstrId, RegisterAllocator, ReorderBuffer, Simulator};

use crate::common::{alu, fast_config, run_to_drain};

#[test]
fn repeated_writes_to_one_register_never_exhaust_a_small_pool() {
    // 200 instructions all read and write r1 through a 12-register pool.
    // Reclamation of superseded mappings is what keeps this alive.
    let mut config = fast_config();
    config.core.num_phys_regs = 12;
    config.core.num_arch_regs = 4;
    config.core.rob_size = 6;
    let program = (1..=200).map(|id| alu(id, &[1], &[1])).collect();
    let sim = run_to_drain(&config, program);
    assert_eq!(sim.stats().retired, 200);
}

#[test]
fn pool_returns_to_steady_state_after_drain() {
    let mut config = fast_config();
    config.core.num_phys_regs = 16;
    config.core.num_arch_regs = 4;
    config.core.rob_size = 8;
    let program = (1..=50).map(|id| alu(id, &[2], &[2])).collect();
    let mut sim = Simulator::from_config(&config, program);
    sim.run(100_000);
    assert!(sim.is_drained());
    // Only the committed mapping of r2 (and the lazy initial-value record)
    // remain live once everything has retired.
    assert!(sim.rob().registers().count_free_registers() >= 14);
}

#[test]
fn renamed_operands_resolve_across_instructions() {
    let config = fast_config();
    let mut rob = ReorderBuffer::new(&config.core);
    let mut disp = o3sim::Dispatcher::new(&config.core);
    disp.feed(alu(1, &[], &[4]));
    disp.feed(alu(2, &[4], &[4]));
    disp.feed(alu(3, &[4], &[5]));
    assert_eq!(disp.dispatch(&mut rob), 3);

    let first = rob.find_in_rob(InstrId(1)).unwrap().dst_phys[0];
    let second = rob.find_in_rob(InstrId(2)).unwrap();
    let third = rob.find_in_rob(InstrId(3)).unwrap();
    // 2 reads 1's mapping and writes a fresh one; 3 reads 2's mapping.
    assert_eq!(second.src_phys[0], first);
    assert_ne!(second.dst_phys[0], first);
    assert_eq!(third.src_phys[0], second.dst_phys[0]);
}

#[test]
#[should_panic(expected = "physical register file exhausted")]
fn renaming_past_the_pool_size_is_fatal() {
    let config = CoreConfig {
        num_phys_regs: 4,
        num_arch_regs: 8,
        ..CoreConfig::default()
    };
    let mut regs = RegisterAllocator::new(&config);
    for arch in 0..5 {
        let _ = regs.rename_dest_register(arch, InstrId(arch as u64 + 1));
    }
}
