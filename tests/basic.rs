//! Full-word move instructions and basic machine plumbing

use kx10::cpu::harness::{inst, Harness};
use kx10::cpu::state::Flags;
use kx10::word::{swap, FMASK};
use kx10::StopReason;

/// JRST 4, - halt the machine
fn halt() -> u64 {
    inst(0o254, 0o4, false, 0, 0)
}

#[test]
fn test_move_chain() {
    // MOVE 1,1000 ; HRL 2,1 ; HRR 2,1000 ; HALT
    let mut h = Harness::new();
    h.set_mem(0o1000, 0o123456_654321);
    h.load_program(
        0o100,
        &[
            inst(0o200, 1, false, 0, 0o1000),
            inst(0o504, 2, false, 0, 1),
            inst(0o540, 2, false, 0, 0o1000),
            halt(),
        ],
    );
    assert_eq!(h.run(), StopReason::Halt);
    assert_eq!(h.ac(1), 0o123456_654321);
    assert_eq!(h.ac(2), 0o654321_654321);
}

#[test]
fn test_movei_immediate() {
    let mut h = Harness::new();
    h.load_program(0o100, &[inst(0o201, 3, false, 0, 0o777), halt()]);
    h.run();
    assert_eq!(h.ac(3), 0o777);
}

#[test]
fn test_movem_stores() {
    let mut h = Harness::new();
    h.set_ac(5, 0o707070_070707);
    h.load_program(0o100, &[inst(0o202, 5, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(h.mem(0o2000), 0o707070_070707);
}

#[test]
fn test_moves_self_mode() {
    // MOVES 0: memory unchanged, AC untouched when AC=0
    let mut h = Harness::new();
    h.set_mem(0o2000, 0o123);
    h.load_program(0o100, &[inst(0o203, 0, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(h.mem(0o2000), 0o123);
    // With a nonzero AC the operand lands there too
    let mut h = Harness::new();
    h.set_mem(0o2000, 0o456);
    h.load_program(0o100, &[inst(0o203, 3, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(h.ac(3), 0o456);
}

#[test]
fn test_movs_swaps() {
    let mut h = Harness::new();
    h.set_mem(0o2000, 0o111111_222222);
    h.load_program(0o100, &[inst(0o204, 1, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(h.ac(1), 0o222222_111111);
    assert_eq!(h.ac(1), swap(0o111111_222222));
}

#[test]
fn test_movn_zero_sets_both_carries() {
    let mut h = Harness::new();
    h.set_mem(0o2000, 0);
    h.load_program(0o100, &[inst(0o210, 1, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(h.ac(1), 0);
    assert!(h.m.cpu.flags.contains(Flags::CRY0));
    assert!(h.m.cpu.flags.contains(Flags::CRY1));
    assert!(!h.m.cpu.flags.contains(Flags::OVR));
}

#[test]
fn test_movm_negative() {
    let mut h = Harness::new();
    h.set_mem(0o2000, FMASK); // -1
    h.load_program(0o100, &[inst(0o214, 1, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(h.ac(1), 1);
}

#[test]
fn test_exch() {
    let mut h = Harness::new();
    h.set_ac(2, 0o1111);
    h.set_mem(0o2000, 0o2222);
    h.load_program(0o100, &[inst(0o250, 2, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(h.ac(2), 0o2222);
    assert_eq!(h.mem(0o2000), 0o1111);
}

#[test]
fn test_ea_indexing() {
    // MOVE 1,@2000(3) with AC3 = 10: indirect word at 2010
    let mut h = Harness::new();
    h.set_ac(3, 0o10);
    h.set_mem(0o2010, 0o3000); // indirect target
    h.set_mem(0o3000, 0o4242);
    h.load_program(0o100, &[inst(0o200, 1, true, 3, 0o2000), halt()]);
    h.run();
    assert_eq!(h.ac(1), 0o4242);
}

#[test]
fn test_ea_indirect_chain() {
    let mut h = Harness::new();
    h.set_mem(0o2000, inst(0, 0, true, 0, 0o2001));
    h.set_mem(0o2001, 0o2002);
    h.set_mem(0o2002, 0o55);
    h.load_program(0o100, &[inst(0o200, 1, true, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(h.ac(1), 0o55);
}

#[test]
fn test_runaway_indirection_stops() {
    let mut h = Harness::new();
    // A word that points indirectly at itself
    h.set_mem(0o2000, inst(0, 0, true, 0, 0o2000));
    h.load_program(0o100, &[inst(0o200, 1, true, 0, 0o2000)]);
    assert_eq!(h.run(), StopReason::IndirectLoop);
}

#[test]
fn test_blt_copies_block() {
    let mut h = Harness::new();
    for i in 0..4 {
        h.set_mem(0o2000 + i, 0o100 + i as u64);
    }
    // BLT 1,3003: source,,dest in AC1, run until dest reaches E
    h.set_ac(1, (0o2000 << 18) | 0o3000);
    h.load_program(0o100, &[inst(0o251, 1, false, 0, 0o3003), halt()]);
    h.run();
    for i in 0..4 {
        assert_eq!(h.mem(0o3000 + i), 0o100 + i as u64);
    }
}

#[test]
fn test_breakpoint_stops_and_resumes() {
    let mut h = Harness::new();
    h.load_program(
        0o100,
        &[
            inst(0o201, 1, false, 0, 1),
            inst(0o201, 2, false, 0, 2),
            halt(),
        ],
    );
    h.m.cpu.breakpoints.insert(0o101);
    assert_eq!(h.run(), StopReason::Breakpoint);
    assert_eq!(h.ac(1), 1);
    assert_eq!(h.ac(2), 0);
    assert_eq!(h.m.cpu.pc, 0o101);
    // Resume runs through the breakpoint once
    assert_eq!(h.run(), StopReason::Halt);
    assert_eq!(h.ac(2), 2);
}
