//! Stack instructions: PUSH, POP, PUSHJ, POPJ, overflow capture

use kx10::cpu::harness::{inst, Harness};
use kx10::word::RMASK;

fn halt() -> u64 {
    inst(0o254, 0o4, false, 0, 0)
}

/// count,,address stack pointer
fn ptr(count: i64, addr: u64) -> u64 {
    (((count as u64) & 0o777777) << 18) | (addr & RMASK)
}

#[test]
fn test_push_pop_roundtrip() {
    let mut h = Harness::new();
    h.set_ac(0o17, ptr(-10, 0o4000));
    h.set_mem(0o2000, 0o4242);
    h.load_program(
        0o100,
        &[
            inst(0o261, 0o17, false, 0, 0o2000), // PUSH 17,2000
            inst(0o262, 0o17, false, 0, 0o3000), // POP 17,3000
            halt(),
        ],
    );
    h.run();
    assert_eq!(h.mem(0o4001), 0o4242);
    assert_eq!(h.mem(0o3000), 0o4242);
    assert_eq!(h.ac(0o17), ptr(-10, 0o4000));
}

#[test]
fn test_push_increments_both_halves() {
    let mut h = Harness::new();
    h.set_ac(0o17, ptr(-2, 0o4000));
    h.set_mem(0o2000, 1);
    h.load_program(0o100, &[inst(0o261, 0o17, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(h.ac(0o17), ptr(-1, 0o4001));
}

#[test]
fn test_push_overflow() {
    let mut h = Harness::new();
    h.set_ac(0o17, ptr(-1, 0o4000));
    h.set_mem(0o2000, 5);
    h.load_program(0o100, &[inst(0o261, 0o17, false, 0, 0o2000), halt()]);
    h.run();
    // Left half carried out of the counter
    assert!(h.m.cpu.apr.push_ovf);
}

#[test]
fn test_pushj_popj_nest() {
    let mut h = Harness::new();
    h.set_ac(0o17, ptr(-10, 0o4000));
    h.set_mem(0o3000, inst(0o201, 2, false, 0, 0o42)); // subroutine body
    h.set_mem(0o3001, inst(0o263, 0o17, false, 0, 0)); // POPJ 17,
    h.load_program(
        0o100,
        &[
            inst(0o260, 0o17, false, 0, 0o3000), // PUSHJ 17,3000
            inst(0o201, 4, false, 0, 0o77),      // runs after return
            halt(),
        ],
    );
    h.run();
    assert_eq!(h.ac(2), 0o42);
    assert_eq!(h.ac(4), 0o77);
    assert_eq!(h.ac(0o17), ptr(-10, 0o4000));
    // The return word went through the stack
    assert_eq!(h.mem(0o4001) & RMASK, 0o101);
}

#[test]
fn test_popj_underflow_flags() {
    let mut h = Harness::new();
    // Pointer at 0,,4001: POPJ takes it negative
    h.set_ac(0o17, ptr(0, 0o4001));
    h.set_mem(0o4001, 0o200);
    h.set_mem(0o200, halt());
    h.load_program(0o100, &[inst(0o263, 0o17, false, 0, 0)]);
    h.run();
    assert!(h.m.cpu.apr.push_ovf);
}
