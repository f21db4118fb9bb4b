//! Shift and rotate instructions

use kx10::cpu::harness::{inst, Harness};
use kx10::cpu::state::Flags;
use kx10::word::{FMASK, SMASK};

fn halt() -> u64 {
    inst(0o254, 0o4, false, 0, 0)
}

/// Negative shift count in the effective address
fn neg(n: u32) -> u32 {
    (0o777777 - n + 1) & 0o777777
}

fn run_shift(op: u32, ac_val: u64, count: u32) -> Harness {
    let mut h = Harness::new();
    h.set_ac(1, ac_val);
    h.load_program(0o100, &[inst(op, 1, false, 0, count), halt()]);
    h.run();
    h
}

#[test]
fn test_lsh_left_and_right() {
    assert_eq!(run_shift(0o242, 1, 3).ac(1), 0o10);
    assert_eq!(run_shift(0o242, 0o10, neg(3)).ac(1), 1);
    // Bits fall off the top
    assert_eq!(run_shift(0o242, SMASK, 1).ac(1), 0);
}

#[test]
fn test_ash_preserves_sign() {
    // -8 >> 1 = -4
    let m8 = FMASK - 7; // -8
    assert_eq!(run_shift(0o240, m8, neg(1)).ac(1), FMASK - 3);
    // Positive left shift within range
    assert_eq!(run_shift(0o240, 5, 2).ac(1), 20);
}

#[test]
fn test_ash_overflow() {
    let h = run_shift(0o240, 0o200000_000000, 1); // bit 1 set, shifts into sign
    assert!(h.m.cpu.flags.contains(Flags::OVR));
}

#[test]
fn test_rot() {
    assert_eq!(run_shift(0o241, 1, 36).ac(1), 1);
    assert_eq!(run_shift(0o241, SMASK, 1).ac(1), 1);
    assert_eq!(run_shift(0o241, 1, neg(1)).ac(1), SMASK);
}

#[test]
fn test_jffo() {
    // JFFO 1,3000: leading zero count into AC2, jump when AC1 nonzero
    let mut h = Harness::new();
    h.set_ac(1, 0o000_400_000_000); // bit 9
    h.set_mem(0o3000, inst(0o201, 3, false, 0, 1)); // landing marker
    h.set_mem(0o3001, halt());
    h.load_program(0o100, &[inst(0o243, 1, false, 0, 0o3000), halt()]);
    h.run();
    assert_eq!(h.ac(2), 9);
    assert_eq!(h.ac(3), 1);
}

#[test]
fn test_jffo_zero_falls_through() {
    let mut h = Harness::new();
    h.set_ac(1, 0);
    h.load_program(
        0o100,
        &[
            inst(0o243, 1, false, 0, 0o3000),
            inst(0o201, 3, false, 0, 2),
            halt(),
        ],
    );
    h.run();
    assert_eq!(h.ac(2), 0);
    assert_eq!(h.ac(3), 2);
}

#[test]
fn test_lshc_crosses_words() {
    // AC1,AC2 shifted left 40: AC2's bits move up through AC1
    let mut h = Harness::new();
    h.set_ac(1, 0);
    h.set_ac(2, 0o17);
    h.load_program(0o100, &[inst(0o246, 1, false, 0, 40), halt()]);
    h.run();
    assert_eq!(h.ac(1), 0o17 << 4);
    assert_eq!(h.ac(2), 0);
}

#[test]
fn test_rotc_full_circle() {
    let mut h = Harness::new();
    h.set_ac(1, 0o1234);
    h.set_ac(2, 0o5670);
    h.load_program(0o100, &[inst(0o245, 1, false, 0, 72), halt()]);
    h.run();
    assert_eq!(h.ac(1), 0o1234);
    assert_eq!(h.ac(2), 0o5670);
}

#[test]
fn test_rotc_exchanges_at_36() {
    let mut h = Harness::new();
    h.set_ac(1, 0o1234);
    h.set_ac(2, 0o5670);
    h.load_program(0o100, &[inst(0o245, 1, false, 0, 36), halt()]);
    h.run();
    assert_eq!(h.ac(1), 0o5670);
    assert_eq!(h.ac(2), 0o1234);
}

#[test]
fn test_ashc_right_keeps_signs() {
    // Negative pair shifted right: sign propagates, AC2 sign mirrors
    let mut h = Harness::new();
    h.set_ac(1, SMASK | 0o100); // negative high
    h.set_ac(2, 0);
    h.load_program(0o100, &[inst(0o244, 1, false, 0, neg(1)), halt()]);
    h.run();
    assert!(h.ac(1) & SMASK != 0);
    assert!(h.ac(2) & SMASK != 0);
}
