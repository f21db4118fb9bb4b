//! Fixed-point arithmetic: carries, overflow, multiply, divide

use kx10::cpu::harness::{inst, Harness};
use kx10::cpu::state::Flags;
use kx10::word::{negate, CMASK, FMASK, SMASK};

fn halt() -> u64 {
    inst(0o254, 0o4, false, 0, 0)
}

/// Signed value of a 36-bit word
fn signed(w: u64) -> i64 {
    if w & SMASK != 0 {
        (w as i64) - (1i64 << 36)
    } else {
        w as i64
    }
}

fn word(v: i64) -> u64 {
    (v as u64) & FMASK
}

#[test]
fn test_addi_overflow_at_max_positive() {
    // ADDI 1,1 with AC1 = 2^35-1
    let mut h = Harness::new();
    h.set_ac(1, CMASK);
    h.load_program(0o100, &[inst(0o271, 1, false, 0, 1), halt()]);
    h.run();
    assert_eq!(h.ac(1), SMASK);
    assert!(h.m.cpu.flags.contains(Flags::OVR));
    assert!(h.m.cpu.flags.contains(Flags::CRY1));
    assert!(!h.m.cpu.flags.contains(Flags::CRY0));
}

#[test]
fn test_add_matches_wrapping_sum() {
    let cases: [(i64, i64); 6] = [
        (5, 7),
        (-5, 7),
        (-1, -1),
        (1 << 34, 1 << 34),
        (-(1 << 35), -1),
        (12345678, -8765432),
    ];
    for (a, b) in cases {
        let mut h = Harness::new();
        h.set_ac(1, word(a));
        h.set_mem(0o2000, word(b));
        h.load_program(0o100, &[inst(0o270, 1, false, 0, 0o2000), halt()]);
        h.run();
        assert_eq!(h.ac(1), word(a.wrapping_add(b)), "{} + {}", a, b);
        let exact = a + b;
        let overflowed = !(-(1i64 << 35)..(1i64 << 35)).contains(&exact);
        assert_eq!(
            h.m.cpu.flags.contains(Flags::OVR),
            overflowed,
            "overflow for {} + {}",
            a,
            b
        );
    }
}

#[test]
fn test_sub() {
    let mut h = Harness::new();
    h.set_ac(1, word(100));
    h.set_mem(0o2000, word(250));
    // SUB 1,2000: AC := AC - mem
    h.load_program(0o100, &[inst(0o274, 1, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(signed(h.ac(1)), -150);
}

#[test]
fn test_imul() {
    let mut h = Harness::new();
    h.set_ac(1, word(-123));
    h.set_mem(0o2000, word(456));
    h.load_program(0o100, &[inst(0o220, 1, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(signed(h.ac(1)), -123 * 456);
    assert!(!h.m.cpu.flags.contains(Flags::OVR));
}

#[test]
fn test_imul_overflow() {
    let mut h = Harness::new();
    h.set_ac(1, word(1 << 20));
    h.set_mem(0o2000, word(1 << 20));
    h.load_program(0o100, &[inst(0o220, 1, false, 0, 0o2000), halt()]);
    h.run();
    assert!(h.m.cpu.flags.contains(Flags::OVR));
}

#[test]
fn test_mul_double_product() {
    // MUL 1,2000: 2^20 * 2^20 = 2^40 spans both halves
    let mut h = Harness::new();
    h.set_ac(1, word(1 << 20));
    h.set_mem(0o2000, word(1 << 20));
    h.load_program(0o100, &[inst(0o224, 1, false, 0, 0o2000), halt()]);
    h.run();
    // 2^40 = 2^5 * 2^35: high word 2^5, low word 0
    assert_eq!(h.ac(1), 1 << 5);
    assert_eq!(h.ac(2), 0);
}

#[test]
fn test_mul_negative() {
    let mut h = Harness::new();
    h.set_ac(1, word(-3));
    h.set_mem(0o2000, word(5));
    h.load_program(0o100, &[inst(0o224, 1, false, 0, 0o2000), halt()]);
    h.run();
    // -15 as a double: high all ones, low holds -15 with the sign
    // mirrored
    assert_eq!(h.ac(1), FMASK);
    assert_eq!(h.ac(2), word(-15) & (SMASK | CMASK));
}

#[test]
fn test_idiv() {
    let mut h = Harness::new();
    h.set_ac(1, word(-100));
    h.set_mem(0o2000, word(7));
    h.load_program(0o100, &[inst(0o230, 1, false, 0, 0o2000), halt()]);
    h.run();
    // Quotient truncates toward zero; remainder keeps the dividend sign
    assert_eq!(signed(h.ac(1)), -14);
    assert_eq!(signed(h.ac(2)), -2);
}

#[test]
fn test_idiv_by_zero_no_store() {
    let mut h = Harness::new();
    h.set_ac(1, word(55));
    h.set_mem(0o2000, 0);
    h.load_program(0o100, &[inst(0o230, 1, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(signed(h.ac(1)), 55); // untouched
    assert!(h.m.cpu.flags.contains(Flags::NODIV));
    assert!(h.m.cpu.flags.contains(Flags::OVR));
}

#[test]
fn test_div_double_dividend() {
    // DIV 1,2000 divides AC,AC+1 by the operand
    let mut h = Harness::new();
    // Dividend 2^40 + 3: high = 2^5, low = 3
    h.set_ac(1, 1 << 5);
    h.set_ac(2, 3);
    h.set_mem(0o2000, word(1000));
    h.load_program(0o100, &[inst(0o234, 1, false, 0, 0o2000), halt()]);
    h.run();
    let dividend = (1i64 << 40) + 3;
    assert_eq!(signed(h.ac(1)), dividend / 1000);
    assert_eq!(signed(h.ac(2)), dividend % 1000);
}

#[test]
fn test_div_no_divide_when_quotient_too_big() {
    let mut h = Harness::new();
    h.set_ac(1, word(500)); // high half >= divisor
    h.set_ac(2, 0);
    h.set_mem(0o2000, word(100));
    h.load_program(0o100, &[inst(0o234, 1, false, 0, 0o2000), halt()]);
    h.run();
    assert!(h.m.cpu.flags.contains(Flags::NODIV));
    assert!(h.m.cpu.flags.contains(Flags::OVR));
    assert_eq!(h.ac(1), word(500)); // no store
}

#[test]
fn test_div_signs() {
    // Remainder takes the dividend sign, quotient the XOR
    let mut h = Harness::new();
    h.set_ac(1, FMASK); // high of -(2^35*0 + 7): set up -7 as double
    h.set_ac(2, negate(7) & CMASK | SMASK); // low half, sign mirrored
    h.set_mem(0o2000, word(2));
    h.load_program(0o100, &[inst(0o234, 1, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(signed(h.ac(1)), -3);
    assert_eq!(signed(h.ac(2)), -1);
}

#[test]
fn test_movn_max_negative_overflows() {
    let mut h = Harness::new();
    h.set_mem(0o2000, SMASK); // -2^35
    h.load_program(0o100, &[inst(0o210, 1, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(h.ac(1), SMASK);
    assert!(h.m.cpu.flags.contains(Flags::OVR));
    assert!(h.m.cpu.flags.contains(Flags::CRY1));
}

#[test]
fn test_addm_stores_to_memory() {
    let mut h = Harness::new();
    h.set_ac(1, word(10));
    h.set_mem(0o2000, word(32));
    h.load_program(0o100, &[inst(0o272, 1, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(h.mem(0o2000), word(42));
    assert_eq!(h.ac(1), word(10));
}

#[test]
fn test_addb_stores_both() {
    let mut h = Harness::new();
    h.set_ac(1, word(1));
    h.set_mem(0o2000, word(2));
    h.load_program(0o100, &[inst(0o273, 1, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(h.mem(0o2000), word(3));
    assert_eq!(h.ac(1), word(3));
}
