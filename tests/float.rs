//! Floating point: add, subtract, multiply, divide, scale, convert

use kx10::cpu::harness::{inst, Harness};
use kx10::cpu::state::Flags;
use kx10::word::{negate, MMASK};

fn halt() -> u64 {
    inst(0o254, 0o4, false, 0, 0)
}

/// Pack a positive float from exponent and 27-bit fraction
fn fp(exp: u64, frac: u64) -> u64 {
    (exp << 27) | (frac & MMASK)
}

const ONE: u64 = 0o201_400_000_000; // 1.0
const TWO: u64 = 0o202_400_000_000;
const THREE: u64 = 0o202_600_000_000;
const SIX: u64 = 0o203_600_000_000;

fn run_fop(op: u32, ac: u64, mem: u64) -> Harness {
    let mut h = Harness::new();
    h.set_ac(1, ac);
    h.set_mem(0o2000, mem);
    h.load_program(0o100, &[inst(op, 1, false, 0, 0o2000), halt()]);
    h.run();
    h
}

#[test]
fn test_fad() {
    // 1.0 + 1.0 = 2.0
    assert_eq!(run_fop(0o140, ONE, ONE).ac(1), TWO);
    // 2.0 + 1.0 = 3.0 (alignment shift)
    assert_eq!(run_fop(0o140, TWO, ONE).ac(1), THREE);
}

#[test]
fn test_fad_opposite_signs_cancel() {
    let h = run_fop(0o140, ONE, negate(ONE));
    assert_eq!(h.ac(1), 0);
}

#[test]
fn test_fad_negative_result() {
    // 1.0 + (-2.0) = -1.0
    let h = run_fop(0o140, ONE, negate(TWO));
    assert_eq!(h.ac(1), negate(ONE));
}

#[test]
fn test_fsb() {
    // AC - memory: 3.0 - 1.0 = 2.0
    assert_eq!(run_fop(0o150, THREE, ONE).ac(1), TWO);
    // 1.0 - 3.0 = -2.0
    assert_eq!(run_fop(0o150, ONE, THREE).ac(1), negate(TWO));
}

#[test]
fn test_fmp() {
    // 2.0 * 3.0 = 6.0
    assert_eq!(run_fop(0o160, TWO, THREE).ac(1), SIX);
    // Signs
    assert_eq!(run_fop(0o160, negate(TWO), THREE).ac(1), negate(SIX));
}

#[test]
fn test_fdv() {
    // 6.0 / 2.0 = 3.0
    assert_eq!(run_fop(0o170, SIX, TWO).ac(1), THREE);
    // 1.0 / 2.0 = 0.5
    assert_eq!(run_fop(0o170, ONE, TWO).ac(1), fp(0o200, 0o400_000_000));
}

#[test]
fn test_fdv_by_zero_no_divide() {
    let h = run_fop(0o170, ONE, 0);
    assert!(h.m.cpu.flags.contains(Flags::NODIV));
    assert!(h.m.cpu.flags.contains(Flags::FLTOVR));
    assert_eq!(h.ac(1), ONE); // no store
}

#[test]
fn test_fadr_rounds() {
    // A sum whose discarded bit rounds the mantissa up: 1.0 + 2^-27
    let tiny = fp(0o201 - 27, 0o400_000_000);
    let h = run_fop(0o144, ONE, tiny);
    assert_eq!(h.ac(1), fp(0o201, 0o400_000_001));
}

#[test]
fn test_fadl_low_word_carries_residue() {
    // FADL of operands 27 exponent steps apart: the small addend
    // reappears intact as the low word in AC+1
    let mut h = Harness::new();
    let big = fp(0o034, 0o400_000_000);
    let small = fp(0o001, 0o400_000_000);
    h.set_ac(1, big);
    h.set_mem(0o2000, small);
    h.load_program(0o100, &[inst(0o141, 1, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(h.ac(1), big);
    assert_eq!(h.ac(2), small);
}

#[test]
fn test_fmpl_low_word_exponent_uncomplemented() {
    // Long multiply with a tiny result: the residue's exponent byte is
    // stored as the raw scale count, never sign-complemented, even
    // after the count wraps negative
    let mut h = Harness::new();
    h.set_ac(1, fp(0o103, 0o400_000_001));
    h.set_mem(0o2000, fp(0o103, 0o400_000_001));
    h.load_program(0o100, &[inst(0o161, 1, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(h.ac(1), fp(0o005, 0o400_000_002));
    assert_eq!(h.ac(2), (0o352 << 27) | 2);
}

#[test]
fn test_fad_overflow_flag() {
    // Largest exponents added overflow the exponent field
    let big = fp(0o377, 0o400_000_000);
    let h = run_fop(0o140, big, big);
    assert!(h.m.cpu.flags.contains(Flags::OVR));
    assert!(h.m.cpu.flags.contains(Flags::FLTOVR));
}

#[test]
fn test_underflow_flag() {
    // Smallest exponents multiplied underflow
    let small = fp(0o001, 0o400_000_000);
    let h = run_fop(0o160, small, small);
    assert!(h.m.cpu.flags.contains(Flags::FLTOVR));
    assert!(h.m.cpu.flags.contains(Flags::FLTUND));
}

#[test]
fn test_fsc_scales() {
    // FSC 1,1 doubles; FSC 1,-1 halves
    let mut h = Harness::new();
    h.set_ac(1, ONE);
    h.load_program(0o100, &[inst(0o132, 1, false, 0, 1), halt()]);
    h.run();
    assert_eq!(h.ac(1), TWO);

    let mut h = Harness::new();
    h.set_ac(1, TWO);
    h.load_program(0o100, &[inst(0o132, 1, false, 0, 0o777777), halt()]);
    h.run();
    assert_eq!(h.ac(1), ONE);
}

#[test]
fn test_ufa_to_ac_plus_one() {
    let mut h = Harness::new();
    h.set_ac(1, ONE);
    h.set_mem(0o2000, ONE);
    h.load_program(0o100, &[inst(0o130, 1, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(h.ac(2), TWO);
    assert_eq!(h.ac(1), ONE); // AC itself untouched
}

#[test]
fn test_fix_truncates() {
    // KI conversion: 5.0 -> 5
    let mut h = Harness::new_ki();
    h.set_mem(0o2000, fp(0o203, 0o500_000_000));
    h.load_program(0o100, &[inst(0o122, 1, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(h.ac(1), 5);
}

#[test]
fn test_fix_negative() {
    let mut h = Harness::new_ki();
    h.set_mem(0o2000, negate(fp(0o203, 0o500_000_000))); // -5.0
    h.load_program(0o100, &[inst(0o122, 1, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(h.ac(1), negate(5));
}

#[test]
fn test_fix_overflow() {
    // 2^40 does not fit a word
    let mut h = Harness::new_ki();
    h.set_ac(1, 0o1234);
    h.set_mem(0o2000, fp(0o251, 0o400_000_000));
    h.load_program(0o100, &[inst(0o122, 1, false, 0, 0o2000), halt()]);
    h.run();
    assert!(h.m.cpu.flags.contains(Flags::OVR));
    assert_eq!(h.ac(1), 0o1234); // no store
}

#[test]
fn test_fltr_converts() {
    let mut h = Harness::new_ki();
    h.set_mem(0o2000, 5);
    h.load_program(0o100, &[inst(0o127, 1, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(h.ac(1), fp(0o203, 0o500_000_000));
}

#[test]
fn test_fltr_negative() {
    let mut h = Harness::new_ki();
    h.set_mem(0o2000, negate(5));
    h.load_program(0o100, &[inst(0o127, 1, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(h.ac(1), negate(fp(0o203, 0o500_000_000)));
}

#[test]
fn test_dfad() {
    // Double 1.0 + 1.0 = 2.0; low words zero
    let mut h = Harness::new_ki();
    h.set_ac(1, ONE);
    h.set_ac(2, 0);
    h.set_mem(0o2000, ONE);
    h.set_mem(0o2001, 0);
    h.load_program(0o100, &[inst(0o110, 1, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(h.ac(1), TWO);
    assert_eq!(h.ac(2), 0);
}

#[test]
fn test_dfmp() {
    let mut h = Harness::new_ki();
    h.set_ac(1, TWO);
    h.set_ac(2, 0);
    h.set_mem(0o2000, THREE);
    h.set_mem(0o2001, 0);
    h.load_program(0o100, &[inst(0o112, 1, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(h.ac(1), SIX);
}

#[test]
fn test_dfdv() {
    let mut h = Harness::new_ki();
    h.set_ac(1, SIX);
    h.set_ac(2, 0);
    h.set_mem(0o2000, TWO);
    h.set_mem(0o2001, 0);
    h.load_program(0o100, &[inst(0o113, 1, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(h.ac(1), THREE);
}

#[test]
fn test_dmove_dmovem() {
    let mut h = Harness::new_ki();
    h.set_mem(0o2000, 0o111);
    h.set_mem(0o2001, 0o222);
    h.load_program(
        0o100,
        &[
            inst(0o120, 1, false, 0, 0o2000), // DMOVE 1,2000
            inst(0o124, 1, false, 0, 0o3000), // DMOVEM 1,3000
            halt(),
        ],
    );
    h.run();
    assert_eq!(h.ac(1), 0o111);
    assert_eq!(h.ac(2), 0o222);
    assert_eq!(h.mem(0o3000), 0o111);
    assert_eq!(h.mem(0o3001), 0o222);
}

#[test]
fn test_dmovn_negates_double() {
    let mut h = Harness::new_ki();
    h.set_mem(0o2000, 0); // high
    h.set_mem(0o2001, 5); // low
    h.load_program(0o100, &[inst(0o121, 1, false, 0, 0o2000), halt()]);
    h.run();
    // -(5) as a double: low = 2^35 - 5, high = -1
    assert_eq!(h.ac(2), (1u64 << 35) - 5);
    assert_eq!(h.ac(1), 0o777777_777777);
}
