//! Half-word transfers: source half, destination half, fill modes

use kx10::cpu::harness::{inst, Harness};
use kx10::word::{swap, FMASK, LMASK, RMASK};

fn halt() -> u64 {
    inst(0o254, 0o4, false, 0, 0)
}

const M: u64 = 0o123456_654321;
const ACV: u64 = 0o111111_222222;

/// Basic-mode half-word op: result lands in AC1
fn run_basic(op: u32) -> u64 {
    let mut h = Harness::new();
    h.set_ac(1, ACV);
    h.set_mem(0o2000, M);
    h.load_program(0o100, &[inst(op, 1, false, 0, 0o2000), halt()]);
    h.run();
    h.ac(1)
}

#[test]
fn test_hll_group() {
    // HLL: memory left to AC left, AC right kept
    assert_eq!(run_basic(0o500), (M & LMASK) | (ACV & RMASK));
    // HLLZ: zero fill
    assert_eq!(run_basic(0o510), M & LMASK);
    // HLLO: ones fill
    assert_eq!(run_basic(0o520), (M & LMASK) | RMASK);
    // HLLE: sign extend (M is positive here)
    assert_eq!(run_basic(0o530), M & LMASK);
}

#[test]
fn test_hrl_group() {
    // HRL: memory right to AC left
    assert_eq!(run_basic(0o504), (swap(M) & LMASK) | (ACV & RMASK));
    // HRLZ
    assert_eq!(run_basic(0o514), swap(M) & LMASK);
}

#[test]
fn test_hrr_group() {
    // HRR: memory right to AC right, AC left kept
    assert_eq!(run_basic(0o540), (ACV & LMASK) | (M & RMASK));
    // HRRZ
    assert_eq!(run_basic(0o550), M & RMASK);
    // HRRO
    assert_eq!(run_basic(0o560), LMASK | (M & RMASK));
}

#[test]
fn test_hlr_group() {
    // HLR: memory left to AC right
    assert_eq!(run_basic(0o544), (ACV & LMASK) | (swap(M) & RMASK));
    // HLRZ
    assert_eq!(run_basic(0o554), swap(M) & RMASK);
}

#[test]
fn test_sign_extension() {
    // HRRE of a word whose right half is negative fills ones
    let mut h = Harness::new();
    h.set_mem(0o2000, 0o000000_400001);
    h.load_program(0o100, &[inst(0o570, 1, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(h.ac(1), LMASK | 0o400001);
    // HLRE of a negative left half
    let mut h = Harness::new();
    h.set_mem(0o2000, 0o400001_000000);
    h.load_program(0o100, &[inst(0o574, 1, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(h.ac(1), LMASK | 0o400001);
}

#[test]
fn test_hrli_builds_left_immediate() {
    // HRLI 1,777 puts 777 in the left half
    let mut h = Harness::new();
    h.set_ac(1, 0o33);
    h.load_program(0o100, &[inst(0o505, 1, false, 0, 0o777), halt()]);
    h.run();
    assert_eq!(h.ac(1), (0o777 << 18) | 0o33);
}

#[test]
fn test_memory_mode_replaces_half_in_place() {
    // HRRM 1,2000: AC right half into memory's right half
    let mut h = Harness::new();
    h.set_ac(1, 0o111111_333333);
    h.set_mem(0o2000, M);
    h.load_program(0o100, &[inst(0o542, 1, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(h.mem(0o2000), (M & LMASK) | 0o333333);
}

#[test]
fn test_transfer_idempotent() {
    // Applying HLL twice from an unchanged source changes nothing more
    let mut h = Harness::new();
    h.set_ac(1, ACV);
    h.set_mem(0o2000, M);
    h.load_program(
        0o100,
        &[
            inst(0o500, 1, false, 0, 0o2000),
            inst(0o500, 1, false, 0, 0o2000),
            halt(),
        ],
    );
    h.run();
    assert_eq!(h.ac(1), (M & LMASK) | (ACV & RMASK));
}

#[test]
fn test_swap_involution_via_movs() {
    let mut h = Harness::new();
    h.set_mem(0o2000, M);
    // MOVS 1,2000 ; MOVSM 1,2001 leaves the original word at 2001
    h.load_program(
        0o100,
        &[
            inst(0o204, 1, false, 0, 0o2000),
            inst(0o206, 1, false, 0, 0o2001),
            halt(),
        ],
    );
    h.run();
    assert_eq!(h.mem(0o2001) & FMASK, M);
}

#[test]
fn test_hlrs_duplicates_left_half() {
    // HLRS 1,2000: the word's left half lands in both halves, in
    // memory and in the AC
    let mut h = Harness::new();
    h.set_mem(0o2000, M);
    h.load_program(0o100, &[inst(0o547, 1, false, 0, 0o2000), halt()]);
    h.run();
    let both_left = (M & LMASK) | ((M >> 18) & RMASK);
    assert_eq!(h.mem(0o2000), both_left);
    assert_eq!(h.ac(1), both_left);
}

#[test]
fn test_hrls_duplicates_right_half() {
    // HRLS 1,2000: the right half in both halves
    let mut h = Harness::new();
    h.set_mem(0o2000, M);
    h.load_program(0o100, &[inst(0o507, 1, false, 0, 0o2000), halt()]);
    h.run();
    let both_right = ((M & RMASK) << 18) | (M & RMASK);
    assert_eq!(h.mem(0o2000), both_right);
    assert_eq!(h.ac(1), both_right);
}

#[test]
fn test_hlls_self() {
    // HLLS 0,2000 leaves memory intact; with nonzero AC it also loads
    let mut h = Harness::new();
    h.set_mem(0o2000, M);
    h.load_program(0o100, &[inst(0o503, 2, false, 0, 0o2000), halt()]);
    h.run();
    assert_eq!(h.mem(0o2000), M);
    assert_eq!(h.ac(2), M);
}
