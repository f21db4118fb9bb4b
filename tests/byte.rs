//! Byte pointers: IBP advance, ILDB/LDB/IDPB/DPB

use kx10::cpu::harness::{inst, Harness};
use kx10::word::{FMASK, RMASK};

fn halt() -> u64 {
    inst(0o254, 0o4, false, 0, 0)
}

/// Assemble a byte pointer: position, size, address
fn bp(pos: u64, size: u64, addr: u64) -> u64 {
    ((pos & 0o77) << 30) | ((size & 0o77) << 24) | (addr & RMASK)
}

#[test]
fn test_ildb_walks_bytes() {
    // Word of six 6-bit bytes; pointer starts before the first
    let mut h = Harness::new();
    h.set_mem(0o100, 0o111111_222222);
    h.set_mem(0o101, bp(36, 6, 0o100));
    h.load_program(
        0o200,
        &[
            inst(0o134, 1, false, 0, 0o101), // ILDB 1,101
            inst(0o134, 2, false, 0, 0o101), // ILDB 2,101
            halt(),
        ],
    );
    h.run();
    assert_eq!(h.ac(1), 0o11);
    assert_eq!(h.ac(2), 0o11);
    // Two increments moved the position from 36 to 24
    assert_eq!((h.mem(0o101) >> 30) & 0o77, 24);
    assert_eq!(h.mem(0o101) & RMASK, 0o100);
}

#[test]
fn test_ildb_reaches_low_bytes() {
    let mut h = Harness::new();
    h.set_mem(0o100, 0o111111_222222);
    h.set_mem(0o101, bp(12, 6, 0o100)); // next byte at position 6
    h.load_program(0o200, &[inst(0o134, 1, false, 0, 0o101), halt()]);
    h.run();
    assert_eq!(h.ac(1), 0o22);
}

#[test]
fn test_ibp_rolls_to_next_word() {
    // Position 6: one more increment underflows to the next word
    let mut h = Harness::new();
    h.set_mem(0o101, bp(6, 6, 0o100));
    h.load_program(
        0o200,
        &[
            inst(0o133, 0, false, 0, 0o101), // IBP 101
            inst(0o133, 0, false, 0, 0o101),
            halt(),
        ],
    );
    h.run();
    let p = h.mem(0o101);
    assert_eq!((p >> 30) & 0o77, 30); // 36 - 6
    assert_eq!(p & RMASK, 0o101); // address stepped
}

#[test]
fn test_ibp_advance_rate() {
    // Nine 9-bit increments from a fresh pointer cross two words and
    // land on the first byte of the third
    let mut h = Harness::new();
    h.set_mem(0o101, bp(36, 9, 0o100));
    let prog: Vec<u64> = (0..9)
        .map(|_| inst(0o133, 0, false, 0, 0o101))
        .chain(std::iter::once(halt()))
        .collect();
    h.load_program(0o200, &prog);
    h.run();
    let p = h.mem(0o101);
    assert_eq!(p & RMASK, 0o102);
    assert_eq!((p >> 30) & 0o77, 27);
}

#[test]
fn test_ldb_dpb_roundtrip() {
    // Property: LDB(DPB(v)) returns v masked to the byte size
    let mut h = Harness::new();
    h.set_mem(0o100, FMASK);
    h.set_mem(0o101, bp(12, 6, 0o100)); // byte at bits 12-17
    h.set_ac(1, 0o4242); // deposit value: only low 6 bits fit
    h.load_program(
        0o200,
        &[
            inst(0o137, 1, false, 0, 0o101), // DPB 1,101
            inst(0o135, 2, false, 0, 0o101), // LDB 2,101
            halt(),
        ],
    );
    h.run();
    assert_eq!(h.ac(2), 0o42);
    // Bits outside the byte survive
    assert_eq!(h.mem(0o100) | (0o77 << 12), FMASK);
}

#[test]
fn test_dpb_merges_in_place() {
    let mut h = Harness::new();
    h.set_mem(0o100, 0o111111_222222);
    h.set_mem(0o101, bp(30, 6, 0o100)); // top byte
    h.set_ac(1, 0o77);
    h.load_program(0o200, &[inst(0o137, 1, false, 0, 0o101), halt()]);
    h.run();
    assert_eq!(h.mem(0o100), 0o771111_222222);
}

#[test]
fn test_idpb_increments_then_deposits() {
    let mut h = Harness::new();
    h.set_mem(0o100, 0);
    h.set_mem(0o101, bp(36, 6, 0o100));
    h.set_ac(1, 0o33);
    h.load_program(0o200, &[inst(0o136, 1, false, 0, 0o101), halt()]);
    h.run();
    // First byte (bits 30-35 of the word)
    assert_eq!(h.mem(0o100), 0o33 << 30);
}

#[test]
fn test_byte_pointer_indexing() {
    // The pointer's own index field applies when the byte is fetched
    let mut h = Harness::new();
    h.set_ac(5, 0o10); // index register
    h.set_mem(0o110, 0o765432_101234);
    h.set_mem(0o101, bp(6, 6, 0o100) | (5 << 18)); // 100(5) -> 110
    h.load_program(0o200, &[inst(0o135, 1, false, 0, 0o101), halt()]);
    h.run();
    assert_eq!(h.ac(1), (0o765432_101234 >> 6) & 0o77);
}
