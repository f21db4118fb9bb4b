//! Boolean lattice
//!
//! All sixteen two-variable functions of AR (the memory/immediate
//! operand) and BR (the accumulator), selected by the function number
//! in the opcode. The four addressing-mode variants of each function
//! share the one body; the staging flags differ.

use crate::cpu::state::{Cpu, MemResult};
use crate::word::{cm, FMASK};

pub fn boolean(cpu: &mut Cpu) -> MemResult {
    let ar = cpu.ar;
    let br = cpu.br;
    cpu.ar = match (cpu.ir >> 2) & 0o17 {
        0o00 => 0,                // SETZ
        0o01 => ar & br,          // AND
        0o02 => ar & cm(br),      // ANDCA
        0o03 => ar,               // SETM
        0o04 => cm(ar) & br,      // ANDCM
        0o05 => br,               // SETA
        0o06 => ar ^ br,          // XOR
        0o07 => ar | br,          // IOR
        0o10 => cm(ar) & cm(br),  // ANDCB
        0o11 => cm(ar ^ br),      // EQV
        0o12 => cm(br),           // SETCA
        0o13 => cm(ar) | br,      // ORCA
        0o14 => cm(ar),           // SETCM
        0o15 => ar | cm(br),      // ORCM
        0o16 => cm(ar) | cm(br),  // ORCB
        _ => FMASK,               // SETO
    };
    Ok(())
}
