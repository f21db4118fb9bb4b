//! Byte-pointer group
//!
//! A byte pointer carries position and size in its left half and an
//! I/X/Y address part in its right. Incrementing subtracts the size
//! from the position; underflow resets the position to `36 - size` and
//! steps the word address (the KI holds the rest of the left half
//! intact, the KA propagates the carry).
//!
//! Load and deposit run as two-phase instructions: the first phase
//! captures the pointer and latches the byte-in-progress flag, the
//! second resolves the pointer's own address part through the normal
//! effective-address chain and moves the byte. A page fault between
//! the phases resumes at the right one.

use crate::config::CpuModel;
use crate::cpu::state::{Cpu, Flags, MemResult};
use crate::word::{cm, FMASK, LMASK, PMASK, RMASK};

/// IBP, ILDB, IDPB: increment the pointer in memory first
pub fn ibp_group(cpu: &mut Cpu) -> MemResult {
    if !cpu.flags.contains(Flags::BYTI) {
        cpu.modify = true;
        cpu.mem_read(false, true, false)?;
        cpu.ar = cpu.mb;
        let size = (cpu.ar >> 24) & 0o77;
        let pos = (cpu.ar >> 30) & 0o77;
        let scad = (pos + (0o777 ^ size) + 1) & 0o777;
        let newpos = if scad & 0o400 != 0 {
            // Position underflow: first byte of the next word
            cpu.ar = if cpu.model == CpuModel::Ki10 {
                (cpu.ar & LMASK) | ((cpu.ar + 1) & RMASK)
            } else {
                (cpu.ar + 1) & FMASK
            };
            ((0o777 ^ size) + 0o44 + 1) & 0o777
        } else {
            scad
        };
        cpu.ar &= PMASK;
        cpu.ar |= (newpos & 0o77) << 30;
        cpu.mb = cpu.ar;
        cpu.mem_write(false, true)?;
        if cpu.ir & 0o4 == 0 {
            // Plain IBP is done
            return Ok(());
        }
        return first_phase(cpu);
    }
    // Resuming after a fault: the increment already happened
    ldb_dpb(cpu)
}

/// LDB, DPB and the second phase of the incrementing forms
pub fn ldb_dpb(cpu: &mut Cpu) -> MemResult {
    if !cpu.flags.contains(Flags::BYTI) || !cpu.byf5 {
        cpu.mem_read(false, true, false)?;
        cpu.ar = cpu.mb;
        return first_phase(cpu);
    }
    // Second phase: AB came through the pointer's own I/X/Y chain
    cpu.ab = (cpu.ar & RMASK) as u32;
    if cpu.ir & 0o6 == 0o6 {
        cpu.modify = true;
    }
    cpu.mem_read(false, false, false)?;
    cpu.ar = cpu.mb;
    if cpu.ir & 0o6 == 0o4 {
        // Load: extract and right-justify
        cpu.ar = (cpu.ar >> cpu.sc) & cpu.mq;
        let ar = cpu.ar;
        cpu.set_reg(cpu.ac, ar);
    } else {
        // Deposit: merge AC's low bits under the mask
        cpu.br = cpu.get_reg(cpu.ac).wrapping_shl(cpu.sc);
        cpu.mq = cpu.mq.wrapping_shl(cpu.sc);
        cpu.ar &= cm(cpu.mq);
        cpu.ar |= cpu.br & cpu.mq;
        cpu.mb = cpu.ar & FMASK;
        let _ = cpu.mem_write(false, false);
    }
    cpu.flags -= Flags::BYTI;
    cpu.byf5 = false;
    Ok(())
}

/// Latch the pointer fields and suspend until the next pass resolves
/// the byte address
fn first_phase(cpu: &mut Cpu) -> MemResult {
    cpu.sc = ((cpu.ar >> 30) & 0o77) as u32;
    cpu.mq = 1u64.wrapping_shl(((cpu.ar >> 24) & 0o77) as u32).wrapping_sub(1);
    cpu.f_load_pc = false;
    cpu.f_inst_fetch = false;
    cpu.f_pc_inh = true;
    cpu.flags |= Flags::BYTI;
    cpu.byf5 = true;
    cpu.mb = cpu.ar;
    Ok(())
}
