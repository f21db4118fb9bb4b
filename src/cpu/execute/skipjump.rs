//! Compares, jumps, skips, and the pointer-stepping loops
//!
//! The eight conditions (never, <, =, <=, always, >=, !=, >) are
//! encoded in the low opcode bits; the shared tails fold the sign and
//! zero of the decided value into a condition mask and either bump PC
//! past the next instruction or load it from the effective address.

use crate::cpu::state::{Cpu, Flags, MemResult};
use crate::devices::DeviceBus;
use crate::word::{cm, C1, CMASK, FMASK, RMASK, SMASK};

/// Skip tail: advance PC when the condition selects
fn skip_tail(cpu: &mut Cpu, ad: u64, mut f: u32) {
    let ad = ad & FMASK;
    cpu.ar = ad;
    f |= ((ad == 0) as u32) << 1;
    f &= cpu.ir;
    if ((cpu.ir & 0o4) != 0) == (f == 0) {
        cpu.pc = (cpu.pc + 1) & RMASK as u32;
    } else if cpu.has_traps() && cpu.pi_cycle {
        cpu.pi.ov = true;
        cpu.pi.hold = true;
    }
}

/// Jump tail: load PC from the effective address when selected
fn jump_tail(cpu: &mut Cpu, ad: u64, mut f: u32) {
    let ad = ad & FMASK;
    cpu.ar = ad;
    f |= ((ad == 0) as u32) << 1;
    f &= cpu.ir;
    if ((cpu.ir & 0o4) != 0) == (f == 0) {
        cpu.its_jump();
        cpu.pc = cpu.ab;
        cpu.f_pc_inh = true;
    }
}

/// CAI/CAM: arithmetic compare of AC against the operand
pub fn cam(cpu: &mut Cpu) -> MemResult {
    let ar = cpu.ar;
    let br = cpu.br;
    let ad = cm(ar).wrapping_add(br).wrapping_add(1);
    let mut f = 0;
    if br & SMASK != 0 && ar & SMASK == 0 {
        f = 1;
    }
    if (br & SMASK) == (ar & SMASK) && ad & SMASK != 0 {
        f = 1;
    }
    skip_tail(cpu, ad, f);
    Ok(())
}

/// JUMP family: condition on AC, jump to E
pub fn jump(cpu: &mut Cpu) -> MemResult {
    let ad = cpu.ar;
    let f = (ad & SMASK != 0) as u32;
    jump_tail(cpu, ad, f);
    Ok(())
}

/// SKIP family: condition on the memory operand, optional store to AC
pub fn skip(cpu: &mut Cpu) -> MemResult {
    let ad = cpu.ar;
    let f = (ad & SMASK != 0) as u32;
    skip_tail(cpu, ad, f);
    Ok(())
}

/// AOJ/SOJ: step AC by one either way, then conditionally jump
pub fn aoj_soj(cpu: &mut Cpu) -> MemResult {
    let ad = step_and_flag(cpu);
    let f = (ad & SMASK != 0) as u32;
    jump_tail(cpu, ad, f);
    Ok(())
}

/// AOS/SOS: step the memory operand, then conditionally skip
pub fn aos_sos(cpu: &mut Cpu) -> MemResult {
    let ad = step_and_flag(cpu);
    let f = (ad & SMASK != 0) as u32;
    skip_tail(cpu, ad, f);
    Ok(())
}

/// Add the +1/-1 with full carry and overflow capture
fn step_and_flag(cpu: &mut Cpu) -> u64 {
    let step: u64 = if cpu.ir & 0o20 != 0 { FMASK } else { 1 };
    let mut flag1 = false;
    if ((cpu.ar & CMASK) + (step & CMASK)) & SMASK != 0 {
        if !cpu.pi_cycle {
            cpu.flags |= Flags::CRY1;
        }
        flag1 = true;
    }
    let ad = cpu.ar + step;
    let mut flag3 = false;
    if ad & C1 != 0 {
        if !cpu.pi_cycle {
            cpu.flags |= Flags::CRY0;
        }
        flag3 = true;
    }
    if flag1 != flag3 && !cpu.pi_cycle {
        cpu.flags |= Flags::OVR;
        cpu.set_trap1();
        cpu.check_apr_irq();
    }
    ad
}

/// AOBJP/AOBJN: step both halves, jump on the sign
pub fn aobj(cpu: &mut Cpu) -> MemResult {
    cpu.ar = cpu.aob_w(cpu.ar) & (C1 | FMASK);
    let neg = cpu.ar & SMASK != 0;
    let jump = if cpu.ir & 1 != 0 { neg } else { !neg };
    cpu.ar &= FMASK;
    if jump {
        cpu.its_jump();
        cpu.pc = cpu.ab;
        cpu.f_pc_inh = true;
    }
    Ok(())
}

/// EXCH: swap AC with memory (the staging does the memory side)
pub fn exch(cpu: &mut Cpu) -> MemResult {
    let br = cpu.br;
    cpu.set_reg(cpu.ac, br);
    Ok(())
}

/// BLT: block transfer, interruptible with the pointer written back
/// so the instruction resumes where it stopped
pub fn blt(cpu: &mut Cpu, bus: &mut DeviceBus) -> MemResult {
    use crate::cpu::state::MemErr;

    cpu.br = cpu.ab as u64;
    loop {
        if cpu.interval <= 0 {
            cpu.drain_events(bus);
        }
        if cpu.pi.pending {
            cpu.pi_rq = cpu.check_irq_level();
            if cpu.pi_rq {
                cpu.f_pc_inh = true;
                cpu.f_load_pc = false;
                cpu.f_inst_fetch = false;
                let ar = cpu.ar;
                cpu.set_reg(cpu.ac, ar);
                break;
            }
        }
        cpu.ab = ((cpu.ar >> 18) & RMASK) as u32;
        if cpu.mem_read(false, false, false).is_err() {
            cpu.f_pc_inh = true;
            let ar = cpu.ar;
            cpu.set_reg(cpu.ac, ar);
            return Err(MemErr);
        }
        cpu.ab = (cpu.ar & RMASK) as u32;
        if cpu.mem_write(false, false).is_err() {
            cpu.f_pc_inh = true;
            let ar = cpu.ar;
            cpu.set_reg(cpu.ac, ar);
            return Err(MemErr);
        }
        let ad = (cpu.ar & RMASK) + cm(cpu.br) + 1;
        cpu.ar = cpu.aob_w(cpu.ar) & FMASK;
        if ad & C1 != 0 {
            break;
        }
    }
    Ok(())
}
