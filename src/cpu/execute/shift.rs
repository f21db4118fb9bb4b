//! Shifts and rotates
//!
//! The count is a signed value in the low bits of the effective
//! address; negative counts go right. Arithmetic shifts keep the sign
//! and latch overflow when a discarded bit differs from it. The
//! combined forms treat AC,AC+1 as one 72-bit register with the sign
//! held in AC bit 0 and mirrored into AC+1.

use crate::config::CpuModel;
use crate::cpu::state::{Cpu, MemResult};
use crate::word::{nlzero, CMASK, FMASK, RSIGN, SMASK};

/// Signed shift count from the effective address
#[inline(always)]
fn count(cpu: &Cpu, mask: u32) -> u32 {
    if cpu.ab as u64 & RSIGN != 0 {
        ((0o377 ^ cpu.ab) + 1) & mask
    } else {
        cpu.ab & mask
    }
}

/// Rotate counts negate through the full field width; the KI treats a
/// negative count with a zero low byte as exactly 256
#[inline(always)]
fn rot_count(cpu: &Cpu, mask: u32) -> u32 {
    if cpu.model == CpuModel::Ki10 {
        if cpu.ab as u64 & RSIGN != 0 {
            if cpu.ab & 0o377 != 0 {
                ((0o377 ^ cpu.ab) + 1) & 0o377
            } else {
                0o400
            }
        } else {
            cpu.ab & 0o377
        }
    } else if cpu.ab as u64 & RSIGN != 0 {
        ((mask ^ cpu.ab) + 1) & mask
    } else {
        cpu.ab & mask
    }
}

/// ASH: arithmetic shift with overflow capture
pub fn ash(cpu: &mut Cpu) -> MemResult {
    let sc = count(cpu, 0o377);
    if sc == 0 {
        return Ok(());
    }
    let sign_fill = if cpu.ar & SMASK != 0 { FMASK } else { 0 };
    if cpu.ab as u64 & RSIGN != 0 {
        cpu.ar = if sc < 35 {
            ((cpu.ar >> sc) | sign_fill.wrapping_shl(36 - sc)) & FMASK
        } else {
            sign_fill
        };
    } else {
        if sign_fill.wrapping_shl(sc) & !CMASK != cpu.ar.wrapping_shl(sc) & !CMASK {
            cpu.arith_overflow();
        }
        cpu.ar = (cpu.ar.wrapping_shl(sc) & CMASK) | (cpu.ar & SMASK);
    }
    Ok(())
}

/// ROT: full-word rotate
pub fn rot(cpu: &mut Cpu) -> MemResult {
    let mut sc = rot_count(cpu, 0o377);
    if sc == 0 {
        return Ok(());
    }
    sc %= 36;
    if sc == 0 {
        return Ok(());
    }
    if cpu.ab as u64 & RSIGN != 0 {
        sc = 36 - sc;
    }
    cpu.ar = (cpu.ar.wrapping_shl(sc) | (cpu.ar >> (36 - sc))) & FMASK;
    Ok(())
}

/// LSH: logical shift
pub fn lsh(cpu: &mut Cpu) -> MemResult {
    let sc = count(cpu, 0o777);
    if sc == 0 {
        return Ok(());
    }
    if cpu.ab as u64 & RSIGN != 0 {
        cpu.ar = if sc > 63 { 0 } else { cpu.ar >> sc };
    } else {
        cpu.ar = cpu.ar.wrapping_shl(sc) & FMASK;
    }
    Ok(())
}

/// JFFO: leading-zero count to AC+1, jump when AC is nonzero
pub fn jffo(cpu: &mut Cpu) -> MemResult {
    let mut sc = 0;
    if cpu.ar != 0 {
        cpu.its_jump();
        cpu.pc = cpu.ab;
        cpu.f_pc_inh = true;
        sc = nlzero(cpu.ar);
    }
    cpu.set_reg(cpu.ac + 1, sc as u64);
    Ok(())
}

/// ASHC: 70-bit arithmetic shift of AC,AC+1
pub fn ashc(cpu: &mut Cpu) -> MemResult {
    let mut sc = count(cpu, 0o377);
    if sc == 0 {
        return Ok(());
    }
    if sc > 70 {
        sc = 70;
    }
    let sign_fill = if cpu.ar & SMASK != 0 { FMASK } else { 0 };
    cpu.ar &= CMASK;
    cpu.mq &= CMASK;
    if cpu.ab as u64 & RSIGN != 0 {
        if sc >= 35 {
            cpu.mq = ((cpu.ar >> (sc - 35)) | sign_fill.wrapping_shl(70 - sc)) & FMASK;
            cpu.ar = sign_fill;
        } else {
            cpu.mq = (sign_fill & SMASK)
                | (cpu.mq >> sc)
                | (cpu.ar.wrapping_shl(35 - sc) & CMASK);
            cpu.ar = ((sign_fill & SMASK) | (cpu.ar >> sc) | sign_fill.wrapping_shl(35 - sc))
                & FMASK;
        }
    } else if sc >= 35 {
        if sign_fill.wrapping_shl(sc) & !CMASK != cpu.ar.wrapping_shl(sc) & !CMASK {
            cpu.arith_overflow();
        }
        cpu.ar = (sign_fill & SMASK) | (cpu.ar.wrapping_shl(sc - 35) & CMASK);
        cpu.mq = sign_fill & SMASK;
    } else {
        if ((sign_fill & CMASK).wrapping_shl(sc)) & !CMASK != cpu.ar.wrapping_shl(sc) & !CMASK {
            cpu.arith_overflow();
        }
        cpu.ar = (sign_fill & SMASK) | (cpu.ar.wrapping_shl(sc) & CMASK) | (cpu.mq >> (35 - sc));
        cpu.mq = (sign_fill & SMASK) | (cpu.mq.wrapping_shl(sc) & CMASK);
    }
    Ok(())
}

/// ROTC: 72-bit rotate of AC,AC+1
pub fn rotc(cpu: &mut Cpu) -> MemResult {
    let mut sc = rot_count(cpu, 0o777);
    if sc == 0 {
        return Ok(());
    }
    sc %= 72;
    if sc == 0 {
        return Ok(());
    }
    if cpu.ab as u64 & RSIGN != 0 {
        sc = 72 - sc;
    }
    if sc >= 36 {
        std::mem::swap(&mut cpu.ar, &mut cpu.mq);
        sc -= 36;
    }
    if sc == 0 {
        return Ok(());
    }
    let ad = (cpu.ar.wrapping_shl(sc) | (cpu.mq >> (36 - sc))) & FMASK;
    cpu.mq = (cpu.mq.wrapping_shl(sc) | (cpu.ar >> (36 - sc))) & FMASK;
    cpu.ar = ad;
    Ok(())
}

/// LSHC: 72-bit logical shift of AC,AC+1
pub fn lshc(cpu: &mut Cpu) -> MemResult {
    let mut sc = count(cpu, 0o377);
    if sc == 0 {
        return Ok(());
    }
    if sc > 71 {
        cpu.ar = 0;
        cpu.mq = 0;
        return Ok(());
    }
    if sc > 36 {
        if cpu.ab as u64 & RSIGN != 0 {
            cpu.mq = cpu.ar;
            cpu.ar = 0;
        } else {
            cpu.ar = cpu.mq;
            cpu.mq = 0;
        }
        sc -= 36;
    }
    if sc == 36 {
        // Exactly one word: the simple paths below would shift by 0
        if cpu.ab as u64 & RSIGN != 0 {
            cpu.mq = cpu.ar;
            cpu.ar = 0;
        } else {
            cpu.ar = cpu.mq;
            cpu.mq = 0;
        }
        return Ok(());
    }
    if cpu.ab as u64 & RSIGN != 0 {
        cpu.mq = ((cpu.mq >> sc) | cpu.ar.wrapping_shl(36 - sc)) & FMASK;
        cpu.ar >>= sc;
    } else {
        cpu.ar = (cpu.ar.wrapping_shl(sc) | (cpu.mq >> (36 - sc))) & FMASK;
        cpu.mq = cpu.mq.wrapping_shl(sc) & FMASK;
    }
    Ok(())
}
