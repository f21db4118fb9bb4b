//! Fixed-point arithmetic
//!
//! Two's-complement add, subtract, multiply and divide with the exact
//! carry and overflow capture the hardware latched: carry-0 and
//! carry-1 are observed separately and overflow is their disagreement.
//! Divide leaves the remainder with the dividend's sign and the
//! quotient with the XOR of the operand signs; an unrepresentable
//! quotient sets no-divide and stores nothing.

use crate::config::CpuModel;
use crate::cpu::state::{Cpu, Flags, MemResult};
use crate::word::{cm, is_neg, negate, C1, CMASK, FMASK, SMASK};

impl Cpu {
    /// Latch overflow (and the KI trap) outside interrupt cycles
    pub(crate) fn arith_overflow(&mut self) {
        if !self.pi_cycle {
            self.flags |= Flags::OVR;
            self.set_trap1();
        }
        self.check_apr_irq();
    }
}

/// MOVN and MOVM: negate (magnitude skips positive operands)
pub fn movn_movm(cpu: &mut Cpu) -> MemResult {
    if cpu.ir & 0o14 == 0o14 && !is_neg(cpu.ar) {
        // MOVM of a positive value is a plain move
        return Ok(());
    }
    let flag1 = (((cpu.ar & CMASK) ^ CMASK) + 1) & SMASK != 0;
    if flag1 {
        cpu.flags |= Flags::CRY1;
    }
    let ad = cm(cpu.ar) + 1;
    let flag3 = ad & C1 != 0;
    if flag3 {
        cpu.flags |= Flags::CRY0;
    }
    if flag1 != flag3 {
        cpu.arith_overflow();
    }
    if cpu.has_traps() && cpu.ar == SMASK {
        cpu.set_trap1();
    }
    cpu.ar = ad & FMASK;
    Ok(())
}

/// ADD: full-word add with carry capture
pub fn add(cpu: &mut Cpu) -> MemResult {
    let mut flag1 = false;
    if ((cpu.ar & CMASK) + (cpu.br & CMASK)) & SMASK != 0 {
        cpu.flags |= Flags::CRY1;
        flag1 = true;
    }
    cpu.ar += cpu.br;
    let mut flag3 = false;
    if cpu.ar & C1 != 0 {
        if !cpu.pi_cycle {
            cpu.flags |= Flags::CRY0;
        }
        flag3 = true;
    }
    if flag1 != flag3 {
        cpu.arith_overflow();
    }
    Ok(())
}

/// SUB: AR := BR - AR
pub fn sub(cpu: &mut Cpu) -> MemResult {
    let mut flag1 = false;
    if (((cpu.ar & CMASK) ^ CMASK) + (cpu.br & CMASK) + 1) & SMASK != 0 {
        cpu.flags |= Flags::CRY1;
        flag1 = true;
    }
    cpu.ar = cm(cpu.ar) + cpu.br + 1;
    let mut flag3 = false;
    if cpu.ar & C1 != 0 {
        if !cpu.pi_cycle {
            cpu.flags |= Flags::CRY0;
        }
        flag3 = true;
    }
    if flag1 != flag3 {
        cpu.arith_overflow();
    }
    Ok(())
}

/// IMUL and MUL: magnitude multiply, then sign correction. The full
/// 70-bit product splits as 35 bits in MQ below 35 in AR.
pub fn imul_mul(cpu: &mut Cpu) -> MemResult {
    let mut flag3 = false;
    if is_neg(cpu.ar) {
        cpu.ar = negate(cpu.ar);
        flag3 = true;
    }
    if is_neg(cpu.br) {
        cpu.br = negate(cpu.br);
        flag3 = !flag3;
    }
    if cpu.ar == 0 || cpu.br == 0 {
        cpu.ar = 0;
        cpu.mq = 0;
        return Ok(());
    }
    // -2^35 is its own negation; put the sign back
    if cpu.model != CpuModel::Ki10 && cpu.br == SMASK {
        flag3 = !flag3;
    }
    let p = (cpu.ar as u128) * (cpu.br as u128);
    cpu.ar = (p >> 35) as u64;
    cpu.mq = p as u64 & CMASK;
    if cpu.ir & 0o4 == 0 {
        // IMUL: product must fit a single word
        if cpu.ar > flag3 as u64 && !cpu.pi_cycle {
            cpu.arith_overflow();
        }
        if flag3 {
            cpu.mq ^= CMASK;
            cpu.mq += 1;
            cpu.mq |= SMASK;
        }
        cpu.ar = cpu.mq;
        return Ok(());
    }
    if cpu.ar & SMASK != 0 && !cpu.pi_cycle {
        cpu.arith_overflow();
    }
    if flag3 {
        cpu.ar ^= FMASK;
        cpu.mq ^= CMASK;
        cpu.mq += 1;
        if cpu.mq & SMASK != 0 {
            cpu.ar += 1;
            cpu.mq &= CMASK;
        }
    }
    cpu.ar &= FMASK;
    cpu.mq = (cpu.mq & !SMASK) | (cpu.ar & SMASK);
    Ok(())
}

/// IDIV: single-length divide
pub fn idiv(cpu: &mut Cpu) -> MemResult {
    let mut flag1 = false;
    let mut flag3 = false;
    if is_neg(cpu.br) {
        cpu.br = negate(cpu.br);
        flag1 = !flag1;
    }
    if cpu.br == 0 {
        cpu.flags |= Flags::OVR | Flags::NODIV;
        cpu.sac_inh = true;
        cpu.check_apr_irq();
        return Ok(());
    }
    if is_neg(cpu.ar) {
        cpu.ar = negate(cpu.ar);
        flag1 = !flag1;
        flag3 = true;
    }
    cpu.mq = cpu.ar % cpu.br;
    cpu.ar /= cpu.br;
    if flag1 {
        cpu.ar = negate(cpu.ar);
    }
    if flag3 {
        cpu.mq = negate(cpu.mq);
    }
    Ok(())
}

/// DIV: 72-bit dividend in AC,AC+1. The restoring-division loop runs
/// on the working registers exactly as the hardware sequenced it.
pub fn div(cpu: &mut Cpu) -> MemResult {
    let mut flag1 = false;
    if is_neg(cpu.ar) {
        // Negate the double-length dividend in place
        let mut ad = negate(cpu.mq);
        cpu.mq = cpu.ar;
        cpu.ar = ad;
        ad = cm(cpu.mq);
        cpu.mq = cpu.ar;
        cpu.ar = ad;
        if cpu.mq & CMASK == 0 {
            cpu.ar = (cpu.ar + 1) & FMASK;
        }
        flag1 = true;
    }

    let mut ad = if is_neg(cpu.br) {
        (cpu.ar + cpu.br) & FMASK
    } else {
        (cpu.ar + cm(cpu.br) + 1) & FMASK
    };
    cpu.mq = (cpu.mq << 1) & FMASK;
    cpu.mq |= (ad & SMASK != 0) as u64;
    if ad & SMASK == 0 {
        // Divisor no larger than the high half: quotient will not fit
        cpu.flags |= Flags::OVR | Flags::NODIV;
        cpu.sac_inh = true;
        cpu.check_apr_irq();
        return Ok(());
    }

    for _ in 0..35 {
        ad = if (cpu.br & SMASK != 0) != (cpu.mq & 1 != 0) {
            cpu.ar + cm(cpu.br) + 1
        } else {
            cpu.ar + cpu.br
        };
        cpu.ar = ((ad << 1) | ((cpu.mq & SMASK != 0) as u64)) & FMASK;
        cpu.mq = (cpu.mq << 1) & FMASK;
        cpu.mq |= (ad & SMASK == 0) as u64;
    }
    ad = if (cpu.br & SMASK != 0) != (cpu.mq & 1 != 0) {
        cpu.ar + cm(cpu.br) + 1
    } else {
        cpu.ar + cpu.br
    };
    cpu.ar = ad & FMASK;
    cpu.mq = (cpu.mq << 1) & FMASK;
    cpu.mq |= (ad & SMASK == 0) as u64;
    if is_neg(cpu.ar) {
        cpu.ar = if is_neg(cpu.br) {
            (cpu.ar + cm(cpu.br) + 1) & FMASK
        } else {
            (cpu.ar + cpu.br) & FMASK
        };
    }

    if flag1 {
        cpu.ar = negate(cpu.ar);
    }
    if flag1 != is_neg(cpu.br) {
        let ad = negate(cpu.mq);
        cpu.mq = cpu.ar;
        cpu.ar = ad;
    } else {
        let ad = cpu.mq;
        cpu.mq = cpu.ar;
        cpu.ar = ad;
    }
    Ok(())
}
