//! Single-precision floating point
//!
//! Format: sign, 8-bit excess-128 exponent, 27-bit mantissa; negative
//! numbers are the two's complement of the whole word. The add/
//! subtract/multiply/divide family works in a widened frame (mantissas
//! shifted up 27 bits), normalizes until the leading mantissa bit is
//! set, rounds when the opcode's R bit asks for it, and latches
//! overflow/underflow from the final exponent.
//!
//! UFA shares the add path but skips normalization and leaves its
//! result in AC+1; FSC rescales in place; DFN negates a software
//! double in memory and AC.

use crate::cpu::state::{Cpu, Flags, MemResult};
use crate::word::{
    cm, get_expo, smear_sign, BIT8, BIT9, FMASK, FPCMASK, FPFMASK, FPNMASK, FPSMASK, MMASK,
    RSIGN, SMASK,
};

/// Normalize, round and pack the widened frame in AR into a result in
/// AR (and MQ for the long forms); shared by add, subtract, multiply
/// and the conversions
pub(crate) fn fnorm(cpu: &mut Cpu, mut flag1: bool, mut sc: i32) -> MemResult {
    let mut fxu_hold_set = false;
    let mut nrf = false;
    if cpu.ar != 0 {
        loop {
            if cpu.ar & FPNMASK != 0 {
                sc += 1;
                cpu.ar >>= 1;
            }
            if ((sc & 0o400) != 0) ^ ((sc & 0o200) != 0) {
                fxu_hold_set = true;
            }
            if cpu.ir != 0o130 {
                // Shift the leading one up to the top mantissa bit
                if cpu.ar & 0o777_777_777_000_000_000 == 0 {
                    sc -= 27;
                    cpu.ar = cpu.ar.wrapping_shl(27);
                }
                if cpu.ar & 0o777_760_000_000_000_000 == 0 {
                    sc -= 14;
                    cpu.ar = cpu.ar.wrapping_shl(14);
                }
                if cpu.ar & 0o777_000_000_000_000_000 == 0 {
                    sc -= 9;
                    cpu.ar = cpu.ar.wrapping_shl(9);
                }
                if cpu.ar & 0o770_000_000_000_000_000 == 0 {
                    sc -= 6;
                    cpu.ar = cpu.ar.wrapping_shl(6);
                }
                if cpu.ar & 0o740_000_000_000_000_000 == 0 {
                    sc -= 4;
                    cpu.ar = cpu.ar.wrapping_shl(4);
                }
                if cpu.ar & 0o600_000_000_000_000_000 == 0 {
                    sc -= 2;
                    cpu.ar = cpu.ar.wrapping_shl(2);
                }
                if cpu.ar & 0o400_000_000_000_000_000 == 0 {
                    sc -= 1;
                    cpu.ar = cpu.ar.wrapping_shl(1);
                }
                if !nrf && !flag1 && cpu.ir & 0o4 != 0 && cpu.ar & BIT9 != 0 {
                    cpu.ar += BIT8;
                    nrf = true;
                    continue;
                }
            }
            break;
        }
        if flag1 {
            cpu.ar = (cpu.ar ^ FPCMASK).wrapping_add(1);
        }
        cpu.mq = cpu.ar & MMASK;
        cpu.ar >>= 27;
        if flag1 {
            cpu.ar |= SMASK;
            cpu.mq |= SMASK;
        }
    } else if flag1 {
        cpu.ar = BIT9 | SMASK;
        cpu.mq = SMASK;
        sc += 1;
    } else {
        cpu.ar = 0;
        cpu.mq = 0;
        sc = 0;
    }
    if sc & 0o400 != 0 && !cpu.pi_cycle {
        cpu.flags |= Flags::OVR | Flags::FLTOVR;
        cpu.set_trap1();
        if !fxu_hold_set {
            cpu.flags |= Flags::FLTUND;
        }
        cpu.check_apr_irq();
    }
    let scad = sc ^ if cpu.ar & SMASK != 0 { 0o377 } else { 0 };
    cpu.ar &= SMASK | MMASK;
    cpu.ar |= ((scad & 0o377) as u64) << 27;

    // Long forms pack the residue as the low word. The exponent byte
    // goes in uncomplemented whatever the low word's sign; the scale
    // count is 9 bits and carries no sign of its own.
    if cpu.ir & 0o7 == 1 {
        sc = (sc + (0o777 ^ 26)) & 0o777;
        if cpu.mq != 0 {
            cpu.mq &= MMASK;
            cpu.mq |= ((sc & 0o377) as u64) << 27;
        }
    }

    if cpu.ir == 0o130 {
        // UFA leaves the unnormalized sum in AC+1
        let ar = cpu.ar;
        cpu.set_reg(cpu.ac + 1, ar);
    }
    Ok(())
}

/// FAD family and UFA: align, add, normalize
pub fn fad(cpu: &mut Cpu) -> MemResult {
    fad_core(cpu)
}

/// FSB family: negate the memory operand and add
pub fn fsb(cpu: &mut Cpu) -> MemResult {
    let ad = (cm(cpu.ar) + 1) & FMASK;
    cpu.ar = cpu.br;
    cpu.br = ad;
    fad_core(cpu)
}

fn fad_core(cpu: &mut Cpu) -> MemResult {
    let mut sc = ((cpu.br >> 27) & 0o777) as i32;
    let mut scad = if (cpu.br & SMASK) == (cpu.ar & SMASK) {
        sc + ((((cpu.ar >> 27) & 0o777) as i32) ^ 0o777) + 1
    } else {
        sc + (((cpu.ar >> 27) & 0o777) as i32)
    };
    scad &= 0o777;
    if ((cpu.br & SMASK) != 0) == ((scad & 0o400) != 0) {
        std::mem::swap(&mut cpu.ar, &mut cpu.br);
    }
    if scad & 0o400 == 0 {
        if (cpu.ar & SMASK) == (cpu.br & SMASK) {
            scad = ((scad ^ 0o777) + 1) & 0o777;
        } else {
            scad ^= 0o777;
        }
    } else if (cpu.ar & SMASK) != (cpu.br & SMASK) {
        scad = (scad + 1) & 0o777;
    }

    sc = get_expo(cpu.ar);
    cpu.br = smear_sign(cpu.br);
    cpu.ar = smear_sign(cpu.ar);
    cpu.ar <<= 27;
    cpu.br <<= 27;
    if scad & 0o400 != 0 {
        scad = 0o1000 - scad;
        if scad < 28 {
            let fill = if cpu.br & (SMASK << 27) != 0 {
                (FMASK << 27) | MMASK
            } else {
                0
            };
            cpu.br = (cpu.br >> scad) | fill.wrapping_shl((54 - scad) as u32);
        } else {
            cpu.br = 0;
        }
    }
    // Sum in the 60-bit frame; an exact cancellation must come out a
    // true zero so the normalizer can clear the exponent
    cpu.ar = cpu.ar.wrapping_add(cpu.br) & FPFMASK;

    let flag1 = if cpu.ar & FPSMASK != 0 {
        cpu.ar = (cpu.ar ^ FPFMASK).wrapping_add(1);
        true
    } else {
        false
    };
    fnorm(cpu, flag1, sc)
}

/// FMP family: add exponents, multiply magnitudes, normalize
pub fn fmp(cpu: &mut Cpu) -> MemResult {
    let mut sc = ((if cpu.br & SMASK != 0 { 0o777 } else { 0 }) ^ ((cpu.br >> 27) as i32)) & 0o777;
    sc += ((if cpu.ar & SMASK != 0 { 0o777 } else { 0 }) ^ ((cpu.ar >> 27) as i32)) & 0o777;
    sc += 0o600;
    sc &= 0o777;
    let mut flag1 = false;
    if cpu.ar & SMASK != 0 {
        cpu.ar = cm(cpu.ar) + 1;
        flag1 = true;
    }
    if cpu.br & SMASK != 0 {
        cpu.br = cm(cpu.br) + 1;
        flag1 = !flag1;
    }
    cpu.ar &= MMASK;
    cpu.br &= MMASK;
    cpu.ar *= cpu.br;
    fnorm(cpu, flag1, sc)
}

/// FDV family (except the long form): divide with the quotient checked
/// for representability first
pub fn fdv(cpu: &mut Cpu) -> MemResult {
    if cpu.ir == 0o171 {
        return fdvl(cpu);
    }
    let mut flag1 = false;
    let mut sc = ((if cpu.br & SMASK != 0 { 0o777 } else { 0 }) ^ ((cpu.br >> 27) as i32)) & 0o777;
    sc += ((if cpu.ar & SMASK != 0 { 0 } else { 0o777 }) ^ ((cpu.ar >> 27) as i32)) & 0o777;
    sc = (sc + 0o201) & 0o777;
    if cpu.br & SMASK != 0 {
        cpu.br = cm(cpu.br) + 1;
        flag1 = true;
    }
    if cpu.ar & SMASK != 0 {
        cpu.ar = cm(cpu.ar) + 1;
        flag1 = !flag1;
    }
    cpu.ar &= MMASK;
    cpu.br &= MMASK;
    if cpu.br >= cpu.ar << 1 {
        if !cpu.pi_cycle {
            cpu.flags |= Flags::OVR | Flags::NODIV | Flags::FLTOVR;
            cpu.set_trap1();
        }
        cpu.check_apr_irq();
        cpu.sac_inh = true;
        return Ok(());
    }
    cpu.br = (cpu.br << 27) + cpu.mq;
    cpu.mb = cpu.ar;
    cpu.ar = cpu.br / cpu.ar;
    let mut fxu_hold_set = false;
    if cpu.ar != 0 {
        if cpu.ir & 0o4 != 0 {
            cpu.ar += 1;
        }
        if cpu.ar & BIT8 != 0 {
            sc += 1;
            cpu.ar >>= 1;
        }
        if sc >= 0o600 {
            fxu_hold_set = true;
        }
        if flag1 {
            cpu.ar = ((cpu.ar ^ MMASK) + 1) | SMASK;
        }
    } else if flag1 {
        cpu.ar = SMASK | BIT9;
        sc += 1;
    } else {
        cpu.ar = 0;
        sc = 0;
    }
    if sc & 0o400 != 0 && !cpu.pi_cycle {
        cpu.flags |= Flags::OVR | Flags::FLTOVR;
        cpu.set_trap1();
        if !fxu_hold_set {
            cpu.flags |= Flags::FLTUND;
        }
        cpu.check_apr_irq();
    }
    let scad = sc ^ if cpu.ar & SMASK != 0 { 0o377 } else { 0 };
    cpu.ar &= SMASK | MMASK;
    cpu.ar |= ((scad & 0o377) as u64) << 27;
    Ok(())
}

/// FDVL: double-length dividend in AC,AC+1, remainder to AC+1
fn fdvl(cpu: &mut Cpu) -> MemResult {
    let mut flag1 = false;
    let mut sc = ((if cpu.br & SMASK != 0 { 0o777 } else { 0 }) ^ ((cpu.br >> 27) as i32)) & 0o777;
    sc += ((if cpu.ar & SMASK != 0 { 0 } else { 0o777 }) ^ ((cpu.ar >> 27) as i32)) & 0o777;
    sc = (sc + 0o201) & 0o777;
    let mut fe = (((if cpu.br & SMASK != 0 { 0o777 } else { 0 }) ^ ((cpu.br >> 27) as i32))
        & 0o777)
        - 26;
    if cpu.br & SMASK != 0 {
        cpu.mq = (cm(cpu.mq) + 1) & MMASK;
        cpu.br = cm(cpu.br);
        if cpu.mq == 0 {
            cpu.br += 1;
        }
        flag1 = true;
    }
    cpu.mq &= MMASK;
    if cpu.ar & SMASK != 0 {
        cpu.ar = cm(cpu.ar) + 1;
        flag1 = !flag1;
    }
    cpu.ar &= MMASK;
    cpu.br &= MMASK;
    if cpu.br >= cpu.ar << 1 {
        if !cpu.pi_cycle {
            cpu.flags |= Flags::OVR | Flags::NODIV | Flags::FLTOVR;
            cpu.set_trap1();
        }
        cpu.check_apr_irq();
        cpu.sac_inh = true;
        return Ok(());
    }
    cpu.br = (cpu.br << 27) + cpu.mq;
    cpu.mb = cpu.ar;
    cpu.ar <<= 27;
    let mut ad: u64 = 0;
    if cpu.br < cpu.ar {
        cpu.br <<= 1;
        sc -= 1;
    }
    for _ in 0..27 {
        ad <<= 1;
        if cpu.br >= cpu.ar {
            cpu.br -= cpu.ar;
            ad |= 1;
        }
        cpu.br <<= 1;
    }
    cpu.mq = cpu.br >> 28;
    cpu.ar = ad;
    sc += 1;
    let mut fxu_hold_set = false;
    if cpu.ar != 0 {
        if cpu.ar & BIT8 != 0 {
            sc += 1;
            cpu.ar >>= 1;
        }
        if sc >= 0o600 {
            fxu_hold_set = true;
        }
        if flag1 {
            cpu.ar = ((cpu.ar ^ MMASK) + 1) | SMASK;
        }
    } else if flag1 {
        cpu.ar = SMASK | BIT9;
        sc += 1;
    } else {
        cpu.ar = 0;
        sc = 0;
    }
    if sc & 0o400 != 0 && !cpu.pi_cycle {
        cpu.flags |= Flags::OVR | Flags::FLTOVR;
        cpu.set_trap1();
        if !fxu_hold_set {
            cpu.flags |= Flags::FLTUND;
        }
        cpu.check_apr_irq();
    }
    let scad = sc ^ if cpu.ar & SMASK != 0 { 0o377 } else { 0 };
    cpu.ar &= SMASK | MMASK;
    cpu.ar |= ((scad & 0o377) as u64) << 27;

    if cpu.mq != 0 {
        cpu.mq &= MMASK;
        if sc & 0o400 != 0 {
            fe -= 1;
        }
        fe ^= if cpu.ar & SMASK != 0 { 0o377 } else { 0 };
        cpu.mq |= ((fe & 0o377) as u64) << 27;
    }
    Ok(())
}

/// FSC: scale the exponent by the signed effective address
pub fn fsc(cpu: &mut Cpu) -> MemResult {
    let count = if cpu.ab as u64 & RSIGN != 0 {
        0o400 | (cpu.ab as i32 & 0o377)
    } else {
        cpu.ab as i32 & 0o377
    };
    let mut sc = (get_expo(cpu.ar) + count) & 0o777;
    let flag1 = cpu.ar & SMASK != 0;
    if flag1 {
        cpu.ar = cm(cpu.ar) + 1;
    }
    cpu.ar &= MMASK;
    if cpu.ar != 0 {
        if cpu.ar & 0o000_777_770_000 == 0 {
            sc -= 12;
            cpu.ar <<= 12;
        }
        if cpu.ar & 0o000_777_000_000 == 0 {
            sc -= 6;
            cpu.ar <<= 6;
        }
        if cpu.ar & 0o000_740_000_000 == 0 {
            sc -= 4;
            cpu.ar <<= 4;
        }
        if cpu.ar & 0o000_600_000_000 == 0 {
            sc -= 2;
            cpu.ar <<= 2;
        }
        if cpu.ar & 0o000_400_000_000 == 0 {
            sc -= 1;
            cpu.ar <<= 1;
        }
    } else if flag1 {
        cpu.ar = BIT9;
        sc += 1;
    }
    let fxu_hold_set = ((sc & 0o400) != 0) ^ ((sc & 0o200) != 0);
    if sc & 0o400 != 0 && !cpu.pi_cycle {
        cpu.flags |= Flags::OVR | Flags::FLTOVR;
        cpu.set_trap1();
        if !fxu_hold_set {
            cpu.flags |= Flags::FLTUND;
        }
        cpu.check_apr_irq();
    }
    if flag1 {
        cpu.ar = SMASK | ((cm(cpu.ar) + 1) & MMASK);
        sc ^= 0o377;
    } else if cpu.ar == 0 {
        sc = 0;
    }
    cpu.ar |= ((sc & 0o377) as u64) << 27;
    Ok(())
}

/// DFN: negate a software double precision number (high in AC, low in
/// memory); the low word goes back to memory, the high to AC
pub fn dfn(cpu: &mut Cpu) -> MemResult {
    let mut ad = (cm(cpu.br) + 1) & FMASK;
    let sc = (cpu.br >> 27) & 0o777;
    cpu.br = cpu.ar;
    cpu.ar = ad;
    ad = (cm(cpu.br) + (((cpu.ar & MMASK) == 0) as u64)) & FMASK;
    cpu.ar &= MMASK;
    cpu.ar |= (sc & 0o777) << 27;
    cpu.br = cpu.ar;
    cpu.ar = ad;
    cpu.mb = cpu.br;
    cpu.mem_write(false, false)?;
    Ok(())
}
