//! I/O instruction group (opcodes 700-777)
//!
//! The opcode's low bits and the top AC bit together name a 7-bit
//! device code; the remaining AC bits select the function. BLKI/BLKO
//! step a count,,address pointer and then re-enter as DATAI/DATAO;
//! when the count runs out during an interrupt cycle the pointer-
//! overflow path chains to the vector's second word instead of
//! skipping. CONSZ/CONSO are CONI plus a mask test here, not separate
//! device functions.
//!
//! A user-mode program without user-I/O privileges traps to the
//! monitor instead of touching the bus.

use crate::config::{CpuModel, PagingMode};
use crate::cpu::execute::control;
use crate::cpu::state::{Cpu, Flags, MemResult};
use crate::devices::{DeviceBus, IoFunc};
use crate::word::{C1, FMASK, RMASK};

/// Route a device number, internal devices first
pub fn dispatch_dev(cpu: &mut Cpu, bus: &mut DeviceBus, devnum: u32, func: IoFunc, data: &mut u64) {
    match devnum {
        0o000 => cpu.apr_io(func, data),
        0o004 => cpu.pi_io(func, data),
        0o010 if cpu.model == CpuModel::Ki10 => cpu.pag_io(func, data),
        0o024 if cpu.pag.mode == PagingMode::Bbn => cpu.pag_io(func, data),
        _ => bus.dispatch(cpu, devnum, func, data),
    }
}

/// Whether this I/O instruction is illegal in the current mode
fn user_illegal(cpu: &Cpu) -> bool {
    if cpu.pi_cycle {
        return false;
    }
    match cpu.model {
        CpuModel::Ki10 => {
            (cpu.flags & (Flags::USER | Flags::USERIO) == Flags::USER && cpu.ir & 0o40 == 0)
                || cpu.flags & (Flags::USER | Flags::PUBLIC) == Flags::PUBLIC
        }
        _ => cpu.flags & (Flags::USER | Flags::USERIO) == Flags::USER,
    }
}

pub fn iot(cpu: &mut Cpu, bus: &mut DeviceBus) -> MemResult {
    if user_illegal(cpu) {
        return control::muuo(cpu);
    }
    let devnum = (((cpu.ir & 0o77) << 1) | ((cpu.ac & 0o10) >> 3)) << 2;
    let mut func = cpu.ac & 0o7;
    loop {
        match func {
            // BLKI/BLKO: step the pointer, then do the data transfer
            0 | 2 => {
                cpu.mem_read(cpu.pi_cycle, false, false)?;
                cpu.ar = cpu.mb;
                if let Some(h) = cpu.hist.last_mut() {
                    h.mb = cpu.ar;
                }
                func |= 1;
                cpu.ar = cpu.aob_w(cpu.ar);
                if cpu.ar & C1 != 0 {
                    cpu.pi.ov = true;
                } else if !cpu.pi_cycle {
                    cpu.pc = (cpu.pc + 1) & RMASK as u32;
                }
                cpu.ar &= FMASK;
                cpu.mb = cpu.ar;
                cpu.mem_write(cpu.pi_cycle, false)?;
                cpu.ab = (cpu.ar & RMASK) as u32;
                continue;
            }
            // DATAI: device word to E
            1 => {
                let mut w = 0u64;
                dispatch_dev(cpu, bus, devnum, IoFunc::Datai, &mut w);
                cpu.ar = w;
                cpu.mb = w;
                cpu.mem_write(cpu.pi_cycle, false)?;
            }
            // DATAO: word at E to the device
            3 => {
                cpu.mem_read(cpu.pi_cycle, false, false)?;
                cpu.ar = cpu.mb;
                let mut w = cpu.ar;
                dispatch_dev(cpu, bus, devnum, IoFunc::Datao, &mut w);
            }
            // CONO: E itself to the device's condition register
            4 => {
                let mut w = cpu.ar;
                dispatch_dev(cpu, bus, devnum, IoFunc::Cono, &mut w);
            }
            // CONI: condition register to E
            5 => {
                let mut w = 0u64;
                dispatch_dev(cpu, bus, devnum, IoFunc::Coni, &mut w);
                cpu.ar = w;
                cpu.mb = w;
                cpu.mem_write(cpu.pi_cycle, false)?;
            }
            // CONSZ: skip when the masked conditions are all zero
            6 => {
                let mut w = 0u64;
                dispatch_dev(cpu, bus, devnum, IoFunc::Coni, &mut w);
                cpu.ar = w & cpu.ab as u64;
                if cpu.ar == 0 {
                    cpu.pc = (cpu.pc + 1) & RMASK as u32;
                }
            }
            // CONSO: skip when any masked condition is set
            _ => {
                let mut w = 0u64;
                dispatch_dev(cpu, bus, devnum, IoFunc::Coni, &mut w);
                cpu.ar = w & cpu.ab as u64;
                if cpu.ar != 0 {
                    cpu.pc = (cpu.pc + 1) & RMASK as u32;
                }
            }
        }
        break;
    }
    Ok(())
}
