//! Program control: JRST, JFCL, XCT, MAP and the UUO traps
//!
//! JRST is multi-function by AC-field bits: dismiss the held
//! interrupt, halt, restore flags from the PC word, enter user mode.
//! Unprivileged use of the privileged bits turns the instruction into
//! a monitor UUO.
//!
//! Local UUOs save `opcode,ac,,ea` at 040 of the current context and
//! execute 041; monitor UUOs switch to executive through the model's
//! vector. Opcodes a model lacks come through `unassigned`.

use crate::config::CpuModel;
use crate::cpu::state::{Cpu, Flags, MemResult, StopReason};
use crate::word::{FMASK, RMASK, RSIGN};

/// Privileged-context check for JRST's restore/halt bits
fn jrst_privileged(cpu: &Cpu) -> bool {
    if cpu.flags & (Flags::USER | Flags::USERIO) == Flags::USER {
        return false;
    }
    if cpu.has_traps() && cpu.flags & (Flags::USER | Flags::PUBLIC) == Flags::PUBLIC {
        return false;
    }
    true
}

pub fn jrst(cpu: &mut Cpu) -> MemResult {
    if cpu.uuo_cycle || cpu.pi_cycle {
        cpu.flags -= Flags::USER;
    }
    if cpu.ac & 0o10 != 0 {
        // JEN: dismiss the held interrupt level
        if !jrst_privileged(cpu) {
            return muuo(cpu);
        }
        cpu.pi.restore = true;
    }
    if cpu.ac & 0o4 != 0 {
        // HALT
        if !jrst_privileged(cpu) {
            return muuo(cpu);
        }
        cpu.pending_stop = Some(StopReason::Halt);
    }
    cpu.its_jump();
    cpu.pc = (cpu.ar & RMASK) as u32;
    if cpu.ac & 0o2 != 0 {
        // JRSTF: restore flags from the left of the PC word
        cpu.flags -= Flags::OVR
            | Flags::NODIV
            | Flags::FLTUND
            | Flags::BYTI
            | Flags::FLTOVR
            | Flags::CRY1
            | Flags::CRY0;
        let w = Flags::from_bits_truncate((cpu.ar >> 23) as u32);
        // Executive mode may set USER and user-I/O; anyone may clear
        // user-I/O
        let mut enter = Flags::USER | Flags::USERIO;
        let mut keep = Flags::OVR
            | Flags::NODIV
            | Flags::FLTUND
            | Flags::BYTI
            | Flags::FLTOVR
            | Flags::CRY1
            | Flags::CRY0;
        if cpu.has_traps() {
            enter |= Flags::PUBLIC;
            keep |= Flags::TRP1 | Flags::TRP2 | Flags::PUBLIC;
        }
        let priv_bits = if cpu.has_traps() {
            Flags::PUBLIC | Flags::USER
        } else {
            Flags::USER
        };
        if (cpu.flags & priv_bits).is_empty() {
            cpu.flags |= w & enter;
        }
        if !w.contains(Flags::USERIO) {
            cpu.flags -= Flags::USERIO;
        }
        cpu.flags |= w & keep;
        cpu.check_apr_irq();
    }
    if cpu.ac & 0o1 != 0 {
        if cpu.has_traps() {
            cpu.flags -= Flags::PUBLIC;
        } else {
            cpu.flags |= Flags::USER;
        }
    }
    cpu.f_pc_inh = true;
    Ok(())
}

pub fn jfcl(cpu: &mut Cpu) -> MemResult {
    if (cpu.flags.bits() >> 9) & cpu.ac != 0 {
        cpu.its_jump();
        cpu.pc = (cpu.ar & RMASK) as u32;
        cpu.f_pc_inh = true;
    }
    cpu.flags = Flags::from_bits_truncate(cpu.flags.bits() & (0o17777 ^ (cpu.ac << 9)));
    Ok(())
}

/// XCT: execute the instruction at E. In executive mode the AC field
/// becomes the mapping-context override for the executed instruction;
/// its bit meanings belong to the configured translator.
pub fn xct(cpu: &mut Cpu) -> MemResult {
    cpu.f_load_pc = false;
    cpu.f_pc_inh = true;
    match cpu.model {
        CpuModel::Ki10 => {
            if !cpu.is_user() {
                cpu.xct_flag = cpu.ac;
            }
        }
        _ => {
            if cpu.pag.mode == crate::config::PagingMode::Bbn && !cpu.is_user() {
                cpu.xct_flag = cpu.ac;
            }
        }
    }
    Ok(())
}

/// MAP: return the translation of E (KI only; unassigned elsewhere)
pub fn map(cpu: &mut Cpu) -> MemResult {
    if cpu.model != CpuModel::Ki10 {
        return Ok(());
    }
    let f = cpu.ab >> 9;
    cpu.pag.last_page = (f ^ 0o777) << 1;
    cpu.pag.pag_reload &= 0o37;
    if !cpu.pag.page_enable {
        let ar = 0o020000 + f as u64;
        cpu.set_reg(cpu.ac, ar);
        return Ok(());
    }
    let mut f = f;
    let mut base = cpu.pag.ub_ptr;
    if cpu.is_user() {
        if cpu.pag.small_user && f & 0o340 != 0 {
            cpu.set_reg(cpu.ac, 0o420000);
            return Ok(());
        }
    } else if f & 0o740 == 0o340 {
        f += 0o1000 - 0o340;
        cpu.pag.last_page |= 1;
    } else if f & 0o400 != 0 {
        base = cpu.pag.eb_ptr;
        cpu.pag.last_page |= 1;
    } else {
        let ar = 0o020000 + f as u64;
        cpu.set_reg(cpu.ac, ar);
        cpu.pag.last_page |= 1;
        return Ok(());
    }
    cpu.ab = (base + (f >> 1)) & RMASK as u32;
    cpu.pag.pag_reload = ((cpu.pag.pag_reload + 1) & 0o37) | 0o40;
    cpu.mem_read(false, false, false)?;
    let mut ar = cpu.mb;
    if f & 1 == 0 {
        ar >>= 18;
    }
    ar = if ar & RSIGN == 0 {
        // Not accessible
        0o437777
    } else {
        let mut v = ar & 0o357777;
        if v & 0o100000 == 0 {
            v |= RSIGN;
        }
        v
    };
    cpu.set_reg(cpu.ac, ar);
    Ok(())
}

/// Monitor UUO: trap to the executive through the model's vector
pub fn muuo(cpu: &mut Cpu) -> MemResult {
    if cpu.model != CpuModel::Ki10 {
        // The KA traps MUUOs through the same 040/041 pair, but in an
        // executive cycle
        cpu.uuo_cycle = true;
        return luuo(cpu);
    }
    cpu.mb = ((cpu.ir as u64) << 27) | ((cpu.ac as u64) << 23) | (cpu.ab as u64 & RMASK);
    cpu.ab = cpu.pag.ub_ptr | 0o424;
    let _ = cpu.mem_write_nopage();
    cpu.ab |= 1;
    cpu.mb = cpu.flags_pc_word((cpu.pc + (cpu.trap_flag == 0) as u32) & RMASK as u32);
    let _ = cpu.mem_write_nopage();
    cpu.flags -= Flags::BYTI | Flags::ADRFLT | Flags::TRP1 | Flags::TRP2;
    let mut vec = cpu.pag.ub_ptr | 0o430;
    if cpu.trap_flag != 0 {
        vec |= 1;
    }
    if cpu.flags.contains(Flags::PUBLIC) {
        vec |= 2;
    }
    if cpu.flags.contains(Flags::USER) {
        vec |= 4;
    }
    cpu.ab = vec;
    let _ = cpu.mem_read_nopage();
    cpu.flags = Flags::from_bits_truncate(((cpu.mb >> 23) & 0o17777) as u32);
    // Entering the executive from user space keeps user-I/O visible
    if cpu.flags.contains(Flags::USER) && vec & 4 != 0 {
        cpu.flags |= Flags::USERIO;
        if vec & 2 != 0 {
            cpu.flags |= Flags::OVR;
        }
    }
    cpu.pc = (cpu.mb & RMASK) as u32;
    cpu.trap_flag = 0;
    cpu.f_pc_inh = true;
    Ok(())
}

/// Local UUO: save the op word at 040 of the current context and
/// continue at 041
pub fn luuo(cpu: &mut Cpu) -> MemResult {
    cpu.mb = ((cpu.ir as u64) << 27) | ((cpu.ac as u64) << 23) | (cpu.ab as u64 & RMASK);
    if cpu.model == CpuModel::Ki10 && !cpu.is_user() {
        cpu.ab = cpu.pag.eb_ptr + 0o40;
        let _ = cpu.mem_write_nopage();
        cpu.uuo_cycle = true;
        cpu.nopage_fetch = Some(cpu.pag.eb_ptr + 0o41);
        cpu.f_load_pc = false;
        cpu.f_pc_inh = true;
        return Ok(());
    }
    cpu.ab = 0o40;
    let uuo = cpu.uuo_cycle;
    let _ = cpu.mem_write(uuo, true);
    cpu.ab += 1;
    cpu.f_load_pc = false;
    cpu.f_pc_inh = true;
    Ok(())
}

/// Opcodes outside the model's instruction set. The KI treats them as
/// monitor UUOs; the KA traps through 060/061.
pub fn unassigned(cpu: &mut Cpu) -> MemResult {
    if cpu.model == CpuModel::Ki10 {
        return muuo(cpu);
    }
    cpu.mb = ((cpu.ir as u64) << 27) | ((cpu.ac as u64) << 23) | (cpu.ab as u64 & RMASK);
    cpu.ab = 0o60;
    cpu.uuo_cycle = true;
    let _ = cpu.mem_write(true, false);
    cpu.ab += 1;
    cpu.f_load_pc = false;
    Ok(())
}

/// ITS monitor opcodes 0100-0103: LPM pager load/store and XCTR
pub fn its_0100(cpu: &mut Cpu) -> MemResult {
    match cpu.ir {
        // LPM: load or store the pager state block
        0o102 if !cpu.is_user() => {
            if cpu.ac & 1 != 0 {
                its_store_pager(cpu)?;
            } else {
                its_load_pager(cpu)?;
            }
            if cpu.ac & 2 != 0 {
                cpu.pag.clear_tlbs();
            }
            if cpu.ac & 4 != 0 {
                cpu.apr.mem_prot = true;
                let lvl = cpu.apr.apr_irq;
                cpu.set_interrupt(0, lvl);
            }
            Ok(())
        }
        // XCTR: execute with a mapping override from AC
        0o103 => {
            cpu.f_load_pc = false;
            cpu.f_pc_inh = true;
            if !cpu.is_user() {
                cpu.xct_flag = cpu.ac;
            }
            Ok(())
        }
        _ => unassigned(cpu),
    }
}

fn its_store_pager(cpu: &mut Cpu) -> MemResult {
    if cpu.ab as usize + 8 > cpu.mem.size() {
        cpu.pag.fault_data |= 0o400;
        cpu.apr.mem_prot = true;
        return Ok(());
    }
    let mut ab = cpu.ab as usize;
    let words = [
        ((cpu.pag.age as u64) << 27)
            | ((cpu.pag.fault_addr as u64 & 0o777) << 18)
            | cpu.pag.jpc as u64,
        cpu.pag.opc,
        (cpu.pag.mar as u64) | ((cpu.pag.pag_reload as u64) << 20),
        (cpu.pag.fault_data) << 18,
        ((cpu.pag.fault_addr as u64 & 0o760000) << 12) | cpu.pag.dbr1 as u64,
        ((cpu.pag.fault_addr as u64 & 0o017000) << 8) | cpu.pag.dbr2 as u64,
        cpu.pag.dbr3 as u64,
        cpu.pag.ac_stack as u64,
    ];
    for w in words {
        cpu.mem.write(ab, w & FMASK);
        ab = (ab + 1) & RMASK as usize;
    }
    Ok(())
}

fn its_load_pager(cpu: &mut Cpu) -> MemResult {
    if cpu.ab as usize + 8 > cpu.mem.size() {
        cpu.pag.fault_data |= 0o400;
        cpu.apr.mem_prot = true;
        return Ok(());
    }
    let base = cpu.ab as usize;
    let rd = |cpu: &Cpu, i: usize| cpu.mem.read((base + i) & RMASK as usize).unwrap_or(0);
    cpu.pag.age = ((rd(cpu, 0) >> 27) & 0o17) as u32;
    cpu.pag.fault_addr = 0;
    cpu.pag.mar = (rd(cpu, 2) & 0o3777777) as u32;
    cpu.pag.pag_reload = 0;
    cpu.pag.fault_data = (rd(cpu, 3) >> 18) & RMASK;
    cpu.pag.dbr1 = (rd(cpu, 4) & ((0o77 << 18) | RMASK)) as u32;
    cpu.pag.dbr2 = (rd(cpu, 5) & ((0o77 << 18) | RMASK)) as u32;
    cpu.pag.dbr3 = (rd(cpu, 6) & ((0o77 << 18) | RMASK)) as u32;
    cpu.pag.ac_stack = (rd(cpu, 7) & RMASK) as u32;
    cpu.pag.page_enable = true;
    Ok(())
}

/// BBN monitor opcodes 0100-0104: the UMOVE family and JSYS
pub fn bbn_0100(cpu: &mut Cpu) -> MemResult {
    match cpu.ir {
        // UMOVE: fetch through the user map
        0o100 => {
            cpu.mem_read(false, false, false)?;
            cpu.ar = cpu.mb;
            let ar = cpu.ar;
            cpu.set_reg(cpu.ac, ar);
            cpu.ir = 0;
            Ok(())
        }
        // UMOVEI
        0o101 => {
            let ar = cpu.ar;
            cpu.set_reg(cpu.ac, ar);
            cpu.ir = 0;
            Ok(())
        }
        // UMOVEM: store through the user map
        0o102 => {
            cpu.ar = cpu.get_reg(cpu.ac);
            cpu.mb = cpu.ar;
            cpu.mem_write(false, false)?;
            cpu.ir = 0;
            Ok(())
        }
        // UMOVES
        0o103 => {
            cpu.mem_read(false, false, false)?;
            cpu.modify = true;
            cpu.ar = cpu.mb;
            cpu.mem_write(false, false)?;
            if cpu.ac != 0 {
                let ar = cpu.ar;
                cpu.set_reg(cpu.ac, ar);
            }
            cpu.ir = 0;
            Ok(())
        }
        // JSYS: monitor call through the transfer vector
        0o104 => {
            cpu.br = ((cpu.flags.bits() as u64) << 23)
                | ((cpu.pc as u64 + !cpu.pi_cycle as u64) & RMASK);
            if cpu.ab < 0o1000 {
                cpu.ab += 0o1000;
                if !cpu.is_user() {
                    cpu.flags |= Flags::EXJSYS;
                }
                cpu.flags -= Flags::USER;
            }
            if cpu.mem_read(false, false, false).is_err() {
                cpu.flags = Flags::from_bits_truncate((cpu.br >> 23) as u32);
                return Err(crate::cpu::state::MemErr);
            }
            cpu.ar = cpu.mb;
            cpu.ab = ((cpu.ar >> 18) & RMASK) as u32;
            cpu.mb = cpu.br;
            if cpu.mem_write(false, false).is_err() {
                cpu.flags = Flags::from_bits_truncate((cpu.br >> 23) as u32);
                return Err(crate::cpu::state::MemErr);
            }
            cpu.pc = (cpu.ar & RMASK) as u32;
            cpu.f_pc_inh = true;
            Ok(())
        }
        _ => unassigned(cpu),
    }
}
