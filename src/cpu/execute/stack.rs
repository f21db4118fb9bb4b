//! Stack operations and subroutine linkage
//!
//! Stack pointers are packed words: count in the left half, address in
//! the right. Pushing adds `1,,1`; a carry out of the left half latches
//! the stack-overflow trap (the KA raises the pushdown-overflow APR
//! condition instead). JSR/JSP/JSA/JRA save the return linkage in
//! their four historical shapes.

use crate::cpu::state::{Cpu, Flags, MemResult};
use crate::word::{C1, RMASK};

/// PUSHJ: push the PC word, jump to E
pub fn pushj(cpu: &mut Cpu) -> MemResult {
    cpu.mb = cpu.flags_pc_word((cpu.pc + !cpu.pi_cycle as u32) & RMASK as u32);
    cpu.br = cpu.ab as u64;
    cpu.ar = cpu.aob_w(cpu.ar);
    cpu.ab = (cpu.ar & RMASK) as u32;
    cpu.mem_write(cpu.uuo_cycle || cpu.pi_cycle, false)?;
    cpu.clear_save_flags();
    if cpu.ar & C1 != 0 {
        cpu.set_trap2();
    }
    if cpu.uuo_cycle || cpu.pi_cycle {
        cpu.flags -= Flags::USER | Flags::PUBLIC;
    }
    cpu.its_jump();
    cpu.pc = (cpu.br & RMASK) as u32;
    cpu.f_pc_inh = true;
    Ok(())
}

/// PUSH: step the pointer and store the operand above it
pub fn push(cpu: &mut Cpu) -> MemResult {
    cpu.ar = cpu.aob_w(cpu.ar);
    cpu.ab = (cpu.ar & RMASK) as u32;
    if cpu.ar & C1 != 0 {
        cpu.set_trap2();
    }
    cpu.mb = cpu.br;
    cpu.mem_write(false, false)
}

/// POP: move the top of stack to E, then retreat the pointer
pub fn pop(cpu: &mut Cpu) -> MemResult {
    cpu.ab = (cpu.ar & RMASK) as u32;
    cpu.mem_read(false, false, false)?;
    cpu.ar = cpu.sob_w(cpu.ar);
    cpu.ab = (cpu.br & RMASK) as u32;
    cpu.mem_write(false, false)?;
    if cpu.ar & C1 == 0 {
        cpu.set_trap2();
    }
    Ok(())
}

/// POPJ: return through the top of stack
pub fn popj(cpu: &mut Cpu) -> MemResult {
    cpu.ab = (cpu.ar & RMASK) as u32;
    cpu.mem_read(false, false, false)?;
    cpu.its_jump();
    cpu.pc = (cpu.mb & RMASK) as u32;
    cpu.ar = cpu.sob_w(cpu.ar);
    if cpu.ar & C1 == 0 {
        cpu.set_trap2();
    }
    cpu.f_pc_inh = true;
    Ok(())
}

/// JSR: store the PC word at E, continue at E+1
pub fn jsr(cpu: &mut Cpu) -> MemResult {
    cpu.mb = cpu.flags_pc_word((cpu.pc + !cpu.pi_cycle as u32) & RMASK as u32);
    if cpu.uuo_cycle || cpu.pi_cycle {
        cpu.flags -= Flags::USER | Flags::PUBLIC;
    }
    cpu.mem_write(false, false)?;
    cpu.clear_save_flags();
    cpu.its_jump();
    cpu.pc = ((cpu.ar + 1) & RMASK) as u32;
    cpu.f_pc_inh = true;
    Ok(())
}

/// JSP: PC word to AC, jump to E
pub fn jsp(cpu: &mut Cpu) -> MemResult {
    let ad = cpu.flags_pc_word((cpu.pc + !cpu.pi_cycle as u32) & RMASK as u32);
    cpu.clear_save_flags();
    if cpu.uuo_cycle || cpu.pi_cycle {
        cpu.flags -= Flags::USER | Flags::PUBLIC;
    }
    cpu.its_jump();
    cpu.pc = (cpu.ar & RMASK) as u32;
    cpu.ar = ad;
    Ok(())
}

/// JSA: old AC to E, E,,PC+1 to AC, continue at E
pub fn jsa(cpu: &mut Cpu) -> MemResult {
    let link = (cpu.ar << 18) | ((cpu.pc as u64 + 1) & RMASK);
    cpu.set_reg(cpu.ac, link);
    if cpu.uuo_cycle || cpu.pi_cycle {
        cpu.flags -= Flags::USER | Flags::PUBLIC;
    }
    cpu.its_jump();
    cpu.pc = (cpu.ar & RMASK) as u32;
    cpu.ar = cpu.br;
    Ok(())
}

/// JRA: restore AC from the address in its left half, jump to E
pub fn jra(cpu: &mut Cpu) -> MemResult {
    let ad = cpu.ab;
    cpu.ab = ((cpu.get_reg(cpu.ac) >> 18) & RMASK) as u32;
    cpu.mem_read(cpu.uuo_cycle || cpu.pi_cycle, false, false)?;
    let mb = cpu.mb;
    cpu.set_reg(cpu.ac, mb);
    cpu.its_jump();
    cpu.pc = (ad as u64 & RMASK) as u32;
    cpu.f_pc_inh = true;
    Ok(())
}
