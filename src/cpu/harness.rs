//! Machine test harness
//!
//! A minimal environment for instruction testing: a machine, helpers
//! to deposit words and programs, and stepping that stops at a HALT.
//! Used by the integration suite; handy in unit tests too.

use crate::config::MachineConfig;
use crate::cpu::state::StopReason;
use crate::machine::Machine;
use crate::word::{FMASK, RMASK};

/// Test harness around a full machine
pub struct Harness {
    pub m: Machine,
}

/// Assemble a memory-reference instruction word
pub fn inst(op: u32, ac: u32, ind: bool, idx: u32, addr: u32) -> u64 {
    ((op as u64 & 0o777) << 27)
        | ((ac as u64 & 0o17) << 23)
        | ((ind as u64) << 22)
        | ((idx as u64 & 0o17) << 18)
        | (addr as u64 & RMASK)
}

impl Harness {
    /// A KA10 with 256K and two-segment relocation available
    pub fn new() -> Self {
        Self {
            m: Machine::new(&MachineConfig::ka10()).unwrap(),
        }
    }

    /// A KI10 with paging hardware
    pub fn new_ki() -> Self {
        Self {
            m: Machine::new(&MachineConfig::ki10()).unwrap(),
        }
    }

    /// Deposit a sequence of words starting at `addr` and point the PC
    /// at it
    pub fn load_program(&mut self, addr: u32, words: &[u64]) {
        for (i, &w) in words.iter().enumerate() {
            self.m.deposit(addr + i as u32, w & FMASK);
        }
        self.m.cpu.pc = addr;
    }

    /// Execute one instruction
    pub fn step(&mut self) -> StopReason {
        self.m.step(1)
    }

    /// Execute up to `n` instructions
    pub fn step_n(&mut self, n: u64) -> StopReason {
        self.m.step(n)
    }

    /// Run until the program halts (or another stop intervenes)
    pub fn run(&mut self) -> StopReason {
        self.m.run()
    }

    /// Read an accumulator
    pub fn ac(&self, n: u32) -> u64 {
        self.m.cpu.get_reg(n)
    }

    /// Write an accumulator
    pub fn set_ac(&mut self, n: u32, v: u64) {
        self.m.cpu.set_reg(n, v & FMASK);
    }

    /// Read memory through the operator window
    pub fn mem(&self, addr: u32) -> u64 {
        self.m.examine(addr)
    }

    /// Write memory through the operator window
    pub fn set_mem(&mut self, addr: u32, v: u64) {
        self.m.deposit(addr, v);
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
