//! A complete machine: processor plus device bus
//!
//! The operator-facing surface: build from a validated configuration,
//! attach devices, deposit a program, run until something stops.

use crate::config::{ConfigError, MachineConfig};
use crate::cpu::state::{Cpu, StopReason};
use crate::devices::{DeviceBus, IoDevice};
use crate::word::FMASK;

pub struct Machine {
    pub cpu: Cpu,
    pub bus: DeviceBus,
}

impl Machine {
    /// Validate the configuration and build; nothing is constructed on
    /// error
    pub fn new(cfg: &MachineConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            cpu: Cpu::new(cfg),
            bus: DeviceBus::new(),
        })
    }

    /// Register a peripheral under its device number
    pub fn attach(&mut self, devnum: u32, dev: Box<dyn IoDevice>) {
        self.bus.attach(devnum, dev);
    }

    /// Run until halt, breakpoint or another stop
    pub fn run(&mut self) -> StopReason {
        self.cpu.run(&mut self.bus)
    }

    /// Execute `n` instructions
    pub fn step(&mut self, n: u64) -> StopReason {
        self.cpu.step_n(&mut self.bus, n)
    }

    /// Operator examine: accumulators below 020, then core
    pub fn examine(&self, addr: u32) -> u64 {
        if addr < 0o20 {
            self.cpu.mem.get_fm(0, addr as usize)
        } else {
            self.cpu.mem.read(addr as usize).unwrap_or(0)
        }
    }

    /// Operator deposit
    pub fn deposit(&mut self, addr: u32, value: u64) {
        if addr < 0o20 {
            self.cpu.mem.set_fm(0, addr as usize, value & FMASK);
        } else {
            self.cpu.mem.write(addr as usize, value & FMASK);
        }
    }

    /// Full reset: processor state and every attached device
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.bus.reset_all(&mut self.cpu);
    }
}
