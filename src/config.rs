//! Machine configuration
//!
//! A `MachineConfig` is validated as a whole before a machine is
//! built; nothing is partially applied. The CPU model and paging
//! variant are fixed here for the life of the machine, standing in for
//! what the original hardware family selected with compile-time
//! switches.

use crate::memory::{KA_MAXMEM, KI_MAXMEM};
use thiserror::Error;

/// Processor model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuModel {
    /// PDP-6: no relocation hardware, 16 fast registers
    Pdp6,
    /// KA10: relocation/protection registers, optional ITS or BBN pager
    Ka10,
    /// KI10: paging, eight fast-register blocks, double-precision floats
    Ki10,
}

/// Address-translation variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingMode {
    /// Single relocation register (or none at all)
    OneSeg,
    /// KA two-segment relocation and protection
    TwoSeg,
    /// KI10 executive/user page tables
    KiPage,
    /// MIT ITS pager
    Its,
    /// BBN TENEX pager
    Bbn,
}

/// History length bounds, inclusive
pub const HIST_MIN: usize = 64;
pub const HIST_MAX: usize = 500_000;

/// Configuration errors, all reported before any state is touched
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("memory size must be a multiple of 16K words, got {0}K")]
    MemGranularity(usize),
    #[error("memory size {got}K exceeds the model maximum of {max}K")]
    MemTooLarge { got: usize, max: usize },
    #[error("memory size must be non-zero")]
    MemZero,
    #[error("history length must be {HIST_MIN}..={HIST_MAX}, got {0}")]
    HistLength(usize),
    #[error("paging mode {mode:?} is not available on {model:?}")]
    PagingMismatch { model: CpuModel, mode: PagingMode },
}

/// Everything needed to construct a machine
#[derive(Debug, Clone)]
pub struct MachineConfig {
    pub model: CpuModel,
    pub paging: PagingMode,
    /// Memory size in units of 1024 words
    pub mem_k: usize,
    /// Instruction history length; zero disables the ring
    pub history: usize,
}

impl MachineConfig {
    /// A 256K KA10 with two-segment relocation, history off
    pub fn ka10() -> Self {
        Self {
            model: CpuModel::Ka10,
            paging: PagingMode::TwoSeg,
            mem_k: 256,
            history: 0,
        }
    }

    /// A 512K KI10 with paging, history off
    pub fn ki10() -> Self {
        Self {
            model: CpuModel::Ki10,
            paging: PagingMode::KiPage,
            mem_k: 512,
            history: 0,
        }
    }

    /// Maximum memory for the configured model, in words
    pub fn max_mem(&self) -> usize {
        match self.model {
            CpuModel::Pdp6 | CpuModel::Ka10 => KA_MAXMEM,
            CpuModel::Ki10 => KI_MAXMEM,
        }
    }

    /// Check the whole configuration; no partial apply on error
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mem_k == 0 {
            return Err(ConfigError::MemZero);
        }
        if self.mem_k % 16 != 0 {
            return Err(ConfigError::MemGranularity(self.mem_k));
        }
        if self.mem_k * 1024 > self.max_mem() {
            return Err(ConfigError::MemTooLarge {
                got: self.mem_k,
                max: self.max_mem() / 1024,
            });
        }
        if self.history != 0 && !(HIST_MIN..=HIST_MAX).contains(&self.history) {
            return Err(ConfigError::HistLength(self.history));
        }
        let ok = match self.model {
            CpuModel::Pdp6 => matches!(self.paging, PagingMode::OneSeg),
            CpuModel::Ka10 => !matches!(self.paging, PagingMode::KiPage),
            CpuModel::Ki10 => matches!(self.paging, PagingMode::KiPage),
        };
        if !ok {
            return Err(ConfigError::PagingMismatch {
                model: self.model,
                mode: self.paging,
            });
        }
        Ok(())
    }
}
