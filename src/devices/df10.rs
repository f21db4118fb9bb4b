//! DF10 data channel
//!
//! The bus-master engine shared by the block-mode peripherals (disk
//! packs, mag tape). A device hands it the address of a control-word
//! list; the engine walks the list, transferring one word per call in
//! either direction between memory and the device's buffer register.
//!
//! Control words are IOWD-style: negative word count in the left half,
//! data address minus one in the right. A word with a zero count but a
//! nonzero address continues the chain at that address; a zero word
//! terminates. On completion or error the engine writes the final
//! control word back at `cia|1`, sets its status flags, and raises the
//! owning device's interrupt assignment.
//!
//! Errors (non-existent memory) are not retried: they terminate the
//! chain and surface through the owning device's CONI status.

use crate::config::CpuModel;
use crate::cpu::state::Cpu;
use log::{debug, trace};

/// PI assignment mask within the status word
pub const API_MASK: u32 = 0o7;
/// Interrupt request latched
pub const PI_ENABLE: u32 = 0o10;
/// Channel active
pub const BUSY: u32 = 0o20;
/// Final control word written back
pub const CCW_COMP: u32 = 0o40;

/// Initial-control-word area mask applied to the DATAO address
const ICWA: u32 = 0o776;

/// One DF10 channel
pub struct Df10 {
    /// Device status; low bits hold the PI assignment, device-specific
    /// error bits live above the common set
    pub status: u32,
    /// Initial control-word address
    pub cia: u32,
    /// Current control-word address
    pub ccw: u32,
    /// Word counter, counting up from the negative count
    pub wcr: u32,
    /// Current data address (incremented before each transfer)
    pub cda: u32,
    /// Owning device number
    pub devnum: u32,
    /// Buffer register: the word in flight
    pub buf: u64,
    /// Bit number of the owning device's NXM error flag
    pub nxmerr: u8,
    /// Bit number of the owning device's CCW-complete flag
    pub ccw_comp: u8,
    amask: u32,
    wmask: u32,
    cshift: u32,
}

impl Df10 {
    /// Channel widths follow the processor: 18-bit addressing on the
    /// KA/PDP-6 bus, 22-bit on the KI
    pub fn new(model: CpuModel, devnum: u32, nxmerr: u8, ccw_comp: u8) -> Self {
        let (amask, wmask, cshift) = match model {
            CpuModel::Ki10 => (0o37777777, 0o17777, 22),
            CpuModel::Ka10 | CpuModel::Pdp6 => (0o777777, 0o777777, 18),
        };
        Self {
            status: 0,
            cia: 0,
            ccw: 0,
            wcr: 0,
            cda: 0,
            devnum,
            buf: 0,
            nxmerr,
            ccw_comp,
            amask,
            wmask,
            cshift,
        }
    }

    /// Raise the owning device's interrupt at its PI assignment
    pub fn setirq(&mut self, cpu: &mut Cpu) {
        self.status |= PI_ENABLE;
        cpu.set_interrupt(self.devnum, self.status & API_MASK);
    }

    /// Write the final control word back at `cia|1`
    pub fn writecw(&mut self, cpu: &mut Cpu) {
        self.status |= 1 << self.ccw_comp;
        let word = ((self.ccw as u64) << self.cshift) | self.cda as u64;
        cpu.mem.write((self.cia | 1) as usize, word);
    }

    /// Terminate the chain: drop busy, merge `flags` into status,
    /// write the final control word and interrupt
    pub fn finish_op(&mut self, cpu: &mut Cpu, flags: u32) {
        self.status &= !BUSY;
        self.status |= flags;
        self.writecw(cpu);
        self.setirq(cpu);
        debug!(target: "kx10::df10",
               "dev {:03o} chain done status {:06o}", self.devnum, self.status);
    }

    /// Start a chain at the control-word list `addr` names
    pub fn setup(&mut self, addr: u32) {
        self.cia = addr & ICWA;
        self.ccw = self.cia;
        self.wcr = 0;
        self.status |= BUSY;
    }

    /// Fetch the next control word. Returns false when the chain ended
    /// (normally or with an error latched).
    pub fn fetch(&mut self, cpu: &mut Cpu) -> bool {
        let mut data = match cpu.mem.read(self.ccw as usize) {
            Some(w) => w,
            None => {
                self.finish_op(cpu, 1 << self.nxmerr);
                return false;
            }
        };
        // Skip jump words until a counted transfer appears
        while data & ((self.wmask as u64) << self.cshift) == 0 {
            if data & self.amask as u64 == 0 {
                self.finish_op(cpu, 0);
                return false;
            }
            self.ccw = data as u32 & self.amask;
            data = match cpu.mem.read(self.ccw as usize) {
                Some(w) => w,
                None => {
                    self.finish_op(cpu, 1 << self.nxmerr);
                    return false;
                }
            };
        }
        self.wcr = (data >> self.cshift) as u32 & self.wmask;
        self.cda = data as u32 & self.amask;
        self.ccw = (self.ccw + 1) & self.amask;
        trace!(target: "kx10::df10",
               "dev {:03o} ccw {:08o} wc {:06o} da {:08o}",
               self.devnum, self.ccw, self.wcr, self.cda);
        true
    }

    /// Move one word from memory into the buffer register. Returns
    /// false when the chain is finished.
    pub fn read(&mut self, cpu: &mut Cpu) -> bool {
        if self.wcr == 0 && !self.fetch(cpu) {
            return false;
        }
        self.wcr = (self.wcr + 1) & self.wmask;
        if self.cda != 0 {
            self.cda = (self.cda + 1) & self.amask;
            match cpu.mem.read(self.cda as usize) {
                Some(w) => self.buf = w,
                None => {
                    self.finish_op(cpu, 1 << self.nxmerr);
                    return false;
                }
            }
        } else {
            self.buf = 0;
        }
        if self.wcr == 0 {
            return self.fetch(cpu);
        }
        true
    }

    /// Move the buffer register into memory. Returns false when the
    /// chain is finished.
    pub fn write(&mut self, cpu: &mut Cpu) -> bool {
        if self.wcr == 0 && !self.fetch(cpu) {
            return false;
        }
        self.wcr = (self.wcr + 1) & self.wmask;
        if self.cda != 0 {
            self.cda = (self.cda + 1) & self.amask;
            if !cpu.mem.write(self.cda as usize, self.buf) {
                self.finish_op(cpu, 1 << self.nxmerr);
                return false;
            }
        }
        if self.wcr == 0 {
            return self.fetch(cpu);
        }
        true
    }
}
