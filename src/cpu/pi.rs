//! Priority-interrupt system
//!
//! Seven levels, level 1 highest. Devices assert a request at their
//! configured level; a level becomes serviceable when it is enabled,
//! requested (by a device or by the program), and no interrupt is
//! already held at that level or above. The executor grants at
//! instruction boundaries by running an interrupt cycle at vector
//! `040 + 2*level`.
//!
//! The PI system is itself device 004 on the I/O bus; its CONO/CONI
//! layout is at the bottom of this file.

use crate::cpu::state::Cpu;
use crate::devices::IoFunc;
use log::debug;

/// Level mask bit for PI level `lvl` (1-7)
#[inline(always)]
pub fn level_bit(lvl: u32) -> u32 {
    0o200 >> (lvl & 7)
}

/// Priority-interrupt state
#[derive(Debug, Clone)]
pub struct PiSystem {
    /// Program-requested levels (and device requests latched in)
    pub pir: u32,
    /// Levels currently being serviced
    pub pih: u32,
    /// Enabled levels
    pub pie: u32,
    /// Master enable
    pub enable: bool,
    /// Memory-parity interrupt armed
    pub parity_irq: bool,
    /// Some device raised or dropped a request since the last scan
    pub pending: bool,
    /// Result of the last scan
    pub req: u32,
    /// Level selected by the last successful scan (1-7)
    pub enc: u32,
    /// Request level per device slot (device code / 4)
    pub dev_irq: [u32; 128],
    /// Interrupt cycle wants to remain at this level (BLKI/BLKO chain)
    pub hold: bool,
    /// Dismiss the held level at the end of this cycle
    pub restore: bool,
    /// Skip side of a BLKI/BLKO chain during an interrupt cycle
    pub ov: bool,
}

impl PiSystem {
    pub fn new() -> Self {
        Self {
            pir: 0,
            pih: 0,
            pie: 0,
            enable: false,
            parity_irq: false,
            pending: false,
            req: 0,
            enc: 0,
            dev_irq: [0; 128],
            hold: false,
            restore: false,
            ov: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for PiSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    /// Assert a device's request at PI level 1-7; level 0 means the
    /// device's interrupt is not assigned and the request is dropped
    pub fn set_interrupt(&mut self, dev: u32, lvl: u32) {
        let lvl = lvl & 7;
        if lvl != 0 {
            self.pi.dev_irq[(dev >> 2) as usize] = level_bit(lvl);
            self.pi.pending = true;
            debug!(target: "kx10::pi", "set irq {:o} {:o}", dev & 0o774, lvl);
        }
    }

    /// Drop a device's request
    pub fn clr_interrupt(&mut self, dev: u32) {
        self.pi.dev_irq[(dev >> 2) as usize] = 0;
        debug!(target: "kx10::pi", "clear irq {:o}", dev & 0o774);
    }

    /// Scan for a serviceable interrupt. On success `pi.enc` holds the
    /// selected level.
    pub fn check_irq_level(&mut self) -> bool {
        self.check_apr_irq();

        // With the master enable off only program requests get through
        if !self.pi.enable {
            if self.pi.pir != 0 {
                let mut enc = 1;
                let mut lvl = 0o100;
                while lvl != 0 {
                    if self.pi.pir & lvl != 0 {
                        self.pi.enc = enc;
                        return true;
                    }
                    enc += 1;
                    lvl >>= 1;
                }
            }
            return false;
        }

        let mut dev_lvls = 0;
        for &l in self.pi.dev_irq.iter() {
            dev_lvls |= l;
        }
        if dev_lvls == 0 {
            self.pi.pending = false;
        }
        self.pi.req = (dev_lvls & self.pi.pie) | self.pi.pir;

        // Stop at the highest held level; only levels above it win
        let mut enc = 1;
        let mut lvl = 0o100;
        while lvl != 0 {
            if self.pi.pih & lvl != 0 {
                break;
            }
            if self.pi.req & lvl != 0 {
                self.pi.enc = enc;
                return true;
            }
            enc += 1;
            lvl >>= 1;
        }
        false
    }

    /// Dismiss the highest held level and rescan
    pub fn restore_pi_hold(&mut self) {
        if !self.pi.enable {
            return;
        }
        let mut lvl = 0o100;
        while lvl != 0 {
            if self.pi.pih & lvl != 0 {
                self.pi.pir &= !lvl;
                self.pi.pih &= !lvl;
                break;
            }
            lvl >>= 1;
        }
        self.pi.pending = true;
    }

    /// Latch the granted level as held, masking it and everything below
    pub fn set_pi_hold(&mut self) {
        let bit = level_bit(self.pi.enc);
        self.pi.pir &= !bit;
        if self.pi.enable {
            self.pi.pih |= bit;
        }
    }

    /// Device 004: the PI system's own bus registers
    pub fn pi_io(&mut self, func: IoFunc, data: &mut u64) {
        match func {
            IoFunc::Cono => {
                let res = *data as u32;
                if res & 0o10000 != 0 {
                    // Master clear
                    self.pi.pir = 0;
                    self.pi.pih = 0;
                    self.pi.pie = 0;
                    self.pi.enable = false;
                    self.pi.parity_irq = false;
                }
                if res & 0o200 != 0 {
                    self.pi.enable = true;
                    self.check_apr_irq();
                }
                if res & 0o400 != 0 {
                    self.pi.enable = false;
                }
                if res & 0o1000 != 0 {
                    self.pi.pie &= !(res & 0o177);
                }
                if res & 0o2000 != 0 {
                    self.pi.pie |= res & 0o177;
                }
                if res & 0o4000 != 0 {
                    self.pi.pir |= res & 0o177;
                    self.pi.pending = true;
                }
                if self.model == crate::config::CpuModel::Ki10 && res & 0o20000 != 0 {
                    self.pi.pir &= !(res & 0o177);
                }
                if res & 0o40000 != 0 {
                    self.pi.parity_irq = true;
                }
                if res & 0o100000 != 0 {
                    self.pi.parity_irq = false;
                }
                debug!(target: "kx10::pi", "CONO PI {:012o}", *data);
            }
            IoFunc::Coni => {
                let mut res = self.pi.pie as u64;
                res |= (self.pi.enable as u64) << 7;
                res |= (self.pi.pih as u64) << 8;
                if self.model == crate::config::CpuModel::Ki10 {
                    res |= (self.pi.pir as u64) << 18;
                }
                res |= (self.pi.parity_irq as u64) << 15;
                *data = res;
                debug!(target: "kx10::pi", "CONI PI {:012o}", *data);
            }
            // DATAO drove the console lights; DATAI reads nothing
            IoFunc::Datao | IoFunc::Datai => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MachineConfig;

    fn cpu() -> Cpu {
        let mut c = Cpu::new(&MachineConfig::ka10());
        c.pi.enable = true;
        c.pi.pie = 0o177;
        c
    }

    #[test]
    fn test_request_and_grant() {
        let mut c = cpu();
        c.set_interrupt(0o100, 3);
        assert!(c.check_irq_level());
        assert_eq!(c.pi.enc, 3);
    }

    #[test]
    fn test_priority_order() {
        let mut c = cpu();
        c.set_interrupt(0o100, 5);
        c.set_interrupt(0o104, 2);
        assert!(c.check_irq_level());
        assert_eq!(c.pi.enc, 2);
    }

    #[test]
    fn test_hold_masks_lower() {
        let mut c = cpu();
        c.set_interrupt(0o100, 3);
        assert!(c.check_irq_level());
        c.set_pi_hold();
        assert_eq!(c.pi.pih, level_bit(3));
        // Same and lower levels are masked while held
        c.set_interrupt(0o104, 3);
        assert!(!c.check_irq_level());
        c.set_interrupt(0o110, 5);
        assert!(!c.check_irq_level());
        // A higher level still gets through
        c.set_interrupt(0o114, 1);
        assert!(c.check_irq_level());
        assert_eq!(c.pi.enc, 1);
    }

    #[test]
    fn test_restore_unmasks() {
        let mut c = cpu();
        c.set_interrupt(0o100, 3);
        c.check_irq_level();
        c.set_pi_hold();
        c.clr_interrupt(0o100);
        c.set_interrupt(0o104, 5);
        assert!(!c.check_irq_level());
        c.restore_pi_hold();
        assert_eq!(c.pi.pih, 0);
        assert!(c.check_irq_level());
        assert_eq!(c.pi.enc, 5);
    }

    #[test]
    fn test_disabled_level_not_serviced() {
        let mut c = cpu();
        c.pi.pie = 0o177 & !level_bit(4);
        c.set_interrupt(0o100, 4);
        assert!(!c.check_irq_level());
        // Request persists; enabling the level makes it serviceable
        c.pi.pie |= level_bit(4);
        assert!(c.check_irq_level());
    }

    #[test]
    fn test_program_request_without_master() {
        let mut c = cpu();
        c.pi.enable = false;
        c.pi.pir = level_bit(6);
        assert!(c.check_irq_level());
        assert_eq!(c.pi.enc, 6);
    }

    #[test]
    fn test_cono_set_clear_levels() {
        let mut c = cpu();
        let mut w: u64 = 0o2000 | 0o070; // set levels 3,4,5... (mask bits)
        c.pi.pie = 0;
        c.pi_io(IoFunc::Cono, &mut w);
        assert_eq!(c.pi.pie, 0o070);
        let mut w: u64 = 0o1000 | 0o040;
        c.pi_io(IoFunc::Cono, &mut w);
        assert_eq!(c.pi.pie, 0o030);
    }

    #[test]
    fn test_coni_layout() {
        let mut c = cpu();
        c.pi.pie = 0o070;
        c.pi.pih = level_bit(2);
        let mut w = 0u64;
        c.pi_io(IoFunc::Coni, &mut w);
        assert_eq!(w & 0o177, 0o070);
        assert_ne!(w & 0o200, 0); // master enable
        assert_eq!((w >> 8) & 0o177, level_bit(2) as u64);
    }
}
