//! Arithmetic processor (device 000)
//!
//! The APR carries the system's sticky condition flags and their
//! interrupt assignment. CONI reads the conditions, CONO clears
//! selected ones, sets the interrupt level, manages the clock enable
//! and can issue a master reset. On the KA10 a DATAO loads the
//! relocation/protection registers; DATAI reads the console switches
//! on both models.

use crate::config::CpuModel;
use crate::cpu::state::{Cpu, Flags};
use crate::devices::IoFunc;
use log::debug;

impl Cpu {
    /// Re-derive the APR interrupt request from the current conditions
    pub fn check_apr_irq(&mut self) {
        match self.model {
            CpuModel::Ki10 => {
                if self.pi.enable && self.apr.apr_irq != 0 {
                    self.clr_interrupt(0);
                    if self.apr.inout_fail || self.apr.nxm_flag {
                        let lvl = self.apr.apr_irq;
                        self.set_interrupt(0, lvl);
                    }
                }
                if self.pi.enable && self.apr.clk_en && self.apr.clk_flg {
                    let lvl = self.apr.clk_irq;
                    self.set_interrupt(4, lvl);
                }
            }
            CpuModel::Ka10 | CpuModel::Pdp6 => {
                if self.pi.enable && self.apr.apr_irq != 0 {
                    self.clr_interrupt(0);
                    let mut flg = self.apr.clk_en && self.apr.clk_flg;
                    flg |= self.flags.contains(Flags::OVR) && self.apr.ov_irq;
                    flg |= self.flags.contains(Flags::FLTOVR) && self.apr.fov_irq;
                    flg |= self.apr.nxm_flag || self.apr.mem_prot || self.apr.push_ovf;
                    if flg {
                        let lvl = self.apr.apr_irq;
                        self.set_interrupt(0, lvl);
                    }
                }
            }
        }
    }

    /// Device 000
    pub fn apr_io(&mut self, func: IoFunc, data: &mut u64) {
        match self.model {
            CpuModel::Ki10 => self.apr_io_ki(func, data),
            CpuModel::Ka10 | CpuModel::Pdp6 => self.apr_io_ka(func, data),
        }
    }

    fn apr_io_ka(&mut self, func: IoFunc, data: &mut u64) {
        match func {
            IoFunc::Coni => {
                let a = &self.apr;
                let mut res = a.apr_irq as u64;
                res |= (self.flags.contains(Flags::OVR) as u64) << 3;
                res |= (a.ov_irq as u64) << 4;
                res |= (self.flags.contains(Flags::FLTOVR) as u64) << 6;
                res |= (a.fov_irq as u64) << 7;
                res |= (a.clk_flg as u64) << 9;
                res |= (a.clk_en as u64) << 10;
                res |= (a.nxm_flag as u64) << 12;
                res |= (a.mem_prot as u64) << 13;
                res |= (self.flags.contains(Flags::USERIO) as u64) << 15;
                res |= (a.push_ovf as u64) << 16;
                *data = res;
                debug!(target: "kx10::apr", "CONI APR {:012o}", *data);
            }
            IoFunc::Cono => {
                let res = *data as u32;
                self.apr.apr_irq = res & 0o7;
                self.apr.clk_irq = res & 0o7;
                self.clr_interrupt(0);
                self.clr_interrupt(4);
                if res & 0o10 != 0 {
                    self.flags -= Flags::OVR;
                }
                if res & 0o20 != 0 {
                    self.apr.ov_irq = true;
                }
                if res & 0o40 != 0 {
                    self.apr.ov_irq = false;
                }
                if res & 0o100 != 0 {
                    self.flags -= Flags::FLTOVR;
                }
                if res & 0o200 != 0 {
                    self.apr.fov_irq = true;
                }
                if res & 0o400 != 0 {
                    self.apr.fov_irq = false;
                }
                if res & 0o1000 != 0 {
                    self.apr.clk_flg = false;
                }
                if res & 0o2000 != 0 {
                    self.apr.clk_en = true;
                }
                if res & 0o4000 != 0 {
                    self.apr.clk_en = false;
                }
                if res & 0o10000 != 0 {
                    self.apr.nxm_flag = false;
                }
                if res & 0o20000 != 0 {
                    self.apr.mem_prot = false;
                }
                if res & 0o200000 != 0 {
                    self.master_reset();
                }
                if res & 0o400000 != 0 {
                    self.apr.push_ovf = false;
                }
                self.check_apr_irq();
                debug!(target: "kx10::apr", "CONO APR {:012o}", *data);
            }
            IoFunc::Datao => {
                // Load the relocation and protection registers
                let res = *data;
                self.pag.rh = ((res >> 1) & 0o377) as u32;
                self.pag.rl = ((res >> 10) & 0o377) as u32;
                self.pag.pflag = (res >> 18) & 1 != 0;
                self.pag.ph = ((res >> 19) & 0o377) as u32;
                self.pag.pl = ((res >> 28) & 0o377) as u32;
                debug!(target: "kx10::apr", "DATAO APR {:012o}", *data);
            }
            IoFunc::Datai => {
                *data = self.sw;
                debug!(target: "kx10::apr", "DATAI APR {:012o}", *data);
            }
        }
    }

    fn apr_io_ki(&mut self, func: IoFunc, data: &mut u64) {
        match func {
            IoFunc::Coni => {
                let a = &self.apr;
                let mut res = a.clk_irq as u64;
                res |= (a.apr_irq as u64) << 3;
                res |= (a.nxm_flag as u64) << 6;
                res |= (a.inout_fail as u64) << 7;
                res |= (a.clk_flg as u64) << 9;
                res |= (a.clk_en as u64) << 10;
                res |= (a.timer_irq as u64) << 14;
                res |= (self.pi.parity_irq as u64) << 15;
                res |= (a.timer_flg as u64) << 17;
                *data = res;
                debug!(target: "kx10::apr", "CONI APR {:012o}", *data);
            }
            IoFunc::Cono => {
                let res = *data as u32;
                self.apr.clk_irq = res & 0o7;
                self.apr.apr_irq = (res >> 3) & 0o7;
                if res & 0o100 != 0 {
                    self.apr.nxm_flag = false;
                }
                if res & 0o200 != 0 {
                    self.apr.inout_fail = false;
                }
                if res & 0o1000 != 0 {
                    self.apr.clk_flg = false;
                    self.clr_interrupt(4);
                }
                if res & 0o2000 != 0 {
                    self.apr.clk_en = true;
                }
                if res & 0o4000 != 0 {
                    self.apr.clk_en = false;
                }
                if res & 0o40000 != 0 {
                    self.apr.timer_irq = true;
                }
                if res & 0o100000 != 0 {
                    self.apr.timer_irq = false;
                }
                if res & 0o200000 != 0 {
                    self.master_reset();
                }
                if res & 0o400000 != 0 {
                    self.apr.timer_flg = false;
                }
                self.check_apr_irq();
                debug!(target: "kx10::apr", "CONO APR {:012o}", *data);
            }
            IoFunc::Datao => {
                debug!(target: "kx10::apr", "DATAO APR {:012o}", *data);
            }
            IoFunc::Datai => {
                *data = self.sw;
                debug!(target: "kx10::apr", "DATAI APR {:012o}", *data);
            }
        }
    }

    /// CONO APR master-reset bit: clear processor conditions. External
    /// devices reset through the bus when the machine-level reset runs.
    pub fn master_reset(&mut self) {
        self.apr.nxm_flag = false;
        self.apr.mem_prot = false;
        self.apr.push_ovf = false;
        self.apr.inout_fail = false;
        self.apr.clk_flg = false;
        self.apr.clk_en = false;
        self.pi.reset();
        self.pag.clear_tlbs();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MachineConfig;

    #[test]
    fn test_ka_coni_reports_conditions() {
        let mut c = Cpu::new(&MachineConfig::ka10());
        c.apr.nxm_flag = true;
        c.flags |= Flags::OVR;
        let mut w = 0u64;
        c.apr_io(IoFunc::Coni, &mut w);
        assert_ne!(w & (1 << 12), 0);
        assert_ne!(w & (1 << 3), 0);
    }

    #[test]
    fn test_ka_cono_clears_selected() {
        let mut c = Cpu::new(&MachineConfig::ka10());
        c.apr.nxm_flag = true;
        c.apr.mem_prot = true;
        let mut w = 0o10000u64; // clear nxm only
        c.apr_io(IoFunc::Cono, &mut w);
        assert!(!c.apr.nxm_flag);
        assert!(c.apr.mem_prot);
    }

    #[test]
    fn test_apr_interrupt_level() {
        let mut c = Cpu::new(&MachineConfig::ka10());
        c.pi.enable = true;
        c.pi.pie = 0o177;
        let mut w = 0o3u64; // conditions on level 3
        c.apr_io(IoFunc::Cono, &mut w);
        c.apr.nxm_flag = true;
        c.check_apr_irq();
        assert!(c.check_irq_level());
        assert_eq!(c.pi.enc, 3);
    }

    #[test]
    fn test_datao_loads_relocation() {
        let mut c = Cpu::new(&MachineConfig::ka10());
        // Pl=0o17, Pflag set, Rl=0o101
        let mut w: u64 = (0o17 << 28) | (1 << 18) | (0o101 << 10);
        c.apr_io(IoFunc::Datao, &mut w);
        assert_eq!(c.pag.pl, 0o17);
        assert_eq!(c.pag.rl, 0o101);
        assert!(c.pag.pflag);
    }

    #[test]
    fn test_datai_reads_switches() {
        let mut c = Cpu::new(&MachineConfig::ka10());
        c.sw = 0o707070;
        let mut w = 0u64;
        c.apr_io(IoFunc::Datai, &mut w);
        assert_eq!(w, 0o707070);
    }
}
