//! Pager device
//!
//! Device 010 on the KI10, 024 under the BBN option. DATAO loads the
//! executive and user base registers and flushes the TLBs; DATAI reads
//! them back; CONO/CONI manage the AC shadow stack and the TLB reload
//! counter. The BBN variant is CONO-driven with a small function code
//! instead.

use crate::config::PagingMode;
use crate::cpu::state::Cpu;
use crate::devices::IoFunc;
use crate::word::{RSIGN, SMASK};
use log::debug;

/// BBN user address-space limits, indexed by the field in word 071
const BBN_PAGE_LIMIT: [u32; 8] = [0o1000, 0o040, 0o100, 0o140, 0o200, 0o240, 0o300, 0o340];

impl Cpu {
    /// Pager device entry point
    pub fn pag_io(&mut self, func: IoFunc, data: &mut u64) {
        match self.pag.mode {
            PagingMode::Bbn => self.pag_io_bbn(func, data),
            _ => self.pag_io_ki(func, data),
        }
    }

    fn pag_io_ki(&mut self, func: IoFunc, data: &mut u64) {
        match func {
            IoFunc::Coni => {
                // Reload counter (complemented wrap bit), last page
                // mapped, and the processor serial number
                let mut res = (self.pag.pag_reload ^ 0o40) as u64;
                res |= (self.pag.last_page as u64) << 8;
                res |= 514u64 << 26;
                *data = res;
                debug!(target: "kx10::pag", "CONI PAG {:012o}", *data);
            }
            IoFunc::Cono => {
                self.pag.ac_stack = ((*data >> 9) & 0o760) as u32;
                self.pag.pag_reload = (*data as u32 & 0o37) | (self.pag.pag_reload & 0o40);
                debug!(target: "kx10::pag", "CONO PAG {:012o}", *data);
            }
            IoFunc::Datao => {
                let res = *data;
                if res & RSIGN != 0 {
                    self.pag.eb_ptr = ((res & 0o17777) as u32) << 9;
                    self.pag.clear_tlbs();
                    self.pag.page_enable = res & 0o20000 != 0;
                }
                if res & SMASK != 0 {
                    self.pag.ub_ptr = (((res >> 18) & 0o17777) as u32) << 9;
                    self.pag.clear_tlbs();
                    self.pag.user_addr_cmp = res & 0o0020_000_000_000 != 0;
                    self.pag.small_user = res & 0o0040_000_000_000 != 0;
                    self.mem.fm_sel = ((res >> 29) & 0o60) as usize;
                }
                self.pag.pag_reload = 0;
                debug!(target: "kx10::pag",
                       "DATAO PAG {:012o} ebr={:06o} ubr={:06o}",
                       *data, self.pag.eb_ptr, self.pag.ub_ptr);
            }
            IoFunc::Datai => {
                let mut res = (self.pag.eb_ptr >> 9) as u64;
                if self.pag.page_enable {
                    res |= 0o20000;
                }
                res |= (self.pag.ub_ptr as u64) << 9;
                if self.pag.user_addr_cmp {
                    res |= 0o0020_000_000_000;
                }
                if self.pag.small_user {
                    res |= 0o0040_000_000_000;
                }
                res |= (self.mem.fm_sel as u64) << 29;
                *data = res;
                debug!(target: "kx10::pag", "DATAI PAG {:012o}", *data);
            }
        }
    }

    /// The BBN pager is driven by a CONO function code
    fn pag_io_bbn(&mut self, func: IoFunc, data: &mut u64) {
        if func != IoFunc::Cono {
            return;
        }
        match *data & 0o7 {
            0 => {
                // Reload the base registers from 071/072 and flush
                self.pag.clear_tlbs();
                let res = self.mem.read(0o71).unwrap_or(0);
                self.pag.mon_base_reg = (res & 0o377) as u32;
                self.pag.ac_base = ((res >> 13) & 0o37) as u32;
                self.pag.user_base_reg = ((res >> 18) & 0o377) as u32;
                self.pag.user_limit = BBN_PAGE_LIMIT[((res >> 19) & 0o7) as usize];
                self.pag.pur = self.mem.read(0o72).unwrap_or(0);
            }
            1 => self.pag.e_tlb = [0; 512],
            2 => self.pag.next_write = true,
            3 => self.pag.u_tlb = [0; 546],
            4 | 5 => self.pag.page_enable = false,
            6 => {
                self.pag.page_enable = true;
                self.pag.exec_map = false;
            }
            _ => {
                self.pag.page_enable = true;
                self.pag.exec_map = true;
            }
        }
        debug!(target: "kx10::pag", "CONO PAG {:012o}", *data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MachineConfig;
    use crate::cpu::state::Flags;

    #[test]
    fn test_datao_loads_bases_and_flushes() {
        let mut c = Cpu::new(&MachineConfig::ki10());
        c.pag.u_tlb[5] = 0o123;
        let ebr = 0o1000u64 >> 9; // exec table at 0o1000
        let ubr = 0o2000u64 >> 9;
        let mut w = RSIGN | SMASK | ebr | 0o20000 | (ubr << 18);
        c.pag_io(IoFunc::Datao, &mut w);
        assert_eq!(c.pag.eb_ptr, 0o1000);
        assert_eq!(c.pag.ub_ptr, 0o2000);
        assert!(c.pag.page_enable);
        assert_eq!(c.pag.u_tlb[5], 0);
    }

    #[test]
    fn test_datai_roundtrip() {
        let mut c = Cpu::new(&MachineConfig::ki10());
        let mut w = RSIGN | SMASK | 0o20000 | 0o17 | (0o13 << 18);
        c.pag_io(IoFunc::Datao, &mut w);
        let mut back = 0u64;
        c.pag_io(IoFunc::Datai, &mut back);
        assert_eq!(back & 0o17777, 0o17);
        assert_ne!(back & 0o20000, 0);
        assert_eq!((back >> 18) & 0o17777, 0o13);
    }

    #[test]
    fn test_fm_sel_from_datao() {
        let mut c = Cpu::new(&MachineConfig::ki10());
        let mut w = SMASK | (0o20u64 << 29);
        c.pag_io(IoFunc::Datao, &mut w);
        assert_eq!(c.mem.fm_sel, 0o20);
        c.flags |= Flags::USER;
        c.set_reg(1, 7);
        assert_eq!(c.mem.get_fm(0o20, 1), 7);
    }
}
