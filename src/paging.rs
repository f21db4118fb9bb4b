//! Address translation
//!
//! One translator per hardware family, selected at configuration time:
//!
//! * `OneSeg` / `TwoSeg` — PDP-6/KA10 relocation and protection
//!   registers, loaded by APR DATAO.
//! * `KiPage` — KI10 executive/user page tables of packed half-word
//!   entries, cached in per-space TLBs.
//! * `Its` — the MIT pager: two user tables and an executive high
//!   table of 2-bit-access entries with age writeback, plus the MAR
//!   address-compare trap.
//! * `Bbn` — the BBN TENEX pager: up to three chained table lookups
//!   through shared and indirect entries, with core-status-table
//!   bookkeeping on every fill.
//!
//! A lookup either produces a physical address or latches fault state
//! (`page_fault` / `fault_data` / APR memory-protect) for the
//! executor's epilogue to turn into the model's trap sequence. The
//! XCT flag redirects chosen access classes at the user map; each
//! variant assigns its own meaning to the flag bits, matched here to
//! the translator that consumes them.

use crate::config::PagingMode;
use crate::cpu::state::{Cpu, Flags};
use crate::word::{FMASK, LMASK, RMASK, RSIGN};
use log::{debug, trace};

/// Pager state for every variant; unused fields stay zero
pub struct Pager {
    pub mode: PagingMode,
    /// Translation on (paged variants)
    pub page_enable: bool,
    /// A fault is latched and waiting for the epilogue
    pub page_fault: bool,
    /// Executive TLB, one entry per 512-word page
    pub e_tlb: [u32; 512],
    /// User TLB; the KI maps executive pages 340-377 above the top
    pub u_tlb: [u32; 546],
    /// Executive base register (physical address of the exec table)
    pub eb_ptr: u32,
    /// User base register
    pub ub_ptr: u32,
    /// KI small-user option: user limited to pages below 0340
    pub small_user: bool,
    /// KI address-compare enable
    pub user_addr_cmp: bool,
    /// AC shadow-stack offset for XCT-mapped register references
    pub ac_stack: u32,
    /// TLB reload counter, modulo 32 with a wrap bit
    pub pag_reload: u32,
    /// Last page the MAP instruction examined
    pub last_page: u32,
    /// Fault descriptor for the software fault handler
    pub fault_data: u64,

    // KA relocation/protection (APR DATAO)
    pub rl: u32,
    pub rh: u32,
    pub pl: u32,
    pub ph: u32,
    pub pflag: bool,

    // ITS
    pub dbr1: u32,
    pub dbr2: u32,
    pub dbr3: u32,
    pub age: u32,
    pub mar: u32,
    pub fault_addr: u32,
    pub jpc: u32,
    pub opc: u64,

    // BBN
    pub exec_map: bool,
    pub next_write: bool,
    pub mon_base_reg: u32,
    pub ac_base: u32,
    pub user_base_reg: u32,
    pub user_limit: u32,
    pub pur: u64,
}

impl Pager {
    pub fn new(mode: PagingMode) -> Self {
        Self {
            mode,
            page_enable: false,
            page_fault: false,
            e_tlb: [0; 512],
            u_tlb: [0; 546],
            eb_ptr: 0,
            ub_ptr: 0,
            small_user: false,
            user_addr_cmp: false,
            ac_stack: 0,
            pag_reload: 0,
            last_page: 0,
            fault_data: 0,
            rl: 0,
            rh: 0,
            pl: 0,
            ph: 0,
            pflag: false,
            dbr1: 0,
            dbr2: 0,
            dbr3: 0,
            age: 0,
            mar: 0,
            fault_addr: 0,
            jpc: 0,
            opc: 0,
            exec_map: false,
            next_write: false,
            mon_base_reg: 0,
            ac_base: 0,
            user_base_reg: 0,
            user_limit: 0,
            pur: 0,
        }
    }

    pub fn reset(&mut self) {
        let mode = self.mode;
        *self = Self::new(mode);
    }

    /// Invalidate both spaces, as a base-register load does
    pub fn clear_tlbs(&mut self) {
        self.e_tlb = [0; 512];
        self.u_tlb = [0; 546];
    }
}

// BBN page-table entry fields. Bits count from the left, hardware
// style: bits 1-2 select the entry type, 2-4 carry the access grants,
// 8-12 the trap controls, and the low halves hold page numbers.
const BBN_READ: u64 = 0o100_000_000_000;
const BBN_WRITE: u64 = 0o040_000_000_000;
const BBN_EXEC: u64 = 0o020_000_000_000;
const BBN_TRPUSR: u64 = 0o001_000_000_000;
const BBN_TRPMOD: u64 = 0o000_400_000_000;
const BBN_TRPPG: u64 = 0o000_300_000_000;
const BBN_ACC: u64 = 0o000_040_000_000;
const BBN_MERGE: u64 = BBN_TRPUSR | BBN_TRPMOD | BBN_TRPPG | BBN_ACC;
const BBN_PAGE: u64 = 0o3777;
const BBN_PN: u64 = 0o777;
const BBN_SPT_IDX: u64 = 0o777_777_000;
/// Shared-pointer table origin
const BBN_SPT_BASE: u32 = 0o20000;
/// Core-status table origin
const BBN_CST_BASE: u32 = 0o4000;

/// JRST with the portal AC bit, as a public-page entry must look
const PORTAL_MASK: u64 = 0o777_040_000_000;
const PORTAL_INST: u64 = 0o254_040_000_000;

impl Cpu {
    /// Translate `addr` for one memory cycle.
    ///
    /// `flag` marks interrupt and UUO cycles (always executive map,
    /// never faulting on protection). `wr` is a write cycle;
    /// `cur_context` pins the access to the current context, bypassing
    /// any XCT override; `fetch` marks instruction fetches.
    ///
    /// Returns the physical address, or `None` with fault state
    /// latched. A few KI public-violation paths latch the fault but
    /// still let a read cycle complete, as the hardware did.
    pub fn page_lookup(
        &mut self,
        addr: u32,
        flag: bool,
        wr: bool,
        cur_context: bool,
        fetch: bool,
    ) -> Option<u32> {
        match self.pag.mode {
            PagingMode::KiPage => self.ki_lookup(addr, flag, wr, cur_context, fetch),
            PagingMode::Its => self.its_lookup(addr, flag, wr, cur_context, fetch),
            PagingMode::Bbn => self.bbn_lookup(addr, flag, wr, cur_context, fetch),
            PagingMode::OneSeg | PagingMode::TwoSeg => self.ka_lookup(addr, flag, wr),
        }
    }

    /// KA10 relocation: low segment always, high segment when the
    /// two-segment option is on; executive accesses are direct
    fn ka_lookup(&mut self, addr: u32, flag: bool, wr: bool) -> Option<u32> {
        let p = &self.pag;
        if !flag && self.flags.contains(Flags::USER) {
            if addr <= (p.pl << 10) + 0o1777 {
                return Some((addr + (p.rl << 10)) & RMASK as u32);
            }
            if p.mode == PagingMode::TwoSeg
                && addr & 0o400000 != 0
                && addr < 0o400000 + ((p.ph + 1) << 10)
                && (!p.pflag || !wr)
            {
                return Some((addr + (p.rh << 10)) & RMASK as u32);
            }
            self.apr.mem_prot = true;
            return None;
        }
        Some(addr)
    }

    /// Which space a KI access belongs to, after the XCT override
    fn ki_user_space(&self, flag: bool, wr: bool, cur_context: bool) -> bool {
        let mut uf = self.flags.contains(Flags::USER);
        if flag {
            return false;
        }
        if self.xct_flag != 0 && !cur_context && !uf {
            let x = self.xct_flag;
            if ((x & 2) != 0 && wr) || ((x & 1) != 0 && (!wr || self.modify)) {
                uf = self.flags.contains(Flags::USERIO);
            }
        }
        uf
    }

    fn ki_lookup(
        &mut self,
        addr: u32,
        flag: bool,
        mut wr: bool,
        cur_context: bool,
        fetch: bool,
    ) -> Option<u32> {
        if self.pag.page_fault {
            return None;
        }
        if !self.pag.page_enable {
            return Some(addr);
        }
        // The deposit half of a byte instruction writes
        if self.byf5 && (self.ir & 6) == 6 {
            wr = true;
        }
        wr |= self.modify;

        let uf = self.ki_user_space(flag, wr, cur_context);
        let mut page = (addr & RMASK as u32) >> 9;
        let mut exec_base = false;

        if uf {
            if self.pag.small_user && page & 0o340 != 0 {
                self.pag.fault_data = ((page as u64) << 18) | ((uf as u64) << 27) | 0o20;
                self.pag.page_fault = true;
                return None;
            }
        } else {
            if page & 0o740 == 0o340 {
                // Executive 340-377 lives at the top of the user table
                page += 0o1000 - 0o340;
            } else if page & 0o400 != 0 {
                exec_base = true;
            } else {
                // Executive 0-337 is unmapped
                if !flag
                    && self.flags.contains(Flags::PUBLIC)
                    && (!fetch
                        || self.mem.read(addr as usize).unwrap_or(0) & PORTAL_MASK != PORTAL_INST)
                {
                    self.pag.fault_data =
                        ((page as u64) << 18) | ((uf as u64) << 27) | 0o21;
                    self.pag.page_fault = true;
                    trace!(target: "kx10::pag", "public violation at {:06o}", addr);
                    return if !wr { Some(addr) } else { None };
                }
                return Some(addr);
            }
        }

        // TLB fill: entries pack two per word, both halves cached at once
        let data = if exec_base {
            let mut data = self.pag.e_tlb[page as usize];
            if data == 0 {
                let w = self
                    .mem
                    .read((self.pag.eb_ptr + (page >> 1)) as usize)
                    .unwrap_or(0);
                self.pag.e_tlb[(page & 0o776) as usize] = (w >> 18) as u32 & RMASK as u32;
                self.pag.e_tlb[(page | 1) as usize] = w as u32 & RMASK as u32;
                data = self.pag.e_tlb[page as usize];
                self.pag.pag_reload = ((self.pag.pag_reload + 1) & 0o37) | 0o40;
            }
            data
        } else {
            let mut data = self.pag.u_tlb[page as usize];
            if data == 0 {
                let w = self
                    .mem
                    .read((self.pag.ub_ptr + (page >> 1)) as usize)
                    .unwrap_or(0);
                self.pag.u_tlb[(page & 0o1776) as usize] = (w >> 18) as u32 & RMASK as u32;
                self.pag.u_tlb[(page | 1) as usize] = w as u32 & RMASK as u32;
                data = self.pag.u_tlb[page as usize];
                self.pag.pag_reload = ((self.pag.pag_reload + 1) & 0o37) | 0o40;
            }
            data
        };

        let loc = ((data & 0o17777) << 9) + (addr & 0o777);

        // A public process may only enter private pages through a portal
        if !flag
            && self.flags.contains(Flags::PUBLIC)
            && data & 0o200000 == 0
            && (!fetch || self.mem.read(loc as usize).unwrap_or(0) & PORTAL_MASK != PORTAL_INST)
        {
            self.pag.fault_data = ((page as u64) << 18) | ((uf as u64) << 27) | 0o21;
            self.pag.page_fault = true;
            return if fetch { Some(loc) } else { None };
        }
        if cur_context && data & 0o200000 != 0 {
            self.flags |= Flags::PUBLIC;
        }

        if data & RSIGN as u32 == 0 || (wr && data & 0o100000 == 0) {
            let mut fd = (((addr as u64) << 9) | ((uf as u64) << 27)) & LMASK;
            if data & 0o400000 != 0 {
                fd |= 0o10; // A
            }
            if data & 0o100000 != 0 {
                fd |= 0o04; // W
            }
            if data & 0o040000 != 0 {
                fd |= 0o02; // S
            }
            fd |= wr as u64;
            self.pag.fault_data = fd;
            self.pag.page_fault = true;
            debug!(target: "kx10::pag",
                   "page fail {:06o} page {:04o} entry {:06o} -> {:012o}",
                   addr, page, data, fd);
            return None;
        }
        Some(loc)
    }

    /// Load one ITS page-table entry, writing the age field back
    fn its_load_tlb(&mut self, reg: u32, page: u32) -> Result<u32, ()> {
        let len = (reg >> 19) & 0o77;
        let entry = ((reg & 0o1777777) + ((page & 0o377) >> 1)) as usize;
        if page >> 1 > len {
            self.pag.fault_data |= 0o200;
            return Err(());
        }
        let mut data = match self.mem.read(entry) {
            Some(d) => d,
            None => {
                self.apr.nxm_flag = true;
                self.pag.fault_data |= 0o400;
                return Err(());
            }
        };
        if page & 1 != 0 {
            data = (data & !0o17000) | ((self.pag.age as u64 & 0o17) << 9);
        } else {
            data = (data & !(0o17000 << 18)) | ((self.pag.age as u64 & 0o17) << (9 + 18));
        }
        self.mem.write(entry, data);
        if page & 1 == 0 {
            data >>= 18;
        }
        self.pag.pag_reload = (self.pag.pag_reload + 1) & 0o17;
        Ok((data & RMASK) as u32)
    }

    fn its_lookup(
        &mut self,
        addr: u32,
        flag: bool,
        mut wr: bool,
        cur_context: bool,
        fetch: bool,
    ) -> Option<u32> {
        if !self.pag.page_enable {
            return Some(addr);
        }
        if self.byf5 && (self.ir & 6) == 6 {
            wr = true;
        }
        wr |= self.modify;

        let mut uf = self.flags.contains(Flags::USER);
        if flag {
            uf = false;
        } else if self.xct_flag != 0 && !cur_context && !uf {
            let x = self.xct_flag;
            if ((x & 4) != 0 && wr) || ((x & 2) != 0 && (!wr || self.modify)) {
                uf = self.flags.contains(Flags::USERIO);
            }
        }

        // Memory-address-register compare trap
        if addr == self.pag.mar & RMASK as u32 {
            match (self.pag.mar >> 18) & 3 {
                1 if fetch => {
                    self.apr.mem_prot = true;
                    self.pag.fault_data |= 2;
                }
                2 if wr => {
                    self.apr.mem_prot = true;
                    self.pag.fault_data |= 2;
                }
                3 => {
                    self.apr.mem_prot = true;
                    self.pag.fault_data |= 2;
                }
                _ => {}
            }
        }

        let page = (addr & RMASK as u32) >> 10;
        let data;
        if !uf {
            // Low executive pages are direct, high ones optionally mapped
            if page & 0o400 == 0 || self.pag.fault_data & 0o4 == 0 {
                return Some(addr);
            }
            let mut d = self.pag.e_tlb[page as usize];
            if d == 0 {
                match self.its_load_tlb(self.pag.dbr3, page) {
                    Ok(v) => d = v,
                    Err(()) => return self.its_fault(page, false, 0, wr),
                }
                self.pag.e_tlb[page as usize] = d;
            }
            data = d;
        } else {
            let mut d = self.pag.u_tlb[page as usize];
            if d == 0 {
                let dbr = if page & 0o400 != 0 {
                    self.pag.dbr2
                } else {
                    self.pag.dbr1
                };
                match self.its_load_tlb(dbr, page) {
                    Ok(v) => d = v,
                    Err(()) => return self.its_fault(page, true, 0, wr),
                }
                self.pag.u_tlb[page as usize] = d;
            }
            data = d;
        }

        let loc = ((data & 0o777) << 10) + (addr & 0o1777);

        // Pure-procedure pages may only be fetched
        if fetch && self.flags.contains(Flags::PURE) && data & 0o600000 != 0o100000 {
            self.pag.fault_data |= 0o20;
            self.pag.fault_addr = (page << 10) | (if uf { 0 } else { 0o1000000 }) | (data & 0o1777);
            self.its_fault_common();
            return None;
        }

        // 2-bit access field: none / read / read-execute / read-write
        let acc = data & 0o600000;
        if acc == 0 || (wr && acc != 0o600000) {
            match acc >> 15 {
                0 => self.pag.fault_data |= 0o010,
                1 => self.pag.fault_data |= 0o100,
                2 => self.pag.fault_data |= 0o040,
                _ => {}
            }
            return self.its_fault(page, uf, data, wr);
        }
        Some(loc)
    }

    fn its_fault(&mut self, page: u32, uf: bool, data: u32, _wr: bool) -> Option<u32> {
        self.pag.fault_addr = page | (if uf { 0o400 } else { 0 }) | ((data & 0o777) << 9);
        self.its_fault_common();
        debug!(target: "kx10::pag",
               "its fault page {:04o} entry {:06o} data {:06o}",
               page, self.pag.fault_addr, self.pag.fault_data);
        None
    }

    fn its_fault_common(&mut self) {
        if self.xct_flag & 0o10 != 0 {
            // XCTR fault-skip option: step past the failed instruction
            self.pc = (self.pc + 1) & RMASK as u32;
        } else {
            self.apr.mem_prot = true;
            self.pag.fault_data |= 0o1000;
        }
    }

    /// One step of the BBN chase; returns the raw table word
    fn bbn_table_word(&mut self, base: u32, idx: u32) -> u64 {
        self.mem.read((base + idx) as usize).unwrap_or(0)
    }

    fn bbn_lookup(
        &mut self,
        addr: u32,
        flag: bool,
        mut wr: bool,
        cur_context: bool,
        fetch: bool,
    ) -> Option<u32> {
        if self.pag.page_fault {
            return None;
        }
        if !self.pag.page_enable {
            return Some(addr);
        }
        wr |= self.modify;

        let mut uf = self.flags.contains(Flags::USER);
        // UMOVE-class opcodes always reference user space
        if self.ir & 0o774 == 0o100 && !self.flags.contains(Flags::EXJSYS) {
            uf = true;
        }
        if flag {
            uf = false;
        } else if !self.flags.contains(Flags::EXJSYS) && self.xct_flag != 0 {
            let x = self.xct_flag;
            if x & 0o10 != 0 && cur_context {
                uf = true;
            }
            if x & 0o4 != 0 && !wr {
                uf = true;
            }
            if x & 0o2 != 0 && self.byf5 {
                uf = true;
            }
            if x & 0o1 != 0 && wr {
                uf = true;
            }
        }

        // Executive references to the user's accumulators go to the
        // shadow block instead
        let mut addr = addr;
        if uf && !self.flags.contains(Flags::USER) && addr < 0o20 {
            addr |= 0o775000 | (self.pag.ac_base << 4);
            uf = false;
        }

        let vpage = (addr & RMASK as u32) >> 9;
        let mut base;
        let cached = if uf {
            if vpage > self.pag.user_limit {
                self.pag.fault_data = 0o401000;
                return self.bbn_fault(addr, wr, fetch, cur_context);
            }
            base = self.pag.user_base_reg;
            self.pag.u_tlb[vpage as usize]
        } else {
            if vpage & 0o700 == 0 && !self.pag.exec_map {
                return Some(addr);
            }
            base = if vpage & 0o600 == 0o600 {
                self.pag.mon_base_reg
            } else {
                0o3000
            };
            self.pag.e_tlb[vpage as usize]
        };

        let mut tlb_data = cached;
        if tlb_data == 0 {
            let mut idx = vpage;
            let mut traps = FMASK;
            let mut lvl = 0;
            loop {
                let data = self.bbn_table_word(base, idx);
                match (data >> 33) & 3 {
                    0 => {
                        // Private page: physical page and access grants
                        traps &= data | !BBN_MERGE;
                        tlb_data = (((data & (BBN_EXEC | BBN_WRITE | BBN_READ)) >> 16)
                            | (data & BBN_PAGE)) as u32;
                    }
                    1 => {
                        // Shared page: chase the shared-pointer table
                        if lvl == 2 {
                            self.pag.fault_data = 0o201000;
                            return self.bbn_fault(addr, wr, fetch, cur_context);
                        }
                        traps &= data | !BBN_MERGE;
                        idx = ((data & BBN_SPT_IDX) >> 9) as u32;
                        base = BBN_SPT_BASE;
                        lvl += 1;
                        continue;
                    }
                    2 => {
                        // Indirect: another process's table via the SPT
                        if lvl == 2 {
                            self.pag.fault_data = 0o201000;
                            return self.bbn_fault(addr, wr, fetch, cur_context);
                        }
                        traps &= data | !BBN_MERGE;
                        base = BBN_SPT_BASE + ((data & BBN_SPT_IDX) >> 9) as u32;
                        idx = (data & BBN_PN) as u32;
                        lvl += 1;
                        continue;
                    }
                    _ => {
                        self.pag.fault_data =
                            (if lvl != 0 { 0o200000 } else { 0 }) | 0o401000;
                        return self.bbn_fault(addr, wr, fetch, cur_context);
                    }
                }
                break;
            }
            let in_chain = lvl != 0;
            // Merged trap bits decide before the entry is cached
            if wr && traps & BBN_TRPMOD != 0 {
                self.pag.fault_data = (if in_chain { 0o200000 } else { 0 }) | 0o440000;
                return self.bbn_fault(addr, wr, fetch, cur_context);
            }
            if traps & BBN_TRPUSR != 0 {
                self.pag.fault_data = (if in_chain { 0o200000 } else { 0 }) | 0o420000;
                return self.bbn_fault(addr, wr, fetch, cur_context);
            }
            if traps & BBN_ACC == 0 || traps & BBN_TRPPG == BBN_TRPPG {
                self.pag.fault_data = (if in_chain { 0o200000 } else { 0 }) | 0o410000;
                return self.bbn_fault(addr, wr, fetch, cur_context);
            }
            // Core-status update: age check, modified bit, use register
            let cst = (BBN_CST_BASE + (tlb_data & 0o3777)) as usize;
            let mut data = self.mem.read(cst).unwrap_or(0);
            if data & 0o700_000_000_000 == 0 {
                self.pag.fault_data = 0o100000 >> ((data >> 31) & 3);
                return self.bbn_fault(addr, wr, fetch, cur_context);
            }
            data &= !0o777_000_000_000;
            if wr {
                data |= 0o400_000_000;
            }
            data |= self.pag.pur;
            self.mem.write(cst, data);
            if uf {
                self.pag.u_tlb[vpage as usize] = tlb_data;
            } else {
                self.pag.e_tlb[vpage as usize] = tlb_data;
            }
        }

        let loc = ((tlb_data & 0o3777) << 9) + (addr & 0o777);
        if wr && tlb_data & 0o200000 == 0 {
            self.pag.fault_data = 0o402000;
            return self.bbn_fault(addr, wr, fetch, cur_context);
        }
        if fetch && tlb_data & 0o100000 == 0 {
            self.pag.fault_data = 0o404000;
            return self.bbn_fault(addr, wr, fetch, cur_context);
        }
        if tlb_data & 0o400000 == 0 {
            self.pag.fault_data = 0o404000;
            return self.bbn_fault(addr, wr, fetch, cur_context);
        }
        Some(loc)
    }

    /// Latch a BBN fault: context bits merge into the status word,
    /// which lands in the process storage block alongside the address
    fn bbn_fault(&mut self, addr: u32, wr: bool, fetch: bool, cur_context: bool) -> Option<u32> {
        if !self.flags.contains(Flags::USER) {
            self.pag.fault_data |= 0o1;
        }
        if fetch {
            self.pag.fault_data |= 0o2;
        }
        if wr {
            self.pag.fault_data |= 0o4;
        } else {
            self.pag.fault_data |= 0o10;
        }
        if cur_context {
            self.pag.fault_data |= 0o20;
        }
        if self.uuo_cycle {
            self.pag.fault_data |= 0o40;
        }
        self.pag.page_fault = true;
        debug!(target: "kx10::pag", "bbn fault {:06o} -> {:06o}", addr, self.pag.fault_data);

        // Find the process storage block through the monitor map and
        // record the fault status there
        if let Some(psb) = self.bbn_psb_page() {
            let status = (self.pag.fault_data << 18) | (addr as u64 & RMASK);
            self.mem.write((((psb & 0o3777) << 9) | 0o571) as usize, status);
            if wr {
                let mb = self.mb;
                self.mem.write((((psb & 0o3777) << 9) | 0o572) as usize, mb);
            }
        }
        None
    }

    /// Physical page of the process storage block (monitor page 777)
    fn bbn_psb_page(&mut self) -> Option<u32> {
        let cached = self.pag.e_tlb[0o777];
        if cached != 0 {
            return Some(cached);
        }
        let data = self.bbn_table_word(self.pag.mon_base_reg, 0o777);
        match (data >> 33) & 3 {
            0 => Some((data & BBN_PAGE) as u32),
            _ => None,
        }
    }
}
