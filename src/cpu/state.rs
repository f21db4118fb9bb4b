//! Machine state and memory access paths
//!
//! All processor state the original kept as process-wide statics lives
//! in one owned [`Cpu`] value: the working registers the microcode
//! exposed (AR, BR, MQ, MB, AB), the program counter and flags, the
//! fast-register file, the priority-interrupt and pager state, and the
//! event queue that drives device progress. Test harnesses construct
//! machines freely; nothing is global.
//!
//! Memory is reached only through `mem_read`/`mem_write` (paged, with
//! the fast-register window below 020) and their `_nopage` physical
//! variants used by interrupt and trap cycles. Every store from the
//! CPU or the DF10 engine funnels through [`Memory::write`], so DMA
//! and CPU visibility is a matter of event ordering alone.

use crate::config::{CpuModel, MachineConfig, PagingMode};
use crate::events::{EventQueue, EventTarget};
use crate::history::History;
use crate::memory::Memory;
use crate::paging::Pager;
use bitflags::bitflags;
use std::collections::HashSet;

use super::pi::PiSystem;

bitflags! {
    /// Processor flags, held in PC-word bits 0-12 (value bits 0-12 of
    /// this field, shifted up by 23 when packed into a word).
    ///
    /// TRP1/TRP2/ADRFLT/PUBLIC exist only on the KI10; the ITS pager
    /// reuses the same two low positions for its PURE and ONEP bits,
    /// exactly as the hardware options did.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Flags: u32 {
        const NODIV  = 0o000001;
        const FLTUND = 0o000002;
        const TRP1   = 0o000004;
        const TRP2   = 0o000010;
        const ADRFLT = 0o000020;
        const PUBLIC = 0o000040;
        /// ITS pure-procedure flag (shares the ADRFLT position)
        const PURE   = 0o000020;
        /// ITS one-proceed flag (shares the PUBLIC position)
        const ONEP   = 0o000040;
        /// BBN executive-JSYS flag (shares the PUBLIC position)
        const EXJSYS = 0o000040;
        const USERIO = 0o000100;
        const USER   = 0o000200;
        const BYTI   = 0o000400;
        const FLTOVR = 0o001000;
        const CRY1   = 0o002000;
        const CRY0   = 0o004000;
        const OVR    = 0o010000;
    }
}

/// Arithmetic-processor conditions: the sticky system flags and their
/// interrupt assignments, managed through device 000
#[derive(Debug, Default, Clone)]
pub struct Apr {
    /// PI level for APR conditions; 0 disables
    pub apr_irq: u32,
    /// PI level for the clock (the KA shares `apr_irq`)
    pub clk_irq: u32,
    /// Non-existent memory referenced
    pub nxm_flag: bool,
    /// Memory protection violation (KA)
    pub mem_prot: bool,
    /// Pushdown overflow (KA)
    pub push_ovf: bool,
    /// Clock tick latched
    pub clk_flg: bool,
    /// Clock interrupts armed
    pub clk_en: bool,
    /// Overflow trap armed (KA)
    pub ov_irq: bool,
    /// Floating-overflow trap armed (KA)
    pub fov_irq: bool,
    /// I/O failure during an interrupt cycle (KI)
    pub inout_fail: bool,
    /// Interval-timer state (KI)
    pub timer_irq: bool,
    pub timer_flg: bool,
}

/// Why the interpreter returned to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// HALT instruction in executive mode
    Halt,
    /// Fetch breakpoint hit
    Breakpoint,
    /// Indirection chain exceeded the modeling limit
    IndirectLoop,
    /// Requested step count exhausted
    StepDone,
}

/// A memory cycle failed: fault state is latched, the instruction
/// abandons its remaining work and falls through to the epilogue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemErr;

pub type MemResult = Result<(), MemErr>;

/// Nested-indirect bound; a modeling limit, not a CPU fault
pub const IND_LIMIT: u32 = 1000;

/// The processor
pub struct Cpu {
    pub model: CpuModel,
    pub mem: Memory,
    pub pag: Pager,
    pub pi: PiSystem,
    pub apr: Apr,
    pub events: EventQueue,
    pub hist: History,

    /// Primary working register
    pub ar: u64,
    /// Secondary operand
    pub br: u64,
    /// Multiplier-quotient extension of AR
    pub mq: u64,
    /// Memory buffer
    pub mb: u64,
    /// Memory address buffer
    pub ab: u32,
    /// Program counter (18 bits)
    pub pc: u32,
    /// Current opcode
    pub ir: u32,
    /// Current AC field
    pub ac: u32,
    pub flags: Flags,
    /// Console switch register
    pub sw: u64,

    /// Second half of a byte instruction in progress
    pub byf5: bool,
    /// UUO trap cycle in progress
    pub uuo_cycle: bool,
    /// Interrupt cycle in progress
    pub pi_cycle: bool,
    /// Next cycle keeps AB instead of loading it from PC
    pub f_load_pc: bool,
    /// Next cycle fetches a new instruction
    pub f_inst_fetch: bool,
    /// Suppress the PC increment for this instruction
    pub f_pc_inh: bool,
    /// Suppress result store-back (division by zero and friends)
    pub sac_inh: bool,
    /// Memory operand will be written back (read-modify-write cycle)
    pub modify: bool,
    /// XCT-supplied mapping context; consumed by the translator
    pub xct_flag: u32,
    /// Trap cycle bookkeeping (KI)
    pub trap_flag: u32,
    /// An interrupt became pending during this cycle's address work
    pub pi_rq: bool,
    /// Physical fetch address for the next cycle (trap/UUO vectors)
    pub nopage_fetch: Option<u32>,
    /// ITS one-proceed armed for the next instruction
    pub one_p_arm: bool,
    /// Stop latched by the executing instruction (HALT)
    pub pending_stop: Option<StopReason>,
    /// Raw instruction word, kept for the history ring
    pub iw: u64,
    /// Shift count latched across the two phases of a byte instruction
    pub sc: u32,
    /// Breakpoint to step over on resume
    pub brk_skip: Option<u32>,

    /// Ticks until the next event-queue drain
    pub interval: i64,
    /// Clock rate in ticks per second of virtual time
    pub rtc_tps: u64,
    /// Fetch breakpoints
    pub breakpoints: HashSet<u32>,

    /// Remaining instructions for a bounded run; 0 = unbounded
    pub step_limit: u64,
    /// Total instructions executed
    pub instr_count: u64,
}

/// Ticks between clock services at the default 60Hz rate
pub const RTC_QUANTUM: u64 = 10_000;

impl Cpu {
    pub fn new(cfg: &MachineConfig) -> Self {
        let mut hist = History::new();
        if cfg.history != 0 {
            hist.set_length(cfg.history);
        }
        let mut cpu = Self {
            model: cfg.model,
            mem: Memory::new(cfg.mem_k * 1024),
            pag: Pager::new(cfg.paging),
            pi: PiSystem::new(),
            apr: Apr::default(),
            events: EventQueue::new(),
            hist,
            ar: 0,
            br: 0,
            mq: 0,
            mb: 0,
            ab: 0,
            pc: 0,
            ir: 0,
            ac: 0,
            flags: Flags::empty(),
            sw: 0,
            byf5: false,
            uuo_cycle: false,
            pi_cycle: false,
            f_load_pc: true,
            f_inst_fetch: true,
            f_pc_inh: false,
            sac_inh: false,
            modify: false,
            xct_flag: 0,
            trap_flag: 0,
            pi_rq: false,
            nopage_fetch: None,
            one_p_arm: false,
            pending_stop: None,
            iw: 0,
            sc: 0,
            brk_skip: None,
            interval: RTC_QUANTUM as i64,
            rtc_tps: 60,
            breakpoints: HashSet::new(),
            step_limit: 0,
            instr_count: 0,
        };
        cpu.reset();
        cpu
    }

    /// Power-on reset: clears flags, PI state, pager registers and the
    /// pending event queue, then schedules the first clock service
    pub fn reset(&mut self) {
        self.byf5 = false;
        self.uuo_cycle = false;
        self.pi_cycle = false;
        self.f_load_pc = true;
        self.f_inst_fetch = true;
        self.f_pc_inh = false;
        self.modify = false;
        self.xct_flag = 0;
        self.trap_flag = 0;
        self.pi_rq = false;
        self.nopage_fetch = None;
        self.one_p_arm = false;
        self.pending_stop = None;
        self.flags = Flags::empty();
        self.apr = Apr::default();
        self.pi.reset();
        self.pag.reset();
        self.mem.fm_sel = 0;
        self.events.clear();
        self.events.schedule(EventTarget::Clock, RTC_QUANTUM);
        self.interval = RTC_QUANTUM as i64;
    }

    /// True when the KI trap flags are architecturally present
    #[inline(always)]
    pub fn has_traps(&self) -> bool {
        self.model == CpuModel::Ki10
    }

    /// Set TRP1 with overflow, where the model latches traps
    #[inline(always)]
    pub fn set_trap1(&mut self) {
        if self.has_traps() && !self.pi_cycle {
            self.flags |= Flags::TRP1;
        }
    }

    /// Set TRP2 (stack overflow) where the model latches traps;
    /// the KA raises the pushdown-overflow APR condition instead
    pub fn set_trap2(&mut self) {
        if self.has_traps() {
            if !self.pi_cycle {
                self.flags |= Flags::TRP2;
            }
        } else {
            self.apr.push_ovf = true;
            self.check_apr_irq();
        }
    }

    /// Flags cleared when a jump saves the PC word (JSR/JSP/PUSHJ/MUUO)
    pub fn clear_save_flags(&mut self) {
        self.flags -= Flags::BYTI;
        if self.has_traps() {
            self.flags -= Flags::ADRFLT | Flags::TRP1 | Flags::TRP2;
        }
    }

    /// PC word: flags in bits 0-12, address in the right half
    #[inline(always)]
    pub fn flags_pc_word(&self, pc: u32) -> u64 {
        ((self.flags.bits() as u64) << 23) | (pc as u64 & crate::word::RMASK)
    }

    #[inline(always)]
    pub fn is_user(&self) -> bool {
        self.flags.contains(Flags::USER)
    }

    // === Accumulator access ===

    /// Read an accumulator through the current fast-memory block
    #[inline(always)]
    pub fn get_reg(&self, reg: u32) -> u64 {
        let bank = if self.model == CpuModel::Ki10 && self.is_user() {
            self.mem.fm_sel
        } else {
            0
        };
        self.mem.get_fm(bank, reg as usize)
    }

    /// Write an accumulator through the current fast-memory block
    #[inline(always)]
    pub fn set_reg(&mut self, reg: u32, value: u64) {
        let bank = if self.model == CpuModel::Ki10 && self.is_user() {
            self.mem.fm_sel
        } else {
            0
        };
        self.mem.set_fm(bank, reg as usize, value);
    }

    // === Memory cycles ===

    /// Consume one memory-cycle tick
    #[inline(always)]
    pub fn count_cycle(&mut self) {
        self.interval -= 1;
        self.events.advance(1);
    }

    /// Read physical memory at AB with no translation, honoring the
    /// fast-register window. Used by interrupt, trap and UUO cycles.
    pub fn mem_read_nopage(&mut self) -> MemResult {
        if self.ab < 0o20 {
            self.mb = self.mem.get_fm(0, self.ab as usize);
            return Ok(());
        }
        self.count_cycle();
        match self.mem.read(self.ab as usize) {
            Some(w) => {
                self.mb = w;
                Ok(())
            }
            None => {
                self.apr.nxm_flag = true;
                Err(MemErr)
            }
        }
    }

    /// Write physical memory at AB with no translation
    pub fn mem_write_nopage(&mut self) -> MemResult {
        if self.ab < 0o20 {
            self.mem.set_fm(0, self.ab as usize, self.mb);
            return Ok(());
        }
        self.count_cycle();
        if self.mem.write(self.ab as usize, self.mb) {
            Ok(())
        } else {
            self.apr.nxm_flag = true;
            Err(MemErr)
        }
    }

    /// Read the word at AB into MB through the current mapping.
    ///
    /// `flag` marks interrupt/UUO cycles, which always use the
    /// executive map. `cur_context` pins the access to the current
    /// context, ignoring any XCT override. `fetch` marks instruction
    /// fetches for the translators that care.
    pub fn mem_read(&mut self, flag: bool, cur_context: bool, fetch: bool) -> MemResult {
        if self.ab < 0o20 {
            if let Some(redirect) = self.ac_ref_redirect(false, cur_context) {
                match redirect {
                    AcRedirect::Stack(loc) => {
                        self.count_cycle();
                        match self.mem.read(loc) {
                            Some(w) => {
                                self.mb = w;
                                return Ok(());
                            }
                            None => {
                                self.apr.nxm_flag = true;
                                return Err(MemErr);
                            }
                        }
                    }
                    AcRedirect::Bank(bank) => {
                        self.mb = self.mem.get_fm(bank, self.ab as usize);
                        return Ok(());
                    }
                    AcRedirect::Paged => {} // fall through to translation
                }
            } else {
                self.mb = self.get_reg(self.ab);
                return Ok(());
            }
        }
        self.count_cycle();
        let addr = match self.page_lookup(self.ab, flag, false, cur_context, fetch) {
            Some(a) => a,
            None => return Err(MemErr),
        };
        match self.mem.read(addr as usize) {
            Some(w) => {
                self.mb = w;
                Ok(())
            }
            None => {
                self.apr.nxm_flag = true;
                Err(MemErr)
            }
        }
    }

    /// Write MB to the word at AB through the current mapping
    pub fn mem_write(&mut self, flag: bool, cur_context: bool) -> MemResult {
        if self.ab < 0o20 {
            if let Some(redirect) = self.ac_ref_redirect(true, cur_context) {
                match redirect {
                    AcRedirect::Stack(loc) => {
                        self.count_cycle();
                        if self.mem.write(loc, self.mb) {
                            return Ok(());
                        }
                        self.apr.nxm_flag = true;
                        return Err(MemErr);
                    }
                    AcRedirect::Bank(bank) => {
                        self.mem.set_fm(bank, self.ab as usize, self.mb);
                        return Ok(());
                    }
                    AcRedirect::Paged => {}
                }
            } else {
                self.set_reg(self.ab, self.mb);
                return Ok(());
            }
        }
        self.count_cycle();
        let addr = match self.page_lookup(self.ab, flag, true, cur_context, false) {
            Some(a) => a,
            None => return Err(MemErr),
        };
        if self.mem.write(addr as usize, self.mb) {
            Ok(())
        } else {
            self.apr.nxm_flag = true;
            Err(MemErr)
        }
    }

    /// Where an accumulator reference under an XCT override really
    /// goes. `None` means the ordinary fast-register file.
    fn ac_ref_redirect(&self, wr: bool, cur_context: bool) -> Option<AcRedirect> {
        if self.model == CpuModel::Ki10 {
            if self.is_user() {
                return None;
            }
            let wanted = if wr {
                !cur_context
                    && (((self.xct_flag & 1) != 0 && self.modify) || (self.xct_flag & 2) != 0)
            } else {
                !cur_context && (self.xct_flag & 1) != 0
            };
            if wanted {
                if self.flags.contains(Flags::USERIO) {
                    if self.mem.fm_sel == 0 {
                        return Some(AcRedirect::Paged);
                    }
                    return Some(AcRedirect::Bank(self.mem.fm_sel));
                }
                return Some(AcRedirect::Stack(
                    (self.pag.ub_ptr + self.pag.ac_stack + self.ab) as usize,
                ));
            }
            return None;
        }
        // The ITS and BBN pagers stash the user's accumulators in an
        // executive shadow block during XCT-mapped references
        if matches!(self.pag.mode, PagingMode::Its | PagingMode::Bbn) {
            let bit = if wr { 4 } else { 2 };
            if self.xct_flag != 0
                && !cur_context
                && !self.is_user()
                && (self.xct_flag & bit) != 0
            {
                return Some(AcRedirect::Stack((self.pag.ac_stack + self.ab) as usize));
            }
        }
        None
    }

    // === Events ===

    /// Schedule a device service callback `delay` ticks out
    pub fn activate(&mut self, dev: u32, delay: u64) {
        self.events.schedule(EventTarget::Device(dev), delay);
    }

    /// Cancel a device's pending service callbacks
    pub fn deactivate(&mut self, dev: u32) {
        self.events.cancel(EventTarget::Device(dev));
    }
}

/// Resolution of an accumulator reference under an XCT override
enum AcRedirect {
    /// Read core at this physical location (AC shadow stack)
    Stack(usize),
    /// Use this fast-memory bank
    Bank(usize),
    /// Fall through to normal address translation
    Paged,
}
