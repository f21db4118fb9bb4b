//! Main instruction cycle
//!
//! One call to [`Cpu::cycle`] is one pass through the interpreter: an
//! event-queue drain when the interval counter has run out, an
//! instruction fetch (or a trap/interrupt vector fetch), the
//! effective-address chain, the data-driven operand staging, the
//! opcode body, the store-back, and the epilogue that turns latched
//! faults into trap sequences and dismisses interrupt cycles.
//!
//! Multi-phase instructions (the byte group, DMOVEM) leave
//! `f_inst_fetch`/`f_load_pc` clear so the next pass continues where
//! they stopped; the observable suspension points are exactly the
//! event drain and the instruction boundary.

use crate::config::{CpuModel, PagingMode};
use crate::cpu::dispatch::{self, OP_FLAGS, OP_JRST};
use crate::cpu::execute;
use crate::cpu::state::{Cpu, Flags, StopReason, IND_LIMIT};
use crate::devices::DeviceBus;
use crate::events::EventTarget;
use crate::history::{HistEntry, HIST_PC, HIST_PC2};
use crate::word::{swap, FMASK, RMASK};

impl Cpu {
    /// Run until something stops the machine
    pub fn run(&mut self, bus: &mut DeviceBus) -> StopReason {
        loop {
            if let Err(stop) = self.cycle(bus) {
                return stop;
            }
        }
    }

    /// Execute `n` instructions (interrupt cycles do not count), or
    /// stop early for any other reason
    pub fn step_n(&mut self, bus: &mut DeviceBus, n: u64) -> StopReason {
        self.step_limit = n;
        let r = self.run(bus);
        self.step_limit = 0;
        r
    }

    /// Drain every due event, then rearm the interval counter
    pub fn drain_events(&mut self, bus: &mut DeviceBus) {
        while let Some(target) = self.events.next_due() {
            match target {
                EventTarget::Clock => self.rtc_service(),
                EventTarget::Device(dev) => bus.service(self, dev),
            }
        }
        self.interval = self
            .events
            .until_next()
            .unwrap_or(crate::cpu::state::RTC_QUANTUM) as i64;
    }

    /// Enter an interrupt cycle at the vector for the level the last
    /// scan selected; fetches and decodes the vector instruction
    fn grant_interrupt(&mut self, bus: &mut DeviceBus) -> Result<(), ()> {
        self.set_pi_hold();
        self.pi_cycle = true;
        self.pi_rq = false;
        self.pi.hold = false;
        self.pi.ov = false;
        let base = 0o40 | (self.pi.enc << 1);
        if self.model == CpuModel::Ki10 {
            self.xct_flag = 0;
            let vec = bus.ki_vector(self, self.pi.enc, base);
            self.ab = vec | self.pag.eb_ptr;
            if self.mem_read_nopage().is_err() {
                return Err(());
            }
        } else {
            self.ab = base;
            if self.mem_read(true, false, true).is_err() {
                return Err(());
            }
        }
        self.decode();
        Ok(())
    }

    /// Latch opcode and AC fields from MB
    fn decode(&mut self) {
        self.ir = ((self.mb >> 27) & 0o777) as u32;
        self.ac = ((self.mb >> 23) & 0o17) as u32;
        self.iw = self.mb;
        self.byf5 = false;
    }

    /// One interpreter pass
    pub fn cycle(&mut self, bus: &mut DeviceBus) -> Result<(), StopReason> {
        if self.interval <= 0 {
            self.drain_events(bus);
        }

        if self.f_inst_fetch && self.f_load_pc && self.breakpoints.contains(&self.pc) {
            if self.brk_skip != Some(self.pc) {
                self.brk_skip = Some(self.pc);
                return Err(StopReason::Breakpoint);
            }
        }
        self.brk_skip = None;

        self.check_apr_irq();

        if self.f_load_pc {
            if self.pag.mode == PagingMode::Its && self.one_p_arm {
                self.pag.fault_data |= 0o2000;
                self.apr.mem_prot = true;
                self.one_p_arm = false;
            }
            self.modify = false;
            self.xct_flag = 0;
            self.trap_flag = 0;
            self.ab = self.pc;
            self.uuo_cycle = false;
            self.f_pc_inh = false;
        }

        let mut decoded = false;
        let mut ia = self.ab;
        'instruction: loop {
            if !decoded {
                if self.f_inst_fetch {
                    if let Some(pa) = self.nopage_fetch.take() {
                        self.ab = pa;
                        if self.mem_read_nopage().is_err() {
                            return self.epilogue(bus);
                        }
                    } else if self.mem_read(self.pi_cycle || self.uuo_cycle, true, true).is_err() {
                        if self.check_irq_level() {
                            if self.grant_interrupt(bus).is_err() {
                                return self.epilogue(bus);
                            }
                            decoded = true;
                            ia = self.ab;
                            continue 'instruction;
                        }
                        return self.epilogue(bus);
                    }
                    self.decode();
                    ia = self.ab;
                }
                decoded = true;

                // Armed KI traps hijack the next instruction
                if self.has_traps()
                    && self.pag.page_enable
                    && self.trap_flag == 0
                    && self.flags.intersects(Flags::TRP1 | Flags::TRP2)
                {
                    let trap_bits = self.flags & (Flags::TRP1 | Flags::TRP2);
                    self.ab = 0o420 + (trap_bits.bits() >> 2);
                    self.trap_flag = trap_bits.bits();
                    self.flags -= Flags::TRP1 | Flags::TRP2;
                    self.pi_cycle = true;
                    self.ab += if self.is_user() {
                        self.pag.ub_ptr
                    } else {
                        self.pag.eb_ptr
                    };
                    if self.mem_read_nopage().is_err() {
                        return self.epilogue(bus);
                    }
                    self.decode();
                    ia = self.ab;
                }
            }

            // Effective address: index then indirect, repeated. An
            // interrupt arriving mid-chain aborts before any
            // architectural state changes.
            let mut ind_count = 0u32;
            loop {
                if !self.pi_cycle
                    && self.pi.pending
                    && !(self.has_traps() && self.trap_flag != 0)
                {
                    self.pi_rq = self.check_irq_level();
                }
                let ind = self.mb & 0o20_000_000 != 0;
                self.ar = self.mb;
                self.ab = (self.mb & RMASK) as u32;
                if self.mb & 0o17_000_000 != 0 {
                    let xr = ((self.mb >> 18) & 0o17) as u32;
                    self.mb = (self.ab as u64 + self.get_reg(xr)) & FMASK;
                    self.ar = self.mb;
                    self.ab = (self.mb & RMASK) as u32;
                }
                if self.ir != OP_JRST {
                    self.ar &= RMASK;
                }
                if ind && !self.pi_rq {
                    ind_count += 1;
                    if ind_count > IND_LIMIT {
                        return Err(StopReason::IndirectLoop);
                    }
                    if self
                        .mem_read(self.pi_cycle || self.uuo_cycle, true, false)
                        .is_err()
                    {
                        return self.epilogue(bus);
                    }
                }
                self.count_cycle();
                if self.interval <= 0 {
                    self.drain_events(bus);
                }
                if !(ind && !self.pi_rq) {
                    break;
                }
            }

            if self.pi_rq {
                if self.grant_interrupt(bus).is_err() {
                    return self.epilogue(bus);
                }
                ia = self.ab;
                continue 'instruction;
            }
            break;
        }

        // A fault taken during the address chain
        if self.has_traps() && self.pag.page_enable && self.pag.page_fault {
            if !self.f_pc_inh && !self.pi_cycle {
                self.pc = (self.pc + 1) & RMASK as u32;
            }
            return self.epilogue(bus);
        }

        if self.pag.mode == PagingMode::Its && !self.pi_cycle {
            self.pag.opc = (self.pc as u64) | ((self.flags.bits() as u64) << 18);
            if !self.f_pc_inh && self.flags.contains(Flags::ONEP) {
                self.one_p_arm = true;
                self.flags -= Flags::ONEP;
            }
        }

        if self.hist.enabled() {
            self.hist.push(HistEntry {
                pc: HIST_PC | if self.byf5 { HIST_PC2 | self.pc } else { ia },
                ea: self.ab,
                ir: self.iw,
                ac: self.get_reg(self.ac),
                flags: (self.flags.bits() << 5)
                    | ((self.apr.clk_flg as u32) << 2)
                    | ((self.apr.nxm_flag as u32) << 1)
                    | ((self.apr.mem_prot as u32) << 4)
                    | ((self.apr.push_ovf as u32) << 3),
                mb: 0,
                result: 0,
            });
        }

        // Stage operands per the dispatch table
        let i_flags = OP_FLAGS[self.ir as usize];
        self.f_inst_fetch = true;
        self.f_load_pc = true;
        self.sac_inh = false;
        self.modify = false;
        self.f_pc_inh = self.trap_flag != 0;

        if i_flags & (dispatch::FCEPSE | dispatch::FCE) != 0 {
            if i_flags & dispatch::FCEPSE != 0 {
                self.modify = true;
            }
            if self.mem_read(false, false, false).is_err() {
                return self.epilogue(bus);
            }
            self.ar = self.mb;
        }
        if i_flags & dispatch::FAC != 0 {
            self.br = self.ar;
            self.ar = self.get_reg(self.ac);
        }
        if i_flags & dispatch::FBR != 0 {
            self.br = self.get_reg(self.ac);
        }
        if let Some(h) = self.hist.last_mut() {
            h.mb = self.ar;
        }
        if i_flags & dispatch::FAC2 != 0 {
            self.mq = self.get_reg(self.ac + 1);
        } else if !self.byf5 {
            self.mq = 0;
        }
        if i_flags & dispatch::SWAR != 0 {
            self.ar = swap(self.ar);
        }

        // Opcode body; a failed memory cycle skips the store-back
        let body = execute::execute(self, bus);

        if body.is_ok() {
            self.ar &= FMASK;
            if !self.sac_inh && i_flags & (dispatch::SCE | dispatch::FCEPSE) != 0 {
                self.mb = self.ar;
                if self.mem_write(false, false).is_err() {
                    return self.epilogue(bus);
                }
            }
            if !self.sac_inh
                && (i_flags & dispatch::SAC != 0
                    || (i_flags & dispatch::SACZ != 0 && self.ac != 0))
            {
                let ar = self.ar;
                self.set_reg(self.ac, ar);
            }
            if !self.sac_inh && i_flags & dispatch::SAC2 != 0 {
                self.mq &= FMASK;
                let mq = self.mq;
                self.set_reg(self.ac + 1, mq);
            }
            if let Some(h) = self.hist.last_mut() {
                h.result = self.ar;
            }
        }

        self.epilogue(bus)
    }

    /// Instruction epilogue: fault traps, PC increment, interrupt
    /// dismissal, stop latching, step accounting
    fn epilogue(&mut self, _bus: &mut DeviceBus) -> Result<(), StopReason> {
        // BBN faults trap through executive 070
        if self.pag.mode == PagingMode::Bbn && self.pag.page_fault {
            self.pag.page_fault = false;
            self.ab = 0o70;
            self.f_pc_inh = true;
            self.pi_cycle = true;
            self.f_load_pc = false;
            self.f_inst_fetch = true;
            return Ok(());
        }

        // KI page faults record the fault word and trap through the
        // model's vector with the PC still at the faulting instruction
        if self.has_traps() && self.pag.page_enable && self.pag.page_fault {
            self.pag.page_fault = false;
            self.ab = self.pag.ub_ptr + if self.is_user() { 0o427 } else { 0o426 };
            self.mb = self.pag.fault_data;
            let _ = self.mem_write_nopage();
            self.flags |= Flags::from_bits_truncate(self.trap_flag) & (Flags::TRP1 | Flags::TRP2);
            self.trap_flag = 1;
            self.f_pc_inh = true;
            self.pi_cycle = true;
            let vec = 0o420
                + if self.is_user() {
                    self.pag.ub_ptr
                } else {
                    self.pag.eb_ptr
                };
            self.nopage_fetch = Some(vec);
            self.f_load_pc = false;
            self.f_inst_fetch = true;
            return Ok(());
        }

        if !self.f_pc_inh && !self.pi_cycle {
            self.pc = (self.pc + 1) & RMASK as u32;
        }

        // Dismiss or continue an interrupt cycle
        if self.pi_cycle {
            if self.ir & 0o700 == 0o700 && self.ac & 0o4 == 0 {
                // Block-mode I/O holds the level while its pointer
                // still has words to move
                self.pi.hold = self.pi.ov;
                if !self.pi.hold && self.f_inst_fetch {
                    self.pi.restore = true;
                    self.pi_cycle = false;
                } else {
                    self.refetch_vector();
                }
            } else if self.pi.hold {
                self.refetch_vector();
            } else {
                self.f_inst_fetch = true;
                self.f_load_pc = true;
                self.pi_cycle = false;
            }
        }

        if self.pi.restore {
            self.restore_pi_hold();
            self.pi.restore = false;
        }
        self.count_cycle();

        if let Some(stop) = self.pending_stop.take() {
            return Err(stop);
        }
        if !self.pi_cycle {
            self.instr_count += 1;
            if self.step_limit != 0 {
                self.step_limit -= 1;
                if self.step_limit == 0 {
                    return Err(StopReason::StepDone);
                }
            }
        }
        Ok(())
    }

    /// Re-enter the interrupt vector, advanced to its second word when
    /// a BLKI/BLKO count ran out
    fn refetch_vector(&mut self) {
        let ab = 0o40 | (self.pi.enc << 1) | (self.pi.ov as u32);
        self.pi.ov = false;
        self.pi.hold = false;
        if self.model == CpuModel::Ki10 {
            self.nopage_fetch = Some(ab | self.pag.eb_ptr);
        } else {
            self.ab = ab;
        }
        self.f_load_pc = false;
        self.f_inst_fetch = true;
    }

    /// Pointer double-increment; the KI wraps the halves independently
    #[inline(always)]
    pub fn aob_w(&self, x: u64) -> u64 {
        if self.model == CpuModel::Ki10 {
            crate::word::aob_ki(x)
        } else {
            crate::word::aob(x)
        }
    }

    /// Pointer double-decrement
    #[inline(always)]
    pub fn sob_w(&self, x: u64) -> u64 {
        if self.model == CpuModel::Ki10 {
            crate::word::sob_ki(x)
        } else {
            crate::word::sob(x)
        }
    }

    /// ITS keeps the address of the last jump for its debugger
    #[inline(always)]
    pub fn its_jump(&mut self) {
        if self.pag.mode == PagingMode::Its && self.is_user() {
            self.pag.jpc = self.pc;
        }
    }
}
