//! Operator console
//!
//! A line-command loop over the machine: examine and deposit memory,
//! set breakpoints, load images, run and single-step. Numbers are
//! octal, as the front panel would have them. Architectural state is
//! preserved across every stop, so a halted machine can be inspected
//! and continued freely.

use crate::cpu::state::StopReason;
use crate::loader::{self, ImageFormat};
use crate::machine::Machine;
use std::io::{self, BufRead, Write};
use std::path::Path;

/// Outcome of one console command
enum Action {
    Continue,
    Quit,
}

pub struct Console {
    m: Machine,
}

impl Console {
    pub fn new(m: Machine) -> Self {
        Self { m }
    }

    /// Read commands until quit or end of input
    pub fn run_loop(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let mut out = io::stdout();
        loop {
            write!(out, "kx10> ")?;
            out.flush()?;
            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                return Ok(());
            }
            match self.command(line.trim(), &mut out)? {
                Action::Continue => {}
                Action::Quit => return Ok(()),
            }
        }
    }

    fn command(&mut self, line: &str, out: &mut dyn Write) -> io::Result<Action> {
        let mut words = line.split_whitespace();
        let cmd = match words.next() {
            Some(c) => c,
            None => return Ok(Action::Continue),
        };
        let args: Vec<&str> = words.collect();
        match cmd {
            "ex" | "examine" => self.cmd_examine(&args, out)?,
            "dep" | "deposit" => self.cmd_deposit(&args, out)?,
            "run" | "go" => {
                if let Some(a) = args.first().and_then(|s| octal(s)) {
                    self.m.cpu.pc = a as u32;
                }
                let stop = self.m.run();
                self.report_stop(stop, out)?;
            }
            "cont" | "c" => {
                let stop = self.m.run();
                self.report_stop(stop, out)?;
            }
            "step" | "s" => {
                let n = args.first().and_then(|s| octal(s)).unwrap_or(1);
                let stop = self.m.step(n);
                self.report_stop(stop, out)?;
                self.cmd_regs(out)?;
            }
            "break" | "br" => {
                if let Some(a) = args.first().and_then(|s| octal(s)) {
                    self.m.cpu.breakpoints.insert(a as u32);
                } else {
                    for bp in &self.m.cpu.breakpoints {
                        writeln!(out, "break {:06o}", bp)?;
                    }
                }
            }
            "nobreak" => {
                if let Some(a) = args.first().and_then(|s| octal(s)) {
                    self.m.cpu.breakpoints.remove(&(a as u32));
                }
            }
            "load" => self.cmd_load(&args, out)?,
            "regs" | "r" => self.cmd_regs(out)?,
            "hist" => self.cmd_hist(&args, out)?,
            "set" => self.cmd_set(&args, out)?,
            "reset" => self.m.reset(),
            "quit" | "exit" | "q" => return Ok(Action::Quit),
            "help" | "?" => self.cmd_help(out)?,
            _ => writeln!(out, "unknown command '{}'; try help", cmd)?,
        }
        Ok(Action::Continue)
    }

    fn cmd_examine(&self, args: &[&str], out: &mut dyn Write) -> io::Result<()> {
        let range = args.first().copied().unwrap_or("0");
        let (lo, hi) = match range.split_once('-') {
            Some((a, b)) => match (octal(a), octal(b)) {
                (Some(a), Some(b)) => (a, b),
                _ => return writeln!(out, "bad address range"),
            },
            None => match octal(range) {
                Some(a) => (a, a),
                None => return writeln!(out, "bad address"),
            },
        };
        for addr in lo..=hi {
            writeln!(out, "{:06o}: {:012o}", addr, self.m.examine(addr as u32))?;
        }
        Ok(())
    }

    fn cmd_deposit(&mut self, args: &[&str], out: &mut dyn Write) -> io::Result<()> {
        match (
            args.first().and_then(|s| octal(s)),
            args.get(1).and_then(|s| octal(s)),
        ) {
            (Some(addr), Some(val)) => {
                self.m.deposit(addr as u32, val);
                Ok(())
            }
            _ => writeln!(out, "usage: dep addr value"),
        }
    }

    fn cmd_load(&mut self, args: &[&str], out: &mut dyn Write) -> io::Result<()> {
        let mut fmt = None;
        let mut path = None;
        for a in args {
            match *a {
                "-r" => fmt = Some(ImageFormat::Rim),
                "-s" => fmt = Some(ImageFormat::Sav),
                "-e" => fmt = Some(ImageFormat::Exe),
                p => path = Some(p),
            }
        }
        match path {
            Some(p) => match loader::load_file(&mut self.m, Path::new(p), fmt) {
                Ok(()) => writeln!(out, "loaded {}, start {:06o}", p, self.m.cpu.pc),
                Err(e) => writeln!(out, "load failed: {}", e),
            },
            None => writeln!(out, "usage: load [-r|-s|-e] file"),
        }
    }

    fn cmd_regs(&self, out: &mut dyn Write) -> io::Result<()> {
        let c = &self.m.cpu;
        writeln!(
            out,
            "PC={:06o} FLAGS={:06o} instr={}",
            c.pc,
            c.flags.bits(),
            c.instr_count
        )?;
        for i in 0..16 {
            write!(out, "AC{:02o}={:012o} ", i, c.get_reg(i))?;
            if i % 4 == 3 {
                writeln!(out)?;
            }
        }
        Ok(())
    }

    fn cmd_hist(&self, args: &[&str], out: &mut dyn Write) -> io::Result<()> {
        let want = args.first().and_then(|s| octal(s)).unwrap_or(u64::MAX) as usize;
        let total = self.m.cpu.hist.iter().count();
        for e in self.m.cpu.hist.iter().skip(total.saturating_sub(want)) {
            writeln!(
                out,
                "{:06o} ea={:06o} ir={:012o} ac={:012o} -> {:012o}",
                e.pc & 0o777777,
                e.ea,
                e.ir,
                e.ac,
                e.result
            )?;
        }
        Ok(())
    }

    fn cmd_set(&mut self, args: &[&str], out: &mut dyn Write) -> io::Result<()> {
        match (args.first().copied(), args.get(1).and_then(|s| octal(s))) {
            (Some("history"), Some(n)) => {
                self.m.cpu.hist.set_length(n as usize);
                Ok(())
            }
            (Some("sw"), Some(v)) => {
                self.m.cpu.sw = v;
                Ok(())
            }
            (Some("pc"), Some(v)) => {
                self.m.cpu.pc = v as u32 & 0o777777;
                Ok(())
            }
            _ => writeln!(out, "usage: set history|sw|pc value"),
        }
    }

    fn report_stop(&self, stop: StopReason, out: &mut dyn Write) -> io::Result<()> {
        let what = match stop {
            StopReason::Halt => "HALT",
            StopReason::Breakpoint => "breakpoint",
            StopReason::IndirectLoop => "indirect chain limit",
            StopReason::StepDone => "step",
        };
        writeln!(out, "{} at PC={:06o}", what, self.m.cpu.pc)
    }

    fn cmd_help(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "commands (numbers in octal):\n\
             \x20 ex addr[-addr]      examine memory\n\
             \x20 dep addr value      deposit memory\n\
             \x20 load [-r|-s|-e] f   load a RIM/SAV/EXE image\n\
             \x20 run [addr]          run (optionally from addr)\n\
             \x20 cont                continue from the last stop\n\
             \x20 step [n]            execute n instructions\n\
             \x20 break addr          set a fetch breakpoint\n\
             \x20 nobreak addr        clear a breakpoint\n\
             \x20 regs                show PC, flags, accumulators\n\
             \x20 hist [n]            show instruction history\n\
             \x20 set history|sw|pc v change a setting\n\
             \x20 reset               master reset\n\
             \x20 quit"
        )
    }
}

/// Octal number parse, the console's native radix
fn octal(s: &str) -> Option<u64> {
    u64::from_str_radix(s, 8).ok()
}
