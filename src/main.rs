//! KX10 - PDP-6/KA10/KI10 simulator
//!
//! Command-line entry point: build the configured machine, load an
//! image if one was named, then either run it directly or hand the
//! operator the console.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use kx10::config::{CpuModel, MachineConfig, PagingMode};
use kx10::console::Console;
use kx10::loader::{self, ImageFormat};
use kx10::machine::Machine;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    Pdp6,
    Ka10,
    Ki10,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PagingArg {
    Oneseg,
    Twoseg,
    Its,
    Bbn,
    Ki,
}

#[derive(Parser, Debug)]
#[command(name = "kx10", about = "PDP-6 / KA10 / KI10 simulator")]
struct Args {
    /// Bootable image (RIM, SAV or EXE)
    image: Option<PathBuf>,

    /// Force RIM format
    #[arg(short = 'r', conflicts_with_all = ["sav", "exe"])]
    rim: bool,

    /// Force SAV format
    #[arg(short = 's', conflicts_with_all = ["rim", "exe"])]
    sav: bool,

    /// Force EXE format
    #[arg(short = 'e', conflicts_with_all = ["rim", "sav"])]
    exe: bool,

    /// Processor model
    #[arg(long, value_enum, default_value = "ka10")]
    model: ModelArg,

    /// Address-translation variant (defaults to the model's usual one)
    #[arg(long, value_enum)]
    paging: Option<PagingArg>,

    /// Memory size in K words (multiple of 16)
    #[arg(long)]
    mem: Option<usize>,

    /// Instruction history length (64-500000, 0 off)
    #[arg(long, default_value_t = 0)]
    history: usize,

    /// Start running immediately instead of entering the console
    #[arg(long)]
    go: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let model = match args.model {
        ModelArg::Pdp6 => CpuModel::Pdp6,
        ModelArg::Ka10 => CpuModel::Ka10,
        ModelArg::Ki10 => CpuModel::Ki10,
    };
    let paging = match args.paging {
        Some(PagingArg::Oneseg) => PagingMode::OneSeg,
        Some(PagingArg::Twoseg) => PagingMode::TwoSeg,
        Some(PagingArg::Its) => PagingMode::Its,
        Some(PagingArg::Bbn) => PagingMode::Bbn,
        Some(PagingArg::Ki) => PagingMode::KiPage,
        None => match model {
            CpuModel::Pdp6 => PagingMode::OneSeg,
            CpuModel::Ka10 => PagingMode::TwoSeg,
            CpuModel::Ki10 => PagingMode::KiPage,
        },
    };
    let cfg = MachineConfig {
        model,
        paging,
        mem_k: args.mem.unwrap_or(match model {
            CpuModel::Ki10 => 512,
            _ => 256,
        }),
        history: args.history,
    };
    let mut machine = Machine::new(&cfg).context("bad machine configuration")?;

    if let Some(ref image) = args.image {
        let fmt = if args.rim {
            Some(ImageFormat::Rim)
        } else if args.sav {
            Some(ImageFormat::Sav)
        } else if args.exe {
            Some(ImageFormat::Exe)
        } else {
            None
        };
        loader::load_file(&mut machine, image, fmt)
            .with_context(|| format!("loading {}", image.display()))?;
        println!("loaded {}, start {:06o}", image.display(), machine.cpu.pc);
    } else if args.go {
        bail!("--go needs an image to run");
    }

    if args.go {
        let stop = machine.run();
        println!("stopped: {:?} at PC={:06o}", stop, machine.cpu.pc);
        return Ok(());
    }

    Console::new(machine).run_loop()?;
    Ok(())
}
