//! Opcode bodies
//!
//! The operand staging and store-back around every body is data-driven
//! from the dispatch table; the bodies themselves only transform the
//! working registers, so each family lives in its own module and is
//! testable in isolation.
//!
//! Opcodes a model does not implement decode as unassigned and trap
//! exactly as the hardware's unused codes did.

pub mod boolean;
pub mod byte;
pub mod control;
pub mod dfloat;
pub mod fixed;
pub mod float;
pub mod halfword;
pub mod io;
pub mod shift;
pub mod skipjump;
pub mod stack;

use crate::config::{CpuModel, PagingMode};
use crate::cpu::state::{Cpu, MemResult};
use crate::devices::DeviceBus;

/// Run the body for the current opcode
pub(crate) fn execute(cpu: &mut Cpu, bus: &mut DeviceBus) -> MemResult {
    match cpu.ir {
        0o000 | 0o040..=0o077 => control::muuo(cpu),
        0o001..=0o037 => control::luuo(cpu),

        // 0100-0127: the second-generation block; monitor calls and
        // pager controls under ITS/BBN, doubles and conversions on the
        // KI, unassigned elsewhere
        0o100..=0o107 => match (cpu.model, cpu.pag.mode) {
            (CpuModel::Ka10, PagingMode::Its) => control::its_0100(cpu),
            (CpuModel::Ka10, PagingMode::Bbn) => control::bbn_0100(cpu),
            _ => control::unassigned(cpu),
        },
        0o110 | 0o111 if cpu.model == CpuModel::Ki10 => dfloat::dfad_dfsb(cpu),
        0o112 if cpu.model == CpuModel::Ki10 => dfloat::dfmp(cpu),
        0o113 if cpu.model == CpuModel::Ki10 => dfloat::dfdv(cpu),
        0o120 if cpu.model == CpuModel::Ki10 => dfloat::dmove(cpu),
        0o121 if cpu.model == CpuModel::Ki10 => dfloat::dmovn(cpu),
        0o124 if cpu.model == CpuModel::Ki10 => dfloat::dmovem(cpu),
        0o125 if cpu.model == CpuModel::Ki10 => dfloat::dmovnm(cpu),
        0o122 | 0o126 if cpu.model == CpuModel::Ki10 => dfloat::fix(cpu),
        0o127 if cpu.model == CpuModel::Ki10 => dfloat::fltr(cpu),
        0o110..=0o127 | 0o247 => control::unassigned(cpu),

        0o130 => float::fad(cpu), // UFA
        0o131 => float::dfn(cpu),
        0o132 => float::fsc(cpu),
        0o133 | 0o134 | 0o136 => byte::ibp_group(cpu),
        0o135 | 0o137 => byte::ldb_dpb(cpu),

        0o140..=0o147 => float::fad(cpu),
        0o150..=0o157 => float::fsb(cpu),
        0o160..=0o167 => float::fmp(cpu),
        0o170..=0o177 => float::fdv(cpu),

        // Full-word moves: the staging flags do all the work except
        // for negate and magnitude
        0o200..=0o207 | 0o503 | 0o543 => Ok(()),
        0o210..=0o217 => fixed::movn_movm(cpu),

        0o220..=0o227 => fixed::imul_mul(cpu),
        0o230..=0o233 => fixed::idiv(cpu),
        0o234..=0o237 => fixed::div(cpu),

        0o240 => shift::ash(cpu),
        0o241 => shift::rot(cpu),
        0o242 => shift::lsh(cpu),
        0o243 => shift::jffo(cpu),
        0o244 => shift::ashc(cpu),
        0o245 => shift::rotc(cpu),
        0o246 => shift::lshc(cpu),

        0o250 => skipjump::exch(cpu),
        0o251 => skipjump::blt(cpu, bus),
        0o252 | 0o253 => skipjump::aobj(cpu),
        0o254 => control::jrst(cpu),
        0o255 => control::jfcl(cpu),
        0o256 => control::xct(cpu),
        0o257 => control::map(cpu),

        0o260 => stack::pushj(cpu),
        0o261 => stack::push(cpu),
        0o262 => stack::pop(cpu),
        0o263 => stack::popj(cpu),
        0o264 => stack::jsr(cpu),
        0o265 => stack::jsp(cpu),
        0o266 => stack::jsa(cpu),
        0o267 => stack::jra(cpu),

        0o270..=0o273 => fixed::add(cpu),
        0o274..=0o277 => fixed::sub(cpu),

        0o300..=0o317 => skipjump::cam(cpu),
        0o320..=0o327 => skipjump::jump(cpu),
        0o330..=0o337 => skipjump::skip(cpu),
        0o340..=0o347 | 0o360..=0o367 => skipjump::aoj_soj(cpu),
        0o350..=0o357 | 0o370..=0o377 => skipjump::aos_sos(cpu),

        0o400..=0o477 => boolean::boolean(cpu),
        0o500..=0o577 => halfword::halfword(cpu),
        0o600..=0o677 => test::test_group(cpu),

        0o700..=0o777 => io::iot(cpu, bus),

        _ => Ok(()),
    }
}
