//! Operand-discipline dispatch table
//!
//! Every opcode carries a flag set describing how its operands are
//! staged before the body runs and where the result goes afterward.
//! The executor applies these as uniform pre/post steps, which is what
//! gives the PDP-10 its consistent basic / immediate / to-memory /
//! to-both variants of most operators: the four variants of an
//! operator share one body and differ only in their table entry.

/// Fetch memory operand into AR
pub const FCE: u16 = 0o0001;
/// Fetch memory and hold the location for the store-back
pub const FCEPSE: u16 = 0o0002;
/// Store AR to memory after the body
pub const SCE: u16 = 0o0004;
/// Move AR to BR, then fetch AC into AR
pub const FAC: u16 = 0o0010;
/// Fetch AC+1 into MQ
pub const FAC2: u16 = 0o0020;
/// Store AR to AC after the body
pub const SAC: u16 = 0o0040;
/// Store AR to AC only when AC is nonzero
pub const SACZ: u16 = 0o0100;
/// Store MQ to AC+1 after the body
pub const SAC2: u16 = 0o0200;
/// Swap the halves of AR after staging
pub const SWAR: u16 = 0o0400;
/// Fetch AC into BR
pub const FBR: u16 = 0o1000;

/// Well-known opcodes the control flow treats specially
pub const OP_JRST: u32 = 0o254;
pub const OP_JSR: u32 = 0o264;
pub const OP_UFA: u32 = 0o130;

/// Flags for all 512 opcodes. The I/O block (0700-0777) and the
/// opcodes that stage their own double-word operands carry zero and do
/// their own fetches.
#[rustfmt::skip]
pub static OP_FLAGS: [u16; 512] = [
    // 000-077: UUOs stage nothing
    0, 0, 0, 0, 0, 0, 0, 0,                 // 000-007
    0, 0, 0, 0, 0, 0, 0, 0,                 // 010-017
    0, 0, 0, 0, 0, 0, 0, 0,                 // 020-027
    0, 0, 0, 0, 0, 0, 0, 0,                 // 030-037
    0, 0, 0, 0, 0, 0, 0, 0,                 // 040-047
    0, 0, 0, 0, 0, 0, 0, 0,                 // 050-057
    0, 0, 0, 0, 0, 0, 0, 0,                 // 060-067
    0, 0, 0, 0, 0, 0, 0, 0,                 // 070-077
    // 100-127: model-dependent doubles and conversions fetch for
    // themselves
    0, 0, 0, 0, 0, 0, 0, 0,                 // 100-107
    0, 0, 0, 0, 0, 0, 0, 0,                 // 110-117 DFAD-DDIV
    0, 0, 0, 0, 0, 0, 0, 0,                 // 120-127 DMOVE-FLTR
    // 130-137: UFA, DFN, FSC, byte group
    FCE|FBR,          FCE|FAC|SAC,      FAC|SAC,          0,  // UFA DFN FSC IBP
    0, 0, 0, 0,                                               // ILDB LDB IDPB DPB
    // 140-177: single-precision floating point
    SAC|FBR|FCE,      SAC|SAC2|FBR|FCE, FCEPSE|FBR,       SAC|FBR|FCEPSE, // FAD
    SAC|FBR|FCE,      SAC|FBR|SWAR,     FCEPSE|FBR,       SAC|FBR|FCEPSE, // FADR
    SAC|FBR|FCE,      SAC|SAC2|FBR|FCE, FCEPSE|FBR,       SAC|FBR|FCEPSE, // FSB
    SAC|FBR|FCE,      SAC|FBR|SWAR,     FCEPSE|FBR,       SAC|FBR|FCEPSE, // FSBR
    SAC|FBR|FCE,      SAC|SAC2|FBR|FCE, FCEPSE|FBR,       SAC|FBR|FCEPSE, // FMP
    SAC|FBR|FCE,      SAC|FBR|SWAR,     FCEPSE|FBR,       SAC|FBR|FCEPSE, // FMPR
    SAC|FBR|FCE,      FAC2|SAC2|SAC|FBR|FCE, FCEPSE|FBR,  SAC|FBR|FCEPSE, // FDV
    SAC|FBR|FCE,      SAC|FBR|SWAR,     FCEPSE|FBR,       SAC|FBR|FCEPSE, // FDVR
    // 200-217: full-word moves
    SAC|FCE,          SAC,              FAC|SCE,          SACZ|FCEPSE,    // MOVE
    SWAR|SAC|FCE,     SWAR|SAC,         SWAR|FAC|SCE,     SWAR|SACZ|FCEPSE, // MOVS
    SAC|FCE,          SAC,              FAC|SCE,          SACZ|FCEPSE,    // MOVN
    SAC|FCE,          SAC,              FAC|SCE,          SACZ|FCEPSE,    // MOVM
    // 220-237: fixed multiply and divide
    SAC|FCE|FBR,      SAC|FBR,          FCEPSE|FBR,       SAC|FCEPSE|FBR, // IMUL
    SAC2|SAC|FCE|FBR, SAC2|SAC|FBR,     FCEPSE|FBR,       SAC2|SAC|FCEPSE|FBR, // MUL
    SAC2|SAC|FCE|FAC, SAC2|SAC|FAC,     FCEPSE|FAC,       SAC2|SAC|FCEPSE|FAC, // IDIV
    SAC2|SAC|FCE|FAC|FAC2, SAC2|SAC|FAC|FAC2, FCEPSE|FAC|FAC2, SAC2|SAC|FCEPSE|FAC|FAC2, // DIV
    // 240-247: shifts
    FAC|SAC,          FAC|SAC,          FAC|SAC,          FAC,            // ASH ROT LSH JFFO
    FAC|SAC|SAC2|FAC2, FAC|SAC|SAC2|FAC2, FAC|SAC|SAC2|FAC2, 0,           // ASHC ROTC LSHC 247
    // 250-257: exchange, block transfer, pointer jumps, control
    FAC|FCEPSE,       FAC,              FAC|SAC,          FAC|SAC,        // EXCH BLT AOBJP AOBJN
    0,                0,                0,                0,              // JRST JFCL XCT MAP
    // 260-267: stack and subroutine linkage
    FAC|SAC,          FAC|FCE|SAC,      FAC|SAC,          FAC|SAC,        // PUSHJ PUSH POP POPJ
    0,                SAC,              FBR|SCE,          0,              // JSR JSP JSA JRA
    // 270-277: add and subtract
    FBR|SAC|FCE,      FBR|SAC,          FBR|FCEPSE,       FBR|SAC|FCEPSE, // ADD
    FBR|SAC|FCE,      FBR|SAC,          FBR|FCEPSE,       FBR|SAC|FCEPSE, // SUB
    // 300-317: arithmetic compares
    FBR, FBR, FBR, FBR, FBR, FBR, FBR, FBR,                               // CAI
    FBR|FCE, FBR|FCE, FBR|FCE, FBR|FCE, FBR|FCE, FBR|FCE, FBR|FCE, FBR|FCE, // CAM
    // 320-337: jumps and skips
    FAC, FAC, FAC, FAC, FAC, FAC, FAC, FAC,                               // JUMP
    SACZ|FCE, SACZ|FCE, SACZ|FCE, SACZ|FCE, SACZ|FCE, SACZ|FCE, SACZ|FCE, SACZ|FCE, // SKIP
    // 340-357: add-one jumps and skips
    SAC|FAC, SAC|FAC, SAC|FAC, SAC|FAC, SAC|FAC, SAC|FAC, SAC|FAC, SAC|FAC, // AOJ
    SACZ|FCEPSE, SACZ|FCEPSE, SACZ|FCEPSE, SACZ|FCEPSE,
    SACZ|FCEPSE, SACZ|FCEPSE, SACZ|FCEPSE, SACZ|FCEPSE,                   // AOS
    // 360-377: subtract-one jumps and skips
    SAC|FAC, SAC|FAC, SAC|FAC, SAC|FAC, SAC|FAC, SAC|FAC, SAC|FAC, SAC|FAC, // SOJ
    SACZ|FCEPSE, SACZ|FCEPSE, SACZ|FCEPSE, SACZ|FCEPSE,
    SACZ|FCEPSE, SACZ|FCEPSE, SACZ|FCEPSE, SACZ|FCEPSE,                   // SOS
    // 400-477: the sixteen boolean functions
    SAC,              SAC,              SCE,              SAC|SCE,        // SETZ
    FBR|SAC|FCE,      FBR|SAC,          FBR|FCEPSE,       FBR|SAC|FCEPSE, // AND
    FBR|SAC|FCE,      FBR|SAC,          FBR|FCEPSE,       FBR|SAC|FCEPSE, // ANDCA
    SAC|FCE,          SAC,              0,                SAC|FCE,        // SETM
    FBR|SAC|FCE,      FBR|SAC,          FBR|FCEPSE,       FBR|SAC|FCEPSE, // ANDCM
    FBR|SAC,          FBR|SAC,          FBR|SCE,          FBR|SAC|SCE,    // SETA
    FBR|SAC|FCE,      FBR|SAC,          FBR|FCEPSE,       FBR|SAC|FCEPSE, // XOR
    FBR|SAC|FCE,      FBR|SAC,          FBR|FCEPSE,       FBR|SAC|FCEPSE, // IOR
    FBR|SAC|FCE,      FBR|SAC,          FBR|FCEPSE,       FBR|SAC|FCEPSE, // ANDCB
    FBR|SAC|FCE,      FBR|SAC,          FBR|FCEPSE,       FBR|SAC|FCEPSE, // EQV
    FBR|SAC,          FBR|SAC,          FBR|SCE,          FBR|SAC|SCE,    // SETCA
    FBR|SAC|FCE,      FBR|SAC,          FBR|FCEPSE,       FBR|SAC|FCEPSE, // ORCA
    SAC|FCE,          SAC,              FCEPSE,           SAC|FCEPSE,     // SETCM
    FBR|SAC|FCE,      FBR|SAC,          FBR|FCEPSE,       FBR|SAC|FCEPSE, // ORCM
    FBR|SAC|FCE,      FBR|SAC,          FBR|FCEPSE,       FBR|SAC|FCEPSE, // ORCB
    SAC,              SAC,              SCE,              SAC|SCE,        // SETO
    // 500-577: half-word transfers
    FBR|SAC|FCE,      FBR|SAC,          FAC|FCEPSE,       SACZ|FCEPSE,    // HLL
    SWAR|FBR|SAC|FCE, SWAR|FBR|SAC,     FAC|SWAR|FCEPSE,  SACZ|FCEPSE,    // HRL
    SAC|FCE,          SAC,              FAC|SCE,          SACZ|FCEPSE,    // HLLZ
    SWAR|SAC|FCE,     SWAR|SAC,         FAC|SWAR|SCE,     SWAR|SACZ|FCEPSE, // HRLZ
    SAC|FCE,          SAC,              FAC|SCE,          SACZ|FCEPSE,    // HLLO
    SWAR|SAC|FCE,     SWAR|SAC,         FAC|SWAR|SCE,     SWAR|SACZ|FCEPSE, // HRLO
    SAC|FCE,          SAC,              FAC|SCE,          SACZ|FCEPSE,    // HLLE
    SWAR|SAC|FCE,     SWAR|SAC,         FAC|SWAR|SCE,     SWAR|SACZ|FCEPSE, // HRLE
    FBR|SAC|FCE,      FBR|SAC,          FAC|FCEPSE,       SACZ|FCEPSE,    // HRR
    SWAR|FBR|SAC|FCE, SWAR|FBR|SAC,     FAC|SWAR|FCEPSE,  SACZ|FCEPSE,    // HLR
    SAC|FCE,          SAC,              FAC|SCE,          SACZ|FCEPSE,    // HRRZ
    SWAR|SAC|FCE,     SWAR|SAC,         FAC|SWAR|SCE,     SWAR|SACZ|FCEPSE, // HLRZ
    SAC|FCE,          SAC,              FAC|SCE,          SACZ|FCEPSE,    // HRRO
    SWAR|SAC|FCE,     SWAR|SAC,         FAC|SWAR|SCE,     SWAR|SACZ|FCEPSE, // HLRO
    SAC|FCE,          SAC,              FAC|SCE,          SACZ|FCEPSE,    // HRRE
    SWAR|SAC|FCE,     SWAR|SAC,         FAC|SWAR|SCE,     SWAR|SACZ|FCEPSE, // HLRE
    // 600-677: test group
    FBR,              FBR|SWAR,         FBR,              FBR|SWAR,       // TRN TLN TRNE TLNE
    FBR,              FBR|SWAR,         FBR,              FBR|SWAR,       // TRNA TLNA TRNN TLNN
    FBR|FCE,          FBR|SWAR|FCE,     FBR|FCE,          FBR|SWAR|FCE,   // TDN TSN TDNE TSNE
    FBR|FCE,          FBR|SWAR|FCE,     FBR|FCE,          FBR|SWAR|FCE,   // TDNA TSNA TDNN TSNN
    FBR|SAC,          FBR|SWAR|SAC,     FBR|SAC,          FBR|SWAR|SAC,   // TRZ TLZ TRZE TLZE
    FBR|SAC,          FBR|SWAR|SAC,     FBR|SAC,          FBR|SWAR|SAC,   // TRZA TLZA TRZN TLZN
    FBR|SAC|FCE,      FBR|SWAR|SAC|FCE, FBR|SAC|FCE,      FBR|SWAR|SAC|FCE, // TDZ TSZ TDZE TSZE
    FBR|SAC|FCE,      FBR|SWAR|SAC|FCE, FBR|SAC|FCE,      FBR|SWAR|SAC|FCE, // TDZA TSZA TDZN TSZN
    FBR|SAC,          FBR|SWAR|SAC,     FBR|SAC,          FBR|SWAR|SAC,   // TRC TLC TRCE TLCE
    FBR|SAC,          FBR|SWAR|SAC,     FBR|SAC,          FBR|SWAR|SAC,   // TRCA TLCA TRCN TLCN
    FBR|SAC|FCE,      FBR|SWAR|SAC|FCE, FBR|SAC|FCE,      FBR|SWAR|SAC|FCE, // TDC TSC TDCE TSCE
    FBR|SAC|FCE,      FBR|SWAR|SAC|FCE, FBR|SAC|FCE,      FBR|SWAR|SAC|FCE, // TDCA TSCA TDCN TSCN
    FBR|SAC,          FBR|SWAR|SAC,     FBR|SAC,          FBR|SWAR|SAC,   // TRO TLO TROE TLOE
    FBR|SAC,          FBR|SWAR|SAC,     FBR|SAC,          FBR|SWAR|SAC,   // TROA TLOA TRON TLON
    FBR|SAC|FCE,      FBR|SWAR|SAC|FCE, FBR|SAC|FCE,      FBR|SWAR|SAC|FCE, // TDO TSO TDOE TSOE
    FBR|SAC|FCE,      FBR|SWAR|SAC|FCE, FBR|SAC|FCE,      FBR|SWAR|SAC|FCE, // TDOA TSOA TDON TSON
    // 700-777: I/O stages its own operands
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_size() {
        assert_eq!(OP_FLAGS.len(), 512);
    }

    #[test]
    fn test_mode_variants_share_shape() {
        // The four ADD variants differ only in staging, as the
        // hardware's mode decoding did
        assert_eq!(OP_FLAGS[0o270], FBR | SAC | FCE);
        assert_eq!(OP_FLAGS[0o271], FBR | SAC);
        assert_eq!(OP_FLAGS[0o272], FBR | FCEPSE);
        assert_eq!(OP_FLAGS[0o273], FBR | SAC | FCEPSE);
    }

    #[test]
    fn test_io_block_unstaged() {
        for op in 0o700..0o777 {
            assert_eq!(OP_FLAGS[op], 0);
        }
    }
}
