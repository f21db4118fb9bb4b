//! Bootable image loaders
//!
//! Three historical formats, selected by an explicit flag, the file
//! extension, or a magic sniff of the first word:
//!
//! * **RIM10** - paper-tape stream of 6-bit frames (data frames have
//!   the high bit set), blocks of `-count,,origin-1` followed by data
//!   and a checksum, terminated by a `JRST start`.
//! * **SAV** - disk words packed five bytes each (bit 35 in the low
//!   bit of the fifth byte), the same IOWD block structure, terminated
//!   by `JRST,,start`.
//! * **EXE** - eight bytes per word, a directory of file-page /
//!   memory-page pairs with repeat counts, an entry vector, and an end
//!   block.

use crate::machine::Machine;
use crate::word::{lrz, FMASK, RMASK, SMASK};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use thiserror::Error;

/// JRST opcode, the block terminator in RIM and SAV images
const OP_JRST: u64 = 0o254;
/// EXE block types
const EXE_DIR: u64 = 0o1776;
const EXE_VEC: u64 = 0o1775;
const EXE_PDV: u64 = 0o1774;
const EXE_END: u64 = 0o1777;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Rim,
    Sav,
    Exe,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad image format: {0}")]
    Format(&'static str),
    #[error("checksum mismatch in RIM block")]
    Checksum,
    #[error("image does not fit configured memory")]
    Nxm,
    #[error("cannot determine image format")]
    UnknownFormat,
}

/// Load `path` into memory, setting the start PC the image names.
/// `fmt` overrides sniffing.
pub fn load_file(m: &mut Machine, path: &Path, fmt: Option<ImageFormat>) -> Result<(), LoadError> {
    let fmt = match fmt {
        Some(f) => f,
        None => sniff_format(path)?,
    };
    let mut r = BufReader::new(File::open(path)?);
    match fmt {
        ImageFormat::Rim => load_rim(m, &mut r),
        ImageFormat::Sav => load_sav(m, &mut r),
        ImageFormat::Exe => load_exe(m, &mut r),
    }
}

/// Decide the format from the extension, falling back to the magic in
/// the first word
fn sniff_format(path: &Path) -> Result<ImageFormat, LoadError> {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        match ext.to_ascii_lowercase().as_str() {
            "rim" => return Ok(ImageFormat::Rim),
            "sav" => return Ok(ImageFormat::Sav),
            "exe" => return Ok(ImageFormat::Exe),
            _ => {}
        }
    }
    let mut r = File::open(path)?;
    let mut buf = [0u8; 8];
    if r.read_exact(&mut buf).is_err() {
        return Err(LoadError::UnknownFormat);
    }
    let w = u64::from_le_bytes(buf);
    if lrz(w) == EXE_DIR {
        return Ok(ImageFormat::Exe);
    }
    // A SAV image leads with a negative IOWD
    let mut five = [0u8; 5];
    five.copy_from_slice(&buf[..5]);
    if unpack_sav(five) & SMASK != 0 {
        return Ok(ImageFormat::Sav);
    }
    Err(LoadError::UnknownFormat)
}

/// Next 36-bit word from a RIM tape: six data frames, high bit set
fn rim_word<R: Read>(r: &mut R) -> Result<Option<u64>, LoadError> {
    let mut word: u64 = 0;
    let mut frames = 0;
    let mut byte = [0u8; 1];
    while frames < 6 {
        if r.read(&mut byte)? == 0 {
            return Ok(None);
        }
        if byte[0] & 0o200 != 0 {
            word = (word << 6) | (byte[0] & 0o77) as u64;
            frames += 1;
        }
    }
    Ok(Some(word))
}

pub fn load_rim<R: Read>(m: &mut Machine, r: &mut R) -> Result<(), LoadError> {
    loop {
        let mut count = match rim_word(r)? {
            Some(w) => w,
            None => return Err(LoadError::Format("truncated RIM header")),
        };
        let mut cksm = count;
        if count & SMASK != 0 {
            // IOWD block
            while count & SMASK != 0 {
                let data = match rim_word(r)? {
                    Some(w) => w,
                    None => return Err(LoadError::Format("truncated RIM block")),
                };
                cksm = cksm.wrapping_add(data);
                let pa = ((count as u32).wrapping_add(1)) & RMASK as u32;
                if !m.cpu.mem.write(pa as usize, data) {
                    return Err(LoadError::Nxm);
                }
                count = (count + 0o000_001_000_001) & FMASK;
            }
            let data = match rim_word(r)? {
                Some(w) => w,
                None => return Err(LoadError::Format("truncated RIM checksum")),
            };
            if cksm.wrapping_add(data) & FMASK != 0 {
                return Err(LoadError::Checksum);
            }
        } else {
            if (count >> 27) & 0o777 != OP_JRST {
                return Err(LoadError::Format("RIM terminator is not a JRST"));
            }
            m.cpu.pc = (count & RMASK) as u32;
            return Ok(());
        }
    }
}

/// Unpack the five-byte SAV word: bits 0-34 in the high bits of the
/// first four bytes plus seven of the fifth, bit 35 from its top bit
fn unpack_sav(b: [u8; 5]) -> u64 {
    ((b[0] as u64) << 29)
        | ((b[1] as u64) << 22)
        | ((b[2] as u64) << 15)
        | ((b[3] as u64) << 8)
        | (((b[4] & 0o177) as u64) << 1)
        | (((b[4] & 0o200) as u64) >> 7)
}

fn sav_word<R: Read>(r: &mut R) -> Result<Option<u64>, LoadError> {
    let mut b = [0u8; 5];
    match r.read_exact(&mut b) {
        Ok(()) => Ok(Some(unpack_sav(b))),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn load_sav<R: Read>(m: &mut Machine, r: &mut R) -> Result<(), LoadError> {
    loop {
        let data = match sav_word(r)? {
            Some(w) => w,
            None => return Ok(()),
        };
        let mut wc = (data >> 18) as u32;
        let mut pa = (data & RMASK) as u32;
        if wc == (OP_JRST << 9) as u32 {
            m.cpu.pc = pa;
            return Ok(());
        }
        while wc != 0 {
            pa = (pa + 1) & RMASK as u32;
            wc = (wc + 1) & RMASK as u32;
            let data = match sav_word(r)? {
                Some(w) => w,
                None => return Err(LoadError::Format("truncated SAV block")),
            };
            if !m.cpu.mem.write(pa as usize, data) {
                return Err(LoadError::Nxm);
            }
        }
    }
}

fn exe_word<R: Read>(r: &mut R) -> Result<Option<u64>, LoadError> {
    let mut b = [0u8; 8];
    match r.read_exact(&mut b) {
        Ok(()) => Ok(Some(u64::from_le_bytes(b) & FMASK)),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn load_exe<R: Read + Seek>(m: &mut Machine, r: &mut R) -> Result<(), LoadError> {
    let mut dir: Vec<u64> = Vec::new();
    let mut entvec: Option<[u64; 2]> = None;
    loop {
        let hdr = match exe_word(r)? {
            Some(w) => w,
            None => return Err(LoadError::Format("truncated EXE header")),
        };
        let bsz = (hdr & RMASK) as i64 - 1;
        if bsz <= 0 {
            return Err(LoadError::Format("empty EXE block"));
        }
        match lrz(hdr) {
            EXE_DIR => {
                if !dir.is_empty() {
                    return Err(LoadError::Format("duplicate EXE directory"));
                }
                for _ in 0..bsz {
                    match exe_word(r)? {
                        Some(w) => dir.push(w),
                        None => return Err(LoadError::Format("truncated EXE directory")),
                    }
                }
            }
            EXE_PDV => {
                r.seek(SeekFrom::Current(bsz * 8))?;
            }
            EXE_VEC => {
                if bsz != 2 {
                    return Err(LoadError::Format("bad EXE entry vector"));
                }
                let a = exe_word(r)?.ok_or(LoadError::Format("truncated entry vector"))?;
                let b = exe_word(r)?.ok_or(LoadError::Format("truncated entry vector"))?;
                entvec = Some([a, b]);
                break;
            }
            EXE_END => break,
            _ => return Err(LoadError::Format("unknown EXE block type")),
        }
    }

    for pair in dir.chunks_exact(2) {
        let mut fpage = (pair[0] & RMASK) as u64;
        let mut mpage = (pair[1] & RMASK) as u64;
        let rpt = (pair[1] >> 27) + 1;
        for _ in 0..rpt {
            let mut page = [0u64; 512];
            if fpage != 0 {
                r.seek(SeekFrom::Start(fpage * 512 * 8))?;
                for w in page.iter_mut() {
                    *w = exe_word(r)?.ok_or(LoadError::Format("truncated EXE page"))?;
                }
                fpage += 1;
            }
            let ma = (mpage << 9) as usize;
            for (k, &w) in page.iter().enumerate() {
                if !m.cpu.mem.write(ma + k, if fpage != 0 { w } else { 0 }) {
                    return Err(LoadError::Nxm);
                }
            }
            mpage += 1;
        }
    }
    if let Some([_, start]) = entvec {
        if start != 0 {
            m.cpu.pc = (start & RMASK) as u32;
        }
    }
    Ok(())
}
