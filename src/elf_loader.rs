//! Loads a 32-bit little-endian executable image into simulated
//! memory. Adapted from the teacher's section-based loader to walk
//! program headers (segments) instead, and fixed to compute the
//! in-memory offset from the memory base rather than the entry point
//! (see SPEC_FULL.md's design notes on the original's loader bug).

use elf::abi::PT_LOAD;
use elf::endian::LittleEndian;
use elf::ElfBytes;
use thiserror::Error;

use crate::memory::{Memory, MemoryError, BASE};

#[derive(Debug, Error)]
pub enum ElfError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse ELF container: {0}")]
    Parse(#[from] elf::ParseError),
    #[error("not a 32-bit ELF image")]
    Not32Bit,
    #[error("loadable segment at physical address 0x{paddr:08x} does not fit simulated memory: {source}")]
    SegmentOutOfRange {
        paddr: u64,
        #[source]
        source: MemoryError,
    },
    #[error(
        "loadable segment at file offset 0x{offset:08x} with size 0x{filesz:08x} exceeds the file (length 0x{file_len:08x})"
    )]
    SegmentExceedsFile { offset: u64, filesz: u64, file_len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadedImage {
    pub entry: u32,
}

/// Parses the ELF image at `path` and copies every `PT_LOAD` segment
/// into `memory`. Returns the image entry point.
pub fn load(path: &str, memory: &mut Memory) -> Result<LoadedImage, ElfError> {
    let bytes = std::fs::read(path).map_err(|source| ElfError::Io { path: path.to_string(), source })?;
    load_bytes(&bytes, memory)
}

fn load_bytes(bytes: &[u8], memory: &mut Memory) -> Result<LoadedImage, ElfError> {
    let file = ElfBytes::<LittleEndian>::minimal_parse(bytes)?;
    if file.ehdr.class != elf::file::Class::ELF32 {
        return Err(ElfError::Not32Bit);
    }

    let segments = file.segments().ok_or(ElfError::Not32Bit)?;
    for header in segments.iter().filter(|h| h.p_type == PT_LOAD) {
        let start = header.p_offset as usize;
        let len = header.p_filesz as usize;
        let end = start.checked_add(len).filter(|&end| end <= bytes.len()).ok_or(
            ElfError::SegmentExceedsFile {
                offset: header.p_offset,
                filesz: header.p_filesz,
                file_len: bytes.len(),
            },
        )?;
        let data = &bytes[start..end];
        let paddr = header.p_paddr as u32;
        memory
            .write_segment(paddr, data)
            .map_err(|source| ElfError::SegmentOutOfRange { paddr: header.p_paddr, source })?;
    }

    Ok(LoadedImage { entry: file.ehdr.e_entry as u32 })
}
