//! Loading of ELF64 and Mach-O64 binaries and location of their DWARF debug
//! sections.
//!
//! The loader understands one extra wrinkle over a plain object parser: a
//! compacted binary carries an 8-byte header in front of the original byte
//! stream, and its `.debug_info` is smaller than the section table claims.
//! Offsets recorded in the container for anything located after `.debug_info`
//! are therefore stale by the recorded shrinkage and must be adjusted before
//! being dereferenced - which is why section resolution here works on raw
//! offsets rather than through a generic object-file reader.

use std::{fs::File, path::Path};

use memmap2::Mmap;
use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    zip::{ZIP_HEADER_SIZE, ZIP_MAGIC},
};

const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];
const ELFCLASS64: u8 = 2;

const MH_MAGIC_64: u32 = 0xfeed_facf;
const MH_MAGIC_32: u32 = 0xfeed_face;
const MACH_HEADER_SIZE: usize = 32;
const LC_SEGMENT_64: u32 = 0x19;
const SEGMENT_COMMAND_SIZE: usize = 72;
const SECTION_ENTRY_SIZE: usize = 80;

/// Container format of a loaded binary.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Format {
    Elf64,
    MachO64,
}

/// File offset and length of one debug section, relative to the logical start
/// of the binary (after any compaction header).
#[derive(Copy, Clone, Debug, Default)]
struct SectionRef {
    offset: usize,
    len: usize,
}

/// A memory-mapped executable with its three DWARF sections located.
///
/// Owns the mapping and the descriptor together; both are released when the
/// container is dropped, on every exit path.
pub struct Container {
    mmap: Mmap,
    _file: File,
    name: String,
    format: Format,
    start: usize,
    is_zipped: bool,
    reduced_size: u32,
    debug_info: SectionRef,
    debug_abbrev: SectionRef,
    debug_str: SectionRef,
}

impl Container {
    /// Map `path` read-only and locate `.debug_info`, `.debug_abbrev` and
    /// `.debug_str`, reversing a compaction header if one is present.
    pub fn open(path: impl AsRef<Path>) -> Result<Container> {
        let path = path.as_ref();
        let name = path.display().to_string();

        let file = File::open(path).map_err(|e| Error::OpenInput(e, name.clone()))?;
        // The kernel rounds the mapping up to page granularity itself.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MapInput(e, name.clone()))?;

        let (start, is_zipped, reduced_size) =
            if mmap.len() >= ZIP_HEADER_SIZE && mmap[..4] == ZIP_MAGIC {
                let reduced = u32::from_le_bytes(
                    mmap[4..ZIP_HEADER_SIZE].try_into().expect("header length checked"),
                );
                (ZIP_HEADER_SIZE, true, reduced)
            } else {
                (0, false, 0)
            };

        let data = &mmap[start..];
        let (format, debug_info, debug_abbrev, debug_str) = if data.len() >= 4
            && data[..4] == ELF_MAGIC
        {
            let sections = locate_elf_sections(data, reduced_size, &name)?;
            (Format::Elf64, sections.0, sections.1, sections.2)
        } else if data.len() >= 4 {
            match u32::from_le_bytes(data[..4].try_into().expect("length checked")) {
                MH_MAGIC_64 => {
                    if is_zipped {
                        // The Mach-O path takes section offsets as recorded;
                        // compacted Mach-O input has never been verified.
                        warn!("compacted Mach-O input: section offsets are used unadjusted");
                    }
                    let sections = locate_macho_sections(data, &name)?;
                    (Format::MachO64, sections.0, sections.1, sections.2)
                }
                MH_MAGIC_32 => return Err(Error::Unsupported32Bit(name)),
                _ => return Err(Error::UnrecognizedContainer(name)),
            }
        } else {
            return Err(Error::UnrecognizedContainer(name));
        };

        debug!(
            ?format,
            is_zipped,
            reduced_size,
            debug_info_len = debug_info.len,
            debug_abbrev_len = debug_abbrev.len,
            debug_str_len = debug_str.len,
            "loaded container"
        );

        Ok(Container {
            mmap,
            _file: file,
            name,
            format,
            start,
            is_zipped,
            reduced_size,
            debug_info,
            debug_abbrev,
            debug_str,
        })
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn is_zipped(&self) -> bool {
        self.is_zipped
    }

    /// Number of bytes removed from `.debug_info` by compaction, 0 otherwise.
    pub fn reduced_size(&self) -> u32 {
        self.reduced_size
    }

    /// File name this container was opened from, for diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Logical view of the binary with any compaction header stripped.
    pub fn head(&self) -> &[u8] {
        &self.mmap[self.start..]
    }

    /// Logical size of the binary, excluding any compaction header.
    pub fn size(&self) -> usize {
        self.mmap.len() - self.start
    }

    pub fn debug_info(&self) -> &[u8] {
        &self.head()[self.debug_info.offset..self.debug_info.offset + self.debug_info.len]
    }

    pub fn debug_abbrev(&self) -> &[u8] {
        &self.head()[self.debug_abbrev.offset..self.debug_abbrev.offset + self.debug_abbrev.len]
    }

    pub fn debug_str(&self) -> &[u8] {
        &self.head()[self.debug_str.offset..self.debug_str.offset + self.debug_str.len]
    }

    /// Offset of `.debug_info` within `head()`.
    pub(crate) fn debug_info_offset(&self) -> usize {
        self.debug_info.offset
    }

    pub(crate) fn debug_info_len(&self) -> usize {
        self.debug_info.len
    }
}

fn array_at<const N: usize>(data: &[u8], offset: usize, what: &'static str) -> Result<[u8; N]> {
    data.get(offset..)
        .and_then(|rest| rest.get(..N))
        .map(|bytes| bytes.try_into().expect("length checked"))
        .ok_or(Error::Truncated { section: "container", offset, what })
}

fn u16_at(data: &[u8], offset: usize, what: &'static str) -> Result<u16> {
    Ok(u16::from_le_bytes(array_at(data, offset, what)?))
}

fn u32_at(data: &[u8], offset: usize, what: &'static str) -> Result<u32> {
    Ok(u32::from_le_bytes(array_at(data, offset, what)?))
}

fn u64_at(data: &[u8], offset: usize, what: &'static str) -> Result<u64> {
    Ok(u64::from_le_bytes(array_at(data, offset, what)?))
}

/// Read a null-terminated section name out of the string table at `offset`.
fn cstr_at<'input>(data: &'input [u8], offset: usize, what: &'static str) -> Result<&'input [u8]> {
    let rest = data.get(offset..).ok_or(Error::Truncated { section: "container", offset, what })?;
    let len = rest
        .iter()
        .position(|&b| b == 0)
        .ok_or(Error::Truncated { section: "container", offset, what })?;
    Ok(&rest[..len])
}

fn unzip_offset(offset: usize, reduced: u32) -> Result<usize> {
    offset.checked_sub(reduced as usize).ok_or(Error::OffsetUnderflow(offset, reduced))
}

/// Validate that a located section actually lies within the mapped bytes.
fn checked_section(
    data: &[u8],
    offset: usize,
    len: usize,
    what: &'static str,
) -> Result<SectionRef> {
    if offset.checked_add(len).map_or(true, |end| end > data.len()) {
        return Err(Error::Truncated { section: "container", offset, what });
    }
    Ok(SectionRef { offset, len })
}

/// Resolve the three debug sections of an ELF64 image.
///
/// In a compacted container the section header table, the section name string
/// table, and every section recorded after `.debug_info` sit `reduced` bytes
/// earlier in the file than their headers claim. The adjustment below assumes
/// sections are listed in non-decreasing file-offset order relative to
/// `.debug_info`; that holds for the usual linkers but is not guaranteed by
/// the ELF spec.
fn locate_elf_sections(
    data: &[u8],
    reduced: u32,
    name: &str,
) -> Result<(SectionRef, SectionRef, SectionRef)> {
    if data.len() < 5 {
        return Err(Error::UnrecognizedContainer(name.to_string()));
    }
    if data[4] != ELFCLASS64 {
        return Err(Error::Unsupported32Bit(name.to_string()));
    }

    let e_shoff = u64_at(data, 0x28, "section header table offset")? as usize;
    let e_shnum = u16_at(data, 0x3c, "section header count")? as usize;
    let e_shstrndx = u16_at(data, 0x3e, "section name table index")? as usize;
    if e_shoff == 0 || e_shnum == 0 {
        return Err(Error::NoSectionHeaders(name.to_string()));
    }
    if e_shstrndx == 0 || e_shstrndx >= e_shnum {
        return Err(Error::NoSectionNames(name.to_string()));
    }

    // The table itself always lies after `.debug_info` in the file.
    let shoff = unzip_offset(e_shoff, reduced)?;
    let shstr_header = shoff + e_shstrndx * 64;
    let shstr_offset =
        unzip_offset(u64_at(data, shstr_header + 24, "string table offset")? as usize, reduced)?;

    let mut debug_info = None;
    let mut debug_abbrev = None;
    let mut debug_str = None;
    let mut debug_info_seen = false;

    for i in 0..e_shnum {
        let header = shoff + i * 64;
        let sh_name = u32_at(data, header, "section name offset")? as usize;
        let sh_offset = u64_at(data, header + 24, "section offset")? as usize;
        let sh_size = u64_at(data, header + 32, "section size")? as usize;

        let offset =
            if debug_info_seen { unzip_offset(sh_offset, reduced)? } else { sh_offset };

        match cstr_at(data, shstr_offset + sh_name, "section name")? {
            b".debug_info" => {
                let len = unzip_offset(sh_size, reduced)?;
                debug_info = Some(checked_section(data, offset, len, ".debug_info")?);
                debug_info_seen = true;
            }
            b".debug_abbrev" => {
                debug_abbrev = Some(checked_section(data, offset, sh_size, ".debug_abbrev")?);
            }
            b".debug_str" => {
                debug_str = Some(checked_section(data, offset, sh_size, ".debug_str")?);
            }
            _ => {}
        }
    }

    Ok((
        debug_info.ok_or(Error::MissingDebugSection(".debug_info"))?,
        debug_abbrev.ok_or(Error::MissingDebugSection(".debug_abbrev"))?,
        debug_str.ok_or(Error::MissingDebugSection(".debug_str"))?,
    ))
}

/// Strip the trailing padding from a fixed 16-byte Mach-O name field.
fn macho_name(field: &[u8; 16]) -> &[u8] {
    let len = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    &field[..len]
}

/// Resolve the three debug sections of a Mach-O64 image by scanning the
/// sections of the `__DWARF` segment.
fn locate_macho_sections(
    data: &[u8],
    name: &str,
) -> Result<(SectionRef, SectionRef, SectionRef)> {
    let ncmds = u32_at(data, 16, "load command count")? as usize;

    let mut debug_info = None;
    let mut debug_abbrev = None;
    let mut debug_str = None;

    let mut command = MACH_HEADER_SIZE;
    for _ in 0..ncmds {
        let cmd = u32_at(data, command, "load command")?;
        let cmdsize = u32_at(data, command + 4, "load command size")? as usize;
        if cmdsize < 8 {
            return Err(Error::Truncated {
                section: "container",
                offset: command,
                what: "load command size",
            });
        }

        if cmd == LC_SEGMENT_64 {
            let segname = array_at::<16>(data, command + 8, "segment name")?;
            if macho_name(&segname) == b"__DWARF" {
                let nsects = u32_at(data, command + 64, "segment section count")? as usize;
                for i in 0..nsects {
                    let section = command + SEGMENT_COMMAND_SIZE + i * SECTION_ENTRY_SIZE;
                    let sectname = array_at::<16>(data, section, "section name")?;
                    let size = u64_at(data, section + 40, "section size")? as usize;
                    let offset = u32_at(data, section + 48, "section offset")? as usize;
                    match macho_name(&sectname) {
                        b"__debug_info" => {
                            debug_info =
                                Some(checked_section(data, offset, size, "__debug_info")?);
                        }
                        b"__debug_abbrev" => {
                            debug_abbrev =
                                Some(checked_section(data, offset, size, "__debug_abbrev")?);
                        }
                        b"__debug_str" => {
                            debug_str = Some(checked_section(data, offset, size, "__debug_str")?);
                        }
                        _ => {}
                    }
                }
            }
        }

        command += cmdsize;
    }

    if debug_info.is_none() && debug_abbrev.is_none() && debug_str.is_none() {
        return Err(Error::NoDwarfSegment(name.to_string()));
    }

    Ok((
        debug_info.ok_or(Error::MissingDebugSection("__debug_info"))?,
        debug_abbrev.ok_or(Error::MissingDebugSection("__debug_abbrev"))?,
        debug_str.ok_or(Error::MissingDebugSection("__debug_str"))?,
    ))
}
