//! Delta-compaction of `.debug_info` and the container splice that writes it.
//!
//! The compact stream is not generic DWARF: it keeps every byte of the
//! original section verbatim except that abbreviation codes are re-encoded as
//! minimal uleb128 and the three 4-byte reference/offset forms are replaced
//! by a signed delta against the last value seen for the same attribute name
//! in the current unit. A reader that knows this rule set can still walk the
//! stream in place; nothing else can.

use std::{
    collections::HashMap,
    fs::File,
    io::{Seek, SeekFrom, Write},
    path::Path,
};

use gimli::{DwAt, DwForm};
use tracing::{debug, info};

use crate::{
    container::Container,
    error::{Error, Result},
    leb128,
    scan::{self, UnitHeader, Visitor},
};

/// Magic prefix marking a compacted container.
pub const ZIP_MAGIC: [u8; 4] = [0xdf, b'Z', b'I', b'P'];

/// Size of the compaction header: the magic plus a little-endian u32 holding
/// the number of bytes removed from `.debug_info`.
pub const ZIP_HEADER_SIZE: usize = 8;

/// The three forms whose values are 4-byte section references/offsets and
/// tend to repeat with small strides: these get delta-encoded.
fn is_delta_form(form: DwForm) -> bool {
    matches!(form, gimli::DW_FORM_strp | gimli::DW_FORM_data4 | gimli::DW_FORM_ref4)
}

/// Visitor re-serializing a scanned `.debug_info` stream in compact form.
pub struct ZipEncoder<'input> {
    info: &'input [u8],
    out: Vec<u8>,
    last_offset: u64,
    /// Last absolute value written per attribute name, cleared at every unit
    /// boundary so deltas never leak across units.
    last_values: HashMap<u16, i32>,
    units: u32,
}

impl<'input> ZipEncoder<'input> {
    /// Create an encoder over the section bytes being rewritten
    /// (`container.debug_info()`).
    pub fn new(info: &'input [u8]) -> Self {
        ZipEncoder {
            info,
            out: Vec::with_capacity(info.len()),
            last_offset: 0,
            last_values: HashMap::new(),
            units: 0,
        }
    }

    /// Consume the encoder, returning the compacted section bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.out
    }

    /// Copy the source range `[last_offset, offset)` verbatim.
    fn copy_through(&mut self, offset: u64) {
        self.out.extend_from_slice(&self.info[self.last_offset as usize..offset as usize]);
    }
}

impl Visitor for ZipEncoder<'_> {
    fn unit(&mut self, header: &UnitHeader, offset: u64) {
        info!(
            unit = self.units,
            offset = self.last_offset,
            length = header.length,
            version = header.version,
            address_size = header.address_size,
            "compacting unit"
        );
        // The header itself is copied unchanged.
        self.copy_through(offset);
        self.last_values.clear();
        self.units += 1;
        self.last_offset = offset;
    }

    fn abbrev(&mut self, code: u64, offset: u64) {
        // Re-encoded rather than copied: normalizes any non-minimal source
        // encoding, and keeps the 0 terminators in the stream.
        leb128::unsigned(&mut self.out, code);
        self.last_offset = offset;
    }

    fn attr(&mut self, name: DwAt, form: DwForm, value: u64, offset: u64) {
        if is_delta_form(form) {
            let value = value as i32;
            let last = self.last_values.entry(name.0).or_insert(0);
            let delta = i64::from(value) - i64::from(*last);
            leb128::signed(&mut self.out, delta);
            *last = value;
        } else {
            self.copy_through(offset);
        }
        self.last_offset = offset;
    }
}

/// Before/after byte counts of one compaction run.
#[derive(Copy, Clone, Debug)]
pub struct ZipSummary {
    pub input_size: u64,
    pub output_size: u64,
}

impl ZipSummary {
    /// Output size as a percentage of the input size.
    pub fn ratio(&self) -> f64 {
        self.output_size as f64 / self.input_size as f64 * 100.0
    }
}

/// Compact `container`'s `.debug_info` and splice the result into a new file
/// at `path`: compaction header, the source bytes up to `.debug_info`, the
/// compacted section, the source bytes after it. The header's bytes-removed
/// field is patched once the final size is known.
pub fn write_zipped(container: &Container, path: impl AsRef<Path>) -> Result<ZipSummary> {
    if container.is_zipped() {
        return Err(Error::AlreadyZipped(container.name().to_string()));
    }

    let mut encoder = ZipEncoder::new(container.debug_info());
    scan::scan(container, &mut encoder)?;
    let zipped = encoder.into_bytes();

    let head = container.head();
    let info_offset = container.debug_info_offset();
    let tail = &head[info_offset + container.debug_info_len()..];

    let input_size = head.len() as u64;
    let output_size = (ZIP_HEADER_SIZE + info_offset + zipped.len() + tail.len()) as u64;
    // The header's u32 can only record shrinkage; a grown section would
    // produce an inconsistent container.
    if output_size > input_size + ZIP_HEADER_SIZE as u64 {
        return Err(Error::ZipGrewOutput(container.name().to_string()));
    }
    let removed = (input_size + ZIP_HEADER_SIZE as u64 - output_size) as u32;

    let path = path.as_ref();
    let name = path.display().to_string();
    let mut file = File::create(path).map_err(|e| Error::CreateOutput(e, name.clone()))?;
    let write = |file: &mut File, bytes: &[u8]| -> Result<()> {
        file.write_all(bytes).map_err(|e| Error::WriteOutput(e, name.clone()))
    };
    write(&mut file, &ZIP_MAGIC)?;
    // Placeholder, patched below.
    write(&mut file, &[0u8; 4])?;
    write(&mut file, &head[..info_offset])?;
    write(&mut file, &zipped)?;
    write(&mut file, tail)?;

    file.seek(SeekFrom::Start(4)).map_err(|e| Error::WriteOutput(e, name.clone()))?;
    write(&mut file, &removed.to_le_bytes())?;
    file.sync_all().map_err(|e| Error::WriteOutput(e, name.clone()))?;

    debug!(input_size, output_size, removed, "wrote compacted container");
    Ok(ZipSummary { input_size, output_size })
}
