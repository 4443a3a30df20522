//! Abbreviation-driven structural walk of `.debug_info`.
//!
//! `scan` makes a single forward pass over every compilation unit, decoding
//! each debugging information entry attribute far enough to know its exact
//! byte length, and reports three kinds of events to a [`Visitor`]. The
//! running offset is the contract here: consumers rebuild or account for the
//! stream purely from the offsets carried by the events, so a misdecoded
//! field length anywhere would corrupt everything downstream. Any structural
//! inconsistency is therefore a fatal error, never skipped.

use std::collections::{hash_map::Entry, HashMap};

use gimli::{DwAt, DwForm};
use tracing::trace;

use crate::{
    abbrev::{AbbrevTable, AttrSpec},
    container::Container,
    error::{Error, Result},
    util::Cursor,
};

/// Header of a compilation unit, in the DWARF 2-4 layout.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct UnitHeader {
    /// Size in bytes of the unit after this field.
    pub length: u32,
    pub version: u16,
    /// Offset of the unit's abbreviation sub-table within `.debug_abbrev`.
    pub abbrev_offset: u32,
    pub address_size: u8,
}

impl UnitHeader {
    /// On-disk size of the header itself.
    pub const SIZE: u64 = 11;
}

/// Receives one event per structural step of a scan. Each event carries the
/// stream offset immediately after the decoded field.
pub trait Visitor {
    /// A unit header was read; `offset` points just past the header.
    fn unit(&mut self, header: &UnitHeader, offset: u64);

    /// An abbreviation code was read, including the 0 code that terminates a
    /// sibling list (the compacted stream must retain those terminators).
    fn abbrev(&mut self, code: u64, offset: u64);

    /// An attribute value was decoded. `value` is the numeric reading of the
    /// field where one exists (fixed-width data, references, string-table
    /// offsets, LEB128 data); string and block forms report 0, with `offset`
    /// still exact.
    fn attr(&mut self, name: DwAt, form: DwForm, value: u64, offset: u64);
}

/// Walk every compilation unit of `container`'s `.debug_info`, feeding
/// `visitor`.
pub fn scan(container: &Container, visitor: &mut dyn Visitor) -> Result<()> {
    scan_sections(container.debug_info(), container.debug_abbrev(), visitor)
}

pub(crate) fn scan_sections(
    info: &[u8],
    abbrev: &[u8],
    visitor: &mut dyn Visitor,
) -> Result<()> {
    let mut tables: HashMap<u32, AbbrevTable> = HashMap::new();
    let mut cursor = Cursor::new(info, ".debug_info");

    while !cursor.is_empty() {
        let unit_start = cursor.pos() as u64;
        let header = read_unit_header(&mut cursor, unit_start)?;
        let unit_end = unit_start + 4 + u64::from(header.length);
        trace!(unit_start, ?header, "unit header");
        visitor.unit(&header, cursor.pos() as u64);

        let table = match tables.entry(header.abbrev_offset) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let offset = header.abbrev_offset as usize;
                let sub = abbrev.get(offset..).ok_or(Error::Truncated {
                    section: ".debug_abbrev",
                    offset,
                    what: "abbreviation table offset",
                })?;
                entry.insert(AbbrevTable::parse(sub)?)
            }
        };

        // Implicit sibling-list frame for the unit's root entry. Producers
        // don't terminate that implicit list: the unit ends at its declared
        // length once every nested list has been closed.
        let mut depth = 1u32;
        loop {
            if cursor.pos() as u64 >= unit_end {
                if depth > 1 {
                    return Err(Error::UnterminatedSiblingList(unit_start));
                }
                break;
            }
            let code_offset = cursor.pos() as u64;
            let code = cursor.uleb128("abbreviation code")?;
            visitor.abbrev(code, cursor.pos() as u64);

            if code == 0 {
                depth -= 1;
                if depth == 0 {
                    break;
                }
                continue;
            }

            let decl = table.get(code).ok_or(Error::UnknownAbbrevCode(code_offset, code))?;
            for spec in &decl.attrs {
                let value = read_form_value(&mut cursor, spec, &header, spec.form)?;
                visitor.attr(spec.name, spec.form, value, cursor.pos() as u64);
            }
            if decl.has_children {
                depth += 1;
            }
        }

        // Units are laid out back-to-back; the entries of each one must
        // consume exactly its declared length.
        if cursor.pos() as u64 != unit_end {
            return Err(Error::UnitLengthMismatch {
                offset: unit_start,
                declared: u64::from(header.length),
                actual: cursor.pos() as u64 - unit_start - 4,
            });
        }
    }

    Ok(())
}

fn read_unit_header(cursor: &mut Cursor<'_>, unit_start: u64) -> Result<UnitHeader> {
    let length = cursor.u32("unit length")?;
    if length == 0xffff_ffff {
        return Err(Error::UnsupportedDwarf64(unit_start));
    }
    let version = cursor.u16("unit version")?;
    // DWARF 5 changed the header layout (a unit-type byte precedes the
    // address size); misreading it would poison every later offset.
    if !(2..=4).contains(&version) {
        return Err(Error::UnsupportedDwarfVersion(unit_start, version));
    }
    let abbrev_offset = cursor.u32("abbreviation table offset")?;
    let address_size = cursor.u8("address size")?;
    Ok(UnitHeader { length, version, abbrev_offset, address_size })
}

/// Decode one attribute value per its form, returning its numeric reading.
///
/// Forms without a numeric value (strings, blocks) are advanced past with an
/// exact length and report 0; the running offset is what matters.
fn read_form_value(
    cursor: &mut Cursor<'_>,
    spec: &AttrSpec,
    header: &UnitHeader,
    form: DwForm,
) -> Result<u64> {
    use gimli::constants::*;

    let value = match form {
        DW_FORM_addr => cursor.uint(usize::from(header.address_size), "address")?,

        DW_FORM_data1 | DW_FORM_ref1 | DW_FORM_flag | DW_FORM_strx1 | DW_FORM_addrx1 => {
            u64::from(cursor.u8("1-byte value")?)
        }
        DW_FORM_data2 | DW_FORM_ref2 | DW_FORM_strx2 | DW_FORM_addrx2 => {
            u64::from(cursor.u16("2-byte value")?)
        }
        DW_FORM_strx3 | DW_FORM_addrx3 => cursor.uint(3, "3-byte value")?,
        DW_FORM_data4 | DW_FORM_ref4 | DW_FORM_strp | DW_FORM_line_strp | DW_FORM_sec_offset
        | DW_FORM_ref_sup4 | DW_FORM_strp_sup | DW_FORM_strx4 | DW_FORM_addrx4
        | DW_FORM_GNU_ref_alt | DW_FORM_GNU_strp_alt => u64::from(cursor.u32("4-byte value")?),
        DW_FORM_data8 | DW_FORM_ref8 | DW_FORM_ref_sig8 | DW_FORM_ref_sup8 => {
            cursor.u64("8-byte value")?
        }
        DW_FORM_data16 => {
            cursor.skip(16, "16-byte value")?;
            0
        }

        DW_FORM_sdata => cursor.sleb128("sdata value")? as u64,
        DW_FORM_udata | DW_FORM_ref_udata | DW_FORM_strx | DW_FORM_addrx | DW_FORM_loclistx
        | DW_FORM_rnglistx | DW_FORM_GNU_addr_index | DW_FORM_GNU_str_index => {
            cursor.uleb128("udata value")?
        }

        // 4 bytes from DWARF 3 on, address-sized in DWARF 2.
        DW_FORM_ref_addr => {
            if header.version == 2 {
                cursor.uint(usize::from(header.address_size), "DWARF 2 reference address")?
            } else {
                u64::from(cursor.u32("reference address")?)
            }
        }

        DW_FORM_string => {
            cursor.cstr("inline string")?;
            0
        }
        DW_FORM_block1 => {
            let len = usize::from(cursor.u8("block length")?);
            cursor.skip(len, "block contents")?;
            0
        }
        DW_FORM_block2 => {
            let len = usize::from(cursor.u16("block length")?);
            cursor.skip(len, "block contents")?;
            0
        }
        DW_FORM_block4 => {
            let len = cursor.u32("block length")? as usize;
            cursor.skip(len, "block contents")?;
            0
        }
        DW_FORM_block | DW_FORM_exprloc => {
            let len = cursor.uleb128("block length")? as usize;
            cursor.skip(len, "block contents")?;
            0
        }

        DW_FORM_flag_present => 1,
        DW_FORM_implicit_const => spec.implicit_const.unwrap_or(0) as u64,

        DW_FORM_indirect => {
            let indirect = cursor.uleb128("indirect form")?;
            let indirect =
                DwForm(u16::try_from(indirect).map_err(|_| Error::FormOutOfRange(indirect))?);
            if indirect == DW_FORM_indirect {
                return Err(Error::UnknownForm(cursor.pos() as u64, indirect));
            }
            read_form_value(cursor, spec, header, indirect)?
        }

        _ => return Err(Error::UnknownForm(cursor.pos() as u64, form)),
    };

    Ok(value)
}
