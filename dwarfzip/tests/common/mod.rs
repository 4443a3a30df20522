//! Shared fixture builders: synthetic DWARF sections and minimal 64-bit
//! containers to put them in.

use object::{
    write::Object, Architecture, BinaryFormat, Endianness, SectionKind,
};

/// Abbreviation table declaring 1 = compile unit with children and a single
/// `DW_AT_type`/`DW_FORM_ref4` attribute, 2 = childless base type with the
/// same attribute.
pub fn ref4_abbrev() -> Vec<u8> {
    vec![
        0x01, 0x11, 0x01, 0x49, 0x13, 0x00, 0x00, //
        0x02, 0x24, 0x00, 0x49, 0x13, 0x00, 0x00, //
        0x00,
    ]
}

/// One DWARF 4 unit: a root entry holding `values[0]`, one childless child
/// per remaining value, and the children's sibling-list terminator.
pub fn ref4_unit(values: &[u32]) -> Vec<u8> {
    let mut body = Vec::new();
    for (i, value) in values.iter().enumerate() {
        body.push(if i == 0 { 0x01 } else { 0x02 });
        body.extend_from_slice(&value.to_le_bytes());
    }
    body.push(0x00);

    let length = u32::try_from(7 + body.len()).unwrap();
    let mut unit = Vec::new();
    unit.extend_from_slice(&length.to_le_bytes());
    unit.extend_from_slice(&4u16.to_le_bytes());
    unit.extend_from_slice(&0u32.to_le_bytes());
    unit.push(8);
    unit.extend_from_slice(&body);
    unit
}

/// Build an ELF64 relocatable object carrying the three debug sections.
/// `.debug_abbrev` and `.debug_str` are added first so they precede
/// `.debug_info` in the file; the string/section tables the writer appends
/// land after it, matching the layout the compaction offset math expects.
pub fn elf_with_debug(info: &[u8], abbrev: &[u8], strs: &[u8]) -> Vec<u8> {
    let mut obj = Object::new(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little);
    let abbrev_id = obj.add_section(Vec::new(), b".debug_abbrev".to_vec(), SectionKind::Debug);
    obj.append_section_data(abbrev_id, abbrev, 1);
    let str_id = obj.add_section(Vec::new(), b".debug_str".to_vec(), SectionKind::Debug);
    obj.append_section_data(str_id, strs, 1);
    let info_id = obj.add_section(Vec::new(), b".debug_info".to_vec(), SectionKind::Debug);
    obj.append_section_data(info_id, info, 1);
    obj.write().expect("failed to build ELF fixture")
}

fn name16(name: &[u8]) -> [u8; 16] {
    let mut field = [0u8; 16];
    field[..name.len()].copy_from_slice(name);
    field
}

/// Build a minimal Mach-O64 image by hand: one `LC_SEGMENT_64` named
/// `__DWARF` holding the three debug sections.
pub fn macho_with_debug(info: &[u8], abbrev: &[u8], strs: &[u8]) -> Vec<u8> {
    const SEGMENT_COMMAND_SIZE: u32 = 72;
    const SECTION_ENTRY_SIZE: u32 = 80;
    let sizeofcmds = SEGMENT_COMMAND_SIZE + 3 * SECTION_ENTRY_SIZE;
    let data_start = 32 + sizeofcmds as usize;
    let sections: [(&[u8], &[u8]); 3] =
        [(b"__debug_info", info), (b"__debug_abbrev", abbrev), (b"__debug_str", strs)];
    let total_data: usize = sections.iter().map(|(_, bytes)| bytes.len()).sum();

    let mut out = Vec::new();
    // mach_header_64
    out.extend_from_slice(&0xfeed_facfu32.to_le_bytes());
    out.extend_from_slice(&0x0100_0007u32.to_le_bytes()); // CPU_TYPE_X86_64
    out.extend_from_slice(&3u32.to_le_bytes()); // CPU_SUBTYPE_X86_64_ALL
    out.extend_from_slice(&1u32.to_le_bytes()); // MH_OBJECT
    out.extend_from_slice(&1u32.to_le_bytes()); // ncmds
    out.extend_from_slice(&sizeofcmds.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // flags
    out.extend_from_slice(&0u32.to_le_bytes()); // reserved

    // segment_command_64
    out.extend_from_slice(&0x19u32.to_le_bytes()); // LC_SEGMENT_64
    out.extend_from_slice(&sizeofcmds.to_le_bytes());
    out.extend_from_slice(&name16(b"__DWARF"));
    out.extend_from_slice(&0u64.to_le_bytes()); // vmaddr
    out.extend_from_slice(&(total_data as u64).to_le_bytes()); // vmsize
    out.extend_from_slice(&(data_start as u64).to_le_bytes()); // fileoff
    out.extend_from_slice(&(total_data as u64).to_le_bytes()); // filesize
    out.extend_from_slice(&7i32.to_le_bytes()); // maxprot
    out.extend_from_slice(&3i32.to_le_bytes()); // initprot
    out.extend_from_slice(&3u32.to_le_bytes()); // nsects
    out.extend_from_slice(&0u32.to_le_bytes()); // flags

    let mut offset = data_start;
    for (name, bytes) in sections {
        out.extend_from_slice(&name16(name));
        out.extend_from_slice(&name16(b"__DWARF"));
        out.extend_from_slice(&0u64.to_le_bytes()); // addr
        out.extend_from_slice(&(bytes.len() as u64).to_le_bytes()); // size
        out.extend_from_slice(&(offset as u32).to_le_bytes()); // offset
        out.extend_from_slice(&0u32.to_le_bytes()); // align
        out.extend_from_slice(&0u32.to_le_bytes()); // reloff
        out.extend_from_slice(&0u32.to_le_bytes()); // nreloc
        out.extend_from_slice(&0u32.to_le_bytes()); // flags
        out.extend_from_slice(&[0u8; 12]); // reserved1..3
        offset += bytes.len();
    }

    for (_, bytes) in sections {
        out.extend_from_slice(bytes);
    }
    out
}
