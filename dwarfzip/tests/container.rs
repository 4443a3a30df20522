//! Container-loading behavior across both formats and their failure modes.

mod common;

use std::fs;

use dwarfzip::{Container, Error, Format, ZIP_MAGIC};

fn write_fixture(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn elf_sections_are_located_by_name() {
    let info = common::ref4_unit(&[100]);
    let abbrev = common::ref4_abbrev();
    let strs = b"int\0char\0";
    let elf = common::elf_with_debug(&info, &abbrev, strs);

    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(&dir, "plain.o", &elf);
    let container = Container::open(&path).unwrap();

    assert_eq!(container.format(), Format::Elf64);
    assert!(!container.is_zipped());
    assert_eq!(container.reduced_size(), 0);
    assert_eq!(container.size(), elf.len());
    assert_eq!(container.debug_info(), info);
    assert_eq!(container.debug_abbrev(), abbrev);
    assert_eq!(container.debug_str(), strs);
}

#[test]
fn macho_sections_are_located_in_the_dwarf_segment() {
    let info = common::ref4_unit(&[100]);
    let abbrev = common::ref4_abbrev();
    let strs = b"int\0";
    let macho = common::macho_with_debug(&info, &abbrev, strs);

    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(&dir, "plain.macho", &macho);
    let container = Container::open(&path).unwrap();

    assert_eq!(container.format(), Format::MachO64);
    assert!(!container.is_zipped());
    assert_eq!(container.debug_info(), info);
    assert_eq!(container.debug_abbrev(), abbrev);
    assert_eq!(container.debug_str(), strs);
}

#[test]
fn elf32_is_rejected_explicitly() {
    let mut elf =
        common::elf_with_debug(&common::ref4_unit(&[1]), &common::ref4_abbrev(), b"\0");
    elf[4] = 1; // EI_CLASS = ELFCLASS32

    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(&dir, "elf32.o", &elf);
    assert!(matches!(Container::open(&path), Err(Error::Unsupported32Bit(_))));
}

#[test]
fn macho32_is_rejected_explicitly() {
    let mut macho =
        common::macho_with_debug(&common::ref4_unit(&[1]), &common::ref4_abbrev(), b"\0");
    macho[..4].copy_from_slice(&0xfeed_faceu32.to_le_bytes());

    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(&dir, "macho32", &macho);
    assert!(matches!(Container::open(&path), Err(Error::Unsupported32Bit(_))));
}

#[test]
fn unknown_container_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(&dir, "garbage", b"definitely not an executable");
    assert!(matches!(Container::open(&path), Err(Error::UnrecognizedContainer(_))));
}

#[test]
fn zip_header_followed_by_garbage_is_a_format_error() {
    let mut bytes = ZIP_MAGIC.to_vec();
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(b"neither elf nor mach-o follows here");

    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(&dir, "zipped-garbage", &bytes);
    assert!(matches!(Container::open(&path), Err(Error::UnrecognizedContainer(_))));
}

#[test]
fn missing_debug_section_is_fatal() {
    // An ELF with only two of the three required sections.
    let mut obj = object::write::Object::new(
        object::BinaryFormat::Elf,
        object::Architecture::X86_64,
        object::Endianness::Little,
    );
    let abbrev_id =
        obj.add_section(Vec::new(), b".debug_abbrev".to_vec(), object::SectionKind::Debug);
    obj.append_section_data(abbrev_id, &common::ref4_abbrev(), 1);
    let info_id = obj.add_section(Vec::new(), b".debug_info".to_vec(), object::SectionKind::Debug);
    obj.append_section_data(info_id, &common::ref4_unit(&[1]), 1);
    let elf = obj.write().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(&dir, "partial.o", &elf);
    assert!(matches!(Container::open(&path), Err(Error::MissingDebugSection(".debug_str"))));
}

#[test]
fn missing_file_is_an_environment_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist");
    assert!(matches!(Container::open(&path), Err(Error::OpenInput(..))));
}
