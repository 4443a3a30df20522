use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Diagnostics emitted while loading, scanning or rewriting a binary.
///
/// Every variant is fatal: offsets downstream of a misparse are meaningless,
/// so there is no local recovery or partial-success mode.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to open input file `{1}`")]
    OpenInput(#[source] std::io::Error, String),
    #[error("Failed to map input file `{1}`")]
    MapInput(#[source] std::io::Error, String),
    #[error("`{0}` is not an ELF or Mach-O binary")]
    UnrecognizedContainer(String),
    #[error("`{0}` is a 32-bit binary, only 64-bit binaries are supported")]
    Unsupported32Bit(String),
    #[error("`{0}` has no section header table")]
    NoSectionHeaders(String),
    #[error("`{0}` has no section name string table")]
    NoSectionNames(String),
    #[error("`{0}` has no `__DWARF` segment")]
    NoDwarfSegment(String),
    #[error("Missing required debug section `{0}`")]
    MissingDebugSection(&'static str),
    #[error("Truncated `{section}` while reading {what} at offset {offset:#x}")]
    Truncated { section: &'static str, offset: usize, what: &'static str },
    #[error("LEB128 value in `{0}` at offset {1:#x} does not fit in 64 bits")]
    Leb128Overflow(&'static str, usize),
    #[error("Section offset {0:#x} is smaller than the recorded compaction shrinkage {1}")]
    OffsetUnderflow(usize, u32),
    #[error("64-bit DWARF unit at offset {0:#x} is not supported")]
    UnsupportedDwarf64(u64),
    #[error("Unsupported DWARF version {1} in unit at offset {0:#x}")]
    UnsupportedDwarfVersion(u64, u16),
    #[error("Abbreviation tag {0:#x} does not fit DWARF's 16-bit encoding")]
    TagOutOfRange(u64),
    #[error("Attribute name {0:#x} does not fit DWARF's 16-bit encoding")]
    AttributeOutOfRange(u64),
    #[error("Attribute form {0:#x} does not fit DWARF's 16-bit encoding")]
    FormOutOfRange(u64),
    #[error("No abbreviation declared for code {1} read at offset {0:#x}")]
    UnknownAbbrevCode(u64, u64),
    #[error("Unknown attribute form {1} at offset {0:#x}")]
    UnknownForm(u64, gimli::DwForm),
    #[error("Unit at offset {offset:#x} declares length {declared:#x} but its entries end at {actual:#x}")]
    UnitLengthMismatch { offset: u64, declared: u64, actual: u64 },
    #[error("Unterminated sibling list in unit at offset {0:#x}")]
    UnterminatedSiblingList(u64),
    #[error("`{0}` is already compacted")]
    AlreadyZipped(String),
    #[error("`{0}` is not compacted")]
    NotZipped(String),
    #[error("Expanding a compacted binary is not supported; the compact form is read in place")]
    ExpandUnsupported,
    #[error("Compacted `.debug_info` is larger than the original, refusing to write `{0}`")]
    ZipGrewOutput(String),
    #[error("Failed to create output file `{1}`")]
    CreateOutput(#[source] std::io::Error, String),
    #[error("Failed to write output file `{1}`")]
    WriteOutput(#[source] std::io::Error, String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
