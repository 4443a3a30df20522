//! Inspect and compact the DWARF debug information of 64-bit ELF and Mach-O
//! binaries.
//!
//! The crate walks `.debug_info` with an abbreviation-table-driven decoder,
//! reporting one event per structural step to a [`Visitor`]. Two visitors are
//! provided: [`StatCollector`] accumulates size breakdowns by unit, attribute
//! name and value form; [`ZipEncoder`] re-serializes the stream with
//! frequently-repeating 4-byte reference fields delta-encoded, and
//! [`write_zipped`] splices that stream back into a copy of the original
//! file behind an 8-byte header. [`Container::open`] transparently reverses
//! that header, so a compacted binary can be inspected like any other.

pub use crate::{
    container::{Container, Format},
    error::{Error, Result},
    scan::{scan, UnitHeader, Visitor},
    stat::{Bucket, StatCollector},
    zip::{write_zipped, ZipEncoder, ZipSummary, ZIP_HEADER_SIZE, ZIP_MAGIC},
};

mod abbrev;
mod container;
mod error;
#[cfg(test)]
mod fixtures;
mod leb128;
mod scan;
mod stat;
mod util;
mod zip;
