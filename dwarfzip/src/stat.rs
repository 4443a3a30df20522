//! Per-category size accounting over a scan of `.debug_info`.

use std::{
    collections::BTreeMap,
    io::{self, Write},
};

use gimli::{DwAt, DwForm};
use tracing::info;

use crate::{
    leb128,
    scan::{UnitHeader, Visitor},
};

/// Count and byte total for one accounting bucket.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Bucket {
    pub count: u32,
    pub bytes: u64,
}

impl Bucket {
    fn add(&mut self, bytes: u64) {
        self.count += 1;
        self.bytes += bytes;
    }
}

/// Visitor accumulating size breakdowns: global unit/abbreviation/attribute
/// totals, per-attribute-name and per-form buckets, and for `DW_FORM_ref4`
/// attributes an estimate of how much a signed or unsigned LEB128 re-encoding
/// of the value would take.
///
/// Buckets are keyed by the raw attribute/form number so the report can
/// iterate them in a stable order.
#[derive(Default)]
pub struct StatCollector {
    units: Bucket,
    abbrevs: Bucket,
    attrs: Bucket,
    by_name: BTreeMap<u16, Bucket>,
    by_form: BTreeMap<u16, Bucket>,
    ref4_by_name: BTreeMap<u16, Bucket>,
    ref4_sleb_by_name: BTreeMap<u16, Bucket>,
    ref4_uleb_by_name: BTreeMap<u16, Bucket>,
    last_offset: u64,
}

impl StatCollector {
    pub fn new() -> Self {
        StatCollector::default()
    }

    /// Total bytes consumed so far; after a full scan, the section length.
    pub fn total_size(&self) -> u64 {
        self.last_offset
    }

    pub fn units(&self) -> Bucket {
        self.units
    }

    pub fn abbrevs(&self) -> Bucket {
        self.abbrevs
    }

    pub fn attrs(&self) -> Bucket {
        self.attrs
    }

    pub fn name_bucket(&self, name: DwAt) -> Bucket {
        self.by_name.get(&name.0).copied().unwrap_or_default()
    }

    pub fn form_bucket(&self, form: DwForm) -> Bucket {
        self.by_form.get(&form.0).copied().unwrap_or_default()
    }

    /// Write the breakdown report: totals, then per-name, per-form, and the
    /// ref4 delta-encoding estimates.
    pub fn write_report(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "total size: {}", self.last_offset)?;
        writeln!(out, "CU: {} {}", self.units.count, self.units.bytes)?;
        writeln!(out, "abbrev: {} {}", self.abbrevs.count, self.abbrevs.bytes)?;
        writeln!(out, "attr: {} {}", self.attrs.count, self.attrs.bytes)?;

        for (&name, bucket) in &self.by_name {
            writeln!(out, "{}: {} {}", DwAt(name), bucket.count, bucket.bytes)?;
        }
        for (&form, bucket) in &self.by_form {
            writeln!(out, "{}: {} {}", DwForm(form), bucket.count, bucket.bytes)?;
        }

        for (&name, bucket) in &self.ref4_by_name {
            writeln!(out, "ref4_{}: {} {}", DwAt(name), bucket.count, bucket.bytes)?;
            let sleb = self.ref4_sleb_by_name.get(&name).copied().unwrap_or_default();
            writeln!(out, "ref4_sdata_{}: {} {}", DwAt(name), sleb.count, sleb.bytes)?;
            let uleb = self.ref4_uleb_by_name.get(&name).copied().unwrap_or_default();
            writeln!(out, "ref4_udata_{}: {} {}", DwAt(name), uleb.count, uleb.bytes)?;
        }

        Ok(())
    }
}

impl Visitor for StatCollector {
    fn unit(&mut self, header: &UnitHeader, offset: u64) {
        info!(
            unit = self.units.count,
            offset = self.last_offset,
            length = header.length,
            version = header.version,
            address_size = header.address_size,
            "compilation unit"
        );
        self.units.add(offset - self.last_offset);
        self.last_offset = offset;
    }

    fn abbrev(&mut self, _code: u64, offset: u64) {
        self.abbrevs.add(offset - self.last_offset);
        self.last_offset = offset;
    }

    fn attr(&mut self, name: DwAt, form: DwForm, value: u64, offset: u64) {
        let size = offset - self.last_offset;
        self.attrs.add(size);
        self.by_name.entry(name.0).or_default().add(size);
        self.by_form.entry(form.0).or_default().add(size);

        if form == gimli::DW_FORM_ref4 {
            self.ref4_by_name.entry(name.0).or_default().add(size);
            let mut buf = Vec::with_capacity(10);
            let sleb_len = leb128::signed(&mut buf, value as i64);
            self.ref4_sleb_by_name.entry(name.0).or_default().add(sleb_len as u64);
            buf.clear();
            let uleb_len = leb128::unsigned(&mut buf, value);
            self.ref4_uleb_by_name.entry(name.0).or_default().add(uleb_len as u64);
        }

        self.last_offset = offset;
    }
}
