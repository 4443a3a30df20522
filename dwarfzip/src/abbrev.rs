//! Parsing of `.debug_abbrev` tables.

use std::collections::HashMap;

use gimli::{DwAt, DwForm, DwTag};

use crate::{
    error::{Error, Result},
    util::Cursor,
};

/// One (attribute name, form) pair in an abbreviation declaration.
///
/// `DW_FORM_implicit_const` carries its value inside the declaration rather
/// than in the entry stream; it is kept here so the walker can report it with
/// a zero-length field.
#[derive(Copy, Clone, Debug)]
pub(crate) struct AttrSpec {
    pub(crate) name: DwAt,
    pub(crate) form: DwForm,
    pub(crate) implicit_const: Option<i64>,
}

/// A single abbreviation declaration: entry tag, has-children flag and the
/// ordered attribute list that entries using this code follow.
#[derive(Clone, Debug)]
pub(crate) struct AbbrevDecl {
    pub(crate) tag: DwTag,
    pub(crate) has_children: bool,
    pub(crate) attrs: Vec<AttrSpec>,
}

/// Abbreviation declarations for one compilation unit, keyed by code.
///
/// Code 0 is reserved as the sibling-list terminator and never appears here.
#[derive(Debug, Default)]
pub(crate) struct AbbrevTable {
    decls: HashMap<u64, AbbrevDecl>,
}

impl AbbrevTable {
    /// Parse the abbreviation sub-table starting at the beginning of `data`
    /// (the `.debug_abbrev` section sliced at a unit's abbreviation offset).
    /// A code of 0 terminates the sub-table; reading past the section is a
    /// fatal format error.
    pub(crate) fn parse(data: &[u8]) -> Result<AbbrevTable> {
        let mut cursor = Cursor::new(data, ".debug_abbrev");
        let mut decls = HashMap::new();

        loop {
            let code = cursor.uleb128("abbreviation code")?;
            if code == 0 {
                break;
            }

            let tag = cursor.uleb128("abbreviation tag")?;
            let tag = DwTag(u16::try_from(tag).map_err(|_| Error::TagOutOfRange(tag))?);
            let has_children = cursor.u8("has-children flag")? != 0;

            let mut attrs = Vec::new();
            loop {
                let name = cursor.uleb128("attribute name")?;
                let form = cursor.uleb128("attribute form")?;
                if name == 0 && form == 0 {
                    break;
                }
                let name = DwAt(u16::try_from(name).map_err(|_| Error::AttributeOutOfRange(name))?);
                let form = DwForm(u16::try_from(form).map_err(|_| Error::FormOutOfRange(form))?);
                let implicit_const = if form == gimli::DW_FORM_implicit_const {
                    Some(cursor.sleb128("implicit const value")?)
                } else {
                    None
                };
                attrs.push(AttrSpec { name, form, implicit_const });
            }

            decls.insert(code, AbbrevDecl { tag, has_children, attrs });
        }

        Ok(AbbrevTable { decls })
    }

    pub(crate) fn get(&self, code: u64) -> Option<&AbbrevDecl> {
        self.decls.get(&code)
    }
}
