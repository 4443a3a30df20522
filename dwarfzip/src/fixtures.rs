//! Synthetic DWARF byte streams shared by the unit tests.

/// Abbreviation table declaring 1 = compile unit with children and a single
/// `DW_AT_type`/`DW_FORM_ref4` attribute, 2 = childless base type with the
/// same attribute.
pub(crate) fn ref4_abbrev() -> Vec<u8> {
    vec![
        0x01, 0x11, 0x01, 0x49, 0x13, 0x00, 0x00, //
        0x02, 0x24, 0x00, 0x49, 0x13, 0x00, 0x00, //
        0x00,
    ]
}

/// One DWARF 4 unit: a root entry holding `values[0]`, one childless child
/// per remaining value, and the children's sibling-list terminator.
pub(crate) fn ref4_unit(values: &[u32]) -> Vec<u8> {
    let mut body = Vec::new();
    for (i, value) in values.iter().enumerate() {
        body.push(if i == 0 { 0x01 } else { 0x02 });
        body.extend_from_slice(&value.to_le_bytes());
    }
    body.push(0x00);
    unit_with_body(&body)
}

/// Wrap `body` in a DWARF 4 unit header (abbreviation offset 0, address
/// size 8).
pub(crate) fn unit_with_body(body: &[u8]) -> Vec<u8> {
    let length = u32::try_from(7 + body.len()).expect("fixture unit fits in 32 bits");
    let mut unit = Vec::with_capacity(11 + body.len());
    unit.extend_from_slice(&length.to_le_bytes());
    unit.extend_from_slice(&4u16.to_le_bytes());
    unit.extend_from_slice(&0u32.to_le_bytes());
    unit.push(8);
    unit.extend_from_slice(body);
    unit
}
