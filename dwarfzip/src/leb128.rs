//! LEB128 encoders used by the compaction codec and the size estimator.
//!
//! The matching decoders live on `util::Cursor` and mirror these bit-for-bit:
//! a value written here reads back identically, and the compact container
//! format depends on that.

/// Append `value` as unsigned LEB128, returning the number of bytes written.
pub(crate) fn unsigned(out: &mut Vec<u8>, mut value: u64) -> usize {
    let start = out.len();
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            return out.len() - start;
        }
    }
}

/// Append `value` as signed LEB128, returning the number of bytes written.
pub(crate) fn signed(out: &mut Vec<u8>, mut value: i64) -> usize {
    let start = out.len();
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        let done = (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0);
        out.push(if done { byte } else { byte | 0x80 });
        if done {
            return out.len() - start;
        }
    }
}
