// Path: crates/consensus/src/util.rs
//! Small shared helpers for the consensus core.

use std::time::{SystemTime, UNIX_EPOCH};

use num_bigint::BigUint;

/// Current unix time in whole seconds.
pub(crate) fn now_unix_secs() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs() as i64,
        Err(_) => 0,
    }
}

/// Current unix time in milliseconds.
pub(crate) fn now_unix_millis() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_millis() as i64,
        Err(_) => 0,
    }
}

/// Renders a big integer as fixed-width big-endian bytes, left-padded with
/// zeros. Values wider than `width` keep their low-order bytes.
pub(crate) fn fill_bytes_be(value: &BigUint, width: usize) -> Vec<u8> {
    let raw = value.to_bytes_be();
    let mut out = vec![0u8; width];
    let skip = raw.len().saturating_sub(width);
    let tail = raw.get(skip..).unwrap_or(&[]);
    let offset = width - tail.len();
    if let Some(dst) = out.get_mut(offset..) {
        dst.copy_from_slice(tail);
    }
    out
}
