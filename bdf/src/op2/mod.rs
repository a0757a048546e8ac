//! This module implements decoders for records from binary OP2 tables. Only
//! the record payloads are handled here; finding them inside a file is up to
//! the caller.

pub mod geom1;

/// The three-integer key that identifies the kind of a record.
pub type RecordKey = (i32, i32, i32);

/// Size of a single word in a record, in bytes.
pub(crate) const WORD: usize = 4;

/// Reads a native-endian integer word from a record.
pub(crate) fn int_word(rec: &[u8], word: usize) -> i32 {
  let mut bytes = [0u8; WORD];
  bytes.copy_from_slice(&rec[WORD*word..WORD*(word + 1)]);
  return i32::from_ne_bytes(bytes);
}

/// Reads a native-endian real word from a record.
pub(crate) fn real_word(rec: &[u8], word: usize) -> f32 {
  let mut bytes = [0u8; WORD];
  bytes.copy_from_slice(&rec[WORD*word..WORD*(word + 1)]);
  return f32::from_ne_bytes(bytes);
}
