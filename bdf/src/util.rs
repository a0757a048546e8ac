//! This module implements utility functions without much need for defining
//! context or not enough of it to warrant them having their own modules.

use std::cell::Cell;

/// The width of a small fixed field, in characters.
pub const SMALL_FIELD: usize = 8;

/// The width of a large fixed field, in characters.
pub const LARGE_FIELD: usize = 2*SMALL_FIELD;

/// Decodes a Nastran-format floating point number. Hyper-lenient and doesn't
/// require pulling a whole regex library.
pub(crate) fn decode_nasfloat(s: &str) -> Option<f64> {
  // mantissa start/end, exponent start/end
  let mut ixs: [usize; 4] = [0, 0, 0, 0];
  // 0-1 = looking for mantissa start/end, 2-3 = looking for exponent start/end
  let step: Cell<usize> = 0.into();
  let mut mark = |i| { ixs[step.get()] = i; step.replace(step.get() + 1); };
  let mut seen_chars: usize = 0;
  for (i, c) in s.char_indices() {
    seen_chars = i + c.len_utf8();
    match (step.get() % 2, c.is_ascii_digit() || c == '.', c == '+' || c == '-')
    {
      // looking for number start. nothing yet. keep looking.
      (0, false, false) => continue,
      // looking for number start, found something. mark it and look for end.
      (0, _, _) => mark(i),
      // looking for number end, saw number/dot. keep looking.
      (1, true, _) => continue,
      // looking for number end, saw not numerical/dot/sign. mark end.
      (1, false, false) => mark(i),
      // looking for number end, saw sign. mark end, mark start.
      (1, _, true) => { mark(i); mark(i); },
      // should be unreachable
      _ => return None
    };
    if step.get() > 3 { break; }
  }
  // handle empty string
  if seen_chars == 0 {
    return None;
  }
  // handle end at end-of-string
  if step.get() % 2 == 1 {
    mark(seen_chars);
  }
  let mantissa = || s[ixs[0]..ixs[1]].parse::<f64>().ok();
  let exponent = || s[ixs[2]..ixs[3]].parse::<i32>().ok();
  return match step.get() {
    // never found mantissa
    0 => None,
    // only found a mantissa
    2 => mantissa(),
    // found mantissa and exponent
    4 => Some(mantissa()? * 10.0_f64.powi(exponent()?)),
    _ => None
  };
}

/// Strictly parses a real field from bulk data. Unlike `decode_nasfloat`, this
/// rejects garbage characters and integers (a real needs a dot or an exponent
/// to count as a real in Nastran input).
pub(crate) fn parse_real(s: &str) -> Option<f64> {
  let s = s.trim();
  let valid_chars = s.chars().all(|c| {
    c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E' | 'd' | 'D')
  });
  if s.is_empty() || !valid_chars {
    return None;
  }
  // an exponent needs something before it, "+5" is an integer
  let has_exponent = s.chars()
    .skip(1)
    .any(|c| matches!(c, 'e' | 'E' | 'd' | 'D' | '+' | '-'));
  if !s.contains('.') && !has_exponent {
    return None;
  }
  let x = decode_nasfloat(s)?;
  return if x.is_finite() { Some(x) } else { None };
}

/// Strictly parses an integer field from bulk data.
pub(crate) fn parse_integer(s: &str) -> Option<i32> {
  return s.trim().parse::<i32>().ok();
}

/// Trims a decimal-formatted number down to what Nastran needs: no trailing
/// zeros, always a dot, no leading zero before the dot.
fn trim_decimal(s: String) -> String {
  let mut s = if s.contains('.') {
    s.trim_end_matches('0').to_owned()
  } else {
    format!("{}.", s)
  };
  if s.starts_with("0.") {
    s.remove(0);
  } else if s.starts_with("-0.") {
    s.remove(1);
  }
  return s;
}

/// Formats a mantissa/exponent pair from Rust's `{:e}` output into Nastran's
/// shorthand, like `1.25-7` or `-3.+12`.
fn nastran_exponent(s: &str) -> Option<String> {
  let (mantissa, exponent) = s.split_once('e')?;
  let mantissa = if mantissa.contains('.') {
    mantissa.trim_end_matches('0').to_owned()
  } else {
    format!("{}.", mantissa)
  };
  let exponent: i32 = exponent.parse().ok()?;
  return Some(if exponent < 0 {
    format!("{}{}", mantissa, exponent)
  } else {
    format!("{}+{}", mantissa, exponent)
  });
}

/// Formats a real so it fits within a small field, choosing whichever of the
/// decimal and exponent forms keeps more precision.
pub fn fmt_real_8(x: f64) -> String {
  if x == 0.0 {
    return "0.".to_owned();
  }
  let error = |s: &str| {
    return decode_nasfloat(s).map_or(f64::INFINITY, |y| (y - x).abs());
  };
  let decimal = (0..SMALL_FIELD)
    .rev()
    .map(|prec| trim_decimal(format!("{:.prec$}", x, prec = prec)))
    .find(|s| s.len() <= SMALL_FIELD);
  let scientific = (0..SMALL_FIELD - 1)
    .rev()
    .filter_map(|prec| nastran_exponent(&format!("{:.prec$e}", x, prec = prec)))
    .find(|s| s.len() <= SMALL_FIELD);
  return match (decimal, scientific) {
    (Some(d), Some(s)) => if error(&d) <= error(&s) { d } else { s },
    (Some(d), None) => d,
    (None, Some(s)) => s,
    // a finite f64 always fits in exponent form; this is for NaN and friends
    (None, None) => format!("{:>8}", x).chars().take(SMALL_FIELD).collect()
  };
}

/// Returns the permutation that stably sorts some keys.
pub(crate) fn argsort<K: Ord>(keys: &[K]) -> Vec<usize> {
  let mut order: Vec<usize> = (0..keys.len()).collect();
  order.sort_by(|&a, &b| keys[a].cmp(&keys[b]));
  return order;
}

/// Applies a permutation (as returned by `argsort`) to a column.
pub(crate) fn permute<T: Clone>(column: &[T], order: &[usize]) -> Vec<T> {
  return order.iter().map(|&i| column[i].clone()).collect();
}

/// Binary searches a sorted column, searchsorted-style: returns where the key
/// is, or where it would be inserted if it's absent.
pub(crate) fn search_sorted<K: Ord>(sorted: &[K], key: &K) -> usize {
  return sorted.partition_point(|k| k < key);
}
