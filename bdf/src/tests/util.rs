use crate::util::*;

#[test]
fn test_parse_real() {
  let assert_near = |s: &str, x: f64| {
    let y = parse_real(s).unwrap();
    assert!((x - y).abs() <= 1e-12 * x.abs().max(1.0), "{} -> {}", s, y);
  };
  assert_near("1.", 1.0);
  assert_near(" -0.5 ", -0.5);
  assert_near("1.5-3", 1.5e-3);
  assert_near("-2.+4", -2.0e4);
  assert_near("7.E2", 700.0);
  assert_near("3.D-1", 0.3);
  assert_near("1e3", 1000.0);
  // integers and junk aren't reals
  assert_eq!(parse_real("1"), None);
  assert_eq!(parse_real("+5"), None);
  assert_eq!(parse_real(""), None);
  assert_eq!(parse_real("1.0x"), None);
  assert_eq!(parse_real("abc"), None);
}

#[test]
fn test_parse_integer() {
  assert_eq!(parse_integer("12"), Some(12));
  assert_eq!(parse_integer(" -3 "), Some(-3));
  assert_eq!(parse_integer("1."), None);
  assert_eq!(parse_integer("1.0"), None);
  assert_eq!(parse_integer(""), None);
}

#[test]
fn test_fmt_real_8() {
  assert_eq!(fmt_real_8(0.0), "0.");
  assert_eq!(fmt_real_8(1.0), "1.");
  assert_eq!(fmt_real_8(0.5), ".5");
  assert_eq!(fmt_real_8(-0.5), "-.5");
  assert_eq!(fmt_real_8(-12.25), "-12.25");
  assert_eq!(fmt_real_8(1.234e-12), "1.234-12");
  assert_eq!(fmt_real_8(12345678.0), "1.2346+7");
  // whatever comes out always fits and reads back close enough
  for x in [3.14159265358979, -1.0e-30, 2.5e30, 123456.789, -0.001234] {
    let s = fmt_real_8(x);
    assert!(s.len() <= SMALL_FIELD, "{} is too long", s);
    let y = decode_nasfloat(&s).unwrap();
    assert!((x - y).abs() <= 1e-3 * x.abs(), "{} -> {}", x, s);
  }
}

#[test]
fn test_sorting_helpers() {
  let keys = [30, 10, 20, 10];
  let order = argsort(&keys);
  // stable: the two 10s keep their order
  assert_eq!(order, vec![1, 3, 2, 0]);
  assert_eq!(permute(&keys, &order), vec![10, 10, 20, 30]);
  assert_eq!(permute(&["a", "b", "c", "d"], &order), vec!["b", "d", "c", "a"]);
  let sorted = [10, 20, 30];
  assert_eq!(search_sorted(&sorted, &20), 1);
  assert_eq!(search_sorted(&sorted, &5), 0);
  assert_eq!(search_sorted(&sorted, &25), 2);
  assert_eq!(search_sorted(&sorted, &99), 3);
  assert_eq!(search_sorted::<i32>(&[], &1), 0);
}
