/// Reads a leading one- or two-digit answer index out of model output.
///
/// `"3) Kronverksky"` gives `3`, `"12 ..."` gives `12` and `"1900 ..."` gives
/// `19`: only the first two characters are ever inspected. The number is not
/// checked against any option range.
pub fn extract_answer(text: &str) -> Option<i64> {
    let mut chars = text.chars();
    let first = chars.next()?.to_digit(10)?;
    match chars.next().and_then(|c| c.to_digit(10)) {
        Some(second) => Some(i64::from(first * 10 + second)),
        None => Some(i64::from(first)),
    }
}

#[test]
fn test_two_leading_digits() {
    assert_eq!(extract_answer("12"), Some(12));
    assert_eq!(extract_answer("42 is the answer"), Some(42));
    assert_eq!(extract_answer("07. option seven"), Some(7));
    assert_eq!(
        extract_answer("1900 — ITMO was founded as a school of..."),
        Some(19)
    );
}

#[test]
fn test_single_leading_digit() {
    assert_eq!(extract_answer("3"), Some(3));
    assert_eq!(extract_answer("3) Kronverksky prospekt"), Some(3));
    assert_eq!(extract_answer("1. Saint Petersburg"), Some(1));
    assert_eq!(extract_answer("5а"), Some(5));
}

#[test]
fn test_no_leading_digit() {
    assert_eq!(extract_answer(""), None);
    assert_eq!(extract_answer(" 1 leading space"), None);
    assert_eq!(extract_answer("Ответ: 2"), None);
    assert_eq!(extract_answer("a1"), None);
    // non-ASCII digits are not decimal digits here
    assert_eq!(extract_answer("٣ arabic-indic"), None);
}
