//! String helpers shared by the converter pipeline and the merge
//! orchestrator.

use std::cmp::Ordering;

/// Compares two display names case-insensitively, treating digit runs
/// as numbers so that "node2" sorts before "node10".
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ai = a.chars().flat_map(char::to_lowercase).peekable();
    let mut bi = b.chars().flat_map(char::to_lowercase).peekable();

    loop {
        match (ai.peek().copied(), bi.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) => {
                if ca.is_ascii_digit() && cb.is_ascii_digit() {
                    let na = take_digits(&mut ai);
                    let nb = take_digits(&mut bi);
                    match compare_digit_runs(&na, &nb) {
                        Ordering::Equal => {}
                        other => return other,
                    }
                } else {
                    match ca.cmp(&cb) {
                        Ordering::Equal => {
                            ai.next();
                            bi.next();
                        }
                        other => return other,
                    }
                }
            }
        }
    }
}

fn take_digits<I: Iterator<Item = char>>(iter: &mut std::iter::Peekable<I>) -> String {
    let mut digits = String::new();
    while let Some(c) = iter.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        digits.push(*c);
        iter.next();
    }
    digits
}

/// Numeric comparison of two digit strings of arbitrary length.
fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Collapses every non-alphanumeric character to `-`, used when a URL
/// host and path become part of a storage key.
pub fn sanitize_key_part(input: &str) -> String {
    input
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}
