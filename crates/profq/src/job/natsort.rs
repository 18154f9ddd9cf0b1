//! Natural ("numeric-aware") string ordering.
//!
//! Digit runs compare by value, so `job9 < job10`. Runs that start with a zero
//! compare digit by digit instead (`1.05 < 1.5`). Whitespace is skipped.
//! Strings that are naturally equal fall back to plain byte order.

use std::cmp::Ordering;

pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    compare_natural(a.as_bytes(), b.as_bytes()).then_with(|| a.cmp(b))
}

/// Sorts in descending natural order, most recent token first.
pub fn sort_natural_desc<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> &str,
{
    items.sort_by(|x, y| natural_cmp(key(y), key(x)));
}

fn compare_natural(a: &[u8], b: &[u8]) -> Ordering {
    let (mut ai, mut bi) = (0, 0);

    loop {
        while a.get(ai).is_some_and(u8::is_ascii_whitespace) {
            ai += 1;
        }
        while b.get(bi).is_some_and(u8::is_ascii_whitespace) {
            bi += 1;
        }

        match (a.get(ai).copied(), b.get(bi).copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) if ca.is_ascii_digit() && cb.is_ascii_digit() => {
                let run_a = digit_run(&a[ai..]);
                let run_b = digit_run(&b[bi..]);

                let ordering = if ca == b'0' || cb == b'0' {
                    // Fractional part: first differing digit wins.
                    run_a.cmp(run_b)
                } else {
                    // Integer part: longer run wins, then first differing digit.
                    run_a.len().cmp(&run_b.len()).then_with(|| run_a.cmp(run_b))
                };

                if ordering != Ordering::Equal {
                    return ordering;
                }
                ai += run_a.len();
                bi += run_b.len();
            }
            (Some(ca), Some(cb)) => {
                if ca != cb {
                    return ca.cmp(&cb);
                }
                ai += 1;
                bi += 1;
            }
        }
    }
}

fn digit_run(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(bytes.len());
    &bytes[..end]
}
