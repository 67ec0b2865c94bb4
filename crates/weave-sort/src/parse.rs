// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Integer parsing.

/// Parse signed decimal integers separated by whitespace.
///
/// Each number is the longest `[+-]digits` prefix after any leading
/// whitespace, so `"3x"` still yields 3. Parsing stops at the first
/// position where no number starts, or at a value that does not fit an
/// `i32`; everything before it is returned.
pub fn parse_ints(bytes: &[u8]) -> Vec<i32> {
    let mut values = Vec::new();
    let mut pos = 0;
    loop {
        match next_int(bytes, pos) {
            Scan::Value(v, end) => {
                values.push(v);
                pos = end;
            }
            Scan::End => break,
            Scan::Garbage(at) => {
                log::warn!(
                    "stopped parsing at byte {} after {} values",
                    at,
                    values.len()
                );
                break;
            }
        }
    }
    values
}

enum Scan {
    Value(i32, usize),
    End,
    Garbage(usize),
}

/// C `isspace`: ASCII whitespace plus vertical tab.
fn is_space(b: u8) -> bool {
    b.is_ascii_whitespace() || b == 0x0b
}

fn next_int(bytes: &[u8], mut pos: usize) -> Scan {
    while pos < bytes.len() && is_space(bytes[pos]) {
        pos += 1;
    }
    if pos == bytes.len() {
        return Scan::End;
    }
    let start = pos;

    let negative = match bytes[pos] {
        b'-' => {
            pos += 1;
            true
        }
        b'+' => {
            pos += 1;
            false
        }
        _ => false,
    };

    let digits = pos;
    // Accumulate negatively so i32::MIN fits.
    let mut acc: i32 = 0;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        let d = i32::from(bytes[pos] - b'0');
        acc = match acc.checked_mul(10).and_then(|a| a.checked_sub(d)) {
            Some(a) => a,
            None => return Scan::Garbage(start),
        };
        pos += 1;
    }
    if pos == digits {
        return Scan::Garbage(start);
    }

    let value = if negative {
        acc
    } else {
        match acc.checked_neg() {
            Some(v) => v,
            None => return Scan::Garbage(start),
        }
    };
    Scan::Value(value, pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_whitespace() {
        assert_eq!(parse_ints(b"3 1\n2\t-7  +4\r\n"), vec![3, 1, 2, -7, 4]);
    }

    #[test]
    fn empty_input() {
        assert!(parse_ints(b"").is_empty());
        assert!(parse_ints(b"  \n \x0b").is_empty());
    }

    #[test]
    fn stops_at_garbage() {
        assert_eq!(parse_ints(b"1 2 x 3"), vec![1, 2]);
        assert_eq!(parse_ints(b"- 5"), Vec::<i32>::new());
    }

    #[test]
    fn takes_numeric_prefix_of_a_token() {
        assert_eq!(parse_ints(b"1 2 3x 4"), vec![1, 2, 3]);
        assert_eq!(parse_ints(b"1-2+3"), vec![1, -2, 3]);
    }

    #[test]
    fn out_of_range_stops() {
        assert_eq!(parse_ints(b"99999999999 1"), Vec::<i32>::new());
        assert_eq!(parse_ints(b"7 2147483648"), vec![7]);
        assert_eq!(
            parse_ints(b"2147483647 -2147483648"),
            vec![i32::MAX, i32::MIN]
        );
    }
}
