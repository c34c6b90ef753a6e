//! Streaming response patterns.
//!
//! A pattern is matched against the start of the ingress buffer and follows
//! the `scanf` conversions the Telit manuals use to describe responses:
//!
//! - literal bytes match themselves, `%%` matches `%`
//! - a space or tab matches any run of spaces and tabs, including none
//! - `%d` skips blanks and captures an optionally signed decimal integer
//! - `%s` skips blanks and captures a run of non-whitespace bytes
//! - `%[set]` / `%[^set]` captures a run of bytes in / not in `set`
//! - `%*` before a conversion drops the captured value
//!
//! Unlike `scanf`, blanks never include `\r` or `\n`, so line endings must be
//! spelled out. A conversion that reaches the end of the input may still grow,
//! so it reports [`Match::Incomplete`] rather than guessing.

use heapless::Vec;

pub const MAX_CAPTURES: usize = 8;
pub const MAX_CAPTURE_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture {
    Int(i64),
    Str(Vec<u8, MAX_CAPTURE_LEN>),
}

/// Values captured by the non-suppressed conversions, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures(Vec<Capture, MAX_CAPTURES>);

impl Captures {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn int(&self, index: usize) -> Option<i64> {
        match self.0.get(index)? {
            Capture::Int(v) => Some(*v),
            Capture::Str(_) => None,
        }
    }

    pub fn bytes(&self, index: usize) -> Option<&[u8]> {
        match self.0.get(index)? {
            Capture::Str(s) => Some(s.as_slice()),
            Capture::Int(_) => None,
        }
    }

    pub fn str(&self, index: usize) -> Option<&str> {
        core::str::from_utf8(self.bytes(index)?).ok()
    }

    fn push(&mut self, capture: Capture) -> bool {
        self.0.push(capture).is_ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Match {
    Matched { consumed: usize, captures: Captures },
    /// The input is a prefix of something the pattern could match
    Incomplete,
    Mismatch,
}

fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

fn skip_blanks(input: &[u8], mut i: usize) -> usize {
    while i < input.len() && is_blank(input[i]) {
        i += 1;
    }
    i
}

fn capture_str(bytes: &[u8]) -> Capture {
    let len = bytes.len().min(MAX_CAPTURE_LEN);
    let mut v = Vec::new();
    v.extend_from_slice(&bytes[..len]).ok();
    Capture::Str(v)
}

/// Match `pattern` against the start of `input`.
pub fn matches(pattern: &str, input: &[u8]) -> Match {
    let pat = pattern.as_bytes();
    let mut captures = Captures::default();
    let mut p = 0;
    let mut i = 0;

    while p < pat.len() {
        let c = pat[p];

        if is_blank(c) {
            i = skip_blanks(input, i);
            p += 1;
            continue;
        }

        if c != b'%' || pat.get(p + 1) == Some(&b'%') {
            if i == input.len() {
                return Match::Incomplete;
            }
            if input[i] != c {
                return Match::Mismatch;
            }
            i += 1;
            p += if c == b'%' { 2 } else { 1 };
            continue;
        }

        p += 1;
        let suppress = pat.get(p) == Some(&b'*');
        if suppress {
            p += 1;
        }

        let capture = match pat.get(p) {
            Some(b'd') => {
                p += 1;
                i = skip_blanks(input, i);
                let start = i;
                if i < input.len() && (input[i] == b'-' || input[i] == b'+') {
                    i += 1;
                }
                let digits = i;
                while i < input.len() && input[i].is_ascii_digit() {
                    i += 1;
                }
                if i == input.len() {
                    return Match::Incomplete;
                }
                if i == digits {
                    return Match::Mismatch;
                }
                let Some(value) = parse_int(&input[start..i]) else {
                    return Match::Mismatch;
                };
                Capture::Int(value)
            }
            Some(b's') => {
                p += 1;
                i = skip_blanks(input, i);
                let start = i;
                while i < input.len() && !input[i].is_ascii_whitespace() {
                    i += 1;
                }
                if i == input.len() {
                    return Match::Incomplete;
                }
                if i == start {
                    return Match::Mismatch;
                }
                capture_str(&input[start..i])
            }
            Some(b'[') => {
                p += 1;
                let negate = pat.get(p) == Some(&b'^');
                if negate {
                    p += 1;
                }
                let set_start = p;
                // `]` right after the opening bracket belongs to the set
                if pat.get(p) == Some(&b']') {
                    p += 1;
                }
                let Some(len) = pat[p..].iter().position(|b| *b == b']') else {
                    return Match::Mismatch;
                };
                let set = &pat[set_start..p + len];
                p += len + 1;

                let start = i;
                while i < input.len() && set.contains(&input[i]) != negate {
                    i += 1;
                }
                if i == input.len() {
                    return Match::Incomplete;
                }
                if i == start {
                    return Match::Mismatch;
                }
                capture_str(&input[start..i])
            }
            _ => return Match::Mismatch,
        };

        if !suppress && !captures.push(capture) {
            return Match::Mismatch;
        }
    }

    Match::Matched {
        consumed: i,
        captures,
    }
}

fn parse_int(bytes: &[u8]) -> Option<i64> {
    let (negative, digits) = match bytes.first()? {
        b'-' => (true, &bytes[1..]),
        b'+' => (false, &bytes[1..]),
        _ => (false, bytes),
    };
    let mut value: i64 = 0;
    for d in digits {
        value = value.checked_mul(10)?.checked_add((d - b'0') as i64)?;
    }
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(pattern: &str, input: &[u8]) -> (usize, Captures) {
        match matches(pattern, input) {
            Match::Matched { consumed, captures } => (consumed, captures),
            other => panic!("{:?} did not match {:?}: {:?}", pattern, input, other),
        }
    }

    #[test]
    fn literal() {
        let (consumed, captures) = matched("OK", b"OK\r\n");
        assert_eq!(consumed, 2);
        assert!(captures.is_empty());
        assert_eq!(matches("OK", b"ERROR\r\n"), Match::Mismatch);
        assert_eq!(matches("OK", b"O"), Match::Incomplete);
    }

    #[test]
    fn registration_status() {
        let (_, captures) = matched("+CREG: %*d,%d", b"+CREG: 0,5\r\n");
        assert_eq!(captures.len(), 1);
        assert_eq!(captures.int(0), Some(5));

        let (_, captures) = matched("+CREG: %*d,%d", b"+CREG:0,2\r\n");
        assert_eq!(captures.int(0), Some(2));
    }

    #[test]
    fn trailing_number_needs_terminator() {
        assert_eq!(matches("+CREG: %*d,%d", b"+CREG: 0,1"), Match::Incomplete);
        assert_eq!(matches("+CREG: %*d,%d", b"+CREG: 0,\r\n"), Match::Mismatch);
    }

    #[test]
    fn receive_header_then_payload() {
        let input = b"#SRECV: 1,5\r\n\r\nabc";
        let (consumed, captures) = matched("#SRECV: %d,%d\r\n", input);
        assert_eq!(captures.int(0), Some(1));
        assert_eq!(captures.int(1), Some(5));
        assert_eq!(&input[consumed..], b"\r\nabc");
    }

    #[test]
    fn address_string() {
        let (_, captures) = matched("#SGACT: %s", b"#SGACT: 10.20.30.40\r\nOK\r\n");
        assert_eq!(captures.str(0), Some("10.20.30.40"));
        assert_eq!(matches("#SGACT: %s", b"#SGACT: 10.20"), Match::Incomplete);
    }

    #[test]
    fn scan_sets() {
        let (_, captures) = matched(
            "#QDNS: \"%*[^\"]\",\"%[^\"]\"",
            b"#QDNS: \"example.com\",\"93.184.216.34\"\r\n",
        );
        assert_eq!(captures.len(), 1);
        assert_eq!(captures.str(0), Some("93.184.216.34"));

        let (consumed, captures) = matched("%[^\r\n]", b"HE910-EUD\r\nOK\r\n");
        assert_eq!(consumed, 9);
        assert_eq!(captures.str(0), Some("HE910-EUD"));

        let (_, captures) = matched("%[0-9]x", b"0-9-x");
        assert_eq!(captures.str(0), Some("0-9-"));
    }

    #[test]
    fn gps_fields() {
        let (_, captures) = matched(
            "$GPSACP: %[^,],%[^,],%[^,],%*[^,],%[^,],",
            b"$GPSACP: 094013.000,4740.1234N,12220.5678W,1.2,35.7,3,0.0,0.0,0.0,010124,07\r\n",
        );
        assert_eq!(captures.str(0), Some("094013.000"));
        assert_eq!(captures.str(1), Some("4740.1234N"));
        assert_eq!(captures.str(2), Some("12220.5678W"));
        assert_eq!(captures.str(3), Some("35.7"));
    }

    #[test]
    fn empty_field_is_a_mismatch() {
        assert_eq!(
            matches("$GPSACP: %[^,],%[^,]", b"$GPSACP: ,,,,,1,,,,,\r\n"),
            Match::Mismatch
        );
    }

    #[test]
    fn signed_and_percent() {
        let (_, captures) = matched("%d%%", b"-42%");
        assert_eq!(captures.int(0), Some(-42));
        assert_eq!(matches("%d", b"-\r\n"), Match::Mismatch);
    }

    #[test]
    fn prompt() {
        let (consumed, _) = matched("> ", b"> ");
        assert_eq!(consumed, 2);
    }
}
