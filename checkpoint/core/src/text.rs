//! String utilities for action payloads and directive arguments

/// Strip one matching pair of outer quotes, then resolve backslash escapes
///
/// The outer pair is removed only when the payload starts and ends with the
/// same quote character (`"` or `'`) and is longer than one character.
#[must_use]
pub fn unquote_payload(payload: &str) -> String {
    let bytes = payload.as_bytes();
    let inner = match bytes.first() {
        Some(&q) if (q == b'"' || q == b'\'') && bytes.len() > 1 && bytes[bytes.len() - 1] == q => {
            &payload[1..payload.len() - 1]
        }
        _ => payload,
    };
    unquote_string(inner)
}

/// Resolve C-style backslash escapes
///
/// Recognizes `\\`, `\a`, `\b`, `\f`, `\n`, `\r`, `\t`, `\v`, `\?` (DEL) and one
/// to three octal digits. Any other escape keeps its backslash.
#[must_use]
pub fn unquote_string(input: &str) -> String {
    let src = input.as_bytes();
    let mut out = Vec::with_capacity(src.len());
    let mut i = 0;

    while i < src.len() {
        if src[i] != b'\\' {
            out.push(src[i]);
            i += 1;
            continue;
        }
        i += 1;
        let Some(&c) = src.get(i) else {
            out.push(b'\\');
            break;
        };
        let simple = match c {
            b'\\' => Some(b'\\'),
            b'a' => Some(0x07),
            b'b' => Some(0x08),
            b'f' => Some(0x0c),
            b'n' => Some(b'\n'),
            b'r' => Some(b'\r'),
            b't' => Some(b'\t'),
            b'v' => Some(0x0b),
            b'?' => Some(0x7f),
            _ => None,
        };
        if let Some(byte) = simple {
            out.push(byte);
            i += 1;
        } else if (b'0'..=b'7').contains(&c) {
            let mut value: u32 = 0;
            let mut digits = 0;
            while digits < 3 {
                match src.get(i) {
                    Some(&d) if (b'0'..=b'7').contains(&d) => {
                        value = value * 8 + u32::from(d - b'0');
                        i += 1;
                        digits += 1;
                    }
                    _ => break,
                }
            }
            out.push((value & 0xff) as u8);
        } else {
            out.push(b'\\');
            out.push(c);
            i += 1;
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

/// Split `input` on `delim`, honoring single and double quotes
///
/// Quotes group delimiters into one word and are removed. Inside double
/// quotes, and outside any quotes, a backslash takes the next character
/// literally. Adjacent delimiters produce empty words. An empty input has no
/// words.
///
/// # Errors
///
/// Returns a reason string when a quote is left open.
pub fn split_words(input: &str, delim: char) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    if input.is_empty() {
        return Ok(words);
    }

    let mut word = String::new();
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        match c {
            c if c == delim => words.push(std::mem::take(&mut word)),
            '\'' => loop {
                match chars.next() {
                    Some('\'') => break,
                    Some(q) => word.push(q),
                    None => return Err("missing closing quote".to_string()),
                }
            },
            '"' => loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some(e) => word.push(e),
                        None => return Err("missing closing quote".to_string()),
                    },
                    Some(q) => word.push(q),
                    None => return Err("missing closing quote".to_string()),
                }
            },
            '\\' => word.push(chars.next().unwrap_or('\\')),
            other => word.push(other),
        }
    }
    words.push(word);
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unquote_payload_strips_matching_pair() {
        assert_eq!(unquote_payload("\"hello\""), "hello");
        assert_eq!(unquote_payload("'hello'"), "hello");
        assert_eq!(unquote_payload("it's"), "it's");
        assert_eq!(unquote_payload("\"mismatch'"), "\"mismatch'");
        assert_eq!(unquote_payload("\""), "\"");
        assert_eq!(unquote_payload("\"\""), "");
    }

    #[test]
    fn test_unquote_payload_unescapes_inside() {
        assert_eq!(unquote_payload("'%u%*\\r'"), "%u%*\r");
        assert_eq!(unquote_payload("a\\tb"), "a\tb");
    }

    #[test]
    fn test_unquote_string_escapes() {
        assert_eq!(unquote_string("\\\\"), "\\");
        assert_eq!(unquote_string("\\a\\b\\f\\n\\v"), "\x07\x08\x0c\n\x0b");
        assert_eq!(unquote_string("\\?"), "\x7f");
        assert_eq!(unquote_string("\\101\\60x"), "A0x");
        assert_eq!(unquote_string("\\7"), "\x07");
        assert_eq!(unquote_string("\\q"), "\\q");
        assert_eq!(unquote_string("end\\"), "end\\");
    }

    #[test]
    fn test_unquote_string_octal_utf8() {
        assert_eq!(unquote_string("caf\\303\\251"), "café");
    }

    #[test]
    fn test_split_words_basic() {
        assert_eq!(split_words("read,wrote", ',').unwrap(), vec!["read", "wrote"]);
        assert_eq!(split_words("a,,b", ',').unwrap(), vec!["a", "", "b"]);
        assert!(split_words("", ',').unwrap().is_empty());
    }

    #[test]
    fn test_split_words_quoting() {
        assert_eq!(
            split_words("\"in, out\",'x,y',z", ',').unwrap(),
            vec!["in, out", "x,y", "z"]
        );
        assert_eq!(split_words("a\\,b", ',').unwrap(), vec!["a,b"]);
        assert_eq!(split_words("\"say \\\"hi\\\"\"", ',').unwrap(), vec!["say \"hi\""]);
    }

    #[test]
    fn test_split_words_unterminated() {
        assert_eq!(
            split_words("a,\"b", ','),
            Err("missing closing quote".to_string())
        );
        assert!(split_words("'open", ',').is_err());
    }
}
