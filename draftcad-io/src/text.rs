//! Inline text escapes: `\P` paragraph breaks, `\\` backslashes and MTEXT formatting codes.

/// Escapes text for a single-line group value. LF, CRLF and a lone CR each become one `\P`,
/// so line breaks decode as LF.
pub(crate) fn escape_text(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\P"),
            '\r' => {
                chars.next_if_eq(&'\n');
                result.push_str("\\P");
            }
            other => result.push(other),
        }
    }
    result
}

/// Decodes TEXT/ATTRIB values. Unknown escapes are kept verbatim.
pub(crate) fn decode_inline_text(raw: &str) -> String {
    let mut result = String::new();
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('P') | Some('p') => result.push('\n'),
            Some('~') => result.push(' '),
            Some('\\') => result.push('\\'),
            Some('S') | Some('s') => {
                // Stacked fraction: keep its text, drop the stacking markers.
                for next in chars.by_ref() {
                    match next {
                        ';' => break,
                        '^' | '#' => result.push('/'),
                        other => result.push(other),
                    }
                }
            }
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}

/// Decodes MTEXT content, stripping font, height, color and alignment codes.
pub(crate) fn decode_mtext(raw: &str) -> String {
    let mut result = String::new();
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '{' | '}' => {}
            '\\' => match chars.next() {
                Some('P') | Some('p') | Some('X') => result.push('\n'),
                Some('~') => result.push(' '),
                Some(escaped @ ('\\' | '{' | '}')) => result.push(escaped),
                Some('f' | 'F' | 'H' | 'h' | 'C' | 'c' | 'A' | 'a' | 'W' | 'w' | 'Q' | 'q' | 'T' | 't') => {
                    for next in chars.by_ref() {
                        if next == ';' {
                            break;
                        }
                    }
                }
                Some('L' | 'l' | 'O' | 'o' | 'K' | 'k') => {}
                Some('S' | 's') => {
                    for next in chars.by_ref() {
                        match next {
                            ';' => break,
                            '^' | '#' => result.push('/'),
                            other => result.push(other),
                        }
                    }
                }
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            },
            other => result.push(other),
        }
    }
    result
}
