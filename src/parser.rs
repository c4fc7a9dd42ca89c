//! Precision Parser (C1).
//!
//! Tokenizes a line into `(value, effective-decimal-places)` pairs,
//! handling fixed and scientific (including Fortran `D`) notation and
//! parenthesized complex pairs. Never aborts the program on its own: a
//! malformed token is reported through the returned error list and marked
//! with a sentinel decimal of `-1` in the record.

use crate::error::CompareError;
use crate::types::{LineRecord, NumericCell};

/// Parse one line into a [`LineRecord`], collecting any malformed-token
/// errors encountered along the way. The record always has one cell (or
/// two, for a complex token) per token position, even for malformed
/// tokens, so downstream column alignment is preserved.
pub fn parse_line(line: &str, line_no: u64) -> (LineRecord, Vec<CompareError>) {
    let mut cells = Vec::new();
    let mut errors = Vec::new();
    let mut col = 0usize;

    let mut chars = line.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '(' {
            let (consumed, result) = parse_complex_token(&line[start..], line_no, col);
            for _ in 0..consumed {
                chars.next();
            }
            match result {
                Ok((a, b)) => {
                    cells.push(a);
                    cells.push(b);
                }
                Err(e) => {
                    cells.push(NumericCell::malformed());
                    cells.push(NumericCell::malformed());
                    errors.push(e);
                }
            }
            col += 1;
            continue;
        }

        // Ordinary whitespace-delimited token.
        let tok_start = start;
        let mut tok_end = start;
        while let Some(&(idx, ch)) = chars.peek() {
            if ch.is_whitespace() {
                break;
            }
            tok_end = idx + ch.len_utf8();
            chars.next();
        }
        let token = &line[tok_start..tok_end];
        match parse_numeric_token(token) {
            Some(cell) => cells.push(cell),
            None => {
                cells.push(NumericCell::malformed());
                errors.push(CompareError::MalformedNumber {
                    line: line_no,
                    column: col,
                });
            }
        }
        col += 1;
    }

    (LineRecord { cells }, errors)
}

/// Parse a `(a,b)` token starting at `text[0] == '('`. Returns the number
/// of characters consumed from `text` and the parsed pair (or an error).
fn parse_complex_token(
    text: &str,
    line_no: u64,
    col: usize,
) -> (usize, Result<(NumericCell, NumericCell), CompareError>) {
    let Some(close_rel) = text.find(')') else {
        // Consume through end of token run (up to next whitespace or EOL)
        // so the caller's scan doesn't loop forever.
        let end = text.find(char::is_whitespace).unwrap_or(text.len());
        return (
            end,
            Err(CompareError::MalformedComplex {
                line: line_no,
                column: col,
            }),
        );
    };
    let inner = &text[1..close_rel];
    let consumed = close_rel + 1;

    let Some(comma) = inner.find(',') else {
        return (
            consumed,
            Err(CompareError::MalformedComplex {
                line: line_no,
                column: col,
            }),
        );
    };
    let a_str = inner[..comma].trim();
    let b_str = inner[comma + 1..].trim();

    match (parse_numeric_token(a_str), parse_numeric_token(b_str)) {
        (Some(a), Some(b)) => (consumed, Ok((a, b))),
        _ => (
            consumed,
            Err(CompareError::MalformedComplex {
                line: line_no,
                column: col,
            }),
        ),
    }
}

/// Parse a single bare numeric token (fixed, integer, or scientific with
/// `e`/`E`/`d`/`D`) into a [`NumericCell`].
fn parse_numeric_token(token: &str) -> Option<NumericCell> {
    if token.is_empty() {
        return None;
    }

    if let Some((mantissa, exponent)) = split_scientific(token) {
        let value_str = token.replace(['d', 'D'], "E");
        let value: f64 = value_str.parse().ok()?;
        let sig_figs = count_significant_figures(mantissa)?;
        let exp: i32 = exponent.parse().ok()?;
        let decimals = (sig_figs - 1 - exp).clamp(0, 17);
        return Some(NumericCell::new(value, decimals));
    }

    let value: f64 = token.parse().ok()?;
    let decimals = match token.find('.') {
        Some(dot_idx) => {
            let after = &token[dot_idx + 1..];
            let digits = after.chars().take_while(|c| c.is_ascii_digit()).count();
            digits as i32
        }
        None => 0,
    };
    Some(NumericCell::new(value, decimals))
}

/// Split a token into `(mantissa, exponent)` strings if it uses scientific
/// notation (`e`/`E`/`d`/`D` separator). Fortran's `D` exponent is treated
/// identically to `E`.
fn split_scientific(token: &str) -> Option<(&str, &str)> {
    let idx = token.find(['e', 'E', 'd', 'D'])?;
    // Guard against a bare leading 'e'/'d' (not a valid mantissa) and make
    // sure there's an exponent after the marker.
    if idx == 0 || idx + 1 >= token.len() {
        return None;
    }
    Some((&token[..idx], &token[idx + 1..]))
}

/// Count significant figures in a mantissa string: leading zeros are
/// excluded, trailing zeros after any non-zero digit are included.
fn count_significant_figures(mantissa: &str) -> Option<i32> {
    let mantissa = mantissa.trim_start_matches(['+', '-']);
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        // All zeros, e.g. "0.0e5": treat as one significant figure.
        return Some(1);
    }
    Some(trimmed.len() as i32)
}
