//! Restricted literal parser for argument kinds outside a chain's vocabulary
//!
//! Accepts numbers, quoted strings, `true`/`false`/`null` and bracketed lists
//! of those. Nothing else is interpreted.

use super::native::{parse_i256, parse_u256, NativeValue};
use super::CoercionError;

const MAX_DEPTH: usize = 32;

/// Parse `source` as a single literal
pub fn parse_literal(source: &str) -> Result<NativeValue, CoercionError> {
    let mut parser = Parser {
        src: source.as_bytes(),
        text: source,
        pos: 0,
    };
    parser.skip_ws();
    let value = parser.value(0)?;
    parser.skip_ws();
    if parser.pos != parser.src.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a [u8],
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn value(&mut self, depth: usize) -> Result<NativeValue, CoercionError> {
        if depth > MAX_DEPTH {
            return Err(CoercionError::NestingTooDeep);
        }
        match self.peek() {
            Some(b'[') => self.list(depth),
            Some(b'"') | Some(b'\'') => self.string().map(NativeValue::String),
            Some(c) if c == b'-' || c == b'+' || c == b'.' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_ascii_alphabetic() => self.keyword(),
            Some(_) => Err(self.error("unsupported literal")),
            None => Err(self.error("empty literal")),
        }
    }

    fn list(&mut self, depth: usize) -> Result<NativeValue, CoercionError> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b']') => {
                    self.pos += 1;
                    return Ok(NativeValue::Array(items));
                }
                None => return Err(self.error("unterminated list")),
                _ => {}
            }
            items.push(self.value(depth + 1)?);
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {}
                _ => return Err(self.error("expected ',' or ']'")),
            }
        }
    }

    fn string(&mut self) -> Result<String, CoercionError> {
        let quote = self.src[self.pos];
        self.pos += 1;
        let mut out = String::new();
        let text = self.text;
        let mut chars = text[self.pos..].char_indices();
        while let Some((offset, c)) = chars.next() {
            match c {
                '\\' => {
                    let (_, escaped) = chars
                        .next()
                        .ok_or_else(|| self.error("unterminated escape"))?;
                    out.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        other => other,
                    });
                }
                c if c as u32 == quote as u32 => {
                    self.pos += offset + 1;
                    return Ok(out);
                }
                c => out.push(c),
            }
        }
        Err(self.error("unterminated string"))
    }

    fn number(&mut self) -> Result<NativeValue, CoercionError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || matches!(c, b'-' | b'+' | b'.' | b'_') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let token = self.text[start..self.pos].replace('_', "");
        let unsigned = token.strip_prefix('+').unwrap_or(&token);

        if let Some(value) = parse_u256(unsigned) {
            return Ok(NativeValue::Uint(value));
        }
        if let Some(value) = parse_i256(&token) {
            return Ok(NativeValue::Int(value));
        }
        token
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(NativeValue::Float)
            .ok_or_else(|| CoercionError::Literal {
                input: token.clone(),
                reason: "not a number".to_string(),
            })
    }

    fn keyword(&mut self) -> Result<NativeValue, CoercionError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        match &self.text[start..self.pos] {
            "true" => Ok(NativeValue::Bool(true)),
            "false" => Ok(NativeValue::Bool(false)),
            "null" | "undefined" => Ok(NativeValue::Null),
            word => Err(CoercionError::Literal {
                input: word.to_string(),
                reason: "identifiers and expressions are not evaluated".to_string(),
            }),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn error(&self, reason: &str) -> CoercionError {
        CoercionError::Literal {
            input: self.text.to_string(),
            reason: format!("{} at offset {}", reason, self.pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{I256, U256};

    #[test]
    fn test_numbers_unchanged() {
        assert_eq!(parse_literal("42"), Ok(NativeValue::Uint(U256::from(42u64))));
        assert_eq!(
            parse_literal("-3"),
            Ok(NativeValue::Int(I256::try_from(-3i64).unwrap()))
        );
        assert_eq!(parse_literal("1.25"), Ok(NativeValue::Float(1.25)));
        assert_eq!(parse_literal("0xff"), Ok(NativeValue::Uint(U256::from(255u64))));
    }

    #[test]
    fn test_quoted_strings() {
        assert_eq!(
            parse_literal("'it\\'s'"),
            Ok(NativeValue::String("it's".to_string()))
        );
        assert_eq!(
            parse_literal("\"héllo\""),
            Ok(NativeValue::String("héllo".to_string()))
        );
    }

    #[test]
    fn test_nested_lists() {
        let value = parse_literal("[1, ['a', true], []]").unwrap();
        assert_eq!(
            value,
            NativeValue::Array(vec![
                NativeValue::Uint(U256::from(1u64)),
                NativeValue::Array(vec![
                    NativeValue::String("a".to_string()),
                    NativeValue::Bool(true),
                ]),
                NativeValue::Array(vec![]),
            ])
        );
    }

    #[test]
    fn test_expressions_are_rejected() {
        assert!(parse_literal("alert(1)").is_err());
        assert!(parse_literal("1 + 1").is_err());
        assert!(parse_literal("[1, 2").is_err());
        assert!(parse_literal("").is_err());
    }

    #[test]
    fn test_bare_hex_prefix_rejected() {
        assert!(parse_literal("0x").is_err());
        assert!(parse_literal("0x_").is_err());
        assert!(parse_literal("[0x]").is_err());
    }
}
