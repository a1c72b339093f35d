//! Expression tokenizer
//!
//! Splits rule text into literals, identifiers, and operator symbols.
//! The symbol set is partly dynamic: the operator registry contributes
//! its symbols on top of the fixed punctuation, and matching is
//! longest-first so `>=` wins over `>`.

use std::collections::HashSet;
use std::fmt;

use crate::errors::Error;

/// Symbols every rule understands regardless of the operator preset.
const FIXED_SYMBOLS: [&str; 12] = [
    ">=", "<=", "!=", ">", "<", "=", "(", ")", "[", "]", ",", ".",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Sym(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Int(n) => write!(f, "{n}"),
            Token::Float(x) => write!(f, "{x}"),
            Token::Str(s) => write!(f, "'{s}'"),
            Token::Ident(s) | Token::Sym(s) => f.write_str(s),
        }
    }
}

pub fn tokenize(text: &str, op_symbols: &HashSet<String>) -> Result<Vec<Token>, Error> {
    let mut symbols: Vec<&str> = op_symbols
        .iter()
        .map(|s| s.as_str())
        .chain(FIXED_SYMBOLS)
        .collect();
    symbols.sort_by_key(|s| std::cmp::Reverse(s.len()));
    symbols.dedup();

    let mut tokens = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < text.len() {
        let rest = &text[i..];
        let ch = rest.chars().next().unwrap();

        if ch == ' ' || ch == '\t' {
            i += 1;
            continue;
        }

        // String literal: single quotes, no escapes.
        if ch == '\'' {
            match rest[1..].find('\'') {
                Some(end) => {
                    tokens.push(Token::Str(rest[1..1 + end].to_string()));
                    i += end + 2;
                }
                None => {
                    return Err(Error::rule_parse(format!(
                        "unterminated string literal at position {i}"
                    )));
                }
            }
            continue;
        }

        // Numeral, optionally signed. Float only when a decimal point is
        // present (tested before integer).
        if ch.is_ascii_digit() || (ch == '-' && rest[1..].starts_with(|c: char| c.is_ascii_digit()))
        {
            let start = i;
            let mut j = i + usize::from(ch == '-');
            while j < text.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            let mut is_float = false;
            if j < text.len()
                && bytes[j] == b'.'
                && j + 1 < text.len()
                && bytes[j + 1].is_ascii_digit()
            {
                is_float = true;
                j += 1;
                while j < text.len() && bytes[j].is_ascii_digit() {
                    j += 1;
                }
            }
            let lexeme = &text[start..j];
            if is_float {
                let f: f64 = lexeme
                    .parse()
                    .map_err(|_| Error::rule_parse(format!("invalid float literal '{lexeme}'")))?;
                tokens.push(Token::Float(f));
            } else {
                let n: i64 = lexeme
                    .parse()
                    .map_err(|_| Error::rule_parse(format!("invalid integer literal '{lexeme}'")))?;
                tokens.push(Token::Int(n));
            }
            i = j;
            continue;
        }

        // Identifier or keyword.
        if ch.is_ascii_alphabetic() || ch == '_' {
            let mut j = i;
            while j < text.len()
                && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_')
            {
                j += 1;
            }
            tokens.push(Token::Ident(text[i..j].to_string()));
            i = j;
            continue;
        }

        // Symbol, longest match first.
        match symbols.iter().find(|sym| rest.starts_with(*sym)) {
            Some(sym) => {
                tokens.push(Token::Sym(sym.to_string()));
                i += sym.len();
            }
            None => {
                return Err(Error::rule_parse(format!(
                    "unexpected character '{ch}' at position {i}"
                )));
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(text: &str) -> Vec<Token> {
        tokenize(text, &HashSet::new()).unwrap()
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            tok("42 -7 3.5 -0.5 'hi'"),
            vec![
                Token::Int(42),
                Token::Int(-7),
                Token::Float(3.5),
                Token::Float(-0.5),
                Token::Str("hi".to_string()),
            ]
        );
    }

    #[test]
    fn test_float_requires_decimal_digits() {
        // `1.` is an integer followed by a dot, not a float.
        assert_eq!(
            tok("1.x"),
            vec![
                Token::Int(1),
                Token::Sym(".".to_string()),
                Token::Ident("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_longest_symbol_match() {
        assert_eq!(
            tok("a >= 1"),
            vec![
                Token::Ident("a".to_string()),
                Token::Sym(">=".to_string()),
                Token::Int(1),
            ]
        );
        assert_eq!(
            tok("a > = 1"),
            vec![
                Token::Ident("a".to_string()),
                Token::Sym(">".to_string()),
                Token::Sym("=".to_string()),
                Token::Int(1),
            ]
        );
    }

    #[test]
    fn test_dotted_path() {
        assert_eq!(
            tok("person.name"),
            vec![
                Token::Ident("person".to_string()),
                Token::Sym(".".to_string()),
                Token::Ident("name".to_string()),
            ]
        );
    }

    #[test]
    fn test_registry_symbols_extend_fixed_set() {
        let symbols: HashSet<String> = ["~=".to_string()].into_iter().collect();
        assert_eq!(
            tokenize("a ~= 'x'", &symbols).unwrap(),
            vec![
                Token::Ident("a".to_string()),
                Token::Sym("~=".to_string()),
                Token::Str("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_keywords_are_plain_identifiers() {
        assert_eq!(
            tok("state not in x"),
            vec![
                Token::Ident("state".to_string()),
                Token::Ident("not".to_string()),
                Token::Ident("in".to_string()),
                Token::Ident("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_unexpected_character() {
        assert!(tokenize("a @ b", &HashSet::new()).is_err());
    }

    #[test]
    fn test_unterminated_string() {
        assert!(tokenize("state = 'CA", &HashSet::new()).is_err());
    }
}
