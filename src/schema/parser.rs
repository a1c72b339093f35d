//! Schema source parser
//!
//! Hand-written character-level parser. Comments run from `#` to end of
//! line; whitespace is insignificant except that struct bodies accept a
//! newline as a field separator.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::errors::Error;
use crate::schema::ast::{
    FieldDefinition, FunctionDefinition, FunctionParameter, SchemaAst, SchemaType, StructDefinition,
};

const PRIMITIVES: [(&str, SchemaType); 4] = [
    ("Int", SchemaType::Int),
    ("Float", SchemaType::Float),
    ("Str", SchemaType::Str),
    ("Bool", SchemaType::Bool),
];

const RESERVED: [&str; 2] = ["struct", "List"];

/// Parse schema source text into an AST. Validation happens separately.
pub fn parse_schema(text: &str) -> Result<SchemaAst, Error> {
    Parser::new(text).parse()
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0, line: 1 }
    }

    fn err(&self, message: impl Into<String>) -> Error {
        Error::SchemaParse {
            line: self.line,
            message: message.into(),
        }
    }

    fn rest(&self) -> &str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        if ch == '\n' {
            self.line += 1;
        }
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    /// Skip spaces, tabs, and comments; newlines too when asked.
    fn skip_ws(&mut self, newlines: bool) {
        loop {
            match self.peek() {
                Some('#') => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                }
                Some(' ') | Some('\t') => {
                    self.advance();
                }
                Some('\r') | Some('\n') if newlines => {
                    self.advance();
                }
                _ => break,
            }
        }
    }

    fn skip_h(&mut self) {
        while self.peek().is_some_and(|c| c == ' ' || c == '\t') {
            self.advance();
        }
    }

    fn read_ident(&mut self) -> Result<String, Error> {
        let start = self.pos;
        if !self.peek().is_some_and(|c| c.is_ascii_alphabetic() || c == '_') {
            return Err(self.err("expected identifier"));
        }
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }
        Ok(self.text[start..self.pos].to_string())
    }

    fn expect(&mut self, ch: char) -> Result<(), Error> {
        self.skip_h();
        if self.peek() != Some(ch) {
            return Err(self.err(format!(
                "expected '{ch}', got {}",
                self.peek().map_or("end of input".to_string(), |c| format!("'{c}'"))
            )));
        }
        self.advance();
        Ok(())
    }

    // --- literal values (constraint blocks) ---

    fn parse_str_literal(&mut self) -> Result<String, Error> {
        self.advance(); // opening '
        let start = self.pos;
        while self.peek().is_some_and(|c| c != '\'') {
            self.advance();
        }
        if self.peek() != Some('\'') {
            return Err(self.err("unterminated string literal"));
        }
        let s = self.text[start..self.pos].to_string();
        self.advance(); // closing '
        Ok(s)
    }

    fn parse_number(&mut self) -> Result<Value, Error> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.advance();
        }
        if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
            return Err(self.err("expected number"));
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        // Float only when a decimal point is followed by a digit.
        let is_float = self.peek() == Some('.')
            && self.rest()[1..].chars().next().is_some_and(|c| c.is_ascii_digit());
        if is_float {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
            let f: f64 = self.text[start..self.pos]
                .parse()
                .map_err(|_| self.err("invalid float literal"))?;
            Ok(Value::from(f))
        } else {
            let n: i64 = self.text[start..self.pos]
                .parse()
                .map_err(|_| self.err("invalid integer literal"))?;
            Ok(Value::from(n))
        }
    }

    fn parse_list_literal(&mut self) -> Result<Value, Error> {
        self.advance(); // [
        let mut items = Vec::new();
        self.skip_h();
        while self.peek() != Some(']') {
            if self.at_end() {
                return Err(self.err("unterminated list literal"));
            }
            items.push(self.parse_constraint_value()?);
            self.skip_h();
            if self.peek() == Some(',') {
                self.advance();
                self.skip_h();
            }
        }
        self.advance(); // ]
        Ok(Value::Array(items))
    }

    fn parse_constraint_value(&mut self) -> Result<Value, Error> {
        self.skip_h();
        match self.peek() {
            Some('\'') => Ok(Value::String(self.parse_str_literal()?)),
            Some('[') => self.parse_list_literal(),
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number(),
            _ if self.rest().starts_with("true") => {
                self.pos += 4;
                Ok(Value::Bool(true))
            }
            _ if self.rest().starts_with("false") => {
                self.pos += 5;
                Ok(Value::Bool(false))
            }
            _ => Err(self.err("expected constraint value")),
        }
    }

    fn parse_constraints(&mut self) -> Result<BTreeMap<String, Value>, Error> {
        self.advance(); // {
        let mut constraints = BTreeMap::new();
        self.skip_h();
        while self.peek() != Some('}') {
            if self.at_end() {
                return Err(self.err("unterminated constraint block"));
            }
            let key = self.read_ident()?;
            self.expect(':')?;
            let value = self.parse_constraint_value()?;
            constraints.insert(key, value);
            self.skip_h();
            if self.peek() == Some(',') {
                self.advance();
                self.skip_h();
            }
        }
        self.advance(); // }
        Ok(constraints)
    }

    // --- type expressions ---

    fn parse_type_expr(&mut self) -> Result<(SchemaType, String, Vec<String>), Error> {
        self.skip_h();
        let name = self.read_ident()?;
        if name == "List" {
            self.expect('[')?;
            self.skip_h();
            let mut elements = vec![self.read_ident()?];
            self.skip_h();
            while self.peek() == Some('|') {
                self.advance();
                self.skip_h();
                elements.push(self.read_ident()?);
                self.skip_h();
            }
            self.expect(']')?;
            let type_name = format!("List[{}]", elements.join("|"));
            return Ok((SchemaType::List, type_name, elements));
        }
        if let Some((_, st)) = PRIMITIVES.iter().find(|(n, _)| *n == name) {
            return Ok((*st, name, vec![]));
        }
        Ok((SchemaType::Custom, name, vec![]))
    }

    // --- declarations ---

    fn parse_field(&mut self) -> Result<FieldDefinition, Error> {
        self.skip_h();
        let name = self.read_ident()?;
        if RESERVED.contains(&name.as_str()) {
            return Err(self.err(format!("reserved word '{name}' used as field name")));
        }
        self.expect(':')?;
        let (schema_type, type_name, element_types) = self.parse_type_expr()?;
        self.skip_h();
        let optional = if self.peek() == Some('?') {
            self.advance();
            true
        } else {
            false
        };
        self.skip_h();
        let constraints = if self.peek() == Some('{') {
            self.parse_constraints()?
        } else {
            BTreeMap::new()
        };
        Ok(FieldDefinition {
            name,
            schema_type,
            type_name,
            element_types,
            constraints,
            optional,
        })
    }

    fn parse_struct(&mut self) -> Result<StructDefinition, Error> {
        self.read_ident()?; // the `struct` keyword itself
        self.skip_h();
        let name = self.read_ident()?;
        self.skip_ws(true);
        self.expect('{')?;
        let mut fields = Vec::new();
        loop {
            self.skip_ws(true);
            if self.peek() == Some('}') {
                break;
            }
            if self.at_end() {
                return Err(self.err(format!("unterminated struct '{name}'")));
            }
            fields.push(self.parse_field()?);
            self.skip_h();
            if self.peek() == Some(',') {
                self.advance();
            }
        }
        self.advance(); // }
        Ok(StructDefinition { name, fields })
    }

    /// Lookahead: `IDENT : (` starts a function declaration.
    fn looks_like_function(&self) -> bool {
        let mut probe = Parser {
            text: self.text,
            pos: self.pos,
            line: self.line,
        };
        if probe.read_ident().is_err() {
            return false;
        }
        probe.skip_h();
        if probe.peek() != Some(':') {
            return false;
        }
        probe.advance();
        probe.skip_h();
        probe.peek() == Some('(')
    }

    fn parse_function(&mut self) -> Result<FunctionDefinition, Error> {
        let name = self.read_ident()?;
        self.expect(':')?;
        self.expect('(')?;
        let mut parameters = Vec::new();
        self.skip_h();
        while self.peek() != Some(')') {
            if self.at_end() {
                return Err(self.err(format!("unterminated parameter list for '{name}'")));
            }
            let pname = self.read_ident()?;
            self.expect(':')?;
            let (_, type_name, _) = self.parse_type_expr()?;
            parameters.push(FunctionParameter {
                name: pname,
                type_name,
            });
            self.skip_h();
            if self.peek() == Some(',') {
                self.advance();
                self.skip_h();
            }
        }
        self.advance(); // )
        self.skip_h();
        if !self.rest().starts_with("->") {
            return Err(self.err(format!("expected '->' after parameter list for '{name}'")));
        }
        self.pos += 2;
        self.skip_h();
        let return_type_name = self.read_ident()?;
        Ok(FunctionDefinition {
            name,
            parameters,
            return_type_name,
        })
    }

    fn at_struct_keyword(&self) -> bool {
        self.rest().starts_with("struct")
            && !self.rest()[6..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    fn parse(mut self) -> Result<SchemaAst, Error> {
        let mut ast = SchemaAst::default();
        loop {
            self.skip_ws(true);
            if self.at_end() {
                break;
            }
            if self.at_struct_keyword() {
                ast.structs.push(self.parse_struct()?);
            } else if self.looks_like_function() {
                ast.functions.push(self.parse_function()?);
            } else {
                ast.fields.push(self.parse_field()?);
            }
        }
        Ok(ast)
    }
}
