//! Pratt parser for rule expressions
//!
//! Precedence climbing driven by per-operator binding powers from the
//! registry. Operator resolution is type-dispatching: after both
//! operands parse, the (token, operand types) pair selects a definition,
//! so one token can carry several implementations.

use serde_json::Value;

use crate::config::Mode;
use crate::errors::Error;
use crate::operators::{OpKind, OperatorRegistry};
use crate::rules::ast::{RuleAst, RuleNode};
use crate::rules::token::{Token, tokenize};
use crate::schema::SymbolTable;
use crate::types::TypeRegistry;
use crate::value::truthy;

/// Everything rule parsing needs to resolve names and operators.
pub struct ParseContext<'a> {
    pub symbols: &'a SymbolTable,
    pub operators: &'a OperatorRegistry,
    pub types: &'a TypeRegistry,
    pub rules_mode: Mode,
}

/// Parse rule text into a typed AST.
pub fn parse_rule(text: &str, ctx: &ParseContext<'_>) -> Result<RuleAst, Error> {
    let tokens = tokenize(text.trim(), ctx.operators.symbols())?;
    let mut parser = RuleParser {
        tokens,
        pos: 0,
        ctx,
    };
    parser.parse()
}

struct RuleParser<'a, 'c> {
    tokens: Vec<Token>,
    pos: usize,
    ctx: &'a ParseContext<'c>,
}

impl RuleParser<'_, '_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Result<Token, Error> {
        let tok = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| Error::rule_parse("unexpected end of expression"))?;
        self.pos += 1;
        Ok(tok)
    }

    fn left_bp(&self, token: &str) -> u8 {
        self.ctx.operators.binding_power(token).unwrap_or(0)
    }

    fn parse(&mut self) -> Result<RuleAst, Error> {
        let root = self.parse_expr(0)?;
        if let Some(tok) = self.peek() {
            return Err(Error::rule_parse(format!("unexpected token: {tok}")));
        }
        self.check_return_type(&root)?;
        let return_type = root.type_name().to_string();
        Ok(RuleAst { root, return_type })
    }

    /// The root must be boolean, or numeric for score contributors.
    /// Loose rules mode defers to truthiness at evaluation instead.
    fn check_return_type(&self, root: &RuleNode) -> Result<(), Error> {
        if self.ctx.rules_mode == Mode::Loose {
            return Ok(());
        }
        let tn = root.type_name();
        let numeric_alias = self
            .ctx
            .types
            .get(tn)
            .is_some_and(|def| matches!(def.base, crate::types::BaseType::Int | crate::types::BaseType::Float));
        if matches!(tn, "Bool" | "Int" | "Float") || numeric_alias {
            Ok(())
        } else {
            Err(Error::rule_parse(format!(
                "rule must evaluate to Bool or a numeric type, got {tn}"
            )))
        }
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<RuleNode, Error> {
        let mut left = self.nud()?;
        loop {
            let Some(tok) = self.peek() else { break };
            if matches!(tok, Token::Sym(s) if s == ")" || s == "]" || s == ",") {
                break;
            }
            // `not` followed by `in` is the single operator `not in`,
            // whichever form the tokenizer produced.
            let two_token_not_in = matches!(tok, Token::Ident(s) if s == "not")
                && matches!(self.peek_at(1), Some(Token::Ident(s)) if s == "in");
            let op_token = if two_token_not_in {
                "not in".to_string()
            } else {
                match tok {
                    Token::Ident(s) | Token::Sym(s) => s.clone(),
                    _ => break,
                }
            };
            let bp = self.left_bp(&op_token);
            if bp <= min_bp {
                break;
            }
            self.pos += if two_token_not_in { 2 } else { 1 };
            left = self.led(&op_token, left)?;
        }
        Ok(left)
    }

    fn led(&mut self, token: &str, left: RuleNode) -> Result<RuleNode, Error> {
        let bp = self.left_bp(token);
        let right_bp = match self.ctx.operators.associativity(token) {
            Some(crate::operators::Assoc::Right) => bp.saturating_sub(1),
            _ => bp,
        };
        let right = self.parse_expr(right_bp)?;
        let observed = [left.type_name(), right.type_name()];
        let def = self
            .ctx
            .operators
            .lookup(token, &observed)
            .ok_or_else(|| {
                Error::rule_parse(format!(
                    "no operator '{token}' for types ({}, {})",
                    observed[0], observed[1]
                ))
            })?;
        Ok(RuleNode::BinaryOp {
            token: token.to_string(),
            left: Box::new(left),
            right: Box::new(right),
            type_name: def.return_type.clone(),
            func: def.func.clone(),
        })
    }

    fn nud(&mut self) -> Result<RuleNode, Error> {
        let tok = self.advance()?;
        match &tok {
            Token::Sym(s) if s == "(" => {
                let node = self.parse_expr(0)?;
                if matches!(self.peek(), Some(Token::Sym(s)) if s == ")") {
                    self.pos += 1;
                    Ok(node)
                } else {
                    Err(Error::rule_parse("expected ')'"))
                }
            }
            Token::Sym(s) if s == "[" => self.parse_list_literal(),
            Token::Int(n) => Ok(RuleNode::Literal {
                value: Value::from(*n),
                type_name: "Int".to_string(),
            }),
            Token::Float(f) => Ok(RuleNode::Literal {
                value: Value::from(*f),
                type_name: "Float".to_string(),
            }),
            Token::Str(s) => Ok(RuleNode::Literal {
                value: Value::String(s.clone()),
                type_name: "Str".to_string(),
            }),
            Token::Ident(name) | Token::Sym(name) => {
                // Registered prefix operator, e.g. `not`.
                if let Some(def) = self.ctx.operators.prefix_def(name) {
                    debug_assert_eq!(def.kind, OpKind::Prefix);
                    let bp = def.binding_power;
                    let return_type = def.return_type.clone();
                    let func = def.func.clone().unwrap_or_else(|| {
                        std::sync::Arc::new(|args: &[Value]| Ok(Value::Bool(!truthy(&args[0]))))
                    });
                    let token = name.clone();
                    let operand = self.parse_expr(bp)?;
                    return Ok(RuleNode::UnaryOp {
                        token,
                        operand: Box::new(operand),
                        type_name: return_type,
                        func,
                    });
                }
                if matches!(tok, Token::Sym(_)) {
                    return Err(Error::rule_parse(format!("unexpected token: {tok}")));
                }
                match name.as_str() {
                    "true" => Ok(RuleNode::Literal {
                        value: Value::Bool(true),
                        type_name: "Bool".to_string(),
                    }),
                    "false" => Ok(RuleNode::Literal {
                        value: Value::Bool(false),
                        type_name: "Bool".to_string(),
                    }),
                    _ => {
                        if matches!(self.peek(), Some(Token::Sym(s)) if s == "(") {
                            self.parse_function_call(name)
                        } else {
                            self.parse_variable(name)
                        }
                    }
                }
            }
        }
    }

    fn parse_variable(&mut self, first: &str) -> Result<RuleNode, Error> {
        let mut path = first.to_string();
        while matches!(self.peek(), Some(Token::Sym(s)) if s == ".") {
            self.pos += 1;
            match self.advance()? {
                Token::Ident(part) => {
                    path.push('.');
                    path.push_str(&part);
                }
                other => {
                    return Err(Error::rule_parse(format!(
                        "expected identifier after '.', got {other}"
                    )));
                }
            }
        }
        let field = self
            .ctx
            .symbols
            .field(&path)
            .ok_or_else(|| Error::rule_parse(format!("unknown field or variable: '{path}'")))?;
        Ok(RuleNode::Variable {
            path,
            type_name: field.type_name.clone(),
        })
    }

    fn parse_function_call(&mut self, name: &str) -> Result<RuleNode, Error> {
        self.pos += 1; // (
        let mut args = Vec::new();
        while !matches!(self.peek(), Some(Token::Sym(s)) if s == ")") {
            if self.peek().is_none() {
                return Err(Error::rule_parse(format!(
                    "unterminated argument list for '{name}'"
                )));
            }
            args.push(self.parse_expr(0)?);
            if matches!(self.peek(), Some(Token::Sym(s)) if s == ",") {
                self.pos += 1;
            }
        }
        self.pos += 1; // )

        let return_type = match self.ctx.symbols.function(name) {
            Some(decl) => {
                if self.ctx.rules_mode == Mode::Strict {
                    if decl.parameters.len() != args.len() {
                        return Err(Error::rule_parse(format!(
                            "function '{name}' expects {} arguments, got {}",
                            decl.parameters.len(),
                            args.len()
                        )));
                    }
                    for (param, arg) in decl.parameters.iter().zip(&args) {
                        if !self.types_compatible(&param.type_name, arg.type_name()) {
                            return Err(Error::rule_parse(format!(
                                "function '{name}' parameter '{}' expects {}, got {}",
                                param.name,
                                param.type_name,
                                arg.type_name()
                            )));
                        }
                    }
                }
                decl.return_type_name.clone()
            }
            None if self.ctx.rules_mode == Mode::Strict => {
                return Err(Error::rule_parse(format!(
                    "unknown function: '{name}'"
                )));
            }
            None => "Any".to_string(),
        };

        Ok(RuleNode::FunctionCall {
            name: name.to_string(),
            args,
            type_name: return_type,
        })
    }

    /// Exact name match, `Any` on either side, or an alias whose base
    /// kind matches the other side's primitive.
    fn types_compatible(&self, expected: &str, actual: &str) -> bool {
        if expected == actual || expected == "Any" || expected == "*" || actual == "Any" {
            return true;
        }
        let base_of = |name: &str| -> Option<&'static str> {
            self.ctx.types.get(name).map(|def| def.base.into())
        };
        base_of(expected) == Some(actual) || base_of(actual) == Some(expected)
    }

    /// List literals hold literals only; nesting is allowed.
    fn parse_list_literal(&mut self) -> Result<RuleNode, Error> {
        let items = self.parse_literal_items()?;
        Ok(RuleNode::Literal {
            value: Value::Array(items),
            type_name: "List".to_string(),
        })
    }

    fn parse_literal_items(&mut self) -> Result<Vec<Value>, Error> {
        let mut items = Vec::new();
        while !matches!(self.peek(), Some(Token::Sym(s)) if s == "]") {
            if self.peek().is_none() {
                return Err(Error::rule_parse("unterminated list literal"));
            }
            items.push(self.parse_literal_value()?);
            if matches!(self.peek(), Some(Token::Sym(s)) if s == ",") {
                self.pos += 1;
            }
        }
        self.pos += 1; // ]
        Ok(items)
    }

    fn parse_literal_value(&mut self) -> Result<Value, Error> {
        if matches!(self.peek(), Some(Token::Sym(s)) if s == "[") {
            self.pos += 1;
            return Ok(Value::Array(self.parse_literal_items()?));
        }
        match self.advance()? {
            Token::Int(n) => Ok(Value::from(n)),
            Token::Float(f) => Ok(Value::from(f)),
            Token::Str(s) => Ok(Value::String(s)),
            Token::Ident(s) if s == "true" => Ok(Value::Bool(true)),
            Token::Ident(s) if s == "false" => Ok(Value::Bool(false)),
            other => Err(Error::rule_parse(format!("expected literal, got {other}"))),
        }
    }
}
