use pullbridge_core::{AppError, AppResult};
use serde_json::Value;

use super::lexer::{TemplatePart, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Ast {
    Identity,
    Literal(Value),
    Index {
        target: Box<Ast>,
        key: Box<Ast>,
    },
    Slice {
        target: Box<Ast>,
        from: Option<Box<Ast>>,
        to: Option<Box<Ast>>,
    },
    Iterate(Box<Ast>),
    Try(Box<Ast>),
    Pipe(Box<Ast>, Box<Ast>),
    Comma(Box<Ast>, Box<Ast>),
    Alternative(Box<Ast>, Box<Ast>),
    And(Box<Ast>, Box<Ast>),
    Or(Box<Ast>, Box<Ast>),
    Binary {
        op: BinaryOp,
        lhs: Box<Ast>,
        rhs: Box<Ast>,
    },
    Negate(Box<Ast>),
    Array(Option<Box<Ast>>),
    Object(Vec<(Ast, Ast)>),
    If {
        branches: Vec<(Ast, Ast)>,
        otherwise: Option<Box<Ast>>,
    },
    Call {
        name: String,
        args: Vec<Ast>,
    },
    Format(Vec<FormatPart>),
}

/// Piece of a string interpolation.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum FormatPart {
    Literal(String),
    Expr(Ast),
}

pub(super) fn parse(tokens: Vec<Token>) -> AppResult<Ast> {
    if tokens.is_empty() {
        return Err(syntax_error("filter expression is empty"));
    }

    let mut parser = Parser {
        tokens,
        position: 0,
    };
    let ast = parser.parse_pipe()?;

    match parser.peek() {
        None => Ok(ast),
        Some(token) => Err(syntax_error(
            format!("unexpected token {token:?} after end of expression").as_str(),
        )),
    }
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.position + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.position += 1;
            return true;
        }

        false
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(name)) if name == keyword) {
            self.position += 1;
            return true;
        }

        false
    }

    fn expect(&mut self, expected: &Token) -> AppResult<()> {
        if self.eat(expected) {
            return Ok(());
        }

        Err(syntax_error(
            format!("expected {expected:?}, found {:?}", self.peek()).as_str(),
        ))
    }

    fn expect_keyword(&mut self, keyword: &str) -> AppResult<()> {
        if self.eat_keyword(keyword) {
            return Ok(());
        }

        Err(syntax_error(
            format!("expected '{keyword}', found {:?}", self.peek()).as_str(),
        ))
    }

    // pipe := comma ('|' pipe)?
    fn parse_pipe(&mut self) -> AppResult<Ast> {
        let lhs = self.parse_comma()?;
        if self.eat(&Token::Pipe) {
            let rhs = self.parse_pipe()?;
            return Ok(Ast::Pipe(Box::new(lhs), Box::new(rhs)));
        }

        Ok(lhs)
    }

    fn parse_comma(&mut self) -> AppResult<Ast> {
        let mut lhs = self.parse_alternative()?;
        while self.eat(&Token::Comma) {
            let rhs = self.parse_alternative()?;
            lhs = Ast::Comma(Box::new(lhs), Box::new(rhs));
        }

        Ok(lhs)
    }

    // `//` is right-associative in jq.
    fn parse_alternative(&mut self) -> AppResult<Ast> {
        let lhs = self.parse_or()?;
        if self.eat(&Token::Alt) {
            let rhs = self.parse_alternative()?;
            return Ok(Ast::Alternative(Box::new(lhs), Box::new(rhs)));
        }

        Ok(lhs)
    }

    fn parse_or(&mut self) -> AppResult<Ast> {
        let mut lhs = self.parse_and()?;
        while self.eat_keyword("or") {
            let rhs = self.parse_and()?;
            lhs = Ast::Or(Box::new(lhs), Box::new(rhs));
        }

        Ok(lhs)
    }

    fn parse_and(&mut self) -> AppResult<Ast> {
        let mut lhs = self.parse_comparison()?;
        while self.eat_keyword("and") {
            let rhs = self.parse_comparison()?;
            lhs = Ast::And(Box::new(lhs), Box::new(rhs));
        }

        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> AppResult<Ast> {
        let lhs = self.parse_additive()?;
        let op = match self.peek() {
            Some(Token::Eq) => BinaryOp::Equal,
            Some(Token::Neq) => BinaryOp::NotEqual,
            Some(Token::Lt) => BinaryOp::Less,
            Some(Token::Le) => BinaryOp::LessOrEqual,
            Some(Token::Gt) => BinaryOp::Greater,
            Some(Token::Ge) => BinaryOp::GreaterOrEqual,
            _ => return Ok(lhs),
        };
        self.position += 1;

        let rhs = self.parse_additive()?;
        Ok(Ast::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn parse_additive(&mut self) -> AppResult<Ast> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Subtract,
                _ => return Ok(lhs),
            };
            self.position += 1;

            let rhs = self.parse_multiplicative()?;
            lhs = Ast::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn parse_multiplicative(&mut self) -> AppResult<Ast> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Multiply,
                Some(Token::Slash) => BinaryOp::Divide,
                Some(Token::Percent) => BinaryOp::Modulo,
                _ => return Ok(lhs),
            };
            self.position += 1;

            let rhs = self.parse_unary()?;
            lhs = Ast::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn parse_unary(&mut self) -> AppResult<Ast> {
        if self.eat(&Token::Minus) {
            let operand = self.parse_postfix()?;
            return Ok(Ast::Negate(Box::new(operand)));
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> AppResult<Ast> {
        let mut term = self.parse_primary()?;

        loop {
            match self.peek().cloned() {
                Some(Token::Field(name)) => {
                    self.position += 1;
                    term = index(term, Ast::Literal(Value::String(name)));
                }
                Some(Token::Dot) => match self.peek_at(1).cloned() {
                    Some(Token::Str(name)) => {
                        self.position += 2;
                        term = index(term, Ast::Literal(Value::String(name)));
                    }
                    Some(Token::LBracket) => {
                        self.position += 1;
                        term = self.parse_bracket_suffix(term)?;
                    }
                    _ => return Ok(term),
                },
                Some(Token::LBracket) => {
                    term = self.parse_bracket_suffix(term)?;
                }
                Some(Token::Question) => {
                    self.position += 1;
                    term = Ast::Try(Box::new(term));
                }
                _ => return Ok(term),
            }
        }
    }

    // Handles `[]`, `[expr]`, `[from:to]` after a term.
    fn parse_bracket_suffix(&mut self, term: Ast) -> AppResult<Ast> {
        self.expect(&Token::LBracket)?;

        if self.eat(&Token::RBracket) {
            return Ok(Ast::Iterate(Box::new(term)));
        }

        if self.eat(&Token::Colon) {
            let to = self.parse_pipe()?;
            self.expect(&Token::RBracket)?;
            return Ok(Ast::Slice {
                target: Box::new(term),
                from: None,
                to: Some(Box::new(to)),
            });
        }

        let key = self.parse_pipe()?;
        if self.eat(&Token::Colon) {
            let to = if self.peek() == Some(&Token::RBracket) {
                None
            } else {
                Some(Box::new(self.parse_pipe()?))
            };
            self.expect(&Token::RBracket)?;
            return Ok(Ast::Slice {
                target: Box::new(term),
                from: Some(Box::new(key)),
                to,
            });
        }

        self.expect(&Token::RBracket)?;
        Ok(index(term, key))
    }

    fn parse_primary(&mut self) -> AppResult<Ast> {
        let Some(token) = self.advance() else {
            return Err(syntax_error("unexpected end of expression"));
        };

        match token {
            Token::Dot => match self.peek().cloned() {
                Some(Token::Str(name)) => {
                    self.position += 1;
                    Ok(index(Ast::Identity, Ast::Literal(Value::String(name))))
                }
                _ => Ok(Ast::Identity),
            },
            Token::Field(name) => Ok(index(Ast::Identity, Ast::Literal(Value::String(name)))),
            Token::Number(value) => Ok(Ast::Literal(number_value(value))),
            Token::Str(value) => Ok(Ast::Literal(Value::String(value))),
            Token::Template(parts) => format_string(parts),
            Token::LParen => {
                let inner = self.parse_pipe()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::LBracket => {
                if self.eat(&Token::RBracket) {
                    return Ok(Ast::Array(None));
                }
                let inner = self.parse_pipe()?;
                self.expect(&Token::RBracket)?;
                Ok(Ast::Array(Some(Box::new(inner))))
            }
            Token::LBrace => self.parse_object(),
            Token::Ident(name) => self.parse_ident(name),
            other => Err(syntax_error(format!("unexpected token {other:?}").as_str())),
        }
    }

    fn parse_ident(&mut self, name: String) -> AppResult<Ast> {
        match name.as_str() {
            "true" => return Ok(Ast::Literal(Value::Bool(true))),
            "false" => return Ok(Ast::Literal(Value::Bool(false))),
            "null" => return Ok(Ast::Literal(Value::Null)),
            "if" => return self.parse_if(),
            "and" | "or" | "then" | "elif" | "else" | "end" => {
                return Err(syntax_error(
                    format!("unexpected keyword '{name}'").as_str(),
                ));
            }
            "def" | "reduce" | "foreach" | "as" | "label" | "import" | "include" | "try" => {
                return Err(syntax_error(
                    format!("'{name}' is not supported").as_str(),
                ));
            }
            _ => {}
        }

        let mut args = Vec::new();
        if self.eat(&Token::LParen) {
            loop {
                args.push(self.parse_pipe()?);
                if self.eat(&Token::Semicolon) {
                    continue;
                }
                self.expect(&Token::RParen)?;
                break;
            }
        }

        Ok(Ast::Call { name, args })
    }

    fn parse_if(&mut self) -> AppResult<Ast> {
        let mut branches = Vec::new();

        loop {
            let condition = self.parse_pipe()?;
            self.expect_keyword("then")?;
            let body = self.parse_pipe()?;
            branches.push((condition, body));

            if self.eat_keyword("elif") {
                continue;
            }
            break;
        }

        let otherwise = if self.eat_keyword("else") {
            Some(Box::new(self.parse_pipe()?))
        } else {
            None
        };
        self.expect_keyword("end")?;

        Ok(Ast::If {
            branches,
            otherwise,
        })
    }

    fn parse_object(&mut self) -> AppResult<Ast> {
        let mut entries = Vec::new();
        if self.eat(&Token::RBrace) {
            return Ok(Ast::Object(entries));
        }

        loop {
            let (key, shorthand_value) = match self.advance() {
                Some(Token::Ident(name)) | Some(Token::Str(name)) => {
                    let shorthand = index(Ast::Identity, Ast::Literal(Value::String(name.clone())));
                    (Ast::Literal(Value::String(name)), Some(shorthand))
                }
                Some(Token::LParen) => {
                    let key = self.parse_pipe()?;
                    self.expect(&Token::RParen)?;
                    (key, None)
                }
                Some(Token::Template(parts)) => (format_string(parts)?, None),
                other => {
                    return Err(syntax_error(
                        format!("invalid object key {other:?}").as_str(),
                    ));
                }
            };

            let value = if self.eat(&Token::Colon) {
                self.parse_alternative()?
            } else {
                shorthand_value.ok_or_else(|| {
                    syntax_error("computed object keys require an explicit value")
                })?
            };
            entries.push((key, value));

            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RBrace)?;
            return Ok(Ast::Object(entries));
        }
    }
}

fn format_string(parts: Vec<TemplatePart>) -> AppResult<Ast> {
    parts
        .into_iter()
        .map(|part| match part {
            TemplatePart::Literal(text) => Ok(FormatPart::Literal(text)),
            TemplatePart::Expr(tokens) => parse(tokens).map(FormatPart::Expr),
        })
        .collect::<AppResult<Vec<_>>>()
        .map(Ast::Format)
}

fn index(target: Ast, key: Ast) -> Ast {
    Ast::Index {
        target: Box::new(target),
        key: Box::new(key),
    }
}

pub(super) fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        // Within f64's exact integer range.
        return Value::from(value as i64);
    }

    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn syntax_error(message: &str) -> AppError {
    AppError::Transform(format!("filter syntax error: {message}"))
}
