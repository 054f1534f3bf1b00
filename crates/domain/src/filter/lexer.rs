use pullbridge_core::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Token {
    Dot,
    Field(String),
    Ident(String),
    Number(f64),
    Str(String),
    Template(Vec<TemplatePart>),
    LBracket,
    RBracket,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Pipe,
    Comma,
    Colon,
    Semicolon,
    Question,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    Alt,
}

/// Piece of an interpolated string literal.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum TemplatePart {
    Literal(String),
    Expr(Vec<Token>),
}

pub(super) fn tokenize(source: &str) -> AppResult<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut position = 0;

    while let Some(&current) = chars.get(position) {
        let next = chars.get(position + 1).copied();
        match current {
            character if character.is_whitespace() => {
                position += 1;
            }
            '.' => {
                if next == Some('.') {
                    return Err(syntax_error("recursive descent '..' is not supported"));
                }
                if next.is_some_and(is_ident_start) {
                    let (name, end) = read_ident(&chars, position + 1);
                    tokens.push(Token::Field(name));
                    position = end;
                } else {
                    tokens.push(Token::Dot);
                    position += 1;
                }
            }
            '"' => {
                let (mut parts, end) = read_string(&chars, position + 1)?;
                let token = match parts.as_mut_slice() {
                    [] => Token::Str(String::new()),
                    [TemplatePart::Literal(value)] => Token::Str(std::mem::take(value)),
                    _ => Token::Template(parts),
                };
                tokens.push(token);
                position = end;
            }
            character if character.is_ascii_digit() => {
                let (value, end) = read_number(&chars, position)?;
                tokens.push(Token::Number(value));
                position = end;
            }
            character if is_ident_start(character) => {
                let (name, end) = read_ident(&chars, position);
                tokens.push(Token::Ident(name));
                position = end;
            }
            '$' => return Err(syntax_error("variables are not supported")),
            '#' => return Err(syntax_error("comments are not supported")),
            _ => {
                let (token, width) = read_operator(current, next)?;
                tokens.push(token);
                position += width;
            }
        }
    }

    Ok(tokens)
}

fn read_operator(current: char, next: Option<char>) -> AppResult<(Token, usize)> {
    let token = match (current, next) {
        ('/', Some('/')) => return Ok((Token::Alt, 2)),
        ('=', Some('=')) => return Ok((Token::Eq, 2)),
        ('!', Some('=')) => return Ok((Token::Neq, 2)),
        ('<', Some('=')) => return Ok((Token::Le, 2)),
        ('>', Some('=')) => return Ok((Token::Ge, 2)),
        ('|', Some('=')) | ('=', _) => {
            return Err(syntax_error("assignment operators are not supported"));
        }
        ('[', _) => Token::LBracket,
        (']', _) => Token::RBracket,
        ('(', _) => Token::LParen,
        (')', _) => Token::RParen,
        ('{', _) => Token::LBrace,
        ('}', _) => Token::RBrace,
        ('|', _) => Token::Pipe,
        (',', _) => Token::Comma,
        (':', _) => Token::Colon,
        (';', _) => Token::Semicolon,
        ('?', _) => Token::Question,
        ('+', _) => Token::Plus,
        ('-', _) => Token::Minus,
        ('*', _) => Token::Star,
        ('/', _) => Token::Slash,
        ('%', _) => Token::Percent,
        ('<', _) => Token::Lt,
        ('>', _) => Token::Gt,
        _ => {
            return Err(syntax_error(
                format!("unexpected character '{current}'").as_str(),
            ));
        }
    };

    Ok((token, 1))
}

fn is_ident_start(character: char) -> bool {
    character.is_ascii_alphabetic() || character == '_'
}

fn is_ident_continue(character: char) -> bool {
    character.is_ascii_alphanumeric() || character == '_'
}

fn read_ident(chars: &[char], start: usize) -> (String, usize) {
    let mut end = start;
    while chars.get(end).copied().is_some_and(is_ident_continue) {
        end += 1;
    }

    (chars[start..end].iter().collect(), end)
}

fn read_number(chars: &[char], start: usize) -> AppResult<(f64, usize)> {
    let digit_at = |index: usize| chars.get(index).is_some_and(char::is_ascii_digit);
    let mut end = start;
    while digit_at(end) {
        end += 1;
    }

    if chars.get(end) == Some(&'.') && digit_at(end + 1) {
        end += 1;
        while digit_at(end) {
            end += 1;
        }
    }

    // Exponent only when digits follow, so `1else` stays a number and a keyword.
    if matches!(chars.get(end), Some('e' | 'E')) {
        let sign_width = usize::from(matches!(chars.get(end + 1), Some('+' | '-')));
        if digit_at(end + 1 + sign_width) {
            end += 1 + sign_width;
            while digit_at(end) {
                end += 1;
            }
        }
    }

    let literal: String = chars[start..end].iter().collect();
    literal
        .parse::<f64>()
        .map(|value| (value, end))
        .map_err(|error| syntax_error(format!("invalid number '{literal}': {error}").as_str()))
}

fn read_string(chars: &[char], start: usize) -> AppResult<(Vec<TemplatePart>, usize)> {
    let mut parts = Vec::new();
    let mut value = String::new();
    let mut position = start;

    loop {
        let Some(&current) = chars.get(position) else {
            return Err(syntax_error("unterminated string literal"));
        };
        position += 1;

        match current {
            '"' => {
                if !value.is_empty() {
                    parts.push(TemplatePart::Literal(value));
                }
                return Ok((parts, position));
            }
            '\\' => {
                let Some(&escaped) = chars.get(position) else {
                    return Err(syntax_error("unterminated escape sequence"));
                };
                position += 1;

                match escaped {
                    '"' => value.push('"'),
                    '\\' => value.push('\\'),
                    '/' => value.push('/'),
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    'b' => value.push('\u{8}'),
                    'f' => value.push('\u{c}'),
                    'u' => {
                        let hex: String = chars
                            .get(position..position + 4)
                            .map(|digits| digits.iter().collect())
                            .unwrap_or_default();
                        let code = u32::from_str_radix(hex.as_str(), 16)
                            .ok()
                            .and_then(char::from_u32)
                            .ok_or_else(|| {
                                syntax_error(format!("invalid unicode escape '\\u{hex}'").as_str())
                            })?;
                        value.push(code);
                        position += 4;
                    }
                    '(' => {
                        if !value.is_empty() {
                            parts.push(TemplatePart::Literal(std::mem::take(&mut value)));
                        }
                        let close = interpolation_end(chars, position)?;
                        let source: String = chars[position..close].iter().collect();
                        parts.push(TemplatePart::Expr(tokenize(source.as_str())?));
                        position = close + 1;
                    }
                    other => {
                        return Err(syntax_error(
                            format!("invalid escape sequence '\\{other}'").as_str(),
                        ));
                    }
                }
            }
            other => value.push(other),
        }
    }
}

// Position of the `)` closing an interpolation that starts at `start`.
fn interpolation_end(chars: &[char], start: usize) -> AppResult<usize> {
    let mut depth = 1_usize;
    let mut position = start;

    loop {
        let Some(&current) = chars.get(position) else {
            return Err(syntax_error("unterminated string interpolation"));
        };

        match current {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(position);
                }
            }
            '"' => {
                let (_, end) = read_string(chars, position + 1)?;
                position = end;
                continue;
            }
            _ => {}
        }
        position += 1;
    }
}

fn syntax_error(message: &str) -> AppError {
    AppError::Transform(format!("filter syntax error: {message}"))
}
