//! Calculator tool — evaluates arithmetic expressions.
//!
//! Supports `+`, `-`, `*`, `/`, `%`, `^` (right-associative), parentheses,
//! and unary negation, via precedence climbing. No dependencies beyond std.

use async_trait::async_trait;
use baton_core::error::ToolError;
use baton_core::tool::{Tool, ToolOutput};
use baton_core::RunContext;

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression. Supports +, -, *, /, % (remainder), \
         ^ (power), parentheses, and decimal numbers."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "The expression to evaluate, e.g. '(2 + 3) * 4' or '2 ^ 10'"
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _ctx: &RunContext,
    ) -> Result<ToolOutput, ToolError> {
        let expression = arguments["expression"].as_str().ok_or_else(|| {
            ToolError::InvalidArguments {
                tool_name: "calculator".into(),
                reason: "missing 'expression' argument".into(),
            }
        })?;

        match evaluate(expression) {
            Ok(value) => {
                let formatted = if value.fract() == 0.0 && value.abs() < 1e15 {
                    format!("{}", value as i64)
                } else {
                    format!("{value}")
                };
                Ok(ToolOutput::text(formatted)
                    .with_data(serde_json::json!({ "result": value })))
            }
            Err(reason) => Ok(ToolOutput::failure(format!("Error: {reason}"))),
        }
    }
}

// --- Precedence-climbing evaluator ---

/// Evaluate an arithmetic expression string.
pub fn evaluate(expression: &str) -> Result<f64, String> {
    let tokens = tokenize(expression)?;
    let mut cursor = Cursor { tokens: &tokens, pos: 0 };
    let value = parse_expression(&mut cursor, 0)?;
    if let Some(extra) = cursor.peek() {
        return Err(format!("unexpected trailing token: {extra:?}"));
    }
    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Op(Op),
    LParen,
    RParen,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

impl Op {
    /// Binding power; higher binds tighter.
    fn precedence(self) -> u8 {
        match self {
            Op::Add | Op::Sub => 1,
            Op::Mul | Op::Div | Op::Rem => 2,
            Op::Pow => 3,
        }
    }

    fn right_associative(self) -> bool {
        matches!(self, Op::Pow)
    }

    fn apply(self, lhs: f64, rhs: f64) -> Result<f64, String> {
        match self {
            Op::Add => Ok(lhs + rhs),
            Op::Sub => Ok(lhs - rhs),
            Op::Mul => Ok(lhs * rhs),
            Op::Div => {
                if rhs == 0.0 {
                    Err("division by zero".into())
                } else {
                    Ok(lhs / rhs)
                }
            }
            Op::Rem => {
                if rhs == 0.0 {
                    Err("remainder by zero".into())
                } else {
                    Ok(lhs % rhs)
                }
            }
            Op::Pow => Ok(lhs.powf(rhs)),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' => { tokens.push(Token::Op(Op::Add)); chars.next(); }
            '-' => { tokens.push(Token::Op(Op::Sub)); chars.next(); }
            '*' => { tokens.push(Token::Op(Op::Mul)); chars.next(); }
            '/' => { tokens.push(Token::Op(Op::Div)); chars.next(); }
            '%' => { tokens.push(Token::Op(Op::Rem)); chars.next(); }
            '^' => { tokens.push(Token::Op(Op::Pow)); chars.next(); }
            '(' => { tokens.push(Token::LParen); chars.next(); }
            ')' => { tokens.push(Token::RParen); chars.next(); }
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = start;
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        end = i + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let literal = &input[start..end];
                let number: f64 = literal
                    .parse()
                    .map_err(|_| format!("invalid number: {literal}"))?;
                tokens.push(Token::Number(number));
            }
            other => return Err(format!("unexpected character: '{other}'")),
        }
    }

    Ok(tokens)
}

struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }
}

fn parse_expression(cursor: &mut Cursor<'_>, min_precedence: u8) -> Result<f64, String> {
    let mut lhs = parse_operand(cursor)?;

    while let Some(Token::Op(op)) = cursor.peek() {
        if op.precedence() < min_precedence {
            break;
        }
        cursor.advance();

        let next_min = if op.right_associative() {
            op.precedence()
        } else {
            op.precedence() + 1
        };
        let rhs = parse_expression(cursor, next_min)?;
        lhs = op.apply(lhs, rhs)?;
    }

    Ok(lhs)
}

fn parse_operand(cursor: &mut Cursor<'_>) -> Result<f64, String> {
    match cursor.advance() {
        Some(Token::Number(n)) => Ok(n),
        Some(Token::Op(Op::Sub)) => Ok(-parse_operand(cursor)?),
        Some(Token::LParen) => {
            let value = parse_expression(cursor, 0)?;
            match cursor.advance() {
                Some(Token::RParen) => Ok(value),
                _ => Err("expected closing parenthesis".into()),
            }
        }
        Some(token) => Err(format!("unexpected token: {token:?}")),
        None => Err("unexpected end of expression".into()),
    }
}
