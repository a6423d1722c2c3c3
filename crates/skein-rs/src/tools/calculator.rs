//! The `calculate` tool: exact arithmetic so the model never does mental
//! math.
//!
//! Expressions are restricted to a character whitelist and evaluated by a
//! small precedence-climbing parser — no `eval`, no surprises. Supports
//! `+ - * / %`, `**` for exponentiation, unary sign, and parentheses.

use crate::ToolDef;
use crate::tools::core::{Tool, ToolFuture};
use crate::tools::spec::ToolSpec;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

/// Longest accepted expression, in characters.
const MAX_EXPRESSION_LEN: usize = 1000;

/// Typed arguments for the `calculate` tool.
#[derive(Deserialize, JsonSchema)]
pub struct CalculateArgs {
    /// The arithmetic expression, e.g. '2+2', '(3+5)*10', '2**10'.
    pub expression: String,
}

/// Exact arithmetic evaluator tool.
pub struct Calculator;

impl Tool for Calculator {
    fn definition(&self) -> ToolDef {
        ToolSpec::builder("calculate")
            .purpose("Evaluate an arithmetic expression exactly")
            .when_to_use(
                "When the user needs a precise numeric result — addition, \
                 multiplication, division, remainder, powers",
            )
            .when_not_to_use("For symbolic algebra or unit conversion; this evaluates numbers only")
            .parameters_for::<CalculateArgs>()
            .example("calculate(expression='(123+456)*789')", "456831")
            .example("calculate(expression='2**10')", "1024")
            .output_format("JSON: {success, data: {expression, result}} or {success: false, error}")
            .to_tool_def()
    }

    fn execute(&self, arguments: &str) -> ToolFuture<'_> {
        let arguments = arguments.to_string();
        Box::pin(async move {
            let args: CalculateArgs = match crate::tools::core::parse_tool_args(&arguments) {
                Ok(a) => a,
                Err(e) => return e,
            };

            match evaluate(&args.expression) {
                Ok(result) => {
                    info!("calculated: {} = {}", args.expression, format_number(result));
                    serde_json::json!({
                        "success": true,
                        "data": {
                            "expression": args.expression,
                            "result": result,
                        },
                    })
                    .to_string()
                }
                Err(e) => {
                    serde_json::json!({ "success": false, "error": e }).to_string()
                }
            }
        })
    }
}

/// Evaluate a whitelisted arithmetic expression.
pub fn evaluate(expression: &str) -> Result<f64, String> {
    if expression.chars().count() > MAX_EXPRESSION_LEN {
        return Err("expression too long".into());
    }
    if let Some(c) = expression
        .chars()
        .find(|c| !matches!(c, '0'..='9' | '+' | '-' | '*' | '/' | '%' | '.' | '(' | ')' | ' '))
    {
        return Err(format!("expression contains a disallowed character: '{c}'"));
    }

    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err("empty expression".into());
    }

    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expression(0)?;
    if parser.pos != parser.tokens.len() {
        return Err("unexpected trailing input".into());
    }
    if !value.is_finite() {
        return Err("result is not a finite number".into());
    }
    Ok(value)
}

/// Render a result without a trailing `.0` when it is integral.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Power,
    LParen,
    RParen,
}

fn tokenize(expression: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            ' ' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    tokens.push(Token::Power);
                    i += 2;
                } else {
                    tokens.push(Token::Star);
                    i += 1;
                }
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && matches!(chars[i], '0'..='9' | '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let value: f64 = literal
                    .parse()
                    .map_err(|_| format!("invalid number literal '{literal}'"))?;
                tokens.push(Token::Number(value));
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.peek();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    /// Precedence climbing: `+ -` bind loosest, then `* / %`, then `**`
    /// (right-associative).
    fn expression(&mut self, min_prec: u8) -> Result<f64, String> {
        let mut left = self.primary()?;

        while let Some(op) = self.peek() {
            let (prec, right_assoc) = match op {
                Token::Plus | Token::Minus => (1, false),
                Token::Star | Token::Slash | Token::Percent => (2, false),
                Token::Power => (3, true),
                _ => break,
            };
            if prec < min_prec {
                break;
            }
            self.advance();

            let next_min = if right_assoc { prec } else { prec + 1 };
            let right = self.expression(next_min)?;

            left = match op {
                Token::Plus => left + right,
                Token::Minus => left - right,
                Token::Star => left * right,
                Token::Slash => {
                    if right == 0.0 {
                        return Err("division by zero".into());
                    }
                    left / right
                }
                Token::Percent => {
                    if right == 0.0 {
                        return Err("remainder by zero".into());
                    }
                    left % right
                }
                Token::Power => left.powf(right),
                _ => return Err("unexpected operator".into()),
            };
        }

        Ok(left)
    }

    fn primary(&mut self) -> Result<f64, String> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::Minus) => Ok(-self.primary()?),
            Some(Token::Plus) => self.primary(),
            Some(Token::LParen) => {
                let value = self.expression(0)?;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err("missing closing parenthesis".into()),
                }
            }
            Some(t) => Err(format!("unexpected token {t:?}")),
            None => Err("unexpected end of expression".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_arithmetic() {
        assert_eq!(evaluate("2+2").unwrap(), 4.0);
        assert_eq!(evaluate("(3+5)*10").unwrap(), 80.0);
        assert_eq!(evaluate("(123+456)*789").unwrap(), 456_831.0);
        assert_eq!(evaluate("10%3").unwrap(), 1.0);
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(evaluate("2+3*4").unwrap(), 14.0);
        assert_eq!(evaluate("2**10").unwrap(), 1024.0);
        // Exponentiation is right-associative: 2**(3**2).
        assert_eq!(evaluate("2**3**2").unwrap(), 512.0);
    }

    #[test]
    fn unary_sign() {
        assert_eq!(evaluate("-5+3").unwrap(), -2.0);
        assert_eq!(evaluate("-(2+3)*2").unwrap(), -10.0);
        assert_eq!(evaluate("+7").unwrap(), 7.0);
    }

    #[test]
    fn fractional_division() {
        let v = evaluate("100/3").unwrap();
        assert!((v - 33.333333).abs() < 1e-4);
    }

    #[test]
    fn division_by_zero_is_reported() {
        assert!(evaluate("1/0").unwrap_err().contains("division by zero"));
        assert!(evaluate("5%0").unwrap_err().contains("remainder by zero"));
    }

    #[test]
    fn disallowed_characters_rejected() {
        assert!(evaluate("2+x").is_err());
        assert!(evaluate("__import__").is_err());
    }

    #[test]
    fn malformed_expressions_rejected() {
        assert!(evaluate("").is_err());
        assert!(evaluate("2+").is_err());
        assert!(evaluate("(2+3").is_err());
        assert!(evaluate("2 3").is_err());
        assert!(evaluate("1.2.3").is_err());
    }

    #[test]
    fn length_cap() {
        let long = "1+".repeat(600) + "1";
        assert!(evaluate(&long).unwrap_err().contains("too long"));
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(-10.0), "-10");
        assert_eq!(format_number(2.5), "2.5");
    }

    #[tokio::test]
    async fn tool_envelope() {
        let result = Calculator
            .execute(r#"{"expression": "(123+456)*789"}"#)
            .await;
        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(parsed["success"], true);
        assert_eq!(parsed["data"]["result"], 456831.0);

        let result = Calculator.execute(r#"{"expression": "1/0"}"#).await;
        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(parsed["success"], false);
    }
}
