use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{require_str, Tool, ToolError};

/// Calculator tool - evaluates arithmetic expressions without shelling
/// out to the model.
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression. Supports + - * / % ^ and parentheses."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "The expression to evaluate, e.g. \"2 + 2 * 10\""
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let expression = require_str(&args, "expression")?;
        let result = evaluate(expression)
            .map_err(|e| ToolError::ExecutionFailed(format!("cannot evaluate '{expression}': {e}")))?;

        // Integers render without a trailing ".0" so the model reads "4", not "4.0".
        let rendered = if result.fract() == 0.0 && result.abs() < 1e15 {
            json!(result as i64)
        } else {
            json!(result)
        };

        Ok(json!({ "expression": expression, "result": rendered }))
    }
}

/// Recursive-descent evaluator over f64.
///
/// Grammar: expr := term (('+'|'-') term)*
///          term := power (('*'|'/'|'%') power)*
///          power := unary ('^' power)?
///          unary := '-' unary | primary
///          primary := number | '(' expr ')'
fn evaluate(input: &str) -> Result<f64, String> {
    let mut parser = Parser {
        chars: input.chars().filter(|c| !c.is_whitespace()).collect(),
        pos: 0,
    };
    let value = parser.expr()?;
    if parser.pos != parser.chars.len() {
        return Err(format!("unexpected character at position {}", parser.pos));
    }
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn expr(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        while let Some(op) = self.peek() {
            match op {
                '+' => {
                    self.bump();
                    value += self.term()?;
                }
                '-' => {
                    self.bump();
                    value -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.power()?;
        while let Some(op) = self.peek() {
            match op {
                '*' => {
                    self.bump();
                    value *= self.power()?;
                }
                '/' => {
                    self.bump();
                    let rhs = self.power()?;
                    if rhs == 0.0 {
                        return Err("division by zero".into());
                    }
                    value /= rhs;
                }
                '%' => {
                    self.bump();
                    let rhs = self.power()?;
                    if rhs == 0.0 {
                        return Err("division by zero".into());
                    }
                    value %= rhs;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn power(&mut self) -> Result<f64, String> {
        let base = self.unary()?;
        if self.peek() == Some('^') {
            self.bump();
            let exponent = self.power()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn unary(&mut self) -> Result<f64, String> {
        if self.peek() == Some('-') {
            self.bump();
            return Ok(-self.unary()?);
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some('(') => {
                self.bump();
                let value = self.expr()?;
                if self.bump() != Some(')') {
                    return Err("missing closing parenthesis".into());
                }
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
                    self.bump();
                }
                let text: String = self.chars[start..self.pos].iter().collect();
                text.parse().map_err(|_| format!("bad number '{text}'"))
            }
            Some(c) => Err(format!("unexpected character '{c}'")),
            None => Err("unexpected end of expression".into()),
        }
    }
}
