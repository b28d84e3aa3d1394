//! Condition expressions for `[[?if|...]]` blocks.
//!
//! ```text
//! expr    := or
//! or      := and (("||" | "or") and)*
//! and     := not (("&&" | "and") not)*
//! not     := ("!" | "not") not | compare
//! compare := atom (("==" | "!=" | "<" | "<=" | ">" | ">=") atom)?
//! atom    := number | string | true | false | null | path | "(" expr ")"
//! ```
//!
//! Paths resolve against the template scope; a path that does not exist is
//! an error rather than a silent `false`.

use std::cmp::Ordering;

use logos::Logos;
use serde_json::Value;

use super::scope::{is_truthy, Scope};
use crate::error::TemplateError;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum Token {
    #[token("==")]
    Eq,
    #[token("!=")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,

    #[token("&&")]
    #[token("and")]
    And,
    #[token("||")]
    #[token("or")]
    Or,
    #[token("!")]
    #[token("not")]
    Not,

    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,

    #[regex(r"-?[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r#""[^"]*""#, |lex| trim_quotes(lex.slice()))]
    #[regex(r"'[^']*'", |lex| trim_quotes(lex.slice()))]
    Str(String),

    // `:#` is the loop position injected by list blocks
    #[regex(r"[a-zA-Z_:#][a-zA-Z0-9_:#.]*", |lex| lex.slice().to_string())]
    Path(String),
}

fn trim_quotes(s: &str) -> String {
    s[1..s.len() - 1].to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Path(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Parse a condition.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut tokens = Vec::new();
        let mut lexer = Token::lexer(source);
        while let Some(token) = lexer.next() {
            match token {
                Ok(token) => tokens.push(token),
                Err(()) => {
                    return Err(TemplateError::Expression(format!(
                        "unexpected '{}' at offset {} in '{}'",
                        lexer.slice(),
                        lexer.span().start,
                        source
                    )))
                }
            }
        }

        let mut parser = Parser {
            tokens,
            pos: 0,
            source,
        };
        let expr = parser.or()?;
        if parser.pos < parser.tokens.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(expr)
    }

    /// Evaluate against a scope.
    pub fn evaluate(&self, scope: &Scope<'_>) -> Result<Value, TemplateError> {
        Ok(match self {
            Expr::Literal(value) => value.clone(),
            Expr::Path(path) => scope.require(path)?.clone(),
            Expr::Not(inner) => Value::Bool(!is_truthy(&inner.evaluate(scope)?)),
            Expr::And(lhs, rhs) => {
                Value::Bool(is_truthy(&lhs.evaluate(scope)?) && is_truthy(&rhs.evaluate(scope)?))
            }
            Expr::Or(lhs, rhs) => {
                Value::Bool(is_truthy(&lhs.evaluate(scope)?) || is_truthy(&rhs.evaluate(scope)?))
            }
            Expr::Compare(op, lhs, rhs) => {
                let lhs = lhs.evaluate(scope)?;
                let rhs = rhs.evaluate(scope)?;
                Value::Bool(compare(*op, &lhs, &rhs))
            }
        })
    }

    /// Evaluate and reduce the result to its truthiness.
    pub fn test(&self, scope: &Scope<'_>) -> Result<bool, TemplateError> {
        Ok(is_truthy(&self.evaluate(scope)?))
    }
}

fn compare(op: CompareOp, lhs: &Value, rhs: &Value) -> bool {
    let ordering = match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.as_f64().zip(b.as_f64()).and_then(|(a, b)| a.partial_cmp(&b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    };
    match (op, ordering) {
        (CompareOp::Eq, ordering) => ordering == Some(Ordering::Equal),
        (CompareOp::Ne, ordering) => ordering != Some(Ordering::Equal),
        (_, None) => false,
        (CompareOp::Lt, Some(o)) => o == Ordering::Less,
        (CompareOp::Le, Some(o)) => o != Ordering::Greater,
        (CompareOp::Gt, Some(o)) => o == Ordering::Greater,
        (CompareOp::Ge, Some(o)) => o != Ordering::Less,
    }
}

struct Parser<'s> {
    tokens: Vec<Token>,
    pos: usize,
    source: &'s str,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn error(&self, message: &str) -> TemplateError {
        TemplateError::Expression(format!("{} in '{}'", message, self.source))
    }

    fn or(&mut self) -> Result<Expr, TemplateError> {
        let mut lhs = self.and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr, TemplateError> {
        let mut lhs = self.not()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn not(&mut self) -> Result<Expr, TemplateError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.not()?)));
        }
        self.compare()
    }

    fn compare(&mut self) -> Result<Expr, TemplateError> {
        let lhs = self.atom()?;
        let op = match self.peek() {
            Some(Token::Eq) => CompareOp::Eq,
            Some(Token::Ne) => CompareOp::Ne,
            Some(Token::Lt) => CompareOp::Lt,
            Some(Token::Le) => CompareOp::Le,
            Some(Token::Gt) => CompareOp::Gt,
            Some(Token::Ge) => CompareOp::Ge,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.atom()?;
        Ok(Expr::Compare(op, Box::new(lhs), Box::new(rhs)))
    }

    fn atom(&mut self) -> Result<Expr, TemplateError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Literal(
                serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number),
            )),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::Null) => Ok(Expr::Literal(Value::Null)),
            Some(Token::Path(path)) => Ok(Expr::Path(path)),
            Some(Token::LParen) => {
                let inner = self.or()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(self.error("expected ')'")),
                }
            }
            Some(_) => Err(self.error("expected a value")),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval(source: &str, data: &Value) -> Result<bool, TemplateError> {
        Expr::parse(source)?.test(&Scope::root(data))
    }

    // =========================================================================
    // Parsing
    // =========================================================================

    #[test]
    fn test_precedence() {
        let expr = Expr::parse("a || b && !c").unwrap();
        assert_eq!(
            expr,
            Expr::Or(
                Box::new(Expr::Path("a".into())),
                Box::new(Expr::And(
                    Box::new(Expr::Path("b".into())),
                    Box::new(Expr::Not(Box::new(Expr::Path("c".into())))),
                )),
            )
        );
    }

    #[test]
    fn test_word_operators() {
        let data = json!({"errors": 0, "warnings": 2});
        assert!(eval("errors == 0 and warnings > 1", &data).unwrap());
        assert!(eval("not errors or warnings < 1", &data).unwrap());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Expr::parse("a ==").unwrap_err(), TemplateError::Expression(_)));
        assert!(matches!(Expr::parse("(a").unwrap_err(), TemplateError::Expression(_)));
        assert!(matches!(Expr::parse("a b").unwrap_err(), TemplateError::Expression(_)));
        assert!(matches!(Expr::parse("a $ b").unwrap_err(), TemplateError::Expression(_)));
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    #[test]
    fn test_compare_values() {
        let data = json!({"severity": "warning", "count": 3, "ratio": 0.5});
        assert!(eval("severity == 'warning'", &data).unwrap());
        assert!(eval("severity != \"error\"", &data).unwrap());
        assert!(eval("count >= 3 && count <= 3", &data).unwrap());
        assert!(eval("ratio < 1", &data).unwrap());
        assert!(!eval("count < 'x'", &data).unwrap());
    }

    #[test]
    fn test_loop_keys_and_nested_paths() {
        let data = json!({":#": 2, "needsep": 0, "totals": {"errors": 1}});
        assert!(eval(":# == 2 && !needsep", &data).unwrap());
        assert!(eval("totals.errors", &data).unwrap());
    }

    #[test]
    fn test_missing_key_is_error() {
        let data = json!({"name": "t"});
        let err = eval("rows > 0", &data).unwrap_err();
        assert_eq!(
            err,
            TemplateError::MissingKey {
                key: "rows".into(),
                context: "root".into(),
                available: vec!["name".into()],
            }
        );
    }
}
