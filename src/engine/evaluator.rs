// src/engine/evaluator.rs

//! Numeric evaluation of LaTeX-flavoured or plain math answers.
//!
//! This is not a CAS: expressions are rewritten into a small arithmetic
//! language (`+ - * / % **`, parentheses and a handful of `Math.` functions)
//! and evaluated to an `f64`. Two answers are "equivalent" when their values
//! agree within a tolerance.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

use crate::config::EQUIVALENCE_TOLERANCE;
use crate::error::ParseError;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("evaluator regex must compile")
}

static PLAIN_DECIMAL: Lazy<Regex> = Lazy::new(|| re(r"^[+-]?(?:\d+(?:[.,]\d+)?|[.,]\d+)$"));

static MATH_DELIMITERS: Lazy<Regex> = Lazy::new(|| re(r"\$+"));
static SIZING: Lazy<Regex> = Lazy::new(|| re(r"\\(?:left|right|[Bb]igg?[lr]?)\b"));
static TEXT_CMD: Lazy<Regex> =
    Lazy::new(|| re(r"\\(?:text|textrm|mathrm|mbox)\s*\{([^{}]*)\}"));

static NTH_ROOT: Lazy<Regex> = Lazy::new(|| re(r"\\sqrt\s*\[([^\[\]]*)\]\s*\{([^{}]*)\}"));
static SQRT_BRACED: Lazy<Regex> = Lazy::new(|| re(r"\\sqrt\s*\{([^{}]*)\}"));
static SQRT_BARE: Lazy<Regex> = Lazy::new(|| re(r"\\sqrt\s*(\d+(?:\.\d+)?|Math\.PI)"));
static SQRT_PAREN: Lazy<Regex> = Lazy::new(|| re(r"\\sqrt\s*\("));
static POW_BRACED: Lazy<Regex> = Lazy::new(|| re(r"\^\s*\{([^{}]*)\}"));
static POW_BARE: Lazy<Regex> = Lazy::new(|| re(r"\^\s*([0-9A-Za-z.])"));
static FRAC_BRACED: Lazy<Regex> =
    Lazy::new(|| re(r"\\[dt]?frac\s*\{([^{}]*)\}\s*\{([^{}]*)\}"));
static FRAC_DIGITS: Lazy<Regex> = Lazy::new(|| re(r"\\[dt]?frac\s*(\d)\s*(\d)"));

static PI: Lazy<Regex> = Lazy::new(|| re(r"\\pi\b"));
static FUNC_BRACED: Lazy<Regex> =
    Lazy::new(|| re(r"\\(sin|cos|tan|ln|log|exp|abs)\s*\{([^{}]*)\}"));
static FUNC_PAREN: Lazy<Regex> = Lazy::new(|| re(r"\\(sin|cos|tan|ln|log|exp|abs)\s*\("));
static FUNC_BARE: Lazy<Regex> =
    Lazy::new(|| re(r"\\(sin|cos|tan|ln|log|exp|abs)\s*(Math\.PI|\d+(?:\.\d+)?)"));

static THIN_SPACE: Lazy<Regex> = Lazy::new(|| re(r"\\[,;:! ]"));
static ANY_COMMAND: Lazy<Regex> = Lazy::new(|| re(r"\\[A-Za-z]+"));

static DECIMAL_COMMA: Lazy<Regex> = Lazy::new(|| re(r"(\d),(\d)"));
static MUL_BEFORE_PAREN: Lazy<Regex> = Lazy::new(|| re(r"(\d|\))\s*\("));
static MUL_BEFORE_IDENT: Lazy<Regex> = Lazy::new(|| re(r"(\d|\))\s*(Math\.)"));
static MUL_AFTER_PAREN: Lazy<Regex> = Lazy::new(|| re(r"\)\s*(\d)"));
static MUL_AFTER_CONST: Lazy<Regex> = Lazy::new(|| re(r"(Math\.(?:PI|E))\s*(\(|\d|Math\.)"));

static BARE_PI: Lazy<Regex> = Lazy::new(|| re(r"pi|π"));
static BARE_SQRT_NUM: Lazy<Regex> = Lazy::new(|| re(r"(?:sqrt|√)\s*(\d+(?:\.\d+)?)"));
static BARE_SQRT: Lazy<Regex> = Lazy::new(|| re(r"(?:sqrt|√)\s*\("));
static BARE_FUNC: Lazy<Regex> = Lazy::new(|| re(r"\b(sin|cos|tan|ln|log|exp|abs)\s*\("));

static NAMESPACE: Lazy<Regex> = Lazy::new(|| re(r"Math\.[A-Za-z]+"));

const ALLOWED_CHARS: &str = "0123456789+-*/().,%e ";
const MAX_REWRITE_PASSES: usize = 16;
const MAX_NESTING: usize = 64;

/// Evaluates a math answer to a finite number.
///
/// Attempts, first success wins:
/// * a plain signed decimal (comma accepted as decimal separator),
/// * LaTeX translated to arithmetic,
/// * the raw string read as informal arithmetic (`sqrt`, `pi`, `^`).
pub fn evaluate(raw: &str) -> Result<f64, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    if PLAIN_DECIMAL.is_match(trimmed) {
        return parse_decimal(trimmed);
    }

    let latex = latex_to_arithmetic(trimmed).and_then(|expr| evaluate_arithmetic(&expr));
    match latex {
        Ok(value) => Ok(value),
        Err(e) => {
            tracing::debug!("LaTeX evaluation of {:?} failed ({}), trying bare form", trimmed, e);
            evaluate_arithmetic(&bare_to_arithmetic(trimmed))
        }
    }
}

fn parse_decimal(s: &str) -> Result<f64, ParseError> {
    s.replace(',', ".")
        .parse::<f64>()
        .map_err(|_| ParseError::UnexpectedToken(s.to_string()))
}

/// Unicode operators people paste from word processors.
fn normalize_symbols(s: &str) -> String {
    s.replace('×', "*")
        .replace('·', "*")
        .replace('÷', "/")
        .replace('−', "-")
        .replace('–', "-")
}

/// Rewrites LaTeX into the evaluator's arithmetic language.
///
/// Brace matching is shallow (`[^{}]*`), so the structural rules run innermost
/// first and repeat until nothing changes. Within a pass the order is fixed:
/// nth roots before square roots, braced exponents before bare ones, fractions
/// after both, functions last.
pub fn latex_to_arithmetic(raw: &str) -> Result<String, ParseError> {
    let mut s = normalize_symbols(raw);
    s = MATH_DELIMITERS.replace_all(&s, "").into_owned();
    s = SIZING.replace_all(&s, "").into_owned();
    s = TEXT_CMD.replace_all(&s, "$1").into_owned();
    s = PI.replace_all(&s, "Math.PI").into_owned();

    for _ in 0..MAX_REWRITE_PASSES {
        let before = s.clone();
        s = NTH_ROOT.replace_all(&s, "(($2)**(1/($1)))").into_owned();
        s = SQRT_BRACED.replace_all(&s, "Math.sqrt($1)").into_owned();
        s = SQRT_BARE.replace_all(&s, "Math.sqrt($1)").into_owned();
        s = POW_BRACED.replace_all(&s, "**($1)").into_owned();
        s = POW_BARE.replace_all(&s, "**$1").into_owned();
        s = FRAC_BRACED.replace_all(&s, "(($1)/($2))").into_owned();
        s = FRAC_DIGITS.replace_all(&s, "(($1)/($2))").into_owned();
        s = FUNC_BRACED
            .replace_all(&s, |caps: &Captures| {
                format!("Math.{}({})", function_name(&caps[1]), &caps[2])
            })
            .into_owned();
        if s == before {
            break;
        }
    }

    s = SQRT_PAREN.replace_all(&s, "Math.sqrt(").into_owned();
    s = FUNC_PAREN
        .replace_all(&s, |caps: &Captures| format!("Math.{}(", function_name(&caps[1])))
        .into_owned();
    s = FUNC_BARE
        .replace_all(&s, |caps: &Captures| {
            format!("Math.{}({})", function_name(&caps[1]), &caps[2])
        })
        .into_owned();

    // \pm only evaluates its "+" branch.
    s = s
        .replace("\\times", "*")
        .replace("\\cdot", "*")
        .replace("\\div", "/")
        .replace("\\pm", "+");
    s = THIN_SPACE.replace_all(&s, "").into_owned();
    // An unread root argument is an error, never a silent drop.
    if s.contains("\\sqrt") {
        return Err(ParseError::UnknownFunction("sqrt".to_string()));
    }
    s = ANY_COMMAND.replace_all(&s, "").into_owned();
    s = s.replace('\\', "").replace('{', "(").replace('}', ")");
    s = s.replace('^', "**");

    let s = insert_implicit_multiplication(&DECIMAL_COMMA.replace_all(&s, "$1.$2"));
    if s.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(s)
}

/// Informal arithmetic typed without LaTeX: `sqrt(2)/2`, `2pi`, `3^2`.
fn bare_to_arithmetic(raw: &str) -> String {
    let mut s = normalize_symbols(raw).replace('$', "");
    s = BARE_PI.replace_all(&s, "Math.PI").into_owned();
    s = BARE_SQRT_NUM.replace_all(&s, "Math.sqrt($1)").into_owned();
    s = BARE_SQRT.replace_all(&s, "Math.sqrt(").into_owned();
    s = BARE_FUNC.replace_all(&s, "Math.$1(").into_owned();
    s = s.replace('^', "**");
    insert_implicit_multiplication(&DECIMAL_COMMA.replace_all(&s, "$1.$2"))
}

fn function_name(latex: &str) -> &'static str {
    match latex {
        "sin" => "sin",
        "cos" => "cos",
        "tan" => "tan",
        "ln" => "ln",
        "log" => "log",
        "exp" => "exp",
        _ => "abs",
    }
}

fn insert_implicit_multiplication(s: &str) -> String {
    let s = MUL_AFTER_CONST.replace_all(s, "$1*$2");
    let s = MUL_BEFORE_PAREN.replace_all(&s, "$1*(");
    let s = MUL_BEFORE_IDENT.replace_all(&s, "$1*$2");
    MUL_AFTER_PAREN.replace_all(&s, ")*$1").into_owned()
}

/// Evaluates an arithmetic string after checking it against the character whitelist.
///
/// Once every `Math.<name>` identifier is removed, only digits, operators,
/// parentheses, `.`, `,`, `%`, `e` and spaces may remain.
pub fn evaluate_arithmetic(expr: &str) -> Result<f64, ParseError> {
    let stripped = NAMESPACE.replace_all(expr, "");
    if let Some(bad) = stripped.chars().find(|c| !ALLOWED_CHARS.contains(*c)) {
        return Err(ParseError::DisallowedCharacter(bad));
    }

    let tokens = tokenize(expr)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expression()?;
    if let Some(extra) = parser.peek() {
        return Err(ParseError::UnexpectedToken(format!("{:?}", extra)));
    }
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ParseError::NonFinite)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Op(char),
    Pow,
    LParen,
    RParen,
    Ident(String),
}

fn tokenize(expr: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // Exponent suffix only when digits follow: 1e5, 2.5e-3.
                if i < chars.len() && chars[i] == 'e' {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        while j < chars.len() && chars[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| ParseError::UnexpectedToken(literal.clone()))?;
                tokens.push(Token::Num(value));
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Pow);
                i += 2;
            }
            '+' | '-' | '*' | '/' | '%' => {
                tokens.push(Token::Op(c));
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
            'M' if chars[i..].starts_with(&['M', 'a', 't', 'h', '.']) => {
                i += 5;
                let start = i;
                while i < chars.len() && chars[i].is_ascii_alphabetic() {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(ParseError::UnexpectedToken(other.to_string())),
        }
    }

    Ok(tokens)
}

/// Recursive descent over
/// `expr := term (('+'|'-') term)*`,
/// `term := unary (('*'|'/'|'%') unary)*`,
/// `unary := ('+'|'-')* power`,
/// `power := primary ('**' unary)?`.
struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn descend(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ParseError::UnexpectedToken("nesting too deep".to_string()));
        }
        Ok(())
    }

    fn expression(&mut self) -> Result<f64, ParseError> {
        self.descend()?;

        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            let op = *op;
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }

        self.depth -= 1;
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, ParseError> {
        let mut value = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek() {
            let op = *op;
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                '*' => value * rhs,
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    /// Sign runs are folded iteratively.
    fn unary(&mut self) -> Result<f64, ParseError> {
        let mut negative = false;
        while let Some(Token::Op(sign @ ('+' | '-'))) = self.peek() {
            if *sign == '-' {
                negative = !negative;
            }
            self.pos += 1;
        }
        let value = self.power()?;
        Ok(if negative { -value } else { value })
    }

    fn power(&mut self) -> Result<f64, ParseError> {
        let base = self.primary()?;
        if let Some(Token::Pow) = self.peek() {
            self.pos += 1;
            self.descend()?;
            let exponent = self.unary()?;
            self.depth -= 1;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64, ParseError> {
        match self.advance().cloned() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expression()?;
                self.expect_rparen()?;
                Ok(value)
            }
            Some(Token::Ident(name)) => match name.as_str() {
                "PI" => Ok(std::f64::consts::PI),
                "E" => Ok(std::f64::consts::E),
                _ => {
                    let function = math_function(&name)?;
                    match self.advance() {
                        Some(Token::LParen) => {}
                        Some(other) => {
                            return Err(ParseError::UnexpectedToken(format!("{:?}", other)));
                        }
                        None => return Err(ParseError::UnexpectedEnd),
                    }
                    let arg = self.expression()?;
                    self.expect_rparen()?;
                    Ok(function(arg))
                }
            },
            Some(other) => Err(ParseError::UnexpectedToken(format!("{:?}", other))),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    fn expect_rparen(&mut self) -> Result<(), ParseError> {
        match self.advance() {
            Some(Token::RParen) => Ok(()),
            Some(other) => Err(ParseError::UnexpectedToken(format!("{:?}", other))),
            None => Err(ParseError::UnexpectedEnd),
        }
    }
}

fn math_function(name: &str) -> Result<fn(f64) -> f64, ParseError> {
    Ok(match name {
        "sqrt" => f64::sqrt,
        "sin" => f64::sin,
        "cos" => f64::cos,
        "tan" => f64::tan,
        "ln" => f64::ln,
        "log" => f64::log10,
        "exp" => f64::exp,
        "abs" => f64::abs,
        _ => return Err(ParseError::UnknownFunction(name.to_string())),
    })
}

/// Outcome of comparing two expressions numerically.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Equivalence {
    pub equal: bool,
    pub value_a: Option<f64>,
    pub value_b: Option<f64>,
}

/// `equivalent_with` at the default tolerance.
pub fn equivalent(a: &str, b: &str) -> Equivalence {
    equivalent_with(a, b, EQUIVALENCE_TOLERANCE)
}

/// Compares two expressions by value.
///
/// Both below `tolerance` in magnitude counts as equal. Otherwise the test is
/// relative (`|a-b|/|a| < tolerance`) when `|a| > 1` and absolute
/// (`|a-b| < tolerance`) when not. Both comparisons are strict.
pub fn equivalent_with(a: &str, b: &str, tolerance: f64) -> Equivalence {
    let value_a = evaluate(a).ok();
    let value_b = evaluate(b).ok();

    let equal = match (value_a, value_b) {
        (Some(x), Some(y)) => values_within(x, y, tolerance),
        _ => false,
    };

    Equivalence {
        equal,
        value_a,
        value_b,
    }
}

fn values_within(a: f64, b: f64, tolerance: f64) -> bool {
    if a.abs() < tolerance && b.abs() < tolerance {
        return true;
    }
    let diff = (a - b).abs();
    if a.abs() > 1.0 {
        diff / a.abs() < tolerance
    } else {
        diff < tolerance
    }
}
