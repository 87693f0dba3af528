//! Sandboxed band expression evaluator
//!
//! Arbitrary band algebra over the physical bands of a raster. Every band is
//! exposed as a variable `b1..bN` (1-based, physical order); the only other
//! names in scope are a fixed set of elementwise math functions. Anything else
//! is rejected while parsing, before a single pixel is read.
//!
//! Example expressions:
//! - `"(b5 - b4) / (b5 + b4)"`
//! - `"where(b4 > 0, b5 / b4, 0)"`
//! - `"clip(np.sqrt(b1 * b2), 0, 255)"`
//!
//! Grammar, lowest to highest precedence:
//!
//! ```text
//! or         = and ('|' and)*
//! and        = comparison ('&' comparison)*
//! comparison = additive (('<' | '<=' | '>' | '>=' | '==' | '!=') additive)?
//! additive   = term (('+' | '-') term)*
//! term       = unary (('*' | '/' | '%') unary)*
//! unary      = ('-' | '+') unary | power
//! power      = primary (('**' | '^') unary)?
//! primary    = number | band | call | '(' or ')'
//! ```
//!
//! Comparisons and logical operators yield 1.0 or 0.0; any non-zero value
//! counts as true. Division adds [`EPSILON`] to the divisor, the same as the
//! ratio indices, so `(b5 - b4) / (b5 + b4)` reproduces NDVI bit for bit.

use std::fmt;

use bandcalc_core::{BandArray, Error, Result};
use ndarray::Array2;

use super::indices::EPSILON;

/// Nesting limit for parentheses, unary signs and exponents
const MAX_DEPTH: usize = 256;

/// A token in the expression source
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f32),
    Ident(String),
    Sym(&'static str),
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Ident(s) => f.write_str(s),
            Token::Sym(s) => f.write_str(s),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnaryOp {
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    fn from_sym(sym: &str) -> Option<Self> {
        Some(match sym {
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "%" => Self::Rem,
            "**" | "^" => Self::Pow,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "==" => Self::Eq,
            "!=" => Self::Ne,
            "&" => Self::And,
            "|" => Self::Or,
            _ => return None,
        })
    }

    fn apply(self, l: f32, r: f32) -> f32 {
        match self {
            Self::Add => l + r,
            Self::Sub => l - r,
            Self::Mul => l * r,
            Self::Div => l / (r + EPSILON),
            // Result takes the sign of the divisor
            Self::Rem => l - r * (l / r).floor(),
            Self::Pow => l.powf(r),
            Self::Lt => truth(l < r),
            Self::Le => truth(l <= r),
            Self::Gt => truth(l > r),
            Self::Ge => truth(l >= r),
            Self::Eq => truth(l == r),
            Self::Ne => truth(l != r),
            Self::And => truth(l != 0.0 && r != 0.0),
            Self::Or => truth(l != 0.0 || r != 0.0),
        }
    }
}

fn truth(b: bool) -> f32 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Whitelisted elementwise functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sqrt,
    Abs,
    Exp,
    Log,
    Log10,
    Sin,
    Cos,
    Tan,
    Floor,
    Ceil,
    Round,
    Min,
    Max,
    Pow,
    Clip,
    Where,
}

impl Function {
    /// Resolve a function name; a leading `np.` is accepted and ignored
    pub fn lookup(name: &str) -> Option<Self> {
        let bare = name.strip_prefix("np.").unwrap_or(name);
        Some(match bare {
            "sqrt" => Self::Sqrt,
            "abs" | "absolute" => Self::Abs,
            "exp" => Self::Exp,
            "log" => Self::Log,
            "log10" => Self::Log10,
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "tan" => Self::Tan,
            "floor" => Self::Floor,
            "ceil" => Self::Ceil,
            "round" => Self::Round,
            "min" | "minimum" => Self::Min,
            "max" | "maximum" => Self::Max,
            "pow" | "power" => Self::Pow,
            "clip" => Self::Clip,
            "where" => Self::Where,
            _ => return None,
        })
    }

    pub fn arity(self) -> usize {
        match self {
            Self::Min | Self::Max | Self::Pow => 2,
            Self::Clip | Self::Where => 3,
            _ => 1,
        }
    }

    fn apply(self, args: &[f32]) -> f32 {
        match self {
            Self::Sqrt => args[0].sqrt(),
            Self::Abs => args[0].abs(),
            Self::Exp => args[0].exp(),
            Self::Log => args[0].ln(),
            Self::Log10 => args[0].log10(),
            Self::Sin => args[0].sin(),
            Self::Cos => args[0].cos(),
            Self::Tan => args[0].tan(),
            Self::Floor => args[0].floor(),
            Self::Ceil => args[0].ceil(),
            Self::Round => args[0].round_ties_even(),
            Self::Min => args[0].min(args[1]),
            Self::Max => args[0].max(args[1]),
            Self::Pow => args[0].powf(args[1]),
            Self::Clip => args[0].max(args[1]).min(args[2]),
            Self::Where => {
                if args[0] != 0.0 {
                    args[1]
                } else {
                    args[2]
                }
            }
        }
    }
}

/// A node in the expression tree
#[derive(Debug, Clone)]
enum Expr {
    Num(f32),
    /// Position in [`Expression::bands`]
    Slot(usize),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
}

impl Expr {
    fn eval(&self, px: &[f32], scratch: &mut Vec<f32>) -> f32 {
        match self {
            Expr::Num(n) => *n,
            Expr::Slot(i) => px[*i],
            Expr::Unary(UnaryOp::Neg, inner) => -inner.eval(px, scratch),
            Expr::Binary(op, l, r) => {
                let l = l.eval(px, scratch);
                let r = r.eval(px, scratch);
                op.apply(l, r)
            }
            Expr::Call(func, args) => {
                let base = scratch.len();
                for arg in args {
                    let v = arg.eval(px, scratch);
                    scratch.push(v);
                }
                let out = func.apply(&scratch[base..]);
                scratch.truncate(base);
                out
            }
        }
    }
}

fn formula_err(msg: impl Into<String>) -> Error {
    Error::Formula(msg.into())
}

/// Tokenize an expression string
fn tokenize(src: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => { tokens.push(Token::LParen); i += 1; }
            ')' => { tokens.push(Token::RParen); i += 1; }
            ',' => { tokens.push(Token::Comma); i += 1; }
            '*' if next == Some('*') => { tokens.push(Token::Sym("**")); i += 2; }
            '<' if next == Some('=') => { tokens.push(Token::Sym("<=")); i += 2; }
            '>' if next == Some('=') => { tokens.push(Token::Sym(">=")); i += 2; }
            '=' if next == Some('=') => { tokens.push(Token::Sym("==")); i += 2; }
            '!' if next == Some('=') => { tokens.push(Token::Sym("!=")); i += 2; }
            '+' | '-' | '*' | '/' | '%' | '^' | '<' | '>' | '&' | '|' => {
                let sym = match c {
                    '+' => "+",
                    '-' => "-",
                    '*' => "*",
                    '/' => "/",
                    '%' => "%",
                    '^' => "^",
                    '<' => "<",
                    '>' => ">",
                    '&' => "&",
                    _ => "|",
                };
                tokens.push(Token::Sym(sym));
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
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
                let num_str: String = chars[start..i].iter().collect();
                let num = num_str
                    .parse::<f32>()
                    .map_err(|_| formula_err(format!("invalid number '{}'", num_str)))?;
                tokens.push(Token::Number(num));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            c => {
                return Err(formula_err(format!(
                    "unexpected character '{}' at position {}",
                    c, i
                )));
            }
        }
    }

    Ok(tokens)
}

/// Parse `b<N>` into the 1-based band number
fn band_number(name: &str) -> Option<usize> {
    let digits = name.strip_prefix('b')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Recursive descent parser producing an [`Expr`] tree
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    band_count: usize,
    /// 1-based band numbers in first-seen order; index is the slot
    bands: Vec<usize>,
    /// Depth of the tree under construction, bounded by [`MAX_DEPTH`]
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>, band_count: usize) -> Self {
        Self { tokens, pos: 0, band_count, bands: Vec::new(), depth: 0 }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(formula_err("expression nested too deeply"));
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    /// Consume a binary operator token if it is one of `syms`
    fn take_op(&mut self, syms: &[&str]) -> Option<BinaryOp> {
        match self.peek() {
            Some(Token::Sym(s)) if syms.contains(s) => {
                let op = BinaryOp::from_sym(s);
                self.pos += 1;
                op
            }
            _ => None,
        }
    }

    fn left_assoc(
        &mut self,
        syms: &[&str],
        next: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut left = next(self)?;
        let mut chain = 0;
        // Each operator deepens the left-leaning tree by one level
        while let Some(op) = self.take_op(syms) {
            self.enter()?;
            chain += 1;
            let right = next(self)?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth -= chain;
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expr> {
        self.left_assoc(&["|"], Self::parse_and)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        self.left_assoc(&["&"], Self::parse_comparison)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_additive()?;
        match self.take_op(&["<", "<=", ">", ">=", "==", "!="]) {
            Some(op) => {
                let right = self.parse_additive()?;
                Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
            }
            None => Ok(left),
        }
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        self.left_assoc(&["+", "-"], Self::parse_term)
    }

    fn parse_term(&mut self) -> Result<Expr> {
        self.left_assoc(&["*", "/", "%"], Self::parse_unary)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        self.enter()?;
        let expr = self.parse_signed()?;
        self.depth -= 1;
        Ok(expr)
    }

    fn parse_signed(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Token::Sym("-")) => {
                self.advance();
                let inner = self.parse_unary()?;
                Ok(Expr::Unary(UnaryOp::Neg, Box::new(inner)))
            }
            Some(Token::Sym("+")) => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    /// Right-associative: `2 ** 3 ** 2 == 2 ** 9`, and `-2 ** 2 == -4`
    fn parse_power(&mut self) -> Result<Expr> {
        let base = self.parse_primary()?;
        match self.take_op(&["**", "^"]) {
            Some(op) => {
                let exp = self.parse_unary()?;
                Ok(Expr::Binary(op, Box::new(base), Box::new(exp)))
            }
            None => Ok(base),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Num(n)),
            Some(Token::LParen) => {
                let expr = self.parse_or()?;
                self.expect_rparen()?;
                Ok(expr)
            }
            Some(Token::Ident(name)) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    self.advance();
                    self.parse_call(&name)
                } else {
                    self.resolve_band(&name)
                }
            }
            Some(tok) => Err(formula_err(format!("unexpected token '{}'", tok))),
            None => Err(formula_err("unexpected end of expression")),
        }
    }

    fn parse_call(&mut self, name: &str) -> Result<Expr> {
        let func = Function::lookup(name)
            .ok_or_else(|| formula_err(format!("unknown function '{}'", name)))?;

        let mut args = Vec::new();
        if !matches!(self.peek(), Some(Token::RParen)) {
            loop {
                args.push(self.parse_or()?);
                if matches!(self.peek(), Some(Token::Comma)) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect_rparen()?;

        if args.len() != func.arity() {
            return Err(formula_err(format!(
                "function '{}' expects {} argument(s), got {}",
                name,
                func.arity(),
                args.len()
            )));
        }
        Ok(Expr::Call(func, args))
    }

    fn resolve_band(&mut self, name: &str) -> Result<Expr> {
        let number = band_number(name)
            .filter(|&n| n >= 1 && n <= self.band_count)
            .ok_or_else(|| {
                formula_err(format!(
                    "name '{}' is not defined (available: b1..b{})",
                    name, self.band_count
                ))
            })?;

        let slot = match self.bands.iter().position(|&b| b == number) {
            Some(slot) => slot,
            None => {
                self.bands.push(number);
                self.bands.len() - 1
            }
        };
        Ok(Expr::Slot(slot))
    }

    fn expect_rparen(&mut self) -> Result<()> {
        match self.advance() {
            Some(Token::RParen) => Ok(()),
            Some(tok) => Err(formula_err(format!("expected ')', found '{}'", tok))),
            None => Err(formula_err("expected ')' before end of expression")),
        }
    }
}

/// A parsed, validated band expression
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    root: Expr,
    bands: Vec<usize>,
}

impl Expression {
    /// Parse `src` for a raster with `band_count` bands.
    ///
    /// Unknown names, unknown functions, wrong arity and malformed syntax are
    /// all reported as [`Error::Formula`] here, so evaluation never fails on
    /// account of the expression text.
    pub fn parse(src: &str, band_count: usize) -> Result<Self> {
        let tokens = tokenize(src)?;
        if tokens.is_empty() {
            return Err(formula_err("empty expression"));
        }

        let mut parser = Parser::new(tokens, band_count);
        let root = parser.parse_or()?;
        if let Some(tok) = parser.peek() {
            return Err(formula_err(format!("unexpected token '{}'", tok)));
        }

        Ok(Self {
            source: src.to_string(),
            root,
            bands: parser.bands,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// 1-based band numbers referenced, in first-seen order
    pub fn bands(&self) -> &[usize] {
        &self.bands
    }

    /// Evaluate per pixel. `bands[i]` holds the data of `self.bands()[i]`.
    pub fn evaluate(&self, bands: &[BandArray]) -> Result<BandArray> {
        if bands.len() != self.bands.len() {
            return Err(formula_err(format!(
                "expected {} band array(s), got {}",
                self.bands.len(),
                bands.len()
            )));
        }
        let first = bands.first().ok_or(Error::EmptyResult)?;
        let shape = first.dim();
        if let Some(bad) = bands.iter().find(|b| b.dim() != shape) {
            return Err(Error::InvalidDimensions {
                width: bad.ncols(),
                height: bad.nrows(),
            });
        }

        let mut px = vec![0.0f32; bands.len()];
        let mut scratch = Vec::new();
        Ok(Array2::from_shape_fn(shape, |idx| {
            for (slot, band) in px.iter_mut().zip(bands) {
                *slot = band[idx];
            }
            self.root.eval(&px, &mut scratch)
        }))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn scalar(src: &str) -> f32 {
        let expr = Expression::parse(src, 1).unwrap();
        // Constant expressions still need a grid to evaluate over
        let mut with_band = expr.clone();
        if with_band.bands.is_empty() {
            with_band.bands.push(1);
        }
        with_band.evaluate(&[array![[0.0f32]]]).unwrap()[[0, 0]]
    }

    fn formula_message(src: &str, band_count: usize) -> String {
        match Expression::parse(src, band_count).unwrap_err() {
            Error::Formula(msg) => msg,
            other => panic!("expected formula error, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        assert_relative_eq!(scalar("1 + 2 * 3"), 7.0);
        assert_relative_eq!(scalar("(1 + 2) * 3"), 9.0);
        assert_relative_eq!(scalar("2 ** 3 ** 2"), 512.0);
        assert_relative_eq!(scalar("-2 ** 2"), -4.0);
        assert_relative_eq!(scalar("2 ** -1"), 0.5);
        assert_relative_eq!(scalar("10 - 4 - 3"), 3.0);
    }

    #[test]
    fn test_numbers_with_exponent() {
        assert_relative_eq!(scalar("1e3 + 2.5E-1"), 1000.25);
        assert_relative_eq!(scalar(".5"), 0.5);
    }

    #[test]
    fn test_modulo_sign_follows_divisor() {
        assert_relative_eq!(scalar("7 % 3"), 1.0);
        assert_relative_eq!(scalar("-7 % 3"), 2.0);
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(scalar("3 > 2"), 1.0);
        assert_eq!(scalar("3 <= 2"), 0.0);
        assert_eq!(scalar("(1 > 0) & (2 > 3)"), 0.0);
        assert_eq!(scalar("(1 > 0) | (2 > 3)"), 1.0);
        assert_eq!(scalar("2 == 2"), 1.0);
        assert_eq!(scalar("2 != 2"), 0.0);
    }

    #[test]
    fn test_functions() {
        assert_relative_eq!(scalar("sqrt(16)"), 4.0);
        assert_relative_eq!(scalar("np.abs(-3)"), 3.0);
        assert_relative_eq!(scalar("clip(5, 0, 1)"), 1.0);
        assert_relative_eq!(scalar("where(0, 1, 2)"), 2.0);
        assert_relative_eq!(scalar("maximum(1, 4)"), 4.0);
        assert_relative_eq!(scalar("round(2.5)"), 2.0);
        assert_relative_eq!(scalar("log10(1000)"), 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_band_slots_first_seen_order() {
        let expr = Expression::parse("(b5 - b4) / (b5 + b4)", 5).unwrap();
        assert_eq!(expr.bands(), &[5, 4]);

        let nir = array![[800.0f32, 300.0]];
        let red = array![[200.0f32, 300.0]];
        let out = expr.evaluate(&[nir, red]).unwrap();
        assert_relative_eq!(out[[0, 0]], 0.6);
        assert_eq!(out[[0, 1]], 0.0);
    }

    #[test]
    fn test_where_over_bands() {
        let expr = Expression::parse("where(b1 > 0, b2 / b1, -1)", 2).unwrap();
        let out = expr
            .evaluate(&[array![[2.0f32, 0.0]], array![[6.0f32, 5.0]]])
            .unwrap();
        assert_relative_eq!(out[[0, 0]], 3.0, epsilon = 1e-5);
        assert_eq!(out[[0, 1]], -1.0);
    }

    #[test]
    fn test_division_adds_epsilon() {
        let expr = Expression::parse("b1 / b2", 2).unwrap();
        let out = expr
            .evaluate(&[array![[1.0f32, 0.3]], array![[0.0f32, 0.4]]])
            .unwrap();
        assert_eq!(out[[0, 0]], 1.0 / EPSILON);
        assert_eq!(out[[0, 1]], 0.3f32 / (0.4f32 + EPSILON));
    }

    #[test]
    fn test_deep_nesting_rejected() {
        let parens = format!("{}b1{}", "(".repeat(32_000), ")".repeat(32_000));
        assert!(formula_message(&parens, 1).contains("nested too deeply"));

        let signs = format!("{}b1", "-".repeat(32_000));
        assert!(formula_message(&signs, 1).contains("nested too deeply"));

        let sum = vec!["b1"; 5_000].join(" + ");
        assert!(formula_message(&sum, 1).contains("nested too deeply"));

        let calls = format!("{}b1{}", "sqrt(".repeat(10_000), ")".repeat(10_000));
        assert!(formula_message(&calls, 1).contains("nested too deeply"));
    }

    #[test]
    fn test_moderate_nesting_accepted() {
        let parens = format!("{}b1{}", "(".repeat(100), ")".repeat(100));
        let expr = Expression::parse(&parens, 1).unwrap();
        assert_eq!(expr.evaluate(&[array![[7.0f32]]]).unwrap()[[0, 0]], 7.0);

        let sum = vec!["b1"; 100].join(" + ");
        let expr = Expression::parse(&sum, 1).unwrap();
        assert_eq!(expr.evaluate(&[array![[1.0f32]]]).unwrap()[[0, 0]], 100.0);
    }

    #[test]
    fn test_unknown_band_names_variable() {
        let msg = formula_message("b6 + b1", 5);
        assert!(msg.contains("b6"), "{}", msg);
        assert!(msg.contains("b5"), "{}", msg);
        assert!(formula_message("b0", 5).contains("b0"));
    }

    #[test]
    fn test_host_names_rejected() {
        for src in ["__import__('os')", "open(b1)", "os.system", "x + 1", "B1"] {
            assert!(Expression::parse(src, 3).is_err(), "accepted {}", src);
        }
        assert!(formula_message("eval(b1)", 1).contains("eval"));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(formula_message("", 1).contains("empty"));
        assert!(formula_message("(b1 + 2", 1).contains(")"));
        assert!(formula_message("b1 +", 1).contains("end"));
        assert!(formula_message("b1 b1", 1).contains("b1"));
        assert!(formula_message("b1 @ 2", 1).contains("@"));
        assert!(formula_message("sqrt(b1, 2)", 1).contains("expects 1"));
        assert!(formula_message("clip(b1)", 1).contains("got 1"));
    }

    #[test]
    fn test_evaluate_checks_inputs() {
        let expr = Expression::parse("b1 + b2", 2).unwrap();
        assert!(expr.evaluate(&[array![[1.0f32]]]).is_err());
        let mismatched = expr.evaluate(&[array![[1.0f32]], array![[1.0f32, 2.0]]]);
        assert!(matches!(mismatched, Err(Error::InvalidDimensions { .. })));
    }
}
