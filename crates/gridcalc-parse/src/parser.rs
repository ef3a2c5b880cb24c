//! Recursive-descent / precedence-climbing parser over the token stream
//! produced by [`crate::tokenizer`], building the AST described in
//! `spec.md` §3 and §4.2.

use std::fmt;

use gridcalc_common::{Address, ErrorCode, Range};

use crate::tokenizer::{self, Token, TokenizerError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    Tokenizer(TokenizerError),
    UnexpectedEnd,
    UnexpectedToken { found: Token, expected: &'static str },
    BadReference(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Tokenizer(e) => write!(f, "{e}"),
            ParseError::UnexpectedEnd => write!(f, "unexpected end of formula"),
            ParseError::UnexpectedToken { found, expected } => {
                write!(f, "expected {expected}, found {found:?}")
            }
            ParseError::BadReference(text) => write!(f, "invalid reference '{text}'"),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<TokenizerError> for ParseError {
    fn from(e: TokenizerError) -> Self {
        ParseError::Tokenizer(e)
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(ErrorCode),
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A structured-reference selector (`Table[#Totals]`, `Table[Col]`, ...).
/// Minimal subset of what `spec.md` §4.5 calls out explicitly.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredItem {
    All,
    Data,
    Headers,
    Totals,
    ThisRow,
    Column(String),
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    Literal(Literal),
    Reference { sheet: Option<String>, address: Address },
    RangeRef(Range),
    /// `Sheet1:Sheet3!A1` -- a 3D range spanning every sheet in `[start, end]`.
    ThreeDRange { start_sheet: String, end_sheet: String, address: Address },
    Array(Vec<Vec<Literal>>),
    Unary { negative: bool, expr: Box<Ast> },
    Percent(Box<Ast>),
    Binary { op: ArithOp, left: Box<Ast>, right: Box<Ast> },
    Compare { op: CompareOp, left: Box<Ast>, right: Box<Ast> },
    Concat { left: Box<Ast>, right: Box<Ast> },
    Function { name: String, args: Vec<Ast> },
    /// A defined name or table name used bare (not `Table[col]`), expanded
    /// at evaluation time (`spec.md` §4.6 "Defined names").
    Name(String),
    StructuredRef { table: String, item: StructuredItem },
}

pub fn parse(input: &str) -> Result<Ast, ParseError> {
    let normalized = input.trim().strip_prefix('=').unwrap_or(input.trim());
    let tokens = tokenizer::tokenize(normalized)?;
    let mut parser = Parser { tokens, pos: 0 };
    let ast = parser.parse_compare()?;
    if parser.pos != parser.tokens.len() {
        return Err(ParseError::UnexpectedToken {
            found: parser.tokens[parser.pos].clone(),
            expected: "end of formula",
        });
    }
    Ok(ast)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
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

    fn expect(&mut self, token: &Token, expected: &'static str) -> Result<(), ParseError> {
        match self.advance() {
            Some(t) if t == *token => Ok(()),
            Some(found) => Err(ParseError::UnexpectedToken { found, expected }),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    // Precedence (low -> high): compare < concat < additive < mul < pow < unary < percent.
    fn parse_compare(&mut self) -> Result<Ast, ParseError> {
        let mut left = self.parse_concat()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => CompareOp::Eq,
                Some(Token::Ne) => CompareOp::Ne,
                Some(Token::Lt) => CompareOp::Lt,
                Some(Token::Le) => CompareOp::Le,
                Some(Token::Gt) => CompareOp::Gt,
                Some(Token::Ge) => CompareOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.parse_concat()?;
            left = Ast::Compare { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_concat(&mut self) -> Result<Ast, ParseError> {
        let mut left = self.parse_additive()?;
        while matches!(self.peek(), Some(Token::Ampersand)) {
            self.advance();
            let right = self.parse_additive()?;
            left = Ast::Concat { left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Ast, ParseError> {
        let mut left = self.parse_mul()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithOp::Add,
                Some(Token::Minus) => ArithOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_mul()?;
            left = Ast::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_mul(&mut self) -> Result<Ast, ParseError> {
        let mut left = self.parse_pow()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => ArithOp::Mul,
                Some(Token::Slash) => ArithOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_pow()?;
            left = Ast::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    // `^` is right-associative; unary `-`/`+` binds tighter than `^` on its
    // base operand (`spec.md` §4.1 precedence table: `... < ^ < unary < %`),
    // so `-2^2` parses as `(-2)^2 == 4`, not `-(2^2)`.
    fn parse_pow(&mut self) -> Result<Ast, ParseError> {
        let base = self.parse_unary()?;
        if matches!(self.peek(), Some(Token::Caret)) {
            self.advance();
            let exponent = self.parse_pow()?;
            Ok(Ast::Binary { op: ArithOp::Pow, left: Box::new(base), right: Box::new(exponent) })
        } else {
            Ok(base)
        }
    }

    fn parse_unary(&mut self) -> Result<Ast, ParseError> {
        match self.peek() {
            Some(Token::Plus) => {
                self.advance();
                self.parse_unary()
            }
            Some(Token::Minus) => {
                self.advance();
                let expr = self.parse_unary()?;
                Ok(Ast::Unary { negative: true, expr: Box::new(expr) })
            }
            _ => self.parse_percent(),
        }
    }

    fn parse_percent(&mut self) -> Result<Ast, ParseError> {
        let mut expr = self.parse_primary()?;
        while matches!(self.peek(), Some(Token::Percent)) {
            self.advance();
            expr = Ast::Percent(Box::new(expr));
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Ast, ParseError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Ast::Literal(Literal::Number(n))),
            Some(Token::Text(s)) => Ok(Ast::Literal(Literal::Text(s))),
            Some(Token::Boolean(b)) => Ok(Ast::Literal(Literal::Boolean(b))),
            Some(Token::Error(e)) => Ok(Ast::Literal(Literal::Error(e))),
            Some(Token::LParen) => {
                let inner = self.parse_compare()?;
                self.expect(&Token::RParen, ")")?;
                Ok(inner)
            }
            Some(Token::LBrace) => self.parse_array(),
            Some(Token::Ref(text)) => self.parse_reference_token(text),
            Some(Token::Ident(name)) => self.parse_ident(name),
            Some(found) => Err(ParseError::UnexpectedToken { found, expected: "expression" }),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    fn parse_ident(&mut self, name: String) -> Result<Ast, ParseError> {
        if matches!(self.peek(), Some(Token::LParen)) {
            self.advance();
            let args = self.parse_args()?;
            self.expect(&Token::RParen, ")")?;
            return Ok(Ast::Function { name, args });
        }
        if matches!(self.peek(), Some(Token::LBracket)) {
            return self.parse_structured_ref(name);
        }
        // A bare `Ident` followed by `:` and another reference-shaped token
        // is the first sheet of a 3D range (`Sheet1:Sheet3!A1`); otherwise
        // it's a defined name, resolved at evaluation time.
        if matches!(self.peek(), Some(Token::Colon)) {
            if let Some(Token::Ref(text)) = self.tokens.get(self.pos + 1).cloned() {
                if let (Some(end_sheet), body) = gridcalc_common::split_sheet_qualifier(&text) {
                    let address = Address::parse(body).map_err(|_| ParseError::BadReference(text.clone()))?;
                    self.advance();
                    self.advance();
                    return Ok(Ast::ThreeDRange { start_sheet: name, end_sheet, address });
                }
            }
        }
        Ok(Ast::Name(name))
    }

    fn parse_structured_ref(&mut self, table: String) -> Result<Ast, ParseError> {
        self.expect(&Token::LBracket, "[")?;
        let item = match self.advance() {
            Some(Token::Ident(text)) => classify_structured_item(&text),
            Some(found) => return Err(ParseError::UnexpectedToken { found, expected: "table selector" }),
            None => return Err(ParseError::UnexpectedEnd),
        };
        self.expect(&Token::RBracket, "]")?;
        Ok(Ast::StructuredRef { table, item })
    }

    fn parse_reference_token(&mut self, text: String) -> Result<Ast, ParseError> {
        let (sheet, body) = gridcalc_common::split_sheet_qualifier(&text);
        if body.contains(':') {
            let range = Range::parse(body, sheet).map_err(|_| ParseError::BadReference(text))?;
            Ok(Ast::RangeRef(range))
        } else {
            let address = Address::parse(body).map_err(|_| ParseError::BadReference(text))?;
            Ok(Ast::Reference { sheet, address })
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Ast>, ParseError> {
        let mut args = Vec::new();
        if matches!(self.peek(), Some(Token::RParen)) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_compare()?);
            match self.peek() {
                Some(Token::Comma) => {
                    self.advance();
                }
                _ => break,
            }
        }
        Ok(args)
    }

    fn parse_array(&mut self) -> Result<Ast, ParseError> {
        let mut rows = vec![Vec::new()];
        loop {
            let lit = match self.advance() {
                Some(Token::Number(n)) => Literal::Number(n),
                Some(Token::Text(s)) => Literal::Text(s),
                Some(Token::Boolean(b)) => Literal::Boolean(b),
                Some(Token::Error(e)) => Literal::Error(e),
                Some(Token::Minus) => match self.advance() {
                    Some(Token::Number(n)) => Literal::Number(-n),
                    Some(found) => return Err(ParseError::UnexpectedToken { found, expected: "array literal" }),
                    None => return Err(ParseError::UnexpectedEnd),
                },
                Some(found) => return Err(ParseError::UnexpectedToken { found, expected: "array literal" }),
                None => return Err(ParseError::UnexpectedEnd),
            };
            rows.last_mut().unwrap().push(lit);
            match self.peek() {
                Some(Token::Comma) => {
                    self.advance();
                }
                Some(Token::Semicolon) => {
                    self.advance();
                    rows.push(Vec::new());
                }
                Some(Token::RBrace) => {
                    self.advance();
                    break;
                }
                Some(found) => return Err(ParseError::UnexpectedToken { found: found.clone(), expected: "',' ';' or '}'" }),
                None => return Err(ParseError::UnexpectedEnd),
            }
        }
        Ok(Ast::Array(rows))
    }
}

fn classify_structured_item(text: &str) -> StructuredItem {
    match text.to_ascii_uppercase().as_str() {
        "#ALL" => StructuredItem::All,
        "#DATA" => StructuredItem::Data,
        "#HEADERS" => StructuredItem::Headers,
        "#TOTALS" => StructuredItem::Totals,
        "#THIS ROW" | "@" => StructuredItem::ThisRow,
        _ => StructuredItem::Column(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Ast {
        Ast::Literal(Literal::Number(n))
    }

    #[test]
    fn parses_arithmetic_precedence() {
        let ast = parse("1+2*3").unwrap();
        assert_eq!(
            ast,
            Ast::Binary {
                op: ArithOp::Add,
                left: Box::new(num(1.0)),
                right: Box::new(Ast::Binary { op: ArithOp::Mul, left: Box::new(num(2.0)), right: Box::new(num(3.0)) }),
            }
        );
    }

    #[test]
    fn power_is_right_associative() {
        let ast = parse("2^3^2").unwrap();
        assert_eq!(
            ast,
            Ast::Binary {
                op: ArithOp::Pow,
                left: Box::new(num(2.0)),
                right: Box::new(Ast::Binary { op: ArithOp::Pow, left: Box::new(num(3.0)), right: Box::new(num(2.0)) }),
            }
        );
    }

    #[test]
    fn unary_minus_binds_tighter_than_power() {
        // `spec.md` §4.1: `... < ^ < unary < %`, so `-2^2 == (-2)^2 == 4`.
        let ast = parse("-2^2").unwrap();
        assert_eq!(
            ast,
            Ast::Binary {
                op: ArithOp::Pow,
                left: Box::new(Ast::Unary { negative: true, expr: Box::new(num(2.0)) }),
                right: Box::new(num(2.0)),
            }
        );
    }

    #[test]
    fn parses_function_call() {
        let ast = parse("SUM(A1,B1:B2)").unwrap();
        match ast {
            Ast::Function { name, args } => {
                assert_eq!(name, "SUM");
                assert_eq!(args.len(), 2);
                assert!(matches!(args[0], Ast::Reference { .. }));
                assert!(matches!(args[1], Ast::RangeRef(_)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_sheet_qualified_reference() {
        let ast = parse("Other!A1").unwrap();
        assert_eq!(ast, Ast::Reference { sheet: Some("Other".into()), address: Address::parse("A1").unwrap() });
    }

    #[test]
    fn parses_three_d_range() {
        let ast = parse("SUM(Sheet1:Sheet3!A1)").unwrap();
        match ast {
            Ast::Function { args, .. } => match &args[0] {
                Ast::ThreeDRange { start_sheet, end_sheet, address } => {
                    assert_eq!(start_sheet, "Sheet1");
                    assert_eq!(end_sheet, "Sheet3");
                    assert_eq!(*address, Address::parse("A1").unwrap());
                }
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_array_literal() {
        let ast = parse("{1,2;3,4}").unwrap();
        assert_eq!(
            ast,
            Ast::Array(vec![
                vec![Literal::Number(1.0), Literal::Number(2.0)],
                vec![Literal::Number(3.0), Literal::Number(4.0)],
            ])
        );
    }

    #[test]
    fn parses_comparison_and_concat() {
        let ast = parse("A1&\"x\"=B1").unwrap();
        assert!(matches!(ast, Ast::Compare { op: CompareOp::Eq, .. }));
    }

    #[test]
    fn parses_structured_reference() {
        let ast = parse("SUM(Table1[Amount])").unwrap();
        match ast {
            Ast::Function { args, .. } => {
                assert_eq!(args[0], Ast::StructuredRef { table: "Table1".into(), item: StructuredItem::Column("Amount".into()) });
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_structured_reference_totals_item() {
        let ast = parse("Table1[#Totals]").unwrap();
        assert_eq!(ast, Ast::StructuredRef { table: "Table1".into(), item: StructuredItem::Totals });
    }

    #[test]
    fn bare_name_is_defined_name() {
        let ast = parse("MyRange").unwrap();
        assert_eq!(ast, Ast::Name("MyRange".into()));
    }

    #[test]
    fn unknown_function_still_parses() {
        // Unknown names are a `#NAME?` at evaluation, not a parse failure.
        let ast = parse("_xlfn.FROBNICATE(1)").unwrap();
        assert!(matches!(ast, Ast::Function { .. }));
    }
}
