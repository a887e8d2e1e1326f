//! Calculator for spoken arithmetic ("what is 2 + 2").
//!
//! Grammar (lowest to highest precedence):
//! ```text
//! expr  := term (('+' | '-') term)*
//! term  := unary (('*' | '/' | '%') unary)*
//! unary := ('-' | '+') unary | power
//! power := atom ('**' unary)?
//! atom  := number | '(' expr ')'
//! ```
//!
//! Parsing and evaluation recurse per operator and per parenthesis, so expressions with more
//! than [`MAX_OPERATORS`] of them are rejected before parsing.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit0, digit1, multispace0},
    combinator::{all_consuming, map, map_res, opt, recognize, value},
    multi::fold_many0,
    sequence::{delimited, pair, preceded},
    IResult,
};

use crate::error::{CoreError, CoreResult};

/// Upper bound on operator and parenthesis characters in one expression.
pub const MAX_OPERATORS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Neg(Box<Expr>),
    Bin(Op, Box<Expr>, Box<Expr>),
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn number(input: &str) -> IResult<&str, Expr> {
    map_res(
        recognize(alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        ))),
        |s: &str| s.parse::<f64>().map(Expr::Num),
    )(input)
}

fn atom(input: &str) -> IResult<&str, Expr> {
    ws(alt((number, delimited(char('('), expr, ws(char(')'))))))(input)
}

fn power(input: &str) -> IResult<&str, Expr> {
    let (input, base) = atom(input)?;
    let (input, exponent) = opt(preceded(ws(tag("**")), unary))(input)?;
    let node = match exponent {
        Some(e) => Expr::Bin(Op::Pow, Box::new(base), Box::new(e)),
        None => base,
    };
    Ok((input, node))
}

fn unary(input: &str) -> IResult<&str, Expr> {
    alt((
        map(preceded(ws(char('-')), unary), |e| Expr::Neg(Box::new(e))),
        preceded(ws(char('+')), unary),
        power,
    ))(input)
}

fn term(input: &str) -> IResult<&str, Expr> {
    let (input, first) = unary(input)?;
    fold_many0(
        pair(
            ws(alt((
                value(Op::Mul, char('*')),
                value(Op::Div, char('/')),
                value(Op::Rem, char('%')),
            ))),
            unary,
        ),
        move || first.clone(),
        |lhs, (op, rhs)| Expr::Bin(op, Box::new(lhs), Box::new(rhs)),
    )(input)
}

fn expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = term(input)?;
    fold_many0(
        pair(
            ws(alt((value(Op::Add, char('+')), value(Op::Sub, char('-'))))),
            term,
        ),
        move || first.clone(),
        |lhs, (op, rhs)| Expr::Bin(op, Box::new(lhs), Box::new(rhs)),
    )(input)
}

/// Parse a complete expression; trailing input is an error.
pub fn parse(input: &str) -> CoreResult<Expr> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidExpression(input.to_string()));
    }
    let operators = trimmed
        .chars()
        .filter(|c| matches!(c, '+' | '-' | '*' | '/' | '%' | '('))
        .count();
    if operators > MAX_OPERATORS {
        return Err(CoreError::InvalidExpression(format!(
            "{} operators exceeds the limit of {}",
            operators, MAX_OPERATORS
        )));
    }
    all_consuming(expr)(trimmed)
        .map(|(_, e)| e)
        .map_err(|_| CoreError::InvalidExpression(input.to_string()))
}

pub fn eval(expr: &Expr) -> CoreResult<f64> {
    let result = match expr {
        Expr::Num(n) => *n,
        Expr::Neg(inner) => -eval(inner)?,
        Expr::Bin(op, lhs, rhs) => {
            let (a, b) = (eval(lhs)?, eval(rhs)?);
            match op {
                Op::Add => a + b,
                Op::Sub => a - b,
                Op::Mul => a * b,
                Op::Div | Op::Rem if b == 0.0 => {
                    return Err(CoreError::InvalidExpression("division by zero".to_string()))
                }
                Op::Div => a / b,
                // Remainder takes the sign of the divisor.
                Op::Rem => {
                    let r = a % b;
                    if r != 0.0 && (r < 0.0) != (b < 0.0) {
                        r + b
                    } else {
                        r
                    }
                }
                Op::Pow => a.powf(b),
            }
        }
    };
    if result.is_finite() {
        Ok(result)
    } else {
        Err(CoreError::InvalidExpression("result is not a finite number".to_string()))
    }
}

/// Integral values print without a fraction; others are rounded to 10 places.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let rounded = (value * 1e10).round() / 1e10;
        format!("{}", rounded)
    }
}

/// Parse, evaluate and format in one step.
pub fn evaluate(input: &str) -> CoreResult<String> {
    let expr = parse(input)?;
    eval(&expr).map(format_number)
}
