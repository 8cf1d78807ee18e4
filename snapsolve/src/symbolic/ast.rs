//! Expression tree and canonical rendering.

use std::fmt;

/// Symbolic expression. Sums and products are n-ary and kept flat;
/// subtraction and division are rewritten at parse time into additive
/// inverses and negative powers, so the tree only ever contains these
/// five shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Var(String),
    Add(Vec<Expr>),
    Mul(Vec<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Call(String, Box<Expr>),
}

impl Expr {
    pub fn pow(base: Expr, exp: Expr) -> Expr {
        Expr::Pow(Box::new(base), Box::new(exp))
    }

    pub fn neg(expr: Expr) -> Expr {
        Expr::Mul(vec![Expr::Num(-1.0), expr])
    }

    /// True when the rendered form starts with a minus sign.
    pub fn is_negative(&self) -> bool {
        match self {
            Expr::Num(n) => *n < 0.0,
            Expr::Mul(factors) => matches!(factors.first(), Some(Expr::Num(n)) if *n < 0.0),
            _ => false,
        }
    }

    /// The expression with its sign flipped. Only meaningful for the
    /// shapes `is_negative` recognizes.
    pub fn negated(&self) -> Expr {
        match self {
            Expr::Num(n) => Expr::Num(-n),
            Expr::Mul(factors) => {
                let mut factors = factors.clone();
                if let Some(Expr::Num(n)) = factors.first_mut() {
                    *n = -*n;
                }
                if factors.len() == 2 && matches!(factors.first(), Some(Expr::Num(n)) if *n == 1.0) {
                    return factors.pop().expect("two factors");
                }
                Expr::Mul(factors)
            }
            other => Expr::neg(other.clone()),
        }
    }
}

const PREC_ADD: u8 = 1;
const PREC_MUL: u8 = 2;
const PREC_POW: u8 = 3;
const PREC_ATOM: u8 = 4;

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Add(_) => PREC_ADD,
        // A bare negative number binds like a sum so it picks up parens
        // wherever a leading sign would be ambiguous.
        Expr::Num(n) if *n < 0.0 => PREC_ADD,
        Expr::Mul(_) => PREC_MUL,
        // Negative powers render as "1/..." and bind like a product
        Expr::Pow(_, exp) => match exp.as_ref() {
            Expr::Num(n) if *n < 0.0 => PREC_MUL,
            _ => PREC_POW,
        },
        _ => PREC_ATOM,
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    format!("{}", n)
}

/// The positive-exponent form of a negative power, for division rendering.
fn invert_power(base: &Expr, exp: f64) -> Expr {
    if exp == -1.0 {
        base.clone()
    } else {
        Expr::pow(base.clone(), Expr::Num(-exp))
    }
}

fn render(expr: &Expr, parent_prec: u8) -> String {
    let rendered = match expr {
        Expr::Num(n) => format_number(*n),
        Expr::Var(name) => name.clone(),
        Expr::Add(terms) => render_sum(terms),
        Expr::Mul(factors) => render_product(factors),
        Expr::Pow(base, exp) => match exp.as_ref() {
            Expr::Num(n) if *n < 0.0 => format!("1/{}", render(&invert_power(base, *n), PREC_MUL + 1)),
            _ => format!("{}**{}", render(base, PREC_POW + 1), render(exp, PREC_POW + 1)),
        },
        Expr::Call(name, arg) => format!("{}({})", name, render(arg, 0)),
    };

    if precedence(expr) < parent_prec {
        format!("({})", rendered)
    } else {
        rendered
    }
}

fn render_sum(terms: &[Expr]) -> String {
    let mut out = String::new();
    for (i, term) in terms.iter().enumerate() {
        if i == 0 {
            out.push_str(&render(term, PREC_ADD));
        } else if term.is_negative() {
            out.push_str(" - ");
            out.push_str(&render(&term.negated(), PREC_MUL));
        } else {
            out.push_str(" + ");
            out.push_str(&render(term, PREC_ADD));
        }
    }
    out
}

fn render_product(factors: &[Expr]) -> String {
    let mut coefficient: Option<f64> = None;
    let mut numerator: Vec<String> = Vec::new();
    let mut denominator: Vec<String> = Vec::new();

    for factor in factors {
        match factor {
            Expr::Num(n) if coefficient.is_none() && numerator.is_empty() && denominator.is_empty() => {
                coefficient = Some(*n);
            }
            // Negative powers render as a trailing division
            Expr::Pow(base, exp) => match exp.as_ref() {
                Expr::Num(n) if *n < 0.0 => {
                    denominator.push(render(&invert_power(base, *n), PREC_MUL + 1));
                }
                _ => numerator.push(render(factor, PREC_MUL)),
            },
            other => numerator.push(render(other, PREC_MUL)),
        }
    }

    let mut sign = "";
    if let Some(c) = coefficient {
        if c < 0.0 {
            sign = "-";
            coefficient = Some(-c);
        }
    }

    let coefficient_str = match coefficient {
        Some(c) if c == 1.0 && !numerator.is_empty() => None,
        Some(c) => Some(format_number(c)),
        None => None,
    };

    let mut parts: Vec<String> = Vec::new();
    if let Some(c) = coefficient_str {
        parts.push(c);
    }
    parts.extend(numerator);

    let numerator_str = if parts.is_empty() { "1".to_string() } else { parts.join("*") };

    let result = if denominator.is_empty() {
        numerator_str
    } else if denominator.len() == 1 {
        format!("{}/{}", numerator_str, denominator[0])
    } else {
        format!("{}/({})", numerator_str, denominator.join("*"))
    };

    format!("{sign}{result}")
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", render(self, 0))
    }
}
