//! Algebraic normalization.
//!
//! The normal form: sums are flat, like terms collected, terms ordered by
//! degree (highest first) with the constant last; products are flat with a
//! single leading numeric coefficient and factors in canonical order;
//! repeated factors become powers; anything purely numeric is folded.

use super::SolveError;
use super::ast::Expr;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

pub(crate) fn simplify(expr: Expr) -> Result<Expr, SolveError> {
    match expr {
        Expr::Num(n) => {
            if !n.is_finite() {
                return Err(SolveError::NotFinite);
            }
            Ok(Expr::Num(n))
        }
        Expr::Var(_) => Ok(expr),
        Expr::Add(terms) => simplify_sum(terms),
        Expr::Mul(factors) => simplify_product(factors),
        Expr::Pow(base, exp) => {
            let base = simplify(*base)?;
            let exp = simplify(*exp)?;
            apply_power(base, exp)
        }
        Expr::Call(name, arg) => simplify_call(name, *arg),
    }
}

/// Split a simplified term into its numeric coefficient and symbolic part.
/// `None` for the symbolic part means the term is a plain constant.
fn split_coefficient(term: Expr) -> (f64, Option<Expr>) {
    match term {
        Expr::Num(n) => (n, None),
        Expr::Mul(mut factors) => {
            if matches!(factors.first(), Some(Expr::Num(_))) {
                let Expr::Num(coefficient) = factors.remove(0) else {
                    unreachable!("first factor checked to be numeric");
                };
                let rest = if factors.len() == 1 {
                    factors.pop().expect("one factor left")
                } else {
                    Expr::Mul(factors)
                };
                (coefficient, Some(rest))
            } else {
                (1.0, Some(Expr::Mul(factors)))
            }
        }
        other => (1.0, Some(other)),
    }
}

/// Reattach a collected coefficient to a symbolic part.
fn make_term(coefficient: f64, expr: Expr) -> Expr {
    if coefficient == 1.0 {
        return expr;
    }
    match expr {
        Expr::Mul(mut factors) => {
            factors.insert(0, Expr::Num(coefficient));
            Expr::Mul(factors)
        }
        other => Expr::Mul(vec![Expr::Num(coefficient), other]),
    }
}

/// Polynomial-style degree used for ordering sum terms.
fn degree(expr: &Expr) -> f64 {
    match expr {
        Expr::Num(_) => 0.0,
        Expr::Var(_) => 1.0,
        Expr::Pow(base, exp) => match exp.as_ref() {
            Expr::Num(n) => degree(base) * n,
            _ => 1.0,
        },
        Expr::Mul(factors) => factors.iter().map(degree).sum(),
        Expr::Add(terms) => terms.iter().map(degree).fold(0.0, f64::max),
        Expr::Call(..) => 1.0,
    }
}

fn simplify_sum(terms: Vec<Expr>) -> Result<Expr, SolveError> {
    let mut constant = 0.0;
    // canonical rendering of the symbolic part -> (summed coefficient, part)
    let mut collected: BTreeMap<String, (f64, Expr)> = BTreeMap::new();

    fn accumulate(term: Expr, constant: &mut f64, collected: &mut BTreeMap<String, (f64, Expr)>) {
        let (coefficient, symbolic) = split_coefficient(term);
        match symbolic {
            None => *constant += coefficient,
            Some(expr) => {
                let key = expr.to_string();
                collected
                    .entry(key)
                    .and_modify(|(c, _)| *c += coefficient)
                    .or_insert((coefficient, expr));
            }
        }
    }

    for term in terms {
        let term = simplify(term)?;
        match term {
            Expr::Add(inner) => {
                for t in inner {
                    accumulate(t, &mut constant, &mut collected);
                }
            }
            other => accumulate(other, &mut constant, &mut collected),
        }
    }

    if !constant.is_finite() {
        return Err(SolveError::NotFinite);
    }

    let mut result: Vec<Expr> = collected
        .into_values()
        .filter(|(coefficient, _)| *coefficient != 0.0)
        .map(|(coefficient, expr)| make_term(coefficient, expr))
        .collect();

    // Highest degree first; the BTreeMap already yields a stable
    // alphabetical order within equal degrees.
    result.sort_by(|a, b| degree(b).partial_cmp(&degree(a)).unwrap_or(Ordering::Equal));

    if constant != 0.0 || result.is_empty() {
        result.push(Expr::Num(constant));
    }

    if result.len() == 1 {
        return Ok(result.pop().expect("one term"));
    }
    Ok(Expr::Add(result))
}

fn simplify_product(factors: Vec<Expr>) -> Result<Expr, SolveError> {
    let mut coefficient = 1.0;
    // canonical rendering of the base -> (base, exponents to be summed)
    let mut bases: BTreeMap<String, (Expr, Vec<Expr>)> = BTreeMap::new();

    fn push_power(base: Expr, exp: Expr, bases: &mut BTreeMap<String, (Expr, Vec<Expr>)>) {
        let key = base.to_string();
        match bases.entry(key) {
            Entry::Occupied(mut entry) => entry.get_mut().1.push(exp),
            Entry::Vacant(entry) => {
                entry.insert((base, vec![exp]));
            }
        }
    }

    fn gather(
        factor: Expr,
        coefficient: &mut f64,
        bases: &mut BTreeMap<String, (Expr, Vec<Expr>)>,
    ) -> Result<(), SolveError> {
        match simplify(factor)? {
            Expr::Num(n) => *coefficient *= n,
            Expr::Mul(inner) => {
                for f in inner {
                    gather(f, coefficient, bases)?;
                }
            }
            Expr::Pow(base, exp) => push_power(*base, *exp, bases),
            other => push_power(other, Expr::Num(1.0), bases),
        }
        Ok(())
    }

    for factor in factors {
        gather(factor, &mut coefficient, &mut bases)?;
    }

    if !coefficient.is_finite() {
        return Err(SolveError::NotFinite);
    }
    if coefficient == 0.0 {
        return Ok(Expr::Num(0.0));
    }

    let mut symbolic: Vec<Expr> = Vec::new();
    for (_, (base, exponents)) in bases {
        let exponent = simplify_sum(exponents)?;
        match exponent {
            Expr::Num(n) if n == 0.0 => {}
            Expr::Num(n) if n == 1.0 => symbolic.push(base),
            exponent => match apply_power(base, exponent)? {
                Expr::Num(n) => coefficient *= n,
                other => symbolic.push(other),
            },
        }
    }

    if !coefficient.is_finite() {
        return Err(SolveError::NotFinite);
    }

    symbolic.sort_by_key(|factor| factor.to_string());

    if symbolic.is_empty() {
        return Ok(Expr::Num(coefficient));
    }

    let mut factors: Vec<Expr> = Vec::new();
    if coefficient != 1.0 {
        factors.push(Expr::Num(coefficient));
    }
    factors.extend(symbolic);

    if factors.len() == 1 {
        return Ok(factors.pop().expect("one factor"));
    }
    Ok(Expr::Mul(factors))
}

/// Power rules on already-simplified operands.
fn apply_power(base: Expr, exp: Expr) -> Result<Expr, SolveError> {
    if let Expr::Num(e) = exp {
        if e == 0.0 {
            return Ok(Expr::Num(1.0));
        }
        if e == 1.0 {
            return Ok(base);
        }
        if let Expr::Num(b) = base {
            if b == 0.0 && e < 0.0 {
                return Err(SolveError::DivisionByZero);
            }
            let value = b.powf(e);
            // Non-finite results (e.g. (-1)**0.5) stay symbolic
            return if value.is_finite() {
                Ok(Expr::Num(value))
            } else {
                Ok(Expr::pow(Expr::Num(b), Expr::Num(e)))
            };
        }
        if let Expr::Pow(inner_base, inner_exp) = base {
            if let Expr::Num(m) = *inner_exp {
                return apply_power(*inner_base, Expr::Num(m * e));
            }
            return Ok(Expr::pow(Expr::Pow(inner_base, inner_exp), Expr::Num(e)));
        }
        return Ok(Expr::pow(base, Expr::Num(e)));
    }
    Ok(Expr::pow(base, exp))
}

fn simplify_call(name: String, arg: Expr) -> Result<Expr, SolveError> {
    let arg = simplify(arg)?;

    if let Expr::Num(n) = arg {
        let value = match name.as_str() {
            "sqrt" => n.sqrt(),
            "sin" => n.sin(),
            "cos" => n.cos(),
            "tan" => n.tan(),
            "log" => n.ln(),
            "exp" => n.exp(),
            _ => f64::NAN,
        };
        // Out-of-domain applications (sqrt(-1), log(0)) stay symbolic
        if value.is_finite() {
            return Ok(Expr::Num(value));
        }
        return Ok(Expr::Call(name, Box::new(Expr::Num(n))));
    }

    Ok(Expr::Call(name, Box::new(arg)))
}

#[cfg(test)]
mod tests {
    use super::super::parser::parse;
    use super::*;

    fn normalized(input: &str) -> String {
        simplify(parse(input).unwrap()).unwrap().to_string()
    }

    #[test]
    fn folds_constants() {
        assert_eq!(normalized("1 + 2 + 3"), "6");
        assert_eq!(normalized("2 * 3 * 4"), "24");
        assert_eq!(normalized("(1 + 1) ** 3"), "8");
        assert_eq!(normalized("7 - 7"), "0");
    }

    #[test]
    fn collects_like_terms_across_signs() {
        assert_eq!(normalized("x + x + x"), "3*x");
        assert_eq!(normalized("2*x - 3*x"), "-x");
        assert_eq!(normalized("x*y + y*x"), "2*x*y");
    }

    #[test]
    fn combines_repeated_factors_into_powers() {
        assert_eq!(normalized("x * x"), "x**2");
        assert_eq!(normalized("x * x**2"), "x**3");
        assert_eq!(normalized("x / x"), "1");
        assert_eq!(normalized("(x + 1)*(x + 1)"), "(x + 1)**2");
    }

    #[test]
    fn orders_terms_by_degree() {
        assert_eq!(normalized("1 + 2*x + x**2"), "x**2 + 2*x + 1");
        assert_eq!(normalized("y + x**3 + 4"), "x**3 + y + 4");
    }

    #[test]
    fn orders_factors_canonically() {
        assert_eq!(normalized("y * x * 2"), "2*x*y");
        assert_eq!(normalized("x * 3"), "3*x");
    }

    #[test]
    fn strips_identities() {
        assert_eq!(normalized("x + 0"), "x");
        assert_eq!(normalized("x * 1"), "x");
        assert_eq!(normalized("x ** 1"), "x");
        assert_eq!(normalized("x ** 0"), "1");
        assert_eq!(normalized("0 * x"), "0");
    }

    #[test]
    fn nested_powers_multiply() {
        assert_eq!(normalized("(x**2)**3"), "x**6");
        assert_eq!(normalized("(x**2)**0.5"), "x");
    }

    #[test]
    fn division_renders_as_fraction() {
        assert_eq!(normalized("1 / x"), "1/x");
        assert_eq!(normalized("y / x / z"), "y/(x*z)");
    }

    #[test]
    fn numeric_division_folds() {
        assert_eq!(normalized("1 / 2"), "0.5");
        assert_eq!(normalized("x / 2"), "0.5*x");
    }

    #[test]
    fn zero_denominator_is_an_error() {
        assert_eq!(simplify(parse("1/0").unwrap()), Err(SolveError::DivisionByZero));
        assert_eq!(simplify(parse("x/0").unwrap()), Err(SolveError::DivisionByZero));
    }

    #[test]
    fn constant_functions_fold() {
        assert_eq!(normalized("sqrt(9)"), "3");
        assert_eq!(normalized("cos(0)"), "1");
        assert_eq!(normalized("exp(0) + 1"), "2");
    }

    #[test]
    fn out_of_domain_functions_stay_symbolic() {
        assert_eq!(normalized("sqrt(0 - 1)"), "sqrt(-1)");
        assert_eq!(normalized("sqrt(x)"), "sqrt(x)");
    }
}
