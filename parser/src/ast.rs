//! FILENAME: parser/src/ast.rs
//! PURPOSE: The formula AST — node shapes, precedence, evaluation and printing.
//! CONTEXT: Modeled as a single tagged sum rather than a class hierarchy, so
//! evaluation, precedence lookup and printing are all total `match`es.

use crate::formula_error::FormulaError;
use crate::position::Position;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,
    Minus,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Minus => "-",
        };
        write!(f, "{}", s)
    }
}

/// Node variants of a parsed formula. Four kinds: a number literal, a cell
/// reference, a unary sign applied to a child, and a binary operator over
/// two children.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Number(f64),
    CellRef(Position),
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

/// The six precedence classes the pretty-printer reasons about. Declaration
/// order is the row/column order of `PRECEDENCE_RULES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
    Add,
    Sub,
    Mul,
    Div,
    Unary,
    Atom,
}

const PRECEDENCE_COUNT: usize = 6;

fn precedence_index(p: Precedence) -> usize {
    match p {
        Precedence::Add => 0,
        Precedence::Sub => 1,
        Precedence::Mul => 2,
        Precedence::Div => 3,
        Precedence::Unary => 4,
        Precedence::Atom => 5,
    }
}

/// Whether a child needs parentheses when printed as the left operand, the
/// right operand, both, or neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParenRule {
    None,
    Right,
    Both,
}

impl ParenRule {
    fn needs_parens(self, right_child: bool) -> bool {
        match self {
            ParenRule::None => false,
            ParenRule::Both => true,
            ParenRule::Right => right_child,
        }
    }
}

/// Rows are the parent's precedence, columns are the child's — see spec
/// §4.4's matrix. Kept as a standalone constant rather than inlined into the
/// printer, since it *is* the specification of canonical parenthesization.
const PRECEDENCE_RULES: [[ParenRule; PRECEDENCE_COUNT]; PRECEDENCE_COUNT] = {
    use ParenRule::{Both, None as N, Right as R};
    [
        // ADD
        [N, N, N, N, N, N],
        // SUB
        [R, R, N, N, N, N],
        // MUL
        [Both, Both, N, N, N, N],
        // DIV
        [Both, Both, R, R, N, N],
        // UNARY
        [Both, Both, N, N, N, N],
        // ATOM
        [N, N, N, N, N, N],
    ]
};

impl Expression {
    pub fn precedence(&self) -> Precedence {
        match self {
            Expression::Number(_) | Expression::CellRef(_) => Precedence::Atom,
            Expression::UnaryOp { .. } => Precedence::Unary,
            Expression::BinaryOp { op, .. } => match op {
                BinaryOperator::Add => Precedence::Add,
                BinaryOperator::Subtract => Precedence::Sub,
                BinaryOperator::Multiply => Precedence::Mul,
                BinaryOperator::Divide => Precedence::Div,
            },
        }
    }

    /// Evaluates the expression against a resolver that maps a `Position` to
    /// the number it should stand in for (or a `FormulaError`).
    pub fn evaluate<F>(&self, resolver: &F) -> Result<f64, FormulaError>
    where
        F: Fn(Position) -> Result<f64, FormulaError>,
    {
        match self {
            Expression::Number(n) => Ok(*n),
            Expression::CellRef(pos) => resolver(*pos),
            Expression::UnaryOp { op, operand } => {
                let value = operand.evaluate(resolver)?;
                Ok(match op {
                    UnaryOperator::Plus => value,
                    UnaryOperator::Minus => -value,
                })
            }
            Expression::BinaryOp { op, left, right } => {
                let l = left.evaluate(resolver)?;
                let r = right.evaluate(resolver)?;
                let result = match op {
                    BinaryOperator::Add => l + r,
                    BinaryOperator::Subtract => l - r,
                    BinaryOperator::Multiply => l * r,
                    BinaryOperator::Divide => l / r,
                };
                if !result.is_finite() {
                    return Err(FormulaError::Div0);
                }
                Ok(result)
            }
        }
    }

    /// Fully-parenthesized debug S-expression, e.g. `(+ 1 (* 2 3))`.
    pub fn print(&self) -> String {
        match self {
            Expression::Number(n) => format!("{}", n),
            Expression::CellRef(pos) => cell_ref_text(*pos),
            Expression::UnaryOp { op, operand } => format!("({} {})", op, operand.print()),
            Expression::BinaryOp { op, left, right } => {
                format!("({} {} {})", op, left.print(), right.print())
            }
        }
    }

    /// Canonical, minimally-parenthesized formula text.
    pub fn print_formula(&self) -> String {
        self.fmt_with_parent(Precedence::Atom, false)
    }

    fn fmt_with_parent(&self, parent: Precedence, right_child: bool) -> String {
        let rule = PRECEDENCE_RULES[precedence_index(parent)][precedence_index(self.precedence())];
        let inner = self.fmt_self();
        if rule.needs_parens(right_child) {
            format!("({})", inner)
        } else {
            inner
        }
    }

    fn fmt_self(&self) -> String {
        match self {
            Expression::Number(n) => format!("{}", n),
            Expression::CellRef(pos) => cell_ref_text(*pos),
            Expression::UnaryOp { op, operand } => {
                format!("{}{}", op, operand.fmt_with_parent(Precedence::Unary, false))
            }
            Expression::BinaryOp { op, left, right } => {
                let my_prec = self.precedence();
                format!(
                    "{}{}{}",
                    left.fmt_with_parent(my_prec, false),
                    op,
                    right.fmt_with_parent(my_prec, true)
                )
            }
        }
    }

    /// Every `Position` referenced anywhere in this subtree, in source order
    /// (may repeat, may include invalid positions — callers sort/filter).
    pub fn collect_references(&self, out: &mut Vec<Position>) {
        match self {
            Expression::Number(_) => {}
            Expression::CellRef(pos) => out.push(*pos),
            Expression::UnaryOp { operand, .. } => operand.collect_references(out),
            Expression::BinaryOp { left, right, .. } => {
                left.collect_references(out);
                right.collect_references(out);
            }
        }
    }
}

fn cell_ref_text(pos: Position) -> String {
    if pos.is_valid() {
        pos.to_string()
    } else {
        "#REF!".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Expression {
        Expression::Number(n)
    }

    fn add(l: Expression, r: Expression) -> Expression {
        Expression::BinaryOp {
            op: BinaryOperator::Add,
            left: Box::new(l),
            right: Box::new(r),
        }
    }

    fn sub(l: Expression, r: Expression) -> Expression {
        Expression::BinaryOp {
            op: BinaryOperator::Subtract,
            left: Box::new(l),
            right: Box::new(r),
        }
    }

    fn mul(l: Expression, r: Expression) -> Expression {
        Expression::BinaryOp {
            op: BinaryOperator::Multiply,
            left: Box::new(l),
            right: Box::new(r),
        }
    }

    #[test]
    fn prints_minimal_parens_for_precedence_mismatch() {
        let e = add(num(1.0), mul(num(2.0), num(3.0)));
        assert_eq!(e.print_formula(), "1+2*3");

        let e = mul(add(num(1.0), num(2.0)), num(3.0));
        assert_eq!(e.print_formula(), "(1+2)*3");
    }

    #[test]
    fn subtraction_is_left_associative_without_parens() {
        let e = sub(sub(num(1.0), num(2.0)), num(3.0));
        assert_eq!(e.print_formula(), "1-2-3");

        let e = sub(num(1.0), sub(num(2.0), num(3.0)));
        assert_eq!(e.print_formula(), "1-(2-3)");
    }

    #[test]
    fn debug_print_is_fully_parenthesized() {
        let e = add(num(1.0), mul(num(2.0), num(3.0)));
        assert_eq!(e.print(), "(+ 1 (* 2 3))");
    }

    #[test]
    fn invalid_cell_ref_prints_as_ref_error() {
        let e = Expression::CellRef(Position::NONE);
        assert_eq!(e.print(), "#REF!");
        assert_eq!(e.print_formula(), "#REF!");
    }

    #[test]
    fn evaluate_propagates_div0_on_non_finite_result() {
        let e = Expression::BinaryOp {
            op: BinaryOperator::Divide,
            left: Box::new(num(1.0)),
            right: Box::new(num(0.0)),
        };
        let result = e.evaluate(&|_| Ok(0.0));
        assert_eq!(result, Err(FormulaError::Div0));
    }

    #[test]
    fn evaluate_resolves_cell_refs_through_resolver() {
        let pos = Position::new(0, 0);
        let e = Expression::CellRef(pos);
        assert_eq!(e.evaluate(&|p| if p == pos { Ok(5.0) } else { Ok(0.0) }), Ok(5.0));
    }
}
