//! Predicates and wanted-constraint containers.
//!
//! A freshly generated constraint is `NonCanonical`; the solver rewrites it
//! into a canonical dictionary or equality predicate. Predicates carry a
//! flavor (given or wanted) and the level at which they were introduced.

use std::fmt;

use larch_common::Span;

use crate::evidence::{EvVar, SharedEvDecls};
use crate::ty::{TyCon, TyVar, Type};

/// Whether a predicate is assumed (`Given`) or must be discharged
/// (`Wanted`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flavor {
    Given,
    Wanted,
}

/// A predicate in one of three states of canonicalization.
#[derive(Clone, Debug)]
pub enum Pred {
    /// Freshly generated, not yet inspected.
    NonCanonical { ev: EvVar, pred: Type },
    /// `C t1 ... tn` with every argument in head-normal form.
    Dict { ev: EvVar, class_con: TyCon, args: Vec<Type> },
    /// `lhs ~ rhs` with the sides canonically ordered.
    Equality { co: EvVar, lhs: Type, rhs: Type },
}

impl Pred {
    /// The evidence variable witnessing this predicate.
    pub fn ev_var(&self) -> &EvVar {
        match self {
            Pred::NonCanonical { ev, .. } | Pred::Dict { ev, .. } => ev,
            Pred::Equality { co, .. } => co,
        }
    }

    /// Rebuild the predicate as a type.
    pub fn to_type(&self) -> Type {
        match self {
            Pred::NonCanonical { pred, .. } => pred.clone(),
            Pred::Dict { class_con, args, .. } => {
                Type::apply(Type::Con(class_con.clone()), args.clone())
            }
            Pred::Equality { lhs, rhs, .. } => Type::equality(lhs.clone(), rhs.clone()),
        }
    }

    pub fn is_canonical(&self) -> bool {
        !matches!(self, Pred::NonCanonical { .. })
    }
}

/// A predicate with its flavor, introduction level, and origin span.
#[derive(Clone, Debug)]
pub struct Predicate {
    pub flavor: Flavor,
    pub level: u32,
    pub pred: Pred,
    pub span: Option<Span>,
}

impl Predicate {
    pub fn new(flavor: Flavor, level: u32, pred: Pred) -> Predicate {
        Predicate { flavor, level, pred, span: None }
    }

    pub fn with_span(flavor: Flavor, level: u32, pred: Pred, span: Option<Span>) -> Predicate {
        Predicate { flavor, level, pred, span }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.flavor {
            Flavor::Given => "[G]",
            Flavor::Wanted => "[W]",
        };
        write!(f, "{} {} :: {}", tag, self.pred.ev_var(), self.pred.to_type())
    }
}

/// An evidence-annotated constraint as carried in environments and wanted
/// buffers: `ev :: pred`.
#[derive(Clone, Debug)]
pub struct Ct {
    pub ev: EvVar,
    pub pred: Type,
    pub span: Option<Span>,
}

impl Ct {
    pub fn new(ev: EvVar, pred: Type) -> Ct {
        Ct { ev, pred, span: None }
    }

    pub fn with_span(ev: EvVar, pred: Type, span: Option<Span>) -> Ct {
        Ct { ev, pred, span }
    }
}

impl fmt::Display for Ct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :: {}", self.ev, self.pred)
    }
}

/// The wanteds accumulated by a typechecker: flat constraints plus nested
/// implications.
#[derive(Clone, Debug, Default)]
pub struct Wanteds {
    pub simple: Vec<Ct>,
    pub implications: Vec<Implication>,
}

impl Wanteds {
    pub fn new() -> Wanteds {
        Wanteds::default()
    }

    pub fn is_empty(&self) -> bool {
        self.simple.is_empty() && self.implications.is_empty()
    }

    pub fn push(&mut self, ct: Ct) {
        self.simple.push(ct);
    }

    pub fn append(&mut self, mut other: Wanteds) {
        self.simple.append(&mut other.simple);
        self.implications.append(&mut other.implications);
    }
}

/// The result of skolemizing a forall: under `givens`, with `skolems`
/// rigid, the inner `wanteds` must hold. Evidence bindings produced while
/// discharging them are written into `ev_decls`, which the elaborated
/// binding group shares.
#[derive(Clone, Debug)]
pub struct Implication {
    pub level: u32,
    pub skolems: Vec<TyVar>,
    pub givens: Vec<Ct>,
    pub wanteds: Wanteds,
    pub ev_decls: SharedEvDecls,
    pub span: Option<Span>,
    /// Enclosing context notes at the point of creation.
    pub notes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::Kind;

    #[test]
    fn predicate_display_tags_flavor() {
        let ev = EvVar::new("d", 3);
        let pred = Pred::NonCanonical {
            ev,
            pred: Type::apply(Type::con("Num", Kind::n_args(1)), vec![Type::int()]),
        };
        let p = Predicate::new(Flavor::Wanted, 0, pred);
        assert_eq!(format!("{}", p), "[W] d_3 :: Num Int");
    }

    #[test]
    fn pred_round_trips_to_type() {
        let co = EvVar::new("co", 1);
        let pred = Pred::Equality { co, lhs: Type::int(), rhs: Type::bool() };
        assert_eq!(pred.to_type(), Type::equality(Type::int(), Type::bool()));
    }
}
