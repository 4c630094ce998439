//! Evidence terms for the dictionary-passing elaboration.
//!
//! Every discharged constraint leaves a trail: a `let`-binding from an
//! evidence variable to an evidence expression built out of givens,
//! superclass extractors, and instance dfuns. Wrappers reify the
//! type/evidence abstractions and applications the elaborator wraps
//! around binders and use sites.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::ty::{TyVar, Type};

/// A fresh evidence identifier: a dictionary variable (proof of `C t`) or
/// a coercion variable (proof of `t1 ~ t2`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EvVar {
    pub name: String,
    pub uniq: u32,
}

impl EvVar {
    pub fn new(name: impl Into<String>, uniq: u32) -> EvVar {
        EvVar { name: name.into(), uniq }
    }
}

impl fmt::Display for EvVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.name, self.uniq)
    }
}

/// An evidence expression.
#[derive(Clone, Debug, PartialEq)]
pub enum EvExpr {
    Var(EvVar),
    /// Application of a dfun or extractor to evidence arguments.
    App(Box<EvExpr>, Vec<EvExpr>),
    /// A dictionary tuple: superclass fields followed by method entries.
    Tuple(Vec<EvExpr>),
}

impl EvExpr {
    pub fn var(v: EvVar) -> EvExpr {
        EvExpr::Var(v)
    }

    pub fn app(f: EvExpr, args: Vec<EvExpr>) -> EvExpr {
        if args.is_empty() {
            f
        } else {
            EvExpr::App(Box::new(f), args)
        }
    }
}

impl fmt::Display for EvExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvExpr::Var(v) => write!(f, "{}", v),
            EvExpr::App(head, args) => {
                write!(f, "{}", head)?;
                for a in args {
                    match a {
                        EvExpr::Var(_) => write!(f, " {}", a)?,
                        _ => write!(f, " ({})", a)?,
                    }
                }
                Ok(())
            }
            EvExpr::Tuple(es) => {
                write!(f, "<")?;
                for (i, e) in es.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, ">")
            }
        }
    }
}

/// A single evidence binding `ev = expr`.
pub type EvDecl = (EvVar, EvExpr);

/// An ordered sequence of evidence bindings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvDecls(pub Vec<EvDecl>);

impl EvDecls {
    pub fn new() -> EvDecls {
        EvDecls::default()
    }

    pub fn push(&mut self, ev: EvVar, expr: EvExpr) {
        self.0.push((ev, expr));
    }

    pub fn append(&mut self, mut other: EvDecls) {
        self.0.append(&mut other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// A shared, late-filled evidence-binding cell.
///
/// Implication solving writes its bindings here after the enclosing
/// binding group has already been elaborated, mirroring how the solver
/// and the generalizer share one output slot.
pub type SharedEvDecls = Rc<RefCell<EvDecls>>;

pub fn shared_ev_decls() -> SharedEvDecls {
    Rc::new(RefCell::new(EvDecls::new()))
}

/// A reified elaboration instruction, composed left-to-right around a
/// checked term.
#[derive(Clone, Debug)]
pub enum Wrapper {
    /// The identity wrapper.
    Id,
    /// `/\ tvs. _`
    TyLam(Vec<TyVar>),
    /// `_ @tys`
    TyApp(Vec<Type>),
    /// `\ dicts. _`
    EvLam(Vec<EvVar>),
    /// `_ dicts`
    EvApp(Vec<EvVar>),
    /// `let ev_decls in _` where the decls may be filled in later.
    Let(SharedEvDecls),
    /// `outer (inner _)`
    Compose(Box<Wrapper>, Box<Wrapper>),
}

impl Wrapper {
    /// Compose so that `self` is applied outside `inner`.
    pub fn then(self, inner: Wrapper) -> Wrapper {
        match (self, inner) {
            (Wrapper::Id, w) | (w, Wrapper::Id) => w,
            (a, b) => Wrapper::Compose(Box::new(a), Box::new(b)),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Wrapper::Id)
    }
}

impl Default for Wrapper {
    fn default() -> Self {
        Wrapper::Id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_drops_identity() {
        let d = EvVar::new("d", 0);
        let w = Wrapper::Id.then(Wrapper::EvLam(vec![d.clone()]));
        assert!(matches!(w, Wrapper::EvLam(_)));
        let w = Wrapper::EvApp(vec![d]).then(Wrapper::Id);
        assert!(matches!(w, Wrapper::EvApp(_)));
    }

    #[test]
    fn ev_expr_display_parenthesizes_nested_apps() {
        let dfun = EvVar::new("dEqList", 1);
        let inner = EvExpr::app(EvExpr::var(EvVar::new("dEqInt", 2)), vec![]);
        let outer = EvExpr::app(
            EvExpr::var(dfun),
            vec![inner, EvExpr::Tuple(vec![])],
        );
        assert_eq!(format!("{}", outer), "dEqList_1 dEqInt_2 (<>)");
    }
}
