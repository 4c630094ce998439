//! Type errors as values, with provenance.
//!
//! The checker never unwinds for a local mismatch: each error is recorded
//! on an accumulating list together with the source span and the stack of
//! enclosing context notes active at the time, and inference continues on
//! a best-effort basis.

use std::fmt;

use larch_common::Span;

use crate::ty::{TyMeta, TyVar, Type};

/// A type error encountered during checking.
#[derive(Clone, Debug)]
pub enum TypeError {
    /// Two types that should be equal are not.
    Mismatch { expected: Type, found: Type },
    /// A unification variable appears in its own solution.
    OccursCheck { var: TyMeta, ty: Type },
    /// No instance matched a wanted constraint.
    NoInstance { pred: Type },
    /// More than one instance survived specificity pruning.
    OverlappingInstances { pred: Type, candidates: Vec<Type> },
    /// A retained constraint mentions no quantified variable and could not
    /// be defaulted.
    AmbiguousType { pred: Type },
    /// An instance does not define a required class method and the class
    /// has no default.
    MissingMethod { class: String, method: String, instance_head: Type },
    /// An instance defines a method its class does not declare.
    MethodNotInClass { class: String, method: String },
    /// A method is defined twice in one instance.
    DuplicateMethod { class: String, method: String },
    /// A skolem from an inner implication leaks into an outer wanted.
    EscapingSkolem { var: TyVar, pred: Type },
    /// A variable is not in scope (the renamer should prevent this; kept
    /// for robustness against malformed input).
    UnboundVariable { name: String },
    /// A non-function value is applied to an argument.
    NotAFunction { ty: Type },
    /// Clauses of one function have different arities.
    ClauseArityMismatch { name: String, expected: usize, found: usize },
    /// A class referenced by an instance or constraint does not exist.
    NoSuchClass { name: String },
    /// An instance head has the wrong number of class parameters.
    ClassArityMismatch { class: String, expected: usize, found: usize },
    /// A type-family instance for a constructor that is not a family.
    NoSuchFamily { name: String },
    /// A type-family instance with the wrong number of arguments.
    FamilyArityMismatch { family: String, expected: usize, found: usize },
    /// A type-family equation rhs mentions a variable not bound on the lhs.
    UnboundFamilyRhsVar { family: String, var: TyVar },
    /// A given constraint collides with a top-level instance.
    GivenInstanceCollision { pred: Type },
    /// A wanted constraint survived solving inside an implication.
    UnsolvedConstraint { pred: Type },
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::Mismatch { expected, found } => {
                write!(f, "couldn't match type `{}` with `{}`", expected, found)
            }
            TypeError::OccursCheck { var, ty } => {
                write!(f, "occurs check: cannot construct the infinite type `{} ~ {}`", var, ty)
            }
            TypeError::NoInstance { pred } => {
                write!(f, "no instance for `{}`", pred)
            }
            TypeError::OverlappingInstances { pred, candidates } => {
                write!(f, "overlapping instances for `{}`:", pred)?;
                for c in candidates {
                    write!(f, " `{}`", c)?;
                }
                Ok(())
            }
            TypeError::AmbiguousType { pred } => {
                write!(f, "ambiguous type in constraint `{}`", pred)
            }
            TypeError::MissingMethod { class, method, instance_head } => {
                write!(f, "instance `{}` is missing method `{}` of class `{}`", instance_head, method, class)
            }
            TypeError::MethodNotInClass { class, method } => {
                write!(f, "`{}` is not a member of class `{}`", method, class)
            }
            TypeError::DuplicateMethod { class, method } => {
                write!(f, "method `{}` of class `{}` defined twice", method, class)
            }
            TypeError::EscapingSkolem { var, pred } => {
                write!(f, "rigid type variable `{}` escapes its scope in `{}`", var, pred)
            }
            TypeError::UnboundVariable { name } => {
                write!(f, "variable `{}` is not in scope", name)
            }
            TypeError::NotAFunction { ty } => {
                write!(f, "`{}` is applied to an argument but is not a function", ty)
            }
            TypeError::ClauseArityMismatch { name, expected, found } => {
                write!(f, "clauses of `{}` have different numbers of patterns: {} vs {}", name, expected, found)
            }
            TypeError::NoSuchClass { name } => {
                write!(f, "no class named `{}`", name)
            }
            TypeError::ClassArityMismatch { class, expected, found } => {
                write!(f, "class `{}` expects {} parameters, but the instance head has {}", class, expected, found)
            }
            TypeError::NoSuchFamily { name } => {
                write!(f, "no type family `{}`", name)
            }
            TypeError::FamilyArityMismatch { family, expected, found } => {
                write!(f, "type family `{}` expects {} arguments, but got {}", family, expected, found)
            }
            TypeError::UnboundFamilyRhsVar { family, var } => {
                write!(f, "type variable `{}` on the rhs of a `{}` equation is not bound on the lhs", var, family)
            }
            TypeError::GivenInstanceCollision { pred } => {
                write!(f, "given constraint `{}` collides with a top-level instance", pred)
            }
            TypeError::UnsolvedConstraint { pred } => {
                write!(f, "could not deduce `{}` from the given context", pred)
            }
        }
    }
}

/// A recorded diagnostic: the error, its primary span, and the stack of
/// enclosing context notes at the time it was raised (innermost last).
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub error: TypeError,
    pub span: Option<Span>,
    pub notes: Vec<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        for note in self.notes.iter().rev() {
            write!(f, "\n  {}", note)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_renders_notes_innermost_first() {
        let d = Diagnostic {
            error: TypeError::Mismatch { expected: Type::int(), found: Type::bool() },
            span: None,
            notes: vec!["In function `f`".into(), "In the expression `f True`".into()],
        };
        let text = format!("{}", d);
        let inner = text.find("In the expression").unwrap();
        let outer = text.find("In function").unwrap();
        assert!(inner < outer, "innermost note should render first:\n{}", text);
    }
}
