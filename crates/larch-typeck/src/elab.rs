//! Elaboration output: generalized binding groups and dfun bodies.
//!
//! Each `let` or top-level group elaborates to a [`GenBind`]: the
//! quantified type variables, the dictionary lambdas, the shared evidence
//! bindings the solver fills in, and a per-binder [`BindInfo`] with the
//! wrapper that turns the monomorphic body into the polymorphic binder.
//! Use sites of overloaded identifiers are recorded as [`UseSite`]s whose
//! evidence variables the solver's bindings resolve.

use larch_common::Span;
use rustc_hash::FxHashMap;

use crate::ast::{Decl, Name};
use crate::evidence::{EvExpr, EvVar, SharedEvDecls, Wrapper};
use crate::ty::{TyVar, Type};

/// Per-binder elaboration record.
#[derive(Clone, Debug)]
pub struct BindInfo {
    /// The published polymorphic binder.
    pub poly_id: Name,
    /// The monomorphic inner binder the clauses define.
    pub mono_id: Name,
    pub monotype: Type,
    pub polytype: Type,
    /// Turns the monomorphic body into the polymorphic binder.
    pub wrapper: Wrapper,
}

/// An elaborated binding group:
/// `poly_id = /\tvs. \dicts. let ev_decls in body`.
#[derive(Clone, Debug)]
pub struct GenBind {
    pub ty_vars: Vec<TyVar>,
    pub dict_vars: Vec<EvVar>,
    /// Evidence bindings discharged while solving this group's
    /// implication; shared with the solver, which fills them in late.
    pub ev_decls: SharedEvDecls,
    pub decls: Vec<Decl>,
    pub infos: FxHashMap<Name, BindInfo>,
}

/// One use site of an overloaded identifier: the evidence variables that
/// must be applied there. The solver's evidence bindings define them.
#[derive(Clone, Debug)]
pub struct UseSite {
    pub name: Name,
    pub span: Option<Span>,
    pub ev_args: Vec<EvVar>,
}

/// An elaborated instance:
/// `dfun = /\tvs. \dicts. let super_decls in <supers..., methods...>`.
#[derive(Clone, Debug)]
pub struct DFunDecl {
    pub dfun: EvVar,
    pub wrapper: Wrapper,
    /// The dictionary tuple: superclass fields, then method entries.
    pub dict: EvExpr,
    /// Elaborated method bindings.
    pub method_binds: Vec<GenBind>,
}
