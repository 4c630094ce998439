//! Larch type inference: an OutsideIn-style constraint solver with
//! dictionary-passing elaboration.
//!
//! The input is a renamed, desugared, kind-checked core program; the
//! output is a principal polytype for every binding, an elaboration in
//! which every overloaded use site is supplied with explicit evidence,
//! and structured diagnostics. The engine is built from:
//!
//! - [`ty`]: the type representation (rigid variables, unification
//!   variables backed by write-once cells, polytype builders)
//! - [`unify`]: unification with occurs check and level-disciplined
//!   promotion
//! - [`skolem`]: instantiation and (deep) skolemization
//! - [`infer`]: bidirectional constraint generation
//! - [`generalize`]: binding-group analysis, quantification decisions,
//!   and the monomorphism restriction
//! - [`solver`]: the canonicalize / interact / top-react worklist and
//!   recursive implication solving
//! - [`classes`]: instance lookup with specificity pruning and
//!   superclass navigation
//! - [`default`]: `default (...)` resolution of ambiguous numerics
//! - [`diagnostics`]: ariadne rendering and JSON export

pub mod ast;
pub mod builtins;
pub mod classes;
pub mod constraint;
pub mod default;
pub mod diagnostics;
pub mod elab;
pub mod env;
pub mod error;
pub mod evidence;
pub mod generalize;
pub mod infer;
pub mod skolem;
pub mod solver;
pub mod tc;
pub mod ty;
pub mod unify;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::ast::{KindEnv, Name, Program};
use crate::elab::{DFunDecl, GenBind, UseSite};
use crate::env::InstanceInfo;
use crate::error::{Diagnostic, TypeError};
use crate::evidence::{EvDecls, EvVar};
use crate::tc::TypeChecker;
use crate::ty::Type;

/// Configuration for a checking run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TypeckOptions {
    /// Candidate types for the `default (...)` rule, tried in order.
    pub defaults: Vec<String>,
}

impl Default for TypeckOptions {
    fn default() -> Self {
        TypeckOptions { defaults: vec!["Integer".into(), "Double".into()] }
    }
}

/// The result of checking one module.
pub struct TypeckResult {
    /// Zonked polytypes of the module's binders.
    pub types: FxHashMap<Name, Type>,
    /// Elaborated binding groups, nested lets included, in elaboration
    /// order.
    pub binds: Vec<GenBind>,
    /// Evidence applications at overloaded use sites.
    pub uses: Vec<UseSite>,
    /// The instance table: dfun names with their instance info.
    pub instances: Vec<(EvVar, InstanceInfo)>,
    /// Elaborated instance dictionaries.
    pub dfuns: Vec<DFunDecl>,
    /// Top-level evidence bindings (instance resolutions, defaulting).
    pub ev_decls: EvDecls,
    /// Diagnostics, in the order they were raised.
    pub errors: Vec<Diagnostic>,
    /// True when any error was recorded; the driver must not hand a
    /// poisoned module to the code generator.
    pub poisoned: bool,
}

impl TypeckResult {
    /// Render all diagnostics as formatted strings.
    pub fn render_errors(
        &self,
        source: &str,
        filename: &str,
        options: &diagnostics::DiagnosticOptions,
    ) -> Vec<String> {
        diagnostics::render_all(&self.errors, source, filename, options)
    }

    /// Serialize diagnostics to JSON.
    pub fn errors_to_json(&self, source: Option<&str>) -> String {
        diagnostics::diagnostics_to_json(&self.errors, source)
    }
}

/// Type-check a renamed, desugared module.
///
/// This is the main entry point. Inference is best-effort: a local error
/// is recorded and checking continues, so one pass can report several
/// problems. The result is poisoned if anything went wrong.
pub fn check_program(program: &Program, kinds: KindEnv, options: TypeckOptions) -> TypeckResult {
    let mut tc = TypeChecker::new(kinds, options);
    builtins::install(&mut tc);

    // Declarations first: classes, instance heads, family equations, and
    // foreign signatures all have to be visible before any right-hand
    // side is checked.
    for class in &program.classes {
        tc.register_class(class);
    }
    let named_instances: Vec<(EvVar, ast::InstanceDecl)> = program
        .instances
        .iter()
        .filter_map(|inst| tc.register_instance(inst))
        .collect();
    for tfi in &program.type_family_instances {
        tc.register_type_family_instance(tfi);
    }
    for foreign in &program.foreign {
        tc.values.bind(foreign.name.clone(), foreign.ty.clone());
    }
    for class in &program.classes {
        tc.check_class_defaults(class);
    }

    // Value bindings, then instance bodies (which may call them).
    tc.infer_binds(&program.binds, true);
    let dfuns = tc.check_instance_bodies(&named_instances);

    // Discharge the module's wanteds; whatever survives gets one chance
    // at defaulting before being reported.
    let mut wanteds = std::mem::take(&mut tc.wanteds);
    let mut ev_decls = tc.solve_wanteds(&[], &mut wanteds);
    let residual = std::mem::take(&mut wanteds.simple);
    let (default_decls, leftover) = tc.apply_defaulting(residual);
    ev_decls.append(default_decls);

    for ct in leftover {
        let pred = tc.zonk(&ct.pred);
        let mut metas = Vec::new();
        tc.free_metas(&pred, &mut metas);
        let err = if let Some((lhs, rhs)) = crate::ty::split_equality(&pred) {
            TypeError::Mismatch { expected: lhs, found: rhs }
        } else if metas.is_empty() {
            TypeError::NoInstance { pred }
        } else {
            TypeError::AmbiguousType { pred }
        };
        tc.record_at(err, ct.span);
    }

    // Publish the zonked polytypes of the module's own binders.
    let mut types = FxHashMap::default();
    let mut binders: Vec<Name> = Vec::new();
    for decl in &program.binds.decls {
        binders.extend(decl.binders());
    }
    binders.extend(program.binds.signatures.keys().cloned());
    binders.extend(program.foreign.iter().map(|f| f.name.clone()));
    for name in binders {
        if let Some(ty) = tc.values.lookup(&name).cloned() {
            let ty = tc.zonk(&ty);
            types.insert(name, ty);
        }
    }

    let instances = tc.instances.iter().cloned().collect();
    let poisoned = tc.has_errors();
    TypeckResult {
        types,
        binds: std::mem::take(&mut tc.elab_binds),
        uses: std::mem::take(&mut tc.elab_uses),
        instances,
        dfuns,
        ev_decls,
        errors: tc.errors,
        poisoned,
    }
}
