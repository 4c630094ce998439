//! The typechecker state.
//!
//! One `TypeChecker` value owns everything inference mutates: the arena of
//! unification-variable cells (an `ena` table; cells are written exactly
//! once, empty to filled), the side table of per-variable name/kind/level,
//! the current generalization level, the fresh-name counter, the active
//! wanted-constraint buffer, the scoped note and span stacks, and the
//! error accumulator.
//!
//! A "child" typechecker is not a separate value: subcomputations that must
//! collect their own constraints (generalization, signature checking,
//! instance method checking) swap the wanted buffer out and back via
//! [`TypeChecker::with_child_wanteds`], sharing the cell arena and the
//! fresh-name source with the parent.

use ena::unify::InPlaceUnificationTable;
use larch_common::Span;

use crate::ast::KindEnv;
use crate::constraint::{Ct, Wanteds};
use crate::elab::{GenBind, UseSite};
use crate::env::{ClassEnv, InstanceEnv, ValueEnv};
use crate::error::{Diagnostic, TypeError};
use crate::evidence::EvVar;
use crate::ty::{decompose_apps, split_equality, Kind, TyMeta, TyVar, Type};
use crate::TypeckOptions;

/// Side-table entry for one unification variable.
#[derive(Clone, Debug)]
pub(crate) struct MetaInfo {
    pub name: String,
    pub kind: Kind,
    /// Mutable: promotion lowers it; nothing ever raises it.
    pub level: u32,
}

pub struct TypeChecker {
    pub(crate) table: InPlaceUnificationTable<TyMeta>,
    pub(crate) meta_info: Vec<MetaInfo>,
    /// Current generalization/implication nesting depth.
    pub(crate) level: u32,
    next_uniq: u32,
    pub(crate) values: ValueEnv,
    pub(crate) classes: ClassEnv,
    pub(crate) instances: InstanceEnv,
    pub(crate) kinds: KindEnv,
    pub(crate) wanteds: Wanteds,
    notes: Vec<String>,
    spans: Vec<Span>,
    pub errors: Vec<Diagnostic>,
    pub(crate) options: TypeckOptions,
    /// Elaborated binding groups, in elaboration order (nested lets
    /// included).
    pub(crate) elab_binds: Vec<GenBind>,
    /// Evidence applications at overloaded use sites.
    pub(crate) elab_uses: Vec<UseSite>,
}

impl TypeChecker {
    pub fn new(kinds: KindEnv, options: TypeckOptions) -> TypeChecker {
        TypeChecker {
            table: InPlaceUnificationTable::new(),
            meta_info: Vec::new(),
            level: 0,
            next_uniq: 0,
            values: ValueEnv::new(),
            classes: ClassEnv::new(),
            instances: InstanceEnv::new(),
            kinds: KindEnv::default(),
            wanteds: Wanteds::new(),
            notes: Vec::new(),
            spans: Vec::new(),
            errors: Vec::new(),
            options,
            elab_binds: Vec::new(),
            elab_uses: Vec::new(),
        }
        .with_kinds(kinds)
    }

    fn with_kinds(mut self, kinds: KindEnv) -> TypeChecker {
        self.kinds = kinds;
        self
    }

    // ── Fresh names ─────────────────────────────────────────────────────

    pub(crate) fn fresh_uniq(&mut self) -> u32 {
        let u = self.next_uniq;
        self.next_uniq += 1;
        u
    }

    /// A fresh unification variable at the current level.
    pub(crate) fn fresh_meta(&mut self, kind: Kind) -> TyMeta {
        self.fresh_meta_named("t", kind)
    }

    pub(crate) fn fresh_meta_named(&mut self, name: &str, kind: Kind) -> TyMeta {
        let m = self.table.new_key(None);
        debug_assert_eq!(m.0 as usize, self.meta_info.len());
        self.meta_info.push(MetaInfo {
            name: name.to_string(),
            kind,
            level: self.level,
        });
        m
    }

    /// A fresh unification variable at an explicit level.
    pub(crate) fn fresh_meta_at(&mut self, name: &str, kind: Kind, level: u32) -> TyMeta {
        let m = self.fresh_meta_named(name, kind);
        self.meta_info[m.0 as usize].level = level;
        m
    }

    pub(crate) fn fresh_meta_ty(&mut self, kind: Kind) -> Type {
        Type::Meta(self.fresh_meta(kind))
    }

    /// A fresh rigid (skolem) type variable at the given level.
    pub(crate) fn fresh_ty_var(&mut self, name: &str, level: u32, kind: Kind) -> TyVar {
        TyVar {
            name: name.to_string(),
            uniq: self.fresh_uniq(),
            level: Some(level),
            kind,
        }
    }

    pub(crate) fn fresh_ev_var(&mut self, prefix: &str) -> EvVar {
        let uniq = self.fresh_uniq();
        EvVar::new(prefix, uniq)
    }

    /// A fresh evidence variable named after the predicate it witnesses:
    /// `d<Class>` for dictionary constraints, `co` for equalities.
    pub(crate) fn fresh_dvar(&mut self, pred: &Type) -> EvVar {
        if split_equality(pred).is_some() {
            return self.fresh_ev_var("co");
        }
        let (head, _) = decompose_apps(pred);
        let name = match head {
            Type::Con(tc) => format!("d{}", unqualified(&tc.name)),
            _ => "d".to_string(),
        };
        self.fresh_ev_var(&name)
    }

    // ── Meta-variable cells ─────────────────────────────────────────────

    /// Read a cell. `None` means empty.
    pub(crate) fn probe(&mut self, m: TyMeta) -> Option<Type> {
        self.table.probe_value(m)
    }

    /// Fill a cell. Cells are written exactly once; filling a filled cell
    /// is an internal invariant violation.
    pub(crate) fn fill_meta(&mut self, m: TyMeta, ty: Type) {
        debug_assert!(
            self.table.probe_value(m).is_none(),
            "meta cell ?{} filled twice",
            m.0
        );
        self.table
            .unify_var_value(m, Some(ty))
            .expect("filling an empty meta cell cannot conflict");
    }

    pub(crate) fn meta_level(&self, m: TyMeta) -> u32 {
        self.meta_info[m.0 as usize].level
    }

    pub(crate) fn set_meta_level(&mut self, m: TyMeta, level: u32) {
        self.meta_info[m.0 as usize].level = level;
    }

    pub(crate) fn meta_kind(&self, m: TyMeta) -> Kind {
        self.meta_info[m.0 as usize].kind.clone()
    }

    pub(crate) fn meta_name(&self, m: TyMeta) -> String {
        self.meta_info[m.0 as usize].name.clone()
    }

    // ── Levels ──────────────────────────────────────────────────────────

    pub(crate) fn current_level(&self) -> u32 {
        self.level
    }

    /// Run `f` with the level temporarily set to `level`.
    pub(crate) fn at_level<R>(&mut self, level: u32, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = self.level;
        self.level = level;
        let r = f(self);
        self.level = saved;
        r
    }

    // ── Wanted buffer ───────────────────────────────────────────────────

    /// Emit a wanted constraint into the active buffer.
    pub(crate) fn emit_wanted(&mut self, ct: Ct) {
        self.wanteds.push(ct);
    }

    pub(crate) fn emit_wanteds(&mut self, cts: Vec<Ct>) {
        for ct in cts {
            self.wanteds.push(ct);
        }
    }

    /// Run `f` with a fresh, empty wanted buffer (and, if `bump_level`, one
    /// level deeper), returning the constraints it collected. The cell
    /// arena, environments, and fresh-name source are shared with the
    /// parent throughout.
    pub(crate) fn with_child_wanteds<R>(
        &mut self,
        bump_level: bool,
        f: impl FnOnce(&mut Self) -> R,
    ) -> (R, Wanteds) {
        let saved = std::mem::take(&mut self.wanteds);
        if bump_level {
            self.level += 1;
        }
        let r = f(self);
        if bump_level {
            self.level -= 1;
        }
        let collected = std::mem::replace(&mut self.wanteds, saved);
        (r, collected)
    }

    // ── Notes and spans ─────────────────────────────────────────────────

    /// Run `f` with a context note pushed; the note is popped on every
    /// exit path.
    pub(crate) fn with_note<R>(
        &mut self,
        note: impl Into<String>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        self.notes.push(note.into());
        let r = f(self);
        self.notes.pop();
        r
    }

    /// Run `f` with a source span pushed, if one is available.
    pub(crate) fn with_span<R>(
        &mut self,
        span: Option<Span>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        match span {
            Some(s) => {
                self.spans.push(s);
                let r = f(self);
                self.spans.pop();
                r
            }
            None => f(self),
        }
    }

    pub(crate) fn current_span(&self) -> Option<Span> {
        self.spans.last().copied()
    }

    pub(crate) fn current_notes(&self) -> Vec<String> {
        self.notes.clone()
    }

    // ── Errors ──────────────────────────────────────────────────────────

    /// Record an error at the current span with the current note stack.
    pub(crate) fn record(&mut self, error: TypeError) {
        let span = self.current_span();
        self.record_at(error, span);
    }

    pub(crate) fn record_at(&mut self, error: TypeError, span: Option<Span>) {
        self.errors.push(Diagnostic {
            error,
            span: span.or_else(|| self.current_span()),
            notes: self.notes.clone(),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Strip a module qualifier from a renamed name.
pub(crate) fn unqualified(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tc() -> TypeChecker {
        TypeChecker::new(KindEnv::default(), TypeckOptions::default())
    }

    #[test]
    fn fresh_metas_number_sequentially_at_current_level() {
        let mut tc = tc();
        let a = tc.fresh_meta(Kind::Star);
        tc.level = 2;
        let b = tc.fresh_meta(Kind::Star);
        assert_eq!((a.0, b.0), (0, 1));
        assert_eq!(tc.meta_level(a), 0);
        assert_eq!(tc.meta_level(b), 2);
    }

    #[test]
    fn fill_is_visible_through_probe() {
        let mut tc = tc();
        let m = tc.fresh_meta(Kind::Star);
        assert!(tc.probe(m).is_none());
        tc.fill_meta(m, Type::int());
        assert_eq!(tc.probe(m), Some(Type::int()));
    }

    #[test]
    fn child_wanteds_do_not_leak_into_parent() {
        let mut tc = tc();
        let ((), inner) = tc.with_child_wanteds(true, |tc| {
            assert_eq!(tc.current_level(), 1);
            let ev = tc.fresh_ev_var("d");
            tc.emit_wanted(Ct::new(ev, Type::int()));
        });
        assert_eq!(inner.simple.len(), 1);
        assert!(tc.wanteds.is_empty());
        assert_eq!(tc.current_level(), 0);
    }

    #[test]
    fn dvar_names_follow_the_predicate_head() {
        let mut tc = tc();
        let pred = Type::apply(Type::con("Prelude.Num", Kind::n_args(1)), vec![Type::int()]);
        let d = tc.fresh_dvar(&pred);
        assert_eq!(d.name, "dNum");
        let co = tc.fresh_dvar(&Type::equality(Type::int(), Type::int()));
        assert_eq!(co.name, "co");
    }

    #[test]
    fn notes_pop_on_exit() {
        let mut tc = tc();
        tc.with_note("In function `f`", |tc| {
            tc.record(TypeError::UnboundVariable { name: "x".into() });
        });
        tc.record(TypeError::UnboundVariable { name: "y".into() });
        assert_eq!(tc.errors[0].notes, vec!["In function `f`".to_string()]);
        assert!(tc.errors[1].notes.is_empty());
    }
}
