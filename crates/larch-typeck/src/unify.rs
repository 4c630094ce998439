//! Unification: equality of types modulo filled cells.
//!
//! `follow` walks through filled unification variables; `unify` produces a
//! sequence of cell fillings and never touches rigid variables. Filling is
//! level-disciplined: a variable at level `l` is only ever filled with a
//! term whose unification variables sit at `l` or shallower, promoting
//! deeper ones first. Type-family applications do not decompose; equalities
//! involving them are deferred to the constraint solver.

use tracing::trace;

use crate::constraint::Ct;
use crate::error::TypeError;
use crate::tc::TypeChecker;
use crate::ty::{decompose_apps, TyMeta, TyVar, Type};

/// Why unification failed.
#[derive(Clone, Debug)]
pub enum UnifyError {
    Mismatch(Type, Type),
    Occurs(TyMeta, Type),
    /// A rigid variable of a deeper level would leak into a shallower cell.
    Escape(TyVar, Type),
}

impl TypeChecker {
    // ── Following filled cells ──────────────────────────────────────────

    /// Walk through filled cells until reaching an empty variable or a
    /// non-variable head. The result's outermost constructor is never a
    /// filled cell.
    pub(crate) fn follow(&mut self, mut ty: Type) -> Type {
        while let Type::Meta(m) = ty {
            match self.probe(m) {
                Some(inner) => ty = inner,
                None => return Type::Meta(m),
            }
        }
        ty
    }

    /// Deeply resolve a type: every filled cell replaced by its content.
    pub(crate) fn zonk(&mut self, ty: &Type) -> Type {
        let t = self.follow(ty.clone());
        match t {
            Type::Var(_) | Type::Meta(_) | Type::Con(_) => t,
            Type::App(a, b) => {
                Type::App(Box::new(self.zonk(&a)), Box::new(self.zonk(&b)))
            }
            Type::Tuple(ts) => {
                Type::Tuple(ts.iter().map(|t| self.zonk(t)).collect())
            }
            Type::List(t) => Type::List(Box::new(self.zonk(&t))),
            Type::StrictLazy(s, t) => Type::StrictLazy(s, Box::new(self.zonk(&t))),
            Type::Forall(vs, body) => Type::Forall(vs, Box::new(self.zonk(&body))),
            Type::Constrained(ps, body) => Type::Constrained(
                ps.iter().map(|p| self.zonk(p)).collect(),
                Box::new(self.zonk(&body)),
            ),
        }
    }

    /// Decompose into head and arguments, following filled cells at every
    /// application head and canonicalizing list/tuple normal forms.
    pub(crate) fn decompose(&mut self, ty: &Type) -> (Type, Vec<Type>) {
        let t = self.follow(ty.clone());
        match t {
            Type::App(_, _) => {
                let mut args = Vec::new();
                let mut t = t;
                loop {
                    match t {
                        Type::App(head, arg) => {
                            args.push(*arg);
                            t = self.follow(*head);
                        }
                        other => {
                            args.reverse();
                            return (other, args);
                        }
                    }
                }
            }
            other => decompose_apps(&other),
        }
    }

    /// Whether the head of `ty` is a type-family constructor.
    pub(crate) fn is_family_app(&mut self, ty: &Type) -> bool {
        let (head, args) = self.decompose(ty);
        match head {
            Type::Con(tc) => !args.is_empty() && self.kinds.is_family(&tc.name),
            _ => false,
        }
    }

    // ── Occurs check and free variables ─────────────────────────────────

    /// True iff `m` appears (through filled cells) in `ty`.
    pub(crate) fn occurs(&mut self, m: TyMeta, ty: &Type) -> bool {
        match self.follow(ty.clone()) {
            Type::Meta(m2) => m == m2,
            Type::Var(_) | Type::Con(_) => false,
            Type::App(a, b) => self.occurs(m, &a) || self.occurs(m, &b),
            Type::Tuple(ts) => ts.iter().any(|t| self.occurs(m, t)),
            Type::List(t) | Type::StrictLazy(_, t) => self.occurs(m, &t),
            Type::Forall(_, body) => self.occurs(m, &body),
            Type::Constrained(ps, body) => {
                ps.iter().any(|p| self.occurs(m, p)) || self.occurs(m, &body)
            }
        }
    }

    /// Collect the unfilled unification variables of a type, in first-seen
    /// order.
    pub(crate) fn free_metas(&mut self, ty: &Type, out: &mut Vec<TyMeta>) {
        match self.follow(ty.clone()) {
            Type::Meta(m) => {
                if !out.contains(&m) {
                    out.push(m);
                }
            }
            Type::Var(_) | Type::Con(_) => {}
            Type::App(a, b) => {
                self.free_metas(&a, out);
                self.free_metas(&b, out);
            }
            Type::Tuple(ts) => ts.iter().for_each(|t| self.free_metas(t, out)),
            Type::List(t) | Type::StrictLazy(_, t) => self.free_metas(&t, out),
            Type::Forall(_, body) => self.free_metas(&body, out),
            Type::Constrained(ps, body) => {
                ps.iter().for_each(|p| self.free_metas(p, out));
                self.free_metas(&body, out);
            }
        }
    }

    /// Collect the free skolems of a type through filled cells.
    pub(crate) fn free_skolems(&mut self, ty: &Type, out: &mut Vec<TyVar>) {
        match self.follow(ty.clone()) {
            Type::Var(v) => {
                if v.is_skolem() && !out.contains(&v) {
                    out.push(v);
                }
            }
            Type::Meta(_) | Type::Con(_) => {}
            Type::App(a, b) => {
                self.free_skolems(&a, out);
                self.free_skolems(&b, out);
            }
            Type::Tuple(ts) => ts.iter().for_each(|t| self.free_skolems(t, out)),
            Type::List(t) | Type::StrictLazy(_, t) => self.free_skolems(&t, out),
            Type::Forall(vs, body) => {
                let mut inner = Vec::new();
                self.free_skolems(&body, &mut inner);
                for v in inner {
                    if !vs.contains(&v) && !out.contains(&v) {
                        out.push(v);
                    }
                }
            }
            Type::Constrained(ps, body) => {
                ps.iter().for_each(|p| self.free_skolems(p, out));
                self.free_skolems(&body, out);
            }
        }
    }

    /// The deepest unification-variable level occurring in a type.
    pub(crate) fn max_meta_level(&mut self, ty: &Type) -> u32 {
        let mut metas = Vec::new();
        self.free_metas(ty, &mut metas);
        metas.iter().map(|m| self.meta_level(*m)).max().unwrap_or(0)
    }

    // ── Promotion ───────────────────────────────────────────────────────

    /// Lower `m`'s level to `level` if it is deeper; if filled, promote the
    /// content instead.
    pub(crate) fn promote_meta(&mut self, m: TyMeta, level: u32) -> Result<(), UnifyError> {
        match self.probe(m) {
            Some(inner) => self.promote_type(&inner, level),
            None => {
                if self.meta_level(m) > level {
                    self.set_meta_level(m, level);
                }
                Ok(())
            }
        }
    }

    /// Promote every unification variable in `ty` to at most `level`.
    /// A rigid skolem deeper than `level` cannot be promoted; it would
    /// escape its scope.
    pub(crate) fn promote_type(&mut self, ty: &Type, level: u32) -> Result<(), UnifyError> {
        match self.follow(ty.clone()) {
            Type::Meta(m) => self.promote_meta(m, level),
            Type::Var(v) => {
                if v.level() > level {
                    Err(UnifyError::Escape(v, ty.clone()))
                } else {
                    Ok(())
                }
            }
            Type::Con(_) => Ok(()),
            Type::App(a, b) => {
                self.promote_type(&a, level)?;
                self.promote_type(&b, level)
            }
            Type::Tuple(ts) => {
                for t in &ts {
                    self.promote_type(t, level)?;
                }
                Ok(())
            }
            Type::List(t) | Type::StrictLazy(_, t) => self.promote_type(&t, level),
            Type::Forall(_, body) => self.promote_type(&body, level),
            Type::Constrained(ps, body) => {
                for p in &ps {
                    self.promote_type(p, level)?;
                }
                self.promote_type(&body, level)
            }
        }
    }

    // ── Unification ─────────────────────────────────────────────────────

    /// First-order unification. On success, returns the equalities that
    /// were deferred because a type-family application blocks structural
    /// decomposition; the caller turns those into wanted constraints.
    pub(crate) fn unify(&mut self, a: &Type, b: &Type) -> Result<Vec<(Type, Type)>, UnifyError> {
        let mut deferred = Vec::new();
        self.unify_inner(a, b, &mut deferred)?;
        Ok(deferred)
    }

    fn unify_inner(
        &mut self,
        a: &Type,
        b: &Type,
        deferred: &mut Vec<(Type, Type)>,
    ) -> Result<(), UnifyError> {
        let a = self.follow(a.clone());
        let b = self.follow(b.clone());
        trace!(a = %a, b = %b, "unify");

        // A family application on either side blocks decomposition.
        if self.is_family_app(&a) || self.is_family_app(&b) {
            if self.same_type(&a, &b) {
                return Ok(());
            }
            deferred.push((a, b));
            return Ok(());
        }

        match (a, b) {
            (Type::Meta(m1), Type::Meta(m2)) if m1 == m2 => Ok(()),
            // Two empty cells: the smaller id becomes the representative,
            // at the shallower of the two levels.
            (Type::Meta(m1), Type::Meta(m2)) => {
                let (keep, fill) = if m1.0 < m2.0 { (m1, m2) } else { (m2, m1) };
                let level = self.meta_level(keep).min(self.meta_level(fill));
                self.set_meta_level(keep, level);
                self.fill_meta(fill, Type::Meta(keep));
                Ok(())
            }
            (Type::Meta(m), t) | (t, Type::Meta(m)) => {
                if self.occurs(m, &t) {
                    let z = self.zonk(&t);
                    return Err(UnifyError::Occurs(m, z));
                }
                self.promote_type(&t, self.meta_level(m))?;
                self.fill_meta(m, t);
                Ok(())
            }
            (Type::Var(v1), Type::Var(v2)) if v1 == v2 => Ok(()),
            (Type::StrictLazy(_, t1), t2) => self.unify_inner(&t1, &t2, deferred),
            (t1, Type::StrictLazy(_, t2)) => self.unify_inner(&t1, &t2, deferred),
            (Type::Con(c1), Type::Con(c2)) if c1 == c2 => Ok(()),
            (Type::List(e1), Type::List(e2)) => self.unify_inner(&e1, &e2, deferred),
            (Type::Tuple(e1), Type::Tuple(e2)) if e1.len() == e2.len() => {
                for (x, y) in e1.iter().zip(e2.iter()) {
                    self.unify_inner(x, y, deferred)?;
                }
                Ok(())
            }
            (Type::App(f, x), Type::App(g, y)) => {
                self.unify_inner(&f, &g, deferred)?;
                self.unify_inner(&x, &y, deferred)
            }
            // A normal form against an application: canonicalize and retry.
            (nf @ (Type::List(_) | Type::Tuple(_)), app @ Type::App(_, _))
            | (app @ Type::App(_, _), nf @ (Type::List(_) | Type::Tuple(_))) => {
                let (head, args) = decompose_apps(&nf);
                self.unify_inner(&Type::apply(head, args), &app, deferred)
            }
            (a, b) => {
                let (za, zb) = (self.zonk(&a), self.zonk(&b));
                Err(UnifyError::Mismatch(za, zb))
            }
        }
    }

    /// Unify and report: mismatches and occurs failures are recorded as
    /// diagnostics; family-blocked equalities become wanted constraints.
    /// Returns false when an error was recorded.
    pub(crate) fn unify_emit(&mut self, a: &Type, b: &Type) -> bool {
        match self.unify(a, b) {
            Ok(deferred) => {
                for (lhs, rhs) in deferred {
                    let pred = Type::equality(lhs, rhs);
                    let co = self.fresh_dvar(&pred);
                    let span = self.current_span();
                    self.emit_wanted(Ct::with_span(co, pred, span));
                }
                true
            }
            Err(e) => {
                self.record_unify_error(e);
                false
            }
        }
    }

    pub(crate) fn record_unify_error(&mut self, e: UnifyError) {
        let err = match e {
            UnifyError::Mismatch(expected, found) => TypeError::Mismatch { expected, found },
            UnifyError::Occurs(var, ty) => TypeError::OccursCheck { var, ty },
            UnifyError::Escape(var, ty) => {
                let pred = self.zonk(&ty);
                TypeError::EscapingSkolem { var, pred }
            }
        };
        self.record(err);
    }

    // ── One-way matching ────────────────────────────────────────────────

    /// One-way match: only unification variables on the pattern side may be
    /// bound. Used by instance lookup, where the pattern is a freshly
    /// instantiated instance head, so fills left behind by a failed match
    /// touch nothing but throwaway variables.
    pub(crate) fn maybe_match(&mut self, pat: &Type, target: &Type) -> bool {
        let p = self.follow(pat.clone());
        let t = self.follow(target.clone());
        match (p, t) {
            (Type::Meta(m1), Type::Meta(m2)) if m1 == m2 => true,
            (Type::Meta(m), t) => {
                if self.occurs(m, &t) {
                    false
                } else {
                    self.fill_meta(m, t);
                    true
                }
            }
            (Type::Var(v1), Type::Var(v2)) => v1 == v2,
            (Type::Con(c1), Type::Con(c2)) => c1 == c2,
            (Type::List(e1), Type::List(e2)) => self.maybe_match(&e1, &e2),
            (Type::Tuple(e1), Type::Tuple(e2)) if e1.len() == e2.len() => e1
                .iter()
                .zip(e2.iter())
                .all(|(x, y)| self.maybe_match_pair(x, y)),
            (Type::App(f, x), Type::App(g, y)) => {
                self.maybe_match(&f, &g) && self.maybe_match(&x, &y)
            }
            (nf @ (Type::List(_) | Type::Tuple(_)), app @ Type::App(_, _)) => {
                let (head, args) = decompose_apps(&nf);
                self.maybe_match(&Type::apply(head, args), &app)
            }
            (app @ Type::App(_, _), nf @ (Type::List(_) | Type::Tuple(_))) => {
                let (head, args) = decompose_apps(&nf);
                self.maybe_match(&app, &Type::apply(head, args))
            }
            _ => false,
        }
    }

    fn maybe_match_pair(&mut self, a: &Type, b: &Type) -> bool {
        self.maybe_match(a, b)
    }

    // ── Semantic equality ───────────────────────────────────────────────

    /// Structural equality modulo filled cells and alpha-renaming of
    /// foralls. This is the only place foralls are compared.
    pub(crate) fn same_type(&mut self, a: &Type, b: &Type) -> bool {
        self.same_type_env(a, b, &mut Vec::new())
    }

    fn same_type_env(
        &mut self,
        a: &Type,
        b: &Type,
        pairs: &mut Vec<(TyVar, TyVar)>,
    ) -> bool {
        let a = self.follow(a.clone());
        let b = self.follow(b.clone());
        match (a, b) {
            (Type::Meta(m1), Type::Meta(m2)) => m1 == m2,
            (Type::Var(v1), Type::Var(v2)) => {
                for (l, r) in pairs.iter().rev() {
                    if *l == v1 || *r == v2 {
                        return *l == v1 && *r == v2;
                    }
                }
                v1 == v2
            }
            (Type::Con(c1), Type::Con(c2)) => c1 == c2,
            (Type::StrictLazy(s1, t1), Type::StrictLazy(s2, t2)) => {
                s1 == s2 && self.same_type_env(&t1, &t2, pairs)
            }
            (Type::List(e1), Type::List(e2)) => self.same_type_env(&e1, &e2, pairs),
            (Type::Tuple(e1), Type::Tuple(e2)) => {
                e1.len() == e2.len()
                    && e1
                        .iter()
                        .zip(e2.iter())
                        .all(|(x, y)| self.same_pair(x, y, pairs))
            }
            (Type::App(f, x), Type::App(g, y)) => {
                self.same_type_env(&f, &g, pairs) && self.same_type_env(&x, &y, pairs)
            }
            (nf @ (Type::List(_) | Type::Tuple(_)), app @ Type::App(_, _))
            | (app @ Type::App(_, _), nf @ (Type::List(_) | Type::Tuple(_))) => {
                let (head, args) = decompose_apps(&nf);
                self.same_type_env(&Type::apply(head, args), &app, pairs)
            }
            (Type::Forall(vs1, b1), Type::Forall(vs2, b2)) => {
                if vs1.len() != vs2.len() {
                    return false;
                }
                let n = pairs.len();
                pairs.extend(vs1.iter().cloned().zip(vs2.iter().cloned()));
                let r = self.same_type_env(&b1, &b2, pairs);
                pairs.truncate(n);
                r
            }
            (Type::Constrained(p1, b1), Type::Constrained(p2, b2)) => {
                p1.len() == p2.len()
                    && p1
                        .iter()
                        .zip(p2.iter())
                        .all(|(x, y)| self.same_pair(x, y, pairs))
                    && self.same_type_env(&b1, &b2, pairs)
            }
            _ => false,
        }
    }

    fn same_pair(&mut self, a: &Type, b: &Type, pairs: &mut Vec<(TyVar, TyVar)>) -> bool {
        self.same_type_env(a, b, pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::KindEnv;
    use crate::ty::Kind;
    use crate::TypeckOptions;

    fn tc() -> TypeChecker {
        TypeChecker::new(KindEnv::default(), TypeckOptions::default())
    }

    #[test]
    fn unify_two_fresh_vars_then_fill() {
        let mut tc = tc();
        let a = tc.fresh_meta_ty(Kind::Star);
        let b = tc.fresh_meta_ty(Kind::Star);
        assert!(tc.unify(&a, &b).is_ok());
        assert!(tc.unify(&a, &Type::int()).is_ok());
        assert_eq!(tc.zonk(&a), Type::int());
        assert_eq!(tc.zonk(&b), Type::int());
    }

    #[test]
    fn var_var_unify_keeps_smaller_id_and_shallower_level() {
        let mut tc = tc();
        let a = tc.fresh_meta(Kind::Star);
        tc.level = 3;
        let b = tc.fresh_meta(Kind::Star);
        tc.level = 0;
        assert!(tc.unify(&Type::Meta(a), &Type::Meta(b)).is_ok());
        // b's cell now points at a, and a kept the shallower level.
        assert_eq!(tc.follow(Type::Meta(b)), Type::Meta(a));
        assert_eq!(tc.meta_level(a), 0);
    }

    #[test]
    fn filling_promotes_deeper_metas() {
        let mut tc = tc();
        let outer = tc.fresh_meta(Kind::Star);
        tc.level = 2;
        let inner = tc.fresh_meta(Kind::Star);
        tc.level = 0;
        // outer := [inner] forces inner down to outer's level.
        let r = tc.unify(&Type::Meta(outer), &Type::list(Type::Meta(inner)));
        assert!(r.is_ok());
        assert_eq!(tc.meta_level(inner), 0);
    }

    #[test]
    fn occurs_check_rejects_infinite_type() {
        let mut tc = tc();
        let a = tc.fresh_meta_ty(Kind::Star);
        let arrow = Type::arrow(a.clone(), Type::int());
        match tc.unify(&a, &arrow) {
            Err(UnifyError::Occurs(_, _)) => {}
            other => panic!("expected occurs failure, got {:?}", other),
        }
    }

    #[test]
    fn rigid_vars_never_unify_with_different_rigids() {
        let mut tc = tc();
        let a = Type::Var(tc.fresh_ty_var("a", 1, Kind::Star));
        let b = Type::Var(tc.fresh_ty_var("b", 1, Kind::Star));
        assert!(tc.unify(&a, &a.clone()).is_ok());
        assert!(matches!(tc.unify(&a, &b), Err(UnifyError::Mismatch(_, _))));
        assert!(matches!(
            tc.unify(&a, &Type::int()),
            Err(UnifyError::Mismatch(_, _))
        ));
    }

    #[test]
    fn list_normal_form_unifies_with_constructor_application() {
        let mut tc = tc();
        let canon = Type::apply(
            Type::Con(crate::ty::TyCon::list()),
            vec![Type::int()],
        );
        assert!(tc.unify(&Type::list(Type::int()), &canon).is_ok());
    }

    #[test]
    fn skolem_escape_is_detected_on_fill() {
        let mut tc = tc();
        let outer = tc.fresh_meta(Kind::Star); // level 0
        let sk = tc.fresh_ty_var("a", 2, Kind::Star);
        match tc.unify(&Type::Meta(outer), &Type::list(Type::Var(sk))) {
            Err(UnifyError::Escape(_, _)) => {}
            other => panic!("expected skolem escape, got {:?}", other),
        }
    }

    #[test]
    fn maybe_match_binds_only_pattern_side() {
        let mut tc = tc();
        let pat_var = tc.fresh_meta_ty(Kind::Star);
        let target_var = tc.fresh_meta_ty(Kind::Star);

        // Pattern [p] against [Int] binds p.
        assert!(tc.maybe_match(&Type::list(pat_var.clone()), &Type::list(Type::int())));
        assert_eq!(tc.zonk(&pat_var), Type::int());

        // Pattern Int against an unbound target variable must not bind it.
        assert!(!tc.maybe_match(&Type::int(), &target_var));
        assert!(tc.probe(match target_var {
            Type::Meta(m) => m,
            _ => unreachable!(),
        })
        .is_none());
    }

    #[test]
    fn same_type_is_alpha_equivalence_on_foralls() {
        let mut tc = tc();
        let a = tc.fresh_ty_var("a", 1, Kind::Star);
        let b = tc.fresh_ty_var("b", 1, Kind::Star);
        let id_a = Type::Forall(
            vec![a.clone()],
            Box::new(Type::arrow(Type::Var(a.clone()), Type::Var(a))),
        );
        let id_b = Type::Forall(
            vec![b.clone()],
            Box::new(Type::arrow(Type::Var(b.clone()), Type::Var(b))),
        );
        assert!(tc.same_type(&id_a, &id_b));

        let c = tc.fresh_ty_var("c", 1, Kind::Star);
        let const_c = Type::Forall(
            vec![c.clone()],
            Box::new(Type::arrow(Type::Var(c), Type::int())),
        );
        assert!(!tc.same_type(&id_a, &const_c));
    }

    #[test]
    fn follow_is_idempotent() {
        let mut tc = tc();
        let a = tc.fresh_meta(Kind::Star);
        let b = tc.fresh_meta(Kind::Star);
        tc.fill_meta(a, Type::Meta(b));
        tc.fill_meta(b, Type::bool());
        let once = tc.follow(Type::Meta(a));
        let twice = tc.follow(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once, Type::bool());
    }
}
