//! Bidirectional constraint generation.
//!
//! `check_expr` pushes an expected type inward; `infer_expr` synthesizes
//! one. Both walk the renamed core and emit wanted predicates into the
//! active buffer: class constraints at overloaded use sites and literals,
//! equalities where a type-family application blocks unification, and
//! implications where a signature brings its own skolems and givens.

use tracing::trace;

use crate::ast::{Clause, Expr, ExprKind, Lit, Name, Pat, PatKind};
use crate::constraint::{Ct, Implication, Wanteds};
use crate::elab::UseSite;
use crate::error::TypeError;
use crate::evidence::{shared_ev_decls, SharedEvDecls, Wrapper};
use crate::tc::TypeChecker;
use crate::ty::{Kind, TyVar, Type};
use larch_common::Span;

impl TypeChecker {
    // ── Expressions ─────────────────────────────────────────────────────

    /// Synthesize a type for an expression.
    pub(crate) fn infer_expr(&mut self, e: &Expr) -> Type {
        self.with_span(e.span, |tc| tc.infer_expr_kind(&e.kind))
    }

    fn infer_expr_kind(&mut self, kind: &ExprKind) -> Type {
        match kind {
            ExprKind::Var(name) => self.infer_var(name),
            ExprKind::Lit(lit) => self.infer_lit(lit, false),
            ExprKind::App(f, arg) => {
                let fun_ty = self.infer_expr(f);
                match self.match_fun_ty(&fun_ty) {
                    Some((arg_ty, res_ty)) => {
                        self.check_expr(arg, &arg_ty);
                        res_ty
                    }
                    None => {
                        self.infer_expr(arg);
                        self.fresh_meta_ty(Kind::Star)
                    }
                }
            }
            ExprKind::Lam(pats, body) => {
                self.values.enter_frame();
                let arg_tys: Vec<Type> =
                    pats.iter().map(|p| self.infer_pat_bind(p)).collect();
                let body_ty = self.infer_expr(body);
                self.values.exit_frame();
                Type::function(arg_tys, body_ty)
            }
            ExprKind::Case(scrut, alts) => {
                let scrut_ty = self.infer_expr(scrut);
                let res_ty = self.fresh_meta_ty(Kind::Star);
                self.check_alts(alts, &scrut_ty, &res_ty);
                res_ty
            }
            ExprKind::Let(binds, body) => {
                self.values.enter_frame();
                self.infer_binds(binds, false);
                let ty = self.infer_expr(body);
                self.values.exit_frame();
                ty
            }
            ExprKind::Tuple(es) => {
                Type::Tuple(es.iter().map(|e| self.infer_expr(e)).collect())
            }
            ExprKind::List(es) => {
                let elem = self.fresh_meta_ty(Kind::Star);
                for e in es {
                    self.check_expr(e, &elem);
                }
                Type::list(elem)
            }
            ExprKind::Ann(e, sigma) => {
                self.check_sigma(e, sigma);
                let (_, _, body) = self.instantiate_emit(sigma);
                body
            }
        }
    }

    /// Check an expression against an expected rho-type.
    pub(crate) fn check_expr(&mut self, e: &Expr, expected: &Type) {
        self.with_span(e.span, |tc| tc.check_expr_kind(&e.kind, expected))
    }

    fn check_expr_kind(&mut self, kind: &ExprKind, expected: &Type) {
        trace!(expected = %expected, "check");
        match kind {
            ExprKind::Lam(pats, body) => {
                self.values.enter_frame();
                let mut res_ty = expected.clone();
                let mut ok = true;
                for pat in pats {
                    match self.match_fun_ty(&res_ty) {
                        Some((arg_ty, rest)) => {
                            self.check_pat_bind(pat, &arg_ty);
                            res_ty = rest;
                        }
                        None => {
                            ok = false;
                            break;
                        }
                    }
                }
                if ok {
                    self.check_expr(body, &res_ty);
                }
                self.values.exit_frame();
            }
            ExprKind::Case(scrut, alts) => {
                let scrut_ty = self.infer_expr(scrut);
                self.check_alts(alts, &scrut_ty, expected);
            }
            ExprKind::Let(binds, body) => {
                self.values.enter_frame();
                self.infer_binds(binds, false);
                self.check_expr(body, expected);
                self.values.exit_frame();
            }
            ExprKind::Ann(e, sigma) => {
                self.check_sigma(e, sigma);
                let (_, _, body) = self.instantiate_emit(sigma);
                self.unify_emit(&body, expected);
            }
            other => {
                let found = self.infer_expr_kind(other);
                self.unify_emit(&found, expected);
            }
        }
    }

    fn infer_var(&mut self, name: &Name) -> Type {
        let polytype = match self.values.lookup(name) {
            Some(ty) => ty.clone(),
            None => {
                self.record(TypeError::UnboundVariable { name: name.clone() });
                return self.fresh_meta_ty(Kind::Star);
            }
        };
        let (_, evs, body) = self.instantiate_emit(&polytype);
        if !evs.is_empty() {
            let span = self.current_span();
            self.elab_uses.push(UseSite { name: name.clone(), span, ev_args: evs });
        }
        body
    }

    /// The type of a literal, emitting its class wanted. In pattern
    /// position, matching additionally requires equality on the type.
    fn infer_lit(&mut self, lit: &Lit, in_pattern: bool) -> Type {
        let (class, name) = match lit {
            Lit::Int(_) => ("Num", "n"),
            Lit::Rational(_) => ("Fractional", "f"),
            Lit::Str(_) => ("IsString", "s"),
            Lit::Char(_) => return Type::char(),
        };
        let ty = Type::Meta(self.fresh_meta_named(name, Kind::Star));
        self.emit_class_wanted(class, &ty);
        if in_pattern {
            self.emit_class_wanted("Eq", &ty);
        }
        ty
    }

    pub(crate) fn emit_class_wanted(&mut self, class: &str, ty: &Type) {
        let pred = Type::apply(
            Type::con(class, Kind::n_args(1)),
            vec![ty.clone()],
        );
        let ev = self.fresh_dvar(&pred);
        let span = self.current_span();
        self.emit_wanted(Ct::with_span(ev, pred, span));
    }

    /// Split a function type into argument and result, unifying a bare
    /// unification variable with a fresh arrow at that variable's level.
    pub(crate) fn match_fun_ty(&mut self, fun_ty: &Type) -> Option<(Type, Type)> {
        let t = self.follow(fun_ty.clone());
        if let Type::Meta(m) = t {
            let level = self.meta_level(m);
            let arg = Type::Meta(self.fresh_meta_at("arg", Kind::Star, level));
            let res = Type::Meta(self.fresh_meta_at("res", Kind::Star, level));
            self.fill_meta(m, Type::arrow(arg.clone(), res.clone()));
            return Some((arg, res));
        }
        let (head, args) = self.decompose(&t);
        if let Type::Con(ref con) = head {
            if con.name == "->" && args.len() == 2 {
                let mut it = args.into_iter();
                return Some((it.next().unwrap(), it.next().unwrap()));
            }
        }
        let z = self.zonk(&t);
        self.record(TypeError::NotAFunction { ty: z });
        None
    }

    fn check_alts(&mut self, alts: &[(Pat, Expr)], scrut_ty: &Type, res_ty: &Type) {
        for (pat, rhs) in alts {
            self.values.enter_frame();
            self.check_pat_bind(pat, scrut_ty);
            self.check_expr(rhs, res_ty);
            self.values.exit_frame();
        }
    }

    // ── Patterns ────────────────────────────────────────────────────────

    /// Infer a type for a pattern, binding its variables in the current
    /// scope.
    pub(crate) fn infer_pat_bind(&mut self, pat: &Pat) -> Type {
        let ty = self.fresh_meta_ty(Kind::Star);
        self.check_pat_bind(pat, &ty);
        ty
    }

    /// Check a pattern against an expected type, binding its variables in
    /// the current scope.
    pub(crate) fn check_pat_bind(&mut self, pat: &Pat, expected: &Type) {
        let mut binds = Vec::new();
        self.check_pat(pat, expected, &mut binds);
        for (name, ty) in binds {
            self.values.bind(name, ty);
        }
    }

    /// Check a pattern, collecting its bindings.
    pub(crate) fn check_pat(
        &mut self,
        pat: &Pat,
        expected: &Type,
        binds: &mut Vec<(Name, Type)>,
    ) {
        self.with_span(pat.span, |tc| tc.check_pat_kind(&pat.kind, expected, binds))
    }

    fn check_pat_kind(
        &mut self,
        kind: &PatKind,
        expected: &Type,
        binds: &mut Vec<(Name, Type)>,
    ) {
        match kind {
            PatKind::Var(name) => binds.push((name.clone(), expected.clone())),
            PatKind::Wild => {}
            PatKind::As(name, inner) => {
                binds.push((name.clone(), expected.clone()));
                self.check_pat(inner, expected, binds);
            }
            PatKind::Lazy(inner) => self.check_pat(inner, expected, binds),
            PatKind::Lit(lit) => {
                let ty = self.infer_lit(lit, true);
                self.unify_emit(&ty, expected);
            }
            PatKind::Tuple(pats) => {
                let elem_tys: Vec<Type> =
                    pats.iter().map(|_| self.fresh_meta_ty(Kind::Star)).collect();
                self.unify_emit(&Type::Tuple(elem_tys.clone()), expected);
                for (p, t) in pats.iter().zip(elem_tys.iter()) {
                    self.check_pat(p, t, binds);
                }
            }
            PatKind::List(pats) => {
                let elem = self.fresh_meta_ty(Kind::Star);
                self.unify_emit(&Type::list(elem.clone()), expected);
                for p in pats {
                    self.check_pat(p, &elem, binds);
                }
            }
            PatKind::Con(con, pats) => {
                let con_poly = match self.values.lookup(con) {
                    Some(ty) => ty.clone(),
                    None => {
                        self.record(TypeError::UnboundVariable { name: con.clone() });
                        for p in pats {
                            let t = self.fresh_meta_ty(Kind::Star);
                            self.check_pat(p, &t, binds);
                        }
                        return;
                    }
                };
                // Existential contexts surface as wanteds here.
                let (_, wanteds, mut con_ty) = self.instantiate(&con_poly);
                self.emit_wanteds(wanteds);

                let mut field_tys = Vec::new();
                for _ in 0..pats.len() {
                    match self.match_fun_ty(&con_ty) {
                        Some((arg, res)) => {
                            field_tys.push(arg);
                            con_ty = res;
                        }
                        None => return,
                    }
                }
                self.unify_emit(&con_ty, expected);
                for (p, t) in pats.iter().zip(field_tys.iter()) {
                    self.check_pat(p, t, binds);
                }
            }
        }
    }

    // ── Clauses and signatures ──────────────────────────────────────────

    /// Check every clause of a function against its (mono or rho) type.
    pub(crate) fn check_clauses(&mut self, name: &Name, clauses: &[Clause], fn_ty: &Type) {
        let arity = clauses.first().map(|c| c.pats.len()).unwrap_or(0);
        for clause in clauses {
            if clause.pats.len() != arity {
                self.record(TypeError::ClauseArityMismatch {
                    name: name.clone(),
                    expected: arity,
                    found: clause.pats.len(),
                });
                return;
            }
        }

        let mut arg_tys = Vec::new();
        let mut res_ty = fn_ty.clone();
        for _ in 0..arity {
            match self.match_fun_ty(&res_ty) {
                Some((arg, res)) => {
                    arg_tys.push(arg);
                    res_ty = res;
                }
                None => return,
            }
        }

        for clause in clauses {
            self.with_note(format!("In an equation for `{}`", name), |tc| {
                tc.values.enter_frame();
                for (pat, ty) in clause.pats.iter().zip(arg_tys.iter()) {
                    tc.check_pat_bind(pat, ty);
                }
                tc.check_expr(&clause.rhs, &res_ty);
                tc.values.exit_frame();
            });
        }
    }

    /// Check an expression against a polytype: deep-skolemize, check the
    /// rho body one level in, and emit an implication capturing whatever
    /// the body wanted. Returns the generalization wrapper.
    pub(crate) fn check_sigma(&mut self, e: &Expr, sigma: &Type) -> Wrapper {
        let ((wrap, skolems, givens), wanteds) = self.with_child_wanteds(true, |tc| {
            let (wrap, skolems, givens, rho) = tc.skolemize(sigma, true);
            tc.check_expr(e, &rho);
            (wrap, skolems, givens)
        });
        let ev_decls = shared_ev_decls();
        self.emit_implication(skolems, givens, wanteds, ev_decls, e.span);
        wrap
    }

    /// Attach an implication to the active buffer, or merge its wanteds
    /// when it binds neither skolems nor givens.
    pub(crate) fn emit_implication(
        &mut self,
        skolems: Vec<TyVar>,
        givens: Vec<Ct>,
        wanteds: Wanteds,
        ev_decls: SharedEvDecls,
        span: Option<Span>,
    ) {
        if skolems.is_empty() && givens.is_empty() {
            self.wanteds.append(wanteds);
        } else if !wanteds.is_empty() {
            let level = self.current_level() + 1;
            let notes = self.current_notes();
            self.wanteds.implications.push(Implication {
                level,
                skolems,
                givens,
                wanteds,
                ev_decls,
                span,
                notes,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::KindEnv;
    use crate::ty::split_arrow;
    use crate::TypeckOptions;

    fn tc() -> TypeChecker {
        TypeChecker::new(KindEnv::default(), TypeckOptions::default())
    }

    #[test]
    fn lambda_infers_an_arrow() {
        let mut tc = tc();
        // \x -> x
        let e = Expr::lam(vec![Pat::var("x")], Expr::var("x"));
        let ty = tc.infer_expr(&e);
        let (arg, res) = split_arrow(&tc.zonk(&ty)).unwrap();
        assert_eq!(arg, res);
        assert!(tc.errors.is_empty());
    }

    #[test]
    fn application_propagates_argument_types() {
        let mut tc = tc();
        // (\x -> x) 'c'
        let e = Expr::app(
            Expr::lam(vec![Pat::var("x")], Expr::var("x")),
            Expr::lit(Lit::Char('c')),
        );
        let ty = tc.infer_expr(&e);
        assert_eq!(tc.zonk(&ty), Type::char());
    }

    #[test]
    fn integer_literal_emits_a_num_wanted() {
        let mut tc = tc();
        let ((), wanteds) = tc.with_child_wanteds(false, |tc| {
            tc.infer_expr(&Expr::int(3));
        });
        assert_eq!(wanteds.simple.len(), 1);
        assert!(wanteds.simple[0].pred.to_string().starts_with("Num"));
    }

    #[test]
    fn literal_pattern_wants_eq_and_num() {
        let mut tc = tc();
        let ((), wanteds) = tc.with_child_wanteds(false, |tc| {
            let scrut = tc.fresh_meta_ty(Kind::Star);
            tc.values.enter_frame();
            tc.check_pat_bind(&Pat::lit(Lit::Int(0)), &scrut);
            tc.values.exit_frame();
        });
        let classes: Vec<String> = wanteds
            .simple
            .iter()
            .map(|ct| ct.pred.to_string().split(' ').next().unwrap().to_string())
            .collect();
        assert!(classes.contains(&"Num".to_string()));
        assert!(classes.contains(&"Eq".to_string()));
    }

    #[test]
    fn applying_a_non_function_is_reported() {
        let mut tc = tc();
        // 'c' 'd'
        let e = Expr::app(Expr::lit(Lit::Char('c')), Expr::lit(Lit::Char('d')));
        tc.infer_expr(&e);
        assert!(tc
            .errors
            .iter()
            .any(|d| matches!(d.error, TypeError::NotAFunction { .. })));
    }

    #[test]
    fn tuple_pattern_decomposes_the_scrutinee() {
        let mut tc = tc();
        // case (c, d) of (x, y) -> x
        let e = Expr::case(
            Expr::new(ExprKind::Tuple(vec![
                Expr::lit(Lit::Char('c')),
                Expr::lit(Lit::Char('d')),
            ])),
            vec![(
                Pat::new(PatKind::Tuple(vec![Pat::var("x"), Pat::var("y")])),
                Expr::var("x"),
            )],
        );
        let ty = tc.infer_expr(&e);
        assert_eq!(tc.zonk(&ty), Type::char());
        assert!(tc.errors.is_empty());
    }
}
