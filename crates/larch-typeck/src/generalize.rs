//! Binding-group analysis and generalization.
//!
//! A `let` or top-level group is split by signature and by strongly
//! connected component; each component is typed monomorphically one level
//! down, its wanteds are solved, and the unification variables that remain
//! free in the binder types and shallow enough to own are skolemized into
//! the quantified variables of the published polytypes. The monomorphism
//! restriction suppresses quantification for pattern bindings and
//! zero-argument equations in non-top-level groups.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::ast::{decl_free_vars, Binds, Decl, FunDecl, Name};
use crate::constraint::Ct;
use crate::elab::{BindInfo, GenBind};
use crate::evidence::{shared_ev_decls, EvVar, Wrapper};
use crate::tc::TypeChecker;
use crate::ty::{
    add_constraints, add_forall, free_ty_vars, split_equality, subst_ty_vars, Kind, TyMeta,
    TyVar, Type,
};

impl TypeChecker {
    /// Type a group of declarations, publishing each binder's polytype
    /// into the current scope and recording the elaborated groups.
    pub(crate) fn infer_binds(&mut self, binds: &Binds, is_top_level: bool) {
        for (name, sig) in &binds.signatures {
            self.values.bind(name.clone(), sig.clone());
        }

        let groups = scc_groups(&binds.decls, &binds.signatures);
        for group in groups {
            let decls: Vec<Decl> = group.iter().map(|&i| binds.decls[i].clone()).collect();
            self.infer_decl_group(&binds.signatures, decls, is_top_level);
        }
    }

    fn infer_decl_group(
        &mut self,
        signatures: &FxHashMap<Name, Type>,
        decls: Vec<Decl>,
        is_top_level: bool,
    ) {
        if let [Decl::Fun(fd)] = decls.as_slice() {
            if let Some(sig) = signatures.get(&fd.name) {
                let gen = self.infer_single_fundecl_with_sig(fd, &sig.clone());
                self.elab_binds.push(gen);
                return;
            }
        }

        // 1. Monomorphic pass one level down: a fresh variable per binder,
        //    every right-hand side checked against its binder's type.
        let ((mono_env, mono_ids), mut wanteds) = self.with_child_wanteds(true, |tc| {
            tc.tc_decls_group_mono(signatures, &decls)
        });

        // 2. The monomorphism restriction applies off the top level.
        let restricted = is_restricted(signatures, &decls) && !is_top_level;

        // 3. Decide quantification.
        let (qtvs, givens, solve_decls) =
            self.simplify_and_quantify(restricted, &mut wanteds, &mono_env);
        debug!(?qtvs, restricted, "generalizing group");

        // 4. Package the group's residual wanteds as an implication under
        //    the chosen skolems and givens.
        let ev_decls = shared_ev_decls();
        ev_decls.borrow_mut().append(solve_decls);
        let span = decls.iter().find_map(|d| d.span());
        self.emit_implication(qtvs.clone(), givens.clone(), wanteds, ev_decls.clone(), span);

        // 5. Per-binder evidence abstraction and published polytypes.
        let mut infos = FxHashMap::default();
        for (name, monotype) in &mono_env {
            let mono_id = mono_ids.get(name).cloned().unwrap_or_else(|| name.clone());
            let info =
                self.compute_bind_info(name, &mono_id, &qtvs, monotype, signatures, &givens);
            self.values.bind(name.clone(), info.polytype.clone());
            infos.insert(name.clone(), info);
        }

        let dict_vars: Vec<EvVar> = givens.iter().map(|g| g.ev.clone()).collect();
        self.elab_binds.push(GenBind {
            ty_vars: qtvs,
            dict_vars,
            ev_decls,
            decls,
            infos,
        });
    }

    /// A declaration that carries its own signature: deep-skolemize it and
    /// check the equations at the rho-type inside a fresh implication. No
    /// new polytype is invented; the user gave one.
    pub(crate) fn infer_single_fundecl_with_sig(
        &mut self,
        fd: &FunDecl,
        sig: &Type,
    ) -> GenBind {
        let ev_decls = shared_ev_decls();
        let wrap_gen = self.with_note(format!("In function `{}`", fd.name), |tc| {
            tc.with_span(fd.span, |tc| {
                let ((wrap, skolems, givens), wanteds) = tc.with_child_wanteds(true, |tc| {
                    let (wrap, skolems, givens, rho) = tc.skolemize(sig, true);
                    tc.check_clauses(&fd.name, &fd.clauses, &rho);
                    (wrap, skolems, givens)
                });
                tc.emit_implication(skolems, givens, wanteds, ev_decls.clone(), fd.span);
                wrap
            })
        });

        let mono_id = self.fresh_mono_id(&fd.name);
        let rho = crate::ty::remove_top_gen(sig);
        let mut infos = FxHashMap::default();
        infos.insert(
            fd.name.clone(),
            BindInfo {
                poly_id: fd.name.clone(),
                mono_id,
                monotype: rho,
                polytype: sig.clone(),
                wrapper: wrap_gen.then(Wrapper::Let(ev_decls.clone())),
            },
        );
        GenBind {
            ty_vars: Vec::new(),
            dict_vars: Vec::new(),
            ev_decls,
            decls: vec![Decl::Fun(fd.clone())],
            infos,
        }
    }

    /// Monomorphic typing of one component: bind each binder to a fresh
    /// variable (or its signature), then check every right-hand side.
    fn tc_decls_group_mono(
        &mut self,
        signatures: &FxHashMap<Name, Type>,
        decls: &[Decl],
    ) -> (Vec<(Name, Type)>, FxHashMap<Name, Name>) {
        let mut mono_env: Vec<(Name, Type)> = Vec::new();
        let mut lhs_types = Vec::new();

        for decl in decls {
            match decl {
                Decl::Fun(fd) => {
                    let ty = Type::Meta(self.fresh_meta_named(&fd.name, Kind::Star));
                    mono_env.push((fd.name.clone(), ty.clone()));
                    lhs_types.push(ty);
                }
                Decl::Pat(pd) => {
                    let ty = self.fresh_meta_ty(Kind::Star);
                    let mut binds = Vec::new();
                    self.check_pat(&pd.lhs, &ty, &mut binds);
                    mono_env.extend(binds);
                    lhs_types.push(ty);
                }
            }
        }

        let mut mono_ids = FxHashMap::default();
        for (name, ty) in &mono_env {
            mono_ids.insert(name.clone(), self.fresh_mono_id(name));
            if !signatures.contains_key(name) {
                self.values.bind(name.clone(), ty.clone());
            }
        }

        for (decl, lhs_ty) in decls.iter().zip(lhs_types.iter()) {
            match decl {
                Decl::Fun(fd) => {
                    self.with_note(format!("In function `{}`", fd.name), |tc| {
                        tc.with_span(fd.span, |tc| {
                            tc.check_clauses(&fd.name, &fd.clauses, lhs_ty);
                        });
                    });
                }
                Decl::Pat(pd) => {
                    self.with_note("In a pattern binding".to_string(), |tc| {
                        tc.with_span(pd.span, |tc| tc.check_expr(&pd.rhs, lhs_ty));
                    });
                }
            }
        }

        (mono_env, mono_ids)
    }

    fn fresh_mono_id(&mut self, name: &str) -> Name {
        let u = self.fresh_uniq();
        format!("{}'{}", name, u)
    }

    /// Solve the group's wanteds one level down, then pick the
    /// unification variables to quantify and turn the surviving
    /// predicates into the implication's givens.
    fn simplify_and_quantify(
        &mut self,
        restricted: bool,
        wanteds: &mut crate::constraint::Wanteds,
        mono_env: &[(Name, Type)],
    ) -> (Vec<TyVar>, Vec<Ct>, crate::evidence::EvDecls) {
        let outer_level = self.current_level();
        let rhs_level = outer_level + 1;

        // 1. Solve what we can; residual wanteds survive in `wanteds`.
        let solve_decls =
            self.at_level(rhs_level, |tc| tc.solve_wanteds(&[], wanteds));

        // 2. Candidate predicates for quantification, promoted to the
        //    group's own level.
        let maybe_quant: Vec<Type> = wanteds
            .simple
            .iter()
            .map(|ct| ct.pred.clone())
            .collect();
        for pred in &maybe_quant {
            let _ = self.promote_type(pred, rhs_level);
        }

        // 3. Variables free in any binder type, and in the residual.
        let mut tvs_in_any_type: Vec<TyMeta> = Vec::new();
        for (_, ty) in mono_env {
            self.free_metas(&ty.clone(), &mut tvs_in_any_type);
        }
        let mut local_tvs = tvs_in_any_type.clone();
        for pred in &maybe_quant {
            self.free_metas(pred, &mut local_tvs);
        }

        // 4. Variables we may not quantify.
        let fixed = self.find_fixed_tvs(restricted, outer_level, &maybe_quant, &local_tvs);

        // 5. The quantifiable variables are the rest.
        let qmtvs: Vec<TyMeta> = tvs_in_any_type
            .iter()
            .copied()
            .filter(|m| !fixed.contains(m))
            .collect();

        // 6. Skolemize them: each quantified cell is filled with a fresh
        //    rigid variable at the group's level.
        let mut qtvs = Vec::new();
        for (i, m) in qmtvs.iter().enumerate() {
            let name = quantified_name(&self.meta_name(*m), i);
            let kind = self.meta_kind(*m);
            let qtv = self.fresh_ty_var(&name, rhs_level, kind);
            self.fill_meta(*m, Type::Var(qtv.clone()));
            qtvs.push(qtv);
        }

        // 7. Everything else is promoted out to the enclosing level.
        for m in &local_tvs {
            let _ = self.promote_meta(*m, outer_level);
        }

        // 8. Predicates worth quantifying mention at least one quantified
        //    variable and are not unusable equalities.
        let quant_preds: Vec<Type> = if restricted {
            Vec::new()
        } else {
            maybe_quant
                .iter()
                .filter(|p| self.is_quantifiable_pred(p, &qtvs))
                .cloned()
                .collect()
        };

        let span = self.current_span();
        let givens: Vec<Ct> = quant_preds
            .into_iter()
            .map(|p| {
                let p = self.zonk(&p);
                let ev = self.fresh_dvar(&p);
                Ct::with_span(ev, p, span)
            })
            .collect();

        (qtvs, givens, solve_decls)
    }

    /// The variables that must stay monomorphic: anything at the enclosing
    /// level or shallower, everything under the restriction, and the
    /// injective closure of retained equalities whose one side is already
    /// fixed.
    fn find_fixed_tvs(
        &mut self,
        restricted: bool,
        level: u32,
        preds: &[Type],
        tvs: &[TyMeta],
    ) -> Vec<TyMeta> {
        let mut fixed: Vec<TyMeta> = Vec::new();

        if restricted {
            fixed.extend(tvs.iter().copied());
            return fixed;
        }

        for m in tvs {
            if self.meta_level(*m) <= level {
                fixed.push(*m);
            }
        }

        for pred in preds {
            let p = self.zonk(pred);
            if let Some((t1, t2)) = split_equality(&p) {
                if self.is_fixed_meta(&t1, level) {
                    self.injective_metas(&t2, &mut fixed);
                } else if self.is_fixed_meta(&t2, level) {
                    self.injective_metas(&t1, &mut fixed);
                }
            }
        }

        fixed
    }

    fn is_fixed_meta(&mut self, ty: &Type, level: u32) -> bool {
        match self.follow(ty.clone()) {
            Type::Meta(m) => self.meta_level(m) <= level,
            _ => false,
        }
    }

    /// Unification variables in injective positions: everything except
    /// arguments of type-family applications.
    fn injective_metas(&mut self, ty: &Type, out: &mut Vec<TyMeta>) {
        if self.is_family_app(ty) {
            return;
        }
        match self.follow(ty.clone()) {
            Type::Meta(m) => {
                if !out.contains(&m) {
                    out.push(m);
                }
            }
            Type::Var(_) | Type::Con(_) => {}
            Type::App(a, b) => {
                self.injective_metas(&a, out);
                self.injective_metas(&b, out);
            }
            Type::Tuple(ts) => ts.iter().for_each(|t| self.injective_metas(t, out)),
            Type::List(t) | Type::StrictLazy(_, t) => self.injective_metas(&t, out),
            Type::Forall(_, body) => self.injective_metas(&body, out),
            Type::Constrained(ps, body) => {
                ps.iter().for_each(|p| self.injective_metas(p, out));
                self.injective_metas(&body, out);
            }
        }
    }

    /// Equalities like `Int ~ Bool` or `a ~ [b]` never get quantified;
    /// family equations and dictionary predicates mentioning a quantified
    /// variable do.
    fn is_quantifiable_pred(&mut self, pred: &Type, qtvs: &[TyVar]) -> bool {
        let p = self.zonk(pred);
        let mut fvs = Vec::new();
        free_ty_vars(&p, &mut fvs);
        if !fvs.iter().any(|v| qtvs.contains(v)) {
            return false;
        }
        match split_equality(&p) {
            Some((t1, t2)) => self.is_family_app(&t1) || self.is_family_app(&t2),
            None => true,
        }
    }

    /// Restrict the group's quantifiers to this binder's type, re-emit
    /// predicates that became ambiguous here, and build the evidence
    /// abstraction wrapper.
    fn compute_bind_info(
        &mut self,
        name: &str,
        mono_id: &str,
        qtvs: &[TyVar],
        monotype: &Type,
        signatures: &FxHashMap<Name, Type>,
        givens: &[Ct],
    ) -> BindInfo {
        let monotype = self.zonk(monotype);

        let mut fvs = Vec::new();
        free_ty_vars(&monotype, &mut fvs);
        let qtvs_in_type: Vec<TyVar> =
            qtvs.iter().filter(|v| fvs.contains(v)).cloned().collect();
        let qtvs_unused: Vec<TyVar> =
            qtvs.iter().filter(|v| !fvs.contains(v)).cloned().collect();

        // Quantifiers unused by this binder leave their predicates behind
        // with fresh variables in their place.
        let subst: Vec<(TyVar, Type)> = qtvs_unused
            .iter()
            .map(|tv| {
                let m = self.fresh_meta_named(&tv.name, tv.kind.clone());
                (tv.clone(), Type::Meta(m))
            })
            .collect();

        let mut all_cts = Vec::new();
        for g in givens {
            let pred = subst_ty_vars(&subst, &self.zonk(&g.pred));
            let ev = self.fresh_dvar(&pred);
            all_cts.push(Ct::with_span(ev, pred, g.span));
        }

        // Predicates not mentioning this binder's quantifiers are
        // ambiguous here; hand them back for possible defaulting.
        let (used, unused): (Vec<Ct>, Vec<Ct>) = all_cts.iter().cloned().partition(|ct| {
            let mut pvs = Vec::new();
            free_ty_vars(&ct.pred, &mut pvs);
            pvs.iter().any(|v| qtvs_in_type.contains(v))
        });
        self.emit_wanteds(unused);

        let used_evs: Vec<EvVar> = used.iter().map(|ct| ct.ev.clone()).collect();
        let all_evs: Vec<EvVar> = all_cts.iter().map(|ct| ct.ev.clone()).collect();

        let mut wrapper = Wrapper::Id;
        if !qtvs_in_type.is_empty() {
            wrapper = wrapper.then(Wrapper::TyLam(qtvs_in_type.clone()));
        }
        if !used_evs.is_empty() {
            wrapper = wrapper.then(Wrapper::EvLam(used_evs));
        }
        if !all_evs.is_empty() {
            wrapper = wrapper.then(Wrapper::EvApp(all_evs));
        }

        let used_preds: Vec<Type> = used.iter().map(|ct| ct.pred.clone()).collect();
        let mut polytype =
            add_forall(qtvs_in_type, add_constraints(used_preds, monotype.clone()));

        if let Some(sig) = signatures.get(name) {
            let sub = self.subsumption_check(&polytype, &sig.clone());
            wrapper = sub.then(wrapper);
            polytype = sig.clone();
        }

        BindInfo {
            poly_id: name.to_string(),
            mono_id: mono_id.to_string(),
            monotype,
            polytype,
            wrapper,
        }
    }

    /// Check that `inferred` is at least as polymorphic as `sig`:
    /// skolemize the signature, instantiate the inferred type, and demand
    /// the bodies match under an implication.
    pub(crate) fn subsumption_check(&mut self, inferred: &Type, sig: &Type) -> Wrapper {
        let ((wrap, skolems, givens), wanteds) = self.with_child_wanteds(true, |tc| {
            let (wrap, skolems, givens, rho) = tc.skolemize(sig, true);
            let (_, _, body) = tc.instantiate_emit(inferred);
            tc.unify_emit(&body, &rho);
            (wrap, skolems, givens)
        });
        let ev_decls = shared_ev_decls();
        self.emit_implication(skolems, givens, wanteds, ev_decls, None);
        wrap
    }
}

/// Whether the monomorphism restriction could apply to this group: a
/// pattern binding, or an equation with zero argument patterns and no
/// signature.
fn is_restricted(signatures: &FxHashMap<Name, Type>, decls: &[Decl]) -> bool {
    decls.iter().any(|decl| match decl {
        Decl::Pat(_) => true,
        Decl::Fun(fd) => fd.arity() == 0 && !signatures.contains_key(&fd.name),
    })
}

/// Pick a user-facing name for a quantified variable. Inference-invented
/// variables get letters; instantiated signature variables keep theirs.
fn quantified_name(meta_name: &str, index: usize) -> String {
    if meta_name.len() == 1 && meta_name != "t" {
        return meta_name.to_string();
    }
    let letters = ["a", "b", "c", "d", "e", "f", "g", "h"];
    letters
        .get(index)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("a{}", index))
}

/// Split declarations into strongly connected components, in dependency
/// order. A signed binder is a reference barrier: its type is already
/// known, so edges through it are dropped.
fn scc_groups(decls: &[Decl], signatures: &FxHashMap<Name, Type>) -> Vec<Vec<usize>> {
    let mut index_for_name: FxHashMap<Name, usize> = FxHashMap::default();
    for (i, decl) in decls.iter().enumerate() {
        for name in decl.binders() {
            if !signatures.contains_key(&name) {
                index_for_name.insert(name, i);
            }
        }
    }

    let edges: Vec<Vec<usize>> = decls
        .iter()
        .map(|decl| {
            decl_free_vars(decl)
                .into_iter()
                .filter_map(|n| index_for_name.get(&n).copied())
                .collect()
        })
        .collect();

    tarjan_sccs(decls.len(), &edges)
}

/// Tarjan's algorithm; components come out with callees before callers.
fn tarjan_sccs(n: usize, edges: &[Vec<usize>]) -> Vec<Vec<usize>> {
    struct State<'a> {
        edges: &'a [Vec<usize>],
        index: Vec<Option<usize>>,
        lowlink: Vec<usize>,
        on_stack: Vec<bool>,
        stack: Vec<usize>,
        counter: usize,
        out: Vec<Vec<usize>>,
    }

    fn strongconnect(s: &mut State<'_>, v: usize) {
        s.index[v] = Some(s.counter);
        s.lowlink[v] = s.counter;
        s.counter += 1;
        s.stack.push(v);
        s.on_stack[v] = true;

        for &w in &s.edges[v].to_vec() {
            if s.index[w].is_none() {
                strongconnect(s, w);
                s.lowlink[v] = s.lowlink[v].min(s.lowlink[w]);
            } else if s.on_stack[w] {
                s.lowlink[v] = s.lowlink[v].min(s.index[w].unwrap());
            }
        }

        if s.lowlink[v] == s.index[v].unwrap() {
            let mut comp = Vec::new();
            loop {
                let w = s.stack.pop().unwrap();
                s.on_stack[w] = false;
                comp.push(w);
                if w == v {
                    break;
                }
            }
            comp.sort_unstable();
            s.out.push(comp);
        }
    }

    let mut state = State {
        edges,
        index: vec![None; n],
        lowlink: vec![0; n],
        on_stack: vec![false; n],
        stack: Vec::new(),
        counter: 0,
        out: Vec::new(),
    };
    for v in 0..n {
        if state.index[v].is_none() {
            strongconnect(&mut state, v);
        }
    }
    state.out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Clause, Expr, Pat};

    fn fun(name: &str, rhs: Expr) -> Decl {
        Decl::Fun(FunDecl::simple(name, rhs))
    }

    fn fun1(name: &str, pat: &str, rhs: Expr) -> Decl {
        Decl::Fun(FunDecl {
            name: name.into(),
            clauses: vec![Clause { pats: vec![Pat::var(pat)], rhs }],
            span: None,
        })
    }

    #[test]
    fn scc_splits_non_recursive_decls_in_dependency_order() {
        // g = f ; f = c  (f must be typed before g)
        let decls = vec![
            fun("g", Expr::var("f")),
            fun("f", Expr::var("c")),
        ];
        let groups = scc_groups(&decls, &FxHashMap::default());
        assert_eq!(groups, vec![vec![1], vec![0]]);
    }

    #[test]
    fn scc_joins_mutual_recursion() {
        let decls = vec![
            fun1("even", "n", Expr::app(Expr::var("odd"), Expr::var("n"))),
            fun1("odd", "n", Expr::app(Expr::var("even"), Expr::var("n"))),
        ];
        let groups = scc_groups(&decls, &FxHashMap::default());
        assert_eq!(groups, vec![vec![0, 1]]);
    }

    #[test]
    fn signatures_break_dependency_edges() {
        // With a signature on f, g = f does not force them together.
        let decls = vec![
            fun("f", Expr::app(Expr::var("g"), Expr::var("g"))),
            fun("g", Expr::var("f")),
        ];
        let mut sigs = FxHashMap::default();
        sigs.insert("f".to_string(), Type::int());
        let groups = scc_groups(&decls, &sigs);
        // No edge from g to f (f is signed), so no cycle.
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn restriction_triggers_on_zero_arity_and_pattern_binds() {
        let sigs = FxHashMap::default();
        assert!(is_restricted(&sigs, &[fun("x", Expr::var("y"))]));
        assert!(!is_restricted(&sigs, &[fun1("f", "x", Expr::var("x"))]));
        let pat = Decl::Pat(crate::ast::PatDecl {
            lhs: Pat::var("p"),
            rhs: Expr::var("q"),
            span: None,
        });
        assert!(is_restricted(&sigs, &[pat]));
    }
}
