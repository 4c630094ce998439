//! The constraint solver: a deterministic worklist over predicates.
//!
//! Predicates are popped LIFO and run through four stages in order:
//! canonicalize, interact with an inert of the same flavor, interact
//! given-with-wanted, and the top-level reaction against the instance
//! environment. A predicate none of them touch is inert and pairwise
//! non-reacting with everything already there. When the worklist drains,
//! the inert set is partitioned: equalities whose left side is a touchable
//! unification variable become the substitution and are written into the
//! cells; everything else is the residual. Implications are then solved
//! recursively one level down, under the union of their givens and the
//! enclosing ones.

use tracing::{debug, trace};

use crate::constraint::{Ct, Flavor, Pred, Predicate, Wanteds};
use crate::error::{Diagnostic, TypeError};
use crate::evidence::{EvDecls, EvExpr};
use crate::tc::TypeChecker;
use crate::ty::Type;

/// The outcome of one rewrite step.
pub(crate) enum Reaction {
    Success { decls: EvDecls, preds: Vec<Predicate> },
    Fail,
}

impl Reaction {
    fn success(preds: Vec<Predicate>) -> Reaction {
        Reaction::Success { decls: EvDecls::new(), preds }
    }

    fn with_decls(decls: EvDecls, preds: Vec<Predicate>) -> Reaction {
        Reaction::Success { decls, preds }
    }
}

impl TypeChecker {
    /// Solve a wanted set to fixpoint: simple constraints first, then each
    /// implication recursively. Residual simples stay in `w.simple`;
    /// implication residues float out when they mention nothing deeper
    /// than the enclosing level, and are reported otherwise.
    pub(crate) fn solve_wanteds(&mut self, givens: &[Ct], w: &mut Wanteds) -> EvDecls {
        let mut all_decls = EvDecls::new();
        loop {
            let simple = std::mem::take(&mut w.simple);
            let (decls, residual) = self.solve_simple(givens, simple);
            all_decls.append(decls);
            w.simple = residual;

            let implications = std::mem::take(&mut w.implications);
            if implications.is_empty() {
                break;
            }
            let outer_level = self.current_level();
            let mut floated = false;
            for mut imp in implications {
                let mut inner_givens: Vec<Ct> = givens.to_vec();
                inner_givens.extend(imp.givens.iter().cloned());
                let inner_decls = self
                    .at_level(imp.level, |tc| tc.solve_wanteds(&inner_givens, &mut imp.wanteds));
                imp.ev_decls.borrow_mut().append(inner_decls);

                for ct in std::mem::take(&mut imp.wanteds.simple) {
                    let max_level = self.max_meta_level(&ct.pred);
                    let mut skolems = Vec::new();
                    self.free_skolems(&ct.pred, &mut skolems);
                    let trapped = skolems.iter().any(|s| imp.skolems.contains(s));
                    if !trapped && max_level <= outer_level {
                        w.simple.push(ct);
                        floated = true;
                    } else {
                        let pred = self.zonk(&ct.pred);
                        self.errors.push(Diagnostic {
                            error: TypeError::UnsolvedConstraint { pred },
                            span: ct.span.or(imp.span),
                            notes: imp.notes.clone(),
                        });
                    }
                }
            }
            if !floated {
                break;
            }
        }
        all_decls
    }

    /// The worklist loop over flat constraints. Returns the evidence
    /// bindings produced and the residual wanteds.
    pub(crate) fn solve_simple(
        &mut self,
        givens: &[Ct],
        wanteds: Vec<Ct>,
    ) -> (EvDecls, Vec<Ct>) {
        let level = self.current_level();
        let mut decls = EvDecls::new();
        let mut work: Vec<Predicate> = Vec::new();
        let mut inert: Vec<Predicate> = Vec::new();
        let mut failed: Vec<Predicate> = Vec::new();

        for g in givens {
            work.push(Predicate::with_span(
                Flavor::Given,
                level,
                Pred::NonCanonical { ev: g.ev.clone(), pred: g.pred.clone() },
                g.span,
            ));
        }
        for ct in &wanteds {
            work.push(Predicate::with_span(
                Flavor::Wanted,
                level,
                Pred::NonCanonical { ev: ct.ev.clone(), pred: ct.pred.clone() },
                ct.span,
            ));
        }

        while let Some(p) = work.pop() {
            trace!(pred = %p, "worklist pop");

            if let Some(r) = self.canonicalize(&p) {
                consume(r, p, &mut decls, &mut work, &mut failed);
                continue;
            }

            let mut reacted = false;
            let mut i = 0;
            while i < inert.len() {
                if let Some(r) = self.interact_same(&p, &inert[i]) {
                    inert.swap_remove(i);
                    consume(r, p.clone(), &mut decls, &mut work, &mut failed);
                    reacted = true;
                    break;
                }
                i += 1;
            }
            if reacted {
                continue;
            }

            let mut i = 0;
            while i < inert.len() {
                if let Some(r) = self.interact_given_wanted(&p, &inert[i]) {
                    inert.swap_remove(i);
                    consume(r, p.clone(), &mut decls, &mut work, &mut failed);
                    reacted = true;
                    break;
                }
                i += 1;
            }
            if reacted {
                continue;
            }

            if let Some(r) = self.top_react(&p) {
                consume(r, p, &mut decls, &mut work, &mut failed);
                continue;
            }

            inert.push(p);
        }

        for p in failed {
            self.report_failed(p);
        }

        // Partition the inert set: touchable-variable equalities become
        // the substitution, everything else survives as residual.
        let mut residual: Vec<Ct> = Vec::new();
        let mut equations: Vec<(crate::ty::TyMeta, Type)> = Vec::new();
        for p in inert {
            if p.flavor == Flavor::Given {
                continue;
            }
            match &p.pred {
                Pred::Equality { co, lhs, rhs } => match self.follow(lhs.clone()) {
                    Type::Meta(m)
                        if self.meta_level(m) >= level && !self.occurs(m, rhs) =>
                    {
                        equations.push((m, rhs.clone()));
                    }
                    lhs => {
                        residual.push(Ct::with_span(
                            co.clone(),
                            Type::equality(lhs, rhs.clone()),
                            p.span,
                        ));
                    }
                },
                Pred::Dict { ev, .. } => {
                    let pred = p.pred.to_type();
                    residual.push(Ct::with_span(ev.clone(), pred, p.span));
                }
                Pred::NonCanonical { ev, pred } => {
                    residual.push(Ct::with_span(ev.clone(), pred.clone(), p.span));
                }
            }
        }

        debug!(
            equations = equations.len(),
            residual = residual.len(),
            "inert partition"
        );

        for (m, rhs) in equations {
            if self.probe(m).is_none() {
                let target = self.meta_level(m);
                match self.promote_type(&rhs, target) {
                    Ok(()) => self.fill_meta(m, rhs),
                    Err(e) => self.record_unify_error(e),
                }
            } else if let Err(e) = self.unify(&Type::Meta(m), &rhs) {
                self.record_unify_error(e);
            }
        }

        (decls, residual)
    }

    fn report_failed(&mut self, p: Predicate) {
        let span = p.span;
        let err = match &p.pred {
            Pred::Equality { lhs, rhs, .. } => self.equality_error(lhs, rhs),
            Pred::NonCanonical { pred, .. } => match crate::ty::split_equality(pred) {
                Some((lhs, rhs)) => self.equality_error(&lhs, &rhs),
                None => {
                    let pred = self.zonk(pred);
                    match p.flavor {
                        Flavor::Given => TypeError::GivenInstanceCollision { pred },
                        Flavor::Wanted => TypeError::NoInstance { pred },
                    }
                }
            },
            Pred::Dict { .. } => {
                let pred = self.zonk(&p.pred.to_type());
                match p.flavor {
                    Flavor::Given => TypeError::GivenInstanceCollision { pred },
                    Flavor::Wanted => TypeError::NoInstance { pred },
                }
            }
        };
        self.record_at(err, span);
    }

    fn equality_error(&mut self, lhs: &Type, rhs: &Type) -> TypeError {
        if let Type::Meta(m) = self.follow(lhs.clone()) {
            if self.occurs(m, rhs) {
                return TypeError::OccursCheck { var: m, ty: self.zonk(rhs) };
            }
        }
        if let Type::Meta(m) = self.follow(rhs.clone()) {
            if self.occurs(m, lhs) {
                return TypeError::OccursCheck { var: m, ty: self.zonk(lhs) };
            }
        }
        TypeError::Mismatch { expected: self.zonk(lhs), found: self.zonk(rhs) }
    }

    // ── Canonicalization ────────────────────────────────────────────────

    /// Rewrite a non-canonical predicate into canonical form, or discover
    /// REFL / TDEC / FAILDEC. Returns `None` for already-canonical input.
    pub(crate) fn canonicalize(&mut self, p: &Predicate) -> Option<Reaction> {
        let Pred::NonCanonical { ev, pred } = &p.pred else { return None };
        let (head, args) = self.decompose(pred);
        match head {
            Type::Con(con) if con.name == "~" && args.len() == 2 => Some(
                self.canonicalize_equality(p, ev.clone(), &args[0], &args[1]),
            ),
            Type::Con(con) => Some(Reaction::success(vec![Predicate::with_span(
                p.flavor,
                p.level,
                Pred::Dict { ev: ev.clone(), class_con: con, args },
                p.span,
            )])),
            other => panic!("predicate head is not a constructor: {}", other),
        }
    }

    fn canonicalize_equality(
        &mut self,
        p: &Predicate,
        co: crate::evidence::EvVar,
        t1: &Type,
        t2: &Type,
    ) -> Reaction {
        let t1 = self.follow(t1.clone());
        let t2 = self.follow(t2.clone());

        // REFL
        if self.same_type(&t1, &t2) {
            return Reaction::success(Vec::new());
        }

        let fam1 = self.is_family_app(&t1);
        let fam2 = self.is_family_app(&t2);

        if !fam1 && !fam2 {
            let (h1, a1) = self.decompose(&t1);
            let (h2, a2) = self.decompose(&t2);
            if let (Type::Con(c1), Type::Con(c2)) = (&h1, &h2) {
                // TDEC: equal heads decompose into argument equalities.
                if c1 == c2 && a1.len() == a2.len() {
                    let preds = a1
                        .iter()
                        .zip(a2.iter())
                        .map(|(x, y)| {
                            let pred = Type::equality(x.clone(), y.clone());
                            let co = self.fresh_dvar(&pred);
                            Predicate::with_span(
                                p.flavor,
                                p.level,
                                Pred::NonCanonical { ev: co, pred },
                                p.span,
                            )
                        })
                        .collect();
                    return Reaction::success(preds);
                }
                // FAILDEC: distinct rigid heads cannot be equal.
                return Reaction::Fail;
            }
        }

        // Orientation: unification variables sort before rigid variables
        // sort before anything else; smaller ids first among equals.
        match (&t1, &t2) {
            (Type::Meta(m1), Type::Meta(m2)) => {
                if m2.0 < m1.0 {
                    return self.canonicalize_equality(p, co, &t2.clone(), &t1.clone());
                }
                if self.occurs(*m1, &t2) {
                    return Reaction::Fail;
                }
            }
            (Type::Meta(m1), _) => {
                if self.occurs(*m1, &t2) {
                    return Reaction::Fail;
                }
            }
            (_, Type::Meta(_)) => {
                return self.canonicalize_equality(p, co, &t2.clone(), &t1.clone());
            }
            (Type::Var(v1), Type::Var(v2)) => {
                if v2.uniq < v1.uniq {
                    return self.canonicalize_equality(p, co, &t2.clone(), &t1.clone());
                }
                if occurs_rigid(v1, &t2) {
                    return Reaction::Fail;
                }
            }
            (Type::Var(v1), _) => {
                if occurs_rigid(v1, &t2) {
                    return Reaction::Fail;
                }
            }
            (_, Type::Var(_)) => {
                return self.canonicalize_equality(p, co, &t2.clone(), &t1.clone());
            }
            (_, _) if fam2 && !fam1 => {
                return self.canonicalize_equality(p, co, &t2.clone(), &t1.clone());
            }
            _ => {}
        }

        Reaction::success(vec![Predicate::with_span(
            p.flavor,
            p.level,
            Pred::Equality { co, lhs: t1, rhs: t2 },
            p.span,
        )])
    }

    // ── Interactions between two inerts of the same flavor ──────────────

    pub(crate) fn interact_same(&mut self, p1: &Predicate, p2: &Predicate) -> Option<Reaction> {
        debug_assert!(p1.pred.is_canonical() && p2.pred.is_canonical());
        if p1.flavor != p2.flavor {
            return None;
        }
        let flavor = p1.flavor;

        let eq1 = as_equality(&p1.pred);
        let eq2 = as_equality(&p2.pred);
        let dict1 = as_dict(&p1.pred);
        let dict2 = as_dict(&p2.pred);

        if eq2.is_some() && eq1.is_none() {
            return self.interact_same(p2, p1);
        }

        if let (Some((_, lhs1, rhs1)), Some((co2, lhs2, rhs2))) = (eq1, eq2) {
            let l1 = self.follow(lhs1.clone());
            let l2 = self.follow(lhs2.clone());

            // EQSAME: (a ~ X) + (a ~ Y) -> (a ~ X) && (X ~ Y)
            if shallow_var_eq(&l1, &l2) {
                let pred = Type::equality(rhs1.clone(), rhs2.clone());
                let p3 = Predicate::with_span(
                    flavor,
                    p2.level,
                    Pred::NonCanonical { ev: co2.clone(), pred },
                    p2.span,
                );
                return Some(Reaction::success(vec![p1.clone(), p3]));
            }

            // EQDIFF: (a ~ X) + (b ~ Y[a]) -> (a ~ X) && (b ~ Y[a:=X])
            if let Some(rhs2_new) = self.rewrite_occurrence(&l1, rhs1, rhs2) {
                let pred = Type::equality(lhs2.clone(), rhs2_new);
                let p3 = Predicate::with_span(
                    flavor,
                    p2.level,
                    Pred::NonCanonical { ev: co2.clone(), pred },
                    p2.span,
                );
                return Some(Reaction::success(vec![p1.clone(), p3]));
            }
            if let Some(rhs1_new) = self.rewrite_occurrence(&l2, rhs2, rhs1) {
                let (co1, _, _) = as_equality(&p1.pred).expect("eq1 checked above");
                let pred = Type::equality(lhs1.clone(), rhs1_new);
                let p3 = Predicate::with_span(
                    flavor,
                    p1.level,
                    Pred::NonCanonical { ev: co1.clone(), pred },
                    p1.span,
                );
                return Some(Reaction::success(vec![p3, p2.clone()]));
            }
            return None;
        }

        // EQDICT: (a ~ X) + D(..a..) -> (a ~ X) && D(..X..)
        if let (Some((_, lhs1, rhs1)), Some((ev2, class2, args2))) = (eq1, dict2) {
            let l1 = self.follow(lhs1.clone());
            let mut changed = false;
            let new_args: Vec<Type> = args2
                .iter()
                .map(|arg| match self.rewrite_occurrence(&l1, rhs1, arg) {
                    Some(t) => {
                        changed = true;
                        t
                    }
                    None => arg.clone(),
                })
                .collect();
            if changed {
                let p3 = Predicate::with_span(
                    flavor,
                    p2.level,
                    Pred::Dict { ev: ev2.clone(), class_con: class2.clone(), args: new_args },
                    p2.span,
                );
                return Some(Reaction::success(vec![p1.clone(), p3]));
            }
            return None;
        }

        if let (Some((ev1, _, _)), Some((ev2, _, _))) = (dict1, dict2) {
            let c1 = p1.pred.to_type();
            let c2 = p2.pred.to_type();

            // DDICT: duplicate dictionaries collapse to one, with an alias.
            if self.same_type(&c1, &c2) {
                let mut decls = EvDecls::new();
                decls.push(ev2.clone(), EvExpr::var(ev1.clone()));
                return Some(Reaction::with_decls(decls, vec![p1.clone()]));
            }
            // SUPER: one dictionary is a superclass chain away from the other.
            if let Some(decls) = self.entails_by_superclass((ev1, &c1), (ev2, &c2)) {
                return Some(Reaction::with_decls(decls, vec![p1.clone()]));
            }
            if let Some(decls) = self.entails_by_superclass((ev2, &c2), (ev1, &c1)) {
                return Some(Reaction::with_decls(decls, vec![p2.clone()]));
            }
        }

        None
    }

    // ── Given simplifies wanted ─────────────────────────────────────────

    pub(crate) fn interact_given_wanted(
        &mut self,
        p1: &Predicate,
        p2: &Predicate,
    ) -> Option<Reaction> {
        debug_assert!(p1.pred.is_canonical() && p2.pred.is_canonical());
        if p1.flavor == p2.flavor {
            return None;
        }
        if p1.flavor != Flavor::Given {
            return self.interact_given_wanted(p2, p1);
        }

        let eq1 = as_equality(&p1.pred);
        let eq2 = as_equality(&p2.pred);
        let dict1 = as_dict(&p1.pred);
        let dict2 = as_dict(&p2.pred);

        if let (Some((_, lhs1, rhs1)), Some((co2, lhs2, rhs2))) = (eq1, eq2) {
            let l1 = self.follow(lhs1.clone());
            let l2 = self.follow(lhs2.clone());

            // SEQSAME: (a ~ X) simplifies (a ~ Y) -> (X ~ Y)
            if shallow_var_eq(&l1, &l2) {
                let pred = Type::equality(rhs1.clone(), rhs2.clone());
                let p3 = Predicate::with_span(
                    Flavor::Wanted,
                    p2.level,
                    Pred::NonCanonical { ev: co2.clone(), pred },
                    p2.span,
                );
                return Some(Reaction::success(vec![p1.clone(), p3]));
            }
            // SEQDIFF: (a ~ X) simplifies (b ~ Y[a]) -> (b ~ Y[a:=X])
            if let Some(rhs2_new) = self.rewrite_occurrence(&l1, rhs1, rhs2) {
                let pred = Type::equality(lhs2.clone(), rhs2_new);
                let p3 = Predicate::with_span(
                    Flavor::Wanted,
                    p2.level,
                    Pred::NonCanonical { ev: co2.clone(), pred },
                    p2.span,
                );
                return Some(Reaction::success(vec![p1.clone(), p3]));
            }
            return None;
        }

        // SEQDICT: a given equality rewrites a wanted dictionary.
        if let (Some((_, lhs1, rhs1)), Some((ev2, class2, args2))) = (eq1, dict2) {
            let l1 = self.follow(lhs1.clone());
            let mut changed = false;
            let new_args: Vec<Type> = args2
                .iter()
                .map(|arg| match self.rewrite_occurrence(&l1, rhs1, arg) {
                    Some(t) => {
                        changed = true;
                        t
                    }
                    None => arg.clone(),
                })
                .collect();
            if changed {
                let p3 = Predicate::with_span(
                    Flavor::Wanted,
                    p2.level,
                    Pred::Dict { ev: ev2.clone(), class_con: class2.clone(), args: new_args },
                    p2.span,
                );
                return Some(Reaction::success(vec![p1.clone(), p3]));
            }
            return None;
        }

        if let (Some((ev1, _, _)), Some((ev2, _, _))) = (dict1, dict2) {
            let c1 = p1.pred.to_type();
            let c2 = p2.pred.to_type();

            // SDDICTG: a given dictionary discharges an equal wanted.
            if self.same_type(&c1, &c2) {
                let mut decls = EvDecls::new();
                decls.push(ev2.clone(), EvExpr::var(ev1.clone()));
                return Some(Reaction::with_decls(decls, vec![p1.clone()]));
            }
            // SSUPER: the given reaches the wanted through superclasses.
            if let Some(decls) = self.entails_by_superclass((ev1, &c1), (ev2, &c2)) {
                return Some(Reaction::with_decls(decls, vec![p1.clone()]));
            }
        }

        None
    }

    // ── Top-level reactions ─────────────────────────────────────────────

    /// React a canonical predicate with the instance environment: resolve
    /// a wanted dictionary to a dfun, reduce a wanted family equation by
    /// an axiom, and reject a given that collides with an instance.
    pub(crate) fn top_react(&mut self, p: &Predicate) -> Option<Reaction> {
        debug_assert!(p.pred.is_canonical());

        if let Some((ev, _, _)) = as_dict(&p.pred) {
            let constraint = p.pred.to_type();
            let ev = ev.clone();
            if let Some((dfun_exp, super_wanteds)) = self.lookup_instance(&constraint) {
                if p.flavor == Flavor::Given {
                    return Some(Reaction::Fail);
                }
                let mut decls = EvDecls::new();
                decls.push(ev, dfun_exp);
                let preds = super_wanteds
                    .into_iter()
                    .map(|ct| {
                        Predicate::with_span(
                            Flavor::Wanted,
                            p.level,
                            Pred::NonCanonical { ev: ct.ev, pred: ct.pred },
                            ct.span.or(p.span),
                        )
                    })
                    .collect();
                return Some(Reaction::with_decls(decls, preds));
            }
            return None;
        }

        if p.flavor == Flavor::Wanted {
            if let Some((co, lhs, rhs)) = as_equality(&p.pred) {
                let (co, lhs, rhs) = (co.clone(), lhs.clone(), rhs.clone());
                if self.is_family_app(&lhs) {
                    if let Some((axiom, reduced)) = self.lookup_family_instance(&lhs) {
                        let mut decls = EvDecls::new();
                        decls.push(co, EvExpr::var(axiom));
                        let pred = Type::equality(reduced, rhs);
                        let co2 = self.fresh_dvar(&pred);
                        let p3 = Predicate::with_span(
                            Flavor::Wanted,
                            p.level,
                            Pred::NonCanonical { ev: co2, pred },
                            p.span,
                        );
                        return Some(Reaction::with_decls(decls, vec![p3]));
                    }
                }
            }
        }

        None
    }

    /// Replace occurrences of the variable `var` (a followed unification
    /// or rigid variable) with `to` inside `target`. `Some` iff anything
    /// changed.
    fn rewrite_occurrence(&mut self, var: &Type, to: &Type, target: &Type) -> Option<Type> {
        let (out, changed) = self.rewrite_go(var, to, target);
        changed.then_some(out)
    }

    fn rewrite_go(&mut self, var: &Type, to: &Type, target: &Type) -> (Type, bool) {
        let t = self.follow(target.clone());
        if shallow_var_eq(var, &t) {
            return (to.clone(), true);
        }
        match t {
            Type::Var(_) | Type::Meta(_) | Type::Con(_) => (t, false),
            Type::App(a, b) => {
                let (a, ca) = self.rewrite_go(var, to, &a);
                let (b, cb) = self.rewrite_go(var, to, &b);
                (Type::App(Box::new(a), Box::new(b)), ca || cb)
            }
            Type::Tuple(ts) => {
                let mut changed = false;
                let ts = ts
                    .iter()
                    .map(|t| {
                        let (t, c) = self.rewrite_go(var, to, t);
                        changed |= c;
                        t
                    })
                    .collect();
                (Type::Tuple(ts), changed)
            }
            Type::List(t0) => {
                let (t0, c) = self.rewrite_go(var, to, &t0);
                (Type::List(Box::new(t0)), c)
            }
            Type::StrictLazy(s, t0) => {
                let (t0, c) = self.rewrite_go(var, to, &t0);
                (Type::StrictLazy(s, Box::new(t0)), c)
            }
            Type::Forall(vs, body) => {
                if let Type::Var(v) = var {
                    if vs.contains(v) {
                        return (Type::Forall(vs, body), false);
                    }
                }
                let (body, c) = self.rewrite_go(var, to, &body);
                (Type::Forall(vs, Box::new(body)), c)
            }
            Type::Constrained(ps, body) => {
                let mut changed = false;
                let ps = ps
                    .iter()
                    .map(|p| {
                        let (p, c) = self.rewrite_go(var, to, p);
                        changed |= c;
                        p
                    })
                    .collect();
                let (body, c) = self.rewrite_go(var, to, &body);
                (Type::Constrained(ps, Box::new(body)), changed || c)
            }
        }
    }
}

fn consume(
    r: Reaction,
    p: Predicate,
    decls: &mut EvDecls,
    work: &mut Vec<Predicate>,
    failed: &mut Vec<Predicate>,
) {
    match r {
        Reaction::Success { decls: d, preds } => {
            decls.append(d);
            work.extend(preds);
        }
        Reaction::Fail => failed.push(p),
    }
}

fn as_equality(p: &Pred) -> Option<(&crate::evidence::EvVar, &Type, &Type)> {
    match p {
        Pred::Equality { co, lhs, rhs } => Some((co, lhs, rhs)),
        _ => None,
    }
}

fn as_dict(p: &Pred) -> Option<(&crate::evidence::EvVar, &crate::ty::TyCon, &Vec<Type>)> {
    match p {
        Pred::Dict { ev, class_con, args } => Some((ev, class_con, args)),
        _ => None,
    }
}

/// Shallow equality of two followed variable heads.
fn shallow_var_eq(a: &Type, b: &Type) -> bool {
    match (a, b) {
        (Type::Meta(m1), Type::Meta(m2)) => m1 == m2,
        (Type::Var(v1), Type::Var(v2)) => v1 == v2,
        _ => false,
    }
}

fn occurs_rigid(v: &crate::ty::TyVar, ty: &Type) -> bool {
    let mut fvs = Vec::new();
    crate::ty::free_ty_vars(ty, &mut fvs);
    fvs.contains(v)
}
