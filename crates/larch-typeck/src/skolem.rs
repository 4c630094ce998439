//! Opening polytypes: instantiation and skolemization.
//!
//! `instantiate` replaces forall binders with fresh unification variables
//! at the current level and lifts context predicates into fresh wanted
//! evidence variables. `skolemize` replaces binders with fresh rigid
//! variables at the current level and splits off the context as givens;
//! deep skolemization continues into foralls on the result side of arrows.

use crate::constraint::Ct;
use crate::evidence::{EvVar, Wrapper};
use crate::tc::TypeChecker;
use crate::ty::{peel_top_gen, split_arrow, subst_ty_vars, TyVar, Type};

impl TypeChecker {
    /// Open a polytype with fresh unification variables. Returns the
    /// evidence variables for the context, the wanted constraints they
    /// witness (not yet emitted), and the instantiated body.
    pub(crate) fn instantiate(&mut self, polytype: &Type) -> (Vec<EvVar>, Vec<Ct>, Type) {
        let t = self.follow(polytype.clone());
        let (tvs, preds, body) = peel_top_gen(&t);

        let subst: Vec<(TyVar, Type)> = tvs
            .iter()
            .map(|tv| {
                let m = self.fresh_meta_named(&tv.name, tv.kind.clone());
                (tv.clone(), Type::Meta(m))
            })
            .collect();

        let body = subst_ty_vars(&subst, &body);
        let mut evs = Vec::new();
        let mut wanteds = Vec::new();
        let span = self.current_span();
        for p in &preds {
            let p = subst_ty_vars(&subst, p);
            let ev = self.fresh_dvar(&p);
            evs.push(ev.clone());
            wanteds.push(Ct::with_span(ev, p, span));
        }
        (evs, wanteds, body)
    }

    /// Instantiate and emit the context wanteds into the active buffer.
    /// Returns the use-site wrapper (type and evidence applications) and
    /// the instantiated body.
    pub(crate) fn instantiate_emit(&mut self, polytype: &Type) -> (Wrapper, Vec<EvVar>, Type) {
        let (evs, wanteds, body) = self.instantiate(polytype);
        self.emit_wanteds(wanteds);
        let wrap = if evs.is_empty() {
            Wrapper::Id
        } else {
            Wrapper::EvApp(evs.clone())
        };
        (wrap, evs, body)
    }

    /// Open a polytype with fresh rigid skolems at the current level.
    /// Returns the generalization wrapper, the skolems, the context as
    /// givens, and the rho body. With `deep`, skolemization continues
    /// through foralls and contexts on the result side of arrows.
    pub(crate) fn skolemize(
        &mut self,
        polytype: &Type,
        deep: bool,
    ) -> (Wrapper, Vec<TyVar>, Vec<Ct>, Type) {
        let mut skolems = Vec::new();
        let mut givens = Vec::new();
        let body = self.skolemize_go(polytype, deep, &mut skolems, &mut givens);

        let mut wrap = Wrapper::Id;
        if !skolems.is_empty() {
            wrap = wrap.then(Wrapper::TyLam(skolems.clone()));
        }
        let ev_vars: Vec<EvVar> = givens.iter().map(|g| g.ev.clone()).collect();
        if !ev_vars.is_empty() {
            wrap = wrap.then(Wrapper::EvLam(ev_vars));
        }
        (wrap, skolems, givens, body)
    }

    fn skolemize_go(
        &mut self,
        ty: &Type,
        deep: bool,
        skolems: &mut Vec<TyVar>,
        givens: &mut Vec<Ct>,
    ) -> Type {
        let t = self.follow(ty.clone());
        match t {
            Type::Forall(vs, body) => {
                let level = self.current_level();
                let subst: Vec<(TyVar, Type)> = vs
                    .iter()
                    .map(|v| {
                        let sk = self.fresh_ty_var(&v.name, level, v.kind.clone());
                        skolems.push(sk.clone());
                        (v.clone(), Type::Var(sk))
                    })
                    .collect();
                let body = subst_ty_vars(&subst, &body);
                self.skolemize_go(&body, deep, skolems, givens)
            }
            Type::Constrained(preds, body) => {
                let span = self.current_span();
                for p in &preds {
                    let ev = self.fresh_dvar(p);
                    givens.push(Ct::with_span(ev, p.clone(), span));
                }
                self.skolemize_go(&body, deep, skolems, givens)
            }
            other => {
                if deep {
                    if let Some((arg, res)) = split_arrow(&other) {
                        let res = self.skolemize_go(&res, deep, skolems, givens);
                        return Type::arrow(arg, res);
                    }
                }
                other
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::KindEnv;
    use crate::ty::{add_constraints, add_forall, Kind};
    use crate::TypeckOptions;

    fn tc() -> TypeChecker {
        TypeChecker::new(KindEnv::default(), TypeckOptions::default())
    }

    fn num_pred(ty: Type) -> Type {
        Type::apply(Type::con("Num", Kind::n_args(1)), vec![ty])
    }

    fn id_polytype(tc: &mut TypeChecker) -> Type {
        let a = tc.fresh_ty_var("a", 0, Kind::Star);
        add_forall(
            vec![a.clone()],
            Type::arrow(Type::Var(a.clone()), Type::Var(a)),
        )
    }

    #[test]
    fn instantiate_gives_fresh_vars_each_time() {
        let mut tc = tc();
        let poly = id_polytype(&mut tc);
        let (_, _, t1) = tc.instantiate(&poly);
        let (_, _, t2) = tc.instantiate(&poly);
        assert!(!tc.same_type(&t1, &t2));
        // But each instantiation is an arrow from a variable to itself.
        let (a1, r1) = crate::ty::split_arrow(&t1).unwrap();
        assert!(tc.same_type(&a1, &r1));
    }

    #[test]
    fn instantiate_lifts_context_into_wanteds() {
        let mut tc = tc();
        let a = tc.fresh_ty_var("a", 0, Kind::Star);
        let poly = add_forall(
            vec![a.clone()],
            add_constraints(
                vec![num_pred(Type::Var(a.clone()))],
                Type::arrow(Type::Var(a.clone()), Type::Var(a)),
            ),
        );
        let (evs, wanteds, _) = tc.instantiate(&poly);
        assert_eq!(evs.len(), 1);
        assert_eq!(wanteds.len(), 1);
        assert_eq!(evs[0].name, "dNum");
    }

    #[test]
    fn skolemize_yields_rigid_vars_and_givens() {
        let mut tc = tc();
        let a = tc.fresh_ty_var("a", 0, Kind::Star);
        let poly = add_forall(
            vec![a.clone()],
            add_constraints(
                vec![num_pred(Type::Var(a.clone()))],
                Type::arrow(Type::Var(a.clone()), Type::Var(a)),
            ),
        );
        tc.level = 1;
        let (_, skols, givens, rho) = tc.skolemize(&poly, false);
        assert_eq!(skols.len(), 1);
        assert!(skols[0].is_skolem());
        assert_eq!(skols[0].level(), 1);
        assert_eq!(givens.len(), 1);
        let (arg, _) = crate::ty::split_arrow(&rho).unwrap();
        assert_eq!(arg, Type::Var(skols[0].clone()));
    }

    #[test]
    fn deep_skolemize_reaches_nested_foralls() {
        let mut tc = tc();
        // Int -> (forall b. b -> b)
        let b = tc.fresh_ty_var("b", 0, Kind::Star);
        let inner = add_forall(
            vec![b.clone()],
            Type::arrow(Type::Var(b.clone()), Type::Var(b)),
        );
        let poly = Type::arrow(Type::int(), inner);

        let (_, shallow_skols, _, _) = tc.skolemize(&poly, false);
        assert!(shallow_skols.is_empty());

        let (_, deep_skols, _, rho) = tc.skolemize(&poly, true);
        assert_eq!(deep_skols.len(), 1);
        let (_, res) = crate::ty::split_arrow(&rho).unwrap();
        assert!(crate::ty::split_arrow(&res).is_some());
    }
}
