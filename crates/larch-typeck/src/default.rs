//! Defaulting of ambiguous constraints.
//!
//! A residual constraint group over a single unification variable whose
//! classes include a numeric one is resolved by the `default (...)`
//! candidate list: the first candidate type satisfying every constraint
//! in the group (via the instance resolver alone) fills the variable and
//! discharges the group's evidence. Groups that survive defaulting are
//! the caller's to report as ambiguous.

use tracing::debug;

use crate::constraint::Ct;
use crate::evidence::EvDecls;
use crate::tc::{unqualified, TypeChecker};
use crate::ty::{Kind, TyMeta, Type};

const NUMERIC_CLASSES: [&str; 2] = ["Num", "Fractional"];

impl TypeChecker {
    /// Try to default every single-variable constraint group. Returns the
    /// discharged evidence and the constraints defaulting could not fix.
    pub(crate) fn apply_defaulting(&mut self, residual: Vec<Ct>) -> (EvDecls, Vec<Ct>) {
        let mut groups: Vec<(TyMeta, Vec<Ct>)> = Vec::new();
        let mut leftover: Vec<Ct> = Vec::new();

        for ct in residual {
            match self.defaultable_var(&ct) {
                Some(m) => match groups.iter_mut().find(|(g, _)| *g == m) {
                    Some((_, cts)) => cts.push(ct),
                    None => groups.push((m, vec![ct])),
                },
                None => leftover.push(ct),
            }
        }

        let mut decls = EvDecls::new();
        for (m, cts) in groups {
            let has_numeric = cts.iter().any(|ct| {
                let (head, _) = self.decompose(&ct.pred);
                matches!(head, Type::Con(c) if NUMERIC_CLASSES.contains(&unqualified(&c.name)))
            });
            if !has_numeric {
                leftover.extend(cts);
                continue;
            }

            match self.pick_default(m, &cts) {
                Some((candidate, cand_decls)) => {
                    debug!(var = %Type::Meta(m), ty = %candidate, "defaulted");
                    self.fill_meta(m, candidate);
                    decls.append(cand_decls);
                }
                None => leftover.extend(cts),
            }
        }

        (decls, leftover)
    }

    /// A constraint participates in defaulting when it is a single-
    /// parameter class predicate over exactly one unification variable.
    fn defaultable_var(&mut self, ct: &Ct) -> Option<TyMeta> {
        let mut metas = Vec::new();
        self.free_metas(&ct.pred, &mut metas);
        let [m] = metas.as_slice() else { return None };
        let m = *m;

        let (head, args) = self.decompose(&ct.pred);
        match head {
            Type::Con(c) if c.name != "~" && args.len() == 1 => {
                match self.follow(args[0].clone()) {
                    Type::Meta(m2) if m2 == m => Some(m),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// The first default candidate satisfying every constraint in the
    /// group, together with the evidence that discharges them.
    fn pick_default(&mut self, m: TyMeta, cts: &[Ct]) -> Option<(Type, EvDecls)> {
        let candidates = self.options.defaults.clone();
        'candidates: for name in candidates {
            let candidate = Type::con(name.as_str(), Kind::Star);
            let mut cand_decls = EvDecls::new();
            for ct in cts {
                let pred = self.subst_meta(&ct.pred, m, &candidate);
                match self.entails_top(&ct.ev, &pred) {
                    Some(d) => cand_decls.append(d),
                    None => continue 'candidates,
                }
            }
            return Some((candidate, cand_decls));
        }
        None
    }

    /// Replace a unification variable by a ground type, structurally.
    fn subst_meta(&mut self, ty: &Type, m: TyMeta, to: &Type) -> Type {
        match self.follow(ty.clone()) {
            Type::Meta(m2) if m2 == m => to.clone(),
            t @ (Type::Meta(_) | Type::Var(_) | Type::Con(_)) => t,
            Type::App(a, b) => Type::App(
                Box::new(self.subst_meta(&a, m, to)),
                Box::new(self.subst_meta(&b, m, to)),
            ),
            Type::Tuple(ts) => {
                Type::Tuple(ts.iter().map(|t| self.subst_meta(t, m, to)).collect())
            }
            Type::List(t) => Type::List(Box::new(self.subst_meta(&t, m, to))),
            Type::StrictLazy(s, t) => {
                Type::StrictLazy(s, Box::new(self.subst_meta(&t, m, to)))
            }
            Type::Forall(vs, body) => {
                Type::Forall(vs, Box::new(self.subst_meta(&body, m, to)))
            }
            Type::Constrained(ps, body) => Type::Constrained(
                ps.iter().map(|p| self.subst_meta(p, m, to)).collect(),
                Box::new(self.subst_meta(&body, m, to)),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::KindEnv;
    use crate::env::InstanceInfo;
    use crate::ty::TyCon;
    use crate::TypeckOptions;

    fn tc() -> TypeChecker {
        TypeChecker::new(KindEnv::default(), TypeckOptions::default())
    }

    fn ground_instance(tc: &mut TypeChecker, class: &str, ty: Type, dfun: &str) {
        let dfun = tc.fresh_ev_var(dfun);
        tc.instances.insert(
            dfun,
            InstanceInfo {
                ty_vars: vec![],
                context: vec![],
                class_con: TyCon::new(class, Kind::n_args(1)),
                args: vec![ty],
            },
        );
    }

    fn class_wanted(tc: &mut TypeChecker, class: &str, ty: Type) -> Ct {
        let pred = Type::apply(Type::con(class, Kind::n_args(1)), vec![ty]);
        let ev = tc.fresh_dvar(&pred);
        Ct::new(ev, pred)
    }

    #[test]
    fn numeric_group_defaults_to_integer() {
        let mut tc = tc();
        ground_instance(&mut tc, "Num", Type::integer(), "dNumInteger");
        ground_instance(&mut tc, "Show", Type::integer(), "dShowInteger");

        let a = tc.fresh_meta_ty(Kind::Star);
        let w1 = class_wanted(&mut tc, "Num", a.clone());
        let w2 = class_wanted(&mut tc, "Show", a.clone());

        let (decls, leftover) = tc.apply_defaulting(vec![w1, w2]);
        assert!(leftover.is_empty());
        assert_eq!(tc.zonk(&a), Type::integer());
        assert!(decls
            .0
            .iter()
            .any(|(_, expr)| format!("{}", expr).starts_with("dShowInteger")));
    }

    #[test]
    fn non_numeric_group_is_left_alone() {
        let mut tc = tc();
        ground_instance(&mut tc, "Show", Type::integer(), "dShowInteger");
        let a = tc.fresh_meta_ty(Kind::Star);
        let w = class_wanted(&mut tc, "Show", a.clone());
        let (decls, leftover) = tc.apply_defaulting(vec![w]);
        assert!(decls.is_empty());
        assert_eq!(leftover.len(), 1);
        assert!(matches!(tc.follow(a), Type::Meta(_)));
    }

    #[test]
    fn candidate_failing_one_constraint_falls_through() {
        let mut tc = tc();
        // Integer is Num but not Fractional; Double is both.
        ground_instance(&mut tc, "Num", Type::integer(), "dNumInteger");
        ground_instance(&mut tc, "Num", Type::double(), "dNumDouble");
        ground_instance(&mut tc, "Fractional", Type::double(), "dFractionalDouble");

        let a = tc.fresh_meta_ty(Kind::Star);
        let w1 = class_wanted(&mut tc, "Num", a.clone());
        let w2 = class_wanted(&mut tc, "Fractional", a.clone());
        let (_, leftover) = tc.apply_defaulting(vec![w1, w2]);
        assert!(leftover.is_empty());
        assert_eq!(tc.zonk(&a), Type::double());
    }
}
