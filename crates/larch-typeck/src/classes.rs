//! Classes and instances: registration, lookup, and elaboration.
//!
//! Instance lookup matches a wanted predicate one-way against each
//! registered instance head, then prunes matches that are strictly less
//! specific than another. Superclass navigation searches the DAG of
//! extractor functions recorded per class. Instance bodies elaborate to a
//! dfun: superclass dictionary fields derived from the instance context
//! plus one entry per class method.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::ast::{ClassDecl, FunDecl, InstanceDecl, Name, TypeFamInstance};
use crate::constraint::Ct;
use crate::elab::DFunDecl;
use crate::env::{ClassInfo, InstanceInfo};
use crate::error::TypeError;
use crate::evidence::{EvDecls, EvExpr, EvVar, Wrapper};
use crate::tc::{unqualified, TypeChecker};
use crate::ty::{
    add_constraints, add_forall, free_ty_vars, split_equality, subst_ty_vars, TyCon, TyVar,
    Type,
};

impl TypeChecker {
    // ── Class registration ──────────────────────────────────────────────

    /// Record a class: superclass extractors, member polytypes, defaults.
    pub(crate) fn register_class(&mut self, decl: &ClassDecl) {
        let class_head = Type::apply(
            Type::con(decl.name.as_str(), crate::ty::Kind::n_args(decl.ty_vars.len())),
            decl.ty_vars.iter().map(|v| Type::Var(v.clone())).collect(),
        );

        let mut extractors = Vec::new();
        for (i, sup) in decl.supers.iter().enumerate() {
            let ev = self.fresh_ev_var(&format!("sc{}{}", unqualified(&decl.name), i));
            let extractor_ty = add_forall(
                decl.ty_vars.clone(),
                add_constraints(vec![class_head.clone()], sup.clone()),
            );
            extractors.push((ev, extractor_ty));
        }

        // Members go into the value environment with the class constraint
        // prepended: `forall as. C as => sig`.
        for (member, sig) in &decl.members {
            let polytype = add_forall(
                decl.ty_vars.clone(),
                add_constraints(vec![class_head.clone()], sig.clone()),
            );
            self.values.bind(member.clone(), polytype);
        }

        let mut default_methods = FxHashMap::default();
        for dm in &decl.default_methods {
            default_methods.insert(dm.name.clone(), format!("dm{}", dm.name));
        }

        self.classes.insert(ClassInfo {
            name: decl.name.clone(),
            ty_vars: decl.ty_vars.clone(),
            supers: decl.supers.clone(),
            superclass_extractors: extractors,
            members: decl.members.clone(),
            default_methods,
        });
    }

    /// Type the default method bodies of a class. Each is checked like a
    /// single function declaration whose signature is the member signature
    /// with the class constraint prepended.
    pub(crate) fn check_class_defaults(&mut self, decl: &ClassDecl) {
        let info = match self.classes.get(&decl.name) {
            Some(i) => i.clone(),
            None => return,
        };
        let class_head = Type::apply(
            Type::con(decl.name.as_str(), crate::ty::Kind::n_args(info.ty_vars.len())),
            info.ty_vars.iter().map(|v| Type::Var(v.clone())).collect(),
        );
        for dm in &decl.default_methods {
            let Some((_, sig)) = info.members.iter().find(|(m, _)| m == &dm.name) else {
                self.record(TypeError::MethodNotInClass {
                    class: decl.name.clone(),
                    method: dm.name.clone(),
                });
                continue;
            };
            let dm_sig = add_forall(
                info.ty_vars.clone(),
                add_constraints(vec![class_head.clone()], sig.clone()),
            );
            let dm_name = info
                .default_methods
                .get(&dm.name)
                .cloned()
                .unwrap_or_else(|| format!("dm{}", dm.name));
            let mut fd = dm.clone();
            fd.name = dm_name.clone();
            let gen = self.infer_single_fundecl_with_sig(&fd, &dm_sig);
            self.elab_binds.push(gen);
            self.values.bind(dm_name, dm_sig);
        }
    }

    // ── Instance registration (pass 1) ──────────────────────────────────

    /// Validate an instance head and enter it into the instance
    /// environment under a fresh dfun name. Bodies are checked in a later
    /// pass, once every instance is visible.
    pub(crate) fn register_instance(
        &mut self,
        decl: &InstanceDecl,
    ) -> Option<(EvVar, InstanceDecl)> {
        self.with_span(decl.span, |tc| {
            let (head, args) = crate::ty::decompose_apps(&decl.head);
            let class_con = match head {
                Type::Con(tc0) => tc0,
                _ => {
                    tc.record(TypeError::NoSuchClass { name: format!("{}", decl.head) });
                    return None;
                }
            };

            let Some(class_info) = tc.classes.get(&class_con.name).cloned() else {
                tc.record(TypeError::NoSuchClass { name: class_con.name.clone() });
                return None;
            };

            if args.len() != class_info.ty_vars.len() {
                tc.record(TypeError::ClassArityMismatch {
                    class: class_con.name.clone(),
                    expected: class_info.ty_vars.len(),
                    found: args.len(),
                });
                return None;
            }

            // Context variables must be mentioned in the head.
            let mut head_tvs = Vec::new();
            free_ty_vars(&decl.head, &mut head_tvs);
            for ctx_pred in &decl.context {
                let mut ctx_tvs = Vec::new();
                free_ty_vars(ctx_pred, &mut ctx_tvs);
                for tv in ctx_tvs {
                    if !head_tvs.contains(&tv) {
                        tc.record(TypeError::EscapingSkolem {
                            var: tv,
                            pred: ctx_pred.clone(),
                        });
                    }
                }
            }

            let dfun_name = dfun_name_for(&class_con.name, &args);
            let dfun = tc.fresh_ev_var(&dfun_name);

            let info = InstanceInfo {
                ty_vars: head_tvs,
                context: decl.context.clone(),
                class_con,
                args,
            };
            debug!(dfun = %dfun, head = %info.polytype(), "registered instance");
            tc.instances.insert(dfun.clone(), info);
            Some((dfun, decl.clone()))
        })
    }

    // ── Type-family instances ───────────────────────────────────────────

    /// Validate a family equation and record it as a `~` instance, so the
    /// solver's top-level reaction can rewrite family applications.
    pub(crate) fn register_type_family_instance(&mut self, inst: &TypeFamInstance) {
        self.with_span(inst.span, |tc| {
            let Some(arity) = tc.kinds.family_arity(&inst.family) else {
                tc.record(TypeError::NoSuchFamily { name: inst.family.clone() });
                return;
            };
            if inst.args.len() != arity {
                tc.record(TypeError::FamilyArityMismatch {
                    family: inst.family.clone(),
                    expected: arity,
                    found: inst.args.len(),
                });
                return;
            }

            let mut lhs_tvs = Vec::new();
            for arg in &inst.args {
                free_ty_vars(arg, &mut lhs_tvs);
            }
            let mut rhs_tvs = Vec::new();
            free_ty_vars(&inst.rhs, &mut rhs_tvs);
            for tv in rhs_tvs {
                if !lhs_tvs.contains(&tv) {
                    tc.record(TypeError::UnboundFamilyRhsVar {
                        family: inst.family.clone(),
                        var: tv,
                    });
                    return;
                }
            }

            let fam_con = crate::ast::tycon_in(&tc.kinds, &inst.family);
            let lhs = Type::apply(Type::Con(fam_con), inst.args.clone());
            let axiom = tc.fresh_ev_var(&format!("ax{}", unqualified(&inst.family)));
            tc.instances.insert(
                axiom,
                InstanceInfo {
                    ty_vars: lhs_tvs,
                    context: Vec::new(),
                    class_con: TyCon::equality(),
                    args: vec![lhs, inst.rhs.clone()],
                },
            );
        })
    }

    /// Match a family application against the registered equations.
    /// Returns the axiom and the instantiated right-hand side.
    pub(crate) fn lookup_family_instance(&mut self, fam_app: &Type) -> Option<(EvVar, Type)> {
        let candidates: Vec<(EvVar, Type)> = self
            .instances
            .iter()
            .filter(|(_, info)| info.class_con.name == "~")
            .map(|(ax, info)| (ax.clone(), info.polytype()))
            .collect();

        for (axiom, poly) in candidates {
            let (_, _, body) = self.instantiate(&poly);
            let Some((lhs, rhs)) = split_equality(&body) else { continue };
            if self.maybe_match(&lhs, fam_app) {
                let rhs = self.zonk(&rhs);
                return Some((axiom, rhs));
            }
        }
        None
    }

    // ── Instance lookup ─────────────────────────────────────────────────

    /// Resolve a wanted dictionary predicate against the instance set.
    /// On success, returns the dfun applied to fresh evidence variables
    /// and the super-wanteds those variables must witness.
    pub(crate) fn lookup_instance(&mut self, target: &Type) -> Option<(EvExpr, Vec<Ct>)> {
        if !self.possible_instance_for(target) {
            return None;
        }
        let (head, _) = self.decompose(target);
        let target_class = match head {
            Type::Con(tc0) => tc0,
            _ => return None,
        };

        let entries: Vec<(EvVar, Type)> = self
            .instances
            .iter()
            .filter(|(_, info)| info.class_con == target_class)
            .map(|(dfun, info)| (dfun.clone(), info.polytype()))
            .collect();

        let mut matching: Vec<(EvExpr, Vec<Ct>, Type)> = Vec::new();
        for (dfun, poly) in entries {
            let (evs, wanteds, instance_head) = self.instantiate(&poly);
            if !self.maybe_match(&instance_head, target) {
                continue;
            }
            let dfun_exp =
                EvExpr::app(EvExpr::var(dfun), evs.into_iter().map(EvExpr::var).collect());
            matching.push((dfun_exp, wanteds, poly));
        }

        if matching.is_empty() {
            return None;
        }

        // Prune every candidate strictly less specific than another.
        let mut keep = vec![true; matching.len()];
        for i in 0..matching.len() {
            for j in 0..matching.len() {
                if i != j && self.more_specific_than(&matching[j].2.clone(), &matching[i].2.clone())
                {
                    keep[i] = false;
                    break;
                }
            }
        }
        let mut survivors: Vec<(EvExpr, Vec<Ct>, Type)> = matching
            .into_iter()
            .zip(keep)
            .filter_map(|(m, k)| k.then_some(m))
            .collect();

        if survivors.len() > 1 {
            let pred = self.zonk(target);
            let candidates = survivors.iter().map(|(_, _, t)| t.clone()).collect();
            self.record(TypeError::OverlappingInstances { pred, candidates });
            return None;
        }

        let (dfun_exp, wanteds, _) = survivors.pop().expect("at least one survivor");
        Some((dfun_exp, wanteds))
    }

    /// An instance can only match once some argument has a concrete head.
    pub(crate) fn possible_instance_for(&mut self, pred: &Type) -> bool {
        let (head, args) = self.decompose(pred);
        if !matches!(head, Type::Con(_)) {
            return false;
        }
        args.iter().any(|a| !self.is_type_variable(a))
    }

    fn is_type_variable(&mut self, ty: &Type) -> bool {
        matches!(self.follow(ty.clone()), Type::Meta(_) | Type::Var(_))
    }

    fn instance_matches(&mut self, general: &Type, specific: &Type) -> bool {
        let (_, _, head_g) = self.instantiate(general);
        let (_, _, head_s) = self.instantiate(specific);
        self.maybe_match(&head_g, &head_s)
    }

    /// `a` is more specific than `b` iff `a` is a substitution instance of
    /// `b` but not vice versa.
    fn more_specific_than(&mut self, a: &Type, b: &Type) -> bool {
        self.instance_matches(b, a) && !self.instance_matches(a, b)
    }

    // ── Superclasses ────────────────────────────────────────────────────

    /// The immediate superclass constraints reachable from `constraint`,
    /// with the extractor that projects each one.
    pub(crate) fn superclass_constraints(&mut self, constraint: &Type) -> Vec<(EvVar, Type)> {
        let (head, _) = self.decompose(constraint);
        let Type::Con(class_con) = head else { return Vec::new() };
        let Some(info) = self.classes.get(&class_con.name).cloned() else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for (extractor, extractor_ty) in &info.superclass_extractors {
            let (_, wanteds, super_constraint) = self.instantiate(extractor_ty);
            debug_assert_eq!(wanteds.len(), 1);
            let premise = wanteds[0].pred.clone();
            if !self.maybe_match(&premise, constraint) {
                continue;
            }
            let super_constraint = self.zonk(&super_constraint);
            out.push((extractor.clone(), super_constraint));
        }
        out
    }

    /// The chain of extractors projecting a dictionary for `target` out of
    /// a dictionary for `source`, if one exists. Empty chain means the two
    /// constraints are the same.
    pub(crate) fn is_superclass_of(
        &mut self,
        target: &Type,
        source: &Type,
    ) -> Option<Vec<EvVar>> {
        if self.same_type(target, source) {
            return Some(Vec::new());
        }
        for (extractor, super_constraint) in self.superclass_constraints(source) {
            if let Some(mut chain) = self.is_superclass_of(target, &super_constraint) {
                chain.push(extractor);
                return Some(chain);
            }
        }
        None
    }

    /// If the wanted constraint is reachable from the given by superclass
    /// projection, produce the witnessing evidence binding.
    pub(crate) fn entails_by_superclass(
        &mut self,
        given: (&EvVar, &Type),
        wanted: (&EvVar, &Type),
    ) -> Option<EvDecls> {
        let (given_ev, given_pred) = given;
        let (wanted_ev, wanted_pred) = wanted;
        let chain = self.is_superclass_of(wanted_pred, given_pred)?;

        // wanted = chain[n-1] (... (chain[0] given))
        let mut expr = EvExpr::var(given_ev.clone());
        for extractor in chain {
            expr = EvExpr::app(EvExpr::var(extractor), vec![expr]);
        }
        let mut decls = EvDecls::new();
        decls.push(wanted_ev.clone(), expr);
        Some(decls)
    }

    /// Discharge a predicate using instances alone, recursively. Used by
    /// defaulting to probe candidate types without touching the inert set.
    pub(crate) fn entails_top(&mut self, ev: &EvVar, pred: &Type) -> Option<EvDecls> {
        let (dfun_exp, super_wanteds) = self.lookup_instance(pred)?;
        let mut decls = EvDecls::new();
        for ct in &super_wanteds {
            let pred = self.zonk(&ct.pred);
            let sub = self.entails_top(&ct.ev, &pred)?;
            decls.append(sub);
        }
        decls.push(ev.clone(), dfun_exp);
        Some(decls)
    }

    // ── Instance bodies (pass 2) ────────────────────────────────────────

    /// Elaborate every registered instance's dfun body and check its
    /// method definitions against the instance-substituted signatures.
    pub(crate) fn check_instance_bodies(
        &mut self,
        named: &[(EvVar, InstanceDecl)],
    ) -> Vec<DFunDecl> {
        named
            .iter()
            .map(|(dfun, decl)| self.check_instance_body(dfun, decl))
            .collect()
    }

    fn check_instance_body(&mut self, dfun: &EvVar, decl: &InstanceDecl) -> DFunDecl {
        self.with_note(format!("In instance `{}`", decl.head), |tc| {
            tc.with_span(decl.span, |tc| tc.check_instance_body_inner(dfun, decl))
        })
    }

    fn check_instance_body_inner(&mut self, dfun: &EvVar, decl: &InstanceDecl) -> DFunDecl {
        let info = self
            .instances
            .iter()
            .find(|(d, _)| d == dfun)
            .map(|(_, i)| i.clone())
            .expect("instance registered in pass 1");
        let inst_type = info.polytype();

        // Skolemize the instance type one level down; the superclass
        // fields are derived from the class context under those givens.
        let inner_level = self.current_level() + 1;
        let (skolems, givens, instance_args) = self.at_level(inner_level, |tc| {
            let (_, skolems, givens, instance_head) = tc.skolemize(&inst_type, true);
            let (_, instance_args) = tc.decompose(&instance_head);
            (skolems, givens, instance_args)
        });

        let class_info = self
            .classes
            .get(&info.class_con.name)
            .cloned()
            .expect("class checked in pass 1");

        // Class variables mapped to the skolemized head arguments, for
        // deriving superclass fields under the instance givens.
        let super_subst: Vec<(TyVar, Type)> = class_info
            .ty_vars
            .iter()
            .cloned()
            .zip(instance_args.iter().cloned())
            .collect();

        // Superclass wanteds, solved under the instance givens.
        let ev_decls = crate::evidence::shared_ev_decls();
        let mut dict_entries: Vec<EvExpr> = Vec::new();
        let ((), super_wanteds) = self.with_child_wanteds(true, |tc| {
            tc.with_note(
                format!("Deriving superclass constraints for `{}`", decl.head),
                |tc| {
                    for sup in &class_info.supers {
                        let pred = subst_ty_vars(&super_subst, sup);
                        let ev = tc.fresh_dvar(&pred);
                        let span = tc.current_span();
                        tc.emit_wanted(Ct::with_span(ev, pred, span));
                    }
                },
            );
        });
        for ct in &super_wanteds.simple {
            dict_entries.push(EvExpr::var(ct.ev.clone()));
        }
        self.emit_implication(
            skolems,
            givens.clone(),
            super_wanteds,
            ev_decls.clone(),
            decl.span,
        );

        // Methods.
        let given_evs: Vec<EvExpr> =
            givens.iter().map(|g| EvExpr::var(g.ev.clone())).collect();
        let mut method_matches: FxHashMap<Name, FunDecl> = FxHashMap::default();
        for fd in &decl.methods {
            if !class_info.members.iter().any(|(m, _)| m == &fd.name) {
                self.record(TypeError::MethodNotInClass {
                    class: class_info.name.clone(),
                    method: fd.name.clone(),
                });
                continue;
            }
            if method_matches.contains_key(&fd.name) {
                self.record(TypeError::DuplicateMethod {
                    class: class_info.name.clone(),
                    method: fd.name.clone(),
                });
                continue;
            }
            method_matches.insert(fd.name.clone(), fd.clone());
        }

        // Class variables mapped to the declared head arguments, for the
        // method signatures (which quantify the declared variables).
        let method_subst: Vec<(TyVar, Type)> = class_info
            .ty_vars
            .iter()
            .cloned()
            .zip(info.args.iter().cloned())
            .collect();

        let mut method_binds = Vec::new();
        for (method, method_sig) in &class_info.members {
            let op = format!("i{}'{}", method, self.fresh_uniq());
            let op_ev = EvVar::new(op.clone(), 0);
            dict_entries.push(EvExpr::app(EvExpr::var(op_ev), given_evs.clone()));

            // forall as. ctx => [class vars := instance args] member_sig
            let op_type = add_forall(
                info.ty_vars.clone(),
                add_constraints(
                    info.context.clone(),
                    subst_ty_vars(&method_subst, method_sig),
                ),
            );

            let fd = match method_matches.get(method) {
                Some(fd) => {
                    let mut fd = fd.clone();
                    fd.name = op.clone();
                    fd
                }
                None => match class_info.default_methods.get(method) {
                    Some(dm_name) => {
                        FunDecl::simple(op.clone(), crate::ast::Expr::var(dm_name.clone()))
                    }
                    None => {
                        self.record(TypeError::MissingMethod {
                            class: class_info.name.clone(),
                            method: method.clone(),
                            instance_head: decl.head.clone(),
                        });
                        continue;
                    }
                },
            };

            self.with_note(format!("In method `{}`", method), |tc| {
                let gen = tc.infer_single_fundecl_with_sig(&fd, &op_type);
                method_binds.push(gen);
            });
        }

        DFunDecl {
            dfun: dfun.clone(),
            wrapper: Wrapper::Let(ev_decls),
            dict: EvExpr::Tuple(dict_entries),
            method_binds,
        }
    }
}

/// The naming scheme for dfuns: `d<Class><TyconName...>`, with `_` for
/// type-variable arguments, `List` for the list constructor, and
/// `<n>Tuple` for tuples.
pub(crate) fn dfun_name_for(class_name: &str, args: &[Type]) -> String {
    let mut name = format!("d{}", unqualified(class_name));
    for arg in args {
        let (head, _) = crate::ty::decompose_apps(arg);
        match head {
            Type::Con(tc) => name.push_str(&tycon_display_name(&tc.name)),
            _ => name.push('_'),
        }
    }
    name
}

fn tycon_display_name(name: &str) -> String {
    match name {
        "[]" => "List".to_string(),
        "->" => "Func".to_string(),
        n if n.starts_with('(') && n.ends_with(')') => {
            format!("{}Tuple", n.len() - 1)
        }
        n => unqualified(n).to_string(),
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

    fn class_con(name: &str) -> TyCon {
        TyCon::new(name, Kind::n_args(1))
    }

    fn pred(class: &str, ty: Type) -> Type {
        Type::apply(Type::Con(class_con(class)), vec![ty])
    }

    fn eq_class() -> ClassDecl {
        let a = TyVar::named("a", 100, Kind::Star);
        ClassDecl {
            name: "Eq".into(),
            ty_vars: vec![a.clone()],
            supers: vec![],
            members: vec![(
                "==".into(),
                Type::function(vec![Type::Var(a.clone()), Type::Var(a)], Type::bool()),
            )],
            default_methods: vec![],
            span: None,
        }
    }

    fn ord_class() -> ClassDecl {
        let a = TyVar::named("a", 101, Kind::Star);
        ClassDecl {
            name: "Ord".into(),
            ty_vars: vec![a.clone()],
            supers: vec![pred("Eq", Type::Var(a.clone()))],
            members: vec![(
                "<=".into(),
                Type::function(vec![Type::Var(a.clone()), Type::Var(a)], Type::bool()),
            )],
            default_methods: vec![],
            span: None,
        }
    }

    fn install_eq_int(tc: &mut TypeChecker) -> EvVar {
        let dfun = tc.fresh_ev_var("dEqInt");
        tc.instances.insert(
            dfun.clone(),
            InstanceInfo {
                ty_vars: vec![],
                context: vec![],
                class_con: class_con("Eq"),
                args: vec![Type::int()],
            },
        );
        dfun
    }

    #[test]
    fn lookup_rejects_all_variable_heads() {
        let mut tc = tc();
        install_eq_int(&mut tc);
        let a = tc.fresh_meta_ty(Kind::Star);
        assert!(tc.lookup_instance(&pred("Eq", a)).is_none());
    }

    #[test]
    fn lookup_finds_a_ground_instance() {
        let mut tc = tc();
        install_eq_int(&mut tc);
        let (dfun_exp, supers) = tc.lookup_instance(&pred("Eq", Type::int())).unwrap();
        assert!(supers.is_empty());
        assert!(format!("{}", dfun_exp).starts_with("dEqInt"));
    }

    #[test]
    fn lookup_instantiates_context_into_super_wanteds() {
        let mut tc = tc();
        install_eq_int(&mut tc);
        let a = TyVar::named("a", 7, Kind::Star);
        let dfun = tc.fresh_ev_var("dEqList");
        tc.instances.insert(
            dfun,
            InstanceInfo {
                ty_vars: vec![a.clone()],
                context: vec![pred("Eq", Type::Var(a.clone()))],
                class_con: class_con("Eq"),
                args: vec![Type::list(Type::Var(a))],
            },
        );

        let (_, supers) = tc
            .lookup_instance(&pred("Eq", Type::list(Type::int())))
            .unwrap();
        assert_eq!(supers.len(), 1);
        let sup = tc.zonk(&supers[0].pred);
        assert_eq!(format!("{}", sup), "Eq Int");
    }

    #[test]
    fn specificity_pruning_keeps_the_narrower_instance() {
        let mut tc = tc();
        // Eq [a] (general) and Eq [Int] (specific) both match Eq [Int].
        let a = TyVar::named("a", 8, Kind::Star);
        let general = tc.fresh_ev_var("dEqList");
        tc.instances.insert(
            general,
            InstanceInfo {
                ty_vars: vec![a.clone()],
                context: vec![],
                class_con: class_con("Eq"),
                args: vec![Type::list(Type::Var(a))],
            },
        );
        let specific = tc.fresh_ev_var("dEqListInt");
        tc.instances.insert(
            specific,
            InstanceInfo {
                ty_vars: vec![],
                context: vec![],
                class_con: class_con("Eq"),
                args: vec![Type::list(Type::int())],
            },
        );

        let (dfun_exp, _) = tc
            .lookup_instance(&pred("Eq", Type::list(Type::int())))
            .unwrap();
        assert!(format!("{}", dfun_exp).starts_with("dEqListInt"));
        assert!(tc.errors.is_empty());
    }

    #[test]
    fn superclass_chain_projects_eq_out_of_ord() {
        let mut tc = tc();
        tc.register_class(&eq_class());
        tc.register_class(&ord_class());

        let given_ev = tc.fresh_ev_var("dOrd");
        let wanted_ev = tc.fresh_ev_var("dEq");
        let given_pred = pred("Ord", Type::int());
        let wanted_pred = pred("Eq", Type::int());

        let decls = tc
            .entails_by_superclass((&given_ev, &given_pred), (&wanted_ev, &wanted_pred))
            .expect("Eq is a superclass of Ord");
        assert_eq!(decls.len(), 1);
        let (ev, expr) = &decls.0[0];
        assert_eq!(ev, &wanted_ev);
        assert!(format!("{}", expr).contains("scOrd0"));
    }

    #[test]
    fn dfun_names_encode_the_argument_tycons() {
        assert_eq!(dfun_name_for("Eq", &[Type::int()]), "dEqInt");
        assert_eq!(
            dfun_name_for("Eq", &[Type::list(Type::Var(TyVar::named(
                "a",
                0,
                Kind::Star
            )))]),
            "dEqList"
        );
        assert_eq!(
            dfun_name_for("Eq", &[Type::Tuple(vec![Type::int(), Type::int()])]),
            "dEq2Tuple"
        );
    }
}
