//! End-to-end inference tests: whole programs through `check_program`,
//! asserting on published polytypes, elaborated evidence, and errors.

use larch_typeck::ast::{
    Binds, Clause, ClassDecl, ConFlavor, Decl, Expr, ForeignDecl, FunDecl, InstanceDecl,
    KindEnv, Lit, Pat, Program, TypeFamInstance,
};
use larch_typeck::error::TypeError;
use larch_typeck::ty::{Kind, TyVar, Type};
use larch_typeck::{check_program, TypeckOptions, TypeckResult};

// ── Helpers ────────────────────────────────────────────────────────────

fn check(program: Program) -> TypeckResult {
    check_program(&program, KindEnv::new(), TypeckOptions::default())
}

fn check_with(program: Program, kinds: KindEnv, options: TypeckOptions) -> TypeckResult {
    check_program(&program, kinds, options)
}

fn program_of(decls: Vec<Decl>) -> Program {
    Program { binds: Binds::new(decls), ..Program::default() }
}

fn fun(name: &str, clauses: Vec<Clause>) -> Decl {
    Decl::Fun(FunDecl { name: name.into(), clauses, span: None })
}

fn clause(pats: Vec<Pat>, rhs: Expr) -> Clause {
    Clause { pats, rhs }
}

fn type_of(result: &TypeckResult, name: &str) -> String {
    format!(
        "{}",
        result
            .types
            .get(name)
            .unwrap_or_else(|| panic!("no published type for `{}`", name))
    )
}

fn assert_clean(result: &TypeckResult) {
    assert!(
        !result.poisoned,
        "expected a clean run, got errors: {:#?}",
        result.errors
    );
}

fn minus(a: Expr, b: Expr) -> Expr {
    Expr::apps(Expr::var("-"), vec![a, b])
}

// ── The classic scenarios ──────────────────────────────────────────────

/// `id x = x` with no signature at top level infers `forall a. a -> a`
/// with no predicates.
#[test]
fn identity_generalizes_with_no_context() {
    let result = check(program_of(vec![fun(
        "id",
        vec![clause(vec![Pat::var("x")], Expr::var("x"))],
    )]));
    assert_clean(&result);
    assert_eq!(type_of(&result, "id"), "forall a. a -> a");

    let gen = &result.binds[0];
    assert_eq!(gen.ty_vars.len(), 1);
    assert!(gen.dict_vars.is_empty());
}

/// `f x = x + x` infers `forall a. Num a => a -> a` and takes one
/// dictionary argument.
#[test]
fn numeric_function_gets_a_num_context() {
    let result = check(program_of(vec![fun(
        "f",
        vec![clause(
            vec![Pat::var("x")],
            Expr::apps(Expr::var("+"), vec![Expr::var("x"), Expr::var("x")]),
        )],
    )]));
    assert_clean(&result);
    assert_eq!(type_of(&result, "f"), "forall a. Num a => a -> a");

    let gen = &result.binds[0];
    assert_eq!(gen.dict_vars.len(), 1, "one dictionary lambda expected");
    assert!(gen.dict_vars[0].name.starts_with("dNum"));
    // The use-site wanted for (+) is discharged from the given.
    assert!(!gen.ev_decls.borrow().is_empty());
}

/// The mutually recursive pair `even`/`odd` is quantified together:
/// both binders get `forall a. (Eq a, Num a) => a -> Bool`.
#[test]
fn mutual_recursion_is_quantified_together() {
    let even = fun(
        "even",
        vec![
            clause(vec![Pat::lit(Lit::Int(0))], Expr::var("True")),
            clause(
                vec![Pat::var("n")],
                Expr::app(Expr::var("odd"), minus(Expr::var("n"), Expr::int(1))),
            ),
        ],
    );
    let odd = fun(
        "odd",
        vec![
            clause(vec![Pat::lit(Lit::Int(0))], Expr::var("False")),
            clause(
                vec![Pat::var("n")],
                Expr::app(Expr::var("even"), minus(Expr::var("n"), Expr::int(1))),
            ),
        ],
    );
    let result = check(program_of(vec![even, odd]));
    assert_clean(&result);

    let even_ty = type_of(&result, "even");
    let odd_ty = type_of(&result, "odd");
    assert_eq!(even_ty, odd_ty, "group members share one polytype");
    assert!(even_ty.starts_with("forall a."), "got `{}`", even_ty);
    assert!(even_ty.contains("Eq a"), "got `{}`", even_ty);
    assert!(even_ty.contains("Num a"), "got `{}`", even_ty);
    assert!(even_ty.ends_with("a -> Bool"), "got `{}`", even_ty);

    // One group, not two.
    assert_eq!(result.binds.len(), 1);
    assert_eq!(result.binds[0].decls.len(), 2);
}

/// `main = show 3` with `default (Integer)`: the ambiguous numeric
/// variable defaults to Integer, and the elaboration dispatches through
/// the built-in `dShowInteger` dictionary.
#[test]
fn show_of_a_literal_defaults_to_integer() {
    let result = check_with(
        program_of(vec![fun(
            "main",
            vec![clause(vec![], Expr::app(Expr::var("show"), Expr::int(3)))],
        )]),
        KindEnv::new(),
        TypeckOptions { defaults: vec!["Integer".into()] },
    );
    assert_clean(&result);
    assert_eq!(type_of(&result, "main"), "[Char]");

    let bound: Vec<String> = result
        .ev_decls
        .0
        .iter()
        .map(|(_, expr)| format!("{}", expr))
        .collect();
    assert!(
        bound.iter().any(|e| e.starts_with("dShowInteger")),
        "expected a dShowInteger dispatch, got {:?}",
        bound
    );
    assert!(
        bound.iter().any(|e| e.starts_with("dNumInteger")),
        "expected a dNumInteger dispatch, got {:?}",
        bound
    );
}

/// `instance Eq a => Eq [a]` used at `[Int]`: the wanted `Eq [Int]`
/// resolves through the instance, whose super-wanted `Eq Int` is
/// discharged by the built-in dfun.
#[test]
fn list_instance_chains_to_element_instance() {
    let a = TyVar::named("a", 0, Kind::Star);
    let eq_a = Type::apply(Type::con("Eq", Kind::n_args(1)), vec![Type::Var(a.clone())]);
    let head = Type::apply(
        Type::con("Eq", Kind::n_args(1)),
        vec![Type::list(Type::Var(a.clone()))],
    );
    let const_true = |arity: usize| {
        vec![clause(
            (0..arity).map(|_| Pat::wild()).collect(),
            Expr::var("True"),
        )]
    };
    let instance = InstanceDecl {
        context: vec![eq_a],
        head,
        methods: vec![
            FunDecl { name: "==".into(), clauses: const_true(2), span: None },
            FunDecl { name: "/=".into(), clauses: const_true(2), span: None },
        ],
        span: None,
    };

    let sig = Type::function(
        vec![Type::list(Type::int()), Type::list(Type::int())],
        Type::bool(),
    );
    let binds = Binds::new(vec![fun("f", vec![clause(vec![], Expr::var("=="))])])
        .with_signature("f", sig);

    let result = check(Program {
        binds,
        instances: vec![instance],
        ..Program::default()
    });
    assert_clean(&result);
    assert_eq!(type_of(&result, "f"), "[Int] -> [Int] -> Bool");

    let bound: Vec<String> = result
        .ev_decls
        .0
        .iter()
        .map(|(_, expr)| format!("{}", expr))
        .collect();
    assert!(
        bound.iter().any(|e| e.starts_with("dEqList")),
        "expected dispatch through the list instance, got {:?}",
        bound
    );
    assert!(
        bound.iter().any(|e| e.starts_with("dEqInt")),
        "expected the Eq Int super-wanted discharged, got {:?}",
        bound
    );
}

/// Under the monomorphism restriction, a nested `let x = []` keeps a
/// residual unification variable instead of generalizing, while the
/// enclosing (unrestricted) binder may still generalize it away.
#[test]
fn monomorphism_restriction_blocks_nested_generalization() {
    // g = let x = [] in x
    let inner = Binds::new(vec![fun("x", vec![clause(vec![], Expr::new(
        larch_typeck::ast::ExprKind::List(vec![]),
    ))])]);
    let result = check(program_of(vec![fun(
        "g",
        vec![clause(vec![], Expr::let_in(inner, Expr::var("x")))],
    )]));
    assert_clean(&result);
    assert_eq!(type_of(&result, "g"), "forall a. [a]");

    let x_gen = result
        .binds
        .iter()
        .find(|g| g.infos.contains_key("x"))
        .expect("nested group for x recorded");
    assert!(x_gen.ty_vars.is_empty(), "restricted binder must not quantify");
    let x_poly = format!("{}", x_gen.infos["x"].polytype);
    assert!(
        !x_poly.contains("forall"),
        "x should stay monomorphic, got `{}`",
        x_poly
    );
}

// ── Signatures and subsumption ─────────────────────────────────────────

/// A signature more general than the body is rejected.
#[test]
fn wrong_signature_body_is_a_mismatch() {
    let sig = Type::function(vec![Type::int()], Type::int());
    let binds = Binds::new(vec![fun(
        "bad",
        vec![clause(vec![Pat::var("x")], Expr::var("True"))],
    )])
    .with_signature("bad", sig);
    let result = check(Program { binds, ..Program::default() });
    assert!(result.poisoned);
    assert!(result
        .errors
        .iter()
        .any(|d| matches!(d.error, TypeError::Mismatch { .. })));
}

/// A signed binder keeps its declared (rank-1) polytype verbatim.
#[test]
fn signed_binder_publishes_its_signature() {
    let a = TyVar::named("a", 0, Kind::Star);
    let sig = larch_typeck::ty::add_forall(
        vec![a.clone()],
        Type::function(vec![Type::Var(a.clone())], Type::Var(a)),
    );
    let binds = Binds::new(vec![fun(
        "ident",
        vec![clause(vec![Pat::var("x")], Expr::var("x"))],
    )])
    .with_signature("ident", sig);
    let result = check(Program { binds, ..Program::default() });
    assert_clean(&result);
    assert_eq!(type_of(&result, "ident"), "forall a. a -> a");
}

// ── Failure modes ──────────────────────────────────────────────────────

/// Adding characters wants `Num Char`, which has no instance.
#[test]
fn missing_instance_is_reported() {
    let result = check(program_of(vec![fun(
        "k",
        vec![clause(
            vec![],
            Expr::apps(
                Expr::var("+"),
                vec![Expr::lit(Lit::Char('c')), Expr::lit(Lit::Char('d'))],
            ),
        )],
    )]));
    assert!(result.poisoned);
    assert!(result.errors.iter().any(
        |d| matches!(&d.error, TypeError::NoInstance { pred } if format!("{}", pred) == "Num Char")
    ));
}

/// With no default candidates, an unconstrained numeric result is
/// ambiguous.
#[test]
fn ambiguity_without_defaults_is_reported() {
    let result = check_with(
        program_of(vec![fun(
            "amb",
            vec![clause(
                vec![],
                Expr::app(
                    Expr::var("show"),
                    Expr::app(Expr::var("fromInteger"), Expr::int(3)),
                ),
            )]),
        ]),
        KindEnv::new(),
        TypeckOptions { defaults: vec![] },
    );
    assert!(result.poisoned);
    assert!(result
        .errors
        .iter()
        .any(|d| matches!(d.error, TypeError::AmbiguousType { .. })));
}

/// Two equally specific instances for the same head collide.
#[test]
fn overlapping_instances_are_reported() {
    let mk_instance = || {
        let a = TyVar::named("a", 0, Kind::Star);
        InstanceDecl {
            context: vec![],
            head: Type::apply(
                Type::con("Show", Kind::n_args(1)),
                vec![Type::list(Type::Var(a))],
            ),
            methods: vec![FunDecl {
                name: "show".into(),
                clauses: vec![clause(vec![Pat::wild()], Expr::lit(Lit::Str("xs".into())))],
                span: None,
            }],
            span: None,
        }
    };
    let binds = Binds::new(vec![fun(
        "s",
        vec![clause(
            vec![],
            Expr::app(
                Expr::var("show"),
                Expr::new(larch_typeck::ast::ExprKind::List(vec![Expr::lit(Lit::Char('c'))])),
            ),
        )],
    )]);
    let result = check(Program {
        binds,
        instances: vec![mk_instance(), mk_instance()],
        ..Program::default()
    });
    assert!(result.poisoned);
    assert!(result
        .errors
        .iter()
        .any(|d| matches!(d.error, TypeError::OverlappingInstances { .. })));
}

/// An instance missing a class method (with no default) is rejected.
#[test]
fn instance_missing_method_is_reported() {
    let a = TyVar::named("a", 0, Kind::Star);
    let instance = InstanceDecl {
        context: vec![],
        head: Type::apply(
            Type::con("Eq", Kind::n_args(1)),
            vec![Type::Tuple(vec![Type::Var(a.clone()), Type::Var(a)])],
        ),
        methods: vec![FunDecl {
            name: "==".into(),
            clauses: vec![clause(vec![Pat::wild(), Pat::wild()], Expr::var("True"))],
            span: None,
        }],
        span: None,
    };
    let result = check(Program {
        binds: Binds::default(),
        instances: vec![instance],
        ..Program::default()
    });
    assert!(result.poisoned);
    assert!(result.errors.iter().any(|d| matches!(
        &d.error,
        TypeError::MissingMethod { method, .. } if method == "/="
    )));
}

// ── Type families ──────────────────────────────────────────────────────

/// `type instance Elem [a] = a` lets `Elem [Int]` reduce while checking
/// a signature that mentions it.
#[test]
fn type_family_equation_discharges_an_equality() {
    let mut kinds = KindEnv::new();
    kinds.insert("Elem", Kind::n_args(1), ConFlavor::Family { arity: 1 });

    let a = TyVar::named("a", 0, Kind::Star);
    let tfi = TypeFamInstance {
        family: "Elem".into(),
        args: vec![Type::list(Type::Var(a.clone()))],
        rhs: Type::Var(a),
        span: None,
    };

    let elem_list_int = Type::apply(
        Type::Con(larch_typeck::ast::tycon_in(&kinds, "Elem")),
        vec![Type::list(Type::int())],
    );
    let sig = Type::function(vec![elem_list_int], Type::int());
    let binds = Binds::new(vec![fun(
        "tf",
        vec![clause(vec![Pat::var("x")], Expr::var("x"))],
    )])
    .with_signature("tf", sig);

    let result = check_with(
        Program { binds, type_family_instances: vec![tfi], ..Program::default() },
        kinds,
        TypeckOptions::default(),
    );
    assert_clean(&result);
    assert_eq!(type_of(&result, "tf"), "Elem [Int] -> Int");
}

/// A family equation whose rhs mentions an unbound variable is invalid.
#[test]
fn family_equation_with_unbound_rhs_var_is_reported() {
    let mut kinds = KindEnv::new();
    kinds.insert("Elem", Kind::n_args(1), ConFlavor::Family { arity: 1 });
    let tfi = TypeFamInstance {
        family: "Elem".into(),
        args: vec![Type::int()],
        rhs: Type::Var(TyVar::named("b", 9, Kind::Star)),
        span: None,
    };
    let result = check_with(
        Program { type_family_instances: vec![tfi], ..Program::default() },
        kinds,
        TypeckOptions::default(),
    );
    assert!(result.poisoned);
    assert!(result
        .errors
        .iter()
        .any(|d| matches!(d.error, TypeError::UnboundFamilyRhsVar { .. })));
}

// ── Foreign imports and annotations ────────────────────────────────────

/// A foreign import's polytype is visible to the module's bindings.
#[test]
fn foreign_import_enters_the_environment() {
    let foreign = ForeignDecl {
        name: "prim_len".into(),
        ty: Type::function(vec![Type::string()], Type::int()),
        span: None,
    };
    let result = check(Program {
        binds: Binds::new(vec![fun(
            "use_len",
            vec![clause(vec![], Expr::var("prim_len"))],
        )]),
        foreign: vec![foreign],
        ..Program::default()
    });
    assert_clean(&result);
    assert_eq!(type_of(&result, "use_len"), "[Char] -> Int");
}

/// An annotated expression is checked against its signature and used at
/// an instantiation of it.
#[test]
fn annotation_checks_and_instantiates() {
    // anno = ((\x -> x) :: forall a. a -> a) 'c'
    let a = TyVar::named("a", 0, Kind::Star);
    let sig = larch_typeck::ty::add_forall(
        vec![a.clone()],
        Type::function(vec![Type::Var(a.clone())], Type::Var(a)),
    );
    let anno = Expr::app(
        Expr::ann(Expr::lam(vec![Pat::var("x")], Expr::var("x")), sig),
        Expr::lit(Lit::Char('c')),
    );
    let result = check(program_of(vec![fun("anno", vec![clause(vec![], anno)])]));
    assert_clean(&result);
    assert_eq!(type_of(&result, "anno"), "Char");
}

/// Use sites of overloaded identifiers are recorded with the evidence
/// they receive.
#[test]
fn overloaded_use_sites_carry_evidence_arguments() {
    let result = check(program_of(vec![fun(
        "f",
        vec![clause(
            vec![Pat::var("x")],
            Expr::apps(Expr::var("+"), vec![Expr::var("x"), Expr::var("x")]),
        )],
    )]));
    assert_clean(&result);
    let plus_use = result
        .uses
        .iter()
        .find(|u| u.name == "+")
        .expect("a recorded use of (+)");
    assert_eq!(plus_use.ev_args.len(), 1);
}

// ── Classes declared by the module ─────────────────────────────────────

/// A module-defined class with a default method: an instance omitting
/// the method picks up the default.
#[test]
fn default_method_fills_a_missing_instance_method() {
    let a = TyVar::named("a", 0, Kind::Star);
    let av = Type::Var(a.clone());
    let to_name_sig = Type::function(vec![av.clone()], Type::string());
    let class = ClassDecl {
        name: "Named".into(),
        ty_vars: vec![a.clone()],
        supers: vec![],
        members: vec![("toName".into(), to_name_sig)],
        default_methods: vec![FunDecl {
            name: "toName".into(),
            clauses: vec![clause(vec![Pat::wild()], Expr::lit(Lit::Str("thing".into())))],
            span: None,
        }],
        span: None,
    };
    let instance = InstanceDecl {
        context: vec![],
        head: Type::apply(Type::con("Named", Kind::n_args(1)), vec![Type::int()]),
        methods: vec![],
        span: None,
    };
    let result = check(Program {
        binds: Binds::default(),
        classes: vec![class],
        instances: vec![instance],
        ..Program::default()
    });
    assert_clean(&result);
    assert_eq!(result.dfuns.len(), 1);
    // The dictionary has exactly the one method entry.
    match &result.dfuns[0].dict {
        larch_typeck::evidence::EvExpr::Tuple(entries) => assert_eq!(entries.len(), 1),
        other => panic!("expected a dictionary tuple, got {:?}", other),
    }
}

/// An instance method the class never declared is an error.
#[test]
fn unknown_instance_method_is_reported() {
    let instance = InstanceDecl {
        context: vec![],
        head: Type::apply(Type::con("Show", Kind::n_args(1)), vec![Type::Tuple(vec![])]),
        methods: vec![
            FunDecl {
                name: "show".into(),
                clauses: vec![clause(vec![Pat::wild()], Expr::lit(Lit::Str("()".into())))],
                span: None,
            },
            FunDecl {
                name: "display".into(),
                clauses: vec![clause(vec![Pat::wild()], Expr::lit(Lit::Str("()".into())))],
                span: None,
            },
        ],
        span: None,
    };
    let result = check(Program {
        binds: Binds::default(),
        instances: vec![instance],
        ..Program::default()
    });
    assert!(result.poisoned);
    assert!(result.errors.iter().any(|d| matches!(
        &d.error,
        TypeError::MethodNotInClass { method, .. } if method == "display"
    )));
}
