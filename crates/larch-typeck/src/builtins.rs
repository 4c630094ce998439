//! The base environment: primitive classes, instances, and constructors.
//!
//! These form the starting vocabulary of every Larch module: the numeric
//! and comparison classes with their operator members, the ground
//! instances the runtime provides dictionaries for, and the data
//! constructors of the built-in types. Instance dictionaries registered
//! here have no method declarations; their dfuns are runtime primitives.

use crate::ast::ClassDecl;
use crate::classes::dfun_name_for;
use crate::env::InstanceInfo;
use crate::tc::TypeChecker;
use crate::ty::{add_forall, Kind, TyCon, TyVar, Type};

/// Register the built-in classes, instances, and constructors.
pub fn install(tc: &mut TypeChecker) {
    let a = TyVar::named("a", tc.fresh_uniq(), Kind::Star);
    let av = Type::Var(a.clone());

    let bin = |ty: &Type, res: Type| Type::function(vec![ty.clone(), ty.clone()], res);

    // ── Classes ─────────────────────────────────────────────────────────

    let eq = ClassDecl {
        name: "Eq".into(),
        ty_vars: vec![a.clone()],
        supers: vec![],
        members: vec![
            ("==".into(), bin(&av, Type::bool())),
            ("/=".into(), bin(&av, Type::bool())),
        ],
        default_methods: vec![],
        span: None,
    };
    let ord = ClassDecl {
        name: "Ord".into(),
        ty_vars: vec![a.clone()],
        supers: vec![pred1("Eq", av.clone())],
        members: vec![
            ("<".into(), bin(&av, Type::bool())),
            ("<=".into(), bin(&av, Type::bool())),
            (">".into(), bin(&av, Type::bool())),
            (">=".into(), bin(&av, Type::bool())),
        ],
        default_methods: vec![],
        span: None,
    };
    let num = ClassDecl {
        name: "Num".into(),
        ty_vars: vec![a.clone()],
        supers: vec![],
        members: vec![
            ("+".into(), bin(&av, av.clone())),
            ("-".into(), bin(&av, av.clone())),
            ("*".into(), bin(&av, av.clone())),
            ("negate".into(), Type::function(vec![av.clone()], av.clone())),
            (
                "fromInteger".into(),
                Type::function(vec![Type::integer()], av.clone()),
            ),
        ],
        default_methods: vec![],
        span: None,
    };
    let fractional = ClassDecl {
        name: "Fractional".into(),
        ty_vars: vec![a.clone()],
        supers: vec![pred1("Num", av.clone())],
        members: vec![("/".into(), bin(&av, av.clone()))],
        default_methods: vec![],
        span: None,
    };
    let show = ClassDecl {
        name: "Show".into(),
        ty_vars: vec![a.clone()],
        supers: vec![],
        members: vec![(
            "show".into(),
            Type::function(vec![av.clone()], Type::string()),
        )],
        default_methods: vec![],
        span: None,
    };
    let is_string = ClassDecl {
        name: "IsString".into(),
        ty_vars: vec![a.clone()],
        supers: vec![],
        members: vec![(
            "fromString".into(),
            Type::function(vec![Type::string()], av.clone()),
        )],
        default_methods: vec![],
        span: None,
    };

    for class in [&eq, &ord, &num, &fractional, &show, &is_string] {
        tc.register_class(class);
    }

    // ── Ground instances ────────────────────────────────────────────────

    for ty in [Type::int(), Type::integer(), Type::double(), Type::char(), Type::bool()] {
        ground_instance(tc, "Eq", ty);
    }
    for ty in [Type::int(), Type::integer(), Type::double(), Type::char()] {
        ground_instance(tc, "Ord", ty);
    }
    for ty in [Type::int(), Type::integer(), Type::double()] {
        ground_instance(tc, "Num", ty);
    }
    ground_instance(tc, "Fractional", Type::double());
    for ty in [Type::int(), Type::integer(), Type::double(), Type::bool(), Type::char()] {
        ground_instance(tc, "Show", ty);
    }
    ground_instance(tc, "IsString", Type::string());

    // ── Data constructors ───────────────────────────────────────────────

    tc.values.bind("True".into(), Type::bool());
    tc.values.bind("False".into(), Type::bool());

    // (:) :: forall a. a -> [a] -> [a]
    let cons_a = TyVar::named("a", tc.fresh_uniq(), Kind::Star);
    let cons_av = Type::Var(cons_a.clone());
    tc.values.bind(
        ":".into(),
        add_forall(
            vec![cons_a],
            Type::function(
                vec![cons_av.clone(), Type::list(cons_av.clone())],
                Type::list(cons_av),
            ),
        ),
    );

    tc.values.bind("otherwise".into(), Type::bool());
}

fn pred1(class: &str, arg: Type) -> Type {
    Type::apply(Type::con(class, Kind::n_args(1)), vec![arg])
}

fn ground_instance(tc: &mut TypeChecker, class: &str, ty: Type) {
    let name = dfun_name_for(class, std::slice::from_ref(&ty));
    let dfun = tc.fresh_ev_var(&name);
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
