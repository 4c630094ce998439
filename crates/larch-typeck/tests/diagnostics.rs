//! Diagnostic pipeline tests: type pretty-printing snapshots, ariadne
//! rendering, and the JSON export.

use larch_common::Span;
use larch_typeck::ast::{Binds, Clause, Decl, Expr, FunDecl, KindEnv, Pat, Program};
use larch_typeck::diagnostics::DiagnosticOptions;
use larch_typeck::ty::Type;
use larch_typeck::{check_program, TypeckOptions, TypeckResult};

fn check(program: Program) -> TypeckResult {
    check_program(&program, KindEnv::new(), TypeckOptions::default())
}

fn fun1(name: &str, pat: &str, rhs: Expr, span: Option<Span>) -> Decl {
    Decl::Fun(FunDecl {
        name: name.into(),
        clauses: vec![Clause { pats: vec![Pat::var(pat)], rhs }],
        span,
    })
}

// ── Pretty-printer snapshots ───────────────────────────────────────────

#[test]
fn polytype_rendering_snapshot() {
    let result = check(Program {
        binds: Binds::new(vec![fun1(
            "double",
            "x",
            Expr::apps(Expr::var("+"), vec![Expr::var("x"), Expr::var("x")]),
            None,
        )]),
        ..Program::default()
    });
    assert!(!result.poisoned, "{:#?}", result.errors);
    insta::assert_snapshot!(
        format!("{}", result.types["double"]),
        @"forall a. Num a => a -> a"
    );
}

#[test]
fn multi_constraint_polytype_snapshot() {
    // cmp x y = (x + y) <= x
    let body = Expr::apps(
        Expr::var("<="),
        vec![
            Expr::apps(Expr::var("+"), vec![Expr::var("x"), Expr::var("y")]),
            Expr::var("x"),
        ],
    );
    let result = check(Program {
        binds: Binds::new(vec![Decl::Fun(FunDecl {
            name: "cmp".into(),
            clauses: vec![Clause { pats: vec![Pat::var("x"), Pat::var("y")], rhs: body }],
            span: None,
        })]),
        ..Program::default()
    });
    assert!(!result.poisoned, "{:#?}", result.errors);
    let rendered = format!("{}", result.types["cmp"]);
    assert!(rendered.starts_with("forall a. ("), "got `{}`", rendered);
    assert!(rendered.contains("Num a"), "got `{}`", rendered);
    assert!(rendered.contains("Ord a"), "got `{}`", rendered);
    assert!(rendered.ends_with(") => a -> a -> Bool"), "got `{}`", rendered);
}

#[test]
fn function_type_display_snapshots() {
    insta::assert_snapshot!(
        format!("{}", Type::function(vec![Type::int(), Type::bool()], Type::char())),
        @"Int -> Bool -> Char"
    );
    insta::assert_snapshot!(
        format!(
            "{}",
            Type::arrow(Type::arrow(Type::int(), Type::int()), Type::list(Type::int()))
        ),
        @"(Int -> Int) -> [Int]"
    );
    insta::assert_snapshot!(
        format!("{}", Type::string()),
        @"[Char]"
    );
}

// ── Ariadne rendering ──────────────────────────────────────────────────

#[test]
fn mismatch_diagnostic_renders_with_span_and_context() {
    // The declared signature promises Int but the body returns Bool.
    let source = "bad x = True";
    let sig = Type::function(vec![Type::int()], Type::int());
    let binds = Binds::new(vec![fun1(
        "bad",
        "x",
        Expr::var("True"),
        Some(Span::new(0, source.len() as u32)),
    )])
    .with_signature("bad", sig);
    let result = check(Program { binds, ..Program::default() });
    assert!(result.poisoned);

    let rendered = result.render_errors(source, "test.lr", &DiagnosticOptions::default());
    assert!(!rendered.is_empty());
    let first = &rendered[0];
    assert!(first.contains("E0001"), "missing code:\n{}", first);
    assert!(first.contains("couldn't match type"), "missing message:\n{}", first);
    assert!(
        first.contains("In function `bad`"),
        "missing context note:\n{}",
        first
    );
}

#[test]
fn no_instance_diagnostic_names_the_predicate() {
    let source = "k = 'c' + 'd'";
    let result = check(Program {
        binds: Binds::new(vec![Decl::Fun(FunDecl {
            name: "k".into(),
            clauses: vec![Clause {
                pats: vec![],
                rhs: Expr::apps(
                    Expr::var("+"),
                    vec![
                        Expr::lit(larch_typeck::ast::Lit::Char('c')),
                        Expr::lit(larch_typeck::ast::Lit::Char('d')),
                    ],
                ),
            }],
            span: Some(Span::new(0, source.len() as u32)),
        })]),
        ..Program::default()
    });
    assert!(result.poisoned);
    let rendered = result.render_errors(source, "test.lr", &DiagnosticOptions::default());
    assert!(
        rendered.iter().any(|r| r.contains("Num Char")),
        "expected the failing predicate in:\n{}",
        rendered.join("\n---\n")
    );
}

// ── JSON export ────────────────────────────────────────────────────────

#[test]
fn json_export_carries_codes_and_positions() {
    let source = "one\nbad x = x + True\n";
    let result = check(Program {
        binds: Binds::new(vec![fun1(
            "bad",
            "x",
            Expr::apps(Expr::var("+"), vec![Expr::var("x"), Expr::var("True")]),
            Some(Span::new(4, 20)),
        )]),
        ..Program::default()
    });
    assert!(result.poisoned);
    let json = result.errors_to_json(Some(source));
    assert!(json.contains("\"code\""), "{}", json);
    assert!(json.contains("\"line\": 2"), "{}", json);
    assert!(json.contains("\"notes\""), "{}", json);
}
