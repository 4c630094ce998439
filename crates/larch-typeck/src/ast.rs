//! The renamed, desugared core language the checker consumes.
//!
//! The front end has already resolved every identifier (names are either
//! module-qualified or carry a unique local suffix), desugared `do` blocks
//! and comprehensions away, and kind-checked every type expression. What
//! remains is a small core: eight expression forms, eight pattern forms,
//! and declaration groups with an optional signature map.

use larch_common::Span;
use rustc_hash::FxHashMap;

use crate::ty::{Kind, TyCon, TyVar, Type};

/// A renamed identifier. The front end guarantees uniqueness, so plain
/// string comparison is name equality.
pub type Name = String;

/// A literal. The class constraint it generates is decided by the checker
/// (`Num` for integers, `Fractional` for rationals, `IsString` for strings).
#[derive(Clone, Debug, PartialEq)]
pub enum Lit {
    Int(i64),
    Rational(f64),
    Char(char),
    Str(String),
}

/// A core expression with an optional source span.
#[derive(Clone, Debug)]
pub struct Expr {
    pub span: Option<Span>,
    pub kind: ExprKind,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Var(Name),
    Lit(Lit),
    App(Box<Expr>, Box<Expr>),
    Lam(Vec<Pat>, Box<Expr>),
    Case(Box<Expr>, Vec<(Pat, Expr)>),
    Let(Binds, Box<Expr>),
    Tuple(Vec<Expr>),
    List(Vec<Expr>),
    /// `e :: sigma`
    Ann(Box<Expr>, Type),
}

impl Expr {
    pub fn new(kind: ExprKind) -> Expr {
        Expr { span: None, kind }
    }

    pub fn with_span(kind: ExprKind, span: Span) -> Expr {
        Expr { span: Some(span), kind }
    }

    pub fn var(name: impl Into<Name>) -> Expr {
        Expr::new(ExprKind::Var(name.into()))
    }

    pub fn lit(lit: Lit) -> Expr {
        Expr::new(ExprKind::Lit(lit))
    }

    pub fn int(n: i64) -> Expr {
        Expr::lit(Lit::Int(n))
    }

    pub fn app(f: Expr, arg: Expr) -> Expr {
        Expr::new(ExprKind::App(Box::new(f), Box::new(arg)))
    }

    /// `f e1 ... en`
    pub fn apps(f: Expr, args: Vec<Expr>) -> Expr {
        args.into_iter().fold(f, Expr::app)
    }

    pub fn lam(pats: Vec<Pat>, body: Expr) -> Expr {
        Expr::new(ExprKind::Lam(pats, Box::new(body)))
    }

    pub fn case(scrut: Expr, alts: Vec<(Pat, Expr)>) -> Expr {
        Expr::new(ExprKind::Case(Box::new(scrut), alts))
    }

    pub fn let_in(binds: Binds, body: Expr) -> Expr {
        Expr::new(ExprKind::Let(binds, Box::new(body)))
    }

    pub fn ann(e: Expr, ty: Type) -> Expr {
        Expr::new(ExprKind::Ann(Box::new(e), ty))
    }
}

/// A core pattern with an optional source span.
#[derive(Clone, Debug)]
pub struct Pat {
    pub span: Option<Span>,
    pub kind: PatKind,
}

#[derive(Clone, Debug)]
pub enum PatKind {
    Var(Name),
    /// Constructor pattern `C p1 ... pn`.
    Con(Name, Vec<Pat>),
    Tuple(Vec<Pat>),
    List(Vec<Pat>),
    Wild,
    /// `x@p`
    As(Name, Box<Pat>),
    /// `~p`
    Lazy(Box<Pat>),
    Lit(Lit),
}

impl Pat {
    pub fn new(kind: PatKind) -> Pat {
        Pat { span: None, kind }
    }

    pub fn var(name: impl Into<Name>) -> Pat {
        Pat::new(PatKind::Var(name.into()))
    }

    pub fn wild() -> Pat {
        Pat::new(PatKind::Wild)
    }

    pub fn con(name: impl Into<Name>, args: Vec<Pat>) -> Pat {
        Pat::new(PatKind::Con(name.into(), args))
    }

    pub fn lit(lit: Lit) -> Pat {
        Pat::new(PatKind::Lit(lit))
    }

    /// Names bound by this pattern, in left-to-right order.
    pub fn binders(&self) -> Vec<Name> {
        let mut out = Vec::new();
        self.collect_binders(&mut out);
        out
    }

    fn collect_binders(&self, out: &mut Vec<Name>) {
        match &self.kind {
            PatKind::Var(n) => out.push(n.clone()),
            PatKind::Con(_, ps) | PatKind::Tuple(ps) | PatKind::List(ps) => {
                ps.iter().for_each(|p| p.collect_binders(out))
            }
            PatKind::Wild | PatKind::Lit(_) => {}
            PatKind::As(n, p) => {
                out.push(n.clone());
                p.collect_binders(out);
            }
            PatKind::Lazy(p) => p.collect_binders(out),
        }
    }
}

/// One equation of a function declaration: `f p1 ... pn = rhs`.
#[derive(Clone, Debug)]
pub struct Clause {
    pub pats: Vec<Pat>,
    pub rhs: Expr,
}

/// A function declaration: one or more clauses of equal arity.
#[derive(Clone, Debug)]
pub struct FunDecl {
    pub name: Name,
    pub clauses: Vec<Clause>,
    pub span: Option<Span>,
}

impl FunDecl {
    /// A simple `name = expr` declaration (zero argument patterns).
    pub fn simple(name: impl Into<Name>, rhs: Expr) -> FunDecl {
        FunDecl {
            name: name.into(),
            clauses: vec![Clause { pats: Vec::new(), rhs }],
            span: None,
        }
    }

    pub fn arity(&self) -> usize {
        self.clauses.first().map(|c| c.pats.len()).unwrap_or(0)
    }
}

/// A pattern binding: `pat = rhs`.
#[derive(Clone, Debug)]
pub struct PatDecl {
    pub lhs: Pat,
    pub rhs: Expr,
    pub span: Option<Span>,
}

/// A value declaration.
#[derive(Clone, Debug)]
pub enum Decl {
    Fun(FunDecl),
    Pat(PatDecl),
}

impl Decl {
    /// Names this declaration binds.
    pub fn binders(&self) -> Vec<Name> {
        match self {
            Decl::Fun(fd) => vec![fd.name.clone()],
            Decl::Pat(pd) => pd.lhs.binders(),
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Decl::Fun(fd) => fd.span,
            Decl::Pat(pd) => pd.span,
        }
    }
}

/// A group of value declarations with their signatures.
#[derive(Clone, Debug, Default)]
pub struct Binds {
    /// Declared signatures: name -> polytype.
    pub signatures: FxHashMap<Name, Type>,
    pub decls: Vec<Decl>,
}

impl Binds {
    pub fn new(decls: Vec<Decl>) -> Binds {
        Binds { signatures: FxHashMap::default(), decls }
    }

    pub fn with_signature(mut self, name: impl Into<Name>, ty: Type) -> Binds {
        self.signatures.insert(name.into(), ty);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

/// A class declaration `class Supers => C a where ...`.
#[derive(Clone, Debug)]
pub struct ClassDecl {
    pub name: Name,
    pub ty_vars: Vec<TyVar>,
    /// Superclass predicates over `ty_vars`.
    pub supers: Vec<Type>,
    /// Member signatures over `ty_vars` (without the class constraint).
    pub members: Vec<(Name, Type)>,
    /// Default method bodies for some members.
    pub default_methods: Vec<FunDecl>,
    pub span: Option<Span>,
}

/// An instance declaration `instance ctx => C t1 ... tn where ...`.
#[derive(Clone, Debug)]
pub struct InstanceDecl {
    /// Context predicates; their free type variables must appear in `head`.
    pub context: Vec<Type>,
    /// The instance head, a class applied to argument types.
    pub head: Type,
    pub methods: Vec<FunDecl>,
    pub span: Option<Span>,
}

/// One equation of an open type family: `type instance F t1 ... tn = rhs`.
#[derive(Clone, Debug)]
pub struct TypeFamInstance {
    pub family: Name,
    pub args: Vec<Type>,
    pub rhs: Type,
    pub span: Option<Span>,
}

/// A foreign import with an already-kind-checked polytype.
#[derive(Clone, Debug)]
pub struct ForeignDecl {
    pub name: Name,
    pub ty: Type,
    pub span: Option<Span>,
}

/// A whole renamed, desugared module.
#[derive(Clone, Debug, Default)]
pub struct Program {
    pub binds: Binds,
    pub classes: Vec<ClassDecl>,
    pub instances: Vec<InstanceDecl>,
    pub type_family_instances: Vec<TypeFamInstance>,
    pub foreign: Vec<ForeignDecl>,
}

/// How a type constructor may be used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConFlavor {
    /// An ordinary data/newtype constructor.
    Data,
    /// An open type family of the given arity; applications of it do not
    /// decompose under equality.
    Family { arity: usize },
}

/// Kind information for type constructors, delivered by the front end's
/// kind checker.
#[derive(Clone, Debug, Default)]
pub struct KindEnv {
    cons: FxHashMap<Name, (Kind, ConFlavor)>,
}

impl KindEnv {
    pub fn new() -> KindEnv {
        KindEnv::default()
    }

    pub fn insert(&mut self, name: impl Into<Name>, kind: Kind, flavor: ConFlavor) {
        self.cons.insert(name.into(), (kind, flavor));
    }

    pub fn kind_of(&self, name: &str) -> Option<&Kind> {
        self.cons.get(name).map(|(k, _)| k)
    }

    pub fn is_family(&self, name: &str) -> bool {
        matches!(self.cons.get(name), Some((_, ConFlavor::Family { .. })))
    }

    pub fn family_arity(&self, name: &str) -> Option<usize> {
        match self.cons.get(name) {
            Some((_, ConFlavor::Family { arity })) => Some(*arity),
            _ => None,
        }
    }
}

/// Free variables of an expression's right-hand side, for dependency
/// analysis of recursive groups. Pattern binders and let binders shadow.
pub fn rhs_free_vars(expr: &Expr, out: &mut Vec<Name>) {
    fn go(expr: &Expr, bound: &mut Vec<Name>, out: &mut Vec<Name>) {
        match &expr.kind {
            ExprKind::Var(n) => {
                if !bound.contains(n) && !out.contains(n) {
                    out.push(n.clone());
                }
            }
            ExprKind::Lit(_) => {}
            ExprKind::App(f, a) => {
                go(f, bound, out);
                go(a, bound, out);
            }
            ExprKind::Lam(pats, body) => {
                let n = bound.len();
                for p in pats {
                    bound.extend(p.binders());
                }
                go(body, bound, out);
                bound.truncate(n);
            }
            ExprKind::Case(scrut, alts) => {
                go(scrut, bound, out);
                for (pat, rhs) in alts {
                    let n = bound.len();
                    bound.extend(pat.binders());
                    go(rhs, bound, out);
                    bound.truncate(n);
                }
            }
            ExprKind::Let(binds, body) => {
                let n = bound.len();
                for decl in &binds.decls {
                    bound.extend(decl.binders());
                }
                for decl in &binds.decls {
                    match decl {
                        Decl::Fun(fd) => {
                            for clause in &fd.clauses {
                                let m = bound.len();
                                for p in &clause.pats {
                                    bound.extend(p.binders());
                                }
                                go(&clause.rhs, bound, out);
                                bound.truncate(m);
                            }
                        }
                        Decl::Pat(pd) => go(&pd.rhs, bound, out),
                    }
                }
                go(body, bound, out);
                bound.truncate(n);
            }
            ExprKind::Tuple(es) | ExprKind::List(es) => {
                es.iter().for_each(|e| go(e, bound, out))
            }
            ExprKind::Ann(e, _) => go(e, bound, out),
        }
    }
    go(expr, &mut Vec::new(), out);
}

/// Free variables of a whole declaration's right-hand sides.
pub fn decl_free_vars(decl: &Decl) -> Vec<Name> {
    let mut out = Vec::new();
    match decl {
        Decl::Fun(fd) => {
            for clause in &fd.clauses {
                let mut bound: Vec<Name> = Vec::new();
                for p in &clause.pats {
                    bound.extend(p.binders());
                }
                let mut inner = Vec::new();
                rhs_free_vars(&clause.rhs, &mut inner);
                for n in inner {
                    if !bound.contains(&n) && !out.contains(&n) {
                        out.push(n);
                    }
                }
            }
        }
        Decl::Pat(pd) => rhs_free_vars(&pd.rhs, &mut out),
    }
    out
}

/// Build a `TyCon` for a name registered in a kind environment, defaulting
/// to kind `*` for names the front end left implicit.
pub fn tycon_in(kinds: &KindEnv, name: &str) -> TyCon {
    let kind = kinds.kind_of(name).cloned().unwrap_or(Kind::Star);
    TyCon::new(name, kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_binders_in_order() {
        let pat = Pat::con(
            "Pair",
            vec![Pat::var("x"), Pat::new(PatKind::As("y".into(), Box::new(Pat::var("z"))))],
        );
        assert_eq!(pat.binders(), vec!["x".to_string(), "y".into(), "z".into()]);
    }

    #[test]
    fn free_vars_respect_lambda_shadowing() {
        // \x -> f x y
        let e = Expr::lam(
            vec![Pat::var("x")],
            Expr::apps(Expr::var("f"), vec![Expr::var("x"), Expr::var("y")]),
        );
        let mut out = Vec::new();
        rhs_free_vars(&e, &mut out);
        assert_eq!(out, vec!["f".to_string(), "y".into()]);
    }

    #[test]
    fn fun_decl_free_vars_skip_own_params() {
        // f n = g (n - 1)
        let fd = FunDecl {
            name: "f".into(),
            clauses: vec![Clause {
                pats: vec![Pat::var("n")],
                rhs: Expr::apps(
                    Expr::var("g"),
                    vec![Expr::apps(Expr::var("-"), vec![Expr::var("n"), Expr::int(1)])],
                ),
            }],
            span: None,
        };
        let fv = decl_free_vars(&Decl::Fun(fd));
        assert!(fv.contains(&"g".to_string()));
        assert!(fv.contains(&"-".to_string()));
        assert!(!fv.contains(&"n".to_string()));
    }
}
