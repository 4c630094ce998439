//! Type representation for the Larch type system.
//!
//! Defines the core `Type` sum, kinds, rigid type variables (`TyVar`),
//! unification variables (`TyMeta`, an index into the checker's arena of
//! write-once cells), and the polytype builders. Tuple and list types are
//! kept as normal forms and canonicalized to constructor applications on
//! demand by `decompose_apps`.

use std::fmt;

/// The kind of a type. Kind checking happens in the front end; the checker
/// only threads kinds through so fresh variables can be allocated at the
/// right kind.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    /// The kind of inhabited types.
    Star,
    /// An arrow kind, e.g. `* -> *` for list.
    Arrow(Box<Kind>, Box<Kind>),
}

impl Kind {
    /// Build the kind `* -> * -> ... -> *` with `n` arguments.
    pub fn n_args(n: usize) -> Kind {
        let mut k = Kind::Star;
        for _ in 0..n {
            k = Kind::Arrow(Box::new(Kind::Star), Box::new(k));
        }
        k
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Star => write!(f, "*"),
            Kind::Arrow(a, b) => match **a {
                Kind::Star => write!(f, "* -> {}", b),
                _ => write!(f, "({}) -> {}", a, b),
            },
        }
    }
}

/// A rigid type variable.
///
/// Either a skolem constant (`level` set, allocated while checking under a
/// forall or while generalizing) or a signature-introduced variable with no
/// level. Rigid variables are never filled by unification.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TyVar {
    pub name: String,
    pub uniq: u32,
    pub level: Option<u32>,
    pub kind: Kind,
}

impl TyVar {
    /// A signature-introduced variable (no level).
    pub fn named(name: impl Into<String>, uniq: u32, kind: Kind) -> Self {
        TyVar { name: name.into(), uniq, level: None, kind }
    }

    /// Whether this variable is a skolem constant.
    pub fn is_skolem(&self) -> bool {
        self.level.is_some()
    }

    pub fn level(&self) -> u32 {
        self.level.unwrap_or(0)
    }
}

impl fmt::Display for TyVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A unification variable: an index into the checker's cell arena.
///
/// The cell holds either "empty" or a type; once filled, the variable *is*
/// that type. Name, kind, and level live in a side table on the checker.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TyMeta(pub u32);

impl fmt::Display for TyMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

/// A type constructor: a qualified name plus its kind.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TyCon {
    pub name: String,
    pub kind: Kind,
}

impl TyCon {
    pub fn new(name: impl Into<String>, kind: Kind) -> Self {
        TyCon { name: name.into(), kind }
    }

    /// The function arrow constructor.
    pub fn arrow() -> TyCon {
        TyCon::new("->", Kind::n_args(2))
    }

    /// The equality-constraint constructor.
    pub fn equality() -> TyCon {
        TyCon::new("~", Kind::n_args(2))
    }

    /// The list constructor.
    pub fn list() -> TyCon {
        TyCon::new("[]", Kind::n_args(1))
    }

    /// The tuple constructor of the given arity.
    pub fn tuple(n: usize) -> TyCon {
        TyCon::new(tuple_name(n), Kind::n_args(n))
    }
}

impl fmt::Display for TyCon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Name of the tuple constructor of arity `n`: `(,)`, `(,,)`, ...
pub fn tuple_name(n: usize) -> String {
    let mut s = String::from("(");
    for _ in 1..n {
        s.push(',');
    }
    s.push(')');
    s
}

/// Strictness marker carried by `Type::StrictLazy`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Strictness {
    Strict,
    Lazy,
}

/// A Larch type.
///
/// Structural equality (`==`) is purely syntactic and does not look through
/// filled unification variables or alpha-rename foralls; use the checker's
/// `same_type` for the semantic relation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    /// A rigid type variable (skolem or signature variable).
    Var(TyVar),
    /// A unification variable.
    Meta(TyMeta),
    /// A type constructor.
    Con(TyCon),
    /// Application of a type to an argument.
    App(Box<Type>, Box<Type>),
    /// Tuple normal form `(t1, ..., tn)`.
    Tuple(Vec<Type>),
    /// List normal form `[t]`.
    List(Box<Type>),
    /// `forall a b. t`
    Forall(Vec<TyVar>, Box<Type>),
    /// `(P1, ..., Pn) => t`
    Constrained(Vec<Type>, Box<Type>),
    /// Surface-syntax strictness marker `!t` / `~t`.
    StrictLazy(Strictness, Box<Type>),
}

impl Type {
    pub fn con(name: impl Into<String>, kind: Kind) -> Type {
        Type::Con(TyCon::new(name, kind))
    }

    pub fn int() -> Type {
        Type::con("Int", Kind::Star)
    }

    pub fn integer() -> Type {
        Type::con("Integer", Kind::Star)
    }

    pub fn double() -> Type {
        Type::con("Double", Kind::Star)
    }

    pub fn bool() -> Type {
        Type::con("Bool", Kind::Star)
    }

    pub fn char() -> Type {
        Type::con("Char", Kind::Star)
    }

    /// `String` is `[Char]`.
    pub fn string() -> Type {
        Type::List(Box::new(Type::char()))
    }

    pub fn list(elem: Type) -> Type {
        Type::List(Box::new(elem))
    }

    /// `t1 -> t2`
    pub fn arrow(arg: Type, res: Type) -> Type {
        Type::App(
            Box::new(Type::App(Box::new(Type::Con(TyCon::arrow())), Box::new(arg))),
            Box::new(res),
        )
    }

    /// `t1 -> t2 -> ... -> res`
    pub fn function(args: Vec<Type>, res: Type) -> Type {
        let mut ty = res;
        for arg in args.into_iter().rev() {
            ty = Type::arrow(arg, ty);
        }
        ty
    }

    /// The equality predicate `t1 ~ t2`.
    pub fn equality(lhs: Type, rhs: Type) -> Type {
        Type::App(
            Box::new(Type::App(Box::new(Type::Con(TyCon::equality())), Box::new(lhs))),
            Box::new(rhs),
        )
    }

    /// Apply a head type to a list of arguments.
    pub fn apply(head: Type, args: Vec<Type>) -> Type {
        let mut ty = head;
        for arg in args {
            ty = Type::App(Box::new(ty), Box::new(arg));
        }
        ty
    }
}

/// `forall vs. t`, merging with an existing outer forall.
pub fn add_forall(vars: Vec<TyVar>, ty: Type) -> Type {
    if vars.is_empty() {
        return ty;
    }
    match ty {
        Type::Forall(mut inner, body) => {
            let mut vs = vars;
            vs.append(&mut inner);
            Type::Forall(vs, body)
        }
        other => Type::Forall(vars, Box::new(other)),
    }
}

/// `(ps) => t`, merging with an existing context.
pub fn add_constraints(preds: Vec<Type>, ty: Type) -> Type {
    if preds.is_empty() {
        return ty;
    }
    match ty {
        Type::Constrained(mut inner, body) => {
            let mut ps = preds;
            ps.append(&mut inner);
            Type::Constrained(ps, body)
        }
        other => Type::Constrained(preds, Box::new(other)),
    }
}

/// Peel `forall`s and a context off the top of a type, without instantiating.
pub fn peel_top_gen(ty: &Type) -> (Vec<TyVar>, Vec<Type>, Type) {
    let mut t = ty;
    let mut tvs = Vec::new();
    if let Type::Forall(vs, body) = t {
        tvs = vs.clone();
        t = body;
    }
    let mut preds = Vec::new();
    if let Type::Constrained(ps, body) = t {
        preds = ps.clone();
        t = body;
    }
    (tvs, preds, t.clone())
}

/// Drop a top-level forall and context, keeping the rho-type.
pub fn remove_top_gen(ty: &Type) -> Type {
    peel_top_gen(ty).2
}

/// Decompose a type into a head and argument list, canonicalizing the
/// tuple and list normal forms into constructor applications.
///
/// Does not look through filled unification variables; callers that need
/// that go through the checker's `decompose_apps`.
pub fn decompose_apps(ty: &Type) -> (Type, Vec<Type>) {
    match ty {
        Type::List(elem) => (Type::Con(TyCon::list()), vec![(**elem).clone()]),
        Type::Tuple(elems) => (Type::Con(TyCon::tuple(elems.len())), elems.clone()),
        Type::App(_, _) => {
            let mut args = Vec::new();
            let mut t = ty;
            while let Type::App(head, arg) = t {
                args.push((**arg).clone());
                t = head;
            }
            args.reverse();
            (t.clone(), args)
        }
        other => (other.clone(), Vec::new()),
    }
}

/// If `ty` is an arrow `a -> b`, return `(a, b)`.
pub fn split_arrow(ty: &Type) -> Option<(Type, Type)> {
    let (head, args) = decompose_apps(ty);
    match head {
        Type::Con(tc) if tc.name == "->" && args.len() == 2 => {
            let mut it = args.into_iter();
            Some((it.next().unwrap(), it.next().unwrap()))
        }
        _ => None,
    }
}

/// If `ty` is an equality predicate `a ~ b`, return `(a, b)`.
pub fn split_equality(ty: &Type) -> Option<(Type, Type)> {
    let (head, args) = decompose_apps(ty);
    match head {
        Type::Con(tc) if tc.name == "~" && args.len() == 2 => {
            let mut it = args.into_iter();
            Some((it.next().unwrap(), it.next().unwrap()))
        }
        _ => None,
    }
}

/// Collect the free rigid type variables of a type. Binders shadow.
pub fn free_ty_vars(ty: &Type, out: &mut Vec<TyVar>) {
    fn go(ty: &Type, bound: &mut Vec<TyVar>, out: &mut Vec<TyVar>) {
        match ty {
            Type::Var(v) => {
                if !bound.contains(v) && !out.contains(v) {
                    out.push(v.clone());
                }
            }
            Type::Meta(_) | Type::Con(_) => {}
            Type::App(a, b) => {
                go(a, bound, out);
                go(b, bound, out);
            }
            Type::Tuple(ts) => ts.iter().for_each(|t| go(t, bound, out)),
            Type::List(t) | Type::StrictLazy(_, t) => go(t, bound, out),
            Type::Forall(vs, body) => {
                let n = bound.len();
                bound.extend(vs.iter().cloned());
                go(body, bound, out);
                bound.truncate(n);
            }
            Type::Constrained(ps, body) => {
                ps.iter().for_each(|p| go(p, bound, out));
                go(body, bound, out);
            }
        }
    }
    go(ty, &mut Vec::new(), out);
}

/// Substitute rigid type variables, respecting forall shadowing.
pub fn subst_ty_vars(subst: &[(TyVar, Type)], ty: &Type) -> Type {
    match ty {
        Type::Var(v) => subst
            .iter()
            .find(|(tv, _)| tv == v)
            .map(|(_, t)| t.clone())
            .unwrap_or_else(|| ty.clone()),
        Type::Meta(_) | Type::Con(_) => ty.clone(),
        Type::App(a, b) => Type::App(
            Box::new(subst_ty_vars(subst, a)),
            Box::new(subst_ty_vars(subst, b)),
        ),
        Type::Tuple(ts) => Type::Tuple(ts.iter().map(|t| subst_ty_vars(subst, t)).collect()),
        Type::List(t) => Type::List(Box::new(subst_ty_vars(subst, t))),
        Type::StrictLazy(s, t) => Type::StrictLazy(*s, Box::new(subst_ty_vars(subst, t))),
        Type::Forall(vs, body) => {
            let inner: Vec<(TyVar, Type)> = subst
                .iter()
                .filter(|(tv, _)| !vs.contains(tv))
                .cloned()
                .collect();
            Type::Forall(vs.clone(), Box::new(subst_ty_vars(&inner, body)))
        }
        Type::Constrained(ps, body) => Type::Constrained(
            ps.iter().map(|p| subst_ty_vars(subst, p)).collect(),
            Box::new(subst_ty_vars(subst, body)),
        ),
    }
}

// ── Display ────────────────────────────────────────────────────────────

fn needs_parens(ty: &Type) -> bool {
    match ty {
        Type::Var(_) | Type::Meta(_) | Type::Con(_) | Type::Tuple(_) | Type::List(_) => false,
        _ => true,
    }
}

fn fmt_parens(ty: &Type, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if needs_parens(ty) {
        write!(f, "({})", ty)
    } else {
        write!(f, "{}", ty)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Var(v) => write!(f, "{}", v),
            Type::Meta(m) => write!(f, "{}", m),
            Type::Con(c) => write!(f, "{}", c),
            Type::App(_, _) => {
                if let Some((arg, res)) = split_arrow(self) {
                    match split_arrow(&arg) {
                        Some(_) => write!(f, "({}) -> {}", arg, res),
                        None => write!(f, "{} -> {}", arg, res),
                    }
                } else if let Some((lhs, rhs)) = split_equality(self) {
                    write!(f, "{} ~ {}", lhs, rhs)
                } else {
                    let (head, args) = decompose_apps(self);
                    write!(f, "{}", head)?;
                    for a in &args {
                        write!(f, " ")?;
                        fmt_parens(a, f)?;
                    }
                    Ok(())
                }
            }
            Type::Tuple(elems) => {
                write!(f, "(")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, ")")
            }
            Type::List(elem) => write!(f, "[{}]", elem),
            Type::Forall(vs, body) => {
                write!(f, "forall")?;
                for v in vs {
                    write!(f, " {}", v)?;
                }
                write!(f, ". {}", body)
            }
            Type::Constrained(ps, body) => {
                if ps.len() == 1 {
                    write!(f, "{} => {}", ps[0], body)
                } else {
                    write!(f, "(")?;
                    for (i, p) in ps.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", p)?;
                    }
                    write!(f, ") => {}", body)
                }
            }
            Type::StrictLazy(s, t) => {
                let mark = match s {
                    Strictness::Strict => "!",
                    Strictness::Lazy => "~",
                };
                write!(f, "{}", mark)?;
                fmt_parens(t, f)
            }
        }
    }
}

// ── ena trait implementations ──────────────────────────────────────────

impl ena::unify::UnifyKey for TyMeta {
    type Value = Option<Type>;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        TyMeta(u)
    }

    fn tag() -> &'static str {
        "TyMeta"
    }
}

impl ena::unify::EqUnifyValue for Type {}
