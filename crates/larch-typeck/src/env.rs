//! Environments: value types, class information, and instances.
//!
//! The value environment is a shadow-stack with an undo journal: one hash
//! table maps each name to the stack of bindings that currently shadow
//! each other, and entering a binding frame records a mark in the journal
//! so leaving it can pop exactly the bindings made since. Lookup is a
//! single table probe, which matters because the constraint generator
//! looks up a name at every variable occurrence. The class and instance
//! environments are registries extended as declarations are processed.

use rustc_hash::FxHashMap;

use crate::ast::Name;
use crate::evidence::EvVar;
use crate::ty::{add_constraints, add_forall, TyCon, TyVar, Type};

/// The value environment: name -> stack of shadowing polytypes.
pub struct ValueEnv {
    table: FxHashMap<Name, Vec<Type>>,
    /// Every binding since the outermost frame, in order.
    journal: Vec<Name>,
    /// Journal length at each open frame.
    frames: Vec<usize>,
}

impl ValueEnv {
    pub fn new() -> ValueEnv {
        ValueEnv {
            table: FxHashMap::default(),
            journal: Vec::new(),
            frames: Vec::new(),
        }
    }

    /// Open a binding frame (a lambda, a case alternative, a `let` body).
    pub fn enter_frame(&mut self) {
        self.frames.push(self.journal.len());
    }

    /// Close the innermost frame, unbinding everything it introduced.
    ///
    /// # Panics
    ///
    /// Panics when no frame is open.
    pub fn exit_frame(&mut self) {
        let mark = self
            .frames
            .pop()
            .expect("no enclosing binding frame to exit");
        while self.journal.len() > mark {
            let name = self.journal.pop().expect("journal shrinks to the mark");
            let stack = self
                .table
                .get_mut(&name)
                .expect("journaled name has a binding");
            stack.pop();
            if stack.is_empty() {
                self.table.remove(&name);
            }
        }
    }

    /// Bind a name, shadowing any binding already visible. Rebinding the
    /// same name within one frame is how a group publishes a polytype
    /// over its own monomorphic placeholder.
    pub fn bind(&mut self, name: Name, ty: Type) {
        self.table.entry(name.clone()).or_default().push(ty);
        self.journal.push(name);
    }

    /// The innermost visible binding for a name.
    pub fn lookup(&self, name: &str) -> Option<&Type> {
        self.table.get(name).and_then(|stack| stack.last())
    }
}

impl Default for ValueEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Information about one class, recorded when its declaration is processed.
#[derive(Clone, Debug)]
pub struct ClassInfo {
    pub name: Name,
    pub ty_vars: Vec<TyVar>,
    /// Superclass predicates over `ty_vars`.
    pub supers: Vec<Type>,
    /// One extractor per superclass: the projection function and its type
    /// `forall as. C as => Super`.
    pub superclass_extractors: Vec<(EvVar, Type)>,
    /// Member signatures over `ty_vars` (without the class constraint).
    pub members: Vec<(Name, Type)>,
    /// Default method implementations: member name -> the default's
    /// elaborated name.
    pub default_methods: FxHashMap<Name, Name>,
}

/// The class environment.
#[derive(Default)]
pub struct ClassEnv {
    classes: FxHashMap<Name, ClassInfo>,
}

impl ClassEnv {
    pub fn new() -> ClassEnv {
        ClassEnv::default()
    }

    pub fn insert(&mut self, info: ClassInfo) {
        self.classes.insert(info.name.clone(), info);
    }

    pub fn get(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }
}

/// Information about one instance: `forall ty_vars. context => class args`.
#[derive(Clone, Debug)]
pub struct InstanceInfo {
    pub ty_vars: Vec<TyVar>,
    pub context: Vec<Type>,
    pub class_con: TyCon,
    pub args: Vec<Type>,
}

impl InstanceInfo {
    /// Rebuild the instance's polytype.
    pub fn polytype(&self) -> Type {
        let head = Type::apply(Type::Con(self.class_con.clone()), self.args.clone());
        add_forall(self.ty_vars.clone(), add_constraints(self.context.clone(), head))
    }
}

/// The instance environment: dfun evidence variables with their info.
///
/// Kept as an ordered list so lookup scans deterministically; overlap
/// resolution is by specificity, not insertion order.
#[derive(Default)]
pub struct InstanceEnv {
    instances: Vec<(EvVar, InstanceInfo)>,
}

impl InstanceEnv {
    pub fn new() -> InstanceEnv {
        InstanceEnv::default()
    }

    pub fn insert(&mut self, dfun: EvVar, info: InstanceInfo) {
        self.instances.push((dfun, info));
    }

    pub fn iter(&self) -> impl Iterator<Item = &(EvVar, InstanceInfo)> {
        self.instances.iter()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::Kind;

    #[test]
    fn frame_exit_unbinds_exactly_its_own_bindings() {
        let mut env = ValueEnv::new();
        env.bind("x".into(), Type::int());

        env.enter_frame();
        env.bind("y".into(), Type::bool());
        assert_eq!(env.lookup("x"), Some(&Type::int()));
        assert_eq!(env.lookup("y"), Some(&Type::bool()));

        env.exit_frame();
        assert_eq!(env.lookup("x"), Some(&Type::int()));
        assert!(env.lookup("y").is_none());
    }

    #[test]
    fn shadowing_restores_the_outer_binding_on_exit() {
        let mut env = ValueEnv::new();
        env.bind("x".into(), Type::int());

        env.enter_frame();
        env.bind("x".into(), Type::string());
        assert_eq!(env.lookup("x"), Some(&Type::string()));

        env.exit_frame();
        assert_eq!(env.lookup("x"), Some(&Type::int()));
    }

    #[test]
    fn rebinding_in_one_frame_publishes_over_the_placeholder() {
        let mut env = ValueEnv::new();
        env.enter_frame();
        env.bind("f".into(), Type::int());
        env.bind("f".into(), Type::bool());
        assert_eq!(env.lookup("f"), Some(&Type::bool()));

        env.exit_frame();
        assert!(env.lookup("f").is_none());
    }

    #[test]
    #[should_panic(expected = "no enclosing binding frame")]
    fn exiting_without_a_frame_panics() {
        let mut env = ValueEnv::new();
        env.exit_frame();
    }

    #[test]
    fn instance_polytype_round_trips() {
        let a = TyVar::named("a", 0, Kind::Star);
        let eq = TyCon::new("Eq", Kind::n_args(1));
        let info = InstanceInfo {
            ty_vars: vec![a.clone()],
            context: vec![Type::apply(Type::Con(eq.clone()), vec![Type::Var(a.clone())])],
            class_con: eq,
            args: vec![Type::list(Type::Var(a))],
        };
        assert_eq!(format!("{}", info.polytype()), "forall a. Eq a => Eq [a]");
    }
}
