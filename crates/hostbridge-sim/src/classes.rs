//! Class table for the simulated runtime
//!
//! Holds type definitions and their method handles. Method ids are indices
//! into a single table (offset by one so zero stays invalid), which makes
//! them canonical per declaring type the way real hosts guarantee.

use hostbridge_sdk::{HostRef, MethodId};
use std::collections::HashMap;

/// Index of a class in the table
pub type ClassId = usize;

/// Kind of type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    /// Concrete class
    Class,
    /// Interface a proxy can implement
    Interface,
}

/// Built-in behavior of a static method the simulator implements itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intrinsic {
    /// `newInterfaceProxy(long, Class[])`
    NewInterfaceProxy,
    /// `disableInterfaceProxy(Object)`
    DisableInterfaceProxy,
}

/// Method definition
#[derive(Debug, Clone)]
pub struct MethodDef {
    /// Canonical handle
    pub id: MethodId,
    /// Declaring class
    pub class: ClassId,
    /// Method name
    pub name: String,
    /// Method descriptor
    pub signature: String,
    /// Declared static
    pub is_static: bool,
    /// Declared native (bindable through `register_natives`)
    pub is_native: bool,
    /// Simulator-provided body
    pub intrinsic: Option<Intrinsic>,
}

/// Class definition
#[derive(Debug, Clone)]
pub struct ClassDef {
    /// Class ID in the table
    pub id: ClassId,
    /// Internal name (`pkg/Widget`)
    pub name: String,
    /// Class or interface
    pub kind: ClassKind,
    /// The type object handed out by `find_class`
    pub object: HostRef,
    /// Methods declared by this class
    pub methods: Vec<MethodId>,
}

/// Method declaration used when defining a class
#[derive(Debug, Clone, Copy)]
pub struct MethodSpec<'a> {
    /// Method name
    pub name: &'a str,
    /// Method descriptor
    pub signature: &'a str,
    /// Declared static
    pub is_static: bool,
    /// Declared native
    pub is_native: bool,
    /// Simulator-provided body
    pub intrinsic: Option<Intrinsic>,
}

impl<'a> MethodSpec<'a> {
    /// Abstract or ordinary instance method
    pub fn instance(name: &'a str, signature: &'a str) -> Self {
        Self {
            name,
            signature,
            is_static: false,
            is_native: false,
            intrinsic: None,
        }
    }

    /// Static native method
    pub fn static_native(name: &'a str, signature: &'a str) -> Self {
        Self {
            name,
            signature,
            is_static: true,
            is_native: true,
            intrinsic: None,
        }
    }

    /// Static method with a simulator body
    pub fn intrinsic(name: &'a str, signature: &'a str, intrinsic: Intrinsic) -> Self {
        Self {
            name,
            signature,
            is_static: true,
            is_native: false,
            intrinsic: Some(intrinsic),
        }
    }
}

/// Class table for the simulated runtime
#[derive(Debug, Default)]
pub struct ClassTable {
    classes: Vec<ClassDef>,
    methods: Vec<MethodDef>,
    name_to_id: HashMap<String, ClassId>,
    object_to_id: HashMap<HostRef, ClassId>,
}

impl ClassTable {
    /// Create a new empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class whose type object is `object`. Redefining a name
    /// replaces the name lookup but keeps the old class reachable by object.
    pub fn define(
        &mut self,
        name: &str,
        kind: ClassKind,
        object: HostRef,
        methods: &[MethodSpec<'_>],
    ) -> ClassId {
        let id = self.classes.len();
        let mut method_ids = Vec::with_capacity(methods.len());
        for spec in methods {
            // Offset by one: MethodId is never zero
            let Some(method_id) = MethodId::new(self.methods.len() as u64 + 1) else {
                continue;
            };
            self.methods.push(MethodDef {
                id: method_id,
                class: id,
                name: spec.name.to_string(),
                signature: spec.signature.to_string(),
                is_static: spec.is_static,
                is_native: spec.is_native,
                intrinsic: spec.intrinsic,
            });
            method_ids.push(method_id);
        }

        self.classes.push(ClassDef {
            id,
            name: name.to_string(),
            kind,
            object,
            methods: method_ids,
        });
        self.name_to_id.insert(name.to_string(), id);
        self.object_to_id.insert(object, id);
        id
    }

    /// Get class by ID
    pub fn get(&self, id: ClassId) -> Option<&ClassDef> {
        self.classes.get(id)
    }

    /// Get class by name
    pub fn by_name(&self, name: &str) -> Option<&ClassDef> {
        self.name_to_id.get(name).and_then(|id| self.classes.get(*id))
    }

    /// Get class by its type object
    pub fn by_object(&self, object: HostRef) -> Option<&ClassDef> {
        self.object_to_id
            .get(&object)
            .and_then(|id| self.classes.get(*id))
    }

    /// Get method by handle
    pub fn method(&self, id: MethodId) -> Option<&MethodDef> {
        self.methods.get(id.raw() as usize - 1)
    }

    /// Find a method declared on `class` by name, descriptor and staticness
    pub fn find_method(
        &self,
        class: ClassId,
        name: &str,
        signature: &str,
        is_static: bool,
    ) -> Option<&MethodDef> {
        let class = self.classes.get(class)?;
        class
            .methods
            .iter()
            .filter_map(|id| self.method(*id))
            .find(|m| m.name == name && m.signature == signature && m.is_static == is_static)
    }

    /// Number of defined classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
