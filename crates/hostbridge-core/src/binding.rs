//! Table-driven proxy handlers
//!
//! An `InterfaceBinding` maps methods of one managed interface to Rust
//! closures; a `BindingSet` combines bindings so a single proxy can implement
//! several interfaces. Both implement `ProxyHandler`.
//!
//! ```ignore
//! let runnable = InterfaceBinding::new(bridge.type_handle("java/lang/Runnable"))
//!     .method("run", "()V", |_env, _args| HostRef::NULL);
//! let proxy = bridge.new_bound_proxy(BindingSet::new().with(runnable))?;
//! ```

use once_cell::sync::OnceCell;

use hostbridge_sdk::{HostRef, HostRuntime, InvokeOutcome, MethodId, ProxyHandler};

use crate::error::take_pending;
use crate::handle::TypeHandle;

/// Native body of a bound method: `(env, unpacked arguments) -> result`
pub type BoundMethod = Box<dyn Fn(&dyn HostRuntime, &[HostRef]) -> HostRef + Send + Sync>;

struct MethodBinding {
    name: String,
    signature: String,
    /// Resolved on the first call that reaches this binding
    id: OnceCell<Option<MethodId>>,
    body: BoundMethod,
}

impl MethodBinding {
    fn resolve(&self, env: &dyn HostRuntime, class: HostRef) -> Option<MethodId> {
        *self.id.get_or_init(|| {
            let id = env.get_method_id(class, &self.name, &self.signature);
            if id.is_none() {
                let error = take_pending(env).unwrap_or_default();
                tracing::warn!(name = %self.name, signature = %self.signature, %error, "bound method not found");
            }
            id
        })
    }
}

/// Native implementations of one managed interface's methods
pub struct InterfaceBinding {
    interface: TypeHandle,
    methods: Vec<MethodBinding>,
}

impl InterfaceBinding {
    /// Start a binding for `interface`
    pub fn new(interface: TypeHandle) -> Self {
        Self {
            interface,
            methods: Vec::new(),
        }
    }

    /// Bind `name`/`signature` to `body`
    pub fn method<F>(mut self, name: impl Into<String>, signature: impl Into<String>, body: F) -> Self
    where
        F: Fn(&dyn HostRuntime, &[HostRef]) -> HostRef + Send + Sync + 'static,
    {
        self.methods.push(MethodBinding {
            name: name.into(),
            signature: signature.into(),
            id: OnceCell::new(),
            body: Box::new(body),
        });
        self
    }

    /// The bound interface
    pub fn interface(&self) -> &TypeHandle {
        &self.interface
    }

    /// Number of bound methods
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Are no methods bound?
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl ProxyHandler for InterfaceBinding {
    fn try_invoke(
        &self,
        env: &dyn HostRuntime,
        declaring: HostRef,
        method: MethodId,
        args: HostRef,
    ) -> InvokeOutcome {
        let Some(class) = self.interface.raw_class() else {
            return InvokeOutcome::Unclaimed;
        };
        if !env.is_same_object(declaring, class) {
            return InvokeOutcome::Unclaimed;
        }

        match self
            .methods
            .iter()
            .find(|binding| binding.resolve(env, class) == Some(method))
        {
            Some(binding) => InvokeOutcome::Claimed((binding.body)(env, &unpack(env, args))),
            None => InvokeOutcome::Unclaimed,
        }
    }
}

/// Bindings for several interfaces, tried in insertion order
#[derive(Default)]
pub struct BindingSet {
    bindings: Vec<InterfaceBinding>,
}

impl BindingSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding
    pub fn with(mut self, binding: InterfaceBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Add a binding
    pub fn push(&mut self, binding: InterfaceBinding) {
        self.bindings.push(binding);
    }

    /// Interfaces covered by the set
    pub fn interfaces(&self) -> impl Iterator<Item = &TypeHandle> {
        self.bindings.iter().map(InterfaceBinding::interface)
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Is the set empty?
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl ProxyHandler for BindingSet {
    fn try_invoke(
        &self,
        env: &dyn HostRuntime,
        declaring: HostRef,
        method: MethodId,
        args: HostRef,
    ) -> InvokeOutcome {
        self.bindings
            .iter()
            .fold(InvokeOutcome::Unclaimed, |outcome, binding| {
                outcome.or_else(|| binding.try_invoke(env, declaring, method, args))
            })
    }
}

fn unpack(env: &dyn HostRuntime, args: HostRef) -> Vec<HostRef> {
    if args.is_null() {
        return Vec::new();
    }
    (0..env.array_length(args))
        .map(|index| env.array_element(args, index))
        .collect()
}
