//! SimRuntime - the simulator's implementation of `HostRuntime`
//!
//! Besides answering the bridge's calls, `SimRuntime` plays the managed side
//! of the protocol: [`SimRuntime::call_proxy`] does what a generated proxy
//! class does when one of its methods is called, i.e. packs the call into a
//! reflected method and an argument array and hands it to the registered
//! native `invoke` callback.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::ThreadId;

use hostbridge_sdk::protocol;
use hostbridge_sdk::{HostArg, HostRef, HostRuntime, InvokeFn, MethodId, NativeMethod};

use crate::classes::{ClassId, ClassKind, ClassTable, Intrinsic, MethodSpec};
use crate::error::{SimError, SimResult};
use crate::heap::{Heap, ProxyState, SimObject};

const NO_CLASS_DEF_FOUND_ERROR: &str = "java/lang/NoClassDefFoundError";
const ILLEGAL_ARGUMENT_EXCEPTION: &str = "java/lang/IllegalArgumentException";
const UNSUPPORTED_OPERATION_EXCEPTION: &str = "java/lang/UnsupportedOperationException";

/// Simulated managed runtime.
///
/// Thread-safe: every `HostRuntime` method may be called from any thread.
/// Pending errors are tracked per calling thread.
pub struct SimRuntime {
    heap: Heap,
    classes: RwLock<ClassTable>,
    natives: RwLock<HashMap<MethodId, InvokeFn>>,
    pending: Mutex<HashMap<ThreadId, HostRef>>,
    factory_calls: AtomicUsize,
    disable_calls: AtomicUsize,
    dispatches: AtomicUsize,
}

impl SimRuntime {
    /// Runtime with the core types and the default proxy-generation type
    pub fn new() -> Self {
        let rt = Self::bare();
        rt.define_bridge_class(protocol::BRIDGE_CLASS);
        rt
    }

    /// Runtime with only the core types (no proxy-generation type)
    pub fn bare() -> Self {
        let rt = Self {
            heap: Heap::new(),
            classes: RwLock::new(ClassTable::new()),
            natives: RwLock::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            factory_calls: AtomicUsize::new(0),
            disable_calls: AtomicUsize::new(0),
            dispatches: AtomicUsize::new(0),
        };

        let (hash_name, hash_sig) = protocol::HASH_CODE;
        let (equals_name, equals_sig) = protocol::EQUALS;
        let (to_string_name, to_string_sig) = protocol::TO_STRING;
        rt.define_class(
            protocol::OBJECT_CLASS,
            ClassKind::Class,
            &[
                MethodSpec::instance(hash_name, hash_sig),
                MethodSpec::instance(equals_name, equals_sig),
                MethodSpec::instance(to_string_name, to_string_sig),
            ],
        );
        for name in [
            protocol::CLASS_CLASS,
            "java/lang/String",
            "java/lang/Integer",
            "java/lang/Boolean",
            "java/lang/reflect/Method",
            protocol::NO_SUCH_METHOD_ERROR,
            protocol::NULL_POINTER_EXCEPTION,
            protocol::RUNTIME_EXCEPTION,
            NO_CLASS_DEF_FOUND_ERROR,
            ILLEGAL_ARGUMENT_EXCEPTION,
            UNSUPPORTED_OPERATION_EXCEPTION,
        ] {
            rt.define_class(name, ClassKind::Class, &[]);
        }
        rt
    }

    // ========================================================================
    // Type Definition
    // ========================================================================

    /// Define a type and return its type object
    pub fn define_class(&self, name: &str, kind: ClassKind, methods: &[MethodSpec<'_>]) -> HostRef {
        let mut classes = self.classes.write();
        let object = self.heap.alloc(SimObject::Class(classes.len()));
        classes.define(name, kind, object, methods);
        object
    }

    /// Define an interface with instance methods `(name, descriptor)`
    pub fn define_interface(&self, name: &str, methods: &[(&str, &str)]) -> HostRef {
        let specs: Vec<_> = methods
            .iter()
            .map(|(method, signature)| MethodSpec::instance(method, signature))
            .collect();
        self.define_class(name, ClassKind::Interface, &specs)
    }

    /// Define a proxy-generation type with the standard factory, disable and
    /// native invoke methods
    pub fn define_bridge_class(&self, name: &str) -> HostRef {
        self.define_class(
            name,
            ClassKind::Class,
            &[
                MethodSpec::static_native(protocol::INVOKE_NAME, protocol::INVOKE_SIGNATURE),
                MethodSpec::intrinsic(
                    protocol::NEW_PROXY_NAME,
                    protocol::NEW_PROXY_SIGNATURE,
                    Intrinsic::NewInterfaceProxy,
                ),
                MethodSpec::intrinsic(
                    protocol::DISABLE_PROXY_NAME,
                    protocol::DISABLE_PROXY_SIGNATURE,
                    Intrinsic::DisableInterfaceProxy,
                ),
            ],
        )
    }

    /// Resolve a method handle by type name, method name and descriptor
    pub fn method_id(&self, class: &str, name: &str, signature: &str) -> Option<MethodId> {
        let classes = self.classes.read();
        let class = classes.by_name(class)?;
        classes
            .find_method(class.id, name, signature, false)
            .or_else(|| classes.find_method(class.id, name, signature, true))
            .map(|m| m.id)
    }

    /// Type object for a type name, without raising
    pub fn class_object(&self, name: &str) -> Option<HostRef> {
        self.classes.read().by_name(name).map(|c| c.object)
    }

    // ========================================================================
    // Managed-side Proxy Calls
    // ========================================================================

    /// Call `name`/`signature` on a proxy instance the way managed code would.
    ///
    /// Identity methods resolve against the root object type; everything else
    /// against the proxy's interfaces. Returns the native result, or the error
    /// the native side left pending. The reflected method and argument array
    /// built for the call are freed when it returns.
    pub fn call_proxy(
        &self,
        proxy: HostRef,
        name: &str,
        signature: &str,
        args: &[HostRef],
    ) -> SimResult<HostRef> {
        let state = match self.heap.get(proxy) {
            Some(SimObject::Proxy(state)) => state,
            _ => return Err(SimError::NotAProxy),
        };
        if state.disabled {
            return Err(SimError::Disabled);
        }

        let (declaring, method, entry) = {
            let classes = self.classes.read();
            let object_class = classes
                .by_name(protocol::OBJECT_CLASS)
                .ok_or(SimError::NotLinked)?;
            let method = classes
                .find_method(object_class.id, name, signature, false)
                .or_else(|| {
                    state
                        .interfaces
                        .iter()
                        .find_map(|iface| classes.find_method(*iface, name, signature, false))
                })
                .ok_or_else(|| SimError::NoSuchMethod {
                    name: name.to_string(),
                    signature: signature.to_string(),
                })?;
            let declaring = classes
                .get(method.class)
                .map(|c| c.object)
                .ok_or(SimError::NotLinked)?;

            let invoke = classes
                .find_method(
                    state.bridge,
                    protocol::INVOKE_NAME,
                    protocol::INVOKE_SIGNATURE,
                    true,
                )
                .ok_or(SimError::NotLinked)?;
            let entry = *self
                .natives
                .read()
                .get(&invoke.id)
                .ok_or(SimError::NotLinked)?;
            (declaring, method.id, entry)
        };

        let reflected = self.heap.alloc(SimObject::Method(method));
        let args_array = if args.is_empty() {
            HostRef::NULL
        } else {
            let element_class = self.class_object(protocol::OBJECT_CLASS).unwrap_or_default();
            self.heap.alloc(SimObject::Array {
                element_class,
                items: args.to_vec(),
            })
        };

        self.dispatches.fetch_add(1, Ordering::Relaxed);
        let result = entry(self, state.native_ptr, declaring, reflected, args_array);
        self.heap.free(reflected);
        if !args_array.is_null() {
            self.heap.free(args_array);
        }

        match self.take_pending() {
            Some(thrown) => Err(self.thrown_error(thrown)),
            None => Ok(result),
        }
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Take the error pending on the calling thread as a `SimError::Thrown`
    pub fn take_exception(&self) -> Option<SimError> {
        self.take_pending().map(|thrown| self.thrown_error(thrown))
    }

    /// Is the proxy disabled? `None` if `proxy` is not a proxy
    pub fn is_disabled(&self, proxy: HostRef) -> Option<bool> {
        match self.heap.get(proxy) {
            Some(SimObject::Proxy(state)) => Some(state.disabled),
            _ => None,
        }
    }

    /// Native pointer a proxy was created with
    pub fn proxy_native_ptr(&self, proxy: HostRef) -> Option<i64> {
        match self.heap.get(proxy) {
            Some(SimObject::Proxy(state)) => Some(state.native_ptr),
            _ => None,
        }
    }

    /// Names of the interfaces a proxy implements
    pub fn proxy_interfaces(&self, proxy: HostRef) -> Vec<String> {
        let Some(SimObject::Proxy(state)) = self.heap.get(proxy) else {
            return Vec::new();
        };
        let classes = self.classes.read();
        state
            .interfaces
            .iter()
            .filter_map(|id| classes.get(*id).map(|c| c.name.clone()))
            .collect()
    }

    /// Is a native entry bound to `class.name signature`?
    pub fn is_registered(&self, class: &str, name: &str, signature: &str) -> bool {
        self.method_id(class, name, signature)
            .map(|id| self.natives.read().contains_key(&id))
            .unwrap_or(false)
    }

    /// Number of `newInterfaceProxy` calls
    pub fn factory_calls(&self) -> usize {
        self.factory_calls.load(Ordering::Relaxed)
    }

    /// Number of `disableInterfaceProxy` calls
    pub fn disable_calls(&self) -> usize {
        self.disable_calls.load(Ordering::Relaxed)
    }

    /// Number of calls handed to the native invoke callback
    pub fn dispatch_count(&self) -> usize {
        self.dispatches.load(Ordering::Relaxed)
    }

    /// Outstanding global references to `obj`
    pub fn pin_count(&self, obj: HostRef) -> usize {
        self.heap.pin_count(obj)
    }

    /// Outstanding global references across the heap
    pub fn total_pins(&self) -> usize {
        self.heap.total_pins()
    }

    /// Local references handed out and not yet deleted
    pub fn outstanding_locals(&self) -> usize {
        self.heap.total_locals()
    }

    /// Number of live heap objects
    pub fn object_count(&self) -> usize {
        self.heap.len()
    }

    /// Unbox an integer
    pub fn int_value(&self, obj: HostRef) -> Option<i32> {
        match self.heap.get(obj) {
            Some(SimObject::Int(value)) => Some(value),
            _ => None,
        }
    }

    /// Unbox a boolean
    pub fn bool_value(&self, obj: HostRef) -> Option<bool> {
        match self.heap.get(obj) {
            Some(SimObject::Bool(value)) => Some(value),
            _ => None,
        }
    }

    /// Read a string
    pub fn string_value(&self, obj: HostRef) -> Option<String> {
        match self.heap.get(obj) {
            Some(SimObject::Str(value)) => Some(value),
            _ => None,
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn take_pending(&self) -> Option<HostRef> {
        self.pending.lock().remove(&std::thread::current().id())
    }

    fn thrown_error(&self, thrown: HostRef) -> SimError {
        match self.heap.get(thrown) {
            Some(SimObject::Throwable { class, message }) => SimError::Thrown {
                class: self.class_name(class),
                message,
            },
            _ => SimError::Thrown {
                class: "<unknown>".to_string(),
                message: String::new(),
            },
        }
    }

    fn class_name(&self, id: ClassId) -> String {
        self.classes
            .read()
            .get(id)
            .map(|c| c.name.clone())
            .unwrap_or_default()
    }

    fn class_id(&self, object: HostRef) -> Option<ClassId> {
        match self.heap.get(object) {
            Some(SimObject::Class(id)) => Some(id),
            _ => None,
        }
    }

    fn new_interface_proxy(&self, bridge: ClassId, args: &[HostArg]) -> HostRef {
        let (native_ptr, interfaces) = match args {
            [HostArg::Long(ptr), HostArg::Object(array)] => (*ptr, *array),
            _ => {
                self.throw_new(ILLEGAL_ARGUMENT_EXCEPTION, "newInterfaceProxy(long, Class[])");
                return HostRef::NULL;
            }
        };
        let items = match self.heap.get(interfaces) {
            Some(SimObject::Array { items, .. }) => items,
            _ => {
                self.throw_new(ILLEGAL_ARGUMENT_EXCEPTION, "interfaces must be a Class[]");
                return HostRef::NULL;
            }
        };

        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            let kind = self
                .class_id(item)
                .and_then(|id| self.classes.read().get(id).map(|c| (id, c.kind)));
            match kind {
                Some((id, ClassKind::Interface)) => ids.push(id),
                _ => {
                    let name = self.describe(item);
                    self.throw_new(ILLEGAL_ARGUMENT_EXCEPTION, &format!("{} is not an interface", name));
                    return HostRef::NULL;
                }
            }
        }

        self.factory_calls.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(native_ptr, interfaces = ids.len(), "sim: new interface proxy");
        self.heap.alloc(SimObject::Proxy(ProxyState {
            bridge,
            native_ptr,
            interfaces: ids,
            disabled: false,
        }))
    }

    fn disable_interface_proxy(&self, args: &[HostArg]) {
        let proxy = match args {
            [HostArg::Object(proxy)] => *proxy,
            _ => {
                self.throw_new(ILLEGAL_ARGUMENT_EXCEPTION, "disableInterfaceProxy(Object)");
                return;
            }
        };
        self.disable_calls.fetch_add(1, Ordering::Relaxed);
        let updated = self.heap.update(proxy, |obj| {
            if let SimObject::Proxy(state) = obj {
                state.disabled = true;
            }
        });
        if !updated || self.is_disabled(proxy).is_none() {
            self.throw_new(ILLEGAL_ARGUMENT_EXCEPTION, "not a proxy instance");
        }
    }
}

impl Default for SimRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl HostRuntime for SimRuntime {
    // ========================================================================
    // Types and References
    // ========================================================================

    fn find_class(&self, name: &str) -> HostRef {
        match self.class_object(name) {
            Some(object) => self.heap.hand_out(object),
            None => {
                self.throw_new(NO_CLASS_DEF_FOUND_ERROR, name);
                HostRef::NULL
            }
        }
    }

    fn new_global_ref(&self, obj: HostRef) -> HostRef {
        if obj.is_null() {
            return HostRef::NULL;
        }
        self.heap.pin(obj);
        obj
    }

    fn delete_global_ref(&self, obj: HostRef) {
        if !obj.is_null() && !self.heap.unpin(obj) {
            tracing::warn!(?obj, "sim: deleting a reference that is not pinned");
        }
    }

    fn delete_local_ref(&self, obj: HostRef) {
        if !obj.is_null() && !self.heap.drop_local(obj) {
            tracing::warn!(?obj, "sim: deleting a local reference that was not handed out");
        }
    }

    fn is_same_object(&self, a: HostRef, b: HostRef) -> bool {
        a == b
    }

    fn identity_hash_code(&self, obj: HostRef) -> i32 {
        if obj.is_null() {
            return 0;
        }
        (obj.to_raw().wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 33) as i32
    }

    fn describe(&self, obj: HostRef) -> String {
        match self.heap.get(obj) {
            None => "null".to_string(),
            Some(SimObject::Class(id)) => {
                let classes = self.classes.read();
                match classes.get(id) {
                    Some(c) if c.kind == ClassKind::Interface => {
                        format!("interface {}", dotted(&c.name))
                    }
                    Some(c) => format!("class {}", dotted(&c.name)),
                    None => "class <unknown>".to_string(),
                }
            }
            Some(SimObject::Int(value)) => value.to_string(),
            Some(SimObject::Bool(value)) => value.to_string(),
            Some(SimObject::Str(value)) => value,
            Some(SimObject::Array { items, .. }) => format!("Object[{}]", items.len()),
            Some(SimObject::Method(id)) => {
                let classes = self.classes.read();
                let Some(method) = classes.method(id) else {
                    return "method <unknown>".to_string();
                };
                let Some(class) = classes.get(method.class) else {
                    return "method <unknown>".to_string();
                };
                let (params, ret) = descriptor_to_java(&method.signature);
                let mut modifiers = String::from("public ");
                if method.is_static {
                    modifiers.push_str("static ");
                }
                if method.is_native {
                    modifiers.push_str("native ");
                } else if class.kind == ClassKind::Interface {
                    modifiers.push_str("abstract ");
                }
                format!(
                    "{}{} {}.{}({})",
                    modifiers,
                    ret,
                    dotted(&class.name),
                    method.name,
                    params.join(",")
                )
            }
            Some(SimObject::Proxy(_)) => {
                format!("$Proxy@{:x}", self.identity_hash_code(obj))
            }
            Some(SimObject::Throwable { class, message }) => {
                format!("{}: {}", dotted(&self.class_name(class)), message)
            }
        }
    }

    // ========================================================================
    // Native Registration
    // ========================================================================

    fn register_natives(&self, class: HostRef, methods: &[NativeMethod<'_>]) {
        let Some(class_id) = self.class_id(class) else {
            self.throw_new(ILLEGAL_ARGUMENT_EXCEPTION, "register_natives on a non-type");
            return;
        };

        for native in methods {
            let found = {
                let classes = self.classes.read();
                classes
                    .find_method(class_id, native.name, native.signature, true)
                    .or_else(|| classes.find_method(class_id, native.name, native.signature, false))
                    .filter(|m| m.is_native)
                    .map(|m| m.id)
            };
            match found {
                Some(id) => {
                    self.natives.write().insert(id, native.entry);
                }
                None => {
                    let message = format!(
                        "{}.{}{}",
                        dotted(&self.class_name(class_id)),
                        native.name,
                        native.signature
                    );
                    self.throw_new(protocol::NO_SUCH_METHOD_ERROR, &message);
                    return;
                }
            }
        }
    }

    // ========================================================================
    // Pending Errors
    // ========================================================================

    fn exception_check(&self) -> bool {
        self.pending.lock().contains_key(&std::thread::current().id())
    }

    fn exception_occurred(&self) -> HostRef {
        self.pending
            .lock()
            .get(&std::thread::current().id())
            .copied()
            .unwrap_or_default()
    }

    fn exception_clear(&self) {
        self.take_pending();
    }

    fn throw_new(&self, class_name: &str, message: &str) {
        let class = self.classes.read().by_name(class_name).map(|c| c.id);
        let thrown = match class {
            Some(class) => self.heap.alloc(SimObject::Throwable {
                class,
                message: message.to_string(),
            }),
            None => {
                let Some(fallback) = self.classes.read().by_name(NO_CLASS_DEF_FOUND_ERROR).map(|c| c.id)
                else {
                    return;
                };
                self.heap.alloc(SimObject::Throwable {
                    class: fallback,
                    message: class_name.to_string(),
                })
            }
        };
        self.pending.lock().insert(std::thread::current().id(), thrown);
    }

    // ========================================================================
    // Methods
    // ========================================================================

    fn get_method_id(&self, class: HostRef, name: &str, signature: &str) -> Option<MethodId> {
        let found = self.class_id(class).and_then(|id| {
            self.classes
                .read()
                .find_method(id, name, signature, false)
                .map(|m| m.id)
        });
        if found.is_none() {
            self.throw_new(protocol::NO_SUCH_METHOD_ERROR, &format!("{}{}", name, signature));
        }
        found
    }

    fn get_static_method_id(
        &self,
        class: HostRef,
        name: &str,
        signature: &str,
    ) -> Option<MethodId> {
        let found = self.class_id(class).and_then(|id| {
            self.classes
                .read()
                .find_method(id, name, signature, true)
                .map(|m| m.id)
        });
        if found.is_none() {
            self.throw_new(protocol::NO_SUCH_METHOD_ERROR, &format!("{}{}", name, signature));
        }
        found
    }

    fn call_static_method(&self, class: HostRef, method: MethodId, args: &[HostArg]) -> HostRef {
        let target = {
            let classes = self.classes.read();
            classes
                .method(method)
                .filter(|m| m.is_static && Some(m.class) == self.class_id(class))
                .map(|m| (m.class, m.intrinsic))
        };
        match target {
            Some((bridge, Some(Intrinsic::NewInterfaceProxy))) => {
                self.heap.hand_out(self.new_interface_proxy(bridge, args))
            }
            Some((_, Some(Intrinsic::DisableInterfaceProxy))) => {
                self.disable_interface_proxy(args);
                HostRef::NULL
            }
            Some((_, None)) => {
                self.throw_new(UNSUPPORTED_OPERATION_EXCEPTION, "static method has no body");
                HostRef::NULL
            }
            None => {
                self.throw_new(ILLEGAL_ARGUMENT_EXCEPTION, "method is not a static of this type");
                HostRef::NULL
            }
        }
    }

    fn from_reflected_method(&self, method: HostRef) -> Option<MethodId> {
        match self.heap.get(method) {
            Some(SimObject::Method(id)) => Some(id),
            _ => None,
        }
    }

    // ========================================================================
    // Values
    // ========================================================================

    fn new_object_array(&self, element_class: HostRef, items: &[HostRef]) -> HostRef {
        self.heap.hand_out(self.heap.alloc(SimObject::Array {
            element_class,
            items: items.to_vec(),
        }))
    }

    fn array_length(&self, array: HostRef) -> usize {
        match self.heap.get(array) {
            Some(SimObject::Array { items, .. }) => items.len(),
            _ => 0,
        }
    }

    fn array_element(&self, array: HostRef, index: usize) -> HostRef {
        match self.heap.get(array) {
            Some(SimObject::Array { items, .. }) => items.get(index).copied().unwrap_or_default(),
            _ => HostRef::NULL,
        }
    }

    fn box_int(&self, value: i32) -> HostRef {
        self.heap.alloc(SimObject::Int(value))
    }

    fn box_bool(&self, value: bool) -> HostRef {
        self.heap.alloc(SimObject::Bool(value))
    }

    fn new_string(&self, value: &str) -> HostRef {
        self.heap.alloc(SimObject::Str(value.to_string()))
    }
}

/// `pkg/Widget` -> `pkg.Widget`
fn dotted(name: &str) -> String {
    name.replace('/', ".")
}

/// Split a method descriptor into Java-style parameter and return type names
fn descriptor_to_java(signature: &str) -> (Vec<String>, String) {
    let mut chars = signature.chars().peekable();
    let mut params = Vec::new();
    if chars.peek() == Some(&'(') {
        chars.next();
        while let Some(&c) = chars.peek() {
            if c == ')' {
                chars.next();
                break;
            }
            params.push(parse_type(&mut chars));
        }
    }
    let ret = parse_type(&mut chars);
    (params, ret)
}

fn parse_type(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    match chars.next() {
        Some('B') => "byte".to_string(),
        Some('C') => "char".to_string(),
        Some('D') => "double".to_string(),
        Some('F') => "float".to_string(),
        Some('I') => "int".to_string(),
        Some('J') => "long".to_string(),
        Some('S') => "short".to_string(),
        Some('Z') => "boolean".to_string(),
        Some('V') => "void".to_string(),
        Some('[') => format!("{}[]", parse_type(chars)),
        Some('L') => {
            let name: String = chars.by_ref().take_while(|c| *c != ';').collect();
            dotted(&name)
        }
        Some(other) => other.to_string(),
        None => String::new(),
    }
}
