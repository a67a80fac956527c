//! Names and descriptors of the managed side of the proxy protocol
//!
//! These are the defaults; `BridgeOptions` in the core can override the type
//! and method names for hosts that ship the proxy-generation type elsewhere.

/// Proxy-generation type that owns the factory, disable and invoke methods
pub const BRIDGE_CLASS: &str = "bitter/jnibridge/JNIBridge";

/// Root object type whose identity methods every proxy answers
pub const OBJECT_CLASS: &str = "java/lang/Object";

/// Type of interface/type objects, used as the element type of interface arrays
pub const CLASS_CLASS: &str = "java/lang/Class";

/// Error raised for proxy calls no native code claims
pub const NO_SUCH_METHOD_ERROR: &str = "java/lang/NoSuchMethodError";

/// Error raised when the host dispatches with a null native pointer
pub const NULL_POINTER_EXCEPTION: &str = "java/lang/NullPointerException";

/// Error raised when native handler code panics during a proxy call
pub const RUNTIME_EXCEPTION: &str = "java/lang/RuntimeException";

/// Native invocation callback
pub const INVOKE_NAME: &str = "invoke";
/// `invoke(long, Class, Method, Object[]) -> Object`
pub const INVOKE_SIGNATURE: &str =
    "(JLjava/lang/Class;Ljava/lang/reflect/Method;[Ljava/lang/Object;)Ljava/lang/Object;";

/// Static proxy factory
pub const NEW_PROXY_NAME: &str = "newInterfaceProxy";
/// `newInterfaceProxy(long, Class[]) -> Object`
pub const NEW_PROXY_SIGNATURE: &str = "(J[Ljava/lang/Class;)Ljava/lang/Object;";

/// Static proxy deactivation
pub const DISABLE_PROXY_NAME: &str = "disableInterfaceProxy";
/// `disableInterfaceProxy(Object) -> void`
pub const DISABLE_PROXY_SIGNATURE: &str = "(Ljava/lang/Object;)V";

/// `Object.hashCode()`
pub const HASH_CODE: (&str, &str) = ("hashCode", "()I");
/// `Object.equals(Object)`
pub const EQUALS: (&str, &str) = ("equals", "(Ljava/lang/Object;)Z");
/// `Object.toString()`
pub const TO_STRING: (&str, &str) = ("toString", "()Ljava/lang/String;");

/// String form every proxy reports for itself
pub const PROXY_STRING: &str = "<native proxy object>";
