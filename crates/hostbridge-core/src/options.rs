//! Bridge configuration

use hostbridge_sdk::protocol;

/// Names the bridge uses on the managed side.
///
/// The defaults match the stock proxy-generation type; hosts that ship it
/// under another name override `bridge_class` (and, rarely, the method names).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOptions {
    /// Proxy-generation type that declares `invoke` and the factory methods
    pub bridge_class: String,

    /// Root object type whose hash/equals/to-string every proxy answers
    pub object_class: String,

    /// Element type of the interface array passed to the factory
    pub class_class: String,

    /// Name of the native invocation callback
    pub invoke_name: String,

    /// Descriptor of the native invocation callback
    pub invoke_signature: String,

    /// Static factory name
    pub new_proxy_name: String,

    /// Static factory descriptor
    pub new_proxy_signature: String,

    /// Static deactivation name
    pub disable_proxy_name: String,

    /// Static deactivation descriptor
    pub disable_proxy_signature: String,

    /// Error type raised for calls no native code claims
    pub no_such_method_error: String,

    /// String form every proxy reports for itself
    pub proxy_string: String,
}

impl BridgeOptions {
    /// Use a different proxy-generation type
    pub fn with_bridge_class(mut self, name: impl Into<String>) -> Self {
        self.bridge_class = name.into();
        self
    }

    /// Use a different string form for proxies
    pub fn with_proxy_string(mut self, value: impl Into<String>) -> Self {
        self.proxy_string = value.into();
        self
    }
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            bridge_class: protocol::BRIDGE_CLASS.to_string(),
            object_class: protocol::OBJECT_CLASS.to_string(),
            class_class: protocol::CLASS_CLASS.to_string(),
            invoke_name: protocol::INVOKE_NAME.to_string(),
            invoke_signature: protocol::INVOKE_SIGNATURE.to_string(),
            new_proxy_name: protocol::NEW_PROXY_NAME.to_string(),
            new_proxy_signature: protocol::NEW_PROXY_SIGNATURE.to_string(),
            disable_proxy_name: protocol::DISABLE_PROXY_NAME.to_string(),
            disable_proxy_signature: protocol::DISABLE_PROXY_SIGNATURE.to_string(),
            no_such_method_error: protocol::NO_SUCH_METHOD_ERROR.to_string(),
            proxy_string: protocol::PROXY_STRING.to_string(),
        }
    }
}
