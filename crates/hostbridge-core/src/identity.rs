//! Identity methods answered by the bridge for every proxy
//!
//! `hashCode`, `equals` and `toString` are declared on the root object type
//! and reach `invoke` like any interface method. The table caches their
//! method handles so a call can be classified by comparing ids.

use std::sync::Arc;

use hostbridge_sdk::protocol;
use hostbridge_sdk::{HostRef, HostRuntime, MethodId};

use crate::error::take_pending;
use crate::handle::TypeHandle;
use crate::registry::HandleRegistry;

/// Which identity method a call resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityMethod {
    /// `hashCode()I`
    HashCode,
    /// `equals(Ljava/lang/Object;)Z`
    Equals,
    /// `toString()Ljava/lang/String;`
    ToString,
    /// Anything else
    Unrecognized,
}

/// Method handles of the root object type's identity methods
pub struct IdentityTable {
    object_class: TypeHandle,
    hash_code: MethodId,
    equals: MethodId,
    to_string: MethodId,
}

impl IdentityTable {
    /// Resolve the root object type and its identity methods.
    ///
    /// Returns `None` (with the host error cleared) if any lookup fails.
    pub fn build(
        runtime: &Arc<dyn HostRuntime>,
        registry: &Arc<HandleRegistry>,
        object_class: &str,
    ) -> Option<Self> {
        let handle = TypeHandle::resolve(runtime.clone(), registry, object_class);
        let class = handle.raw_class()?;

        let lookup = |(name, signature): (&str, &str)| {
            let id = runtime.get_method_id(class, name, signature);
            if id.is_none() {
                let error = take_pending(runtime.as_ref()).unwrap_or_default();
                tracing::warn!(class = object_class, name, signature, %error, "identity method missing");
            }
            id
        };

        let hash_code = lookup(protocol::HASH_CODE)?;
        let equals = lookup(protocol::EQUALS)?;
        let to_string = lookup(protocol::TO_STRING)?;

        tracing::trace!(class = object_class, "identity table built");
        Some(Self {
            object_class: handle,
            hash_code,
            equals,
            to_string,
        })
    }

    /// Classify a call by declaring type and method handle
    pub fn classify(
        &self,
        env: &dyn HostRuntime,
        declaring: HostRef,
        method: MethodId,
    ) -> IdentityMethod {
        let Some(object_class) = self.object_class.raw_class() else {
            return IdentityMethod::Unrecognized;
        };
        if !env.is_same_object(declaring, object_class) {
            return IdentityMethod::Unrecognized;
        }

        if method == self.hash_code {
            IdentityMethod::HashCode
        } else if method == self.equals {
            IdentityMethod::Equals
        } else if method == self.to_string {
            IdentityMethod::ToString
        } else {
            IdentityMethod::Unrecognized
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostbridge_sim::SimRuntime;

    fn build(rt: &Arc<SimRuntime>) -> (Arc<HandleRegistry>, IdentityTable) {
        let runtime: Arc<dyn HostRuntime> = rt.clone();
        let registry = Arc::new(HandleRegistry::new());
        let table = IdentityTable::build(&runtime, &registry, protocol::OBJECT_CLASS).unwrap();
        (registry, table)
    }

    #[test]
    fn test_classify_identity_methods() {
        let rt = Arc::new(SimRuntime::new());
        let (_registry, table) = build(&rt);
        let object = rt.find_class(protocol::OBJECT_CLASS);

        let (name, sig) = protocol::HASH_CODE;
        let hash = rt.method_id(protocol::OBJECT_CLASS, name, sig).unwrap();
        let (name, sig) = protocol::EQUALS;
        let equals = rt.method_id(protocol::OBJECT_CLASS, name, sig).unwrap();
        let (name, sig) = protocol::TO_STRING;
        let to_string = rt.method_id(protocol::OBJECT_CLASS, name, sig).unwrap();

        assert_eq!(table.classify(rt.as_ref(), object, hash), IdentityMethod::HashCode);
        assert_eq!(table.classify(rt.as_ref(), object, equals), IdentityMethod::Equals);
        assert_eq!(table.classify(rt.as_ref(), object, to_string), IdentityMethod::ToString);
    }

    #[test]
    fn test_other_declaring_type_is_unrecognized() {
        let rt = Arc::new(SimRuntime::new());
        let widget = rt.define_interface("pkg/Widget", &[("hashCode", "()I")]);
        let (_registry, table) = build(&rt);

        let own = rt.method_id("pkg/Widget", "hashCode", "()I").unwrap();
        assert_eq!(table.classify(rt.as_ref(), widget, own), IdentityMethod::Unrecognized);

        let (name, sig) = protocol::HASH_CODE;
        let hash = rt.method_id(protocol::OBJECT_CLASS, name, sig).unwrap();
        assert_eq!(table.classify(rt.as_ref(), widget, hash), IdentityMethod::Unrecognized);
    }

    #[test]
    fn test_released_table_recognizes_nothing() {
        let rt = Arc::new(SimRuntime::new());
        let (registry, table) = build(&rt);
        let object = rt.find_class(protocol::OBJECT_CLASS);
        let (name, sig) = protocol::HASH_CODE;
        let hash = rt.method_id(protocol::OBJECT_CLASS, name, sig).unwrap();

        registry.cleanup_all();
        assert_eq!(table.classify(rt.as_ref(), object, hash), IdentityMethod::Unrecognized);
    }

    #[test]
    fn test_build_fails_without_root_type() {
        let rt = Arc::new(SimRuntime::new());
        let runtime: Arc<dyn HostRuntime> = rt.clone();
        let registry = Arc::new(HandleRegistry::new());

        assert!(IdentityTable::build(&runtime, &registry, "pkg/NoObject").is_none());
        assert!(!rt.exception_check());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_build_fails_without_identity_methods() {
        let rt = Arc::new(SimRuntime::new());
        rt.define_interface("pkg/Bare", &[]);
        let runtime: Arc<dyn HostRuntime> = rt.clone();
        let registry = Arc::new(HandleRegistry::new());

        assert!(IdentityTable::build(&runtime, &registry, "pkg/Bare").is_none());
        assert!(!rt.exception_check());
        // The handle resolved for the failed build is released on return
        assert!(registry.is_empty());
        assert_eq!(rt.total_pins(), 0);
    }
}
