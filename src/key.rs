//! Namespaced object identity
//!
//! A driver Service and the Route derived from it share one key, so every
//! lookup the reconciler does is a plain `(namespace, name)` equality check.

use std::fmt;

use kube::Resource;

use crate::Error;

/// `(namespace, name)` pair identifying a Service and its Route
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    /// Namespace of the object
    pub namespace: String,
    /// Name of the object
    pub name: String,
}

impl ObjectKey {
    /// Create a key from a namespace and a name
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of a namespaced object.
    ///
    /// Fails for objects missing a name or namespace, which cannot be mirrored
    /// by a Route.
    pub fn for_resource<K: Resource>(obj: &K) -> Result<Self, Error> {
        let meta = obj.meta();
        let key = Self::new(
            meta.namespace.clone().unwrap_or_default(),
            meta.name.clone().unwrap_or_default(),
        );
        key.validate()?;
        Ok(key)
    }

    /// Reject keys with an empty namespace or name
    pub fn validate(&self) -> Result<(), Error> {
        if self.name.is_empty() {
            return Err(Error::invalid_key(self.clone(), "name is empty"));
        }
        if self.namespace.is_empty() {
            return Err(Error::invalid_key(self.clone(), "namespace is empty"));
        }
        Ok(())
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
