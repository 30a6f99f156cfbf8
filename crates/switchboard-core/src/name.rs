// ABOUTME: Logical service names of the form "namespace.ShortName".
// ABOUTME: Parsing splits on the last dot so namespaces may themselves contain dots.

use std::fmt;
use std::str::FromStr;

use crate::error::SwitchboardError;

/// A parsed logical service name: a namespace plus a short service name.
///
/// The string form is `namespace.ShortName`. Parsing splits on the LAST dot,
/// so `"proto.pkg.Greeter"` has namespace `"proto.pkg"` and name `"Greeter"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceName {
    namespace: String,
    name: String,
}

impl ServiceName {
    /// Create a service name from already-split parts.
    ///
    /// The namespace must be non-empty; the short name must be non-empty and
    /// must not contain a dot (it would not survive a parse round-trip).
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, SwitchboardError> {
        let namespace = namespace.into();
        let name = name.into();
        if namespace.is_empty() {
            return Err(invalid(&format!(".{}", name), "empty namespace"));
        }
        if name.is_empty() {
            return Err(invalid(&format!("{}.", namespace), "empty name"));
        }
        if name.contains('.') {
            return Err(invalid(
                &format!("{}.{}", namespace, name),
                "short name must not contain '.'",
            ));
        }
        Ok(Self { namespace, name })
    }

    /// The namespace part (everything before the last dot).
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The short name part (everything after the last dot).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The full dotted name used as a registry key.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

impl FromStr for ServiceName {
    type Err = SwitchboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(dot) = s.rfind('.') else {
            return Err(invalid(s, "missing '.' separator"));
        };
        let (namespace, name) = (&s[..dot], &s[dot + 1..]);
        if namespace.is_empty() {
            return Err(invalid(s, "empty namespace"));
        }
        if name.is_empty() {
            return Err(invalid(s, "empty name"));
        }
        Ok(Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }
}

fn invalid(name: &str, reason: &str) -> SwitchboardError {
    SwitchboardError::InvalidServiceName {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
