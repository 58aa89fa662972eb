use serde::{Deserialize, Serialize};

/// The `(Organization, ResourcePath)` pair every entity is scoped by.
///
/// All four repository contracts take a `TenantScope` on every call; nothing
/// in this crate or `calvirt-engine` ever reads or writes an entity without
/// one, which is how tenant isolation (invariant 1 in the data model) is
/// enforced structurally rather than by convention.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantScope {
    pub organization: String,
    pub resource_path: String,
}

impl TenantScope {
    #[must_use]
    pub fn new(organization: impl Into<String>, resource_path: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            resource_path: resource_path.into(),
        }
    }
}
