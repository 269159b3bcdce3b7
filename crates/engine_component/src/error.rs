//! Component runtime error types.
//!
//! Only allocation-time failures are errors. Duplicate registrations,
//! lifecycle misuse and disposal failures are logged where they happen and
//! never reach the caller.

use crate::capability::Capability;
use crate::entity::EntityId;

/// Errors that abort a component's init and propagate out of
/// [`Entity::init`](crate::Entity::init).
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    /// A required component type is not attached.
    #[error("entity `{entity}`: `{requester}` requires component `{component}`, which is not attached")]
    MissingComponent {
        /// The entity being initialised.
        entity: EntityId,
        /// The component asking.
        requester: &'static str,
        /// The component type that was not found.
        component: &'static str,
    },

    /// No attached component declares the capability.
    #[error(
        "entity `{entity}`: no component provides capability `{capability}`{}",
        requested_by(.requester)
    )]
    MissingCapability {
        /// The entity searched.
        entity: EntityId,
        /// The capability sought.
        capability: Capability,
        /// The component asking, when the lookup came from a component.
        requester: Option<&'static str>,
    },

    /// Two mutually exclusive components are attached to the same entity.
    #[error(
        "entity `{entity}`: `{requester}` cannot be combined with `{conflicting}`{}",
        because(.reason)
    )]
    IncompatibleComponents {
        /// The entity being initialised.
        entity: EntityId,
        /// The component enforcing the restriction.
        requester: &'static str,
        /// The incompatible component found on the entity.
        conflicting: &'static str,
        /// Optional explanation.
        reason: Option<String>,
    },

    /// A named service is missing from the runtime context, or has another
    /// type.
    #[error("service `{name}` is not registered as `{expected}`")]
    MissingService {
        /// The service name.
        name: String,
        /// The Rust type that was requested.
        expected: &'static str,
    },

    /// A component-specific failure, such as a resource that failed to load.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn requested_by(requester: &Option<&'static str>) -> String {
    requester
        .map(|name| format!(" (required by `{name}`)"))
        .unwrap_or_default()
}

fn because(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|reason| format!(": {reason}"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_capability_names_entity_and_tag() {
        let err = ComponentError::MissingCapability {
            entity: EntityId::new("tree-1"),
            capability: Capability::new("mesh-provider"),
            requester: None,
        };
        assert_eq!(
            err.to_string(),
            "entity `tree-1`: no component provides capability `mesh-provider`"
        );
    }

    #[test]
    fn test_missing_capability_names_requester() {
        let err = ComponentError::MissingCapability {
            entity: EntityId::new("tree-1"),
            capability: Capability::new("mesh-provider"),
            requester: Some("Swayer"),
        };
        assert!(err.to_string().ends_with("(required by `Swayer`)"));
    }

    #[test]
    fn test_incompatible_includes_reason() {
        let err = ComponentError::IncompatibleComponents {
            entity: EntityId::new("box"),
            requester: "BoxMesh",
            conflicting: "SphereMesh",
            reason: Some("both provide the entity's mesh".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "entity `box`: `BoxMesh` cannot be combined with `SphereMesh`: both provide the entity's mesh"
        );
    }
}
