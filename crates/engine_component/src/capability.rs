//! Capability tags.
//!
//! A [`Capability`] advertises that a component provides some interface
//! without naming its concrete type. Tags are declared once as constants in a
//! module shared by producers and consumers:
//!
//! ```rust
//! use engine_component::Capability;
//!
//! pub const MESH_PROVIDER: Capability = Capability::new("mesh-provider");
//! ```
//!
//! Producers declare the tag on their [`ComponentCore`](crate::ComponentCore);
//! consumers look it up with `find_by_capability` / `require_by_capability`.

use crate::component::fnv1a;

/// An opaque capability token, identified by the FNV-1a hash of its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Capability {
    id: u64,
    name: &'static str,
}

impl Capability {
    /// Declare a capability. Names must be unique across the process.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            id: fnv1a(name),
            name,
        }
    }

    /// The declared name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.name
    }

    /// The hashed id.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.id
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// The append-only set of capabilities a component declares, in declaration
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    tags: Vec<Capability>,
}

impl CapabilitySet {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `capability`. Returns `false` if it was already present.
    pub fn insert(&mut self, capability: Capability) -> bool {
        if self.contains(capability) {
            return false;
        }
        self.tags.push(capability);
        true
    }

    /// Membership test.
    #[must_use]
    pub fn contains(&self, capability: Capability) -> bool {
        self.tags.iter().any(|tag| tag.id == capability.id)
    }

    /// Iterate in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.tags.iter().copied()
    }

    /// Number of declared capabilities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut set = Self::new();
        for capability in iter {
            set.insert(capability);
        }
        set
    }
}
