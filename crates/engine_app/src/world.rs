//! Entity storage for the client.
//!
//! The [`EntityWorld`] owns every live entity, keyed by id and kept in spawn
//! order so init, update and teardown are deterministic.

// Lookup accessors are used by tests and by embedders, not by `main`.
#![allow(dead_code)]

use std::collections::HashMap;
use std::rc::Rc;

use engine_component::{Entity, EntityId, RuntimeContext};
use tracing::{debug, info, warn};

/// Outcome of an [`EntityWorld::init_all`] pass.
#[derive(Debug, Default)]
pub struct InitSummary {
    /// Entities that finished init during this pass.
    pub initialized: usize,
    /// Entities whose init failed, with the error message. They have been
    /// destroyed and removed from the world.
    pub failed: Vec<(EntityId, String)>,
}

impl InitSummary {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The set of entities driven by the tick loop.
#[derive(Debug, Default)]
pub struct EntityWorld {
    entities: HashMap<EntityId, Entity>,
    /// Spawn order.
    order: Vec<EntityId>,
}

impl EntityWorld {
    /// Create a new empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `entity`. Returns `false`, dropping the entity, if
    /// its id is already in use.
    pub fn spawn(&mut self, entity: Entity) -> bool {
        let id = entity.id().clone();
        if self.entities.contains_key(&id) {
            warn!(entity = %id, "entity id already spawned; new entity dropped");
            return false;
        }
        debug!(entity = %id, components = entity.len(), "entity spawned");
        self.order.push(id.clone());
        self.entities.insert(id, entity);
        true
    }

    #[must_use]
    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: &EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    #[must_use]
    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity ids in spawn order.
    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.order.iter()
    }

    /// Initialise every entity that is not yet initialised, one after the
    /// other in spawn order.
    ///
    /// An entity whose init fails is destroyed, so whatever its completed
    /// components allocated is released, and then removed from the world.
    pub async fn init_all(&mut self, context: &Rc<RuntimeContext>) -> InitSummary {
        let mut summary = InitSummary::default();

        for id in self.order.clone() {
            let Some(entity) = self.entities.get_mut(&id) else {
                continue;
            };
            if entity.is_initialized() {
                continue;
            }

            match entity.init(Rc::clone(context)).await {
                Ok(()) => summary.initialized += 1,
                Err(err) => {
                    warn!(entity = %id, error = %err, "entity init failed; destroying it");
                    entity.destroy();
                    self.remove(&id);
                    summary.failed.push((id, err.to_string()));
                }
            }
        }

        info!(
            initialized = summary.initialized,
            failed = summary.failed.len(),
            live = self.entities.len(),
            "init pass complete"
        );
        summary
    }

    /// Run one update on every initialised entity, in spawn order.
    pub fn update(&mut self, delta: f64) {
        for id in &self.order {
            if let Some(entity) = self.entities.get_mut(id)
                && entity.is_initialized()
            {
                entity.update(delta);
            }
        }
    }

    /// Destroy and remove one entity. Returns `false` if the id is unknown.
    pub fn despawn(&mut self, id: &EntityId) -> bool {
        let Some(mut entity) = self.remove(id) else {
            warn!(entity = %id, "despawn of unknown entity");
            return false;
        };
        entity.destroy();
        debug!(entity = %id, "entity despawned");
        true
    }

    /// Destroy every entity in reverse spawn order and empty the world.
    pub fn destroy_all(&mut self) {
        let count = self.order.len();
        for id in self.order.drain(..).rev() {
            if let Some(mut entity) = self.entities.remove(&id) {
                entity.destroy();
            }
        }
        info!(entities = count, "world destroyed");
    }

    fn remove(&mut self, id: &EntityId) -> Option<Entity> {
        let entity = self.entities.remove(id)?;
        self.order.retain(|other| other != id);
        Some(entity)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use engine_resource::TextureSlot;
    use engine_scene::Scene;

    use super::*;
    use crate::demo::{BoxMesh, SphereMesh, Spinner, TextureLoader};

    fn context() -> Rc<RuntimeContext> {
        RuntimeContext::new(Scene::new()).into_shared()
    }

    fn prop(id: &str) -> Entity {
        let mut entity = Entity::new(id);
        entity
            .attach(BoxMesh::new(1.0))
            .attach(TextureLoader::new(TextureSlot::Map, Duration::ZERO))
            .attach(Spinner::new(2.0));
        entity
    }

    #[test]
    fn test_spawn_rejects_duplicate_id() {
        let mut world = EntityWorld::new();
        assert!(world.spawn(Entity::new("a")));
        assert!(!world.spawn(Entity::new("a")));
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn test_ids_keep_spawn_order() {
        let mut world = EntityWorld::new();
        for id in ["c", "a", "b"] {
            world.spawn(Entity::new(id));
        }
        let ids: Vec<_> = world.ids().map(EntityId::as_str).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_init_all_drops_failed_entities() {
        let context = context();
        let mut world = EntityWorld::new();
        world.spawn(prop("good"));
        let mut bad = Entity::new("bad");
        bad.attach(BoxMesh::new(1.0))
            .attach(TextureLoader::new(TextureSlot::Map, Duration::ZERO))
            .attach(SphereMesh::new(8));
        world.spawn(bad);

        let summary = world.init_all(&context).await;

        assert_eq!(summary.initialized, 1);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0.as_str(), "bad");
        assert!(!world.contains(&EntityId::from("bad")));
        // Only the good prop's mesh, material and texture remain.
        assert_eq!(context.scene().live_resources().total(), 3);
    }

    #[tokio::test]
    async fn test_init_all_skips_initialized() {
        let context = context();
        let mut world = EntityWorld::new();
        world.spawn(prop("first"));
        assert_eq!(world.init_all(&context).await.initialized, 1);

        world.spawn(prop("second"));
        let summary = world.init_all(&context).await;
        assert_eq!(summary.initialized, 1);
        assert!(summary.is_clean());
        assert_eq!(context.scene().live_resources().total(), 6);
    }

    #[tokio::test]
    async fn test_despawn_releases_resources() {
        let context = context();
        let mut world = EntityWorld::new();
        world.spawn(prop("a"));
        world.spawn(prop("b"));
        world.init_all(&context).await;

        assert!(world.despawn(&EntityId::from("a")));
        assert!(!world.despawn(&EntityId::from("a")));
        assert_eq!(world.len(), 1);
        assert_eq!(context.scene().live_resources().total(), 3);
    }

    #[tokio::test]
    async fn test_destroy_all_empties_scene() {
        let context = context();
        let mut world = EntityWorld::new();
        for id in ["a", "b", "c"] {
            world.spawn(prop(id));
        }
        world.init_all(&context).await;
        world.update(0.1);

        world.destroy_all();
        assert!(world.is_empty());
        assert_eq!(context.scene().live_resources().total(), 0);
        assert_eq!(context.scene().len(), 1);
    }
}
