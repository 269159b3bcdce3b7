//! Fixed-timestep update loop.
//!
//! Each tick advances the counter and runs one update pass over the
//! [`EntityWorld`] with the fixed step as delta. Between ticks the loop
//! yields to the runtime so pending async work keeps making progress.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::RuntimeConfig;
use crate::world::EntityWorld;

/// Configuration for the tick loop.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
        }
    }
}

impl From<&RuntimeConfig> for TickConfig {
    fn from(config: &RuntimeConfig) -> Self {
        Self {
            tick_rate: config.tick_rate,
            max_ticks: config.max_ticks,
        }
    }
}

/// The tick loop state.
#[derive(Debug)]
pub struct TickLoop {
    /// Current tick counter.
    tick_id: u64,
    config: TickConfig,
    world: EntityWorld,
}

impl TickLoop {
    /// Create a tick loop driving `world`.
    #[must_use]
    pub fn new(config: TickConfig, world: EntityWorld) -> Self {
        Self {
            tick_id: 0,
            config,
            world,
        }
    }

    /// Returns the current tick counter.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    #[must_use]
    pub fn world(&self) -> &EntityWorld {
        &self.world
    }

    /// Hand the world back, e.g. for teardown.
    #[must_use]
    pub fn into_world(self) -> EntityWorld {
        self.world
    }

    /// The fixed step between ticks.
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.config.tick_rate)
    }

    /// Run one tick with `dt` seconds as the update delta.
    pub fn tick(&mut self, dt: f64) {
        self.tick_id += 1;
        debug!(
            tick_id = self.tick_id,
            dt,
            entities = self.world.len(),
            "tick start"
        );
        self.world.update(dt);
    }

    /// Run the loop for the configured number of ticks, or until the world
    /// is empty when unlimited.
    pub async fn run(&mut self) {
        let tick_duration = self.tick_duration();
        let dt = tick_duration.as_secs_f64();
        let mut tick_count = 0u64;

        info!(
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            "starting tick loop"
        );

        loop {
            let start = Instant::now();
            self.tick(dt);

            tick_count += 1;
            if self.config.max_ticks > 0 && tick_count >= self.config.max_ticks {
                info!(ticks = tick_count, "tick loop complete");
                break;
            }
            if self.config.max_ticks == 0 && self.world.is_empty() {
                info!(ticks = tick_count, "world empty; tick loop stopping");
                break;
            }

            let elapsed = start.elapsed();
            if elapsed < tick_duration {
                tokio::time::sleep(tick_duration - elapsed).await;
            } else {
                warn!(
                    tick_id = self.tick_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = tick_duration.as_millis() as u64,
                    "tick exceeded time budget"
                );
                tokio::task::yield_now().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use engine_component::{Entity, RuntimeContext};
    use engine_scene::Scene;

    use super::*;
    use crate::demo::{BoxMesh, Spinner};

    #[test]
    fn test_tick_advances_counter() {
        let mut tick_loop = TickLoop::new(TickConfig::default(), EntityWorld::new());
        assert_eq!(tick_loop.tick_id(), 0);
        tick_loop.tick(1.0 / 60.0);
        assert_eq!(tick_loop.tick_id(), 1);
        tick_loop.tick(1.0 / 60.0);
        assert_eq!(tick_loop.tick_id(), 2);
    }

    #[test]
    fn test_config_conversion() {
        let config = RuntimeConfig::default().with_max_ticks(7).with_tick_rate(30.0);
        let tick = TickConfig::from(&config);
        assert_eq!(tick.max_ticks, 7);
        assert_eq!(tick.tick_rate, 30.0);
    }

    #[tokio::test]
    async fn test_run_limited_ticks() {
        let config = TickConfig {
            tick_rate: 1000.0, // fast for testing
            max_ticks: 5,
        };
        let mut tick_loop = TickLoop::new(config, EntityWorld::new());
        tick_loop.run().await;
        assert_eq!(tick_loop.tick_id(), 5);
    }

    #[tokio::test]
    async fn test_unlimited_run_stops_on_empty_world() {
        let mut tick_loop = TickLoop::new(TickConfig::default(), EntityWorld::new());
        tick_loop.run().await;
        assert_eq!(tick_loop.tick_id(), 1);
    }

    #[tokio::test]
    async fn test_ticks_update_entities() {
        let context = RuntimeContext::new(Scene::new()).into_shared();
        let mut world = EntityWorld::new();
        let mut entity = Entity::new("spinner");
        entity.attach(BoxMesh::new(1.0)).attach(Spinner::new(1.0));
        world.spawn(entity);
        world.init_all(&context).await;

        let mut tick_loop = TickLoop::new(
            TickConfig {
                tick_rate: 1000.0,
                max_ticks: 3,
            },
            world,
        );
        tick_loop.run().await;

        let mut world = tick_loop.into_world();
        let node = world
            .get(&"spinner".into())
            .and_then(|entity| entity.get_component::<Spinner>())
            .and_then(Spinner::target)
            .unwrap();
        let rotation = context.scene().node(node).unwrap().transform.rotation;
        assert!(rotation.angle_between(engine_scene::Quat::IDENTITY) > 0.0);
        world.destroy_all();
        assert_eq!(Rc::strong_count(&context), 1);
    }
}
