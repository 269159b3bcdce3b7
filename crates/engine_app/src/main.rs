//! # engine_app: demo client
//!
//! Builds a scene, composes a handful of props out of demo components, and
//! drives them through the full lifecycle:
//!
//! 1. Load configuration (defaults, then an optional JSON file, then flags).
//! 2. Create the runtime context and spawn the props.
//! 3. Initialise every entity; props whose init fails are torn down.
//! 4. Run the fixed-timestep tick loop.
//! 5. Destroy every entity, flush the context registry, and report any
//!    resources still alive.

mod config;
mod demo;
mod tick;
mod world;

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Result;
use clap::Parser;
use engine_component::{Entity, RuntimeContext};
use engine_resource::TextureSlot;
use engine_scene::{Scene, Vec3};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::RuntimeConfig;
use demo::{BoxMesh, SphereMesh, Spinner, TELEMETRY, Telemetry, TextureLoader};
use tick::{TickConfig, TickLoop};
use world::EntityWorld;

/// Command-line flags. Each one overrides the configuration file.
#[derive(Debug, Parser)]
#[command(name = "engine_app", about = "Entity-component lifecycle demo")]
struct Cli {
    /// JSON configuration file.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Number of ticks to run (0 runs until the world is empty).
    #[arg(long)]
    ticks: Option<u64>,

    /// Target ticks per second.
    #[arg(long)]
    tick_rate: Option<f64>,

    /// Number of props to spawn.
    #[arg(long)]
    props: Option<usize>,
}

impl Cli {
    fn resolve(&self) -> Result<RuntimeConfig> {
        let mut config = match &self.config {
            Some(path) => RuntimeConfig::from_file(path)?,
            None => RuntimeConfig::default(),
        };
        if let Some(ticks) = self.ticks {
            config = config.with_max_ticks(ticks);
        }
        if let Some(tick_rate) = self.tick_rate {
            config = config.with_tick_rate(tick_rate);
        }
        if let Some(props) = self.props {
            config = config.with_props(props);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Alternate box and sphere props along the X axis.
fn spawn_props(world: &mut EntityWorld, config: &RuntimeConfig) {
    for index in 0..config.props {
        let position = Vec3::new(index as f32 * 2.0, 0.0, 0.0);
        let mut entity = Entity::new(format!("prop-{index}")).with_category("prop");
        if index % 2 == 0 {
            entity.attach(BoxMesh::new(1.0).with_position(position));
        } else {
            entity.attach(SphereMesh::new(24).with_position(position));
        }
        entity
            .attach(TextureLoader::new(TextureSlot::Map, config.load_delay()).with_size(512))
            .attach(Spinner::new(0.5 + index as f32 * 0.25));
        world.spawn(entity);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve()?;

    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(config.log_filter.parse()?))
        .init();

    info!(
        props = config.props,
        tick_rate = config.tick_rate,
        max_ticks = config.max_ticks,
        "engine client starting"
    );

    let telemetry = Rc::new(Telemetry::default());
    let context = RuntimeContext::new(Scene::new())
        .with_service(TELEMETRY, Rc::clone(&telemetry))
        .into_shared();

    let mut world = EntityWorld::new();
    spawn_props(&mut world, &config);

    let summary = world.init_all(&context).await;
    for (entity, error) in &summary.failed {
        warn!(%entity, %error, "prop discarded");
    }

    let mut tick_loop = TickLoop::new(TickConfig::from(&config), world);
    tick_loop.run().await;
    info!(
        ticks = tick_loop.tick_id(),
        entities = tick_loop.world().len(),
        spinners = telemetry.active_spinners(),
        rotations = telemetry.rotations(),
        "simulation finished"
    );

    let mut world = tick_loop.into_world();
    world.destroy_all();

    let report = context.teardown();
    if !report.is_clean() {
        warn!(failures = report.failures, "context cleanup reported failures");
    }

    let live = context.scene().live_resources();
    if live.total() == 0 {
        info!("all scene resources released");
    } else {
        warn!(
            geometries = live.geometries,
            materials = live.materials,
            textures = live.textures,
            "scene resources leaked"
        );
    }

    info!("engine client shut down");
    Ok(())
}
