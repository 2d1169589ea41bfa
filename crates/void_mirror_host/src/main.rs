//! Mirror host
//!
//! Boots a host scene from a TOML config, loads the guest module and runs the
//! mirror tick loop.
//!
//! Run with: cargo run -p void_mirror_host -- path/to/mirror.toml

mod host_config;

use host_config::{HostConfig, HostError};
use std::path::PathBuf;
use std::time::Duration;
use void_mirror::{Bridge, NativeGuest};
use void_scene::World;

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("mirror.toml"));

    if let Err(e) = run(&path) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(path: &std::path::Path) -> Result<(), HostError> {
    let config = HostConfig::load(path)?;
    log::info!("Loaded host config from {}", path.display());

    let mut world = World::new();
    let named = config.scene.spawn_into(&mut world)?;
    log::info!("Scene has {} named entities", named.len());

    let guest = NativeGuest::load(&config.bridge)?;
    let mut bridge = Bridge::new(guest, &config.bridge);
    bridge.start(&world)?;

    let interval = Duration::from_millis(config.run.tick_interval_ms);
    loop {
        let report = bridge.tick(&mut world)?;
        if !report.outbound.spawned.is_empty() || report.inbound.created > 0 {
            log::info!(
                "Tick {}: mirrored {}, guest created {}, {} pending",
                report.tick,
                report.outbound.spawned.len(),
                report.inbound.created,
                report.outbound.pending
            );
        }

        if config.run.ticks > 0 && report.tick >= config.run.ticks {
            break;
        }
        std::thread::sleep(interval);
    }

    log::info!(
        "Stopping after {} ticks with {} mirrored entities",
        bridge.tick_count(),
        bridge.table().len()
    );
    Ok(())
}
