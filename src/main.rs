use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use crossbeam_channel::unbounded;

use photosurvey::model::{DetectionMode, SessionConfig, WorldPosition};
use photosurvey::ports::PortEvent;
use photosurvey::session::{Orchestrator, SharedState, Timing};
use photosurvey::sim::{SimCamera, SimDetector, SimNavigation, SimWorld};
use photosurvey::triangulate::MapInfo;

/// Run one simulated split-mode survey session end to end and print the
/// triangulated target position against the scripted ground truth.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let start = WorldPosition::new(0.0, 0.0, 0.0);
    let target = (3.0, 4.0);
    let world = SimWorld::new(start, target, "chair");

    let map = MapInfo {
        origin_x: -20.0,
        origin_y: -20.0,
        resolution: 0.1,
        bitmap_width: 400,
    };

    let (events_tx, events_rx) = unbounded::<PortEvent>();
    let shared = SharedState::new();

    let mut orchestrator = Orchestrator::new(
        SimNavigation::new(world.clone(), events_tx.clone()),
        SimCamera::new(world.clone(), events_tx.clone()),
        SimDetector::new(world.clone()),
        shared.clone(),
        map,
        Timing::fast(),
        Some(std::env::temp_dir()),
    );

    let handle = thread::spawn(move || orchestrator.run(&events_rx));

    // A recorded patrol path along the bottom of the room.
    let path: Vec<WorldPosition> = (0..20)
        .map(|i| WorldPosition::new(f64::from(i) * 0.3, 0.0, 0.0))
        .collect();

    events_tx.send(PortEvent::StartSession {
        config: SessionConfig {
            stops: 3,
            rotations_per_stop: 8,
            detection_mode: DetectionMode::Split,
            target_class: 56,
        },
        path_id: "sim_path".into(),
        path,
    })?;

    // Wait for the session to finish.
    let deadline = Instant::now() + Duration::from_secs(60);
    let record = loop {
        if let Some(record) = shared.last_record() {
            break record;
        }
        if Instant::now() > deadline {
            shared.request_shutdown();
            let _ = handle.join();
            bail!("simulated session did not finish in time");
        }
        thread::sleep(Duration::from_millis(50));
    };

    shared.request_shutdown();
    handle.join().expect("orchestrator thread panicked");

    println!(
        "session {} took {} photos over {} stops",
        record.session_id,
        record.photos_taken.len(),
        record.stops
    );
    match record.estimated_target {
        Some(estimate) => println!(
            "estimated target at ({:.2}, {:.2}), ground truth ({:.2}, {:.2})",
            estimate.x, estimate.y, target.0, target.1
        ),
        None => println!("no target estimate produced"),
    }

    Ok(())
}
