//! Main watch mode.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use monowatch::auction::{AuctionHouse, AuctionTrigger};
use monowatch::machine::{DecisionEngine, FacadeTurn, StateRegistry, StepOutcome, TurnDriver};
use monowatch::scan::DynamicAddresses;
use monowatch::worker::StopSignal;
use monowatch::{
    AttachedProcess, Error, EventPipeline, GameFacade, GameLayout, MemoryGame, MessageTracker,
    ObserverRunner, PatternScanner, ProcessMemory, Reconciler, SnapshotStore, WatchConfig,
    load_config, load_layout,
};
use tracing::{debug, info, warn};

use crate::retry::attach_with_retry;

pub fn run(
    config_path: &Path,
    layout: Option<PathBuf>,
    pid: Option<u32>,
    drive: bool,
) -> Result<()> {
    let stop = Arc::new(StopSignal::new());
    let stop_ctrlc = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal, stopping...");
        stop_ctrlc.stop();
    })?;

    let mut config = match load_config(config_path) {
        Ok(config) => {
            info!("Loaded config from {}", config_path.display());
            config
        }
        Err(e) if e.is_not_found() => {
            warn!("{} not found, using defaults", config_path.display());
            WatchConfig::default()
        }
        Err(e) => return Err(e).context(format!("loading {}", config_path.display())),
    };
    if let Some(layout) = layout {
        config.layout = layout;
    }
    if pid.is_some() {
        config.pid = pid;
    }
    config.drive_turns |= drive;
    config.validate().context("invalid config")?;
    let Some(pid) = config.pid else {
        bail!("no process id: pass --pid or set `pid` in {}", config_path.display());
    };

    let layout = load_layout(&config.layout)
        .with_context(|| format!("loading layout {}", config.layout.display()))?;
    info!(
        "Layout: {} players, {} message patterns",
        layout.players.len(),
        layout.messages.patterns.len()
    );

    while !stop.is_stopped() {
        let Some(process) = attach_with_retry(pid, &layout, &stop)? else {
            break;
        };
        watch_session(process, &layout, &config, &stop)?;
        if !stop.is_stopped() {
            info!("Process detached, waiting for it to come back...");
        }
    }

    info!("Stopped");
    Ok(())
}

/// Run the scanner and the observer against one attachment until the
/// process goes away or shutdown is requested.
fn watch_session(
    process: AttachedProcess,
    layout: &GameLayout,
    config: &WatchConfig,
    stop: &StopSignal,
) -> Result<()> {
    let pid = process.pid();
    let memory: Arc<dyn ProcessMemory> = Arc::new(process);
    let game: Arc<dyn GameFacade> = Arc::new(MemoryGame::new(Arc::clone(&memory), layout)?);

    let store = SnapshotStore::new(&config.snapshot_path, &config.history_dir);
    let reconciler = Reconciler::new(Arc::clone(&game))
        .with_store(store)
        .with_capacity(config.event_capacity)
        .with_ignored_prompts(config.ignored_prompts.clone())
        .shared();
    let pipeline = EventPipeline::new(Arc::clone(&game), reconciler);

    let tracker = Arc::new(MessageTracker::new());
    let scanner = Arc::new(PatternScanner::new(
        Arc::clone(&memory),
        Arc::new(DynamicAddresses::new()),
    ));
    for registration in layout
        .messages
        .registrations(layout.byte_order, &tracker.callback())?
    {
        scanner.register(registration);
    }
    scanner.set_cycle_hook(pipeline.scan_hook(Arc::clone(&tracker)));
    scanner.start_cycle(config.scan_interval()?)?;

    let provider = config.decision_provider()?;
    let trigger = AuctionTrigger::new(
        Arc::clone(&game),
        AuctionHouse::new(config.auction_rules()),
        Arc::clone(&provider),
    );
    let mut driver = if config.drive_turns {
        let turn = Arc::new(FacadeTurn::new(
            Arc::clone(&game),
            AuctionHouse::new(config.auction_rules()),
            Arc::clone(&provider),
        ));
        let engine = DecisionEngine::new(Arc::new(StateRegistry::standard()?));
        Some(TurnDriver::new(engine, FacadeTurn::contexts(&turn)?))
    } else {
        None
    };

    let mut observer = ObserverRunner::start(
        Arc::clone(&game),
        config.cadence()?,
        trigger.observe_into(pipeline.observation_sink()),
    )?;
    info!(
        "Watching pid {}{}",
        pid,
        if driver.is_some() { ", driving turns" } else { "" }
    );

    let interval = config.message_interval()?;
    while !stop.sleep(interval) {
        // The auction record is always mapped; failing to read it means the
        // emulator is gone.
        match memory.read_u32(layout.auction_base) {
            Err(Error::MemoryUnavailable(e)) => {
                debug!("Liveness check failed: {}", e);
                break;
            }
            Err(e) => debug!("Liveness check: {}", e),
            Ok(_) => {}
        }

        match trigger.run_pending() {
            Ok(Some(outcome)) => debug!("Auction outcome: {:?}", outcome),
            Ok(None) => {}
            Err(e) if e.is_transient() => debug!("Auction deferred: {}", e),
            Err(e) => warn!("Auction failed: {}", e),
        }

        if let Some(driver) = driver.as_mut() {
            match driver.tick() {
                Ok(Some(StepOutcome::Finished(state))) => info!("Turn finished in {}", state),
                Ok(_) => {}
                Err(e) if e.is_transient() => debug!("Turn deferred: {}", e),
                Err(e) => return Err(e).context("driving turn"),
            }
        }

        let visible = tracker.visible();
        if !visible.is_empty() {
            debug!(
                "{} prompts on screen, {} players tracked",
                visible.len(),
                observer.roster().len()
            );
        }
    }

    scanner.stop_cycle();
    observer.stop();
    Ok(())
}
