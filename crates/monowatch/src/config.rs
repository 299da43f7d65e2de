//! Watcher settings, read from a TOML file.
//!
//! Every key is optional; missing keys take the defaults below.
//!
//! ```toml
//! pid = 4242
//! layout = "layout.json"
//! scan_interval = 2.0
//!
//! [auction]
//! reserve = 150
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auction::AuctionRules;
use crate::decide::{DecisionProvider, HeuristicProvider};
use crate::error::{Error, Result};
use crate::memory::layout::timing;
use crate::observe::ObserverCadence;
use crate::reconcile::{DEFAULT_EVENT_CAPACITY, default_ignored_prompts};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Emulator process to attach to
    pub pid: Option<u32>,
    pub layout: PathBuf,
    /// Seconds between message scan cycles
    pub scan_interval: f64,
    pub player_interval: f64,
    pub auction_interval: f64,
    pub message_interval: f64,
    pub snapshot_path: PathBuf,
    pub history_dir: PathBuf,
    pub event_capacity: usize,
    pub auction: AuctionSection,
    pub ignored_prompts: Vec<String>,
    /// Remote decision service; the local heuristic is used when unset
    pub decision_endpoint: Option<String>,
    pub decision_timeout: f64,
    /// Play every seat's turn with the decision engine
    pub drive_turns: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuctionSection {
    pub reserve: u32,
    pub round_cap: u32,
    pub min_raise: u32,
}

impl Default for AuctionSection {
    fn default() -> Self {
        let rules = AuctionRules::default();
        Self {
            reserve: rules.reserve,
            round_cap: rules.round_cap,
            min_raise: rules.min_raise,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            pid: None,
            layout: PathBuf::from("layout.json"),
            scan_interval: timing::SCAN_INTERVAL.as_secs_f64(),
            player_interval: timing::PLAYER_POLL_INTERVAL.as_secs_f64(),
            auction_interval: timing::AUCTION_POLL_INTERVAL.as_secs_f64(),
            message_interval: timing::MESSAGE_POLL_INTERVAL.as_secs_f64(),
            snapshot_path: PathBuf::from("context/game_context.json"),
            history_dir: PathBuf::from("context/history"),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            auction: AuctionSection::default(),
            ignored_prompts: default_ignored_prompts(),
            decision_endpoint: None,
            decision_timeout: 10.0,
            drive_turns: false,
        }
    }
}

fn seconds(name: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or_else(|| Error::config(format!("{} must be a positive number of seconds, got {}", name, value)))
}

impl WatchConfig {
    pub fn builder() -> WatchConfigBuilder {
        WatchConfigBuilder::default()
    }

    /// Reject intervals and limits the workers cannot run with
    pub fn validate(&self) -> Result<()> {
        self.scan_interval()?;
        self.cadence()?;
        self.message_interval()?;
        seconds("decision_timeout", self.decision_timeout)?;
        if self.event_capacity == 0 {
            return Err(Error::config("event_capacity must be at least 1"));
        }
        self.auction_rules().validate()
    }

    pub fn scan_interval(&self) -> Result<Duration> {
        seconds("scan_interval", self.scan_interval)
    }

    pub fn message_interval(&self) -> Result<Duration> {
        seconds("message_interval", self.message_interval)
    }

    pub fn decision_timeout(&self) -> Result<Duration> {
        seconds("decision_timeout", self.decision_timeout)
    }

    pub fn cadence(&self) -> Result<ObserverCadence> {
        Ok(ObserverCadence {
            players: seconds("player_interval", self.player_interval)?,
            auction: seconds("auction_interval", self.auction_interval)?,
        })
    }

    /// The remote provider when an endpoint is configured and the `api`
    /// feature is enabled, otherwise the local heuristic
    pub fn decision_provider(&self) -> Result<Arc<dyn DecisionProvider>> {
        let heuristic = HeuristicProvider {
            reserve: self.auction.reserve,
            ..HeuristicProvider::default()
        };
        match &self.decision_endpoint {
            #[cfg(feature = "api")]
            Some(endpoint) => Ok(Arc::new(crate::decide::HttpProvider::new(
                endpoint.clone(),
                self.decision_timeout()?,
            ))),
            #[cfg(not(feature = "api"))]
            Some(endpoint) => {
                tracing::warn!(
                    "decision endpoint {} ignored: built without the api feature",
                    endpoint
                );
                Ok(Arc::new(heuristic))
            }
            None => Ok(Arc::new(heuristic)),
        }
    }

    pub fn auction_rules(&self) -> AuctionRules {
        AuctionRules {
            reserve: self.auction.reserve,
            min_raise: self.auction.min_raise,
            round_cap: self.auction.round_cap,
        }
    }
}

/// Builder for [`WatchConfig`]
#[derive(Debug, Clone, Default)]
pub struct WatchConfigBuilder {
    pid: Option<u32>,
    layout: Option<PathBuf>,
    snapshot_path: Option<PathBuf>,
    history_dir: Option<PathBuf>,
    event_capacity: Option<usize>,
    auction: Option<AuctionSection>,
    ignored_prompts: Option<Vec<String>>,
    decision_endpoint: Option<String>,
    drive_turns: Option<bool>,
}

impl WatchConfigBuilder {
    pub fn pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    pub fn layout<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.layout = Some(path.into());
        self
    }

    /// Canonical snapshot file and its history directory
    pub fn context_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        let dir = dir.as_ref();
        self.snapshot_path = Some(dir.join("game_context.json"));
        self.history_dir = Some(dir.join("history"));
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = Some(capacity);
        self
    }

    pub fn auction(mut self, auction: AuctionSection) -> Self {
        self.auction = Some(auction);
        self
    }

    pub fn ignored_prompts(mut self, prompts: Vec<String>) -> Self {
        self.ignored_prompts = Some(prompts);
        self
    }

    pub fn decision_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.decision_endpoint = Some(endpoint.into());
        self
    }

    pub fn drive_turns(mut self, drive: bool) -> Self {
        self.drive_turns = Some(drive);
        self
    }

    pub fn build(self) -> WatchConfig {
        let default = WatchConfig::default();
        WatchConfig {
            pid: self.pid.or(default.pid),
            layout: self.layout.unwrap_or(default.layout),
            snapshot_path: self.snapshot_path.unwrap_or(default.snapshot_path),
            history_dir: self.history_dir.unwrap_or(default.history_dir),
            event_capacity: self.event_capacity.unwrap_or(default.event_capacity),
            auction: self.auction.unwrap_or(default.auction),
            ignored_prompts: self.ignored_prompts.unwrap_or(default.ignored_prompts),
            decision_endpoint: self.decision_endpoint.or(default.decision_endpoint),
            drive_turns: self.drive_turns.unwrap_or(default.drive_turns),
            ..default
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<WatchConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let config: WatchConfig = toml::from_str(&content)?;
    config.validate()?;
    debug!("Loaded config from {:?}", path);
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &WatchConfig) -> Result<()> {
    let content = toml::to_string_pretty(config).map_err(|e| Error::config(e.to_string()))?;
    fs::write(path, content)?;
    Ok(())
}
