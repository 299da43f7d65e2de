use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::dynamic::DynamicAddresses;
use super::pattern::Pattern;
use crate::error::{Error, Result};
use crate::memory::layout::scan::{DEFAULT_CHUNK_SIZE, DEFAULT_LOOKAHEAD_UNITS};
use crate::memory::{ProcessMemory, decode_wide};
use crate::worker::PeriodicWorker;

pub type ScanCallback = Arc<dyn Fn(&ScanHit) + Send + Sync>;
pub type CycleHook = Arc<dyn Fn(&ScanReport) + Send + Sync>;

/// Half-open address range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScanRange {
    #[serde(with = "crate::hex")]
    pub start: u64,
    #[serde(with = "crate::hex")]
    pub end: u64,
}

impl ScanRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One match delivered to a registration's callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanHit {
    pub id: String,
    pub address: u64,
    /// Text starting at the match, cut at the first terminator
    pub payload: String,
}

pub struct PatternRegistration {
    pub id: String,
    pub pattern: Pattern,
    pub range: ScanRange,
    pub chunk_size: usize,
    pub lookahead_units: usize,
    pub dynamic_key: Option<String>,
    callback: ScanCallback,
}

impl PatternRegistration {
    pub fn new(id: impl Into<String>, pattern: Pattern, range: ScanRange, callback: ScanCallback) -> Self {
        Self {
            id: id.into(),
            pattern,
            range,
            chunk_size: DEFAULT_CHUNK_SIZE,
            lookahead_units: DEFAULT_LOOKAHEAD_UNITS,
            dynamic_key: None,
            callback,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_lookahead(mut self, units: usize) -> Self {
        self.lookahead_units = units;
        self
    }

    pub fn with_dynamic_key(mut self, key: impl Into<String>) -> Self {
        self.dynamic_key = Some(key.into());
        self
    }

    pub fn is_binary(&self) -> bool {
        self.pattern.is_binary()
    }
}

impl fmt::Debug for PatternRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternRegistration")
            .field("id", &self.id)
            .field("pattern", &self.pattern.source())
            .field("range", &self.range)
            .field("chunk_size", &self.chunk_size)
            .field("dynamic_key", &self.dynamic_key)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub chunks: usize,
    pub bytes: usize,
    pub hits: usize,
    pub failed_chunks: usize,
    pub cancelled: bool,
}

/// Registry of patterns plus the scan cycle that serves them.
pub struct PatternScanner {
    memory: Arc<dyn ProcessMemory>,
    registrations: RwLock<Vec<Arc<PatternRegistration>>>,
    dynamic: Arc<DynamicAddresses>,
    cancel: AtomicBool,
    cycle_hook: RwLock<Option<CycleHook>>,
    worker: Mutex<Option<PeriodicWorker>>,
}

impl PatternScanner {
    pub fn new(memory: Arc<dyn ProcessMemory>, dynamic: Arc<DynamicAddresses>) -> Self {
        Self {
            memory,
            registrations: RwLock::new(Vec::new()),
            dynamic,
            cancel: AtomicBool::new(false),
            cycle_hook: RwLock::new(None),
            worker: Mutex::new(None),
        }
    }

    pub fn dynamic_addresses(&self) -> &Arc<DynamicAddresses> {
        &self.dynamic
    }

    /// Called after every completed background cycle.
    pub fn set_cycle_hook(&self, hook: CycleHook) {
        *self.cycle_hook.write().unwrap_or_else(|p| p.into_inner()) = Some(hook);
    }

    /// Add a registration, replacing any existing one with the same id.
    pub fn register(&self, registration: PatternRegistration) {
        let mut registrations = self.registrations.write().unwrap_or_else(|p| p.into_inner());
        if let Some(existing) = registrations.iter_mut().find(|r| r.id == registration.id) {
            debug!("Replacing pattern registration '{}'", registration.id);
            *existing = Arc::new(registration);
        } else {
            debug!("Registered pattern {:?}", registration);
            registrations.push(Arc::new(registration));
        }
    }

    pub fn unregister(&self, id: &str) -> bool {
        let mut registrations = self.registrations.write().unwrap_or_else(|p| p.into_inner());
        let before = registrations.len();
        registrations.retain(|r| r.id != id);
        registrations.len() != before
    }

    pub fn registration_ids(&self) -> Vec<String> {
        self.snapshot().iter().map(|r| r.id.clone()).collect()
    }

    fn snapshot(&self) -> Vec<Arc<PatternRegistration>> {
        self.registrations
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Run one full cycle over a snapshot of the registrations.
    ///
    /// Fails with [`Error::MemoryUnavailable`] if the process goes away; an
    /// unreadable chunk is only counted and skipped.
    pub fn run_once(&self) -> Result<ScanReport> {
        let registrations = self.snapshot();
        let mut report = ScanReport::default();

        let mut groups: BTreeMap<(ScanRange, usize), Vec<Arc<PatternRegistration>>> = BTreeMap::new();
        for registration in registrations {
            groups
                .entry((registration.range, registration.chunk_size))
                .or_default()
                .push(registration);
        }

        for ((range, chunk_size), group) in &groups {
            self.scan_range(*range, *chunk_size, group, &mut report)?;
            if report.cancelled {
                break;
            }
        }

        debug!(
            "Scan cycle: {} chunks, {} bytes, {} hits, {} failed",
            report.chunks, report.bytes, report.hits, report.failed_chunks
        );
        Ok(report)
    }

    fn scan_range(
        &self,
        range: ScanRange,
        chunk_size: usize,
        group: &[Arc<PatternRegistration>],
        report: &mut ScanReport,
    ) -> Result<()> {
        let keep = group
            .iter()
            .map(|r| r.pattern.len())
            .max()
            .unwrap_or(1)
            .saturating_sub(1);

        let mut tail: Vec<u8> = Vec::new();
        let mut address = range.start;

        while address < range.end {
            if self.cancel.load(Ordering::SeqCst) {
                report.cancelled = true;
                return Ok(());
            }

            let read_size = (range.end - address).min(chunk_size as u64) as usize;
            let chunk = match self.memory.read_bytes(address, read_size) {
                Ok(bytes) => bytes,
                Err(e @ Error::MemoryUnavailable(_)) => return Err(e),
                Err(e) => {
                    debug!("Chunk at 0x{:X} unreadable: {}", address, e);
                    report.failed_chunks += 1;
                    tail.clear();
                    address += read_size as u64;
                    continue;
                }
            };
            report.chunks += 1;
            report.bytes += chunk.len();

            let mut data = Vec::with_capacity(tail.len() + chunk.len());
            data.extend_from_slice(&tail);
            data.extend_from_slice(&chunk);
            let data_base = address - tail.len() as u64;

            for registration in group {
                for offset in registration.pattern.find_in(&data, data_base) {
                    // Entirely inside the carried tail: reported by the previous chunk
                    if offset + registration.pattern.len() <= tail.len() {
                        continue;
                    }
                    let hit_address = data_base + offset as u64;
                    let payload = self.capture_payload(registration, &data, offset, hit_address, range);
                    self.deliver(registration, hit_address, payload);
                    report.hits += 1;
                }
            }

            tail = if keep > 0 && data.len() >= keep {
                data[data.len() - keep..].to_vec()
            } else {
                Vec::new()
            };
            address += read_size as u64;
        }

        Ok(())
    }

    fn capture_payload(
        &self,
        registration: &PatternRegistration,
        data: &[u8],
        offset: usize,
        hit_address: u64,
        range: ScanRange,
    ) -> String {
        let window = registration.lookahead_units * 2;
        let available = range.end.saturating_sub(hit_address).min(window as u64) as usize;
        let in_buffer = &data[offset..data.len().min(offset + window)];

        let bytes = if in_buffer.len() >= available {
            in_buffer.to_vec()
        } else {
            // Window runs past this chunk
            self.memory
                .read_bytes(hit_address, available)
                .unwrap_or_else(|_| in_buffer.to_vec())
        };

        let decoded = decode_wide(&bytes, self.memory.byte_order());
        if decoded.degraded {
            warn!("Discarding degraded payload at 0x{:X}", hit_address);
            return String::new();
        }
        decoded.text
    }

    fn deliver(&self, registration: &PatternRegistration, address: u64, payload: String) {
        if let Some(key) = &registration.dynamic_key {
            self.dynamic.set(key, address);
        }
        let hit = ScanHit {
            id: registration.id.clone(),
            address,
            payload,
        };
        (registration.callback)(&hit);
    }

    /// Start scanning every `interval` on a background thread.
    pub fn start_cycle(self: &Arc<Self>, interval: Duration) -> Result<()> {
        self.stop_cycle();

        let scanner = Arc::downgrade(self);
        let worker = PeriodicWorker::spawn("pattern-scan", interval, move || {
            let Some(scanner) = scanner.upgrade() else {
                return;
            };
            match scanner.run_once() {
                Ok(report) if !report.cancelled => {
                    let hook = scanner.cycle_hook.read().unwrap_or_else(|p| p.into_inner()).clone();
                    if let Some(hook) = hook {
                        hook(&report);
                    }
                }
                Ok(_) => {}
                Err(e) if e.is_transient() => debug!("Scan cycle skipped: {}", e),
                Err(e) => warn!("Scan cycle failed: {}", e),
            }
        })?;

        info!("Pattern scan cycle started (every {:?})", interval);
        *self.worker.lock().unwrap_or_else(|p| p.into_inner()) = Some(worker);
        Ok(())
    }

    /// Stop the cycle; an in-flight cycle ends at the next chunk boundary.
    pub fn stop_cycle(&self) {
        let worker = self.worker.lock().unwrap_or_else(|p| p.into_inner()).take();
        if let Some(mut worker) = worker {
            self.cancel.store(true, Ordering::SeqCst);
            worker.stop();
            self.cancel.store(false, Ordering::SeqCst);
            info!("Pattern scan cycle stopped");
        }
    }

    pub fn is_cycling(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .as_ref()
            .is_some_and(PeriodicWorker::is_running)
    }
}
