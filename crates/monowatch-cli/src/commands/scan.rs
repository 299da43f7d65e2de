//! One-shot pattern scan.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use monowatch::load_layout;
use monowatch::scan::{
    DynamicAddresses, Pattern, PatternKind, PatternRegistration, PatternScanner, ScanHit, ScanRange,
};
use monowatch::{AttachedProcess, ProcessMemory};

pub fn run(pid: u32, layout: &Path, pattern: &str, text: bool, start: u64, end: u64) -> Result<()> {
    if end <= start {
        bail!("scan range is empty: 0x{:X}..0x{:X}", start, end);
    }
    let layout = load_layout(layout)?;
    let process = AttachedProcess::attach(pid, layout.regions.clone(), layout.byte_order)?;
    let byte_order = process.byte_order();

    let kind = if text { PatternKind::Text } else { PatternKind::Binary };
    let pattern = Pattern::parse(pattern, kind, byte_order)?;
    println!(
        "Scanning 0x{:X}..0x{:X} for {} ({} bytes)",
        start,
        end,
        pattern.source(),
        pattern.len()
    );

    let hits: Arc<Mutex<Vec<ScanHit>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&hits);
    let scanner = PatternScanner::new(Arc::new(process), Arc::new(DynamicAddresses::new()));
    scanner.register(PatternRegistration::new(
        "cli",
        pattern,
        ScanRange::new(start, end),
        Arc::new(move |hit: &ScanHit| {
            if let Ok(mut hits) = sink.lock() {
                hits.push(hit.clone());
            }
        }),
    ));

    let report = scanner.run_once()?;
    let hits = hits.lock().map(|h| h.clone()).unwrap_or_default();
    for hit in &hits {
        if hit.payload.is_empty() {
            println!("0x{:08X}", hit.address);
        } else {
            println!("0x{:08X}  {}", hit.address, hit.payload);
        }
    }
    println!(
        "{} matches in {} chunks ({} unreadable)",
        hits.len(),
        report.chunks,
        report.failed_chunks
    );
    Ok(())
}
