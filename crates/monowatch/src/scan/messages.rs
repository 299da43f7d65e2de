use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use super::scanner::{ScanCallback, ScanHit};

/// Rough intent of an on-screen prompt, from keywords.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MessageCategory {
    PropertyOffer,
    JailOptions,
    AuctionNotification,
    RentNotification,
    TaxNotification,
    ChanceCard,
    CommunityChest,
    Other,
}

pub fn classify(text: &str) -> MessageCategory {
    let lower = text.to_lowercase();
    let has = |word: &str| lower.contains(word);

    if (has("buy") || has("purchase")) && has("for") {
        MessageCategory::PropertyOffer
    } else if (has("pay") && has("bail")) || (has("roll") && has("doubles")) {
        MessageCategory::JailOptions
    } else if has("auction") {
        MessageCategory::AuctionNotification
    } else if has("rent") {
        MessageCategory::RentNotification
    } else if has("tax") {
        MessageCategory::TaxNotification
    } else if has("chance") {
        MessageCategory::ChanceCard
    } else if has("community") {
        MessageCategory::CommunityChest
    } else {
        MessageCategory::Other
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedMessage {
    pub id: String,
    pub address: u64,
    pub text: String,
    pub category: MessageCategory,
}

impl TrackedMessage {
    fn same_as(&self, other: &TrackedMessage) -> bool {
        self.id == other.id && self.address == other.address && self.text == other.text
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageChange {
    Added(TrackedMessage),
    Removed(TrackedMessage),
}

#[derive(Default)]
struct TrackerState {
    current: Vec<TrackedMessage>,
    previous: Vec<TrackedMessage>,
}

/// Turns per-cycle scan hits into appeared/disappeared messages.
///
/// Hits are collected through [`MessageTracker::callback`] while a cycle runs;
/// [`MessageTracker::finish_cycle`] then diffs them against the last cycle.
#[derive(Default)]
pub struct MessageTracker {
    state: Mutex<TrackerState>,
}

impl MessageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, hit: &ScanHit) {
        if hit.payload.trim().is_empty() {
            return;
        }
        let message = TrackedMessage {
            id: hit.id.clone(),
            address: hit.address,
            text: hit.payload.trim().to_string(),
            category: classify(&hit.payload),
        };
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if !state.current.iter().any(|m| m.same_as(&message)) {
            state.current.push(message);
        }
    }

    pub fn callback(self: &Arc<Self>) -> ScanCallback {
        let tracker = Arc::clone(self);
        Arc::new(move |hit: &ScanHit| tracker.observe(hit))
    }

    pub fn finish_cycle(&self) -> Vec<MessageChange> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        let current = std::mem::take(&mut state.current);

        let mut changes: Vec<MessageChange> = state
            .previous
            .iter()
            .filter(|old| !current.iter().any(|m| m.same_as(old)))
            .cloned()
            .map(MessageChange::Removed)
            .collect();
        changes.extend(
            current
                .iter()
                .filter(|new| !state.previous.iter().any(|m| m.same_as(new)))
                .cloned()
                .map(MessageChange::Added),
        );

        state.previous = current;
        changes
    }

    /// Messages visible as of the last finished cycle
    pub fn visible(&self) -> Vec<TrackedMessage> {
        self.state
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .previous
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, address: u64, payload: &str) -> ScanHit {
        ScanHit {
            id: id.to_string(),
            address,
            payload: payload.to_string(),
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("Do you want to buy Baltic Avenue for $60?"), MessageCategory::PropertyOffer);
        assert_eq!(classify("Pay the $50 bail?"), MessageCategory::JailOptions);
        assert_eq!(classify("Try to roll doubles"), MessageCategory::JailOptions);
        assert_eq!(classify("The auction has begun"), MessageCategory::AuctionNotification);
        assert_eq!(classify("You paid $22 rent"), MessageCategory::RentNotification);
        assert_eq!(classify("Luxury Tax"), MessageCategory::TaxNotification);
        assert_eq!(classify("Chance"), MessageCategory::ChanceCard);
        assert_eq!(classify("Community Chest"), MessageCategory::CommunityChest);
        assert_eq!(classify("Next Turn"), MessageCategory::Other);
        assert_eq!(MessageCategory::PropertyOffer.to_string(), "property_offer");
    }

    #[test]
    fn test_added_then_removed() {
        let tracker = MessageTracker::new();

        tracker.observe(&hit("buy", 0x10, "Do you want to buy Park Place for $350?"));
        let changes = tracker.finish_cycle();
        assert_eq!(changes.len(), 1);
        assert!(matches!(&changes[0], MessageChange::Added(m) if m.category == MessageCategory::PropertyOffer));

        // Still on screen: nothing new
        tracker.observe(&hit("buy", 0x10, "Do you want to buy Park Place for $350?"));
        assert!(tracker.finish_cycle().is_empty());
        assert_eq!(tracker.visible().len(), 1);

        // Gone
        let changes = tracker.finish_cycle();
        assert!(matches!(&changes[0], MessageChange::Removed(m) if m.address == 0x10));
        assert!(tracker.visible().is_empty());
    }

    #[test]
    fn test_empty_payload_ignored() {
        let tracker = MessageTracker::new();
        tracker.observe(&hit("buy", 0x10, "  "));
        assert!(tracker.finish_cycle().is_empty());
    }

    #[test]
    fn test_changed_text_at_same_address() {
        let tracker = MessageTracker::new();
        tracker.observe(&hit("for", 0x20, "for $60"));
        tracker.finish_cycle();

        tracker.observe(&hit("for", 0x20, "for $100"));
        let changes = tracker.finish_cycle();
        assert_eq!(changes.len(), 2);
        assert!(matches!(&changes[0], MessageChange::Removed(m) if m.text == "for $60"));
        assert!(matches!(&changes[1], MessageChange::Added(m) if m.text == "for $100"));
    }
}
