use crate::game::{AuctionRecord, Bid};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuctionEdge {
    Started(AuctionRecord),
    /// Any change of the bid triple, including resets to price 0
    Bid(Bid),
    /// Carries the last priced bid seen while active, if any
    Ended(Option<Bid>),
}

/// Edge detector over the game's auction record.
#[derive(Debug, Clone, Default)]
pub struct AuctionWatch {
    active: bool,
    triple: Option<Bid>,
    last_bid: Option<Bid>,
}

impl AuctionWatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Compare `record` with the previous poll.
    ///
    /// Bids naming a bidder index at or beyond `seats` are stale garbage from
    /// an earlier auction and are ignored.
    pub fn observe(&mut self, record: &AuctionRecord, seats: usize) -> Vec<AuctionEdge> {
        let mut edges = Vec::new();

        if record.active && !self.active {
            self.active = true;
            self.triple = None;
            self.last_bid = None;
            edges.push(AuctionEdge::Started(*record));
        } else if !record.active && self.active {
            self.active = false;
            edges.push(AuctionEdge::Ended(self.last_bid.take()));
            return edges;
        }

        if self.active {
            let bid = record.bid();
            if self.triple != Some(bid) {
                self.triple = Some(bid);
                if (bid.bidder as usize) < seats {
                    if bid.price > 0 {
                        self.last_bid = Some(bid);
                    }
                    edges.push(AuctionEdge::Bid(bid));
                }
            }
        }

        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(active: bool, bidder: u32, price: u32) -> AuctionRecord {
        AuctionRecord {
            active,
            current_bidder: bidder,
            current_price: price,
            next_price: price + 10,
        }
    }

    #[test]
    fn test_full_auction() {
        let mut watch = AuctionWatch::new();

        assert!(watch.observe(&record(false, 0, 0), 2).is_empty());

        // The opening triple is reported; the translator drops unpriced bids
        let edges = watch.observe(&record(true, 0, 0), 2);
        assert!(matches!(edges.as_slice(), [AuctionEdge::Started(_), AuctionEdge::Bid(b)] if b.price == 0));

        let edges = watch.observe(&record(true, 1, 40), 2);
        assert!(matches!(edges.as_slice(), [AuctionEdge::Bid(b)] if b.bidder == 1 && b.price == 40));

        // Unchanged triple
        assert!(watch.observe(&record(true, 1, 40), 2).is_empty());

        watch.observe(&record(true, 0, 55), 2);
        let edges = watch.observe(&record(false, 0, 55), 2);
        assert!(matches!(edges.as_slice(), [AuctionEdge::Ended(Some(b))] if b.price == 55 && b.bidder == 0));
        assert!(!watch.is_active());
    }

    #[test]
    fn test_stale_bidder_ignored() {
        let mut watch = AuctionWatch::new();
        let edges = watch.observe(&record(true, 7, 100), 2);
        assert_eq!(edges.len(), 1);
        let edges = watch.observe(&record(false, 7, 100), 2);
        assert_eq!(edges, vec![AuctionEdge::Ended(None)]);
    }

    #[test]
    fn test_start_with_bid_in_same_poll() {
        let mut watch = AuctionWatch::new();
        let edges = watch.observe(&record(true, 1, 10), 3);
        assert_eq!(edges.len(), 2);
        assert!(matches!(edges[1], AuctionEdge::Bid(_)));
    }

    #[test]
    fn test_any_triple_change_is_a_bid() {
        let mut watch = AuctionWatch::new();
        watch.observe(&record(true, 1, 40), 2);

        // Only the asking price moves
        let mut raised = record(true, 1, 40);
        raised.next_price = 60;
        let edges = watch.observe(&raised, 2);
        assert!(matches!(edges.as_slice(), [AuctionEdge::Bid(b)] if b.next_price == 60));

        // Reset to 0 is reported but does not replace the resolution
        let edges = watch.observe(&record(true, 0, 0), 2);
        assert!(matches!(edges.as_slice(), [AuctionEdge::Bid(b)] if b.price == 0));
        let edges = watch.observe(&record(false, 0, 0), 2);
        assert!(matches!(edges.as_slice(), [AuctionEdge::Ended(Some(b))] if b.price == 40 && b.bidder == 1));
    }
}
