//! Memory layout constants for the board game's data structures
//!
//! Absolute addresses are configuration (see [`crate::game::GameLayout`]);
//! only structure-relative offsets and limits live here.

/// Auction record, relative to the configured auction base address
pub mod auction {
    pub const CURRENT_PRICE: u64 = 0x4;
    pub const NEXT_PRICE: u64 = 0x8;
    pub const CURRENT_BIDDER: u64 = 0xC;
    pub const STATUS: u64 = 0x14;

    /// `STATUS` value while bidding is open
    pub const STATUS_ACTIVE: u32 = 1;
}

/// Wide string limits
pub mod strings {
    /// Player names are short; anything longer is garbage
    pub const NAME_MAX_UNITS: usize = 32;
    pub const SQUARE_NAME_MAX_UNITS: usize = 64;
}

/// Pattern scan defaults
pub mod scan {
    pub const DEFAULT_CHUNK_SIZE: usize = 0x10000;
    /// Payload lookahead in UTF-16 code units
    pub const DEFAULT_LOOKAHEAD_UNITS: usize = 200;
    pub const MESSAGE_RANGE_START: u64 = 0x9000_0000;
    pub const MESSAGE_RANGE_END: u64 = 0x9010_0000;
}

/// Polling and scanning cadence
pub mod timing {
    use std::time::Duration;

    pub const SCAN_INTERVAL: Duration = Duration::from_millis(2000);
    pub const PLAYER_POLL_INTERVAL: Duration = Duration::from_millis(1000);
    pub const AUCTION_POLL_INTERVAL: Duration = Duration::from_millis(100);
    pub const MESSAGE_POLL_INTERVAL: Duration = Duration::from_millis(1000);
    /// Delay between attach attempts while the emulator is not running
    pub const ATTACH_RETRY_DELAY: Duration = Duration::from_secs(5);
}
