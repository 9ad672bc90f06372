// src/config/consts.rs

// Local state
pub const STORE_DIR: &str = ".store";
pub const CACHE_FILE: &str = "location_cache.csv";
pub const LOG_FILE: &str = "debug.log";
pub const CONFIG_FILE: &str = "shift_scrape.json";

// Export
pub const DEFAULT_OUT_DIR: &str = "out";

// Bridge
pub const BRIDGE_PATH: &str = "/bridge";
pub const BRIDGE_TIMEOUT_MS: u64 = 5_000;

// Interaction timing
pub const CLOSE_POLL_MS: u64 = 100;
pub const CLOSE_WAIT_MS: u64 = 2_000;
pub const OPEN_POLL_MS: u64 = 200;
pub const DAY_OPEN_MS: u64 = 6_000;
pub const CREW_OPEN_MS: u64 = 8_000;
pub const SETTLE_MS: u64 = 150; // let the app finish its own transition
pub const NAV_POLL_MS: u64 = 200;
pub const NAV_CONFIRM_MS: u64 = 4_000;

// Day window
pub const DEFAULT_WINDOW: usize = 3;
pub const SWEEP_BACK: u32 = 2;
pub const SWEEP_FORWARD: u32 = 2;

// Shift time sentinel
pub const UNKNOWN_TIME: &str = "unknown";
