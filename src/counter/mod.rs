pub mod memory;
pub mod redis;
pub mod trait_def;

pub use self::memory::MemoryCounterStore;
pub use self::redis::RedisCounterStore;
pub use trait_def::{CounterError, CounterResult, CounterStore, VisitCount};

use std::time::Duration;

/// Prefix of every visit counter key.
pub const VISIT_KEY_PREFIX: &str = "ip-visit-counter-";

/// Expiry applied to a counter after each successful increment.
pub const VISIT_TTL: Duration = Duration::from_secs(120);

/// Counter key for a client identity. Case-sensitive, no normalization.
pub fn visit_key(client: &str) -> String {
    format!("{VISIT_KEY_PREFIX}{client}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visit_key_is_prefix_plus_identity() {
        assert_eq!(visit_key("9.9.9.9"), "ip-visit-counter-9.9.9.9");
        assert_eq!(visit_key("2001:DB8::1"), "ip-visit-counter-2001:DB8::1");
    }
}
