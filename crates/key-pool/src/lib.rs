//! Rotating API-key pool with rate-limit failover
//!
//! Holds a fixed set of API keys parsed from one comma-delimited setting and
//! tracks per-key availability. When upstream rate-limits a key, the key is
//! parked until its retry-after window elapses and the pool rotates to the
//! least-recently-used key that is still available.
//!
//! Key lifecycle:
//! 1. Pool built from `"keyA, keyB, keyC"` → every key `available`, never used
//! 2. `acquire` hands out the current key and stamps `last_used_at`
//! 3. Upstream answers 429 → key parked until `now + retry-after` (a day for
//!    daily-quota exhaustion), pool rotates to the LRU available key
//! 4. No key left → `Rotation::Exhausted`, caller degrades to an empty result
//! 5. Window elapsed → key flips back to available the next time rotation runs
//!    (no background timers)

pub mod clock;
pub mod error;
pub mod pool;
pub mod quota;
pub mod retry_after;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use pool::{CredentialPool, CredentialState, Lease, Rotation};
pub use quota::{QUOTA_WINDOW, RateLimitBody, classify_rate_limit_body};
pub use retry_after::{DEFAULT_RETRY_AFTER, parse_retry_after};
