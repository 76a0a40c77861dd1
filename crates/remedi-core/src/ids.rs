//! Correlation keys: job ids for translation, job tokens for processors.

use std::sync::atomic::{AtomicU64, Ordering};

/// Hex width of every generated job token.
pub const JOB_TOKEN_WIDTH: usize = 32;

/// Separator between a job group and a chunk-local suffix in a token
/// echoed by a processor (`<group>.<suffix>`).
pub const CHUNK_TOKEN_DELIMITER: char = '.';

/// Issues translation job ids: 1, 2, 3, … for the lifetime of the generator.
///
/// One generator is owned by each client and shared with whatever needs
/// to build translation requests. Safe under concurrent callers.
#[derive(Debug, Default)]
pub struct JobIdGenerator {
    last: AtomicU64,
}

impl JobIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume a sequence: the first id issued will be `last + 1`.
    pub fn starting_after(last: u64) -> Self {
        Self {
            last: AtomicU64::new(last),
        }
    }

    /// Next id, strictly greater than every id issued before it.
    ///
    /// Zero is never issued and no id is ever reissued. The counter is
    /// 64 bits wide; once `u64::MAX` has been issued the generator is
    /// exhausted and this returns `None`.
    pub fn next_id(&self) -> Option<u64> {
        self.last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_add(1))
            .ok()
            .map(|previous| previous + 1)
    }

    /// Most recently issued id, 0 if none.
    pub fn current(&self) -> u64 {
        self.last.load(Ordering::Acquire)
    }
}

/// Content-derived job token: the first 128 bits of the BLAKE3 hash of
/// `text`, as lowercase hex. Identical text always gives an identical token.
pub fn job_token(text: &str) -> String {
    let hash = blake3::hash(text.as_bytes());
    hex::encode(&hash.as_bytes()[..JOB_TOKEN_WIDTH / 2])
}

/// Strip a chunk-local suffix from a token echoed by a processor.
///
/// `"abc.2"` → `"abc"`; tokens without the delimiter are returned as-is.
pub fn token_group(token: &str) -> &str {
    token
        .split_once(CHUNK_TOKEN_DELIMITER)
        .map_or(token, |(group, _)| group)
}
