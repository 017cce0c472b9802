//! Credential identifier generation

use uuid::Uuid;

/// Source of credential identifiers (16 lowercase hex digits)
pub trait IdGenerator {
    fn next_id(&mut self) -> String;
}

/// Fresh random identifiers backed by UUIDv4
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&mut self) -> String {
        let bits = Uuid::new_v4().as_u128();
        // Either half alone carries fixed version/variant bits
        format!("{:016x}", (bits >> 64) as u64 ^ bits as u64)
    }
}

/// Deterministic identifiers `<prefix>000000000001`, `<prefix>000000000002`, ...
#[derive(Debug, Clone)]
pub struct SequenceIds {
    prefix: String,
    next: u64,
}

impl SequenceIds {
    /// Only the hex digits of `prefix` are kept, lowercased, then truncated or
    /// zero-padded to four so every id stays 16 lowercase hex digits.
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix
                .chars()
                .filter(char::is_ascii_hexdigit)
                .map(|c| c.to_ascii_lowercase())
                .take(4)
                .collect(),
            next: 1,
        }
    }
}

impl IdGenerator for SequenceIds {
    fn next_id(&mut self) -> String {
        let id = format!("{:0<4}{:012x}", self.prefix, self.next);
        self.next += 1;
        id
    }
}
