//! Caller identity.

use serde::{Deserialize, Serialize};

/// The authenticated user on whose behalf an operation runs.
///
/// Recorded as `created_by`, `added_by` or `executed_by` on the rows an
/// operation writes. Authentication itself happens outside this crate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
}

impl Actor {
    pub fn new(user_id: i64) -> Self {
        Self { user_id }
    }

    /// User ids are positive surrogate keys; anything else is an anonymous caller.
    pub fn is_authenticated(&self) -> bool {
        self.user_id > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticated() {
        assert!(Actor::new(1).is_authenticated());
        assert!(!Actor::new(0).is_authenticated());
        assert!(!Actor::new(-3).is_authenticated());
    }
}
