//! Tombstone state shared by soft-deletable records.
//!
//! Deletion is a typed variant rather than a loose boolean so every query
//! site has to say which set it means (`include_deleted` parameters on the
//! repository APIs) instead of remembering an `is_deleted = 0` filter by
//! convention.

use serde::{Deserialize, Serialize};

/// Visibility state of a soft-deletable record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Lifecycle {
    /// Visible; participates in position accounting.
    Active,
    /// Tombstoned at epoch-millisecond `at`; excluded from active sets.
    Deleted { at: i64 },
}

impl Lifecycle {
    /// Returns whether the record participates in active sets.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Epoch-millisecond deletion time, when tombstoned.
    pub fn deleted_at(&self) -> Option<i64> {
        match self {
            Self::Active => None,
            Self::Deleted { at } => Some(*at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Lifecycle;

    #[test]
    fn active_state_has_no_deletion_time() {
        assert!(Lifecycle::Active.is_active());
        assert_eq!(Lifecycle::Active.deleted_at(), None);
    }

    #[test]
    fn deleted_state_carries_deletion_time() {
        let state = Lifecycle::Deleted { at: 1700000000000 };
        assert!(!state.is_active());
        assert_eq!(state.deleted_at(), Some(1700000000000));
    }
}
