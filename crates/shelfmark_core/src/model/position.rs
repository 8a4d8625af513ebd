//! Dense position reindexing for ordered item scopes.
//!
//! # Responsibility
//! - Compute minimal position rewrites for a single in-scope move.
//! - Compute compaction rewrites after a removal from a scope.
//!
//! # Invariants
//! - Active positions in one scope form exactly `{0, .., N-1}`.
//! - Both entry points are pure; persistence stays in the repository layer.
//! - Out-of-range indices fail loudly and are never clamped.

use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// One `{id, position}` pair as currently persisted, in canonical scope order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionedRef {
    pub uuid: Uuid,
    pub position: i64,
}

/// One position rewrite the storage layer must apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionChange {
    pub uuid: Uuid,
    pub position: i64,
}

/// Which end of a move instruction an index belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveEnd {
    Source,
    Destination,
}

impl Display for MoveEnd {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Destination => write!(f, "destination"),
        }
    }
}

/// A move index fell outside `[0, len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfRange {
    pub end: MoveEnd,
    pub index: usize,
    pub len: usize,
}

impl Display for OutOfRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} index {} out of range for scope of {} items",
            self.end, self.index, self.len
        )
    }
}

impl Error for OutOfRange {}

/// Moves the element at `source_index` so it ends up at `destination_index`,
/// then renumbers the scope densely from zero.
///
/// `destination_index` is interpreted against the sequence after removal, the
/// usual splice-out/splice-in list-move reading: moving index 0 to index 2 in
/// `[a, b, c, d]` yields `[b, c, a, d]`.
///
/// Returns only the pairs whose position actually changed, so the storage
/// layer writes the minimum number of rows. `source_index ==
/// destination_index` returns an empty set.
///
/// # Errors
/// Fails with [`OutOfRange`] when either index is outside `[0, len)`.
pub fn reassign_positions(
    items: &[PositionedRef],
    source_index: usize,
    destination_index: usize,
) -> Result<Vec<PositionChange>, OutOfRange> {
    check_bounds(MoveEnd::Source, source_index, items.len())?;
    check_bounds(MoveEnd::Destination, destination_index, items.len())?;

    let mut order: Vec<PositionedRef> = items.to_vec();
    let moved = order.remove(source_index);
    order.insert(destination_index, moved);
    Ok(diff_positions(&order))
}

/// Renumbers an already-ordered active scope to `{0, .., N-1}`.
///
/// Used after a removal (soft delete, move to another scope) so survivors
/// stay dense. Emits only the pairs whose position changed; a scope that is
/// already dense yields an empty set.
pub fn compact_positions(items: &[PositionedRef]) -> Vec<PositionChange> {
    diff_positions(items)
}

fn check_bounds(end: MoveEnd, index: usize, len: usize) -> Result<(), OutOfRange> {
    if index >= len {
        return Err(OutOfRange { end, index, len });
    }
    Ok(())
}

fn diff_positions(order: &[PositionedRef]) -> Vec<PositionChange> {
    order
        .iter()
        .enumerate()
        .filter(|(index, item)| item.position != *index as i64)
        .map(|(index, item)| PositionChange {
            uuid: item.uuid,
            position: index as i64,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{compact_positions, reassign_positions, MoveEnd, PositionedRef};
    use uuid::Uuid;

    fn scope(len: usize) -> Vec<PositionedRef> {
        (0..len)
            .map(|index| PositionedRef {
                uuid: Uuid::new_v4(),
                position: index as i64,
            })
            .collect()
    }

    #[test]
    fn forward_move_shifts_intermediates_back() {
        let items = scope(4);
        let changes = reassign_positions(&items, 0, 2).unwrap();

        // [A,B,C,D] with A moved to index 2 -> [B,C,A,D]; D keeps position 3.
        assert_eq!(changes.len(), 3);
        let position_of = |uuid| changes.iter().find(|c| c.uuid == uuid).unwrap().position;
        assert_eq!(position_of(items[0].uuid), 2);
        assert_eq!(position_of(items[1].uuid), 0);
        assert_eq!(position_of(items[2].uuid), 1);
        assert!(changes.iter().all(|c| c.uuid != items[3].uuid));
    }

    #[test]
    fn backward_move_from_last_to_first_changes_every_row() {
        let items = scope(4);
        let changes = reassign_positions(&items, 3, 0).unwrap();

        assert_eq!(changes.len(), 4);
        let position_of = |uuid| changes.iter().find(|c| c.uuid == uuid).unwrap().position;
        assert_eq!(position_of(items[3].uuid), 0);
        assert_eq!(position_of(items[0].uuid), 1);
        assert_eq!(position_of(items[1].uuid), 2);
        assert_eq!(position_of(items[2].uuid), 3);
    }

    #[test]
    fn same_index_move_is_a_no_op() {
        let items = scope(5);
        assert!(reassign_positions(&items, 2, 2).unwrap().is_empty());
    }

    #[test]
    fn single_element_scope_move_is_a_no_op() {
        let items = scope(1);
        assert!(reassign_positions(&items, 0, 0).unwrap().is_empty());
    }

    #[test]
    fn result_positions_stay_dense_for_every_valid_move() {
        let items = scope(6);
        for source in 0..items.len() {
            for destination in 0..items.len() {
                let changes = reassign_positions(&items, source, destination).unwrap();

                // Merge changes over the input and check {0, .., N-1} exactly.
                let mut positions: Vec<i64> = items
                    .iter()
                    .map(|item| {
                        changes
                            .iter()
                            .find(|c| c.uuid == item.uuid)
                            .map_or(item.position, |c| c.position)
                    })
                    .collect();
                positions.sort_unstable();
                let expected: Vec<i64> = (0..items.len() as i64).collect();
                assert_eq!(positions, expected, "move {source}->{destination}");

                // Minimality: no change may restate an unchanged position.
                for change in &changes {
                    let before = items.iter().find(|i| i.uuid == change.uuid).unwrap();
                    assert_ne!(before.position, change.position);
                }
            }
        }
    }

    #[test]
    fn source_out_of_range_names_index_and_bound() {
        let items = scope(3);
        let err = reassign_positions(&items, 3, 0).unwrap_err();
        assert_eq!(err.end, MoveEnd::Source);
        assert_eq!(err.index, 3);
        assert_eq!(err.len, 3);
        assert!(err.to_string().contains("source index 3"));
    }

    #[test]
    fn destination_out_of_range_is_not_clamped() {
        let items = scope(3);
        let err = reassign_positions(&items, 1, 7).unwrap_err();
        assert_eq!(err.end, MoveEnd::Destination);
        assert_eq!(err.index, 7);
        assert_eq!(err.len, 3);
    }

    #[test]
    fn empty_scope_rejects_any_move() {
        let err = reassign_positions(&[], 0, 0).unwrap_err();
        assert_eq!(err.end, MoveEnd::Source);
        assert_eq!(err.len, 0);
    }

    #[test]
    fn compaction_renumbers_gapped_scope_and_skips_settled_rows() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let items = [
            PositionedRef { uuid: a, position: 0 },
            PositionedRef { uuid: b, position: 2 },
            PositionedRef { uuid: c, position: 5 },
        ];

        let changes = compact_positions(&items);
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().any(|x| x.uuid == b && x.position == 1));
        assert!(changes.iter().any(|x| x.uuid == c && x.position == 2));
    }

    #[test]
    fn compaction_of_dense_scope_is_empty() {
        let items = scope(4);
        assert!(compact_positions(&items).is_empty());
    }
}
