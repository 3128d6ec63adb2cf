//! Queue Manager
//!
//! Pure queue transforms used by the playback session: reversible shuffle,
//! order restoration, and item reordering. Nothing here holds state between
//! calls; the only nondeterminism is the permutation in [`shuffle`], which
//! never moves the current item away from index 0.

use rand::seq::SliceRandom;
use rand::Rng;

use jasmine_common::{QueueSnapshot, Track};

use crate::error::{Error, Result};

/// Session-local shuffle mode
///
/// The pre-shuffle order lives inside the `Shuffled` variant, so it exists
/// exactly when shuffle is active.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ShuffleState {
    #[default]
    Normal,
    Shuffled {
        /// Queue order at the moment shuffle was enabled
        saved_order: QueueSnapshot,
    },
}

impl ShuffleState {
    pub fn is_active(&self) -> bool {
        matches!(self, ShuffleState::Shuffled { .. })
    }

    pub fn saved_order(&self) -> Option<&QueueSnapshot> {
        match self {
            ShuffleState::Normal => None,
            ShuffleState::Shuffled { saved_order } => Some(saved_order),
        }
    }

    /// Whether the saved order can still be restored onto `queue`
    ///
    /// True only while shuffled and when `queue` holds exactly the saved
    /// items, in any order.
    pub fn restorable_onto(&self, queue: &QueueSnapshot) -> bool {
        let Some(saved_order) = self.saved_order() else {
            return false;
        };
        let mut saved = saved_order.ids();
        let mut current = queue.ids();
        saved.sort_unstable();
        current.sort_unstable();
        saved == current
    }
}

/// Shuffle with the thread-local RNG
///
/// Returns `(new_queue, saved_order)`, or `None` for an empty queue.
pub fn shuffle(queue: &QueueSnapshot) -> Option<(QueueSnapshot, QueueSnapshot)> {
    shuffle_with_rng(queue, &mut rand::thread_rng())
}

/// Shuffle with a caller-supplied RNG
///
/// The current item is moved to index 0 and the remaining items are
/// permuted behind it. The returned queue's current index is 0.
pub fn shuffle_with_rng<R: Rng + ?Sized>(
    queue: &QueueSnapshot,
    rng: &mut R,
) -> Option<(QueueSnapshot, QueueSnapshot)> {
    let current_index = queue.current_index()?;

    let mut rest: Vec<Track> = queue.tracks().to_vec();
    let current = rest.remove(current_index);
    rest.shuffle(rng);

    let mut shuffled = Vec::with_capacity(queue.len());
    shuffled.push(current);
    shuffled.extend(rest);

    // Non-empty with index 0, cannot fail
    let new_queue = QueueSnapshot::new(shuffled, 0).ok()?;
    Some((new_queue, queue.clone()))
}

/// Restore the saved order, keeping the identified item current
///
/// Returns the restored queue and its current index. When `current_item_id`
/// is absent from `saved_order`, index 0 is used.
pub fn unshuffle(
    saved_order: &QueueSnapshot,
    current_item_id: Option<&str>,
) -> (QueueSnapshot, usize) {
    let index = current_item_id
        .and_then(|id| saved_order.position_of(id))
        .unwrap_or(0);

    let restored = QueueSnapshot::new(saved_order.tracks().to_vec(), index).unwrap_or_default();
    (restored, index)
}

/// Check that `from -> to` is a real move inside a queue of `len`
pub fn validate_move(len: usize, from: usize, to: usize) -> Result<()> {
    if from >= len {
        return Err(Error::InvalidIndex { index: from, len });
    }
    if to >= len {
        return Err(Error::InvalidIndex { index: to, len });
    }
    if from == to {
        return Err(Error::InvalidIndex { index: to, len });
    }
    Ok(())
}

/// Move the item at `from` to `to`
///
/// Out-of-range indices and `from == to` are rejected and leave the queue
/// unchanged. The current index follows the current item.
pub fn reorder(queue: &QueueSnapshot, from: usize, to: usize) -> QueueSnapshot {
    if let Err(e) = validate_move(queue.len(), from, to) {
        tracing::debug!(from, to, error = %e, "Reorder rejected");
        return queue.clone();
    }

    let mut tracks = queue.tracks().to_vec();
    let item = tracks.remove(from);
    tracks.insert(to, item);

    let current = queue.current_index().unwrap_or(0);
    QueueSnapshot::new(tracks, shifted_index(current, from, to)).unwrap_or_else(|_| queue.clone())
}

/// Where the item at `current` ends up after moving `from` to `to`
pub fn shifted_index(current: usize, from: usize, to: usize) -> usize {
    if current == from {
        to
    } else if from < current && to >= current {
        current - 1
    } else if from > current && to <= current {
        current + 1
    } else {
        current
    }
}
