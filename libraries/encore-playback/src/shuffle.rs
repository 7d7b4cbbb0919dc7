//! Shuffle selection for `next()`

use rand::Rng;

/// Pick a uniformly random queue index other than `current`
///
/// Draws from the `len - 1` other indices directly, so the current entry is
/// never repeated while anything else is available. A single-entry queue
/// yields that entry.
pub fn pick_shuffled_index<R: Rng>(
    len: usize,
    current: Option<usize>,
    rng: &mut R,
) -> Option<usize> {
    match (len, current) {
        (0, _) => None,
        (1, _) => Some(0),
        (_, Some(current)) if current < len => {
            let pick = rng.gen_range(0..len - 1);
            Some(if pick >= current { pick + 1 } else { pick })
        }
        _ => Some(rng.gen_range(0..len)),
    }
}
