//! Index translation between segment coordinates and view coordinates.
//!
//! All functions take the ordered segment lengths and walk them from the
//! front, so every call is linear in the number of segments. Segment counts
//! are expected to be small next to segment sizes.

use livelist_model::{LiveListError, Result};

/// A view index resolved to its segment and the offset inside that segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub segment: usize,
    pub offset: usize,
}

/// First view index belonging to `segment`: the sum of all preceding lengths.
pub fn first_index<I>(lengths: I, segment: usize) -> usize
where
    I: IntoIterator<Item = usize>,
{
    lengths.into_iter().take(segment).sum()
}

/// One past the last view index belonging to `segment`.
pub fn last_index_exclusive<I>(lengths: I, segment: usize) -> usize
where
    I: IntoIterator<Item = usize>,
{
    lengths.into_iter().take(segment + 1).sum()
}

/// Total length of the view.
pub fn total<I>(lengths: I) -> usize
where
    I: IntoIterator<Item = usize>,
{
    lengths.into_iter().sum()
}

/// Resolve a view index to the segment containing it.
///
/// Empty segments never contain an index.
pub fn segment_of<I>(lengths: I, view_index: usize) -> Result<Location>
where
    I: IntoIterator<Item = usize>,
{
    let mut start = 0;
    for (segment, len) in lengths.into_iter().enumerate() {
        if view_index < start + len {
            return Ok(Location {
                segment,
                offset: view_index - start,
            });
        }
        start += len;
    }
    Err(LiveListError::out_of_range(view_index, start))
}

/// Prefix sums of `lengths`: entry `i` is [`first_index`] of segment `i`,
/// the final entry is the total.
pub fn prefix_sums<I>(lengths: I) -> Vec<usize>
where
    I: IntoIterator<Item = usize>,
{
    let mut sums = vec![0];
    let mut running = 0;
    for len in lengths {
        running += len;
        sums.push(running);
    }
    sums
}

#[cfg(test)]
mod tests {
    use super::*;

    const LENGTHS: [usize; 4] = [2, 0, 3, 1];

    #[test]
    fn first_and_last_indices() {
        assert_eq!(first_index(LENGTHS, 0), 0);
        assert_eq!(first_index(LENGTHS, 2), 2);
        assert_eq!(first_index(LENGTHS, 4), 6);
        assert_eq!(last_index_exclusive(LENGTHS, 0), 2);
        assert_eq!(last_index_exclusive(LENGTHS, 1), 2);
        assert_eq!(last_index_exclusive(LENGTHS, 2), 5);
        assert_eq!(total(LENGTHS), 6);
    }

    #[test]
    fn segment_of_skips_empty_segments() {
        assert_eq!(
            segment_of(LENGTHS, 1).unwrap(),
            Location {
                segment: 0,
                offset: 1
            }
        );
        assert_eq!(
            segment_of(LENGTHS, 2).unwrap(),
            Location {
                segment: 2,
                offset: 0
            }
        );
        assert_eq!(
            segment_of(LENGTHS, 5).unwrap(),
            Location {
                segment: 3,
                offset: 0
            }
        );
    }

    #[test]
    fn segment_of_rejects_out_of_range() {
        assert_eq!(
            segment_of(LENGTHS, 6),
            Err(LiveListError::out_of_range(6, 6))
        );
        assert!(segment_of(std::iter::empty(), 0).is_err());
    }

    #[test]
    fn prefix_sums_match_first_index() {
        let sums = prefix_sums(LENGTHS);
        assert_eq!(sums, vec![0, 2, 2, 5, 6]);
        for (segment, &sum) in sums.iter().enumerate() {
            assert_eq!(first_index(LENGTHS, segment), sum);
        }
    }
}
