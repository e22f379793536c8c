//! Property tests for the world map.
//!
//! These tests use `proptest` to generate item placements and verify the
//! fingerprint and occupancy invariants: the hash changes iff the grid
//! changes, and clearing an item restores the pre-placement state.

use proptest::prelude::*;
use redoubt_core::prelude::*;

/// Strategy for an item placement that fits a 10x10-tile map: integer-ish
/// centers away from the border, sizes 1..=3.
fn placement() -> impl Strategy<Value = ([f64; 2], f64)> {
    (2..8i32, 2..8i32, 1..=3i32)
        .prop_map(|(x, y, size)| ([f64::from(x), f64::from(y)], f64::from(size)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn hash_tracks_grid_contents(placements in prop::collection::vec(placement(), 0..5)) {
        let map = WorldMap::new([10, 10], placements.iter().copied());
        let rebuilt = WorldMap::new([10, 10], placements.iter().copied());

        // Identical placements produce identical grids and hashes.
        prop_assert_eq!(map.grid(), rebuilt.grid());
        prop_assert_eq!(map.hash(), rebuilt.hash());

        // The empty map differs unless nothing was carved.
        let empty = WorldMap::new([10, 10], []);
        let carved = map.grid().iter().flatten().any(|&c| c == 0);
        prop_assert_eq!(map.hash() != empty.hash(), carved);
    }

    #[test]
    fn clear_round_trips_the_fingerprint(
        base in prop::collection::vec(placement(), 0..3),
        extra in placement(),
    ) {
        let before = WorldMap::new([10, 10], base.iter().copied());

        let mut map = WorldMap::new(
            [10, 10],
            base.iter().copied().chain(std::iter::once(extra)),
        );
        map.clear_from_map(extra.0, extra.1);

        // Clearing the extra square refills it entirely; if the square did
        // not overlap any base placement, the original fingerprint returns.
        let overlaps = before
            .grid()
            .iter()
            .flatten()
            .zip(map.grid().iter().flatten())
            .any(|(b, m)| b != m);
        if !overlaps {
            prop_assert_eq!(map.hash(), before.hash());
        }
    }

    #[test]
    fn graph_nodes_are_exactly_free_cells(placements in prop::collection::vec(placement(), 0..4)) {
        let map = WorldMap::new([10, 10], placements.iter().copied());
        let free: usize = map.grid().iter().flatten().filter(|&&c| c == 1).count();
        prop_assert_eq!(map.graph().len(), free);
    }
}
