//! Property tests for grid search and congestion weights

use ahash::AHashSet;
use proptest::prelude::*;
use war_movement::battle::{Location, PathWeightMap, Pathfinding};

const SIZE: i32 = 16;

fn in_bounds(loc: Location) -> bool {
    (0..SIZE).contains(&loc.x) && (0..SIZE).contains(&loc.y)
}

fn cell() -> impl Strategy<Value = Location> {
    (0..SIZE, 0..SIZE).prop_map(|(x, y)| Location::of(x, y))
}

proptest! {
    #[test]
    fn prop_open_grid_reaches_destination(from in cell(), to in cell()) {
        let grid = Pathfinding::from_fns(|_: Location| true, |loc: Location| !in_bounds(loc));
        let result = grid.search_approximate(from, to);

        prop_assert!(result.found);
        prop_assert_eq!(result.path.first(), Some(&from));
        prop_assert_eq!(result.path.last(), Some(&to));
        // Diagonals wherever they shorten the route
        prop_assert_eq!(result.path.len() as u32, from.chebyshev(&to) + 1);
        for step in result.path.windows(2) {
            prop_assert_eq!(step[0].chebyshev(&step[1]), 1);
        }
    }

    #[test]
    fn prop_paths_are_walkable(
        walls in proptest::collection::hash_set(cell(), 0..60),
        from in cell(),
        to in cell(),
    ) {
        let walls: AHashSet<Location> = walls.into_iter().filter(|&w| w != from).collect();
        let grid = Pathfinding::from_fns(
            |_: Location| true,
            |loc: Location| !in_bounds(loc) || walls.contains(&loc),
        );
        let result = grid.search_approximate(from, to);

        if !result.found {
            prop_assert!(result.path.is_empty());
            return Ok(());
        }
        prop_assert_eq!(result.path.first(), Some(&from));
        for step in result.path.windows(2) {
            let (a, b) = (step[0], step[1]);
            prop_assert_eq!(a.chebyshev(&b), 1);
            prop_assert!(in_bounds(b) && !walls.contains(&b));
            if a.is_diagonal_to(&b) {
                prop_assert!(!walls.contains(&Location::of(b.x, a.y)));
                prop_assert!(!walls.contains(&Location::of(a.x, b.y)));
            }
        }
    }

    #[test]
    fn prop_weight_map_returns_to_zero(
        paths in proptest::collection::vec(proptest::collection::vec(cell(), 1..20), 1..8),
    ) {
        let weights = PathWeightMap::new(SIZE, SIZE, 4);
        for path in &paths {
            weights.add_path(path.iter());
        }
        let charged: u64 = paths.iter().map(|p| p.len() as u64).sum();
        prop_assert_eq!(weights.total(), charged);

        for path in &paths {
            let (walked, rest) = path.split_at(path.len() / 2);
            for &cell in walked {
                weights.consume(cell);
            }
            weights.remove_path(rest.iter());
        }
        prop_assert_eq!(weights.total(), 0);
    }

    #[test]
    fn prop_neighbors_are_distinct_and_adjacent(x in -40..200i32, y in -40..200i32) {
        let center = Location::of(x, y);
        let neighbors = center.neighbors();
        let unique: AHashSet<Location> = neighbors.iter().copied().collect();

        prop_assert_eq!(unique.len(), 8);
        prop_assert!(neighbors.iter().all(|n| n.chebyshev(&center) == 1));
    }
}
