//! Generic A* search with approximate fallback
//!
//! Works over any node type through the `SearchSpace` trait. Costs are
//! integers so heap ordering never depends on float rounding.
//!
//! When the destination cannot be reached the search still reports success
//! with a path to the explored node closest to the destination. Callers rely
//! on `found` meaning "some path was produced", not "the destination was
//! reached".

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::hash::Hash;

use ahash::{AHashMap, AHashSet};

/// Callbacks the search needs from a graph
pub trait SearchSpace {
    type Node: Copy + Eq + Hash;

    /// Estimated cost from `from` to `to`
    fn heuristic(&self, from: &Self::Node, to: &Self::Node) -> i64;

    /// Cost of the edge between two adjacent nodes
    fn distance(&self, from: &Self::Node, to: &Self::Node) -> i64;

    /// Nodes reachable in one step
    fn neighbors(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// Unconstrained distance, used only to rank fallback candidates
    fn true_distance(&self, from: &Self::Node, to: &Self::Node) -> i64;
}

/// Outcome of a search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult<T> {
    /// True whenever a path was produced, exact or approximate
    pub found: bool,
    /// Route from the initial node (inclusive) to the terminal node
    pub path: Vec<T>,
}

impl<T> SearchResult<T> {
    pub fn not_found() -> Self {
        Self {
            found: false,
            path: Vec::new(),
        }
    }
}

/// Entry in the open heap
#[derive(Debug, Clone)]
struct OpenNode<T> {
    node: T,
    f_cost: i64,
    h_cost: i64,
    seq: u64,
}

impl<T> PartialEq for OpenNode<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for OpenNode<T> {}

impl<T> Ord for OpenNode<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; ties go to the node nearer the goal,
        // then to the one pushed first
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.h_cost.cmp(&self.h_cost))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for OpenNode<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* search over a borrowed search space
pub struct AStarSearch<'a, S: SearchSpace> {
    space: &'a S,
    max_expanded: Option<usize>,
}

impl<'a, S: SearchSpace> AStarSearch<'a, S> {
    pub fn new(space: &'a S) -> Self {
        Self {
            space,
            max_expanded: None,
        }
    }

    /// Stop expanding after `limit` nodes and fall back to the best explored node
    pub fn with_expansion_limit(mut self, limit: Option<usize>) -> Self {
        self.max_expanded = limit;
        self
    }

    pub fn search(&self, initial: S::Node, destination: S::Node) -> SearchResult<S::Node> {
        if initial == destination {
            return SearchResult {
                found: true,
                path: vec![initial],
            };
        }

        let space = self.space;
        let mut open_set = BinaryHeap::new();
        let mut open_members: AHashSet<S::Node> = AHashSet::new();
        let mut closed: AHashSet<S::Node> = AHashSet::new();
        let mut closed_order: Vec<S::Node> = Vec::new();
        let mut came_from: AHashMap<S::Node, S::Node> = AHashMap::new();
        let mut g_scores: AHashMap<S::Node, i64> = AHashMap::new();
        let mut h_scores: AHashMap<S::Node, i64> = AHashMap::new();
        let mut f_scores: AHashMap<S::Node, i64> = AHashMap::new();
        let mut seq = 0u64;

        let h0 = space.heuristic(&initial, &destination);
        g_scores.insert(initial, 0);
        h_scores.insert(initial, h0);
        f_scores.insert(initial, h0);
        open_members.insert(initial);
        open_set.push(OpenNode {
            node: initial,
            f_cost: h0,
            h_cost: h0,
            seq,
        });

        while let Some(entry) = open_set.pop() {
            let current = entry.node;

            // Superseded heap entries are skipped
            if !open_members.contains(&current) || f_scores.get(&current) != Some(&entry.f_cost) {
                continue;
            }

            if current == destination {
                return SearchResult {
                    found: true,
                    path: reconstruct_path(&came_from, current),
                };
            }

            open_members.remove(&current);
            closed.insert(current);
            closed_order.push(current);

            if self.max_expanded.is_some_and(|limit| closed_order.len() >= limit) {
                tracing::trace!("A* expansion limit reached after {} nodes", closed_order.len());
                break;
            }

            let current_g = g_scores.get(&current).copied().unwrap_or(0);

            for neighbor in space.neighbors(&current) {
                if closed.contains(&neighbor) {
                    continue;
                }

                let tentative_g = current_g + space.distance(&current, &neighbor);
                if g_scores.get(&neighbor).is_some_and(|&g| tentative_g >= g) {
                    continue;
                }

                let h = *h_scores
                    .entry(neighbor)
                    .or_insert_with(|| space.heuristic(&neighbor, &destination));
                let f = tentative_g + h;

                came_from.insert(neighbor, current);
                g_scores.insert(neighbor, tentative_g);
                f_scores.insert(neighbor, f);
                open_members.insert(neighbor);
                seq += 1;
                open_set.push(OpenNode {
                    node: neighbor,
                    f_cost: f,
                    h_cost: h,
                    seq,
                });
            }
        }

        // Start never expanded into anything: nothing to settle for
        if came_from.is_empty() {
            return SearchResult::not_found();
        }

        // Destination unreachable: settle for the explored node nearest to it,
        // preferring nodes closer to the origin among equals
        let best = closed_order
            .iter()
            .min_by_key(|node| {
                (
                    space.true_distance(node, &destination),
                    space.true_distance(node, &initial),
                )
            });

        match best {
            Some(&node) => SearchResult {
                found: true,
                path: reconstruct_path(&came_from, node),
            },
            None => SearchResult::not_found(),
        }
    }
}

/// Walk `came_from` back from `terminal` and return the forward route
pub fn reconstruct_path<T: Copy + Eq + Hash>(came_from: &AHashMap<T, T>, terminal: T) -> Vec<T> {
    let mut path = vec![terminal];
    let mut current = terminal;
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Integer line 0..len where `walls` cannot be entered
    struct Line {
        len: i32,
        walls: Vec<i32>,
    }

    impl SearchSpace for Line {
        type Node = i32;

        fn heuristic(&self, from: &i32, to: &i32) -> i64 {
            (from - to).abs() as i64
        }

        fn distance(&self, _from: &i32, _to: &i32) -> i64 {
            1
        }

        fn neighbors(&self, node: &i32) -> Vec<i32> {
            [node - 1, node + 1]
                .into_iter()
                .filter(|n| (0..self.len).contains(n) && !self.walls.contains(n))
                .collect()
        }

        fn true_distance(&self, from: &i32, to: &i32) -> i64 {
            (from - to).abs() as i64
        }
    }

    #[test]
    fn test_exact_path() {
        let line = Line { len: 10, walls: vec![] };
        let result = AStarSearch::new(&line).search(2, 6);
        assert!(result.found);
        assert_eq!(result.path, vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_same_node() {
        let line = Line { len: 10, walls: vec![] };
        let result = AStarSearch::new(&line).search(4, 4);
        assert_eq!(result, SearchResult { found: true, path: vec![4] });
    }

    #[test]
    fn test_approximate_path_stops_at_wall() {
        let line = Line { len: 10, walls: vec![5] };
        let result = AStarSearch::new(&line).search(1, 8);
        assert!(result.found, "approximate results still report success");
        assert_eq!(result.path, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_start_nearest_to_unreachable_goal_stays_put() {
        let line = Line { len: 10, walls: vec![5] };
        let result = AStarSearch::new(&line).search(4, 8);
        assert!(result.found);
        assert_eq!(result.path, vec![4]);
    }

    /// Small fixed graph whose nodes sit at grid points, measured Manhattan
    ///
    /// `0 -> 1`, `0 -> 2 -> 3`, and `9` is unreachable. Nodes 1 and 3 are both
    /// 4 away from 9, but 3 sits nearer to 0. The heuristic closes 1 first.
    struct Branches;

    impl Branches {
        fn position(node: i32) -> (i64, i64) {
            match node {
                0 => (0, 0),
                1 => (3, -1),
                2 => (0, 1),
                3 => (1, 1),
                _ => (3, 3),
            }
        }
    }

    impl SearchSpace for Branches {
        type Node = i32;

        fn heuristic(&self, from: &i32, _to: &i32) -> i64 {
            match from {
                1 => 1,
                2 | 3 => 4,
                _ => 5,
            }
        }

        fn distance(&self, _from: &i32, _to: &i32) -> i64 {
            1
        }

        fn neighbors(&self, node: &i32) -> Vec<i32> {
            match node {
                0 => vec![1, 2],
                2 => vec![3],
                _ => Vec::new(),
            }
        }

        fn true_distance(&self, from: &i32, to: &i32) -> i64 {
            let (a, b) = (Self::position(*from), Self::position(*to));
            (a.0 - b.0).abs() + (a.1 - b.1).abs()
        }
    }

    #[test]
    fn test_fallback_tie_prefers_node_nearer_start() {
        let result = AStarSearch::new(&Branches).search(0, 9);
        assert!(result.found);
        assert_eq!(result.path, vec![0, 2, 3]);
    }

    #[test]
    fn test_no_expansion_is_not_found() {
        let line = Line { len: 10, walls: vec![2, 4] };
        let result = AStarSearch::new(&line).search(3, 8);
        assert_eq!(result, SearchResult::not_found());
    }

    #[test]
    fn test_expansion_limit_falls_back() {
        let line = Line { len: 100, walls: vec![] };
        let result = AStarSearch::new(&line)
            .with_expansion_limit(Some(3))
            .search(0, 50);
        assert!(result.found);
        assert_eq!(result.path.first(), Some(&0));
        assert!(result.path.len() <= 4);
        assert_ne!(result.path.last(), Some(&50));
    }

    #[test]
    fn test_reconstruct_path() {
        let mut came_from = AHashMap::new();
        came_from.insert(2, 1);
        came_from.insert(3, 2);
        assert_eq!(reconstruct_path(&came_from, 3), vec![1, 2, 3]);
        assert_eq!(reconstruct_path(&came_from, 1), vec![1]);
    }
}
