use std::cmp::Ordering;
use std::collections::BinaryHeap;

use glam::IVec2;
use tracing::debug;

use crate::coords::GridRect;
use crate::grid::OverlayGrid;

const NEIGHBOURS: [IVec2; 4] = [
    IVec2::new(1, 0),
    IVec2::new(-1, 0),
    IVec2::new(0, 1),
    IVec2::new(0, -1),
];

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Goal {
    Cell(IVec2),
    Row(i32),
    Column(i32),
}

impl Goal {
    pub fn is_reached(self, cell: IVec2) -> bool {
        match self {
            Goal::Cell(target) => cell == target,
            Goal::Row(row) => cell.y == row,
            Goal::Column(column) => cell.x == column,
        }
    }

    pub fn distance_sq(self, cell: IVec2) -> i64 {
        let axis = |a: i32, b: i32| {
            let d = i64::from(a) - i64::from(b);
            d * d
        };
        match self {
            Goal::Cell(target) => axis(cell.x, target.x) + axis(cell.y, target.y),
            Goal::Row(row) => axis(cell.y, row),
            Goal::Column(column) => axis(cell.x, column),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    /// Cells from the start (inclusive) towards the goal.
    pub steps: Vec<IVec2>,
    pub cost: i64,
    pub complete: bool,
}

impl Path {
    pub fn last(&self) -> Option<IVec2> {
        self.steps.last().copied()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[derive(Debug)]
struct Candidate {
    cost: i64,
    seq: u64,
    history: Vec<IVec2>,
}

impl Candidate {
    fn head(&self) -> IVec2 {
        // Histories always hold at least the start cell.
        self.history[self.history.len() - 1]
    }

    fn into_path(self, complete: bool) -> Path {
        Path {
            steps: self.history,
            cost: self.cost,
            complete,
        }
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.seq == other.seq
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    // `BinaryHeap` is a max-heap: lower cost first, then earlier insertion.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Greedy best-first search. When `max_expansions` runs out the cheapest
/// expanded candidate is returned with `complete == false`. The start cell is
/// never checked for an occupant.
pub fn find_path(
    start: IVec2,
    goal: Goal,
    overlay: &OverlayGrid,
    bounds: Option<GridRect>,
    max_expansions: usize,
) -> Path {
    let mut frontier = BinaryHeap::new();
    let mut seq = 0u64;
    frontier.push(Candidate {
        cost: goal.distance_sq(start),
        seq,
        history: vec![start],
    });

    let mut best: Option<Candidate> = None;
    let mut expansions = 0usize;

    while expansions < max_expansions {
        let Some(candidate) = frontier.pop() else {
            break;
        };
        expansions += 1;

        let head = candidate.head();
        if goal.is_reached(head) {
            return candidate.into_path(true);
        }

        let path_len = candidate.history.len() as i64;
        for offset in NEIGHBOURS {
            let next = head + offset;
            if !overlay.contains(next)
                || bounds.is_some_and(|rect| !rect.contains(next))
                || overlay.is_occupied(next)
                || candidate.history.contains(&next)
            {
                continue;
            }

            let mut history = Vec::with_capacity(candidate.history.len() + 1);
            history.extend_from_slice(&candidate.history);
            history.push(next);

            seq += 1;
            frontier.push(Candidate {
                cost: path_len + goal.distance_sq(next),
                seq,
                history,
            });
        }

        if best.as_ref().map_or(true, |b| candidate.cost < b.cost) {
            best = Some(candidate);
        }
    }

    let path = best.map_or_else(
        || Path {
            steps: vec![start],
            cost: goal.distance_sq(start),
            complete: false,
        },
        |candidate| candidate.into_path(false),
    );
    debug!(
        "Partial path from {start} towards {goal:?} after {expansions} expansions, ends at {:?}",
        path.last()
    );
    path
}
