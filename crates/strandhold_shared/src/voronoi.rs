use glam::IVec2;
use rand::Rng;
use rustc_hash::FxHashMap;

use crate::coords::div_rem_floor;
use crate::error::{WorldError, WorldResult};
use crate::rng::{local_rng, SALT_VORONOI_LABEL, SALT_VORONOI_POINT};

const NEIGHBORHOOD_RADIUS: i32 = 2;

/// Partitions the plane into irregular regions around one jittered point per
/// `cell_size` square and labels each region from `labels`.
///
/// The label of a location depends only on the cell that owns its nearest
/// point, so every location sharing that point shares the label.
#[derive(Clone, Debug)]
pub struct VoronoiClassifier<L> {
    seed: u64,
    cell_size: i32,
    labels: Vec<L>,
    minkowski_exponent: f64,
    points: FxHashMap<(i32, i32), IVec2>,
}

impl<L: Copy> VoronoiClassifier<L> {
    pub fn new(seed: u64, cell_size: i32, labels: Vec<L>, minkowski_exponent: f64) -> WorldResult<Self> {
        if cell_size <= 0 {
            return Err(WorldError::invalid(format!(
                "voronoi cell size must be positive, got {cell_size}"
            )));
        }
        if labels.is_empty() {
            return Err(WorldError::invalid("voronoi classifier needs at least one label"));
        }
        if !(minkowski_exponent.is_finite() && minkowski_exponent >= 1.0) {
            return Err(WorldError::invalid(format!(
                "minkowski exponent must be >= 1, got {minkowski_exponent}"
            )));
        }

        Ok(Self {
            seed,
            cell_size,
            labels,
            minkowski_exponent,
            points: FxHashMap::default(),
        })
    }

    pub fn cell_size(&self) -> i32 {
        self.cell_size
    }

    pub fn cached_points(&self) -> usize {
        self.points.len()
    }

    /// Absolute position of the jittered point owned by `cell`.
    pub fn point_for_cell(&mut self, cell: (i32, i32)) -> IVec2 {
        let seed = self.seed;
        let size = self.cell_size;
        *self.points.entry(cell).or_insert_with(|| {
            let mut rng = local_rng(seed, SALT_VORONOI_POINT, cell.0, cell.1);
            let jitter = IVec2::new(rng.gen_range(0..size), rng.gen_range(0..size));
            IVec2::new(cell.0 * size, cell.1 * size) + jitter
        })
    }

    /// Cell whose point is nearest to `(x, y)` among the 5x5 neighbourhood.
    pub fn nearest_cell(&mut self, x: i32, y: i32) -> (i32, i32) {
        let (cell_x, _) = div_rem_floor(x, self.cell_size);
        let (cell_y, _) = div_rem_floor(y, self.cell_size);

        let mut best_cell = (cell_x, cell_y);
        let mut best_distance = f64::INFINITY;
        for cy in cell_y - NEIGHBORHOOD_RADIUS..=cell_y + NEIGHBORHOOD_RADIUS {
            for cx in cell_x - NEIGHBORHOOD_RADIUS..=cell_x + NEIGHBORHOOD_RADIUS {
                let point = self.point_for_cell((cx, cy));
                let distance = self.distance(IVec2::new(x, y), point);
                if distance < best_distance {
                    best_distance = distance;
                    best_cell = (cx, cy);
                }
            }
        }
        best_cell
    }

    pub fn classify(&mut self, x: i32, y: i32) -> L {
        let (cx, cy) = self.nearest_cell(x, y);
        let mut rng = local_rng(self.seed, SALT_VORONOI_LABEL, cx, cy);
        self.labels[rng.gen_range(0..self.labels.len())]
    }

    // p-th power of the Minkowski distance; the root is monotonic and skipped.
    fn distance(&self, a: IVec2, b: IVec2) -> f64 {
        let d = (a - b).abs().as_dvec2();
        d.x.powf(self.minkowski_exponent) + d.y.powf(self.minkowski_exponent)
    }
}

#[cfg(test)]
mod tests {
    use super::VoronoiClassifier;

    fn classifier(exponent: f64) -> VoronoiClassifier<u8> {
        VoronoiClassifier::new(511, 10, vec![0, 1, 2, 3], exponent).expect("valid classifier")
    }

    #[test]
    fn repeated_queries_return_the_same_label() {
        let mut voronoi = classifier(2.0);
        let first: Vec<u8> = (-30..30).map(|i| voronoi.classify(i * 3, -i * 2)).collect();
        let second: Vec<u8> = (-30..30).map(|i| voronoi.classify(i * 3, -i * 2)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn labels_do_not_depend_on_query_order() {
        let mut forward = classifier(2.0);
        let mut backward = classifier(2.0);
        let coords: Vec<(i32, i32)> = (0..40).flat_map(|y| (0..40).map(move |x| (x - 20, y - 20))).collect();

        let a: Vec<u8> = coords.iter().map(|&(x, y)| forward.classify(x, y)).collect();
        let mut b: Vec<u8> = coords.iter().rev().map(|&(x, y)| backward.classify(x, y)).collect();
        b.reverse();
        assert_eq!(a, b);
    }

    #[test]
    fn locations_sharing_a_nearest_point_share_a_label() {
        let mut voronoi = classifier(2.0);
        let owner = voronoi.nearest_cell(5, 5);
        let point = voronoi.point_for_cell(owner);
        assert_eq!(voronoi.nearest_cell(point.x, point.y), owner);
        assert_eq!(voronoi.classify(point.x, point.y), voronoi.classify(5, 5));
    }

    #[test]
    fn exponent_changes_the_partition() {
        let mut manhattan = classifier(1.0);
        let mut euclidean = classifier(2.0);
        let mut owners_differ = 0;
        let mut labels_differ = 0;
        for y in -100..100 {
            for x in -100..100 {
                if manhattan.nearest_cell(x, y) != euclidean.nearest_cell(x, y) {
                    owners_differ += 1;
                }
                if manhattan.classify(x, y) != euclidean.classify(x, y) {
                    labels_differ += 1;
                }
            }
        }
        assert!(owners_differ > 0);
        assert!(labels_differ > 0);
        // Both metrics agree away from the boundaries.
        assert!(owners_differ < 200 * 200 / 2, "{owners_differ} locations moved");
    }

    #[test]
    fn jittered_points_stay_inside_their_cell() {
        let mut voronoi = classifier(1.0);
        for cy in -3..3 {
            for cx in -3..3 {
                let p = voronoi.point_for_cell((cx, cy));
                assert!(p.x >= cx * 10 && p.x < (cx + 1) * 10);
                assert!(p.y >= cy * 10 && p.y < (cy + 1) * 10);
            }
        }
    }

    #[test]
    fn negative_coordinates_use_floor_division() {
        let mut voronoi = classifier(2.0);
        // (-1, -1) lies in cell (-1, -1), so the searched block spans cells -3..=1.
        let (cx, cy) = voronoi.nearest_cell(-1, -1);
        assert!((-2..=1).contains(&cx) && (-2..=1).contains(&cy));
        assert_eq!(voronoi.cached_points(), 25);

        let _ = voronoi.point_for_cell((-3, -3));
        let _ = voronoi.point_for_cell((1, 1));
        assert_eq!(voronoi.cached_points(), 25);
    }

    #[test]
    fn invalid_parameters_fail_fast() {
        assert!(VoronoiClassifier::new(1, 0, vec![0u8], 2.0).is_err());
        assert!(VoronoiClassifier::<u8>::new(1, 10, Vec::new(), 2.0).is_err());
        assert!(VoronoiClassifier::new(1, 10, vec![0u8], 0.5).is_err());
    }
}
