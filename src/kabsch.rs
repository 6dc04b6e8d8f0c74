// src/kabsch.rs - Weighted Kabsch alignment of reference points onto live points
use nalgebra::{Isometry3, Matrix3, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};
use serde::Serialize;
use tracing::{error, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlignmentResult {
    pub rotation: UnitQuaternion<f64>,
    pub translation: Vector3<f64>,
}

impl AlignmentResult {
    pub fn identity() -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
        }
    }

    pub fn isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.translation), self.rotation)
    }

    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.rotation.to_rotation_matrix().into_inner()
    }

    pub fn transform_point(&self, point: &Point3<f64>) -> Point3<f64> {
        self.rotation * point + self.translation
    }
}

impl Default for AlignmentResult {
    fn default() -> Self {
        Self::identity()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorState {
    Empty,
    Accumulating,
}

/// Streaming accumulator for one solve cycle: `reset`, any number of
/// `add_pair`, then `solve`.
///
/// Centroids and the cross-covariance
/// ```text
/// H = Σ wᵢ (liveᵢ − live̅)(refᵢ − ref̅)ᵀ
/// ```
/// are updated in a single pass, so pairs never need to be stored.
#[derive(Debug, Clone)]
pub struct KabschSolver {
    total_weight: f64,
    pair_count: usize,
    reference_mean: Vector3<f64>,
    live_mean: Vector3<f64>,
    covariance: Matrix3<f64>,
    degenerate_epsilon: f64,
    solved: bool,
}

impl KabschSolver {
    pub fn new(degenerate_epsilon: f64) -> Self {
        Self {
            total_weight: 0.0,
            pair_count: 0,
            reference_mean: Vector3::zeros(),
            live_mean: Vector3::zeros(),
            covariance: Matrix3::zeros(),
            degenerate_epsilon,
            solved: false,
        }
    }

    pub fn reset(&mut self) {
        self.total_weight = 0.0;
        self.pair_count = 0;
        self.reference_mean = Vector3::zeros();
        self.live_mean = Vector3::zeros();
        self.covariance = Matrix3::zeros();
        self.solved = false;
    }

    /// Folds one correspondence into the running sums. Negative or non-finite
    /// weights are rejected and leave the accumulator untouched.
    ///
    /// Pairs added after `solve` without a `reset` in between would blend two
    /// frames; they are refused, and debug builds panic.
    pub fn add_pair(&mut self, reference: &Point3<f64>, live: &Point3<f64>, weight: f64) {
        if self.solved {
            error!("add_pair after solve without reset, pair refused");
            if cfg!(debug_assertions) {
                panic!("KabschSolver::add_pair called after solve without reset");
            }
            return;
        }
        if !weight.is_finite() || weight < 0.0 {
            warn!("Ignoring point pair with invalid weight {}", weight);
            return;
        }

        self.pair_count += 1;
        if weight == 0.0 {
            return;
        }

        let total = self.total_weight + weight;
        let ratio = weight / total;

        // Reference offset against the previous mean, live offset against the
        // updated one: the weighted co-moment update.
        let reference_offset = reference.coords - self.reference_mean;
        self.reference_mean += reference_offset * ratio;
        self.live_mean += (live.coords - self.live_mean) * ratio;
        let live_offset = live.coords - self.live_mean;

        self.covariance += live_offset * reference_offset.transpose() * weight;
        self.total_weight = total;
    }

    pub fn solve(&mut self) -> AlignmentResult {
        self.solved = true;
        if self.total_weight <= 0.0 {
            trace!("Solve with no weighted pairs, returning identity");
            return AlignmentResult::identity();
        }

        let r = self.optimal_rotation();
        let translation = self.live_mean - r * self.reference_mean;
        let rotation = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r));

        if !translation.iter().all(|v| v.is_finite()) {
            warn!("Non-finite translation from {} pairs, returning identity", self.pair_count);
            return AlignmentResult::identity();
        }

        AlignmentResult {
            rotation,
            translation,
        }
    }

    fn optimal_rotation(&self) -> Matrix3<f64> {
        // A single pair or coincident points carry no orientation at all.
        // H scales linearly with the weights, so the cutoff does too.
        if self.covariance.norm() <= self.degenerate_epsilon * self.total_weight {
            return Matrix3::identity();
        }

        let svd = self.covariance.svd(true, true);
        let (u, v_t) = match (svd.u, svd.v_t) {
            (Some(u), Some(v_t)) => (u, v_t),
            _ => {
                warn!("SVD did not produce singular vectors, returning identity rotation");
                return Matrix3::identity();
            }
        };

        let mut r = u * v_t;
        if r.determinant() < 0.0 {
            // Improper fit: flip the axis the data constrains least
            let weakest = svd.singular_values.imin();
            let mut u_fix = u;
            u_fix.column_mut(weakest).neg_mut();
            r = u_fix * v_t;
        }

        if r.iter().all(|v| v.is_finite()) {
            r
        } else {
            warn!("Non-finite rotation from SVD, returning identity rotation");
            Matrix3::identity()
        }
    }

    pub fn state(&self) -> AccumulatorState {
        if self.pair_count == 0 {
            AccumulatorState::Empty
        } else {
            AccumulatorState::Accumulating
        }
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }

    pub fn pair_count(&self) -> usize {
        self.pair_count
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    pub fn covariance(&self) -> &Matrix3<f64> {
        &self.covariance
    }
}

impl Default for KabschSolver {
    fn default() -> Self {
        Self::new(1e-12)
    }
}
