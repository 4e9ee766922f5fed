//! Stochastic hill-climb search of a single shape
use crate::{
    Error, Image, PixelRect, Point, Raster, Scalar,
    difference::{optimal_color, shape_delta},
    shape::{MutationSteps, ShapeGenome, ShapeKind, ShapeLimits},
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Quality versus speed preset
///
/// Higher fidelity modes spend more evaluations per shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FidelityMode {
    #[default]
    Standard,
    High,
    Super,
    Hyper,
}

impl FidelityMode {
    pub const ALL: [FidelityMode; 4] = [
        FidelityMode::Standard,
        FidelityMode::High,
        FidelityMode::Super,
        FidelityMode::Hyper,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FidelityMode::Standard => "standard",
            FidelityMode::High => "high",
            FidelityMode::Super => "super",
            FidelityMode::Hyper => "hyper",
        }
    }

    /// Number of shapes a caller should request per `advance_by` call to stay responsive
    pub fn recommended_unit_budget(self) -> usize {
        match self {
            FidelityMode::Standard => 25,
            FidelityMode::High => 10,
            FidelityMode::Super => 10,
            FidelityMode::Hyper => 2,
        }
    }

    /// Multiplier of the search effort relative to the standard mode
    pub fn effort(self) -> usize {
        match self {
            FidelityMode::Standard => 1,
            FidelityMode::High => 3,
            FidelityMode::Super => 10,
            FidelityMode::Hyper => 100,
        }
    }
}

impl fmt::Display for FidelityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FidelityMode {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        FidelityMode::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| Error::validation(format!("unknown fidelity mode: {:?}", name)))
    }
}

impl TryFrom<u8> for FidelityMode {
    type Error = Error;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        FidelityMode::ALL
            .get(index as usize)
            .copied()
            .ok_or_else(|| Error::validation(format!("fidelity mode index out of range: {}", index)))
    }
}

/// Effort and step sizes of the search for one shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of independent random starts
    pub restarts: usize,
    /// Number of hill-climb mutation steps applied to the best start
    pub iterations: usize,
    /// Number of sampled pixels used to pick the start position
    pub seed_samples: usize,
    /// Maximal radius of a freshly generated shape
    pub seed_size: Scalar,
    /// Maximal number of polygon vertices
    pub max_vertices: usize,
    /// Maximal mutation deltas
    pub steps: MutationSteps,
}

impl SearchConfig {
    pub fn for_mode(mode: FidelityMode) -> Self {
        let effort = mode.effort();
        Self {
            restarts: 40 * effort,
            iterations: 80 * effort,
            seed_samples: 30,
            seed_size: 15.0,
            max_vertices: match mode {
                FidelityMode::Standard => 3,
                FidelityMode::High => 4,
                FidelityMode::Super => 5,
                FidelityMode::Hyper => 6,
            },
            steps: MutationSteps::default(),
        }
    }

    /// Maximal radius of a shape given the fraction of already committed shapes
    ///
    /// Early shapes are large, late ones only refine details.
    pub fn max_size(&self, progress: Scalar) -> Scalar {
        if progress > 0.8 {
            10.0
        } else if progress > 0.5 {
            30.0
        } else {
            200.0
        }
    }

    /// Scale of mutation deltas at the given hill-climb step
    pub fn annealing(&self, iteration: usize) -> Scalar {
        if self.iterations == 0 {
            return 1.0;
        }
        1.0 - (iteration as Scalar / self.iterations as Scalar).sqrt()
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::for_mode(FidelityMode::default())
    }
}

/// Scored candidate shape
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub shape: ShapeGenome,
    /// Score change if the shape is composited onto the canvas
    pub delta: Scalar,
}

/// Outcome of the search for a single shape slot
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Shape to commit, never increases the score
    pub shape: ShapeGenome,
    /// Score change caused by committing the shape
    pub delta: Scalar,
    /// Number of evaluated candidates
    pub evaluations: usize,
    /// Number of accepted mutations
    pub accepted: usize,
}

/// Search of the best shape for the current canvas
pub struct Search<'a> {
    target: &'a Raster,
    canvas: &'a Raster,
    config: &'a SearchConfig,
    kinds: &'a [ShapeKind],
    limits: ShapeLimits,
    bounds: PixelRect,
    evaluations: usize,
}

impl<'a> Search<'a> {
    /// Create search for a shape slot, `progress` is the fraction of committed shapes
    pub fn new(
        target: &'a Raster,
        canvas: &'a Raster,
        config: &'a SearchConfig,
        kinds: &'a [ShapeKind],
        progress: Scalar,
    ) -> Self {
        let limits = ShapeLimits {
            width: target.width(),
            height: target.height(),
            max_size: config.max_size(progress),
            seed_size: config.seed_size,
            max_vertices: config.max_vertices,
        };
        Self {
            target,
            canvas,
            config,
            kinds,
            limits,
            bounds: PixelRect::new(0, 0, target.width(), target.height()),
            evaluations: 0,
        }
    }

    /// Score the shape, its color is replaced with the optimal one for its opacity
    ///
    /// Returns `None` if the score is not a finite number.
    pub fn evaluate(&mut self, shape: ShapeGenome) -> Option<Candidate> {
        self.evaluations += 1;
        let coverage = shape.rasterize(self.bounds);
        let color = optimal_color(self.target, self.canvas, &coverage, shape.opacity());
        let shape = shape.with_color(color);
        let delta = shape_delta(self.target, self.canvas, shape.color(), &coverage);
        delta.is_finite().then_some(Candidate { shape, delta })
    }

    /// Pick position with the largest error among randomly sampled pixels
    pub fn seed_point<R: Rng>(&self, rng: &mut R) -> Point {
        let (width, height) = (self.limits.width, self.limits.height);
        let mut best = (0, 0);
        let mut best_error = None;
        for _ in 0..self.config.seed_samples.max(1) {
            let x = rng.random_range(0..width);
            let y = rng.random_range(0..height);
            let error = match (self.target.get(y, x), self.canvas.get(y, x)) {
                (Some(t), Some(c)) => t.distance_sq(*c),
                _ => 0,
            };
            if best_error.is_none_or(|best_error| error > best_error) {
                best = (x, y);
                best_error = Some(error);
            }
        }
        Point::new(best.0 as Scalar + 0.5, best.1 as Scalar + 0.5)
    }

    /// Generate random shape of one of the enabled kinds around a high error pixel
    pub fn random_shape<R: Rng>(&self, rng: &mut R) -> ShapeGenome {
        let kind = match self.kinds.len() {
            0 => ShapeKind::Ellipse,
            count => self.kinds[rng.random_range(0..count)],
        };
        let center = self.seed_point(rng);
        ShapeGenome::random(rng, kind, center, &self.limits)
    }

    /// Run the search: best of random starts refined by hill-climbing
    pub fn run<R: Rng>(mut self, rng: &mut R) -> SearchResult {
        let mut best: Option<Candidate> = None;
        for _ in 0..self.config.restarts.max(1) {
            let shape = self.random_shape(rng);
            if let Some(candidate) = self.evaluate(shape) {
                if best.as_ref().is_none_or(|best| candidate.delta < best.delta) {
                    best = Some(candidate);
                }
            }
        }

        let mut accepted = 0;
        if let Some(mut incumbent) = best.take() {
            for iteration in 0..self.config.iterations {
                let scale = self.config.annealing(iteration);
                let steps = &self.config.steps;
                let shape = incumbent.shape.mutate(rng, &self.limits, steps, scale);
                if let Some(candidate) = self.evaluate(shape) {
                    if candidate.delta < incumbent.delta {
                        incumbent = candidate;
                        accepted += 1;
                    }
                }
            }
            best = Some(incumbent);
        }

        tracing::trace!(
            "[search] evaluations={} accepted={} delta={:?}",
            self.evaluations,
            accepted,
            best.as_ref().map(|best| best.delta)
        );
        let (shape, delta) = match best {
            Some(best) if best.delta <= 0.0 => (best.shape, best.delta),
            // nothing improves the canvas, slot is filled with an invisible shape
            Some(best) => (best.shape.transparent(), 0.0),
            None => (self.random_shape(rng).transparent(), 0.0),
        };
        SearchResult {
            shape,
            delta,
            evaluations: self.evaluations,
            accepted,
        }
    }
}
