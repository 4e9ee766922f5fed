//! Incremental optimization session
//!
//! Session owns the target image, the canvas and the list of committed shapes. Work
//! is done in bounded units by [`Session::advance_by`], so a host can interleave it
//! with rendering or cancellation checks.
use crate::{
    Error, FidelityMode, Image, ImageOwned, RGBA, RawImage, Raster, Scalar, SearchConfig,
    difference::{Region, score},
    export::Sketch,
    search::{Search, SearchResult},
    shape::{ShapeGenome, ShapeKind, composite},
};
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// More shapes can be committed
    Active,
    /// Target shape count is reached, results can still be exported
    Done,
    /// Resources are released, nothing is allowed
    Disposed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Active => f.write_str("active"),
            SessionState::Done => f.write_str("done"),
            SessionState::Disposed => f.write_str("disposed"),
        }
    }
}

/// Initial color of the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Background {
    /// Average color of the target image
    #[default]
    Average,
    /// Fixed color
    Color(RGBA),
}

/// Session construction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub mode: FidelityMode,
    /// Seed of the random number generator, same seed produces same results
    pub seed: u64,
    pub background: Background,
    /// Shape kinds the search is allowed to use
    pub kinds: Vec<ShapeKind>,
}

impl SessionConfig {
    pub fn new(mode: FidelityMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    pub fn with_background(self, background: Background) -> Self {
        Self { background, ..self }
    }

    pub fn with_kinds(self, kinds: impl IntoIterator<Item = ShapeKind>) -> Self {
        let mut kinds: Vec<_> = kinds.into_iter().collect();
        kinds.sort();
        kinds.dedup();
        Self { kinds, ..self }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: FidelityMode::default(),
            seed: 0,
            background: Background::default(),
            kinds: vec![ShapeKind::Ellipse],
        }
    }
}

/// Report about a single committed shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Zero based index of the committed shape
    pub index: usize,
    /// Target number of shapes
    pub target: usize,
    /// Score change caused by the shape
    pub delta: Scalar,
    /// Score of the canvas after the commit
    pub score: Scalar,
    /// Number of evaluated candidates
    pub evaluations: usize,
    /// Number of accepted hill-climb mutations
    pub accepted: usize,
}

/// Receives notifications about committed shapes
pub trait Observer {
    fn committed(&mut self, progress: &Progress, shape: &ShapeGenome);
}

impl<F> Observer for F
where
    F: FnMut(&Progress, &ShapeGenome),
{
    fn committed(&mut self, progress: &Progress, shape: &ShapeGenome) {
        (self)(progress, shape)
    }
}

struct Silent;

impl Observer for Silent {
    fn committed(&mut self, _progress: &Progress, _shape: &ShapeGenome) {}
}

/// Resources owned by a live session
struct Resources {
    target: Raster,
    canvas: Raster,
    background: RGBA,
    shapes: Vec<ShapeGenome>,
    search: SearchConfig,
    rng: Pcg32,
    /// Exact score of the canvas, maintained incrementally
    score: Scalar,
}

/// Optimizer session that incrementally approximates the target image with shapes
pub struct Session {
    config: SessionConfig,
    target_count: usize,
    committed: usize,
    state: SessionState,
    resources: Option<Resources>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("mode", &self.config.mode)
            .field("state", &self.state)
            .field("committed", &self.committed)
            .field("target", &self.target_count)
            .finish()
    }
}

impl Session {
    /// Create session with default configuration for the mode
    pub fn new(image: RawImage<'_>, target: usize, mode: FidelityMode) -> Result<Self, Error> {
        Self::with_config(image, target, SessionConfig::new(mode))
    }

    /// Create session, the canvas starts filled with the background color
    pub fn with_config(
        image: RawImage<'_>,
        target: usize,
        config: SessionConfig,
    ) -> Result<Self, Error> {
        if target == 0 {
            return Err(Error::validation("target shape count must be at least 1"));
        }
        if config.kinds.is_empty() {
            return Err(Error::validation("at least one shape kind must be enabled"));
        }
        let target_image = image.decode()?;
        let background = match config.background {
            Background::Average => target_image.average_color(),
            Background::Color(color) => color.opaque(),
        };
        let canvas = ImageOwned::new_filled(target_image.height(), target_image.width(), background);
        let score = score(&target_image, &canvas, Region::Full);
        tracing::debug!(
            "[session:new] {}x{} target={} mode={} background={}",
            target_image.width(),
            target_image.height(),
            target,
            config.mode,
            background
        );
        let resources = Resources {
            target: target_image,
            canvas,
            background,
            shapes: Vec::with_capacity(target),
            search: SearchConfig::for_mode(config.mode),
            rng: Pcg32::seed_from_u64(config.seed),
            score,
        };
        Ok(Self {
            config,
            target_count: target,
            committed: 0,
            state: SessionState::Active,
            resources: Some(resources),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == SessionState::Done
    }

    /// Number of committed shapes
    pub fn committed(&self) -> usize {
        self.committed
    }

    /// Target number of shapes
    pub fn target(&self) -> usize {
        self.target_count
    }

    pub fn mode(&self) -> FidelityMode {
        self.config.mode
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Number of shapes to request per [`Session::advance_by`] call
    pub fn recommended_unit_budget(&self) -> usize {
        self.config.mode.recommended_unit_budget()
    }

    fn resources(&self, operation: &'static str) -> Result<&Resources, Error> {
        self.resources.as_ref().ok_or(Error::IllegalState {
            operation,
            state: self.state,
        })
    }

    /// Current difference between the canvas and the target
    pub fn score(&self) -> Result<Scalar, Error> {
        Ok(self.resources("score")?.score)
    }

    /// Canvas pixels as RGBA8 bytes
    pub fn canvas_rgba(&self) -> Result<&[u8], Error> {
        Ok(self.resources("canvas")?.canvas.as_bytes())
    }

    /// Canvas image
    pub fn canvas(&self) -> Result<&Raster, Error> {
        Ok(&self.resources("canvas")?.canvas)
    }

    /// Committed shapes in commit order
    pub fn shapes(&self) -> Result<&[ShapeGenome], Error> {
        Ok(&self.resources("shapes")?.shapes)
    }

    /// Commit up to `budget` more shapes, returns `true` once the target count is reached
    pub fn advance_by(&mut self, budget: usize) -> Result<bool, Error> {
        self.advance_by_observed(budget, &mut Silent)
    }

    /// Same as [`Session::advance_by`] but reports every committed shape to the observer
    pub fn advance_by_observed(
        &mut self,
        budget: usize,
        observer: &mut dyn Observer,
    ) -> Result<bool, Error> {
        let state = self.state;
        let resources = match (state, self.resources.as_mut()) {
            (SessionState::Done, _) => return Ok(true),
            (SessionState::Active, Some(resources)) => resources,
            _ => {
                return Err(Error::IllegalState {
                    operation: "advance_by",
                    state,
                });
            }
        };
        let span = tracing::debug_span!("[advance]", budget, committed = self.committed);
        let _guard = span.enter();

        let count = budget.min(self.target_count - self.committed);
        for _ in 0..count {
            let index = self.committed;
            let progress = index as Scalar / self.target_count as Scalar;
            let SearchResult {
                shape,
                delta,
                evaluations,
                accepted,
            } = Search::new(
                &resources.target,
                &resources.canvas,
                &resources.search,
                &self.config.kinds,
                progress,
            )
            .run(&mut resources.rng);

            composite(&mut resources.canvas, &shape);
            resources.score += delta;
            tracing::debug!(
                "[commit] index={} kind={} delta={} score={} accepted={}",
                index,
                shape.kind(),
                delta,
                resources.score,
                accepted
            );
            let report = Progress {
                index,
                target: self.target_count,
                delta,
                score: resources.score,
                evaluations,
                accepted,
            };
            observer.committed(&report, &shape);
            resources.shapes.push(shape);
            self.committed += 1;
        }

        if self.committed >= self.target_count {
            self.state = SessionState::Done;
            tracing::info!(
                "[done] shapes={} score={}",
                self.committed,
                resources.score
            );
        }
        Ok(self.state == SessionState::Done)
    }

    /// Description of committed shapes, available in any state except disposed
    pub fn sketch(&self) -> Result<Sketch, Error> {
        let resources = self.resources("export")?;
        Ok(Sketch::new(
            resources.target.size(),
            resources.background,
            resources.shapes.iter(),
        ))
    }

    /// Serialize committed shapes into JSON document, see [`Sketch`]
    pub fn export(&self) -> Result<String, Error> {
        self.sketch()?.to_json()
    }

    /// Serialize committed shapes into Desmos graph state
    #[cfg(feature = "desmos")]
    pub fn export_desmos(&self) -> Result<String, Error> {
        crate::desmos::document(&self.sketch()?, self.config.seed).to_json()
    }

    /// Release all resources, the session cannot be used afterwards
    pub fn dispose(&mut self) -> Result<(), Error> {
        if self.state == SessionState::Disposed {
            return Err(Error::IllegalState {
                operation: "dispose",
                state: self.state,
            });
        }
        self.resources = None;
        self.state = SessionState::Disposed;
        tracing::debug!("[session:dispose] committed={}", self.committed);
        Ok(())
    }
}
