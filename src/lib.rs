//! Incremental approximation of raster images with semi-transparent geometric shapes.
//!
//! Main features:
//!  - Anti-aliased rasterization of ellipses, polygons and thick lines
//!  - Exact and incremental difference metric
//!  - Stochastic hill-climb search with fidelity presets
//!  - Resumable session that does work in bounded units
//!  - JSON and Desmos graph exports
//!
//! ```no_run
//! use shapefit::{FidelityMode, RawImage, Session};
//!
//! # fn main() -> Result<(), shapefit::Error> {
//! let pixels = vec![255u8; 64 * 64 * 4];
//! let mut session = Session::new(RawImage::rgba8(64, 64, &pixels), 100, FidelityMode::Standard)?;
//! let budget = session.recommended_unit_budget();
//! while !session.advance_by(budget)? {}
//! println!("{}", session.export()?);
//! session.dispose()?;
//! # Ok(())
//! # }
//! ```

mod color;
#[cfg(feature = "desmos")]
pub mod desmos;
pub mod difference;
mod error;
mod export;
mod geometry;
mod image;
mod rasterize;
mod search;
mod session;
mod shape;
mod utils;

pub use color::{Color, ColorError, RGBA};
pub use error::Error;
pub use export::{ShapeRecord, Sketch};
pub use geometry::{BBox, EPSILON, PI, Point, Scalar, Transform, scalar_fmt};
pub use image::{Image, ImageMut, ImageOwned, PixelFormat, PixelRect, RawImage, Raster, Size};
pub use rasterize::{Coverage, rasterize_outline};
pub use search::{Candidate, FidelityMode, Search, SearchConfig, SearchResult};
pub use session::{
    Background, Observer, Progress, Session, SessionConfig, SessionState,
};
pub use shape::{
    Geometry, MIN_ALPHA, MutationSteps, ShapeGenome, ShapeKind, ShapeLimits, composite,
    composite_coverage,
};
