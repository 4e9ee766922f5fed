//! Parametric shape primitives and their rasterization table
use crate::{
    BBox, Color, Coverage, ImageMut, PI, PixelRect, Point, RGBA, Scalar, Transform,
    rasterize::rasterize_outline, utils::clamp,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Minimal alpha of a searched shape (out of 255)
pub const MIN_ALPHA: u8 = 10;
/// Alpha range of freshly generated shapes
const INITIAL_ALPHA: (Scalar, Scalar) = (10.0, 200.0);
/// Smallest radius (or half-width) a mutation can shrink to
const MIN_EXTENT: Scalar = 0.5;

/// Kind of the shape primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Ellipse,
    Polygon,
    Line,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 3] = [ShapeKind::Ellipse, ShapeKind::Polygon, ShapeKind::Line];

    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Ellipse => "ellipse",
            ShapeKind::Polygon => "polygon",
            ShapeKind::Line => "line",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShapeKind {
    type Err = crate::Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        ShapeKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| crate::Error::validation(format!("unknown shape kind: {:?}", name)))
    }
}

/// Geometry of the shape in pixel coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Ellipse with radii `rx`, `ry` rotated by `angle` (radians, clockwise on screen)
    Ellipse {
        center: Point,
        rx: Scalar,
        ry: Scalar,
        angle: Scalar,
    },
    /// Closed polygon, filled with non-zero rule
    Polygon { points: Vec<Point> },
    /// Straight segment of the given width with butt ends
    Line { from: Point, to: Point, width: Scalar },
}

impl Geometry {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Geometry::Ellipse { .. } => ShapeKind::Ellipse,
            Geometry::Polygon { .. } => ShapeKind::Polygon,
            Geometry::Line { .. } => ShapeKind::Line,
        }
    }

    /// Closed outline approximating the geometry, empty for degenerate geometry
    pub fn outline(&self) -> Vec<Point> {
        match self {
            Geometry::Ellipse {
                center,
                rx,
                ry,
                angle,
            } => {
                let (rx, ry) = (*rx, *ry);
                if !(rx > 0.0 && ry > 0.0 && rx.is_finite() && ry.is_finite()) {
                    return Vec::new();
                }
                let tr = Transform::identity()
                    .translate(center.x(), center.y())
                    .rotate(*angle)
                    .scale(rx, ry);
                // keeps distance between outline and the true ellipse well below a pixel
                let count = clamp((rx.max(ry).sqrt() * 8.0).ceil(), 12.0, 256.0) as usize;
                (0..count)
                    .map(|index| {
                        let (sin, cos) = (2.0 * PI * index as Scalar / count as Scalar).sin_cos();
                        tr.apply(Point::new(cos, sin))
                    })
                    .collect()
            }
            Geometry::Polygon { points } => points.clone(),
            Geometry::Line { from, to, width } => {
                if !(*width > 0.0) {
                    return Vec::new();
                }
                let normal = match (*to - *from).normal().normalize() {
                    Some(normal) => (width / 2.0) * normal,
                    None => return Vec::new(),
                };
                vec![*from + normal, *to + normal, *to - normal, *from - normal]
            }
        }
    }
}

/// Parameters of a single shape: geometry, fill color and opacity
///
/// Opacity is kept in the alpha channel of the color.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeGenome {
    geometry: Geometry,
    color: RGBA,
}

impl ShapeGenome {
    pub fn new(geometry: Geometry, color: RGBA) -> Self {
        Self { geometry, color }
    }

    pub fn ellipse(center: impl Into<Point>, rx: Scalar, ry: Scalar, angle: Scalar) -> Self {
        let geometry = Geometry::Ellipse {
            center: center.into(),
            rx,
            ry,
            angle,
        };
        Self::new(geometry, RGBA::BLACK)
    }

    pub fn polygon(points: impl IntoIterator<Item = Point>) -> Self {
        let geometry = Geometry::Polygon {
            points: points.into_iter().collect(),
        };
        Self::new(geometry, RGBA::BLACK)
    }

    pub fn line(from: impl Into<Point>, to: impl Into<Point>, width: Scalar) -> Self {
        let geometry = Geometry::Line {
            from: from.into(),
            to: to.into(),
            width,
        };
        Self::new(geometry, RGBA::BLACK)
    }

    pub fn kind(&self) -> ShapeKind {
        self.geometry.kind()
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Fill color (alpha channel holds the opacity)
    pub fn color(&self) -> RGBA {
        self.color
    }

    /// Opacity in `[0, 1]`
    pub fn opacity(&self) -> Scalar {
        self.color.opacity()
    }

    /// Same geometry with a different fill color, opacity is preserved
    pub fn with_color(&self, color: RGBA) -> Self {
        Self {
            geometry: self.geometry.clone(),
            color: RGBA::new(color.red(), color.green(), color.blue(), self.color.alpha()),
        }
    }

    /// Same shape with a different opacity
    pub fn with_opacity(&self, opacity: Scalar) -> Self {
        Self {
            geometry: self.geometry.clone(),
            color: self.color.with_alpha(opacity),
        }
    }

    /// Fully transparent version of the shape, it never changes the canvas
    pub fn transparent(&self) -> Self {
        self.with_opacity(0.0)
    }

    /// Bounding box of the outline, `None` for degenerate geometry
    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(self.geometry.outline())
    }

    /// Coverage of the shape clipped to `bounds`
    ///
    /// Transparent, zero area, non-finite or out of bounds shapes produce empty coverage.
    pub fn rasterize(&self, bounds: PixelRect) -> Coverage {
        if self.color.alpha() == 0 {
            return Coverage::empty();
        }
        rasterize_outline(&self.geometry.outline(), bounds)
    }

    /// Generate random shape of the given kind around `center`
    pub fn random<R: Rng>(
        rng: &mut R,
        kind: ShapeKind,
        center: Point,
        limits: &ShapeLimits,
    ) -> Self {
        let size = limits.seed_size.min(limits.max_size).max(1.0);
        let geometry = match kind {
            ShapeKind::Ellipse => Geometry::Ellipse {
                center,
                rx: uniform(rng, 1.0, size),
                ry: uniform(rng, 1.0, size),
                angle: uniform(rng, 0.0, PI),
            },
            ShapeKind::Polygon => {
                let count = rng.random_range(3..=limits.max_vertices.max(3));
                let points = (0..count)
                    .map(|_| {
                        let offset = Point::new(jitter(rng, size), jitter(rng, size));
                        limits.clamp(center + offset)
                    })
                    .collect();
                Geometry::Polygon { points }
            }
            ShapeKind::Line => {
                let (sin, cos) = uniform(rng, 0.0, PI).sin_cos();
                let half = uniform(rng, 1.0, size);
                let dir = Point::new(half * cos, half * sin);
                Geometry::Line {
                    from: limits.clamp(center - dir),
                    to: limits.clamp(center + dir),
                    width: uniform(rng, 1.0, (size / 2.0).max(1.0)),
                }
            }
        };
        let alpha = uniform(rng, INITIAL_ALPHA.0, INITIAL_ALPHA.1) as u8;
        Self::new(geometry, RGBA::new(0, 0, 0, alpha))
    }

    /// Produce a copy with a single parameter changed by a bounded random delta
    ///
    /// `scale` in `[0, 1]` shrinks the deltas as the search progresses.
    pub fn mutate<R: Rng>(
        &self,
        rng: &mut R,
        limits: &ShapeLimits,
        steps: &MutationSteps,
        scale: Scalar,
    ) -> Self {
        let mut color = self.color;
        let geometry = match &self.geometry {
            Geometry::Ellipse {
                center,
                rx,
                ry,
                angle,
            } => {
                let (mut center, mut rx, mut ry, mut angle) = (*center, *rx, *ry, *angle);
                let extent_max =
                    |limit: usize| (limit as Scalar).min(limits.max_size).max(MIN_EXTENT);
                match rng.random_range(0..6) {
                    0 => {
                        let dx = jitter(rng, steps.position) * scale;
                        center = limits.clamp(center + Point::new(dx, 0.0));
                    }
                    1 => {
                        let dy = jitter(rng, steps.position) * scale;
                        center = limits.clamp(center + Point::new(0.0, dy));
                    }
                    2 => {
                        let dr = jitter(rng, steps.size) * scale;
                        rx = clamp(rx + dr, MIN_EXTENT, extent_max(limits.width));
                    }
                    3 => {
                        let dr = jitter(rng, steps.size) * scale;
                        ry = clamp(ry + dr, MIN_EXTENT, extent_max(limits.height));
                    }
                    4 => angle = (angle + jitter(rng, steps.angle) * scale).rem_euclid(PI),
                    _ => color = mutate_alpha(color, jitter(rng, steps.alpha) * scale),
                }
                Geometry::Ellipse {
                    center,
                    rx,
                    ry,
                    angle,
                }
            }
            Geometry::Polygon { points } => {
                let mut points = points.clone();
                let index = rng.random_range(0..=points.len());
                match points.get(index).copied() {
                    Some(point) => {
                        let offset = Point::new(
                            jitter(rng, steps.position),
                            jitter(rng, steps.position),
                        );
                        let moved = point + scale * offset;
                        // keep vertex close to the rest of the polygon
                        let count = points.len() as Scalar;
                        let centroid = points
                            .iter()
                            .fold(Point::new(0.0, 0.0), |acc, point| acc + *point)
                            / count;
                        let reach = Point::new(limits.max_size, limits.max_size);
                        let moved = Point::new(
                            clamp(moved.x(), centroid.x() - reach.x(), centroid.x() + reach.x()),
                            clamp(moved.y(), centroid.y() - reach.y(), centroid.y() + reach.y()),
                        );
                        points[index] = limits.clamp(moved);
                    }
                    None => color = mutate_alpha(color, jitter(rng, steps.alpha) * scale),
                }
                Geometry::Polygon { points }
            }
            Geometry::Line { from, to, width } => {
                let (mut from, mut to, mut width) = (*from, *to, *width);
                let max_length = 2.0 * limits.max_size;
                match rng.random_range(0..4) {
                    0 => {
                        let offset = Point::new(jitter(rng, 1.0), jitter(rng, 1.0));
                        let moved = from + (steps.position * scale) * offset;
                        from = limits.clamp(restrict_length(to, moved, max_length));
                    }
                    1 => {
                        let offset = Point::new(jitter(rng, 1.0), jitter(rng, 1.0));
                        let moved = to + (steps.position * scale) * offset;
                        to = limits.clamp(restrict_length(from, moved, max_length));
                    }
                    2 => {
                        let dw = jitter(rng, steps.size) * scale;
                        let min_width = 2.0 * MIN_EXTENT;
                        width = clamp(width + dw, min_width, limits.max_size.max(min_width));
                    }
                    _ => color = mutate_alpha(color, jitter(rng, steps.alpha) * scale),
                }
                Geometry::Line { from, to, width }
            }
        };
        Self { geometry, color }
    }
}

/// Canvas and size limits for generated shapes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeLimits {
    /// Canvas width in pixels
    pub width: usize,
    /// Canvas height in pixels
    pub height: usize,
    /// Maximal radius (half extent) of a shape
    pub max_size: Scalar,
    /// Maximal initial radius of a generated shape
    pub seed_size: Scalar,
    /// Maximal number of polygon vertices
    pub max_vertices: usize,
}

impl ShapeLimits {
    /// Restrict point to the canvas
    pub fn clamp(&self, point: Point) -> Point {
        point.clamp_to(self.width as Scalar, self.height as Scalar)
    }
}

/// Maximal absolute deltas applied by a single mutation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MutationSteps {
    /// Position delta in pixels
    pub position: Scalar,
    /// Radius or width delta in pixels
    pub size: Scalar,
    /// Rotation delta in radians
    pub angle: Scalar,
    /// Alpha delta in `0..255` units
    pub alpha: Scalar,
}

impl Default for MutationSteps {
    fn default() -> Self {
        Self {
            position: 16.0,
            size: 8.0,
            angle: 0.5,
            alpha: 30.0,
        }
    }
}

/// Blend `color` (with its alpha as opacity) over `dst` with the given coverage
#[inline]
pub(crate) fn blend_pixel(dst: RGBA, color: RGBA, coverage: Scalar) -> RGBA {
    dst.lerp(color.opaque(), color.opacity() * clamp(coverage, 0.0, 1.0))
}

/// Composite shape onto the canvas in place using alpha-over blending
pub fn composite(canvas: &mut impl ImageMut<Pixel = RGBA>, shape: &ShapeGenome) {
    let coverage = shape.rasterize(PixelRect::full(canvas.size()));
    composite_coverage(canvas, shape.color(), &coverage);
}

/// Composite already rasterized coverage onto the canvas
pub fn composite_coverage(
    canvas: &mut impl ImageMut<Pixel = RGBA>,
    color: RGBA,
    coverage: &Coverage,
) {
    for (y, x0, row) in coverage.rows() {
        let pixels = canvas.row_mut(y, x0, x0 + row.len());
        for (pixel, value) in pixels.iter_mut().zip(row) {
            if *value > 0.0 {
                *pixel = blend_pixel(*pixel, color, *value);
            }
        }
    }
}

/// Uniform sample from `[low, high)`, returns `low` for an empty range
fn uniform<R: Rng>(rng: &mut R, low: Scalar, high: Scalar) -> Scalar {
    let t: Scalar = rng.random();
    if high > low { low + (high - low) * t } else { low }
}

/// Uniform sample from `[-range, range)`
fn jitter<R: Rng>(rng: &mut R, range: Scalar) -> Scalar {
    uniform(rng, -range, range)
}

fn mutate_alpha(color: RGBA, delta: Scalar) -> RGBA {
    let alpha = clamp(color.alpha() as Scalar + delta, MIN_ALPHA as Scalar, 255.0);
    RGBA::new(color.red(), color.green(), color.blue(), alpha.round() as u8)
}

/// Move `point` towards `anchor` so that the distance between them is at most `max_length`
fn restrict_length(anchor: Point, point: Point, max_length: Scalar) -> Point {
    let length = anchor.dist(point);
    if length <= max_length {
        point
    } else {
        anchor + (max_length / length) * (point - anchor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Image, ImageOwned, assert_approx_eq};
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn limits() -> ShapeLimits {
        ShapeLimits {
            width: 32,
            height: 24,
            max_size: 30.0,
            seed_size: 15.0,
            max_vertices: 5,
        }
    }

    #[test]
    fn test_ellipse_coverage() {
        let shape = ShapeGenome::ellipse((16.0, 12.0), 8.0, 4.0, 0.0);
        let coverage = shape.rasterize(PixelRect::new(0, 0, 32, 24));
        // area of the ellipse is `pi * rx * ry`, flattening looses a little
        let area = PI * 8.0 * 4.0;
        assert!((coverage.area() - area).abs() < 0.02 * area);
        assert_approx_eq!(coverage.get(16, 12), 1.0, 1e-9);
        assert_approx_eq!(coverage.get(16, 1), 0.0);
        assert_eq!(coverage.rect(), PixelRect::new(8, 8, 24, 16));

        // rotated by 90 degrees ellipse is tall
        let rotated = ShapeGenome::ellipse((16.0, 12.0), 8.0, 4.0, PI / 2.0);
        let coverage = rotated.rasterize(PixelRect::new(0, 0, 32, 24));
        assert_eq!(coverage.rect(), PixelRect::new(12, 4, 20, 20));
    }

    #[test]
    fn test_line_coverage() {
        let shape = ShapeGenome::line((2.0, 5.0), (12.0, 5.0), 2.0);
        let coverage = shape.rasterize(PixelRect::new(0, 0, 32, 24));
        assert_eq!(coverage.rect(), PixelRect::new(2, 4, 12, 6));
        assert_approx_eq!(coverage.area(), 20.0, 1e-9);
    }

    #[test]
    fn test_degenerate_shapes() {
        let bounds = PixelRect::new(0, 0, 32, 24);
        let shapes = [
            ShapeGenome::ellipse((4.0, 4.0), 0.0, 3.0, 0.0),
            ShapeGenome::ellipse((4.0, 4.0), Scalar::NAN, 3.0, 0.0),
            ShapeGenome::ellipse((100.0, 100.0), 3.0, 3.0, 0.0),
            ShapeGenome::ellipse((4.0, 4.0), 3.0, 3.0, 0.0).transparent(),
            ShapeGenome::line((1.0, 1.0), (1.0, 1.0), 3.0),
            ShapeGenome::line((1.0, 1.0), (5.0, 1.0), 0.0),
            ShapeGenome::polygon([Point::new(1.0, 1.0), Point::new(5.0, 5.0)]),
        ];
        for shape in shapes.iter() {
            assert_approx_eq!(shape.rasterize(bounds).area(), 0.0);
        }
    }

    #[test]
    fn test_composite() {
        let mut canvas = ImageOwned::new_filled(4, 4, RGBA::WHITE);
        let shape = ShapeGenome::polygon([
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ])
        .with_color(RGBA::new(0, 0, 255, 255));
        composite(&mut canvas, &shape);
        assert_eq!(canvas.get(0, 0), Some(&RGBA::new(0, 0, 255, 255)));
        assert_eq!(canvas.get(1, 1), Some(&RGBA::new(0, 0, 255, 255)));
        assert_eq!(canvas.get(2, 2), Some(&RGBA::WHITE));

        let half = shape.with_opacity(0.5).with_color(RGBA::BLACK);
        composite(&mut canvas, &half);
        assert_eq!(canvas.get(0, 0), Some(&RGBA::new(0, 0, 127, 255)));
    }

    #[test]
    fn test_random_and_mutate_stay_in_limits() {
        let limits = limits();
        let steps = MutationSteps::default();
        let mut rng = Pcg32::seed_from_u64(7);
        for kind in ShapeKind::ALL {
            let mut shape = ShapeGenome::random(&mut rng, kind, Point::new(10.0, 10.0), &limits);
            assert_eq!(shape.kind(), kind);
            for _ in 0..200 {
                shape = shape.mutate(&mut rng, &limits, &steps, 1.0);
                assert_eq!(shape.kind(), kind);
                assert!(shape.color().alpha() >= MIN_ALPHA);
                match shape.geometry() {
                    Geometry::Ellipse { center, rx, ry, .. } => {
                        assert!(center.x() >= 0.0 && center.x() <= 32.0);
                        assert!(center.y() >= 0.0 && center.y() <= 24.0);
                        assert!(*rx >= MIN_EXTENT && *rx <= 30.0);
                        assert!(*ry >= MIN_EXTENT && *ry <= 24.0);
                    }
                    Geometry::Polygon { points } => {
                        assert!((3..=5).contains(&points.len()));
                        for point in points {
                            assert!(point.x() >= 0.0 && point.x() <= 32.0);
                            assert!(point.y() >= 0.0 && point.y() <= 24.0);
                        }
                    }
                    Geometry::Line { from, to, width } => {
                        assert!(from.dist(*to) <= 60.0 + 1e-9);
                        assert!(*width >= 1.0 && *width <= 30.0);
                    }
                }
            }
        }
    }

    #[test]
    fn test_mutation_is_deterministic() {
        let limits = limits();
        let steps = MutationSteps::default();
        let run = || {
            let mut rng = Pcg32::seed_from_u64(42);
            let mut shape =
                ShapeGenome::random(&mut rng, ShapeKind::Ellipse, Point::new(5.0, 5.0), &limits);
            for _ in 0..50 {
                shape = shape.mutate(&mut rng, &limits, &steps, 0.5);
            }
            shape
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("Polygon".parse::<ShapeKind>().ok(), Some(ShapeKind::Polygon));
        assert!("circle".parse::<ShapeKind>().is_err());
        assert_eq!(ShapeKind::Line.to_string(), "line");
    }
}
