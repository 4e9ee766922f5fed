//! Difference between the target image and the canvas
//!
//! The metric is the sum of squared `r`, `g` and `b` channel differences. It is
//! accumulated in integers, so it is exact, additive over disjoint regions and does
//! not depend on the order of evaluation.
use crate::{Coverage, Image, PixelRect, RGBA, Scalar, shape::blend_pixel, utils::clamp};

/// Region of the image over which difference is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    #[default]
    Full,
    Rect(PixelRect),
}

impl Region {
    fn resolve(self, width: usize, height: usize) -> PixelRect {
        let full = PixelRect::new(0, 0, width, height);
        match self {
            Region::Full => full,
            Region::Rect(rect) => rect.intersect(full),
        }
    }
}

impl From<PixelRect> for Region {
    fn from(rect: PixelRect) -> Self {
        Region::Rect(rect)
    }
}

/// Difference between two images over the region, lower is better
///
/// Region is clipped to the part both images have in common.
pub fn score<A, B>(a: &A, b: &B, region: Region) -> Scalar
where
    A: Image<Pixel = RGBA> + ?Sized,
    B: Image<Pixel = RGBA> + ?Sized,
{
    let rect = region.resolve(a.width().min(b.width()), a.height().min(b.height()));
    let mut total = 0u64;
    for y in rect.y0..rect.y1 {
        let row_a = a.row(y, rect.x0, rect.x1);
        let row_b = b.row(y, rect.x0, rect.x1);
        total += row_a
            .iter()
            .zip(row_b)
            .map(|(pa, pb)| pa.distance_sq(*pb) as u64)
            .sum::<u64>();
    }
    total as Scalar
}

/// Root mean square error per channel normalized to `[0, 1]`
pub fn rmse<A, B>(a: &A, b: &B) -> Scalar
where
    A: Image<Pixel = RGBA> + ?Sized,
    B: Image<Pixel = RGBA> + ?Sized,
{
    let count = a.width().min(b.width()) * a.height().min(b.height()) * 3;
    if count == 0 {
        return 0.0;
    }
    (score(a, b, Region::Full) / count as Scalar).sqrt() / 255.0
}

/// Change of the score caused by compositing `color` with the given coverage
///
/// Negative values are improvements. Only covered pixels are visited, the result is
/// exactly the difference of full scores before and after compositing.
pub fn shape_delta<T, C>(target: &T, canvas: &C, color: RGBA, coverage: &Coverage) -> Scalar
where
    T: Image<Pixel = RGBA> + ?Sized,
    C: Image<Pixel = RGBA> + ?Sized,
{
    let mut delta = 0i64;
    for (y, x0, row) in coverage.rows() {
        let x1 = x0 + row.len();
        let targets = target.row(y, x0, x1);
        let pixels = canvas.row(y, x0, x1);
        for ((value, target), pixel) in row.iter().zip(targets).zip(pixels) {
            if *value <= 0.0 {
                continue;
            }
            let blended = blend_pixel(*pixel, color, *value);
            delta += target.distance_sq(blended) as i64 - target.distance_sq(*pixel) as i64;
        }
    }
    delta as Scalar
}

/// Fill color minimizing the difference for a shape of the given opacity
///
/// Every covered pixel is blended with weight `w = opacity * coverage`, so the least
/// squares solution per channel is `sum(w * (t - c) + w^2 * c) / sum(w^2)`. Returned
/// color carries `opacity` in its alpha channel. Without coverage mid gray is returned.
pub fn optimal_color<T, C>(target: &T, canvas: &C, coverage: &Coverage, opacity: Scalar) -> RGBA
where
    T: Image<Pixel = RGBA> + ?Sized,
    C: Image<Pixel = RGBA> + ?Sized,
{
    let alpha = (clamp(opacity, 0.0, 1.0) * 255.0).round() as u8;
    let opacity = alpha as Scalar / 255.0;
    let mut numer = [0.0; 3];
    let mut denom = 0.0;
    for (y, x0, row) in coverage.rows() {
        let x1 = x0 + row.len();
        let targets = target.row(y, x0, x1);
        let pixels = canvas.row(y, x0, x1);
        for ((value, target), pixel) in row.iter().zip(targets).zip(pixels) {
            let weight = opacity * clamp(*value, 0.0, 1.0);
            if weight <= 0.0 {
                continue;
            }
            let t = [target.red(), target.green(), target.blue()];
            let c = [pixel.red(), pixel.green(), pixel.blue()];
            for index in 0..3 {
                let (t, c) = (t[index] as Scalar, c[index] as Scalar);
                numer[index] += weight * (t - c) + weight * weight * c;
            }
            denom += weight * weight;
        }
    }
    if denom < 1e-9 {
        return RGBA::new(128, 128, 128, alpha);
    }
    let [r, g, b] = numer.map(|value| clamp(value / denom, 0.0, 255.0).round() as u8);
    RGBA::new(r, g, b, alpha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ImageOwned, Point, ShapeGenome, assert_approx_eq, composite};

    fn gradient(width: usize, height: usize) -> ImageOwned<RGBA> {
        ImageOwned::new_with(height, width, |row, col| {
            RGBA::new((col * 17 % 256) as u8, (row * 29 % 256) as u8, ((row + col) * 7) as u8, 255)
        })
    }

    #[test]
    fn test_score() {
        let a = ImageOwned::new_filled(2, 3, RGBA::new(10, 0, 0, 255));
        let b = ImageOwned::new_filled(2, 3, RGBA::new(0, 0, 4, 255));
        assert_approx_eq!(score(&a, &b, Region::Full), 6.0 * 116.0);
        assert_approx_eq!(score(&a, &a, Region::Full), 0.0);
        assert_approx_eq!(score(&a, &b, PixelRect::new(1, 0, 3, 1).into()), 2.0 * 116.0);
        // region outside of images is ignored
        assert_approx_eq!(score(&a, &b, PixelRect::new(2, 1, 10, 10).into()), 116.0);
        assert_approx_eq!(rmse(&a, &a), 0.0);
        assert_approx_eq!(rmse(&a, &b), (116.0 / 3.0 as Scalar).sqrt() / 255.0);
    }

    #[test]
    fn test_score_is_additive() {
        let a = gradient(9, 7);
        let b = ImageOwned::new_filled(7, 9, RGBA::new(100, 50, 200, 255));
        let full = score(&a, &b, Region::Full);
        let parts = [
            PixelRect::new(0, 0, 4, 7),
            PixelRect::new(4, 0, 9, 3),
            PixelRect::new(4, 3, 9, 7),
        ];
        let sum: Scalar = parts.iter().map(|rect| score(&a, &b, Region::Rect(*rect))).sum();
        assert_eq!(full, sum);
    }

    #[test]
    fn test_delta_matches_composite() {
        let target = gradient(16, 12);
        let mut canvas = ImageOwned::new_filled(12, 16, RGBA::new(120, 120, 120, 255));
        let shapes = [
            ShapeGenome::ellipse((7.3, 5.1), 5.5, 3.2, 0.4).with_opacity(0.6),
            ShapeGenome::polygon([
                Point::new(-3.0, 2.0),
                Point::new(9.5, 0.5),
                Point::new(20.0, 11.0),
            ])
            .with_opacity(0.3),
            ShapeGenome::line((1.0, 11.0), (14.0, 1.5), 2.5).with_opacity(0.9),
        ];
        for shape in shapes.iter() {
            let coverage = shape.rasterize(PixelRect::new(0, 0, 16, 12));
            let color = optimal_color(&target, &canvas, &coverage, shape.opacity());
            let shape = shape.with_color(color);
            let before = score(&target, &canvas, Region::Full);
            let delta = shape_delta(&target, &canvas, shape.color(), &coverage);
            composite(&mut canvas, &shape);
            let after = score(&target, &canvas, Region::Full);
            assert_eq!(after - before, delta);
        }
    }

    #[test]
    fn test_optimal_color() {
        // opaque full coverage reproduces the target color
        let target = ImageOwned::new_filled(4, 4, RGBA::new(200, 30, 90, 255));
        let canvas = ImageOwned::new_filled(4, 4, RGBA::WHITE);
        let shape = ShapeGenome::polygon([
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 4.0),
        ]);
        let coverage = shape.rasterize(PixelRect::new(0, 0, 4, 4));
        let color = optimal_color(&target, &canvas, &coverage, 1.0);
        assert_eq!(color, RGBA::new(200, 30, 90, 255));

        // half transparent shape overshoots to reach the target, clamped to channel range
        let color = optimal_color(&target, &canvas, &coverage, 0.5);
        assert_eq!(color.alpha(), 128);
        assert_eq!(color.red(), 145);
        assert_eq!(color.green(), 0);
        assert!(shape_delta(&target, &canvas, color, &coverage) < 0.0);

        let empty = optimal_color(&target, &canvas, &Coverage::empty(), 0.5);
        assert_eq!(empty, RGBA::new(128, 128, 128, 128));
    }
}
