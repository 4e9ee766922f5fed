//! Anti-aliased coverage of closed outlines
//!
//! Outline edges are accumulated into a signed difference mask (difference of coverage
//! between adjacent pixels of a row), which is integrated row by row with the non-zero
//! fill rule into the coverage fraction of every pixel.
use crate::{BBox, EPSILON, Image, ImageMut, ImageOwned, PixelRect, Point, Scalar, Size};

/// Coverage of a shape over a rectangular pixel region
///
/// Values are in `[0, 1]`, everything outside of the region is not covered.
#[derive(Debug, Clone, PartialEq)]
pub struct Coverage {
    rect: PixelRect,
    /// mask has two extra columns on the right that receive the spill over of edges
    mask: ImageOwned<Scalar>,
}

impl Coverage {
    /// Coverage that covers nothing
    pub fn empty() -> Self {
        Self {
            rect: PixelRect::default(),
            mask: ImageOwned::new_default(0, 0),
        }
    }

    /// Region (in image coordinates) outside of which coverage is zero
    pub fn rect(&self) -> PixelRect {
        self.rect
    }

    pub fn is_empty(&self) -> bool {
        self.rect.is_empty()
    }

    /// Coverage of the pixel at column `x` and row `y` in image coordinates
    pub fn get(&self, x: usize, y: usize) -> Scalar {
        let PixelRect { x0, y0, x1, y1 } = self.rect;
        if x < x0 || x >= x1 || y < y0 || y >= y1 {
            return 0.0;
        }
        self.mask.get(y - y0, x - x0).copied().unwrap_or(0.0)
    }

    /// Iterate over rows as `(y, x0, coverage)`, where `coverage[i]` belongs to column `x0 + i`
    pub fn rows(&self) -> impl Iterator<Item = (usize, usize, &[Scalar])> + '_ {
        let rect = self.rect;
        (rect.y0..rect.y1).map(move |y| (y, rect.x0, self.mask.row(y - rect.y0, 0, rect.width())))
    }

    /// Total covered area in pixels
    pub fn area(&self) -> Scalar {
        self.rows().map(|(_, _, row)| row.iter().sum::<Scalar>()).sum()
    }
}

/// Rasterize closed outline (last point is connected to the first one), clipped to `bounds`.
///
/// Outlines with less than three points, non-finite coordinates or no intersection with
/// the bounds produce empty coverage.
pub fn rasterize_outline(outline: &[Point], bounds: PixelRect) -> Coverage {
    if outline.len() < 3 || !outline.iter().all(|p| p.is_finite()) {
        return Coverage::empty();
    }
    let bbox = match BBox::from_points(outline.iter().copied()) {
        Some(bbox) => bbox,
        None => return Coverage::empty(),
    };
    let clip = Size {
        width: bounds.x1,
        height: bounds.y1,
    };
    let rect = PixelRect::from_bbox(bbox, clip).intersect(bounds);
    if rect.is_empty() {
        return Coverage::empty();
    }

    let mut mask = ImageOwned::new_default(rect.height(), rect.width() + 2);
    let origin = Point::new(rect.x0 as Scalar, rect.y0 as Scalar);
    let mut prev = outline[outline.len() - 1] - origin;
    for point in outline.iter() {
        let point = *point - origin;
        signed_difference_line(&mut mask, prev, point);
        prev = point;
    }
    signed_difference_to_mask(&mut mask);
    Coverage { rect, mask }
}

/// Update provided mask with the signed difference of the line
///
/// Signed difference is a difference between adjacent pixels introduced by the line.
fn signed_difference_line(mask: &mut ImageOwned<Scalar>, p0: Point, p1: Point) {
    // y - is a row
    // x - is a column
    let size = mask.size();
    // rightmost column that receives coverage, anything to the right of it is invisible
    let limit = size.width as Scalar - 2.0;
    if limit <= 0.0 {
        return;
    }

    // handle lines that are intersecting `x == limit`
    // - part to the right of the limit does not change visible pixels and is dropped
    let (p0, p1) = if p0.x() > limit || p1.x() > limit {
        if p0.x() > limit && p1.x() > limit {
            return;
        }
        let t = (p0.x() - limit) / (p0.x() - p1.x());
        let mid = Point::new(limit, (1.0 - t) * p0.y() + t * p1.y());
        if p0.x() < limit { (p0, mid) } else { (mid, p1) }
    } else {
        (p0, p1)
    };

    // handle lines that are intersecting `x == 0.0`
    // - line is splitted in left (for all points where x < 0.0) and the mid part
    // - left part is converted to a vertical line that spans same y's and x == 0.0
    // - left part is rasterized recursively, and mid part rasterized after this
    let (p0, p1) = if p0.x() < 0.0 || p1.x() < 0.0 {
        if p0.x() <= 0.0 && p1.x() <= 0.0 {
            signed_difference_line(mask, Point::new(0.0, p0.y()), Point::new(0.0, p1.y()));
            return;
        }
        let t = p0.x() / (p0.x() - p1.x());
        let mid = Point::new(0.0, (1.0 - t) * p0.y() + t * p1.y());
        if p1.x() > 0.0 {
            signed_difference_line(mask, Point::new(0.0, p0.y()), mid);
            (mid, p1)
        } else {
            signed_difference_line(mask, mid, Point::new(0.0, p1.y()));
            (p0, mid)
        }
    } else {
        (p0, p1)
    };

    if (p0.y() - p1.y()).abs() < EPSILON {
        // line does not introduce any signed converage
        return;
    }
    // always iterate from the point with the smallest y coordinate
    let (dir, p0, p1) = if p0.y() < p1.y() {
        (1.0, p0, p1)
    } else {
        (-1.0, p1, p0)
    };
    let dxdy = (p1.x() - p0.x()) / (p1.y() - p0.y());
    // find first point to trace. since we are going to interate over y's
    // we should pick min(y , p0.y) as a starting y point, and adjust x
    // accordingly
    let y_start = p0.y().max(0.0) as usize;
    let y_end = (p1.y().ceil().max(0.0) as usize).min(size.height);
    let mut x_next = if p0.y() < 0.0 {
        p0.x() - p0.y() * dxdy
    } else {
        p0.x()
    };
    for y in y_start..y_end {
        let row = mask.row_mut(y, 0, size.width);
        let x = x_next;
        let dy = ((y + 1) as Scalar).min(p1.y()) - (y as Scalar).max(p0.y());
        // signed y difference
        let d = dir * dy;
        // find next x position
        x_next = x + dxdy * dy;
        // order (x, x_next) from smaller value x0 to bigger x1
        let (x0, x1) = if x < x_next { (x, x_next) } else { (x_next, x) };
        // lower bound of effected x pixels
        let x0_floor = x0.floor().max(0.0);
        let x0i = x0_floor as usize;
        // upper bound of effected x pixels
        let x1_ceil = x1.ceil().max(0.0);
        let x1i = x1_ceil as usize;
        if x1i <= x0i + 1 {
            // only goes through one pixel (with the total coverage of `d` spread over two pixels)
            let xmf = 0.5 * (x + x_next) - x0_floor; // effective height
            add(row, x0i, d * (1.0 - xmf));
            add(row, x0i + 1, d * xmf);
        } else {
            let s = (x1 - x0).recip();
            let x0f = x0 - x0_floor; // fractional part of x0
            let x1f = x1 - x1_ceil + 1.0; // fractional part of x1
            let a0 = 0.5 * s * (1.0 - x0f) * (1.0 - x0f); // fractional area of the pixel with smallest x
            let am = 0.5 * s * x1f * x1f; // fractional area of the pixel with largest x
            add(row, x0i, d * a0);
            if x1i == x0i + 2 {
                // only two pixels are covered
                add(row, x0i + 1, d * (1.0 - a0 - am));
            } else {
                // second pixel
                let a1 = s * (1.5 - x0f);
                add(row, x0i + 1, d * (a1 - a0));
                // (second, last) pixels
                for xi in x0i + 2..x1i - 1 {
                    add(row, xi, d * s);
                }
                // last pixel
                let a2 = a1 + (x1i - x0i - 3) as Scalar * s;
                add(row, x1i - 1, d * (1.0 - a2 - am));
            }
            add(row, x1i, d * am)
        }
    }
}

/// Accumulate into a cell of the row, cells past the end of the row are ignored
#[inline]
fn add(row: &mut [Scalar], col: usize, value: Scalar) {
    if let Some(cell) = row.get_mut(col) {
        *cell += value;
    }
}

/// Integrate signed difference into coverage using non-zero fill rule
fn signed_difference_to_mask(mask: &mut ImageOwned<Scalar>) {
    let size = mask.size();
    for y in 0..size.height {
        let mut acc = 0.0;
        for cell in mask.row_mut(y, 0, size.width) {
            acc += *cell;
            let value = acc.abs();
            *cell = if value > 1.0 {
                1.0
            } else if value < 1e-6 {
                0.0
            } else {
                value
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;

    fn square(x0: Scalar, y0: Scalar, x1: Scalar, y1: Scalar) -> Vec<Point> {
        vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ]
    }

    #[test]
    fn test_signed_difference_line() {
        let mut mask = ImageOwned::new_default(2, 7);

        // line convers many columns but just one row
        signed_difference_line(&mut mask, Point::new(0.5, 1.0), Point::new(3.5, 0.0));
        // covered areas per-pixel
        let a0 = (0.5 * (1.0 / 6.0)) / 2.0;
        let a1 = ((1.0 / 6.0) + (3.0 / 6.0)) / 2.0;
        let a2 = ((3.0 / 6.0) + (5.0 / 6.0)) / 2.0;
        assert_approx_eq!(*mask.get(0, 0).unwrap(), -a0);
        assert_approx_eq!(*mask.get(0, 1).unwrap(), a0 - a1);
        assert_approx_eq!(*mask.get(0, 2).unwrap(), a1 - a2);
        assert_approx_eq!(*mask.get(0, 3).unwrap(), a0 - a1);
        assert_approx_eq!(*mask.get(0, 4).unwrap(), -a0);
        // total difference
        let a: Scalar = mask.data().iter().sum();
        assert_approx_eq!(a, -1.0);
        mask.fill(0.0);

        // out of bound line (intersects x = 0.0)
        signed_difference_line(&mut mask, Point::new(-1.0, 0.0), Point::new(1.0, 1.0));
        assert_approx_eq!(*mask.get(0, 0).unwrap(), 3.0 / 4.0);
        assert_approx_eq!(*mask.get(0, 1).unwrap(), 1.0 / 4.0);
        mask.fill(0.0);

        // multiple rows vertical
        signed_difference_line(&mut mask, Point::new(0.5, 0.5), Point::new(0.5, 1.75));
        assert_approx_eq!(*mask.get(0, 0).unwrap(), 1.0 / 4.0);
        assert_approx_eq!(*mask.get(0, 1).unwrap(), 1.0 / 4.0);
        assert_approx_eq!(*mask.get(1, 0).unwrap(), 3.0 / 8.0);
        assert_approx_eq!(*mask.get(1, 1).unwrap(), 3.0 / 8.0);
    }

    #[test]
    fn test_pixel_aligned_square() {
        let bounds = PixelRect::new(0, 0, 5, 5);
        let coverage = rasterize_outline(&square(1.0, 1.0, 3.0, 3.0), bounds);
        assert_eq!(coverage.rect(), PixelRect::new(1, 1, 3, 3));
        for y in 0..5 {
            for x in 0..5 {
                let expected = if (1..3).contains(&x) && (1..3).contains(&y) {
                    1.0
                } else {
                    0.0
                };
                assert_approx_eq!(coverage.get(x, y), expected);
            }
        }
        assert_approx_eq!(coverage.area(), 4.0);
    }

    #[test]
    fn test_half_pixel_square() {
        let bounds = PixelRect::new(0, 0, 4, 4);
        let coverage = rasterize_outline(&square(0.5, 0.5, 1.5, 1.5), bounds);
        assert_approx_eq!(coverage.get(0, 0), 0.25, 1e-9);
        assert_approx_eq!(coverage.get(1, 0), 0.25, 1e-9);
        assert_approx_eq!(coverage.get(0, 1), 0.25, 1e-9);
        assert_approx_eq!(coverage.get(1, 1), 0.25, 1e-9);
        assert_approx_eq!(coverage.get(2, 2), 0.0);
        assert_approx_eq!(coverage.area(), 1.0, 1e-9);
    }

    #[test]
    fn test_clipped_to_bounds() {
        let bounds = PixelRect::new(0, 0, 4, 3);
        // reversed orientation covers the same pixels
        let mut outline = square(-5.0, -5.0, 20.0, 20.0);
        outline.reverse();
        let coverage = rasterize_outline(&outline, bounds);
        assert_eq!(coverage.rect(), bounds);
        for (_, _, row) in coverage.rows() {
            assert_eq!(row.len(), 4);
            for value in row {
                assert_approx_eq!(*value, 1.0, 1e-9);
            }
        }
    }

    #[test]
    fn test_degenerate() {
        let bounds = PixelRect::new(0, 0, 4, 4);
        // zero area
        let line = [Point::new(0.0, 0.0), Point::new(2.0, 2.0), Point::new(1.0, 1.0)];
        assert_approx_eq!(rasterize_outline(&line, bounds).area(), 0.0, 1e-9);
        // not enough points
        assert!(rasterize_outline(&line[..2], bounds).is_empty());
        // out of bounds
        assert!(rasterize_outline(&square(10.0, 10.0, 12.0, 12.0), bounds).is_empty());
        // non-finite
        assert!(rasterize_outline(&square(0.0, 0.0, Scalar::NAN, 1.0), bounds).is_empty());
        assert_eq!(Coverage::empty().get(0, 0), 0.0);
    }
}
