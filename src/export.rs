//! Serializable description of the committed shapes
use crate::{
    Point, RGBA, Scalar, Size,
    shape::{Geometry, ShapeGenome},
};
use serde::{Deserialize, Serialize};

/// Complete result of the optimization, enough to redraw it with any vector renderer
///
/// Shapes are listed in commit order and must be drawn bottom to top over the
/// background. Coordinates are in pixels of the target image, `y` axis points down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sketch {
    pub width: usize,
    pub height: usize,
    pub background: RGBA,
    pub shapes: Vec<ShapeRecord>,
}

impl Sketch {
    pub fn new<'a>(
        size: Size,
        background: RGBA,
        shapes: impl IntoIterator<Item = &'a ShapeGenome>,
    ) -> Self {
        Self {
            width: size.width,
            height: size.height,
            background: background.opaque(),
            shapes: shapes.into_iter().map(ShapeRecord::from).collect(),
        }
    }

    pub fn size(&self) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }

    /// Width divided by height
    pub fn aspect(&self) -> Scalar {
        if self.height == 0 {
            return 1.0;
        }
        self.width as Scalar / self.height as Scalar
    }

    /// Shapes that are visible (non-zero opacity)
    pub fn visible(&self) -> impl Iterator<Item = &ShapeRecord> + '_ {
        self.shapes.iter().filter(|shape| shape.opacity() > 0.0)
    }

    /// Serialize into JSON document
    pub fn to_json(&self) -> Result<String, crate::Error> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse sketch from JSON document
    pub fn from_json(json: &str) -> Result<Self, crate::Error> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Single exported shape, `color` is opaque and the opacity is stored separately
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ShapeRecord {
    Ellipse {
        cx: Scalar,
        cy: Scalar,
        rx: Scalar,
        ry: Scalar,
        /// Rotation in radians, clockwise on screen
        angle: Scalar,
        color: RGBA,
        opacity: Scalar,
    },
    Polygon {
        points: Vec<Point>,
        color: RGBA,
        opacity: Scalar,
    },
    Line {
        x1: Scalar,
        y1: Scalar,
        x2: Scalar,
        y2: Scalar,
        width: Scalar,
        color: RGBA,
        opacity: Scalar,
    },
}

impl ShapeRecord {
    pub fn color(&self) -> RGBA {
        match self {
            ShapeRecord::Ellipse { color, .. }
            | ShapeRecord::Polygon { color, .. }
            | ShapeRecord::Line { color, .. } => *color,
        }
    }

    pub fn opacity(&self) -> Scalar {
        match self {
            ShapeRecord::Ellipse { opacity, .. }
            | ShapeRecord::Polygon { opacity, .. }
            | ShapeRecord::Line { opacity, .. } => *opacity,
        }
    }
}

impl From<&ShapeGenome> for ShapeRecord {
    fn from(shape: &ShapeGenome) -> Self {
        let color = shape.color().opaque();
        let opacity = shape.opacity();
        match shape.geometry() {
            Geometry::Ellipse {
                center,
                rx,
                ry,
                angle,
            } => ShapeRecord::Ellipse {
                cx: center.x(),
                cy: center.y(),
                rx: *rx,
                ry: *ry,
                angle: *angle,
                color,
                opacity,
            },
            Geometry::Polygon { points } => ShapeRecord::Polygon {
                points: points.clone(),
                color,
                opacity,
            },
            Geometry::Line { from, to, width } => ShapeRecord::Line {
                x1: from.x(),
                y1: from.y(),
                x2: to.x(),
                y2: to.y(),
                width: *width,
                color,
                opacity,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_sketch_json() -> Result<(), Error> {
        let shapes = [
            ShapeGenome::ellipse((1.5, 2.0), 3.0, 4.0, 0.25).with_color(RGBA::new(255, 0, 0, 0)),
            ShapeGenome::line((0.0, 0.0), (4.0, 2.0), 1.5).transparent(),
        ];
        let size = Size {
            width: 8,
            height: 4,
        };
        let sketch = Sketch::new(size, RGBA::new(1, 2, 3, 255), shapes.iter());
        assert_eq!(sketch.aspect(), 2.0);
        assert_eq!(sketch.visible().count(), 1);

        let json = sketch.to_json()?;
        assert_eq!(
            json,
            concat!(
                r##"{"width":8,"height":4,"background":"#010203","shapes":["##,
                r##"{"kind":"ellipse","cx":1.5,"cy":2.0,"rx":3.0,"ry":4.0,"angle":0.25,"##,
                r##""color":"#ff0000","opacity":1.0},"##,
                r##"{"kind":"line","x1":0.0,"y1":0.0,"x2":4.0,"y2":2.0,"width":1.5,"##,
                r##""color":"#000000","opacity":0.0}]}"##,
            )
        );
        assert_eq!(Sketch::from_json(&json)?, sketch);
        Ok(())
    }

    #[test]
    fn test_polygon_record() {
        let shape = ShapeGenome::polygon([
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
        ])
        .with_opacity(0.5);
        match ShapeRecord::from(&shape) {
            ShapeRecord::Polygon {
                points,
                color,
                opacity,
            } => {
                assert_eq!(points.len(), 3);
                assert_eq!(color, RGBA::BLACK);
                assert_eq!(opacity, 128.0 / 255.0);
            }
            record => panic!("unexpected record: {:?}", record),
        }
    }
}
