//! Desmos graphing calculator state document
//!
//! Graph uses `y` axis pointing up with the image fitted into `[-10, 10]` vertically
//! and centered around the origin, every shape becomes a filled inequality, polygon
//! or parametric segment inside of a hidden folder.
use crate::{
    Error, Point, RGBA, Scalar,
    export::{ShapeRecord, Sketch},
};
use rand::{Rng, SeedableRng, distr::Alphanumeric};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

const STATE_VERSION: i32 = 11;
const INSTRUCTIONS_ID: &str = "4";
const FOLDER_ID: &str = "8";
const FOLDER_TITLE: &str = "Image";
const BACKGROUND_ID: &str = "10";
const MIN_SHAPE_ID: usize = 20;
/// Half height of the viewport in graph units
const HALF_EXTENT: Scalar = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesmosState {
    pub version: i32,
    pub random_seed: String,
    pub graph: GraphSettings,
    pub expressions: ExpressionList,
    pub include_function_parameters_in_random_seed: bool,
    pub do_not_migrate_movable_point_style: bool,
}

impl DesmosState {
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSettings {
    pub viewport: Viewport,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub xmin: Scalar,
    pub ymin: Scalar,
    pub xmax: Scalar,
    pub ymax: Scalar,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionList {
    pub list: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Expression {
    Expression(ExpressionData),
    Text(TextData),
    Folder(FolderData),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextData {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderData {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub hidden: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub collapsed: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionData {
    pub id: String,
    pub color: String,
    pub latex: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_opacity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_width: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parametric_domain: Option<Domain>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub min: String,
    pub max: String,
}

/// Mapping from image pixels to graph coordinates
#[derive(Debug, Clone, Copy)]
struct GraphMap {
    width: Scalar,
    height: Scalar,
    aspect: Scalar,
}

impl GraphMap {
    fn new(sketch: &Sketch) -> Self {
        Self {
            width: sketch.width.max(1) as Scalar,
            height: sketch.height.max(1) as Scalar,
            aspect: sketch.aspect(),
        }
    }

    fn viewport(&self) -> Viewport {
        let xmax = HALF_EXTENT * self.aspect;
        Viewport {
            xmin: -xmax,
            ymin: -HALF_EXTENT,
            xmax,
            ymax: HALF_EXTENT,
        }
    }

    fn point(&self, point: Point) -> Point {
        let extent = 2.0 * HALF_EXTENT;
        Point::new(
            (point.x() / self.width) * extent * self.aspect - HALF_EXTENT * self.aspect,
            -((point.y() / self.height) * extent - HALF_EXTENT),
        )
    }

    fn length(&self, length: Scalar) -> Scalar {
        length * 2.0 * HALF_EXTENT / self.height
    }
}

/// Format number for latex rounded to three decimal places
fn num(value: Scalar) -> String {
    let value = (value * 1000.0).round() / 1000.0;
    // avoid negative zero
    let value = if value == 0.0 || !value.is_finite() {
        0.0
    } else {
        value
    };
    let mut buffer = [0u8; lexical_core::BUFFER_SIZE];
    let digits = lexical_core::write(value, &mut buffer);
    String::from_utf8_lossy(digits).into_owned()
}

fn latex_point(point: Point) -> String {
    format!(r"\left({},{}\right)", num(point.x()), num(point.y()))
}

fn latex_polygon(points: impl IntoIterator<Item = Point>) -> String {
    let mut latex = String::from(r"\operatorname{polygon}\left(");
    for (index, point) in points.into_iter().enumerate() {
        if index != 0 {
            latex.push(',');
        }
        latex.push_str(&latex_point(point));
    }
    latex.push_str(r"\right)");
    latex
}

fn latex_ellipse(center: Point, rx: Scalar, ry: Scalar, angle: Scalar) -> String {
    let (sin, cos) = angle.sin_cos();
    let (cx, cy, c, s) = (num(center.x()), num(center.y()), num(cos), num(sin));
    format!(
        concat!(
            r"\frac{{\left(\left(x-{cx}\right)\cdot{c}+\left(y-{cy}\right)\cdot{s}\right)^{{2}}}}{{{rx}^{{2}}}}",
            r"+\frac{{\left(\left(x-{cx}\right)\cdot{s}-\left(y-{cy}\right)\cdot{c}\right)^{{2}}}}{{{ry}^{{2}}}}\le1",
        ),
        cx = cx,
        cy = cy,
        c = c,
        s = s,
        rx = num(rx),
        ry = num(ry),
    )
}

fn latex_segment(from: Point, to: Point) -> String {
    format!(
        r"\left(\left(1-t\right)\cdot{x1}+t\cdot{x2},\left(1-t\right)\cdot{y1}+t\cdot{y2}\right)",
        x1 = num(from.x()),
        x2 = num(to.x()),
        y1 = num(from.y()),
        y2 = num(to.y()),
    )
}

fn hex(color: RGBA) -> String {
    color.opaque().to_string()
}

fn shape_expression(id: usize, shape: &ShapeRecord, map: &GraphMap) -> ExpressionData {
    let mut data = ExpressionData {
        id: id.to_string(),
        color: hex(shape.color()),
        folder_id: Some(FOLDER_ID.to_string()),
        ..Default::default()
    };
    let opacity = format!("{:.3}", shape.opacity());
    match shape {
        ShapeRecord::Ellipse {
            cx,
            cy,
            rx,
            ry,
            angle,
            ..
        } => {
            let center = map.point(Point::new(*cx, *cy));
            // `y` axis is flipped, so is the direction of rotation
            data.latex = latex_ellipse(center, map.length(*rx), map.length(*ry), -angle);
            data.fill = Some(true);
            data.lines = Some(false);
            data.fill_opacity = Some(opacity);
            data.line_width = Some("0".to_string());
        }
        ShapeRecord::Polygon { points, .. } => {
            data.latex = latex_polygon(points.iter().map(|point| map.point(*point)));
            data.fill = Some(true);
            data.lines = Some(false);
            data.fill_opacity = Some(opacity);
            data.line_width = Some("0".to_string());
        }
        ShapeRecord::Line {
            x1,
            y1,
            x2,
            y2,
            width,
            ..
        } => {
            let from = map.point(Point::new(*x1, *y1));
            let to = map.point(Point::new(*x2, *y2));
            data.latex = latex_segment(from, to);
            data.lines = Some(true);
            data.line_opacity = Some(opacity);
            // line width is measured in screen pixels, image pixels are the closest match
            data.line_width = Some(num(*width));
            data.parametric_domain = Some(Domain {
                min: "0".to_string(),
                max: "1".to_string(),
            });
        }
    }
    data
}

/// Random seed string of the graph derived from the session seed
fn random_seed(seed: u64) -> String {
    Pcg32::seed_from_u64(seed)
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Build Desmos state document for the sketch
pub fn document(sketch: &Sketch, seed: u64) -> DesmosState {
    let map = GraphMap::new(sketch);
    let viewport = map.viewport();

    let mut list = vec![
        Expression::Text(TextData {
            id: INSTRUCTIONS_ID.to_string(),
            text: "Unhide the folder to see the image (may be laggy)".to_string(),
        }),
        Expression::Folder(FolderData {
            id: FOLDER_ID.to_string(),
            title: FOLDER_TITLE.to_string(),
            hidden: true,
            collapsed: true,
        }),
    ];
    let corners = [
        Point::new(viewport.xmin, viewport.ymin),
        Point::new(viewport.xmax, viewport.ymin),
        Point::new(viewport.xmax, viewport.ymax),
        Point::new(viewport.xmin, viewport.ymax),
    ];
    list.push(Expression::Expression(ExpressionData {
        id: BACKGROUND_ID.to_string(),
        color: hex(sketch.background),
        latex: latex_polygon(corners),
        folder_id: Some(FOLDER_ID.to_string()),
        fill: Some(true),
        lines: Some(false),
        fill_opacity: Some("1".to_string()),
        line_width: Some("0".to_string()),
        ..Default::default()
    }));
    for (index, shape) in sketch.visible().enumerate() {
        let expr = shape_expression(MIN_SHAPE_ID + index, shape, &map);
        list.push(Expression::Expression(expr));
    }

    DesmosState {
        version: STATE_VERSION,
        random_seed: random_seed(seed),
        graph: GraphSettings { viewport },
        expressions: ExpressionList { list },
        include_function_parameters_in_random_seed: true,
        do_not_migrate_movable_point_style: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ShapeGenome, Size, assert_approx_eq};

    fn sketch() -> Sketch {
        let shapes = [
            ShapeGenome::ellipse((20.0, 5.0), 4.0, 2.0, 0.0)
                .with_color(RGBA::new(255, 0, 0, 255))
                .with_opacity(0.5),
            ShapeGenome::polygon([
                Point::new(0.0, 0.0),
                Point::new(40.0, 0.0),
                Point::new(40.0, 20.0),
            ]),
            ShapeGenome::line((0.0, 20.0), (40.0, 0.0), 2.0).transparent(),
            ShapeGenome::line((0.0, 10.0), (40.0, 10.0), 3.0),
        ];
        let size = Size {
            width: 40,
            height: 20,
        };
        Sketch::new(size, RGBA::WHITE, shapes.iter())
    }

    #[test]
    fn test_num() {
        assert_eq!(num(1.5), "1.5");
        assert_eq!(num(-0.125), "-0.125");
        assert_eq!(num(0.12345), "0.123");
        assert_eq!(num(-0.0001).parse::<Scalar>().ok(), Some(0.0));
        assert!(!num(-0.0001).starts_with('-'));
    }

    #[test]
    fn test_latex_ellipse() {
        let (one, zero) = (num(1.0), num(0.0));
        let (cx, cy, rx, ry) = (num(2.0), num(1.5), num(3.0), num(0.5));
        let expected = [
            format!(r"\frac{{\left(\left(x-{cx}\right)\cdot{one}+\left(y-{cy}\right)\cdot{zero}\right)^{{2}}}}"),
            format!(r"{{{rx}^{{2}}}}"),
            format!(r"+\frac{{\left(\left(x-{cx}\right)\cdot{zero}-\left(y-{cy}\right)\cdot{one}\right)^{{2}}}}"),
            format!(r"{{{ry}^{{2}}}}\le1"),
        ]
        .concat();
        assert_eq!(latex_ellipse(Point::new(2.0, 1.5), 3.0, 0.5, 0.0), expected);
    }

    #[test]
    fn test_graph_map() {
        let map = GraphMap::new(&sketch());
        let viewport = map.viewport();
        assert_approx_eq!(viewport.xmin, -20.0);
        assert_approx_eq!(viewport.xmax, 20.0);
        assert_approx_eq!(viewport.ymin, -10.0);
        // image corners map to viewport corners, `y` is flipped
        let top_left = map.point(Point::new(0.0, 0.0));
        assert_approx_eq!(top_left.x(), -20.0);
        assert_approx_eq!(top_left.y(), 10.0);
        let center = map.point(Point::new(20.0, 10.0));
        assert_approx_eq!(center.x(), 0.0);
        assert_approx_eq!(center.y(), 0.0);
        assert_approx_eq!(map.length(4.0), 4.0);
    }

    #[test]
    fn test_document() -> Result<(), Error> {
        let state = document(&sketch(), 7);
        assert_eq!(state.version, 11);
        assert_eq!(state.random_seed.len(), 32);
        assert_eq!(state.random_seed, document(&sketch(), 7).random_seed);
        assert_ne!(state.random_seed, document(&sketch(), 8).random_seed);

        // instructions, folder, background and three visible shapes
        let list = &state.expressions.list;
        assert_eq!(list.len(), 6);
        match &list[1] {
            Expression::Folder(folder) => {
                assert_eq!(folder.id, "8");
                assert!(folder.hidden && folder.collapsed);
            }
            expr => panic!("folder expected: {:?}", expr),
        }
        let ids: Vec<_> = list
            .iter()
            .filter_map(|expr| match expr {
                Expression::Expression(data) => Some(data.id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec!["10", "20", "21", "22"]);

        match &list[3] {
            Expression::Expression(data) => {
                assert_eq!(data.color, "#ff0000");
                assert_eq!(data.fill_opacity.as_deref(), Some("0.502"));
                assert!(data.latex.starts_with(r"\frac{\left(\left(x-0"));
                assert!(data.latex.contains(r"\left(y-5"));
                assert!(data.latex.ends_with(r"^{2}}\le1"));
            }
            expr => panic!("ellipse expected: {:?}", expr),
        }
        match &list[5] {
            Expression::Expression(data) => {
                assert!(data.latex.contains(r"\left(1-t\right)"));
                assert_eq!(data.lines, Some(true));
                assert_eq!(data.line_opacity.as_deref(), Some("1.000"));
                assert!(data.parametric_domain.is_some());
            }
            expr => panic!("segment expected: {:?}", expr),
        }

        let json = state.to_json()?;
        assert!(json.starts_with(r#"{"version":11,"randomSeed":""#));
        assert!(json.contains(r#""type":"folder""#));
        assert!(json.contains(r#""folderId":"8""#));
        assert!(json.contains(r#""parametricDomain":{"min":"0","max":"1"}"#));
        assert!(json.contains(r#""includeFunctionParametersInRandomSeed":true"#));
        Ok(())
    }
}
