//! Geometry and fitting-glyph library.
//!
//! Everything here is a pure function of its inputs. Each fitting is described by a
//! hand-authored template of line segments in a local frame; the template is scaled,
//! optionally mirrored, rotated and translated into world space and returned as a list
//! of [`Primitive`]s for the renderer to style.

use crate::constants::{ANGLE_STEP, TEXT_ADVANCE_RATIO};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};
use std::ops::{Add, Mul, Neg, Sub};

/// A position or displacement in world space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `angle` (radians, y axis pointing down).
    pub fn from_angle(angle: f64) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Point) -> f64 {
        (other - self).length()
    }

    pub fn distance_sq(self, other: Point) -> f64 {
        let d = other - self;
        d.x * d.x + d.y * d.y
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Direction of the vector from `self` to `other`.
    pub fn angle_to(self, other: Point) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    pub fn rotate(self, angle: f64) -> Point {
        let (s, c) = angle.sin_cos();
        Point::new(self.x * c - self.y * s, self.x * s + self.y * c)
    }

    /// The point `distance` away from `self` along `angle`.
    pub fn offset(self, angle: f64, distance: f64) -> Point {
        self + Point::from_angle(angle) * distance
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Folds any angle into `(-π/2, π/2]` by adding or subtracting multiples of π.
///
/// Symmetric fittings are oriented with this so their glyph stays upright no matter
/// which of the two connector nodes was clicked first.
pub fn canonical_angle(angle: f64) -> f64 {
    let folded = angle.rem_euclid(PI);
    if folded > FRAC_PI_2 {
        folded - PI
    } else {
        folded
    }
}

/// Quantizes an angle to the nearest multiple of 45°. Exact ties go to the lower multiple.
pub fn snap_angle(angle: f64) -> f64 {
    let steps = angle / ANGLE_STEP;
    (steps - 0.5).ceil() * ANGLE_STEP
}

/// Computes the quantized end of a placement from `start` towards `pointer`.
///
/// The direction is always snapped to 45°. The length is `fixed_length` when the
/// fitting has a fixed footprint, otherwise the pointer's own distance.
/// Returns the endpoint and the snapped direction.
pub fn snapped_endpoint(start: Point, pointer: Point, fixed_length: Option<f64>) -> (Point, f64) {
    let angle = snap_angle(start.angle_to(pointer));
    let distance = fixed_length.unwrap_or_else(|| start.distance(pointer));
    (start.offset(angle, distance), angle)
}

/// Nominal radius of a fitting, used to stop label leader lines short of the glyph.
pub fn shape_radius(type_name: &str) -> f64 {
    match type_name {
        "socket" | "hojoValve" | "fixedCustom" => 20.0,
        "cheese" | "mcUnion" => 25.0,
        "elbow" => 15.0,
        "pipe" => 0.0,
        _ => 20.0,
    }
}

/// Estimated advance width of `text` at `size`.
pub fn text_width(text: &str, size: f64) -> f64 {
    text.chars().count() as f64 * size * TEXT_ADVANCE_RATIO
}

/// A world-space drawing primitive produced by a glyph.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// Straight stroked segment.
    Line(Point, Point),
    /// Stroked circle.
    Circle { center: Point, radius: f64 },
    /// Closed stroked outline.
    Polygon(Vec<Point>),
    /// Text centred on `center`, rotated by `angle`.
    Text {
        center: Point,
        text: String,
        size: f64,
        angle: f64,
    },
}

/// Maps a glyph's local frame into world space: scale, mirror on the local x axis,
/// rotate, then translate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphTransform {
    pub origin: Point,
    pub angle: f64,
    pub mirror: bool,
    pub scale: f64,
}

impl GlyphTransform {
    pub fn new(origin: Point, angle: f64) -> Self {
        Self {
            origin,
            angle,
            mirror: false,
            scale: 1.0,
        }
    }

    pub fn mirrored(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn scaled(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn apply(&self, local: Point) -> Point {
        let sx = if self.mirror { -self.scale } else { self.scale };
        self.origin + Point::new(local.x * sx, local.y * self.scale).rotate(self.angle)
    }

    fn segments<'a>(
        &'a self,
        template: &'a [[f64; 4]],
    ) -> impl Iterator<Item = Primitive> + 'a {
        template.iter().map(move |[x1, y1, x2, y2]| {
            Primitive::Line(
                self.apply(Point::new(*x1, *y1)),
                self.apply(Point::new(*x2, *y2)),
            )
        })
    }
}

const SOCKET_TEMPLATE: [[f64; 4]; 10] = [
    [-20.0, 0.0, 20.0, 0.0],
    [20.0, 0.0, 20.0, -20.0],
    [20.0, -20.0, 30.0, -20.0],
    [20.0, 0.0, 20.0, 20.0],
    [20.0, 20.0, 35.0, 20.0],
    [35.0, 20.0, 40.0, 20.0],
    [30.0, -20.0, 40.0, -20.0],
    [-20.0, -20.0, -20.0, 20.0],
    [-20.0, 20.0, -40.0, 20.0],
    [-20.0, -20.0, -40.0, -20.0],
];

const UNION_TEMPLATE: [[f64; 4]; 8] = [
    [-25.0, -10.0, 25.0, -10.0],
    [-25.0, 10.0, 25.0, 10.0],
    [25.0, -20.0, 35.0, -20.0],
    [35.0, -20.0, 35.0, 20.0],
    [35.0, 20.0, 25.0, 20.0],
    [-25.0, -20.0, -35.0, -20.0],
    [-35.0, -20.0, -35.0, 20.0],
    [-35.0, 20.0, -25.0, 20.0],
];

const VALVE_TEMPLATE: [[f64; 4]; 6] = [
    [0.0, -20.0, 0.0, -40.0],
    [-10.0, -40.0, 10.0, -40.0],
    [20.0, 0.0, 40.0, 0.0],
    [30.0, -15.0, 30.0, 15.0],
    [-20.0, 0.0, -40.0, 0.0],
    [-30.0, -15.0, -30.0, 15.0],
];
const VALVE_BODY_RADIUS: f64 = 20.0;

const CUSTOM_FITTING_TEMPLATE: [[f64; 4]; 6] = [
    [15.0, -20.0, 15.0, 20.0],
    [15.0, 20.0, 35.0, 20.0],
    [15.0, -20.0, 35.0, -20.0],
    [15.0, 0.0, -25.0, 0.0],
    [-25.0, 0.0, -30.0, 0.0],
    [-30.0, 0.0, -35.0, 0.0],
];

const METER_TEMPLATE: [[f64; 4]; 2] = [[20.0, 0.0, 50.0, 0.0], [35.0, -15.0, 35.0, 15.0]];
const METER_BOX_HALF: f64 = 20.0;
const METER_TEXT_SIZE: f64 = 40.0;

/// Inlet leg of the elbow, expressed relative to the connector node (the inlet end).
const ELBOW_INLET_TEMPLATE: [[f64; 4]; 4] = [
    [45.0, 0.0, 20.0, 0.0],
    [20.0, -20.0, 20.0, 20.0],
    [20.0, 20.0, 0.0, 20.0],
    [20.0, -20.0, 0.0, -20.0],
];
/// Distance from the connector node to the elbow pivot.
const ELBOW_PIVOT_OFFSET: f64 = 45.0;
/// Outlet leg of the elbow (and tee branch), relative to the pivot.
const ELBOW_OUTLET_TEMPLATE: [[f64; 4]; 4] = [
    [0.0, 0.0, 0.0, 25.0],
    [-20.0, 25.0, 20.0, 25.0],
    [-20.0, 25.0, -20.0, 45.0],
    [20.0, 25.0, 20.0, 45.0],
];

/// A straight pipe run.
pub fn pipe_glyph(a: Point, b: Point) -> Vec<Primitive> {
    vec![Primitive::Line(a, b)]
}

/// Socket centred between two connector nodes.
pub fn socket_glyph(a: Point, b: Point, flipped: bool, scale: f64) -> Vec<Primitive> {
    GlyphTransform::new(a.midpoint(b), canonical_angle(a.angle_to(b)))
        .mirrored(flipped)
        .scaled(scale)
        .segments(&SOCKET_TEMPLATE)
        .collect()
}

/// MC union centred between two connector nodes.
pub fn union_glyph(a: Point, b: Point, flipped: bool) -> Vec<Primitive> {
    GlyphTransform::new(a.midpoint(b), canonical_angle(a.angle_to(b)))
        .mirrored(flipped)
        .segments(&UNION_TEMPLATE)
        .collect()
}

/// Auxiliary valve with check valve: round body, stem and two flanges.
pub fn valve_glyph(a: Point, b: Point, flipped: bool) -> Vec<Primitive> {
    let transform =
        GlyphTransform::new(a.midpoint(b), canonical_angle(a.angle_to(b))).mirrored(flipped);
    let mut out = vec![Primitive::Circle {
        center: transform.origin,
        radius: VALVE_BODY_RADIUS,
    }];
    out.extend(transform.segments(&VALVE_TEMPLATE));
    out
}

/// Meter elastic joint. Flipping turns it end for end instead of mirroring it.
pub fn custom_fitting_glyph(a: Point, b: Point, flipped: bool) -> Vec<Primitive> {
    let mut angle = canonical_angle(a.angle_to(b));
    if flipped {
        angle += PI;
    }
    GlyphTransform::new(a.midpoint(b), angle)
        .segments(&CUSTOM_FITTING_TEMPLATE)
        .collect()
}

/// Distance from the inlet node to the meter body centre.
pub fn meter_anchor_distance(flipped: bool) -> f64 {
    if flipped {
        50.0
    } else {
        20.0
    }
}

/// Meter: a boxed "M" near the inlet node with an outlet stub.
///
/// The meter is not symmetric, so it follows the raw draw direction and its body sits
/// closer to or further from the inlet depending on `flipped`.
pub fn meter_glyph(a: Point, b: Point, flipped: bool) -> Vec<Primitive> {
    let angle = a.angle_to(b);
    let center = a.offset(angle, meter_anchor_distance(flipped));
    let transform = GlyphTransform::new(center, angle).mirrored(flipped);
    let h = METER_BOX_HALF;
    let mut out = vec![Primitive::Polygon(
        [(-h, -h), (h, -h), (h, h), (-h, h)]
            .iter()
            .map(|(x, y)| transform.apply(Point::new(*x, *y)))
            .collect(),
    )];
    out.extend(transform.segments(&METER_TEMPLATE));
    // keep the letter readable: never upside down
    let text_angle = if angle.abs() > FRAC_PI_2 { angle + PI } else { angle };
    out.push(Primitive::Text {
        center,
        text: "M".to_string(),
        size: METER_TEXT_SIZE,
        angle: text_angle,
    });
    out
}

/// Pivot point of an elbow whose inlet sits on `node` and runs along `base`.
pub fn elbow_pivot(node: Point, base: f64, scale: f64) -> Point {
    node.offset(base, ELBOW_PIVOT_OFFSET * scale)
}

/// Elbow: inlet leg continuing the incoming run along `base`, outlet leg turned to `branch`.
pub fn elbow_glyph(node: Point, base: f64, branch: f64, scale: f64) -> Vec<Primitive> {
    let inlet = GlyphTransform::new(node, base).scaled(scale);
    let outlet = GlyphTransform::new(elbow_pivot(node, base, scale), branch).scaled(scale);
    inlet
        .segments(&ELBOW_INLET_TEMPLATE)
        .chain(outlet.segments(&ELBOW_OUTLET_TEMPLATE))
        .collect()
}

/// Tee: a socket over the through run plus a branch leg aimed at `branch`.
pub fn cheese_glyph(
    a: Point,
    b: Point,
    branch: Option<Point>,
    flipped: bool,
    socket_scale: f64,
    elbow_scale: f64,
) -> Vec<Primitive> {
    let mut out = socket_glyph(a, b, flipped, socket_scale);
    if let Some(c) = branch {
        let mid = a.midpoint(b);
        let rotation = mid.angle_to(c) - FRAC_PI_2;
        out.extend(
            GlyphTransform::new(mid, rotation)
                .scaled(elbow_scale)
                .segments(&ELBOW_OUTLET_TEMPLATE),
        );
    }
    out
}

/// Leader line from a label's underline to its target, stopping `target_radius + 5`
/// short of the target. `None` when the target is closer than that.
pub fn label_leader(
    origin: Point,
    text_width: f64,
    target: Point,
    target_radius: f64,
) -> Option<(Point, Point)> {
    let text_center = origin.x + text_width / 2.0;
    let start_x = if target.x < text_center {
        origin.x
    } else {
        origin.x + text_width
    };
    let start = Point::new(start_x, origin.y + 2.0);
    let offset = target_radius + 5.0;
    if start.distance(target) <= offset {
        return None;
    }
    let end = target.offset(target.angle_to(start), offset);
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-6 && (a.y - b.y).abs() < 1e-6
    }

    #[test]
    fn test_canonical_angle_stays_in_half_open_range() {
        let mut a = -20.0;
        while a < 20.0 {
            let c = canonical_angle(a);
            assert!(c > -FRAC_PI_2 - EPS && c <= FRAC_PI_2 + EPS, "{a} -> {c}");
            let k = (a - c) / PI;
            assert!((k - k.round()).abs() < 1e-6, "{a} -> {c} not congruent mod pi");
            a += 0.0137;
        }
    }

    #[test]
    fn test_canonical_angle_folds_boundaries() {
        assert!((canonical_angle(FRAC_PI_2) - FRAC_PI_2).abs() < EPS);
        assert!((canonical_angle(-FRAC_PI_2) - FRAC_PI_2).abs() < EPS);
        assert!((canonical_angle(PI) - 0.0).abs() < EPS);
        assert!((canonical_angle(3.0 * PI / 4.0) + PI / 4.0).abs() < EPS);
    }

    #[test]
    fn test_snap_angle_lands_on_compass_directions() {
        let mut a = -7.0;
        while a < 7.0 {
            let s = snap_angle(a);
            let steps = s / ANGLE_STEP;
            assert!((steps - steps.round()).abs() < 1e-9);
            assert!((s - a).abs() <= ANGLE_STEP / 2.0 + EPS);
            a += 0.01;
        }
        assert!((snap_angle(0.5) - PI / 4.0).abs() < EPS);
        assert!((snap_angle(0.3) - 0.0).abs() < EPS);
        assert!((snap_angle(-2.0) + 3.0 * PI / 4.0).abs() < EPS);
    }

    #[test]
    fn test_snap_angle_ties_go_to_lower_direction() {
        assert!((snap_angle(PI / 8.0) - 0.0).abs() < EPS);
        assert!((snap_angle(-PI / 8.0) + PI / 4.0).abs() < EPS);
    }

    #[test]
    fn test_fixed_length_endpoint_ignores_pointer_distance() {
        let start = Point::new(10.0, 10.0);
        for pointer in [Point::new(11.0, 10.5), Point::new(500.0, 300.0), Point::new(-3.0, 90.0)] {
            let (end, _) = snapped_endpoint(start, pointer, Some(80.0));
            assert!((start.distance(end) - 80.0).abs() < 1e-9);
        }
        let (end, angle) = snapped_endpoint(start, Point::new(110.0, 12.0), None);
        assert!((angle - 0.0).abs() < EPS);
        assert!(close(end, Point::new(10.0 + Point::new(100.0, 2.0).length(), 10.0)));
    }

    #[test]
    fn test_socket_glyph_does_not_depend_on_click_order() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(80.0, 0.0);
        assert_eq!(socket_glyph(a, b, false, 1.0), socket_glyph(b, a, false, 1.0));
    }

    #[test]
    fn test_flipped_socket_is_mirrored_about_midpoint() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(80.0, 0.0);
        let plain = socket_glyph(a, b, false, 1.0);
        let flipped = socket_glyph(a, b, true, 1.0);
        // the first segment is the symmetric through line, the second is the right-hand face
        assert!(matches!(plain[1], Primitive::Line(p, _) if close(p, Point::new(60.0, 0.0))));
        assert!(matches!(flipped[1], Primitive::Line(p, _) if close(p, Point::new(20.0, 0.0))));
    }

    #[test]
    fn test_meter_flip_moves_the_body_away_from_the_inlet() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(70.0, 0.0);
        let centre = |prims: &[Primitive]| {
            prims.iter().find_map(|p| match p {
                Primitive::Text { center, .. } => Some(*center),
                _ => None,
            })
        };
        assert_eq!(centre(&meter_glyph(a, b, false)), Some(Point::new(20.0, 0.0)));
        assert_eq!(centre(&meter_glyph(a, b, true)), Some(Point::new(50.0, 0.0)));
    }

    #[test]
    fn test_meter_letter_is_never_upside_down() {
        let prims = meter_glyph(Point::new(70.0, 0.0), Point::new(0.0, 0.0), false);
        let angle = prims
            .iter()
            .find_map(|p| match p {
                Primitive::Text { angle, .. } => Some(*angle),
                _ => None,
            })
            .unwrap_or(f64::NAN);
        assert!((canonical_angle(angle) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_elbow_inlet_starts_on_node_and_outlet_on_pivot() {
        let node = Point::new(100.0, 0.0);
        let prims = elbow_glyph(node, 0.0, FRAC_PI_2, 1.0);
        assert_eq!(prims.len(), 8);
        assert!(matches!(prims[0], Primitive::Line(p, q)
            if close(p, Point::new(145.0, 0.0)) && close(q, Point::new(120.0, 0.0))));
        assert!(matches!(prims[4], Primitive::Line(p, _) if close(p, Point::new(145.0, 0.0))));
    }

    #[test]
    fn test_cheese_without_branch_is_just_a_socket() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(80.0, 0.0);
        assert_eq!(cheese_glyph(a, b, None, false, 1.0, 1.0).len(), SOCKET_TEMPLATE.len());
        assert_eq!(
            cheese_glyph(a, b, Some(Point::new(40.0, 45.0)), false, 1.0, 1.0).len(),
            SOCKET_TEMPLATE.len() + ELBOW_OUTLET_TEMPLATE.len()
        );
    }

    #[test]
    fn test_leader_stops_short_of_target() {
        let (start, end) =
            label_leader(Point::new(0.0, 0.0), 60.0, Point::new(200.0, 2.0), 20.0)
                .unwrap_or((Point::ZERO, Point::ZERO));
        assert!(close(start, Point::new(60.0, 2.0)));
        assert!(close(end, Point::new(175.0, 2.0)));
        assert!(label_leader(Point::new(0.0, 0.0), 60.0, Point::new(70.0, 2.0), 20.0).is_none());
    }
}
