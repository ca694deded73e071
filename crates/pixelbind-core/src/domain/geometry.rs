//! Canonical value types: Point, Size, Rect, Scalar.
//!
//! These are plain `Copy` values. A resolver either builds one completely or
//! returns a `ParseError`; there is no half-built instance to observe.

use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 2D integer point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Dot product, widened so it can not overflow.
    pub fn dot(&self, other: &Point) -> i64 {
        i64::from(self.x) * i64::from(other.x) + i64::from(self.y) * i64::from(other.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

/// 2D integer size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> i64 {
        i64::from(self.width) * i64::from(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} x {}]", self.width, self.height)
    }
}

/// Axis-aligned integer rectangle (top-left corner + extent).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanned by two opposite corners, in either order.
    pub fn from_points(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self {
            x,
            y,
            width: a.x.max(b.x).wrapping_sub(x),
            height: a.y.max(b.y).wrapping_sub(y),
        }
    }

    pub fn from_point_size(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(
            self.x.wrapping_add(self.width),
            self.y.wrapping_add(self.height),
        )
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn area(&self) -> i64 {
        self.size().area()
    }

    /// Half-open containment: the right and bottom edges are outside.
    pub fn contains(&self, p: Point) -> bool {
        let (px, py) = (i64::from(p.x), i64::from(p.y));
        let (x, y) = (i64::from(self.x), i64::from(self.y));
        x <= px && px < x + i64::from(self.width) && y <= py && py < y + i64::from(self.height)
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} x {} from ({}, {})]",
            self.width, self.height, self.x, self.y
        )
    }
}

/// Four-component floating point value (colors, per-channel constants).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Scalar([f64; 4]);

impl Scalar {
    pub fn new(v0: f64, v1: f64, v2: f64, v3: f64) -> Self {
        Self([v0, v1, v2, v3])
    }

    /// Every component set to `v`.
    pub fn all(v: f64) -> Self {
        Self([v; 4])
    }

    pub fn values(&self) -> [f64; 4] {
        self.0
    }

    /// Element-wise product, multiplied by `scale`.
    pub fn mul(&self, other: &Scalar, scale: f64) -> Scalar {
        let mut out = [0.0; 4];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.0[i] * other.0[i] * scale;
        }
        Scalar(out)
    }

    /// Quaternion-style conjugate: `[v0, -v1, -v2, -v3]`.
    pub fn conj(&self) -> Scalar {
        let [v0, v1, v2, v3] = self.0;
        Scalar([v0, -v1, -v2, -v3])
    }

    pub fn is_real(&self) -> bool {
        self.0[1] == 0.0 && self.0[2] == 0.0 && self.0[3] == 0.0
    }
}

impl Index<usize> for Scalar {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl From<[f64; 4]> for Scalar {
    fn from(values: [f64; 4]) -> Self {
        Self(values)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [v0, v1, v2, v3] = self.0;
        write!(f, "[{v0}, {v1}, {v2}, {v3}]")
    }
}

/// Which canonical shape a value (or a resolver) targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Point,
    Size,
    Rect,
    Scalar,
}

impl Shape {
    pub fn as_str(self) -> &'static str {
        match self {
            Shape::Point => "point",
            Shape::Size => "size",
            Shape::Rect => "rect",
            Shape::Scalar => "scalar",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown shape: {0} (expected point, size, rect or scalar)")]
pub struct UnknownShape(pub String);

impl FromStr for Shape {
    type Err = UnknownShape;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "point" => Ok(Shape::Point),
            "size" => Ok(Shape::Size),
            "rect" => Ok(Shape::Rect),
            "scalar" => Ok(Shape::Scalar),
            _ => Err(UnknownShape(s.to_string())),
        }
    }
}

/// One of the four canonical shapes.
///
/// Serialized adjacently tagged, e.g. `{"shape":"point","value":{"x":1,"y":2}}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "value", rename_all = "lowercase")]
pub enum CanonicalValue {
    Point(Point),
    Size(Size),
    Rect(Rect),
    Scalar(Scalar),
}

impl CanonicalValue {
    pub fn shape(&self) -> Shape {
        match self {
            CanonicalValue::Point(_) => Shape::Point,
            CanonicalValue::Size(_) => Shape::Size,
            CanonicalValue::Rect(_) => Shape::Rect,
            CanonicalValue::Scalar(_) => Shape::Scalar,
        }
    }
}

impl fmt::Display for CanonicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalValue::Point(p) => p.fmt(f),
            CanonicalValue::Size(s) => s.fmt(f),
            CanonicalValue::Rect(r) => r.fmt(f),
            CanonicalValue::Scalar(s) => s.fmt(f),
        }
    }
}

impl From<Point> for CanonicalValue {
    fn from(p: Point) -> Self {
        CanonicalValue::Point(p)
    }
}

impl From<Size> for CanonicalValue {
    fn from(s: Size) -> Self {
        CanonicalValue::Size(s)
    }
}

impl From<Rect> for CanonicalValue {
    fn from(r: Rect) -> Self {
        CanonicalValue::Rect(r)
    }
}

impl From<Scalar> for CanonicalValue {
    fn from(s: Scalar) -> Self {
        CanonicalValue::Scalar(s)
    }
}

/// Host number -> 32-bit integer, the way the host runtime converts it:
/// non-finite becomes 0, otherwise truncate toward zero and wrap mod 2^32.
pub fn to_int32(v: f64) -> i32 {
    if !v.is_finite() {
        return 0;
    }
    let wrapped = v.trunc().rem_euclid(4_294_967_296.0);
    wrapped as u64 as u32 as i32
}
