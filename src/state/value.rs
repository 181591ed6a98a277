//! State values
//!
//! The store is dynamically keyed but statically shaped: every value is
//! one of the [`Value`] variants, and typed reads fall back to a caller
//! supplied default when the shape does not match.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A 2D position in scene coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box, `origin` is the lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub origin: Point,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    #[must_use]
    pub const fn new(origin: Point, width: f64, height: f64) -> Self {
        Self {
            origin,
            width,
            height,
        }
    }

    /// Box of the given size centered on `center`.
    #[must_use]
    pub fn centered(center: Point, width: f64, height: f64) -> Self {
        Self::new(
            Point::new(center.x - width / 2.0, center.y - height / 2.0),
            width,
            height,
        )
    }

    /// Returns `true` if `point` lies inside (edges inclusive).
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.origin.x
            && point.x <= self.origin.x + self.width
            && point.y >= self.origin.y
            && point.y <= self.origin.y + self.height
    }

    /// Picks a uniformly random point inside the box.
    ///
    /// Degenerate (zero-sized) boxes return their origin.
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Point {
        let dx = if self.width > 0.0 {
            rng.random_range(0.0..=self.width)
        } else {
            0.0
        };
        let dy = if self.height > 0.0 {
            rng.random_range(0.0..=self.height)
        } else {
            0.0
        };
        Point::new(self.origin.x + dx, self.origin.y + dy)
    }
}

/// Read-only view of a game entity, carried as an `inform` payload
/// (e.g. the enemy that just died).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Engine-assigned identifier.
    pub id: u64,
    /// Entity kind, e.g. `"basic"` for an enemy.
    pub kind: String,
    pub position: Point,
    pub bounds: Bounds,
    pub health: f64,
}

impl EntitySnapshot {
    /// Snapshot of a unit-sized entity at `position` with no health left.
    #[must_use]
    pub fn at(id: u64, kind: impl Into<String>, position: Point) -> Self {
        Self {
            id,
            kind: kind.into(),
            position,
            bounds: Bounds::centered(position, 1.0, 1.0),
            health: 0.0,
        }
    }
}

/// A value held by, or broadcast through, the state store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Duration(Duration),
    Point(Point),
    Entity(EntitySnapshot),
}

impl Value {
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Floats, with integers widened.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_duration(&self) -> Option<Duration> {
        match self {
            Self::Duration(d) => Some(*d),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_point(&self) -> Option<Point> {
        match self {
            Self::Point(p) => Some(*p),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_entity(&self) -> Option<&EntitySnapshot> {
        match self {
            Self::Entity(e) => Some(e),
            _ => None,
        }
    }

    /// Short shape name used in log output.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Duration(_) => "duration",
            Self::Point(_) => "point",
            Self::Entity(_) => "entity",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Duration> for Value {
    fn from(d: Duration) -> Self {
        Self::Duration(d)
    }
}

impl From<Point> for Value {
    fn from(p: Point) -> Self {
        Self::Point(p)
    }
}

impl From<EntitySnapshot> for Value {
    fn from(e: EntitySnapshot) -> Self {
        Self::Entity(e)
    }
}
