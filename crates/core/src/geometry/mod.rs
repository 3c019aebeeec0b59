//! Angle, normalized-value and planar point primitives shared by every other
//! subsystem.
//!
//! The source field is the square `[-1, 1] x [-1, 1]`. Azimuth zero points
//! towards negative `y` (the top of the field) and grows clockwise, so a
//! position is `(sin(azimuth) * radius, -cos(azimuth) * radius)`.

use std::{
    f32::consts::{FRAC_PI_2, PI, TAU},
    fmt,
    ops::{Add, AddAssign, Div, Mul, Neg, Sub},
};

use serde::{Deserialize, Serialize};

/// Highest reachable elevation (the zenith).
pub const MAX_ELEVATION: Radians = Radians(FRAC_PI_2);

/// An angle stored in radians.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Radians(f32);

impl Radians {
    pub const ZERO: Self = Self(0.0);
    pub const HALF_PI: Self = Self(FRAC_PI_2);
    pub const PI: Self = Self(PI);
    pub const TWO_PI: Self = Self(TAU);

    pub const fn new(radians: f32) -> Self {
        Self(radians)
    }

    pub fn from_degrees(degrees: f32) -> Self {
        Self(degrees.to_radians())
    }

    pub fn as_radians(self) -> f32 {
        self.0
    }

    pub fn as_degrees(self) -> f32 {
        self.0.to_degrees()
    }

    /// Wraps the angle into `[-PI, PI)`.
    pub fn balanced(self) -> Self {
        let wrapped = (self.0 + PI).rem_euclid(TAU) - PI;
        // rem_euclid can round up to TAU for tiny negative inputs.
        if wrapped >= PI {
            Self(wrapped - TAU)
        } else {
            Self(wrapped)
        }
    }

    /// Wraps the angle into `[0, 2PI)`.
    pub fn positive(self) -> Self {
        let wrapped = self.0.rem_euclid(TAU);
        if wrapped >= TAU {
            Self(0.0)
        } else {
            Self(wrapped)
        }
    }

    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    /// Angle of `position` measured with the field's azimuth convention.
    pub fn from_point(position: Point) -> Self {
        (Self(position.y.atan2(position.x)) + Self::HALF_PI).balanced()
    }
}

impl fmt::Display for Radians {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}°", self.as_degrees())
    }
}

impl Add for Radians {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Radians {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Neg for Radians {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Mul<f32> for Radians {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self(self.0 * rhs)
    }
}

impl Div<f32> for Radians {
    type Output = Self;

    fn div(self, rhs: f32) -> Self {
        Self(self.0 / rhs)
    }
}

impl Div for Radians {
    type Output = f32;

    fn div(self, rhs: Self) -> f32 {
        self.0 / rhs.0
    }
}

/// A scalar constrained to `[0, 1]`, the representation the host automation
/// sees.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(from = "f32", into = "f32")]
pub struct Normalized(f32);

impl Normalized {
    pub const MIN: Self = Self(0.0);
    pub const MAX: Self = Self(1.0);

    /// Clamps `value` into `[0, 1]`. NaN collapses to zero.
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            Self(0.0)
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    pub fn get(self) -> f32 {
        self.0
    }

    /// Reflects the value, `1 - self`.
    pub fn inverted(self) -> Self {
        Self(1.0 - self.0)
    }
}

impl From<f32> for Normalized {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

impl From<Normalized> for f32 {
    fn from(value: Normalized) -> Self {
        value.0
    }
}

/// A point of the source field.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Position at `azimuth` on a circle of `radius` around the origin.
    pub fn from_angle(azimuth: Radians, radius: f32) -> Self {
        let rotated = (azimuth - Radians::HALF_PI).as_radians();
        Self {
            x: rotated.cos() * radius,
            y: rotated.sin() * radius,
        }
    }

    pub fn distance_from_origin(self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn distance_to(self, other: Point) -> f32 {
        (self - other).distance_from_origin()
    }

    pub fn angle(self) -> Radians {
        Radians::from_point(self)
    }

    /// Rotates around the origin. A positive angle increases the azimuth.
    pub fn rotated(self, angle: Radians) -> Self {
        let (sin, cos) = angle.as_radians().sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    pub fn lerp(self, other: Point, amount: f32) -> Self {
        self + (other - self) * amount
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Point {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl Mul<f32> for Point {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Point {
    type Output = Self;

    fn div(self, rhs: f32) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

/// Clamps a single field coordinate into `[-1, 1]`.
pub fn clip_coordinate(value: f32) -> f32 {
    value.clamp(-1.0, 1.0)
}

/// Clamps an elevation into `[0, MAX_ELEVATION]`.
pub fn clip_elevation(elevation: Radians) -> Radians {
    Radians(elevation.0.clamp(0.0, MAX_ELEVATION.0))
}

/// Projects a position lying outside the unit disc back onto its edge.
pub fn clip_dome_position(position: Point) -> Point {
    let radius = position.distance_from_origin();
    if radius > 1.0 {
        position / radius
    } else {
        position
    }
}

/// Clamps both coordinates into the unit square.
pub fn clip_cube_position(position: Point) -> Point {
    Point::new(clip_coordinate(position.x), clip_coordinate(position.y))
}
