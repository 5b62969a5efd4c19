//! Canvas geometry: points, vectors and axis-aligned rectangles.
//!
//! Everything is `f64` canvas-space pixels unless a function says it works in
//! parent-local coordinates. Rounding to whole pixels is left to the caller:
//! intermediate math is never rounded.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

/// A point or a vector in canvas space.
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

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Distance from the origin.
    pub fn magnitude(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn round(&self) -> Point {
        Point::new(self.x.round(), self.y.round())
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

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// True when every component is a finite number.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    pub fn offset(&self, by: Point) -> Rect {
        Rect::new(self.x + by.x, self.y + by.y, self.width, self.height)
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(x, y, right - x, bottom - y)
    }

    /// Flip negative extents so width and height are non-negative.
    pub fn normalized(&self) -> Rect {
        let (x, width) = if self.width < 0.0 {
            (self.x + self.width, -self.width)
        } else {
            (self.x, self.width)
        };
        let (y, height) = if self.height < 0.0 {
            (self.y + self.height, -self.height)
        } else {
            (self.y, self.height)
        };
        Rect::new(x, y, width, height)
    }

    pub fn round_to_whole(&self) -> Rect {
        Rect::new(
            self.x.round(),
            self.y.round(),
            self.width.round(),
            self.height.round(),
        )
    }

    /// Express this canvas rectangle relative to `parent`'s origin.
    pub fn to_local(&self, parent: &Rect) -> Rect {
        Rect::new(self.x - parent.x, self.y - parent.y, self.width, self.height)
    }

    /// Express a parent-local rectangle in canvas space.
    pub fn to_canvas(&self, parent: &Rect) -> Rect {
        Rect::new(self.x + parent.x, self.y + parent.y, self.width, self.height)
    }

    /// Component-wise `new - self`.
    pub fn difference(&self, new: &Rect) -> Rect {
        Rect::new(
            new.x - self.x,
            new.y - self.y,
            new.width - self.width,
            new.height - self.height,
        )
    }

    /// Map this frame from `old_box` into `new_box`, keeping its relative
    /// position and proportional size. Zero-sized boxes only translate.
    pub fn transform_using_bounding_box(&self, new_box: &Rect, old_box: &Rect) -> Rect {
        let scale_x = if old_box.width == 0.0 {
            1.0
        } else {
            new_box.width / old_box.width
        };
        let scale_y = if old_box.height == 0.0 {
            1.0
        } else {
            new_box.height / old_box.height
        };
        Rect::new(
            new_box.x + (self.x - old_box.x) * scale_x,
            new_box.y + (self.y - old_box.y) * scale_y,
            self.width * scale_x,
            self.height * scale_y,
        )
    }
}

/// Bounding box of all rectangles, or `None` for an empty iterator.
pub fn bounding_rect<'a, I: IntoIterator<Item = &'a Rect>>(rects: I) -> Option<Rect> {
    rects
        .into_iter()
        .fold(None, |acc: Option<Rect>, r| match acc {
            Some(a) => Some(a.union(r)),
            None => Some(*r),
        })
}

/// Round to a number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_encloses_both() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(150.0, 150.0, 50.0, 50.0);
        assert_eq!(a.union(&b), Rect::new(0.0, 0.0, 200.0, 200.0));
    }

    #[test]
    fn bounding_rect_of_empty_is_none() {
        assert_eq!(bounding_rect(&Vec::<Rect>::new()), None);
    }

    #[test]
    fn normalized_flips_negative_extent() {
        let r = Rect::new(100.0, 50.0, -30.0, 20.0).normalized();
        assert_eq!(r, Rect::new(70.0, 50.0, 30.0, 20.0));
    }

    #[test]
    fn transform_keeps_relative_position() {
        let old_box = Rect::new(0.0, 0.0, 100.0, 100.0);
        let new_box = Rect::new(0.0, 0.0, 200.0, 50.0);
        let frame = Rect::new(50.0, 50.0, 50.0, 50.0);
        assert_eq!(
            frame.transform_using_bounding_box(&new_box, &old_box),
            Rect::new(100.0, 25.0, 100.0, 25.0)
        );
    }

    #[test]
    fn round_to_decimals() {
        assert_eq!(round_to(1.2345, 2), 1.23);
        assert_eq!(round_to(-0.5, 0), -1.0);
    }
}
