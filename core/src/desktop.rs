//! Pixel geometry and the two desktop collaborators the solver drives: a screen to
//! read from and a mouse to click with.

use serde::{Deserialize, Serialize};

use crate::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Every channel differs by at most `tolerance`.
    pub const fn within(self, other: Rgb, tolerance: u8) -> bool {
        self.r.abs_diff(other.r) <= tolerance
            && self.g.abs_diff(other.g) <= tolerance
            && self.b.abs_diff(other.b) <= tolerance
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in screen pixels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub const fn center(&self) -> ScreenPoint {
        ScreenPoint {
            x: self.x + (self.width / 2) as i32,
            y: self.y + (self.height / 2) as i32,
        }
    }

    pub const fn contains(&self, point: ScreenPoint) -> bool {
        let dx = point.x as i64 - self.x as i64;
        let dy = point.y as i64 - self.y as i64;
        dx >= 0 && dy >= 0 && dx < self.width as i64 && dy < self.height as i64
    }

    pub const fn intersects(&self, other: &PixelRect) -> bool {
        let (ax, ay) = (self.x as i64, self.y as i64);
        let (bx, by) = (other.x as i64, other.y as i64);
        ax < bx + other.width as i64
            && bx < ax + self.width as i64
            && ay < by + other.height as i64
            && by < ay + self.height as i64
    }
}

/// Row-major RGB pixels captured from a [`PixelRect`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PixelBlock {
    rect: PixelRect,
    pixels: Vec<Rgb>,
}

impl PixelBlock {
    pub fn new(rect: PixelRect, pixels: Vec<Rgb>) -> Result<Self> {
        if pixels.len() != rect.area() {
            return Err(SweepError::Capture {
                rect,
                reason: format!("expected {} pixels, got {}", rect.area(), pixels.len()),
            });
        }
        Ok(Self { rect, pixels })
    }

    /// Builds a block by evaluating `f` at every absolute screen position.
    pub fn from_fn(rect: PixelRect, mut f: impl FnMut(ScreenPoint) -> Rgb) -> Self {
        let mut pixels = Vec::with_capacity(rect.area());
        for dy in 0..rect.height as i32 {
            for dx in 0..rect.width as i32 {
                pixels.push(f(ScreenPoint::new(rect.x + dx, rect.y + dy)));
            }
        }
        Self { rect, pixels }
    }

    pub fn rect(&self) -> PixelRect {
        self.rect
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    /// Pixel at `(col, row)` relative to the top-left of the block.
    pub fn get(&self, col: u32, row: u32) -> Option<Rgb> {
        if col >= self.rect.width || row >= self.rect.height {
            return None;
        }
        let index = row as usize * self.rect.width as usize + col as usize;
        self.pixels.get(index).copied()
    }
}

/// Reads what is currently displayed on screen.
pub trait ScreenCapture {
    fn capture(&mut self, rect: PixelRect) -> Result<PixelBlock>;
}

/// Synthesizes mouse input. Backends report their own failures through logging.
pub trait InputInjector {
    fn primary_click(&mut self, at: ScreenPoint);
    fn secondary_click(&mut self, at: ScreenPoint);
}

impl<T: ScreenCapture + ?Sized> ScreenCapture for &mut T {
    fn capture(&mut self, rect: PixelRect) -> Result<PixelBlock> {
        (**self).capture(rect)
    }
}

impl<T: InputInjector + ?Sized> InputInjector for &mut T {
    fn primary_click(&mut self, at: ScreenPoint) {
        (**self).primary_click(at)
    }

    fn secondary_click(&mut self, at: ScreenPoint) {
        (**self).secondary_click(at)
    }
}
