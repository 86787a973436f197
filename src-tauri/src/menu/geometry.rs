use serde::{Deserialize, Serialize};

/// A point in physical screen pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

/// Usable region of one display, excluding taskbars and menu bars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkArea {
    pub origin: Point,
    pub size: Size,
    pub scale_factor: f64,
}

impl WorkArea {
    #[cfg(test)]
    pub fn contains(&self, at: Point, size: Size) -> bool {
        let (left, top) = (i64::from(self.origin.x), i64::from(self.origin.y));
        let right = left + i64::from(self.size.width);
        let bottom = top + i64::from(self.size.height);
        let (x, y) = (i64::from(at.x), i64::from(at.y));
        x >= left
            && y >= top
            && x + i64::from(size.width) <= right
            && y + i64::from(size.height) <= bottom
    }
}

/// Menu dimensions in logical pixels, as configured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MenuLayout {
    pub width: f64,
    pub height: f64,
    pub offset_y: f64,
}

impl MenuLayout {
    pub fn physical_size(&self, scale_factor: f64) -> Size {
        Size {
            width: to_physical(self.width, scale_factor),
            height: to_physical(self.height, scale_factor),
        }
    }

    pub fn physical_offset(&self, scale_factor: f64) -> i32 {
        (self.offset_y * scale_factor).round() as i32
    }
}

fn to_physical(logical: f64, scale_factor: f64) -> u32 {
    (logical * scale_factor).round().max(1.0) as u32
}

/// Keeps a `size` box placed at `at` inside the work area.
///
/// A box larger than the area is pinned to the area's top-left corner.
pub fn clamp_to_work_area(at: Point, size: Size, area: &WorkArea) -> Point {
    let clamp_axis = |value: i32, origin: i32, extent: u32, length: u32| -> i32 {
        let min = i64::from(origin);
        let max = (min + i64::from(extent) - i64::from(length)).max(min);
        let clamped = i64::from(value).clamp(min, max);
        i32::try_from(clamped).unwrap_or(origin)
    };

    Point {
        x: clamp_axis(at.x, area.origin.x, area.size.width, size.width),
        y: clamp_axis(at.y, area.origin.y, area.size.height, size.height),
    }
}
