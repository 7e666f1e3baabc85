//! Coordinate math for text and image overlays placed on rendered pages
//!
//! Elements are stored in *base* coordinates (PDF points, top-left origin,
//! independent of zoom). The view multiplies by `zoom / 100`. PDF content
//! space uses a bottom-left origin, so conversions to and from it flip Y.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle, top-left origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
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

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }
}

fn zoom_factor(zoom: f64) -> f64 {
    zoom / 100.0
}

/// Base-space rectangle to on-screen pixels at `zoom` percent
pub fn base_to_view(rect: Rect, zoom: f64) -> Rect {
    let s = zoom_factor(zoom);
    Rect::new(rect.x * s, rect.y * s, rect.width * s, rect.height * s)
}

/// On-screen rectangle back to base space. A non-positive zoom leaves the
/// rectangle unchanged.
pub fn view_to_base(rect: Rect, zoom: f64) -> Rect {
    let s = zoom_factor(zoom);
    if s <= 0.0 {
        return rect;
    }
    Rect::new(rect.x / s, rect.y / s, rect.width / s, rect.height / s)
}

/// Convert a PDF content-space point (bottom-left origin) to view pixels
pub fn pdf_to_view(pdf_x: f64, pdf_y: f64, page_height: f64, zoom: f64) -> (f64, f64) {
    let s = zoom_factor(zoom);
    (pdf_x * s, (page_height - pdf_y) * s)
}

/// Convert view pixels to a PDF content-space point
pub fn view_to_pdf(view_x: f64, view_y: f64, page_height: f64, zoom: f64) -> (f64, f64) {
    let s = zoom_factor(zoom);
    if s <= 0.0 {
        return (view_x, page_height - view_y);
    }
    (view_x / s, page_height - view_y / s)
}

/// The eight drag handles around a selected element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeHandle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::TopLeft,
        ResizeHandle::Top,
        ResizeHandle::TopRight,
        ResizeHandle::Right,
        ResizeHandle::BottomRight,
        ResizeHandle::Bottom,
        ResizeHandle::BottomLeft,
        ResizeHandle::Left,
    ];

    fn moves_left(&self) -> bool {
        matches!(
            self,
            ResizeHandle::TopLeft | ResizeHandle::Left | ResizeHandle::BottomLeft
        )
    }

    fn moves_right(&self) -> bool {
        matches!(
            self,
            ResizeHandle::TopRight | ResizeHandle::Right | ResizeHandle::BottomRight
        )
    }

    fn moves_top(&self) -> bool {
        matches!(
            self,
            ResizeHandle::TopLeft | ResizeHandle::Top | ResizeHandle::TopRight
        )
    }

    fn moves_bottom(&self) -> bool {
        matches!(
            self,
            ResizeHandle::BottomLeft | ResizeHandle::Bottom | ResizeHandle::BottomRight
        )
    }

    /// Center of the handle on the rectangle's outline
    pub fn position(&self, rect: &Rect) -> (f64, f64) {
        let x = if self.moves_left() {
            rect.x
        } else if self.moves_right() {
            rect.right()
        } else {
            rect.x + rect.width / 2.0
        };
        let y = if self.moves_top() {
            rect.y
        } else if self.moves_bottom() {
            rect.bottom()
        } else {
            rect.y + rect.height / 2.0
        };
        (x, y)
    }
}

/// Handle under the point, if any, with `radius` as the grab distance
pub fn hit_test(rect: &Rect, px: f64, py: f64, radius: f64) -> Option<ResizeHandle> {
    ResizeHandle::ALL.into_iter().find(|handle| {
        let (hx, hy) = handle.position(rect);
        (px - hx).abs() <= radius && (py - hy).abs() <= radius
    })
}

/// Drag `handle` by (`dx`, `dy`) base units. The opposite edge stays put and
/// neither side shrinks below `min_size`.
pub fn resize(rect: Rect, handle: ResizeHandle, dx: f64, dy: f64, min_size: f64) -> Rect {
    let (mut left, mut top, mut right, mut bottom) = (rect.x, rect.y, rect.right(), rect.bottom());

    if handle.moves_left() {
        left = (left + dx).min(right - min_size);
    }
    if handle.moves_right() {
        right = (right + dx).max(left + min_size);
    }
    if handle.moves_top() {
        top = (top + dy).min(bottom - min_size);
    }
    if handle.moves_bottom() {
        bottom = (bottom + dy).max(top + min_size);
    }

    Rect::new(left, top, right - left, bottom - top)
}

/// Move by (`dx`, `dy`) then keep the element on the page
pub fn translate(rect: Rect, dx: f64, dy: f64, page_width: f64, page_height: f64) -> Rect {
    clamp_to_page(
        Rect::new(rect.x + dx, rect.y + dy, rect.width, rect.height),
        page_width,
        page_height,
    )
}

/// Keep the rectangle inside a page, shrinking it if it is larger than the page
pub fn clamp_to_page(rect: Rect, page_width: f64, page_height: f64) -> Rect {
    let width = rect.width.min(page_width).max(0.0);
    let height = rect.height.min(page_height).max(0.0);
    let x = rect.x.clamp(0.0, (page_width - width).max(0.0));
    let y = rect.y.clamp(0.0, (page_height - height).max(0.0));
    Rect::new(x, y, width, height)
}
