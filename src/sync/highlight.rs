//! Highlight and scroll control
//!
//! The controller owns the single "currently highlighted" pointer. Rendering
//! layers implement [`HighlightSurface`] to project it onto their own
//! primitives: CSS classes, terminal attributes or a test recorder.

use serde::{Deserialize, Serialize};

use crate::content::NodeId;
use crate::segment::Segmentation;

/// Vertical extent of an element in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub top: f64,
    pub bottom: f64,
}

impl Rect {
    #[must_use]
    pub const fn new(top: f64, bottom: f64) -> Self {
        Self { top, bottom }
    }
}

/// Presentation layer able to emphasize elements and scroll to them
pub trait HighlightSurface {
    /// Called once per session with the freshly segmented content, before
    /// any element is activated
    fn prepare(&mut self, _segmentation: &Segmentation) {}

    /// Apply visual emphasis to an element
    fn activate(&mut self, element: NodeId);

    /// Remove visual emphasis from an element
    fn deactivate(&mut self, element: NodeId);

    /// Element's bounding box relative to the viewport, if it is laid out
    fn bounding_box(&self, element: NodeId) -> Option<Rect>;

    /// Height of the visible viewport
    fn viewport_height(&self) -> f64;

    /// Smoothly scroll so the element sits at vertical center
    fn scroll_to_center(&mut self, element: NodeId);
}

/// Safe zone, as fractions of viewport height, inside which a highlighted
/// element does not trigger scrolling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollBand {
    pub top: f64,
    pub bottom: f64,
}

impl Default for ScrollBand {
    fn default() -> Self {
        Self {
            top: 0.3,
            bottom: 0.7,
        }
    }
}

impl ScrollBand {
    /// Whether an element at `rect` has left the safe zone
    #[must_use]
    pub fn needs_scroll(&self, rect: Rect, viewport_height: f64) -> bool {
        rect.top < viewport_height * self.top || rect.bottom > viewport_height * self.bottom
    }
}

/// Result of one highlight update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HighlightChange {
    pub deactivated: Option<NodeId>,
    pub activated: Option<NodeId>,
    pub scrolled: bool,
}

impl HighlightChange {
    /// Whether the update touched the surface at all
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.deactivated.is_none() && self.activated.is_none()
    }
}

/// Keeps at most one element highlighted
#[derive(Debug, Clone, Default)]
pub struct HighlightController {
    active: Option<NodeId>,
    band: ScrollBand,
}

impl HighlightController {
    #[must_use]
    pub const fn new(band: ScrollBand) -> Self {
        Self { active: None, band }
    }

    /// Currently highlighted element
    #[must_use]
    pub const fn active(&self) -> Option<NodeId> {
        self.active
    }

    /// Move the highlight to `resolved`
    ///
    /// The old element is deactivated before the new one is activated.
    /// `None` clears the highlight.
    pub fn update<S: HighlightSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        resolved: Option<NodeId>,
    ) -> HighlightChange {
        if resolved == self.active {
            return HighlightChange::default();
        }

        let mut change = HighlightChange::default();
        if let Some(old) = self.active.take() {
            surface.deactivate(old);
            change.deactivated = Some(old);
        }

        if let Some(new) = resolved {
            surface.activate(new);
            self.active = Some(new);
            change.activated = Some(new);
            change.scrolled = self.scroll_if_needed(surface, new);
        }
        change
    }

    /// Remove any highlight
    pub fn clear<S: HighlightSurface + ?Sized>(&mut self, surface: &mut S) -> HighlightChange {
        self.update(surface, None)
    }

    fn scroll_if_needed<S: HighlightSurface + ?Sized>(&self, surface: &mut S, element: NodeId) -> bool {
        let Some(rect) = surface.bounding_box(element) else {
            return false;
        };
        let height = surface.viewport_height();
        if !self.band.needs_scroll(rect, height) {
            return false;
        }
        tracing::trace!(%element, top = rect.top, bottom = rect.bottom, height, "scrolling to word");
        surface.scroll_to_center(element);
        true
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        boxes: HashMap<NodeId, Rect>,
    }

    impl HighlightSurface for Recorder {
        fn activate(&mut self, element: NodeId) {
            self.events.push(format!("on {element}"));
        }
        fn deactivate(&mut self, element: NodeId) {
            self.events.push(format!("off {element}"));
        }
        fn bounding_box(&self, element: NodeId) -> Option<Rect> {
            self.boxes.get(&element).copied()
        }
        fn viewport_height(&self) -> f64 {
            100.0
        }
        fn scroll_to_center(&mut self, element: NodeId) {
            self.events.push(format!("scroll {element}"));
        }
    }

    #[test]
    fn deactivates_before_activating() {
        let mut surface = Recorder::default();
        let mut controller = HighlightController::default();

        controller.update(&mut surface, Some(NodeId(1)));
        controller.update(&mut surface, Some(NodeId(2)));
        controller.update(&mut surface, None);

        assert_eq!(surface.events, ["on #1", "off #1", "on #2", "off #2"]);
        assert_eq!(controller.active(), None);
    }

    #[test]
    fn same_element_is_a_noop() {
        let mut surface = Recorder::default();
        let mut controller = HighlightController::default();

        controller.update(&mut surface, Some(NodeId(1)));
        let change = controller.update(&mut surface, Some(NodeId(1)));

        assert!(change.is_noop());
        assert_eq!(surface.events.len(), 1);
    }

    #[test]
    fn scrolls_only_outside_band() {
        let mut surface = Recorder::default();
        surface.boxes.insert(NodeId(1), Rect::new(40.0, 45.0));
        surface.boxes.insert(NodeId(2), Rect::new(20.0, 25.0));
        surface.boxes.insert(NodeId(3), Rect::new(66.0, 72.0));
        let mut controller = HighlightController::default();

        assert!(!controller.update(&mut surface, Some(NodeId(1))).scrolled);
        assert!(controller.update(&mut surface, Some(NodeId(2))).scrolled);
        assert!(controller.update(&mut surface, Some(NodeId(3))).scrolled);
        assert!(surface.events.contains(&"scroll #2".to_string()));
    }

    #[test]
    fn missing_layout_never_scrolls() {
        let mut surface = Recorder::default();
        let mut controller = HighlightController::new(ScrollBand { top: 0.5, bottom: 0.5 });
        assert!(!controller.update(&mut surface, Some(NodeId(9))).scrolled);
    }

    #[test]
    fn clear_without_highlight_is_noop() {
        let mut surface = Recorder::default();
        let mut controller = HighlightController::default();
        assert!(controller.clear(&mut surface).is_noop());
        assert!(surface.events.is_empty());
    }
}
