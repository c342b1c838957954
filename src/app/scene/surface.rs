use std::collections::BTreeSet;

use eframe::egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Shape, Stroke, vec2};
use thiserror::Error;
use tracing::{debug, info};

use super::super::session::Slot;

/// How a scene reaches the screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum RenderBackend {
    /// Every layer is collected into one shape batch and tessellated together.
    Accelerated,
    /// One painter call per primitive.
    Immediate,
}

impl RenderBackend {
    pub(in crate::app) fn detect(has_gl_context: bool) -> Self {
        let backend = if has_gl_context {
            Self::Accelerated
        } else {
            Self::Immediate
        };
        info!(?backend, has_gl_context, "render backend selected");
        backend
    }

    pub(in crate::app) fn label(self) -> &'static str {
        match self {
            Self::Accelerated => "accelerated",
            Self::Immediate => "immediate",
        }
    }
}

/// Drawing capability the scene paints through, one frame at a time.
pub(in crate::app) trait SceneSurface {
    fn clip_rect(&self) -> Rect;
    fn line(&mut self, from: Pos2, to: Pos2, stroke: Stroke);
    fn circle(&mut self, center: Pos2, radius: f32, fill: Color32, stroke: Stroke);
    /// `anchor` is the bottom centre of the text.
    fn text(&mut self, anchor: Pos2, text: &str, size: f32, color: Color32);
    fn finish(&mut self) {}
}

pub(in crate::app) struct BatchedSurface<'p> {
    painter: &'p Painter,
    shapes: Vec<Shape>,
}

impl<'p> BatchedSurface<'p> {
    pub(in crate::app) fn new(painter: &'p Painter) -> Self {
        Self {
            painter,
            shapes: Vec::new(),
        }
    }
}

impl SceneSurface for BatchedSurface<'_> {
    fn clip_rect(&self) -> Rect {
        self.painter.clip_rect()
    }

    fn line(&mut self, from: Pos2, to: Pos2, stroke: Stroke) {
        self.shapes.push(Shape::line_segment([from, to], stroke));
    }

    fn circle(&mut self, center: Pos2, radius: f32, fill: Color32, stroke: Stroke) {
        self.shapes
            .push(Shape::circle_filled(center, radius, fill));
        if stroke.width > 0.0 {
            self.shapes.push(Shape::circle_stroke(center, radius, stroke));
        }
    }

    fn text(&mut self, anchor: Pos2, text: &str, size: f32, color: Color32) {
        let galley = self
            .painter
            .layout_no_wrap(text.to_owned(), FontId::proportional(size), color);
        let size = galley.size();
        let top_left = anchor - vec2(size.x * 0.5, size.y);
        self.shapes.push(Shape::galley(top_left, galley, color));
    }

    fn finish(&mut self) {
        self.painter.extend(std::mem::take(&mut self.shapes));
    }
}

pub(in crate::app) struct ImmediateSurface<'p> {
    painter: &'p Painter,
}

impl<'p> ImmediateSurface<'p> {
    pub(in crate::app) fn new(painter: &'p Painter) -> Self {
        Self { painter }
    }
}

impl SceneSurface for ImmediateSurface<'_> {
    fn clip_rect(&self) -> Rect {
        self.painter.clip_rect()
    }

    fn line(&mut self, from: Pos2, to: Pos2, stroke: Stroke) {
        self.painter.line_segment([from, to], stroke);
    }

    fn circle(&mut self, center: Pos2, radius: f32, fill: Color32, stroke: Stroke) {
        self.painter.circle(center, radius, fill, stroke);
    }

    fn text(&mut self, anchor: Pos2, text: &str, size: f32, color: Color32) {
        self.painter.text(
            anchor,
            Align2::CENTER_BOTTOM,
            text,
            FontId::proportional(size),
            color,
        );
    }
}

pub(in crate::app) fn surface_for<'p>(
    backend: RenderBackend,
    painter: &'p Painter,
) -> Box<dyn SceneSurface + 'p> {
    match backend {
        RenderBackend::Accelerated => Box::new(BatchedSurface::new(painter)),
        RenderBackend::Immediate => Box::new(ImmediateSurface::new(painter)),
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(in crate::app) enum SurfaceError {
    #[error("the {0:?} graph canvas is still owned by a live instance")]
    AlreadyLeased(Slot),
}

/// Exclusive claim on one slot's canvas. Hand it back with
/// [`SurfaceRegistry::release`] when the instance is torn down.
#[derive(Debug, PartialEq, Eq)]
pub(in crate::app) struct SurfaceLease {
    slot: Slot,
    backend: RenderBackend,
}

impl SurfaceLease {
    pub(in crate::app) fn backend(&self) -> RenderBackend {
        self.backend
    }
}

#[derive(Debug)]
pub(in crate::app) struct SurfaceRegistry {
    backend: RenderBackend,
    leased: BTreeSet<Slot>,
}

impl SurfaceRegistry {
    pub(in crate::app) fn new(backend: RenderBackend) -> Self {
        Self {
            backend,
            leased: BTreeSet::new(),
        }
    }

    pub(in crate::app) fn backend(&self) -> RenderBackend {
        self.backend
    }

    pub(in crate::app) fn lease(&mut self, slot: Slot) -> Result<SurfaceLease, SurfaceError> {
        if !self.leased.insert(slot) {
            return Err(SurfaceError::AlreadyLeased(slot));
        }
        debug!(?slot, backend = self.backend.label(), "surface leased");
        Ok(SurfaceLease {
            slot,
            backend: self.backend,
        })
    }

    pub(in crate::app) fn release(&mut self, lease: SurfaceLease) {
        self.leased.remove(&lease.slot);
        debug!(slot = ?lease.slot, "surface released");
    }

    #[cfg(test)]
    pub(in crate::app) fn is_leased(&self, slot: Slot) -> bool {
        self.leased.contains(&slot)
    }

    #[cfg(test)]
    pub(in crate::app) fn leased_count(&self) -> usize {
        self.leased.len()
    }
}
