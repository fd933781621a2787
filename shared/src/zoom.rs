use crate::bounds::{BoundsMap, Rect};
use crate::config::MapConfig;
use crate::selection::ZoomRequest;

/// Pan/zoom transform from map coordinates to screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomTransform {
    pub translate_x: f64,
    pub translate_y: f64,
    pub scale: f64,
}

impl Default for ZoomTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ZoomTransform {
    pub const IDENTITY: ZoomTransform = ZoomTransform {
        translate_x: 0.0,
        translate_y: 0.0,
        scale: 1.0,
    };

    pub fn apply(&self, p: [f64; 2]) -> [f64; 2] {
        [
            p[0] * self.scale + self.translate_x,
            p[1] * self.scale + self.translate_y,
        ]
    }

    pub fn invert(&self, p: [f64; 2]) -> [f64; 2] {
        [
            (p[0] - self.translate_x) / self.scale,
            (p[1] - self.translate_y) / self.scale,
        ]
    }

    pub fn to_svg(&self) -> String {
        format!(
            "translate({},{}) scale({})",
            self.translate_x, self.translate_y, self.scale
        )
    }

    /// Transform that centers `rect` in the viewport at `margin` of the tightest fit.
    pub fn fit_rect(rect: &Rect, viewport: Viewport, margin: f64, extent: [f64; 2]) -> Option<Self> {
        if !viewport.is_ready() || rect.is_degenerate() {
            return None;
        }
        let scale = ((viewport.width / rect.width()).min(viewport.height / rect.height()) * margin)
            .clamp(extent[0], extent[1]);
        let [cx, cy] = rect.midpoint();
        Some(Self {
            translate_x: viewport.width / 2.0 - cx * scale,
            translate_y: viewport.height / 2.0 - cy * scale,
            scale,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_ready(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    fn center(&self) -> [f64; 2] {
        [self.width / 2.0, self.height / 2.0]
    }
}

/// Cubic ease-in-out.
fn cubic_ease_in_out(t: f64) -> f64 {
    let t = t * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

/// A time-based transition between two transforms.
///
/// Scale is interpolated geometrically and the map point under the viewport
/// center linearly, so the zoom neither lurches nor drifts sideways.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomAnimation {
    pub from: ZoomTransform,
    pub to: ZoomTransform,
    pub start_time: f64,
    pub duration: f64, // milliseconds
    center: [f64; 2],
}

impl ZoomAnimation {
    pub fn new(
        from: ZoomTransform,
        to: ZoomTransform,
        viewport: Viewport,
        start_time: f64,
        duration: f64,
    ) -> Self {
        Self {
            from,
            to,
            start_time,
            duration,
            center: viewport.center(),
        }
    }

    /// Transform at `now`, or `None` once the transition is complete.
    pub fn current(&self, now: f64) -> Option<ZoomTransform> {
        let elapsed = now - self.start_time;
        if elapsed >= self.duration {
            return None;
        }
        let t = cubic_ease_in_out((elapsed / self.duration).max(0.0));

        let scale = self.from.scale * (self.to.scale / self.from.scale).powf(t);
        let a = self.from.invert(self.center);
        let b = self.to.invert(self.center);
        let wx = a[0] + (b[0] - a[0]) * t;
        let wy = a[1] + (b[1] - a[1]) * t;
        Some(ZoomTransform {
            translate_x: self.center[0] - wx * scale,
            translate_y: self.center[1] - wy * scale,
            scale,
        })
    }
}

/// Owns the map's zoom transform; every change, interactive or programmatic,
/// stays within the configured scale extent.
#[derive(Debug, Clone)]
pub struct ZoomController {
    pub transform: ZoomTransform,
    pub viewport: Viewport,
    animation: Option<ZoomAnimation>,
    scale_extent: [f64; 2],
    margin: f64,
    duration: f64,
    wheel_sensitivity: f64,
}

impl ZoomController {
    pub fn new(config: &MapConfig) -> Self {
        Self {
            transform: ZoomTransform::IDENTITY,
            viewport: Viewport::default(),
            animation: None,
            scale_extent: config.scale_extent,
            margin: config.zoom_margin,
            duration: config.zoom_duration_ms,
            wheel_sensitivity: config.wheel_sensitivity,
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Handle a request from the selection state. Returns whether an animation started.
    pub fn request(&mut self, request: &ZoomRequest, bounds: &BoundsMap, now: f64) -> bool {
        match request {
            ZoomRequest::Region(name) => match bounds.get(name) {
                Some(b) => self.zoom_to_region(Some(&b.rect()), now),
                None => false,
            },
            ZoomRequest::Overview => self.zoom_to_region(None, now),
        }
    }

    /// Animate to fit `rect`, or back to identity when `rect` is `None`.
    /// A missing target or an unsized viewport leaves everything untouched.
    pub fn zoom_to_region(&mut self, rect: Option<&Rect>, now: f64) -> bool {
        let target = match rect {
            None => ZoomTransform::IDENTITY,
            Some(rect) => {
                match ZoomTransform::fit_rect(rect, self.viewport, self.margin, self.scale_extent) {
                    Some(t) => t,
                    None => return false,
                }
            }
        };
        self.animate_to(target, now);
        true
    }

    pub fn reset(&mut self, now: f64) {
        self.animate_to(ZoomTransform::IDENTITY, now);
    }

    /// Start a transition from the current (possibly mid-flight) transform.
    /// Any running animation is replaced.
    fn animate_to(&mut self, target: ZoomTransform, now: f64) {
        if let Some(anim) = self.animation
            && let Some(current) = anim.current(now)
        {
            self.transform = current;
        }
        self.animation = Some(ZoomAnimation::new(
            self.transform,
            target,
            self.viewport,
            now,
            self.duration,
        ));
    }

    /// Advance the running animation. Returns `true` while more frames are needed.
    pub fn tick(&mut self, now: f64) -> bool {
        let Some(anim) = self.animation else {
            return false;
        };
        match anim.current(now) {
            Some(t) => {
                self.transform = t;
                true
            }
            None => {
                self.transform = anim.to;
                self.animation = None;
                false
            }
        }
    }

    /// Zoom toward a focus point (screen coordinates). Cancels any running animation.
    pub fn zoom_at(&mut self, delta: f64, screen_x: f64, screen_y: f64) {
        self.animation = None;
        let factor = 2f64.powf(-delta * self.wheel_sensitivity);
        let new_scale =
            (self.transform.scale * factor).clamp(self.scale_extent[0], self.scale_extent[1]);
        let ratio = new_scale / self.transform.scale;

        self.transform.translate_x = screen_x - (screen_x - self.transform.translate_x) * ratio;
        self.transform.translate_y = screen_y - (screen_y - self.transform.translate_y) * ratio;
        self.transform.scale = new_scale;
    }

    /// Pan by a screen-space delta. Cancels any running animation.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.animation = None;
        self.transform.translate_x += dx;
        self.transform.translate_y += dy;
    }
}
