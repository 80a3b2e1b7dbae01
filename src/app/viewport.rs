use std::time::Duration;

use eframe::egui::{Pos2, Rect, Vec2, pos2, vec2};
use tracing::{debug, warn};

use crate::config::Smoothing;

pub(crate) const TICK_RATE_HZ: f64 = 30.0;
pub(crate) const ZOOM_STEP: f32 = 1.15;
const MIN_ZOOM: f32 = 1e-3;
const MAX_ZOOM: f32 = 1e3;
const SCALE_EPSILON: f32 = 1e-6;
const MAX_CATCH_UP_TICKS: u32 = 8;
const SETTLE_EPSILON: f32 = 1e-3;

/// Uniform scale plus translation: `screen = raster * scale + offset`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ViewTransform {
    pub scale: f32,
    pub offset: Vec2,
}

impl ViewTransform {
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        offset: Vec2::ZERO,
    };

    pub fn apply(self, point: Pos2) -> Pos2 {
        pos2(
            point.x * self.scale + self.offset.x,
            point.y * self.scale + self.offset.y,
        )
    }

    pub fn apply_vec(self, delta: Vec2) -> Vec2 {
        delta * self.scale
    }

    pub fn apply_rect(self, rect: Rect) -> Rect {
        Rect::from_min_max(self.apply(rect.min), self.apply(rect.max))
    }

    /// Inverse mapping; a degenerate scale is clamped to a small epsilon.
    pub fn inverse(self) -> Self {
        let scale = if self.scale.is_finite() && self.scale.abs() > SCALE_EPSILON {
            self.scale
        } else {
            SCALE_EPSILON
        };
        Self {
            scale: 1.0 / scale,
            offset: -self.offset / scale,
        }
    }
}

/// One smoothed value chasing its target with a damped spring.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Chase {
    target: f32,
    chased: f32,
    velocity: f32,
}

impl Chase {
    fn at(value: f32) -> Self {
        Self {
            target: value,
            chased: value,
            velocity: 0.0,
        }
    }

    fn step(&mut self, smoothing: Smoothing) {
        self.velocity += (self.target - self.chased) * smoothing.accel;
        self.velocity *= smoothing.drag;
        self.chased += self.velocity;
    }

    fn is_settled(&self, tolerance: f32) -> bool {
        (self.target - self.chased).abs() <= tolerance && self.velocity.abs() <= tolerance
    }
}

/// Fixed-rate tick schedule with an explicit running/stopped state.
#[derive(Clone, Debug)]
pub(crate) struct TickLoop {
    interval: f64,
    last_tick: Option<f64>,
}

impl TickLoop {
    pub fn new(rate_hz: f64) -> Self {
        Self {
            interval: 1.0 / rate_hz.max(1.0),
            last_tick: None,
        }
    }

    pub fn start(&mut self, now: f64) {
        self.last_tick = Some(now);
    }

    pub fn stop(&mut self) {
        self.last_tick = None;
    }

    pub fn is_running(&self) -> bool {
        self.last_tick.is_some()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval)
    }

    /// Whole ticks elapsed since the last call. After a long stall only a
    /// bounded number is replayed and the schedule restarts from `now`.
    pub fn due(&mut self, now: f64) -> u32 {
        let Some(last) = self.last_tick else {
            return 0;
        };

        let elapsed = now - last;
        if !elapsed.is_finite() || elapsed < self.interval {
            return 0;
        }

        let ticks = (elapsed / self.interval).floor();
        if ticks > f64::from(MAX_CATCH_UP_TICKS) {
            self.last_tick = Some(now);
            return MAX_CATCH_UP_TICKS;
        }

        self.last_tick = Some(last + ticks * self.interval);
        ticks as u32
    }
}

/// Inertial pan/zoom camera over the cached matrix raster.
///
/// The pan is the raster-space point shown at the view rect's top-left
/// corner. Pointer input only moves targets; [`ViewportController::tick`]
/// moves the displayed ("chased") values toward them.
#[derive(Clone, Debug)]
pub(crate) struct ViewportController {
    pan_x: Chase,
    pan_y: Chase,
    scale: Chase,
    smoothing: Smoothing,
    view_rect: Rect,
    raster_size: Vec2,
    fit_scale: f32,
    forward: ViewTransform,
    inverse: ViewTransform,
    ticks: TickLoop,
    /// Settled at the end of the last `advance`; the next input restarts the
    /// tick schedule instead of replaying the idle gap.
    idle: bool,
    wake: bool,
}

impl ViewportController {
    /// Fits the raster into `view_rect` and starts ticking.
    pub fn open(view_rect: Rect, raster_size: Vec2, smoothing: Smoothing, now: f64) -> Self {
        let fit_scale = fit_scale(view_rect.size(), raster_size);
        let pan = centered_pan(view_rect.size(), raster_size, fit_scale);

        let mut viewport = Self {
            pan_x: Chase::at(pan.x),
            pan_y: Chase::at(pan.y),
            scale: Chase::at(fit_scale),
            smoothing,
            view_rect,
            raster_size,
            fit_scale,
            forward: ViewTransform::IDENTITY,
            inverse: ViewTransform::IDENTITY,
            ticks: TickLoop::new(TICK_RATE_HZ),
            idle: true,
            wake: false,
        };
        viewport.rebuild_transforms();
        viewport.ticks.start(now);

        debug!(fit_scale, width = raster_size.x, height = raster_size.y, "viewport opened");
        viewport
    }

    pub fn close(&mut self) {
        if self.ticks.is_running() {
            debug!("viewport closed");
        }
        self.ticks.stop();
    }

    pub fn is_running(&self) -> bool {
        self.ticks.is_running()
    }

    pub fn tick_interval(&self) -> Duration {
        self.ticks.interval()
    }

    /// Ignores constants that would stall the chase.
    pub fn set_smoothing(&mut self, smoothing: Smoothing) -> bool {
        if !smoothing.is_valid() {
            warn!(accel = smoothing.accel, drag = smoothing.drag, "ignoring invalid smoothing");
            return false;
        }
        self.smoothing = smoothing;
        true
    }

    pub fn set_view_rect(&mut self, rect: Rect) {
        if self.view_rect != rect {
            self.view_rect = rect;
            self.rebuild_transforms();
        }
    }

    /// Runs every tick that became due since the previous call.
    pub fn advance(&mut self, now: f64) -> u32 {
        let due = if self.wake && self.ticks.is_running() {
            self.ticks.start(now);
            1
        } else {
            self.ticks.due(now)
        };
        self.wake = false;

        for _ in 0..due {
            self.tick();
        }
        self.idle = self.is_settled();
        due
    }

    fn wake_up(&mut self) {
        if self.idle {
            self.wake = true;
            self.idle = false;
        }
    }

    pub fn tick(&mut self) {
        self.pan_x.step(self.smoothing);
        self.pan_y.step(self.smoothing);
        self.scale.step(self.smoothing);

        if self.scale.chased.is_nan() || self.scale.chased <= SCALE_EPSILON {
            self.scale.chased = SCALE_EPSILON;
            self.scale.velocity = 0.0;
        }

        self.rebuild_transforms();
    }

    fn rebuild_transforms(&mut self) {
        let scale = self.scale.chased;
        let pan = vec2(self.pan_x.chased, self.pan_y.chased);
        self.forward = ViewTransform {
            scale,
            offset: self.view_rect.min.to_vec2() - pan * scale,
        };
        self.inverse = self.forward.inverse();
    }

    pub fn forward(&self) -> ViewTransform {
        self.forward
    }

    pub fn inverse(&self) -> ViewTransform {
        self.inverse
    }

    pub fn fit_scale(&self) -> f32 {
        self.fit_scale
    }

    pub fn target_scale(&self) -> f32 {
        self.scale.target
    }

    pub fn chased_scale(&self) -> f32 {
        self.scale.chased
    }

    pub fn is_settled(&self) -> bool {
        let pan_tolerance = SETTLE_EPSILON / self.scale.chased.max(SCALE_EPSILON);
        self.pan_x.is_settled(pan_tolerance)
            && self.pan_y.is_settled(pan_tolerance)
            && self.scale.is_settled(SETTLE_EPSILON * self.scale.target.abs().max(SCALE_EPSILON))
    }

    /// Screen-space rectangle currently covered by the raster.
    pub fn raster_rect(&self) -> Rect {
        self.forward
            .apply_rect(Rect::from_min_size(Pos2::ZERO, self.raster_size))
    }

    /// Grab-and-drag: the raster follows the pointer.
    pub fn drag_by(&mut self, screen_delta: Vec2) {
        self.wake_up();
        let raster_delta = self.inverse.apply_vec(screen_delta);
        self.pan_x.target -= raster_delta.x;
        self.pan_y.target -= raster_delta.y;
    }

    /// Zooms by `ZOOM_STEP` per notch (negative notches zoom out), keeping the
    /// raster point under `pointer` under it once the camera settles.
    pub fn zoom_at(&mut self, pointer: Pos2, notches: i32) {
        if notches == 0 {
            return;
        }
        self.wake_up();

        let anchor = self.inverse.apply(pointer);
        let scale = (self.scale.target * ZOOM_STEP.powi(notches)).clamp(MIN_ZOOM, MAX_ZOOM);
        let from_origin = (pointer - self.view_rect.min) / scale;

        self.pan_x.target = anchor.x - from_origin.x;
        self.pan_y.target = anchor.y - from_origin.y;
        self.scale.target = scale;
    }

    /// Back to the scale and centering computed when the viewer opened.
    pub fn reset(&mut self) {
        self.wake_up();
        let pan = centered_pan(self.view_rect.size(), self.raster_size, self.fit_scale);
        self.pan_x.target = pan.x;
        self.pan_y.target = pan.y;
        self.scale.target = self.fit_scale;
    }
}

fn fit_scale(view: Vec2, raster: Vec2) -> f32 {
    if raster.x <= 0.0 || raster.y <= 0.0 || view.x <= 0.0 || view.y <= 0.0 {
        return 1.0;
    }
    (view.x / raster.x)
        .min(view.y / raster.y)
        .clamp(MIN_ZOOM, MAX_ZOOM)
}

fn centered_pan(view: Vec2, raster: Vec2, scale: f32) -> Vec2 {
    (raster - view / scale.max(SCALE_EPSILON)) * 0.5
}
