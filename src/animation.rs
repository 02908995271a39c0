//! Animation scheduler
//!
//! Drives the viewer's transitions without any platform animation primitive:
//! - Opacity fades (in towards a node's resting opacity, out towards zero)
//! - Container size interpolation between two dimensions
//!
//! Each running animation is an explicit timed state machine advanced by
//! [`Effects::tick`]. Completion tokens are handed back to the caller instead of
//! invoking closures, so the owner decides what runs next.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::trace;

use crate::component::{Node, NodeId, NodeLookup};
use crate::geometry::Dimension;

/// Duration used when a caller does not pick one.
pub const DEFAULT_DURATION: Duration = Duration::from_millis(400);

/// Tick interval for hosts without a per-frame callback.
pub const FALLBACK_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Source of the current time. Swappable so transitions can be driven deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// Easing function type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EasingFunction {
    /// Linear interpolation
    #[default]
    Linear,
    /// Half cosine, slow at both ends
    Swing,
}

impl EasingFunction {
    /// Apply the easing function to a value t in [0, 1]
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);

        match self {
            EasingFunction::Linear => t,
            EasingFunction::Swing => 0.5 - (t * std::f32::consts::PI).cos() / 2.0,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "linear" => Some(Self::Linear),
            "swing" | "ease" | "ease_in_out" => Some(Self::Swing),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Swing => "swing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FadeDirection {
    In,
    Out,
}

/// A single opacity fade. Opacity moves by `elapsed / duration` per tick.
#[derive(Debug)]
struct Fade<C> {
    node: NodeId,
    direction: FadeDirection,
    duration: Duration,
    last_tick: Instant,
    resting: f32,
    on_done: Option<C>,
}

impl<C> Fade<C> {
    /// Advance one tick. Returns true once the fade has finished.
    fn step(&mut self, node: &mut Node, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        let delta = progress(elapsed, self.duration);

        match self.direction {
            FadeDirection::In => {
                let next = node.opacity().unwrap_or(0.0) + delta;
                if next < self.resting {
                    node.set_opacity(Some(next));
                    false
                } else {
                    node.set_opacity(Some(self.resting));
                    true
                }
            }
            FadeDirection::Out => {
                let next = node.opacity().unwrap_or(1.0) - delta;
                if next > 0.0 {
                    node.set_opacity(Some(next));
                    false
                } else {
                    node.set_visible(false);
                    node.set_opacity(None);
                    true
                }
            }
        }
    }
}

/// A size interpolation from `from` to `to` over `duration`.
#[derive(Debug)]
struct Resize<C> {
    node: NodeId,
    from: Dimension,
    to: Dimension,
    start_time: Instant,
    duration: Duration,
    easing: EasingFunction,
    on_done: Option<C>,
}

impl<C> Resize<C> {
    fn step(&mut self, node: &mut Node, now: Instant) -> bool {
        let t = progress(now.saturating_duration_since(self.start_time), self.duration);
        if t >= 1.0 {
            node.set_size(self.to);
            true
        } else {
            node.set_size(self.from.lerp(self.to, self.easing.apply(t)));
            false
        }
    }
}

fn progress(elapsed: Duration, duration: Duration) -> f32 {
    if duration.is_zero() {
        f32::INFINITY
    } else {
        elapsed.as_secs_f32() / duration.as_secs_f32()
    }
}

/// Manages all running animations for one viewer.
///
/// Overlapping fades on the same node are not coalesced; each keeps ticking on
/// its own. Callers that need exclusivity should [`cancel`](Self::cancel) first.
pub struct Effects<C> {
    clock: Arc<dyn Clock>,
    fades: Vec<Fade<C>>,
    resizes: Vec<Resize<C>>,
    /// Completions produced outside of `tick` (zero-length animations).
    ready: VecDeque<C>,
}

impl<C> Effects<C> {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            fades: Vec::new(),
            resizes: Vec::new(),
            ready: VecDeque::new(),
        }
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Start fading `node` in from 0 towards its resting opacity. The node is
    /// made visible immediately and the first tick runs before returning.
    pub fn fade_in(&mut self, node: &mut Node, duration: Duration, on_done: Option<C>) {
        node.set_opacity(Some(0.0));
        node.set_visible(true);
        let fade = Fade {
            node: node.id(),
            direction: FadeDirection::In,
            duration,
            last_tick: self.now(),
            resting: node.resting_opacity(),
            on_done,
        };
        self.start_fade(node, fade);
    }

    /// Start fading `node` out from fully opaque. Once transparent the node is
    /// hidden and its opacity reset to unset.
    pub fn fade_out(&mut self, node: &mut Node, duration: Duration, on_done: Option<C>) {
        node.set_opacity(Some(1.0));
        let fade = Fade {
            node: node.id(),
            direction: FadeDirection::Out,
            duration,
            last_tick: self.now(),
            resting: node.resting_opacity(),
            on_done,
        };
        self.start_fade(node, fade);
    }

    fn start_fade(&mut self, node: &mut Node, mut fade: Fade<C>) {
        let now = fade.last_tick;
        if fade.step(node, now) {
            trace!(node = ?node.id(), "fade finished on first tick");
            self.ready.extend(fade.on_done);
        } else {
            self.fades.push(fade);
        }
    }

    /// Interpolate the size of `node` to `to`.
    pub fn resize(
        &mut self,
        node: &mut Node,
        to: Dimension,
        duration: Duration,
        easing: EasingFunction,
        on_done: Option<C>,
    ) {
        let mut resize = Resize {
            node: node.id(),
            from: node.dimension(),
            to,
            start_time: self.now(),
            duration,
            easing,
            on_done,
        };
        if resize.step(node, resize.start_time) {
            self.ready.extend(resize.on_done);
        } else {
            self.resizes.push(resize);
        }
    }

    /// Drop every running animation on `node` without firing completions.
    pub fn cancel(&mut self, node: NodeId) {
        self.fades.retain(|fade| fade.node != node);
        self.resizes.retain(|resize| resize.node != node);
    }

    /// Drop everything, including completions not yet collected.
    pub fn cancel_all(&mut self) {
        self.fades.clear();
        self.resizes.clear();
        self.ready.clear();
    }

    pub fn is_animating(&self, node: NodeId) -> bool {
        self.fades.iter().any(|fade| fade.node == node)
            || self.resizes.iter().any(|resize| resize.node == node)
    }

    /// True when nothing is running and no completion is waiting.
    pub fn is_idle(&self) -> bool {
        self.fades.is_empty() && self.resizes.is_empty() && self.ready.is_empty()
    }

    /// Suggested delay before the next tick, `None` when idle.
    pub fn frame_interval(&self) -> Option<Duration> {
        (!self.is_idle()).then_some(FALLBACK_FRAME_INTERVAL)
    }

    /// Take one completion produced by a zero-length animation.
    pub fn pop_ready(&mut self) -> Option<C> {
        self.ready.pop_front()
    }

    /// Advance every animation to the clock's current time and return the
    /// completion tokens of those that finished, oldest first.
    pub fn tick<T: NodeLookup + ?Sized>(&mut self, tree: &mut T) -> Vec<C> {
        let now = self.now();
        let mut finished: Vec<C> = self.ready.drain(..).collect();

        let mut i = 0;
        while i < self.fades.len() {
            let node_id = self.fades[i].node;
            match tree.node_mut(node_id) {
                Some(node) => {
                    if self.fades[i].step(node, now) {
                        finished.extend(self.fades.remove(i).on_done);
                    } else {
                        i += 1;
                    }
                }
                None => {
                    trace!(node = ?node_id, "fade target gone, dropping");
                    self.fades.remove(i);
                }
            }
        }

        let mut i = 0;
        while i < self.resizes.len() {
            let node_id = self.resizes[i].node;
            match tree.node_mut(node_id) {
                Some(node) => {
                    if self.resizes[i].step(node, now) {
                        finished.extend(self.resizes.remove(i).on_done);
                    } else {
                        i += 1;
                    }
                }
                None => {
                    self.resizes.remove(i);
                }
            }
        }

        finished
    }
}

impl<C> Default for Effects<C> {
    fn default() -> Self {
        Self::new()
    }
}
