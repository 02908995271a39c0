//! Navigation controller
//!
//! [`Lightbox`] owns one viewer instance: its gallery state, node tree and
//! animation scheduler. It reacts to open/next/previous/close requests and
//! sequences each image change:
//! - disable keyboard navigation and hide the dependent nodes
//! - request the image from the [`ImageSource`] and wait for its natural size
//! - fit the size to the viewport and resize the container
//! - reveal image, details and nav links, then prefetch neighbours
//!
//! Continuations are driven by completion tokens from [`Effects`], so the whole
//! sequence advances from [`Lightbox::tick`] without callbacks or threads.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::animation::{Clock, Effects, SystemClock};
use crate::component::{Component, LightboxTree, NodeId, NodeLookup, ViewContext};
use crate::config::{KeyAction, ViewerOptions};
use crate::error::{ImageLoadError, Result, UnsupportedInputError, ViewerError};
use crate::geometry::{Dimension, Viewport};
use crate::layout::fit_to_viewport;
use crate::state::{collect_album, AlbumEntry, GalleryState, Link};

/// Loader fade at the start of every image change.
const LOADER_FADE: Duration = Duration::from_millis(600);
/// Caption and number label fade.
const DETAILS_FADE: Duration = Duration::from_millis(200);

/// Handle for a viewport resize listener registered with the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResizeSubscription(pub u64);

/// Input capabilities reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerCapabilities {
    /// The device accepts touch input.
    pub touch: bool,
}

/// Environment the viewer is displayed in.
pub trait Host {
    fn viewport(&self) -> Viewport;

    /// Full scrollable size of the page under the overlay.
    fn document_size(&self) -> Dimension;

    fn subscribe_resize(&mut self) -> ResizeSubscription;

    fn unsubscribe_resize(&mut self, subscription: ResizeSubscription);

    /// Hide or restore embedded page content that would paint above the overlay.
    fn set_embedded_content_visible(&mut self, visible: bool);

    fn set_page_scrolling(&mut self, enabled: bool);

    fn pointer_capabilities(
        &self,
    ) -> std::result::Result<PointerCapabilities, UnsupportedInputError> {
        Err(UnsupportedInputError(
            "host does not report pointer capabilities".into(),
        ))
    }
}

/// Identifies one image load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket(pub u64);

/// Completion of a load: the natural size of the image, or why it failed.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageLoaded {
    pub ticket: LoadTicket,
    pub result: std::result::Result<Dimension, ImageLoadError>,
}

/// Asynchronous provider of natural image sizes.
pub trait ImageSource {
    /// Start loading `href`. Completion is reported by a later `poll`.
    fn load(&mut self, href: &str) -> LoadTicket;

    /// Warm caches for `href`. Fire-and-forget.
    fn prefetch(&mut self, href: &str);

    /// Drain finished loads.
    fn poll(&mut self) -> Vec<ImageLoaded>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Closed,
    Opening,
    Open,
    Closing,
}

/// Continuations fired when an animation completes.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Step {
    /// Container reached the size needed for this image size.
    ContainerResized(Dimension),
    DetailsShown,
    FrameHidden,
    OverlayHidden,
}

#[derive(Debug, Clone, Copy)]
struct Transition {
    ticket: LoadTicket,
    index: usize,
}

/// One viewer instance.
pub struct Lightbox<H, S> {
    options: Arc<ViewerOptions>,
    host: H,
    images: S,
    state: GalleryState,
    tree: LightboxTree,
    effects: Effects<Step>,
    phase: Phase,
    keyboard_enabled: bool,
    /// Image change waiting for its load or reveal.
    transition: Option<Transition>,
    resize_subscription: Option<ResizeSubscription>,
    touch_capable: bool,
    scrolling_disabled: bool,
}

impl<H: Host, S: ImageSource> Lightbox<H, S> {
    pub fn new(options: Arc<ViewerOptions>, host: H, images: S) -> Self {
        Self::with_clock(options, host, images, Arc::new(SystemClock))
    }

    pub fn with_clock(
        options: Arc<ViewerOptions>,
        host: H,
        images: S,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            options,
            host,
            images,
            state: GalleryState::new(),
            tree: LightboxTree::new(),
            effects: Effects::with_clock(clock),
            phase: Phase::Closed,
            keyboard_enabled: false,
            transition: None,
            resize_subscription: None,
            touch_capable: false,
            scrolling_disabled: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        matches!(self.phase, Phase::Opening | Phase::Open)
    }

    pub fn state(&self) -> &GalleryState {
        &self.state
    }

    pub fn tree(&self) -> &LightboxTree {
        &self.tree
    }

    pub fn options(&self) -> &ViewerOptions {
        &self.options
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn images(&self) -> &S {
        &self.images
    }

    pub fn images_mut(&mut self) -> &mut S {
        &mut self.images
    }

    pub fn keyboard_enabled(&self) -> bool {
        self.keyboard_enabled
    }

    /// An image change is waiting for its load or its reveal.
    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// Whether the host should keep ticking.
    pub fn needs_frame(&self) -> bool {
        !self.effects.is_idle() || self.transition.is_some() || self.phase == Phase::Closing
    }

    /// Suggested delay before the next tick, `None` when nothing is running.
    pub fn frame_interval(&self) -> Option<Duration> {
        self.effects
            .frame_interval()
            .or_else(|| self.transition.map(|_| crate::animation::FALLBACK_FRAME_INTERVAL))
    }

    /// Open the album of the link at `activated`.
    pub fn open(&mut self, links: &[Link], activated: usize) -> Result<()> {
        let (entries, position) = collect_album(links, activated);
        self.open_album(entries, position)
    }

    /// Open `entries`, starting at `requested` (or the first entry).
    pub fn open_album(&mut self, entries: Vec<AlbumEntry>, requested: Option<usize>) -> Result<()> {
        match self.phase {
            Phase::Opening | Phase::Open => return Err(ViewerError::AlreadyOpen),
            Phase::Closing => self.finish_close(),
            Phase::Closed => {}
        }

        self.state.open_album(entries, requested)?;
        self.tree.init();

        self.resize_subscription = Some(self.host.subscribe_resize());
        self.host.set_embedded_content_visible(false);
        self.size_overlay();
        self.probe_pointer();

        let viewport = self.host.viewport();
        let ids = self.tree.ids();
        if let Some(frame) = self.tree.node_mut(ids.frame) {
            frame.element.position = Some((
                viewport.scroll_left,
                viewport.scroll_top + self.options.position_from_top,
            ));
            frame.show(&mut self.effects, self.options.fade_duration, None);
        }

        if self.options.disable_scrolling {
            self.host.set_page_scrolling(false);
            self.scrolling_disabled = true;
        }

        self.phase = Phase::Opening;
        info!(
            len = self.state.len(),
            index = self.state.current_index(),
            "lightbox opened"
        );

        self.change_image(self.state.current_index()).map(|_| ())
    }

    /// Start showing the image at `index`.
    ///
    /// Returns `Ok(false)` without doing anything while closed or while
    /// another change is in flight.
    pub fn change_image(&mut self, index: usize) -> Result<bool> {
        if !self.is_open() || self.transition.is_some() {
            debug!(index, phase = ?self.phase, "image change ignored");
            return Ok(false);
        }
        if index >= self.state.len() {
            return Err(ViewerError::IndexOutOfRange {
                index,
                len: self.state.len(),
            });
        }

        self.keyboard_enabled = false;
        let ids = self.tree.ids();

        if let Some(overlay) = self.tree.node_mut(ids.overlay) {
            if !overlay.is_visible() {
                overlay.show(&mut self.effects, self.options.fade_duration, None);
            }
        }

        self.effects.cancel(ids.loader);
        if let Some(loader) = self.tree.node_mut(ids.loader) {
            loader.show(&mut self.effects, LOADER_FADE, None);
        }

        for id in [
            ids.image,
            ids.nav,
            ids.prev,
            ids.next,
            ids.data_container,
            ids.number,
            ids.caption,
        ] {
            self.hide_now(id);
        }

        if let Some(outer) = self.tree.node_mut(ids.outer_container) {
            outer.element.animating = true;
        }

        self.state.go_to(index);
        let href = self
            .state
            .current_entry()
            .map(|entry| entry.href().to_string())
            .unwrap_or_default();
        let ticket = self.images.load(&href);
        self.transition = Some(Transition { ticket, index });
        debug!(index, href = %href, ?ticket, "changing image");

        self.pump();
        Ok(true)
    }

    /// Step forward. At the last image this wraps or does nothing.
    pub fn next(&mut self) -> Result<bool> {
        match self.state.next_index(self.options.wrap_around) {
            Some(index) => self.change_image(index),
            None => Ok(false),
        }
    }

    /// Step back. At the first image this wraps or does nothing.
    pub fn previous(&mut self) -> Result<bool> {
        match self.state.previous_index(self.options.wrap_around) {
            Some(index) => self.change_image(index),
            None => Ok(false),
        }
    }

    /// Start closing. Fades the frame and overlay out and returns to
    /// [`Phase::Closed`] once both are hidden.
    pub fn close(&mut self) {
        if !self.is_open() {
            return;
        }

        self.keyboard_enabled = false;
        self.transition = None;
        self.effects.cancel_all();

        if let Some(subscription) = self.resize_subscription.take() {
            self.host.unsubscribe_resize(subscription);
        }

        let ids = self.tree.ids();
        let fade = self.options.fade_duration;
        self.phase = Phase::Closing;
        if let Some(frame) = self.tree.node_mut(ids.frame) {
            frame.hide(&mut self.effects, fade, Some(Step::FrameHidden));
        }
        if let Some(overlay) = self.tree.node_mut(ids.overlay) {
            overlay.hide(&mut self.effects, fade, Some(Step::OverlayHidden));
        }

        self.host.set_embedded_content_visible(true);
        if std::mem::take(&mut self.scrolling_disabled) {
            self.host.set_page_scrolling(true);
        }

        info!("lightbox closing");
        self.pump();
    }

    /// Handle a key press. Returns whether the key was consumed.
    pub fn handle_key(&mut self, key: egui::Key) -> Result<bool> {
        if !self.keyboard_enabled || !self.is_open() {
            return Ok(false);
        }

        match self.options.keys.action_for(key) {
            Some(KeyAction::Close) => {
                self.close();
                Ok(true)
            }
            Some(KeyAction::Next) => self.next(),
            Some(KeyAction::Previous) => self.previous(),
            None => Ok(false),
        }
    }

    /// Feed a load completion. Stale completions are ignored.
    ///
    /// A failed load leaves the loader on screen and re-enables the keyboard so
    /// the user can move on or close. A viewer still opening counts as open.
    pub fn on_image_loaded(&mut self, loaded: ImageLoaded) -> Result<()> {
        let Some(transition) = self.transition else {
            trace!(ticket = ?loaded.ticket, "load finished with no transition pending");
            return Ok(());
        };
        if transition.ticket != loaded.ticket {
            trace!(ticket = ?loaded.ticket, "stale load ignored");
            return Ok(());
        }

        let natural = match loaded.result {
            Ok(natural) => natural,
            Err(err) => {
                warn!(index = transition.index, %err, "image failed to load");
                self.transition = None;
                self.keyboard_enabled = true;
                if self.phase == Phase::Opening {
                    self.phase = Phase::Open;
                }
                return Err(err.into());
            }
        };

        let ids = self.tree.ids();
        let ctx = view_context(&self.state, &self.options, self.touch_capable);
        if let Some(image) = self.tree.node_mut(ids.image) {
            image.update(&ctx);
        }

        let size = if self.options.fit_images_in_viewport {
            fit_to_viewport(
                natural,
                self.host.viewport(),
                self.options.chrome(),
                self.options.fit_bounds(),
            )
        } else {
            natural
        };
        debug!(?natural, ?size, "image size known");

        if let Some(image) = self.tree.node_mut(ids.image) {
            image.set_size(size);
        }
        self.size_container(size);
        self.pump();
        Ok(())
    }

    /// Advance loads and animations. Returns the first load error seen.
    pub fn tick(&mut self) -> Result<()> {
        let mut result = Ok(());
        for loaded in self.images.poll() {
            if let Err(err) = self.on_image_loaded(loaded) {
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }

        for step in self.effects.tick(&mut self.tree) {
            self.run_step(step);
        }
        self.pump();
        result
    }

    pub fn on_viewport_resized(&mut self) {
        if self.resize_subscription.is_some() {
            self.size_overlay();
        }
    }

    /// Hover-capable input was seen. Nav links switch to hover reveal.
    pub fn on_pointer_moved(&mut self) {
        if !self.state.mark_user_can_hover() {
            return;
        }
        debug!("hover-capable pointer detected");
        let ids = self.tree.ids();
        let nav_shown = self.tree.node(ids.nav).is_some_and(|nav| nav.is_visible());
        if self.is_open() && nav_shown {
            self.render_nav_links();
        }
    }

    /// Secondary press on the nav layer lets the following context menu reach the image.
    pub fn on_nav_pointer_down(&mut self, button: egui::PointerButton) -> bool {
        if !self.options.enable_right_click || button != egui::PointerButton::Secondary {
            return false;
        }
        let nav = self.tree.ids().nav;
        if let Some(nav) = self.tree.node_mut(nav) {
            nav.element.pointer_events = false;
        }
        true
    }

    pub fn on_context_menu(&mut self) {
        let nav = self.tree.ids().nav;
        if let Some(nav) = self.tree.node_mut(nav) {
            nav.element.pointer_events = true;
        }
    }

    /// Activate the node `id`. Returns whether the click was handled.
    pub fn on_click(&mut self, id: NodeId) -> Result<bool> {
        if !self.is_open() {
            return Ok(false);
        }
        let ids = self.tree.ids();
        if id == ids.prev {
            self.previous()
        } else if id == ids.next {
            self.next()
        } else if [ids.overlay, ids.frame, ids.loader, ids.close].contains(&id) {
            self.close();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn probe_pointer(&mut self) {
        self.touch_capable = match self.host.pointer_capabilities() {
            Ok(capabilities) => capabilities.touch,
            Err(err) => {
                debug!(%err, "assuming no touch input");
                false
            }
        };
    }

    fn hide_now(&mut self, id: NodeId) {
        self.effects.cancel(id);
        if let Some(node) = self.tree.node_mut(id) {
            node.hide_now();
        }
    }

    fn size_overlay(&mut self) {
        let size = self.host.document_size();
        let overlay = self.tree.ids().overlay;
        if let Some(overlay) = self.tree.node_mut(overlay) {
            overlay.set_size(size);
        }
    }

    fn size_container(&mut self, image_size: Dimension) {
        let target = image_size.expand(self.options.chrome());
        let outer = self.tree.ids().outer_container;
        let Some(node) = self.tree.node_mut(outer) else {
            return;
        };

        if node.dimension() != target {
            self.effects.resize(
                node,
                target,
                self.options.resize_duration,
                self.options.resize_easing,
                Some(Step::ContainerResized(image_size)),
            );
        } else {
            self.post_resize(image_size);
        }
    }

    fn post_resize(&mut self, image_size: Dimension) {
        if self.transition.is_none() {
            return;
        }
        let target = image_size.expand(self.options.chrome());
        let ids = self.tree.ids();
        if let Some(data) = self.tree.node_mut(ids.data_container) {
            data.set_width(target.width);
        }
        for id in [ids.prev, ids.next] {
            if let Some(link) = self.tree.node_mut(id) {
                link.set_height(target.height);
            }
        }
        self.show_image();
    }

    fn show_image(&mut self) {
        let ids = self.tree.ids();
        self.hide_now(ids.loader);
        if let Some(image) = self.tree.node_mut(ids.image) {
            image.show(&mut self.effects, self.options.image_fade_duration, None);
        }

        self.update_nav();
        self.update_details();
        self.prefetch_neighbours();

        self.keyboard_enabled = true;
        self.transition = None;
        if self.phase == Phase::Opening {
            self.phase = Phase::Open;
        }
        debug!(index = self.state.current_index(), "image shown");
    }

    fn update_nav(&mut self) {
        let nav = self.tree.ids().nav;
        if let Some(nav) = self.tree.node_mut(nav) {
            nav.show_now();
        }
        self.render_nav_links();
    }

    fn render_nav_links(&mut self) {
        let ids = self.tree.ids();
        let ctx = view_context(&self.state, &self.options, self.touch_capable);
        for id in [ids.prev, ids.next] {
            if let Some(link) = self.tree.node_mut(id) {
                link.render(&ctx, &mut self.effects);
            }
        }
    }

    fn update_details(&mut self) {
        let ids = self.tree.ids();
        let ctx = view_context(&self.state, &self.options, self.touch_capable);

        let has_title = self
            .state
            .current_entry()
            .and_then(AlbumEntry::title)
            .is_some_and(|title| !title.is_empty());
        if has_title {
            if let Some(caption) = self.tree.node_mut(ids.caption) {
                caption.update(&ctx);
                caption.show(&mut self.effects, DETAILS_FADE, None);
            }
        }

        if let Some(number) = self.tree.node_mut(ids.number) {
            if self.state.len() > 1 && self.options.show_image_number_label {
                number.update(&ctx);
                number.show(&mut self.effects, DETAILS_FADE, None);
            } else {
                number.hide_now();
            }
        }

        if let Some(outer) = self.tree.node_mut(ids.outer_container) {
            outer.element.animating = false;
        }

        if let Some(data) = self.tree.node_mut(ids.data_container) {
            data.show(
                &mut self.effects,
                self.options.resize_duration,
                Some(Step::DetailsShown),
            );
        }
    }

    fn prefetch_neighbours(&mut self) {
        let index = self.state.current_index();
        let album = self.state.album();
        if let Some(next) = album.get(index + 1) {
            self.images.prefetch(next.href());
        }
        if let Some(previous) = index.checked_sub(1).and_then(|i| album.get(i)) {
            self.images.prefetch(previous.href());
        }
    }

    fn run_step(&mut self, step: Step) {
        trace!(?step, "animation step finished");
        match step {
            Step::ContainerResized(image_size) => self.post_resize(image_size),
            Step::DetailsShown => self.size_overlay(),
            Step::FrameHidden | Step::OverlayHidden => {
                let ids = self.tree.ids();
                let hidden = |id| self.tree.node(id).map_or(true, |node| !node.is_visible());
                if self.phase == Phase::Closing && hidden(ids.frame) && hidden(ids.overlay) {
                    self.finish_close();
                }
            }
        }
    }

    /// Run continuations of animations that finished outside `tick`.
    fn pump(&mut self) {
        while let Some(step) = self.effects.pop_ready() {
            self.run_step(step);
        }
    }

    fn finish_close(&mut self) {
        self.effects.cancel_all();
        let ids = self.tree.ids();
        for id in [ids.frame, ids.overlay] {
            if let Some(node) = self.tree.node_mut(id) {
                node.hide_now();
            }
        }
        self.transition = None;
        self.keyboard_enabled = false;
        self.state.clear();
        self.phase = Phase::Closed;
        info!("lightbox closed");
    }
}

/// Always-show only forces opaque links on touch devices.
fn view_context<'a>(
    state: &'a GalleryState,
    options: &'a ViewerOptions,
    touch_capable: bool,
) -> ViewContext<'a> {
    ViewContext {
        always_show_nav: options.always_show_nav && touch_capable,
        ..ViewContext::new(state, options)
    }
}
