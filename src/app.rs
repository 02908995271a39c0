//! egui host: a gallery listing plus the lightbox overlay painted on top of it.

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use eframe::egui;
use lru::LruCache;
use tracing::{debug, warn};

use crate::component::{Node, NodeId, TreeIds};
use crate::config::ViewerOptions;
use crate::geometry::{Dimension, Viewport};
use crate::image_loader::Preloader;
use crate::lightbox::{Host, Lightbox, Phase, ResizeSubscription};
use crate::registry::{ViewerId, ViewerRegistry};
use crate::state::Link;

/// Decoded images kept as GPU textures.
const MAX_CACHED_TEXTURES: usize = 16;
/// Largest texture side uploaded; bigger images are downscaled first.
const MAX_TEXTURE_SIDE: u32 = 4096;
const DETAILS_HEIGHT: f32 = 48.0;

/// [`Host`] backed by the egui window.
#[derive(Debug, Default)]
pub struct EguiHost {
    viewport: Viewport,
    next_subscription: u64,
    resize_subscription: Option<ResizeSubscription>,
    embedded_visible: bool,
    scrolling: bool,
}

impl EguiHost {
    pub fn new() -> Self {
        Self {
            embedded_visible: true,
            scrolling: true,
            ..Self::default()
        }
    }

    /// Record the current window size. Returns true when a subscribed listener
    /// should hear about a resize.
    fn sync(&mut self, screen: egui::Rect) -> bool {
        let resized =
            self.viewport.width != screen.width() || self.viewport.height != screen.height();
        self.viewport = Viewport::new(screen.width(), screen.height());
        resized && self.resize_subscription.is_some()
    }

    pub fn embedded_visible(&self) -> bool {
        self.embedded_visible
    }

    pub fn scrolling(&self) -> bool {
        self.scrolling
    }
}

impl Host for EguiHost {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn document_size(&self) -> Dimension {
        self.viewport.size()
    }

    fn subscribe_resize(&mut self) -> ResizeSubscription {
        let subscription = ResizeSubscription(self.next_subscription);
        self.next_subscription += 1;
        self.resize_subscription = Some(subscription);
        subscription
    }

    fn unsubscribe_resize(&mut self, subscription: ResizeSubscription) {
        if self.resize_subscription == Some(subscription) {
            self.resize_subscription = None;
        }
    }

    fn set_embedded_content_visible(&mut self, visible: bool) {
        self.embedded_visible = visible;
    }

    fn set_page_scrolling(&mut self, enabled: bool) {
        self.scrolling = enabled;
    }
}

/// Screen rectangles of the interactive parts of the overlay.
#[derive(Debug, Default)]
struct HitAreas {
    backdrop: Option<egui::Rect>,
    container: Option<egui::Rect>,
    details: Option<egui::Rect>,
    prev: Option<egui::Rect>,
    next: Option<egui::Rect>,
    nav: Option<egui::Rect>,
    loader: Option<egui::Rect>,
    close: Option<egui::Rect>,
}

impl HitAreas {
    /// Topmost node under `pos`. Anything outside the frame's boxes is the backdrop,
    /// but only once the backdrop has been painted.
    fn node_at(&self, pos: egui::Pos2, ids: &TreeIds) -> Option<NodeId> {
        let hit = |rect: Option<egui::Rect>| rect.is_some_and(|rect| rect.contains(pos));
        if hit(self.close) {
            Some(ids.close)
        } else if hit(self.loader) {
            Some(ids.loader)
        } else if hit(self.prev) {
            Some(ids.prev)
        } else if hit(self.next) {
            Some(ids.next)
        } else if hit(self.container) || hit(self.details) {
            None
        } else if hit(self.backdrop) {
            Some(ids.frame)
        } else {
            None
        }
    }
}

pub struct GalleryApp {
    links: Vec<Link>,
    viewers: ViewerRegistry<EguiHost, Preloader>,
    viewer: ViewerId,
    textures: LruCache<String, Option<egui::TextureHandle>>,
    last_error: Option<String>,
    /// The click that opened the viewer this frame must not reach the overlay.
    opened_this_frame: bool,
}

impl GalleryApp {
    pub fn new(options: Arc<ViewerOptions>, links: Vec<Link>) -> Self {
        let mut viewers = ViewerRegistry::new();
        let viewer = viewers.insert(Lightbox::new(options, EguiHost::new(), Preloader::new()));
        Self {
            links,
            viewers,
            viewer,
            textures: LruCache::new(
                NonZeroUsize::new(MAX_CACHED_TEXTURES).unwrap_or(NonZeroUsize::MIN),
            ),
            last_error: None,
            opened_this_frame: false,
        }
    }

    fn report(&mut self, result: crate::error::Result<()>) {
        if let Err(err) = result {
            warn!(%err, "viewer error");
            self.last_error = Some(err.to_string());
        }
    }

    fn handle_input(&mut self, ctx: &egui::Context) {
        let (keys, moved) = ctx.input(|i| {
            let keys: Vec<egui::Key> = i
                .events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Key {
                        key, pressed: true, ..
                    } => Some(*key),
                    _ => None,
                })
                .collect();
            (keys, i.pointer.delta() != egui::Vec2::ZERO)
        });

        let Some(viewer) = self.viewers.get_mut(self.viewer) else {
            return;
        };
        if moved {
            viewer.on_pointer_moved();
        }
        let mut result = Ok(());
        for key in keys {
            if let Err(err) = viewer.handle_key(key) {
                result = Err(err);
            }
        }
        self.report(result);
    }

    fn gallery_ui(&mut self, ctx: &egui::Context) {
        let (enabled, scrolling) = self
            .viewers
            .get(self.viewer)
            .map_or((true, true), |viewer| {
                (viewer.host().embedded_visible(), viewer.host().scrolling())
            });

        let mut activated = None;
        let mut close_all = false;

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Gallery");
                ui.label(format!("{} images", self.links.len()));
                if ui.button("Close all viewers").clicked() {
                    close_all = true;
                }
                if let Some(error) = &self.last_error {
                    ui.colored_label(egui::Color32::LIGHT_RED, error);
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_enabled_ui(enabled, |ui| {
                egui::ScrollArea::vertical()
                    .enable_scrolling(scrolling)
                    .show(ui, |ui| {
                        if self.links.is_empty() {
                            ui.label("Pass image files or directories on the command line.");
                        }
                        let mut group: Option<&str> = None;
                        for (index, link) in self.links.iter().enumerate() {
                            if link.group.as_deref() != group {
                                group = link.group.as_deref();
                                ui.separator();
                                ui.strong(group.unwrap_or("Ungrouped"));
                            }
                            let label = link.title.as_deref().unwrap_or(&link.href);
                            if ui.link(label).clicked() {
                                activated = Some(index);
                            }
                        }
                    });
            });
        });

        if close_all {
            let closed = self.viewers.close_all();
            debug!(closed, "close all requested");
        }
        if let Some(index) = activated {
            self.open_link(index);
        }
    }

    fn open_link(&mut self, index: usize) {
        self.last_error = None;
        let result = match self.viewers.get_mut(self.viewer) {
            Some(viewer) => viewer.open(&self.links, index),
            None => Ok(()),
        };
        self.opened_this_frame = result.is_ok();
        self.report(result);
    }

    fn texture_for(&mut self, ctx: &egui::Context, href: &str) -> Option<egui::TextureId> {
        if let Some(texture) = self.textures.get(href) {
            return texture.as_ref().map(egui::TextureHandle::id);
        }

        let texture = match image::open(Path::new(href)) {
            Ok(img) => {
                let img = if img.width() > MAX_TEXTURE_SIDE || img.height() > MAX_TEXTURE_SIDE {
                    img.resize(
                        MAX_TEXTURE_SIDE,
                        MAX_TEXTURE_SIDE,
                        image::imageops::FilterType::Triangle,
                    )
                } else {
                    img
                };
                let rgba = img.to_rgba8();
                let color_image = egui::ColorImage::from_rgba_unmultiplied(
                    [rgba.width() as usize, rgba.height() as usize],
                    rgba.as_raw(),
                );
                Some(ctx.load_texture(href, color_image, egui::TextureOptions::LINEAR))
            }
            Err(err) => {
                warn!(href, %err, "could not decode image for display");
                None
            }
        };
        let id = texture.as_ref().map(egui::TextureHandle::id);
        self.textures.put(href.to_string(), texture);
        id
    }

    fn paint_viewer(&mut self, ctx: &egui::Context) {
        let skip_pointer = std::mem::take(&mut self.opened_this_frame);
        let Some(viewer) = self.viewers.get(self.viewer) else {
            return;
        };
        if viewer.phase() == Phase::Closed {
            return;
        }
        let ids = viewer.tree().ids();
        let src = viewer
            .tree()
            .node(ids.image)
            .filter(|image| image.effective_opacity() > 0.0)
            .and_then(|image| image.element.src.clone());
        let texture = src.and_then(|src| self.texture_for(ctx, &src));

        let Some(viewer) = self.viewers.get(self.viewer) else {
            return;
        };
        let tree = viewer.tree();
        let chrome = viewer.options().chrome();
        let screen = ctx.screen_rect();
        let painter = ctx.layer_painter(egui::LayerId::new(
            egui::Order::Foreground,
            egui::Id::new("lightbox"),
        ));

        let opacity = |id: NodeId| tree.node(id).map_or(0.0, Node::effective_opacity);
        let size_of = |id: NodeId| tree.node(id).map_or(Dimension::ZERO, Node::dimension);

        let mut hits = HitAreas::default();
        let overlay_alpha = opacity(ids.overlay);
        if overlay_alpha > 0.0 {
            let overlay = size_of(ids.overlay);
            let rect = egui::Rect::from_min_size(
                screen.min,
                egui::vec2(overlay.width.max(screen.width()), overlay.height.max(screen.height())),
            );
            painter.rect_filled(rect, 0.0, egui::Color32::BLACK.gamma_multiply(overlay_alpha));
            hits.backdrop = Some(rect);
        }

        let frame_alpha = opacity(ids.frame);
        let (left, top) = tree
            .node(ids.frame)
            .and_then(|frame| frame.element.position)
            .unwrap_or((0.0, 0.0));

        if frame_alpha > 0.0 {
            let outer = size_of(ids.outer_container);
            let origin = egui::pos2(
                screen.min.x + left + (screen.width() - outer.width) / 2.0,
                screen.min.y + top,
            );
            let container =
                egui::Rect::from_min_size(origin, egui::vec2(outer.width, outer.height));
            painter.rect_filled(container, 4.0, egui::Color32::WHITE.gamma_multiply(frame_alpha));
            hits.container = Some(container);

            let image_alpha = frame_alpha * opacity(ids.image);
            let image_rect = egui::Rect::from_min_size(
                container.min + egui::vec2(chrome.left, chrome.top),
                {
                    let size = size_of(ids.image);
                    egui::vec2(size.width, size.height)
                },
            );
            if let Some(texture) = texture.filter(|_| image_alpha > 0.0) {
                painter.image(
                    texture,
                    image_rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE.gamma_multiply(image_alpha),
                );
            }

            let loader_alpha = frame_alpha * opacity(ids.loader);
            if loader_alpha > 0.0 {
                let rect = egui::Rect::from_center_size(container.center(), egui::vec2(48.0, 48.0));
                painter.text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "⟳",
                    egui::FontId::proportional(32.0),
                    egui::Color32::GRAY.gamma_multiply(loader_alpha),
                );
                hits.loader = Some(rect);
            }

            let nav_shown = tree.node(ids.nav).is_some_and(Node::is_visible);
            let nav_interactive = tree
                .node(ids.nav)
                .is_some_and(|nav| nav.element.pointer_events);
            if nav_shown {
                hits.nav = Some(container);
            }
            let hover = ctx.input(|i| i.pointer.hover_pos());
            for (id, rect, glyph) in [
                (
                    ids.prev,
                    egui::Rect::from_min_max(
                        container.min,
                        egui::pos2(container.center().x, container.max.y),
                    ),
                    "‹",
                ),
                (
                    ids.next,
                    egui::Rect::from_min_max(
                        egui::pos2(container.center().x, container.min.y),
                        container.max,
                    ),
                    "›",
                ),
            ] {
                let Some(link) = tree.node(id) else { continue };
                if !nav_shown || !link.is_visible() {
                    continue;
                }
                let hovered = hover.is_some_and(|pos| rect.contains(pos));
                let link_alpha = if hovered { 1.0 } else { link.effective_opacity() };
                if link_alpha > 0.0 {
                    let anchor = if id == ids.prev {
                        (egui::pos2(rect.min.x + 24.0, rect.center().y), egui::Align2::LEFT_CENTER)
                    } else {
                        (egui::pos2(rect.max.x - 24.0, rect.center().y), egui::Align2::RIGHT_CENTER)
                    };
                    painter.text(
                        anchor.0,
                        anchor.1,
                        glyph,
                        egui::FontId::proportional(48.0),
                        egui::Color32::WHITE.gamma_multiply(frame_alpha * link_alpha),
                    );
                }
                if nav_interactive {
                    if id == ids.prev {
                        hits.prev = Some(rect);
                    } else {
                        hits.next = Some(rect);
                    }
                }
            }

            let data_alpha = frame_alpha * opacity(ids.data_container);
            if data_alpha > 0.0 {
                let width = size_of(ids.data_container).width.max(outer.width);
                let details = egui::Rect::from_min_size(
                    egui::pos2(container.min.x, container.max.y),
                    egui::vec2(width, DETAILS_HEIGHT),
                );
                hits.details = Some(details);
                let text_color = egui::Color32::from_gray(230);

                let caption_alpha = data_alpha * opacity(ids.caption);
                if let Some(caption) = tree.node(ids.caption).filter(|_| caption_alpha > 0.0) {
                    painter.text(
                        details.min + egui::vec2(chrome.left, 6.0),
                        egui::Align2::LEFT_TOP,
                        caption.element.content.as_plain(),
                        egui::FontId::proportional(15.0),
                        text_color.gamma_multiply(caption_alpha),
                    );
                }

                let number_alpha = data_alpha * opacity(ids.number);
                if let Some(number) = tree.node(ids.number).filter(|_| number_alpha > 0.0) {
                    painter.text(
                        details.min + egui::vec2(chrome.left, 26.0),
                        egui::Align2::LEFT_TOP,
                        number.element.content.as_plain(),
                        egui::FontId::proportional(12.0),
                        egui::Color32::GRAY.gamma_multiply(number_alpha),
                    );
                }

                let close_rect = egui::Rect::from_center_size(
                    egui::pos2(details.max.x - 18.0, details.min.y + 18.0),
                    egui::vec2(28.0, 28.0),
                );
                painter.text(
                    close_rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "✕",
                    egui::FontId::proportional(22.0),
                    text_color.gamma_multiply(data_alpha),
                );
                hits.close = Some(close_rect);
            }
        }

        if !skip_pointer {
            self.dispatch_pointer(ctx, &hits, ids);
        }
    }

    fn dispatch_pointer(&mut self, ctx: &egui::Context, hits: &HitAreas, ids: TreeIds) {
        let (clicked, secondary_pressed, secondary_released, pos) = ctx.input(|i| {
            (
                i.pointer.primary_clicked(),
                i.pointer.button_pressed(egui::PointerButton::Secondary),
                i.pointer.button_released(egui::PointerButton::Secondary),
                i.pointer.interact_pos(),
            )
        });
        let Some(viewer) = self.viewers.get_mut(self.viewer) else {
            return;
        };
        let Some(pos) = pos else {
            return;
        };

        if secondary_pressed && hits.nav.is_some_and(|nav| nav.contains(pos)) {
            viewer.on_nav_pointer_down(egui::PointerButton::Secondary);
        }
        if secondary_released {
            viewer.on_context_menu();
        }
        if clicked {
            if let Some(node) = hits.node_at(pos, &ids) {
                let result = viewer.on_click(node).map(|_| ());
                self.report(result);
            }
        }
    }
}

impl eframe::App for GalleryApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.run_frame(ctx);
    }
}

impl GalleryApp {
    fn run_frame(&mut self, ctx: &egui::Context) {
        let screen = ctx.screen_rect();
        if let Some(viewer) = self.viewers.get_mut(self.viewer) {
            if viewer.host_mut().sync(screen) {
                viewer.on_viewport_resized();
            }
        }

        self.handle_input(ctx);

        for (id, err) in self.viewers.tick_all() {
            debug!(?id, "tick error reported");
            self.last_error = Some(err.to_string());
        }

        self.gallery_ui(ctx);
        self.paint_viewer(ctx);

        if self.viewers.needs_frame() {
            ctx.request_repaint();
        }
    }
}
