use std::sync::Arc;
use std::time::Duration;

use lightbox_viewer::{
    AlbumEntry, Dimension, Host, ImageLoadError, ImageLoaded, ImageSource, Lightbox, Link,
    LoadTicket, ManualClock, Phase, PointerCapabilities, ResizeSubscription, UnsupportedInputError,
    ViewerError, ViewerOptions, ViewerRegistry, Viewport,
};

#[derive(Debug)]
struct FakeHost {
    viewport: Viewport,
    next_subscription: u64,
    subscribed: Option<ResizeSubscription>,
    embedded_visible: bool,
    scrolling: bool,
    touch: Option<bool>,
}

impl FakeHost {
    fn new() -> Self {
        Self {
            viewport: Viewport::new(1000.0, 800.0),
            next_subscription: 0,
            subscribed: None,
            embedded_visible: true,
            scrolling: true,
            touch: None,
        }
    }
}

impl Host for FakeHost {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn document_size(&self) -> Dimension {
        Dimension::new(self.viewport.width, self.viewport.height * 2.0)
    }

    fn subscribe_resize(&mut self) -> ResizeSubscription {
        self.next_subscription += 1;
        let subscription = ResizeSubscription(self.next_subscription);
        self.subscribed = Some(subscription);
        subscription
    }

    fn unsubscribe_resize(&mut self, subscription: ResizeSubscription) {
        assert_eq!(self.subscribed, Some(subscription));
        self.subscribed = None;
    }

    fn set_embedded_content_visible(&mut self, visible: bool) {
        self.embedded_visible = visible;
    }

    fn set_page_scrolling(&mut self, enabled: bool) {
        self.scrolling = enabled;
    }

    fn pointer_capabilities(&self) -> Result<PointerCapabilities, UnsupportedInputError> {
        self.touch
            .map(|touch| PointerCapabilities { touch })
            .ok_or_else(|| UnsupportedInputError("no probe".into()))
    }
}

#[derive(Debug, Default)]
struct FakeImages {
    next_ticket: u64,
    requests: Vec<(LoadTicket, String)>,
    prefetched: Vec<String>,
    finished: Vec<ImageLoaded>,
}

impl FakeImages {
    fn last_ticket(&self) -> LoadTicket {
        self.requests.last().map(|(ticket, _)| *ticket).unwrap()
    }

    fn complete(&mut self, size: Dimension) {
        let ticket = self.last_ticket();
        self.finished.push(ImageLoaded {
            ticket,
            result: Ok(size),
        });
    }

    fn fail(&mut self) {
        let (ticket, href) = self.requests.last().cloned().unwrap();
        self.finished.push(ImageLoaded {
            ticket,
            result: Err(ImageLoadError::new(href, "decode error")),
        });
    }
}

impl ImageSource for FakeImages {
    fn load(&mut self, href: &str) -> LoadTicket {
        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket += 1;
        self.requests.push((ticket, href.to_string()));
        ticket
    }

    fn prefetch(&mut self, href: &str) {
        self.prefetched.push(href.to_string());
    }

    fn poll(&mut self) -> Vec<ImageLoaded> {
        std::mem::take(&mut self.finished)
    }
}

type TestViewer = Lightbox<FakeHost, FakeImages>;

const SETTLE: Duration = Duration::from_millis(800);

fn viewer_with(options: ViewerOptions) -> (Arc<ManualClock>, TestViewer) {
    let clock = Arc::new(ManualClock::new());
    let viewer = Lightbox::with_clock(
        Arc::new(options),
        FakeHost::new(),
        FakeImages::default(),
        clock.clone(),
    );
    (clock, viewer)
}

fn album(len: usize) -> Vec<AlbumEntry> {
    (0..len)
        .map(|i| AlbumEntry::new(format!("img{i}.png"), None, Some(format!("Image {i}"))).unwrap())
        .collect()
}

/// Deliver the pending load and let every animation run out.
fn settle(clock: &ManualClock, viewer: &mut TestViewer, size: Dimension) {
    viewer.images_mut().complete(size);
    viewer.tick().unwrap();
    clock.advance(SETTLE);
    viewer.tick().unwrap();
}

fn visible(viewer: &TestViewer, id: lightbox_viewer::component::NodeId) -> bool {
    viewer.tree().node(id).unwrap().is_visible()
}

#[test]
fn open_reveals_image_and_enables_keyboard() {
    let (clock, mut viewer) = viewer_with(ViewerOptions::default());
    viewer.open_album(album(3), Some(1)).unwrap();

    assert_eq!(viewer.phase(), Phase::Opening);
    assert!(!viewer.keyboard_enabled());
    assert!(viewer.is_transitioning());
    assert_eq!(
        viewer.frame_interval(),
        Some(lightbox_viewer::animation::FALLBACK_FRAME_INTERVAL)
    );
    assert_eq!(viewer.images().requests[0].1, "img1.png");
    assert!(!viewer.host().embedded_visible);
    assert!(viewer.host().subscribed.is_some());

    settle(&clock, &mut viewer, Dimension::new(400.0, 300.0));

    let ids = viewer.tree().ids();
    assert_eq!(viewer.phase(), Phase::Open);
    assert!(viewer.keyboard_enabled());
    assert!(!viewer.is_transitioning());
    assert!(visible(&viewer, ids.image));
    assert!(!visible(&viewer, ids.loader));
    assert!(visible(&viewer, ids.prev));
    assert!(visible(&viewer, ids.next));
    assert_eq!(
        viewer.tree().node(ids.number).unwrap().element.content.as_plain(),
        "Image 2 of 3"
    );
    assert_eq!(
        viewer.tree().node(ids.outer_container).unwrap().dimension(),
        Dimension::new(416.0, 316.0)
    );
    assert_eq!(viewer.images().prefetched, ["img2.png", "img0.png"]);
}

#[test]
fn frame_is_positioned_from_top() {
    let (_clock, mut viewer) = viewer_with(ViewerOptions::default());
    viewer.host_mut().viewport.scroll_top = 100.0;
    viewer.open_album(album(1), None).unwrap();
    let frame = viewer.tree().frame();
    assert_eq!(frame.element.position, Some((0.0, 150.0)));
}

#[test]
fn large_image_is_fitted_to_viewport() {
    let (clock, mut viewer) = viewer_with(ViewerOptions::default());
    viewer.open_album(album(1), None).unwrap();
    settle(&clock, &mut viewer, Dimension::new(2000.0, 1000.0));

    let ids = viewer.tree().ids();
    assert_eq!(
        viewer.tree().node(ids.image).unwrap().dimension(),
        Dimension::new(964.0, 482.0)
    );
    assert_eq!(
        viewer.tree().node(ids.data_container).unwrap().dimension().width,
        980.0
    );
}

#[test]
fn fit_can_be_disabled() {
    let (clock, mut viewer) = viewer_with(ViewerOptions {
        fit_images_in_viewport: false,
        ..ViewerOptions::default()
    });
    viewer.open_album(album(1), None).unwrap();
    settle(&clock, &mut viewer, Dimension::new(2000.0, 1000.0));

    let ids = viewer.tree().ids();
    assert_eq!(
        viewer.tree().node(ids.image).unwrap().dimension(),
        Dimension::new(2000.0, 1000.0)
    );
}

#[test]
fn next_at_end_wraps_when_enabled() {
    let (clock, mut viewer) = viewer_with(ViewerOptions {
        wrap_around: true,
        ..ViewerOptions::default()
    });
    viewer.open_album(album(3), Some(2)).unwrap();
    settle(&clock, &mut viewer, Dimension::new(400.0, 300.0));

    assert!(viewer.handle_key(egui::Key::ArrowRight).unwrap());
    assert_eq!(viewer.state().current_index(), 0);
}

#[test]
fn next_at_end_is_noop_without_wrap() {
    let (clock, mut viewer) = viewer_with(ViewerOptions::default());
    viewer.open_album(album(3), Some(2)).unwrap();
    settle(&clock, &mut viewer, Dimension::new(400.0, 300.0));

    assert!(!viewer.handle_key(egui::Key::ArrowRight).unwrap());
    assert_eq!(viewer.state().current_index(), 2);
    assert!(!visible(&viewer, viewer.tree().ids().next));

    assert!(viewer.handle_key(egui::Key::P).unwrap());
    assert_eq!(viewer.state().current_index(), 1);
}

#[test]
fn navigation_is_ignored_mid_transition() {
    let (_clock, mut viewer) = viewer_with(ViewerOptions::default());
    viewer.open_album(album(3), None).unwrap();

    assert!(!viewer.handle_key(egui::Key::ArrowRight).unwrap());
    assert!(!viewer.next().unwrap());
    assert_eq!(viewer.state().current_index(), 0);
    assert_eq!(viewer.images().requests.len(), 1);
}

#[test]
fn same_size_image_reveals_without_resize() {
    let (clock, mut viewer) = viewer_with(ViewerOptions::default());
    viewer.open_album(album(3), None).unwrap();
    settle(&clock, &mut viewer, Dimension::new(400.0, 300.0));

    assert!(viewer.next().unwrap());
    viewer.images_mut().complete(Dimension::new(400.0, 300.0));
    viewer.tick().unwrap();

    assert!(viewer.keyboard_enabled());
    assert!(!viewer.is_transitioning());
    assert_eq!(viewer.state().current_index(), 1);
}

#[test]
fn reveal_waits_for_resize_to_finish() {
    let (clock, mut viewer) = viewer_with(ViewerOptions::default());
    viewer.open_album(album(3), None).unwrap();
    settle(&clock, &mut viewer, Dimension::new(400.0, 300.0));
    let image = viewer.tree().ids().image;

    assert!(viewer.next().unwrap());
    viewer.images_mut().complete(Dimension::new(800.0, 500.0));
    viewer.tick().unwrap();

    assert!(!visible(&viewer, image));
    assert!(!viewer.keyboard_enabled());
    assert!(viewer.is_transitioning());
    assert!(!viewer.next().unwrap());
    assert_eq!(viewer.state().current_index(), 1);

    clock.advance(viewer.options().resize_duration + Duration::from_millis(1));
    viewer.tick().unwrap();

    assert!(visible(&viewer, image));
    assert!(viewer.keyboard_enabled());
    assert!(!viewer.is_transitioning());
}

#[test]
fn stale_load_is_ignored() {
    let (_clock, mut viewer) = viewer_with(ViewerOptions::default());
    viewer.open_album(album(2), None).unwrap();
    viewer
        .on_image_loaded(ImageLoaded {
            ticket: LoadTicket(99),
            result: Ok(Dimension::new(10.0, 10.0)),
        })
        .unwrap();
    assert!(viewer.is_transitioning());
}

#[test]
fn failed_load_keeps_loader_and_frees_keyboard() {
    let (clock, mut viewer) = viewer_with(ViewerOptions::default());
    viewer.open_album(album(2), None).unwrap();
    viewer.images_mut().fail();

    let err = viewer.tick().unwrap_err();
    assert!(matches!(err, ViewerError::ImageLoad(_)));
    assert!(viewer.keyboard_enabled());
    assert!(!viewer.is_transitioning());

    clock.advance(SETTLE);
    viewer.tick().unwrap();
    assert!(visible(&viewer, viewer.tree().ids().loader));

    assert!(viewer.handle_key(egui::Key::N).unwrap());
    assert_eq!(viewer.state().current_index(), 1);
}

#[test]
fn failed_first_load_still_opens_viewer() {
    let (clock, mut viewer) = viewer_with(ViewerOptions::default());
    viewer.open_album(album(1), None).unwrap();
    assert_eq!(viewer.phase(), Phase::Opening);

    viewer.images_mut().fail();
    assert!(viewer.tick().is_err());
    assert_eq!(viewer.phase(), Phase::Open);

    viewer.close();
    clock.advance(SETTLE);
    viewer.tick().unwrap();
    assert_eq!(viewer.phase(), Phase::Closed);
    viewer.open_album(album(2), None).unwrap();
    assert_eq!(viewer.phase(), Phase::Opening);
}

#[test]
fn empty_album_leaves_viewer_closed() {
    let (_clock, mut viewer) = viewer_with(ViewerOptions::default());
    let err = viewer.open_album(Vec::new(), None).unwrap_err();
    assert!(matches!(err, ViewerError::InvalidAlbum));
    assert_eq!(viewer.phase(), Phase::Closed);
    assert!(viewer.host().subscribed.is_none());
    assert!(viewer.host().embedded_visible);
}

#[test]
fn opening_twice_is_rejected() {
    let (_clock, mut viewer) = viewer_with(ViewerOptions::default());
    viewer.open_album(album(2), None).unwrap();
    assert!(matches!(
        viewer.open_album(album(2), None),
        Err(ViewerError::AlreadyOpen)
    ));
}

#[test]
fn close_then_reopen_starts_fresh() {
    let (clock, mut viewer) = viewer_with(ViewerOptions {
        disable_scrolling: true,
        ..ViewerOptions::default()
    });
    viewer.open_album(album(3), Some(1)).unwrap();
    assert!(!viewer.host().scrolling);
    settle(&clock, &mut viewer, Dimension::new(400.0, 300.0));

    assert!(viewer.handle_key(egui::Key::Escape).unwrap());
    assert_eq!(viewer.phase(), Phase::Closing);
    assert!(!viewer.keyboard_enabled());
    assert!(viewer.host().subscribed.is_none());
    assert!(viewer.host().embedded_visible);
    assert!(viewer.host().scrolling);

    clock.advance(SETTLE);
    viewer.tick().unwrap();
    assert_eq!(viewer.phase(), Phase::Closed);
    assert!(viewer.state().is_empty());

    viewer.open_album(album(1), None).unwrap();
    settle(&clock, &mut viewer, Dimension::new(400.0, 300.0));
    let ids = viewer.tree().ids();
    assert_eq!(viewer.state().len(), 1);
    assert!(!visible(&viewer, ids.prev));
    assert!(!visible(&viewer, ids.next));
    assert!(!visible(&viewer, ids.number));
}

#[test]
fn open_during_close_finishes_close_first() {
    let (clock, mut viewer) = viewer_with(ViewerOptions::default());
    viewer.open_album(album(2), None).unwrap();
    settle(&clock, &mut viewer, Dimension::new(400.0, 300.0));
    viewer.close();

    viewer.open_album(album(1), None).unwrap();
    assert_eq!(viewer.phase(), Phase::Opening);
    assert_eq!(viewer.state().len(), 1);
}

#[test]
fn links_group_into_album() {
    let (_clock, mut viewer) = viewer_with(ViewerOptions::default());
    let links = vec![
        Link::new("a.jpg").with_group("trip"),
        Link::new("b.jpg").with_group("trip"),
        Link::new("c.jpg").with_group("home"),
    ];
    viewer.open(&links, 1).unwrap();
    assert_eq!(viewer.state().len(), 2);
    assert_eq!(viewer.state().current_index(), 1);
}

#[test]
fn nav_links_switch_to_hover_reveal() {
    let (clock, mut viewer) = viewer_with(ViewerOptions::default());
    viewer.open_album(album(3), Some(1)).unwrap();
    settle(&clock, &mut viewer, Dimension::new(400.0, 300.0));

    let next = viewer.tree().ids().next;
    assert_eq!(viewer.tree().node(next).unwrap().effective_opacity(), 1.0);

    viewer.on_pointer_moved();
    assert!(viewer.state().user_can_hover());
    let link = viewer.tree().node(next).unwrap();
    assert!(link.is_visible());
    assert_eq!(link.effective_opacity(), 0.0);
}

#[test]
fn always_show_nav_applies_to_touch_devices() {
    let (clock, mut viewer) = viewer_with(ViewerOptions {
        always_show_nav: true,
        ..ViewerOptions::default()
    });
    viewer.host_mut().touch = Some(true);
    viewer.on_pointer_moved();
    viewer.open_album(album(3), Some(1)).unwrap();
    settle(&clock, &mut viewer, Dimension::new(400.0, 300.0));

    let prev = viewer.tree().ids().prev;
    assert_eq!(viewer.tree().node(prev).unwrap().effective_opacity(), 1.0);
}

#[test]
fn caption_respects_sanitize_flag() {
    let entry = AlbumEntry::new("x.png", None, Some("<i>hi</i>".into())).unwrap();
    let (clock, mut viewer) = viewer_with(ViewerOptions {
        sanitize_title: true,
        ..ViewerOptions::default()
    });
    viewer.open_album(vec![entry], None).unwrap();
    settle(&clock, &mut viewer, Dimension::new(100.0, 100.0));

    let caption = viewer.tree().node(viewer.tree().ids().caption).unwrap();
    assert!(caption.is_visible());
    assert_eq!(caption.element.content.as_markup(), "&lt;i&gt;hi&lt;/i&gt;");
}

#[test]
fn clicks_route_to_nodes() {
    let (clock, mut viewer) = viewer_with(ViewerOptions {
        wrap_around: true,
        ..ViewerOptions::default()
    });
    viewer.open_album(album(3), None).unwrap();
    settle(&clock, &mut viewer, Dimension::new(400.0, 300.0));
    let ids = viewer.tree().ids();

    assert!(viewer.on_click(ids.prev).unwrap());
    assert_eq!(viewer.state().current_index(), 2);
    settle(&clock, &mut viewer, Dimension::new(400.0, 300.0));

    assert!(!viewer.on_click(ids.image).unwrap());
    assert!(viewer.on_click(ids.close).unwrap());
    assert_eq!(viewer.phase(), Phase::Closing);
}

#[test]
fn right_click_passes_through_nav_layer() {
    let (_clock, mut viewer) = viewer_with(ViewerOptions::default());
    let nav = viewer.tree().ids().nav;

    assert!(viewer.on_nav_pointer_down(egui::PointerButton::Secondary));
    assert!(!viewer.tree().node(nav).unwrap().element.pointer_events);
    viewer.on_context_menu();
    assert!(viewer.tree().node(nav).unwrap().element.pointer_events);

    assert!(!viewer.on_nav_pointer_down(egui::PointerButton::Primary));
}

#[test]
fn overlay_tracks_viewport_resize_while_open() {
    let (_clock, mut viewer) = viewer_with(ViewerOptions::default());
    viewer.open_album(album(1), None).unwrap();
    viewer.host_mut().viewport = Viewport::new(1200.0, 900.0);
    viewer.on_viewport_resized();

    let overlay = viewer.tree().overlay();
    assert_eq!(overlay.dimension(), Dimension::new(1200.0, 1800.0));
}

#[test]
fn zero_durations_complete_within_one_tick() {
    let (_clock, mut viewer) = viewer_with(ViewerOptions {
        fade_duration: Duration::ZERO,
        image_fade_duration: Duration::ZERO,
        resize_duration: Duration::ZERO,
        ..ViewerOptions::default()
    });
    viewer.open_album(album(2), None).unwrap();
    viewer.images_mut().complete(Dimension::new(300.0, 200.0));
    viewer.tick().unwrap();
    assert_eq!(viewer.phase(), Phase::Open);

    viewer.close();
    assert_eq!(viewer.phase(), Phase::Closed);
    assert!(!viewer.needs_frame());
    assert_eq!(viewer.frame_interval(), None);
}

#[test]
fn registry_closes_every_open_viewer() {
    let clock = Arc::new(ManualClock::new());
    let options = Arc::new(ViewerOptions::default());
    let mut registry = ViewerRegistry::new();
    let ids: Vec<_> = (0..3)
        .map(|_| {
            registry.insert(Lightbox::with_clock(
                Arc::clone(&options),
                FakeHost::new(),
                FakeImages::default(),
                clock.clone(),
            ))
        })
        .collect();

    for id in &ids[..2] {
        registry.get_mut(*id).unwrap().open_album(album(2), None).unwrap();
    }
    assert_eq!(registry.close_all(), 2);

    clock.advance(SETTLE);
    assert!(registry.tick_all().is_empty());
    for id in &ids {
        assert_eq!(registry.get(*id).unwrap().phase(), Phase::Closed);
    }

    assert!(registry.remove(ids[2]).is_some());
    assert_eq!(registry.len(), 2);
}
