//! Display node tree.
//!
//! Every visual piece of the viewer is a [`Node`] wrapping an [`Element`] (the
//! retained description a renderer paints from). Nodes share one lifecycle,
//! [`Component`], whose behaviour is chosen by the node's [`NodeKind`] at
//! construction.

pub mod nav_link;
pub mod tree;

use std::borrow::Cow;
use std::time::Duration;

use crate::animation::{Effects, DEFAULT_DURATION};
use crate::config::ViewerOptions;
use crate::geometry::Dimension;
use crate::layout::format_album_label;
use crate::state::GalleryState;

pub use nav_link::{nav_link_visibility, NavDirection, NavLinkVisibility};
pub use tree::{LightboxTree, TreeIds};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn new(raw: usize) -> Self {
        Self(raw)
    }
}

/// What a node is. Decides its class identifier, defaults and `update`/`render` behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Overlay,
    Frame,
    /// Structural box with a fixed class identifier.
    Container(&'static str),
    Image,
    Nav,
    NavLink(NavDirection),
    Loader,
    Caption,
    NumberLabel,
    Close,
}

impl NodeKind {
    pub fn class_name(&self) -> &'static str {
        match self {
            NodeKind::Overlay => "lb-overlay",
            NodeKind::Frame => "lb",
            NodeKind::Container(class_name) => class_name,
            NodeKind::Image => "lb-image",
            NodeKind::Nav => "lb-nav",
            NodeKind::NavLink(NavDirection::Previous) => "lb-prev",
            NodeKind::NavLink(NavDirection::Next) => "lb-next",
            NodeKind::Loader => "lb-loader",
            NodeKind::Caption => "lb-caption",
            NodeKind::NumberLabel => "lb-number",
            NodeKind::Close => "lb-close",
        }
    }

    /// Opacity the node settles at when shown.
    fn resting_opacity(&self) -> f32 {
        match self {
            NodeKind::Overlay => 0.8,
            // revealed by hover, or forced opaque by the nav policy
            NodeKind::NavLink(_) => 0.0,
            _ => 1.0,
        }
    }

    /// Opacity applied by `init`, `None` leaves it unset.
    fn initial_opacity(&self) -> Option<f32> {
        match self {
            NodeKind::Container(_) | NodeKind::NavLink(_) | NodeKind::Close => None,
            _ => Some(0.0),
        }
    }

    fn initially_visible(&self) -> bool {
        matches!(self, NodeKind::Container(_) | NodeKind::Close)
    }
}

/// Text placed in an element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Content {
    #[default]
    Empty,
    /// Literal text, never interpreted as markup.
    Text(String),
    /// Trusted rich content inserted verbatim.
    Html(String),
}

impl Content {
    /// Content as markup: text is escaped, trusted HTML passes through.
    pub fn as_markup(&self) -> Cow<'_, str> {
        match self {
            Content::Empty => Cow::Borrowed(""),
            Content::Text(text) => escape_html(text),
            Content::Html(html) => Cow::Borrowed(html),
        }
    }

    /// Content as plain text for renderers that cannot display markup.
    pub fn as_plain(&self) -> &str {
        match self {
            Content::Empty => "",
            Content::Text(text) | Content::Html(text) => text,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_plain().is_empty()
    }
}

fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut escaped = String::with_capacity(text.len() + 16);
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    Cow::Owned(escaped)
}

/// Retained element state read by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub class_name: &'static str,
    pub content: Content,
    pub src: Option<String>,
    pub alt: Option<String>,
    /// (left, top) in document coordinates.
    pub position: Option<(f32, f32)>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    /// Set while the frame is changing images.
    pub animating: bool,
    pub pointer_events: bool,
}

impl Element {
    fn new(class_name: &'static str) -> Self {
        Self {
            class_name,
            content: Content::Empty,
            src: None,
            alt: None,
            position: None,
            width: None,
            height: None,
            animating: false,
            pointer_events: true,
        }
    }
}

/// Read-only view of what nodes render from.
#[derive(Debug, Clone, Copy)]
pub struct ViewContext<'a> {
    pub state: &'a GalleryState,
    pub options: &'a ViewerOptions,
    /// `always_show_nav` after the touch probe: only touch devices get forced links.
    pub always_show_nav: bool,
}

impl<'a> ViewContext<'a> {
    pub fn new(state: &'a GalleryState, options: &'a ViewerOptions) -> Self {
        Self {
            state,
            options,
            always_show_nav: options.always_show_nav,
        }
    }
}

/// Lifecycle shared by every display node.
pub trait Component {
    /// One-time setup. Calling it again does nothing.
    fn init(&mut self);

    fn show<C>(&mut self, effects: &mut Effects<C>, duration: Duration, on_done: Option<C>);

    fn hide<C>(&mut self, effects: &mut Effects<C>, duration: Duration, on_done: Option<C>);

    /// Recompute displayed content from gallery state. Leaves visibility alone.
    fn update(&mut self, ctx: &ViewContext<'_>);

    fn render<C>(&mut self, ctx: &ViewContext<'_>, effects: &mut Effects<C>);
}

/// Finds nodes by id so animations can reach them after the fact.
pub trait NodeLookup {
    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node>;
}

#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    pub element: Element,
    dimension: Dimension,
    children: Vec<Node>,
    visible: bool,
    current_opacity: Option<f32>,
    resting_opacity: f32,
    initialized: bool,
}

impl Node {
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            element: Element::new(kind.class_name()),
            dimension: Dimension::ZERO,
            children: Vec::new(),
            visible: kind.initially_visible(),
            current_opacity: kind.initial_opacity(),
            resting_opacity: kind.resting_opacity(),
            initialized: false,
        }
    }

    /// Append a child at assembly time.
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn class_name(&self) -> &'static str {
        self.element.class_name
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn opacity(&self) -> Option<f32> {
        self.current_opacity
    }

    pub fn resting_opacity(&self) -> f32 {
        self.resting_opacity
    }

    /// Opacity a renderer should paint with, ignoring ancestors.
    pub fn effective_opacity(&self) -> f32 {
        if self.visible {
            self.current_opacity.unwrap_or(self.resting_opacity)
        } else {
            0.0
        }
    }

    pub(crate) fn set_opacity(&mut self, opacity: Option<f32>) {
        self.current_opacity = opacity;
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn set_size(&mut self, size: Dimension) {
        self.dimension = size;
        self.element.width = Some(size.width);
        self.element.height = Some(size.height);
    }

    pub fn set_width(&mut self, width: f32) {
        self.dimension = Dimension::new(width, self.dimension.height);
        self.element.width = Some(width);
    }

    pub fn set_height(&mut self, height: f32) {
        self.dimension = Dimension::new(self.dimension.width, height);
        self.element.height = Some(height);
    }

    pub fn set_content(&mut self, content: Content) {
        self.element.content = content;
    }

    /// Display immediately at resting opacity.
    pub fn show_now(&mut self) {
        self.visible = true;
        self.current_opacity = None;
    }

    /// Hide immediately without animating.
    pub fn hide_now(&mut self) {
        self.visible = false;
        self.current_opacity = None;
    }

    pub fn find(&self, id: NodeId) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.find(id).is_some()
    }

    pub fn find_by_class(&self, class_name: &str) -> Option<&Node> {
        if self.element.class_name == class_name {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|child| child.find_by_class(class_name))
    }
}

impl NodeLookup for Node {
    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.find_mut(id)
    }
}

impl Component for Node {
    fn init(&mut self) {
        if self.initialized {
            return;
        }
        for child in &mut self.children {
            child.init();
        }
        self.current_opacity = self.kind.initial_opacity();
        self.visible = self.kind.initially_visible();
        self.initialized = true;
    }

    fn show<C>(&mut self, effects: &mut Effects<C>, duration: Duration, on_done: Option<C>) {
        effects.fade_in(self, duration, on_done);
    }

    fn hide<C>(&mut self, effects: &mut Effects<C>, duration: Duration, on_done: Option<C>) {
        effects.fade_out(self, duration, on_done);
    }

    fn update(&mut self, ctx: &ViewContext<'_>) {
        match self.kind {
            NodeKind::Caption => {
                let title = ctx
                    .state
                    .current_entry()
                    .and_then(|entry| entry.title())
                    .unwrap_or_default()
                    .to_string();
                self.element.content = if ctx.options.sanitize_title {
                    Content::Text(title)
                } else {
                    Content::Html(title)
                };
            }
            NodeKind::NumberLabel => {
                let label = format_album_label(
                    &ctx.options.album_label,
                    ctx.state.current_index() + 1,
                    ctx.state.len(),
                );
                self.element.content = Content::Text(label);
            }
            NodeKind::Image => {
                if let Some(entry) = ctx.state.current_entry() {
                    self.element.src = Some(entry.href().to_string());
                    self.element.alt = entry.alt().map(str::to_string);
                }
            }
            _ => {}
        }
    }

    fn render<C>(&mut self, ctx: &ViewContext<'_>, effects: &mut Effects<C>) {
        match self.kind {
            NodeKind::NavLink(direction) => {
                let policy = nav_link_visibility(
                    direction,
                    ctx.state,
                    ctx.options.wrap_around,
                    ctx.always_show_nav,
                );
                self.visible = policy.shown;
                self.current_opacity = policy.force_opaque.then_some(1.0);
            }
            _ => self.show(effects, DEFAULT_DURATION, None),
        }
    }
}
