//! Assembles the viewer's node tree.

use super::{Component, NavDirection, Node, NodeId, NodeKind, NodeLookup};

/// Ids of the nodes the controller addresses directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeIds {
    pub overlay: NodeId,
    pub frame: NodeId,
    pub outer_container: NodeId,
    pub container: NodeId,
    pub image: NodeId,
    pub nav: NodeId,
    pub prev: NodeId,
    pub next: NodeId,
    pub loader: NodeId,
    pub data_container: NodeId,
    pub caption: NodeId,
    pub number: NodeId,
    pub close: NodeId,
}

/// The overlay plus the frame holding image, navigation and details.
///
/// ```text
/// lb-overlay
/// lb
/// └── lb-outerContainer
///     ├── lb-container
///     │   ├── lb-image
///     │   ├── lb-nav ── lb-prev, lb-next
///     │   └── lb-loader
///     └── lb-dataContainer
///         └── lb-data
///             ├── lb-details ── lb-caption, lb-number
///             └── lb-closeContainer ── lb-close
/// ```
#[derive(Debug, Clone)]
pub struct LightboxTree {
    overlay: Node,
    frame: Node,
    ids: TreeIds,
}

impl LightboxTree {
    pub fn new() -> Self {
        let mut next_id = 0;
        let mut node = |kind: NodeKind| {
            next_id += 1;
            Node::new(NodeId::new(next_id), kind)
        };

        let overlay = node(NodeKind::Overlay);
        let frame = node(NodeKind::Frame);
        let outer_container = node(NodeKind::Container("lb-outerContainer"));
        let container = node(NodeKind::Container("lb-container"));
        let image = node(NodeKind::Image);
        let nav = node(NodeKind::Nav);
        let prev = node(NodeKind::NavLink(NavDirection::Previous));
        let next = node(NodeKind::NavLink(NavDirection::Next));
        let loader = node(NodeKind::Loader);
        let data_container = node(NodeKind::Container("lb-dataContainer"));
        let data = node(NodeKind::Container("lb-data"));
        let details = node(NodeKind::Container("lb-details"));
        let caption = node(NodeKind::Caption);
        let number = node(NodeKind::NumberLabel);
        let close_container = node(NodeKind::Container("lb-closeContainer"));
        let close = node(NodeKind::Close);

        let ids = TreeIds {
            overlay: overlay.id(),
            frame: frame.id(),
            outer_container: outer_container.id(),
            container: container.id(),
            image: image.id(),
            nav: nav.id(),
            prev: prev.id(),
            next: next.id(),
            loader: loader.id(),
            data_container: data_container.id(),
            caption: caption.id(),
            number: number.id(),
            close: close.id(),
        };

        let frame = frame.with_child(
            outer_container
                .with_child(
                    container
                        .with_child(image)
                        .with_child(nav.with_child(prev).with_child(next))
                        .with_child(loader),
                )
                .with_child(
                    data_container.with_child(
                        data.with_child(details.with_child(caption).with_child(number))
                            .with_child(close_container.with_child(close)),
                    ),
                ),
        );

        Self {
            overlay,
            frame,
            ids,
        }
    }

    pub fn init(&mut self) {
        self.overlay.init();
        self.frame.init();
    }

    pub fn ids(&self) -> TreeIds {
        self.ids
    }

    pub fn overlay(&self) -> &Node {
        &self.overlay
    }

    pub fn frame(&self) -> &Node {
        &self.frame
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.overlay.find(id).or_else(|| self.frame.find(id))
    }

    pub fn find_by_class(&self, class_name: &str) -> Option<&Node> {
        self.overlay
            .find_by_class(class_name)
            .or_else(|| self.frame.find_by_class(class_name))
    }
}

impl Default for LightboxTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeLookup for LightboxTree {
    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if self.overlay.contains(id) {
            self.overlay.find_mut(id)
        } else {
            self.frame.find_mut(id)
        }
    }
}
