//! Modal single-image gallery viewer.
//!
//! The core is host-agnostic: a [`Lightbox`] drives album navigation,
//! viewport-fit layout and timed fades over a small node tree, talking to its
//! environment through the [`Host`] and [`ImageSource`] traits. The `app`
//! module hosts it in an egui window.

pub mod animation;
pub mod app;
pub mod component;
pub mod config;
pub mod error;
pub mod geometry;
pub mod image_loader;
pub mod layout;
pub mod lightbox;
pub mod registry;
pub mod state;

pub use animation::{Clock, EasingFunction, Effects, ManualClock, SystemClock};
pub use config::{KeyAction, KeyMap, ViewerOptions};
pub use error::{ImageLoadError, Result, UnsupportedInputError, ViewerError};
pub use geometry::{Dimension, Insets, Viewport};
pub use lightbox::{
    Host, ImageLoaded, ImageSource, Lightbox, LoadTicket, Phase, PointerCapabilities,
    ResizeSubscription,
};
pub use registry::{ViewerId, ViewerRegistry};
pub use state::{AlbumEntry, GalleryState, Link};
