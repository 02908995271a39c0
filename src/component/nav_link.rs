//! Previous/next link visibility.

use crate::state::GalleryState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavDirection {
    Previous,
    Next,
}

/// Outcome of the visibility policy for one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavLinkVisibility {
    pub shown: bool,
    /// Render fully opaque instead of waiting for hover.
    pub force_opaque: bool,
}

/// Decide whether a link is shown for the current position in the album.
///
/// Albums of one image never show links. With wrap-around both links are
/// always available, otherwise the ends of the album hide the link that would
/// step outside it.
pub fn nav_link_visibility(
    direction: NavDirection,
    state: &GalleryState,
    wrap_around: bool,
    always_show: bool,
) -> NavLinkVisibility {
    if state.len() <= 1 {
        return NavLinkVisibility::default();
    }

    let shown = wrap_around
        || match direction {
            NavDirection::Previous => !state.is_first(),
            NavDirection::Next => !state.is_last(),
        };

    NavLinkVisibility {
        shown,
        force_opaque: shown && (!state.user_can_hover() || always_show),
    }
}
