//! Album contents, current position and pointer capability.

use tracing::debug;

use crate::error::{Result, ViewerError};

/// One image of an album. The href is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumEntry {
    href: String,
    alt: Option<String>,
    title: Option<String>,
}

impl AlbumEntry {
    /// Returns `None` when `href` is blank.
    pub fn new(
        href: impl Into<String>,
        alt: Option<String>,
        title: Option<String>,
    ) -> Option<Self> {
        let href = href.into();
        if href.trim().is_empty() {
            return None;
        }
        Some(Self {
            href,
            alt: alt.filter(|alt| !alt.is_empty()),
            title: title.filter(|title| !title.is_empty()),
        })
    }

    pub fn href(&self) -> &str {
        &self.href
    }

    pub fn alt(&self) -> Option<&str> {
        self.alt.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }
}

/// Source of truth for what is being shown.
#[derive(Debug, Clone, Default)]
pub struct GalleryState {
    album: Vec<AlbumEntry>,
    current_index: usize,
    user_can_hover: bool,
}

impl GalleryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the album. The requested position is used when it is in range,
    /// otherwise the album starts at 0. An empty album leaves the state untouched.
    pub fn open_album(&mut self, entries: Vec<AlbumEntry>, requested: Option<usize>) -> Result<()> {
        if entries.is_empty() {
            return Err(ViewerError::InvalidAlbum);
        }
        self.current_index = requested.filter(|&index| index < entries.len()).unwrap_or(0);
        self.album = entries;
        debug!(len = self.album.len(), index = self.current_index, "album opened");
        Ok(())
    }

    /// Move to `index`. Callers keep it in range.
    pub fn go_to(&mut self, index: usize) {
        debug_assert!(index < self.album.len(), "index {index} out of range");
        self.current_index = index;
    }

    pub fn is_first(&self) -> bool {
        self.current_index == 0
    }

    pub fn is_last(&self) -> bool {
        self.album
            .len()
            .checked_sub(1)
            .is_some_and(|last| self.current_index == last)
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_entry(&self) -> Option<&AlbumEntry> {
        self.album.get(self.current_index)
    }

    pub fn album(&self) -> &[AlbumEntry] {
        &self.album
    }

    pub fn len(&self) -> usize {
        self.album.len()
    }

    pub fn is_empty(&self) -> bool {
        self.album.is_empty()
    }

    pub fn user_can_hover(&self) -> bool {
        self.user_can_hover
    }

    /// Record that hover-capable input was seen. Returns true the first time.
    pub fn mark_user_can_hover(&mut self) -> bool {
        !std::mem::replace(&mut self.user_can_hover, true)
    }

    /// Drop the album. Hover capability survives.
    pub fn clear(&mut self) {
        self.album.clear();
        self.current_index = 0;
    }

    /// Index after the current one, `None` at the end without wrap-around.
    pub fn next_index(&self, wrap_around: bool) -> Option<usize> {
        if self.album.len() <= 1 {
            return None;
        }
        if !self.is_last() {
            Some(self.current_index + 1)
        } else if wrap_around {
            Some(0)
        } else {
            None
        }
    }

    /// Index before the current one, `None` at the start without wrap-around.
    pub fn previous_index(&self, wrap_around: bool) -> Option<usize> {
        if self.album.len() <= 1 {
            return None;
        }
        if !self.is_first() {
            Some(self.current_index - 1)
        } else if wrap_around {
            Some(self.album.len() - 1)
        } else {
            None
        }
    }
}

/// A page link that can open the viewer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Link {
    pub href: String,
    /// Explicit album name (`data-lightbox`).
    pub group: Option<String>,
    pub rel: Option<String>,
    pub alt: Option<String>,
    /// Preferred caption (`data-title`).
    pub data_title: Option<String>,
    pub title: Option<String>,
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            ..Self::default()
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_rel(mut self, rel: impl Into<String>) -> Self {
        self.rel = Some(rel.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.data_title = Some(title.into());
        self
    }

    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = Some(alt.into());
        self
    }

    fn entry(&self) -> Option<AlbumEntry> {
        let title = self
            .data_title
            .clone()
            .filter(|title| !title.is_empty())
            .or_else(|| self.title.clone());
        AlbumEntry::new(self.href.clone(), self.alt.clone(), title)
    }

    fn same_album(&self, other: &Link) -> bool {
        match (&self.group, &other.group) {
            (Some(group), Some(other_group)) => group == other_group,
            (Some(_), None) => false,
            (None, _) => match (&self.rel, &other.rel) {
                (Some(rel), Some(other_rel)) => other.group.is_none() && rel == other_rel,
                _ => false,
            },
        }
    }
}

/// Collect the album the activated link belongs to, in document order.
///
/// Links with an explicit group gather every link of that group. A link whose
/// rel is exactly `lightbox` opens alone; any other rel gathers links sharing it.
/// Links with empty hrefs are skipped. Returns the entries and the position of
/// the activated link among them.
pub fn collect_album(links: &[Link], activated: usize) -> (Vec<AlbumEntry>, Option<usize>) {
    let Some(target) = links.get(activated) else {
        return (Vec::new(), None);
    };

    let standalone = target.group.is_none() && target.rel.as_deref() == Some("lightbox");
    if standalone || (target.group.is_none() && target.rel.is_none()) {
        let entries: Vec<_> = target.entry().into_iter().collect();
        let position = (!entries.is_empty()).then_some(0);
        return (entries, position);
    }

    let mut entries = Vec::new();
    let mut position = None;
    for (i, link) in links.iter().enumerate() {
        if i != activated && !target.same_album(link) {
            continue;
        }
        if let Some(entry) = link.entry() {
            if i == activated {
                position = Some(entries.len());
            }
            entries.push(entry);
        }
    }
    (entries, position)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn album(len: usize) -> Vec<AlbumEntry> {
        (0..len)
            .map(|i| AlbumEntry::new(format!("img{i}.png"), None, None).unwrap())
            .collect()
    }

    #[test]
    fn empty_album_is_rejected_and_state_kept() {
        let mut state = GalleryState::new();
        state.open_album(album(2), Some(1)).unwrap();
        assert!(matches!(
            state.open_album(Vec::new(), None),
            Err(ViewerError::InvalidAlbum)
        ));
        assert_eq!(state.len(), 2);
        assert_eq!(state.current_index(), 1);
    }

    #[test]
    fn index_stays_in_range_after_open() {
        let mut state = GalleryState::new();
        for len in 1..6 {
            for requested in [None, Some(0), Some(len - 1), Some(len + 3)] {
                state.open_album(album(len), requested).unwrap();
                assert!(state.current_index() < state.len());
            }
        }
    }

    #[test]
    fn first_and_last_track_index() {
        let mut state = GalleryState::new();
        state.open_album(album(3), None).unwrap();
        for index in 0..3 {
            state.go_to(index);
            assert_eq!(state.is_first(), index == 0);
            assert_eq!(state.is_last(), index == 2);
        }
    }

    #[test]
    fn neighbour_indices_follow_wrap_policy() {
        let mut state = GalleryState::new();
        state.open_album(album(3), Some(2)).unwrap();
        assert_eq!(state.next_index(false), None);
        assert_eq!(state.next_index(true), Some(0));
        state.go_to(0);
        assert_eq!(state.previous_index(true), Some(2));
        assert_eq!(state.previous_index(false), None);

        state.open_album(album(1), None).unwrap();
        assert_eq!(state.next_index(true), None);
    }

    #[test]
    fn hover_capability_is_sticky() {
        let mut state = GalleryState::new();
        assert!(state.mark_user_can_hover());
        assert!(!state.mark_user_can_hover());
        state.clear();
        assert!(state.user_can_hover());
    }

    #[test]
    fn blank_href_is_not_an_entry() {
        assert!(AlbumEntry::new("  ", None, None).is_none());
    }

    #[test]
    fn group_collects_in_document_order() {
        let links = vec![
            Link::new("a.jpg").with_group("trip"),
            Link::new("b.jpg").with_group("other"),
            Link::new("c.jpg").with_group("trip").with_title("C"),
            Link::new("").with_group("trip"),
            Link::new("d.jpg").with_group("trip"),
        ];
        let (entries, position) = collect_album(&links, 2);
        let hrefs: Vec<_> = entries.iter().map(AlbumEntry::href).collect();
        assert_eq!(hrefs, ["a.jpg", "c.jpg", "d.jpg"]);
        assert_eq!(position, Some(1));
        assert_eq!(entries[1].title(), Some("C"));
    }

    #[test]
    fn plain_lightbox_rel_opens_alone() {
        let links = vec![
            Link::new("a.jpg").with_rel("lightbox"),
            Link::new("b.jpg").with_rel("lightbox"),
        ];
        let (entries, position) = collect_album(&links, 1);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].href(), "b.jpg");
        assert_eq!(position, Some(0));
    }

    #[test]
    fn shared_rel_groups() {
        let links = vec![
            Link::new("a.jpg").with_rel("lightbox[set]"),
            Link::new("b.jpg").with_rel("lightbox[set]"),
            Link::new("c.jpg").with_rel("lightbox[set]").with_group("g"),
        ];
        let (entries, position) = collect_album(&links, 1);
        assert_eq!(entries.len(), 2);
        assert_eq!(position, Some(1));
    }

    #[test]
    fn title_falls_back_to_plain_attribute() {
        let mut link = Link::new("a.jpg").with_group("g");
        link.title = Some("plain".into());
        let (entries, _) = collect_album(&[link], 0);
        assert_eq!(entries[0].title(), Some("plain"));
    }
}
