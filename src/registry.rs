//! Host-owned collection of viewer instances.
//!
//! Instances open and close independently; the registry only exists so a host
//! can close every viewer at once.

use tracing::{debug, warn};

use crate::error::ViewerError;
use crate::lightbox::{Host, ImageSource, Lightbox};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewerId(u64);

pub struct ViewerRegistry<H, S> {
    next_id: u64,
    viewers: Vec<(ViewerId, Lightbox<H, S>)>,
}

impl<H: Host, S: ImageSource> ViewerRegistry<H, S> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            viewers: Vec::new(),
        }
    }

    pub fn insert(&mut self, viewer: Lightbox<H, S>) -> ViewerId {
        let id = ViewerId(self.next_id);
        self.next_id += 1;
        self.viewers.push((id, viewer));
        debug!(?id, "viewer registered");
        id
    }

    pub fn get(&self, id: ViewerId) -> Option<&Lightbox<H, S>> {
        self.viewers
            .iter()
            .find(|(viewer_id, _)| *viewer_id == id)
            .map(|(_, viewer)| viewer)
    }

    pub fn get_mut(&mut self, id: ViewerId) -> Option<&mut Lightbox<H, S>> {
        self.viewers
            .iter_mut()
            .find(|(viewer_id, _)| *viewer_id == id)
            .map(|(_, viewer)| viewer)
    }

    pub fn remove(&mut self, id: ViewerId) -> Option<Lightbox<H, S>> {
        let position = self.viewers.iter().position(|(viewer_id, _)| *viewer_id == id)?;
        Some(self.viewers.remove(position).1)
    }

    pub fn len(&self) -> usize {
        self.viewers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.viewers.is_empty()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ViewerId, &mut Lightbox<H, S>)> {
        self.viewers.iter_mut().map(|(id, viewer)| (*id, viewer))
    }

    /// Start closing every open viewer. Returns how many were open.
    pub fn close_all(&mut self) -> usize {
        let mut closed = 0;
        for (_, viewer) in &mut self.viewers {
            if viewer.is_open() {
                viewer.close();
                closed += 1;
            }
        }
        debug!(closed, "closed all viewers");
        closed
    }

    /// Tick every viewer, collecting errors instead of stopping at the first.
    pub fn tick_all(&mut self) -> Vec<(ViewerId, ViewerError)> {
        let mut errors = Vec::new();
        for (id, viewer) in &mut self.viewers {
            if let Err(err) = viewer.tick() {
                warn!(?id, %err, "viewer tick failed");
                errors.push((*id, err));
            }
        }
        errors
    }

    pub fn needs_frame(&self) -> bool {
        self.viewers.iter().any(|(_, viewer)| viewer.needs_frame())
    }
}

impl<H: Host, S: ImageSource> Default for ViewerRegistry<H, S> {
    fn default() -> Self {
        Self::new()
    }
}
