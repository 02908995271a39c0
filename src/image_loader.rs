//! Image discovery and off-thread dimension probing.
//!
//! [`Preloader`] is the viewer's [`ImageSource`]: header-only probes run on the
//! rayon pool and completions come back over a crossbeam channel, so the UI
//! thread never touches the file system during a transition. Probed sizes are
//! kept in an LRU cache that neighbour prefetches warm ahead of navigation.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::ImageLoadError;
use crate::geometry::Dimension;
use crate::lightbox::{ImageLoaded, ImageSource, LoadTicket};
use crate::state::Link;

/// Supported image extensions
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "webp", "gif", "bmp", "ico", "tiff", "tif"];

/// Probed sizes kept in memory.
const SIZE_CACHE_CAPACITY: usize = 256;

/// Check if a file is a supported image
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// All images directly inside `dir`, in natural filename order.
pub fn get_images_in_directory(dir: &Path) -> Vec<PathBuf> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && is_supported_image(p))
        .collect();

    images.sort_by(|a, b| natord::compare(&file_name(a), &file_name(b)));
    images
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Turn command line paths into gallery links. Directories expand to their
/// images; every image is grouped by its parent directory.
pub fn links_for_paths(paths: &[PathBuf]) -> Vec<Link> {
    let mut links = Vec::new();
    for path in paths {
        let files = if path.is_dir() {
            get_images_in_directory(path)
        } else if is_supported_image(path) {
            vec![path.clone()]
        } else {
            debug!(path = %path.display(), "skipping unsupported path");
            continue;
        };

        for file in files {
            let mut link = Link::new(file.to_string_lossy().into_owned());
            if let Some(parent) = file.parent() {
                link.group = Some(parent.to_string_lossy().into_owned());
            }
            link.title = file
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned());
            links.push(link);
        }
    }
    links
}

/// Natural size of the image at `href`, read from its header.
pub fn probe_dimensions(href: &str) -> Result<Dimension, ImageLoadError> {
    let path = href.strip_prefix("file://").unwrap_or(href);
    match imagesize::size(path) {
        Ok(size) => Ok(Dimension::new(size.width as f32, size.height as f32)),
        // formats imagesize cannot parse still get a chance through the decoder
        Err(imagesize::ImageError::NotSupported) => image::image_dimensions(path)
            .map(Dimension::from)
            .map_err(|err| ImageLoadError::new(href, err.to_string())),
        Err(err) => Err(ImageLoadError::new(href, err.to_string())),
    }
}

struct ProbeDone {
    ticket: Option<LoadTicket>,
    result: Result<Dimension, ImageLoadError>,
}

/// [`ImageSource`] backed by background header probes.
pub struct Preloader {
    next_ticket: u64,
    sender: Sender<ProbeDone>,
    receiver: Receiver<ProbeDone>,
    cache: Arc<Mutex<LruCache<String, Dimension>>>,
    /// Cache hits, delivered on the next poll.
    ready: Vec<ImageLoaded>,
}

impl Preloader {
    pub fn new() -> Self {
        Self::with_capacity(SIZE_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            next_ticket: 0,
            sender,
            receiver,
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
            ready: Vec::new(),
        }
    }

    pub fn cached(&self, href: &str) -> Option<Dimension> {
        self.cache.lock().peek(href).copied()
    }

    fn spawn_probe(&self, href: &str, ticket: Option<LoadTicket>) {
        let href = href.to_string();
        let sender = self.sender.clone();
        let cache = Arc::clone(&self.cache);
        rayon::spawn(move || {
            let result = probe_dimensions(&href);
            if let Ok(size) = result {
                cache.lock().put(href.clone(), size);
            }
            trace!(%href, ok = result.is_ok(), "probe finished");
            // receiver gone means the viewer was dropped
            let _ = sender.send(ProbeDone { ticket, result });
        });
    }
}

impl Default for Preloader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageSource for Preloader {
    fn load(&mut self, href: &str) -> LoadTicket {
        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket += 1;

        if let Some(size) = self.cache.lock().get(href).copied() {
            trace!(href, "size cache hit");
            self.ready.push(ImageLoaded {
                ticket,
                result: Ok(size),
            });
        } else {
            self.spawn_probe(href, Some(ticket));
        }
        ticket
    }

    fn prefetch(&mut self, href: &str) {
        if self.cache.lock().contains(href) {
            return;
        }
        self.spawn_probe(href, None);
    }

    fn poll(&mut self) -> Vec<ImageLoaded> {
        let mut done = std::mem::take(&mut self.ready);
        done.extend(self.receiver.try_iter().filter_map(|probe| {
            probe.ticket.map(|ticket| ImageLoaded {
                ticket,
                result: probe.result,
            })
        }));
        done
    }
}

/// Natural sort comparison for filenames: digit runs compare by value.
pub mod natord {
    use std::cmp::Ordering;
    use std::iter::Peekable;
    use std::str::Chars;

    pub fn compare(a: &str, b: &str) -> Ordering {
        let mut a_chars = a.chars().peekable();
        let mut b_chars = b.chars().peekable();

        loop {
            match (a_chars.peek().copied(), b_chars.peek().copied()) {
                (None, None) => return Ordering::Equal,
                (None, Some(_)) => return Ordering::Less,
                (Some(_), None) => return Ordering::Greater,
                (Some(ac), Some(bc)) if ac.is_ascii_digit() && bc.is_ascii_digit() => {
                    let a_num = take_number(&mut a_chars);
                    let b_num = take_number(&mut b_chars);
                    match compare_digits(&a_num, &b_num) {
                        Ordering::Equal => continue,
                        other => return other,
                    }
                }
                (Some(ac), Some(bc)) => {
                    let ac_lower = ac.to_lowercase().next().unwrap_or(ac);
                    let bc_lower = bc.to_lowercase().next().unwrap_or(bc);
                    match ac_lower.cmp(&bc_lower) {
                        Ordering::Equal => {
                            a_chars.next();
                            b_chars.next();
                        }
                        other => return other,
                    }
                }
            }
        }
    }

    fn take_number(chars: &mut Peekable<Chars<'_>>) -> String {
        let mut digits = String::new();
        while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
            digits.push(c);
        }
        digits
    }

    /// Compare digit strings by value without overflowing on long runs.
    fn compare_digits(a: &str, b: &str) -> Ordering {
        let a = a.trim_start_matches('0');
        let b = b.trim_start_matches('0');
        a.len().cmp(&b.len()).then_with(|| a.cmp(b))
    }
}
