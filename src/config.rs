//! Viewer options and key bindings, loaded from an INI file.
//!
//! `[Settings]` holds plain key/value options, `[Shortcuts]` maps the viewer
//! actions to comma-separated key names. Unknown keys are ignored and
//! malformed values keep their defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use smallvec::{smallvec, SmallVec};
use tracing::{debug, warn};

use crate::animation::EasingFunction;
use crate::error::{Result, ViewerError};
use crate::geometry::Insets;
use crate::layout::FitBounds;

const DEFAULT_CONFIG_INI: &str = include_str!("../config.ini");

/// Keyboard actions the viewer responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    Close,
    Next,
    Previous,
}

impl KeyAction {
    pub const ALL: [KeyAction; 3] = [KeyAction::Close, KeyAction::Next, KeyAction::Previous];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "close" | "exit" => Some(Self::Close),
            "next" | "next_image" => Some(Self::Next),
            "previous" | "prev" | "previous_image" => Some(Self::Previous),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Close => "close",
            Self::Next => "next",
            Self::Previous => "previous",
        }
    }
}

pub type KeyList = SmallVec<[egui::Key; 4]>;

/// Remappable key bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap {
    pub close: KeyList,
    pub next: KeyList,
    pub previous: KeyList,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            close: smallvec![egui::Key::Escape, egui::Key::X, egui::Key::O, egui::Key::C],
            next: smallvec![egui::Key::ArrowRight, egui::Key::N],
            previous: smallvec![egui::Key::ArrowLeft, egui::Key::P],
        }
    }
}

impl KeyMap {
    pub fn keys(&self, action: KeyAction) -> &[egui::Key] {
        match action {
            KeyAction::Close => &self.close,
            KeyAction::Next => &self.next,
            KeyAction::Previous => &self.previous,
        }
    }

    fn keys_mut(&mut self, action: KeyAction) -> &mut KeyList {
        match action {
            KeyAction::Close => &mut self.close,
            KeyAction::Next => &mut self.next,
            KeyAction::Previous => &mut self.previous,
        }
    }

    /// First action bound to `key`, checked in close, next, previous order.
    pub fn action_for(&self, key: egui::Key) -> Option<KeyAction> {
        KeyAction::ALL
            .into_iter()
            .find(|&action| self.keys(action).contains(&key))
    }
}

/// Immutable viewer configuration, shared by reference once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerOptions {
    /// Template for the position label, `%1` is the 1-based index and `%2` the total.
    pub album_label: String,
    /// Keep nav links opaque on touch devices, even once hover input is seen.
    /// Hosts that do not report touch never apply it.
    pub always_show_nav: bool,
    /// Overlay and frame fades.
    pub fade_duration: Duration,
    pub image_fade_duration: Duration,
    pub resize_duration: Duration,
    pub resize_easing: EasingFunction,
    pub fit_images_in_viewport: bool,
    /// 0 means unbounded
    pub max_width: u32,
    /// 0 means unbounded
    pub max_height: u32,
    /// Distance of the frame from the top of the viewport, in pixels.
    pub position_from_top: f32,
    pub show_image_number_label: bool,
    pub wrap_around: bool,
    pub disable_scrolling: bool,
    /// Escape captions instead of inserting them as rich content.
    pub sanitize_title: bool,
    /// Let secondary clicks reach the image underneath the nav layer.
    pub enable_right_click: bool,
    pub container_padding: f32,
    pub image_border: f32,
    pub keys: KeyMap,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            album_label: "Image %1 of %2".to_string(),
            always_show_nav: false,
            fade_duration: Duration::from_millis(600),
            image_fade_duration: Duration::from_millis(600),
            resize_duration: Duration::from_millis(700),
            resize_easing: EasingFunction::Linear,
            fit_images_in_viewport: true,
            max_width: 0,
            max_height: 0,
            position_from_top: 50.0,
            show_image_number_label: true,
            wrap_around: false,
            disable_scrolling: false,
            sanitize_title: false,
            enable_right_click: true,
            container_padding: 4.0,
            image_border: 4.0,
            keys: KeyMap::default(),
        }
    }
}

impl ViewerOptions {
    /// Space taken around the image by container padding and image border.
    pub fn chrome(&self) -> Insets {
        Insets::uniform(self.container_padding) + Insets::uniform(self.image_border)
    }

    pub fn fit_bounds(&self) -> FitBounds {
        FitBounds::new(self.max_width, self.max_height)
    }

    /// Default location of `config.ini` in the platform config directory.
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "lightbox-viewer")
            .map(|dirs| dirs.config_dir().join("config.ini"))
    }

    /// Load from the default location, writing the template on first run.
    /// Any failure falls back to defaults.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            warn!("no config directory available, using defaults");
            return Self::parse_ini(DEFAULT_CONFIG_INI);
        };

        if !path.exists() {
            let written = path
                .parent()
                .map_or(Ok(()), fs::create_dir_all)
                .and_then(|()| fs::write(&path, DEFAULT_CONFIG_INI));
            if let Err(err) = written {
                warn!(path = %path.display(), %err, "could not write config template");
            }
        }

        match Self::load_from(&path) {
            Ok(options) => options,
            Err(err) => {
                warn!(path = %path.display(), %err, "using default options");
                Self::parse_ini(DEFAULT_CONFIG_INI)
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        debug!(path = %path.display(), "loaded viewer options");
        Ok(Self::parse_ini(&content))
    }

    /// Parse INI content on top of the defaults.
    pub fn parse_ini(content: &str) -> Self {
        let mut options = ViewerOptions::default();
        let mut in_settings_section = false;
        let mut in_shortcuts_section = false;
        let mut rebound: SmallVec<[KeyAction; 3]> = SmallVec::new();

        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                let section = &line[1..line.len() - 1];
                in_settings_section = section.eq_ignore_ascii_case("settings");
                in_shortcuts_section = section.eq_ignore_ascii_case("shortcuts");
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();

            if in_shortcuts_section {
                let Some(action) = KeyAction::from_str(key) else {
                    continue;
                };
                // a configured action replaces its default keys
                if !rebound.contains(&action) {
                    options.keys.keys_mut(action).clear();
                    rebound.push(action);
                }
                for name in value.split(',') {
                    match parse_key(name.trim()) {
                        Some(key) => options.keys.keys_mut(action).push(key),
                        None if name.trim().is_empty() => {}
                        None => warn!(key = name.trim(), "unknown key name in [Shortcuts]"),
                    }
                }
            } else if in_settings_section {
                options.apply_setting(&key.trim().to_lowercase(), value);
            }
        }

        options
    }

    fn apply_setting(&mut self, key: &str, value: &str) {
        match key {
            "album_label" => self.album_label = value.to_string(),
            "always_show_nav" | "always_show_nav_on_touch_devices" => {
                if let Some(v) = parse_bool(value) {
                    self.always_show_nav = v;
                }
            }
            "fade_duration" => {
                if let Some(v) = parse_millis(value) {
                    self.fade_duration = v;
                }
            }
            "image_fade_duration" => {
                if let Some(v) = parse_millis(value) {
                    self.image_fade_duration = v;
                }
            }
            "resize_duration" => {
                if let Some(v) = parse_millis(value) {
                    self.resize_duration = v;
                }
            }
            "resize_easing" => {
                if let Some(v) = EasingFunction::from_str(value) {
                    self.resize_easing = v;
                }
            }
            "fit_images_in_viewport" => {
                if let Some(v) = parse_bool(value) {
                    self.fit_images_in_viewport = v;
                }
            }
            "max_width" => {
                if let Ok(v) = value.parse::<u32>() {
                    self.max_width = v;
                }
            }
            "max_height" => {
                if let Ok(v) = value.parse::<u32>() {
                    self.max_height = v;
                }
            }
            "position_from_top" => {
                if let Ok(v) = value.parse::<f32>() {
                    self.position_from_top = v.max(0.0);
                }
            }
            "show_image_number_label" => {
                if let Some(v) = parse_bool(value) {
                    self.show_image_number_label = v;
                }
            }
            "wrap_around" => {
                if let Some(v) = parse_bool(value) {
                    self.wrap_around = v;
                }
            }
            "disable_scrolling" => {
                if let Some(v) = parse_bool(value) {
                    self.disable_scrolling = v;
                }
            }
            "sanitize_title" => {
                if let Some(v) = parse_bool(value) {
                    self.sanitize_title = v;
                }
            }
            "enable_right_click" => {
                if let Some(v) = parse_bool(value) {
                    self.enable_right_click = v;
                }
            }
            "container_padding" => {
                if let Ok(v) = value.parse::<f32>() {
                    self.container_padding = v.max(0.0);
                }
            }
            "image_border" => {
                if let Ok(v) = value.parse::<f32>() {
                    self.image_border = v.max(0.0);
                }
            }
            _ => debug!(key, "ignoring unknown setting"),
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| ViewerError::Config("no config directory available".into()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_ini())?;
        debug!(path = %path.display(), "saved viewer options");
        Ok(())
    }

    fn to_ini(&self) -> String {
        let mut content = String::new();

        content.push_str("; Lightbox Viewer Configuration\n\n");
        content.push_str("[Settings]\n");
        content.push_str(&format!("album_label = {}\n", self.album_label));
        content.push_str(&format!("always_show_nav = {}\n", self.always_show_nav));
        content.push_str("; Durations in milliseconds\n");
        content.push_str(&format!(
            "fade_duration = {}\n",
            self.fade_duration.as_millis()
        ));
        content.push_str(&format!(
            "image_fade_duration = {}\n",
            self.image_fade_duration.as_millis()
        ));
        content.push_str(&format!(
            "resize_duration = {}\n",
            self.resize_duration.as_millis()
        ));
        content.push_str(&format!("resize_easing = {}\n", self.resize_easing.as_str()));
        content.push_str(&format!(
            "fit_images_in_viewport = {}\n",
            self.fit_images_in_viewport
        ));
        content.push_str("; 0 = no bound\n");
        content.push_str(&format!("max_width = {}\n", self.max_width));
        content.push_str(&format!("max_height = {}\n", self.max_height));
        content.push_str(&format!("position_from_top = {}\n", self.position_from_top));
        content.push_str(&format!(
            "show_image_number_label = {}\n",
            self.show_image_number_label
        ));
        content.push_str(&format!("wrap_around = {}\n", self.wrap_around));
        content.push_str(&format!("disable_scrolling = {}\n", self.disable_scrolling));
        content.push_str(&format!("sanitize_title = {}\n", self.sanitize_title));
        content.push_str(&format!("enable_right_click = {}\n", self.enable_right_click));
        content.push_str(&format!("container_padding = {}\n", self.container_padding));
        content.push_str(&format!("image_border = {}\n\n", self.image_border));

        content.push_str("[Shortcuts]\n");
        for action in KeyAction::ALL {
            let keys: Vec<String> = self.keys.keys(action).iter().map(key_to_string).collect();
            content.push_str(&format!("{} = {}\n", action.as_str(), keys.join(", ")));
        }

        content
    }
}

/// Parse a single key from string
fn parse_key(s: &str) -> Option<egui::Key> {
    let s = s.to_lowercase();
    if let [letter @ b'a'..=b'z'] = s.as_bytes() {
        return egui::Key::from_name(&(*letter as char).to_ascii_uppercase().to_string());
    }
    match s.as_str() {
        "left" | "arrow_left" | "arrowleft" => Some(egui::Key::ArrowLeft),
        "right" | "arrow_right" | "arrowright" => Some(egui::Key::ArrowRight),
        "up" | "arrow_up" | "arrowup" => Some(egui::Key::ArrowUp),
        "down" | "arrow_down" | "arrowdown" => Some(egui::Key::ArrowDown),
        "escape" | "esc" => Some(egui::Key::Escape),
        "enter" | "return" => Some(egui::Key::Enter),
        "space" | "spacebar" => Some(egui::Key::Space),
        "tab" => Some(egui::Key::Tab),
        "backspace" => Some(egui::Key::Backspace),
        "delete" | "del" => Some(egui::Key::Delete),
        "home" => Some(egui::Key::Home),
        "end" => Some(egui::Key::End),
        "pageup" | "page_up" => Some(egui::Key::PageUp),
        "pagedown" | "page_down" => Some(egui::Key::PageDown),
        _ => None,
    }
}

fn key_to_string(key: &egui::Key) -> String {
    format!("{:?}", key).to_lowercase()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn parse_millis(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_matches_defaults() {
        assert_eq!(ViewerOptions::parse_ini(DEFAULT_CONFIG_INI), ViewerOptions::default());
    }

    #[test]
    fn settings_override_defaults() {
        let options = ViewerOptions::parse_ini(
            "[Settings]\nwrap_around = yes\nresize_duration = 0\nmax_width = 640\nresize_easing = swing\nbogus = 1\n",
        );
        assert!(options.wrap_around);
        assert_eq!(options.resize_duration, Duration::ZERO);
        assert_eq!(options.fit_bounds().max_width, Some(640.0));
        assert_eq!(options.fit_bounds().max_height, None);
        assert_eq!(options.resize_easing, EasingFunction::Swing);
    }

    #[test]
    fn malformed_values_keep_defaults() {
        let options =
            ViewerOptions::parse_ini("[Settings]\nfade_duration = soon\nwrap_around = maybe\n");
        assert_eq!(options.fade_duration, Duration::from_millis(600));
        assert!(!options.wrap_around);
    }

    #[test]
    fn shortcuts_replace_per_action() {
        let options = ViewerOptions::parse_ini("[Shortcuts]\nnext = space, l\n");
        assert_eq!(options.keys.next.as_slice(), &[egui::Key::Space, egui::Key::L]);
        assert_eq!(options.keys.previous, KeyMap::default().previous);
        assert_eq!(options.keys.action_for(egui::Key::L), Some(KeyAction::Next));
        assert_eq!(options.keys.action_for(egui::Key::N), None);
    }

    #[test]
    fn default_keys_resolve() {
        let keys = KeyMap::default();
        assert_eq!(keys.action_for(egui::Key::Escape), Some(KeyAction::Close));
        assert_eq!(keys.action_for(egui::Key::ArrowLeft), Some(KeyAction::Previous));
        assert_eq!(keys.action_for(egui::Key::Z), None);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        let options = ViewerOptions {
            album_label: "%1 / %2".into(),
            sanitize_title: true,
            max_height: 480,
            ..ViewerOptions::default()
        };
        options.save_to(&path).unwrap();
        assert_eq!(ViewerOptions::load_from(&path).unwrap(), options);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ViewerOptions::load_from(&dir.path().join("absent.ini")).unwrap_err();
        assert!(matches!(err, ViewerError::Io(_)));
    }
}
