// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Image assets as seen by the scene.
//!
//! Decoding and fetching belong to the host. The scene only consumes the
//! "loaded" notification: once [`ImageSource::mark_loaded`] has been called
//! the native pixel size is known and image-backed nodes can be built.

use core::fmt;

use kurbo::Size;

/// Opaque handle the host uses to look up decoded pixels.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId(pub u32);

impl fmt::Debug for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageId({})", self.0)
    }
}

/// An image asset and its load state.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageSource {
    id: ImageId,
    url: String,
    native_size: Option<Size>,
    pixel_ratio: f64,
}

impl ImageSource {
    /// Creates a source that has not loaded yet.
    ///
    /// `pixel_ratio` is the normalized device pixel ratio; when it is 2 the
    /// host is expected to fetch the `@2x` variant returned by
    /// [`resolved_url`](Self::resolved_url).
    #[must_use]
    pub fn pending(id: ImageId, url: impl Into<String>, pixel_ratio: f64) -> Self {
        Self {
            id,
            url: url.into(),
            native_size: None,
            pixel_ratio,
        }
    }

    /// Creates a source that is already loaded.
    #[must_use]
    pub fn loaded(id: ImageId, native_size: Size, pixel_ratio: f64) -> Self {
        Self {
            id,
            url: String::new(),
            native_size: Some(native_size),
            pixel_ratio,
        }
    }

    /// Records the host's "loaded" notification.
    pub fn mark_loaded(&mut self, native_size: Size) {
        self.native_size = Some(native_size);
    }

    /// Host handle for this image.
    #[must_use]
    pub fn id(&self) -> ImageId {
        self.id
    }

    /// The URL as requested.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The URL the host should fetch, with an `@2x` suffix inserted before
    /// the extension on high-density displays.
    #[must_use]
    pub fn resolved_url(&self) -> String {
        if self.pixel_ratio <= 1.0 {
            return self.url.clone();
        }
        for ext in [".jpg", ".png", ".gif"] {
            if let Some(stem) = self.url.strip_suffix(ext) {
                return format!("{stem}@2x{ext}");
            }
        }
        self.url.clone()
    }

    /// Whether the "loaded" notification has arrived.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.native_size.is_some()
    }

    /// Size in physical image pixels, once loaded.
    #[must_use]
    pub fn native_size(&self) -> Option<Size> {
        self.native_size
    }

    /// Size in logical units (native size divided by the pixel ratio).
    #[must_use]
    pub fn size(&self) -> Option<Size> {
        self.native_size
            .map(|s| Size::new(s.width / self.pixel_ratio, s.height / self.pixel_ratio))
    }

    /// Normalized pixel ratio the source was requested at.
    #[must_use]
    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retina_suffix() {
        let src = ImageSource::pending(ImageId(1), "img/hero.png", 2.0);
        assert_eq!(src.resolved_url(), "img/hero@2x.png");
        let src = ImageSource::pending(ImageId(1), "img/hero.png", 1.0);
        assert_eq!(src.resolved_url(), "img/hero.png");
        let src = ImageSource::pending(ImageId(1), "img/hero.webp", 2.0);
        assert_eq!(src.resolved_url(), "img/hero.webp");
    }

    #[test]
    fn logical_size_divides_ratio() {
        let mut src = ImageSource::pending(ImageId(3), "a.png", 2.0);
        assert!(!src.is_loaded());
        assert_eq!(src.size(), None);
        src.mark_loaded(Size::new(200.0, 100.0));
        assert!(src.is_loaded());
        assert_eq!(src.size(), Some(Size::new(100.0, 50.0)));
        assert_eq!(src.native_size(), Some(Size::new(200.0, 100.0)));
    }
}
