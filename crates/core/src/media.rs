//! Media reference extraction and path rules.
//!
//! A full theme carries the images its pages need: page teaser images from
//! `previews/`, and images embedded in container markup under `media/`.
//! This module finds those references and maps them between the live site
//! layout and the theme layout. Existence checks and size accounting
//! happen in the pipeline, which owns the filesystem.
//!
//! Live site layout:  `media/<folder>/<variant>/<file>`, `previews/<file>`
//! Theme layout:      `media/<folder>/<file>`,           `previews/<file>`

use std::collections::HashSet;
use std::path::{Component, Path};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::CoreError;
use crate::theme::{ORIGINAL_VARIANT, THEME_MEDIA_DIR, THEME_PREVIEWS_DIR};
use crate::types::Row;

/// Ceiling on the total size of media bundled with a full theme (30 MiB).
pub const MAX_THEME_MEDIA_BYTES: u64 = 31_457_280;

/// Page column holding the teaser image file name.
pub const PAGE_PREVIEW_FIELD: &str = "preview_image";

/// Container column holding rendered markup.
pub const CONTAINER_CONTENT_FIELD: &str = "content";

/// Image references inside container markup.
const MEDIA_IMAGE_PATTERN: &str = r#"(?i)media[^"']*\.(?:jpe?g|gif|png)"#;

static MEDIA_IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(MEDIA_IMAGE_PATTERN).expect("valid regex"));

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Rewrite a matched media path to its `original` variant.
///
/// The third segment is the resolution variant. Paths with fewer than three
/// segments do not follow the layout and yield `None`.
pub fn normalize_to_original(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = path.split('/').collect();
    if segments.len() < 3 {
        return None;
    }
    segments[2] = ORIGINAL_VARIANT;
    Some(segments.join("/"))
}

/// All image references in a piece of markup, normalized to `original`.
pub fn extract_content_images(content: &str) -> Vec<String> {
    MEDIA_IMAGE_RE
        .find_iter(content)
        .filter_map(|m| normalize_to_original(m.as_str()))
        .collect()
}

/// Whether a path is a plain relative path inside `media/` or `previews/`.
pub fn is_media_path(path: &str) -> bool {
    let mut components = Path::new(path).components();
    let first_ok = matches!(
        components.next(),
        Some(Component::Normal(first))
            if first == THEME_MEDIA_DIR || first == THEME_PREVIEWS_DIR
    );
    first_ok && components.all(|c| matches!(c, Component::Normal(_)))
}

/// Collect the candidate media paths for an export.
///
/// Order: page previews, container images, then `extra` (plugin-provided).
/// Duplicates, empty entries and anything outside the media trees are
/// dropped. An empty `pages` slice is a caller error.
pub fn collect_candidates(
    pages: &[Row],
    containers: &[Row],
    extra: &[String],
) -> Result<Vec<String>, CoreError> {
    if pages.is_empty() {
        return Err(CoreError::Validation(
            "Given empty pages to export media procedure".into(),
        ));
    }

    let previews = pages.iter().filter_map(|page| {
        page.get(PAGE_PREVIEW_FIELD)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(|file| format!("{THEME_PREVIEWS_DIR}/{file}"))
    });

    let images = containers.iter().flat_map(|container| {
        container
            .get(CONTAINER_CONTENT_FIELD)
            .and_then(|v| v.as_str())
            .map(extract_content_images)
            .unwrap_or_default()
    });

    let mut seen = HashSet::new();
    let candidates = previews
        .chain(images)
        .chain(extra.iter().cloned())
        .filter(|path| !path.is_empty() && is_media_path(path))
        .filter(|path| seen.insert(path.clone()))
        .collect();

    Ok(candidates)
}

// ---------------------------------------------------------------------------
// Sized sets
// ---------------------------------------------------------------------------

/// A media file that exists on the live site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaFile {
    /// Path relative to the website root.
    pub path: String,
    pub size_bytes: u64,
}

/// Resolved media for one export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MediaSet {
    pub files: Vec<MediaFile>,
    pub total_bytes: u64,
}

impl MediaSet {
    pub fn push(&mut self, file: MediaFile) {
        self.total_bytes += file.size_bytes;
        self.files.push(file);
    }

    pub fn paths(&self) -> Vec<String> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Fail when the set is larger than `max_bytes`.
    pub fn ensure_within(&self, max_bytes: u64) -> Result<(), CoreError> {
        if self.total_bytes > max_bytes {
            return Err(CoreError::PayloadTooLarge(format!(
                "Too many images: {} bytes of media exceeds the {max_bytes} byte limit",
                self.total_bytes
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Layout mapping
// ---------------------------------------------------------------------------

/// Where a live media file is stored inside a theme.
///
/// `media/<folder>/<variant>/<file>` becomes `media/<folder>/<file>`;
/// `previews/<file>` keeps its path.
pub fn theme_destination(live_path: &str) -> Option<String> {
    if !is_media_path(live_path) {
        return None;
    }
    let segments: Vec<&str> = live_path.split('/').collect();
    match segments.as_slice() {
        [THEME_PREVIEWS_DIR, file] => Some(format!("{THEME_PREVIEWS_DIR}/{file}")),
        [THEME_MEDIA_DIR, folder, .., file] => Some(format!("{THEME_MEDIA_DIR}/{folder}/{file}")),
        _ => None,
    }
}

/// Where a theme media file is installed on the live site.
///
/// The inverse of [`theme_destination`]: images land in the `original`
/// variant folder.
pub fn live_destination(theme_path: &str) -> Option<String> {
    if !is_media_path(theme_path) {
        return None;
    }
    let segments: Vec<&str> = theme_path.split('/').collect();
    match segments.as_slice() {
        [THEME_PREVIEWS_DIR, file] => Some(format!("{THEME_PREVIEWS_DIR}/{file}")),
        [THEME_MEDIA_DIR, folder, file] => Some(format!(
            "{THEME_MEDIA_DIR}/{folder}/{ORIGINAL_VARIANT}/{file}"
        )),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn row(value: serde_json::Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn normalizes_variant_segment() {
        assert_eq!(
            normalize_to_original("media/gallery/small/cat.png").as_deref(),
            Some("media/gallery/original/cat.png")
        );
        assert_eq!(
            normalize_to_original("media/gallery/original/cat.png").as_deref(),
            Some("media/gallery/original/cat.png")
        );
        assert_eq!(normalize_to_original("media/cat.png"), None);
    }

    #[test]
    fn extracts_images_from_markup() {
        let html = r#"<p><img src="media/gallery/medium/Cat.JPG" alt='x'>
            <a href='media/docs/large/plan.gif'>plan</a> <img src="media/bad.png"></p>"#;
        assert_eq!(
            extract_content_images(html),
            vec![
                "media/gallery/original/Cat.JPG".to_string(),
                "media/docs/original/plan.gif".to_string(),
            ]
        );
    }

    #[test]
    fn media_path_rules() {
        assert!(is_media_path("media/a/original/x.png"));
        assert!(is_media_path("previews/x.png"));
        assert!(!is_media_path("/media/a/x.png"));
        assert!(!is_media_path("media/../config.php"));
        assert!(!is_media_path("themes/x/index.html"));
        assert!(!is_media_path(""));
    }

    #[test]
    fn candidates_are_merged_and_deduplicated() {
        let pages = vec![
            row(json!({"id": 1, "preview_image": "home.png"})),
            row(json!({"id": 2, "preview_image": ""})),
            row(json!({"id": 3, "preview_image": null})),
        ];
        let containers = vec![
            row(json!({"content": "<img src=\"media/g/small/a.png\">"})),
            row(json!({"content": "<img src=\"media/g/large/a.png\">"})),
            row(json!({"content": null})),
        ];
        let extra = vec![
            "previews/home.png".to_string(),
            "media/plugin/original/b.jpg".to_string(),
            "../etc/passwd".to_string(),
            String::new(),
        ];

        let candidates = collect_candidates(&pages, &containers, &extra).unwrap();
        assert_eq!(
            candidates,
            vec![
                "previews/home.png".to_string(),
                "media/g/original/a.png".to_string(),
                "media/plugin/original/b.jpg".to_string(),
            ]
        );
    }

    #[test]
    fn empty_pages_are_rejected() {
        assert_matches!(
            collect_candidates(&[], &[], &[]),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn size_ceiling() {
        let mut set = MediaSet::default();
        set.push(MediaFile {
            path: "previews/a.png".into(),
            size_bytes: MAX_THEME_MEDIA_BYTES,
        });
        assert!(set.ensure_within(MAX_THEME_MEDIA_BYTES).is_ok());

        set.push(MediaFile {
            path: "previews/b.png".into(),
            size_bytes: 1,
        });
        assert_matches!(
            set.ensure_within(MAX_THEME_MEDIA_BYTES),
            Err(CoreError::PayloadTooLarge(_))
        );
    }

    #[test]
    fn layout_mapping() {
        assert_eq!(
            theme_destination("media/gallery/original/cat.png").as_deref(),
            Some("media/gallery/cat.png")
        );
        assert_eq!(
            theme_destination("previews/home.png").as_deref(),
            Some("previews/home.png")
        );
        assert_eq!(theme_destination("media/cat.png"), None);

        assert_eq!(
            live_destination("media/gallery/cat.png").as_deref(),
            Some("media/gallery/original/cat.png")
        );
        assert_eq!(
            live_destination("previews/home.png").as_deref(),
            Some("previews/home.png")
        );
        assert_eq!(live_destination("media/gallery/sub/cat.png"), None);
    }
}
