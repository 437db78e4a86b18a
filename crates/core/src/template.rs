//! Template naming, typing and protection rules.
//!
//! Templates are stored by name; a theme ships them as `.html` files at its
//! root or under `mobile/`. This module holds the pure rules that tie the
//! two together:
//!
//! - Deriving a template name from a theme-relative file path.
//! - Validating template names.
//! - The protected-name set (templates that can never be renamed or deleted).
//! - Resolving a template's type from the legacy `theme.ini` type map.
//! - Reading and writing that `key = value` sidecar.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// File extension of template files inside a theme.
pub const TEMPLATE_EXTENSION: &str = "html";

/// Theme subfolder holding mobile variants of templates.
pub const MOBILE_DIR: &str = "mobile";

/// Minimum template name length.
pub const NAME_MIN_LEN: usize = 3;

/// Maximum template name length.
pub const NAME_MAX_LEN: usize = 45;

/// Template names the rendering core depends on.
pub const DEFAULT_PROTECTED_TEMPLATES: &[&str] = &["index", "default", "category", "news"];

// ---------------------------------------------------------------------------
// Template type
// ---------------------------------------------------------------------------

/// Kind of a stored template, persisted as its `type...` name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum TemplateType {
    #[default]
    Regular,
    Product,
    Listing,
    Checkout,
    Menu,
    Mail,
    Mobile,
}

impl TemplateType {
    pub const ALL: &'static [TemplateType] = &[
        Self::Regular,
        Self::Product,
        Self::Listing,
        Self::Checkout,
        Self::Menu,
        Self::Mail,
        Self::Mobile,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "typeregular",
            Self::Product => "typeproduct",
            Self::Listing => "typelisting",
            Self::Checkout => "typecheckout",
            Self::Menu => "typemenu",
            Self::Mail => "typemail",
            Self::Mobile => "typemobile",
        }
    }

    /// Parse from the stored name. Matching is case-insensitive.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        let lower = name.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| CoreError::Validation(format!("Unknown template type '{name}'")))
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<TemplateType> for String {
    fn from(t: TemplateType) -> Self {
        t.as_str().to_string()
    }
}

impl TryFrom<String> for TemplateType {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_name(&value)
    }
}

// ---------------------------------------------------------------------------
// Protected names
// ---------------------------------------------------------------------------

/// The set of template names that may never be renamed or deleted, and
/// whose files every valid theme must contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedTemplates {
    names: Vec<String>,
}

impl ProtectedTemplates {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names.into_iter().map(|s| s.into().trim().to_string()) {
            if !name.is_empty() && !unique.contains(&name) {
                unique.push(name);
            }
        }
        Self { names: unique }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Protected names with no `<name>.html` among `files`.
    ///
    /// `files` are theme-relative paths as returned by the template scan;
    /// only root-level files satisfy the requirement. The match is exact
    /// because stored names keep the file's case.
    pub fn missing_from<S: AsRef<str>>(&self, files: &[S]) -> Vec<String> {
        self.missing_by(files, |file, expected| file == expected)
    }

    /// Like [`missing_from`](Self::missing_from), ignoring ASCII case.
    /// Only used to decide which themes the catalog lists.
    pub fn missing_from_listing<S: AsRef<str>>(&self, files: &[S]) -> Vec<String> {
        self.missing_by(files, |file, expected| file.eq_ignore_ascii_case(expected))
    }

    fn missing_by<S, F>(&self, files: &[S], matches: F) -> Vec<String>
    where
        S: AsRef<str>,
        F: Fn(&str, &str) -> bool,
    {
        self.names
            .iter()
            .filter(|name| {
                let expected = format!("{name}.{TEMPLATE_EXTENSION}");
                !files.iter().any(|f| matches(f.as_ref(), &expected))
            })
            .cloned()
            .collect()
    }

    /// Fail with one message per protected template absent from `files`.
    pub fn ensure_present<S: AsRef<str>>(&self, files: &[S]) -> Result<(), CoreError> {
        let missing = self.missing_from(files);
        if missing.is_empty() {
            return Ok(());
        }
        Err(CoreError::InvalidTheme(
            missing
                .iter()
                .map(|name| format!("Theme missing template: {name}"))
                .collect(),
        ))
    }
}

impl Default for ProtectedTemplates {
    fn default() -> Self {
        Self::new(DEFAULT_PROTECTED_TEMPLATES.iter().copied())
    }
}

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// Derive the stored template name from a theme-relative file path.
///
/// Path separators become `_` and the `.html` suffix is stripped, so
/// `mobile/index.html` becomes `mobile_index`.
pub fn derive_template_name(relative_path: &str) -> String {
    let joined = relative_path.replace(['/', '\\'], "_");
    let suffix = format!(".{TEMPLATE_EXTENSION}");
    match joined.strip_suffix(&suffix) {
        Some(stem) => stem.to_string(),
        None => joined,
    }
}

/// Whether a theme-relative path lives in the mobile subfolder.
pub fn is_mobile_path(relative_path: &str) -> bool {
    relative_path
        .strip_prefix(MOBILE_DIR)
        .is_some_and(|rest| rest.starts_with('/') || rest.starts_with('\\'))
}

/// Validate a template name: 3-45 characters, ASCII alphanumerics and `_`.
pub fn validate_template_name(name: &str) -> Result<(), CoreError> {
    let len = name.chars().count();
    if len == 0 {
        return Err(CoreError::Validation(
            "Template name field can't be empty.".into(),
        ));
    }
    if len < NAME_MIN_LEN {
        return Err(CoreError::Validation(format!(
            "Template name '{name}' is too short."
        )));
    }
    if len > NAME_MAX_LEN {
        return Err(CoreError::Validation(format!(
            "Template name '{name}' is too long."
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(CoreError::Validation(format!(
            "Template name '{name}' contains characters which are non alphabetic and no digits"
        )));
    }
    Ok(())
}

/// Cache tag under which rendered output of a template is stored.
pub fn cache_tag(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

/// Type to assign to a template during sync, or `None` to keep the prior one.
///
/// An explicit entry in the type map wins, then the mobile folder.
/// Entries naming an unknown type are ignored.
pub fn assign_type(
    name: &str,
    relative_path: &str,
    type_map: Option<&TemplateTypeMap>,
) -> Option<TemplateType> {
    if let Some(t) = type_map
        .and_then(|map| map.get(name))
        .and_then(|raw| TemplateType::from_name(raw).ok())
    {
        return Some(t);
    }
    is_mobile_path(relative_path).then_some(TemplateType::Mobile)
}

// ---------------------------------------------------------------------------
// Rename
// ---------------------------------------------------------------------------

/// Outcome of a rename request against the protection rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameDecision {
    /// Same name requested; nothing to track.
    Unchanged,
    /// The current name is protected and is kept.
    Refused,
    /// Rename allowed; the store must locate the row by `old_name`.
    Rename { old_name: String, new_name: String },
}

pub fn plan_rename(
    current_name: &str,
    new_name: &str,
    protected: &ProtectedTemplates,
) -> Result<RenameDecision, CoreError> {
    if current_name == new_name {
        return Ok(RenameDecision::Unchanged);
    }
    if protected.contains(current_name) {
        return Ok(RenameDecision::Refused);
    }
    validate_template_name(new_name)?;
    if protected.contains(new_name) {
        return Err(CoreError::Conflict(format!(
            "Template '{new_name}' is protected"
        )));
    }
    Ok(RenameDecision::Rename {
        old_name: current_name.to_string(),
        new_name: new_name.to_string(),
    })
}

// ---------------------------------------------------------------------------
// theme.ini type map
// ---------------------------------------------------------------------------

/// Legacy `theme.ini` mapping of template name to type name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateTypeMap {
    entries: BTreeMap<String, String>,
}

impl TemplateTypeMap {
    /// Parse `key = value` lines.
    ///
    /// Blank lines, `;`/`#` comments and `[section]` headers are skipped.
    /// Values may be wrapped in double quotes.
    pub fn parse(input: &str) -> Self {
        let mut entries = BTreeMap::new();
        for line in input.lines() {
            let line = line.trim();
            if line.is_empty()
                || line.starts_with(';')
                || line.starts_with('#')
                || line.starts_with('[')
            {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim().trim_matches('"');
            if key.is_empty() {
                continue;
            }
            entries.insert(key.to_string(), value.to_string());
        }
        Self { entries }
    }

    pub fn insert(&mut self, name: impl Into<String>, template_type: impl Into<String>) {
        self.entries.insert(name.into(), template_type.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize back to one `name = "type"` line per template, sorted by name.
    pub fn to_ini(&self) -> String {
        let mut out = String::new();
        for (name, template_type) in &self.entries {
            out.push_str(name);
            out.push_str(" = \"");
            out.push_str(template_type);
            out.push_str("\"\n");
        }
        out
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TemplateTypeMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn derives_names_from_paths() {
        assert_eq!(derive_template_name("index.html"), "index");
        assert_eq!(derive_template_name("mobile/index.html"), "mobile_index");
        assert_eq!(derive_template_name("mobile\\news.html"), "mobile_news");
        assert_eq!(derive_template_name("readme.txt"), "readme.txt");
    }

    #[test]
    fn mobile_path_detection() {
        assert!(is_mobile_path("mobile/index.html"));
        assert!(!is_mobile_path("mobileindex.html"));
        assert!(!is_mobile_path("index.html"));
    }

    #[test]
    fn name_validation() {
        assert!(validate_template_name("default").is_ok());
        assert!(validate_template_name("mobile_index").is_ok());
        assert_matches!(validate_template_name(""), Err(CoreError::Validation(_)));
        assert_matches!(validate_template_name("ab"), Err(CoreError::Validation(_)));
        assert_matches!(
            validate_template_name(&"a".repeat(46)),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            validate_template_name("bad-name"),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn protected_missing_lists_each_name() {
        let protected = ProtectedTemplates::default();
        let files = ["index.html", "default.html", "category.html", "mobile/news.html"];
        assert_eq!(protected.missing_from(&files), vec!["news".to_string()]);

        let err = protected.ensure_present(&files).unwrap_err();
        assert_matches!(
            err,
            CoreError::InvalidTheme(msgs) if msgs == vec!["Theme missing template: news".to_string()]
        );
    }

    #[test]
    fn protected_match_is_exact_except_for_listing() {
        let protected = ProtectedTemplates::new(["index"]);
        assert_matches!(
            protected.ensure_present(&["INDEX.html"]),
            Err(CoreError::InvalidTheme(_))
        );
        assert!(protected.missing_from_listing(&["INDEX.html"]).is_empty());
        assert!(protected.ensure_present(&["index.html"]).is_ok());
    }

    #[test]
    fn protected_set_dedupes_and_trims() {
        let protected = ProtectedTemplates::new([" index", "index", "", "news "]);
        assert_eq!(protected.names(), &["index".to_string(), "news".to_string()]);
    }

    #[test]
    fn type_map_wins_over_mobile_folder() {
        let map: TemplateTypeMap = [("mobile_index", "typeproduct")].into_iter().collect();
        assert_eq!(
            assign_type("mobile_index", "mobile/index.html", Some(&map)),
            Some(TemplateType::Product)
        );
        assert_eq!(
            assign_type("mobile_news", "mobile/news.html", Some(&map)),
            Some(TemplateType::Mobile)
        );
        assert_eq!(assign_type("index", "index.html", Some(&map)), None);
        assert_eq!(assign_type("index", "index.html", None), None);
    }

    #[test]
    fn unknown_type_in_map_is_ignored() {
        let map: TemplateTypeMap = [("index", "typebogus")].into_iter().collect();
        assert_eq!(assign_type("index", "index.html", Some(&map)), None);
    }

    #[test]
    fn ini_parse_and_write() {
        let map = TemplateTypeMap::parse(
            "; generated\n[templates]\nindex = \"typeregular\"\nproduct=typeproduct\n\nbroken line\n",
        );
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("index"), Some("typeregular"));
        assert_eq!(map.get("product"), Some("typeproduct"));
        assert_eq!(
            map.to_ini(),
            "index = \"typeregular\"\nproduct = \"typeproduct\"\n"
        );
        assert_eq!(TemplateTypeMap::parse(&map.to_ini()), map);
    }

    #[test]
    fn rename_rules() {
        let protected = ProtectedTemplates::default();
        assert_eq!(
            plan_rename("index", "home", &protected).unwrap(),
            RenameDecision::Refused
        );
        assert_eq!(
            plan_rename("landing", "landing", &protected).unwrap(),
            RenameDecision::Unchanged
        );
        assert_eq!(
            plan_rename("landing", "promo", &protected).unwrap(),
            RenameDecision::Rename {
                old_name: "landing".into(),
                new_name: "promo".into()
            }
        );
        assert_matches!(
            plan_rename("landing", "news", &protected),
            Err(CoreError::Conflict(_))
        );
    }

    #[test]
    fn cache_tag_strips_non_word_characters() {
        assert_eq!(cache_tag("my-template.v2"), "mytemplatev2");
        assert_eq!(cache_tag("mobile_index"), "mobile_index");
    }

    #[test]
    fn template_type_round_trips_through_names() {
        for t in TemplateType::ALL {
            assert_eq!(TemplateType::from_name(t.as_str()).unwrap(), *t);
        }
        assert_eq!(TemplateType::from_name("TypeMobile").unwrap(), TemplateType::Mobile);
    }
}
