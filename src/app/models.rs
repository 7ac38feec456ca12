//! Data models for listing sources and document URLs
//!
//! A listing source is a paginated page that links to documents. Every link
//! that looks like a document is turned into a [`DocumentUrl`], whose
//! extension is normalized so the same resource is never counted twice under
//! two spellings (`A.pdf`, `A.PDF`, `A.ppdf`).

use std::collections::HashSet;
use std::fmt;

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use url::Url;

use crate::constants::{documents, listings};
use crate::errors::{ConfigError, ConfigResult};

/// A paginated web page enumerating downloadable documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingSource {
    label: String,
    url: Url,
}

impl ListingSource {
    /// Create a listing source from a URL string and an optional label
    ///
    /// When no label is given, the last path segment of the URL is used
    /// (e.g. `data-set-9-files`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the URL does not parse or is not
    /// http(s).
    pub fn new(url: &str, label: Option<&str>) -> ConfigResult<Self> {
        let parsed = Url::parse(url).map_err(|e| ConfigError::InvalidValue {
            field: "listing url".to_string(),
            value: url.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                field: "listing url".to_string(),
                value: url.to_string(),
                reason: "Only http and https listings are supported".to_string(),
            });
        }

        let label = match label.map(str::trim).filter(|l| !l.is_empty()) {
            Some(label) => label.to_string(),
            None => Self::label_from_url(&parsed),
        };

        Ok(Self { label, url: parsed })
    }

    fn label_from_url(url: &Url) -> String {
        url.path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .unwrap_or(listings::FALLBACK_LABEL)
            .to_string()
    }

    /// Human-readable label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Starting URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Check whether a page address still belongs to this listing
    ///
    /// A page belongs to the listing when it has the same origin and its path
    /// starts with the listing path. Pagination via query (`?page=3`) or via
    /// sub-paths both stay inside the listing; a sibling listing
    /// (`data-set-12-files`) does not.
    pub fn contains(&self, page: &Url) -> bool {
        if page.origin() != self.url.origin() {
            return false;
        }

        let base = self.url.path().trim_end_matches('/');
        let path = page.path().trim_end_matches('/');
        path == base || path.starts_with(&format!("{}/", base))
    }
}

impl fmt::Display for ListingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.url)
    }
}

/// The document type accepted by walker and downloader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFormat {
    /// Canonical extension without the dot, lowercase
    pub extension: String,
    /// Known typo variants of the extension, lowercase
    pub typo_extensions: Vec<String>,
    /// Magic bytes a valid body starts with
    pub signature: Vec<u8>,
}

impl Default for DocumentFormat {
    fn default() -> Self {
        Self::pdf()
    }
}

impl DocumentFormat {
    /// PDF documents, accepting the `.ppdf` typo seen on listing pages
    pub fn pdf() -> Self {
        Self {
            extension: documents::EXTENSION.to_string(),
            typo_extensions: documents::TYPO_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            signature: documents::SIGNATURE.to_vec(),
        }
    }

    /// Returns the length of the matched `.ext` suffix if `path` ends with the
    /// canonical extension or one of its typo variants (case-insensitive)
    fn matching_suffix_len(&self, path: &str) -> Option<usize> {
        let lower = path.to_ascii_lowercase();
        std::iter::once(&self.extension)
            .chain(self.typo_extensions.iter())
            .map(|ext| format!(".{}", ext))
            .find(|suffix| lower.ends_with(suffix.as_str()))
            .map(|suffix| suffix.len())
    }

    /// Check if a body starts with the expected signature
    pub fn matches_signature(&self, body: &[u8]) -> bool {
        body.starts_with(&self.signature)
    }
}

/// Absolute URL of a document, with its extension normalized
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentUrl(Url);

impl DocumentUrl {
    /// Resolve a link found on a page into a document URL
    ///
    /// Returns `None` when the link does not resolve or its path does not end
    /// in the document extension (or a typo variant). The fragment is dropped
    /// and the extension is rewritten to the canonical lowercase spelling.
    pub fn from_link(base: &Url, href: &str, format: &DocumentFormat) -> Option<Self> {
        let mut resolved = base.join(href.trim()).ok()?;
        if !matches!(resolved.scheme(), "http" | "https") {
            return None;
        }

        let path = resolved.path().to_string();
        let suffix_len = format.matching_suffix_len(&path)?;
        let normalized = format!(
            "{}.{}",
            &path[..path.len() - suffix_len],
            format.extension
        );

        resolved.set_path(&normalized);
        resolved.set_fragment(None);
        Some(Self(resolved))
    }

    /// The URL as a string
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The parsed URL
    pub fn url(&self) -> &Url {
        &self.0
    }

    /// Local file name: the final path segment, or a fallback when empty
    pub fn file_name(&self) -> String {
        self.0
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| documents::FALLBACK_FILE_NAME.to_string())
    }
}

impl Serialize for DocumentUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for DocumentUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Deduplicated set of document URLs collected across all listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentSet {
    urls: HashSet<DocumentUrl>,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a URL, returning true if it was not present yet
    pub fn insert(&mut self, url: DocumentUrl) -> bool {
        self.urls.insert(url)
    }

    /// Merge another set into this one, returning the number of new URLs
    pub fn merge(&mut self, other: &DocumentSet) -> usize {
        other
            .urls
            .iter()
            .filter(|url| self.urls.insert((*url).clone()))
            .count()
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn contains(&self, url: &DocumentUrl) -> bool {
        self.urls.contains(url)
    }

    /// URLs in lexicographic order
    pub fn sorted(&self) -> Vec<&DocumentUrl> {
        let mut urls: Vec<&DocumentUrl> = self.urls.iter().collect();
        urls.sort();
        urls
    }
}

/// Serialized as a sorted list so reports are stable between runs
impl Serialize for DocumentSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let sorted = self.sorted();
        let mut seq = serializer.serialize_seq(Some(sorted.len()))?;
        for url in sorted {
            seq.serialize_element(url)?;
        }
        seq.end()
    }
}

impl FromIterator<DocumentUrl> for DocumentSet {
    fn from_iter<I: IntoIterator<Item = DocumentUrl>>(iter: I) -> Self {
        Self {
            urls: iter.into_iter().collect(),
        }
    }
}

/// Why a listing produced no URLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// Navigation answered with a non-success status (e.g. 401/403)
    Status { status: u16 },
    /// Navigation failed before any response
    Unreachable { reason: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Status { status } => write!(f, "status {}", status),
            SkipReason::Unreachable { reason } => write!(f, "unreachable: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.gov/disclosures/data-set-9-files?page=2").unwrap()
    }

    #[test]
    fn test_listing_label_defaults_to_last_segment() {
        let listing =
            ListingSource::new("https://example.gov/disclosures/data-set-9-files/", None).unwrap();
        assert_eq!(listing.label(), "data-set-9-files");

        let labelled = ListingSource::new("https://example.gov/a", Some("Set A")).unwrap();
        assert_eq!(labelled.label(), "Set A");
    }

    #[test]
    fn test_listing_rejects_non_http() {
        assert!(ListingSource::new("ftp://example.gov/files", None).is_err());
        assert!(ListingSource::new("not a url", None).is_err());
    }

    #[test]
    fn test_listing_contains_pages() {
        let listing =
            ListingSource::new("https://example.gov/disclosures/data-set-9-files", None).unwrap();

        let page = Url::parse("https://example.gov/disclosures/data-set-9-files?page=4").unwrap();
        assert!(listing.contains(&page));

        let sub = Url::parse("https://example.gov/disclosures/data-set-9-files/page/2").unwrap();
        assert!(listing.contains(&sub));

        let sibling = Url::parse("https://example.gov/disclosures/data-set-9-files-2").unwrap();
        assert!(!listing.contains(&sibling));

        let other = Url::parse("https://example.gov/disclosures/data-set-10-files").unwrap();
        assert!(!listing.contains(&other));

        let foreign = Url::parse("https://mirror.example.org/disclosures/data-set-9-files").unwrap();
        assert!(!listing.contains(&foreign));
    }

    #[test]
    fn test_document_url_normalizes_extension_spellings() {
        let format = DocumentFormat::pdf();
        let links = ["/files/A.pdf", "/files/A.PDF", "/files/A.ppdf", "/files/A.PPDF#page=2"];

        let set: DocumentSet = links
            .iter()
            .filter_map(|href| DocumentUrl::from_link(&base(), href, &format))
            .collect();

        assert_eq!(set.len(), 1);
        assert_eq!(
            set.sorted()[0].as_str(),
            "https://example.gov/files/A.pdf"
        );
    }

    #[test]
    fn test_document_url_resolves_relative_links() {
        let format = DocumentFormat::pdf();
        let url = DocumentUrl::from_link(&base(), "EFTA0001.pdf", &format).unwrap();
        assert_eq!(url.as_str(), "https://example.gov/disclosures/EFTA0001.pdf");
        assert_eq!(url.file_name(), "EFTA0001.pdf");
    }

    #[test]
    fn test_document_url_rejects_other_links() {
        let format = DocumentFormat::pdf();
        assert!(DocumentUrl::from_link(&base(), "/files/A.html", &format).is_none());
        assert!(DocumentUrl::from_link(&base(), "/files/A.pdf.zip", &format).is_none());
        assert!(DocumentUrl::from_link(&base(), "mailto:someone@example.gov", &format).is_none());
        assert!(DocumentUrl::from_link(&base(), "?page=3", &format).is_none());
    }

    #[test]
    fn test_document_url_keeps_query() {
        let format = DocumentFormat::pdf();
        let url = DocumentUrl::from_link(&base(), "/files/B.Pdf?v=2", &format).unwrap();
        assert_eq!(url.as_str(), "https://example.gov/files/B.pdf?v=2");
        assert_eq!(url.file_name(), "B.pdf");
    }

    #[test]
    fn test_signature_check() {
        let format = DocumentFormat::pdf();
        assert!(format.matches_signature(b"%PDF-1.7\n..."));
        assert!(!format.matches_signature(b"<!DOCTYPE html>"));
        assert!(!format.matches_signature(b"%PD"));
    }

    #[test]
    fn test_document_set_merge_counts_new_urls() {
        let format = DocumentFormat::pdf();
        let mut first: DocumentSet = ["/a.pdf", "/b.pdf"]
            .iter()
            .filter_map(|h| DocumentUrl::from_link(&base(), h, &format))
            .collect();
        let second: DocumentSet = ["/b.pdf", "/c.ppdf"]
            .iter()
            .filter_map(|h| DocumentUrl::from_link(&base(), h, &format))
            .collect();

        assert_eq!(first.merge(&second), 1);
        assert_eq!(first.len(), 3);

        let sorted: Vec<&str> = first.sorted().iter().map(|u| u.as_str()).collect();
        assert_eq!(
            sorted,
            vec![
                "https://example.gov/a.pdf",
                "https://example.gov/b.pdf",
                "https://example.gov/c.pdf"
            ]
        );
    }
}
