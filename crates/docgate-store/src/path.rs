//! Path resolution: is this string a document or a collection?
//!
//! Store paths alternate collection and document segments:
//!
//! ```text
//! users                      → collection  (1 segment)
//! users/alice                → document    (2 segments)
//! users/alice/sessions       → collection  (3 segments)
//! users/alice/sessions/t0k3n → document    (4 segments)
//! ```
//!
//! So the kind is a pure function of segment-count parity. [`classify`]
//! is that function. [`resolve`] is what the rest of the crate uses: it
//! does the same split once, rejects empty paths, and hands back a tagged
//! [`ResolvedPath`] so nobody has to re-classify the string later.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::StoreError;

// ---------------------------------------------------------------------------
// PathKind / classify
// ---------------------------------------------------------------------------

/// The two things a path can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathKind {
    Document,
    Collection,
}

impl fmt::Display for PathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => write!(f, "document"),
            Self::Collection => write!(f, "collection"),
        }
    }
}

/// Classifies a path by segment-count parity.
///
/// One leading and one trailing `/` are ignored. Internal empty segments
/// (`a//b`) are counted as-is.
///
/// The empty string has zero segments and therefore classifies as
/// [`PathKind::Document`]. That is almost never what a caller means, which
/// is why every facade operation goes through [`resolve`] instead.
pub fn classify(path: &str) -> PathKind {
    if segment_count(path) % 2 == 0 {
        PathKind::Document
    } else {
        PathKind::Collection
    }
}

fn trim_separators(path: &str) -> &str {
    let path = path.strip_prefix('/').unwrap_or(path);
    path.strip_suffix('/').unwrap_or(path)
}

fn segment_count(path: &str) -> usize {
    let trimmed = trim_separators(path);
    if trimmed.is_empty() {
        0
    } else {
        trimmed.split('/').count()
    }
}

// ---------------------------------------------------------------------------
// DocumentPath / CollectionPath
// ---------------------------------------------------------------------------

/// A path that names a single document (even segment count, at least two).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath {
    segments: Vec<String>,
}

/// A path that names a collection (odd segment count).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath {
    segments: Vec<String>,
}

impl DocumentPath {
    /// Parses `path`, failing with [`StoreError::InvalidPath`] unless it
    /// names a document.
    pub fn parse(path: &str) -> Result<Self, StoreError> {
        match resolve(path)? {
            ResolvedPath::Document(doc) => Ok(doc),
            ResolvedPath::Collection(_) => Err(StoreError::invalid_path(
                path,
                "expected a document path",
            )),
        }
    }

    /// The document id (last segment).
    pub fn id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// The collection this document lives in.
    pub fn parent(&self) -> CollectionPath {
        CollectionPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        }
    }

    /// A sub-collection nested under this document.
    pub fn collection(&self, name: &str) -> CollectionPath {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        CollectionPath { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl CollectionPath {
    /// Parses `path`, failing with [`StoreError::InvalidPath`] unless it
    /// names a collection.
    pub fn parse(path: &str) -> Result<Self, StoreError> {
        match resolve(path)? {
            ResolvedPath::Collection(collection) => Ok(collection),
            ResolvedPath::Document(_) => Err(StoreError::invalid_path(
                path,
                "expected a collection path",
            )),
        }
    }

    /// The collection name (last segment).
    pub fn id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// A document inside this collection.
    pub fn doc(&self, id: &str) -> DocumentPath {
        let mut segments = self.segments.clone();
        segments.push(id.to_string());
        DocumentPath { segments }
    }

    /// The document this collection is nested under, if any.
    pub fn parent(&self) -> Option<DocumentPath> {
        if self.segments.len() < 3 {
            return None;
        }
        Some(DocumentPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Returns `true` if `doc` is a direct child of this collection.
    pub fn contains(&self, doc: &DocumentPath) -> bool {
        doc.segments.len() == self.segments.len() + 1
            && doc.segments.starts_with(&self.segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl FromStr for DocumentPath {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl FromStr for CollectionPath {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// ResolvedPath / resolve
// ---------------------------------------------------------------------------

/// A path after resolution: the kind is decided once and carried along.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolvedPath {
    Document(DocumentPath),
    Collection(CollectionPath),
}

impl ResolvedPath {
    pub fn kind(&self) -> PathKind {
        match self {
            Self::Document(_) => PathKind::Document,
            Self::Collection(_) => PathKind::Collection,
        }
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document(doc) => fmt::Display::fmt(doc, f),
            Self::Collection(collection) => fmt::Display::fmt(collection, f),
        }
    }
}

/// Resolves `path` into a tagged document or collection path.
///
/// # Errors
/// [`StoreError::InvalidPath`] if the path is empty or blank after
/// stripping the outer separators.
pub fn resolve(path: &str) -> Result<ResolvedPath, StoreError> {
    let trimmed = trim_separators(path);
    if trimmed.trim().is_empty() {
        return Err(StoreError::invalid_path(path, "path is empty"));
    }

    let segments: Vec<String> = trimmed.split('/').map(str::to_string).collect();

    if segments.len() % 2 == 0 {
        Ok(ResolvedPath::Document(DocumentPath { segments }))
    } else {
        Ok(ResolvedPath::Collection(CollectionPath { segments }))
    }
}

// ---------------------------------------------------------------------------
// Address traits
// ---------------------------------------------------------------------------

/// Anything that can name a document: a string to be resolved, or an
/// already-resolved [`DocumentPath`].
///
/// Lets the facade accept `"users/alice"` from casual callers and a typed
/// path from the session layer without resolving it a second time.
pub trait DocumentAddress {
    fn into_document_path(self) -> Result<DocumentPath, StoreError>;
}

/// Anything that can name a collection.
pub trait CollectionAddress {
    fn into_collection_path(self) -> Result<CollectionPath, StoreError>;
}

impl DocumentAddress for DocumentPath {
    fn into_document_path(self) -> Result<DocumentPath, StoreError> {
        Ok(self)
    }
}

impl DocumentAddress for &DocumentPath {
    fn into_document_path(self) -> Result<DocumentPath, StoreError> {
        Ok(self.clone())
    }
}

impl DocumentAddress for &str {
    fn into_document_path(self) -> Result<DocumentPath, StoreError> {
        DocumentPath::parse(self)
    }
}

impl DocumentAddress for &String {
    fn into_document_path(self) -> Result<DocumentPath, StoreError> {
        DocumentPath::parse(self)
    }
}

impl DocumentAddress for String {
    fn into_document_path(self) -> Result<DocumentPath, StoreError> {
        DocumentPath::parse(&self)
    }
}

impl CollectionAddress for CollectionPath {
    fn into_collection_path(self) -> Result<CollectionPath, StoreError> {
        Ok(self)
    }
}

impl CollectionAddress for &CollectionPath {
    fn into_collection_path(self) -> Result<CollectionPath, StoreError> {
        Ok(self.clone())
    }
}

impl CollectionAddress for &str {
    fn into_collection_path(self) -> Result<CollectionPath, StoreError> {
        CollectionPath::parse(self)
    }
}

impl CollectionAddress for &String {
    fn into_collection_path(self) -> Result<CollectionPath, StoreError> {
        CollectionPath::parse(self)
    }
}

impl CollectionAddress for String {
    fn into_collection_path(self) -> Result<CollectionPath, StoreError> {
        CollectionPath::parse(&self)
    }
}
