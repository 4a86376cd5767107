//! Record Model
//!
//! This module defines the record types held by the store.
//! A record is a uniquely identified, typed unit of document or session
//! state: shapes and pages are persisted (document scope), while cameras,
//! instance state, and user preferences live only for the session.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Persistence classification for a record.
///
/// Document-scoped records are included in snapshots and saved remotely;
/// session-scoped records never leave the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordScope {
    /// Persisted with the document
    Document,
    /// Ephemeral, never serialized into a snapshot
    Session,
}

/// The set of record types the store knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    /// A shape on a page
    Shape,
    /// A page of the document
    Page,
    /// Document-wide metadata (singleton)
    Document,
    /// Per-page viewport position and zoom
    Camera,
    /// Editor instance state (singleton)
    Instance,
    /// User preferences
    User,
}

impl RecordType {
    /// Get the string representation, also used as the id prefix
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shape => "shape",
            Self::Page => "page",
            Self::Document => "document",
            Self::Camera => "camera",
            Self::Instance => "instance",
            Self::User => "user",
        }
    }

    /// Persistence scope for records of this type
    #[must_use]
    pub fn scope(&self) -> RecordScope {
        match self {
            Self::Shape | Self::Page | Self::Document => RecordScope::Document,
            Self::Camera | Self::Instance | Self::User => RecordScope::Session,
        }
    }

    /// Parse a type from its string representation
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "shape" => Ok(Self::Shape),
            "page" => Ok(Self::Page),
            "document" => Ok(Self::Document),
            "camera" => Ok(Self::Camera),
            "instance" => Ok(Self::Instance),
            "user" => Ok(Self::User),
            other => Err(Error::UnknownRecordType(other.to_string())),
        }
    }

    /// All known record types
    #[must_use]
    pub fn all() -> &'static [RecordType] {
        &[
            Self::Shape,
            Self::Page,
            Self::Document,
            Self::Camera,
            Self::Instance,
            Self::User,
        ]
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stable record identifier of the form `<type>:<key>`.
///
/// Identifiers are globally unique and immutable for the record's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Generate a fresh random id for the given type
    #[must_use]
    pub fn random(record_type: RecordType) -> Self {
        Self(format!("{}:{}", record_type.as_str(), Uuid::new_v4()))
    }

    /// Build an id from a type and an explicit key
    #[must_use]
    pub fn of(record_type: RecordType, key: impl fmt::Display) -> Self {
        Self(format!("{}:{key}", record_type.as_str()))
    }

    /// The singleton document-metadata id
    #[must_use]
    pub fn document() -> Self {
        Self::of(RecordType::Document, "document")
    }

    /// The singleton instance-state id
    #[must_use]
    pub fn instance() -> Self {
        Self::of(RecordType::Instance, "instance")
    }

    /// The singleton user-preferences id
    #[must_use]
    pub fn user() -> Self {
        Self::of(RecordType::User, "user")
    }

    /// Parse and validate an id string
    pub fn parse(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        let Some((prefix, key)) = s.split_once(':') else {
            return Err(Error::InvalidRecordId(s));
        };
        if key.is_empty() {
            return Err(Error::InvalidRecordId(s));
        }
        RecordType::parse(prefix)?;
        Ok(Self(s))
    }

    /// The record type encoded in the id prefix, if recognized
    #[must_use]
    pub fn record_type(&self) -> Option<RecordType> {
        let prefix = self.0.split_once(':').map(|(p, _)| p)?;
        RecordType::parse(prefix).ok()
    }

    /// The id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque extra fields carried through decode → encode unchanged
pub type ExtraFields = BTreeMap<String, Value>;

/// A shape on a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRecord {
    /// Record id (`shape:` prefix)
    pub id: RecordId,
    /// Page this shape lives on
    pub page_id: RecordId,
    /// X position in page space
    pub x: f64,
    /// Y position in page space
    pub y: f64,
    /// Rotation in radians
    #[serde(default)]
    pub rotation: f64,
    /// Opacity in `[0, 1]`
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    /// Tool-specific shape data, opaque to the store
    #[serde(default)]
    pub props: Value,
    /// Unknown fields preserved for forward compatibility
    #[serde(flatten, default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: ExtraFields,
}

fn default_opacity() -> f64 {
    1.0
}

impl ShapeRecord {
    /// Create a shape at a position on a page
    #[must_use]
    pub fn new(page_id: RecordId, x: f64, y: f64) -> Self {
        Self {
            id: RecordId::random(RecordType::Shape),
            page_id,
            x,
            y,
            rotation: 0.0,
            opacity: default_opacity(),
            props: Value::Null,
            extra: BTreeMap::new(),
        }
    }

    /// Set tool-specific props
    #[must_use]
    pub fn with_props(mut self, props: Value) -> Self {
        self.props = props;
        self
    }
}

/// A page of the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Record id (`page:` prefix)
    pub id: RecordId,
    /// Display name
    pub name: String,
    /// Ordering key among pages
    pub index: String,
    /// Unknown fields preserved for forward compatibility
    #[serde(flatten, default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: ExtraFields,
}

impl PageRecord {
    /// Create a page with a name and ordering key
    #[must_use]
    pub fn new(name: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            id: RecordId::random(RecordType::Page),
            name: name.into(),
            index: index.into(),
            extra: BTreeMap::new(),
        }
    }
}

/// Document-wide metadata (singleton record)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Record id (the singleton `document:document`)
    pub id: RecordId,
    /// Document name
    pub name: String,
    /// When the document was created
    pub created_at: DateTime<Utc>,
    /// When the document was last modified
    pub updated_at: DateTime<Utc>,
    /// Unknown fields preserved for forward compatibility
    #[serde(flatten, default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: ExtraFields,
}

impl DocumentRecord {
    /// Create document metadata with a name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::document(),
            name: name.into(),
            created_at: now,
            updated_at: now,
            extra: BTreeMap::new(),
        }
    }

    /// Update the modification timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Per-page viewport position and zoom (session scope)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraRecord {
    /// Record id (`camera:` prefix)
    pub id: RecordId,
    /// Page this camera views
    pub page_id: RecordId,
    /// Viewport X offset
    #[serde(default)]
    pub x: f64,
    /// Viewport Y offset
    #[serde(default)]
    pub y: f64,
    /// Zoom level
    #[serde(default = "default_zoom")]
    pub zoom: f64,
    /// Unknown fields preserved for forward compatibility
    #[serde(flatten, default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: ExtraFields,
}

fn default_zoom() -> f64 {
    1.0
}

impl CameraRecord {
    /// Create a camera for a page at the origin
    #[must_use]
    pub fn new(page_id: RecordId) -> Self {
        Self {
            id: RecordId::random(RecordType::Camera),
            page_id,
            x: 0.0,
            y: 0.0,
            zoom: default_zoom(),
            extra: BTreeMap::new(),
        }
    }
}

/// Editor instance state (session scope, singleton)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    /// Record id (the singleton `instance:instance`)
    pub id: RecordId,
    /// Currently displayed page
    pub current_page_id: RecordId,
    /// Currently selected shape ids
    #[serde(default)]
    pub selected_ids: Vec<RecordId>,
    /// Whether the background grid is shown
    #[serde(default)]
    pub is_grid_mode: bool,
    /// Whether the active tool stays selected after use
    #[serde(default)]
    pub is_tool_locked: bool,
    /// Unknown fields preserved for forward compatibility
    #[serde(flatten, default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: ExtraFields,
}

impl InstanceRecord {
    /// Create instance state pointing at a page
    #[must_use]
    pub fn new(current_page_id: RecordId) -> Self {
        Self {
            id: RecordId::instance(),
            current_page_id,
            selected_ids: Vec::new(),
            is_grid_mode: false,
            is_tool_locked: false,
            extra: BTreeMap::new(),
        }
    }
}

/// User preferences (session scope)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Record id (the singleton `user:user`)
    pub id: RecordId,
    /// Display name
    pub name: String,
    /// Dark color scheme preference
    #[serde(default)]
    pub is_dark_mode: bool,
    /// UI animation speed multiplier
    #[serde(default = "default_animation_speed")]
    pub animation_speed: f64,
    /// Unknown fields preserved for forward compatibility
    #[serde(flatten, default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: ExtraFields,
}

fn default_animation_speed() -> f64 {
    1.0
}

impl UserRecord {
    /// Create preferences for a named user
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: RecordId::user(),
            name: name.into(),
            is_dark_mode: false,
            animation_speed: default_animation_speed(),
            extra: BTreeMap::new(),
        }
    }
}

/// A record held by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    /// A shape on a page
    Shape(ShapeRecord),
    /// A page of the document
    Page(PageRecord),
    /// Document-wide metadata
    Document(DocumentRecord),
    /// Per-page viewport state
    Camera(CameraRecord),
    /// Editor instance state
    Instance(InstanceRecord),
    /// User preferences
    User(UserRecord),
}

impl Record {
    /// Get the record id
    #[must_use]
    pub fn id(&self) -> &RecordId {
        match self {
            Self::Shape(r) => &r.id,
            Self::Page(r) => &r.id,
            Self::Document(r) => &r.id,
            Self::Camera(r) => &r.id,
            Self::Instance(r) => &r.id,
            Self::User(r) => &r.id,
        }
    }

    /// Get the record type
    #[must_use]
    pub fn record_type(&self) -> RecordType {
        match self {
            Self::Shape(_) => RecordType::Shape,
            Self::Page(_) => RecordType::Page,
            Self::Document(_) => RecordType::Document,
            Self::Camera(_) => RecordType::Camera,
            Self::Instance(_) => RecordType::Instance,
            Self::User(_) => RecordType::User,
        }
    }

    /// Get the persistence scope, derived from the record type
    #[must_use]
    pub fn scope(&self) -> RecordScope {
        self.record_type().scope()
    }

    /// Check that the id prefix matches the record type
    pub(crate) fn validate_id(&self) -> Result<()> {
        match self.id().record_type() {
            Some(ty) if ty == self.record_type() => Ok(()),
            _ => Err(Error::malformed(format!(
                "record id `{}` does not match record type `{}`",
                self.id(),
                self.record_type()
            ))),
        }
    }
}

impl From<ShapeRecord> for Record {
    fn from(r: ShapeRecord) -> Self {
        Self::Shape(r)
    }
}

impl From<PageRecord> for Record {
    fn from(r: PageRecord) -> Self {
        Self::Page(r)
    }
}

impl From<DocumentRecord> for Record {
    fn from(r: DocumentRecord) -> Self {
        Self::Document(r)
    }
}

impl From<CameraRecord> for Record {
    fn from(r: CameraRecord) -> Self {
        Self::Camera(r)
    }
}

impl From<InstanceRecord> for Record {
    fn from(r: InstanceRecord) -> Self {
        Self::Instance(r)
    }
}

impl From<UserRecord> for Record {
    fn from(r: UserRecord) -> Self {
        Self::User(r)
    }
}
