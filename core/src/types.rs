//! Resource and envelope shapes exchanged with the content API.
//!
//! # Design
//! The `type` discriminator selects a `Resource` variant. Every variant
//! wraps the same `ResourceObject` shell and differs only in its attribute
//! type: media and categories get typed attributes because the URL resolver
//! and the tree collector read them; other kinds keep an open JSON map.
//! Ids arrive as strings or numbers depending on the endpoint and are held
//! as strings.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Closed set of resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Post,
    Category,
    Image,
    Video,
    Audio,
    Author,
    Term,
    Property,
    Taxonomy,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Post => "post",
            ResourceType::Category => "category",
            ResourceType::Image => "image",
            ResourceType::Video => "video",
            ResourceType::Audio => "audio",
            ResourceType::Author => "author",
            ResourceType::Term => "term",
            ResourceType::Property => "property",
            ResourceType::Taxonomy => "taxonomy",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{id, type}` reference to another resource. Equal iff both fields match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelatedPointer {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ResourceType,
}

impl RelatedPointer {
    pub fn new(id: impl Into<String>, kind: ResourceType) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// The `data` member of a relationship: nothing, one pointer, or many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    One(RelatedPointer),
    Many(Vec<RelatedPointer>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub data: Option<RelationshipData>,
}

impl Relationship {
    /// The single pointer of a to-one relationship.
    pub fn pointer(&self) -> Option<&RelatedPointer> {
        match &self.data {
            Some(RelationshipData::One(p)) => Some(p),
            _ => None,
        }
    }

    /// All pointers, whether the relationship is to-one or to-many.
    pub fn pointers(&self) -> Vec<&RelatedPointer> {
        match &self.data {
            Some(RelationshipData::One(p)) => vec![p],
            Some(RelationshipData::Many(ps)) => ps.iter().collect(),
            None => Vec::new(),
        }
    }
}

pub type Relationships = BTreeMap<String, Relationship>;

/// Shell shared by every resource kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceObject<A> {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub attributes: A,
    #[serde(default)]
    pub relationships: Relationships,
}

impl<A> ResourceObject<A> {
    /// Pointer of a named to-one relationship, if set.
    pub fn related(&self, name: &str) -> Option<&RelatedPointer> {
        self.relationships.get(name).and_then(Relationship::pointer)
    }
}

/// Per-format fingerprints of a media asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprints {
    pub source: Option<String>,
    pub default: Option<String>,
    pub thumb: Option<String>,
    pub square: Option<String>,
    pub cover: Option<String>,
    pub stories: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaAttributes {
    #[serde(default)]
    pub fingerprints: Fingerprints,
    #[serde(default)]
    pub mimetype: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryAttributes {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub slug: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub type MediaResource = ResourceObject<MediaAttributes>;
pub type Category = ResourceObject<CategoryAttributes>;
pub type OpenResource = ResourceObject<Map<String, Value>>;

impl Category {
    /// The parent category pointer; `None` at a tree root.
    pub fn parent(&self) -> Option<&RelatedPointer> {
        self.related("parentCategory")
    }

    pub fn thumbnail(&self) -> Option<&RelatedPointer> {
        self.related("thumbnail")
    }
}

/// Any resource the API returns, keyed on its `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Resource {
    Post(OpenResource),
    Category(Category),
    Image(MediaResource),
    Video(MediaResource),
    Audio(MediaResource),
    Author(OpenResource),
    Term(OpenResource),
    Property(OpenResource),
    Taxonomy(OpenResource),
}

/// Playable or still media kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    pub fn resource_type(self) -> ResourceType {
        match self {
            MediaKind::Image => ResourceType::Image,
            MediaKind::Video => ResourceType::Video,
            MediaKind::Audio => ResourceType::Audio,
        }
    }

    pub fn is_playable(self) -> bool {
        matches!(self, MediaKind::Video | MediaKind::Audio)
    }
}

/// Borrowed view of a media resource together with its kind.
#[derive(Debug, Clone, Copy)]
pub struct Media<'a> {
    pub kind: MediaKind,
    pub resource: &'a MediaResource,
}

impl<'a> Media<'a> {
    pub fn new(kind: MediaKind, resource: &'a MediaResource) -> Self {
        Self { kind, resource }
    }

    pub fn id(&self) -> &'a str {
        &self.resource.id
    }

    pub fn attributes(&self) -> &'a MediaAttributes {
        &self.resource.attributes
    }
}

impl Resource {
    pub fn kind(&self) -> ResourceType {
        match self {
            Resource::Post(_) => ResourceType::Post,
            Resource::Category(_) => ResourceType::Category,
            Resource::Image(_) => ResourceType::Image,
            Resource::Video(_) => ResourceType::Video,
            Resource::Audio(_) => ResourceType::Audio,
            Resource::Author(_) => ResourceType::Author,
            Resource::Term(_) => ResourceType::Term,
            Resource::Property(_) => ResourceType::Property,
            Resource::Taxonomy(_) => ResourceType::Taxonomy,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Resource::Post(r)
            | Resource::Author(r)
            | Resource::Term(r)
            | Resource::Property(r)
            | Resource::Taxonomy(r) => &r.id,
            Resource::Category(r) => &r.id,
            Resource::Image(r) | Resource::Video(r) | Resource::Audio(r) => &r.id,
        }
    }

    pub fn relationships(&self) -> &Relationships {
        match self {
            Resource::Post(r)
            | Resource::Author(r)
            | Resource::Term(r)
            | Resource::Property(r)
            | Resource::Taxonomy(r) => &r.relationships,
            Resource::Category(r) => &r.relationships,
            Resource::Image(r) | Resource::Video(r) | Resource::Audio(r) => &r.relationships,
        }
    }

    /// Identity of this resource as a pointer.
    pub fn pointer(&self) -> RelatedPointer {
        RelatedPointer::new(self.id(), self.kind())
    }

    /// `true` if `pointer` names this resource.
    pub fn matches(&self, pointer: &RelatedPointer) -> bool {
        self.kind() == pointer.kind && self.id() == pointer.id
    }

    pub fn as_media(&self) -> Option<Media<'_>> {
        match self {
            Resource::Image(r) => Some(Media::new(MediaKind::Image, r)),
            Resource::Video(r) => Some(Media::new(MediaKind::Video, r)),
            Resource::Audio(r) => Some(Media::new(MediaKind::Audio, r)),
            _ => None,
        }
    }

    pub fn as_category(&self) -> Option<&Category> {
        match self {
            Resource::Category(c) => Some(c),
            _ => None,
        }
    }
}

/// Response envelope: `{meta?, data, included, links}`.
///
/// `T` is `Resource`, `Vec<Resource>`, or a scalar `Value` depending on the
/// endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    pub data: T,
    #[serde(default)]
    pub included: Vec<Resource>,
    #[serde(default)]
    pub links: BTreeMap<String, Option<String>>,
}

impl<T> Envelope<T> {
    pub fn link(&self, name: &str) -> Option<&str> {
        self.links.get(name).and_then(|l| l.as_deref())
    }

    /// `links.next` as a server-relative path usable for the next dispatch.
    pub fn next_path(&self) -> Option<String> {
        self.link("next").map(server_relative)
    }

    /// Look `pointer` up in this envelope's `included` pool.
    pub fn related(&self, pointer: Option<&RelatedPointer>) -> Option<&Resource> {
        crate::relations::resolve_related(pointer, &self.included)
    }
}

impl Envelope<Vec<Resource>> {
    /// Every category found in `data` and `included`, in that order.
    pub fn categories(&self) -> Vec<Category> {
        self.data
            .iter()
            .chain(self.included.iter())
            .filter_map(Resource::as_category)
            .cloned()
            .collect()
    }
}

/// Strip scheme and authority from an absolute URL; paths pass through.
pub fn server_relative(link: &str) -> String {
    let rest = match link
        .strip_prefix("https://")
        .or_else(|| link.strip_prefix("http://"))
    {
        Some(rest) => rest,
        None => return link.to_string(),
    };
    match rest.find(|c| c == '/' || c == '?') {
        Some(i) if rest[i..].starts_with('/') => rest[i..].to_string(),
        Some(i) => format!("/{}", &rest[i..]),
        None => "/".to_string(),
    }
}

/// Page selector of a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub size: Option<u32>,
    pub number: Option<u32>,
}

/// A filter value: one scalar, a repeated list, or a nested mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Scalar(String),
    List(Vec<String>),
    Nested(Filter),
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Scalar(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Scalar(v)
    }
}

impl<S: Into<String>> From<Vec<S>> for FilterValue {
    fn from(v: Vec<S>) -> Self {
        FilterValue::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<Filter> for FilterValue {
    fn from(v: Filter) -> Self {
        FilterValue::Nested(v)
    }
}

/// Insertion-ordered filter mapping. Keys are open-ended so taxonomy keys
/// like `terms12` need no schema change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    entries: Vec<(String, FilterValue)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing an earlier value in place.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    /// Filter on terms of the given taxonomy (`terms<taxonomyId>`).
    pub fn terms(self, taxonomy_id: impl fmt::Display, term_ids: Vec<String>) -> Self {
        self.set(format!("terms{taxonomy_id}"), term_ids)
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Query descriptor for endpoint dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub include: Vec<String>,
    pub sort: Option<String>,
    pub page: Option<Page>,
    pub filter: Filter,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(mut self, relationship: impl Into<String>) -> Self {
        self.include.push(relationship.into());
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn page(mut self, number: u32, size: u32) -> Self {
        self.page = Some(Page {
            size: Some(size),
            number: Some(number),
        });
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}
