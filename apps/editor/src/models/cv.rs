use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

pub const DEFAULT_LAYOUT_FONT: &str = "Arial";
pub const DEFAULT_LAYOUT_SIZE: u32 = 14;
pub const DEFAULT_LAYOUT_COLOR: &str = "#000";
pub const DEFAULT_LAYOUT_BG_COLOR: &str = "#f8f9fa";

/// Server-assigned identifier of a persisted CV.
///
/// Any non-empty string the server hands back is kept as-is. Route parameters
/// go through [`CvId::from_route`], which only accepts well-formed ids
/// (24 hex characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CvId(String);

impl CvId {
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// A malformed route parameter means "no identifier", not an error.
    pub fn from_route(raw: &str) -> Option<Self> {
        Self::new(raw).filter(CvId::is_well_formed)
    }

    pub fn is_well_formed(&self) -> bool {
        self.0.len() == 24 && self.0.bytes().all(|b| b.is_ascii_hexdigit())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CvId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A freshly picked profile image that has not been uploaded yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// The profile image slot of `basic`: nothing, a stored url, or a pending upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ImageSource {
    #[default]
    None,
    Url(String),
    Upload(ImageUpload),
}

impl ImageSource {
    pub fn is_present(&self) -> bool {
        match self {
            ImageSource::None => false,
            ImageSource::Url(url) => !url.trim().is_empty(),
            ImageSource::Upload(upload) => !upload.bytes.is_empty(),
        }
    }

    pub fn upload(&self) -> Option<&ImageUpload> {
        match self {
            ImageSource::Upload(upload) => Some(upload),
            _ => None,
        }
    }
}

// Pending uploads never travel inside JSON; they go out as a separate binary part.
impl Serialize for ImageSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ImageSource::Url(url) => serializer.serialize_str(url),
            _ => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for ImageSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(url) if !url.trim().is_empty() => ImageSource::Url(url),
            _ => ImageSource::None,
        })
    }
}

/// Accepts strings, numbers and booleans for text fields; `null` becomes "".
pub(crate) fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

fn lenient_size<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let size = match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(size
        .and_then(|s| u32::try_from(s).ok())
        .filter(|s| *s > 0)
        .unwrap_or(DEFAULT_LAYOUT_SIZE))
}

/// Text fields of a CV record addressed by their wire (camelCase) names.
pub trait TextFields {
    fn text_field(&self, name: &str) -> Option<&str>;
    fn text_field_mut(&mut self, name: &str) -> Option<&mut String>;
    /// Keys this record does not know about, carried through untouched.
    fn extra_mut(&mut self) -> &mut Map<String, Value>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BasicInfo {
    #[serde(deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub email: String,
    #[serde(deserialize_with = "lenient_text")]
    pub phone: String,
    #[serde(deserialize_with = "lenient_text")]
    pub address: String,
    #[serde(deserialize_with = "lenient_text")]
    pub city: String,
    #[serde(deserialize_with = "lenient_text")]
    pub state: String,
    #[serde(deserialize_with = "lenient_text")]
    pub pincode: String,
    #[serde(deserialize_with = "lenient_text")]
    pub intro: String,
    #[serde(deserialize_with = "lenient_text")]
    pub introduction_paragraph: String,
    pub image: ImageSource,
    #[serde(deserialize_with = "lenient_text")]
    pub image_url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TextFields for BasicInfo {
    fn text_field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "name" => &self.name,
            "email" => &self.email,
            "phone" => &self.phone,
            "address" => &self.address,
            "city" => &self.city,
            "state" => &self.state,
            "pincode" => &self.pincode,
            "intro" => &self.intro,
            "introductionParagraph" => &self.introduction_paragraph,
            "imageUrl" => &self.image_url,
            other => return self.extra.get(other).and_then(Value::as_str),
        };
        Some(value.as_str())
    }

    fn text_field_mut(&mut self, name: &str) -> Option<&mut String> {
        match name {
            "name" => Some(&mut self.name),
            "email" => Some(&mut self.email),
            "phone" => Some(&mut self.phone),
            "address" => Some(&mut self.address),
            "city" => Some(&mut self.city),
            "state" => Some(&mut self.state),
            "pincode" => Some(&mut self.pincode),
            "intro" => Some(&mut self.intro),
            "introductionParagraph" => Some(&mut self.introduction_paragraph),
            "imageUrl" => Some(&mut self.image_url),
            _ => None,
        }
    }

    fn extra_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.extra
    }
}

/// Presentation settings. Never validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Layout {
    #[serde(deserialize_with = "lenient_text")]
    pub font: String,
    #[serde(deserialize_with = "lenient_size")]
    pub size: u32,
    #[serde(deserialize_with = "lenient_text")]
    pub color: String,
    #[serde(deserialize_with = "lenient_text")]
    pub bg_color: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            font: DEFAULT_LAYOUT_FONT.to_string(),
            size: DEFAULT_LAYOUT_SIZE,
            color: DEFAULT_LAYOUT_COLOR.to_string(),
            bg_color: DEFAULT_LAYOUT_BG_COLOR.to_string(),
            extra: Map::new(),
        }
    }
}

impl TextFields for Layout {
    fn text_field(&self, name: &str) -> Option<&str> {
        match name {
            "font" => Some(self.font.as_str()),
            "color" => Some(self.color.as_str()),
            "bgColor" => Some(self.bg_color.as_str()),
            other => self.extra.get(other).and_then(Value::as_str),
        }
    }

    fn text_field_mut(&mut self, name: &str) -> Option<&mut String> {
        match name {
            "font" => Some(&mut self.font),
            "color" => Some(&mut self.color),
            "bgColor" => Some(&mut self.bg_color),
            _ => None,
        }
    }

    fn extra_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.extra
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Education {
    #[serde(deserialize_with = "lenient_text")]
    pub degree: String,
    #[serde(deserialize_with = "lenient_text")]
    pub institution: String,
    #[serde(deserialize_with = "lenient_text")]
    pub percentage: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TextFields for Education {
    fn text_field(&self, name: &str) -> Option<&str> {
        match name {
            "degree" => Some(self.degree.as_str()),
            "institution" => Some(self.institution.as_str()),
            "percentage" => Some(self.percentage.as_str()),
            other => self.extra.get(other).and_then(Value::as_str),
        }
    }

    fn text_field_mut(&mut self, name: &str) -> Option<&mut String> {
        match name {
            "degree" => Some(&mut self.degree),
            "institution" => Some(&mut self.institution),
            "percentage" => Some(&mut self.percentage),
            _ => None,
        }
    }

    fn extra_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.extra
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Experience {
    #[serde(deserialize_with = "lenient_text")]
    pub organization: String,
    #[serde(deserialize_with = "lenient_text")]
    pub position: String,
    #[serde(deserialize_with = "lenient_text")]
    pub ctc: String,
    #[serde(deserialize_with = "lenient_text")]
    pub joining_date: String,
    #[serde(deserialize_with = "lenient_text")]
    pub leaving_date: String,
    #[serde(deserialize_with = "lenient_text")]
    pub technologies: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TextFields for Experience {
    fn text_field(&self, name: &str) -> Option<&str> {
        match name {
            "organization" => Some(self.organization.as_str()),
            "position" => Some(self.position.as_str()),
            "ctc" => Some(self.ctc.as_str()),
            "joiningDate" => Some(self.joining_date.as_str()),
            "leavingDate" => Some(self.leaving_date.as_str()),
            "technologies" => Some(self.technologies.as_str()),
            other => self.extra.get(other).and_then(Value::as_str),
        }
    }

    fn text_field_mut(&mut self, name: &str) -> Option<&mut String> {
        match name {
            "organization" => Some(&mut self.organization),
            "position" => Some(&mut self.position),
            "ctc" => Some(&mut self.ctc),
            "joiningDate" => Some(&mut self.joining_date),
            "leavingDate" => Some(&mut self.leaving_date),
            "technologies" => Some(&mut self.technologies),
            _ => None,
        }
    }

    fn extra_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.extra
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Project {
    #[serde(deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(deserialize_with = "lenient_text")]
    pub team_size: String,
    #[serde(deserialize_with = "lenient_text")]
    pub duration: String,
    #[serde(deserialize_with = "lenient_text")]
    pub technologies: String,
    #[serde(deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TextFields for Project {
    fn text_field(&self, name: &str) -> Option<&str> {
        match name {
            "title" => Some(self.title.as_str()),
            "teamSize" => Some(self.team_size.as_str()),
            "duration" => Some(self.duration.as_str()),
            "technologies" => Some(self.technologies.as_str()),
            "description" => Some(self.description.as_str()),
            other => self.extra.get(other).and_then(Value::as_str),
        }
    }

    fn text_field_mut(&mut self, name: &str) -> Option<&mut String> {
        match name {
            "title" => Some(&mut self.title),
            "teamSize" => Some(&mut self.team_size),
            "duration" => Some(&mut self.duration),
            "technologies" => Some(&mut self.technologies),
            "description" => Some(&mut self.description),
            _ => None,
        }
    }

    fn extra_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.extra
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Skill {
    #[serde(deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub percentage: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TextFields for Skill {
    fn text_field(&self, name: &str) -> Option<&str> {
        match name {
            "name" => Some(self.name.as_str()),
            "percentage" => Some(self.percentage.as_str()),
            other => self.extra.get(other).and_then(Value::as_str),
        }
    }

    fn text_field_mut(&mut self, name: &str) -> Option<&mut String> {
        match name {
            "name" => Some(&mut self.name),
            "percentage" => Some(&mut self.percentage),
            _ => None,
        }
    }

    fn extra_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.extra
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SocialProfile {
    #[serde(deserialize_with = "lenient_text")]
    pub platform: String,
    #[serde(deserialize_with = "lenient_text")]
    pub link: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TextFields for SocialProfile {
    fn text_field(&self, name: &str) -> Option<&str> {
        match name {
            "platform" => Some(self.platform.as_str()),
            "link" => Some(self.link.as_str()),
            other => self.extra.get(other).and_then(Value::as_str),
        }
    }

    fn text_field_mut(&mut self, name: &str) -> Option<&mut String> {
        match name {
            "platform" => Some(&mut self.platform),
            "link" => Some(&mut self.link),
            _ => None,
        }
    }

    fn extra_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.extra
    }
}

/// Record-shaped sections, edited field by field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarSection {
    Basic,
    Layout,
}

impl ScalarSection {
    pub fn key(self) -> &'static str {
        match self {
            ScalarSection::Basic => "basic",
            ScalarSection::Layout => "layout",
        }
    }
}

impl fmt::Display for ScalarSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Ordered list sections. Insertion order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListSection {
    Education,
    Experience,
    Projects,
    Skills,
    Social,
}

impl ListSection {
    pub fn key(self) -> &'static str {
        match self {
            ListSection::Education => "education",
            ListSection::Experience => "experience",
            ListSection::Projects => "projects",
            ListSection::Skills => "skills",
            ListSection::Social => "social",
        }
    }

    /// The zero-valued item a UI appends when the user clicks "Add".
    pub fn blank_item(self) -> SectionItem {
        match self {
            ListSection::Education => SectionItem::Education(Education::default()),
            ListSection::Experience => SectionItem::Experience(Experience::default()),
            ListSection::Projects => SectionItem::Project(Project::default()),
            ListSection::Skills => SectionItem::Skill(Skill::default()),
            ListSection::Social => SectionItem::Social(SocialProfile::default()),
        }
    }
}

impl fmt::Display for ListSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionItem {
    Education(Education),
    Experience(Experience),
    Project(Project),
    Skill(Skill),
    Social(SocialProfile),
}

impl SectionItem {
    pub fn section(&self) -> ListSection {
        match self {
            SectionItem::Education(_) => ListSection::Education,
            SectionItem::Experience(_) => ListSection::Experience,
            SectionItem::Project(_) => ListSection::Projects,
            SectionItem::Skill(_) => ListSection::Skills,
            SectionItem::Social(_) => ListSection::Social,
        }
    }
}

/// The CV being edited. Built through `draft::normalize`, so every section is
/// always present with its container shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CvDraft {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<CvId>,
    pub basic: BasicInfo,
    pub education: Vec<Education>,
    pub experience: Vec<Experience>,
    pub projects: Vec<Project>,
    pub skills: Vec<Skill>,
    pub social: Vec<SocialProfile>,
    pub layout: Layout,
    #[serde(rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CvDraft {
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn list_len(&self, section: ListSection) -> usize {
        match section {
            ListSection::Education => self.education.len(),
            ListSection::Experience => self.experience.len(),
            ListSection::Projects => self.projects.len(),
            ListSection::Skills => self.skills.len(),
            ListSection::Social => self.social.len(),
        }
    }

    pub fn display_name(&self) -> &str {
        if self.basic.name.trim().is_empty() {
            "No Name"
        } else {
            &self.basic.name
        }
    }
}
