//! Typed content stored by the admin console.
//!
//! Two shapes live in storage:
//!
//! - **Collections**: JSON arrays of independently keyed rows ([`Article`],
//!   [`NewsItem`], [`GalleryImage`]). Each row type implements [`Record`],
//!   which ties it to its storage key, its add-form draft and its typed
//!   patch.
//! - **Section documents**: one JSON object per page section
//!   ([`AboutContent`], [`ServicesContent`], [`TrainersContent`],
//!   [`ArticlesHeader`]), replaced wholesale on save. Each implements
//!   [`SectionDocument`]; its `Default` is the hardcoded fallback content the
//!   site shows until an admin saves something.
//!
//! Field names are camelCase on the wire and every field tolerates being
//! absent, since stored values carry no schema version.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub mod keys {
    pub const ARTICLES: &str = "articles";
    pub const NEWS: &str = "news";
    pub const GALLERY: &str = "gallery";
    pub const ABOUT: &str = "stc-about-data";
    pub const SERVICES: &str = "stc-services-data";
    pub const TRAINERS: &str = "stc-trainers-data";
    pub const ARTICLES_HEADER: &str = "stc-articles-header";
    pub const ADMIN_TOKEN: &str = "adminToken";
}

/// A row of a stored collection.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + 'static {
    /// Storage key of the collection holding this record type.
    const KEY: &'static str;

    /// What the add form submits: every field except `id` and `createdAt`.
    type Draft: DeserializeOwned;

    /// Shallow patch: `Some` fields overwrite, `None` fields are kept.
    type Patch: DeserializeOwned + Default + Clone;

    fn id(&self) -> &str;

    fn from_draft(id: String, created_at: String, draft: Self::Draft) -> Self;

    fn apply_patch(&mut self, patch: Self::Patch);
}

/// A whole-struct page section document.
pub trait SectionDocument: Serialize + DeserializeOwned + Default + Clone + Send + 'static {
    const KEY: &'static str;
}

macro_rules! merge {
    ($target:expr, $patch:expr, [$($field:ident),* $(,)?]) => {
        $(
            if let Some(value) = $patch.$field {
                $target.$field = value;
            }
        )*
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    #[default]
    Published,
    Draft,
}

impl PublishStatus {
    pub fn is_published(self) -> bool {
        self == PublishStatus::Published
    }
}

// ---------------------------------------------------------------------------
// Articles (tips & tricks)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub author: String,
    /// Display-formatted, not normalized.
    #[serde(default)]
    pub date: String,
    /// Minutes.
    #[serde(default)]
    pub read_time: u32,
    #[serde(default)]
    pub status: PublishStatus,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArticleDraft {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub image: String,
    pub author: String,
    pub date: String,
    pub read_time: u32,
    pub status: PublishStatus,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArticlePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_time: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PublishStatus>,
}

impl Record for Article {
    const KEY: &'static str = keys::ARTICLES;
    type Draft = ArticleDraft;
    type Patch = ArticlePatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, created_at: String, draft: ArticleDraft) -> Self {
        Article {
            id,
            title: draft.title,
            excerpt: draft.excerpt,
            content: draft.content,
            category: draft.category,
            tags: draft.tags,
            image: draft.image,
            author: draft.author,
            date: draft.date,
            read_time: draft.read_time,
            status: draft.status,
            created_at,
        }
    }

    fn apply_patch(&mut self, patch: ArticlePatch) {
        merge!(
            self,
            patch,
            [title, excerpt, content, category, tags, image, author, date, read_time, status]
        );
    }
}

// ---------------------------------------------------------------------------
// News
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub status: PublishStatus,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewsDraft {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub image: String,
    pub author: String,
    pub date: String,
    pub status: PublishStatus,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PublishStatus>,
}

impl Record for NewsItem {
    const KEY: &'static str = keys::NEWS;
    type Draft = NewsDraft;
    type Patch = NewsPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, created_at: String, draft: NewsDraft) -> Self {
        NewsItem {
            id,
            title: draft.title,
            excerpt: draft.excerpt,
            content: draft.content,
            category: draft.category,
            tags: draft.tags,
            image: draft.image,
            author: draft.author,
            date: draft.date,
            status: draft.status,
            created_at,
        }
    }

    fn apply_patch(&mut self, patch: NewsPatch) {
        merge!(
            self,
            patch,
            [title, excerpt, content, category, tags, image, author, date, status]
        );
    }
}

// ---------------------------------------------------------------------------
// Gallery
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImage {
    pub id: String,
    /// URI or data-URI.
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default)]
    pub file_name: String,
    /// Bytes.
    #[serde(default)]
    pub file_size: u64,
    /// RFC 3339 timestamp.
    #[serde(default)]
    pub upload_date: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GalleryImageDraft {
    pub src: String,
    pub alt: String,
    pub file_name: String,
    pub file_size: u64,
    /// Left empty, the upload date becomes the creation timestamp.
    pub upload_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GalleryImagePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<String>,
}

impl Record for GalleryImage {
    const KEY: &'static str = keys::GALLERY;
    type Draft = GalleryImageDraft;
    type Patch = GalleryImagePatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, created_at: String, draft: GalleryImageDraft) -> Self {
        GalleryImage {
            id,
            src: draft.src,
            alt: draft.alt,
            file_name: draft.file_name,
            file_size: draft.file_size,
            upload_date: draft.upload_date.unwrap_or_else(|| created_at.clone()),
            created_at,
        }
    }

    fn apply_patch(&mut self, patch: GalleryImagePatch) {
        merge!(self, patch, [src, alt, file_name, file_size, upload_date]);
    }
}

// ---------------------------------------------------------------------------
// Section documents
// ---------------------------------------------------------------------------

/// Inner row of a section document, numbered by the editor forms.
pub trait SectionItem {
    fn item_id(&self) -> u64;
}

/// Next free inner-item id: one past the largest in use.
pub fn next_item_id<T: SectionItem>(items: &[T]) -> u64 {
    items.iter().map(SectionItem::item_id).max().unwrap_or(0) + 1
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatItem {
    pub id: u64,
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureItem {
    pub id: u64,
    pub icon: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AboutContent {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub vision: String,
    pub mission: Vec<String>,
    pub stats: Vec<StatItem>,
    pub features: Vec<FeatureItem>,
}

impl Default for AboutContent {
    fn default() -> Self {
        AboutContent {
            title: "Tentang Kami".to_string(),
            subtitle: "Pusat pelatihan profesional".to_string(),
            description: String::new(),
            vision: String::new(),
            mission: Vec::new(),
            stats: vec![
                StatItem {
                    id: 1,
                    value: "0+".to_string(),
                    label: "Alumni".to_string(),
                },
                StatItem {
                    id: 2,
                    value: "0+".to_string(),
                    label: "Program".to_string(),
                },
            ],
            features: Vec::new(),
        }
    }
}

impl SectionDocument for AboutContent {
    const KEY: &'static str = keys::ABOUT;
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceItem {
    pub id: u64,
    pub icon: String,
    pub title: String,
    pub description: String,
    pub features: Vec<String>,
    pub duration: String,
    pub price: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServicesContent {
    pub title: String,
    pub subtitle: String,
    pub services: Vec<ServiceItem>,
}

impl Default for ServicesContent {
    fn default() -> Self {
        ServicesContent {
            title: "Layanan Kami".to_string(),
            subtitle: "Program pelatihan yang kami tawarkan".to_string(),
            services: Vec::new(),
        }
    }
}

impl SectionDocument for ServicesContent {
    const KEY: &'static str = keys::SERVICES;
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Trainer {
    pub id: u64,
    pub name: String,
    pub role: String,
    pub bio: String,
    pub image: String,
    pub expertise: Vec<String>,
    pub experience: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrainersContent {
    pub title: String,
    pub subtitle: String,
    pub trainers: Vec<Trainer>,
}

impl Default for TrainersContent {
    fn default() -> Self {
        TrainersContent {
            title: "Trainer Kami".to_string(),
            subtitle: "Instruktur berpengalaman di bidangnya".to_string(),
            trainers: Vec::new(),
        }
    }
}

impl SectionDocument for TrainersContent {
    const KEY: &'static str = keys::TRAINERS;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArticlesHeader {
    pub title: String,
    pub subtitle: String,
    pub description: String,
}

impl Default for ArticlesHeader {
    fn default() -> Self {
        ArticlesHeader {
            title: "Tips & Trik".to_string(),
            subtitle: "Artikel dan wawasan dari para trainer".to_string(),
            description: String::new(),
        }
    }
}

impl SectionDocument for ArticlesHeader {
    const KEY: &'static str = keys::ARTICLES_HEADER;
}

impl SectionItem for StatItem {
    fn item_id(&self) -> u64 {
        self.id
    }
}

impl SectionItem for FeatureItem {
    fn item_id(&self) -> u64 {
        self.id
    }
}

impl SectionItem for ServiceItem {
    fn item_id(&self) -> u64 {
        self.id
    }
}

impl SectionItem for Trainer {
    fn item_id(&self) -> u64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn article_uses_camel_case_on_the_wire() {
        let article = Article::from_draft(
            "a1".to_string(),
            "2026-01-01T00:00:00.000Z".to_string(),
            ArticleDraft {
                title: "Teknik Presentasi".to_string(),
                read_time: 5,
                ..Default::default()
            },
        );
        let value = serde_json::to_value(&article).unwrap();
        assert_eq!(value["readTime"], json!(5));
        assert_eq!(value["createdAt"], json!("2026-01-01T00:00:00.000Z"));
        assert_eq!(value["status"], json!("published"));
    }

    #[test]
    fn old_shape_rows_still_parse() {
        let stored = json!([{"id": "1", "title": "Lama", "status": "draft"}]);
        let articles: Vec<Article> = serde_json::from_value(stored).unwrap();
        assert_eq!(articles[0].title, "Lama");
        assert_eq!(articles[0].status, PublishStatus::Draft);
        assert!(articles[0].created_at.is_empty());
    }

    #[test]
    fn patch_only_touches_given_fields() {
        let mut item = NewsItem::from_draft(
            "n1".to_string(),
            "t".to_string(),
            NewsDraft {
                title: "Lama".to_string(),
                author: "Admin".to_string(),
                ..Default::default()
            },
        );
        let patch: NewsPatch = serde_json::from_value(json!({"title": "Baru"})).unwrap();
        item.apply_patch(patch);

        assert_eq!(item.title, "Baru");
        assert_eq!(item.author, "Admin");
    }

    #[test]
    fn gallery_upload_date_defaults_to_creation_time() {
        let image = GalleryImage::from_draft(
            "g1".to_string(),
            "2026-10-18T08:00:00.000Z".to_string(),
            GalleryImageDraft {
                file_name: "kelas.jpg".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(image.upload_date, "2026-10-18T08:00:00.000Z");
    }

    #[test]
    fn next_item_id_is_one_past_max() {
        let stats = vec![
            StatItem { id: 3, ..Default::default() },
            StatItem { id: 7, ..Default::default() },
        ];
        assert_eq!(next_item_id(&stats), 8);
        assert_eq!(next_item_id::<Trainer>(&[]), 1);
    }

    #[test]
    fn partial_section_document_fills_defaults() {
        let about: AboutContent = serde_json::from_value(json!({"title": "Profil"})).unwrap();
        assert_eq!(about.title, "Profil");
        assert_eq!(about.subtitle, AboutContent::default().subtitle);
    }
}
