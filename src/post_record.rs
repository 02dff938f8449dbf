use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::front_matter::FrontMatter;
use crate::content::html_writer::RenderContext;
use crate::content::PostContent;
use crate::error::{DraftError, DraftResult};
use crate::text_utils::{format_date, parse_post_date};
use crate::util::fs_helper::write_atomic;

/// The published form of a post, one JSON file per slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub date: String,
    pub author: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub short_description: String,
    pub featured_image: String,
    pub content: PostContent,
    #[serde(default)]
    pub featured: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

/// Listing projection of a post record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub slug: String,
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub featured_image: String,
    #[serde(default)]
    pub featured: bool,
}

impl From<&PostRecord> for IndexEntry {
    fn from(record: &PostRecord) -> Self {
        IndexEntry {
            slug: record.slug.clone(),
            title: record.title.clone(),
            date: record.date.clone(),
            tags: record.tags.clone(),
            short_description: record.short_description.clone(),
            featured_image: record.featured_image.clone(),
            featured: record.featured,
        }
    }
}

pub struct PostRecordBuilder {}

impl PostRecordBuilder {
    pub fn build(ctx: &RenderContext, front_matter: FrontMatter, content: PostContent, featured_file: &str) -> PostRecord {
        PostRecord {
            id: ctx.slug.clone(),
            slug: ctx.slug.clone(),
            title: front_matter.title,
            date: format_date(&front_matter.date),
            author: front_matter.author,
            tags: front_matter.tags,
            short_description: front_matter.short_description,
            featured_image: ctx.published_image_path(featured_file),
            content,
            featured: front_matter.featured,
            extra: front_matter.extra,
        }
    }
}

impl PostRecord {
    pub fn record_path(records_dir: &Path, slug: &str) -> PathBuf {
        records_dir.join(format!("{}.json", slug))
    }

    /// Problems with a record read back from disk; empty when it is consistent.
    pub fn validate(&self, expected_slug: &str) -> Vec<String> {
        let mut reasons = vec![];
        if self.id != self.slug {
            reasons.push(format!("id '{}' does not match slug '{}'", self.id, self.slug));
        }
        if self.slug != expected_slug {
            reasons.push(format!("slug '{}' does not match file name '{}'", self.slug, expected_slug));
        }
        if parse_post_date(&self.date).map(|d| format_date(&d) != self.date).unwrap_or(true) {
            reasons.push(format!("date '{}' is not YYYY-MM-DD", self.date));
        }
        for (name, value) in [("title", &self.title), ("author", &self.author), ("shortDescription", &self.short_description)] {
            if value.trim().is_empty() {
                reasons.push(format!("{} is empty", name));
            }
        }
        if self.tags.is_empty() {
            reasons.push("tags is empty".to_string());
        }
        reasons
    }

    /// Reads and validates `<records_dir>/<slug>.json`, the slug being the file stem.
    pub fn read(path: &Path) -> DraftResult<PostRecord> {
        let text = fs::read_to_string(path).map_err(|e| DraftError::io(path, e))?;
        let record: PostRecord = serde_json::from_str(&text).map_err(|e| DraftError::RecordInvalid {
            path: path.to_path_buf(),
            reasons: vec![e.to_string()],
        })?;

        let expected_slug = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        let reasons = record.validate(expected_slug);
        if !reasons.is_empty() {
            return Err(DraftError::RecordInvalid { path: path.to_path_buf(), reasons });
        }

        Ok(PostRecord {
            content: record.content.without_unknown(),
            ..record
        })
    }

    pub fn to_json(&self) -> DraftResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| DraftError::RenderFailed(e.to_string()))
    }

    pub fn write(&self, path: &Path) -> DraftResult<()> {
        let json = self.to_json()?;
        write_atomic(path, json.as_bytes()).map_err(|cause| DraftError::RecordWriteFailed {
            path: path.to_path_buf(),
            cause,
        })
    }
}
