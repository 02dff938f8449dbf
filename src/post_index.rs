use std::cmp::Ordering;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use spdlog::{error, info, warn};

use crate::error::{DraftError, DraftResult};
use crate::post_record::{IndexEntry, PostRecord};
use crate::text_utils::try_parse_date;
use crate::util::fs_helper::write_atomic;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Descending,
    Ascending,
}

/// The aggregate listing file, `{ "posts": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostIndex {
    #[serde(default)]
    pub posts: Vec<IndexEntry>,
}

/// `/blog/<slug>/` was how the old site stored slugs.
fn normalize_slug(slug: &str) -> String {
    lazy_static! {
        static ref LEGACY_SLUG: Regex = Regex::new(r"^/?blog/(?P<slug>[^/]+)/?$").unwrap();
    }

    let slug = slug.trim();
    match LEGACY_SLUG.captures(slug).and_then(|cap| cap.name("slug")) {
        Some(m) => m.as_str().to_string(),
        None => slug.trim_matches('/').to_string(),
    }
}

impl PostIndex {
    pub fn get(&self, slug: &str) -> Option<&IndexEntry> {
        self.posts.iter().find(|e| e.slug == slug)
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Replaces the entry with the same slug, or appends it, then re-sorts newest first.
    pub fn upsert(&mut self, entry: IndexEntry) {
        match self.posts.iter_mut().find(|e| e.slug == entry.slug) {
            Some(existing) => *existing = entry,
            None => self.posts.push(entry),
        }
        self.sort(SortDirection::Descending);
    }

    /// Stable sort by date. Entries whose date cannot be parsed go last either way.
    pub fn sort(&mut self, direction: SortDirection) {
        self.posts.sort_by(|a, b| {
            match (try_parse_date(&a.date), try_parse_date(&b.date)) {
                (Some(da), Some(db)) => match direction {
                    SortDirection::Descending => db.cmp(&da),
                    SortDirection::Ascending => da.cmp(&db),
                },
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });
    }

    /// Fixes legacy slugs and drops duplicates, keeping the first entry per slug.
    fn normalize(&mut self) {
        let mut posts: Vec<IndexEntry> = Vec::with_capacity(self.posts.len());
        for mut entry in self.posts.drain(..) {
            entry.slug = normalize_slug(&entry.slug);
            if posts.iter().any(|e| e.slug == entry.slug) {
                warn!("Duplicate index entry for {}, keeping the first one", entry.slug);
                continue;
            }
            posts.push(entry);
        }
        self.posts = posts;
    }

    pub fn load(path: &Path) -> DraftResult<PostIndex> {
        let text = fs::read_to_string(path).map_err(|e| DraftError::io(path, e))?;
        let mut index: PostIndex = serde_json::from_str(&text).map_err(|e| DraftError::IndexMalformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        index.normalize();
        Ok(index)
    }

    /// A missing index is a fresh site; a broken one is reported and replaced.
    pub fn load_or_empty(path: &Path) -> PostIndex {
        match Self::load(path) {
            Ok(index) => {
                info!("Loaded {} post(s) from {}", index.len(), path.display());
                index
            }
            Err(DraftError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                info!("No post index at {}, starting empty", path.display());
                PostIndex::default()
            }
            Err(e) => {
                warn!("{}. Starting with an empty index", e);
                PostIndex::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> DraftResult<()> {
        let mut json = serde_json::to_string_pretty(self).map_err(|e| DraftError::RenderFailed(e.to_string()))?;
        json.push('\n');
        write_atomic(path, json.as_bytes()).map_err(|cause| DraftError::RecordWriteFailed {
            path: path.to_path_buf(),
            cause,
        })
    }

    /// Builds a fresh index from every `<slug>.json` in `records_dir`.
    /// Invalid records are logged and skipped; returns the index and the skip count.
    pub fn rebuild_from_records(records_dir: &Path) -> DraftResult<(PostIndex, usize)> {
        let entries = fs::read_dir(records_dir).map_err(|e| DraftError::io(records_dir, e))?;

        let mut files = vec![];
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && path.extension().map(|ext| ext == "json").unwrap_or(false) {
                files.push(path);
            }
        }
        files.sort();

        let mut index = PostIndex::default();
        let mut skipped = 0;
        for file in files {
            match PostRecord::read(&file) {
                Ok(record) => index.posts.push(IndexEntry::from(&record)),
                Err(e) => {
                    error!("Skipping record: {}", e);
                    skipped += 1;
                }
            }
        }
        index.sort(SortDirection::Descending);

        info!("Rebuilt index with {} post(s), {} skipped", index.len(), skipped);
        Ok((index, skipped))
    }
}
