use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::Value;
use spdlog::{debug, warn};

use crate::content::parsing_utils::{extract_metadata_line, first_non_blank_line, split_delimited, split_sections, strip_bom, FENCE};
use crate::error::{DraftError, DraftResult};
use crate::text_utils::{normalize_key, parse_post_date};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// YAML between `---` fences.
    Delimited,
    /// `## Metadata`, `## Short Description` and `## Content` headers.
    SectionBased,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrontMatter {
    pub title: String,
    pub date: NaiveDate,
    pub author: String,
    pub tags: Vec<String>,
    pub short_description: String,
    pub featured_image: Option<String>,
    pub featured: bool,
    /// Unrecognised keys, original spelling.
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDraft {
    pub dialect: Dialect,
    pub front_matter: FrontMatter,
    pub body: String,
}

pub struct FrontMatterParser {}

impl FrontMatterParser {
    pub fn detect_dialect(text: &str) -> Dialect {
        match first_non_blank_line(strip_bom(text).lines()) {
            Some(FENCE) => Dialect::Delimited,
            _ => Dialect::SectionBased,
        }
    }

    pub fn parse(text: &str) -> DraftResult<ParsedDraft> {
        let dialect = Self::detect_dialect(text);
        debug!("Parsing draft as {:?}", dialect);
        match dialect {
            Dialect::Delimited => Self::parse_delimited(text),
            Dialect::SectionBased => Self::parse_sections(text),
        }
    }

    fn parse_delimited(text: &str) -> DraftResult<ParsedDraft> {
        let Some((yaml, body)) = split_delimited(text)? else {
            return Err(DraftError::MissingFrontMatter);
        };

        let entries = if yaml.trim().is_empty() {
            vec![]
        } else {
            let value: Value = serde_yaml::from_str(yaml)
                .map_err(|e| DraftError::MalformedFrontMatter(e.to_string()))?;
            match value {
                Value::Object(map) => map.into_iter().collect(),
                Value::Null => vec![],
                _ => return Err(DraftError::MalformedFrontMatter("front matter is not a key/value mapping".to_string())),
            }
        };

        Ok(ParsedDraft {
            dialect: Dialect::Delimited,
            front_matter: FrontMatter::from_entries(entries, None)?,
            body: body.trim().to_string(),
        })
    }

    fn parse_sections(text: &str) -> DraftResult<ParsedDraft> {
        let sections = split_sections(text)?;

        let mut entries: Vec<(String, Value)> = vec![];
        for line in &sections.metadata {
            if line.trim().is_empty() {
                continue;
            }
            match extract_metadata_line(line) {
                Some((key, value)) => entries.push((key.to_string(), Value::String(value.to_string()))),
                None => warn!("Ignoring metadata line that is not '- key: value': {}", line.trim()),
            }
        }

        let short_description = sections
            .short_description
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        entries.push(("shortDescription".to_string(), Value::String(short_description)));

        let body = sections.content.join("\n");
        Ok(ParsedDraft {
            dialect: Dialect::SectionBased,
            front_matter: FrontMatter::from_entries(entries, sections.title)?,
            body: body.trim().to_string(),
        })
    }
}

#[derive(Default)]
struct KnownFields {
    title: Option<Value>,
    date: Option<Value>,
    author: Option<Value>,
    tags: Option<Value>,
    short_description: Option<Value>,
    description: Option<(String, Value)>,
    featured_image: Option<Value>,
    featured: Option<Value>,
}

impl FrontMatter {
    /// Builds front matter from raw key/value pairs, matching keys after normalisation.
    /// `heading_title` is used when no `title` key exists.
    pub fn from_entries(entries: Vec<(String, Value)>, heading_title: Option<&str>) -> DraftResult<FrontMatter> {
        let mut known = KnownFields::default();
        let mut extra = BTreeMap::new();

        for (key, value) in entries {
            let slot = match normalize_key(&key).as_str() {
                "title" => &mut known.title,
                "date" => &mut known.date,
                "author" => &mut known.author,
                "tags" => &mut known.tags,
                "shortdescription" => &mut known.short_description,
                "featuredimage" => &mut known.featured_image,
                "featured" => &mut known.featured,
                "description" if known.description.is_none() => {
                    known.description = Some((key, value));
                    continue;
                }
                _ => {
                    extra.insert(key, value);
                    continue;
                }
            };
            if slot.is_some() {
                warn!("Duplicate front matter key '{}', keeping the first value", key);
                continue;
            }
            *slot = Some(value);
        }

        // `description` only stands in for a missing shortDescription
        let short_description = match (known.short_description.as_ref().and_then(scalar_string), known.description) {
            (Some(desc), Some((key, value))) => {
                extra.insert(key, value);
                Some(desc)
            }
            (Some(desc), None) => Some(desc),
            (None, Some((_, value))) => scalar_string(&value),
            (None, None) => None,
        };

        let title = known
            .title
            .as_ref()
            .and_then(scalar_string)
            .or_else(|| heading_title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()));
        let date = known.date.as_ref().and_then(scalar_string);
        let author = known.author.as_ref().and_then(scalar_string);
        let tags = known.tags.as_ref().map(parse_tags).unwrap_or_default();

        let mut missing = vec![];
        if title.is_none() {
            missing.push("title");
        }
        if date.is_none() {
            missing.push("date");
        }
        if author.is_none() {
            missing.push("author");
        }
        if tags.is_empty() {
            missing.push("tags");
        }
        if short_description.is_none() {
            missing.push("shortDescription");
        }

        let (Some(title), Some(date), Some(author), Some(short_description)) = (title, date, author, short_description) else {
            return Err(DraftError::MissingRequiredFields(missing.iter().map(|s| s.to_string()).collect()));
        };
        if !missing.is_empty() {
            return Err(DraftError::MissingRequiredFields(missing.iter().map(|s| s.to_string()).collect()));
        }

        Ok(FrontMatter {
            title,
            date: parse_post_date(&date)?,
            author,
            tags,
            short_description,
            featured_image: known.featured_image.as_ref().and_then(scalar_string),
            featured: known.featured.as_ref().map(parse_featured).unwrap_or(false),
            extra,
        })
    }
}

/// Non-empty trimmed string form of a scalar value.
fn scalar_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn parse_tags(value: &Value) -> Vec<String> {
    let raw: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(scalar_string).collect(),
        Value::String(s) => s.split(',').map(|t| t.to_string()).collect(),
        other => scalar_string(other).into_iter().collect(),
    };

    let mut tags: Vec<String> = vec![];
    for tag in raw {
        let tag = tag.trim();
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

fn parse_featured(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::String(s) if s.trim().eq_ignore_ascii_case("true") => true,
        Value::String(s) if s.trim().eq_ignore_ascii_case("false") => false,
        other => {
            warn!("Invalid value for 'featured': {}, using false", other);
            false
        }
    }
}
