use std::str::Lines;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{DraftError, DraftResult};

pub const FENCE: &str = "---";
pub const METADATA_SECTION: &str = "## Metadata";
pub const SHORT_DESCRIPTION_SECTION: &str = "## Short Description";
pub const CONTENT_SECTION: &str = "## Content";

pub fn strip_bom(input: &str) -> &str {
    input.strip_prefix('\u{feff}').unwrap_or(input)
}

pub fn first_non_blank_line(lines: Lines) -> Option<&str> {
    lines.map(str::trim).find(|line| !line.is_empty())
}

/// Splits `---\n<yaml>\n---\n<body>`. `Ok(None)` when the text does not open with a fence.
pub fn split_delimited(content: &str) -> DraftResult<Option<(&str, &str)>> {
    let content = strip_bom(content);
    let mut offset = 0usize;
    let mut yaml_start = None;

    for line in content.split_inclusive('\n') {
        let next_offset = offset + line.len();
        let trimmed = line.trim();

        match yaml_start {
            None => {
                if trimmed.is_empty() {
                    offset = next_offset;
                    continue;
                }
                if trimmed != FENCE {
                    return Ok(None);
                }
                yaml_start = Some(next_offset);
            }
            Some(start) => {
                if trimmed == FENCE {
                    let yaml = &content[start..offset];
                    let body = &content[next_offset..];
                    return Ok(Some((yaml, body)));
                }
            }
        }
        offset = next_offset;
    }

    match yaml_start {
        Some(_) => Err(DraftError::MalformedFrontMatter("closing '---' fence is missing".to_string())),
        None => Ok(None),
    }
}

/// The three parts of a section-based draft, plus the optional `# Title` line above them.
pub struct Sections<'a> {
    pub title: Option<&'a str>,
    pub metadata: Vec<&'a str>,
    pub short_description: Vec<&'a str>,
    pub content: Vec<&'a str>,
}

fn section_kind(line: &str) -> Option<usize> {
    let line = line.trim();
    [METADATA_SECTION, SHORT_DESCRIPTION_SECTION, CONTENT_SECTION]
        .iter()
        .position(|section| line.eq_ignore_ascii_case(section))
}

pub fn split_sections(content: &str) -> DraftResult<Sections> {
    let content = strip_bom(content);
    let lines: Vec<&str> = content.lines().collect();

    // Position of the first occurrence of each header
    let mut positions: [Option<usize>; 3] = [None; 3];
    for (i, line) in lines.iter().enumerate() {
        if let Some(kind) = section_kind(line) {
            if positions[kind].is_none() {
                positions[kind] = Some(i);
            }
        }
    }

    let names = [METADATA_SECTION, SHORT_DESCRIPTION_SECTION, CONTENT_SECTION];
    let missing: Vec<String> = positions
        .iter()
        .zip(names.iter())
        .filter(|(pos, _)| pos.is_none())
        .map(|(_, name)| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(DraftError::MissingRequiredSections(missing));
    }

    let (Some(meta), Some(desc), Some(body)) = (positions[0], positions[1], positions[2]) else {
        return Err(DraftError::MissingRequiredSections(names.iter().map(|n| n.to_string()).collect()));
    };
    if !(meta < desc && desc < body) {
        return Err(DraftError::MissingRequiredSections(vec![
            format!("{}, {}, {} in that order", METADATA_SECTION, SHORT_DESCRIPTION_SECTION, CONTENT_SECTION),
        ]));
    }

    let title = lines[..meta]
        .iter()
        .map(|line| line.trim())
        .find_map(|line| line.strip_prefix("# ").map(str::trim));

    Ok(Sections {
        title,
        metadata: lines[meta + 1..desc].to_vec(),
        short_description: lines[desc + 1..body].to_vec(),
        content: lines[body + 1..].to_vec(),
    })
}

/// `- key: value` lines of the section-based format.
pub fn extract_metadata_line(line: &str) -> Option<(&str, &str)> {
    lazy_static! {
        static ref METADATA_LINE: Regex = Regex::new(r"^\s*[-*]\s+(?P<key>[^:]+):\s*(?P<value>.*)$").unwrap();
    }

    METADATA_LINE.captures(line).and_then(|cap| {
        let key = cap.name("key").map(|key| key.as_str().trim());
        let val = cap.name("value").map(|val| val.as_str().trim());
        match (key, val) {
            (Some(key), Some(val)) if !key.is_empty() => Some((key, val)),
            _ => None,
        }
    })
}
