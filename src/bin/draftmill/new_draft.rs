use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;

use draftmill::text_utils::{format_date, slug_from_title};

fn yaml_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

pub(crate) fn render_draft(slug: &str, title: &str, author: &str, date: &NaiveDate) -> String {
    let mut buf = String::new();

    let _ = writeln!(&mut buf, "---");
    let _ = writeln!(&mut buf, "title: {}", yaml_quote(title));
    let _ = writeln!(&mut buf, "date: {}", format_date(date));
    let _ = writeln!(&mut buf, "author: {}", yaml_quote(author));
    let _ = writeln!(&mut buf, "tags: []");
    let _ = writeln!(&mut buf, "shortDescription: \"\"");
    let _ = writeln!(&mut buf, "featuredImage: {}-featured.png", slug);
    let _ = writeln!(&mut buf, "featured: false");
    let _ = writeln!(&mut buf, "---");
    let _ = writeln!(&mut buf);
    let _ = writeln!(&mut buf, "Write the post here.");
    let _ = writeln!(&mut buf);
    let _ = writeln!(&mut buf, "<!-- Put {}-featured.png (or .jpg, .gif, .webp) and every image you reference next to this file -->", slug);

    buf
}

/// Writes `<intake_dir>/<slug>.md`. Never overwrites an existing draft.
pub(crate) fn create_draft(intake_dir: &Path, title: &str, author: &str, date: &NaiveDate) -> Result<PathBuf> {
    let slug = slug_from_title(title);
    if slug.is_empty() {
        bail!("Cannot derive a file name from title '{}'", title);
    }

    let path = intake_dir.join(format!("{}.md", slug));
    if path.exists() {
        bail!("Draft {} already exists", path.display());
    }

    fs::create_dir_all(intake_dir).with_context(|| format!("Creating {}", intake_dir.display()))?;
    fs::write(&path, render_draft(&slug, title, author, date)).with_context(|| format!("Writing {}", path.display()))?;
    Ok(path)
}
