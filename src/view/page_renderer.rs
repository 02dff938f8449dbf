use std::fs;
use std::path::{Path, PathBuf};

use ramhorns::Template;

use crate::error::{DraftError, DraftResult};
use crate::post_record::PostRecord;
use crate::util::fs_helper::write_atomic;

#[derive(ramhorns::Content)]
struct ViewTag<'a> {
    name: &'a str,
}

#[derive(ramhorns::Content)]
struct PageView<'a> {
    slug: &'a str,
    title: &'a str,
    description: &'a str,
    author: &'a str,
    date: &'a str,
    tags: Vec<ViewTag<'a>>,
    canonical_url: &'a str,
    featured_image_url: &'a str,
    site_name: &'a str,
    content: &'a str,
}

/// Site-level values every page needs.
#[derive(Debug, Clone, Default)]
pub struct SiteInfo {
    pub site_url: String,
    pub site_name: String,
    pub pages_url_root: String,
}

impl SiteInfo {
    fn absolute(&self, path: &str) -> String {
        if path.contains("://") {
            return path.to_string();
        }
        format!("{}/{}", self.site_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    pub fn canonical_url(&self, slug: &str) -> String {
        let root = self.pages_url_root.trim_matches('/');
        if root.is_empty() {
            self.absolute(&format!("{}/", slug))
        } else {
            self.absolute(&format!("{}/{}/", root, slug))
        }
    }
}

pub struct PageRenderer<'a> {
    pub template: Template<'a>,
    pub site: SiteInfo,
}

impl<'a> PageRenderer<'a> {
    pub fn new(page_tpl_src: &'a str, site: SiteInfo) -> DraftResult<PageRenderer<'a>> {
        let template = Template::new(page_tpl_src)
            .map_err(|e| DraftError::RenderFailed(format!("Error parsing page template: {}", e)))?;
        Ok(PageRenderer { template, site })
    }

    pub fn render(&self, record: &PostRecord) -> String {
        let tags: Vec<ViewTag> = record.tags.iter().map(|t| ViewTag { name: t.as_str() }).collect();
        let canonical_url = self.site.canonical_url(&record.slug);
        let featured_image_url = self.site.absolute(&record.featured_image);
        let content = record.content.to_html();

        self.template.render(&PageView {
            slug: &record.slug,
            title: &record.title,
            description: &record.short_description,
            author: &record.author,
            date: &record.date,
            tags,
            canonical_url: &canonical_url,
            featured_image_url: &featured_image_url,
            site_name: &self.site.site_name,
            content: &content,
        })
    }

    /// Writes `<pages_dir>/<slug>/index.html`.
    pub fn page_path(pages_dir: &Path, slug: &str) -> PathBuf {
        pages_dir.join(slug).join("index.html")
    }

    pub fn write_page(&self, record: &PostRecord, pages_dir: &Path) -> DraftResult<PathBuf> {
        let path = Self::page_path(pages_dir, &record.slug);
        let page_dir = pages_dir.join(&record.slug);
        fs::create_dir_all(&page_dir).map_err(|e| DraftError::io(&page_dir, e))?;

        write_atomic(&path, self.render(record).as_bytes())
            .map_err(|cause| DraftError::RecordWriteFailed { path: path.clone(), cause })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::content::{ContentBlock, PostContent};
    use crate::test_data::PAGE_TEMPLATE;

    fn site() -> SiteInfo {
        SiteInfo {
            site_url: "https://example.com/".to_string(),
            site_name: "Example".to_string(),
            pages_url_root: "/blog".to_string(),
        }
    }

    fn record(title: &str) -> PostRecord {
        PostRecord {
            id: "my-post".to_string(),
            slug: "my-post".to_string(),
            title: title.to_string(),
            date: "2025-05-01".to_string(),
            author: "Jane".to_string(),
            tags: vec!["rust".to_string(), "<b>".to_string()],
            short_description: "A \"quoted\" post".to_string(),
            featured_image: "/images/blog/my-post/my-post-featured.png".to_string(),
            content: PostContent::Blocks(vec![ContentBlock::Text { content: "<p>Body</p>".to_string() }]),
            featured: false,
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn test_urls() {
        let site = site();
        assert_eq!(site.canonical_url("my-post"), "https://example.com/blog/my-post/");
        assert_eq!(site.absolute("/images/blog/a.png"), "https://example.com/images/blog/a.png");
        assert_eq!(site.absolute("https://cdn.example.com/a.png"), "https://cdn.example.com/a.png");
    }

    #[test]
    fn test_render_page() {
        let renderer = PageRenderer::new(PAGE_TEMPLATE, site()).unwrap();
        let page = renderer.render(&record("Hello"));
        assert!(page.contains("<title>Hello | Example</title>"));
        assert!(page.contains(r#"<link rel="canonical" href="https://example.com/blog/my-post/">"#));
        assert!(page.contains(r#"content="https://example.com/images/blog/my-post/my-post-featured.png""#));
        assert!(page.contains(r#"<div class="blog-text-block"><p>Body</p></div>"#));
        assert!(page.contains(r#"<span class="tag">&lt;b&gt;</span>"#));
    }

    #[test]
    fn test_title_is_escaped() {
        let renderer = PageRenderer::new(PAGE_TEMPLATE, site()).unwrap();
        let page = renderer.render(&record("<script>alert(1)</script>"));
        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[test]
    fn test_write_page() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = PageRenderer::new(PAGE_TEMPLATE, site()).unwrap();
        let path = renderer.write_page(&record("Hello"), dir.path()).unwrap();
        assert_eq!(path, dir.path().join("my-post").join("index.html"));
        assert!(fs::read_to_string(path).unwrap().contains("<h1>Hello</h1>"));
    }
}
