use markdown::mdast::Node;
use markdown::ParseOptions;
use spdlog::{debug, warn};

use crate::content::html_writer::{
    image_source, is_external_reference, plain_text, unsupported_image_placeholder, Definitions, HtmlWriter, ImageSource,
    ImageTarget, RenderContext,
};
use crate::content::{default_language, ContentBlock, ImagePosition, ImageSize, PostContent};
use crate::error::{DraftError, DraftResult};
use crate::text_utils::basename;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    #[default]
    Blocks,
    Html,
}

pub struct MarkdownRenderer {}

impl MarkdownRenderer {
    pub fn parse(md_text: &str) -> DraftResult<Node> {
        markdown::to_mdast(md_text, &ParseOptions::gfm())
            .map_err(|e| DraftError::RenderFailed(e.to_string()))
    }

    pub fn render(md_text: &str, ctx: &RenderContext, mode: ContentMode) -> DraftResult<PostContent> {
        let tree = Self::parse(md_text)?;
        let content = match mode {
            ContentMode::Blocks => PostContent::Blocks(Self::blocks_from_tree(&tree, ctx)),
            ContentMode::Html => PostContent::Html(Self::html_from_tree(&tree, ctx)),
        };
        Ok(content)
    }

    pub fn render_html(md_text: &str, ctx: &RenderContext) -> DraftResult<String> {
        let tree = Self::parse(md_text)?;
        Ok(Self::html_from_tree(&tree, ctx))
    }

    pub fn render_blocks(md_text: &str, ctx: &RenderContext) -> DraftResult<Vec<ContentBlock>> {
        let tree = Self::parse(md_text)?;
        Ok(Self::blocks_from_tree(&tree, ctx))
    }

    fn html_from_tree(tree: &Node, ctx: &RenderContext) -> String {
        let defs = Definitions::from_tree(tree);
        let mut writer = HtmlWriter::new(ctx, &defs);
        writer.write_root(tree);
        writer.finish()
    }

    fn blocks_from_tree(tree: &Node, ctx: &RenderContext) -> Vec<ContentBlock> {
        let Some(children) = tree.children() else {
            return vec![];
        };

        let defs = Definitions::from_tree(tree);
        let mut blocks = vec![];
        for node in children {
            if let Some(block) = Self::block_from_node(node, ctx, &defs) {
                blocks.push(block);
            }
        }
        blocks
    }

    fn block_from_node(node: &Node, ctx: &RenderContext, defs: &Definitions) -> Option<ContentBlock> {
        match node {
            Node::Definition(_) => None,
            Node::Html(html) if html.value.trim_start().starts_with("<!--") => None,
            Node::Paragraph(para) => match lone_image(&para.children, defs) {
                Some(img) => Some(Self::image_block(img, ctx)),
                None => Self::text_block(node, ctx, defs),
            },
            Node::Blockquote(quote) => {
                let (content, attribution) = split_attribution(&quote.children);
                Some(ContentBlock::Quote { content, attribution })
            }
            Node::Code(code) => Some(ContentBlock::Code {
                content: code.value.clone(),
                language: code.lang.clone().filter(|l| !l.trim().is_empty()).unwrap_or_else(default_language),
            }),
            other => Self::text_block(other, ctx, defs),
        }
    }

    fn text_block(node: &Node, ctx: &RenderContext, defs: &Definitions) -> Option<ContentBlock> {
        let mut writer = HtmlWriter::new(ctx, defs);
        writer.write_node(node);
        let content = writer.finish();
        if content.is_empty() {
            None
        } else {
            Some(ContentBlock::Text { content })
        }
    }

    fn image_block(img: ImageSource, ctx: &RenderContext) -> ContentBlock {
        let src = match ctx.image_target(img.url) {
            ImageTarget::External(src) | ImageTarget::Published(src) => src,
            ImageTarget::Unsupported(file_name) => {
                warn!("Unsupported image format in post {}: {}", ctx.slug, file_name);
                return ContentBlock::Text {
                    content: format!("<p>{}</p>", unsupported_image_placeholder(&file_name, img.alt)),
                };
            }
        };

        let (caption, size, position) = parse_image_title(img.title);
        ContentBlock::Image {
            src,
            alt: img.alt.to_string(),
            caption,
            size,
            position,
        }
    }

    /// Relative image references of a body, by file name, in document order.
    pub fn collect_image_refs(md_text: &str) -> DraftResult<Vec<String>> {
        let tree = Self::parse(md_text)?;
        let defs = Definitions::from_tree(&tree);
        let mut refs = vec![];
        collect_images(&tree, &defs, &mut refs);
        debug!("Found {} local image reference(s)", refs.len());
        Ok(refs)
    }
}

fn collect_images(node: &Node, defs: &Definitions, refs: &mut Vec<String>) {
    if let Some(img) = image_source(node, defs) {
        if !is_external_reference(img.url) {
            let file_name = basename(img.url.trim()).to_string();
            if !file_name.is_empty() && !refs.contains(&file_name) {
                refs.push(file_name);
            }
        }
    }
    if let Some(children) = node.children() {
        for child in children {
            collect_images(child, defs, refs);
        }
    }
}

fn lone_image<'n>(children: &'n [Node], defs: &'n Definitions) -> Option<ImageSource<'n>> {
    let mut found = None;
    for child in children {
        match child {
            Node::Text(text) if text.value.trim().is_empty() => {}
            _ => match image_source(child, defs) {
                Some(img) if found.is_none() => found = Some(img),
                _ => return None,
            },
        }
    }
    found
}

/// `"caption | size | position"`; any part may be omitted.
fn parse_image_title(title: Option<&str>) -> (Option<String>, ImageSize, ImagePosition) {
    let mut caption = None;
    let mut size = ImageSize::default();
    let mut position = ImagePosition::default();

    let Some(title) = title else {
        return (caption, size, position);
    };

    for (i, part) in title.split('|').map(str::trim).enumerate() {
        if part.is_empty() {
            continue;
        }
        if let Some(s) = ImageSize::parse(part) {
            size = s;
        } else if let Some(p) = ImagePosition::parse(part) {
            position = p;
        } else if i == 0 {
            caption = Some(part.to_string());
        }
    }

    (caption, size, position)
}

fn split_attribution(children: &[Node]) -> (String, Option<String>) {
    if let Some((Node::Paragraph(last), rest)) = children.split_last() {
        let last_text = plain_text(&last.children);
        let trimmed = last_text.trim();
        let attribution = trimmed
            .strip_prefix('—')
            .or_else(|| trimmed.strip_prefix("--"))
            .map(|s| s.trim().to_string());
        if let Some(attribution) = attribution {
            if !rest.is_empty() && !attribution.is_empty() {
                return (plain_text(rest).trim().to_string(), Some(attribution));
            }
        }
    }
    (plain_text(children).trim().to_string(), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_data::RENDER_SAMPLE_MD;

    fn ctx() -> RenderContext {
        RenderContext::new("my-post", "/images/blog")
    }

    #[test]
    fn test_image_rewritten_to_published_path() {
        let html = MarkdownRenderer::render_html("![alt](photo.png)", &ctx()).unwrap();
        assert_eq!(html, r#"<p><img src="/images/blog/my-post/photo.png" alt="alt" /></p>"#);
    }

    #[test]
    fn test_external_images_untouched() {
        let html = MarkdownRenderer::render_html("![a](https://example.com/x.png) ![b](/images/site.jpg)", &ctx()).unwrap();
        assert_eq!(html, r#"<p><img src="https://example.com/x.png" alt="a" /> <img src="/images/site.jpg" alt="b" /></p>"#);
    }

    #[test]
    fn test_unsupported_image_placeholder() {
        let html = MarkdownRenderer::render_html("![scan](scan.tiff)", &ctx()).unwrap();
        assert!(html.contains("image-unsupported"));
        assert!(html.contains("[unsupported image: scan.tiff - scan]"));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn test_raw_html_is_escaped() {
        let html = MarkdownRenderer::render_html("Hello <script>alert(1)</script>\n\n<div onclick=\"x\">hi</div>", &ctx()).unwrap();
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<div"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_comments_are_dropped() {
        let html = MarkdownRenderer::render_html("First\n\n<!-- more -->\n\nSecond", &ctx()).unwrap();
        assert_eq!(html, "<p>First</p>\n<p>Second</p>");
    }

    #[test]
    fn test_full_html() {
        let html = MarkdownRenderer::render_html(RENDER_SAMPLE_MD, &ctx()).unwrap();
        assert_eq!(html, concat!(
            "<h1>Hi</h1>\n",
            "<p>Some <strong>bold</strong>, <em>italic</em> and a <a href=\"https://example.com\">link</a>.</p>\n",
            "<ul><li>one</li><li>two</li></ul>\n",
            "<table><thead><tr><th>Name</th><th align=\"right\">Qty</th></tr></thead>",
            "<tbody><tr><td>apples</td><td align=\"right\">3</td></tr></tbody></table>\n",
            "<p><img src=\"/images/blog/my-post/pic.png\" alt=\"x\" title=\"A picture | large\" /></p>\n",
            "<blockquote><p>Be kind.</p><p>— Someone</p></blockquote>\n",
            "<pre><code class=\"language-rust\">let x = 1 &lt; 2;</code></pre>",
        ));
    }

    #[test]
    fn test_blocks() {
        let blocks = MarkdownRenderer::render_blocks(RENDER_SAMPLE_MD, &ctx()).unwrap();
        assert_eq!(blocks.len(), 7);
        assert_eq!(blocks[0], ContentBlock::Text { content: "<h1>Hi</h1>".to_string() });
        assert_eq!(blocks[4], ContentBlock::Image {
            src: "/images/blog/my-post/pic.png".to_string(),
            alt: "x".to_string(),
            caption: Some("A picture".to_string()),
            size: ImageSize::Large,
            position: ImagePosition::Center,
        });
        assert_eq!(blocks[5], ContentBlock::Quote {
            content: "Be kind.".to_string(),
            attribution: Some("Someone".to_string()),
        });
        assert_eq!(blocks[6], ContentBlock::Code {
            content: "let x = 1 < 2;".to_string(),
            language: "rust".to_string(),
        });
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let first = MarkdownRenderer::render(RENDER_SAMPLE_MD, &ctx(), ContentMode::Blocks).unwrap();
        let second = MarkdownRenderer::render(RENDER_SAMPLE_MD, &ctx(), ContentMode::Blocks).unwrap();
        assert_eq!(serde_json::to_string(&first).unwrap(), serde_json::to_string(&second).unwrap());
    }

    #[test]
    fn test_reference_image_rewritten() {
        let html = MarkdownRenderer::render_html("Look: ![chart][c]\n\n[c]: chart.png", &ctx()).unwrap();
        assert_eq!(html, r#"<p>Look: <img src="/images/blog/my-post/chart.png" alt="chart" /></p>"#);
    }

    #[test]
    fn test_reference_link() {
        let html = MarkdownRenderer::render_html("See [docs][d].\n\n[d]: https://example.com/docs \"Docs\"", &ctx()).unwrap();
        assert_eq!(html, r#"<p>See <a href="https://example.com/docs" title="Docs">docs</a>.</p>"#);
    }

    #[test]
    fn test_reference_image_block() {
        let md = "Intro\n\n![Sales][sales]\n\n[sales]: ./img/sales.png \"Quarterly sales | small | left\"";
        let blocks = MarkdownRenderer::render_blocks(md, &ctx()).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1], ContentBlock::Image {
            src: "/images/blog/my-post/sales.png".to_string(),
            alt: "Sales".to_string(),
            caption: Some("Quarterly sales".to_string()),
            size: ImageSize::Small,
            position: ImagePosition::Left,
        });
    }

    #[test]
    fn test_collect_reference_image_refs() {
        let md = "![chart][c] and ![logo]\n\n[c]: chart.png\n[logo]: https://cdn.example.com/logo.png";
        let refs = MarkdownRenderer::collect_image_refs(md).unwrap();
        assert_eq!(refs, vec!["chart.png"]);
    }

    #[test]
    fn test_collect_image_refs() {
        let md = "![a](pic.png)\n\n![b](./nested/other.jpg) ![c](pic.png)\n\n![d](https://x.y/z.png)";
        let refs = MarkdownRenderer::collect_image_refs(md).unwrap();
        assert_eq!(refs, vec!["pic.png", "other.jpg"]);
    }
}
