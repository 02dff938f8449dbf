use std::collections::HashMap;

use markdown::mdast::{AlignKind, Node};
use spdlog::warn;

use crate::text_utils::{basename, extension_of};

pub const SUPPORTED_IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}

pub fn is_supported_image(file_name: &str) -> bool {
    extension_of(file_name)
        .map(|ext| SUPPORTED_IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Anything that cannot be found in the intake directory: remote URLs,
/// protocol-relative URLs, data URIs and absolute site paths.
pub fn is_external_reference(src: &str) -> bool {
    let lower = src.trim().to_ascii_lowercase();
    lower.contains("://") || lower.starts_with("//") || lower.starts_with("data:") || lower.starts_with('/')
}

/// Where a rendered image reference points.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageTarget {
    /// Left untouched.
    External(String),
    /// Rewritten to the published per-slug location.
    Published(String),
    /// Relative reference with an extension we do not publish.
    Unsupported(String),
}

/// Everything the writer needs to know about the post being rendered.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub slug: String,
    pub images_url_root: String,
}

impl RenderContext {
    pub fn new(slug: &str, images_url_root: &str) -> RenderContext {
        let root = images_url_root.trim_matches('/');
        RenderContext {
            slug: slug.to_string(),
            images_url_root: format!("/{}", root),
        }
    }

    pub fn published_image_path(&self, file_name: &str) -> String {
        format!("{}/{}/{}", self.images_url_root.trim_end_matches('/'), self.slug, file_name)
    }

    pub fn image_target(&self, src: &str) -> ImageTarget {
        let src = src.trim();
        if is_external_reference(src) {
            return ImageTarget::External(src.to_string());
        }

        let file_name = basename(src);
        if is_supported_image(file_name) {
            ImageTarget::Published(self.published_image_path(file_name))
        } else {
            ImageTarget::Unsupported(file_name.to_string())
        }
    }
}

pub fn unsupported_image_placeholder(file_name: &str, alt: &str) -> String {
    format!(
        r#"<span class="image-unsupported" title="unsupported image format">[unsupported image: {}{}]</span>"#,
        escape_html(file_name),
        if alt.is_empty() { String::new() } else { format!(" - {}", escape_html(alt)) },
    )
}

/// Target of a `[label]: url "title"` definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub url: String,
    pub title: Option<String>,
}

/// Link and image definitions of one document, by lowercased identifier.
#[derive(Debug, Default)]
pub struct Definitions {
    by_id: HashMap<String, Definition>,
}

impl Definitions {
    pub fn from_tree(tree: &Node) -> Definitions {
        let mut defs = Definitions::default();
        defs.collect(tree);
        defs
    }

    fn collect(&mut self, node: &Node) {
        if let Node::Definition(def) = node {
            // The first definition of a label wins
            self.by_id.entry(def.identifier.to_lowercase()).or_insert_with(|| Definition {
                url: def.url.clone(),
                title: def.title.clone(),
            });
        }
        if let Some(children) = node.children() {
            for child in children {
                self.collect(child);
            }
        }
    }

    pub fn get(&self, identifier: &str) -> Option<&Definition> {
        self.by_id.get(&identifier.to_lowercase())
    }
}

/// An inline or reference-style image with its definition resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSource<'n> {
    pub url: &'n str,
    pub alt: &'n str,
    pub title: Option<&'n str>,
}

pub fn image_source<'n>(node: &'n Node, defs: &'n Definitions) -> Option<ImageSource<'n>> {
    match node {
        Node::Image(img) => Some(ImageSource {
            url: &img.url,
            alt: &img.alt,
            title: img.title.as_deref(),
        }),
        Node::ImageReference(img) => defs.get(&img.identifier).map(|def| ImageSource {
            url: &def.url,
            alt: &img.alt,
            title: def.title.as_deref(),
        }),
        _ => None,
    }
}

/// Writes mdast nodes as HTML. Every text value goes through `escape_html`.
pub struct HtmlWriter<'a> {
    ctx: &'a RenderContext,
    defs: &'a Definitions,
    buf: String,
    tight_list: Vec<bool>,
}

impl<'a> HtmlWriter<'a> {
    pub fn new(ctx: &'a RenderContext, defs: &'a Definitions) -> HtmlWriter<'a> {
        HtmlWriter {
            ctx,
            defs,
            buf: String::new(),
            tight_list: vec![],
        }
    }

    pub fn finish(self) -> String {
        self.buf
    }

    /// Top-level entry; children of the root are separated by newlines.
    pub fn write_root(&mut self, node: &Node) {
        match node {
            Node::Root(root) => {
                for child in &root.children {
                    let before = self.buf.len();
                    if before > 0 {
                        self.buf.push('\n');
                    }
                    self.write_node(child);
                    if self.buf.len() == before + 1 {
                        self.buf.truncate(before);
                    }
                }
            }
            other => self.write_node(other),
        }
    }

    pub fn write_node(&mut self, node: &Node) {
        match node {
            Node::Root(_) => self.write_root(node),
            Node::Heading(heading) => {
                let depth = heading.depth.clamp(1, 6);
                self.buf.push_str(&format!("<h{}>", depth));
                self.write_children(&heading.children);
                self.buf.push_str(&format!("</h{}>", depth));
            }
            Node::Paragraph(para) => {
                let in_tight_list = self.tight_list.last().copied().unwrap_or(false);
                if !in_tight_list {
                    self.buf.push_str("<p>");
                }
                self.write_children(&para.children);
                if !in_tight_list {
                    self.buf.push_str("</p>");
                }
            }
            Node::Text(text) => self.buf.push_str(&escape_html(&text.value)),
            Node::Strong(strong) => self.write_wrapped("strong", &strong.children),
            Node::Emphasis(em) => self.write_wrapped("em", &em.children),
            Node::Delete(del) => self.write_wrapped("del", &del.children),
            Node::InlineCode(code) => {
                self.buf.push_str("<code>");
                self.buf.push_str(&escape_html(&code.value));
                self.buf.push_str("</code>");
            }
            Node::Break(_) => self.buf.push_str("<br />"),
            Node::ThematicBreak(_) => self.buf.push_str("<hr />"),
            Node::Link(link) => self.write_link(&link.url, link.title.as_deref(), &link.children),
            Node::LinkReference(link) => {
                let defs = self.defs;
                match defs.get(&link.identifier) {
                    Some(def) => self.write_link(&def.url, def.title.as_deref(), &link.children),
                    None => self.write_children(&link.children),
                }
            }
            Node::Image(_) | Node::ImageReference(_) => match image_source(node, self.defs) {
                Some(img) => self.write_image(img.url, img.alt, img.title),
                None => {
                    if let Node::ImageReference(img) = node {
                        self.buf.push_str(&escape_html(&img.alt));
                    }
                }
            },
            Node::List(list) => {
                let tag = if list.ordered { "ol" } else { "ul" };
                match list.start {
                    Some(start) if list.ordered && start != 1 => self.buf.push_str(&format!(r#"<ol start="{}">"#, start)),
                    _ => self.buf.push_str(&format!("<{}>", tag)),
                }
                self.tight_list.push(!list.spread);
                for child in &list.children {
                    self.write_node(child);
                }
                self.tight_list.pop();
                self.buf.push_str(&format!("</{}>", tag));
            }
            Node::ListItem(item) => {
                self.buf.push_str("<li>");
                if let Some(checked) = item.checked {
                    let checked = if checked { " checked" } else { "" };
                    self.buf.push_str(&format!(r#"<input type="checkbox" disabled{} /> "#, checked));
                }
                self.write_children(&item.children);
                self.buf.push_str("</li>");
            }
            Node::Blockquote(quote) => {
                self.buf.push_str("<blockquote>");
                self.tight_list.push(false);
                self.write_children(&quote.children);
                self.tight_list.pop();
                self.buf.push_str("</blockquote>");
            }
            Node::Code(code) => {
                match code.lang.as_deref() {
                    Some(lang) => self.buf.push_str(&format!(r#"<pre><code class="language-{}">"#, escape_html(lang))),
                    None => self.buf.push_str("<pre><code>"),
                }
                self.buf.push_str(&escape_html(&code.value));
                self.buf.push_str("</code></pre>");
            }
            Node::Table(table) => {
                self.buf.push_str("<table>");
                if let Some(Node::TableRow(row)) = table.children.first() {
                    self.buf.push_str("<thead>");
                    self.write_table_row(&row.children, "th", &table.align);
                    self.buf.push_str("</thead>");
                }
                if table.children.len() > 1 {
                    self.buf.push_str("<tbody>");
                    for row in table.children.iter().skip(1) {
                        if let Node::TableRow(row) = row {
                            self.write_table_row(&row.children, "td", &table.align);
                        }
                    }
                    self.buf.push_str("</tbody>");
                }
                self.buf.push_str("</table>");
            }
            Node::Html(html) => {
                // Comments such as <!-- more --> carry no content.
                if !html.value.trim_start().starts_with("<!--") {
                    self.buf.push_str(&escape_html(&html.value));
                }
            }
            Node::Definition(_) => {}
            other => {
                if let Some(children) = other.children() {
                    self.write_children(children);
                }
            }
        }
    }

    fn write_children(&mut self, children: &[Node]) {
        for child in children {
            self.write_node(child);
        }
    }

    fn write_wrapped(&mut self, tag: &str, children: &[Node]) {
        self.buf.push_str(&format!("<{}>", tag));
        self.write_children(children);
        self.buf.push_str(&format!("</{}>", tag));
    }

    fn write_table_row(&mut self, cells: &[Node], tag: &str, aligns: &[AlignKind]) {
        self.buf.push_str("<tr>");
        for (i, cell) in cells.iter().enumerate() {
            if let Node::TableCell(cell) = cell {
                let align = match aligns.get(i) {
                    Some(AlignKind::Left) => r#" align="left""#,
                    Some(AlignKind::Right) => r#" align="right""#,
                    Some(AlignKind::Center) => r#" align="center""#,
                    _ => "",
                };
                self.buf.push_str(&format!("<{}{}>", tag, align));
                self.write_children(&cell.children);
                self.buf.push_str(&format!("</{}>", tag));
            }
        }
        self.buf.push_str("</tr>");
    }

    fn write_link(&mut self, url: &str, title: Option<&str>, children: &[Node]) {
        self.buf.push_str(r#"<a href=""#);
        self.buf.push_str(&escape_html(&safe_url(url)));
        self.buf.push('"');
        if let Some(title) = title {
            self.buf.push_str(r#" title=""#);
            self.buf.push_str(&escape_html(title));
            self.buf.push('"');
        }
        self.buf.push('>');
        self.write_children(children);
        self.buf.push_str("</a>");
    }

    fn write_image(&mut self, src: &str, alt: &str, title: Option<&str>) {
        let src = match self.ctx.image_target(src) {
            ImageTarget::External(src) | ImageTarget::Published(src) => src,
            ImageTarget::Unsupported(file_name) => {
                warn!("Unsupported image format in post {}: {}", self.ctx.slug, file_name);
                self.buf.push_str(&unsupported_image_placeholder(&file_name, alt));
                return;
            }
        };

        self.buf.push_str(r#"<img src=""#);
        self.buf.push_str(&escape_html(&src));
        self.buf.push_str(r#"" alt=""#);
        self.buf.push_str(&escape_html(alt));
        self.buf.push('"');
        if let Some(title) = title {
            self.buf.push_str(r#" title=""#);
            self.buf.push_str(&escape_html(title));
            self.buf.push('"');
        }
        self.buf.push_str(" />");
    }
}

fn safe_url(url: &str) -> String {
    let lower = url.trim().to_ascii_lowercase();
    if lower.starts_with("javascript:") || lower.starts_with("vbscript:") {
        "#".to_string()
    } else {
        url.to_string()
    }
}

pub fn plain_text(nodes: &[Node]) -> String {
    let mut buf = String::new();
    collect_text(nodes, &mut buf);
    buf
}

fn collect_text(nodes: &[Node], buf: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => buf.push_str(&text.value),
            Node::InlineCode(code) => buf.push_str(&code.value),
            Node::Break(_) => buf.push('\n'),
            Node::Paragraph(para) => {
                if !buf.is_empty() {
                    buf.push('\n');
                }
                collect_text(&para.children, buf);
            }
            other => {
                if let Some(children) = other.children() {
                    collect_text(children, buf);
                }
            }
        }
    }
}
