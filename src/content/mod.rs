use std::fmt::Write;

use serde::{Deserialize, Serialize};

pub mod front_matter;
pub mod html_writer;
pub mod markdown_renderer;
pub mod parsing_utils;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSize {
    Small,
    #[default]
    Medium,
    Large,
    Full,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImagePosition {
    Left,
    #[default]
    Center,
    Right,
}

impl ImageSize {
    pub fn parse(s: &str) -> Option<ImageSize> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Some(ImageSize::Small),
            "medium" => Some(ImageSize::Medium),
            "large" => Some(ImageSize::Large),
            "full" => Some(ImageSize::Full),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Small => "small",
            ImageSize::Medium => "medium",
            ImageSize::Large => "large",
            ImageSize::Full => "full",
        }
    }
}

impl ImagePosition {
    pub fn parse(s: &str) -> Option<ImagePosition> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Some(ImagePosition::Left),
            "center" | "centre" => Some(ImagePosition::Center),
            "right" => Some(ImagePosition::Right),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImagePosition::Left => "left",
            ImagePosition::Center => "center",
            ImagePosition::Right => "right",
        }
    }
}

/// One piece of block-mode post content. Text blocks hold escaped HTML,
/// quote and code blocks hold plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text {
        content: String,
    },
    Image {
        src: String,
        alt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
        #[serde(default)]
        size: ImageSize,
        #[serde(default)]
        position: ImagePosition,
    },
    Quote {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribution: Option<String>,
    },
    Code {
        content: String,
        #[serde(default = "default_language")]
        language: String,
    },
    /// Any block kind this version does not know about.
    #[serde(other)]
    Unknown,
}

pub fn default_language() -> String {
    "plaintext".to_string()
}

/// Post body: block list, or one opaque HTML string for legacy consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PostContent {
    Blocks(Vec<ContentBlock>),
    Html(String),
}

impl ContentBlock {
    pub fn is_known(&self) -> bool {
        !matches!(self, ContentBlock::Unknown)
    }

    pub fn to_html(&self) -> String {
        let mut buf = String::new();
        match self {
            ContentBlock::Text { content } => {
                let _ = write!(&mut buf, r#"<div class="blog-text-block">{}</div>"#, content);
            }
            ContentBlock::Image { src, alt, caption, size, position } => {
                let _ = write!(
                    &mut buf,
                    r#"<figure class="blog-image-block image-size-{} image-position-{}"><img src="{}" alt="{}" loading="lazy">"#,
                    size.as_str(),
                    position.as_str(),
                    html_writer::escape_html(src),
                    html_writer::escape_html(alt),
                );
                if let Some(caption) = caption {
                    let _ = write!(&mut buf, "<figcaption>{}</figcaption>", html_writer::escape_html(caption));
                }
                buf.push_str("</figure>");
            }
            ContentBlock::Quote { content, attribution } => {
                let _ = write!(&mut buf, r#"<blockquote class="blog-quote-block"><p>{}</p>"#, html_writer::escape_html(content));
                if let Some(attribution) = attribution {
                    let _ = write!(&mut buf, "<cite>{}</cite>", html_writer::escape_html(attribution));
                }
                buf.push_str("</blockquote>");
            }
            ContentBlock::Code { content, language } => {
                let _ = write!(
                    &mut buf,
                    r#"<pre class="blog-code-block"><code class="language-{}">{}</code></pre>"#,
                    html_writer::escape_html(language),
                    html_writer::escape_html(content),
                );
            }
            ContentBlock::Unknown => {}
        }
        buf
    }
}

impl PostContent {
    pub fn to_html(&self) -> String {
        match self {
            PostContent::Blocks(blocks) => blocks
                .iter()
                .map(ContentBlock::to_html)
                .filter(|html| !html.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
            PostContent::Html(html) => html.clone(),
        }
    }

    /// Drops blocks of unknown kind, e.g. after reading a record written by a newer version.
    pub fn without_unknown(self) -> PostContent {
        match self {
            PostContent::Blocks(blocks) => PostContent::Blocks(blocks.into_iter().filter(ContentBlock::is_known).collect()),
            html => html,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_json_shape() {
        let block = ContentBlock::Image {
            src: "/images/blog/my-post/photo.png".to_string(),
            alt: "Photo".to_string(),
            caption: None,
            size: ImageSize::default(),
            position: ImagePosition::default(),
        };
        let json = serde_json::to_string(&block).unwrap();
        assert_eq!(json, r#"{"type":"image","src":"/images/blog/my-post/photo.png","alt":"Photo","size":"medium","position":"center"}"#);
    }

    #[test]
    fn test_unknown_blocks_are_dropped() {
        let json = r#"[{"type":"text","content":"<p>Hi</p>"},{"type":"video","url":"x.mp4"},{"type":"code","content":"let x = 1;"}]"#;
        let content: PostContent = serde_json::from_str(json).unwrap();
        let content = content.without_unknown();
        assert_eq!(content, PostContent::Blocks(vec![
            ContentBlock::Text { content: "<p>Hi</p>".to_string() },
            ContentBlock::Code { content: "let x = 1;".to_string(), language: "plaintext".to_string() },
        ]));
    }

    #[test]
    fn test_legacy_html_content() {
        let content: PostContent = serde_json::from_str(r#""<p>legacy</p>""#).unwrap();
        assert_eq!(content.to_html(), "<p>legacy</p>");
    }

    #[test]
    fn test_to_html_escapes_plain_text_blocks() {
        let content = PostContent::Blocks(vec![
            ContentBlock::Quote { content: "a <b> quote".to_string(), attribution: Some("Me & you".to_string()) },
            ContentBlock::Code { content: "<script>".to_string(), language: "html".to_string() },
            ContentBlock::Unknown,
        ]);
        assert_eq!(content.to_html(), concat!(
            r#"<blockquote class="blog-quote-block"><p>a &lt;b&gt; quote</p><cite>Me &amp; you</cite></blockquote>"#,
            "\n",
            r#"<pre class="blog-code-block"><code class="language-html">&lt;script&gt;</code></pre>"#,
        ));
    }
}
