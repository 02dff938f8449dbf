#[cfg(test)]
pub const RENDER_SAMPLE_MD: &str = "# Hi

Some **bold**, *italic* and a [link](https://example.com).

- one
- two

| Name | Qty |
| ---- | --: |
| apples | 3 |

![x](pic.png \"A picture | large\")

> Be kind.
>
> — Someone

```rust
let x = 1 < 2;
```
";

#[cfg(test)]
pub const HELLO_WORLD_DRAFT: &str = "---
title: Hello World
date: 2025-05-01
author: Jane Doe
tags: [intro, meta]
shortDescription: First post.
featuredImage: hello-world-featured.png
---
# Hello

Welcome to the blog.

![Desk](desk.png)
";

#[cfg(test)]
pub const FULL_YAML_DRAFT: &str = "\u{feff}---
title: 2024
date: 2025-05-01T22:10:00+02:00
Author: Jane Doe
tags: \" rust, cli ,rust,, tools \"
short_description: Numbers as titles.
featured: \"TRUE\"
series: Tooling
reading_time: 7
---

Body line.
";

#[cfg(test)]
pub const LEGACY_DRAFT: &str = "# Knitting a Sweater

## Metadata
- date: 2025-02-10
- author: Jane Doe
- tags: craft, wool, craft
- featured: yes

## Short Description
A slow winter project,
one row at a time.

## Content
First row of the post.

![Yarn](yarn.jpg)
";

#[cfg(test)]
pub const LEGACY_INDEX_JSON: &str = r#"{
  "posts": [
    {
      "slug": "/blog/older-post/",
      "title": "Older post",
      "date": "2024-01-10",
      "tags": ["old"],
      "shortDescription": "From the old site.",
      "featuredImage": "/images/blog/older-post/older-post-featured.jpg",
      "featured": false
    },
    {
      "slug": "undated",
      "title": "Undated",
      "date": "sometime in spring",
      "tags": [],
      "shortDescription": "Date was free text.",
      "featuredImage": "/images/blog/undated/undated-featured.png"
    },
    {
      "slug": "newer-post",
      "title": "Newer post",
      "date": "2024-06-01",
      "tags": ["new"],
      "shortDescription": "More recent.",
      "featuredImage": "/images/blog/newer-post/newer-post-featured.png",
      "featured": true
    }
  ]
}
"#;

#[cfg(test)]
pub const PAGE_TEMPLATE: &str = "<!DOCTYPE html>
<html>
<head>
<title>{{title}} | {{site_name}}</title>
<meta name=\"description\" content=\"{{description}}\">
<link rel=\"canonical\" href=\"{{canonical_url}}\">
<meta property=\"og:image\" content=\"{{featured_image_url}}\">
</head>
<body>
<h1>{{title}}</h1>
<p class=\"post-meta\">{{date}} by {{author}}{{#tags}} <span class=\"tag\">{{name}}</span>{{/tags}}</p>
{{{content}}}
</body>
</html>
";
