use std::fmt;
use std::fs;
use std::io;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use spdlog::{debug, error, info, warn};

use crate::config::Config;
use crate::content::front_matter::FrontMatterParser;
use crate::content::html_writer::RenderContext;
use crate::content::markdown_renderer::MarkdownRenderer;
use crate::draft_list::{DraftFile, DraftList, DraftOrigin};
use crate::error::{DraftError, DraftFailure, DraftResult, DraftState};
use crate::image_resolver::ImageResolver;
use crate::post_index::PostIndex;
use crate::post_record::{IndexEntry, PostRecord, PostRecordBuilder};
use crate::text_utils::slug_from_file_name;
use crate::util::fs_helper::{move_file, write_atomic};
use crate::view::page_renderer::PageRenderer;

/// Whether drafts are published or only checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Publish,
    /// Parse, render and resolve images; never moves or writes anything.
    ValidateOnly,
}

/// Final state of one draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftOutcome {
    pub file_name: String,
    pub slug: String,
    pub state: DraftState,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub outcomes: Vec<DraftOutcome>,
    pub failures: Vec<DraftFailure>,
}

impl BatchSummary {
    pub fn processed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.state == DraftState::Processed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    pub fn processed_slugs(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.state == DraftState::Processed)
            .map(|o| o.slug.as_str())
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} draft(s) processed, {} failed", self.processed_count(), self.failed_count())
    }
}

/// Runs drafts through parse, render, image resolution, record building,
/// index reconciliation and archiving, one at a time.
pub struct DraftProcessor<'a> {
    config: &'a Config,
    drafts: DraftList,
    images: ImageResolver,
    index: PostIndex,
    pages: Option<PageRenderer<'a>>,
    mode: RunMode,
}

impl<'a> DraftProcessor<'a> {
    pub fn new(config: &'a Config, mode: RunMode) -> DraftProcessor<'a> {
        let paths = &config.paths;
        DraftProcessor {
            config,
            drafts: DraftList {
                intake_dir: paths.intake_dir.clone(),
                archive_dir: paths.archive_dir.clone(),
                ignore: config.defaults.ignore.clone(),
            },
            images: ImageResolver::new(&paths.intake_dir, &paths.images_dir),
            index: PostIndex::load_or_empty(&paths.index_file),
            pages: None,
            mode,
        }
    }

    /// Also write `<pages_dir>/<slug>/index.html` for every processed post.
    pub fn with_pages(mut self, pages: PageRenderer<'a>) -> DraftProcessor<'a> {
        self.pages = Some(pages);
        self
    }

    pub fn process_all(&mut self) -> DraftResult<BatchSummary> {
        let pending = self
            .drafts
            .pending()
            .map_err(|e| DraftError::io(&self.drafts.intake_dir, e))?;

        if pending.is_empty() {
            info!("No drafts found in {}", self.drafts.intake_dir.display());
        } else {
            info!("Found {} draft(s) in {}", pending.len(), self.drafts.intake_dir.display());
        }

        let mut summary = BatchSummary::default();
        for draft in &pending {
            self.process_into(draft, &mut summary);
        }
        info!("{}", summary);
        Ok(summary)
    }

    /// Processes one draft by name, looking in the archive when it is no longer in intake.
    pub fn process_named(&mut self, name: &str) -> DraftResult<BatchSummary> {
        let Some(draft) = self.drafts.locate(name) else {
            let path = self.drafts.intake_dir.join(name);
            return Err(DraftError::io(path, io::Error::new(ErrorKind::NotFound, "draft not found in intake or archive")));
        };
        if draft.origin == DraftOrigin::Archive {
            info!("{} was already processed, processing it again from the archive", draft.file_name());
        }

        let mut summary = BatchSummary::default();
        self.process_into(&draft, &mut summary);
        info!("{}", summary);
        Ok(summary)
    }

    fn process_into(&mut self, draft: &DraftFile, summary: &mut BatchSummary) {
        let file_name = draft.file_name();
        match self.process_draft(draft) {
            Ok(slug) => {
                info!("OK {} -> {}", file_name, slug);
                summary.outcomes.push(DraftOutcome { file_name, slug, state: DraftState::Processed });
            }
            Err(failure) => {
                error!("FAILED {}", failure);
                summary.outcomes.push(DraftOutcome {
                    file_name: failure.file_name.clone(),
                    slug: failure.slug.clone(),
                    state: DraftState::Failed(failure.error.to_string()),
                });
                summary.failures.push(failure);
            }
        }
    }

    /// Runs every stage for one draft. The returned failure names the stage that broke.
    pub fn process_draft(&mut self, draft: &DraftFile) -> Result<String, DraftFailure> {
        let file_name = draft.file_name();
        let mut state = DraftState::New;

        let slug = match slug_from_file_name(&draft.path) {
            Ok(slug) => slug,
            Err(error) => {
                return Err(DraftFailure { file_name, slug: String::new(), stage: state, error });
            }
        };

        match self.run_stages(draft, &slug, &mut state) {
            Ok(()) => Ok(slug),
            Err(error) => Err(DraftFailure { file_name, slug, stage: state, error }),
        }
    }

    fn run_stages(&mut self, draft: &DraftFile, slug: &str, state: &mut DraftState) -> DraftResult<()> {
        let config = self.config;
        let publish = &config.publish;

        *state = DraftState::Parsing;
        let text = fs::read_to_string(&draft.path).map_err(|e| DraftError::io(&draft.path, e))?;
        let parsed = FrontMatterParser::parse(&text)?;
        debug!("{}: {:?} front matter, title '{}'", slug, parsed.dialect, parsed.front_matter.title);

        *state = DraftState::Rendering;
        let ctx = RenderContext::new(slug, &publish.images_url_root);
        let content = MarkdownRenderer::render(&parsed.body, &ctx, publish.content_mode)?;
        let image_refs = MarkdownRenderer::collect_image_refs(&parsed.body)?;

        *state = DraftState::ResolvingImages;
        // Drafts re-processed from the archive keep their images next to them
        let archive_images;
        let images = match draft.origin {
            DraftOrigin::Intake => &self.images,
            DraftOrigin::Archive => {
                archive_images = ImageResolver::new(draft.dir(), &config.paths.images_dir);
                &archive_images
            }
        };
        let resolved = images.resolve(slug, parsed.front_matter.featured_image.as_deref(), &image_refs)?;
        if self.mode == RunMode::ValidateOnly {
            *state = DraftState::Processed;
            return Ok(());
        }
        images.relocate(slug, &resolved)?;

        *state = DraftState::Building;
        let record = PostRecordBuilder::build(&ctx, parsed.front_matter, content, &resolved.featured.file_name);

        *state = DraftState::Reconciling;
        let page = self.write_page(&record)?;
        if let Err(e) = self.commit(&record) {
            if let Some((path, previous)) = page {
                restore_file(&path, previous.as_deref());
            }
            return Err(e);
        }

        *state = DraftState::Archiving;
        if draft.origin == DraftOrigin::Intake {
            let target = config.paths.archive_dir.join(draft.file_name());
            move_file(&draft.path, &target).map_err(|e| DraftError::io(&draft.path, e))?;
            debug!("Archived {} to {}", draft.path.display(), target.display());
        }

        *state = DraftState::Processed;
        Ok(())
    }

    /// Writes the page, if pages are enabled. Returns its path and what it
    /// replaced so a failed commit can put it back.
    fn write_page(&self, record: &PostRecord) -> DraftResult<Option<(PathBuf, Option<Vec<u8>>)>> {
        let (Some(pages), Some(pages_dir)) = (&self.pages, &self.config.paths.pages_dir) else {
            return Ok(None);
        };
        let previous = fs::read(PageRenderer::page_path(pages_dir, &record.slug)).ok();
        let path = pages.write_page(record, pages_dir)?;
        debug!("Wrote page {}", path.display());
        Ok(Some((path, previous)))
    }

    /// Writes the record and then the index. When the index cannot be saved
    /// the record file is put back the way it was.
    fn commit(&mut self, record: &PostRecord) -> DraftResult<()> {
        let record_path = PostRecord::record_path(&self.config.paths.records_dir, &record.slug);
        let previous = fs::read(&record_path).ok();
        record.write(&record_path)?;

        let mut index = self.index.clone();
        index.upsert(IndexEntry::from(record));
        if let Err(e) = index.save(&self.config.paths.index_file) {
            restore_file(&record_path, previous.as_deref());
            return Err(e);
        }

        self.index = index;
        Ok(())
    }
}

/// Puts back `previous`, or removes `path` if there was nothing before.
fn restore_file(path: &Path, previous: Option<&[u8]>) {
    let res = match previous {
        Some(contents) => write_atomic(path, contents),
        None => fs::remove_file(path),
    };
    match res {
        Ok(()) => warn!("Commit failed, {} restored", path.display()),
        Err(e) => error!("Commit failed and {} could not be restored: {}", path.display(), e),
    }
}

/// Rebuilds the index file from every record on disk. Returns the number of posts indexed.
pub fn rebuild_index(config: &Config) -> DraftResult<usize> {
    let (index, skipped) = PostIndex::rebuild_from_records(&config.paths.records_dir)?;
    if skipped > 0 {
        warn!("{} record(s) skipped while rebuilding the index", skipped);
    }
    index.save(&config.paths.index_file)?;
    Ok(index.len())
}

/// Reads the optional page template named in the configuration.
pub fn read_page_template(config: &Config) -> DraftResult<Option<String>> {
    match (&config.paths.pages_dir, &config.paths.page_template) {
        (Some(_), Some(template)) => fs::read_to_string(template)
            .map(Some)
            .map_err(|e| DraftError::io(template, e)),
        (None, Some(_)) | (Some(_), None) => {
            warn!("Both paths.pages_dir and paths.page_template are needed to generate pages");
            Ok(None)
        }
        (None, None) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentBlock, PostContent};
    use crate::test_data::{HELLO_WORLD_DRAFT, PAGE_TEMPLATE};
    use crate::view::page_renderer::SiteInfo;

    struct Site {
        _dir: tempfile::TempDir,
        config: Config,
    }

    impl Site {
        fn new() -> Site {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path();
            let mut config = Config::default();
            config.paths.intake_dir = root.join("blog-drafts/new");
            config.paths.archive_dir = root.join("blog-drafts/processed");
            config.paths.records_dir = root.join("blog-data");
            config.paths.index_file = root.join("blog-index.json");
            config.paths.images_dir = root.join("images/blog");
            fs::create_dir_all(&config.paths.intake_dir).unwrap();
            Site { _dir: dir, config }
        }

        fn intake(&self, name: &str, contents: &[u8]) {
            fs::write(self.config.paths.intake_dir.join(name), contents).unwrap();
        }

        fn add_draft(&self, slug: &str, title: &str, date: &str) {
            let draft = format!(
                "---\ntitle: \"{}\"\ndate: {}\nauthor: Jane\ntags: [test]\nshortDescription: About {}\n---\nBody of {}.\n",
                title, date, slug, slug
            );
            self.intake(&format!("{}.md", slug), draft.as_bytes());
            self.intake(&format!("{}-featured.png", slug), b"png");
        }

        fn index(&self) -> PostIndex {
            PostIndex::load(&self.config.paths.index_file).unwrap()
        }

        fn record_path(&self, slug: &str) -> PathBuf {
            PostRecord::record_path(&self.config.paths.records_dir, slug)
        }
    }

    fn hello_world_site() -> Site {
        let site = Site::new();
        site.intake("hello-world.md", HELLO_WORLD_DRAFT.as_bytes());
        site.intake("hello-world-featured.png", b"featured");
        site.intake("desk.png", b"desk");
        site
    }

    #[test]
    fn test_hello_world() {
        let site = hello_world_site();
        let mut processor = DraftProcessor::new(&site.config, RunMode::Publish);
        let summary = processor.process_all().unwrap();
        assert_eq!(summary.processed_slugs(), vec!["hello-world"]);
        assert!(!summary.has_failures());

        let record = PostRecord::read(&site.record_path("hello-world")).unwrap();
        assert_eq!(record.id, "hello-world");
        assert_eq!(record.title, "Hello World");
        assert_eq!(record.featured_image, "/images/blog/hello-world/hello-world-featured.png");
        let PostContent::Blocks(blocks) = &record.content else {
            panic!("expected blocks");
        };
        assert!(blocks.iter().any(|b| matches!(b, ContentBlock::Image { src, .. } if src == "/images/blog/hello-world/desk.png")));

        let index = site.index();
        assert_eq!(index.len(), 1);
        assert_eq!(index.posts[0], IndexEntry::from(&record));

        let paths = &site.config.paths;
        assert!(paths.images_dir.join("hello-world/desk.png").is_file());
        assert!(paths.images_dir.join("hello-world/hello-world-featured.png").is_file());
        assert!(!paths.intake_dir.join("desk.png").exists());
        assert!(!paths.intake_dir.join("hello-world.md").exists());
        assert!(paths.archive_dir.join("hello-world.md").is_file());
    }

    #[test]
    fn test_reprocessing_is_idempotent() {
        let site = hello_world_site();
        DraftProcessor::new(&site.config, RunMode::Publish).process_all().unwrap();
        let first_record = fs::read_to_string(site.record_path("hello-world")).unwrap();
        let first_index = fs::read_to_string(&site.config.paths.index_file).unwrap();

        let mut processor = DraftProcessor::new(&site.config, RunMode::Publish);
        let summary = processor.process_named("hello-world").unwrap();
        assert_eq!(summary.processed_slugs(), vec!["hello-world"]);

        assert_eq!(fs::read_to_string(site.record_path("hello-world")).unwrap(), first_record);
        assert_eq!(fs::read_to_string(&site.config.paths.index_file).unwrap(), first_index);
        assert!(site.config.paths.archive_dir.join("hello-world.md").is_file());
    }

    #[test]
    fn test_index_is_newest_first() {
        let site = Site::new();
        site.add_draft("a", "A", "2025-01-01");
        site.add_draft("b", "B", "2025-02-01");

        let summary = DraftProcessor::new(&site.config, RunMode::Publish).process_all().unwrap();
        assert_eq!(summary.processed_count(), 2);

        let slugs: Vec<String> = site.index().posts.into_iter().map(|e| e.slug).collect();
        assert_eq!(slugs, vec!["b", "a"]);
    }

    #[test]
    fn test_failures_are_isolated() {
        let site = Site::new();
        site.add_draft("good", "Good", "2025-01-01");
        site.intake("broken.md", b"---\ntitle: Broken\ndate: 2025-01-02\nauthor: Jane\ntags: x\nshortDescription: D\n---\n![a](missing.png)\n");
        site.intake("broken-featured.png", b"png");

        let summary = DraftProcessor::new(&site.config, RunMode::Publish).process_all().unwrap();
        assert_eq!(summary.processed_slugs(), vec!["good"]);
        assert_eq!(summary.failed_count(), 1);

        let failure = &summary.failures[0];
        assert_eq!(failure.slug, "broken");
        assert_eq!(failure.stage, DraftState::ResolvingImages);
        assert!(matches!(&failure.error, DraftError::MissingImages(names) if names == &vec!["missing.png".to_string()]));
        assert!(summary.outcomes.iter().any(|o| matches!(o.state, DraftState::Failed(_))));

        let paths = &site.config.paths;
        assert!(paths.intake_dir.join("broken.md").is_file());
        assert!(paths.intake_dir.join("broken-featured.png").is_file());
        assert!(!site.record_path("broken").exists());
        assert_eq!(site.index().len(), 1);
        assert_eq!(summary.to_string(), "1 draft(s) processed, 1 failed");
    }

    #[test]
    fn test_invalid_slug_fails_before_parsing() {
        let site = Site::new();
        site.intake("My Post.md", HELLO_WORLD_DRAFT.as_bytes());

        let summary = DraftProcessor::new(&site.config, RunMode::Publish).process_all().unwrap();
        assert_eq!(summary.failures[0].stage, DraftState::New);
        assert!(matches!(summary.failures[0].error, DraftError::InvalidSlug(_)));
    }

    #[test]
    fn test_validate_only_writes_nothing() {
        let site = hello_world_site();
        let summary = DraftProcessor::new(&site.config, RunMode::ValidateOnly).process_all().unwrap();
        assert_eq!(summary.processed_count(), 1);

        let paths = &site.config.paths;
        assert!(paths.intake_dir.join("hello-world.md").is_file());
        assert!(paths.intake_dir.join("desk.png").is_file());
        assert!(!paths.index_file.exists());
        assert!(!paths.images_dir.exists());
        assert!(!site.record_path("hello-world").exists());
    }

    #[test]
    fn test_record_restored_when_index_write_fails() {
        let site = Site::new();
        site.add_draft("a", "A", "2025-01-01");
        // A directory where the index file should be makes the rename fail
        fs::create_dir_all(site.config.paths.index_file.join("blocker")).unwrap();

        let summary = DraftProcessor::new(&site.config, RunMode::Publish).process_all().unwrap();
        assert_eq!(summary.failures[0].stage, DraftState::Reconciling);
        assert!(!site.record_path("a").exists());
        assert!(site.config.paths.intake_dir.join("a.md").is_file());
    }

    #[test]
    fn test_missing_named_draft() {
        let site = Site::new();
        let res = DraftProcessor::new(&site.config, RunMode::Publish).process_named("nope");
        assert!(matches!(res, Err(DraftError::Io { .. })));
    }

    #[test]
    fn test_pages_are_escaped() {
        let mut site = Site::new();
        let pages_dir = site.config.paths.records_dir.parent().unwrap().join("blog");
        site.config.paths.pages_dir = Some(pages_dir.clone());
        site.add_draft("x", "<script>alert(1)</script>", "2025-01-01");

        let renderer = PageRenderer::new(PAGE_TEMPLATE, SiteInfo::default()).unwrap();
        let mut processor = DraftProcessor::new(&site.config, RunMode::Publish).with_pages(renderer);
        processor.process_all().unwrap();

        let page = fs::read_to_string(pages_dir.join("x").join("index.html")).unwrap();
        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_page_failure_commits_nothing() {
        let mut site = Site::new();
        let pages_dir = site.config.paths.records_dir.parent().unwrap().join("blog");
        // A plain file where the pages directory should be
        fs::write(&pages_dir, b"not a directory").unwrap();
        site.config.paths.pages_dir = Some(pages_dir);
        site.add_draft("a", "A", "2025-01-01");

        let renderer = PageRenderer::new(PAGE_TEMPLATE, SiteInfo::default()).unwrap();
        let summary = DraftProcessor::new(&site.config, RunMode::Publish)
            .with_pages(renderer)
            .process_all()
            .unwrap();

        assert_eq!(summary.processed_count(), 0);
        assert_eq!(summary.failures[0].stage, DraftState::Reconciling);
        assert!(!site.record_path("a").exists());
        assert!(!site.config.paths.index_file.exists());
        assert!(site.config.paths.intake_dir.join("a.md").is_file());
    }

    #[test]
    fn test_page_removed_when_index_write_fails() {
        let mut site = Site::new();
        let pages_dir = site.config.paths.records_dir.parent().unwrap().join("blog");
        site.config.paths.pages_dir = Some(pages_dir.clone());
        site.add_draft("a", "A", "2025-01-01");
        fs::create_dir_all(site.config.paths.index_file.join("blocker")).unwrap();

        let renderer = PageRenderer::new(PAGE_TEMPLATE, SiteInfo::default()).unwrap();
        let summary = DraftProcessor::new(&site.config, RunMode::Publish)
            .with_pages(renderer)
            .process_all()
            .unwrap();

        assert_eq!(summary.failures[0].stage, DraftState::Reconciling);
        assert!(!PageRenderer::page_path(&pages_dir, "a").exists());
        assert!(!site.record_path("a").exists());
        assert!(site.config.paths.intake_dir.join("a.md").is_file());
    }

    #[test]
    fn test_rebuild_index() {
        let site = Site::new();
        site.add_draft("a", "A", "2025-01-01");
        site.add_draft("b", "B", "2025-02-01");
        DraftProcessor::new(&site.config, RunMode::Publish).process_all().unwrap();

        fs::remove_file(&site.config.paths.index_file).unwrap();
        fs::write(site.config.paths.records_dir.join("junk.json"), "{}").unwrap();

        assert_eq!(rebuild_index(&site.config).unwrap(), 2);
        let slugs: Vec<String> = site.index().posts.into_iter().map(|e| e.slug).collect();
        assert_eq!(slugs, vec!["b", "a"]);
    }
}
