use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while turning one draft into a published post.
#[derive(Debug, Error)]
pub enum DraftError {
    #[error("no front matter block found")]
    MissingFrontMatter,

    #[error("malformed front matter: {0}")]
    MalformedFrontMatter(String),

    #[error("missing required front matter field(s): {}", .0.join(", "))]
    MissingRequiredFields(Vec<String>),

    #[error("missing required section(s): {}", .0.join(", "))]
    MissingRequiredSections(Vec<String>),

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("'{0}' cannot be used as a slug (expected lowercase letters, digits, '-' or '_')")]
    InvalidSlug(String),

    #[error("featured image '{slug}-featured.<png|jpg|jpeg|gif|webp>' not found")]
    FeaturedImageNotFound { slug: String },

    #[error("more than one featured image found: {}", .0.join(", "))]
    AmbiguousFeaturedImage(Vec<String>),

    #[error("missing image file(s): {}", .0.join(", "))]
    MissingImages(Vec<String>),

    #[error("could not move image '{failed}' ({cause}); already moved: [{}]", .moved.join(", "))]
    ImageRelocationFailed {
        moved: Vec<String>,
        failed: String,
        cause: io::Error,
    },

    #[error("post index {} is malformed: {reason}", .path.display())]
    IndexMalformed { path: PathBuf, reason: String },

    #[error("could not write {}: {cause}", .path.display())]
    RecordWriteFailed { path: PathBuf, cause: io::Error },

    #[error("invalid post record {}: {}", .path.display(), .reasons.join("; "))]
    RecordInvalid { path: PathBuf, reasons: Vec<String> },

    #[error("markdown rendering failed: {0}")]
    RenderFailed(String),

    #[error("{}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}

impl DraftError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DraftError::Io { path: path.into(), source }
    }
}

pub type DraftResult<T> = Result<T, DraftError>;

/// Pipeline stage a draft was in. Doubles as the draft lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftState {
    New,
    Parsing,
    Rendering,
    ResolvingImages,
    Building,
    Reconciling,
    Archiving,
    Processed,
    Failed(String),
}

impl fmt::Display for DraftState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftState::New => write!(f, "new"),
            DraftState::Parsing => write!(f, "parsing"),
            DraftState::Rendering => write!(f, "rendering"),
            DraftState::ResolvingImages => write!(f, "resolving images"),
            DraftState::Building => write!(f, "building"),
            DraftState::Reconciling => write!(f, "reconciling"),
            DraftState::Archiving => write!(f, "archiving"),
            DraftState::Processed => write!(f, "processed"),
            DraftState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// A draft that did not make it through the pipeline.
#[derive(Debug)]
pub struct DraftFailure {
    pub file_name: String,
    pub slug: String,
    pub stage: DraftState,
    pub error: DraftError,
}

impl fmt::Display for DraftFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (slug={}) failed while {}: {}", self.file_name, self.slug, self.stage, self.error)
    }
}
