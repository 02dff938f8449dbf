use std::fs;
use std::path::{Path, PathBuf};

use spdlog::{debug, error, info, warn};

use crate::content::html_writer::SUPPORTED_IMAGE_EXTENSIONS;
use crate::error::{DraftError, DraftResult};
use crate::text_utils::basename;
use crate::util::fs_helper::move_file;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLocation {
    /// Next to the draft, still to be moved.
    Intake,
    /// Already in the per-slug published directory from an earlier run.
    Published,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub file_name: String,
    pub location: ImageLocation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImages {
    pub featured: ResolvedImage,
    pub inline: Vec<ResolvedImage>,
}

impl ResolvedImages {
    /// Featured image first, then inline images, without duplicates.
    pub fn all(&self) -> Vec<&ResolvedImage> {
        let mut images = vec![&self.featured];
        for image in &self.inline {
            if !images.iter().any(|i| i.file_name == image.file_name) {
                images.push(image);
            }
        }
        images
    }
}

pub struct ImageResolver {
    intake_dir: PathBuf,
    images_dir: PathBuf,
}

impl ImageResolver {
    pub fn new(intake_dir: &Path, images_dir: &Path) -> ImageResolver {
        ImageResolver {
            intake_dir: intake_dir.to_path_buf(),
            images_dir: images_dir.to_path_buf(),
        }
    }

    pub fn published_dir(&self, slug: &str) -> PathBuf {
        self.images_dir.join(slug)
    }

    /// Validates that the featured image and every inline reference exist.
    /// Nothing is touched on disk.
    pub fn resolve(&self, slug: &str, featured_ref: Option<&str>, inline_refs: &[String]) -> DraftResult<ResolvedImages> {
        let published_dir = self.published_dir(slug);
        let featured = self.resolve_featured(slug, &published_dir)?;

        if let Some(featured_ref) = featured_ref {
            let named = basename(featured_ref.trim());
            if !named.eq_ignore_ascii_case(&featured.file_name) {
                warn!("Post {} names featured image '{}', using '{}' instead", slug, named, featured.file_name);
            }
        }

        let mut inline = vec![];
        let mut missing = vec![];
        for file_name in inline_refs {
            if self.intake_dir.join(file_name).is_file() {
                inline.push(ResolvedImage { file_name: file_name.clone(), location: ImageLocation::Intake });
            } else if published_dir.join(file_name).is_file() {
                inline.push(ResolvedImage { file_name: file_name.clone(), location: ImageLocation::Published });
            } else if !missing.contains(file_name) {
                missing.push(file_name.clone());
            }
        }

        if !missing.is_empty() {
            return Err(DraftError::MissingImages(missing));
        }

        debug!("Post {}: featured image {}, {} inline image(s)", slug, featured.file_name, inline.len());
        Ok(ResolvedImages { featured, inline })
    }

    fn resolve_featured(&self, slug: &str, published_dir: &Path) -> DraftResult<ResolvedImage> {
        for (dir, location) in [(self.intake_dir.as_path(), ImageLocation::Intake), (published_dir, ImageLocation::Published)] {
            let mut candidates = featured_candidates(dir, slug)?;
            match candidates.len() {
                0 => continue,
                1 => {
                    let file_name = candidates.remove(0);
                    return Ok(ResolvedImage { file_name, location });
                }
                _ => return Err(DraftError::AmbiguousFeaturedImage(candidates)),
            }
        }

        Err(DraftError::FeaturedImageNotFound { slug: slug.to_string() })
    }

    /// Moves every intake image of the post into its published directory.
    /// On failure already moved files are put back, as far as possible.
    pub fn relocate(&self, slug: &str, images: &ResolvedImages) -> DraftResult<Vec<String>> {
        let published_dir = self.published_dir(slug);
        fs::create_dir_all(&published_dir).map_err(|e| DraftError::io(&published_dir, e))?;

        let mut moved: Vec<String> = vec![];
        for image in images.all() {
            if image.location != ImageLocation::Intake {
                continue;
            }

            let from = self.intake_dir.join(&image.file_name);
            let to = published_dir.join(&image.file_name);
            if let Err(cause) = move_file(&from, &to) {
                error!("Could not move {} to {}: {}", from.display(), to.display(), cause);
                self.roll_back(&published_dir, &moved);
                return Err(DraftError::ImageRelocationFailed {
                    moved,
                    failed: image.file_name.clone(),
                    cause,
                });
            }
            moved.push(image.file_name.clone());
        }

        info!("Moved {} image(s) to {}", moved.len(), published_dir.display());
        Ok(moved)
    }

    fn roll_back(&self, published_dir: &Path, moved: &[String]) {
        for file_name in moved.iter().rev() {
            let from = published_dir.join(file_name);
            let to = self.intake_dir.join(file_name);
            match move_file(&from, &to) {
                Ok(()) => debug!("Restored {}", to.display()),
                Err(e) => error!("Could not restore {} to {}, move it back manually: {}", from.display(), to.display(), e),
            }
        }
    }
}

fn is_featured_name(file_name: &str, slug: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    let prefix = format!("{}-featured.", slug);
    match lower.strip_prefix(&prefix) {
        Some(ext) => SUPPORTED_IMAGE_EXTENSIONS.contains(&ext),
        None => false,
    }
}

fn featured_candidates(dir: &Path, slug: &str) -> DraftResult<Vec<String>> {
    if !dir.is_dir() {
        return Ok(vec![]);
    }

    let mut candidates = vec![];
    let entries = fs::read_dir(dir).map_err(|e| DraftError::io(dir, e))?;
    for entry in entries.flatten() {
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        if let Some(file_name) = entry.file_name().to_str() {
            if is_featured_name(file_name, slug) {
                candidates.push(file_name.to_string());
            }
        }
    }
    candidates.sort();
    Ok(candidates)
}
