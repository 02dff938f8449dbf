use std::{fs, io};
use std::path::{Path, PathBuf};

/// Where a draft was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftOrigin {
    Intake,
    Archive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftFile {
    pub path: PathBuf,
    pub origin: DraftOrigin,
}

impl DraftFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or_default()
            .to_string()
    }

    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

pub struct DraftList {
    pub intake_dir: PathBuf,
    pub archive_dir: PathBuf,
    /// File names that are never treated as drafts, e.g. `README.md`.
    pub ignore: Vec<String>,
}

impl DraftList {
    fn is_ignored(&self, file_name: &str) -> bool {
        self.ignore.iter().any(|i| i.eq_ignore_ascii_case(file_name))
    }

    /// Pending drafts in the intake directory, sorted by file name.
    pub fn pending(&self) -> io::Result<Vec<DraftFile>> {
        let mut drafts = vec![];
        let entries = fs::read_dir(self.intake_dir.as_path())?;
        for entry in entries.flatten() {
            if let Ok(file_type) = entry.file_type() {
                if !file_type.is_file() {
                    continue;
                }
                let file_name = entry.file_name();
                if let Some(file_name) = file_name.to_str() {
                    if file_name.to_ascii_lowercase().ends_with(".md") && !self.is_ignored(file_name) {
                        drafts.push(DraftFile { path: entry.path(), origin: DraftOrigin::Intake });
                    }
                }
            }
        }
        drafts.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(drafts)
    }

    /// Finds `name` (`my-post` or `my-post.md`) in intake, then in the archive.
    pub fn locate(&self, name: &str) -> Option<DraftFile> {
        let name = name.trim();
        let file_name = if name.to_ascii_lowercase().ends_with(".md") {
            name.to_string()
        } else {
            format!("{}.md", name)
        };

        for (dir, origin) in [(&self.intake_dir, DraftOrigin::Intake), (&self.archive_dir, DraftOrigin::Archive)] {
            let path = dir.join(&file_name);
            if path.is_file() {
                return Some(DraftFile { path, origin });
            }
        }
        None
    }
}
