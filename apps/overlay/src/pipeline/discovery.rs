//! Input discovery: image walk, image ↔ workbook pairing, and output paths.
//!
//! An image at `images_dir/<sub>/<name>.<ext>` is paired with the workbooks found
//! directly inside `workbooks_dir/<sub>/`. When `<sub>` is empty or holds no
//! workbooks, the workbooks directly inside `workbooks_dir/` are used instead.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::errors::OverlayError;
use crate::render::OutputFormat;
use crate::text::source::WORKBOOK_EXTENSION;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "gif"];

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)))
}

pub fn is_image_path(path: &Path) -> bool {
    has_extension(path, IMAGE_EXTENSIONS)
}

pub fn is_workbook_path(path: &Path) -> bool {
    has_extension(path, &[WORKBOOK_EXTENSION])
}

/// Lazily walks `root` in sorted order, yielding image files at any depth.
/// Unreadable entries are logged and skipped.
pub fn image_paths(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_image_path(entry.path()))
        .map(|entry| entry.into_path())
}

/// Workbooks directly inside `dir`, sorted. A missing directory yields none.
pub fn workbooks_in(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file() && is_workbook_path(entry.path()))
        .map(|entry| entry.into_path())
        .collect()
}

/// One image and everything needed to process it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageJob {
    pub image: PathBuf,
    /// Directory of the image relative to the images root (`<sub>`).
    pub relative_dir: PathBuf,
    /// Output directory name: the file stem, or the full file name when another
    /// image in the same directory already claimed that stem.
    pub stem: String,
    pub workbooks: Vec<PathBuf>,
}

impl ImageJob {
    /// `output_dir/<sub>/<stem>/text_<N>.<ext>` for the 1-based block `index`.
    pub fn output_path(&self, output_root: &Path, index: usize, format: OutputFormat) -> PathBuf {
        output_root
            .join(&self.relative_dir)
            .join(&self.stem)
            .join(format!("text_{index}.{}", format.extension()))
    }
}

/// Workbooks paired with an image located in `relative_dir`.
pub fn pair_workbooks(workbooks_root: &Path, relative_dir: &Path) -> Vec<PathBuf> {
    if !relative_dir.as_os_str().is_empty() {
        let nested = workbooks_in(&workbooks_root.join(relative_dir));
        if !nested.is_empty() {
            return nested;
        }
    }
    workbooks_in(workbooks_root)
}

/// Walks `images_root` and pairs every image with its workbooks.
/// Both roots must be existing directories.
///
/// Images sharing a stem in one directory (`a.jpg`, `a.png`) would write to the
/// same output directory; every image after the first is keyed by its full file
/// name instead.
pub fn plan_jobs(images_root: &Path, workbooks_root: &Path) -> Result<Vec<ImageJob>, OverlayError> {
    for (label, dir) in [("images", images_root), ("workbooks", workbooks_root)] {
        if !dir.is_dir() {
            return Err(OverlayError::Setup(format!(
                "{label} directory {} does not exist",
                dir.display()
            )));
        }
    }

    let mut jobs = Vec::new();
    let mut claimed: HashSet<(PathBuf, String)> = HashSet::new();
    for image in image_paths(images_root) {
        let relative_dir = image
            .parent()
            .and_then(|parent| parent.strip_prefix(images_root).ok())
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let Some(mut stem) = image.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        if !claimed.insert((relative_dir.clone(), stem.clone())) {
            let file_name = image
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| stem.clone());
            warn!(
                image = %image.display(),
                stem = %stem,
                output = %file_name,
                "Another image already uses this output directory, keying by file name"
            );
            claimed.insert((relative_dir.clone(), file_name.clone()));
            stem = file_name;
        }
        let workbooks = pair_workbooks(workbooks_root, &relative_dir);
        jobs.push(ImageJob {
            image,
            relative_dir,
            stem,
            workbooks,
        });
    }
    Ok(jobs)
}
