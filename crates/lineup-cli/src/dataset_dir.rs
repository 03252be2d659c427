//! Dataset directories: `<root>/<label>/<photo files>`.

use anyhow::{Context, Result};
use lineup_core::{Dataset, Person, Photo};
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [&str; 9] = ["png", "jpg", "jpeg", "bmp", "pgm", "gif", "tif", "tiff", "webp"];

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = std::fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("listing {}", dir.display()))?;
    paths.sort();
    Ok(paths)
}

/// Build a dataset from a directory with one numeric subdirectory per label.
///
/// Non-numeric subdirectories and non-image files are skipped. A label
/// directory with no images still yields a person with no photos.
pub fn load_dataset(root: &Path) -> Result<Dataset> {
    let mut dataset = Dataset::new();
    for dir in sorted_entries(root)? {
        if !dir.is_dir() {
            continue;
        }
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Ok(label) = name.parse::<i32>() else {
            tracing::warn!(dir = %dir.display(), "skipping non-numeric label directory");
            continue;
        };

        let mut person = Person::new(name);
        for file in sorted_entries(&dir)? {
            if file.is_file() && is_image(&file) {
                person.add_photo(Photo::from_path(file));
            }
        }
        tracing::debug!(label, photos = person.photos.len(), "loaded person");
        dataset.insert(label, person);
    }
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use tempfile::TempDir;

    fn touch_png(path: &Path) {
        GrayImage::from_pixel(4, 4, Luma([9])).save(path).unwrap();
    }

    #[test]
    fn test_load_dataset_layout() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("1")).unwrap();
        std::fs::create_dir_all(root.join("2")).unwrap();
        std::fs::create_dir_all(root.join("notes")).unwrap();
        touch_png(&root.join("1/a.png"));
        std::fs::copy(root.join("1/a.png"), root.join("1/b.PNG")).unwrap();
        std::fs::write(root.join("1/readme.txt"), "x").unwrap();
        std::fs::write(root.join("stray.png"), "x").unwrap();

        let dataset = load_dataset(root).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.get(1).unwrap().photos.len(), 2);
        assert!(dataset.get(2).unwrap().photos.is_empty());
        assert_eq!(dataset.photo_count(), 2);
    }

    #[test]
    fn test_load_dataset_missing_root() {
        let dir = TempDir::new().unwrap();
        assert!(load_dataset(&dir.path().join("absent")).is_err());
    }
}
