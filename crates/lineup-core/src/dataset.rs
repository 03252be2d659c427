//! Labeled face datasets.
//!
//! A dataset maps an integer label to a person, and each person owns a keyed
//! collection of photos. Photos are either already decoded or a path to an
//! image file decoded on demand.

use image::{DynamicImage, GrayImage};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhotoError {
    #[error("failed to decode photo {origin} for label {label}: {source}")]
    Decode {
        label: i32,
        origin: String,
        #[source]
        source: image::ImageError,
    },
    #[error("photo {origin} for label {label} has no pixels")]
    Empty { label: i32, origin: String },
}

/// A single face photo.
#[derive(Debug, Clone)]
pub enum Photo {
    Decoded(DynamicImage),
    File(PathBuf),
}

impl Photo {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Photo::File(path.into())
    }

    /// Human-readable origin for logs and errors.
    pub fn origin(&self) -> String {
        match self {
            Photo::Decoded(img) => format!("<memory {}x{}>", img.width(), img.height()),
            Photo::File(path) => path.display().to_string(),
        }
    }

    /// Decode (if needed) and convert to 8-bit grayscale.
    pub fn to_gray(&self) -> Result<GrayImage, image::ImageError> {
        match self {
            Photo::Decoded(img) => Ok(img.to_luma8()),
            Photo::File(path) => Ok(image::open(path)?.to_luma8()),
        }
    }
}

/// A person and their photos, keyed by photo id.
#[derive(Debug, Clone, Default)]
pub struct Person {
    pub name: String,
    pub photos: BTreeMap<u32, Photo>,
}

impl Person {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            photos: BTreeMap::new(),
        }
    }

    /// Add a photo under the next free id and return that id.
    pub fn add_photo(&mut self, photo: Photo) -> u32 {
        let id = self.photos.keys().next_back().map_or(0, |last| last + 1);
        self.photos.insert(id, photo);
        id
    }

    pub fn with_photo(mut self, photo: Photo) -> Self {
        self.add_photo(photo);
        self
    }
}

/// A grayscale face paired with the label of the person it shows.
#[derive(Debug, Clone)]
pub struct LabeledSample {
    pub label: i32,
    pub image: GrayImage,
}

/// Label → person mapping used for full training runs.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    people: BTreeMap<i32, Person>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: i32, person: Person) -> Option<Person> {
        self.people.insert(label, person)
    }

    pub fn with_person(mut self, label: i32, person: Person) -> Self {
        self.insert(label, person);
        self
    }

    pub fn get(&self, label: i32) -> Option<&Person> {
        self.people.get(&label)
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &Person)> {
        self.people.iter().map(|(label, person)| (*label, person))
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    /// Total number of photos across all people.
    pub fn photo_count(&self) -> usize {
        self.people.values().map(|p| p.photos.len()).sum()
    }

    /// Decode every photo to grayscale, in label then photo-id order.
    ///
    /// Fails on the first photo that cannot be decoded or has no pixels.
    pub fn load_samples(&self) -> Result<Vec<LabeledSample>, PhotoError> {
        let mut samples = Vec::with_capacity(self.photo_count());
        for (label, person) in self.iter() {
            for photo in person.photos.values() {
                let image = photo.to_gray().map_err(|source| PhotoError::Decode {
                    label,
                    origin: photo.origin(),
                    source,
                })?;
                if image.width() == 0 || image.height() == 0 {
                    return Err(PhotoError::Empty {
                        label,
                        origin: photo.origin(),
                    });
                }
                tracing::debug!(
                    label,
                    person = %person.name,
                    photo = %photo.origin(),
                    width = image.width(),
                    height = image.height(),
                    "inserting sample"
                );
                samples.push(LabeledSample { label, image });
            }
        }
        Ok(samples)
    }
}

impl FromIterator<(i32, Person)> for Dataset {
    fn from_iter<I: IntoIterator<Item = (i32, Person)>>(iter: I) -> Self {
        Self {
            people: iter.into_iter().collect(),
        }
    }
}

/// Decode a single image file as grayscale.
pub fn load_gray(path: &Path) -> Result<GrayImage, image::ImageError> {
    Ok(image::open(path)?.to_luma8())
}
