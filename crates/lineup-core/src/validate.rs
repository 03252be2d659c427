//! Dataset validation.

use crate::dataset::Dataset;

/// A dataset can be trained on when at least one label has at least one photo.
///
/// An empty dataset is a normal steady state (everyone was removed), so
/// callers reset the model instead of treating it as an error.
pub fn is_valid(dataset: &Dataset) -> bool {
    dataset.iter().any(|(_, person)| !person.photos.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Person, Photo};

    #[test]
    fn test_empty_dataset_is_invalid() {
        assert!(!is_valid(&Dataset::new()));
    }

    #[test]
    fn test_people_without_photos_is_invalid() {
        let dataset = Dataset::new()
            .with_person(1, Person::new("a"))
            .with_person(2, Person::new("b"));
        assert!(!is_valid(&dataset));
    }

    #[test]
    fn test_one_photo_is_valid() {
        let dataset = Dataset::new()
            .with_person(1, Person::new("a"))
            .with_person(2, Person::new("b").with_photo(Photo::from_path("b.png")));
        assert!(is_valid(&dataset));
    }
}
