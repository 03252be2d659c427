use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How training and prediction inputs are shaped before reaching the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizePolicy {
    /// Samples are passed at their decoded size.
    Native,
    /// Samples are resized to the canonical size of the last full training batch.
    Canonical,
}

/// Capabilities of an algorithm family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantTraits {
    pub supports_incremental_update: bool,
    pub resize: ResizePolicy,
}

const EIGEN_TRAITS: VariantTraits = VariantTraits {
    supports_incremental_update: false,
    resize: ResizePolicy::Canonical,
};

const FISHER_TRAITS: VariantTraits = VariantTraits {
    supports_incremental_update: false,
    resize: ResizePolicy::Canonical,
};

const LBPH_TRAITS: VariantTraits = VariantTraits {
    supports_incremental_update: true,
    resize: ResizePolicy::Native,
};

/// Face recognition algorithm family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Eigen,
    Fisher,
    Lbph,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Eigen, Variant::Fisher, Variant::Lbph];

    pub fn traits(self) -> &'static VariantTraits {
        match self {
            Variant::Eigen => &EIGEN_TRAITS,
            Variant::Fisher => &FISHER_TRAITS,
            Variant::Lbph => &LBPH_TRAITS,
        }
    }

    /// True when new samples can be folded into an existing model.
    pub fn supports_incremental_update(self) -> bool {
        self.traits().supports_incremental_update
    }

    pub fn resize_policy(self) -> ResizePolicy {
        self.traits().resize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Eigen => "eigen",
            Variant::Fisher => "fisher",
            Variant::Lbph => "lbph",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown recognizer variant {0:?} (expected eigen, fisher or lbph)")]
pub struct ParseVariantError(pub String);

impl FromStr for Variant {
    type Err = ParseVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eigen" => Ok(Variant::Eigen),
            "fisher" => Ok(Variant::Fisher),
            "lbph" => Ok(Variant::Lbph),
            _ => Err(ParseVariantError(s.to_string())),
        }
    }
}

/// Uniform sample dimensions for fixed-size variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalSize {
    pub width: u32,
    pub height: u32,
}

impl CanonicalSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for CanonicalSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Identity prediction for one face.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Prediction {
    pub label: i32,
    /// Engine distance to the closest known face. Lower = more confident.
    /// NaN when no model is available.
    pub confidence: f64,
}

impl Prediction {
    pub const UNKNOWN_LABEL: i32 = -1;

    /// Result returned when no trained model is available.
    pub fn unknown() -> Self {
        Self {
            label: Self::UNKNOWN_LABEL,
            confidence: f64::NAN,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.label == Self::UNKNOWN_LABEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_lbph_is_incremental() {
        assert!(!Variant::Eigen.supports_incremental_update());
        assert!(!Variant::Fisher.supports_incremental_update());
        assert!(Variant::Lbph.supports_incremental_update());
    }

    #[test]
    fn test_fixed_size_variants_resize() {
        for variant in Variant::ALL {
            let expected = if variant.supports_incremental_update() {
                ResizePolicy::Native
            } else {
                ResizePolicy::Canonical
            };
            assert_eq!(variant.resize_policy(), expected, "{variant}");
        }
    }

    #[test]
    fn test_parse_variant() {
        assert_eq!("LBPH".parse::<Variant>(), Ok(Variant::Lbph));
        assert_eq!(" fisher ".parse::<Variant>(), Ok(Variant::Fisher));
        assert_eq!("eigen".parse::<Variant>(), Ok(Variant::Eigen));
        assert!("haar".parse::<Variant>().is_err());
    }

    #[test]
    fn test_variant_display_roundtrip() {
        for variant in Variant::ALL {
            assert_eq!(variant.to_string().parse::<Variant>(), Ok(variant));
        }
    }

    #[test]
    fn test_variant_serde_lowercase() {
        let json = serde_json::to_string(&Variant::Lbph).unwrap();
        assert_eq!(json, "\"lbph\"");
    }

    #[test]
    fn test_unknown_prediction() {
        let p = Prediction::unknown();
        assert!(p.is_unknown());
        assert_eq!(p.label, -1);
        assert!(p.confidence.is_nan());
    }

    #[test]
    fn test_canonical_size_empty() {
        assert!(CanonicalSize::new(0, 10).is_empty());
        assert!(!CanonicalSize::new(1, 1).is_empty());
        assert_eq!(CanonicalSize::new(64, 48).to_string(), "64x48");
    }
}
