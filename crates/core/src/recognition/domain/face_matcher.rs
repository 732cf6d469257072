//! Nearest-neighbor identity matching over labeled reference descriptors.

use std::fmt;

use crate::recognition::domain::descriptor::Descriptor;
use crate::shared::constants::UNKNOWN_LABEL;

/// All reference descriptors collected for one identity, in image order.
#[derive(Clone, Debug, PartialEq)]
pub struct LabeledDescriptors {
    pub label: String,
    pub descriptors: Vec<Descriptor>,
}

impl LabeledDescriptors {
    pub fn new(label: impl Into<String>, descriptors: Vec<Descriptor>) -> Self {
        Self {
            label: label.into(),
            descriptors,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum MatchLabel {
    Known(String),
    Unknown,
}

/// Result of matching one query descriptor.
///
/// `distance` is the distance to the nearest stored descriptor; it is
/// `None` only when the gallery holds no descriptors at all.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceMatch {
    pub label: MatchLabel,
    pub distance: Option<f64>,
}

impl FaceMatch {
    pub fn is_known(&self) -> bool {
        matches!(self.label, MatchLabel::Known(_))
    }

    pub fn name(&self) -> &str {
        match &self.label {
            MatchLabel::Known(name) => name,
            MatchLabel::Unknown => UNKNOWN_LABEL,
        }
    }
}

impl fmt::Display for FaceMatch {
    /// `"Alice (0.31)"`, `"unknown (0.8)"`, or plain `"unknown"`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.distance {
            Some(d) => {
                let rounded = (d * 100.0).round() / 100.0;
                write!(f, "{} ({rounded})", self.name())
            }
            None => write!(f, "{}", self.name()),
        }
    }
}

/// Immutable matcher built once from the reference gallery.
#[derive(Clone, Debug)]
pub struct FaceMatcher {
    gallery: Vec<LabeledDescriptors>,
    threshold: f64,
}

impl FaceMatcher {
    pub fn new(gallery: Vec<LabeledDescriptors>, threshold: f64) -> Self {
        Self { gallery, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn gallery(&self) -> &[LabeledDescriptors] {
        &self.gallery
    }

    /// Closest stored descriptor across all identities.
    ///
    /// Accepted when its distance is at or below the threshold. Ties go
    /// to the identity listed first.
    pub fn find_best_match(&self, query: &Descriptor) -> FaceMatch {
        let mut best: Option<(&str, f64)> = None;
        for set in &self.gallery {
            for descriptor in &set.descriptors {
                let distance = query.distance(descriptor);
                if best.map_or(true, |(_, d)| distance < d) {
                    best = Some((&set.label, distance));
                }
            }
        }

        match best {
            Some((label, distance)) if distance <= self.threshold => FaceMatch {
                label: MatchLabel::Known(label.to_string()),
                distance: Some(distance),
            },
            Some((_, distance)) => FaceMatch {
                label: MatchLabel::Unknown,
                distance: Some(distance),
            },
            None => FaceMatch {
                label: MatchLabel::Unknown,
                distance: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::constants::DEFAULT_MATCH_THRESHOLD;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn d(values: &[f32]) -> Descriptor {
        Descriptor::new(values.to_vec())
    }

    fn gallery() -> Vec<LabeledDescriptors> {
        vec![
            LabeledDescriptors::new("Alice", vec![d(&[0.0, 0.0]), d(&[0.1, 0.0])]),
            LabeledDescriptors::new("Bob", vec![d(&[1.0, 1.0])]),
        ]
    }

    #[test]
    fn test_copy_of_stored_descriptor_matches_with_zero_distance() {
        let matcher = FaceMatcher::new(gallery(), DEFAULT_MATCH_THRESHOLD);
        let m = matcher.find_best_match(&d(&[1.0, 1.0]));
        assert_eq!(m.label, MatchLabel::Known("Bob".into()));
        assert_relative_eq!(m.distance.unwrap(), 0.0);
    }

    #[test]
    fn test_nearest_beyond_threshold_is_unknown() {
        let matcher = FaceMatcher::new(gallery(), DEFAULT_MATCH_THRESHOLD);
        // nearest stored descriptor is Alice's [0.1, 0.0] at 0.6
        let m = matcher.find_best_match(&d(&[0.7, 0.0]));
        assert_eq!(m.label, MatchLabel::Unknown);
        assert_relative_eq!(m.distance.unwrap(), 0.6, epsilon = 1e-6);
    }

    #[rstest]
    #[case::below(0.25, true)]
    #[case::at(0.5, true)]
    #[case::above(0.75, false)]
    fn test_threshold_is_inclusive(#[case] distance: f32, #[case] known: bool) {
        let matcher = FaceMatcher::new(
            vec![LabeledDescriptors::new("Alice", vec![d(&[0.0])])],
            0.5,
        );
        assert_eq!(matcher.find_best_match(&d(&[distance])).is_known(), known);
    }

    #[test]
    fn test_uses_closest_descriptor_not_mean() {
        // Alice has one far and one exact descriptor
        let matcher = FaceMatcher::new(
            vec![
                LabeledDescriptors::new("Alice", vec![d(&[5.0]), d(&[0.0])]),
                LabeledDescriptors::new("Bob", vec![d(&[0.3])]),
            ],
            DEFAULT_MATCH_THRESHOLD,
        );
        assert_eq!(matcher.find_best_match(&d(&[0.0])).name(), "Alice");
    }

    #[test]
    fn test_ties_resolve_to_first_identity() {
        let matcher = FaceMatcher::new(
            vec![
                LabeledDescriptors::new("First", vec![d(&[1.0])]),
                LabeledDescriptors::new("Second", vec![d(&[-1.0])]),
            ],
            2.0,
        );
        assert_eq!(matcher.find_best_match(&d(&[0.0])).name(), "First");
    }

    #[test]
    fn test_is_deterministic() {
        let matcher = FaceMatcher::new(gallery(), DEFAULT_MATCH_THRESHOLD);
        let q = d(&[0.05, 0.02]);
        let first = matcher.find_best_match(&q);
        for _ in 0..10 {
            assert_eq!(matcher.find_best_match(&q), first);
        }
    }

    #[test]
    fn test_empty_gallery_is_unknown_without_distance() {
        let matcher = FaceMatcher::new(Vec::new(), DEFAULT_MATCH_THRESHOLD);
        let m = matcher.find_best_match(&d(&[0.0, 0.0]));
        assert_eq!(m.label, MatchLabel::Unknown);
        assert_eq!(m.distance, None);
        assert_eq!(m.to_string(), "unknown");
    }

    #[test]
    fn test_identity_without_descriptors_never_matches() {
        let matcher = FaceMatcher::new(
            vec![
                LabeledDescriptors::new("Ghost", Vec::new()),
                LabeledDescriptors::new("Bob", vec![d(&[0.0])]),
            ],
            DEFAULT_MATCH_THRESHOLD,
        );
        assert_eq!(matcher.find_best_match(&d(&[0.1])).name(), "Bob");
    }

    #[rstest]
    #[case::known(MatchLabel::Known("Alice".into()), Some(0.0), "Alice (0)")]
    #[case::rounded(MatchLabel::Known("Alice".into()), Some(0.3149), "Alice (0.31)")]
    #[case::unknown(MatchLabel::Unknown, Some(0.8), "unknown (0.8)")]
    #[case::no_distance(MatchLabel::Unknown, None, "unknown")]
    fn test_display(
        #[case] label: MatchLabel,
        #[case] distance: Option<f64>,
        #[case] expected: &str,
    ) {
        assert_eq!(FaceMatch { label, distance }.to_string(), expected);
    }
}
