use crate::gallery::domain::identity::{Identity, Roster};
use crate::gallery::domain::image_fetcher::ImageFetcher;
use crate::recognition::domain::descriptor::Descriptor;
use crate::recognition::domain::face_analyzer::FaceAnalyzer;
use crate::recognition::domain::face_matcher::LabeledDescriptors;

/// A reference image that contributed no descriptor.
#[derive(Clone, Debug, PartialEq)]
pub struct SkippedImage {
    pub identity: String,
    pub locator: String,
    pub reason: String,
}

/// Outcome of loading the reference gallery.
///
/// `sets` holds exactly one entry per roster identity, in roster order;
/// `attempted[i]` is the number of images configured for `sets[i]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GalleryReport {
    pub sets: Vec<LabeledDescriptors>,
    pub attempted: Vec<usize>,
    pub skipped: Vec<SkippedImage>,
}

impl GalleryReport {
    pub fn descriptor_count(&self) -> usize {
        self.sets.iter().map(|s| s.descriptors.len()).sum()
    }

    /// One line per identity with at least one failed image, e.g.
    /// `"1 of 2 reference images for Alice failed"`.
    pub fn failure_summaries(&self) -> Vec<String> {
        self.sets
            .iter()
            .zip(&self.attempted)
            .filter_map(|(set, &attempted)| {
                let failed = attempted.saturating_sub(set.descriptors.len());
                (failed > 0).then(|| {
                    format!(
                        "{failed} of {attempted} reference images for {} failed",
                        set.label
                    )
                })
            })
            .collect()
    }
}

/// Turns the roster into labeled descriptors, one face per reference image.
///
/// Per-image failures (fetch, decode, provider error, no face) skip that
/// image only and are recorded in the report.
pub struct LoadGalleryUseCase<'a> {
    fetcher: &'a dyn ImageFetcher,
    analyzer: &'a mut dyn FaceAnalyzer,
}

impl<'a> LoadGalleryUseCase<'a> {
    pub fn new(fetcher: &'a dyn ImageFetcher, analyzer: &'a mut dyn FaceAnalyzer) -> Self {
        Self { fetcher, analyzer }
    }

    pub fn execute(&mut self, roster: &Roster) -> GalleryReport {
        let mut report = GalleryReport::default();

        for identity in roster.identities() {
            let (set, skipped) = self.load_identity(identity);
            report.attempted.push(identity.images.len());
            report.sets.push(set);
            report.skipped.extend(skipped);
        }

        for line in report.failure_summaries() {
            log::warn!("{line}");
        }
        log::info!(
            "Gallery loaded: {} identities, {} descriptors, {} skipped image(s)",
            report.sets.len(),
            report.descriptor_count(),
            report.skipped.len()
        );
        report
    }

    fn load_identity(&mut self, identity: &Identity) -> (LabeledDescriptors, Vec<SkippedImage>) {
        let mut descriptors = Vec::with_capacity(identity.images.len());
        let mut skipped = Vec::new();

        for locator in &identity.images {
            match self.describe(locator) {
                Ok(descriptor) => descriptors.push(descriptor),
                Err(reason) => {
                    log::warn!(
                        "Skipping reference image {locator} for {}: {reason}",
                        identity.name
                    );
                    skipped.push(SkippedImage {
                        identity: identity.name.clone(),
                        locator: locator.clone(),
                        reason,
                    });
                }
            }
        }

        (
            LabeledDescriptors::new(identity.name.clone(), descriptors),
            skipped,
        )
    }

    fn describe(&mut self, locator: &str) -> Result<Descriptor, String> {
        let frame = self.fetcher.fetch(locator).map_err(|e| e.to_string())?;
        match self.analyzer.detect_single(&frame) {
            Ok(Some(face)) => Ok(face.descriptor),
            Ok(None) => Err("no face detected".to_string()),
            Err(e) => Err(format!("face analysis failed: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_stubs::{descriptor, face_with, image, StubAnalyzer, StubFetcher};

    fn roster(entries: &[(&str, &[&str])]) -> Roster {
        Roster::new(
            entries
                .iter()
                .map(|(name, images)| {
                    Identity::new(*name, images.iter().map(|s| s.to_string()).collect())
                })
                .collect(),
        )
    }

    #[test]
    fn test_one_set_per_identity_in_roster_order() {
        let fetcher = StubFetcher::new()
            .with_image("a1", image(1))
            .with_image("a2", image(2))
            .with_image("b1", image(3));
        let mut analyzer = StubAnalyzer::new()
            .with_faces(1, vec![face_with(descriptor(&[0.0, 0.0]))])
            .with_faces(2, vec![face_with(descriptor(&[0.1, 0.0]))])
            .with_faces(3, vec![face_with(descriptor(&[1.0, 1.0]))]);

        let report = LoadGalleryUseCase::new(&fetcher, &mut analyzer)
            .execute(&roster(&[("Alice", &["a1", "a2"]), ("Bob", &["b1"])]));

        assert_eq!(report.sets.len(), 2);
        assert_eq!(report.sets[0].label, "Alice");
        assert_eq!(
            report.sets[0].descriptors,
            vec![descriptor(&[0.0, 0.0]), descriptor(&[0.1, 0.0])]
        );
        assert_eq!(report.sets[1].label, "Bob");
        assert_eq!(report.descriptor_count(), 3);
        assert!(report.skipped.is_empty());
        assert!(report.failure_summaries().is_empty());
    }

    #[test]
    fn test_failed_fetch_skips_only_that_image() {
        let fetcher = StubFetcher::new()
            .with_image("a1", image(1))
            .with_error("a2", "HTTP 404");
        let mut analyzer =
            StubAnalyzer::new().with_faces(1, vec![face_with(descriptor(&[0.0]))]);

        let report = LoadGalleryUseCase::new(&fetcher, &mut analyzer)
            .execute(&roster(&[("Alice", &["a1", "a2"])]));

        assert_eq!(report.sets[0].descriptors.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].identity, "Alice");
        assert_eq!(report.skipped[0].locator, "a2");
        assert!(report.skipped[0].reason.contains("HTTP 404"));
        assert_eq!(
            report.failure_summaries(),
            vec!["1 of 2 reference images for Alice failed".to_string()]
        );
    }

    #[test]
    fn test_image_without_face_is_skipped() {
        let fetcher = StubFetcher::new().with_image("c1", image(1));
        let mut analyzer = StubAnalyzer::new();

        let report = LoadGalleryUseCase::new(&fetcher, &mut analyzer)
            .execute(&roster(&[("Carol", &["c1"])]));

        assert_eq!(report.sets.len(), 1);
        assert!(report.sets[0].descriptors.is_empty());
        assert_eq!(report.skipped[0].reason, "no face detected");
    }

    #[test]
    fn test_provider_error_is_skipped() {
        let fetcher = StubFetcher::new().with_image("d1", image(1));
        let mut analyzer = StubAnalyzer::new().with_error(1, "session crashed");

        let report = LoadGalleryUseCase::new(&fetcher, &mut analyzer)
            .execute(&roster(&[("Dan", &["d1"])]));

        assert!(report.sets[0].descriptors.is_empty());
        assert!(report.skipped[0].reason.contains("session crashed"));
    }

    #[test]
    fn test_all_images_failing_still_yields_a_set() {
        let fetcher = StubFetcher::new()
            .with_error("a1", "gone")
            .with_error("a2", "gone");
        let mut analyzer = StubAnalyzer::new();

        let report = LoadGalleryUseCase::new(&fetcher, &mut analyzer)
            .execute(&roster(&[("Alice", &["a1", "a2"]), ("Bob", &[])]));

        assert_eq!(report.sets.len(), 2);
        assert!(report.sets.iter().all(|s| s.descriptors.is_empty()));
        assert_eq!(
            report.failure_summaries(),
            vec!["2 of 2 reference images for Alice failed".to_string()]
        );
    }

    #[test]
    fn test_descriptors_never_exceed_images() {
        let fetcher = StubFetcher::new()
            .with_image("a1", image(1))
            .with_image("a2", image(2));
        // detect_single uses the top face only, even when several are found
        let mut analyzer = StubAnalyzer::new()
            .with_faces(
                1,
                vec![face_with(descriptor(&[0.0])), face_with(descriptor(&[9.0]))],
            )
            .with_faces(2, vec![face_with(descriptor(&[0.2]))]);

        let report = LoadGalleryUseCase::new(&fetcher, &mut analyzer)
            .execute(&roster(&[("Alice", &["a1", "a2"])]));

        assert_eq!(report.sets[0].descriptors.len(), 2);
        assert_eq!(report.sets[0].descriptors[0], descriptor(&[0.0]));
    }

    #[test]
    fn test_empty_roster_gives_empty_report() {
        let fetcher = StubFetcher::new();
        let mut analyzer = StubAnalyzer::new();
        let report = LoadGalleryUseCase::new(&fetcher, &mut analyzer).execute(&Roster::default());
        assert_eq!(report, GalleryReport::default());
    }
}
