use tracing::info;

use crate::error::ClassifiedError;
use crate::gemini::ImageGenerator;
use crate::models::{GeneratedImage, ImageAsset, SLOT_COUNT};
use crate::prompt::{build_prompt, Style, VARIATIONS};

/// Runs one full generation batch: all ten variations in index order, one
/// remote call at a time. Strictly sequential: downstream consumers address
/// slots positionally, and every call costs real quota, so no call is issued
/// past the first failure. Completed slots reported through `on_progress`
/// before a failure are kept by the caller.
pub async fn run_batch(
    generator: &dyn ImageGenerator,
    person: &ImageAsset,
    outfit: &ImageAsset,
    base: Style,
    accent: Option<Style>,
    mut on_progress: impl FnMut(usize, GeneratedImage, f64),
) -> Result<(), ClassifiedError> {
    for (index, variation) in VARIATIONS.iter().enumerate() {
        let prompt = build_prompt(base, index, accent);
        info!("🎯 Generating slot {}/{} ({})", index + 1, SLOT_COUNT, variation.label);
        let image = generator.generate_one(person, outfit, &prompt).await?;
        on_progress(index, image, (index + 1) as f64 / SLOT_COUNT as f64);
    }
    info!("✅ Batch complete: {} slots filled", SLOT_COUNT);
    Ok(())
}

/// Regenerates a single slot, leaving the rest of the batch alone. Builds the
/// exact same prompt the batch used for that index, so a redo is a true
/// re-roll of the one variation.
pub async fn redo(
    generator: &dyn ImageGenerator,
    person: &ImageAsset,
    outfit: &ImageAsset,
    base: Style,
    accent: Option<Style>,
    index: usize,
) -> Result<GeneratedImage, ClassifiedError> {
    let prompt = build_prompt(base, index, accent);
    info!("🔁 Redoing slot {} ({})", index + 1, VARIATIONS[index].label);
    generator.generate_one(person, outfit, &prompt).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fake remote model: succeeds with a tagged image per call, optionally
    /// failing at one scripted 1-indexed call number.
    struct ScriptedGenerator {
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
        fail_at: Option<(usize, ClassifiedError)>,
    }

    impl ScriptedGenerator {
        fn succeeding() -> Self {
            ScriptedGenerator { calls: AtomicUsize::new(0), prompts: Mutex::new(Vec::new()), fail_at: None }
        }

        fn failing_at(call: usize, error: ClassifiedError) -> Self {
            ScriptedGenerator {
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
                fail_at: Some((call, error)),
            }
        }

        fn calls_made(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageGenerator for ScriptedGenerator {
        async fn generate_one(
            &self,
            _person: &ImageAsset,
            _outfit: &ImageAsset,
            prompt: &str,
        ) -> Result<GeneratedImage, ClassifiedError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.prompts.lock().push(prompt.to_string());
            if let Some((fail_call, error)) = &self.fail_at {
                if call == *fail_call {
                    return Err(error.clone());
                }
            }
            Ok(GeneratedImage { mime_type: "image/png".into(), data: format!("img-{}", call) })
        }
    }

    fn asset() -> ImageAsset {
        ImageAsset { mime_type: "image/png".into(), data: Bytes::from_static(b"src") }
    }

    #[tokio::test]
    async fn full_batch_reports_ten_slots_in_order() {
        let generator = ScriptedGenerator::succeeding();
        let mut events: Vec<(usize, f64)> = Vec::new();

        let outcome = run_batch(&generator, &asset(), &asset(), Style::Formal, None, |index, _, frac| {
            events.push((index, frac));
        })
        .await;

        assert_eq!(outcome, Ok(()));
        assert_eq!(generator.calls_made(), 10);
        let expected: Vec<(usize, f64)> = (0..10).map(|i| (i, (i + 1) as f64 / 10.0)).collect();
        assert_eq!(events, expected);
    }

    #[tokio::test]
    async fn batch_stops_at_the_first_failure() {
        let generator = ScriptedGenerator::failing_at(4, ClassifiedError::SafetyBlocked);
        let mut completed = 0usize;

        let outcome = run_batch(&generator, &asset(), &asset(), Style::Casual, None, |_, _, _| {
            completed += 1;
        })
        .await;

        assert_eq!(outcome, Err(ClassifiedError::SafetyBlocked));
        assert_eq!(generator.calls_made(), 4);
        assert_eq!(completed, 3);
    }

    #[tokio::test]
    async fn immediate_failure_reports_no_progress() {
        let generator = ScriptedGenerator::failing_at(1, ClassifiedError::RateLimited);
        let mut completed = 0usize;

        let outcome = run_batch(&generator, &asset(), &asset(), Style::Casual, None, |_, _, _| {
            completed += 1;
        })
        .await;

        assert_eq!(outcome, Err(ClassifiedError::RateLimited));
        assert_eq!(generator.calls_made(), 1);
        assert_eq!(completed, 0);
    }

    #[tokio::test]
    async fn batch_uses_one_deterministic_prompt_per_variation() {
        let generator = ScriptedGenerator::succeeding();
        run_batch(&generator, &asset(), &asset(), Style::EveningWear, Some(Style::Formal), |_, _, _| {})
            .await
            .unwrap();

        let prompts = generator.prompts.lock();
        assert_eq!(prompts.len(), 10);
        for (index, prompt) in prompts.iter().enumerate() {
            assert_eq!(prompt, &build_prompt(Style::EveningWear, index, Some(Style::Formal)));
        }
    }

    #[tokio::test]
    async fn redo_reissues_the_exact_batch_prompt_for_its_slot() {
        let generator = ScriptedGenerator::succeeding();
        let image = redo(&generator, &asset(), &asset(), Style::StudioPortrait, None, 7)
            .await
            .unwrap();

        assert_eq!(image.data, "img-1");
        assert_eq!(generator.calls_made(), 1);
        assert_eq!(
            generator.prompts.lock()[0],
            build_prompt(Style::StudioPortrait, 7, None)
        );
    }

    #[tokio::test]
    async fn failed_redo_surfaces_the_classified_error() {
        let generator = ScriptedGenerator::failing_at(1, ClassifiedError::InvalidInput);
        let outcome = redo(&generator, &asset(), &asset(), Style::Casual, None, 3).await;

        assert_eq!(outcome, Err(ClassifiedError::InvalidInput));
        assert_eq!(generator.calls_made(), 1);
    }
}
