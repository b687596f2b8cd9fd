//! Turning parsed arguments into a batch and reporting its outcome.

use std::io::Write;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use pixelpost_core::{
    BatchExecutor, BatchReport, EncodeSpec, PipelineConfig, PixelMode, SourceImage, TaskBatch,
};

use crate::cli::Variant;

/// Converts the source at most once per pixel layout.
struct PixelCache<'a> {
    source: &'a SourceImage,
    rgb: Option<Bytes>,
    rgba: Option<Bytes>,
}

impl<'a> PixelCache<'a> {
    fn new(source: &'a SourceImage) -> Self {
        Self {
            source,
            rgb: None,
            rgba: None,
        }
    }

    fn pixels(&mut self, mode: PixelMode) -> Bytes {
        let source = self.source;
        let slot = match mode {
            PixelMode::Rgb => &mut self.rgb,
            PixelMode::Rgba => &mut self.rgba,
        };
        slot.get_or_insert_with(|| source.pixels(mode)).clone()
    }
}

/// Build one spec per variant from a decoded source image.
///
/// Variants with the same pixel layout share one buffer.
pub fn build_batch(source: &SourceImage, variants: &[Variant]) -> TaskBatch {
    let mut cache = PixelCache::new(source);
    variants
        .iter()
        .map(|variant| {
            let pixels = cache.pixels(variant.format.pixel_mode());
            EncodeSpec::new(pixels, variant.format, variant.quality)
                .with_key_prefix(variant.key_prefix.clone())
        })
        .collect()
}

/// Check the source against the configured size, or adopt its size.
pub fn reconcile_dimensions(
    pipeline: PipelineConfig,
    source: &SourceImage,
    use_image_size: bool,
) -> Result<PipelineConfig> {
    if use_image_size {
        return Ok(pipeline.with_dimensions(source.dimensions()));
    }
    source
        .ensure_dimensions(pipeline.dimensions())
        .context("Source image does not match the configured dimensions (try --use-image-size)")?;
    Ok(pipeline)
}

/// Run the batch on a runtime owned by this call.
pub fn execute(executor: &BatchExecutor, batch: &TaskBatch, prefix: &str) -> Result<BatchReport> {
    tracing::info!(tasks = batch.len(), prefix, "Starting batch");
    executor
        .run_blocking(batch, prefix)
        .context("Batch could not be scheduled")
}

/// Print one line per outcome, failing if any task failed.
pub fn print_report(report: &BatchReport, out: &mut impl Write) -> Result<()> {
    for outcome in report.outcomes() {
        match &outcome.result {
            Ok(stored) => writeln!(
                out,
                "{}\t{}\t{} bytes",
                outcome.index, stored.reference, stored.encoded_len
            )?,
            Err(error) => writeln!(
                out,
                "{}\t{}\tFAILED ({}): {}",
                outcome.index,
                outcome.key,
                error.kind(),
                error
            )?,
        }
    }

    let failed = report.failure_count();
    if failed > 0 {
        bail!("{} of {} tasks failed", failed, report.len());
    }
    Ok(())
}
