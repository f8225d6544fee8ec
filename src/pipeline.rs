//! Per-image pipeline and sequential batch orchestration.
//!
//! ```text
//! DecodedImage ─► normalize ─► resize ─► watermark? ─► encode ─► EncodedOutput
//!                 (color)      (long edge) (optional)   (backend)
//! ```
//!
//! [`process_one`] runs the pixel stages and returns the processed image;
//! encoding is a separate step ([`encode_one`]) so callers can inspect the
//! result before paying for the encoder. [`process_all`] runs both stages
//! over a batch strictly in input order.
//!
//! ## Failure handling
//!
//! The pixel stages cannot fail. An encode error drops that one image from
//! the batch: it is recorded in [`BatchResult::skipped`], logged, and
//! reported as a [`BatchEvent::ImageSkipped`]; the rest of the batch still
//! runs. Output order always follows input order.
//!
//! ## Progress reporting
//!
//! [`process_all`] optionally takes an [`mpsc::Sender<BatchEvent>`]. The CLI
//! drains the channel on a printer thread so progress lines appear while
//! the batch runs.

use crate::imaging::{
    BackendError, DecodedImage, Dimensions, EncodeParams, ImageBackend, OutputFormat, Quality,
    WatermarkParams, apply_watermark, normalize, resize_to_long_edge,
};
use crate::naming::output_filename;
use crate::types::{EncodedOutput, SkipStage, Skipped};
use image::DynamicImage;
use std::sync::mpsc;

/// A decoded watermark plus how to place it.
#[derive(Debug, Clone)]
pub struct Watermark {
    pub image: DynamicImage,
    pub params: WatermarkParams,
}

/// Everything the pipeline needs, resolved from config and CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineParams {
    /// Longest edge after resizing; 0 disables resizing.
    pub target_long_edge: u32,
    pub encode: EncodeParams,
    pub convert_to_srgb: bool,
    pub watermark: Option<Watermark>,
    /// Appended to each output's base name.
    pub suffix: String,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            target_long_edge: 2048,
            encode: EncodeParams::default(),
            convert_to_srgb: true,
            watermark: None,
            suffix: "_web".to_string(),
        }
    }
}

/// Progress events emitted by [`process_all`].
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started {
        total: usize,
    },
    ImageEncoded {
        /// 1-based position in the batch.
        index: usize,
        source_name: String,
        filename: String,
        original: Dimensions,
        output: Dimensions,
        bytes: usize,
    },
    ImageSkipped {
        index: usize,
        skipped: Skipped,
    },
}

/// Outputs in input order, plus images that could not be encoded.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub outputs: Vec<EncodedOutput>,
    pub skipped: Vec<Skipped>,
}

/// Normalize color, resize, and watermark one image.
///
/// The input is borrowed and never modified.
pub fn process_one(image: &DecodedImage, params: &PipelineParams) -> DecodedImage {
    let normalized = normalize(image, params.convert_to_srgb);
    let resized = resize_to_long_edge(&normalized, params.target_long_edge);
    match &params.watermark {
        Some(watermark) => apply_watermark(&resized, &watermark.image, &watermark.params),
        None => resized,
    }
}

/// Encode a processed image and name it `{base}{suffix}.{ext}`.
pub fn encode_one(
    backend: &impl ImageBackend,
    image: &DecodedImage,
    params: &PipelineParams,
) -> Result<EncodedOutput, BackendError> {
    let bytes = backend.encode(image, &params.encode)?;
    Ok(EncodedOutput {
        filename: output_filename(&image.source_name, &params.suffix, params.encode.format),
        bytes,
        mime_type: params.encode.format.mime_type(),
    })
}

/// Process and encode every image, sequentially and in order.
pub fn process_all(
    backend: &impl ImageBackend,
    images: &[DecodedImage],
    params: &PipelineParams,
    progress: Option<mpsc::Sender<BatchEvent>>,
) -> BatchResult {
    let emit = |event: BatchEvent| {
        if let Some(tx) = &progress {
            // A dropped receiver only means nobody is listening.
            tx.send(event).ok();
        }
    };

    emit(BatchEvent::Started { total: images.len() });
    let mut result = BatchResult::default();

    for (i, image) in images.iter().enumerate() {
        let index = i + 1;
        let processed = process_one(image, params);

        match encode_one(backend, &processed, params) {
            Ok(output) => {
                tracing::debug!("{} → {} ({} bytes)", image.source_name, output.filename, output.bytes.len());
                emit(BatchEvent::ImageEncoded {
                    index,
                    source_name: image.source_name.clone(),
                    filename: output.filename.clone(),
                    original: image.dimensions(),
                    output: processed.dimensions(),
                    bytes: output.bytes.len(),
                });
                result.outputs.push(output);
            }
            Err(e) => {
                let skipped = Skipped::new(&image.source_name, SkipStage::Encode, e);
                tracing::warn!("skipping {} ({}): {}", skipped.name, skipped.stage, skipped.reason);
                emit(BatchEvent::ImageSkipped {
                    index,
                    skipped: skipped.clone(),
                });
                result.skipped.push(skipped);
            }
        }
    }

    result
}

/// Single-image preview with size estimates.
#[derive(Debug)]
pub struct Preview {
    pub source_name: String,
    pub original: Dimensions,
    pub processed: DecodedImage,
    pub output: EncodedOutput,
    /// Size of the source re-encoded as JPEG at quality 95; `None` if that
    /// encode failed.
    pub original_size: Option<usize>,
}

/// Encode settings used to estimate the source's size for comparison.
const ORIGINAL_SIZE_PARAMS: EncodeParams = EncodeParams {
    format: OutputFormat::Jpeg,
    quality: Quality(95),
    progressive: false,
    optimize: false,
    keep_metadata: false,
};

/// Run the full pipeline on one image and report size estimates.
pub fn preview(
    backend: &impl ImageBackend,
    image: &DecodedImage,
    params: &PipelineParams,
) -> Result<Preview, BackendError> {
    let original_size = match backend.encode(image, &ORIGINAL_SIZE_PARAMS) {
        Ok(bytes) => Some(bytes.len()),
        Err(e) => {
            tracing::debug!("{}: original size estimate failed: {e}", image.source_name);
            None
        }
    };

    let processed = process_one(image, params);
    let output = encode_one(backend, &processed, params)?;

    Ok(Preview {
        source_name: image.source_name.clone(),
        original: image.dimensions(),
        processed,
        output,
        original_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::WatermarkPosition;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::test_helpers::{gradient_rgb, gradient_rgba, solid_rgba};
    use image::ColorType;

    fn image(name: &str, w: u32, h: u32) -> DecodedImage {
        DecodedImage::new(gradient_rgb(w, h), name)
    }

    fn params_with_edge(target_long_edge: u32) -> PipelineParams {
        PipelineParams {
            target_long_edge,
            ..PipelineParams::default()
        }
    }

    // =========================================================================
    // process_one
    // =========================================================================

    #[test]
    fn process_one_resizes_long_edge() {
        let out = process_one(&image("a.jpg", 4000, 3000), &params_with_edge(2048));
        assert_eq!(out.dimensions(), Dimensions { width: 2048, height: 1536 });
    }

    #[test]
    fn process_one_small_image_keeps_dimensions() {
        let out = process_one(&image("a.jpg", 640, 480), &params_with_edge(2048));
        assert_eq!(out.dimensions(), Dimensions { width: 640, height: 480 });
    }

    #[test]
    fn process_one_srgb_output_is_rgb() {
        let input = DecodedImage::new(gradient_rgba(50, 50), "a.png");
        assert_eq!(process_one(&input, &params_with_edge(0)).color(), ColorType::Rgb8);
    }

    #[test]
    fn process_one_without_srgb_keeps_alpha() {
        let input = DecodedImage::new(gradient_rgba(50, 50), "a.png");
        let params = PipelineParams {
            convert_to_srgb: false,
            ..params_with_edge(0)
        };
        assert_eq!(process_one(&input, &params).color(), ColorType::Rgba8);
    }

    #[test]
    fn process_one_watermark_flattens_to_rgb() {
        let input = DecodedImage::new(gradient_rgba(200, 100), "a.png");
        let params = PipelineParams {
            convert_to_srgb: false,
            watermark: Some(Watermark {
                image: solid_rgba(20, 10, [255, 255, 255, 255]),
                params: WatermarkParams {
                    position: WatermarkPosition::Center,
                    ..WatermarkParams::default()
                },
            }),
            ..params_with_edge(100)
        };
        let out = process_one(&input, &params);
        assert_eq!(out.color(), ColorType::Rgb8);
        assert_eq!(out.dimensions(), Dimensions { width: 100, height: 50 });
    }

    #[test]
    fn process_one_does_not_mutate_input() {
        let input = image("a.jpg", 300, 200);
        let before = input.clone();
        let _ = process_one(&input, &params_with_edge(100));
        assert_eq!(input, before);
    }

    // =========================================================================
    // encode_one
    // =========================================================================

    #[test]
    fn encode_one_names_and_types_output() {
        let backend = MockBackend::new();
        let params = PipelineParams {
            encode: EncodeParams {
                format: OutputFormat::Webp,
                ..EncodeParams::default()
            },
            suffix: "_ig".to_string(),
            ..PipelineParams::default()
        };
        let out = encode_one(&backend, &image("trip/beach.JPG", 40, 30), &params).unwrap();
        assert_eq!(out.filename, "beach_ig.webp");
        assert_eq!(out.mime_type, "image/webp");
        assert_eq!(out.bytes, b"WEBP:40x30");
    }

    // =========================================================================
    // process_all
    // =========================================================================

    #[test]
    fn process_all_keeps_input_order() {
        let backend = MockBackend::new();
        let images = vec![image("c.jpg", 10, 10), image("a.jpg", 10, 10), image("b.jpg", 10, 10)];
        let result = process_all(&backend, &images, &PipelineParams::default(), None);

        let names: Vec<_> = result.outputs.iter().map(|o| o.filename.as_str()).collect();
        assert_eq!(names, vec!["c_web.jpg", "a_web.jpg", "b_web.jpg"]);
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn process_all_encodes_processed_dimensions() {
        let backend = MockBackend::new();
        let images = vec![image("big.jpg", 3000, 4000)];
        process_all(&backend, &images, &params_with_edge(1080), None);

        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Encode {
                source: "big.jpg".to_string(),
                width: 810,
                height: 1080,
                format: OutputFormat::Jpeg,
                quality: 85,
            }]
        );
    }

    #[test]
    fn process_all_skips_encode_failures() {
        let backend = MockBackend::failing_encode(&["b.jpg"]);
        let images = vec![image("a.jpg", 10, 10), image("b.jpg", 10, 10), image("c.jpg", 10, 10)];
        let result = process_all(&backend, &images, &PipelineParams::default(), None);

        let names: Vec<_> = result.outputs.iter().map(|o| o.filename.as_str()).collect();
        assert_eq!(names, vec!["a_web.jpg", "c_web.jpg"]);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].name, "b.jpg");
        assert_eq!(result.skipped[0].stage, SkipStage::Encode);
    }

    #[test]
    fn process_all_empty_batch() {
        let result = process_all(&MockBackend::new(), &[], &PipelineParams::default(), None);
        assert!(result.outputs.is_empty());
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn process_all_reports_progress() {
        let backend = MockBackend::failing_encode(&["bad.jpg"]);
        let images = vec![image("ok.jpg", 100, 50), image("bad.jpg", 10, 10)];
        let (tx, rx) = mpsc::channel();
        process_all(&backend, &images, &params_with_edge(50), Some(tx));

        let events: Vec<_> = rx.iter().collect();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], BatchEvent::Started { total: 2 }));
        match &events[1] {
            BatchEvent::ImageEncoded {
                index,
                filename,
                original,
                output,
                ..
            } => {
                assert_eq!(*index, 1);
                assert_eq!(filename, "ok_web.jpg");
                assert_eq!(*original, Dimensions { width: 100, height: 50 });
                assert_eq!(*output, Dimensions { width: 50, height: 25 });
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(&events[2], BatchEvent::ImageSkipped { index: 2, .. }));
    }

    #[test]
    fn process_all_tolerates_dropped_receiver() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let result = process_all(&MockBackend::new(), &[image("a.jpg", 5, 5)], &PipelineParams::default(), Some(tx));
        assert_eq!(result.outputs.len(), 1);
    }

    // =========================================================================
    // preview
    // =========================================================================

    #[test]
    fn preview_reports_both_sizes() {
        let backend = MockBackend::new();
        let p = preview(&backend, &image("shot.png", 400, 200), &params_with_edge(100)).unwrap();

        assert_eq!(p.original, Dimensions { width: 400, height: 200 });
        assert_eq!(p.processed.dimensions(), Dimensions { width: 100, height: 50 });
        assert_eq!(p.output.filename, "shot_web.jpg");
        // Mock encodes to "JPEG:400x200"
        assert_eq!(p.original_size, Some("JPEG:400x200".len()));

        let ops = backend.get_operations();
        assert!(matches!(&ops[0], RecordedOp::Encode { quality: 95, width: 400, .. }));
    }

    #[test]
    fn preview_encode_failure_is_an_error() {
        let backend = MockBackend::failing_encode(&["shot.png"]);
        assert!(preview(&backend, &image("shot.png", 10, 10), &PipelineParams::default()).is_err());
    }
}
