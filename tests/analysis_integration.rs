use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use fluoro_analyzer::ai::{
    AiError, AiOutcome, AnalysisRequest, Candidate, Content, GenerateContentRequest,
    GenerateContentResponse, GenerationBackend, Part, spawn_analysis,
};
use fluoro_analyzer::credentials::{CredentialProvider, StaticCredentials};
use fluoro_analyzer::report::{AiSection, Report};
use fluoro_analyzer::{Point, RoiSelection, decode, measure};
use image::{ImageFormat, Rgb, RgbImage};
use tokio_util::sync::CancellationToken;

struct ReplyWith(&'static str);

impl GenerationBackend for ReplyWith {
    async fn generate(
        &self,
        _api_key: &str,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, AiError> {
        assert!(!body.contents[0].parts.is_empty());
        Ok(GenerateContentResponse {
            candidates: vec![Candidate {
                content: Content {
                    parts: vec![Part::Text {
                        text: self.0.to_string(),
                    }],
                },
            }],
            ..Default::default()
        })
    }
}

fn write_sample_png(dir: &std::path::Path) -> std::path::PathBuf {
    // 10x10 dark image with a bright 4x4 patch centered around (5, 5)
    let mut img = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
    for y in 3..7 {
        for x in 3..7 {
            img.put_pixel(x, y, Rgb([40, 220, 90]));
        }
    }
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, ImageFormat::Png).unwrap();
    let path = dir.join("sample.png");
    std::fs::write(&path, bytes.into_inner()).unwrap();
    path
}

#[tokio::test]
async fn decoded_image_measures_roi_and_whole_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample_png(dir.path());
    let buffer = decode::load(path).await.unwrap();

    let roi = measure(
        &buffer,
        &RoiSelection::Centered {
            center: Point::new(5, 5),
            radius: 2,
        },
    )
    .unwrap();
    assert_eq!(roi.means.as_array(), [40.0, 220.0, 90.0]);
    assert_eq!(roi.intensity, 350.0 / 3.0);

    let whole = measure(&buffer, &RoiSelection::WholeImage).unwrap();
    assert_eq!(whole.pixel_count, 100);
    assert_eq!(whole.means.as_array(), [6.4, 35.2, 14.4]);
}

#[tokio::test]
async fn missing_credential_keeps_measurement_visible() {
    let buffer = fluoro_analyzer::PixelBuffer::filled(8, 8, [30, 60, 90]).unwrap();
    let measurement = measure(&buffer, &RoiSelection::WholeImage).unwrap();

    let creds = StaticCredentials(None);
    let result = spawn_analysis(
        Arc::new(ReplyWith("unused")),
        creds.api_key(),
        AnalysisRequest::values_only(measurement.means),
        Duration::from_secs(1),
        CancellationToken::new(),
    )
    .await
    .unwrap();
    assert!(matches!(result, Err(AiError::MissingCredential)));

    let report = Report {
        source: None,
        measurement,
        ai: AiSection::from_result(result),
    };
    let text = report.render_text();
    assert!(text.contains("Estimated Relative Intensity: 60.0"));
    assert!(text.contains("AI analysis failed"));
}

#[tokio::test]
async fn unparseable_reply_is_free_text_not_error() {
    let buffer = fluoro_analyzer::PixelBuffer::filled(4, 4, [0, 200, 0]).unwrap();
    let measurement = measure(&buffer, &RoiSelection::WholeImage).unwrap();
    let request = AnalysisRequest::with_image(measurement.means, &buffer).unwrap();

    let outcome = spawn_analysis(
        Arc::new(ReplyWith("Strong green fluorescence, maybe {intensity: high}.")),
        Some("test-key".into()),
        request,
        Duration::from_secs(5),
        CancellationToken::new(),
    )
    .await
    .unwrap()
    .unwrap();
    match &outcome {
        AiOutcome::FreeText { text, .. } => assert!(text.starts_with("Strong green")),
        other => panic!("expected free text, got {other:?}"),
    }

    let report = Report {
        source: None,
        measurement,
        ai: AiSection::Complete { outcome },
    };
    assert!(report.render_text().contains("AI interpretation:"));
}
