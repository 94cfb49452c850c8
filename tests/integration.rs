use guidescan::{
    BarcodeFormat, CropOutcome, Detection, FrameBuffer, GuideScanner, GuideScannerBuilder,
    ImageRect, NormalizedRect, OriginConvention, PixelFormat, Rotation, ScanOptions, Size,
    ViewRect,
};
use image::{DynamicImage, GenericImageView, RgbImage};

const PREVIEW: Size = Size::new(390.0, 844.0);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn guide() -> ViewRect {
    // Centered box, normalized roughly (0.1, 0.4) .. (0.9, 0.6).
    ViewRect::new(39.0, 337.6, 312.0, 168.8)
}

fn scanner() -> GuideScanner {
    GuideScannerBuilder::new()
        .feature_origin(OriginConvention::BottomLeft)
        .build()
        .expect("Failed to build scanner")
}

#[test]
fn preview_scan_accepts_only_barcodes_inside_guide() {
    init_logging();
    let scanner = scanner();
    let outside = Detection::new(
        "0000000000000",
        BarcodeFormat::Ean13,
        NormalizedRect::new(0.1, 0.05, 0.3, 0.1),
    );
    assert_eq!(
        scanner.scan_preview(&[outside.clone()], Some(&guide()), PREVIEW),
        None
    );

    // Bottom-left origin: y in [0.45, 0.55] is inside the centered guide.
    let inside = Detection::new(
        "5012345678900",
        BarcodeFormat::Ean13,
        NormalizedRect::new(0.2, 0.45, 0.5, 0.1),
    );
    let result = scanner
        .scan_preview(&[outside, inside], Some(&guide()), PREVIEW)
        .expect("Barcode inside the guide should be accepted");
    assert_eq!(result.value, "5012345678900");
    assert_eq!(result.format, BarcodeFormat::Ean13);
    assert!(scanner.session().is_finished());
}

#[test]
fn preview_scan_without_guide_accepts_any_detection() {
    let scanner = scanner();
    let detection = Detection::new(
        "hello",
        BarcodeFormat::Qr,
        NormalizedRect::new(0.9, 0.9, 0.05, 0.05),
    );
    assert!(scanner.scan_preview(&[], None, PREVIEW).is_none());
    assert!(!scanner.session().is_finished());
    assert!(scanner
        .scan_preview(&[detection.clone()], None, PREVIEW)
        .is_some());
}

#[test]
fn only_one_result_per_session() {
    let scanner = scanner();
    let detection = Detection::new(
        "5012345678900",
        BarcodeFormat::Ean13,
        NormalizedRect::new(0.2, 0.45, 0.5, 0.1),
    );
    let detections = [detection];
    let results = std::thread::scope(|scope| {
        let handles = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    (0..200)
                        .filter_map(|_| scanner.scan_preview(&detections, Some(&guide()), PREVIEW))
                        .count()
                })
            })
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|it| it.join().unwrap())
            .sum::<usize>()
    });
    assert_eq!(results, 1);

    assert!(scanner.reset());
    assert!(scanner
        .scan_preview(&detections, Some(&guide()), PREVIEW)
        .is_some());
}

#[test]
fn frame_scan_prefers_largest_overlap() {
    init_logging();
    let scanner = GuideScannerBuilder::new()
        .scan_area(NormalizedRect::new(0.25, 0.25, 0.5, 0.5))
        .overlap_threshold(0.5)
        .build()
        .unwrap();
    let data = vec![0u8; PixelFormat::Nv21.expected_len(640, 480)];
    let frame = FrameBuffer::new(&data, 640, 480, PixelFormat::Nv21).unwrap();

    // Scan area in pixels: (160, 120) .. (480, 360).
    let far = Detection::new("far", BarcodeFormat::Code128, ImageRect::new(0.0, 0.0, 100.0, 50.0));
    let half = Detection::new(
        "half",
        BarcodeFormat::Code128,
        ImageRect::new(400.0, 200.0, 160.0, 40.0),
    );
    let full = Detection::new(
        "full",
        BarcodeFormat::Code128,
        ImageRect::new(200.0, 200.0, 100.0, 40.0),
    );

    let result = scanner.scan_frame(&frame, &[far.clone(), half.clone()]).unwrap();
    assert_eq!(result.value, "half");
    assert_eq!(result.overlap, Some(0.5));

    assert!(scanner.reset());
    let result = scanner.scan_frame(&frame, &[half, full, far.clone()]).unwrap();
    assert_eq!(result.value, "full");
    assert_eq!(result.overlap, Some(1.0));

    assert!(scanner.reset());
    assert!(scanner.scan_frame(&frame, &[far]).is_none());
    assert!(!scanner.session().is_finished());
}

#[test]
fn frame_scan_uses_upright_orientation() {
    let scanner = GuideScannerBuilder::new()
        .scan_area(NormalizedRect::new(0.0, 0.0, 1.0, 0.25))
        .strict_frames(true)
        .build()
        .unwrap();
    let data = vec![0u8; 640 * 480];
    let frame = FrameBuffer::new(&data, 640, 480, PixelFormat::Gray8)
        .unwrap()
        .with_rotation(Rotation::Deg90);
    // Upright frame is 480x640, scan area is its top 160 rows. A box at the
    // sensor's left edge ends up at the upright top.
    let detection = Detection::new("top", BarcodeFormat::Qr, ImageRect::new(10.0, 100.0, 100.0, 100.0));
    assert!(scanner.scan_frame(&frame, &[detection.clone()]).is_some());

    let unrotated = FrameBuffer::new(&data, 640, 480, PixelFormat::Gray8).unwrap();
    assert!(scanner.reset());
    assert!(scanner.scan_frame(&unrotated, &[detection]).is_none());
}

#[test]
fn invalid_configuration_is_rejected() {
    assert!(GuideScannerBuilder::new().overlap_threshold(1.2).build().is_err());
    assert!(GuideScannerBuilder::new()
        .scan_area(NormalizedRect::new(0.5, 0.5, 0.8, 0.2))
        .build()
        .is_err());
    assert!(GuideScannerBuilder::new()
        .strict_frames(true)
        .overlap_threshold(7.0)
        .build()
        .is_ok());
}

#[test]
fn capture_is_cropped_once() {
    init_logging();
    let scanner = GuideScanner::new(ScanOptions::default());
    let photo = DynamicImage::ImageRgb8(RgbImage::new(4000, 3000));
    let preview = Size::new(1000.0, 2000.0);

    let outcome = scanner.crop_capture(photo.clone(), &ViewRect::new(400.0, 800.0, 200.0, 400.0), preview);
    let CropOutcome::Cropped { rect, image } = outcome else {
        panic!("expected a crop");
    };
    assert_eq!((rect.left(), rect.top()), (1850, 1200));
    assert_eq!(image.dimensions(), (300, 600));

    let again = scanner.crop_capture(photo, &ViewRect::full(preview), preview);
    assert!(matches!(again, CropOutcome::Rejected { .. }));
    assert_eq!(again.image().dimensions(), (4000, 3000));
}

#[test]
fn capture_with_unusable_preview_keeps_full_photo() {
    let scanner = GuideScanner::new(ScanOptions::default());
    let photo = DynamicImage::ImageRgb8(RgbImage::new(320, 240));
    let outcome = scanner.crop_capture(photo, &ViewRect::new(0.0, 0.0, 10.0, 10.0), Size::default());
    assert!(matches!(outcome, CropOutcome::Uncropped { .. }));
    assert_eq!(outcome.into_image().dimensions(), (320, 240));
}

#[test]
fn strict_frame_scan_keeps_first_of_equal_matches() {
    let scanner = GuideScannerBuilder::new()
        .scan_area(NormalizedRect::new(0.25, 0.25, 0.5, 0.5))
        .strict_frames(true)
        .build()
        .unwrap();
    let data = vec![0u8; 640 * 480];
    let frame = FrameBuffer::new(&data, 640, 480, PixelFormat::Gray8).unwrap();
    let first = Detection::new("first", BarcodeFormat::Ean8, ImageRect::new(200.0, 150.0, 80.0, 40.0));
    let second = Detection::new("second", BarcodeFormat::Ean8, ImageRect::new(300.0, 250.0, 80.0, 40.0));

    let result = scanner.scan_frame(&frame, &[first, second]).unwrap();
    assert_eq!(result.value, "first");
    assert_eq!(result.overlap, Some(1.0));
}

#[test]
fn reset_waits_for_the_frame_in_flight() {
    let scanner = scanner();
    let guard = scanner.session().try_begin().unwrap();
    assert!(!scanner.reset());
    let detection = Detection::new("late", BarcodeFormat::Qr, NormalizedRect::new(0.2, 0.45, 0.5, 0.1));
    assert!(scanner.scan_preview(&[detection.clone()], None, PREVIEW).is_none());
    drop(guard);
    assert!(scanner.scan_preview(&[detection], None, PREVIEW).is_some());
    assert!(scanner.reset());
}
