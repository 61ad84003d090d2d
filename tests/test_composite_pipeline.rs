use chrono::{DateTime, TimeZone, Utc};
use ndarray::Array2;

use sarstack::core::{
    decibel_to_power, power_to_decibel, CompositeConfig, CompositePipeline, GapFillParams,
    TemporalCompositor, QA_BAND,
};
use sarstack::{
    Domain, ImageCollection, ImageMetadata, RadiusUnits, RasterImage, Reducer, Sample, StackError,
    TimeWindow,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

/// A 4x4 digital-number mosaic tile with uniform polarization bands and a
/// layover flag at pixel (0, 0).
fn dn_tile(index: &str, t: DateTime<Utc>, hh: Sample, hv: Sample) -> RasterImage {
    let mut qa = Array2::from_elem((4, 4), 255.0);
    qa[[0, 0]] = 100.0;

    RasterImage::new(ImageMetadata::new(index, t), Domain::DigitalNumber)
        .with_band("HH", Array2::from_elem((4, 4), hh))
        .unwrap()
        .with_band("HV", Array2::from_elem((4, 4), hv))
        .unwrap()
        .with_band(QA_BAND, qa)
        .unwrap()
}

fn archive() -> ImageCollection {
    ImageCollection::from_images(vec![
        dn_tile("t0", date(2015, 3, 1), 100.0, 50.0),
        dn_tile("t1", date(2015, 6, 1), 200.0, 100.0),
        dn_tile("t2", date(2015, 9, 1), 300.0, 150.0),
    ])
}

fn config() -> CompositeConfig {
    CompositeConfig {
        bands: vec!["HH".to_string(), "HV".to_string()],
        radius: 3,
        units: RadiusUnits::Pixels,
        window: TimeWindow::default(),
        reducer: Reducer::Mean,
        composite_from: date(2015, 1, 1),
        composite_to: date(2016, 1, 1),
        gap_fill: GapFillParams::default(),
    }
}

/// Expected mean composite of digital numbers averaged in the power domain.
fn expected_power_mean_db(dns: &[Sample]) -> Sample {
    let mean_power: Sample = dns
        .iter()
        .map(|dn| {
            let db = 10.0 * (dn * dn).log10() - 83.0;
            Sample::powf(10.0, 0.1 * db)
        })
        .sum::<Sample>()
        / dns.len() as Sample;
    10.0 * mean_power.log10()
}

#[test]
fn test_denoised_composite_end_to_end() {
    init_logging();

    let pipeline = CompositePipeline::new(config()).unwrap();
    let products = pipeline.run(&archive()).unwrap();

    for image in [&products.original, &products.denoised, &products.gap_filled] {
        assert_eq!(image.band_names(), vec!["HH", "HV"]);
        assert_eq!(image.dims(), Some((4, 4)));
        assert_eq!(image.domain(), Domain::Decibel);
    }

    // spatially flat stack: despeckling is the identity, so both composites
    // agree with the hand-computed power-domain mean
    let expected_hh = expected_power_mean_db(&[100.0, 200.0, 300.0]);
    let expected_hv = expected_power_mean_db(&[50.0, 100.0, 150.0]);

    let original_hh = products.original.band("HH").unwrap();
    let denoised_hh = products.denoised.band("HH").unwrap();
    let denoised_hv = products.denoised.band("HV").unwrap();

    assert!((original_hh[[1, 1]] - expected_hh).abs() < 1e-9);
    assert!((denoised_hh[[1, 1]] - expected_hh).abs() < 1e-9);
    assert!((denoised_hv[[2, 3]] - expected_hv).abs() < 1e-9);
}

#[test]
fn test_masked_pixel_propagates_and_gets_gap_filled() {
    init_logging();

    let pipeline = CompositePipeline::new(config()).unwrap();
    let products = pipeline.run(&archive()).unwrap();

    // the layover pixel is missing in every acquisition, so it is missing
    // in both composites
    assert!(products.original.band("HH").unwrap()[[0, 0]].is_nan());
    assert!(products.denoised.band("HH").unwrap()[[0, 0]].is_nan());

    // gap filling recovers it from its (uniform) neighborhood
    let expected_hh = expected_power_mean_db(&[100.0, 200.0, 300.0]);
    let filled = products.gap_filled.band("HH").unwrap();
    assert!((filled[[0, 0]] - expected_hh).abs() < 1e-9);

    // valid pixels are untouched by gap filling
    let denoised = products.denoised.band("HH").unwrap();
    assert_eq!(filled[[1, 1]], denoised[[1, 1]]);
}

#[test]
fn test_compositing_averages_in_power_not_decibel() {
    init_logging();

    // -10 dB and -12 dB, composited in the power domain
    let db_stack = ImageCollection::from_images(vec![
        RasterImage::new(ImageMetadata::new("a", date(2015, 3, 1)), Domain::Decibel)
            .with_band("HH", Array2::from_elem((2, 2), -10.0))
            .unwrap(),
        RasterImage::new(ImageMetadata::new("b", date(2015, 6, 1)), Domain::Decibel)
            .with_band("HH", Array2::from_elem((2, 2), -12.0))
            .unwrap(),
    ]);

    let power = db_stack.map(decibel_to_power).unwrap();
    let compositor = TemporalCompositor::new(
        date(2015, 1, 1),
        date(2016, 1, 1),
        Reducer::Mean,
        vec!["HH".to_string()],
    )
    .unwrap();
    let composite = power_to_decibel(&compositor.composite(&power).unwrap()).unwrap();

    let expected = 10.0
        * ((Sample::powf(10.0, -1.0) + Sample::powf(10.0, -1.2)) / 2.0).log10();
    let got = composite.band("HH").unwrap()[[0, 0]];

    assert!((got - expected).abs() < 1e-9);
    // and it is not the arithmetic mean of the decibel values
    assert!((got - (-11.0)).abs() > 0.05);
}

#[test]
fn test_missing_qa_band_fails_before_any_reduction() {
    init_logging();

    let bare = RasterImage::new(
        ImageMetadata::new("bare", date(2015, 3, 1)),
        Domain::DigitalNumber,
    )
    .with_band("HH", Array2::from_elem((4, 4), 100.0))
    .unwrap()
    .with_band("HV", Array2::from_elem((4, 4), 50.0))
    .unwrap();
    let archive = ImageCollection::from_images(vec![bare]);

    let pipeline = CompositePipeline::new(config()).unwrap();
    assert!(matches!(
        pipeline.run(&archive),
        Err(StackError::SchemaMismatch(_))
    ));
}

#[test]
fn test_empty_archive_fails_fast() {
    init_logging();

    let pipeline = CompositePipeline::new(config()).unwrap();
    assert!(matches!(
        pipeline.run(&ImageCollection::default()),
        Err(StackError::EmptyCollection(_))
    ));
}
