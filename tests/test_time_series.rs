use chrono::{DateTime, TimeZone, Utc};
use ndarray::Array2;

use sarstack::core::{to_gamma0, MovingAverageJoiner, ANGLE_BAND};
use sarstack::{Domain, ImageCollection, ImageMetadata, RasterImage, Sample};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

/// A Sentinel-1-like decibel scene with an incidence angle annotation band.
fn scene(index: &str, t: DateTime<Utc>, vv: Sample, vh: Sample) -> RasterImage {
    RasterImage::new(
        ImageMetadata::new(index, t).with_property("instrumentMode", "IW"),
        Domain::Decibel,
    )
    .with_band("VV", Array2::from_elem((2, 2), vv))
    .unwrap()
    .with_band("VH", Array2::from_elem((2, 2), vh))
    .unwrap()
    .with_band(ANGLE_BAND, Array2::from_elem((2, 2), 60.0))
    .unwrap()
}

/// Correction for a 60 degree incidence angle: -10*log10(cos 60) dB.
fn gamma_offset() -> Sample {
    -10.0 * (0.5 as Sample).log10()
}

#[test]
fn test_gamma0_then_moving_average() {
    init_logging();

    let stack = ImageCollection::from_images(vec![
        scene("s0", date(2018, 1, 1), -10.0, -16.0),
        scene("s1", date(2018, 1, 15), -14.0, -18.0),
        scene("s2", date(2018, 3, 1), -20.0, -26.0),
    ]);

    let gamma = stack
        .filter_metadata("instrumentMode", |v| v == "IW")
        .map(to_gamma0)
        .unwrap();
    for image in gamma.images() {
        assert_eq!(image.band_names(), vec!["VV", "VH"]);
    }

    let joined = MovingAverageJoiner::new(30).unwrap().apply(&gamma).unwrap();
    assert_eq!(joined.len(), 3);

    let c = gamma_offset();

    // the January scenes are 14 days apart, well inside the 30-day window;
    // the March scene is 45 days from its nearest neighbor and only
    // matches itself
    let vv_mean = |i: usize| joined.images()[i].band("VV_mean").unwrap()[[0, 0]];
    assert!((vv_mean(0) - (-12.0 + c)).abs() < 1e-9);
    assert!((vv_mean(1) - (-12.0 + c)).abs() < 1e-9);
    assert!((vv_mean(2) - (-20.0 + c)).abs() < 1e-9);

    // originals ride along next to the windowed averages
    let s0 = &joined.images()[0];
    assert_eq!(s0.band_names(), vec!["VV", "VH", "VV_mean", "VH_mean"]);
    assert!((s0.band("VV").unwrap()[[0, 0]] - (-10.0 + c)).abs() < 1e-9);
    assert!((s0.band("VH_mean").unwrap()[[0, 0]] - (-17.0 + c)).abs() < 1e-9);
}

#[test]
fn test_match_sets_are_symmetric() {
    init_logging();

    // if B is within dt of A, A is within dt of B: both windowed averages
    // blend the same pair
    let stack = ImageCollection::from_images(vec![
        scene("a", date(2018, 5, 1), -10.0, -20.0),
        scene("b", date(2018, 5, 31), -12.0, -22.0),
    ]);
    let gamma = stack.map(to_gamma0).unwrap();
    let joined = MovingAverageJoiner::new(30).unwrap().apply(&gamma).unwrap();

    let c = gamma_offset();
    let a = joined.images()[0].band("VV_mean").unwrap()[[0, 0]];
    let b = joined.images()[1].band("VV_mean").unwrap()[[0, 0]];
    assert!((a - (-11.0 + c)).abs() < 1e-9);
    assert!((a - b).abs() < 1e-12);
}
