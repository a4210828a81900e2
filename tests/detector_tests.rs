//! Behaviour of the three detectors on synthetic frames.

mod common;

use image::RgbImage;

use common::{dark_blobs_on_light, missing_model, white_blobs_on_black};
use contour_cam::adapters::standard_detectors;
use contour_cam::adapters::vision::{ContourCanny, ContourOtsu};
use contour_cam::application::ports::Detector;
use contour_cam::domain::{detection::Algorithm, frame::Frame};

#[test]
fn black_frames_count_zero_for_every_algorithm() {
    let bank = standard_detectors(missing_model());
    let frame = Frame::new(1, RgbImage::new(64, 48));

    for algorithm in Algorithm::ALL {
        let eval = bank.evaluate(algorithm, &frame);
        assert_eq!(eval.count, 0, "{} counted something", algorithm);
        assert_eq!(eval.image.dimensions(), (64, 48));
    }

    let learned = bank.evaluate(Algorithm::Learned, &frame);
    assert!(learned.error.is_some(), "missing model should be reported");
}

#[test]
fn detectors_leave_the_input_untouched() {
    let original = white_blobs_on_black();
    let frame = Frame::new(1, original.clone());

    let annotated = ContourCanny.detect(&frame).unwrap();
    assert_eq!(*frame.image(), original);
    assert_ne!(annotated.image, original);

    ContourOtsu.detect(&frame).unwrap();
    assert_eq!(*frame.image(), original);
}

#[test]
fn otsu_counts_three_dark_blobs() {
    let frame = Frame::new(1, dark_blobs_on_light());
    let annotated = ContourOtsu.detect(&frame).unwrap();
    assert_eq!(annotated.count, 3);
    assert_eq!(annotated.image.dimensions(), frame.image().dimensions());
}

#[test]
fn canny_counts_three_white_blobs() {
    let frame = Frame::new(1, white_blobs_on_black());
    let count = ContourCanny.detect(&frame).unwrap().count;
    assert!((3..=6).contains(&count), "count {}", count);
}

#[test]
fn uniform_light_frames_have_nothing_to_count() {
    let frame = Frame::new(1, RgbImage::from_pixel(40, 30, image::Rgb([200, 200, 200])));
    assert_eq!(ContourOtsu.detect(&frame).unwrap().count, 0);
    assert_eq!(ContourCanny.detect(&frame).unwrap().count, 0);
}
