pub mod onset_detector;

pub use onset_detector::OnsetDetector;
