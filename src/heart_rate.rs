use crate::frames::{Frame, FrameSource};
use log::{error, info, warn};

/// First frame index considered in a recording.
pub const FIRST_FRAME_INDEX: usize = 10;

/// Stride between sampled frame indices.
pub const FRAME_STEP: usize = 15;

/// Usable frame count is clamped to this bound.
pub const FRAME_COUNT_CLAMP: usize = 425;

/// Below this many successfully decoded frames the whole computation is
/// abandoned and the rate reported as 0.
pub const MIN_DECODED_FRAMES: usize = 5;

/// Region of interest: pixel rows and columns 350–449 inclusive, the
/// 100x100 window assumed to be covered by the fingertip.
pub const ROI_START: u32 = 350;
pub const ROI_END: u32 = 450;

/// Moving-average window over the per-frame intensity sums.
pub const SMOOTHING_WINDOW: usize = 5;

/// Smoothed-intensity rise that counts as one cardiac peak.
pub const INTENSITY_PEAK_THRESHOLD: i64 = 3500;

/// Peaks over the ~4-time-unit recording, extrapolated to beats/min.
pub const BEATS_TIME_BASE: f64 = 60.0;
pub const RECORDING_TIME_UNITS: f64 = 4.0;

/// Frame indices sampled from a recording: from `FIRST_FRAME_INDEX` up to
/// the clamped frame count, in steps of `FRAME_STEP` (at most 28 indices).
pub fn sampled_indices(frame_count: usize) -> Vec<usize> {
    let bound = frame_count.min(FRAME_COUNT_CLAMP);
    (FIRST_FRAME_INDEX..bound).step_by(FRAME_STEP).collect()
}

/// Combined r+g+b intensity over the fixed ROI, one sum per frame.
pub fn roi_intensity(frame: &Frame) -> i64 {
    let mut sum = 0i64;
    for y in ROI_START..ROI_END {
        for x in ROI_START..ROI_END {
            let (r, g, b) = frame.pixel(x, y);
            sum += r as i64 + g as i64 + b as i64;
        }
    }
    sum
}

/// Sliding average, window `SMOOTHING_WINDOW`, step 1, each windowed mean
/// truncated to an integer. Output is `input - window + 1` long; shorter
/// inputs smooth to nothing.
pub fn smooth(series: &[i64]) -> Vec<i64> {
    if series.len() < SMOOTHING_WINDOW {
        return Vec::new();
    }
    series
        .windows(SMOOTHING_WINDOW)
        .map(|w| (w.iter().sum::<i64>() as f64 / SMOOTHING_WINDOW as f64) as i64)
        .collect()
}

/// Adjacent-pair rising transitions exceeding the intensity threshold.
pub fn count_rising_peaks(series: &[i64]) -> usize {
    series
        .windows(2)
        .filter(|pair| pair[1] - pair[0] > INTENSITY_PEAK_THRESHOLD)
        .count()
}

pub fn rate_from_peaks(peaks: usize) -> i32 {
    ((peaks as f64 * BEATS_TIME_BASE) / RECORDING_TIME_UNITS).round() as i32
}

/// Estimate beats/min from a finalized recording.
///
/// Individual decode failures are skipped; frames smaller than the ROI are
/// treated the same way. Each decoded frame is reduced to its ROI sum and
/// dropped before the next index is touched. Any outcome short of
/// `MIN_DECODED_FRAMES` usable frames yields 0 rather than an error; the
/// caller's flow continues either way.
pub fn estimate<S: FrameSource>(source: &S) -> i32 {
    let frame_count = source.frame_count();
    let mut intensities: Vec<i64> = Vec::new();

    for index in sampled_indices(frame_count) {
        match source.frame_at(index) {
            Ok(frame) => {
                if frame.width() < ROI_END || frame.height() < ROI_END {
                    warn!(
                        "Frame {} is {}x{}, smaller than the ROI, skipping",
                        index,
                        frame.width(),
                        frame.height()
                    );
                    continue;
                }
                intensities.push(roi_intensity(&frame));
            }
            Err(e) => {
                warn!("Skipping frame {}: {}", index, e);
            }
        }
    }

    if intensities.len() < MIN_DECODED_FRAMES {
        error!(
            "Not enough frames for heart rate calculation ({} decoded)",
            intensities.len()
        );
        return 0;
    }

    let smoothed = smooth(&intensities);
    let peaks = count_rising_peaks(&smoothed);
    let rate = rate_from_peaks(peaks);
    info!(
        "Heart rate: {} bpm ({} peaks over {} frames)",
        rate,
        peaks,
        intensities.len()
    );
    rate
}

/// Run the frame analysis off the interactive thread. This is the one
/// offloaded background step; the caller suspends until it completes and
/// resumes with the rate. Task failure resolves to 0, never a panic in the
/// calling flow.
pub async fn analyze<S>(source: S) -> i32
where
    S: FrameSource + Send + 'static,
{
    match tokio::task::spawn_blocking(move || estimate(&source)).await {
        Ok(rate) => rate,
        Err(e) => {
            error!("Heart-rate analysis task failed: {}", e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{VitalError, VitalResult};
    use image::{Rgb, RgbImage};
    use std::collections::HashMap;

    /// Source whose sampled frames are uniform rasters; indices without an
    /// entry fail to decode.
    struct TestSource {
        count: usize,
        values: HashMap<usize, u8>,
        side: u32,
    }

    impl TestSource {
        fn uniform(count: usize, indexed_values: &[(usize, u8)]) -> Self {
            TestSource {
                count,
                values: indexed_values.iter().copied().collect(),
                side: 500,
            }
        }
    }

    impl FrameSource for TestSource {
        fn frame_count(&self) -> usize {
            self.count
        }

        fn frame_at(&self, index: usize) -> VitalResult<Frame> {
            let v = self
                .values
                .get(&index)
                .ok_or_else(|| VitalError::FrameSource(format!("frame {} undecodable", index)))?;
            let img = RgbImage::from_pixel(self.side, self.side, Rgb([*v, *v, *v]));
            Ok(Frame::new(img))
        }
    }

    #[test]
    fn test_sampled_indices_for_425_frames() {
        let indices = sampled_indices(425);
        assert_eq!(indices.len(), 28);
        assert_eq!(indices.first(), Some(&10));
        assert_eq!(indices.last(), Some(&415));
        assert!(indices.iter().all(|i| (i - 10) % 15 == 0 && *i < 425));
    }

    #[test]
    fn test_sampled_indices_clamp_and_short_sources() {
        // Longer recordings clamp to the 425-frame bound.
        assert_eq!(sampled_indices(10_000), sampled_indices(425));
        // Nothing below the first index.
        assert!(sampled_indices(9).is_empty());
        assert_eq!(sampled_indices(11), vec![10]);
    }

    #[test]
    fn test_roi_covers_exactly_10000_pixels() {
        // ROI pixels contribute 1+2+3, everything outside is saturated; a
        // sum of exactly 60000 means the bounds touched only rows/cols
        // 350..=449.
        let img = RgbImage::from_fn(500, 500, |x, y| {
            if (ROI_START..ROI_END).contains(&x) && (ROI_START..ROI_END).contains(&y) {
                Rgb([1, 2, 3])
            } else {
                Rgb([255, 255, 255])
            }
        });
        assert_eq!(roi_intensity(&Frame::new(img)), 6 * 10_000);
    }

    #[test]
    fn test_smoothing_and_peak_count() {
        // MA-5 of this length-9 series is [0, 4000, 6000, 10000, 10000]:
        // diffs 4000, 2000, 4000, 0: exactly two qualifying rises.
        let series = [0, 0, 0, 0, 0, 20_000, 10_000, 20_000, 0];
        let smoothed = smooth(&series);
        assert_eq!(smoothed, vec![0, 4000, 6000, 10_000, 10_000]);
        assert_eq!(count_rising_peaks(&smoothed), 2);
        assert_eq!(rate_from_peaks(2), 30);
    }

    #[test]
    fn test_smooth_truncates_windowed_means() {
        // (1+2+3+4+5)/5 = 3, (2+3+4+5+7)/5 = 4.2 -> 4
        assert_eq!(smooth(&[1, 2, 3, 4, 5, 7]), vec![3, 4]);
        assert!(smooth(&[1, 2, 3, 4]).is_empty());
    }

    #[test]
    fn test_too_few_decodable_frames_yields_zero() {
        // 70 frames gives sampled indices {10, 25, 40, 55}: four decoded
        // frames, below the minimum.
        let source = TestSource::uniform(70, &[(10, 1), (25, 1), (40, 1), (55, 1)]);
        assert_eq!(estimate(&source), 0);
    }

    #[test]
    fn test_all_decodes_failing_yields_zero() {
        let source = TestSource::uniform(425, &[]);
        assert_eq!(estimate(&source), 0);
    }

    #[test]
    fn test_decode_failures_are_skipped_not_fatal() {
        // Index 55 fails to decode; the remaining five frames still carry
        // the computation (flat series, zero peaks).
        let source = TestSource::uniform(
            100,
            &[(10, 1), (25, 1), (40, 1), (70, 1), (85, 1), (100, 1)],
        );
        assert_eq!(estimate(&source), 0);
    }

    #[test]
    fn test_estimate_end_to_end_with_pulsing_frames() {
        // Nine sampled frames (indices 10..=130) with uniform pixel values
        // 0,0,0,0,0,2,1,2,0: ROI sums are value * 30000, MA-5 is
        // [0, 12000, 18000, 30000, 30000] and three rises exceed 3500.
        let source = TestSource::uniform(
            145,
            &[
                (10, 0),
                (25, 0),
                (40, 0),
                (55, 0),
                (70, 0),
                (85, 2),
                (100, 1),
                (115, 2),
                (130, 0),
            ],
        );
        assert_eq!(estimate(&source), rate_from_peaks(3));
        assert_eq!(estimate(&source), 45);
    }

    #[test]
    fn test_undersized_frames_are_skipped() {
        let source = TestSource {
            count: 425,
            values: (0..30).map(|k| (10 + 15 * k, 1u8)).collect(),
            side: 100, // smaller than the ROI
        };
        assert_eq!(estimate(&source), 0);
    }

    #[tokio::test]
    async fn test_analyze_runs_off_thread() {
        let source = TestSource::uniform(70, &[(10, 1)]);
        assert_eq!(analyze(source).await, 0);
    }
}
