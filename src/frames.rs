use crate::error::{VitalError, VitalResult};
use image::RgbImage;
use log::debug;
use std::path::{Path, PathBuf};

/// One decoded raster frame. Frames are memory-heavy; callers reduce a
/// frame to its ROI intensity and drop it before decoding the next one.
#[derive(Debug)]
pub struct Frame {
    pixels: RgbImage,
}

impl Frame {
    pub fn new(pixels: RgbImage) -> Self {
        Frame { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Per-pixel channel read. Callers stay within `width()`/`height()`.
    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let p = self.pixels.get_pixel(x, y);
        (p[0], p[1], p[2])
    }
}

/// Decode-by-index access to a finalized recording.
pub trait FrameSource {
    /// Total frame count of the recording.
    fn frame_count(&self) -> usize;

    /// Decode the frame at `index`. A failure here is skippable by the
    /// caller; it does not invalidate the rest of the recording.
    fn frame_at(&self, index: usize) -> VitalResult<Frame>;
}

/// A recording addressed as a directory of decodable still frames, in
/// filename order (the capture collaborator finalizes recordings as
/// numbered stills).
pub struct FrameDirSource {
    files: Vec<PathBuf>,
}

impl FrameDirSource {
    pub fn open(dir: &Path) -> VitalResult<Self> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| VitalError::FrameSource(format!("{}: {}", dir.display(), e)))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("png") | Some("jpg") | Some("jpeg") | Some("bmp")
                )
            })
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(VitalError::FrameSource(format!(
                "No decodable frames in {}",
                dir.display()
            )));
        }

        debug!("Opened frame source with {} frames from {}", files.len(), dir.display());
        Ok(FrameDirSource { files })
    }
}

impl FrameSource for FrameDirSource {
    fn frame_count(&self) -> usize {
        self.files.len()
    }

    fn frame_at(&self, index: usize) -> VitalResult<Frame> {
        let path = self
            .files
            .get(index)
            .ok_or(VitalError::FrameIndexOutOfRange(index))?;
        let img = image::open(path)
            .map_err(|e| VitalError::FrameSource(format!("{}: {}", path.display(), e)))?;
        Ok(Frame::new(img.to_rgb8()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_frame_pixel_reads() {
        let img = RgbImage::from_fn(4, 4, |x, y| Rgb([x as u8, y as u8, 7]));
        let frame = Frame::new(img);
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.pixel(2, 3), (2, 3, 7));
    }

    #[test]
    fn test_open_missing_dir_errors() {
        let result = FrameDirSource::open(Path::new("/nonexistent/recording"));
        assert!(matches!(result, Err(VitalError::FrameSource(_))));
    }
}
