// THEORY:
// The `Frame` module holds the raster unit the whole loop operates on. A `Frame`
// is a "dumb" data container: an RGB image at the fixed working resolution of
// 640x480. Whatever the capture device delivers is resized into that contract
// once, here, so every later stage can rely on the frame center being (320, 240).
//
// A frame is owned by exactly one loop iteration and dropped once the cycle ends.
//
// `FrameSource` is the seam between the engine and a capture device. The engine
// only ever asks for the next frame; a source that cannot deliver one (device
// unplugged, end of a recorded file) answers `None` and the loop winds down.

pub mod frame {
    use image::imageops::{self, FilterType};
    use image::RgbImage;

    /// Working width of every frame, in pixels.
    pub const FRAME_WIDTH: u32 = 640;
    /// Working height of every frame, in pixels.
    pub const FRAME_HEIGHT: u32 = 480;

    /// A fixed-resolution RGB frame.
    #[derive(Debug, Clone)]
    pub struct Frame {
        image: RgbImage,
    }

    impl Frame {
        /// Wraps a captured image, resizing it to 640x480 when its native
        /// resolution differs. Bilinear filtering is used for the resize.
        pub fn normalize(image: RgbImage) -> Self {
            if image.width() == FRAME_WIDTH && image.height() == FRAME_HEIGHT {
                return Self { image };
            }
            let resized = imageops::resize(&image, FRAME_WIDTH, FRAME_HEIGHT, FilterType::Triangle);
            Self { image: resized }
        }

        /// Builds a frame from a tightly packed RGB24 buffer.
        /// Returns `None` if the buffer length does not match the dimensions.
        pub fn from_rgb_bytes(width: u32, height: u32, bytes: Vec<u8>) -> Option<Self> {
            RgbImage::from_raw(width, height, bytes).map(Self::normalize)
        }

        pub fn width(&self) -> u32 {
            self.image.width()
        }

        pub fn height(&self) -> u32 {
            self.image.height()
        }

        pub fn image(&self) -> &RgbImage {
            &self.image
        }

        /// The packed RGB24 bytes, row-major.
        pub fn as_raw(&self) -> &[u8] {
            self.image.as_raw()
        }
    }

    /// A producer of frames, typically a camera or a recorded video.
    pub trait FrameSource {
        /// Blocks until the next frame is available.
        /// `None` means the stream is exhausted and the loop should stop.
        fn next_frame(&mut self) -> Option<Frame>;
    }

    impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
        fn next_frame(&mut self) -> Option<Frame> {
            (**self).next_frame()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::frame::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn native_resolution_is_kept() {
        let image = RgbImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, Rgb([10, 20, 30]));
        let frame = Frame::normalize(image);
        assert_eq!((frame.width(), frame.height()), (640, 480));
        assert_eq!(frame.image().get_pixel(5, 5), &Rgb([10, 20, 30]));
    }

    #[test]
    fn larger_capture_is_resized() {
        let image = RgbImage::from_pixel(1280, 720, Rgb([200, 200, 200]));
        let frame = Frame::normalize(image);
        assert_eq!((frame.width(), frame.height()), (640, 480));
        // A uniform image stays uniform through bilinear resampling.
        assert_eq!(frame.image().get_pixel(320, 240), &Rgb([200, 200, 200]));
    }

    #[test]
    fn smaller_capture_is_upscaled() {
        let frame = Frame::normalize(RgbImage::new(320, 240));
        assert_eq!((frame.width(), frame.height()), (640, 480));
        assert_eq!(frame.as_raw().len(), 640 * 480 * 3);
    }

    #[test]
    fn mismatched_buffer_is_rejected() {
        assert!(Frame::from_rgb_bytes(4, 4, vec![0u8; 10]).is_none());
        let frame = Frame::from_rgb_bytes(4, 4, vec![0u8; 4 * 4 * 3]).expect("valid buffer");
        assert_eq!(frame.width(), FRAME_WIDTH);
    }
}
