//! Converts native frames into the 3x upscaled, rotated image the display shows
//!
//! Each source pixel becomes a 3x3 block whose rightmost column is drawn at half intensity,
//! approximating the gaps between LCD pixels.

use crate::device::{DisplaySize, Presenter, Rect, Rotation, Surface};
use lynxgo_common::frontend::FrameSize;

pub const SCALE: u32 = 3;

// Panel scans out in portrait; frames are shown in landscape
const PRESENT_ROTATION: Rotation = Rotation::Degrees270;

/// Halve each channel of an RGB565 pixel.
#[inline]
#[must_use]
pub fn dim_rgb565(pixel: u16) -> u16 {
    let r = (pixel >> 11) >> 1;
    let g = ((pixel >> 5) & 0x3F) >> 1;
    let b = (pixel & 0x1F) >> 1;
    (r << 11) | (g << 5) | b
}

/// Write the 3x scaled version of `frame_buffer` into `surface`.
///
/// `surface` must be exactly `3 * width` by `3 * height`.
pub fn scale_frame(
    frame_buffer: &[u16],
    stride: usize,
    frame_size: FrameSize,
    surface: &mut Surface,
) {
    let width = frame_size.width as usize;
    let dest_row_len = SCALE as usize * width;
    debug_assert_eq!(surface.width() as usize, dest_row_len);
    debug_assert_eq!(surface.height(), SCALE * frame_size.height);

    let source_rows = frame_buffer.chunks(stride).take(frame_size.height as usize);
    let dest_rows = surface.pixels_mut().chunks_exact_mut(SCALE as usize * dest_row_len);

    for (source_row, dest_block) in source_rows.zip(dest_rows) {
        let (first_row, repeated_rows) = dest_block.split_at_mut(dest_row_len);

        for (&pixel, dest) in source_row[..width].iter().zip(first_row.chunks_exact_mut(3)) {
            dest[0] = pixel;
            dest[1] = pixel;
            dest[2] = dim_rgb565(pixel);
        }

        for row in repeated_rows.chunks_exact_mut(dest_row_len) {
            row.copy_from_slice(first_row);
        }
    }
}

/// Length of the scaled frame along the display's long axis, preserving the native aspect ratio
/// and never exceeding the display.
#[must_use]
pub fn presentation_width(display: DisplaySize, native: FrameSize) -> u32 {
    let aspect = native.width as f32 / native.height as f32;
    let width = (display.height as f32 * aspect) as u32;
    width.min(display.width)
}

/// Destination rectangle in the panel's portrait scan-out frame, centered along the long axis.
#[must_use]
pub fn destination_rect(display: DisplaySize, native: FrameSize) -> Rect {
    let width = presentation_width(display, native);
    let y = (display.width / 2) as i32 - (width / 2) as i32;
    Rect::new(0, y, display.height, width)
}

pub struct PresentationPipeline<P> {
    presenter: P,
    surface: Surface,
    frame_size: FrameSize,
    src: Rect,
    dst: Rect,
}

impl<P: Presenter> PresentationPipeline<P> {
    pub fn new(presenter: P, frame_size: FrameSize) -> Self {
        let display = presenter.display_size();
        let surface = Surface::new(SCALE * frame_size.width, SCALE * frame_size.height);
        let src = surface.full_rect();
        let dst = destination_rect(display, frame_size);

        log::info!(
            "Display {display}, native frame {frame_size}, presenting {} -> {dst}",
            surface.full_rect()
        );

        Self { presenter, surface, frame_size, src, dst }
    }

    /// # Errors
    ///
    /// Propagates presenter errors.
    pub fn present(&mut self, frame_buffer: &[u16], stride: usize) -> Result<(), P::Err> {
        scale_frame(frame_buffer, stride, self.frame_size, &mut self.surface);
        self.presenter.post(&self.surface, self.src, self.dst, PRESENT_ROTATION)
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn destination(&self) -> Rect {
        self.dst
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessPresenter;

    const LYNX: FrameSize = FrameSize { width: 160, height: 102 };
    const GO2: DisplaySize = DisplaySize { width: 480, height: 320 };

    #[test]
    fn dim_halves_channels() {
        assert_eq!(dim_rgb565(0xFFFF), 0b01111_011111_01111);
        assert_eq!(dim_rgb565(0x0000), 0x0000);
        // Low bits are dropped, not carried into the next channel
        assert_eq!(dim_rgb565(0b00001_000001_00001), 0x0000);
    }

    #[test]
    fn each_pixel_becomes_dimmed_block() {
        let frame_size = FrameSize { width: 2, height: 2 };
        let frame_buffer = [0xF800, 0x07E0, 0x001F, 0xFFFF];
        let mut surface = Surface::new(6, 6);

        scale_frame(&frame_buffer, 2, frame_size, &mut surface);

        for (i, &pixel) in frame_buffer.iter().enumerate() {
            let block_x = 3 * (i as u32 % 2);
            let block_y = 3 * (i as u32 / 2);
            for dy in 0..3 {
                assert_eq!(surface.pixel(block_x, block_y + dy), pixel);
                assert_eq!(surface.pixel(block_x + 1, block_y + dy), pixel);
                assert_eq!(surface.pixel(block_x + 2, block_y + dy), dim_rgb565(pixel));
            }
        }
    }

    #[test]
    fn stride_padding_is_skipped() {
        let frame_size = FrameSize { width: 1, height: 2 };
        let frame_buffer = [0x1111, 0xDEAD, 0x2222, 0xDEAD];
        let mut surface = Surface::new(3, 6);

        scale_frame(&frame_buffer, 2, frame_size, &mut surface);

        assert_eq!(surface.pixel(0, 0), 0x1111);
        assert_eq!(surface.pixel(0, 3), 0x2222);
        assert!(!surface.pixels().contains(&0xDEAD));
    }

    #[test]
    fn width_follows_aspect_ratio() {
        // 320 * 160 / 102 = 501.96 -> clamped to the display
        assert_eq!(presentation_width(GO2, LYNX), 480);

        // 200 * 160 / 102 = 313.7
        let wide = DisplaySize { width: 640, height: 200 };
        assert_eq!(presentation_width(wide, LYNX), 313);
    }

    #[test]
    fn width_never_exceeds_display() {
        for height in [1, 50, 102, 204, 306, 320, 480] {
            for width in [1, 100, 320, 480, 640] {
                let display = DisplaySize { width, height };
                let expected = (height as f32 * (160.0 / 102.0)) as u32;
                let actual = presentation_width(display, LYNX);

                assert!(actual <= width);
                if expected <= width {
                    assert_eq!(actual, expected);
                }
            }
        }
    }

    #[test]
    fn destination_is_centered_on_long_axis() {
        assert_eq!(destination_rect(GO2, LYNX), Rect::new(0, 0, 320, 480));

        let wide = DisplaySize { width: 800, height: 200 };
        // 400 - 313 / 2
        assert_eq!(destination_rect(wide, LYNX), Rect::new(0, 244, 200, 313));
    }

    #[test]
    fn present_posts_full_surface_rotated() {
        let mut pipeline = PresentationPipeline::new(HeadlessPresenter::new(GO2), LYNX);
        let frame_buffer = vec![0x1234; LYNX.len() as usize];

        pipeline.present(&frame_buffer, LYNX.width as usize).unwrap();

        let presenter = pipeline.presenter();
        assert_eq!(presenter.posts(), 1);
        let post = presenter.last_post().unwrap();
        assert_eq!(post.src, Rect::new(0, 0, 480, 306));
        assert_eq!(post.dst, pipeline.destination());
        assert_eq!(post.rotation, Rotation::Degrees270);
        assert_eq!(post.surface.pixel(479, 305), dim_rgb565(0x1234));
    }
}
