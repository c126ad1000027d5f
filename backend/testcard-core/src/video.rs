use crate::api::SCREEN_WIDTH;
use lynxgo_common::frontend::PixelFormat;

// Row pitch of the virtual image the view scrolls over; prime so rows don't line up
const ROM_PITCH: usize = 251;

#[derive(Debug, Clone, Copy)]
pub(crate) struct LineParams {
    pub scroll_x: u32,
    pub scroll_y: u32,
    pub inverted: bool,
    pub pixel_format: PixelFormat,
}

pub(crate) fn render_line(rom: &[u8], line: u32, params: LineParams, out: &mut [u16]) {
    let row = (line + params.scroll_y) as usize;
    for (x, pixel) in out.iter_mut().take(SCREEN_WIDTH as usize).enumerate() {
        let column = x + params.scroll_x as usize;
        let byte = rom[(row * ROM_PITCH + column) % rom.len()];

        let color = byte_to_color(byte, params.pixel_format);
        *pixel = if params.inverted { invert(color, params.pixel_format) } else { color };
    }
}

fn byte_to_color(byte: u8, pixel_format: PixelFormat) -> u16 {
    let r: u16 = (byte >> 3).into();
    let g: u16 = (byte.rotate_left(3) >> 2).into();
    let b: u16 = ((!byte) >> 3).into();

    match pixel_format {
        PixelFormat::Rgb565 => (r << 11) | (g << 5) | b,
        PixelFormat::Rgb555 => (r << 10) | ((g >> 1) << 5) | b,
    }
}

fn invert(color: u16, pixel_format: PixelFormat) -> u16 {
    match pixel_format {
        PixelFormat::Rgb565 => !color,
        PixelFormat::Rgb555 => !color & 0x7FFF,
    }
}
