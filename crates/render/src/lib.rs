//! Redaction rendering
//!
//! Paints over the boxes of the selected tokens, either with a solid color or
//! with a gaussian blur of the underlying pixels. The output is a new image;
//! the input is never modified.

mod style;

pub use style::{
    parse_hex_color, RedactMode, RedactStyle, DEFAULT_BLUR_SIGMA, DEFAULT_COLOR, DEFAULT_PADDING,
    MAX_BLUR_SIGMA,
};

use image::{imageops, DynamicImage, ImageFormat, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use scrub_core::{BBox, Token};
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("invalid image: {0}")]
    Image(#[from] image::ImageError),

    #[error("invalid color: {0}")]
    InvalidColor(String),
}

/// Pixel rectangle clamped to the image: `(x, y, width, height)`.
type PixelRect = (u32, u32, u32, u32);

pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, RenderError> {
    Ok(image::load_from_memory(bytes)?)
}

pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, RenderError> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Redacts `tokens[i]` for every `i` in `indices`.
///
/// Negative or out-of-range indices are ignored, as are boxes that fall
/// entirely outside the image.
pub fn redact_image(
    img: &DynamicImage,
    tokens: &[Token],
    indices: &[i64],
    style: &RedactStyle,
) -> Result<RgbaImage, RenderError> {
    let mut canvas = img.to_rgba8();
    let (width, height) = canvas.dimensions();

    let fill = match style.mode {
        RedactMode::Fill => Some(style.fill_color()?),
        RedactMode::Blur => None,
    };

    let mut painted = 0usize;
    let mut skipped = 0usize;

    for &index in indices {
        let token = match usize::try_from(index).ok().and_then(|i| tokens.get(i)) {
            Some(token) => token,
            None => {
                skipped += 1;
                continue;
            }
        };

        let bbox = token.bbox.expand(style.padding as f32);
        let Some((x, y, w, h)) = pixel_rect(&bbox, width, height) else {
            skipped += 1;
            continue;
        };

        match fill {
            Some(color) => {
                let rect = Rect::at(x as i32, y as i32).of_size(w, h);
                draw_filled_rect_mut(&mut canvas, rect, color);
            }
            None => {
                let region = imageops::crop_imm(&canvas, x, y, w, h).to_image();
                let blurred = imageops::blur(&region, style.effective_blur_sigma());
                imageops::replace(&mut canvas, &blurred, x as i64, y as i64);
            }
        }
        painted += 1;
    }

    log::info!(
        "[Render] {}x{} image, mode={:?}: {} regions painted, {} skipped",
        width,
        height,
        style.mode,
        painted,
        skipped
    );
    Ok(canvas)
}

/// Converts a float box to whole pixels, rounding outward and clamping to the
/// image. Returns `None` for empty or non-finite boxes.
fn pixel_rect(bbox: &BBox, width: u32, height: u32) -> Option<PixelRect> {
    let coords = [bbox.x0(), bbox.y0(), bbox.x1(), bbox.y1()];
    if coords.iter().any(|c| !c.is_finite()) {
        return None;
    }

    let x0 = bbox.x0().floor().clamp(0.0, width as f32) as u32;
    let y0 = bbox.y0().floor().clamp(0.0, height as f32) as u32;
    let x1 = bbox.x1().ceil().clamp(0.0, width as f32) as u32;
    let y1 = bbox.y1().ceil().clamp(0.0, height as f32) as u32;

    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0, y0, x1 - x0, y1 - y0))
}
