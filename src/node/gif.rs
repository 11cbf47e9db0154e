use std::io::Write;

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, Frame};
use tracing::debug;

use super::error::ExportError;
use super::PixelGrid;

/// Settings for animated GIF export.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GifOptions {
	/// Time each frame stays on screen, in milliseconds.
	pub delay_ms: u32,
	/// Whether the animation loops forever or plays once.
	pub repeat: bool,
	/// Color quantization speed, 1 (best) to 30 (fastest).
	pub speed: i32,
}

impl Default for GifOptions {
	fn default() -> Self {
		GifOptions { delay_ms: 100, repeat: true, speed: 10 }
	}
}

/// Largest side length a GIF logical screen can describe.
const GIF_MAX_SIDE: u32 = u16::MAX as u32;

/// Rejects frame sizes a GIF can't describe.
pub fn check_dimensions(width: u32, height: u32) -> Result<(), ExportError> {
	if width == 0 || height == 0 {
		return Err(ExportError::EmptyImage);
	}
	if width > GIF_MAX_SIDE || height > GIF_MAX_SIDE {
		return Err(ExportError::TooLarge { width, height });
	}
	Ok(())
}

/// Encodes a sequence of equally sized frames as an animated GIF.
///
/// Frames are quantized to 256 colors each by the encoder. Zero-sized
/// frames can't be represented and are rejected, as are frames wider or
/// taller than 65535 pixels.
pub fn encode_gif<W, I>(frames: I, writer: W, options: &GifOptions) -> Result<usize, ExportError>
where
	W: Write,
	I: IntoIterator<Item = PixelGrid>,
{
	let mut frames = frames.into_iter().peekable();
	match frames.peek() {
		Some(first) => check_dimensions(first.width(), first.height())?,
		None => return Err(ExportError::EmptyImage),
	}

	let mut encoder = GifEncoder::new_with_speed(writer, options.speed.clamp(1, 30));
	// A loop count of 0 means forever; playing once needs no looping block at all.
	if options.repeat {
		encoder.set_repeat(Repeat::Infinite)?;
	}
	let delay = Delay::from_numer_denom_ms(options.delay_ms, 1);
	let mut written = 0;
	encoder.encode_frames(frames.map(|grid| {
		written += 1;
		Frame::from_parts(DynamicImage::ImageRgb8(grid).into_rgba8(), 0, 0, delay)
	}))?;
	debug!(frames = written, delay_ms = options.delay_ms, "encoded animated GIF");
	Ok(written)
}
