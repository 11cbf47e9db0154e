use image::error::ImageError;

use quadtree_compress::{Config, ExportError, GifOptions, MetricKind, PixelGrid, Quadtree};

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Helper function for `main`.
fn error_exit(msg: &str, code: i32) -> ! {
	eprintln!("{}", msg);
	std::process::exit(code)
}

/// Exit code and message for an error raised by the `image` crate.
fn image_error_exit(e: &ImageError) -> ! {
	let (msg, code) = match e {
		ImageError::Decoding(_) => ("Invalid image data", 4),
		ImageError::Limits(_) => ("Computation limits exceeded", 5),
		ImageError::IoError(_) => ("File could not be read or written", 3),
		ImageError::Unsupported(_) => ("Unsupported image format", 4),
		_ => ("An error occurred", 10)
	};
	error_exit(&format!("{}: {}", msg, e), code)
}

/// Default output path: the input path with `_compressed` added to the stem.
fn default_output(input: &str) -> String {
	let path = Path::new(input);
	let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
	let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("png");
	path.with_file_name(format!("{}_compressed.{}", stem, ext))
		.to_string_lossy()
		.into_owned()
}

/// Saves the reconstruction, writing JPEG at quality 90 and anything else
/// in the format implied by the extension.
fn save_output(grid: &PixelGrid, path: &str) -> Result<(), ImageError> {
	let is_jpeg = Path::new(path).extension()
		.and_then(|e| e.to_str())
		.map(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
		.unwrap_or(false);
	if is_jpeg {
		let out = BufWriter::new(File::create(path).map_err(ImageError::IoError)?);
		image::codecs::jpeg::JpegEncoder::new_with_quality(out, 90).encode_image(grid)
	} else {
		grid.save(path)
	}
}

/// Compresses an already decoded image and saves the reconstruction,
/// returning the tree and the time spent doing so.
fn compress_and_save(
	config: Config,
	source: &PixelGrid,
	output_path: &str
) -> Result<(Quadtree, Duration), ImageError> {
	let start = Instant::now();
	let mut tree = Quadtree::new(config);
	tree.compress(source);
	save_output(&tree.reconstruct(), output_path)?;
	Ok((tree, start.elapsed()))
}

fn file_size(path: &str) -> u64 {
	std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// `clap`-based CLI for compressing images with a quadtree.
///
/// May exit process with status code if there are errors:
///
/// 1: `clap` error
///
/// 2: invalid arguments
///
/// 3: file I/O issues
///
/// 4: invalid image data
///
/// 5: computation limits exceeded
///
/// 10: other, potentially unknown error
fn main() {
	let clap_matches = clap::App::new("quadtree_compress")
		.version("0.1.0")
		.author("vkcz")
		.about("Approximates an image with flat-colored quadtree blocks.")
		.arg_from_usage("-m, --metric=[METRIC] 'Error metric: variance, mad, max-range, entropy or ssim (or 1-5); defaults to variance'")
		.arg_from_usage("-t, --threshold=[N] 'Homogeneity threshold, in the range of the chosen metric; defaults to 10'")
		.arg_from_usage("-b, --min-block=[N] 'Minimum block area in pixels; defaults to 4'")
		.arg_from_usage("-g, --gif=[PATH] 'Also write the coarse-to-fine refinement as an animated GIF'")
		.arg_from_usage("--delay=[MS] 'Delay between GIF frames in milliseconds; defaults to 100'")
		.arg_from_usage("-v, --verbose... 'Log progress to stderr; repeat for more detail'")
		.arg_from_usage("<INPUT> 'Path to input image'")
		.arg_from_usage("[OUTPUT] 'Path to output image; defaults to INPUT with `_compressed` added to the name'")
		.get_matches();

	let level = match clap_matches.occurrences_of("verbose") {
		0 => Level::WARN,
		1 => Level::INFO,
		_ => Level::DEBUG,
	};
	let subscriber = FmtSubscriber::builder()
		.with_max_level(level)
		.with_writer(std::io::stderr)
		.finish();
	if tracing::subscriber::set_global_default(subscriber).is_err() {
		eprintln!("Could not install logger");
	}

	let metric: MetricKind = match clap_matches.value_of("metric").unwrap_or("variance").parse() {
		Ok(m) => m,
		Err(e) => error_exit(&e.to_string(), 2)
	};
	let (threshold, min_block_area, delay_ms) = (
		match clap_matches.value_of("threshold").unwrap_or("10").parse::<f64>() {
			Ok(n) => n,
			Err(_) => error_exit("Non-numeric value for threshold", 2)
		},
		match clap_matches.value_of("min-block").unwrap_or("4").parse::<u64>() {
			Ok(n) => n,
			Err(_) => error_exit("Minimum block area must be a non-negative integer", 2)
		},
		match clap_matches.value_of("delay").unwrap_or("100").parse::<u32>() {
			Ok(n) => n,
			Err(_) => error_exit("Non-numeric value for delay", 2)
		}
	);
	let config = Config::new(threshold, min_block_area, metric);
	if let Err(e) = config.validate() {
		error_exit(&e.to_string(), 2)
	}

	// `INPUT` is a required argument, so clap has already rejected its absence.
	let input_path = clap_matches.value_of("INPUT").unwrap_or_default();
	let output_path = clap_matches.value_of("OUTPUT")
		.map(str::to_string)
		.unwrap_or_else(|| default_output(input_path));

	let source = match image::open(input_path) {
		Ok(i) => i.into_rgb8(),
		Err(e) => image_error_exit(&e)
	};
	info!(path = input_path, width = source.width(), height = source.height(), "loaded image");

	// Decoding is not part of the reported processing time.
	let (tree, elapsed) = match compress_and_save(config, &source, &output_path) {
		Ok(r) => r,
		Err(e) => image_error_exit(&e)
	};
	info!(path = %output_path, "saved reconstruction");

	if let Some(gif_path) = clap_matches.value_of("gif") {
		let options = GifOptions { delay_ms, ..Default::default() };
		match tree.save_gif(gif_path, &options) {
			Ok(frames) => info!(path = gif_path, frames, "saved refinement animation"),
			Err(ExportError::Image(e)) => image_error_exit(&e),
			Err(ExportError::Io(_)) => error_exit("Could not write GIF output", 3),
			Err(e) => error_exit(&e.to_string(), 4)
		}
	}

	let original_size = file_size(input_path);
	let compressed_size = file_size(&output_path);
	let ratio = if original_size == 0 {
		0.
	} else {
		100. * (1. - compressed_size as f64 / original_size as f64)
	};

	println!("COMPRESSION RESULTS:");
	println!("-------------------");
	println!("Original size      : {} bytes", original_size);
	println!("Compressed size    : {} bytes", compressed_size);
	println!("Compression ratio  : {:.2}%", ratio);
	println!("Error metric       : {}", metric);
	println!("Error threshold    : {:.2}", threshold);
	println!("Min block size     : {} pixels", min_block_area);
	println!("Processing time    : {} ms", elapsed.as_millis());
	println!("Quadtree nodes     : {}", tree.count_nodes());
	println!("Leaf nodes         : {}", tree.count_leaves());
	println!("Tree depth         : {}", tree.depth());
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_output_keeps_extension() {
		let out = default_output("pics/cat.jpg");
		assert!(out.ends_with("cat_compressed.jpg"), "got {}", out);
	}

	#[test]
	fn compress_and_save_writes_reconstruction() {
		let source = image::RgbImage::from_fn(8, 8, |x, _| image::Rgb([(x * 30) as u8, 0, 0]));
		let path = std::env::temp_dir().join("quadtree_compress_cli.png");
		let path = path.to_string_lossy().into_owned();
		let config = Config::new(0., 1, MetricKind::Variance);
		let (tree, _elapsed) = compress_and_save(config, &source, &path).unwrap();
		let saved = image::open(&path).unwrap().into_rgb8();
		assert_eq!(saved, tree.reconstruct());
		assert_eq!(saved, source);
		let _ = std::fs::remove_file(&path);
	}
}
