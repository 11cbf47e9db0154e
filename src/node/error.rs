use thiserror::Error;

/// Reason why a compression configuration was rejected by `Config::validate`.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// The threshold lies outside the legal range of the selected metric.
	#[error("threshold {threshold} out of range [{min}, {max}] for {metric}")]
	ThresholdOutOfRange {
		metric: &'static str,
		threshold: f64,
		min: f64,
		max: f64,
	},
	/// The threshold is NaN or infinite.
	#[error("threshold must be a finite number")]
	NonFiniteThreshold,
	/// The metric name or code didn't match any known metric.
	#[error("unknown error metric: {0}")]
	UnknownMetric(String),
}

/// Reason why a quadtree or its frames couldn't be written out.
#[derive(Debug, Error)]
pub enum ExportError {
	/// The tree was built from a zero-sized image; there is nothing to encode.
	#[error("cannot encode a zero-sized image")]
	EmptyImage,
	/// The image is larger than the GIF format allows (65535 per side).
	#[error("image dimensions {width}x{height} exceed the GIF limit")]
	TooLarge { width: u32, height: u32 },
	/// Encoding failed inside the `image` crate.
	#[error("encode error: {0}")]
	Image(#[from] image::ImageError),
	/// The destination couldn't be created or written.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}
