//! Output image formats and everything that hangs off the choice of one.
//!
//! The format is resolved once, when a request is planned, into an
//! [`ImageFormat`] variant. Each variant knows its file extension, the
//! renderer flag that selects it, whether only the cairo renderer can
//! produce it, whether it can carry transparency, and how to split a
//! renderer's stdout into records.

use crate::error::{DemuxError, Pdf2ImageError};
use crate::pipeline::demux;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Image encodings the renderers can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Raw colour (binary PPM, `P6`). Default.
    #[default]
    Ppm,
    /// Raw grayscale (binary PGM, `P5`).
    Pgm,
    /// JPEG.
    Jpeg,
    /// PNG.
    Png,
    /// TIFF. File output only.
    Tiff,
}

impl ImageFormat {
    /// Extension poppler gives output files of this format.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Ppm => "ppm",
            ImageFormat::Pgm => "pgm",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Tiff => "tif",
        }
    }

    /// Renderer switch selecting this format; raw formats are the default
    /// output and need none.
    pub fn renderer_flag(self) -> Option<&'static str> {
        match self {
            ImageFormat::Ppm | ImageFormat::Pgm => None,
            ImageFormat::Jpeg => Some("-jpeg"),
            ImageFormat::Png => Some("-png"),
            ImageFormat::Tiff => Some("-tiff"),
        }
    }

    /// Only `pdftocairo` produces this format.
    pub fn requires_cairo(self) -> bool {
        matches!(self, ImageFormat::Tiff)
    }

    /// Format has an alpha channel the renderer can leave transparent.
    pub fn supports_transparency(self) -> bool {
        matches!(self, ImageFormat::Png | ImageFormat::Tiff)
    }

    /// Raw PNM output (`pdftoppm` default, unavailable in `pdftocairo`).
    pub fn is_raw(self) -> bool {
        matches!(self, ImageFormat::Ppm | ImageFormat::Pgm)
    }

    /// Apply the grayscale switch: raw colour becomes raw grayscale.
    pub fn with_grayscale(self, grayscale: bool) -> Self {
        match self {
            ImageFormat::Ppm if grayscale => ImageFormat::Pgm,
            other => other,
        }
    }

    /// Decoder hint for the `image` crate.
    pub fn image_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Ppm | ImageFormat::Pgm => image::ImageFormat::Pnm,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Tiff => image::ImageFormat::Tiff,
        }
    }

    /// Split a concatenated stdout buffer into per-image byte ranges.
    pub fn demux(self, data: &[u8]) -> Result<Vec<Range<usize>>, DemuxError> {
        match self {
            ImageFormat::Ppm => demux::split_pnm(data, 3),
            ImageFormat::Pgm => demux::split_pnm(data, 1),
            ImageFormat::Jpeg => demux::split_jpeg(data),
            ImageFormat::Png => demux::split_png(data),
            ImageFormat::Tiff => Err(DemuxError::Unsupported { format: "tiff" }),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageFormat::Ppm => "ppm",
            ImageFormat::Pgm => "pgm",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Tiff => "tiff",
        };
        f.write_str(name)
    }
}

impl FromStr for ImageFormat {
    type Err = Pdf2ImageError;

    /// Accepts `ppm pgm jpeg jpg png tif tiff`, any case, with an optional
    /// leading dot.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let name = lower.strip_prefix('.').unwrap_or(&lower);
        match name {
            "ppm" => Ok(ImageFormat::Ppm),
            "pgm" => Ok(ImageFormat::Pgm),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            "tif" | "tiff" => Ok(ImageFormat::Tiff),
            other => Err(Pdf2ImageError::InvalidConfig(format!(
                "Unknown output format '{other}' (expected ppm, pgm, jpeg, png or tiff)"
            ))),
        }
    }
}
