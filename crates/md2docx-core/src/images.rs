//! Local image lookup and probing

use md2docx_docx::theme::EMU_PER_INCH;
use md2docx_docx::{EmbeddedImage, ImageFormat};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Screen resolution used to turn pixels into physical size
const DPI: u64 = 96;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("remote image not fetched: {0}")]
    Remote(String),
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("unsupported image format")]
    Unsupported,
}

impl ImageError {
    /// True when there is no file to embed, as opposed to a file that failed
    pub fn is_missing(&self) -> bool {
        matches!(self, ImageError::NotFound(_) | ImageError::Remote(_))
    }
}

/// Resolve an image source against the document directory
pub fn resolve_source(src: &str, base_dir: &Path) -> Result<PathBuf, ImageError> {
    let lower = src.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Err(ImageError::Remote(src.to_string()));
    }

    let path = Path::new(src.strip_prefix("file://").unwrap_or(src));
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    };

    if path.is_file() {
        Ok(path)
    } else {
        Err(ImageError::NotFound(path))
    }
}

/// Scale pixel dimensions to EMU, capped at `max_width_emu`
pub fn display_size(width_px: u32, height_px: u32, max_width_emu: u64) -> (u64, u64) {
    let per_px = EMU_PER_INCH / DPI;
    let width = u64::from(width_px.max(1)) * per_px;
    let height = u64::from(height_px.max(1)) * per_px;
    if width <= max_width_emu {
        (width, height)
    } else {
        (max_width_emu, height * max_width_emu / width)
    }
}

/// Scale pixel dimensions to exactly `width_emu`, keeping the aspect ratio
pub fn fit_width(width_px: u32, height_px: u32, width_emu: u64) -> (u64, u64) {
    let height = width_emu * u64::from(height_px.max(1)) / u64::from(width_px.max(1));
    (width_emu, height)
}

/// Detect format and pixel size of encoded image bytes
pub fn probe(data: &[u8]) -> Result<(ImageFormat, u32, u32), ImageError> {
    let format = match image::guess_format(data)? {
        image::ImageFormat::Png => ImageFormat::Png,
        image::ImageFormat::Jpeg => ImageFormat::Jpeg,
        image::ImageFormat::Gif => ImageFormat::Gif,
        image::ImageFormat::Bmp => ImageFormat::Bmp,
        _ => return Err(ImageError::Unsupported),
    };
    let (width, height) = image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()?
        .into_dimensions()?;
    Ok((format, width, height))
}

/// Read and probe a local image for embedding
pub fn load_image(
    path: &Path,
    max_width_emu: u64,
    description: &str,
) -> Result<EmbeddedImage, ImageError> {
    let data = std::fs::read(path)?;
    let (format, width, height) = probe(&data)?;
    let (width_emu, height_emu) = display_size(width, height, max_width_emu);
    log::debug!(
        "embedding {} ({}x{} px, {:?})",
        path.display(),
        width,
        height,
        format
    );
    Ok(EmbeddedImage {
        data,
        format,
        width_emu,
        height_emu,
        description: description.to_string(),
    })
}
