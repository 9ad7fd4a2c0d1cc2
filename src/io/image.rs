//! Image files in and out of tilestacks.

use std::{
    ffi::OsString,
    io::Write as _,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use image::{ColorType, DynamicImage, ImageFormat};

use crate::{
    format::pixel::{CompressionFormat, PixelFormat, PixelInfo, TilestackInfo},
    foundation::error::{TilestackError, TilestackResult},
    io::fs::{filename_sans_suffix, make_directory_and_parents, write_atomically},
    pyramid::{
        stackset::{StacksetDims, compute_tile_nlevels},
        tile_address::TileAddress,
    },
    stack::{SharedTilestack, resident::ResidentTilestack},
};

/// A decoded image in tilestack byte order (little-endian bands, interleaved).
#[derive(Clone, Debug, PartialEq)]
pub struct ImageTile {
    pub width: u32,
    pub height: u32,
    pub pixel: PixelInfo,
    pub pixels: Vec<u8>,
}

fn le_u16(values: Vec<u16>) -> Vec<u8> {
    values.into_iter().flat_map(u16::to_le_bytes).collect()
}

fn le_f32(values: Vec<f32>) -> Vec<u8> {
    values.into_iter().flat_map(f32::to_le_bytes).collect()
}

impl ImageTile {
    /// Decode `path`, keeping its band count and depth where the codec exposes them.
    pub fn open(path: &Path) -> TilestackResult<Self> {
        let img = image::open(path)
            .map_err(|e| TilestackError::resource(format!("can't read image {}: {e}", path.display())))?;
        Ok(Self::from_dynamic(img))
    }

    pub fn from_dynamic(img: DynamicImage) -> Self {
        use PixelFormat::{Float, Integer};

        let (width, height) = (img.width(), img.height());
        let (bands, bits, format, pixels) = match img {
            DynamicImage::ImageLuma8(b) => (1, 8, Integer, b.into_raw()),
            DynamicImage::ImageLumaA8(b) => (2, 8, Integer, b.into_raw()),
            DynamicImage::ImageRgb8(b) => (3, 8, Integer, b.into_raw()),
            DynamicImage::ImageRgba8(b) => (4, 8, Integer, b.into_raw()),
            DynamicImage::ImageLuma16(b) => (1, 16, Integer, le_u16(b.into_raw())),
            DynamicImage::ImageLumaA16(b) => (2, 16, Integer, le_u16(b.into_raw())),
            DynamicImage::ImageRgb16(b) => (3, 16, Integer, le_u16(b.into_raw())),
            DynamicImage::ImageRgba16(b) => (4, 16, Integer, le_u16(b.into_raw())),
            DynamicImage::ImageRgb32F(b) => (3, 32, Float, le_f32(b.into_raw())),
            DynamicImage::ImageRgba32F(b) => (4, 32, Float, le_f32(b.into_raw())),
            other => (4, 8, Integer, other.into_rgba8().into_raw()),
        };
        Self {
            width,
            height,
            pixel: PixelInfo {
                bands_per_pixel: bands,
                bits_per_band: bits,
                pixel_format: format,
            },
            pixels,
        }
    }
}

fn color_type(pixel: PixelInfo) -> TilestackResult<ColorType> {
    let ct = match (pixel.pixel_format, pixel.bits_per_band, pixel.bands_per_pixel) {
        (PixelFormat::Integer, 8, 1) => ColorType::L8,
        (PixelFormat::Integer, 8, 2) => ColorType::La8,
        (PixelFormat::Integer, 8, 3) => ColorType::Rgb8,
        (PixelFormat::Integer, 8, 4) => ColorType::Rgba8,
        (PixelFormat::Integer, 16, 1) => ColorType::L16,
        (PixelFormat::Integer, 16, 2) => ColorType::La16,
        (PixelFormat::Integer, 16, 3) => ColorType::Rgb16,
        (PixelFormat::Integer, 16, 4) => ColorType::Rgba16,
        (format, bits, bands) => {
            return Err(TilestackError::format(format!(
                "can't write {bands}-band {bits}-bit {format:?} pixels as an image"
            )));
        }
    };
    Ok(ct)
}

/// Write interleaved tilestack pixels as an image file of `format`.
pub fn write_image(
    path: &Path,
    format: ImageFormat,
    width: u32,
    height: u32,
    pixel: PixelInfo,
    pixels: &[u8],
) -> TilestackResult<()> {
    let ct = color_type(pixel)?;
    let native;
    let buf = if pixel.bits_per_band == 16 {
        native = pixels
            .chunks_exact(2)
            .flat_map(|b| u16::from_le_bytes([b[0], b[1]]).to_ne_bytes())
            .collect::<Vec<u8>>();
        native.as_slice()
    } else {
        pixels
    };
    image::save_buffer_with_format(path, buf, width, height, ct, format)
        .with_context(|| format!("write image '{}'", path.display()))?;
    Ok(())
}

/// Resident stack with one frame per image; every image must share the first one's geometry.
#[tracing::instrument(skip_all, fields(ntiles = paths.len()))]
pub fn load_tiles<P: AsRef<Path>>(paths: &[P]) -> TilestackResult<ResidentTilestack> {
    let Some(first) = paths.first() else {
        return Err(TilestackError::usage("--loadtiles must have at least one tile"));
    };
    let tile0 = ImageTile::open(first.as_ref())?;
    let info = TilestackInfo {
        pixel: tile0.pixel,
        nframes: paths.len(),
        tile_width: tile0.width,
        tile_height: tile0.height,
        compression_format: CompressionFormat::None,
    };
    let mut dest = ResidentTilestack::new(info)?;
    dest.frame_pixels_mut(0)?.copy_from_slice(&tile0.pixels);
    for (frame, path) in paths.iter().enumerate().skip(1) {
        let path = path.as_ref();
        let tile = ImageTile::open(path)?;
        if tile.width != info.tile_width || tile.height != info.tile_height || tile.pixel != info.pixel {
            return Err(TilestackError::geometry(format!(
                "{} is {}x{} with {:?}, expected {}x{} with {:?}",
                path.display(),
                tile.width,
                tile.height,
                tile.pixel,
                info.tile_width,
                info.tile_height,
                info.pixel
            )));
        }
        dest.frame_pixels_mut(frame)?.copy_from_slice(&tile.pixels);
    }
    Ok(dest)
}

/// `(bits, format)` for a raw sample type name.
pub fn parse_raw_dtype(dtype: &str) -> TilestackResult<(u32, PixelFormat)> {
    match dtype {
        "u8" => Ok((8, PixelFormat::Integer)),
        "u16" => Ok((16, PixelFormat::Integer)),
        "u32" => Ok((32, PixelFormat::Integer)),
        "u64" => Ok((64, PixelFormat::Integer)),
        "f32" => Ok((32, PixelFormat::Float)),
        "f64" => Ok((64, PixelFormat::Float)),
        other => Err(TilestackError::usage(format!(
            "unknown raw dtype '{other}' (expected u8, u16, u32, u64, f32 or f64)"
        ))),
    }
}

/// Headerless little-endian frames of `width x height x channels` samples.
pub fn load_raw(
    path: &Path,
    width: u32,
    height: u32,
    dtype: &str,
    channels: u32,
) -> TilestackResult<ResidentTilestack> {
    let (bits, format) = parse_raw_dtype(dtype)?;
    let pixel = PixelInfo::new(channels, bits, format)?;
    let bytes = std::fs::read(path)
        .map_err(|e| TilestackError::resource(format!("can't read {}: {e}", path.display())))?;
    let frame_bytes = pixel.bytes_per_pixel() * width as usize * height as usize;
    if frame_bytes == 0 || bytes.is_empty() || !bytes.len().is_multiple_of(frame_bytes) {
        return Err(TilestackError::format(format!(
            "{} is {} bytes, not a whole number of {width}x{height}x{channels} {dtype} frames",
            path.display(),
            bytes.len()
        )));
    }
    let info = TilestackInfo {
        pixel,
        nframes: bytes.len() / frame_bytes,
        tile_width: width,
        tile_height: height,
        compression_format: CompressionFormat::None,
    };
    ResidentTilestack::from_pixels(info, bytes)
}

/// Write each frame of `src` as `NNNN.png` in a directory named after `dest` (without its
/// suffix), plus an index page next to it. Returns the page's path.
#[tracing::instrument(skip(src))]
pub fn write_html(src: &SharedTilestack, dest: &Path) -> TilestackResult<PathBuf> {
    let dir = filename_sans_suffix(dest);
    make_directory_and_parents(&dir)?;
    let mut html_name = OsString::from(dir.as_os_str());
    html_name.push(".html");
    let html_path = PathBuf::from(html_name);
    let dir_name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut html = String::from(
        "<html>\n<head>\n<style type=\"text/css\">\ndiv {display:inline-block; margin:5px}\n</style>\n</head>\n<body>\n",
    );
    let info = src.borrow().info();
    for frame in 0..info.nframes {
        let image_name = format!("{frame:04}.png");
        tracing::info!(image = %image_name, "writing");
        let mut stack = src.borrow_mut();
        let pixels = stack.frame_pixels(frame)?;
        write_atomically(&dir.join(&image_name), false, |tmp| {
            write_image(tmp, ImageFormat::Png, info.tile_width, info.tile_height, info.pixel, pixels)
        })?;
        html.push_str(&format!("<div><img src=\"{dir_name}/{image_name}\"><br>{frame:04}</div>\n"));
    }
    html.push_str("</body>\n</html>\n");

    write_atomically(&html_path, false, |tmp| {
        let mut f = std::fs::File::create(tmp)
            .with_context(|| format!("create '{}'", tmp.display()))?;
        f.write_all(html.as_bytes())?;
        Ok(())
    })?;
    tracing::info!(path = %html_path.display(), "created");
    Ok(html_path)
}

/// Cut `src` into `tilesize` tiles at the finest level of a new stackset at `dest`.
///
/// Does nothing if `dest` already exists.
#[tracing::instrument]
pub fn image2tiles(dest: &Path, format: &str, src: &Path, tilesize: u32) -> TilestackResult<()> {
    if dest.exists() {
        tracing::info!(dest = %dest.display(), "already exists, skipping");
        return Ok(());
    }
    if tilesize == 0 {
        return Err(TilestackError::usage("tilesize must be positive"));
    }
    let image_format = ImageFormat::from_extension(format)
        .ok_or_else(|| TilestackError::usage(format!("unknown image format '{format}'")))?;
    let img = ImageTile::open(src)?;
    tracing::info!(src = %src.display(), width = img.width, height = img.height, "opened");

    let nlevels = compute_tile_nlevels(img.width, img.height, tilesize, tilesize);
    make_directory_and_parents(dest)?;
    let dims = StacksetDims {
        width: img.width,
        height: img.height,
        tile_width: tilesize,
        tile_height: tilesize,
    };
    let json = serde_json::to_string(&dims)?;
    std::fs::write(dest.join("r.json"), json)
        .with_context(|| format!("write '{}'", dest.join("r.json").display()))?;

    let bpp = img.pixel.bytes_per_pixel();
    let row_bytes = bpp * img.width as usize;
    let tile_row = bpp * tilesize as usize;
    let mut tile = vec![0u8; tile_row * tilesize as usize];
    for top in (0..img.height).step_by(tilesize as usize) {
        let nrows = (img.height - top).min(tilesize) as usize;
        for left in (0..img.width).step_by(tilesize as usize) {
            let ncols = (img.width - left).min(tilesize) as usize;
            tile.fill(0);
            for y in 0..nrows {
                let from = (top as usize + y) * row_bytes + left as usize * bpp;
                tile[y * tile_row..y * tile_row + ncols * bpp]
                    .copy_from_slice(&img.pixels[from..from + ncols * bpp]);
            }
            let addr = TileAddress::new(
                nlevels - 1,
                i64::from(left / tilesize),
                i64::from(top / tilesize),
            );
            let path = dest.join(format!("{}.{format}", addr.path()?));
            write_atomically(&path, true, |tmp| {
                write_image(tmp, image_format, tilesize, tilesize, img.pixel, &tile)
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/io/image.rs"]
mod tests;
