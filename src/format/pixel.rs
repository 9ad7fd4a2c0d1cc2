use crate::foundation::error::{TilestackError, TilestackResult};
use crate::foundation::math::{limit, round_half_away};

/// Numeric interpretation of each band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    Integer,
    Float,
}

impl PixelFormat {
    pub fn code(self) -> u32 {
        match self {
            Self::Integer => 0,
            Self::Float => 1,
        }
    }

    pub fn from_code(code: u32) -> TilestackResult<Self> {
        match code {
            0 => Ok(Self::Integer),
            1 => Ok(Self::Float),
            other => Err(TilestackError::format(format!(
                "unsupported pixel format code {other}"
            ))),
        }
    }

    /// Parse the CLI spelling (`int`/`integer`/`float`).
    pub fn parse(s: &str) -> TilestackResult<Self> {
        match s {
            "int" | "integer" | "uint" => Ok(Self::Integer),
            "float" | "fp" => Ok(Self::Float),
            other => Err(TilestackError::usage(format!(
                "unknown pixel format '{other}' (expected int or float)"
            ))),
        }
    }
}

/// Per-frame payload encoding in a `.ts2` container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionFormat {
    None,
    Zlib,
}

impl CompressionFormat {
    pub fn code(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Zlib => 1,
        }
    }

    pub fn from_code(code: u32) -> TilestackResult<Self> {
        match code {
            0 => Ok(Self::None),
            1 => Ok(Self::Zlib),
            other => Err(TilestackError::format(format!(
                "unsupported compression format code {other}"
            ))),
        }
    }

    pub fn parse(s: &str) -> TilestackResult<Self> {
        match s {
            "none" => Ok(Self::None),
            "zlib" => Ok(Self::Zlib),
            other => Err(TilestackError::usage(format!(
                "unknown compression '{other}' (expected none or zlib)"
            ))),
        }
    }
}

/// Native storage type of one band, resolved from `(bits_per_band, pixel_format)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BandType {
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl BandType {
    fn resolve(bits_per_band: u32, format: PixelFormat) -> Option<Self> {
        match (bits_per_band, format) {
            (8, PixelFormat::Integer) => Some(Self::U8),
            (16, PixelFormat::Integer) => Some(Self::U16),
            (32, PixelFormat::Integer) => Some(Self::U32),
            (64, PixelFormat::Integer) => Some(Self::U64),
            (32, PixelFormat::Float) => Some(Self::F32),
            (64, PixelFormat::Float) => Some(Self::F64),
            _ => None,
        }
    }
}

/// Layout of a single pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PixelInfo {
    pub bands_per_pixel: u32,
    pub bits_per_band: u32,
    pub pixel_format: PixelFormat,
}

impl PixelInfo {
    /// Build and validate a pixel layout.
    pub fn new(
        bands_per_pixel: u32,
        bits_per_band: u32,
        pixel_format: PixelFormat,
    ) -> TilestackResult<Self> {
        let info = Self {
            bands_per_pixel,
            bits_per_band,
            pixel_format,
        };
        info.validate()?;
        Ok(info)
    }

    pub fn validate(&self) -> TilestackResult<()> {
        if self.bands_per_pixel == 0 {
            return Err(TilestackError::format("bands_per_pixel must be > 0"));
        }
        // Every supported band width is a whole number of bytes.
        self.band_type()?;
        self.checked_bytes_per_pixel()?;
        Ok(())
    }

    fn checked_bytes_per_pixel(&self) -> TilestackResult<u32> {
        self.bands_per_pixel
            .checked_mul(self.bits_per_band / 8)
            .ok_or_else(|| {
                TilestackError::format(format!(
                    "pixel of {} bands x {} bits is too large",
                    self.bands_per_pixel, self.bits_per_band
                ))
            })
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.bands_per_pixel as usize * (self.bits_per_band / 8) as usize
    }

    pub fn bytes_per_band(&self) -> usize {
        (self.bits_per_band / 8) as usize
    }

    /// Largest representable band value (`2^bits - 1` for integers, `1.0` for floats).
    pub fn max_value(&self) -> f64 {
        match self.pixel_format {
            PixelFormat::Integer => 2f64.powi(self.bits_per_band as i32) - 1.0,
            PixelFormat::Float => 1.0,
        }
    }

    fn band_type(&self) -> TilestackResult<BandType> {
        BandType::resolve(self.bits_per_band, self.pixel_format).ok_or_else(|| {
            TilestackError::format(format!(
                "unsupported pixel type {}:{:?}",
                self.bits_per_band, self.pixel_format
            ))
        })
    }

    /// Read band `band` of the pixel starting at `pixel[0]`.
    pub fn get_band(&self, pixel: &[u8], band: usize) -> TilestackResult<f64> {
        let ty = self.band_type()?;
        let n = self.bytes_per_band();
        let bytes = pixel.get(band * n..(band + 1) * n).ok_or_else(|| {
            TilestackError::geometry(format!("band {band} lies outside the pixel buffer"))
        })?;
        Ok(decode_band(ty, bytes))
    }

    /// Write band `band`, clamping and rounding for integer types.
    pub fn set_band(&self, pixel: &mut [u8], band: usize, value: f64) -> TilestackResult<()> {
        let ty = self.band_type()?;
        let n = self.bytes_per_band();
        let bytes = pixel.get_mut(band * n..(band + 1) * n).ok_or_else(|| {
            TilestackError::geometry(format!("band {band} lies outside the pixel buffer"))
        })?;
        encode_band(ty, bytes, value);
        Ok(())
    }

    /// Decode every band of every pixel in `src` into `dst` (row-major, band-interleaved).
    pub fn decode_into(&self, src: &[u8], dst: &mut Vec<f64>) -> TilestackResult<()> {
        let ty = self.band_type()?;
        let n = self.bytes_per_band();
        dst.clear();
        dst.extend(src.chunks_exact(n).map(|b| decode_band(ty, b)));
        Ok(())
    }

    /// Encode interleaved band values into `dst`; `values.len()` must match `dst`.
    pub fn encode_from(&self, values: &[f64], dst: &mut [u8]) -> TilestackResult<()> {
        let ty = self.band_type()?;
        let n = self.bytes_per_band();
        if values.len() * n != dst.len() {
            return Err(TilestackError::geometry(format!(
                "encode_from got {} values for a {}-byte buffer",
                values.len(),
                dst.len()
            )));
        }
        for (&v, out) in values.iter().zip(dst.chunks_exact_mut(n)) {
            encode_band(ty, out, v);
        }
        Ok(())
    }
}

fn decode_band(ty: BandType, b: &[u8]) -> f64 {
    match ty {
        BandType::U8 => f64::from(b[0]),
        BandType::U16 => f64::from(u16::from_le_bytes([b[0], b[1]])),
        BandType::U32 => f64::from(u32::from_le_bytes([b[0], b[1], b[2], b[3]])),
        BandType::U64 => u64::from_le_bytes(le8(b)) as f64,
        BandType::F32 => f64::from(f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
        BandType::F64 => f64::from_le_bytes(le8(b)),
    }
}

fn encode_band(ty: BandType, out: &mut [u8], v: f64) {
    match ty {
        BandType::U8 => out[0] = round_half_away(limit(v, 0.0, 255.0)) as u8,
        BandType::U16 => {
            let q = round_half_away(limit(v, 0.0, 65535.0)) as u16;
            out.copy_from_slice(&q.to_le_bytes());
        }
        BandType::U32 => {
            let q = round_half_away(limit(v, 0.0, 4_294_967_295.0)) as u32;
            out.copy_from_slice(&q.to_le_bytes());
        }
        BandType::U64 => {
            // `as u64` saturates at 2^64-1, which is the clamp we want.
            let q = round_half_away(v.max(0.0)) as u64;
            out.copy_from_slice(&q.to_le_bytes());
        }
        BandType::F32 => out.copy_from_slice(&(v as f32).to_le_bytes()),
        BandType::F64 => out.copy_from_slice(&v.to_le_bytes()),
    }
}

fn le8(b: &[u8]) -> [u8; 8] {
    [b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]
}

/// Geometry and encoding shared by every frame of a tilestack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TilestackInfo {
    #[serde(flatten)]
    pub pixel: PixelInfo,
    pub nframes: usize,
    pub tile_width: u32,
    pub tile_height: u32,
    pub compression_format: CompressionFormat,
}

impl TilestackInfo {
    pub fn bytes_per_pixel(&self) -> usize {
        self.pixel.bytes_per_pixel()
    }

    pub fn bytes_per_frame(&self) -> usize {
        self.bytes_per_pixel() * self.tile_width as usize * self.tile_height as usize
    }

    /// [`Self::bytes_per_frame`], or a format error when it doesn't fit in memory.
    pub fn checked_bytes_per_frame(&self) -> TilestackResult<usize> {
        u64::from(self.pixel.checked_bytes_per_pixel()?)
            .checked_mul(u64::from(self.tile_width))
            .and_then(|n| n.checked_mul(u64::from(self.tile_height)))
            .and_then(|n| usize::try_from(n).ok())
            .filter(|&n| n <= isize::MAX as usize)
            .ok_or_else(|| {
                TilestackError::format(format!(
                    "{}x{} frame of {}-byte pixels is too large",
                    self.tile_width,
                    self.tile_height,
                    self.bytes_per_pixel()
                ))
            })
    }

    /// Same layout with a different frame count.
    pub fn with_nframes(mut self, nframes: usize) -> Self {
        self.nframes = nframes;
        self
    }

    /// True when both stacks have the same tile size and pixel layout.
    pub fn same_frame_geometry(&self, other: &TilestackInfo) -> bool {
        self.tile_width == other.tile_width
            && self.tile_height == other.tile_height
            && self.pixel == other.pixel
    }
}

#[cfg(test)]
#[path = "../../tests/unit/format/pixel.rs"]
mod tests;
