//! Print-resolution and EXIF handling at the container level.
//!
//! The `image` crate decodes pixels and ICC profiles but drops the physical
//! metadata a print workflow depends on. This module reads it straight from
//! the encoded bytes and splices it back into freshly encoded output.
//!
//! Reading:
//! - JPEG: APP0 JFIF density, APP1 `Exif` segment.
//! - PNG: `pHYs` (pixels per metre), `eXIf` chunk.
//! - TIFF: IFD0 `XResolution` (282), `YResolution` (283), `ResolutionUnit` (296).
//! - BMP: `biXPelsPerMeter` / `biYPelsPerMeter` from the info header.
//! - WebP: RIFF `EXIF` chunk.
//!
//! Resolution precedence: the container's own density field, then the EXIF
//! resolution tags, then [`DEFAULT_DPI`].
//!
//! EXIF blocks are kept opaque, always in APP1 form (`Exif\0\0` followed by
//! a TIFF structure); PNG and WebP payloads are normalized to that on read.
//!
//! Every reader is best-effort: malformed structures yield `None`, never a
//! panic or an error.

use image::ImageFormat;

pub const DEFAULT_DPI: (f64, f64) = (72.0, 72.0);

const EXIF_HEADER: &[u8] = b"Exif\0\0";
const JFIF_HEADER: &[u8] = b"JFIF\0";
const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const METRES_PER_INCH: f64 = 0.0254;

const TAG_X_RESOLUTION: u16 = 282;
const TAG_Y_RESOLUTION: u16 = 283;
const TAG_RESOLUTION_UNIT: u16 = 296;

/// Physical metadata pulled from an encoded file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerMetadata {
    /// Density declared by the container itself, in dots per inch.
    pub density: Option<(f64, f64)>,
    /// Raw EXIF block in APP1 form.
    pub exif: Option<Vec<u8>>,
}

impl ContainerMetadata {
    /// Effective print resolution.
    pub fn dpi(&self) -> (f64, f64) {
        self.density
            .or_else(|| self.exif.as_deref().and_then(exif_resolution))
            .unwrap_or(DEFAULT_DPI)
    }
}

/// Read physical metadata from encoded bytes of a known format.
pub fn read_container_metadata(data: &[u8], format: ImageFormat) -> ContainerMetadata {
    match format {
        ImageFormat::Jpeg => read_jpeg(data),
        ImageFormat::Png => read_png(data),
        ImageFormat::Tiff => ContainerMetadata {
            density: TiffReader::new(data).and_then(|t| t.resolution()),
            exif: None,
        },
        ImageFormat::Bmp => ContainerMetadata {
            density: read_bmp_density(data),
            exif: None,
        },
        ImageFormat::WebP => ContainerMetadata {
            density: None,
            exif: read_webp_exif(data),
        },
        _ => ContainerMetadata::default(),
    }
}

/// Resolution declared inside an APP1-form EXIF block.
pub fn exif_resolution(exif: &[u8]) -> Option<(f64, f64)> {
    let tiff = exif.strip_prefix(EXIF_HEADER).unwrap_or(exif);
    TiffReader::new(tiff)?.resolution()
}

// ---------------------------------------------------------------------------
// JPEG
// ---------------------------------------------------------------------------

/// Marker segments up to (not including) start-of-scan.
fn jpeg_segments(data: &[u8]) -> Vec<(u8, &[u8])> {
    let mut segments = Vec::new();
    if !data.starts_with(&[0xFF, 0xD8]) {
        return segments;
    }
    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            break;
        }
        let marker = data[pos + 1];
        // Fill bytes
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        if marker == 0xDA || marker == 0xD9 {
            break;
        }
        if (0xD0..=0xD7).contains(&marker) || marker == 0x01 {
            pos += 2;
            continue;
        }
        let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if len < 2 || pos + 2 + len > data.len() {
            break;
        }
        segments.push((marker, &data[pos + 4..pos + 2 + len]));
        pos += 2 + len;
    }
    segments
}

fn read_jpeg(data: &[u8]) -> ContainerMetadata {
    let mut meta = ContainerMetadata::default();
    for (marker, payload) in jpeg_segments(data) {
        match marker {
            0xE0 if meta.density.is_none() => meta.density = jfif_density(payload),
            0xE1 if meta.exif.is_none() && payload.starts_with(EXIF_HEADER) => {
                meta.exif = Some(payload.to_vec());
            }
            _ => {}
        }
    }
    meta
}

/// JFIF density: units byte, then big-endian X and Y density.
fn jfif_density(payload: &[u8]) -> Option<(f64, f64)> {
    let body = payload.strip_prefix(JFIF_HEADER)?;
    if body.len() < 7 {
        return None;
    }
    let units = body[2];
    let x = u16::from_be_bytes([body[3], body[4]]) as f64;
    let y = u16::from_be_bytes([body[5], body[6]]) as f64;
    if x <= 0.0 || y <= 0.0 {
        return None;
    }
    match units {
        1 => Some((x, y)),
        2 => Some((x * 2.54, y * 2.54)),
        // 0 is an aspect ratio only
        _ => None,
    }
}

/// Insert an APP1 EXIF segment after SOI and any leading APP0.
///
/// Returns `None` if the input is not a JPEG or the block exceeds the
/// 64 KiB segment limit.
pub fn insert_jpeg_exif(jpeg: &[u8], exif: &[u8]) -> Option<Vec<u8>> {
    if !jpeg.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    let payload: Vec<u8> = if exif.starts_with(EXIF_HEADER) {
        exif.to_vec()
    } else {
        [EXIF_HEADER, exif].concat()
    };
    let seg_len = u16::try_from(payload.len() + 2).ok()?;

    let mut insert_at = 2;
    if jpeg.len() >= 6 && jpeg[2] == 0xFF && jpeg[3] == 0xE0 {
        let app0_len = u16::from_be_bytes([jpeg[4], jpeg[5]]) as usize;
        insert_at = (4 + app0_len).min(jpeg.len());
    }

    let mut out = Vec::with_capacity(jpeg.len() + payload.len() + 4);
    out.extend_from_slice(&jpeg[..insert_at]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&seg_len.to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&jpeg[insert_at..]);
    Some(out)
}

// ---------------------------------------------------------------------------
// PNG
// ---------------------------------------------------------------------------

fn png_chunks(data: &[u8]) -> Vec<([u8; 4], &[u8])> {
    let mut chunks = Vec::new();
    if !data.starts_with(PNG_SIGNATURE) {
        return chunks;
    }
    let mut pos = PNG_SIGNATURE.len();
    while pos + 12 <= data.len() {
        let len = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
            as usize;
        let kind = [data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]];
        let start = pos + 8;
        let Some(end) = start.checked_add(len).filter(|e| e + 4 <= data.len()) else {
            break;
        };
        chunks.push((kind, &data[start..end]));
        if &kind == b"IEND" {
            break;
        }
        pos = end + 4;
    }
    chunks
}

fn read_png(data: &[u8]) -> ContainerMetadata {
    let mut meta = ContainerMetadata::default();
    for (kind, body) in png_chunks(data) {
        match &kind {
            b"pHYs" => meta.density = phys_density(body),
            b"eXIf" => meta.exif = Some([EXIF_HEADER, body].concat()),
            _ => {}
        }
    }
    meta
}

/// `pHYs`: X and Y pixels per unit, then a unit byte (1 = metre).
fn phys_density(body: &[u8]) -> Option<(f64, f64)> {
    if body.len() < 9 || body[8] != 1 {
        return None;
    }
    let x = u32::from_be_bytes([body[0], body[1], body[2], body[3]]) as f64;
    let y = u32::from_be_bytes([body[4], body[5], body[6], body[7]]) as f64;
    if x <= 0.0 || y <= 0.0 {
        return None;
    }
    Some(((x * METRES_PER_INCH).round(), (y * METRES_PER_INCH).round()))
}

fn png_chunk(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(kind);
    hasher.update(body);
    let mut chunk = Vec::with_capacity(body.len() + 12);
    chunk.extend_from_slice(&(body.len() as u32).to_be_bytes());
    chunk.extend_from_slice(kind);
    chunk.extend_from_slice(body);
    chunk.extend_from_slice(&hasher.finalize().to_be_bytes());
    chunk
}

/// Insert `pHYs` and, when given, `eXIf` right after `IHDR`.
///
/// Returns `None` if the input does not start with a PNG signature and IHDR.
pub fn insert_png_chunks(png: &[u8], dpi: (f64, f64), exif: Option<&[u8]>) -> Option<Vec<u8>> {
    const IHDR_END: usize = 8 + 8 + 13 + 4;
    if !png.starts_with(PNG_SIGNATURE) || png.len() < IHDR_END || &png[12..16] != b"IHDR" {
        return None;
    }

    let ppm = |dpi: f64| (dpi / METRES_PER_INCH).round().max(0.0) as u32;
    let mut phys = Vec::with_capacity(9);
    phys.extend_from_slice(&ppm(dpi.0).to_be_bytes());
    phys.extend_from_slice(&ppm(dpi.1).to_be_bytes());
    phys.push(1);

    let mut out = Vec::with_capacity(png.len() + 64);
    out.extend_from_slice(&png[..IHDR_END]);
    out.extend_from_slice(&png_chunk(b"pHYs", &phys));
    if let Some(exif) = exif {
        let tiff = exif.strip_prefix(EXIF_HEADER).unwrap_or(exif);
        out.extend_from_slice(&png_chunk(b"eXIf", tiff));
    }
    out.extend_from_slice(&png[IHDR_END..]);
    Some(out)
}

// ---------------------------------------------------------------------------
// BMP / WebP
// ---------------------------------------------------------------------------

fn read_bmp_density(data: &[u8]) -> Option<(f64, f64)> {
    if data.len() < 46 || !data.starts_with(b"BM") {
        return None;
    }
    let header_size = u32::from_le_bytes([data[14], data[15], data[16], data[17]]);
    if header_size < 40 {
        return None;
    }
    let x = i32::from_le_bytes([data[38], data[39], data[40], data[41]]);
    let y = i32::from_le_bytes([data[42], data[43], data[44], data[45]]);
    if x <= 0 || y <= 0 {
        return None;
    }
    Some((
        (x as f64 * METRES_PER_INCH).round(),
        (y as f64 * METRES_PER_INCH).round(),
    ))
}

fn read_webp_exif(data: &[u8]) -> Option<Vec<u8>> {
    if data.len() < 12 || &data[0..4] != b"RIFF" || &data[8..12] != b"WEBP" {
        return None;
    }
    let mut pos = 12;
    while pos + 8 <= data.len() {
        let kind = &data[pos..pos + 4];
        let len = u32::from_le_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]])
            as usize;
        let start = pos + 8;
        let end = start.checked_add(len).filter(|e| *e <= data.len())?;
        if kind == b"EXIF" {
            let body = &data[start..end];
            return Some(if body.starts_with(EXIF_HEADER) {
                body.to_vec()
            } else {
                [EXIF_HEADER, body].concat()
            });
        }
        pos = end + (len % 2);
    }
    None
}

// ---------------------------------------------------------------------------
// TIFF structures (standalone TIFF files and EXIF payloads)
// ---------------------------------------------------------------------------

struct TiffReader<'a> {
    data: &'a [u8],
    big_endian: bool,
}

struct IfdEntry {
    tag: u16,
    typ: u16,
    count: u32,
    /// Offset of the 4-byte value/offset field.
    field: usize,
}

impl<'a> TiffReader<'a> {
    fn new(data: &'a [u8]) -> Option<Self> {
        let big_endian = match data.get(0..2)? {
            b"MM" => true,
            b"II" => false,
            _ => return None,
        };
        let reader = Self { data, big_endian };
        (reader.u16(2)? == 42).then_some(reader)
    }

    fn u16(&self, offset: usize) -> Option<u16> {
        let b = self.data.get(offset..offset + 2)?;
        Some(if self.big_endian {
            u16::from_be_bytes([b[0], b[1]])
        } else {
            u16::from_le_bytes([b[0], b[1]])
        })
    }

    fn u32(&self, offset: usize) -> Option<u32> {
        let b = self.data.get(offset..offset + 4)?;
        let bytes = [b[0], b[1], b[2], b[3]];
        Some(if self.big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        })
    }

    fn ifd0(&self) -> Vec<IfdEntry> {
        let Some(offset) = self.u32(4).map(|o| o as usize) else {
            return Vec::new();
        };
        let Some(count) = self.u16(offset) else {
            return Vec::new();
        };
        (0..count as usize)
            .map_while(|i| {
                let at = offset + 2 + i * 12;
                Some(IfdEntry {
                    tag: self.u16(at)?,
                    typ: self.u16(at + 2)?,
                    count: self.u32(at + 4)?,
                    field: at + 8,
                })
            })
            .collect()
    }

    fn rational(&self, entry: &IfdEntry) -> Option<f64> {
        // RATIONAL = 5; values never fit inline
        if entry.typ != 5 || entry.count < 1 {
            return None;
        }
        let at = self.u32(entry.field)? as usize;
        let num = self.u32(at)? as f64;
        let den = self.u32(at + 4)? as f64;
        (den > 0.0 && num > 0.0).then(|| num / den)
    }

    fn short(&self, entry: &IfdEntry) -> Option<u16> {
        (entry.typ == 3 && entry.count >= 1)
            .then(|| self.u16(entry.field))
            .flatten()
    }

    /// IFD0 resolution in dots per inch.
    fn resolution(&self) -> Option<(f64, f64)> {
        let entries = self.ifd0();
        let find = |tag| entries.iter().find(|e| e.tag == tag);
        let x = find(TAG_X_RESOLUTION).and_then(|e| self.rational(e));
        let y = find(TAG_Y_RESOLUTION).and_then(|e| self.rational(e));
        let unit = find(TAG_RESOLUTION_UNIT)
            .and_then(|e| self.short(e))
            .unwrap_or(2);

        let (x, y) = match (x, y) {
            (Some(x), Some(y)) => (x, y),
            (Some(v), None) | (None, Some(v)) => (v, v),
            (None, None) => return None,
        };
        match unit {
            2 => Some((x, y)),
            3 => Some((x * 2.54, y * 2.54)),
            _ => None,
        }
    }
}
