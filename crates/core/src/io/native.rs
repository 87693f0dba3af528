//! Native GeoTIFF reading/writing (without GDAL dependency)
//!
//! Uses the `tiff` crate for the container and handles the GeoTIFF tags
//! (pixel scale, tiepoint, model transformation, GeoKeys, GDAL nodata and
//! GDAL metadata) directly.

use super::metadata::{parse_descriptions, render_descriptions, GDAL_METADATA_TAG};
use super::{check_band_index, BandSource};
use crate::crs::{GeoKeyDirectory, CRS};
use crate::error::{Error, Result};
use crate::raster::{
    BandArray, Bounds, ComputationResult, Compression, DataType, GeoTransform, RasterProfile,
};
use ndarray::Array2;
use std::fs::{self, File};
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use tiff::decoder::{ChunkType, Decoder, DecodingResult, Limits};
use tiff::encoder::colortype::{
    ColorType, Gray16, Gray32Float, Gray8, RGB16, RGB32Float, RGB8,
};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind, TiffValue};
use tiff::tags::Tag;
use tracing::debug;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GEO_DOUBLE_PARAMS: u16 = 34736;
const GEO_ASCII_PARAMS: u16 = 34737;
const GDAL_NODATA: u16 = 42113;

/// Tag lookup that resolves to the crate's named variant when one exists
fn tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    /// Per-band descriptions stored in the GDAL metadata tag
    pub descriptions: Vec<Option<String>>,
}

/// Decoded pixel samples in file order
#[derive(Debug)]
struct Samples {
    data: Vec<f32>,
    interleaved: bool,
}

/// An opened GeoTIFF.
///
/// The header (profile and band descriptions) is read on open; pixel data is
/// decoded on the first band read, and a band becomes a [`BandArray`] only
/// when it is requested. Every file handle is closed before a call returns.
#[derive(Debug)]
pub struct Dataset {
    path: PathBuf,
    profile: RasterProfile,
    descriptions: Vec<Option<String>>,
    planar: bool,
    samples: Option<Samples>,
}

impl Dataset {
    /// Open a GeoTIFF and read its profile.
    ///
    /// Fails with [`Error::NotFound`] before touching the file when the path
    /// does not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }

        let mut decoder = open_decoder(path)?;
        let (profile, planar) = read_profile(&mut decoder)?;
        let descriptions = read_descriptions(&mut decoder, profile.band_count);

        debug!(
            "Opened {} ({}x{}, {} bands, {}, {})",
            path.display(),
            profile.width,
            profile.height,
            profile.band_count,
            profile.dtype,
            profile
                .crs
                .as_ref()
                .map_or_else(|| "no CRS".to_string(), |crs| crs.to_string())
        );

        Ok(Self {
            path: path.to_path_buf(),
            profile,
            descriptions,
            planar,
            samples: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn profile(&self) -> &RasterProfile {
        &self.profile
    }

    /// Embedded per-band descriptions, one entry per band
    pub fn descriptions(&self) -> &[Option<String>] {
        &self.descriptions
    }

    /// Description of each band, or `band N` when it has none
    pub fn band_labels(&self) -> Vec<String> {
        self.descriptions
            .iter()
            .enumerate()
            .map(|(i, desc)| match desc.as_deref().map(str::trim) {
                Some(d) if !d.is_empty() => d.to_string(),
                _ => format!("band {}", i + 1),
            })
            .collect()
    }

    /// Geographic extent in the native units of the CRS
    pub fn bounds(&self) -> Bounds {
        self.profile.bounds()
    }

    fn load_samples(&mut self) -> Result<&Samples> {
        if self.samples.is_none() {
            let mut decoder = open_decoder(&self.path)?;
            let data = if self.planar {
                read_planes(&mut decoder)?
            } else {
                decode_samples(decoder.read_image()?)?
            };

            let expected = self.profile.width * self.profile.height * self.profile.band_count;
            if data.len() != expected {
                return Err(Error::Tiff(format!(
                    "decoded {} samples, expected {}",
                    data.len(),
                    expected
                )));
            }
            debug!("Decoded {} samples from {}", data.len(), self.path.display());
            self.samples = Some(Samples {
                data,
                interleaved: !self.planar,
            });
        }
        self.samples
            .as_ref()
            .ok_or_else(|| Error::Other("sample cache unavailable".into()))
    }
}

impl BandSource for Dataset {
    fn band_count(&self) -> usize {
        self.profile.band_count
    }

    fn shape(&self) -> (usize, usize) {
        self.profile.shape()
    }

    fn read_band(&mut self, index: usize) -> Result<BandArray> {
        check_band_index(index, self.profile.band_count)?;
        let (rows, cols) = self.profile.shape();
        let bands = self.profile.band_count;
        let samples = self.load_samples()?;
        let b = index - 1;

        let band = if samples.interleaved {
            Array2::from_shape_fn((rows, cols), |(r, c)| {
                samples.data[(r * cols + c) * bands + b]
            })
        } else {
            let n = rows * cols;
            Array2::from_shape_vec((rows, cols), samples.data[b * n..(b + 1) * n].to_vec())?
        };
        Ok(band)
    }
}

fn open_decoder(path: &Path) -> Result<Decoder<File>> {
    let file = File::open(path)?;
    Ok(Decoder::new(file)?.with_limits(Limits::unlimited()))
}

fn find_u16<R: Read + Seek>(decoder: &mut Decoder<R>, tag: Tag) -> Result<Option<u16>> {
    Ok(match decoder.find_tag(tag)? {
        Some(v) => Some(v.into_u16()?),
        None => None,
    })
}

fn find_u16_vec<R: Read + Seek>(decoder: &mut Decoder<R>, tag: Tag) -> Result<Option<Vec<u16>>> {
    Ok(match decoder.find_tag(tag)? {
        Some(v) => Some(v.into_u16_vec()?),
        None => None,
    })
}

fn find_f64_vec<R: Read + Seek>(decoder: &mut Decoder<R>, tag: Tag) -> Result<Option<Vec<f64>>> {
    Ok(match decoder.find_tag(tag)? {
        Some(v) => Some(v.into_f64_vec()?),
        None => None,
    })
}

fn find_ascii<R: Read + Seek>(decoder: &mut Decoder<R>, tag: Tag) -> Result<Option<String>> {
    Ok(match decoder.find_tag(tag)? {
        Some(v) => Some(v.into_string()?),
        None => None,
    })
}

/// Read the profile from the first image directory.
/// The flag is true for band-sequential (planar) files.
fn read_profile<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<(RasterProfile, bool)> {
    let (width, height) = decoder.dimensions()?;
    let (width, height) = (width as usize, height as usize);
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }

    let band_count = find_u16(decoder, Tag::SamplesPerPixel)?.unwrap_or(1) as usize;
    let bits = find_u16_vec(decoder, Tag::BitsPerSample)?
        .and_then(|v| v.first().copied())
        .unwrap_or(1);
    let format = find_u16_vec(decoder, Tag::SampleFormat)?
        .and_then(|v| v.first().copied())
        .unwrap_or(1);
    let dtype = DataType::from_tiff(format, bits).ok_or_else(|| {
        Error::UnsupportedDataType(format!("sample format {} with {} bits", format, bits))
    })?;
    let compression =
        Compression::from_tiff(find_u16(decoder, Tag::Compression)?.unwrap_or(1));
    let planar = find_u16(decoder, Tag::PlanarConfiguration)?.unwrap_or(1) == 2;
    if planar && decoder.get_chunk_type() == ChunkType::Tile {
        return Err(Error::UnsupportedDataType(
            "tiled band-sequential layout".to_string(),
        ));
    }

    let transform = match find_f64_vec(decoder, tag(MODEL_TRANSFORMATION))? {
        Some(matrix) => GeoTransform::from_model_transformation(&matrix),
        None => {
            let scale = find_f64_vec(decoder, tag(MODEL_PIXEL_SCALE))?;
            let tiepoint = find_f64_vec(decoder, tag(MODEL_TIEPOINT))?;
            match (scale, tiepoint) {
                (Some(s), Some(t)) => GeoTransform::from_scale_tiepoint(&s, &t),
                _ => None,
            }
        }
    }
    .unwrap_or_default();

    let crs = match find_u16_vec(decoder, tag(GEO_KEY_DIRECTORY))? {
        Some(keys) => CRS::from_geokeys(GeoKeyDirectory {
            keys,
            doubles: find_f64_vec(decoder, tag(GEO_DOUBLE_PARAMS))?.unwrap_or_default(),
            ascii: find_ascii(decoder, tag(GEO_ASCII_PARAMS))?.unwrap_or_default(),
        }),
        None => None,
    };

    let nodata = find_ascii(decoder, tag(GDAL_NODATA))?.and_then(|s| s.trim().parse::<f64>().ok());

    let profile = RasterProfile {
        width,
        height,
        crs,
        transform,
        band_count,
        dtype,
        nodata,
        compression,
    };
    Ok((profile, planar))
}

/// Band descriptions from the GDAL metadata tag; unreadable metadata
/// yields no descriptions.
fn read_descriptions<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    band_count: usize,
) -> Vec<Option<String>> {
    let parsed = find_ascii(decoder, tag(GDAL_METADATA_TAG))
        .and_then(|xml| match xml {
            Some(xml) => parse_descriptions(&xml, band_count),
            None => Ok(vec![None; band_count]),
        });
    match parsed {
        Ok(desc) => desc,
        Err(e) => {
            debug!("Ignoring unreadable band descriptions: {}", e);
            vec![None; band_count]
        }
    }
}

/// Band-sequential strips, decoded one at a time. Strips are ordered plane by
/// plane, so concatenating them yields the bands in order.
fn read_planes<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Vec<f32>> {
    let strips = decoder.strip_count()?;
    let mut data = Vec::new();
    for strip in 0..strips {
        data.extend(decode_samples(decoder.read_chunk(strip)?)?);
    }
    Ok(data)
}

/// Convert any decoded buffer to f32
fn decode_samples(result: DecodingResult) -> Result<Vec<f32>> {
    Ok(match result {
        DecodingResult::U8(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I8(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::I32(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::F32(buf) => buf,
        DecodingResult::F64(buf) => buf.into_iter().map(|v| v as f32).collect(),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ))
        }
    })
}

/// Write a computation result as a GeoTIFF.
///
/// `profile` must describe the result's grid and band count. The geotransform,
/// CRS and nodata value are written unchanged, so reopening the file yields the
/// same grid. A partially written file is removed on failure.
pub fn write_geotiff<P: AsRef<Path>>(
    path: P,
    result: &ComputationResult,
    profile: &RasterProfile,
    options: Option<GeoTiffOptions>,
) -> Result<()> {
    let path = path.as_ref();
    if profile.shape() != result.shape() || profile.band_count != result.band_count() {
        let (rows, cols) = result.shape();
        return Err(Error::Write(format!(
            "profile describes {}x{}x{} but result is {}x{}x{}",
            profile.band_count,
            profile.height,
            profile.width,
            result.band_count(),
            rows,
            cols
        )));
    }
    let options = options.unwrap_or_default();

    let file = File::create(path)
        .map_err(|e| Error::Write(format!("{}: {}", path.display(), e)))?;
    if let Err(e) = encode_geotiff(file, result, profile, &options) {
        let _ = fs::remove_file(path);
        return Err(Error::Write(format!("{}: {}", path.display(), e)));
    }

    debug!(
        "Wrote {} ({} bands, {})",
        path.display(),
        result.band_count(),
        profile.dtype
    );
    Ok(())
}

/// GeoTIFF tag payloads shared by both encoder paths
struct GeoTags<'a> {
    transform: &'a GeoTransform,
    crs: Option<&'a CRS>,
    nodata: Option<String>,
    metadata: Option<String>,
}

impl<'a> GeoTags<'a> {
    fn new(profile: &'a RasterProfile, options: &GeoTiffOptions) -> Self {
        let nodata = profile.nodata.map(|v| {
            if v.is_nan() {
                "nan".to_string()
            } else {
                v.to_string()
            }
        });
        Self {
            transform: &profile.transform,
            crs: profile.crs.as_ref(),
            nodata,
            metadata: render_descriptions(&options.descriptions),
        }
    }

    fn write<W: Write + Seek, K: TiffKind>(
        &self,
        dir: &mut DirectoryEncoder<'_, W, K>,
    ) -> Result<()> {
        let gt = self.transform;
        if gt.is_north_up() {
            dir.write_tag(tag(MODEL_PIXEL_SCALE), &gt.pixel_scale()[..])?;
            dir.write_tag(tag(MODEL_TIEPOINT), &gt.tiepoint()[..])?;
        } else {
            dir.write_tag(tag(MODEL_TRANSFORMATION), &gt.model_transformation()[..])?;
        }

        if let Some(crs) = self.crs {
            let geokeys = crs.geokeys();
            dir.write_tag(tag(GEO_KEY_DIRECTORY), geokeys.keys.as_slice())?;
            if !geokeys.doubles.is_empty() {
                dir.write_tag(tag(GEO_DOUBLE_PARAMS), geokeys.doubles.as_slice())?;
            }
            if !geokeys.ascii.is_empty() {
                dir.write_tag(tag(GEO_ASCII_PARAMS), geokeys.ascii.as_str())?;
            }
        }

        if let Some(nodata) = &self.nodata {
            dir.write_tag(tag(GDAL_NODATA), nodata.as_str())?;
        }
        if let Some(xml) = &self.metadata {
            dir.write_tag(tag(GDAL_METADATA_TAG), xml.as_str())?;
        }
        Ok(())
    }
}

/// Pixel-interleaved samples, converted to the output sample type
fn interleave<T>(result: &ComputationResult, convert: impl Fn(f32) -> T) -> Vec<T> {
    let (rows, cols) = result.shape();
    let bands = result.band_count();
    let data = result.data();
    let mut out = Vec::with_capacity(rows * cols * bands);
    for r in 0..rows {
        for c in 0..cols {
            for b in 0..bands {
                out.push(convert(data[[b, r, c]]));
            }
        }
    }
    out
}

fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, u8::MAX as f32) as u8
}

fn to_u16(v: f32) -> u16 {
    v.round().clamp(0.0, u16::MAX as f32) as u16
}

fn encode_geotiff<W: Write + Seek>(
    writer: W,
    result: &ComputationResult,
    profile: &RasterProfile,
    options: &GeoTiffOptions,
) -> Result<()> {
    let (rows, cols) = result.shape();
    let (width, height) = (cols as u32, rows as u32);
    let geo = GeoTags::new(profile, options);

    let dtype = match profile.dtype {
        DataType::U8 | DataType::U16 | DataType::F32 => profile.dtype,
        other => {
            debug!("No encoder for {}, writing float32", other);
            DataType::F32
        }
    };
    let compression = match profile.compression {
        Compression::Lzw => tiff::encoder::Compression::Lzw,
        Compression::Deflate => {
            tiff::encoder::Compression::Deflate(tiff::encoder::compression::DeflateLevel::Balanced)
        }
        _ => tiff::encoder::Compression::Uncompressed,
    };

    match (result.band_count(), dtype) {
        (1, DataType::U8) => {
            let data = interleave(result, to_u8);
            write_standard::<_, Gray8>(writer, compression, width, height, &geo, &data)
        }
        (1, DataType::U16) => {
            let data = interleave(result, to_u16);
            write_standard::<_, Gray16>(writer, compression, width, height, &geo, &data)
        }
        (1, _) => {
            let data = interleave(result, |v| v);
            write_standard::<_, Gray32Float>(writer, compression, width, height, &geo, &data)
        }
        (3, DataType::U8) => {
            let data = interleave(result, to_u8);
            write_standard::<_, RGB8>(writer, compression, width, height, &geo, &data)
        }
        (3, DataType::U16) => {
            let data = interleave(result, to_u16);
            write_standard::<_, RGB16>(writer, compression, width, height, &geo, &data)
        }
        (3, _) => {
            let data = interleave(result, |v| v);
            write_standard::<_, RGB32Float>(writer, compression, width, height, &geo, &data)
        }
        (bands, dtype) => write_multiband(writer, bands, dtype, width, height, &geo, result),
    }
}

/// Gray and RGB layouts through the high-level encoder
fn write_standard<W, C>(
    writer: W,
    compression: tiff::encoder::Compression,
    width: u32,
    height: u32,
    geo: &GeoTags<'_>,
    data: &[C::Inner],
) -> Result<()>
where
    W: Write + Seek,
    C: ColorType,
    [C::Inner]: TiffValue,
{
    let mut encoder = TiffEncoder::new(writer)?.with_compression(compression);
    let mut image = encoder.new_image::<C>(width, height)?;
    geo.write(image.encoder())?;
    image.write_data(data)?;
    Ok(())
}

/// Arbitrary band counts through the directory encoder, uncompressed and
/// pixel-interleaved
fn write_multiband<W: Write + Seek>(
    writer: W,
    bands: usize,
    dtype: DataType,
    width: u32,
    height: u32,
    geo: &GeoTags<'_>,
    result: &ComputationResult,
) -> Result<()> {
    let (bits, format, bytes): (u16, u16, Vec<u8>) = match dtype {
        DataType::U8 => (8, 1, interleave(result, to_u8)),
        DataType::U16 => (
            16,
            1,
            interleave(result, to_u16)
                .into_iter()
                .flat_map(u16::to_ne_bytes)
                .collect(),
        ),
        _ => (
            32,
            3,
            interleave(result, |v| v)
                .into_iter()
                .flat_map(f32::to_ne_bytes)
                .collect(),
        ),
    };

    let mut encoder = TiffEncoder::new(writer)?;
    let mut dir = encoder.image_directory()?;

    dir.write_tag(Tag::ImageWidth, width)?;
    dir.write_tag(Tag::ImageLength, height)?;
    dir.write_tag(Tag::BitsPerSample, vec![bits; bands].as_slice())?;
    dir.write_tag(Tag::Compression, 1u16)?;
    dir.write_tag(Tag::PhotometricInterpretation, 1u16)?;
    dir.write_tag(Tag::SamplesPerPixel, bands as u16)?;
    dir.write_tag(Tag::SampleFormat, vec![format; bands].as_slice())?;
    dir.write_tag(Tag::PlanarConfiguration, 1u16)?;
    dir.write_tag(Tag::RowsPerStrip, height)?;
    if bands > 1 {
        dir.write_tag(Tag::ExtraSamples, vec![0u16; bands - 1].as_slice())?;
    }
    geo.write(&mut dir)?;

    let offset = dir.write_data(bytes.as_slice())?;
    let offset = u32::try_from(offset)
        .map_err(|_| Error::Write("output exceeds the classic TIFF size limit".into()))?;
    let byte_count = u32::try_from(bytes.len())
        .map_err(|_| Error::Write("output exceeds the classic TIFF size limit".into()))?;
    dir.write_tag(Tag::StripOffsets, offset)?;
    dir.write_tag(Tag::StripByteCounts, byte_count)?;
    dir.finish()?;
    Ok(())
}
