//! services/api/src/adapters/photo_metadata.rs
//!
//! Reads EXIF metadata from stored photos with `kamadak-exif`.
//! Implements the `MetadataExtractor` port from `incident_core`.

use async_trait::async_trait;
use exif::{Exif, Field, In, Tag, Value};
use incident_core::domain::ImageMetadata;
use incident_core::geo::{DmsComponent, GpsTags};
use incident_core::ports::MetadataExtractor;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::debug;

/// Binary values longer than this are left out of the tag map.
const MAX_BINARY_LEN: usize = 64;

#[derive(Clone, Default)]
pub struct ExifMetadataAdapter;

impl ExifMetadataAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Blocking read of an image's EXIF block.
    pub fn read(path: &Path) -> Result<ImageMetadata, exif::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let exif = exif::Reader::new().read_from_container(&mut reader)?;
        Ok(metadata_from_exif(&exif))
    }
}

#[async_trait]
impl MetadataExtractor for ExifMetadataAdapter {
    async fn extract(&self, path: &Path) -> ImageMetadata {
        let owned: PathBuf = path.to_owned();
        match spawn_blocking(move || Self::read(&owned)).await {
            Ok(Ok(metadata)) => metadata,
            Ok(Err(e)) => {
                debug!("No EXIF metadata in {}: {}", path.display(), e);
                ImageMetadata::default()
            }
            Err(e) => {
                debug!("EXIF reader task failed for {}: {}", path.display(), e);
                ImageMetadata::default()
            }
        }
    }
}

fn metadata_from_exif(exif: &Exif) -> ImageMetadata {
    let mut tags = BTreeMap::new();
    for field in exif.fields().filter(|f| f.ifd_num == In::PRIMARY) {
        if field.tag == Tag::MakerNote {
            continue;
        }
        if let Value::Undefined(ref bytes, _) = field.value {
            if bytes.len() > MAX_BINARY_LEN {
                continue;
            }
        }
        tags.entry(field.tag.to_string())
            .or_insert_with(|| field_text(exif, field));
    }

    let photo_time = [Tag::DateTimeOriginal, Tag::DateTime]
        .into_iter()
        .find_map(|tag| exif.get_field(tag, In::PRIMARY).and_then(ascii_text));

    let gps = GpsTags {
        latitude: exif.get_field(Tag::GPSLatitude, In::PRIMARY).and_then(dms),
        latitude_ref: exif
            .get_field(Tag::GPSLatitudeRef, In::PRIMARY)
            .and_then(ascii_text),
        longitude: exif.get_field(Tag::GPSLongitude, In::PRIMARY).and_then(dms),
        longitude_ref: exif
            .get_field(Tag::GPSLongitudeRef, In::PRIMARY)
            .and_then(ascii_text),
    };

    ImageMetadata {
        tags,
        photo_time,
        location: gps.to_point(),
    }
}

/// Displays a field the way a person would read it; ASCII values stay raw.
fn field_text(exif: &Exif, field: &Field) -> String {
    ascii_text(field).unwrap_or_else(|| field.display_value().with_unit(exif).to_string())
}

fn ascii_text(field: &Field) -> Option<String> {
    match field.value {
        Value::Ascii(ref parts) => {
            let text = parts
                .iter()
                .map(|p| String::from_utf8_lossy(p).into_owned())
                .collect::<Vec<_>>()
                .join(" ");
            Some(text.trim_matches(|c: char| c == '\0' || c.is_whitespace()).to_string())
        }
        _ => None,
    }
}

/// Reads a degree/minute/second triple from a GPS coordinate field.
fn dms(field: &Field) -> Option<[DmsComponent; 3]> {
    let parts: Vec<DmsComponent> = match field.value {
        Value::Rational(ref v) => v
            .iter()
            .map(|r| DmsComponent::Ratio {
                numerator: i64::from(r.num),
                denominator: i64::from(r.denom),
            })
            .collect(),
        Value::SRational(ref v) => v
            .iter()
            .map(|r| DmsComponent::Ratio {
                numerator: i64::from(r.num),
                denominator: i64::from(r.denom),
            })
            .collect(),
        Value::Double(ref v) => v.iter().map(|x| DmsComponent::Number(*x)).collect(),
        Value::Float(ref v) => v.iter().map(|x| DmsComponent::Number(f64::from(*x))).collect(),
        Value::Short(ref v) => v.iter().map(|x| DmsComponent::Number(f64::from(*x))).collect(),
        Value::Long(ref v) => v.iter().map(|x| DmsComponent::Number(f64::from(*x))).collect(),
        _ => return None,
    };
    match parts.as_slice() {
        [d, m, s, ..] => Some([*d, *m, *s]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATE_TIME: &[u8; 20] = b"2024:05:01 10:00:00\0";

    const RATIONAL: u16 = 5;
    const DOUBLE: u16 = 12;

    fn rationals(values: [(u32, u32); 3]) -> Vec<u8> {
        let mut out = Vec::new();
        for (num, denom) in values {
            out.extend_from_slice(&num.to_le_bytes());
            out.extend_from_slice(&denom.to_le_bytes());
        }
        out
    }

    fn doubles(values: [f64; 3]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// Builds a little-endian TIFF with a DateTime tag and a GPS IFD.
    fn tiff_with_gps(lat_ref: u8, lng_ref: u8) -> Vec<u8> {
        tiff_with_latitude(lat_ref, lng_ref, RATIONAL, rationals([(50, 1), (0, 1), (0, 1)]))
    }

    /// Like `tiff_with_gps`, with the latitude triple stored as `lat_kind`.
    /// Both RATIONAL and DOUBLE triples take 24 bytes.
    fn tiff_with_latitude(lat_ref: u8, lng_ref: u8, lat_kind: u16, lat_value: Vec<u8>) -> Vec<u8> {
        fn entry(out: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: [u8; 4]) {
            out.extend_from_slice(&tag.to_le_bytes());
            out.extend_from_slice(&kind.to_le_bytes());
            out.extend_from_slice(&count.to_le_bytes());
            out.extend_from_slice(&value);
        }
        const ASCII: u16 = 2;
        const LONG: u16 = 4;

        let ifd0 = 8u32;
        let date_offset = ifd0 + 2 + 2 * 12 + 4;
        let gps_ifd = date_offset + DATE_TIME.len() as u32;
        let lat_offset = gps_ifd + 2 + 4 * 12 + 4;
        let lng_offset = lat_offset + 24;

        let mut out = Vec::new();
        out.extend_from_slice(b"II\x2a\x00");
        out.extend_from_slice(&ifd0.to_le_bytes());

        out.extend_from_slice(&2u16.to_le_bytes());
        entry(&mut out, 0x0132, ASCII, 20, date_offset.to_le_bytes());
        entry(&mut out, 0x8825, LONG, 1, gps_ifd.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(DATE_TIME);

        out.extend_from_slice(&4u16.to_le_bytes());
        entry(&mut out, 0x0001, ASCII, 2, [lat_ref, 0, 0, 0]);
        entry(&mut out, 0x0002, lat_kind, 3, lat_offset.to_le_bytes());
        entry(&mut out, 0x0003, ASCII, 2, [lng_ref, 0, 0, 0]);
        entry(&mut out, 0x0004, RATIONAL, 3, lng_offset.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());

        out.extend_from_slice(&lat_value);
        out.extend_from_slice(&rationals([(19, 1), (54, 1), (0, 1)]));
        out
    }

    #[tokio::test]
    async fn missing_file_yields_empty_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = ExifMetadataAdapter::new()
            .extract(&dir.path().join("absent.jpg"))
            .await;
        assert!(metadata.is_empty());
    }

    #[tokio::test]
    async fn non_image_yields_empty_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.jpg");
        std::fs::write(&path, b"definitely not an image").unwrap();

        let metadata = ExifMetadataAdapter::new().extract(&path).await;
        assert!(metadata.is_empty());
    }

    #[tokio::test]
    async fn reads_time_and_gps_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.tiff");
        std::fs::write(&path, tiff_with_gps(b'N', b'E')).unwrap();

        let metadata = ExifMetadataAdapter::new().extract(&path).await;

        assert_eq!(metadata.photo_time.as_deref(), Some("2024:05:01 10:00:00"));
        let point = metadata.location.unwrap();
        assert!((point.lat - 50.0).abs() < 1e-9);
        assert!((point.lng - 19.9).abs() < 1e-9);
        assert_eq!(
            metadata.tags.get("DateTime").map(String::as_str),
            Some("2024:05:01 10:00:00")
        );
    }

    #[tokio::test]
    async fn southern_western_references_negate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.tiff");
        std::fs::write(&path, tiff_with_gps(b'S', b'W')).unwrap();

        let point = ExifMetadataAdapter::new()
            .extract(&path)
            .await
            .location
            .unwrap();
        assert!((point.lat + 50.0).abs() < 1e-9);
        assert!((point.lng + 19.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn double_latitude_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.tiff");
        std::fs::write(
            &path,
            tiff_with_latitude(b'N', b'E', DOUBLE, doubles([50.0, 30.0, 0.0])),
        )
        .unwrap();

        let point = ExifMetadataAdapter::new()
            .extract(&path)
            .await
            .location
            .unwrap();
        assert!((point.lat - 50.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn non_finite_gps_gives_no_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.tiff");
        std::fs::write(
            &path,
            tiff_with_latitude(b'N', b'E', DOUBLE, doubles([f64::NAN, 0.0, 0.0])),
        )
        .unwrap();

        let metadata = ExifMetadataAdapter::new().extract(&path).await;

        assert_eq!(metadata.location, None);
        assert_eq!(metadata.photo_time.as_deref(), Some("2024:05:01 10:00:00"));
    }
}
