use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::debug;

/// Vendor sidecar schema, read-only. Only the fields this core consumes are
/// modeled; everything else in the file is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SidecarMeta {
    #[serde(default, rename = "photoTakenTime")]
    pub photo_taken_time: Option<TakenTime>,
    #[serde(default, rename = "geoData")]
    pub geo_data: Option<GeoData>,
    #[serde(default, rename = "googlePhotoOrigin")]
    pub google_photo_origin: Option<PhotoOrigin>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TakenTime {
    /// Unix epoch seconds, UTC. The export writes this as a string, but
    /// integer values have been observed too.
    #[serde(default)]
    pub timestamp: Option<Epoch>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Epoch {
    Text(String),
    Seconds(i64),
}

impl Epoch {
    pub fn seconds(&self) -> Option<i64> {
        match self {
            Epoch::Text(s) => s.parse().ok(),
            Epoch::Seconds(n) => Some(*n),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoData {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub altitude: f64,
}

/// Presence of `fromPartnerSharing` (an empty object in the export) marks
/// media that arrived through partner sharing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhotoOrigin {
    #[serde(default, rename = "fromPartnerSharing")]
    pub from_partner_sharing: Option<serde_json::Value>,
}

impl SidecarMeta {
    /// Capture timestamp as a UTC naive datetime.
    pub fn taken_time(&self) -> Option<NaiveDateTime> {
        let epoch = self.photo_taken_time.as_ref()?.timestamp.as_ref()?.seconds()?;
        Some(chrono::DateTime::from_timestamp(epoch, 0)?.naive_utc())
    }

    /// True when the export flags this item as partner-shared.
    pub fn partner_shared(&self) -> bool {
        self.google_photo_origin
            .as_ref()
            .is_some_and(|origin| origin.from_partner_sharing.is_some())
    }

    /// GPS coordinates, skipping the export's (0, 0) placeholder.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let geo = self.geo_data.as_ref()?;
        if geo.latitude == 0.0 && geo.longitude == 0.0 {
            return None;
        }
        Some((geo.latitude, geo.longitude))
    }
}

/// Read and parse a sidecar file. Any read or parse failure yields None;
/// a missing or malformed sidecar is an expected outcome.
pub fn read_sidecar(path: &Path) -> Option<SidecarMeta> {
    let bytes = fs::read(path).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(meta) => Some(meta),
        Err(err) => {
            debug!(path = %path.display(), %err, "unparseable sidecar");
            None
        }
    }
}

/// Capture time straight from a sidecar path.
pub fn taken_time(path: &Path) -> Option<NaiveDateTime> {
    read_sidecar(path)?.taken_time()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn parse(json: &str) -> SidecarMeta {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn string_epoch() {
        let meta = parse(r#"{"photoTakenTime":{"timestamp":"1609459200"}}"#);
        let dt = meta.taken_time().unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2021-01-01 00:00:00");
    }

    #[test]
    fn integer_epoch() {
        let meta = parse(r#"{"photoTakenTime":{"timestamp":1609459200}}"#);
        assert!(meta.taken_time().is_some());
    }

    #[test]
    fn missing_or_garbage_timestamp() {
        assert!(parse(r#"{}"#).taken_time().is_none());
        assert!(parse(r#"{"photoTakenTime":{}}"#).taken_time().is_none());
        assert!(parse(r#"{"photoTakenTime":{"timestamp":"soon"}}"#)
            .taken_time()
            .is_none());
    }

    #[test]
    fn partner_sharing_flag() {
        let meta = parse(r#"{"googlePhotoOrigin":{"fromPartnerSharing":{}}}"#);
        assert!(meta.partner_shared());
        let meta = parse(r#"{"googlePhotoOrigin":{"mobileUpload":{}}}"#);
        assert!(!meta.partner_shared());
        assert!(!parse(r#"{}"#).partner_shared());
    }

    #[test]
    fn geo_placeholder_is_dropped() {
        let meta =
            parse(r#"{"geoData":{"latitude":0.0,"longitude":0.0,"altitude":0.0}}"#);
        assert!(meta.coordinates().is_none());
        let meta =
            parse(r#"{"geoData":{"latitude":51.5,"longitude":-0.12,"altitude":11.0}}"#);
        assert_eq!(meta.coordinates(), Some((51.5, -0.12)));
    }

    #[test]
    fn unreadable_file_is_none() {
        let tmp = TempDir::new().unwrap();
        assert!(read_sidecar(&tmp.path().join("missing.json")).is_none());
        let bad = tmp.path().join("bad.json");
        fs::write(&bad, b"{ not json").unwrap();
        assert!(read_sidecar(&bad).is_none());
    }
}
