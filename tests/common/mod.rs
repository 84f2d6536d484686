//! Shared test fixtures
//!
//! `JsonFormat` stands in for `.mmdb` files: the database is a JSON object
//! mapping IP strings to locations, so fixtures can be written from tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Deserialize;
use tempfile::TempDir;

use geoip_api::errors::LookupError;
use geoip_api::services::{DatabaseFormat, GeoDatabase, GeoLocation, LookupEngine};
use geoip_api::storage::DatabaseStore;

#[derive(Deserialize)]
struct FixtureRecord {
    city: Option<String>,
    country: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

pub struct JsonDatabase {
    records: HashMap<IpAddr, GeoLocation>,
    locates: Arc<AtomicUsize>,
}

impl GeoDatabase for JsonDatabase {
    fn locate(&self, ip: IpAddr) -> Result<Option<GeoLocation>, LookupError> {
        self.locates.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.get(&ip).cloned())
    }
}

/// JSON fixture format with call counters
#[derive(Default)]
pub struct JsonFormat {
    pub opens: AtomicUsize,
    pub locates: Arc<AtomicUsize>,
}

impl JsonFormat {
    pub fn parse(bytes: &[u8]) -> Result<HashMap<IpAddr, GeoLocation>, LookupError> {
        let raw: HashMap<String, FixtureRecord> = serde_json::from_slice(bytes)
            .map_err(|e| LookupError::CorruptDatabase(e.to_string()))?;

        raw.into_iter()
            .map(|(ip, record)| {
                let ip: IpAddr = ip
                    .parse()
                    .map_err(|_| LookupError::CorruptDatabase(format!("bad key {}", ip)))?;
                Ok((
                    ip,
                    GeoLocation {
                        city: record.city,
                        country: record.country,
                        latitude: record.latitude,
                        longitude: record.longitude,
                    },
                ))
            })
            .collect()
    }

    pub fn engine_calls(&self) -> usize {
        self.opens.load(Ordering::SeqCst) + self.locates.load(Ordering::SeqCst)
    }
}

impl DatabaseFormat for JsonFormat {
    fn open(&self, path: &Path) -> Result<Arc<dyn GeoDatabase>, LookupError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let bytes =
            std::fs::read(path).map_err(|e| LookupError::DatabaseUnavailable(e.to_string()))?;
        Ok(Arc::new(JsonDatabase {
            records: Self::parse(&bytes)?,
            locates: self.locates.clone(),
        }))
    }

    fn verify(&self, bytes: &[u8]) -> Result<(), LookupError> {
        Self::parse(bytes).map(|_| ())
    }

    fn name(&self) -> &'static str {
        "json-fixture"
    }
}

/// Build fixture bytes from `(ip, city, country, latitude, longitude)` rows
pub fn fixture(rows: &[(&str, &str, &str, f64, f64)]) -> Vec<u8> {
    let map: serde_json::Map<String, serde_json::Value> = rows
        .iter()
        .map(|(ip, city, country, lat, lon)| {
            (
                ip.to_string(),
                serde_json::json!({
                    "city": city,
                    "country": country,
                    "latitude": lat,
                    "longitude": lon,
                }),
            )
        })
        .collect();
    serde_json::to_vec(&map).unwrap()
}

pub fn default_fixture() -> Vec<u8> {
    fixture(&[
        ("8.8.8.8", "Mountain View", "United States", 37.386, -122.0838),
        ("1.2.3.4", "Brisbane", "Australia", -27.4679, 153.0281),
        ("2001:4860:4860::8888", "Mountain View", "United States", 37.751, -97.822),
    ])
}

pub struct TestEnv {
    pub dir: TempDir,
    pub store: Arc<DatabaseStore>,
    pub format: Arc<JsonFormat>,
    pub engine: Arc<LookupEngine>,
}

impl TestEnv {
    /// Empty environment: no database file yet
    pub fn empty() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(DatabaseStore::new(dir.path().join("GeoLite2-City.mmdb")));
        let format = Arc::new(JsonFormat::default());
        let engine = Arc::new(LookupEngine::new(store.clone(), format.clone(), true));
        Self {
            dir,
            store,
            format,
            engine,
        }
    }

    pub fn with_default_fixture() -> Self {
        let env = Self::empty();
        env.store
            .replace(&default_fixture())
            .expect("Failed to write fixture");
        env
    }
}
