//! Datastream routing
//!
//! Maps a network-server device id to the observation endpoints of its
//! sensors and turns a [`Reading`] into the submissions for that device.
//!
//! Configuration format:
//! ```json
//! { "weather-01": { "temperature": "https://.../Datastreams(1)/Observations",
//!                   "humidity":    "https://.../Datastreams(2)/Observations" } }
//! ```

use crate::reading::Reading;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Sensor channels carried by a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Temperature,
    Humidity,
    Windspeed,
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorKind::Temperature => write!(f, "temperature"),
            SensorKind::Humidity => write!(f, "humidity"),
            SensorKind::Windspeed => write!(f, "windspeed"),
        }
    }
}

/// Errors raised while loading a datastream map
#[derive(Error, Debug)]
pub enum DatastreamError {
    #[error("Invalid datastream map: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while routing a reading
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("Unknown device: {0}")]
    UnknownDevice(String),
}

/// Endpoints of one device, in configuration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorRoutes(Vec<(SensorKind, String)>);

impl SensorRoutes {
    pub fn new(routes: Vec<(SensorKind, String)>) -> Self {
        Self(routes)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SensorKind, &str)> {
        self.0.iter().map(|(kind, url)| (*kind, url.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for SensorRoutes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (kind, url) in &self.0 {
            map.serialize_entry(kind, url)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SensorRoutes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RoutesVisitor;

        impl<'de> Visitor<'de> for RoutesVisitor {
            type Value = SensorRoutes;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of sensor kind to observation URL")
            }

            // Entries arrive in document order
            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut routes: Vec<(SensorKind, String)> =
                    Vec::with_capacity(access.size_hint().unwrap_or(3));
                while let Some((kind, url)) = access.next_entry::<SensorKind, String>()? {
                    match routes.iter_mut().find(|(k, _)| *k == kind) {
                        Some(existing) => existing.1 = url,
                        None => routes.push((kind, url)),
                    }
                }
                Ok(SensorRoutes(routes))
            }
        }

        deserializer.deserialize_map(RoutesVisitor)
    }
}

/// Static device id → sensor endpoint mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatastreamMap {
    devices: BTreeMap<String, SensorRoutes>,
}

impl DatastreamMap {
    /// Parse a datastream map from its JSON representation
    pub fn from_json(json: &str) -> Result<Self, DatastreamError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Add or replace the routes of a device
    pub fn insert(&mut self, device_id: impl Into<String>, routes: SensorRoutes) {
        self.devices.insert(device_id.into(), routes);
    }

    /// Routes configured for a device
    pub fn get(&self, device_id: &str) -> Option<&SensorRoutes> {
        self.devices.get(device_id)
    }

    /// Configured device ids
    pub fn devices(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// One observation to post
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub kind: SensorKind,
    pub url: String,
    /// `{"result": <value>}`
    pub body: Value,
}

/// A channel left out because its value is implausible
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidReading {
    pub kind: SensorKind,
    pub value: f64,
}

/// Result of routing one reading
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Route {
    pub submissions: Vec<Submission>,
    pub skipped: Vec<InvalidReading>,
}

/// Build the submissions for `device_id`
///
/// Only sensor kinds configured for the device are emitted. An implausible
/// windspeed drops the windspeed channel and leaves the others untouched.
pub fn route(device_id: &str, reading: &Reading, map: &DatastreamMap) -> Result<Route, RouteError> {
    let routes = map
        .get(device_id)
        .ok_or_else(|| RouteError::UnknownDevice(device_id.to_string()))?;

    let mut out = Route::default();
    for (kind, url) in routes.iter() {
        if kind == SensorKind::Windspeed && !reading.windspeed_valid() {
            out.skipped.push(InvalidReading {
                kind,
                value: reading.windspeed,
            });
            continue;
        }

        out.submissions.push(Submission {
            kind,
            url: url.to_string(),
            body: json!({ "result": reading.result(kind) }),
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP_JSON: &str = r#"{
        "dev1": { "temperature": "http://x/temp", "humidity": "http://x/hum" },
        "dev2": {
            "windspeed": "http://y/wind",
            "temperature": "http://y/temp",
            "humidity": "http://y/hum"
        },
        "dev3": { "temperature": "http://z/temp" }
    }"#;

    fn test_map() -> DatastreamMap {
        DatastreamMap::from_json(MAP_JSON).expect("map should parse")
    }

    fn reading(windspeed: f64) -> Reading {
        Reading {
            temperature: 50.0,
            humidity: 100,
            windspeed,
        }
    }

    #[test]
    fn test_parse_preserves_entry_order() {
        let map = test_map();
        assert_eq!(map.len(), 3);

        let kinds: Vec<SensorKind> = map.get("dev2").unwrap().iter().map(|(k, _)| k).collect();
        assert_eq!(
            kinds,
            vec![SensorKind::Windspeed, SensorKind::Temperature, SensorKind::Humidity]
        );
    }

    #[test]
    fn test_unknown_sensor_kind_rejected() {
        let result = DatastreamMap::from_json(r#"{ "dev1": { "pressure": "http://x/p" } }"#);
        assert!(matches!(result, Err(DatastreamError::Json(_))));
    }

    #[test]
    fn test_serialize_keeps_entry_order() {
        let map = DatastreamMap::from_json(r#"{"d":{"windspeed":"w","humidity":"h"}}"#).unwrap();
        assert_eq!(
            serde_json::to_string(&map).unwrap(),
            r#"{"d":{"windspeed":"w","humidity":"h"}}"#
        );
    }

    #[test]
    fn test_route_reference_scenario() {
        let route = route("dev1", &reading(0.0), &test_map()).expect("dev1 is configured");

        assert!(route.skipped.is_empty());
        assert_eq!(
            route.submissions,
            vec![
                Submission {
                    kind: SensorKind::Temperature,
                    url: "http://x/temp".into(),
                    body: json!({ "result": 50.0 }),
                },
                Submission {
                    kind: SensorKind::Humidity,
                    url: "http://x/hum".into(),
                    body: json!({ "result": 100 }),
                },
            ]
        );
    }

    #[test]
    fn test_unknown_device() {
        let result = route("nobody", &reading(0.0), &test_map());
        assert_eq!(result, Err(RouteError::UnknownDevice("nobody".into())));
    }

    #[test]
    fn test_partial_map_routes_only_configured_kinds() {
        let route = route("dev3", &reading(1.0), &test_map()).unwrap();

        assert_eq!(route.submissions.len(), 1);
        assert_eq!(route.submissions[0].kind, SensorKind::Temperature);
    }

    #[test]
    fn test_windspeed_above_limit_skipped() {
        let route = route("dev2", &reading(200.01), &test_map()).unwrap();

        let kinds: Vec<SensorKind> = route.submissions.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![SensorKind::Temperature, SensorKind::Humidity]);
        assert_eq!(
            route.skipped,
            vec![InvalidReading {
                kind: SensorKind::Windspeed,
                value: 200.01
            }]
        );
    }

    #[test]
    fn test_windspeed_at_limit_included() {
        let route = route("dev2", &reading(200.0), &test_map()).unwrap();

        assert!(route.skipped.is_empty());
        assert_eq!(route.submissions[0].kind, SensorKind::Windspeed);
        assert_eq!(route.submissions[0].body, json!({ "result": 200.0 }));
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut map = DatastreamMap::default();
        assert!(map.is_empty());

        map.insert(
            "dev9",
            SensorRoutes::new(vec![(SensorKind::Humidity, "http://h".into())]),
        );
        assert_eq!(map.devices().collect::<Vec<_>>(), vec!["dev9"]);
        assert!(map.get("dev9").is_some_and(|r| r.len() == 1));
    }
}
