//! Typed records for the earthquake event feeds.
//!
//! These specialize the generic GeoJSON model: properties become a typed
//! record with field-level normalization (millisecond timestamps to UTC
//! instants, comma-delimited strings to sets), geometry is constrained to a
//! point, and the closed vocabularies (`status`, `alert`) are validated at
//! construction. A record either constructs completely or not at all.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::decode::{
    as_object, extras, index, join, literal, opt_f64, opt_i64, opt_str, require_i64, require_ms,
    require_str, serde_via_value, structural, type_of, Obj,
};
use crate::error::ValidationError;
use crate::geojson::{bbox_from, collection_to_value, features_from, PointGeometry};
use crate::product::Product;
use crate::time::{isoformat, Timespec};

/// PAGER alert level of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Green,
    Yellow,
    Orange,
    Red,
}

impl AlertLevel {
    const ALLOWED: &'static [&'static str] = &["green", "yellow", "orange", "red"];

    fn parse(value: &str, path: &str) -> Result<Self, ValidationError> {
        match value {
            "green" => Ok(Self::Green),
            "yellow" => Ok(Self::Yellow),
            "orange" => Ok(Self::Orange),
            "red" => Ok(Self::Red),
            other => Err(ValidationError::EnumConstraint {
                path: path.to_string(),
                value: other.to_string(),
                allowed: Self::ALLOWED,
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Orange => "orange",
            Self::Red => "red",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review state of an event. Closed vocabulary: any other value is a
/// construction error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewStatus {
    Automatic,
    Deleted,
    Reviewed,
}

impl ReviewStatus {
    const ALLOWED: &'static [&'static str] = &["automatic", "deleted", "reviewed"];

    fn parse(value: &str, path: &str) -> Result<Self, ValidationError> {
        match value {
            "automatic" => Ok(Self::Automatic),
            "deleted" => Ok(Self::Deleted),
            "reviewed" => Ok(Self::Reviewed),
            other => Err(ValidationError::EnumConstraint {
                path: path.to_string(),
                value: other.to_string(),
                allowed: Self::ALLOWED,
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::Deleted => "deleted",
            Self::Reviewed => "reviewed",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// The feeds encode `ids`, `sources` and `types` as one comma-delimited
// string, e.g. ",us7000abcd,ak0221," — decoded ahead of field validation.
fn split_tokens(raw: Option<&str>) -> BTreeSet<String> {
    raw.unwrap_or("")
        .split(',')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn tokens_to_value(tokens: &BTreeSet<String>) -> Value {
    Value::from(tokens.iter().cloned().collect::<Vec<_>>())
}

/// Properties shared by summary and detail earthquake features.
#[derive(Debug, Clone, PartialEq)]
pub struct EarthquakeProperties {
    pub alert: Option<AlertLevel>,
    /// Reported intensity from the Did-You-Feel-It system.
    pub cdi: Option<f64>,
    pub code: String,
    /// Link to the full event record (the detail feed).
    pub detail: String,
    pub dmin: Option<f64>,
    /// Event type, e.g. `"earthquake"` or `"quarry blast"`.
    pub event_type: String,
    pub felt: Option<i64>,
    pub gap: Option<f64>,
    pub ids: BTreeSet<String>,
    pub mag: Option<f64>,
    pub mag_type: Option<String>,
    /// Instrumental intensity from ShakeMap.
    pub mmi: Option<f64>,
    pub net: String,
    pub nst: Option<i64>,
    pub place: String,
    pub rms: Option<f64>,
    /// Significance score; larger numbers mean a more significant event.
    pub sig: i64,
    pub sources: BTreeSet<String>,
    pub status: ReviewStatus,
    pub time: DateTime<Utc>,
    pub title: String,
    pub tsunami: Option<i64>,
    pub types: BTreeSet<String>,
    pub tz: Option<f64>,
    pub updated: DateTime<Utc>,
    pub url: String,
}

impl EarthquakeProperties {
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        Self::from_value_at(value, "")
    }

    pub(crate) fn from_value_at(value: &Value, path: &str) -> Result<Self, ValidationError> {
        let obj = as_object(value, path)?;

        // Delimited-set decode is a pre-validation coercion: absent, null
        // and "" all give the empty set.
        let ids = split_tokens(opt_str(obj, path, "ids")?.as_deref());
        let sources = split_tokens(opt_str(obj, path, "sources")?.as_deref());
        let types = split_tokens(opt_str(obj, path, "types")?.as_deref());

        let alert = match opt_str(obj, path, "alert")? {
            Some(raw) => Some(AlertLevel::parse(&raw, &join(path, "alert"))?),
            None => None,
        };
        let status = ReviewStatus::parse(&require_str(obj, path, "status")?, &join(path, "status"))?;

        Ok(Self {
            alert,
            cdi: opt_f64(obj, path, "cdi")?,
            code: require_str(obj, path, "code")?,
            detail: require_str(obj, path, "detail")?,
            dmin: opt_f64(obj, path, "dmin")?,
            event_type: opt_str(obj, path, "type")?.unwrap_or_else(|| "earthquake".to_string()),
            felt: opt_i64(obj, path, "felt")?,
            gap: opt_f64(obj, path, "gap")?,
            ids,
            mag: opt_f64(obj, path, "mag")?,
            mag_type: opt_str(obj, path, "magType")?,
            mmi: opt_f64(obj, path, "mmi")?,
            net: require_str(obj, path, "net")?,
            nst: opt_i64(obj, path, "nst")?,
            place: require_str(obj, path, "place")?,
            rms: opt_f64(obj, path, "rms")?,
            sig: require_i64(obj, path, "sig")?,
            sources,
            status,
            time: require_ms(obj, path, "time")?,
            title: require_str(obj, path, "title")?,
            tsunami: opt_i64(obj, path, "tsunami")?,
            types,
            tz: opt_f64(obj, path, "tz")?,
            updated: require_ms(obj, path, "updated")?,
            url: require_str(obj, path, "url")?,
        })
    }

    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        if let Some(alert) = self.alert {
            obj.insert("alert".to_string(), Value::from(alert.as_str()));
        }
        if let Some(cdi) = self.cdi {
            obj.insert("cdi".to_string(), Value::from(cdi));
        }
        obj.insert("code".to_string(), Value::from(self.code.clone()));
        obj.insert("detail".to_string(), Value::from(self.detail.clone()));
        if let Some(dmin) = self.dmin {
            obj.insert("dmin".to_string(), Value::from(dmin));
        }
        if let Some(felt) = self.felt {
            obj.insert("felt".to_string(), Value::from(felt));
        }
        if let Some(gap) = self.gap {
            obj.insert("gap".to_string(), Value::from(gap));
        }
        obj.insert("ids".to_string(), tokens_to_value(&self.ids));
        if let Some(mag) = self.mag {
            obj.insert("mag".to_string(), Value::from(mag));
        }
        if let Some(mag_type) = &self.mag_type {
            obj.insert("magType".to_string(), Value::from(mag_type.clone()));
        }
        if let Some(mmi) = self.mmi {
            obj.insert("mmi".to_string(), Value::from(mmi));
        }
        obj.insert("net".to_string(), Value::from(self.net.clone()));
        if let Some(nst) = self.nst {
            obj.insert("nst".to_string(), Value::from(nst));
        }
        obj.insert("place".to_string(), Value::from(self.place.clone()));
        if let Some(rms) = self.rms {
            obj.insert("rms".to_string(), Value::from(rms));
        }
        obj.insert("sig".to_string(), Value::from(self.sig));
        obj.insert("sources".to_string(), tokens_to_value(&self.sources));
        obj.insert("status".to_string(), Value::from(self.status.as_str()));
        obj.insert(
            "time".to_string(),
            Value::from(isoformat(&self.time, Timespec::Auto)),
        );
        obj.insert("title".to_string(), Value::from(self.title.clone()));
        if let Some(tsunami) = self.tsunami {
            obj.insert("tsunami".to_string(), Value::from(tsunami));
        }
        obj.insert("type".to_string(), Value::from(self.event_type.clone()));
        obj.insert("types".to_string(), tokens_to_value(&self.types));
        if let Some(tz) = self.tz {
            obj.insert("tz".to_string(), Value::from(tz));
        }
        obj.insert(
            "updated".to_string(),
            Value::from(isoformat(&self.updated, Timespec::Auto)),
        );
        obj.insert("url".to_string(), Value::from(self.url.clone()));
        Value::Object(obj)
    }
}

serde_via_value!(EarthquakeProperties);

/// An earthquake event from a summary feed or catalog query.
#[derive(Debug, Clone, PartialEq)]
pub struct EarthquakeFeature {
    pub id: String,
    pub properties: EarthquakeProperties,
    pub geometry: Option<PointGeometry>,
    /// Unrecognized top-level members, preserved verbatim.
    pub extra: Map<String, Value>,
}

/// Catalog entries are summary features: their `detail` property links to
/// the full event record.
pub type EarthquakeSummaryFeature = EarthquakeFeature;

impl EarthquakeFeature {
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        Self::from_value_at(value, "")
    }

    pub(crate) fn from_value_at(value: &Value, path: &str) -> Result<Self, ValidationError> {
        let obj = as_object(value, path)?;
        literal(obj, path, "type", "Feature")?;
        let properties = match obj.get("properties") {
            Some(value) => {
                EarthquakeProperties::from_value_at(value, &join(path, "properties"))?
            }
            None => return Err(structural(&join(path, "properties"), "object", "missing")),
        };
        Ok(Self {
            id: require_str(obj, path, "id")?,
            properties,
            geometry: point_geometry_from(obj, path)?,
            extra: extras(obj, &["type", "id", "properties", "geometry"]),
        })
    }

    /// Link to the full event record, served by the detail feed.
    pub fn detail_url(&self) -> &str {
        &self.properties.detail
    }

    /// Whether a product of the given type exists for this event.
    pub fn has_product_type(&self, product_type: &str) -> bool {
        self.properties.types.contains(product_type)
    }

    pub fn to_value(&self) -> Value {
        feature_to_value(&self.id, self.properties.to_value(), &self.geometry, &self.extra)
    }
}

serde_via_value!(EarthquakeFeature);

/// A full event record from the detail feed, carrying the event's products.
#[derive(Debug, Clone, PartialEq)]
pub struct EarthquakeDetailFeature {
    pub id: String,
    pub properties: EarthquakeProperties,
    /// Products keyed by product type code, each an ordered sequence.
    pub products: BTreeMap<String, Vec<Product>>,
    pub geometry: Option<PointGeometry>,
    pub extra: Map<String, Value>,
}

impl EarthquakeDetailFeature {
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        Self::from_value_at(value, "")
    }

    pub(crate) fn from_value_at(value: &Value, path: &str) -> Result<Self, ValidationError> {
        let obj = as_object(value, path)?;
        literal(obj, path, "type", "Feature")?;
        let ppath = join(path, "properties");
        let properties_value = obj
            .get("properties")
            .ok_or_else(|| structural(&ppath, "object", "missing"))?;
        let properties = EarthquakeProperties::from_value_at(properties_value, &ppath)?;
        let products = products_from(as_object(properties_value, &ppath)?, &ppath)?;
        Ok(Self {
            id: require_str(obj, path, "id")?,
            properties,
            products,
            geometry: point_geometry_from(obj, path)?,
            extra: extras(obj, &["type", "id", "properties", "geometry"]),
        })
    }

    /// Whether a product of the given type exists for this event.
    pub fn has_product_type(&self, product_type: &str) -> bool {
        self.properties.types.contains(product_type)
    }

    pub fn to_value(&self) -> Value {
        let mut properties = self.properties.to_value();
        if let Value::Object(obj) = &mut properties {
            let products = self
                .products
                .iter()
                .map(|(kind, products)| {
                    let sequence = products.iter().map(Product::to_value).collect();
                    (kind.clone(), Value::Array(sequence))
                })
                .collect();
            obj.insert("products".to_string(), Value::Object(products));
        }
        feature_to_value(&self.id, properties, &self.geometry, &self.extra)
    }
}

serde_via_value!(EarthquakeDetailFeature);

fn point_geometry_from(obj: &Obj, path: &str) -> Result<Option<PointGeometry>, ValidationError> {
    match obj.get("geometry") {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Ok(Some(PointGeometry::from_value_at(
            value,
            &join(path, "geometry"),
        )?)),
    }
}

fn products_from(
    properties: &Obj,
    ppath: &str,
) -> Result<BTreeMap<String, Vec<Product>>, ValidationError> {
    let prpath = join(ppath, "products");
    let value = properties
        .get("products")
        .ok_or_else(|| structural(&prpath, "object", "missing"))?;
    as_object(value, &prpath)?
        .iter()
        .map(|(kind, sequence)| {
            let kpath = join(&prpath, kind);
            let elements = sequence
                .as_array()
                .ok_or_else(|| structural(&kpath, "array", type_of(sequence)))?;
            let products = elements
                .iter()
                .enumerate()
                .map(|(i, element)| Product::from_value_at(element, &index(&kpath, i)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok((kind.clone(), products))
        })
        .collect()
}

fn feature_to_value(
    id: &str,
    properties: Value,
    geometry: &Option<PointGeometry>,
    extra: &Obj,
) -> Value {
    let mut obj = Map::new();
    obj.insert("type".to_string(), Value::from("Feature"));
    obj.insert("id".to_string(), Value::from(id));
    obj.insert("properties".to_string(), properties);
    if let Some(geometry) = geometry {
        obj.insert("geometry".to_string(), geometry.to_value());
    }
    for (key, value) in extra {
        obj.entry(key.clone()).or_insert_with(|| value.clone());
    }
    Value::Object(obj)
}

/// A catalog query result: a feature collection of summary features.
#[derive(Debug, Clone, PartialEq)]
pub struct EarthquakeCatalog {
    pub features: Vec<EarthquakeSummaryFeature>,
    pub bbox: Option<Vec<f64>>,
    pub extra: Map<String, Value>,
}

impl EarthquakeCatalog {
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        Self::from_value_at(value, "")
    }

    pub(crate) fn from_value_at(value: &Value, path: &str) -> Result<Self, ValidationError> {
        let obj = as_object(value, path)?;
        literal(obj, path, "type", "FeatureCollection")?;
        let features = features_from(obj, path, EarthquakeFeature::from_value_at)?;
        Ok(Self {
            features,
            bbox: bbox_from(obj, path)?,
            extra: extras(obj, &["type", "features", "bbox"]),
        })
    }

    pub fn to_value(&self) -> Value {
        let features = self
            .features
            .iter()
            .map(EarthquakeFeature::to_value)
            .collect();
        collection_to_value(features, &self.bbox, &self.extra)
    }
}

serde_via_value!(EarthquakeCatalog);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn properties_fixture() -> Value {
        json!({
            "mag": 6.1,
            "place": "98 km S of Sand Point, Alaska",
            "time": 0,
            "updated": 1653522445000_i64,
            "tz": null,
            "url": "https://earthquake.usgs.gov/earthquakes/eventpage/ak0226xu4nag",
            "detail": "https://earthquake.usgs.gov/fdsnws/event/1/query?eventid=ak0226xu4nag&format=geojson",
            "felt": null,
            "cdi": null,
            "mmi": 3.4,
            "alert": "green",
            "status": "reviewed",
            "tsunami": 1,
            "sig": 572,
            "net": "ak",
            "code": "0226xu4nag",
            "ids": ",ak0226xu4nag,us7000haxz,",
            "sources": ",ak,us,",
            "types": ",origin,phase-data,shakemap,",
            "nst": null,
            "dmin": null,
            "rms": 0.91,
            "gap": null,
            "magType": "mww",
            "type": "earthquake",
            "title": "M 6.1 - 98 km S of Sand Point, Alaska",
        })
    }

    #[test]
    fn properties_normalize_timestamps_and_sets() {
        let properties = EarthquakeProperties::from_value(&properties_fixture()).unwrap();
        assert_eq!(properties.time, chrono::DateTime::UNIX_EPOCH);
        assert_eq!(properties.updated.timestamp_millis(), 1653522445000);
        assert_eq!(
            properties.ids,
            BTreeSet::from(["ak0226xu4nag".to_string(), "us7000haxz".to_string()])
        );
        assert_eq!(properties.status, ReviewStatus::Reviewed);
        assert_eq!(properties.alert, Some(AlertLevel::Green));
        assert_eq!(properties.felt, None);
        assert_eq!(properties.event_type, "earthquake");
    }

    #[test]
    fn split_tokens_matrix() {
        assert!(split_tokens(None).is_empty());
        assert!(split_tokens(Some("")).is_empty());
        assert_eq!(
            split_tokens(Some("a,b,")),
            BTreeSet::from(["a".to_string(), "b".to_string()])
        );
        assert_eq!(
            split_tokens(Some(",a,,a,")),
            BTreeSet::from(["a".to_string()])
        );
    }

    #[test]
    fn absent_set_fields_default_to_empty() {
        let mut fixture = properties_fixture();
        let obj = fixture.as_object_mut().unwrap();
        obj.remove("sources");
        obj.remove("ids");
        obj.remove("types");
        let properties = EarthquakeProperties::from_value(&fixture).unwrap();
        assert!(properties.sources.is_empty());
        assert!(properties.ids.is_empty());
        assert!(properties.types.is_empty());
    }

    #[test]
    fn unknown_status_is_an_enum_error() {
        let mut fixture = properties_fixture();
        fixture["status"] = json!("pending");
        let err = EarthquakeProperties::from_value(&fixture).unwrap_err();
        assert_eq!(
            err,
            ValidationError::EnumConstraint {
                path: "status".to_string(),
                value: "pending".to_string(),
                allowed: &["automatic", "deleted", "reviewed"],
            }
        );
    }

    #[test]
    fn unknown_alert_is_an_enum_error() {
        let mut fixture = properties_fixture();
        fixture["alert"] = json!("purple");
        let err = EarthquakeProperties::from_value(&fixture).unwrap_err();
        assert!(matches!(err, ValidationError::EnumConstraint { ref path, .. } if path == "alert"));
    }

    #[test]
    fn missing_required_field_fails_atomically() {
        let mut fixture = properties_fixture();
        fixture.as_object_mut().unwrap().remove("code");
        let err = EarthquakeProperties::from_value(&fixture).unwrap_err();
        assert_eq!(err.to_string(), "code: expected string, got missing");
    }

    #[test]
    fn event_type_defaults_to_earthquake() {
        let mut fixture = properties_fixture();
        fixture.as_object_mut().unwrap().remove("type");
        let properties = EarthquakeProperties::from_value(&fixture).unwrap();
        assert_eq!(properties.event_type, "earthquake");
    }

    #[test]
    fn feature_constrains_geometry_to_a_point() {
        let feature = json!({
            "type": "Feature",
            "id": "ak0226xu4nag",
            "properties": properties_fixture(),
            "geometry": { "type": "LineString", "coordinates": [0.0, 0.0] },
        });
        let err = EarthquakeFeature::from_value(&feature).unwrap_err();
        assert_eq!(
            err.to_string(),
            "geometry.type: expected \"Point\", got \"LineString\""
        );
    }

    #[test]
    fn feature_exposes_detail_link_and_product_types() {
        let feature = EarthquakeFeature::from_value(&json!({
            "type": "Feature",
            "id": "ak0226xu4nag",
            "properties": properties_fixture(),
            "geometry": { "type": "Point", "coordinates": [-160.36, 54.43, 28.6] },
        }))
        .unwrap();
        assert!(feature.detail_url().contains("eventid=ak0226xu4nag"));
        assert!(feature.has_product_type("shakemap"));
        assert!(!feature.has_product_type("dyfi"));
        let geometry = feature.geometry.as_ref().unwrap();
        assert_eq!(geometry.latitude(), 54.43);
        assert_eq!(geometry.depth(), Some(28.6));
    }

    #[test]
    fn catalog_end_to_end_with_epoch_time() {
        let catalog = EarthquakeCatalog::from_value(&json!({
            "type": "FeatureCollection",
            "metadata": { "generated": 1653522490000_i64, "count": 1 },
            "features": [{
                "type": "Feature",
                "id": "ak0226xu4nag",
                "properties": properties_fixture(),
                "geometry": { "type": "Point", "coordinates": [-160.36, 54.43, 28.6] },
            }],
            "bbox": [-160.36, 54.43, 28.6, -160.36, 54.43, 28.6],
        }))
        .unwrap();
        assert_eq!(catalog.features.len(), 1);
        assert_eq!(catalog.features[0].properties.time, chrono::DateTime::UNIX_EPOCH);
        assert_eq!(catalog.extra["metadata"]["count"], 1);
    }

    #[test]
    fn encode_uses_iso_instants_and_keeps_extras() {
        let catalog = EarthquakeCatalog::from_value(&json!({
            "type": "FeatureCollection",
            "metadata": { "count": 1 },
            "features": [{
                "type": "Feature",
                "id": "ak0226xu4nag",
                "properties": properties_fixture(),
                "geometry": { "type": "Point", "coordinates": [-160.36, 54.43, 28.6] },
            }],
        }))
        .unwrap();
        let encoded = catalog.to_value();
        assert_eq!(encoded["metadata"]["count"], 1);
        let properties = &encoded["features"][0]["properties"];
        assert_eq!(properties["time"], "1970-01-01T00:00:00Z");
        assert_eq!(properties["ids"][0], "ak0226xu4nag");
        assert_eq!(properties["status"], "reviewed");
    }

    #[test]
    fn wrong_collection_discriminant() {
        let err = EarthquakeCatalog::from_value(&json!({
            "type": "Feature",
            "features": [],
        }))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "type: expected \"FeatureCollection\", got \"Feature\""
        );
    }
}
