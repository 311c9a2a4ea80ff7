//! Generic GeoJSON model: features, feature collections and geometries.
//!
//! The schema is open by design — upstream services add members over time —
//! so unknown members are preserved in an `extra` bag instead of being
//! rejected, and records round-trip back to JSON without losing them.

use serde_json::{Map, Value};

use crate::decode::{
    as_array, as_object, extras, index, join, literal, number, require_str, serde_via_value,
    structural, Obj,
};
use crate::error::ValidationError;

/// A geometry of any type, with a flat coordinate sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    /// Geometry type, e.g. `"Point"`.
    pub kind: String,
    pub coordinates: Vec<f64>,
}

impl Geometry {
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        Self::from_value_at(value, "")
    }

    pub(crate) fn from_value_at(value: &Value, path: &str) -> Result<Self, ValidationError> {
        let obj = as_object(value, path)?;
        let kind = require_str(obj, path, "type")?;
        let coordinates = coordinates_from(obj, path)?;
        Ok(Self { kind, coordinates })
    }

    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_string(), Value::from(self.kind.clone()));
        obj.insert(
            "coordinates".to_string(),
            Value::from(self.coordinates.clone()),
        );
        Value::Object(obj)
    }
}

serde_via_value!(Geometry);

/// A `"Point"` geometry with 2 or 3 coordinates
/// `[longitude, latitude, depth?]`.
///
/// The coordinate count is validated at construction, so the positional
/// accessors cannot fail.
#[derive(Debug, Clone, PartialEq)]
pub struct PointGeometry {
    coordinates: Vec<f64>,
}

impl PointGeometry {
    pub fn new(longitude: f64, latitude: f64, depth: Option<f64>) -> Self {
        let mut coordinates = vec![longitude, latitude];
        if let Some(depth) = depth {
            coordinates.push(depth);
        }
        Self { coordinates }
    }

    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        Self::from_value_at(value, "")
    }

    pub(crate) fn from_value_at(value: &Value, path: &str) -> Result<Self, ValidationError> {
        let obj = as_object(value, path)?;
        let kind = require_str(obj, path, "type")?;
        if kind != "Point" {
            return Err(structural(
                &join(path, "type"),
                "\"Point\"",
                format!("\"{kind}\""),
            ));
        }
        let coordinates = coordinates_from(obj, path)?;
        if !(2..=3).contains(&coordinates.len()) {
            return Err(structural(
                &join(path, "coordinates"),
                "2 or 3 numbers",
                format!("{} elements", coordinates.len()),
            ));
        }
        Ok(Self { coordinates })
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }

    /// Depth in kilometers, when the geometry carries a third coordinate.
    pub fn depth(&self) -> Option<f64> {
        self.coordinates.get(2).copied()
    }

    pub fn coordinates(&self) -> &[f64] {
        &self.coordinates
    }

    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_string(), Value::from("Point"));
        obj.insert(
            "coordinates".to_string(),
            Value::from(self.coordinates.clone()),
        );
        Value::Object(obj)
    }
}

serde_via_value!(PointGeometry);

impl TryFrom<Geometry> for PointGeometry {
    type Error = ValidationError;

    fn try_from(geometry: Geometry) -> Result<Self, Self::Error> {
        if geometry.kind != "Point" {
            return Err(structural(
                "type",
                "\"Point\"",
                format!("\"{}\"", geometry.kind),
            ));
        }
        if !(2..=3).contains(&geometry.coordinates.len()) {
            return Err(structural(
                "coordinates",
                "2 or 3 numbers",
                format!("{} elements", geometry.coordinates.len()),
            ));
        }
        Ok(Self {
            coordinates: geometry.coordinates,
        })
    }
}

fn coordinates_from(obj: &Obj, path: &str) -> Result<Vec<f64>, ValidationError> {
    let cpath = join(path, "coordinates");
    let value = obj
        .get("coordinates")
        .ok_or_else(|| structural(&cpath, "array", "missing"))?;
    as_array(value, &cpath)?
        .iter()
        .enumerate()
        .map(|(i, element)| number(element, &index(&cpath, i)))
        .collect()
}

/// A single GeoJSON feature with an open property bag.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: String,
    pub properties: Map<String, Value>,
    pub geometry: Option<Geometry>,
    /// Unrecognized top-level members, preserved verbatim.
    pub extra: Map<String, Value>,
}

impl Feature {
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        Self::from_value_at(value, "")
    }

    pub(crate) fn from_value_at(value: &Value, path: &str) -> Result<Self, ValidationError> {
        let obj = as_object(value, path)?;
        literal(obj, path, "type", "Feature")?;
        let properties = match obj.get("properties") {
            Some(value) => as_object(value, &join(path, "properties"))?.clone(),
            None => return Err(structural(&join(path, "properties"), "object", "missing")),
        };
        let geometry = match obj.get("geometry") {
            None | Some(Value::Null) => None,
            Some(value) => Some(Geometry::from_value_at(value, &join(path, "geometry"))?),
        };
        Ok(Self {
            id: require_str(obj, path, "id")?,
            properties,
            geometry,
            extra: extras(obj, &["type", "id", "properties", "geometry"]),
        })
    }

    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_string(), Value::from("Feature"));
        obj.insert("id".to_string(), Value::from(self.id.clone()));
        obj.insert(
            "properties".to_string(),
            Value::Object(self.properties.clone()),
        );
        if let Some(geometry) = &self.geometry {
            obj.insert("geometry".to_string(), geometry.to_value());
        }
        for (key, value) in &self.extra {
            obj.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Value::Object(obj)
    }
}

serde_via_value!(Feature);

/// An ordered collection of features.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    /// Bounding box of 4 (2D) or 6 (3D) numbers, when present.
    pub bbox: Option<Vec<f64>>,
    pub extra: Map<String, Value>,
}

impl FeatureCollection {
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        Self::from_value_at(value, "")
    }

    pub(crate) fn from_value_at(value: &Value, path: &str) -> Result<Self, ValidationError> {
        let obj = as_object(value, path)?;
        literal(obj, path, "type", "FeatureCollection")?;
        let features = features_from(obj, path, Feature::from_value_at)?;
        Ok(Self {
            features,
            bbox: bbox_from(obj, path)?,
            extra: extras(obj, &["type", "features", "bbox"]),
        })
    }

    pub fn to_value(&self) -> Value {
        let features = self.features.iter().map(Feature::to_value).collect();
        collection_to_value(features, &self.bbox, &self.extra)
    }
}

serde_via_value!(FeatureCollection);

pub(crate) fn features_from<T>(
    obj: &Obj,
    path: &str,
    parse: impl Fn(&Value, &str) -> Result<T, ValidationError>,
) -> Result<Vec<T>, ValidationError> {
    let fpath = join(path, "features");
    let value = obj
        .get("features")
        .ok_or_else(|| structural(&fpath, "array", "missing"))?;
    as_array(value, &fpath)?
        .iter()
        .enumerate()
        .map(|(i, element)| parse(element, &index(&fpath, i)))
        .collect()
}

pub(crate) fn bbox_from(obj: &Obj, path: &str) -> Result<Option<Vec<f64>>, ValidationError> {
    let value = match obj.get("bbox") {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => value,
    };
    let bpath = join(path, "bbox");
    let elements = as_array(value, &bpath)?;
    if elements.len() != 4 && elements.len() != 6 {
        return Err(structural(
            &bpath,
            "4 or 6 numbers",
            format!("{} elements", elements.len()),
        ));
    }
    elements
        .iter()
        .enumerate()
        .map(|(i, element)| number(element, &index(&bpath, i)))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

pub(crate) fn collection_to_value(
    features: Vec<Value>,
    bbox: &Option<Vec<f64>>,
    extra: &Obj,
) -> Value {
    let mut obj = Map::new();
    obj.insert("type".to_string(), Value::from("FeatureCollection"));
    obj.insert("features".to_string(), Value::Array(features));
    if let Some(bbox) = bbox {
        obj.insert("bbox".to_string(), Value::from(bbox.clone()));
    }
    for (key, value) in extra {
        obj.entry(key.clone()).or_insert_with(|| value.clone());
    }
    Value::Object(obj)
}
