//! End-to-end parsing of realistic service responses.
//!
//! The fixtures under `data/` mirror the shape of a catalog query response
//! and a per-event detail response from the FDSN event service.

use std::collections::BTreeSet;

use quakefeed::time::{Timespec, isoformat};
use quakefeed::{
    AlertLevel, Content, EarthquakeCatalog, EarthquakeDetailFeature, ReviewStatus, ValidationError,
};

static CATALOG: &str = include_str!("data/catalog.json");
static DETAIL: &str = include_str!("data/detail.json");

#[test]
fn catalog_parses_and_normalizes() {
    let catalog: EarthquakeCatalog = serde_json::from_str(CATALOG).unwrap();
    assert_eq!(catalog.features.len(), 2);

    let alaska = &catalog.features[0];
    assert_eq!(alaska.id, "ak0226xu4nag");
    assert_eq!(alaska.properties.mag, Some(6.1));
    assert_eq!(alaska.properties.status, ReviewStatus::Reviewed);
    assert_eq!(alaska.properties.alert, Some(AlertLevel::Green));
    assert_eq!(alaska.properties.time.timestamp_millis(), 1653521357902);
    assert_eq!(
        alaska.properties.sources,
        BTreeSet::from(["ak".to_string(), "at".to_string(), "us".to_string()])
    );
    assert!(alaska.has_product_type("shakemap"));
    assert!(alaska.detail_url().contains("eventid=ak0226xu4nag"));

    let geometry = alaska.geometry.as_ref().unwrap();
    assert_eq!(geometry.longitude(), -160.3539);
    assert_eq!(geometry.latitude(), 54.4522);
    assert_eq!(geometry.depth(), Some(31.2));

    let petrolia = &catalog.features[1];
    assert_eq!(petrolia.properties.status, ReviewStatus::Automatic);
    assert_eq!(petrolia.properties.alert, None);
    assert_eq!(petrolia.properties.felt, None);
    assert_eq!(petrolia.properties.nst, Some(34));

    // Members outside the typed schema survive parsing.
    assert_eq!(catalog.extra["metadata"]["count"], 2);
    assert_eq!(catalog.bbox.as_ref().unwrap().len(), 6);
}

#[test]
fn catalog_encodes_instants_as_iso_z() {
    let catalog: EarthquakeCatalog = serde_json::from_str(CATALOG).unwrap();
    let encoded = catalog.to_value();

    let properties = &encoded["features"][0]["properties"];
    assert_eq!(properties["time"], "2022-05-25T23:29:17.902Z");
    assert_eq!(properties["updated"], "2023-01-11T17:10:17Z");
    assert_eq!(properties["alert"], "green");
    assert_eq!(properties["sources"], serde_json::json!(["ak", "at", "us"]));

    // The unrecognized-member bag round-trips.
    assert_eq!(encoded["metadata"]["api"], "1.13.6");
    assert_eq!(encoded["bbox"][0], -160.3539);
}

#[test]
fn detail_parses_products_and_contents() {
    let detail: EarthquakeDetailFeature = serde_json::from_str(DETAIL).unwrap();
    assert_eq!(detail.id, "ak0226xu4nag");
    assert_eq!(detail.products.len(), 2);

    let origin = &detail.products["origin"][0];
    assert_eq!(origin.source, "ak");
    assert_eq!(origin.status, "UPDATE");
    assert_eq!(origin.preferred_weight, Some(156));
    assert_eq!(origin.properties["magnitude"], "6.1");
    assert_eq!(origin.update_time.timestamp_millis(), 1653522445000);

    let quakeml = origin.contents["quakeml.xml"].as_url().unwrap();
    assert_eq!(quakeml.length, 48212);
    assert!(quakeml.url.ends_with("quakeml.xml"));

    // The impact-text product stores its content inline, with the feed's
    // implied UPDATE status.
    let impact = &detail.products["impact-text"][0];
    assert_eq!(impact.status, "UPDATE");
    match &impact.contents[""] {
        Content::Bytes(inline) => assert!(inline.bytes.starts_with("Felt strongly")),
        Content::Url(_) => panic!("expected inline content"),
    }

    assert!(detail.has_product_type("impact-text"));
}

#[test]
fn detail_round_trips_to_the_wire_shape() {
    let detail: EarthquakeDetailFeature = serde_json::from_str(DETAIL).unwrap();
    let encoded = detail.to_value();

    // Products re-nest under properties on the way out.
    let products = &encoded["properties"]["products"];
    assert_eq!(products["origin"][0]["type"], "origin");
    assert_eq!(products["origin"][0]["indexTime"], "2022-05-25T23:47:27Z");
    assert_eq!(
        products["impact-text"][0]["contents"][""]["contentType"],
        "text/plain"
    );
}

#[test]
fn invalid_status_fails_with_the_full_path() {
    let mut document: serde_json::Value = serde_json::from_str(CATALOG).unwrap();
    document["features"][1]["properties"]["status"] = serde_json::json!("pending");

    let err = EarthquakeCatalog::from_value(&document).unwrap_err();
    assert_eq!(
        err,
        ValidationError::EnumConstraint {
            path: "features[1].properties.status".to_string(),
            value: "pending".to_string(),
            allowed: &["automatic", "deleted", "reviewed"],
        }
    );
}

#[test]
fn missing_required_field_fails_with_the_full_path() {
    let mut document: serde_json::Value = serde_json::from_str(CATALOG).unwrap();
    document["features"][0]["properties"]
        .as_object_mut()
        .unwrap()
        .remove("net");

    let err = EarthquakeCatalog::from_value(&document).unwrap_err();
    assert_eq!(
        err.to_string(),
        "features[0].properties.net: expected string, got missing"
    );
}

#[test]
fn epoch_time_parses_exactly() {
    let mut document: serde_json::Value = serde_json::from_str(CATALOG).unwrap();
    document["features"][0]["properties"]["time"] = serde_json::json!(0);

    let catalog = EarthquakeCatalog::from_value(&document).unwrap();
    assert_eq!(
        catalog.features[0].properties.time,
        chrono::DateTime::UNIX_EPOCH
    );
    assert_eq!(
        isoformat(&catalog.features[0].properties.time, Timespec::Seconds),
        "1970-01-01T00:00:00Z"
    );
}
