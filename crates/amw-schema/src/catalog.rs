// SPDX-License-Identifier: BUSL-1.1
//! # Catalog-Delivery Schemas
//!
//! The standard document types exchanged by the ingestion pipeline:
//! products, tracks, track bundles, and takedowns, plus the shared
//! sub-documents they embed. A track and a track bundle are both extensions
//! of the product contract.
//!
//! Deliveries carry one of two actions: `upsert` (create or replace) and
//! `takedown` (remove from sale). A takedown needs nothing beyond the action
//! and the product's catalog key.

use std::sync::Arc;

use crate::field::FieldKind;
use crate::registry::{Schema, SchemaRegistry};

/// Actions a delivery may request.
pub const VALID_ACTIONS: &[&str] = &["upsert", "takedown"];

/// Event name for full product deliveries.
pub const PRODUCT_EVENT: &str = "product";
/// Event name for single-track deliveries.
pub const TRACK_EVENT: &str = "track";
/// Event name for track-bundle (album) deliveries.
pub const TRACK_BUNDLE_EVENT: &str = "track_bundle";
/// Event name for takedown requests.
pub const TAKEDOWN_EVENT: &str = "takedown";

/// Schema for an artist reference.
pub fn artist() -> Arc<Schema> {
    Schema::builder("artist")
        .required("name", FieldKind::String)
        .optional("url", FieldKind::String)
        .build()
}

/// Schema for a participant (performer, producer, ...) on a track.
pub fn participant() -> Arc<Schema> {
    Schema::builder("participant")
        .required("name", FieldKind::String)
        .required("role", FieldKind::String)
        .build()
}

/// Schema for a copyright line.
pub fn copyright() -> Arc<Schema> {
    Schema::builder("copyright")
        .required("text", FieldKind::String)
        .optional("year", FieldKind::Integer)
        .build()
}

/// Schema for a media file reference.
///
/// `count` and `number` are more likely to be provided for images than for
/// audio files.
pub fn media() -> Arc<Schema> {
    Schema::builder("media")
        .required("source", FieldKind::String)
        .optional("count", FieldKind::Integer)
        .optional("number", FieldKind::Integer)
        .build()
}

/// Schema for the physical representation of a bundle.
pub fn physical_product() -> Arc<Schema> {
    Schema::builder("physical_product")
        .required("artist", FieldKind::String)
        .required("name", FieldKind::String)
        .required("upc", FieldKind::Upc)
        .build()
}

/// Schema for a release date.
pub fn release() -> Arc<Schema> {
    Schema::builder("release")
        .required("date", FieldKind::Date)
        .required("year", FieldKind::Integer)
        .build()
}

/// Schema for a sub-label and the countries it covers.
pub fn sub_label() -> Arc<Schema> {
    Schema::builder("sub_label")
        .required("name", FieldKind::String)
        .required("countries", FieldKind::List(Box::new(FieldKind::String)))
        .build()
}

/// Schema for a label.
pub fn label() -> Arc<Schema> {
    Schema::builder("label")
        .required("name", FieldKind::String)
        .required(
            "sub_labels",
            FieldKind::List(Box::new(FieldKind::Nested(sub_label()))),
        )
        .build()
}

/// Schema for a content provider.
pub fn provider() -> Arc<Schema> {
    Schema::builder("provider")
        .required("name", FieldKind::String)
        .required(
            "labels",
            FieldKind::List(Box::new(FieldKind::Nested(label()))),
        )
        .build()
}

/// Schema for one sales territory.
pub fn sales_territory() -> Arc<Schema> {
    Schema::builder("sales_territory")
        .required("country_code", FieldKind::String)
        .optional("price_code", FieldKind::String)
        .required("sales_start_date", FieldKind::Date)
        .optional("sales_end_date", FieldKind::Date)
        .build()
}

/// Schema for the usage-rule flags attached to every product.
pub fn usage_rules() -> Arc<Schema> {
    Schema::builder("usage_rules")
        .required("allow_bundle", FieldKind::Boolean)
        .required("allow_burn_play_on_pc", FieldKind::Boolean)
        .required("allow_burn_to_cd", FieldKind::Boolean)
        .required("allow_mobile", FieldKind::Boolean)
        .required("allow_permanent", FieldKind::Boolean)
        .required("allow_promotional", FieldKind::Boolean)
        .required("allow_streaming", FieldKind::Boolean)
        .required("allow_subscription", FieldKind::Boolean)
        .required("allow_transfer_to_nsdmi", FieldKind::Boolean)
        .required("allow_transfer_to_sdmi", FieldKind::Boolean)
        .required("allow_unbundle", FieldKind::Boolean)
        .required("delete_on_clock_rollback", FieldKind::Boolean)
        .required("disable_on_clock_rollback", FieldKind::Boolean)
        .required("drm_free", FieldKind::Boolean)
        .required("limited", FieldKind::Boolean)
        .build()
}

/// Schema for a product delivery: the contract every sellable item meets.
pub fn product() -> Arc<Schema> {
    Schema::builder(PRODUCT_EVENT)
        .required("action", FieldKind::OneOf(VALID_ACTIONS))
        .required("amw_key", FieldKind::String)
        .required("artist", FieldKind::Nested(artist()))
        .required("copyright", FieldKind::Nested(copyright()))
        .optional("duration", FieldKind::Integer)
        .required("explicit_lyrics", FieldKind::Boolean)
        .required("genre", FieldKind::String)
        .required("media", FieldKind::Nested(media()))
        .required("provider", FieldKind::Nested(provider()))
        .optional("publisher", FieldKind::String)
        .required(
            "sales_territories",
            FieldKind::List(Box::new(FieldKind::Nested(sales_territory()))),
        )
        .required("title", FieldKind::String)
        .required("usage_rules", FieldKind::Nested(usage_rules()))
        .optional("version", FieldKind::String)
        .build()
}

/// Schema for a track delivery: the product contract plus track placement
/// and the recording's ISRC.
pub fn track() -> Arc<Schema> {
    Schema::builder(TRACK_EVENT)
        .extend(&product())
        .required("index", FieldKind::Integer)
        .optional("internal_id", FieldKind::String)
        .required("isrc", FieldKind::Isrc)
        .required("number", FieldKind::Integer)
        .optional(
            "participants",
            FieldKind::List(Box::new(FieldKind::Nested(participant()))),
        )
        .optional("title_extended", FieldKind::String)
        .required("volume", FieldKind::Integer)
        .optional("windows_drm_id", FieldKind::String)
        .build()
}

/// Schema for a track-bundle delivery: the product contract plus bundle
/// identifiers, the release date, and the embedded tracks.
pub fn track_bundle() -> Arc<Schema> {
    Schema::builder(TRACK_BUNDLE_EVENT)
        .extend(&product())
        .optional("catalog_number", FieldKind::String)
        .optional("ean", FieldKind::Ean)
        .optional("grid", FieldKind::String)
        .optional("icpn", FieldKind::String)
        .required("internal_id", FieldKind::String)
        .optional("physical", FieldKind::Nested(physical_product()))
        .optional("product_code", FieldKind::String)
        .required("release", FieldKind::Nested(release()))
        .required("track_count", FieldKind::Integer)
        .required("tracks", FieldKind::List(Box::new(FieldKind::Nested(track()))))
        .required("type", FieldKind::String)
        .required("upc", FieldKind::Upc)
        .required("volume_count", FieldKind::Integer)
        .build()
}

/// Schema for a takedown request: only the action and the catalog key are
/// needed to pull a product.
pub fn takedown() -> Arc<Schema> {
    Schema::builder(TAKEDOWN_EVENT)
        .required("action", FieldKind::OneOf(VALID_ACTIONS))
        .required("amw_key", FieldKind::String)
        .build()
}

/// Registry with the standard delivery document types registered under
/// their event names.
pub fn delivery_registry() -> SchemaRegistry {
    SchemaRegistry::builder()
        .register(product())
        .register(track())
        .register(track_bundle())
        .register(takedown())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn sample_usage_rules() -> Value {
        json!({
            "allow_bundle": true,
            "allow_burn_play_on_pc": true,
            "allow_burn_to_cd": false,
            "allow_mobile": true,
            "allow_permanent": true,
            "allow_promotional": false,
            "allow_streaming": true,
            "allow_subscription": true,
            "allow_transfer_to_nsdmi": false,
            "allow_transfer_to_sdmi": false,
            "allow_unbundle": false,
            "delete_on_clock_rollback": false,
            "disable_on_clock_rollback": false,
            "drm_free": true,
            "limited": false,
        })
    }

    fn sample_track(number: u32, isrc: &str) -> Value {
        json!({
            "action": "upsert",
            "amw_key": format!("trk-{number}"),
            "artist": {"name": "Example Artist"},
            "copyright": {"text": "(C) 2016 Example", "year": 2016},
            "explicit_lyrics": false,
            "genre": "Electronic",
            "index": number,
            "isrc": isrc,
            "media": {"source": format!("audio/{number}.flac")},
            "number": number,
            "provider": sample_provider(),
            "sales_territories": [
                {"country_code": "US", "sales_start_date": "2016-03-25"},
            ],
            "title": format!("Track {number}"),
            "usage_rules": sample_usage_rules(),
            "volume": 1,
        })
    }

    fn sample_provider() -> Value {
        json!({
            "name": "acme-music",
            "labels": [
                {
                    "name": "Acme Records",
                    "sub_labels": [{"name": "Acme Digital", "countries": ["US", "GB"]}],
                },
            ],
        })
    }

    fn sample_track_bundle() -> Value {
        json!({
            "action": "upsert",
            "amw_key": "bnd-1",
            "artist": {"name": "Example Artist", "url": "https://example.test/artist"},
            "copyright": {"text": "(C) 2016 Example"},
            "explicit_lyrics": false,
            "genre": "Electronic",
            "internal_id": "internal-77",
            "media": {"source": "images/cover.jpg", "count": 1, "number": 1},
            "provider": sample_provider(),
            "release": {"date": "03/25/2016", "year": 2016},
            "sales_territories": [
                {"country_code": "US", "sales_start_date": "2016-03-25"},
                {"country_code": "GB", "sales_start_date": "25 Mar 2016", "sales_end_date": "2026-01-01"},
            ],
            "title": "Example Bundle",
            "track_count": 2,
            "tracks": [
                sample_track(1, "US-RC1-76-54321"),
                sample_track(2, "us-rc1-76-54322"),
            ],
            "type": "album",
            "upc": "00616892587125",
            "usage_rules": sample_usage_rules(),
            "volume_count": 1,
        })
    }

    #[test]
    fn valid_track_bundle_passes_and_normalizes() {
        let normalized = track_bundle()
            .validate(&sample_track_bundle())
            .expect("valid bundle");

        // Identifier and date fields come out canonical.
        assert_eq!(normalized["upc"], "616892587125");
        assert_eq!(normalized["release"]["date"], "2016-03-25");
        assert_eq!(normalized["tracks"][0]["isrc"], "USRC17654321");
        assert_eq!(normalized["tracks"][1]["isrc"], "USRC17654322");
        assert_eq!(
            normalized["sales_territories"][1]["sales_start_date"],
            "2016-03-25"
        );
    }

    #[test]
    fn empty_document_reports_every_required_field() {
        let err = track_bundle().validate(&json!({})).unwrap_err();

        let required = [
            "action",
            "amw_key",
            "artist",
            "copyright",
            "explicit_lyrics",
            "genre",
            "internal_id",
            "media",
            "provider",
            "release",
            "sales_territories",
            "title",
            "track_count",
            "tracks",
            "type",
            "upc",
            "usage_rules",
            "volume_count",
        ];
        let paths: Vec<_> = err.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, required);
    }

    #[test]
    fn invalid_track_action_is_reported_with_its_path() {
        let mut bundle = sample_track_bundle();
        bundle["tracks"][1]["action"] = json!("obliterate");

        let err = track_bundle().validate(&bundle).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.errors[0].path, "tracks[1].action");
    }

    #[test]
    fn missing_track_isrc_is_reported_with_its_path() {
        let mut bundle = sample_track_bundle();
        bundle["tracks"][0]
            .as_object_mut()
            .expect("track object")
            .remove("isrc");

        let err = track_bundle().validate(&bundle).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.errors[0].path, "tracks[0].isrc");
        assert_eq!(err.errors[0].message, "required field is missing");
    }

    #[test]
    fn bad_upc_and_bad_date_surface_together() {
        let mut bundle = sample_track_bundle();
        bundle["upc"] = json!("616892587124");
        bundle["release"]["date"] = json!("someday soon");

        let err = track_bundle().validate(&bundle).unwrap_err();
        let paths: Vec<_> = err.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["release.date", "upc"]);
    }

    #[test]
    fn minimal_takedown_passes() {
        let normalized = takedown()
            .validate(&json!({"action": "Takedown", "amw_key": "123"}))
            .expect("valid takedown");
        assert_eq!(normalized["action"], "takedown");
        assert_eq!(normalized["amw_key"], "123");
    }

    #[test]
    fn takedown_requires_action_and_key() {
        for doc in [
            json!({}),
            json!({"action": "takedown"}),
            json!({"amw_key": "123"}),
            json!({"action": "upsert?", "amw_key": "123"}),
        ] {
            assert!(takedown().validate(&doc).is_err(), "doc: {doc}");
        }
    }

    #[test]
    fn registry_covers_all_delivery_events() {
        let registry = delivery_registry();
        for event in [PRODUCT_EVENT, TRACK_EVENT, TRACK_BUNDLE_EVENT, TAKEDOWN_EVENT] {
            assert!(registry.get(event).is_some(), "missing schema for {event}");
        }
    }
}
