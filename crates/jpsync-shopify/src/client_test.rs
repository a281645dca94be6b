use std::collections::BTreeSet;

use chrono::Utc;
use jpsync_core::{ImageDescriptor, VariantRecord};

use super::*;

fn record() -> ProductRecord {
    ProductRecord {
        source_id: "001BSM231001".to_owned(),
        source_url: "https://jp.bape.com/products/001bsm231001".to_owned(),
        vendor: Vendor::Bape,
        title_src: "シャークフーディ".to_owned(),
        title_tgt: Some("BAPE 鯊魚連帽衫".to_owned()),
        description_src: "<p>原文</p>".to_owned(),
        description_tgt: None,
        images: vec![
            ImageDescriptor {
                url: "https://cdn.example/1.jpg".to_owned(),
                alt: Some("front".to_owned()),
            },
            ImageDescriptor {
                url: "https://cdn.example/2.jpg".to_owned(),
                alt: None,
            },
        ],
        variants: vec![VariantRecord {
            option_values: vec![
                ("color".to_owned(), "BLACK".to_owned()),
                ("size".to_owned(), "M".to_owned()),
            ],
            sku: Some("001BSM231001-BLK-M".to_owned()),
            source_price: 10_000,
            target_price: 2460,
            available: true,
            image_index: Some(1),
        }],
        categories: BTreeSet::from(["mens".to_owned()]),
        fetched_at: Utc::now(),
    }
}

fn config() -> CatalogConfig {
    CatalogConfig {
        shop: "jp-select".to_owned(),
        access_token: "shpat_test".to_owned(),
        api_version: "2024-01".to_owned(),
        location_id: None,
        in_stock_quantity: 2,
        timeout: Duration::from_secs(30),
        page_delay: Duration::ZERO,
        backoff_base_ms: 0,
    }
}

#[test]
fn admin_base_url_uses_shop_and_version() {
    assert_eq!(
        config().admin_base_url(),
        "https://jp-select.myshopify.com/admin/api/2024-01/"
    );
}

#[test]
fn endpoint_joins_relative_to_base() {
    let client =
        ShopifyClient::with_base_url(&config(), "http://127.0.0.1:9999/admin/api/2024-01")
            .unwrap();
    assert_eq!(
        client.endpoint("products/7.json").unwrap().as_str(),
        "http://127.0.0.1:9999/admin/api/2024-01/products/7.json"
    );
}

#[test]
fn debug_redacts_access_token() {
    let shown = format!("{:?}", config());
    assert!(!shown.contains("shpat_test"));
    assert!(shown.contains("[redacted]"));
}

#[test]
fn product_payload_carries_handle_metafields_and_translation() {
    let payload = product_payload(&record());
    let product = &payload["product"];
    assert_eq!(product["handle"], "bape-001bsm231001");
    assert_eq!(product["title"], "BAPE 鯊魚連帽衫");
    assert_eq!(product["body_html"], "<p>原文</p>");
    assert_eq!(product["vendor"], "BAPE");
    assert_eq!(product["status"], "active");
    assert_eq!(product["tags"], "BAPE, mens");
    assert_eq!(product["options"][0]["name"], "Color");
    assert_eq!(product["options"][1]["name"], "Size");
    assert_eq!(product["metafields"][0]["key"], "link");
    assert_eq!(
        product["metafields"][0]["value"],
        "https://jp.bape.com/products/001bsm231001"
    );
    assert_eq!(product["metafields"][1]["value"], "001BSM231001");
    assert_eq!(product["images"][0]["alt"], "front");
    assert!(product["images"][1].get("alt").is_none());
}

#[test]
fn variant_payload_maps_options_positionally() {
    let payload = variant_payload(&record().variants[0]);
    assert_eq!(payload["option1"], "BLACK");
    assert_eq!(payload["option2"], "M");
    assert!(payload.get("option3").is_none());
    assert_eq!(payload["price"], "2460");
    assert_eq!(payload["sku"], "001BSM231001-BLK-M");
    assert_eq!(payload["inventory_management"], "shopify");
}

#[test]
fn option_label_capitalizes_first_letter() {
    assert_eq!(option_label("size"), "Size");
    assert_eq!(option_label(""), "");
}

#[test]
fn parse_money_rounds_to_whole_units() {
    assert_eq!(crate::types::parse_money("2460.00"), 2460);
    assert_eq!(crate::types::parse_money("2459.5"), 2460);
    assert_eq!(crate::types::parse_money("n/a"), 0);
}

#[test]
fn product_node_converts_legacy_ids_and_metafields() {
    let node: ProductNode = serde_json::from_value(json!({
        "legacyResourceId": "7001",
        "handle": "bape-001bsm231001",
        "title": "BAPE 鯊魚連帽衫",
        "descriptionHtml": "",
        "status": "DRAFT",
        "link": { "value": "https://jp.bape.com/products/001bsm231001" },
        "sourceId": null,
        "variants": { "nodes": [{
            "legacyResourceId": "8001",
            "sku": "",
            "price": "2460.00",
            "inventoryQuantity": 2,
            "selectedOptions": [
                { "name": "Color", "value": "BLACK" },
                { "name": "Size", "value": "M" }
            ],
            "inventoryItem": { "legacyResourceId": "9001" }
        }]}
    }))
    .unwrap();
    let product = node.into_catalog().unwrap();
    assert_eq!(product.id, 7001);
    assert_eq!(product.status, ProductStatus::Draft);
    assert_eq!(
        product.source_url.as_deref(),
        Some("https://jp.bape.com/products/001bsm231001")
    );
    assert!(product.source_id.is_none());
    let variant = &product.variants[0];
    assert_eq!(variant.id, 8001);
    assert_eq!(variant.inventory_item_id, Some(9001));
    assert_eq!(variant.option_values, vec!["BLACK", "M"]);
    assert!(variant.sku.is_none());
    assert_eq!(variant.price, 2460);
    assert!(variant.available);
}

#[test]
fn product_node_reports_a_truncated_variant_page() {
    let node = |has_next: bool| -> ProductNode {
        serde_json::from_value(json!({
            "legacyResourceId": "7002",
            "handle": "workman-wide",
            "title": "WORKMAN 外套",
            "status": "ACTIVE",
            "variants": {
                "pageInfo": { "hasNextPage": has_next },
                "nodes": [{
                    "legacyResourceId": "8002",
                    "price": "1980.00",
                    "selectedOptions": [{ "name": "Size", "value": "LL" }]
                }]
            }
        }))
        .unwrap()
    };
    assert!(node(true).variants_truncated());
    assert!(!node(false).variants_truncated());
    assert_eq!(node(true).into_catalog().unwrap().variants.len(), 1);
}
