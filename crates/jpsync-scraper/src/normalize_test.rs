use super::*;

fn variant(options: &[(&str, &str)], price: &str, available: bool) -> RawVariant {
    RawVariant {
        options: options
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect(),
        sku: Some(" SKU-1 ".to_owned()),
        price: Some(price.to_owned()),
        available,
        image_index: None,
    }
}

fn raw(variants: Vec<RawVariant>) -> RawProduct {
    RawProduct {
        source_id: "shark-hoodie".to_owned(),
        source_url: "https://jp.bape.com/products/shark-hoodie".to_owned(),
        title: "  SHARK   FULL ZIP HOODIE ".to_owned(),
        description: "<p>裏毛</p>".to_owned(),
        images: vec![
            ImageDescriptor {
                url: "//cdn.shopify.com/a.jpg".to_owned(),
                alt: None,
            },
            ImageDescriptor {
                url: "//cdn.shopify.com/a.jpg".to_owned(),
                alt: Some("dup".to_owned()),
            },
            ImageDescriptor {
                url: "https://cdn.shopify.com/b.jpg".to_owned(),
                alt: Some(" ".to_owned()),
            },
        ],
        variants,
        tags: vec!["男裝".to_owned(), " ".to_owned()],
    }
}

#[test]
fn parse_price_handles_common_vendor_formats() {
    assert_eq!(parse_price_jpy("¥12,100"), Some(12_100));
    assert_eq!(parse_price_jpy("12100.00"), Some(12_100));
    assert_eq!(parse_price_jpy("12,100円(税込)"), Some(12_100));
    assert_eq!(parse_price_jpy("￥ 3,990"), Some(3_990));
    assert_eq!(parse_price_jpy("4999.5"), Some(5_000));
    assert_eq!(parse_price_jpy("価格未定"), None);
}

#[test]
fn canonical_option_names_map_japanese_labels() {
    assert_eq!(canonical_option_name("カラー"), "color");
    assert_eq!(canonical_option_name("Size"), "size");
    assert_eq!(canonical_option_name("Title"), "size");
    assert_eq!(canonical_option_name("Material"), "material");
}

#[test]
fn normalize_builds_record_with_brand_tag_and_clean_fields() {
    let record = normalize(
        Vendor::Bape,
        raw(vec![variant(&[("Color", "BLACK"), ("Size", "M")], "24200.00", true)]),
        1000,
    )
    .unwrap();

    assert_eq!(record.source_id, "shark-hoodie");
    assert_eq!(record.title_src, "SHARK FULL ZIP HOODIE");
    assert_eq!(record.variants.len(), 1);
    let v = &record.variants[0];
    assert_eq!(
        v.option_values,
        vec![
            ("color".to_owned(), "BLACK".to_owned()),
            ("size".to_owned(), "M".to_owned())
        ]
    );
    assert_eq!(v.source_price, 24_200);
    assert_eq!(v.sku.as_deref(), Some("SKU-1"));
    assert!(record.categories.contains("BAPE"));
    assert!(record.categories.contains("男裝"));
    assert_eq!(record.categories.len(), 2);
}

#[test]
fn images_are_deduplicated_and_made_absolute() {
    let record = normalize(
        Vendor::Bape,
        raw(vec![variant(&[("Size", "M")], "5000", true)]),
        1000,
    )
    .unwrap();
    assert_eq!(record.images.len(), 2);
    assert_eq!(record.images[0].url, "https://cdn.shopify.com/a.jpg");
    assert_eq!(record.images[1].alt, None);
}

#[test]
fn images_are_capped() {
    let mut product = raw(vec![variant(&[("Size", "M")], "5000", true)]);
    product.images = (0..15)
        .map(|i| ImageDescriptor {
            url: format!("https://img.example/{i}.jpg"),
            alt: None,
        })
        .collect();
    let record = normalize(Vendor::Workman, product, 1000).unwrap();
    assert_eq!(record.images.len(), MAX_IMAGES);
    assert_eq!(record.images[0].url, "https://img.example/0.jpg");
}

#[test]
fn one_size_spellings_collapse() {
    for token in ["FREE", "F", "フリー", "Default Title", "one size"] {
        let record = normalize(
            Vendor::HumanMade,
            raw(vec![variant(&[("Title", token)], "8800", true)]),
            1000,
        )
        .unwrap();
        assert_eq!(record.variants[0].option_values[0].1, ONE_SIZE, "token {token}");
    }
}

#[test]
fn variants_without_options_get_one_size() {
    let record = normalize(Vendor::Beams, raw(vec![variant(&[], "8800", true)]), 1000).unwrap();
    assert_eq!(
        record.variants[0].option_values,
        vec![("size".to_owned(), ONE_SIZE.to_owned())]
    );
}

#[test]
fn duplicate_option_tuples_keep_first() {
    let record = normalize(
        Vendor::Bape,
        raw(vec![
            variant(&[("Size", "M")], "5000", false),
            variant(&[("Size", "M")], "6000", true),
            variant(&[("Size", "L")], "5000", true),
        ]),
        1000,
    )
    .unwrap();
    assert_eq!(record.variants.len(), 2);
    assert_eq!(record.variants[0].source_price, 5_000);
    assert!(!record.variants[0].available);
}

#[test]
fn zero_price_and_cheap_variants_are_dropped() {
    let record = normalize(
        Vendor::Bape,
        raw(vec![
            variant(&[("Size", "S")], "0", true),
            variant(&[("Size", "M")], "990", true),
            variant(&[("Size", "L")], "1000", true),
        ]),
        1000,
    )
    .unwrap();
    assert_eq!(record.variants.len(), 1);
    assert_eq!(record.variants[0].option_values[0].1, "L");
}

#[test]
fn variant_without_price_is_dropped() {
    let mut no_price = variant(&[("Size", "S")], "0", true);
    no_price.price = None;
    let result = normalize(Vendor::Bape, raw(vec![no_price]), 0);
    assert!(matches!(result, Err(VendorError::MalformedSource { .. })));
}

#[test]
fn no_surviving_variant_is_malformed() {
    let result = normalize(
        Vendor::Bape,
        raw(vec![variant(&[("Size", "")], "5000", true)]),
        1000,
    );
    assert!(
        matches!(result, Err(VendorError::MalformedSource { ref source_product_id, .. }) if source_product_id == "shark-hoodie"),
        "got: {result:?}"
    );
}

#[test]
fn missing_source_id_is_malformed() {
    let mut product = raw(vec![variant(&[("Size", "M")], "5000", true)]);
    product.source_id = "  ".to_owned();
    let result = normalize(Vendor::Bape, product, 1000);
    assert!(matches!(result, Err(VendorError::MalformedSource { .. })));
}

#[test]
fn out_of_range_image_index_is_cleared() {
    let mut v = variant(&[("Size", "M")], "5000", true);
    v.image_index = Some(9);
    let mut ok = variant(&[("Size", "L")], "5000", true);
    ok.image_index = Some(1);
    let record = normalize(Vendor::Bape, raw(vec![v, ok]), 1000).unwrap();
    assert_eq!(record.variants[0].image_index, None);
    assert_eq!(record.variants[1].image_index, Some(1));
}

#[test]
fn option_tuples_are_unique_after_normalization() {
    let record = normalize(
        Vendor::Workman,
        raw(vec![
            variant(&[("カラー", "ネイビー"), ("サイズ", "M")], "2900", true),
            variant(&[("Color", "ネイビー"), ("Size", "M")], "2900", true),
            variant(&[("カラー", "ネイビー"), ("サイズ", "L")], "2900", true),
            variant(&[("カラー", "ブラック"), ("サイズ", "FREE")], "2900", true),
        ]),
        1000,
    )
    .unwrap();
    let keys: HashSet<Vec<String>> = record.variants.iter().map(VariantRecord::option_key).collect();
    assert_eq!(keys.len(), record.variants.len());
    assert_eq!(record.variants.len(), 3);
}
