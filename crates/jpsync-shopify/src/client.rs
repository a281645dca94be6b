//! HTTP client for the Shopify Admin API.
//!
//! Product writes and inventory go through REST; listing, lookup,
//! metafields and channel publication go through GraphQL. Every call is
//! retried on transient failures, up to [`MAX_ATTEMPTS`] attempts in total.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use jpsync_core::{
    AppConfig, CatalogProduct, CatalogVariant, ProductRecord, ProductStatus, VariantRecord, Vendor,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tokio::sync::OnceCell;

use crate::catalog::Catalog;
use crate::error::CatalogError;
use crate::retry::{retry_with_backoff, MAX_ATTEMPTS};
use crate::types::{
    join_user_errors, CustomCollectionEnvelope, CustomCollectionsEnvelope, GraphQlResponse,
    LocationsEnvelope, MetafieldsSetData, ProductNode, ProductsData, PublicationsData,
    PublishData, RestProductEnvelope, RestVariant, RestVariantEnvelope,
};

const PAGE_SIZE: u32 = 50;
const ACCESS_TOKEN_HEADER: &str = "x-shopify-access-token";
const MAX_ERROR_BODY: usize = 500;

const PRODUCTS_QUERY: &str = r#"
query products($first: Int!, $after: String, $query: String!) {
  products(first: $first, after: $after, query: $query) {
    pageInfo { hasNextPage endCursor }
    nodes {
      legacyResourceId
      handle
      title
      descriptionHtml
      status
      link: metafield(namespace: "custom", key: "link") { value }
      sourceId: metafield(namespace: "custom", key: "source_id") { value }
      variants(first: 250) {
        pageInfo { hasNextPage }
        nodes {
          legacyResourceId
          sku
          price
          inventoryQuantity
          selectedOptions { name value }
          inventoryItem { legacyResourceId }
        }
      }
    }
  }
}
"#;

const PUBLICATIONS_QUERY: &str = r"
query publications {
  publications(first: 20) {
    nodes { id }
  }
}
";

const PUBLISH_MUTATION: &str = r"
mutation publishablePublish($id: ID!, $input: [PublicationInput!]!) {
  publishablePublish(id: $id, input: $input) {
    userErrors { field message }
  }
}
";

const METAFIELDS_SET_MUTATION: &str = r"
mutation metafieldsSet($metafields: [MetafieldsSetInput!]!) {
  metafieldsSet(metafields: $metafields) {
    userErrors { field message }
  }
}
";

/// Connection settings for [`ShopifyClient`].
#[derive(Clone)]
pub struct CatalogConfig {
    pub shop: String,
    pub access_token: String,
    pub api_version: String,
    /// Inventory location; discovered from `locations.json` when `None`.
    pub location_id: Option<i64>,
    /// Quantity written for an available variant.
    pub in_stock_quantity: i64,
    pub timeout: Duration,
    /// Spacing between two listing pages.
    pub page_delay: Duration,
    pub backoff_base_ms: u64,
}

impl CatalogConfig {
    #[must_use]
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            shop: cfg.shopify_shop.clone(),
            access_token: cfg.shopify_access_token.clone(),
            api_version: cfg.shopify_api_version.clone(),
            location_id: cfg.shopify_location_id,
            in_stock_quantity: cfg.in_stock_quantity,
            timeout: cfg.request_timeout(),
            page_delay: cfg.catalog_page_delay(),
            backoff_base_ms: cfg.retry_backoff_base_ms,
        }
    }

    /// `https://{shop}.myshopify.com/admin/api/{version}/`
    #[must_use]
    pub fn admin_base_url(&self) -> String {
        format!(
            "https://{}.myshopify.com/admin/api/{}/",
            self.shop, self.api_version
        )
    }
}

impl std::fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("shop", &self.shop)
            .field("access_token", &"[redacted]")
            .field("api_version", &self.api_version)
            .field("location_id", &self.location_id)
            .field("in_stock_quantity", &self.in_stock_quantity)
            .field("timeout", &self.timeout)
            .field("page_delay", &self.page_delay)
            .field("backoff_base_ms", &self.backoff_base_ms)
            .finish()
    }
}

/// Client for one Shopify shop.
///
/// Use [`ShopifyClient::new`] for production or
/// [`ShopifyClient::with_base_url`] to point at a mock server in tests.
/// The inventory location, the publication ids and collection ids are
/// fetched once and cached for the life of the client.
pub struct ShopifyClient {
    client: Client,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
    page_delay: Duration,
    in_stock_quantity: i64,
    location: OnceCell<i64>,
    publications: OnceCell<Vec<String>>,
    collections: Mutex<HashMap<String, i64>>,
}

impl ShopifyClient {
    /// Creates a client for `https://{shop}.myshopify.com/admin/api/{version}/`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`CatalogError::Config`] if the access token
    /// is not a valid header value.
    pub fn new(cfg: &CatalogConfig) -> Result<Self, CatalogError> {
        Self::with_base_url(cfg, &cfg.admin_base_url())
    }

    /// Creates a client with a custom Admin API base URL (for testing with
    /// wiremock).
    ///
    /// # Errors
    ///
    /// Same as [`Self::new`], plus [`CatalogError::Config`] when `base_url`
    /// does not parse.
    pub fn with_base_url(cfg: &CatalogConfig, base_url: &str) -> Result<Self, CatalogError> {
        let mut headers = HeaderMap::new();
        let token = HeaderValue::from_str(&cfg.access_token)
            .map_err(|e| CatalogError::Config(format!("invalid access token: {e}")))?;
        headers.insert(HeaderName::from_static(ACCESS_TOKEN_HEADER), token);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(cfg.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("jpsync/0.1 (catalog-sync)")
            .default_headers(headers)
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| CatalogError::Config(format!("invalid base URL '{base_url}': {e}")))?;

        Ok(Self {
            client,
            base_url,
            max_retries: MAX_ATTEMPTS - 1,
            backoff_base_ms: cfg.backoff_base_ms,
            page_delay: cfg.page_delay,
            in_stock_quantity: cfg.in_stock_quantity,
            location: OnceCell::new_with(cfg.location_id),
            publications: OnceCell::new(),
            collections: Mutex::new(HashMap::new()),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, CatalogError> {
        self.base_url
            .join(path)
            .map_err(|e| CatalogError::Config(format!("invalid endpoint '{path}': {e}")))
    }

    /// Sends one REST request and deserializes the JSON response.
    async fn rest<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, CatalogError> {
        self.rest_at(method, self.endpoint(path)?, path, body).await
    }

    async fn rest_at<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, CatalogError> {
        let text = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let request = self.client.request(method.clone(), url.clone());
            let request = match body {
                Some(b) => request.json(b),
                None => request,
            };
            let url = &url;
            async move {
                let response = check_status(request.send().await?, url.as_str()).await?;
                Ok(response.text().await?)
            }
        })
        .await?;

        let text = if text.trim().is_empty() { "{}" } else { &text };
        serde_json::from_str(text).map_err(|source| CatalogError::Deserialize {
            context: format!("{method} {path}"),
            source,
        })
    }

    /// Sends one GraphQL document and returns its `data` member. Top-level
    /// GraphQL errors fail the call; a `THROTTLED` error is retried.
    async fn graphql<T: DeserializeOwned + Send>(
        &self,
        operation: &str,
        query: &str,
        variables: Value,
    ) -> Result<T, CatalogError> {
        let url = self.endpoint("graphql.json")?;
        let payload = json!({ "query": query, "variables": variables });
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let request = self.client.post(url.clone()).json(&payload);
            let url = &url;
            async move {
                let response = check_status(request.send().await?, url.as_str()).await?;
                let text = response.text().await?;
                let envelope: GraphQlResponse<T> =
                    serde_json::from_str(&text).map_err(|source| CatalogError::Deserialize {
                        context: format!("GraphQL {operation}"),
                        source,
                    })?;
                if let Some(first) = envelope.errors.first() {
                    return Err(CatalogError::GraphQl {
                        operation: operation.to_owned(),
                        message: first.describe(),
                    });
                }
                envelope.data.ok_or_else(|| CatalogError::GraphQl {
                    operation: operation.to_owned(),
                    message: "response has no data".to_owned(),
                })
            }
        })
        .await
    }

    async fn query_products(
        &self,
        filter: &str,
        first: u32,
        after: Option<&str>,
    ) -> Result<ProductsData, CatalogError> {
        self.graphql(
            "products",
            PRODUCTS_QUERY,
            json!({ "first": first, "after": after, "query": filter }),
        )
        .await
    }

    /// Publishes any publishable resource (`gid://shopify/...`) to every
    /// sales channel.
    async fn publish_gid(&self, gid: &str, label: &str) -> Result<(), CatalogError> {
        let ids = self.publication_ids().await?;
        if ids.is_empty() {
            tracing::warn!(resource = %gid, "shop has no sales channels, not published");
            return Ok(());
        }
        let input: Vec<Value> = ids.iter().map(|id| json!({ "publicationId": id })).collect();
        let data: PublishData = self
            .graphql(
                "publishablePublish",
                PUBLISH_MUTATION,
                json!({ "id": gid, "input": input }),
            )
            .await?;
        if !data.publishable_publish.user_errors.is_empty() {
            return Err(CatalogError::UserErrors {
                operation: "publishablePublish".to_owned(),
                handle: label.to_owned(),
                message: join_user_errors(&data.publishable_publish.user_errors),
            });
        }
        Ok(())
    }

    async fn find_collection(&self, title: &str) -> Result<Option<i64>, CatalogError> {
        let path = "custom_collections.json";
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut().append_pair("title", title);
        let found: CustomCollectionsEnvelope = self.rest_at(Method::GET, url, path, None).await?;
        Ok(found
            .custom_collections
            .into_iter()
            .find(|c| c.title == title)
            .map(|c| c.id))
    }

    async fn publication_ids(&self) -> Result<&[String], CatalogError> {
        let ids = self
            .publications
            .get_or_try_init(|| async {
                let data: PublicationsData = self
                    .graphql("publications", PUBLICATIONS_QUERY, json!({}))
                    .await?;
                let ids: Vec<String> = data.publications.nodes.into_iter().map(|n| n.id).collect();
                tracing::info!(channels = ids.len(), "loaded sales channel publications");
                Ok::<_, CatalogError>(ids)
            })
            .await?;
        Ok(ids)
    }

    async fn set_metafields(
        &self,
        product_id: i64,
        record: &ProductRecord,
    ) -> Result<(), CatalogError> {
        let owner = product_gid(product_id);
        let data: MetafieldsSetData = self
            .graphql(
                "metafieldsSet",
                METAFIELDS_SET_MUTATION,
                json!({ "metafields": [
                    {
                        "ownerId": owner,
                        "namespace": "custom",
                        "key": "link",
                        "type": "url",
                        "value": record.source_url,
                    },
                    {
                        "ownerId": owner,
                        "namespace": "custom",
                        "key": "source_id",
                        "type": "single_line_text_field",
                        "value": record.source_id,
                    },
                ]}),
            )
            .await?;
        if !data.metafields_set.user_errors.is_empty() {
            return Err(CatalogError::UserErrors {
                operation: "metafieldsSet".to_owned(),
                handle: record.handle(),
                message: join_user_errors(&data.metafields_set.user_errors),
            });
        }
        Ok(())
    }

    /// Attaches each image to the variants that reference it. Failures are
    /// logged and ignored; the product is usable without the association.
    async fn link_variant_images(
        &self,
        product_id: i64,
        image_ids: &[i64],
        variants: &[CatalogVariant],
        record: &ProductRecord,
    ) {
        let mut by_image: BTreeMap<usize, Vec<i64>> = BTreeMap::new();
        for source in &record.variants {
            let Some(index) = source.image_index else {
                continue;
            };
            let key = source.option_key();
            if let Some(created) = variants.iter().find(|v| v.option_values == key) {
                by_image.entry(index).or_default().push(created.id);
            }
        }

        for (index, variant_ids) in by_image {
            let Some(&image_id) = image_ids.get(index) else {
                continue;
            };
            let body = json!({ "image": { "id": image_id, "variant_ids": variant_ids } });
            let path = format!("products/{product_id}/images/{image_id}.json");
            if let Err(e) = self.rest::<Value>(Method::PUT, &path, Some(&body)).await {
                tracing::warn!(product_id, image_id, error = %e, "failed to link image to variants");
            }
        }
    }

    async fn create_new(&self, record: &ProductRecord) -> Result<CatalogProduct, CatalogError> {
        let handle = record.handle();
        let payload = product_payload(record);
        let created: RestProductEnvelope =
            match self.rest(Method::POST, "products.json", Some(&payload)).await {
                Ok(created) => created,
                Err(CatalogError::UnexpectedStatus {
                    status: 422, body, ..
                }) => {
                    return Err(CatalogError::UserErrors {
                        operation: "product create".to_owned(),
                        handle,
                        message: body,
                    });
                }
                Err(e) => return Err(e),
            };

        let product = created.product;
        let image_ids: Vec<i64> = product.images.iter().map(|i| i.id).collect();
        let variants: Vec<CatalogVariant> = product
            .variants
            .into_iter()
            .map(RestVariant::into_catalog)
            .collect();
        self.link_variant_images(product.id, &image_ids, &variants, record)
            .await;

        tracing::info!(
            product_id = product.id,
            handle = %product.handle,
            variants = variants.len(),
            "created catalog product"
        );
        Ok(CatalogProduct {
            id: product.id,
            handle: product.handle,
            title: product.title,
            body_html: product.body_html,
            status: product
                .status
                .as_deref()
                .map_or(ProductStatus::Active, ProductStatus::parse),
            source_url: Some(record.source_url.clone()),
            source_id: Some(record.source_id.clone()),
            variants,
        })
    }
}

#[async_trait]
impl Catalog for ShopifyClient {
    async fn list_products(&self, vendor: Vendor) -> Result<Vec<CatalogProduct>, CatalogError> {
        let filter = format!("vendor:\"{}\"", vendor.brand());
        let mut products = Vec::new();
        let mut after: Option<String> = None;
        let mut pages = 0u32;

        loop {
            if pages > 0 && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }
            let data = self
                .query_products(&filter, PAGE_SIZE, after.as_deref())
                .await?;
            pages += 1;
            products.extend(
                data.products
                    .nodes
                    .into_iter()
                    .filter_map(ProductNode::into_catalog),
            );

            let page_info = data.products.page_info;
            match page_info.end_cursor {
                Some(cursor) if page_info.has_next_page => after = Some(cursor),
                _ => break,
            }
        }

        tracing::info!(
            vendor = %vendor.tag(),
            products = products.len(),
            pages,
            "listed catalog products"
        );
        Ok(products)
    }

    async fn lookup(&self, handle: &str) -> Result<Option<CatalogProduct>, CatalogError> {
        let data = self
            .query_products(&format!("handle:\"{handle}\""), 1, None)
            .await?;
        Ok(data
            .products
            .nodes
            .into_iter()
            .filter_map(ProductNode::into_catalog)
            .find(|p| p.handle == handle))
    }

    async fn create(&self, record: &ProductRecord) -> Result<CatalogProduct, CatalogError> {
        let handle = record.handle();
        if let Some(existing) = self.lookup(&handle).await? {
            tracing::info!(handle = %handle, product_id = existing.id, "handle already exists, updating instead");
            return self.update(&existing, record).await;
        }
        self.create_new(record).await
    }

    async fn update(
        &self,
        existing: &CatalogProduct,
        record: &ProductRecord,
    ) -> Result<CatalogProduct, CatalogError> {
        let product_id = existing.id;
        let mut product = existing.clone();

        let mut patch = Map::new();
        let title = record.display_title();
        let body = record.display_description();
        if existing.title != title {
            patch.insert("title".to_owned(), json!(title));
            product.title = title.to_owned();
        }
        if existing.body_html.as_deref().unwrap_or_default() != body {
            patch.insert("body_html".to_owned(), json!(body));
            product.body_html = Some(body.to_owned());
        }
        if !patch.is_empty() {
            patch.insert("id".to_owned(), json!(product_id));
            let payload = json!({ "product": patch });
            self.rest::<RestProductEnvelope>(
                Method::PUT,
                &format!("products/{product_id}.json"),
                Some(&payload),
            )
            .await?;
        }

        if existing.source_url.as_deref() != Some(record.source_url.as_str())
            || existing.source_id.as_deref() != Some(record.source_id.as_str())
        {
            self.set_metafields(product_id, record).await?;
            product.source_url = Some(record.source_url.clone());
            product.source_id = Some(record.source_id.clone());
        }

        let mut variants = Vec::with_capacity(record.variants.len());
        for source in &record.variants {
            match existing.find_variant(&source.option_key()) {
                Some(current) if current.price != source.target_price => {
                    let payload = json!({ "variant": {
                        "id": current.id,
                        "price": source.target_price.to_string(),
                    }});
                    self.rest::<RestVariantEnvelope>(
                        Method::PUT,
                        &format!("variants/{}.json", current.id),
                        Some(&payload),
                    )
                    .await?;
                    tracing::debug!(
                        product_id,
                        variant_id = current.id,
                        from = current.price,
                        to = source.target_price,
                        "updated variant price"
                    );
                    variants.push(CatalogVariant {
                        price: source.target_price,
                        ..current.clone()
                    });
                }
                Some(current) => variants.push(current.clone()),
                None => {
                    let payload = json!({ "variant": variant_payload(source) });
                    let created: RestVariantEnvelope = self
                        .rest(
                            Method::POST,
                            &format!("products/{product_id}/variants.json"),
                            Some(&payload),
                        )
                        .await?;
                    tracing::debug!(product_id, variant = %source.title(), "added variant");
                    variants.push(created.variant.into_catalog());
                }
            }
        }

        for stale in &existing.variants {
            let still_offered = record
                .variants
                .iter()
                .any(|v| v.option_key() == stale.option_values);
            if !still_offered {
                self.rest::<Value>(
                    Method::DELETE,
                    &format!("products/{product_id}/variants/{}.json", stale.id),
                    None,
                )
                .await?;
                tracing::debug!(product_id, variant_id = stale.id, "deleted variant");
            }
        }

        product.variants = variants;
        Ok(product)
    }

    async fn set_inventory(
        &self,
        variant: &CatalogVariant,
        location_id: i64,
        available: bool,
    ) -> Result<(), CatalogError> {
        let inventory_item_id =
            variant
                .inventory_item_id
                .ok_or(CatalogError::MissingInventoryItem {
                    variant_id: variant.id,
                })?;
        let quantity = if available { self.in_stock_quantity } else { 0 };
        let payload = json!({
            "location_id": location_id,
            "inventory_item_id": inventory_item_id,
            "available": quantity,
        });
        self.rest::<Value>(Method::POST, "inventory_levels/set.json", Some(&payload))
            .await?;
        Ok(())
    }

    async fn set_status(
        &self,
        product_id: i64,
        status: ProductStatus,
    ) -> Result<(), CatalogError> {
        let payload = json!({ "product": { "id": product_id, "status": status.as_rest() } });
        self.rest::<RestProductEnvelope>(
            Method::PUT,
            &format!("products/{product_id}.json"),
            Some(&payload),
        )
        .await?;
        tracing::info!(product_id, status = %status, "changed product status");
        Ok(())
    }

    async fn publish(&self, product_id: i64) -> Result<(), CatalogError> {
        self.publish_gid(&product_gid(product_id), &product_id.to_string())
            .await
    }

    async fn ensure_collection(&self, title: &str) -> Result<i64, CatalogError> {
        let cached = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(title)
            .copied();
        if let Some(id) = cached {
            return Ok(id);
        }

        let id = if let Some(id) = self.find_collection(title).await? {
            tracing::debug!(collection_id = id, title, "found collection");
            id
        } else {
            let payload = json!({ "custom_collection": { "title": title, "published": true } });
            let created: CustomCollectionEnvelope = self
                .rest(Method::POST, "custom_collections.json", Some(&payload))
                .await?;
            let id = created.custom_collection.id;
            tracing::info!(collection_id = id, title, "created collection");
            id
        };
        self.publish_gid(&collection_gid(id), title).await?;

        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(title.to_owned(), id);
        Ok(id)
    }

    async fn add_to_collection(
        &self,
        product_id: i64,
        collection_id: i64,
    ) -> Result<(), CatalogError> {
        let payload = json!({ "collect": {
            "product_id": product_id,
            "collection_id": collection_id,
        }});
        match self
            .rest::<Value>(Method::POST, "collects.json", Some(&payload))
            .await
        {
            Ok(_) => Ok(()),
            // Shopify answers 422 when the product is already in the collection.
            Err(CatalogError::UnexpectedStatus { status: 422, .. }) => {
                tracing::debug!(product_id, collection_id, "product already in collection");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, product_id: i64) -> Result<(), CatalogError> {
        match self
            .rest::<Value>(Method::DELETE, &format!("products/{product_id}.json"), None)
            .await
        {
            Ok(_) => {
                tracing::info!(product_id, "deleted catalog product");
                Ok(())
            }
            Err(CatalogError::UnexpectedStatus { status: 404, .. }) => {
                tracing::debug!(product_id, "product already absent");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn primary_location(&self) -> Result<i64, CatalogError> {
        let id = self
            .location
            .get_or_try_init(|| async {
                let envelope: LocationsEnvelope =
                    self.rest(Method::GET, "locations.json", None).await?;
                let id = envelope
                    .locations
                    .iter()
                    .find(|l| l.active)
                    .map(|l| l.id)
                    .ok_or(CatalogError::NoLocation)?;
                tracing::info!(location_id = id, "discovered inventory location");
                Ok::<_, CatalogError>(id)
            })
            .await?;
        Ok(*id)
    }
}

/// Maps a response status to the catalog error taxonomy, keeping a short
/// prefix of the body for diagnostics.
async fn check_status(response: Response, url: &str) -> Result<Response, CatalogError> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let retry_after_ms = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<f64>().ok())
            .map_or(2_000, |secs| (secs.max(0.0) * 1_000.0) as u64);
        return Err(CatalogError::RateLimited { retry_after_ms });
    }
    if !status.is_success() {
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let cut = (0..=MAX_ERROR_BODY)
                .rev()
                .find(|i| body.is_char_boundary(*i))
                .unwrap_or(0);
            body.truncate(cut);
        }
        return Err(CatalogError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_owned(),
            body,
        });
    }
    Ok(response)
}

fn product_gid(product_id: i64) -> String {
    format!("gid://shopify/Product/{product_id}")
}

fn collection_gid(collection_id: i64) -> String {
    format!("gid://shopify/Collection/{collection_id}")
}

/// `"color"` → `"Color"`.
fn option_label(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// REST variant body: up to three option values, price in whole units,
/// inventory tracked by Shopify.
pub(crate) fn variant_payload(variant: &VariantRecord) -> Value {
    let mut body = Map::new();
    for (i, (_, value)) in variant.option_values.iter().take(3).enumerate() {
        body.insert(format!("option{}", i + 1), json!(value));
    }
    body.insert("price".to_owned(), json!(variant.target_price.to_string()));
    if let Some(sku) = &variant.sku {
        body.insert("sku".to_owned(), json!(sku));
    }
    body.insert("inventory_management".to_owned(), json!("shopify"));
    body.insert("inventory_policy".to_owned(), json!("deny"));
    body.insert("requires_shipping".to_owned(), json!(true));
    Value::Object(body)
}

/// REST product-create body for `record`.
pub(crate) fn product_payload(record: &ProductRecord) -> Value {
    let brand = record.vendor.brand();
    let mut tags = vec![brand.to_owned()];
    tags.extend(record.categories.iter().cloned());

    let options: Vec<Value> = record
        .option_names()
        .into_iter()
        .take(3)
        .map(|name| json!({ "name": option_label(name) }))
        .collect();
    let variants: Vec<Value> = record.variants.iter().map(variant_payload).collect();
    let images: Vec<Value> = record
        .images
        .iter()
        .enumerate()
        .map(|(i, img)| {
            let mut image = json!({ "src": img.url, "position": i + 1 });
            if let Some(alt) = &img.alt {
                image["alt"] = json!(alt);
            }
            image
        })
        .collect();

    json!({ "product": {
        "title": record.display_title(),
        "body_html": record.display_description(),
        "vendor": brand,
        "handle": record.handle(),
        "status": ProductStatus::Active.as_rest(),
        "tags": tags.join(", "),
        "options": options,
        "variants": variants,
        "images": images,
        "metafields": [
            {
                "namespace": "custom",
                "key": "link",
                "type": "url",
                "value": record.source_url,
            },
            {
                "namespace": "custom",
                "key": "source_id",
                "type": "single_line_text_field",
                "value": record.source_id,
            },
        ],
    }})
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
