pub mod app_config;
pub mod config;
pub mod error;
pub mod handle;
pub mod model;
pub mod pricing;
pub mod vendor;

pub use app_config::{AppConfig, TranslatorProvider};
pub use config::{build_app_config, load_app_config, load_app_config_from_env};
pub use error::ConfigError;
pub use handle::{handle_for, slugify};
pub use model::{
    CatalogProduct, CatalogVariant, ImageDescriptor, ProductRecord, ProductStatus, StockVerdict,
    VariantRecord, COLLECTION_TAGS,
};
pub use pricing::{PriceParams, Rounding};
pub use vendor::{UnknownVendor, Vendor, TERMINAL_STOCK_KEYWORDS};
