pub mod error;
pub mod html;
pub mod normalize;
pub mod raw;
pub(crate) mod rate_limit;
pub mod session;
pub mod stock;
pub mod vendors;
pub mod webdriver;

pub use error::VendorError;
pub use normalize::{normalize, parse_price_jpy};
pub use raw::{Listing, ListingPage, RawProduct, RawVariant};
pub use session::{SessionConfig, VendorSession};
pub use stock::StockProbe;
pub use vendors::{FetcherConfig, ProductStream, VendorFetcher};
pub use webdriver::WebDriverSession;
