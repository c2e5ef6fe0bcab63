//! Product Advertising API 5 client pieces: canonical payload, SigV4 signing, transport.

pub mod payload;
pub mod signer;
pub mod transport;

pub use payload::{DEFAULT_RESOURCES, GetItemsPayload};
pub use signer::{Credentials, RequestSigner, SignError, SignedRequest};
pub use transport::{HttpTransport, ReqwestTransport, TransportError, UpstreamResponse};

/// Request path of the `GetItems` operation.
pub const GET_ITEMS_PATH: &str = "/paapi5/getitems";
/// Service name used in the credential scope.
pub const SERVICE_NAME: &str = "ProductAdvertisingAPI";
/// Value of the `x-amz-target` header for `GetItems`.
pub const GET_ITEMS_TARGET: &str = "com.amazon.paapi5.v1.ProductAdvertisingAPIv1.GetItems";

/// `https://<host>/paapi5/getitems`
pub fn get_items_url(host: &str) -> String {
    format!("https://{host}{GET_ITEMS_PATH}")
}
