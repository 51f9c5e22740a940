pub mod authorize;
pub mod response;

pub use authorize::{authorize, key_fingerprint, AuthorizedTable};
pub use response::{ApiResponse, ApiResult};
