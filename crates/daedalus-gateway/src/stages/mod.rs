//! Gateway stages.
//!
//! 1. `internal_error` - Failures become a 500
//! 2. [`selector`] `repository` - Repository snapshot for the request
//! 3. `authorized` - Gateways of the request authorization, else 401
//! 4. `selector` - Gateway for the request, else 404 or 405
//! 5. [`filter`] - Access filters, else 403
//! 6. [`forward`] `error_placement` - `status` and `allow` for error gateways
//! 7. `forward` - Upstream answer, ends the chain
//! 8. [`explain`] - Gateway errors that were not forwarded
//!
//! `authorized` is only part of the chain when authorized gateways are
//! configured.

pub mod explain;
pub mod filter;
pub mod forward;
pub mod selector;

pub use explain::GatewayExplain;
pub use filter::{has_access, Filter};
pub use forward::{place_error, rewrite, ErrorPlacement, Forward, Upstreams, PARAMETER_ALLOW, PARAMETER_STATUS};
pub use selector::{Authorized, Obtain, Selector};
