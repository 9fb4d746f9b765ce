//! Dispatcher stages.
//!
//! Every request runs through the same stages. A stage that rejects the
//! request marks the response as failed; later stages see the failed
//! response and step aside, and `explain` renders the error.
//!
//! ## Request (1-5)
//!
//! 1. [`internal`] `internal_error` - Failures become a 500
//! 2. `request_id` - Correlation id, echoed back
//! 3. [`method`] `method_override` - `X-HTTP-Method-Override`
//! 4. [`routing`] `uri` - Path match, else 404
//! 5. `negotiation` - Renderer and locale, else 406
//!
//! ## Call (6-11)
//!
//! 6. `method` - Invoker for the method, else 405; `OPTIONS`
//! 7. [`arguments`] `path_arguments` - Typed path values
//! 8. `parameters` - Query parameters, else 400
//! 9. `content` - Request content, else 400
//! 10. [`invoking`] `transaction` - Optional session
//! 11. `invoking` - The call itself
//!
//! ## Response (12-13)
//!
//! 12. [`encoding`] - Status, `Location` and body
//! 13. [`explain`] - Error body and representation headers

pub mod arguments;
pub mod encoding;
pub mod explain;
pub mod internal;
pub mod invoking;
pub mod method;
pub mod routing;

pub use arguments::{Content, Parameters, PathArguments};
pub use encoding::Encoding;
pub use explain::{finish, internal_error, Explain, INTERNAL_MESSAGE};
pub use internal::{InternalError, RequestIdStage};
pub use invoking::{Invoking, Transaction};
pub use method::{overridden, MethodOverride, MethodPick};
pub use routing::{Negotiation, UriMatch};
