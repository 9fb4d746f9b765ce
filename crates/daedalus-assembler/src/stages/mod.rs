//! Assembler stages.
//!
//! The stages run in a fixed order over the register context. Each stage
//! works on all invokers at once; an invoker a stage rejects is excluded
//! and the rest carry on.
//!
//! ## Invokers (1-4)
//!
//! 1. [`caller`] `service_caller` - One invoker per call
//! 2. `validate_hints` - Only known call hints
//! 3. `method_http` - Call method to HTTP method
//! 4. `target_model` - The model each call is about
//!
//! ## Paths (5-9)
//!
//! 5. [`path`] `path_input` - Model property inputs become path values
//! 6. `path_update` - Updates get the model name and the injected id
//! 7. `path_target` - The target model joins the path
//! 8. `path_domain` - Domain prefix
//! 9. `path_web_name` - Web name replaces the last literal
//!
//! ## Codecs (10-14)
//!
//! 10. [`decoding`] - Parameter and content decodings
//! 11. [`slicing`] `option_slice` - Limit and total defaults
//! 12. [`solved`] `validate_solved` - Every input bound or defaulted
//! 13. [`encoding`] - Output encoder
//! 14. `definitions` - What each call accepts
//!
//! ## Tree (15-20)
//!
//! 15. [`tree`] `invoker_node` - Placement and conflicts
//! 16. `path_slash` - Mandatory slashes
//! 17. `path_get_model` - Model paths
//! 18. `accessible` - Accessible resources per node
//! 19. `root_resources` - `GET /`
//! 20. `freeze` - The immutable tree

pub mod caller;
pub mod decoding;
pub mod encoding;
pub mod path;
pub mod slicing;
pub mod solved;
pub mod tree;

pub use caller::{MethodHttp, ServiceCaller, TargetModel, ValidateHints};
pub use decoding::Decoding;
pub use encoding::{Definitions, Encoding};
pub use path::{PathDomain, PathInput, PathTarget, PathUpdate, PathWebName};
pub use slicing::OptionSlice;
pub use solved::ValidateSolved;
pub use tree::{Freeze, InvokerNode, PathAccessible, PathGetModel, PathSlash, RootResources, ROOT_SERVICE};
