//! # Daedalus Test
//!
//! Test utilities for Daedalus. Requests are dispatched in memory, through
//! the full processing of whatever [`Dispatch`](daedalus_core::Dispatch)
//! the client wraps.
//!
//! ## Key Features
//!
//! - **In-Memory Testing**: no network connections or port binding
//! - **Request Builder**: fluent API for headers, query parameters and bodies
//! - **Response Assertions**: status, code, header and JSON field checks
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use daedalus_core::{code, Dispatch, Request, Response};
//! use daedalus_test::TestClient;
//!
//! struct Users;
//!
//! impl Dispatch for Users {
//!     fn dispatch(&self, request: Request) -> Response {
//!         if request.uri != "/User/1" {
//!             return Response::new(code::PATH_NOT_FOUND);
//!         }
//!         let mut response = Response::new(code::PATH_FOUND);
//!         response.body = r#"{"Id":1,"Name":"Ada"}"#.into();
//!         response
//!     }
//! }
//!
//! let client = TestClient::new(Arc::new(Users));
//! client
//!     .get("/User/1")
//!     .send()
//!     .assert_status(200)
//!     .assert_json_field("Name", &serde_json::json!("Ada"));
//! client.get("/User/2").send().assert_status(404);
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use response::TestResponse;
