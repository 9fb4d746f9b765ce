//! Response codes.
//!
//! Every outcome of the dispatcher, gateway or assemblage is expressed as a
//! [`CodeHttp`]: a short symbolic code, the HTTP status and whether the
//! outcome counts as a success. Downstream stages short-circuit as soon as
//! an unsuccessful code is set.

use std::fmt;

use http::StatusCode;

/// A symbolic response code bound to an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodeHttp {
    code: &'static str,
    status: u16,
    is_success: bool,
}

impl CodeHttp {
    /// Creates a code.
    #[must_use]
    pub const fn new(code: &'static str, status: u16, is_success: bool) -> Self {
        Self {
            code,
            status,
            is_success,
        }
    }

    /// Short symbolic code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// Numeric HTTP status.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Whether processing succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.is_success
    }

    /// The status as an [`http::StatusCode`].
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Maps a raw status, e.g. from an upstream, back to a known code.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        ALL.iter()
            .find(|code| code.status == status)
            .copied()
            .unwrap_or(Self::new("UPSTREAM", status, status < 400))
    }
}

impl fmt::Display for CodeHttp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.code)
    }
}

/// Resource found and rendered.
pub const PATH_FOUND: CodeHttp = CodeHttp::new("PATH_FOUND", 200, true);
/// Model updated.
pub const UPDATE_SUCCESS: CodeHttp = CodeHttp::new("UPDATE_SUCCESS", 200, true);
/// Model created.
pub const INSERT_SUCCESS: CodeHttp = CodeHttp::new("INSERT_SUCCESS", 201, true);
/// Model deleted.
pub const DELETE_SUCCESS: CodeHttp = CodeHttp::new("DELETE_SUCCESS", 204, true);
/// Reference output, answered with a `Location`.
pub const REDIRECT: CodeHttp = CodeHttp::new("REDIRECT", 302, true);
/// Illegal query parameters.
pub const PARAMETER_ILLEGAL: CodeHttp = CodeHttp::new("PARAMETER_ILLEGAL", 400, false);
/// Unreadable request content.
pub const CONTENT_BAD: CodeHttp = CodeHttp::new("CONTENT_BAD", 400, false);
/// Request content expected but absent.
pub const CONTENT_MISSING: CodeHttp = CodeHttp::new("CONTENT_MISSING", 400, false);
/// Unsupported charset or encoding.
pub const ENCODING_BAD: CodeHttp = CodeHttp::new("ENCODING_BAD", 400, false);
/// Arguments rejected by the service.
pub const INPUT_ERROR: CodeHttp = CodeHttp::new("INPUT_ERROR", 400, false);
/// Missing or invalid credentials.
pub const UNAUTHORIZED_ACCESS: CodeHttp = CodeHttp::new("UNAUTHORIZED_ACCESS", 401, false);
/// Access denied by a filter.
pub const FORBIDDEN_ACCESS: CodeHttp = CodeHttp::new("FORBIDDEN_ACCESS", 403, false);
/// No resource at the path.
pub const PATH_NOT_FOUND: CodeHttp = CodeHttp::new("PATH_NOT_FOUND", 404, false);
/// Resource exists but not for this method.
pub const METHOD_NOT_AVAILABLE: CodeHttp = CodeHttp::new("METHOD_NOT_AVAILABLE", 405, false);
/// No acceptable representation.
pub const ENCODING_UNKNOWN: CodeHttp = CodeHttp::new("ENCODING_UNKNOWN", 406, false);
/// Unavailable content for an assemblage.
pub const ASSEMBLAGE_UNAVAILABLE: CodeHttp = CodeHttp::new("ASSEMBLAGE_UNAVAILABLE", 417, false);
/// Uncaught failure.
pub const INTERNAL_ERROR: CodeHttp = CodeHttp::new("INTERNAL_ERROR", 500, false);
/// Upstream unreachable or broken.
pub const BAD_GATEWAY: CodeHttp = CodeHttp::new("BAD_GATEWAY", 502, false);

const ALL: [CodeHttp; 18] = [
    PATH_FOUND,
    UPDATE_SUCCESS,
    INSERT_SUCCESS,
    DELETE_SUCCESS,
    REDIRECT,
    PARAMETER_ILLEGAL,
    CONTENT_BAD,
    CONTENT_MISSING,
    ENCODING_BAD,
    INPUT_ERROR,
    UNAUTHORIZED_ACCESS,
    FORBIDDEN_ACCESS,
    PATH_NOT_FOUND,
    METHOD_NOT_AVAILABLE,
    ENCODING_UNKNOWN,
    ASSEMBLAGE_UNAVAILABLE,
    INTERNAL_ERROR,
    BAD_GATEWAY,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_codes() {
        assert!(PATH_FOUND.is_success());
        assert_eq!(INSERT_SUCCESS.status_code(), StatusCode::CREATED);
        assert_eq!(DELETE_SUCCESS.status_code(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_error_codes_map_to_error_statuses() {
        for code in ALL.iter().filter(|c| !c.is_success()) {
            let status = code.status_code();
            assert!(
                status.is_client_error() || status.is_server_error(),
                "{code} should map to an error status"
            );
        }
    }

    #[test]
    fn test_from_status() {
        assert_eq!(CodeHttp::from_status(404), PATH_NOT_FOUND);
        let teapot = CodeHttp::from_status(418);
        assert_eq!(teapot.code(), "UPSTREAM");
        assert!(!teapot.is_success());
        assert!(CodeHttp::from_status(203).is_success());
    }
}
