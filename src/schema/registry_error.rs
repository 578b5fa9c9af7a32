//! The distribution spec's `{errors: [...]}` body shape, returned by a v2 registry on
//! any non-2xx response, plus the static error catalog behind it
//! (https://docs.docker.com/registry/spec/api/#errors-2).

use serde::{Deserialize, Serialize};

/// The canonical `message`/`detail`/`http_status` the distribution spec defines for a
/// [`RegistryErrorCode`], independent of whatever a particular registry's response body
/// happens to say.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalError {
    pub message: &'static str,
    pub detail: &'static str,
    pub http_status: u16,
}

/// One of the codes defined by the distribution spec's error catalog. Unknown codes
/// deserialize into [`RegistryErrorCode::Other`] rather than failing parse, since a
/// registry is free to add codes this crate doesn't yet know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryErrorCode {
    NameUnknown,
    BlobUnknown,
    ManifestUnknown,
    Unauthorized,
    Unsupported,
    Denied,
    Other(String),
}

impl From<&str> for RegistryErrorCode {
    fn from(s: &str) -> Self {
        match s {
            "NAME_UNKNOWN" => RegistryErrorCode::NameUnknown,
            "BLOB_UNKNOWN" => RegistryErrorCode::BlobUnknown,
            "MANIFEST_UNKNOWN" => RegistryErrorCode::ManifestUnknown,
            "UNAUTHORIZED" => RegistryErrorCode::Unauthorized,
            "UNSUPPORTED" => RegistryErrorCode::Unsupported,
            "DENIED" => RegistryErrorCode::Denied,
            other => RegistryErrorCode::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for RegistryErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryErrorCode::NameUnknown => write!(f, "NAME_UNKNOWN"),
            RegistryErrorCode::BlobUnknown => write!(f, "BLOB_UNKNOWN"),
            RegistryErrorCode::ManifestUnknown => write!(f, "MANIFEST_UNKNOWN"),
            RegistryErrorCode::Unauthorized => write!(f, "UNAUTHORIZED"),
            RegistryErrorCode::Unsupported => write!(f, "UNSUPPORTED"),
            RegistryErrorCode::Denied => write!(f, "DENIED"),
            RegistryErrorCode::Other(s) => write!(f, "{}", s),
        }
    }
}

impl RegistryErrorCode {
    /// The spec's static `message`/`detail`/`http_status` triple for this code, so a
    /// caller can map a code to its standard status (404/401/405/403) without a
    /// populated wire body. Returns `None` for [`RegistryErrorCode::Other`], since the
    /// catalog has no entry for a code it doesn't recognize.
    pub fn canonical(&self) -> Option<CanonicalError> {
        match self {
            RegistryErrorCode::NameUnknown => Some(CanonicalError {
                message: "repository name not known to registry",
                detail: "This is returned if the name used during an operation is unknown to the registry",
                http_status: 404,
            }),
            RegistryErrorCode::BlobUnknown => Some(CanonicalError {
                message: "blob unknown to registry",
                detail: "This error may be returned when a blob is unknown to the registry in a specified repository. This can be returned with a standard get or if a manifest references an unknown layer during upload",
                http_status: 404,
            }),
            RegistryErrorCode::ManifestUnknown => Some(CanonicalError {
                message: "manifest unknown",
                detail: "This error is returned when the manifest, identified by name and tag is unknown to the repository",
                http_status: 404,
            }),
            RegistryErrorCode::Unauthorized => Some(CanonicalError {
                message: "authentication required",
                detail: "The access controller was unable to authenticate the client. Often this will be accompanied by a Www-Authenticate HTTP response header indicating how to authenticate",
                http_status: 401,
            }),
            RegistryErrorCode::Unsupported => Some(CanonicalError {
                message: "The operation is unsupported",
                detail: "The operation was unsupported due to a missing implementation or invalid set of parameters",
                http_status: 405,
            }),
            RegistryErrorCode::Denied => Some(CanonicalError {
                message: "requested access to the resource is denied",
                detail: "The access controller denied access for the operation on a resource",
                http_status: 403,
            }),
            RegistryErrorCode::Other(_) => None,
        }
    }
}

/// One element of a registry error response body's `errors` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryErrorEntry {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl RegistryErrorEntry {
    pub fn code(&self) -> RegistryErrorCode {
        RegistryErrorCode::from(self.code.as_str())
    }
}

/// The full `{errors: [...]}` body. `http_status` is filled in by the caller from the
/// response line, since it isn't part of the JSON body itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryErrorBody {
    #[serde(default)]
    pub errors: Vec<RegistryErrorEntry>,
    #[serde(skip)]
    pub http_status: u16,
}

impl RegistryErrorBody {
    pub fn parse(body: &[u8], http_status: u16) -> Option<Self> {
        let mut parsed: RegistryErrorBody = serde_json::from_slice(body).ok()?;
        parsed.http_status = http_status;
        Some(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_carry_the_spec_catalog() {
        assert_eq!(RegistryErrorCode::NameUnknown.canonical().unwrap().http_status, 404);
        assert_eq!(RegistryErrorCode::BlobUnknown.canonical().unwrap().http_status, 404);
        assert_eq!(RegistryErrorCode::ManifestUnknown.canonical().unwrap().http_status, 404);
        assert_eq!(RegistryErrorCode::Unauthorized.canonical().unwrap().http_status, 401);
        assert_eq!(RegistryErrorCode::Unsupported.canonical().unwrap().http_status, 405);
        assert_eq!(RegistryErrorCode::Denied.canonical().unwrap().http_status, 403);
    }

    #[test]
    fn canonical_message_matches_spec_wording() {
        let unauthorized = RegistryErrorCode::Unauthorized.canonical().unwrap();
        assert_eq!(unauthorized.message, "authentication required");
    }

    #[test]
    fn unrecognized_code_has_no_canonical_entry() {
        let code = RegistryErrorCode::from("SOME_FUTURE_CODE");
        assert!(code.canonical().is_none());
    }

    #[test]
    fn parses_code_from_wire_entry() {
        let entry = RegistryErrorEntry {
            code: "DENIED".to_string(),
            message: "nope".to_string(),
            detail: None,
        };
        assert_eq!(entry.code(), RegistryErrorCode::Denied);
    }
}
