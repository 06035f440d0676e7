//! Call shapes and results exchanged with edge nodes.

use crate::error::EdgeError;
use crate::node::NodeId;
use crate::serde_compat::empty_string_as_none;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// HTTP-like method of a proxied API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Canonical upper-case name, as signed in the envelope.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = EdgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            other => Err(EdgeError::InvalidInput(format!(
                "unsupported method: {other}"
            ))),
        }
    }
}

/// Which of the two call shapes an envelope carries.
///
/// Signed as part of the envelope, so an info probe cannot be replayed as an
/// API call or the other way round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    /// Lightweight node info / health probe.
    Info,
    /// Proxied call to an application path on the node.
    Api,
}

impl CallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallKind::Info => "info",
            CallKind::Api => "api",
        }
    }
}

/// Outcome of a call that reached the destination node.
///
/// `err` carries an application-level failure reported by the node. A
/// populated `err` still means the dispatch itself succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallResult {
    /// Hash the node assigned to the request, used to match responses.
    #[serde(rename = "telegramHash", alias = "TelegramHash", default)]
    pub correlation_hash: String,
    /// Raw response payload from the node's application.
    #[serde(alias = "Response", default)]
    pub response: String,
    /// Application-level error, if the node reported one.
    #[serde(
        alias = "Err",
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub err: Option<String>,
}

impl CallResult {
    /// A result with no application error.
    pub fn ok(correlation_hash: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            correlation_hash: correlation_hash.into(),
            response: response.into(),
            err: None,
        }
    }

    /// A result whose application reported a failure.
    pub fn app_error(correlation_hash: impl Into<String>, err: impl Into<String>) -> Self {
        let err = err.into();
        Self {
            correlation_hash: correlation_hash.into(),
            response: String::new(),
            err: if err.is_empty() { None } else { Some(err) },
        }
    }

    /// True when the node's application did not report an error.
    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }

    /// The application error message, if any.
    pub fn application_error(&self) -> Option<&str> {
        self.err.as_deref()
    }
}

/// One API call in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub node: NodeId,
    pub path: String,
    pub body: String,
    pub method: Method,
}

impl ApiRequest {
    pub fn new(
        node: NodeId,
        path: impl Into<String>,
        body: impl Into<String>,
        method: Method,
    ) -> Self {
        Self {
            node,
            path: path.into(),
            body: body.into(),
            method,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("POST".parse::<Method>().unwrap(), Method::Post);
        assert!("PATCH".parse::<Method>().is_err());
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_call_result_from_node_json() {
        let raw = r#"{"TelegramHash":"abc","Response":"{}","Err":""}"#;
        let result: CallResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.correlation_hash, "abc");
        assert_eq!(result.response, "{}");
        assert!(result.is_ok());
    }

    #[test]
    fn test_call_result_with_app_error() {
        let raw = r#"{"telegramHash":"h1","response":"","err":"model not found"}"#;
        let result: CallResult = serde_json::from_str(raw).unwrap();
        assert!(!result.is_ok());
        assert_eq!(result.application_error(), Some("model not found"));
    }

    #[test]
    fn test_call_result_serializes_without_empty_err() {
        let json = serde_json::to_string(&CallResult::ok("h", "{}")).unwrap();
        assert_eq!(json, r#"{"telegramHash":"h","response":"{}"}"#);
    }

    #[test]
    fn test_app_error_empty_message_is_ok() {
        assert!(CallResult::app_error("h", "").is_ok());
    }
}
