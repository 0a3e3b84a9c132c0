//! The normalized request the dispatcher consumes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The four HTTP methods the contract layer routes. Anything else is never
/// owned by it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses an upper-case HTTP method name. Returns `Err` with the rejected
/// input for any method the contract layer does not route.
impl std::str::FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            other => Err(other.to_string()),
        }
    }
}

/// A transport-independent request.
///
/// `path` never includes a query string; query parameters travel in
/// `query_params`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub method: Method,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_params: Option<BTreeMap<String, String>>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            query_params: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, query: BTreeMap<String, String>) -> Self {
        self.query_params = Some(query);
        self
    }

    /// `/{route}/{id}`
    pub fn entity_path(route: &str, id: u64) -> String {
        format!("/{route}/{id}")
    }

    /// `/{route}`
    pub fn collection_path(route: &str) -> String {
        format!("/{route}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names() {
        assert_eq!("PATCH".parse::<Method>().unwrap(), Method::Patch);
        assert_eq!("PUT".parse::<Method>().unwrap_err(), "PUT");
        assert_eq!(serde_json::to_value(Method::Delete).unwrap(), "DELETE");
    }

    #[test]
    fn wire_shape_uses_camel_case() {
        let req = Request::new(Method::Get, "/foo")
            .with_query(BTreeMap::from([("name".into(), "d".into())]));
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["queryParams"]["name"], "d");
        assert!(json.get("body").is_none());
    }
}
