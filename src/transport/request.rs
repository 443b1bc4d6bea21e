use crate::error::ApiError;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

/// One API call, described as data so it can be replayed after a token refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) body: Option<Value>,
    pub(crate) refresh_on_unauthorized: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            refresh_on_unauthorized: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Append a query pair only when `value` is present.
    pub fn query_opt<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    pub fn queries<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.to_string())));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::encode(&e))?;
        Ok(self.body(value))
    }

    /// Credential exchanges (login, register) must not trigger the refresh
    /// pipeline: a rejected password is not an expired session.
    pub fn without_auth_refresh(mut self) -> Self {
        self.refresh_on_unauthorized = false;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn builder_collects_query_and_body() {
        let req = ApiRequest::get("/projects/p1/tasks")
            .query("page", 2)
            .query_opt("status", Some("todo"))
            .query_opt::<&str>("priority", None)
            .json(&json!({ "x": 1 }))
            .expect("serialize body");

        assert_eq!(req.method(), &Method::GET);
        assert_eq!(
            req.query,
            vec![
                ("page".to_string(), "2".to_string()),
                ("status".to_string(), "todo".to_string()),
            ]
        );
        assert_eq!(req.body, Some(json!({ "x": 1 })));
        assert!(req.refresh_on_unauthorized);
        assert!(!req.without_auth_refresh().refresh_on_unauthorized);
    }

    #[test]
    fn unserializable_body_is_an_encode_error() {
        let body: BTreeMap<(u8, u8), u8> = BTreeMap::from([((1, 2), 3)]);
        let err = ApiRequest::post("/tasks")
            .json(&body)
            .expect_err("tuple keys are not JSON object keys");

        assert_eq!(err.code, "ENCODE_ERROR");
        assert!(err.status.is_none());
        assert!(err.message.starts_with("Failed to encode request body"));
    }
}
