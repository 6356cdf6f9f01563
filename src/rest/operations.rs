//! Verb-level operations.
//!
//! Two fatality policies meet here. Lookups (`get`, `get_collection`) use the
//! transport policy: only NoAuth, UnAuth and System errors fail the call, any
//! other error means "absent". Mutations (`post`, `put`, `create`, `update`)
//! use the strict policy: every error fails the call.

use reqwest::Method;
use serde_json::Value;

use crate::error::AppNexusError;
use crate::rest::AppNexusClient;
use crate::rest::endpoints::fields;
use crate::rest::pager::page_items;
use crate::rest::response::{FatalityPolicy, u64_field};
use crate::types::Values;

impl AppNexusClient {
    /// Invoke an operation and return the response envelope.
    ///
    /// Errors that are not fatal under `policy` are logged and returned as
    /// `Ok(None)`, as are bodies that carry no envelope.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<&Value>,
        policy: FatalityPolicy,
    ) -> Result<Option<Values>, AppNexusError> {
        let exchange = self.send(method.clone(), uri, body).await?;

        if let Some(api_error) = exchange.error {
            if policy.is_fatal(api_error.kind) {
                tracing::warn!(%method, uri, error = %api_error, body = %exchange.raw, "API error");
                return Err(AppNexusError::Api(api_error));
            }
            tracing::warn!(
                %method,
                uri,
                status = exchange.status.as_u16(),
                error = %api_error,
                body = %exchange.raw,
                "Treating error response as absent"
            );
            return Ok(None);
        }

        if exchange.envelope.is_none() {
            tracing::debug!(%method, uri, body = %exchange.raw, "Response carried no envelope");
        }
        Ok(exchange.envelope)
    }

    /// Look up a single object.
    ///
    /// Returns `Ok(None)` when the object does not exist, which includes any
    /// error response that is not NoAuth, UnAuth or System, and malformed
    /// bodies.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use appnexus_api_client::rest::AppNexusClient;
    /// # async fn example(client: &AppNexusClient) -> Result<(), appnexus_api_client::AppNexusError> {
    /// if let Some(values) = client.get("/campaign?id=42").await? {
    ///     println!("{}", values["campaign"]["name"]);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get(&self, uri: &str) -> Result<Option<Values>, AppNexusError> {
        self.request(Method::GET, uri, None, FatalityPolicy::Transport)
            .await
    }

    /// Fetch a collection that the endpoint returns in one response.
    ///
    /// Returns an empty vector when the endpoint reports "not found".
    pub async fn get_collection(
        &self,
        field: &str,
        uri: &str,
    ) -> Result<Vec<Values>, AppNexusError> {
        let Some(values) = self.get(uri).await? else {
            return Ok(Vec::new());
        };
        let (_, items) = page_items(&values, field);
        Ok(items)
    }

    /// POST a body and return the response envelope. Any error fails the call.
    pub async fn post(&self, uri: &str, body: &Value) -> Result<Values, AppNexusError> {
        self.mutate(Method::POST, uri, body).await
    }

    /// PUT a body and return the response envelope. Any error fails the call.
    pub async fn put(&self, uri: &str, body: &Value) -> Result<Values, AppNexusError> {
        self.mutate(Method::PUT, uri, body).await
    }

    /// Create an object and return its server-assigned id.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use appnexus_api_client::rest::AppNexusClient;
    /// # async fn example(client: &AppNexusClient) -> Result<(), appnexus_api_client::AppNexusError> {
    /// let body = serde_json::json!({"line-item": {"name": "Spring", "state": "inactive"}});
    /// let id = client.create("/line-item?advertiser_id=10", &body).await?;
    /// println!("created line item {id}");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create(&self, uri: &str, body: &Value) -> Result<u64, AppNexusError> {
        let values = self.mutate(Method::POST, uri, body).await?;
        Self::object_id(values)
    }

    /// Update an object and return its id as echoed by the server.
    pub async fn update(&self, uri: &str, body: &Value) -> Result<u64, AppNexusError> {
        let values = self.mutate(Method::PUT, uri, body).await?;
        Self::object_id(values)
    }

    /// Delete an object.
    ///
    /// Returns `Ok(false)` instead of failing for transport errors and for
    /// error responses that are not NoAuth, UnAuth or System, since deleting
    /// an object that is already gone is not a failure for callers.
    pub async fn delete(&self, uri: &str) -> Result<bool, AppNexusError> {
        match self.send(Method::DELETE, uri, None).await {
            Ok(exchange) => match exchange.error {
                Some(api_error) => {
                    tracing::warn!(uri, error = %api_error, body = %exchange.raw, "Delete rejected");
                    Ok(false)
                }
                None => Ok(true),
            },
            Err(e) if e.is_transport() => {
                tracing::warn!(uri, error = %e, "Delete failed");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn mutate(
        &self,
        method: Method,
        uri: &str,
        body: &Value,
    ) -> Result<Values, AppNexusError> {
        tracing::trace!(%method, uri, request = %body, "Sending mutation");
        let exchange = self.send(method.clone(), uri, Some(body)).await?;
        tracing::trace!(%method, uri, response = %exchange.raw, "Mutation response");

        if let Some(api_error) = exchange.error {
            tracing::warn!(%method, uri, error = %api_error, body = %exchange.raw, "Mutation rejected");
            return Err(AppNexusError::Api(api_error));
        }

        exchange
            .envelope
            .ok_or_else(|| AppNexusError::ProtocolViolation {
                message: format!("{method} {uri} returned no response envelope"),
                raw_response: exchange.raw,
            })
    }

    fn object_id(values: Values) -> Result<u64, AppNexusError> {
        u64_field(&values, fields::ID).ok_or_else(|| AppNexusError::ProtocolViolation {
            message: "Response has no object id".to_string(),
            raw_response: Value::Object(values).to_string(),
        })
    }
}
