//! Transport-agnostic request dispatch.
//!
//! A transport adapter decodes its HTTP request into a [`ScimRequest`],
//! calls [`ScimServer::handle`] and encodes the returned
//! [`TransportResponse`]. Routing, `If-Match` parsing, projection and the
//! list-response envelope all happen here; every workflow step runs in the
//! provider.

use super::core::ScimServer;
use super::schema_management::listing;
use crate::error::{ScimError, ScimResult};
use crate::outcome::{Method, Outcome, TransportResponse, status};
use crate::patch::PatchRequest;
use crate::query::ListResponse;
use crate::resource::{
    HttpVersion, ListQuery, Projection, RawVersion, RequestContext, Resource, VersionCalculator,
};
use crate::schema::ResourceTypeDefinition;
use crate::storage::ResourceRepository;
use log::{debug, trace};
use serde_json::Value;

const SEARCH_SEGMENT: &str = ".search";

/// A decoded request, relative to the server's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ScimRequest {
    pub method: Method,
    /// Path below the base URL, e.g. `/Users/2819c223` or `/Users/.search`
    pub path: String,
    /// Decoded query-string pairs
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Raw `If-Match` header value
    pub if_match: Option<String>,
    /// Correlation id for log lines; generated when absent
    pub request_id: Option<String>,
}

impl ScimRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            if_match: None,
            request_id: None,
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_if_match(mut self, etag: impl Into<String>) -> Self {
        self.if_match = Some(etag.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    fn context(&self) -> RequestContext {
        self.request_id
            .as_deref()
            .map(RequestContext::new)
            .unwrap_or_default()
    }

    /// The tags listed in `If-Match`; `None` for a missing header or one
    /// that includes `*`.
    fn expected_versions(&self) -> ScimResult<Option<Vec<RawVersion>>> {
        let Some(header) = self.if_match.as_deref() else {
            return Ok(None);
        };
        let mut versions = Vec::new();
        for tag in header.split(',').map(str::trim) {
            if tag == "*" {
                return Ok(None);
            }
            let version = tag
                .parse::<HttpVersion>()
                .map(RawVersion::from)
                .or_else(|_| tag.parse::<RawVersion>())
                .map_err(|e| ScimError::invalid_syntax(format!("Invalid If-Match header: {}", e)))?;
            versions.push(version);
        }
        Ok(Some(versions))
    }

    fn take_body(&mut self) -> ScimResult<Value> {
        self.body
            .take()
            .ok_or_else(|| ScimError::invalid_syntax("Request body is required"))
    }
}

/// Where a request path points.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Route<'a> {
    Schemas(Option<&'a str>),
    ResourceTypes(Option<&'a str>),
    Collection(&'a str),
    Search(&'a str),
    Member(&'a str, &'a str),
}

impl<'a> Route<'a> {
    fn parse(path: &'a str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments[..] {
            [first] if first.eq_ignore_ascii_case("Schemas") => Some(Route::Schemas(None)),
            [first, id] if first.eq_ignore_ascii_case("Schemas") => Some(Route::Schemas(Some(id))),
            [first] if first.eq_ignore_ascii_case("ResourceTypes") => Some(Route::ResourceTypes(None)),
            [first, name] if first.eq_ignore_ascii_case("ResourceTypes") => {
                Some(Route::ResourceTypes(Some(name)))
            }
            [endpoint] => Some(Route::Collection(endpoint)),
            [endpoint, search] if search.eq_ignore_ascii_case(SEARCH_SEGMENT) => {
                Some(Route::Search(endpoint))
            }
            [endpoint, id] => Some(Route::Member(endpoint, id)),
            _ => None,
        }
    }
}

impl<R: ResourceRepository> ScimServer<R> {
    /// Dispatch one request.
    ///
    /// Never fails: every error becomes a SCIM error response with its status.
    pub async fn handle(&self, mut request: ScimRequest) -> TransportResponse {
        let context = request.context();
        debug!(
            "{:?} {} (request: '{}')",
            request.method, request.path, context.request_id
        );
        if let Some(body) = &request.body {
            trace!("Request body: {}", body);
        }

        let path = request.path.clone();
        let method = request.method;
        let response = match Route::parse(&path) {
            Some(Route::Schemas(id)) => self.discovery(method, |server| match id {
                None => Ok(serde_json::to_value(listing(server.schema_documents()?))?),
                Some(id) => server.schema_document(id),
            }),
            Some(Route::ResourceTypes(name)) => self.discovery(method, |server| match name {
                None => Ok(serde_json::to_value(listing(server.resource_type_documents()))?),
                Some(name) => server.resource_type_document(name),
            }),
            Some(Route::Collection(endpoint)) => match self.endpoint(endpoint) {
                Ok(definition) => self.collection(definition, &mut request, &context).await,
                Err(e) => error_response(method, e),
            },
            Some(Route::Search(endpoint)) => match (self.endpoint(endpoint), method) {
                (Ok(definition), Method::Post) => self.search_body(definition, &mut request, &context).await,
                (Ok(_), _) => method_not_allowed(method, &path),
                (Err(e), _) => error_response(method, e),
            },
            Some(Route::Member(endpoint, id)) => match self.endpoint(endpoint) {
                Ok(definition) => self.member(definition, id, &mut request, &context).await,
                Err(e) => error_response(method, e),
            },
            None => error_response(method, not_found_route(&path)),
        };

        debug!(
            "{:?} {} -> {} (request: '{}')",
            method, path, response.status, context.request_id
        );
        response
    }

    fn endpoint(&self, endpoint: &str) -> ScimResult<&ResourceTypeDefinition> {
        self.registry()
            .resource_type(endpoint)
            .ok_or_else(|| not_found_route(endpoint))
    }

    fn discovery<F>(&self, method: Method, document: F) -> TransportResponse
    where
        F: FnOnce(&Self) -> ScimResult<Value>,
    {
        if !matches!(method, Method::Get | Method::Head) {
            return method_not_allowed(method, "discovery endpoint");
        }
        Outcome::from(document(self)).to_transport(method, status::OK)
    }

    async fn collection(
        &self,
        definition: &ResourceTypeDefinition,
        request: &mut ScimRequest,
        context: &RequestContext,
    ) -> TransportResponse {
        let method = request.method;
        match method {
            Method::Get | Method::Head => {
                let query = ListQuery::from_query_pairs(&request.query);
                self.list(definition, &query, method, context).await
            }
            Method::Post => {
                let projection = match query_projection(&request.query) {
                    Ok(projection) => projection,
                    Err(e) => return error_response(method, e),
                };
                let outcome = match request.take_body() {
                    Ok(body) => self.provider.create(&definition.name, body, context).await,
                    Err(e) => Outcome::Failure(e),
                };
                resource_response(outcome, method, status::CREATED, definition, &projection)
            }
            _ => method_not_allowed(method, &request.path),
        }
    }

    async fn search_body(
        &self,
        definition: &ResourceTypeDefinition,
        request: &mut ScimRequest,
        context: &RequestContext,
    ) -> TransportResponse {
        let query = request.take_body().and_then(|body| {
            serde_json::from_value::<ListQuery>(body)
                .map_err(|e| ScimError::invalid_syntax(format!("Malformed search request: {}", e)))
        });
        match query {
            Ok(query) => self.list(definition, &query, Method::Post, context).await,
            Err(e) => error_response(Method::Post, e),
        }
    }

    async fn list(
        &self,
        definition: &ResourceTypeDefinition,
        query: &ListQuery,
        method: Method,
        context: &RequestContext,
    ) -> TransportResponse {
        let projection = match Projection::new(&query.attributes, &query.excluded_attributes) {
            Ok(projection) => projection,
            Err(e) => return error_response(method, e),
        };
        self.provider
            .search(&definition.name, query, context)
            .await
            .map(|page| ListResponse::from(page.map(|resource| projection.apply(definition, &resource))))
            .to_transport(method, status::OK)
    }

    async fn member(
        &self,
        definition: &ResourceTypeDefinition,
        id: &str,
        request: &mut ScimRequest,
        context: &RequestContext,
    ) -> TransportResponse {
        let method = request.method;
        let prepared = query_projection(&request.query)
            .and_then(|projection| Ok((projection, request.expected_versions()?)));
        let (projection, candidates) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => return error_response(method, e),
        };
        let expected = match candidates {
            Some(tags) => self.matching_candidate(definition, id, tags).await,
            None => None,
        };
        let expected = expected.as_ref();
        let provider = &self.provider;
        let name = definition.name.as_str();

        let outcome = match method {
            Method::Get | Method::Head => provider.get(name, id, context).await,
            Method::Put => match request.take_body() {
                Ok(body) => provider.replace(name, id, body, expected, context).await,
                Err(e) => Outcome::Failure(e),
            },
            Method::Patch => match request.take_body().and_then(PatchRequest::from_json) {
                Ok(patch) => provider.patch(name, id, &patch, expected, context).await,
                Err(e) => Outcome::Failure(e),
            },
            Method::Delete => {
                return provider
                    .delete(name, id, expected, context)
                    .await
                    .to_transport(method, status::NO_CONTENT);
            }
            Method::Post => return method_not_allowed(method, &request.path),
        };
        resource_response(outcome, method, status::OK, definition, &projection)
    }

    /// The `If-Match` tag to hand to the provider.
    ///
    /// With several tags, the one naming the stored version wins; the
    /// repository still compares it atomically with the write. When none
    /// matches, the first tag goes through and fails the precondition.
    async fn matching_candidate(
        &self,
        definition: &ResourceTypeDefinition,
        id: &str,
        mut tags: Vec<RawVersion>,
    ) -> Option<RawVersion> {
        if tags.len() > 1 {
            if let Ok(Some(stored)) = self.provider.repository().get(&definition.name, id).await {
                if let Some(index) = tags.iter().position(|tag| VersionCalculator::matches(&stored, tag)) {
                    trace!("If-Match tag {} of {} matches {} '{}'", index + 1, tags.len(), definition.name, id);
                    return Some(tags.swap_remove(index));
                }
            }
        }
        tags.into_iter().next()
    }
}

fn query_projection(query: &[(String, String)]) -> ScimResult<Projection> {
    let query = ListQuery::from_query_pairs(query);
    Projection::new(&query.attributes, &query.excluded_attributes)
}

/// Project a resource result and attach its ETag, plus `Location` on create.
fn resource_response(
    outcome: Outcome<Resource>,
    method: Method,
    success_status: u16,
    definition: &ResourceTypeDefinition,
    projection: &Projection,
) -> TransportResponse {
    let meta = outcome.value().and_then(|resource| resource.meta.clone());
    let etag = meta.as_ref().and_then(|meta| meta.version.clone());
    let location = meta
        .filter(|_| success_status == status::CREATED)
        .and_then(|meta| meta.location);

    outcome
        .map(|resource| projection.apply(definition, &resource))
        .to_transport(method, success_status)
        .with_etag(etag)
        .with_location(location)
}

fn error_response(method: Method, error: ScimError) -> TransportResponse {
    Outcome::<Value>::Failure(error).to_transport(method, status::OK)
}

fn not_found_route(path: &str) -> ScimError {
    ScimError::Other {
        status: Some(status::NOT_FOUND),
        scim_type: None,
        detail: format!("No SCIM endpoint at '{}'", path),
    }
}

fn method_not_allowed(method: Method, path: &str) -> TransportResponse {
    error_response(
        method,
        ScimError::Other {
            status: Some(status::METHOD_NOT_ALLOWED),
            scim_type: None,
            detail: format!("{:?} is not supported on '{}'", method, path),
        },
    )
}
