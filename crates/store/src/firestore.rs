//! Firestore REST (v1) [`DocumentStore`].
//!
//! Writes go through `documents:commit` so server timestamps and existence
//! preconditions are applied atomically with the field data. Reads use plain
//! `GET` and `documents:runQuery`.

use async_trait::async_trait;
use pipeline::{
    truncate_error_body, CollectionName, DocumentPatch, DocumentQuery, DocumentStore, Fields,
    RecordId, StoreError, StoredDocument,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, instrument};

use crate::ids::generate_document_id;
use crate::value::{decode_fields, encode_fields, encode_value};

/// Connection settings for a Firestore database.
#[derive(Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub database: String,
    pub base_url: String,
    pub access_token: Option<String>,
}

impl FirestoreConfig {
    /// Public Firestore REST endpoint.
    pub const DEFAULT_BASE_URL: &'static str = "https://firestore.googleapis.com/v1";
    /// Database id used when none is configured.
    pub const DEFAULT_DATABASE: &'static str = "(default)";

    /// Settings for the default database of `project_id` on the public endpoint.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database: Self::DEFAULT_DATABASE.to_string(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            access_token: None,
        }
    }

    /// Targets a named database instead of `(default)`.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Targets a local emulator at `host:port`.
    #[must_use]
    pub fn with_emulator(mut self, host: &str) -> Self {
        self.base_url = format!("http://{}/v1", host.trim_end_matches('/'));
        self
    }

    /// Sends `token` as an OAuth bearer token on every request.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

impl std::fmt::Debug for FirestoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreConfig")
            .field("project_id", &self.project_id)
            .field("database", &self.database)
            .field("base_url", &self.base_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// REST shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RestDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl RestDocument {
    fn into_stored(self) -> Result<StoredDocument, StoreError> {
        let id = self
            .name
            .rsplit('/')
            .next()
            .and_then(|segment| RecordId::new(segment))
            .ok_or_else(|| StoreError::Decode {
                message: format!("document name '{}' has no id segment", self.name),
            })?;
        Ok(StoredDocument {
            id,
            fields: decode_fields(&self.fields)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RunQueryItem {
    #[serde(default)]
    document: Option<RestDocument>,
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Quotes a field path segment when it is not a plain identifier.
fn field_path(name: &str) -> String {
    let simple = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

fn server_time_transforms(fields: &[String]) -> Vec<Value> {
    fields
        .iter()
        .map(|field| json!({ "fieldPath": field_path(field), "setToServerValue": "REQUEST_TIME" }))
        .collect()
}

fn create_write(document_name: &str, fields: &Fields, server_timestamps: &[String]) -> Value {
    json!({
        "update": { "name": document_name, "fields": encode_fields(fields) },
        "updateTransforms": server_time_transforms(server_timestamps),
        "currentDocument": { "exists": false },
    })
}

fn update_write(document_name: &str, patch: &DocumentPatch) -> Value {
    let mask: Vec<String> = patch.fields.keys().map(|k| field_path(k)).collect();
    json!({
        "update": { "name": document_name, "fields": encode_fields(&patch.fields) },
        "updateMask": { "fieldPaths": mask },
        "updateTransforms": server_time_transforms(&patch.server_timestamps),
        "currentDocument": { "exists": true },
    })
}

fn structured_query(collection: &CollectionName, query: &DocumentQuery) -> Value {
    let mut structured = Map::new();
    structured.insert("from".into(), json!([{ "collectionId": collection.as_str() }]));

    let filters: Vec<Value> = query
        .filters
        .iter()
        .map(|(field, value)| {
            json!({ "fieldFilter": {
                "field": { "fieldPath": field_path(field) },
                "op": "EQUAL",
                "value": encode_value(value),
            }})
        })
        .collect();
    match filters.len() {
        0 => {}
        1 => {
            structured.insert("where".into(), filters.into_iter().next().unwrap_or_default());
        }
        _ => {
            structured.insert(
                "where".into(),
                json!({ "compositeFilter": { "op": "AND", "filters": filters } }),
            );
        }
    }

    if let Some(field) = &query.order_by_desc {
        structured.insert(
            "orderBy".into(),
            json!([{ "field": { "fieldPath": field_path(field) }, "direction": "DESCENDING" }]),
        );
    }
    if let Some(limit) = query.limit {
        structured.insert("limit".into(), json!(limit));
    }

    json!({ "structuredQuery": structured })
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Firestore-backed document store.
///
/// Construct once at startup and share; `reqwest::Client` pools connections
/// internally.
pub struct FirestoreStore {
    client: Client,
    config: FirestoreConfig,
}

impl FirestoreStore {
    /// Creates a store for `config`.
    pub fn new(config: FirestoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .user_agent(concat!("surveylens/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(transport_error)?;
        Ok(Self { client, config })
    }

    fn database_path(&self) -> String {
        format!(
            "projects/{}/databases/{}",
            self.config.project_id, self.config.database
        )
    }

    fn documents_path(&self) -> String {
        format!("{}/documents", self.database_path())
    }

    fn document_name(&self, collection: &CollectionName, id: &RecordId) -> String {
        format!("{}/{}/{}", self.documents_path(), collection, id)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn commit(&self, write: Value) -> Result<Response, StoreError> {
        let url = self.url(&format!("{}:commit", self.documents_path()));
        self.authorize(self.client.post(url))
            .json(&json!({ "writes": [write] }))
            .send()
            .await
            .map_err(transport_error)
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    #[instrument(skip_all, fields(collection = %collection, id = %id))]
    async fn get(
        &self,
        collection: &CollectionName,
        id: &RecordId,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let url = self.url(&self.document_name(collection, id));
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("Document not found");
            return Ok(None);
        }

        let document: RestDocument = check_status(response)
            .await?
            .json()
            .await
            .map_err(decode_response_error)?;
        document.into_stored().map(Some)
    }

    #[instrument(skip_all, fields(collection = %collection))]
    async fn create(
        &self,
        collection: &CollectionName,
        fields: Fields,
        server_timestamps: &[String],
    ) -> Result<RecordId, StoreError> {
        let id = generate_document_id();
        let name = self.document_name(collection, &id);
        let response = self
            .commit(create_write(&name, &fields, server_timestamps))
            .await?;
        check_status(response).await?;
        debug!(id = %id, "Created document");
        Ok(id)
    }

    #[instrument(skip_all, fields(collection = %collection, id = %id))]
    async fn update(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        patch: DocumentPatch,
    ) -> Result<(), StoreError> {
        let name = self.document_name(collection, id);
        let response = self.commit(update_write(&name, &patch)).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        check_status(response).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(collection = %collection))]
    async fn query(
        &self,
        collection: &CollectionName,
        query: &DocumentQuery,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let url = self.url(&format!("{}:runQuery", self.documents_path()));
        let response = self
            .authorize(self.client.post(url))
            .json(&structured_query(collection, query))
            .send()
            .await
            .map_err(transport_error)?;

        let items: Vec<RunQueryItem> = check_status(response)
            .await?
            .json()
            .await
            .map_err(decode_response_error)?;

        let documents = items
            .into_iter()
            .filter_map(|item| item.document)
            .map(RestDocument::into_stored)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = documents.len(), "Query returned documents");
        Ok(documents)
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn transport_error(err: reqwest::Error) -> StoreError {
    StoreError::Transport {
        message: err.to_string(),
    }
}

fn decode_response_error(err: reqwest::Error) -> StoreError {
    StoreError::Decode {
        message: err.to_string(),
    }
}

async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut message = truncate_error_body(
        response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {e}>")),
    );
    if message.trim().is_empty() {
        message = status.canonical_reason().unwrap_or("unknown status").to_string();
    }

    Err(StoreError::Status {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> FirestoreStore {
        FirestoreStore::new(FirestoreConfig::new("demo-project")).unwrap()
    }

    #[test]
    fn document_names_follow_rest_layout() {
        let store = store();
        let name = store.document_name(
            &CollectionName::new("SurveyResponses").unwrap(),
            &RecordId::new("abc").unwrap(),
        );
        assert_eq!(
            name,
            "projects/demo-project/databases/(default)/documents/SurveyResponses/abc"
        );
        assert_eq!(
            store.url(&name),
            "https://firestore.googleapis.com/v1/projects/demo-project/databases/(default)/documents/SurveyResponses/abc"
        );
    }

    #[test]
    fn emulator_switches_base_url() {
        let config = FirestoreConfig::new("p").with_emulator("localhost:8080");
        assert_eq!(config.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn debug_output_redacts_token() {
        let config = FirestoreConfig::new("p").with_access_token("secret-token");
        assert!(!format!("{config:?}").contains("secret-token"));
    }

    #[test]
    fn create_write_requires_absence_and_stamps_server_time() {
        let mut fields = Fields::new();
        fields.insert("status".into(), json!("pending_analysis"));
        let write = create_write("projects/p/x/c/id", &fields, &["createdAt".into()]);

        assert_eq!(write["currentDocument"], json!({"exists": false}));
        assert_eq!(
            write["updateTransforms"],
            json!([{"fieldPath": "createdAt", "setToServerValue": "REQUEST_TIME"}])
        );
        assert_eq!(
            write["update"]["fields"]["status"],
            json!({"stringValue": "pending_analysis"})
        );
        assert!(write.get("updateMask").is_none());
    }

    #[test]
    fn update_write_masks_only_patched_fields() {
        let patch = DocumentPatch::new()
            .set("status", json!("analyzed"))
            .set("analysis", json!({"rating": 4}))
            .server_timestamp("analyzedAt");
        let write = update_write("n", &patch);

        assert_eq!(write["updateMask"]["fieldPaths"], json!(["analysis", "status"]));
        assert_eq!(write["currentDocument"], json!({"exists": true}));
        assert_eq!(write["updateTransforms"][0]["fieldPath"], json!("analyzedAt"));
    }

    #[test]
    fn structured_query_composes_filters_order_and_limit() {
        let query = DocumentQuery::all()
            .where_eq("type", json!("email"))
            .where_eq("status", json!("analyzed"))
            .newest_first("createdAt")
            .limit(10);
        let body = structured_query(&CollectionName::new("customer-feedback").unwrap(), &query);
        let structured = &body["structuredQuery"];

        assert_eq!(structured["from"], json!([{"collectionId": "customer-feedback"}]));
        assert_eq!(structured["where"]["compositeFilter"]["op"], json!("AND"));
        assert_eq!(
            structured["where"]["compositeFilter"]["filters"][1]["fieldFilter"]["value"],
            json!({"stringValue": "analyzed"})
        );
        assert_eq!(structured["orderBy"][0]["direction"], json!("DESCENDING"));
        assert_eq!(structured["limit"], json!(10));
    }

    #[test]
    fn single_filter_is_not_wrapped_in_composite() {
        let query = DocumentQuery::all().where_eq("status", json!("pending_analysis"));
        let body = structured_query(&CollectionName::new("c").unwrap(), &query);
        assert!(body["structuredQuery"]["where"]["fieldFilter"].is_object());
        assert!(body["structuredQuery"].get("orderBy").is_none());
    }

    #[test]
    fn unusual_field_names_are_backtick_quoted() {
        assert_eq!(field_path("createdAt"), "createdAt");
        assert_eq!(field_path("my-field"), "`my-field`");
        assert_eq!(field_path("9lives"), "`9lives`");
    }

    #[test]
    fn rest_document_decodes_id_and_fields() {
        let rest: RestDocument = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/SurveyResponses/xyz",
            "fields": {"priceRating": {"integerValue": "5"}},
            "createTime": "2026-01-01T00:00:00Z"
        }))
        .unwrap();
        let stored = rest.into_stored().unwrap();
        assert_eq!(stored.id.as_str(), "xyz");
        assert_eq!(stored.fields["priceRating"], json!(5));
    }
}
