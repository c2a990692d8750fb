pub mod dto;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, Response, Url};

use crate::config::FirestoreConfig;
use crate::error::AppError;
use crate::models::{ClassItem, Period, ScheduleEntry, ScheduleFilter, SessionType, format_date, parse_date};
use crate::store::{ExistenceCheck, ScheduleStore};

const PAGE_SIZE: &str = "300";
const SCHEDULE_FIELDS: [&str; 5] = ["date", "classId", "subject", "period", "type"];

/// Schedule store backed by the Firestore REST API.
pub struct FirestoreStore {
    client: Client,
    config: FirestoreConfig,
}

impl FirestoreStore {
    pub fn new(config: FirestoreConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url,
            self.config.documents_root(),
            collection
        )
    }

    fn document_url(&self, collection: &str, id: &str) -> Result<Url, AppError> {
        document_url(&self.collection_url(collection), id)
    }

    fn run_query_url(&self) -> String {
        format!(
            "{}/{}:runQuery",
            self.config.base_url,
            self.config.documents_root()
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = match &self.config.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        match &self.config.api_key {
            Some(key) => request.query(&[("key", key.as_str())]),
            None => request,
        }
    }

    /// Follows page tokens until the whole collection has been read.
    async fn list_documents(&self, collection: &str) -> Result<Vec<dto::Document>, AppError> {
        let url = self.collection_url(collection);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.client.get(&url).query(&[("pageSize", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = self
                .authorize(request)
                .send()
                .await
                .map_err(|e| AppError::StoreUnavailable(format!("list {}: {}", collection, e)))?;
            let body = read_body(response)
                .await
                .map_err(|e| AppError::StoreUnavailable(format!("list {}: {}", collection, e)))?;

            let page: dto::ListDocumentsResponse = serde_json::from_str(&body).map_err(|e| {
                tracing::error!("Failed to parse: {}", e);
                AppError::StoreUnavailable(format!("Failed to parse Firestore response: {}", e))
            })?;

            documents.extend(page.documents);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!("Fetched {} documents from {}", documents.len(), collection);
        Ok(documents)
    }

    async fn run_query(&self, request_body: &dto::RunQueryRequest) -> Result<Vec<dto::Document>, AppError> {
        let response = self
            .authorize(self.client.post(self.run_query_url()))
            .json(request_body)
            .send()
            .await
            .map_err(|e| AppError::StoreUnavailable(format!("runQuery: {}", e)))?;
        let body = read_body(response)
            .await
            .map_err(|e| AppError::StoreUnavailable(format!("runQuery: {}", e)))?;

        let items: Vec<dto::RunQueryResponseItem> = serde_json::from_str(&body)
            .map_err(|e| AppError::StoreUnavailable(format!("Failed to parse runQuery response: {}", e)))?;

        Ok(items.into_iter().filter_map(|item| item.document).collect())
    }

    async fn create_document(
        &self,
        collection: &str,
        fields: HashMap<String, dto::Value>,
    ) -> Result<dto::Document, AppError> {
        let request_body = dto::WriteDocumentRequest { fields };
        let response = self
            .authorize(self.client.post(self.collection_url(collection)))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| AppError::WriteFailed(format!("create in {}: {}", collection, e)))?;
        let body = read_body(response)
            .await
            .map_err(|e| AppError::WriteFailed(format!("create in {}: {}", collection, e)))?;

        serde_json::from_str(&body)
            .map_err(|e| AppError::WriteFailed(format!("Failed to parse created document: {}", e)))
    }

    /// Overwrites the given fields of an existing document. Fails when the
    /// document is gone instead of silently recreating it.
    async fn patch_document(
        &self,
        collection: &str,
        id: &str,
        fields: HashMap<String, dto::Value>,
    ) -> Result<(), AppError> {
        let mut params: Vec<(&str, &str)> = SCHEDULE_FIELDS
            .iter()
            .map(|field| ("updateMask.fieldPaths", *field))
            .collect();
        params.push(("currentDocument.exists", "true"));

        let url = self.document_url(collection, id)?;
        let request_body = dto::WriteDocumentRequest { fields };
        let response = self
            .authorize(self.client.patch(url))
            .query(&params)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| AppError::WriteFailed(format!("update {}/{}: {}", collection, id, e)))?;

        let status = response.status();
        let body = read_body(response)
            .await
            .map_err(|e| AppError::WriteFailed(format!("update {}/{}: {}", collection, id, e)))?;
        tracing::debug!("Firestore response (update schedule): {} - {} bytes", status, body.len());

        Ok(())
    }
}

/// Rejects ids Firestore reserves (`.`, `..`, `__name__`-style) and ids that
/// would address another path.
pub fn validate_document_id(id: &str) -> Result<(), AppError> {
    let reserved = id == "." || id == ".." || (id.len() >= 4 && id.starts_with("__") && id.ends_with("__"));
    if id.is_empty() || id.len() > 1500 || id.contains('/') || reserved {
        return Err(AppError::Validation(format!("invalid document id: {:?}", id)));
    }
    Ok(())
}

/// Appends `id` as one percent-encoded path segment.
fn document_url(collection_url: &str, id: &str) -> Result<Url, AppError> {
    validate_document_id(id)?;
    let mut url = Url::parse(collection_url)
        .map_err(|e| AppError::Config(format!("invalid Firestore url {}: {}", collection_url, e)))?;
    url.path_segments_mut()
        .map_err(|_| AppError::Config(format!("Firestore url has no path: {}", collection_url)))?
        .push(id);
    Ok(url)
}

/// Returns the body of a successful response, or the Firestore error message.
async fn read_body(response: Response) -> Result<String, String> {
    let status = response.status();
    let body = response.text().await.map_err(|e| e.to_string())?;

    if !status.is_success() {
        let detail = serde_json::from_str::<dto::ErrorEnvelope>(&body)
            .map(|env| format!("{} {}", env.error.status, env.error.message))
            .unwrap_or(body);
        return Err(format!("Firestore API error {}: {}", status, detail));
    }

    Ok(body)
}

pub fn schedule_fields(entry: &ScheduleEntry) -> HashMap<String, dto::Value> {
    HashMap::from([
        ("date".to_string(), dto::Value::string(format_date(entry.date))),
        ("classId".to_string(), dto::Value::string(&entry.class_id)),
        ("subject".to_string(), dto::Value::string(&entry.subject)),
        ("period".to_string(), dto::Value::integer(entry.period.get() as i64)),
        ("type".to_string(), dto::Value::string(entry.session_type.as_str())),
    ])
}

pub fn parse_schedule_from_document(doc: &dto::Document) -> Result<ScheduleEntry, AppError> {
    let missing = |key: &str| AppError::Validation(format!("Missing field: {}", key));

    let date = parse_date(doc.string_field("date").ok_or_else(|| missing("date"))?)?;
    let class_id = doc.string_field("classId").ok_or_else(|| missing("classId"))?;
    let subject = doc.string_field("subject").unwrap_or_default();
    let period = Period::new(doc.integer_field("period").ok_or_else(|| missing("period"))?)?;
    let session_type: SessionType = doc.string_field("type").ok_or_else(|| missing("type"))?.parse()?;

    Ok(ScheduleEntry {
        id: Some(doc.id().to_string()),
        date,
        class_id: class_id.to_string(),
        subject: subject.to_string(),
        period,
        session_type,
    })
}

pub fn parse_class_from_document(doc: &dto::Document) -> ClassItem {
    let id = doc
        .string_field("id")
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| doc.id());
    let name = doc.string_field("name").unwrap_or(id);
    ClassItem::new(id, name)
}

pub fn existence_query(
    collection: &str,
    date: NaiveDate,
    class_id: &str,
    period: Period,
) -> dto::RunQueryRequest {
    dto::RunQueryRequest {
        structured_query: dto::StructuredQuery {
            from: vec![dto::CollectionSelector {
                collection_id: collection.to_string(),
            }],
            filter: Some(dto::Filter::all_of(vec![
                dto::Filter::equals("date", dto::Value::string(format_date(date))),
                dto::Filter::equals("classId", dto::Value::string(class_id)),
                dto::Filter::equals("period", dto::Value::integer(period.get() as i64)),
            ])),
            limit: Some(1),
        },
    }
}

#[async_trait]
impl ScheduleStore for FirestoreStore {
    async fn list_classes(&self) -> Result<Vec<ClassItem>, AppError> {
        let documents = self.list_documents(&self.config.classes_collection).await?;
        Ok(documents.iter().map(parse_class_from_document).collect())
    }

    async fn list_schedules(&self, filter: &ScheduleFilter) -> Result<Vec<ScheduleEntry>, AppError> {
        let documents = self.list_documents(&self.config.schedules_collection).await?;
        let mut schedules = Vec::new();

        for doc in &documents {
            match parse_schedule_from_document(doc) {
                Ok(entry) => schedules.push(entry),
                Err(e) => {
                    tracing::warn!("Failed to parse schedule from document {}: {}", doc.id(), e);
                }
            }
        }

        Ok(filter.apply(schedules))
    }

    async fn schedule_exists(
        &self,
        date: NaiveDate,
        class_id: &str,
        period: Period,
    ) -> Result<ExistenceCheck, AppError> {
        let query = existence_query(&self.config.schedules_collection, date, class_id, period);
        let documents = self.run_query(&query).await?;

        Ok(match documents.first() {
            Some(doc) => ExistenceCheck::found(doc.id()),
            None => ExistenceCheck::missing(),
        })
    }

    async fn upsert_schedule(
        &self,
        entry: &ScheduleEntry,
        id: Option<&str>,
    ) -> Result<String, AppError> {
        let fields = schedule_fields(entry);
        let collection = &self.config.schedules_collection;

        match id {
            Some(id) => {
                self.patch_document(collection, id, fields).await?;
                tracing::info!("Updated schedule {} ({})", id, entry.slot());
                Ok(id.to_string())
            }
            None => {
                let created = self.create_document(collection, fields).await?;
                let new_id = created.id().to_string();
                tracing::info!("Created schedule {} ({})", new_id, entry.slot());
                Ok(new_id)
            }
        }
    }

    async fn ping(&self) -> Result<(), AppError> {
        let request = self
            .client
            .get(self.collection_url(&self.config.classes_collection))
            .query(&[("pageSize", "1")]);
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| AppError::StoreUnavailable(format!("ping: {}", e)))?;
        read_body(response)
            .await
            .map(|_| ())
            .map_err(AppError::StoreUnavailable)
    }
}
