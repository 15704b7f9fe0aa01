//! REST client for the project-management service.
//!
//! Every call returns a [`CamperResult`] so it can back a pool fetcher or a
//! mutation directly. Transport, status and decode failures become
//! [`RemoteError`] variants tagged with the endpoint.

use crate::config::TuiConfig;
use camper_core::{
    AccountInfo, CamperResult, CheckinAnswerInfo, CheckinQuestionInfo, RecordId, RemoteError,
    ScheduleEntryInfo, SearchResultInfo, Timestamp, TodoInfo,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Longest error body kept in a status error.
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Config error: {0}")]
    Config(String),
}

#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
}

impl RestClient {
    pub fn new(config: &TuiConfig) -> Result<Self, ApiClientError> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(build_headers(config)?)
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ========================================================================
    // TODOS
    // ========================================================================

    pub async fn list_todos(
        &self,
        account_id: &str,
        project_id: RecordId,
        todolist_id: RecordId,
    ) -> CamperResult<Vec<TodoInfo>> {
        let path = paths::todos(account_id, project_id, todolist_id);
        let todos: Vec<WireTodo> = self.get_json(&path, &[]).await?;
        Ok(todos.into_iter().map(TodoInfo::from).collect())
    }

    pub async fn set_todo_completed(
        &self,
        account_id: &str,
        project_id: RecordId,
        todo_id: RecordId,
        completed: bool,
    ) -> CamperResult<()> {
        let path = paths::completion(account_id, project_id, todo_id);
        let method = if completed { Method::POST } else { Method::DELETE };
        self.send_empty(method, &path).await
    }

    pub async fn trash_recording(
        &self,
        account_id: &str,
        project_id: RecordId,
        recording_id: RecordId,
    ) -> CamperResult<()> {
        let path = paths::trash(account_id, project_id, recording_id);
        self.send_empty(Method::PUT, &path).await
    }

    // ========================================================================
    // SCHEDULE
    // ========================================================================

    pub async fn list_schedule_entries(
        &self,
        account_id: &str,
        project_id: RecordId,
        schedule_id: RecordId,
    ) -> CamperResult<Vec<ScheduleEntryInfo>> {
        let path = paths::schedule_entries(account_id, project_id, schedule_id);
        let entries: Vec<WireScheduleEntry> = self.get_json(&path, &[]).await?;
        Ok(entries.into_iter().map(ScheduleEntryInfo::from).collect())
    }

    // ========================================================================
    // CHECK-INS
    // ========================================================================

    pub async fn list_checkin_questions(
        &self,
        account_id: &str,
        project_id: RecordId,
        questionnaire_id: RecordId,
    ) -> CamperResult<Vec<CheckinQuestionInfo>> {
        let path = paths::questions(account_id, project_id, questionnaire_id);
        let questions: Vec<WireQuestion> = self.get_json(&path, &[]).await?;
        Ok(questions.into_iter().map(CheckinQuestionInfo::from).collect())
    }

    pub async fn list_checkin_answers(
        &self,
        account_id: &str,
        project_id: RecordId,
        question_id: RecordId,
    ) -> CamperResult<Vec<CheckinAnswerInfo>> {
        let path = paths::answers(account_id, project_id, question_id);
        let answers: Vec<WireAnswer> = self.get_json(&path, &[]).await?;
        Ok(answers.into_iter().map(CheckinAnswerInfo::from).collect())
    }

    pub async fn create_checkin_answer(
        &self,
        account_id: &str,
        project_id: RecordId,
        question_id: RecordId,
        content: &str,
    ) -> CamperResult<CheckinAnswerInfo> {
        let path = paths::answers(account_id, project_id, question_id);
        let body = serde_json::json!({ "content": content });
        let response = self
            .client
            .post(self.url(&path))
            .json(&body)
            .send()
            .await
            .map_err(|err| transport_error(&path, err))?;
        let answer: WireAnswer = parse_response(&path, response).await?;
        Ok(answer.into())
    }

    // ========================================================================
    // SEARCH
    // ========================================================================

    /// Search one account. Hits are tagged with the account they came from.
    pub async fn search(&self, account: &AccountInfo, query: &str) -> CamperResult<Vec<SearchResultInfo>> {
        let path = paths::search(&account.id);
        let hits: Vec<WireSearchResult> = self.get_json(&path, &[("q", query)]).await?;
        Ok(hits.into_iter().map(|hit| hit.into_info(account)).collect())
    }

    // ========================================================================
    // PLUMBING
    // ========================================================================

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> CamperResult<T> {
        tracing::debug!(endpoint = %path, "GET");
        let mut request = self.client.get(self.url(path));
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request.send().await.map_err(|err| transport_error(path, err))?;
        parse_response(path, response).await
    }

    async fn send_empty(&self, method: Method, path: &str) -> CamperResult<()> {
        tracing::debug!(endpoint = %path, method = %method, "request");
        let response = self
            .client
            .request(method, self.url(path))
            .send()
            .await
            .map_err(|err| transport_error(path, err))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(path, status.as_u16(), &body).into())
    }
}

async fn parse_response<T: DeserializeOwned>(path: &str, response: reqwest::Response) -> CamperResult<T> {
    let status = response.status();
    let text = response.text().await.map_err(|err| transport_error(path, err))?;
    if !status.is_success() {
        return Err(status_error(path, status.as_u16(), &text).into());
    }
    serde_json::from_str(&text).map_err(|err| {
        RemoteError::Decode {
            endpoint: path.to_string(),
            reason: err.to_string(),
        }
        .into()
    })
}

fn transport_error(path: &str, err: reqwest::Error) -> RemoteError {
    RemoteError::Transport {
        endpoint: path.to_string(),
        reason: err.to_string(),
    }
}

/// Status error with the body trimmed to something a status bar can show.
pub fn status_error(path: &str, status: u16, body: &str) -> RemoteError {
    let body = body.trim();
    let message = match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    };
    RemoteError::Status {
        endpoint: path.to_string(),
        status,
        message,
    }
}

fn build_headers(config: &TuiConfig) -> Result<HeaderMap, ApiClientError> {
    let mut headers = HeaderMap::new();
    let bearer = format!("Bearer {}", config.access_token);
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&bearer).map_err(|e| ApiClientError::Config(e.to_string()))?,
    );
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&config.user_agent).map_err(|e| ApiClientError::Config(e.to_string()))?,
    );
    headers.insert(
        HeaderName::from_static("accept"),
        HeaderValue::from_static("application/json"),
    );
    Ok(headers)
}

/// Endpoint paths, relative to the base URL.
pub mod paths {
    use camper_core::RecordId;

    pub fn todos(account_id: &str, project_id: RecordId, todolist_id: RecordId) -> String {
        format!("/{account_id}/buckets/{project_id}/todolists/{todolist_id}/todos.json")
    }

    pub fn completion(account_id: &str, project_id: RecordId, todo_id: RecordId) -> String {
        format!("/{account_id}/buckets/{project_id}/todos/{todo_id}/completion.json")
    }

    pub fn trash(account_id: &str, project_id: RecordId, recording_id: RecordId) -> String {
        format!("/{account_id}/buckets/{project_id}/recordings/{recording_id}/status/trashed.json")
    }

    pub fn schedule_entries(account_id: &str, project_id: RecordId, schedule_id: RecordId) -> String {
        format!("/{account_id}/buckets/{project_id}/schedules/{schedule_id}/entries.json")
    }

    pub fn questions(account_id: &str, project_id: RecordId, questionnaire_id: RecordId) -> String {
        format!("/{account_id}/buckets/{project_id}/questionnaires/{questionnaire_id}/questions.json")
    }

    pub fn answers(account_id: &str, project_id: RecordId, question_id: RecordId) -> String {
        format!("/{account_id}/buckets/{project_id}/questions/{question_id}/answers.json")
    }

    pub fn search(account_id: &str) -> String {
        format!("/{account_id}/search.json")
    }
}

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
struct WirePerson {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireTodo {
    id: RecordId,
    content: String,
    #[serde(default)]
    description: String,
    completed: bool,
    due_on: Option<String>,
    #[serde(default)]
    assignees: Vec<WirePerson>,
    #[serde(default)]
    position: i32,
}

impl From<WireTodo> for TodoInfo {
    fn from(todo: WireTodo) -> Self {
        Self {
            id: todo.id,
            content: todo.content,
            description: todo.description,
            completed: todo.completed,
            due_on: todo.due_on,
            assignees: todo.assignees.into_iter().map(|p| p.name).collect(),
            position: todo.position,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireScheduleEntry {
    id: RecordId,
    summary: Option<String>,
    title: Option<String>,
    starts_at: Timestamp,
    ends_at: Timestamp,
    #[serde(default)]
    all_day: bool,
    #[serde(default)]
    participants: Vec<WirePerson>,
}

impl From<WireScheduleEntry> for ScheduleEntryInfo {
    fn from(entry: WireScheduleEntry) -> Self {
        let summary = entry
            .summary
            .filter(|s| !s.is_empty())
            .or(entry.title)
            .unwrap_or_default();
        Self {
            id: entry.id,
            summary,
            starts_at: entry.starts_at,
            ends_at: entry.ends_at,
            all_day: entry.all_day,
            participants: entry.participants.into_iter().map(|p| p.name).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireQuestionSchedule {
    frequency: String,
}

#[derive(Debug, Deserialize)]
struct WireQuestion {
    id: RecordId,
    title: String,
    #[serde(default)]
    paused: bool,
    #[serde(default)]
    answers_count: u32,
    schedule: Option<WireQuestionSchedule>,
}

impl From<WireQuestion> for CheckinQuestionInfo {
    fn from(question: WireQuestion) -> Self {
        Self {
            id: question.id,
            title: question.title,
            paused: question.paused,
            answers_count: question.answers_count,
            frequency: question.schedule.map(|s| s.frequency).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireAnswer {
    id: RecordId,
    creator: WirePerson,
    #[serde(default)]
    content: String,
    created_at: Timestamp,
}

impl From<WireAnswer> for CheckinAnswerInfo {
    fn from(answer: WireAnswer) -> Self {
        Self {
            id: answer.id,
            author: answer.creator.name,
            content: answer.content,
            created_at: answer.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireBucket {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireSearchResult {
    id: RecordId,
    title: String,
    #[serde(rename = "type")]
    kind: String,
    bucket: Option<WireBucket>,
    created_at: Timestamp,
}

impl WireSearchResult {
    fn into_info(self, account: &AccountInfo) -> SearchResultInfo {
        SearchResultInfo {
            id: self.id,
            title: self.title,
            kind: self.kind,
            project: self.bucket.map(|b| b.name).unwrap_or_default(),
            account_id: account.id.clone(),
            account_name: account.name.clone(),
            created_at: self.created_at,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(paths::todos("1001", 7, 8), "/1001/buckets/7/todolists/8/todos.json");
        assert_eq!(paths::completion("1001", 7, 42), "/1001/buckets/7/todos/42/completion.json");
        assert_eq!(
            paths::trash("1001", 7, 42),
            "/1001/buckets/7/recordings/42/status/trashed.json"
        );
        assert_eq!(paths::search("1001"), "/1001/search.json");
    }

    #[test]
    fn test_todo_decodes_with_assignee_names() {
        let json = r#"[{"id": 1, "content": "Ship", "completed": false, "due_on": null,
            "assignees": [{"name": "Ana"}, {"name": "Bo"}], "position": 2}]"#;
        let todos: Vec<WireTodo> = serde_json::from_str(json).expect("decodes");
        let todo = TodoInfo::from(todos.into_iter().next().expect("one todo"));
        assert_eq!(todo.assignees, vec!["Ana".to_string(), "Bo".to_string()]);
        assert_eq!(todo.description, "");
    }

    #[test]
    fn test_schedule_entry_falls_back_to_title() {
        let json = r#"{"id": 3, "summary": "", "title": "Offsite",
            "starts_at": "2026-03-01T09:00:00Z", "ends_at": "2026-03-01T17:00:00Z"}"#;
        let entry: WireScheduleEntry = serde_json::from_str(json).expect("decodes");
        assert_eq!(ScheduleEntryInfo::from(entry).summary, "Offsite");
    }

    #[test]
    fn test_search_hit_is_tagged_with_account() {
        let json = r#"{"id": 9, "title": "Kickoff", "type": "Message",
            "bucket": {"name": "Launch"}, "created_at": "2026-01-05T10:00:00Z"}"#;
        let hit: WireSearchResult = serde_json::from_str(json).expect("decodes");
        let info = hit.into_info(&AccountInfo::new("1002", "Globex"));
        assert_eq!(info.account_name, "Globex");
        assert_eq!(info.project, "Launch");
    }

    #[test]
    fn test_status_error_trims_long_bodies() {
        let body = "x".repeat(500);
        match status_error("/todos.json", 502, &body) {
            RemoteError::Status { status, message, .. } => {
                assert_eq!(status, 502);
                assert_eq!(message.len(), MAX_ERROR_BODY + 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
