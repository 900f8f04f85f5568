//! Remote workouts - fetch a client's sessions from the coaching backend,
//! falling back to the local cache when the backend can't be reached

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::Database;
use crate::workout::WorkoutSession;

#[derive(Debug, Deserialize)]
struct WorkoutsResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    workouts: Vec<WorkoutSession>,
    #[serde(default)]
    message: Option<String>,
}

/// Where a batch of sessions came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Remote,
    Cache,
    /// Backend failed and nothing was cached
    Empty,
}

#[derive(Debug, Clone)]
pub struct LoadedSessions {
    pub sessions: Vec<WorkoutSession>,
    pub source: Source,
}

pub struct RemoteClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl RemoteClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: Client::new(),
            base_url: config.api_base().to_string(),
            token: config.token.clone(),
        }
    }

    /// Client ids land in a single path segment, percent-encoded
    fn sessions_url(&self, client_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).with_context(|| format!("invalid API url {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("API url {} cannot take a path", self.base_url))?
            .pop_if_empty()
            .extend(["api", "workouts", "by-user", client_id]);
        Ok(url)
    }

    /// `GET /api/workouts/by-user/{client}?limit=..&startDate=..`
    pub async fn fetch_sessions(&self, client_id: &str, limit: u32, since: DateTime<Utc>) -> Result<Vec<WorkoutSession>> {
        let url = self.sessions_url(client_id)?;
        let start_date = since.to_rfc3339_opts(SecondsFormat::Millis, true);

        let mut request = self
            .http
            .get(url.clone())
            .query(&[("limit", limit.to_string()), ("startDate", start_date)]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.with_context(|| format!("requesting {url}"))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(200).collect();
            bail!("backend returned {status}: {excerpt}");
        }

        let payload: WorkoutsResponse = response.json().await.context("decoding workouts response")?;
        if !payload.success {
            bail!(
                "backend reported failure: {}",
                payload.message.as_deref().unwrap_or("no message")
            );
        }

        info!(client_id, count = payload.workouts.len(), "fetched sessions");
        Ok(payload.workouts)
    }

    /// Fetch and refresh the cache; on any error use whatever is cached
    pub async fn load_sessions(
        &self,
        db: &Database,
        client_id: &str,
        limit: u32,
        since: DateTime<Utc>,
    ) -> Result<LoadedSessions> {
        match self.fetch_sessions(client_id, limit, since).await {
            Ok(sessions) => {
                db.cache_sessions(client_id, &sessions)?;
                Ok(LoadedSessions { sessions, source: Source::Remote })
            }
            Err(e) => {
                warn!(client_id, error = %e, "fetch failed, using cached sessions");
                Ok(match db.cached_sessions(client_id)? {
                    Some(sessions) => LoadedSessions { sessions, source: Source::Cache },
                    None => LoadedSessions { sessions: Vec::new(), source: Source::Empty },
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mockito::Matcher;

    const BODY: &str = r#"{
        "success": true,
        "workouts": [{
            "date": "2025-04-01T18:00:00.000Z",
            "week": 1,
            "exercises": [{"exerciseName": "Bench", "muscleGroup": "CHEST",
                           "sets": [{"actualReps": 10, "weight": 50}]}]
        }]
    }"#;

    fn client_for(url: String) -> RemoteClient {
        RemoteClient::new(&Config {
            api_url: url,
            token: Some("secret".to_string()),
            ..Default::default()
        })
    }

    fn since() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_and_cache() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/workouts/by-user/c1")
            .match_header("authorization", "Bearer secret")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("limit".into(), "200".into()),
                Matcher::UrlEncoded("startDate".into(), "2025-01-01T00:00:00.000Z".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(BODY)
            .create_async()
            .await;

        let db = Database::open(":memory:").unwrap();
        let loaded = client_for(server.url()).load_sessions(&db, "c1", 200, since()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(loaded.source, Source::Remote);
        assert_eq!(loaded.sessions[0].volume(), 500.0);
        assert_eq!(db.cached_sessions("c1").unwrap().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_cache() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let db = Database::open(":memory:").unwrap();
        let client = client_for(server.url());

        let empty = client.load_sessions(&db, "c1", 50, since()).await.unwrap();
        assert_eq!(empty.source, Source::Empty);
        assert!(empty.sessions.is_empty());

        let cached: Vec<WorkoutSession> = serde_json::from_str::<WorkoutsResponse>(BODY).unwrap().workouts;
        db.cache_sessions("c1", &cached).unwrap();
        let loaded = client.load_sessions(&db, "c1", 50, since()).await.unwrap();
        assert_eq!(loaded.source, Source::Cache);
        assert_eq!(loaded.sessions, cached);
    }

    #[tokio::test]
    async fn test_client_id_is_one_encoded_segment() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/workouts/by-user/coach%207%2Fa")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(BODY)
            .create_async()
            .await;

        let sessions = client_for(server.url()).fetch_sessions("coach 7/a", 10, since()).await.unwrap();
        mock.assert_async().await;
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn test_sessions_url_keeps_base_path() {
        let client = client_for("https://api.example.com/v2/".to_string());
        let url = client.sessions_url("c1").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v2/api/workouts/by-user/c1");
    }

    #[tokio::test]
    async fn test_unsuccessful_payload_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Any)
            .with_status(200)
            .with_body(r#"{"success": false, "message": "no such client"}"#)
            .create_async()
            .await;

        let err = client_for(server.url()).fetch_sessions("c1", 10, since()).await.unwrap_err();
        assert!(err.to_string().contains("no such client"));
    }
}
