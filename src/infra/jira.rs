use async_trait::async_trait;
use base64::prelude::{BASE64_STANDARD, Engine as _};
use chrono::NaiveDate;
use reqwest::{
    Client, Method, RequestBuilder, Response,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::JiraSettings;
use crate::domain::ticket::{Ticket, TicketFields, TicketMatch, TrackerVersion};
use crate::error::{AppError, AppResult};
use crate::services::{IssueTrackerService, LinkKind};

const SEARCH_PAGE_SIZE: u32 = 100;

pub struct JiraClient {
    http: Client,
    domain: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

impl JiraClient {
    pub fn new(settings: &JiraSettings) -> Self {
        Self {
            http: Client::new(),
            domain: settings.domain.clone(),
            username: settings.username.clone(),
            password: settings.password.clone(),
        }
    }

    fn api_details(&self) -> AppResult<(&str, &str, &str)> {
        let domain = self
            .domain
            .as_deref()
            .ok_or_else(|| AppError::Configuration("Jira domain not configured".to_string()))?;
        let username = self
            .username
            .as_deref()
            .ok_or_else(|| AppError::Configuration("Jira username not configured".to_string()))?;
        let password = self
            .password
            .as_deref()
            .ok_or_else(|| AppError::Configuration("Jira password not configured".to_string()))?;
        Ok((domain, username, password))
    }

    fn auth_header(username: &str, password: &str) -> String {
        let credentials = format!("{username}:{password}");
        let encoded = BASE64_STANDARD.encode(credentials);
        format!("Basic {encoded}")
    }

    /// Bare host of the configured domain, whatever scheme it was written with.
    fn host(domain: &str) -> &str {
        domain
            .trim()
            .trim_end_matches('/')
            .trim_start_matches("https://")
            .trim_start_matches("http://")
    }

    fn api_url(domain: &str, path: &str) -> String {
        format!("https://{}/rest/api/2/{path}", Self::host(domain))
    }

    fn browse_url(domain: &str, key: &str) -> String {
        format!("https://{}/browse/{key}", Self::host(domain))
    }

    fn request(&self, method: Method, path: &str) -> AppResult<RequestBuilder> {
        let (domain, username, password) = self.api_details()?;
        Ok(self
            .http
            .request(method, Self::api_url(domain, path))
            .header(AUTHORIZATION, Self::auth_header(username, password))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json"))
    }

    async fn send(request: RequestBuilder, what: &str) -> AppResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|err| AppError::IssueTracker(format!("failed to call Jira ({what}): {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read response>".to_string());
            return Err(AppError::IssueTracker(format!(
                "Jira responded to {what} with {status}: {body}"
            )));
        }
        Ok(response)
    }

    async fn parse<T: for<'de> Deserialize<'de>>(response: Response, what: &str) -> AppResult<T> {
        response.json().await.map_err(|err| {
            AppError::IssueTracker(format!("failed to parse Jira response ({what}): {err}"))
        })
    }
}

#[async_trait]
impl IssueTrackerService for JiraClient {
    async fn create_ticket(&self, fields: &TicketFields) -> AppResult<Ticket> {
        if fields.project.trim().is_empty() {
            return Err(AppError::IssueTracker(
                "project key must not be empty".to_string(),
            ));
        }

        let body = JiraCreateIssueRequest::new(fields);
        let request = self.request(Method::POST, "issue")?.json(&body);
        let response = Self::send(request, "create issue").await?;
        let payload: JiraCreateIssueResponse = Self::parse(response, "create issue").await?;

        let (domain, _, _) = self.api_details()?;
        let url = Self::browse_url(domain, &payload.key);
        debug!(key = %payload.key, id = %payload.id, "issue created");

        Ok(Ticket {
            key: payload.key,
            url: Some(url),
        })
    }

    async fn create_link(&self, kind: LinkKind, from: &str, to: &str) -> AppResult<()> {
        let body = JiraIssueLinkRequest {
            link_type: JiraName {
                name: link_type_name(kind).to_string(),
            },
            inward_issue: JiraKey {
                key: from.to_string(),
            },
            outward_issue: JiraKey {
                key: to.to_string(),
            },
        };
        let request = self.request(Method::POST, "issueLink")?.json(&body);
        Self::send(request, "create issue link").await?;
        Ok(())
    }

    async fn assign(&self, key: &str, assignee: &str) -> AppResult<()> {
        let body = JiraName {
            name: assignee.to_string(),
        };
        let request = self
            .request(Method::PUT, &format!("issue/{key}/assignee"))?
            .json(&body);
        Self::send(request, "assign issue").await?;
        Ok(())
    }

    async fn add_watcher(&self, key: &str, watcher: &str) -> AppResult<()> {
        let request = self
            .request(Method::POST, &format!("issue/{key}/watchers"))?
            .json(&watcher);
        Self::send(request, "add watcher").await?;
        Ok(())
    }

    async fn remove_watcher(&self, key: &str, watcher: &str) -> AppResult<()> {
        let request = self
            .request(Method::DELETE, &format!("issue/{key}/watchers"))?
            .query(&[("username", watcher)]);
        Self::send(request, "remove watcher").await?;
        Ok(())
    }

    async fn fetch_summary(&self, key: &str) -> AppResult<String> {
        let request = self
            .request(Method::GET, &format!("issue/{key}"))?
            .query(&[("fields", "summary")]);
        let response = Self::send(request, "get issue").await?;
        let issue: JiraIssue = Self::parse(response, "get issue").await?;
        Ok(issue.fields.summary)
    }

    async fn search(&self, query: &str) -> AppResult<Vec<TicketMatch>> {
        let page_size = SEARCH_PAGE_SIZE.to_string();
        let request = self.request(Method::GET, "search")?.query(&[
            ("jql", query),
            ("fields", "summary"),
            ("maxResults", page_size.as_str()),
        ]);
        let response = Self::send(request, "search").await?;
        let result: JiraSearchResponse = Self::parse(response, "search").await?;

        Ok(result
            .issues
            .into_iter()
            .map(|issue| TicketMatch {
                key: issue.key,
                summary: issue.fields.summary,
            })
            .collect())
    }

    async fn delete_ticket(&self, key: &str) -> AppResult<()> {
        let request = self.request(Method::DELETE, &format!("issue/{key}"))?;
        Self::send(request, "delete issue").await?;
        Ok(())
    }

    async fn list_versions(&self, project: &str) -> AppResult<Vec<TrackerVersion>> {
        let request = self.request(Method::GET, &format!("project/{project}/versions"))?;
        let response = Self::send(request, "list versions").await?;
        let versions: Vec<JiraVersion> = Self::parse(response, "list versions").await?;

        versions
            .into_iter()
            .map(|version| {
                let release_date = version
                    .release_date
                    .as_deref()
                    .map(|date| {
                        NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|err| {
                            AppError::IssueTracker(format!(
                                "invalid release date '{date}' on version '{}': {err}",
                                version.name
                            ))
                        })
                    })
                    .transpose()?;
                Ok(TrackerVersion {
                    name: version.name,
                    release_date,
                })
            })
            .collect()
    }
}

fn link_type_name(kind: LinkKind) -> &'static str {
    match kind {
        LinkKind::RelatesTo => "Relates",
    }
}

#[derive(Serialize)]
struct JiraCreateIssueRequest {
    fields: JiraCreateIssueFields,
}

impl JiraCreateIssueRequest {
    fn new(fields: &TicketFields) -> Self {
        Self {
            fields: JiraCreateIssueFields {
                project: JiraKey {
                    key: fields.project.clone(),
                },
                components: vec![JiraId {
                    id: fields.component.clone(),
                }],
                summary: fields.summary.clone(),
                description: fields.description.clone(),
                issuetype: JiraName {
                    name: fields.issue_type.clone(),
                },
                fix_versions: vec![JiraName {
                    name: fields.fix_version.clone(),
                }],
                duedate: fields
                    .due_date
                    .map(|date| date.format("%Y-%m-%d").to_string()),
                reporter: fields.reporter.clone().map(|name| JiraName { name }),
            },
        }
    }
}

#[derive(Serialize)]
struct JiraCreateIssueFields {
    project: JiraKey,
    components: Vec<JiraId>,
    summary: String,
    description: String,
    issuetype: JiraName,
    #[serde(rename = "fixVersions")]
    fix_versions: Vec<JiraName>,
    duedate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reporter: Option<JiraName>,
}

#[derive(Serialize)]
struct JiraIssueLinkRequest {
    #[serde(rename = "type")]
    link_type: JiraName,
    #[serde(rename = "inwardIssue")]
    inward_issue: JiraKey,
    #[serde(rename = "outwardIssue")]
    outward_issue: JiraKey,
}

#[derive(Serialize)]
struct JiraKey {
    key: String,
}

#[derive(Serialize)]
struct JiraId {
    id: String,
}

#[derive(Serialize)]
struct JiraName {
    name: String,
}

#[derive(Deserialize)]
struct JiraCreateIssueResponse {
    id: String,
    key: String,
}

#[derive(Deserialize)]
struct JiraIssue {
    key: String,
    fields: JiraIssueFields,
}

#[derive(Deserialize)]
struct JiraIssueFields {
    #[serde(default)]
    summary: String,
}

#[derive(Deserialize)]
struct JiraSearchResponse {
    #[serde(default)]
    issues: Vec<JiraIssue>,
}

#[derive(Deserialize)]
struct JiraVersion {
    name: String,
    #[serde(rename = "releaseDate")]
    release_date: Option<String>,
}
