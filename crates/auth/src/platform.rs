// SPDX-License-Identifier: MIT

//! Authenticated client for the platform's account/project/environment
//! listing endpoints.
//!
//! All list endpoints paginate with offset/limit; a page shorter than the
//! page size ends the scan.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

const PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub id: u64,
    pub name: String,
    pub locked: bool,
    pub state: i64,
    #[serde(default)]
    pub static_subdomain: Option<String>,
    #[serde(default)]
    pub vanity_subdomain: Option<String>,
}

impl Account {
    /// Tenant routing label: static subdomain wins over vanity subdomain.
    pub fn host_prefix(&self) -> Option<&str> {
        self.static_subdomain.as_deref().or(self.vanity_subdomain.as_deref())
    }

    /// Active and not locked.
    pub fn is_usable(&self) -> bool {
        self.state == 1 && !self.locked
    }
}

/// Wire shape of a project entry; `account_name` is attached client-side.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectResponse {
    pub id: u64,
    pub name: String,
    pub account_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
    pub account_id: u64,
    pub account_name: String,
}

/// Wire shape of an environment entry. `deployment_type` may be absent for
/// environments that were never classified.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentResponse {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub deployment_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    data: Vec<T>,
}

/// HTTP client for the platform's v3 API, bearing one access token.
pub struct PlatformClient {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl PlatformClient {
    pub fn new(platform_url: &str, token: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { base_url: platform_url.trim_end_matches('/').to_owned(), token, client }
    }

    async fn get_page<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<Vec<T>, AuthError> {
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, path_and_query))
            .header("Accept", "application/json")
            .bearer_auth(&self.token)
            .send()
            .await?;
        let page: Page<T> = resp.error_for_status()?.json().await?;
        Ok(page.data)
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>, AuthError> {
        self.get_page("/api/v3/accounts/").await
    }

    /// Fetch all projects for an account, following pagination.
    pub async fn list_projects(&self, account: &Account) -> Result<Vec<Project>, AuthError> {
        let mut offset = 0;
        let mut projects = Vec::new();
        loop {
            let page: Vec<ProjectResponse> = self
                .get_page(&format!(
                    "/api/v3/accounts/{}/projects/?state=1&offset={offset}&limit={PAGE_SIZE}",
                    account.id
                ))
                .await?;
            let page_len = page.len();
            projects.extend(page.into_iter().map(|p| Project {
                id: p.id,
                name: p.name,
                account_id: p.account_id,
                account_name: account.name.clone(),
            }));
            if page_len < PAGE_SIZE {
                break;
            }
            offset += PAGE_SIZE;
        }
        Ok(projects)
    }

    /// Fetch all environments for a project, following pagination.
    pub async fn list_environments(
        &self,
        account_id: u64,
        project_id: u64,
    ) -> Result<Vec<EnvironmentResponse>, AuthError> {
        let mut offset = 0;
        let mut environments: Vec<EnvironmentResponse> = Vec::new();
        loop {
            let page: Vec<EnvironmentResponse> = self
                .get_page(&format!(
                    "/api/v3/accounts/{account_id}/projects/{project_id}/environments/?state=1&offset={offset}&limit={PAGE_SIZE}"
                ))
                .await?;
            let page_len = page.len();
            environments.extend(page);
            if page_len < PAGE_SIZE {
                break;
            }
            offset += PAGE_SIZE;
        }
        Ok(environments)
    }

    /// Projects across every usable account.
    pub async fn list_all_projects(&self) -> Result<Vec<Project>, AuthError> {
        let accounts = self.list_accounts().await?;
        let mut projects = Vec::new();
        for account in accounts.iter().filter(|a| a.is_usable()) {
            projects.extend(self.list_projects(account).await?);
        }
        Ok(projects)
    }
}
