use crate::adapters::rest_store::RestStore;
use crate::domain::model::{Role, Session};
use crate::domain::ports::{ConfigProvider, Query, RecordStore};
use crate::utils::error::{MigrateError, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInUser {
    pub user_id: String,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: TokenUser,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Password sign-in against the GoTrue endpoint next to the table API.
pub struct AuthClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl AuthClient {
    pub fn new<C: ConfigProvider>(config: &C) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout_seconds() {
            builder = builder.timeout(Duration::from_secs(timeout));
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.store_url().trim_end_matches('/').to_string(),
            api_key: config.api_key().to_string(),
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignedInUser> {
        let url = format!("{}/auth/v1/token", self.base_url);
        tracing::debug!("Signing in {} at {}", email, url);

        let response = self
            .client
            .post(url)
            .query(&[("grant_type", "password")])
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| body.get(*key).and_then(|v| v.as_str()))
                .unwrap_or("invalid credentials")
                .to_string();
            return Err(MigrateError::AuthError { message });
        }

        let token: TokenResponse = response.json().await?;
        Ok(SignedInUser {
            user_id: token.user.id,
            email: token.user.email.unwrap_or_else(|| email.to_string()),
            token: token.access_token,
        })
    }

    /// Signs in, then resolves the role with the user's own token.
    pub async fn login<C: ConfigProvider>(
        &self,
        config: &C,
        email: &str,
        password: &str,
    ) -> Result<Session> {
        let user = self.sign_in(email, password).await?;
        let store = RestStore::new(config)?.with_session(&Session {
            user_id: user.user_id.clone(),
            email: user.email.clone(),
            role: Role::Student,
            display_name: String::new(),
            token: user.token.clone(),
        });
        resolve_session(&store, user).await
    }
}

#[derive(Debug, Deserialize)]
struct NamedRow {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    lastname: Option<String>,
}

async fn lookup<S: RecordStore>(
    store: &S,
    table: &str,
    columns: &str,
    email: &str,
) -> Result<Option<NamedRow>> {
    let rows = store
        .select(&Query::table(table).select(columns).ilike("email", email))
        .await?;
    match rows.into_iter().next() {
        Some(row) => Ok(Some(serde_json::from_value(row)?)),
        None => Ok(None),
    }
}

/// A table the token may not read counts as no match.
async fn first_named_row<S: RecordStore>(
    store: &S,
    table: &str,
    columns: &str,
    email: &str,
) -> Option<NamedRow> {
    match lookup(store, table, columns, email).await {
        Ok(row) => row,
        Err(e) => {
            tracing::warn!("Role lookup in '{}' failed for {}: {}", table, email, e);
            None
        }
    }
}

/// Looks the user up in `admins`, then `professors`, then `students`; the
/// first table with a matching email decides the role.
pub async fn resolve_session<S: RecordStore>(store: &S, user: SignedInUser) -> Result<Session> {
    let email = user.email.as_str();

    let (role, display_name) =
        if let Some(admin) = first_named_row(store, "admins", "name", email).await {
            (
                Role::Admin,
                admin.name.unwrap_or_else(|| "Administrador".to_string()),
            )
        } else if let Some(professor) =
            first_named_row(store, "professors", "name", email).await
        {
            (Role::Professor, professor.name.unwrap_or_default())
        } else if let Some(student) =
            first_named_row(store, "students", "name,lastname", email).await
        {
            let full_name = [student.name.as_deref(), student.lastname.as_deref()]
                .into_iter()
                .flatten()
                .filter(|part| !part.trim().is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            let display = if full_name.is_empty() {
                "Estudiante".to_string()
            } else {
                full_name
            };
            (Role::Student, display)
        } else {
            return Err(MigrateError::AuthError {
                message: format!("{} was not found in admins, professors or students", email),
            });
        };

    tracing::info!("Signed in as {} ({})", display_name, role);
    Ok(Session {
        user_id: user.user_id,
        email: user.email,
        role,
        display_name,
        token: user.token,
    })
}
