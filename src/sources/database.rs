//! Database sources dumped through the vendor client tools

use super::{Extraction, Source, SourceEnv, SourceError, SourceName};
use crate::config::SourceConfig;
use crate::utils::template::TemplateError;
use crate::utils::{CommandExecutor, Invocation};
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Connection details parsed from a database URL
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseUrl {
    pub scheme: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: String,
}

impl DatabaseUrl {
    /// Parse `scheme://[user[:password]@]host[:port]/database`
    ///
    /// The database may be empty here; sources reject that at construction.
    pub fn parse(raw: &str) -> Result<Self, SourceError> {
        let invalid = |reason: String| SourceError::InvalidUrl {
            url: redact(raw),
            reason,
        };

        let parsed = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;

        let user = match parsed.username() {
            "" => None,
            name => Some(
                urlencoding::decode(name)
                    .map_err(|e| invalid(format!("user is not valid UTF-8: {}", e)))?
                    .into_owned(),
            ),
        };
        let password = parsed
            .password()
            .map(|p| {
                urlencoding::decode(p)
                    .map(|p| p.into_owned())
                    .map_err(|e| invalid(format!("password is not valid UTF-8: {}", e)))
            })
            .transpose()?;

        Ok(Self {
            scheme: parsed.scheme().to_string(),
            host: parsed.host_str().filter(|h| !h.is_empty()).map(str::to_string),
            port: parsed.port(),
            user,
            password,
            database: parsed.path().trim_matches('/').to_string(),
        })
    }

    /// `scheme://host/database`, without credentials or port
    pub fn describe(&self) -> String {
        format!(
            "{}://{}/{}",
            self.scheme,
            self.host.as_deref().unwrap_or(""),
            self.database
        )
    }
}

impl fmt::Debug for DatabaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseUrl")
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .finish()
    }
}

/// Strip the password from a URL for error messages
fn redact(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            let _ = url.set_password(Some("***"));
            url.to_string()
        }
        Ok(_) => raw.to_string(),
        // Unparseable: keep only what precedes the credentials
        Err(_) => match raw.rsplit_once('@') {
            Some((_, rest)) => format!("***@{}", rest),
            None => raw.to_string(),
        },
    }
}

/// State shared by the dump-based sources
struct DumpSource {
    url: DatabaseUrl,
    name: SourceName,
    executor: Arc<dyn CommandExecutor>,
    timeout: Option<Duration>,
}

impl DumpSource {
    fn new(config: &SourceConfig, url: DatabaseUrl, env: &SourceEnv) -> Result<Self, SourceError> {
        if url.database.is_empty() {
            return Err(SourceError::MissingDatabaseName(url.describe()));
        }
        Ok(Self {
            name: SourceName::new(config, env.clock.clone())?,
            url,
            executor: env.executor.clone(),
            timeout: env.timeout,
        })
    }

    async fn dump(&self, invocation: Invocation) -> Result<Extraction, SourceError> {
        info!("Dumping {}", self.url.describe());
        self.executor
            .run_command(&invocation, self.timeout)
            .await
            .map_err(|e| SourceError::ExtractionFailed {
                target: self.url.describe(),
                reason: format!("{:#}", e),
            })?;
        debug!("{} finished for {}", invocation.program, self.url.describe());
        Ok(Extraction::Data { files: 1 })
    }
}

impl fmt::Debug for DumpSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DumpSource")
            .field("url", &self.url)
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// PostgreSQL database dumped with `pg_dump`
#[derive(Debug)]
pub struct PostgresSource {
    inner: DumpSource,
}

impl PostgresSource {
    pub fn new(config: &SourceConfig, url: DatabaseUrl, env: &SourceEnv) -> Result<Self, SourceError> {
        Ok(Self {
            inner: DumpSource::new(config, url, env)?,
        })
    }

    pub fn url(&self) -> &DatabaseUrl {
        &self.inner.url
    }

    /// The `pg_dump` call writing to `dump_file`
    pub fn invocation(&self, dump_file: &Path) -> Invocation {
        let url = &self.inner.url;
        let mut invocation =
            Invocation::new("pg_dump").arg(format!("--file={}", dump_file.display()));
        if let Some(port) = url.port {
            invocation = invocation.arg(format!("--port={}", port));
        }
        if let Some(host) = &url.host {
            invocation = invocation.arg(format!("--host={}", host));
        }
        if let Some(user) = &url.user {
            invocation = invocation.arg(format!("--username={}", user));
        }
        if let Some(password) = &url.password {
            invocation = invocation.env("PGPASSWORD", password);
        }
        invocation.arg(&url.database)
    }
}

#[async_trait]
impl Source for PostgresSource {
    fn base_name(&self) -> Result<String, TemplateError> {
        self.inner.name.render()
    }

    async fn copy_data(
        &self,
        staging_dir: &Path,
        base_name: &str,
    ) -> Result<Extraction, SourceError> {
        let invocation = self.invocation(&staging_dir.join(base_name));
        self.inner.dump(invocation).await
    }

    fn describe(&self) -> String {
        self.inner.url.describe()
    }
}

/// MySQL database dumped with `mysqldump`
#[derive(Debug)]
pub struct MySqlSource {
    inner: DumpSource,
}

impl MySqlSource {
    pub fn new(config: &SourceConfig, url: DatabaseUrl, env: &SourceEnv) -> Result<Self, SourceError> {
        Ok(Self {
            inner: DumpSource::new(config, url, env)?,
        })
    }

    pub fn url(&self) -> &DatabaseUrl {
        &self.inner.url
    }

    /// The `mysqldump` call writing to `dump_file`
    pub fn invocation(&self, dump_file: &Path) -> Invocation {
        let url = &self.inner.url;
        let mut invocation =
            Invocation::new("mysqldump").arg(format!("--result-file={}", dump_file.display()));
        if let Some(port) = url.port {
            invocation = invocation.arg(format!("--port={}", port));
        }
        if let Some(host) = &url.host {
            invocation = invocation.arg(format!("--host={}", host));
        }
        if let Some(user) = &url.user {
            invocation = invocation.arg(format!("--user={}", user));
        }
        if let Some(password) = &url.password {
            invocation = invocation.env("MYSQL_PWD", password);
        }
        invocation.arg(&url.database)
    }
}

#[async_trait]
impl Source for MySqlSource {
    fn base_name(&self) -> Result<String, TemplateError> {
        self.inner.name.render()
    }

    async fn copy_data(
        &self,
        staging_dir: &Path,
        base_name: &str,
    ) -> Result<Extraction, SourceError> {
        let invocation = self.invocation(&staging_dir.join(base_name));
        self.inner.dump(invocation).await
    }

    fn describe(&self) -> String {
        self.inner.url.describe()
    }
}
