/// Environment variable holding the connection URL.
pub const DATABASE_URL_ENV: &str = "MUSCLEDEN_DATABASE_URL";

/// Database configuration.
///
/// The CLI resolves the URL from its flag, `MUSCLEDEN_DATABASE_URL`, the
/// config file, then [`DbConfig::DEFAULT_URL`].
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full PostgreSQL connection URL, possibly with query parameters
    /// such as `?sslmode=require` for managed instances.
    pub database_url: String,
}

impl DbConfig {
    /// The default connection URL used when no environment variable is set.
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/muscleden";

    /// Build a config from an explicit URL (useful for tests and CLI flags).
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// Split the URL into `(everything up to the database name, query)`.
    fn split_query(&self) -> (&str, Option<&str>) {
        match self.database_url.split_once('?') {
            Some((base, query)) => (base, Some(query)),
            None => (self.database_url.as_str(), None),
        }
    }

    /// Extract the database name from the URL.
    ///
    /// Returns `None` if the URL has no path component.
    pub fn database_name(&self) -> Option<&str> {
        let (base, _) = self.split_query();
        let (prefix, name) = base.rsplit_once('/')?;
        if prefix.ends_with('/') || name.is_empty() {
            // `postgresql://host` splits at the scheme's double slash.
            return None;
        }
        Some(name)
    }

    /// Return a URL pointing at the `postgres` maintenance database on the
    /// same host, keeping any query parameters. Used to issue
    /// `CREATE DATABASE` when the target DB does not yet exist.
    pub fn maintenance_url(&self) -> String {
        let (base, query) = self.split_query();
        let mut url = match (self.database_name(), base.rfind('/')) {
            (Some(_), Some(pos)) => format!("{}/postgres", &base[..pos]),
            _ => format!("{}/postgres", base.trim_end_matches('/')),
        };
        if let Some(q) = query {
            url.push('?');
            url.push_str(q);
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_url() {
        let cfg = DbConfig::new(DbConfig::DEFAULT_URL);
        assert_eq!(cfg.database_url, "postgresql://localhost:5432/muscleden");
        assert_eq!(cfg.database_name(), Some("muscleden"));
    }

    #[test]
    fn database_name_ignores_query() {
        let cfg = DbConfig::new("postgresql://u:p@db.example.com:5432/plans?sslmode=require");
        assert_eq!(cfg.database_name(), Some("plans"));
    }

    #[test]
    fn database_name_missing() {
        assert_eq!(DbConfig::new("postgresql://localhost:5432").database_name(), None);
        assert_eq!(DbConfig::new("postgresql://localhost:5432/").database_name(), None);
    }

    #[test]
    fn maintenance_url_replaces_db() {
        let cfg = DbConfig::new("postgresql://localhost:5432/muscleden");
        assert_eq!(cfg.maintenance_url(), "postgresql://localhost:5432/postgres");
    }

    #[test]
    fn maintenance_url_keeps_query() {
        let cfg = DbConfig::new("postgresql://db.example.com/plans?sslmode=require");
        assert_eq!(
            cfg.maintenance_url(),
            "postgresql://db.example.com/postgres?sslmode=require"
        );
    }

    #[test]
    fn maintenance_url_without_db_name_appends() {
        let cfg = DbConfig::new("postgresql://localhost:5432");
        assert_eq!(cfg.maintenance_url(), "postgresql://localhost:5432/postgres");
    }
}
