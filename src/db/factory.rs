//! Repository factory for dependency injection.

use std::str::FromStr;
use std::sync::Arc;

#[cfg(feature = "local-repo")]
use super::repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
use super::repositories::{PostgresConfig, PostgresRepository};
use super::repository::{FullRepository, RepositoryError, RepositoryResult};

/// Repository backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryType {
    /// Postgres + Diesel implementation
    Postgres,
    /// In-memory local repository
    Local,
}

impl FromStr for RepositoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "local" => Ok(Self::Local),
            _ => Err(format!("Unknown repository type: {s}")),
        }
    }
}

impl RepositoryType {
    /// Read the backend selection from `REPOSITORY_TYPE`, defaulting to
    /// Postgres when a database URL is present and Local otherwise.
    pub fn from_env() -> Self {
        if let Ok(val) = std::env::var("REPOSITORY_TYPE") {
            return val.parse().unwrap_or(Self::Local);
        }

        if std::env::var("DATABASE_URL").is_ok() || std::env::var("PG_DATABASE_URL").is_ok() {
            Self::Postgres
        } else {
            Self::Local
        }
    }
}

/// Factory creating configured repository instances.
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create a repository based on the selected backend type.
    pub async fn create(repo_type: RepositoryType) -> RepositoryResult<Arc<dyn FullRepository>> {
        match repo_type {
            RepositoryType::Postgres => {
                #[cfg(feature = "postgres-repo")]
                {
                    let config = PostgresConfig::from_env()
                        .map_err(RepositoryError::configuration)?;
                    let repo = PostgresRepository::new(config)?;
                    Ok(Arc::new(repo) as Arc<dyn FullRepository>)
                }
                #[cfg(not(feature = "postgres-repo"))]
                {
                    Err(RepositoryError::configuration(
                        "Postgres repository feature not enabled",
                    ))
                }
            }
            RepositoryType::Local => {
                #[cfg(feature = "local-repo")]
                {
                    Ok(Self::create_local())
                }
                #[cfg(not(feature = "local-repo"))]
                {
                    Err(RepositoryError::configuration(
                        "Local repository feature not enabled",
                    ))
                }
            }
        }
    }

    /// Create an in-memory local repository.
    #[cfg(feature = "local-repo")]
    pub fn create_local() -> Arc<dyn FullRepository> {
        Arc::new(LocalRepository::new())
    }

    /// Create a repository from environment configuration.
    pub async fn from_env() -> RepositoryResult<Arc<dyn FullRepository>> {
        Self::create(RepositoryType::from_env()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_type_from_str() {
        assert_eq!(
            RepositoryType::from_str("local").unwrap(),
            RepositoryType::Local
        );
        assert_eq!(
            RepositoryType::from_str("postgres").unwrap(),
            RepositoryType::Postgres
        );
        assert_eq!(RepositoryType::from_str("Pg").unwrap(), RepositoryType::Postgres);
        assert!(RepositoryType::from_str("invalid").is_err());
    }

    #[cfg(feature = "local-repo")]
    #[tokio::test]
    async fn create_local_repository_and_round_trip_tx() {
        use crate::db::TransactionManager;

        let repo = RepositoryFactory::create(RepositoryType::Local).await.unwrap();
        let tx = repo.begin().await.unwrap();
        repo.commit(tx).await.unwrap();
    }
}
