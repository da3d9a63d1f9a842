//! PostgreSQL integration tests using testcontainers.
//!
//! These tests exercise `PgDownloadRepository` against a real server.
//! They require Docker to be running. Set SKIP_POSTGRES_TESTS=1 to skip.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use downloads::PgDownloadRepository;
use downloads::application::{CounterConfig, RecordDownloadUseCase, RecordOutcome};
use downloads::domain::repository::{DownloadCounterRepository, TrackerRepository};
use downloads::models::{DownloadNotification, DownloadTracker, IpHash, Slug};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;

/// Catalog tables are owned by another schema; tests create a minimal copy
const CATALOG_SCHEMA: &str = r#"
CREATE TABLE mods (
    id   BIGSERIAL PRIMARY KEY,
    slug TEXT NOT NULL UNIQUE
);

CREATE TABLE mod_versions (
    id             BIGSERIAL PRIMARY KEY,
    mod_id         BIGINT NOT NULL REFERENCES mods (id),
    slug           TEXT   NOT NULL,
    download_count BIGINT NOT NULL DEFAULT 0,
    UNIQUE (mod_id, slug)
);

CREATE TABLE launcher_versions (
    id             BIGSERIAL PRIMARY KEY,
    slug           TEXT   NOT NULL UNIQUE,
    download_count BIGINT NOT NULL DEFAULT 0
);

INSERT INTO mods (slug) VALUES ('super-mod');
INSERT INTO mod_versions (mod_id, slug)
    SELECT id, '1.2.0' FROM mods WHERE slug = 'super-mod';
INSERT INTO launcher_versions (slug) VALUES ('3.4.5');
"#;

const PATH: &str = "mods/super-mod/1.2.0/file.zip";

struct PostgresTestStore {
    repo: PgDownloadRepository,
    pool: PgPool,
    _container: ContainerAsync<Postgres>,
}

impl PostgresTestStore {
    async fn expiry(&self, path: &str, ip_hash: &IpHash) -> Option<DateTime<Utc>> {
        sqlx::query_scalar(
            "SELECT expires_at FROM download_trackers WHERE path = $1 AND ip_hash = $2",
        )
        .bind(path)
        .bind(ip_hash.as_str())
        .fetch_optional(&self.pool)
        .await
        .unwrap()
    }

    async fn tracker_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM download_trackers")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    async fn mod_version_downloads(&self, mod_slug: &str, version_slug: &str) -> i64 {
        sqlx::query_scalar(
            r#"
            SELECT v.download_count
            FROM mod_versions AS v
            JOIN mods AS m ON m.id = v.mod_id
            WHERE m.slug = $1 AND v.slug = $2
            "#,
        )
        .bind(mod_slug)
        .bind(version_slug)
        .fetch_one(&self.pool)
        .await
        .unwrap()
    }

    async fn launcher_version_downloads(&self, version_slug: &str) -> i64 {
        sqlx::query_scalar("SELECT download_count FROM launcher_versions WHERE slug = $1")
            .bind(version_slug)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

/// Start a PostgreSQL container, skipping if Docker is unavailable
/// or SKIP_POSTGRES_TESTS is set.
///
/// Only container-start failures cause a skip. Migration or connection
/// errors still panic so real regressions are not silently swallowed.
async fn postgres_or_skip() -> Option<PostgresTestStore> {
    if std::env::var("SKIP_POSTGRES_TESTS").is_ok() {
        return None;
    }

    let container = match Postgres::default().with_tag("15-alpine").start().await {
        Ok(container) => container,
        Err(err) => {
            eprintln!("Skipping PostgreSQL test (Docker unavailable): {err}");
            return None;
        }
    };

    let host = container.get_host().await.expect("Failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get port");

    // Default credentials from testcontainers-modules postgres
    let url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&url)
        .await
        .expect("Failed to connect to PostgreSQL");

    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    sqlx::raw_sql(CATALOG_SCHEMA)
        .execute(&pool)
        .await
        .expect("Failed to create catalog tables");

    Some(PostgresTestStore {
        repo: PgDownloadRepository::new(pool.clone()),
        pool,
        _container: container,
    })
}

fn ip_hash() -> IpHash {
    IpHash::from("00112233445566778899aabbccddeeff".to_string())
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
}

fn visit(at: DateTime<Utc>) -> DownloadTracker {
    DownloadTracker::observed_at(PATH, ip_hash(), at, Duration::hours(1))
}

fn slug(s: &str) -> Slug {
    Slug::new(s).unwrap()
}

#[tokio::test]
async fn test_postgres_observe_windowing() {
    let Some(store) = postgres_or_skip().await else {
        return;
    };

    // First visit opens a window
    assert!(store.repo.observe(&visit(t0())).await.unwrap().is_fresh_download);
    assert_eq!(
        store.expiry(PATH, &ip_hash()).await,
        Some(t0() + Duration::hours(1))
    );

    // Repeat inside the window is a duplicate and slides the expiry
    let inside = t0() + Duration::minutes(30);
    assert!(!store.repo.observe(&visit(inside)).await.unwrap().is_fresh_download);
    assert_eq!(
        store.expiry(PATH, &ip_hash()).await,
        Some(inside + Duration::hours(1))
    );

    // Exactly at expiry the window has lapsed
    let lapsed = inside + Duration::hours(1);
    assert!(store.repo.observe(&visit(lapsed)).await.unwrap().is_fresh_download);
    assert_eq!(
        store.expiry(PATH, &ip_hash()).await,
        Some(lapsed + Duration::hours(1))
    );
    assert_eq!(store.tracker_count().await, 1);
}

#[tokio::test]
async fn test_postgres_late_older_visit_does_not_shorten_window() {
    let Some(store) = postgres_or_skip().await else {
        return;
    };
    let newer = t0() + Duration::minutes(30);

    assert!(store.repo.observe(&visit(newer)).await.unwrap().is_fresh_download);
    assert!(!store.repo.observe(&visit(t0())).await.unwrap().is_fresh_download);
    assert_eq!(
        store.expiry(PATH, &ip_hash()).await,
        Some(newer + Duration::hours(1))
    );

    let observation = store
        .repo
        .observe(&visit(t0() + Duration::minutes(65)))
        .await
        .unwrap();
    assert!(!observation.is_fresh_download);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_postgres_simultaneous_observe_yields_one_fresh() {
    const N: usize = 16;
    let Some(store) = postgres_or_skip().await else {
        return;
    };
    let repo = Arc::new(store.repo.clone());

    let mut handles = Vec::with_capacity(N);
    for _ in 0..N {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.observe(&visit(t0())).await.unwrap()
        }));
    }

    let mut fresh = 0;
    for handle in handles {
        if handle.await.unwrap().is_fresh_download {
            fresh += 1;
        }
    }

    assert_eq!(fresh, 1);
    assert_eq!(store.tracker_count().await, 1);
}

#[tokio::test]
async fn test_postgres_sweep_removes_only_expired() {
    let Some(store) = postgres_or_skip().await else {
        return;
    };
    let other = IpHash::from("ffeeddccbbaa99887766554433221100".to_string());

    store.repo.observe(&visit(t0())).await.unwrap();
    store
        .repo
        .observe(&DownloadTracker::observed_at(
            PATH,
            other.clone(),
            t0() + Duration::minutes(10),
            Duration::hours(1),
        ))
        .await
        .unwrap();

    // The first window ends exactly now; the second is still open
    let deleted = store
        .repo
        .sweep_expired(t0() + Duration::hours(1))
        .await
        .unwrap();

    assert_eq!(deleted, 1);
    assert!(store.expiry(PATH, &ip_hash()).await.is_none());
    assert!(store.expiry(PATH, &other).await.is_some());
}

#[tokio::test]
async fn test_postgres_catalog_increments() {
    let Some(store) = postgres_or_skip().await else {
        return;
    };

    let rows = store
        .repo
        .increment_mod_version(&slug("super-mod"), &slug("1.2.0"))
        .await
        .unwrap();
    assert_eq!(rows, 1);
    assert_eq!(store.mod_version_downloads("super-mod", "1.2.0").await, 1);

    let rows = store
        .repo
        .increment_launcher_version(&slug("3.4.5"))
        .await
        .unwrap();
    assert_eq!(rows, 1);
    assert_eq!(store.launcher_version_downloads("3.4.5").await, 1);

    // Unknown versions touch nothing
    let rows = store
        .repo
        .increment_mod_version(&slug("ghost-mod"), &slug("9.9.9"))
        .await
        .unwrap();
    assert_eq!(rows, 0);
    let rows = store
        .repo
        .increment_launcher_version(&slug("0.0.1"))
        .await
        .unwrap();
    assert_eq!(rows, 0);
    assert_eq!(store.mod_version_downloads("super-mod", "1.2.0").await, 1);
    assert_eq!(store.launcher_version_downloads("3.4.5").await, 1);
}

#[tokio::test]
async fn test_postgres_record_download_scenarios() {
    let Some(store) = postgres_or_skip().await else {
        return;
    };
    let repo = Arc::new(store.repo.clone());
    let use_case = RecordDownloadUseCase::new(
        repo.clone(),
        repo,
        Arc::new(CounterConfig::with_salt("test-salt")),
    );

    let first = DownloadNotification::new("mods/super-mod/1.2.0/file.zip", "1.2.3.4");
    assert!(matches!(
        use_case.execute(&first).await.unwrap(),
        RecordOutcome::Counted { rows: 1, .. }
    ));
    assert!(matches!(
        use_case.execute(&first).await.unwrap(),
        RecordOutcome::Duplicate { .. }
    ));
    assert_eq!(store.mod_version_downloads("super-mod", "1.2.0").await, 1);

    for host in ["5.6.7.8", "9.10.11.12"] {
        use_case
            .execute(&DownloadNotification::new("launcher/3.4.5/setup.exe", host))
            .await
            .unwrap();
    }
    assert_eq!(store.launcher_version_downloads("3.4.5").await, 2);

    let ghost = DownloadNotification::new("mods/ghost-mod/9.9.9/file.zip", "1.2.3.4");
    assert!(matches!(
        use_case.execute(&ghost).await.unwrap(),
        RecordOutcome::MissingCatalogEntry { .. }
    ));
}
