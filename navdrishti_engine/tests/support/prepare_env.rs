use log::*;
use navdrishti_engine::SqliteDatabase;
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite};

/// Create a throwaway SQLite database in the system temp directory and run the migrations against it.
/// Returns the database handle and the URL (so concurrent tasks can open their own handles).
pub async fn prepare_test_env() -> (SqliteDatabase, String) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let url = random_db_path();
    if let Err(e) = Sqlite::drop_database(&url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
    Sqlite::create_database(&url).await.expect("Error creating database");
    let db = SqliteDatabase::new_with_url(&url, 10).await.expect("Error creating connection to database");
    migrate!("./src/sqlite/migrations").run(db.pool()).await.expect("Error running DB migrations");
    info!("🚀️ Test database ready at {url}");
    (db, url)
}

pub fn random_db_path() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/navdrishti_test_{}.db", dir.display(), rand::random::<u64>())
}
