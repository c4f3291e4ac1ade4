//! Test fixtures shared by feature tests

use crate::config::Config;
use crate::context::AppContext;
use crate::db;

/// A context backed by a fresh SQLite file and artifact tree in a temp dir.
pub async fn test_context() -> (tempfile::TempDir, AppContext) {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut config = Config::default();
    config.database.url = format!("sqlite://{}", dir.path().join("test.db").display());
    config.storage.dataset_dir = dir.path().join("data");
    config.storage.synthetic_dir = dir.path().join("synthetic");
    config.storage.plot_dir = dir.path().join("plots");
    config.synthesis.sampler_seed = Some(7);
    config.auth.bcrypt_cost = 4;
    let ctx = AppContext::initialize(config).await.expect("context");
    (dir, ctx)
}

/// Insert a user directly and return its id.
pub async fn create_user(ctx: &AppContext, username: &str) -> i64 {
    db::users::create_user(&ctx.db, username, "not-a-real-hash")
        .await
        .expect("user")
        .id
}

pub const SMALL_CSV: &str = "age,height,city\n31,1.72,Paris\n45,1.80,Lyon\n27,1.65,Paris\n52,1.77,Nice\n38,1.70,Lyon\n";
