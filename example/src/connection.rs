use std::{env::var, time::Duration};
use chwire::{Config, Connection, Result};


pub async fn main() -> Result<()> {

    let mut conn = Connection::connect(&var("CLICKHOUSE_URL").unwrap()).await?;
    conn.execute("SELECT 1").await?;
    conn.close().await?;

    let mut conn = Connection::connect_env().await?;
    let info = conn.server_info().unwrap();
    tracing::info!("{} {}.{}.{} (revision {})", info.name, info.version_major, info.version_minor, info.version_patch, conn.revision());
    assert!(conn.ping(Duration::from_secs(1)).await);
    conn.close().await?;
    // closing twice is fine
    conn.close().await?;

    let config = Config::from_env()
        .compression(false)
        .query_timeout(Duration::from_secs(5))
        .setting("max_threads", 2u64);
    let mut conn = Connection::connect_with(config).await?;
    conn.execute("SELECT 1").await?;
    conn.close().await?;

    Ok(())
}
