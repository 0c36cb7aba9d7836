use std::{env::var, time::Duration};
use chwire::{HostPool, Result};

pub async fn main() -> Result<()> {
    let url = var("CLICKHOUSE_POOL_URL").unwrap_or_else(|_| "clickhouse://localhost:9000,localhost:9999".into());
    let pool = HostPool::parse(&url)?.with_ping_timeout(Duration::from_secs(1));

    let live = pool.actualize().await;
    tracing::info!("{live} live hosts, disabled: {:?}", pool.disabled_urls());

    let sweeper = pool.spawn_sweeper(Duration::from_secs(10));

    let mut handles = vec![];
    for _ in 0..8 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            let mut conn = pool.acquire().await?;
            conn.execute("SELECT 1").await?;
            conn.close().await
        }));
    }

    for h in handles {
        h.await.unwrap()?;
    }

    sweeper.abort();
    Ok(())
}
