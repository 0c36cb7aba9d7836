use futures::TryStreamExt;
use chwire::{Connection, Result, Settings};

pub async fn main() -> Result<()> {
    let mut conn = Connection::connect_env().await?;

    let mut result = conn
        .query("SELECT number, toString(number) AS s FROM system.numbers LIMIT 100000", &Settings::new())
        .await?;

    for column in result.sample().columns() {
        tracing::info!("{}: {}", column.name(), column.data_type());
    }

    let mut rows = 0;
    while let Some(block) = result.next_block().await? {
        rows += block.row_count();
    }
    assert_eq!(rows, 100000);
    tracing::info!("progress: {:?}", result.progress());

    // as a stream
    let settings = Settings::new().with("max_block_size", 1000u64);
    let blocks = conn
        .query("SELECT number FROM system.numbers LIMIT 5000", &settings)
        .await?
        .try_collect::<Vec<_>>()
        .await?;
    assert_eq!(blocks.iter().map(|b| b.row_count()).sum::<usize>(), 5000);

    // leaving a result early, it is drained on the next query
    let mut result = conn.query("SELECT number FROM system.numbers LIMIT 100000", &settings).await?;
    let _first = result.next_block().await?;
    drop(result);

    let block = conn.query("SELECT 'foo' AS foo, [1, 2, 3] AS arr, NULL AS n", &Settings::new()).await?.collect().await?;
    for row in block.iter().flat_map(|b| b.rows()) {
        tracing::info!("{} {} {}", row[0], row[1], row[2]);
    }

    match conn.execute("SELECT * FROM table_does_not_exist").await {
        Ok(()) => panic!("expected exception"),
        Err(err) => tracing::info!("{err}"),
    }
    // connection is still usable after an exception
    conn.execute("SELECT 1").await?;

    conn.close().await?;
    Ok(())
}
