use chwire::{Block, Column, Connection, DataType, Result, Settings, Value};
use time::macros::datetime;

pub async fn main() -> Result<()> {
    let mut conn = Connection::connect_env().await?;

    conn.execute("DROP TABLE IF EXISTS chwire_example").await?;
    conn.execute(
        "CREATE TABLE chwire_example(id UInt32, name String, tags Array(String), at DateTime, price Nullable(Decimal(10, 2))) \
         ENGINE = Memory",
    )
    .await?;

    let rows = (0..10u32).map(|i| {
        vec![
            Value::from(i),
            Value::from(format!("row-{i}")),
            Value::from(vec!["a", "b"]),
            Value::DateTime(datetime!(2024-01-01 00:00 UTC)),
            // parsed into the column type
            match i % 2 {
                0 => Value::from("12.50"),
                _ => Value::Null,
            },
        ]
    });
    conn.insert_rows("INSERT INTO chwire_example VALUES", rows).await?;

    let ids = Column::new("id", DataType::UInt32, vec![Value::from(100u32), Value::from(101u32)])?;
    let names = Column::new("name", DataType::String, vec![Value::from("foo"), Value::from("bar")])?;
    conn.insert("chwire_example", &Block::from_columns(vec![names, ids])?).await?;

    let blocks = conn.query("SELECT count() FROM chwire_example", &Settings::new()).await?.collect().await?;
    assert_eq!(blocks[0].column(0).and_then(|c| c.get(0)), Some(&Value::UInt64(12)));

    conn.execute("DROP TABLE chwire_example").await?;
    conn.close().await?;
    Ok(())
}
