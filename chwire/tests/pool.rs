use chwire::{ErrorKind, HostPool};
use std::time::Duration;
use tokio::net::TcpListener;

mod common;

use common::{config, dead_port, listen, serve};

fn live(listener: TcpListener) -> tokio::task::JoinHandle<()> {
    serve(listener, |mut peer| async move {
        peer.handshake().await;
        peer.pong_loop().await;
    })
}

#[tokio::test]
async fn failover() {
    let (listener, alive) = listen().await;
    live(listener);
    let dead = dead_port().await;

    let pool = HostPool::new(vec![config(alive, false), config(dead, false)])
        .with_ping_timeout(Duration::from_secs(1));
    let a = format!("127.0.0.1:{alive}");
    let b = format!("127.0.0.1:{dead}");
    assert_eq!(pool.enabled_urls(), [a.clone(), b.clone()]);

    assert_eq!(pool.actualize().await, 1);
    assert_eq!(pool.enabled_urls(), [a.clone()]);
    assert_eq!(pool.disabled_urls(), [b.clone()]);
    assert!(pool.has_disabled_urls());

    for _ in 0..10 {
        let mut conn = pool.acquire().await.unwrap();
        assert_eq!(conn.config().get_port(), alive);
        conn.close().await.unwrap();
    }

    // the dead host recovers
    let listener = TcpListener::bind(("127.0.0.1", dead)).await.unwrap();
    live(listener);

    assert_eq!(pool.actualize().await, 2);
    assert_eq!(pool.enabled_urls(), [a, b]);
    assert!(!pool.has_disabled_urls());
}

#[tokio::test]
async fn silent_host_is_disabled() {
    let (listener, silent) = listen().await;
    serve(listener, |mut peer| async move {
        // accept, but never answer the hello
        while peer.recv().await.is_some() {}
    });
    let (listener, alive) = listen().await;
    live(listener);

    let pool = HostPool::new(vec![config(silent, false), config(alive, false)])
        .with_ping_timeout(Duration::from_millis(200));
    let live = tokio::time::timeout(Duration::from_secs(3), pool.actualize()).await.unwrap();
    assert_eq!(live, 1);
    assert_eq!(pool.enabled_urls(), [format!("127.0.0.1:{alive}")]);

    // the sweep lock was released
    let again = tokio::time::timeout(Duration::from_secs(3), pool.actualize()).await.unwrap();
    assert_eq!(again, 1);
}

#[tokio::test]
async fn no_available_host() {
    let dead = dead_port().await;
    let pool = HostPool::new(vec![config(dead, false)]).with_ping_timeout(Duration::from_millis(500));

    assert_eq!(pool.actualize().await, 0);
    let err = pool.acquire().await.unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::NoHost(_)), "{err}");
}

#[tokio::test]
async fn concurrent_acquire_during_sweep() {
    let (listener, port) = listen().await;
    live(listener);

    let pool = HostPool::new(vec![config(port, false)]);
    let sweep = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.actualize().await })
    };

    let mut handles = vec![];
    for _ in 0..4 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            let mut conn = pool.acquire().await?;
            let alive = conn.ping(Duration::from_secs(1)).await;
            conn.close().await?;
            Ok::<_, chwire::Error>(alive)
        }));
    }

    for handle in handles {
        assert!(handle.await.unwrap().unwrap());
    }
    assert_eq!(sweep.await.unwrap(), 1);
}

#[tokio::test]
async fn sweeper_stops_with_pool() {
    let (listener, port) = listen().await;
    live(listener);

    let pool = HostPool::new(vec![config(port, false)]);
    let sweeper = pool.spawn_sweeper(Duration::from_millis(20));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!sweeper.is_finished());

    drop(pool);
    tokio::time::timeout(Duration::from_secs(2), sweeper).await.unwrap().unwrap();
}
