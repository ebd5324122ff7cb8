mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{pool, StubFetcher, StubSite};
use sitewalk_crawler::{anyhow, ResourcePool};

#[test]
fn empty_pool_is_an_error() {
    assert!(ResourcePool::<StubFetcher>::new(Vec::new()).is_err());
    assert!(ResourcePool::<StubFetcher>::build(0, || unreachable!()).is_err());
}

#[test]
fn build_stops_on_first_failure() {
    let mut built = 0;
    let res = ResourcePool::<StubFetcher>::build(3, || {
        built += 1;
        anyhow::bail!("Browser didn't start")
    });
    assert!(res.is_err());
    assert_eq!(built, 1);
}

#[tokio::test]
async fn acquire_waits_for_a_release() {
    let site = Arc::new(StubSite::new());
    let pool = pool(&site, 1);
    assert_eq!(pool.capacity(), 1);
    assert_eq!(pool.available(), 1);

    let held = pool.acquire().await.unwrap();
    assert_eq!(pool.available(), 0);
    let blocked = tokio::time::timeout(Duration::from_millis(50), pool.acquire()).await;
    assert!(blocked.is_err());

    drop(held);
    assert_eq!(pool.available(), 1);
    let again = tokio::time::timeout(Duration::from_millis(50), pool.acquire()).await;
    assert!(matches!(again, Ok(Ok(_))));
}

#[tokio::test]
async fn shutdown_closes_every_handle_once() {
    let site = Arc::new(StubSite::new());
    let pool = pool(&site, 3);

    let held = pool.acquire().await.unwrap();
    let shutdown = tokio::spawn({
        let pool = pool.clone();
        async move { pool.shutdown().await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(site.closed(), 0);

    drop(held);
    shutdown.await.unwrap().unwrap();
    assert_eq!(site.closed(), 3);
    assert!(pool.is_closed());

    assert!(pool.acquire().await.is_err());
    assert!(pool.shutdown().await.is_err());
    assert_eq!(site.closed(), 3);
}
