mod common;

use common::{Fixture, Link, CLIENT, OWNER};
use photobook_lib::{sync::ViewSource, Caller, ErrorKind, Storefront};

async fn first_work_id(device: &Storefront) -> String {
    let works = device.load_works("default", None).await.unwrap();
    assert_eq!(works.source, ViewSource::Remote);
    assert!(!works.items.is_empty());
    works.items[0].id.clone()
}

#[tokio::test]
async fn toggle_twice_returns_to_original_state() {
    let fixture = Fixture::new().await;
    let device = fixture.device(CLIENT).await;
    let work_id = first_work_id(&device).await;

    let original = device.is_favorited(&work_id);
    device.toggle_favorite(&work_id).await.unwrap();
    assert_ne!(device.is_favorited(&work_id), original);
    device.toggle_favorite(&work_id).await.unwrap();
    assert_eq!(device.is_favorited(&work_id), original);
}

#[tokio::test]
async fn favorites_survive_reload_from_local_store() {
    let fixture = Fixture::new().await;
    let device = fixture.device(CLIENT).await;
    let work_id = first_work_id(&device).await;

    assert!(device.toggle_favorite(&work_id).await.unwrap());
    device.settle().await;
    let reloaded = fixture.device(CLIENT).await;
    assert!(reloaded.is_favorited(&work_id));

    let stored = reloaded.favorites();
    assert_eq!(stored.len(), 1);
    assert!(!stored[0].style.is_empty());
    assert!(stored[0].cover_url.is_some());

    assert!(!reloaded.toggle_favorite(&work_id).await.unwrap());
    reloaded.settle().await;
    let again = fixture.device(CLIENT).await;
    assert!(!again.is_favorited(&work_id));
}

#[tokio::test]
async fn remote_favorites_follow_the_device() {
    let fixture = Fixture::new().await;
    let device = fixture.device(CLIENT).await;
    let work_id = first_work_id(&device).await;

    device.toggle_favorite(&work_id).await.unwrap();
    device.settle().await;
    let remote = fixture
        .remote
        .database()
        .favorite_work_ids(CLIENT)
        .await
        .unwrap();
    assert!(remote.contains(&work_id));

    // Quick double toggle: the remote copy ends on the device's final value.
    device.toggle_favorite(&work_id).await.unwrap();
    device.toggle_favorite(&work_id).await.unwrap();
    device.toggle_favorite(&work_id).await.unwrap();
    device.settle().await;
    assert!(!device.is_favorited(&work_id));
    let remote = fixture
        .remote
        .database()
        .favorite_work_ids(CLIENT)
        .await
        .unwrap();
    assert!(!remote.contains(&work_id));
}

#[tokio::test]
async fn offline_toggle_is_kept_locally() {
    let fixture = Fixture::new().await;
    let device = fixture.device(CLIENT).await;
    let work_id = first_work_id(&device).await;

    fixture.link.set(Link::Offline);
    assert!(device.toggle_favorite(&work_id).await.unwrap());
    device.settle().await;

    assert!(device.is_favorited(&work_id));
    let remote = fixture
        .remote
        .database()
        .favorite_work_ids(CLIENT)
        .await
        .unwrap();
    assert!(remote.is_empty());

    let cached = device.load_works("default", None).await.unwrap();
    assert_eq!(cached.source, ViewSource::LocalSnapshot);
    assert!(cached.items.iter().any(|work| work.id == work_id));
}

#[tokio::test]
async fn stats_and_clear_cover_local_favorites() {
    let fixture = Fixture::new().await;
    let device = fixture.device(CLIENT).await;
    let works = device.load_works("default", None).await.unwrap().items;

    for work in works.iter().take(3) {
        device.toggle_favorite(&work.id).await.unwrap();
    }
    let stats = device.favorite_stats();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.by_style.values().sum::<usize>(), 3);

    assert_eq!(device.clear_favorites().await.unwrap(), 3);
    device.settle().await;
    assert_eq!(device.favorite_stats().total, 0);
    assert!(fixture.device(CLIENT).await.favorites().is_empty());
}

#[tokio::test]
async fn deleting_a_work_leaves_no_orphans() {
    let fixture = Fixture::new().await;
    let fan = fixture.device(CLIENT).await;
    let work_id = first_work_id(&fan).await;

    fan.toggle_favorite(&work_id).await.unwrap();
    fan.settle().await;
    fixture
        .remote
        .add_comment(&Caller::new(CLIENT), &work_id, "光线真好")
        .await
        .unwrap();

    let forbidden = fan.delete_work(&work_id).await.unwrap_err();
    assert_eq!(forbidden.kind(), ErrorKind::Forbidden);

    let owner = fixture.device(OWNER).await;
    owner.load_works("default", None).await.unwrap();
    let deleted = owner.delete_work(&work_id).await.unwrap();
    assert_eq!(deleted.work_id, work_id);
    assert_eq!(deleted.favorites_removed, 1);
    assert_eq!(deleted.comments_removed, 1);
    assert!(owner.state().work(&work_id).is_none());

    let db = fixture.remote.database();
    assert!(db.get_work(&work_id).await.unwrap().is_none());
    assert_eq!(db.count_favorites_for_work(&work_id).await.unwrap(), 0);
    assert!(db.comments_for_work(&work_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn accepted_delete_survives_a_broken_cache() {
    let fixture = Fixture::new().await;
    let owner = fixture.device(OWNER).await;
    let work_id = first_work_id(&owner).await;

    rusqlite::Connection::open(fixture.cache_path(OWNER))
        .unwrap()
        .execute_batch("DROP TABLE local_favorites")
        .unwrap();

    let deleted = owner.delete_work(&work_id).await.unwrap();
    assert_eq!(deleted.work_id, work_id);
    assert!(owner.state().work(&work_id).is_none());
    assert!(!owner.state().works.iter().any(|work| work.id == work_id));
    assert!(fixture
        .remote
        .database()
        .get_work(&work_id)
        .await
        .unwrap()
        .is_none());
}
