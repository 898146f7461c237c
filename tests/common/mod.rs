#![allow(dead_code)]

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use photobook_lib::{
    client::StorefrontOptions,
    db::{DeletedWork, WorkPage},
    functions::{
        Backend, DeleteWorkRequest, ListBookingsRequest, ListWorksRequest, UpdateBookingRequest,
    },
    lifecycle::CreateBookingRequest,
    Booking, Caller, Database, Functions, LocalCache, Schema, ServiceError, ServiceResult,
    Storefront,
};
use tempfile::TempDir;

pub const OWNER: &str = "studio-owner";
pub const CLIENT: &str = "client-1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    Online,
    /// Fails fast with `RemoteUnavailable`.
    Offline,
    /// Never answers; the client's timeout decides.
    Hang,
    /// Answers after a delay.
    Slow(Duration),
}

/// Backend double that forwards to real handlers unless the link is down.
pub struct Switchable {
    inner: Arc<Functions>,
    link: Mutex<Link>,
}

impl Switchable {
    pub fn new(inner: Arc<Functions>) -> Self {
        Self {
            inner,
            link: Mutex::new(Link::Online),
        }
    }

    pub fn set(&self, link: Link) {
        *self.link.lock().unwrap() = link;
    }

    async fn pass(&self) -> ServiceResult<()> {
        let link = *self.link.lock().unwrap();
        match link {
            Link::Online => Ok(()),
            Link::Offline => Err(ServiceError::RemoteUnavailable("network down".into())),
            Link::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ServiceError::RemoteUnavailable("hung".into()))
            }
            Link::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Backend for Switchable {
    async fn create_booking(
        &self,
        caller: &Caller,
        request: CreateBookingRequest,
    ) -> ServiceResult<Booking> {
        self.pass().await?;
        self.inner.create_booking(caller, request).await
    }

    async fn update_booking_status(
        &self,
        caller: &Caller,
        request: UpdateBookingRequest,
    ) -> ServiceResult<Booking> {
        self.pass().await?;
        self.inner.update_booking_status(caller, request).await
    }

    async fn list_bookings(
        &self,
        caller: &Caller,
        request: ListBookingsRequest,
    ) -> ServiceResult<Vec<Booking>> {
        self.pass().await?;
        self.inner.list_bookings(caller, request).await
    }

    async fn list_works(
        &self,
        caller: &Caller,
        request: ListWorksRequest,
    ) -> ServiceResult<WorkPage> {
        self.pass().await?;
        self.inner.list_works(caller, request).await
    }

    async fn delete_work(
        &self,
        caller: &Caller,
        request: DeleteWorkRequest,
    ) -> ServiceResult<DeletedWork> {
        self.pass().await?;
        self.inner.delete_work(caller, request).await
    }

    async fn set_favorite(
        &self,
        caller: &Caller,
        work_id: &str,
        favorited: bool,
    ) -> ServiceResult<()> {
        self.pass().await?;
        self.inner.set_favorite(caller, work_id, favorited).await
    }
}

pub struct Fixture {
    pub dir: TempDir,
    pub remote: Arc<Functions>,
    pub link: Arc<Switchable>,
}

impl Fixture {
    /// Remote store on disk, seeded with the default photographer owned by [`OWNER`].
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("remote.sqlite3"), Schema::Remote).unwrap();
        let remote = Arc::new(Functions::new(db));
        remote.init_data(&Caller::new(OWNER), false).await.unwrap();
        let link = Arc::new(Switchable::new(remote.clone()));
        Self { dir, remote, link }
    }

    /// A device for `caller`; devices for the same caller share one cache file.
    pub async fn device(&self, caller: &str) -> Storefront {
        self.device_with(caller, Duration::from_millis(200)).await
    }

    pub fn cache_path(&self, caller: &str) -> PathBuf {
        self.dir.path().join(format!("cache-{caller}.sqlite3"))
    }

    pub async fn device_with(&self, caller: &str, remote_timeout: Duration) -> Storefront {
        let cache = LocalCache::open(self.cache_path(caller)).unwrap();
        Storefront::open(
            Caller::new(caller),
            self.link.clone(),
            cache,
            StorefrontOptions {
                remote_timeout,
                page_size: 20,
            },
        )
        .await
        .unwrap()
    }
}

pub fn portrait_request() -> CreateBookingRequest {
    CreateBookingRequest {
        photographer_id: Some("default".into()),
        shoot_type: Some("个人写真".into()),
        date: Some("2024-02-15".into()),
        client_phone: Some("13800000000".into()),
        ..Default::default()
    }
}
