use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    caller::Caller,
    db::{helpers::now, Comment, DeletedWork, Work, WorkListing, WorkPage, WorkPhoto},
    error::{ServiceError, ServiceResult},
    lifecycle::engine::present,
};

use super::{Functions, DEFAULT_PHOTOGRAPHER_ID};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;
pub const MAX_PHOTOS_PER_WORK: usize = 9;
/// Style tag given to uploads that don't name one.
pub const FALLBACK_STYLE: &str = "其他";

fn default_photographer() -> String {
    DEFAULT_PHOTOGRAPHER_ID.to_string()
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListWorksRequest {
    #[serde(default = "default_photographer")]
    pub photographer_id: String,
    /// A style tag, or `"all"` / absent for every style.
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for ListWorksRequest {
    fn default() -> Self {
        Self {
            photographer_id: default_photographer(),
            style: None,
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteWorkRequest {
    pub work_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhotoInput {
    pub url: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub desc: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadWorkRequest {
    pub title: Option<String>,
    pub style: Option<String>,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub photos: Vec<PhotoInput>,
    #[serde(default)]
    pub camera: String,
    #[serde(default)]
    pub lens: String,
}

impl Functions {
    pub async fn list_works(
        &self,
        caller: &Caller,
        request: ListWorksRequest,
    ) -> ServiceResult<WorkPage> {
        let page = request.page.max(1);
        let page_size = request.page_size.clamp(1, MAX_PAGE_SIZE);
        let style = request
            .style
            .as_deref()
            .map(str::trim)
            .filter(|style| !style.is_empty() && *style != "all")
            .map(str::to_string);
        let photographer_id = match request.photographer_id.trim() {
            "" => DEFAULT_PHOTOGRAPHER_ID,
            id => id,
        };

        let offset = u64::from(page - 1) * u64::from(page_size);
        let (works, total) = self
            .db
            .list_works(photographer_id, style, offset, u64::from(page_size))
            .await?;
        let favorited = self.db.favorite_work_ids(caller.as_str()).await?;

        let items = works
            .into_iter()
            .map(|work| WorkListing {
                is_favorited: favorited.contains(&work.id),
                work,
            })
            .collect();

        Ok(WorkPage {
            items,
            total,
            page,
            page_size,
        })
    }

    pub async fn delete_work(
        &self,
        caller: &Caller,
        request: DeleteWorkRequest,
    ) -> ServiceResult<DeletedWork> {
        let work_id =
            present(&request.work_id).ok_or(ServiceError::MissingParameters(vec!["workId"]))?;

        let work = self
            .db
            .get_work(&work_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("work", &work_id))?;

        if !self.owns_work(caller, &work).await? {
            return Err(ServiceError::Forbidden(format!(
                "work {work_id} belongs to another photographer"
            )));
        }

        let cascade = self.db.delete_work_cascade(&work_id).await?;
        info!(
            "Deleted work {} ({} favorites, {} comments)",
            work_id, cascade.favorites_removed, cascade.comments_removed
        );

        Ok(DeletedWork {
            work_id,
            deleted_at: now(),
            favorites_removed: cascade.favorites_removed,
            comments_removed: cascade.comments_removed,
        })
    }

    pub async fn upload_work(
        &self,
        caller: &Caller,
        request: UploadWorkRequest,
    ) -> ServiceResult<Work> {
        let title = present(&request.title).ok_or(ServiceError::MissingParameters(vec!["title"]))?;
        if request.photos.is_empty() {
            return Err(ServiceError::MissingParameters(vec!["photos"]));
        }
        if request.photos.len() > MAX_PHOTOS_PER_WORK {
            return Err(ServiceError::InvalidParameter(format!(
                "at most {MAX_PHOTOS_PER_WORK} photos per work, got {}",
                request.photos.len()
            )));
        }

        let photographer_id = match self.db.find_photographer_by_owner(caller.as_str()).await? {
            Some(photographer) => photographer.id,
            None => caller.as_str().to_string(),
        };

        let id = format!("wk_{}", Uuid::new_v4().simple());
        let photos = request
            .photos
            .into_iter()
            .enumerate()
            .map(|(index, photo)| WorkPhoto {
                id: format!("{id}_{}", index + 1),
                url: photo.url,
                size: photo.size,
                desc: photo.desc,
            })
            .collect();
        let at = now();

        let work = Work {
            id,
            photographer_id,
            owner_id: caller.as_str().to_string(),
            title,
            description: request.desc,
            style: present(&request.style).unwrap_or_else(|| FALLBACK_STYLE.to_string()),
            photos,
            camera: request.camera,
            lens: request.lens,
            likes: 0,
            views: rand::thread_rng().gen_range(100..600),
            created_at: at,
            updated_at: at,
        };
        self.db.insert_work(&work).await?;

        info!("Uploaded work {} for {}", work.id, work.photographer_id);
        Ok(work)
    }

    /// Add or remove the caller's remote favorite for a work. Repeating the
    /// current state is a no-op.
    pub async fn set_favorite(
        &self,
        caller: &Caller,
        work_id: &str,
        favorited: bool,
    ) -> ServiceResult<()> {
        if self.db.get_work(work_id).await?.is_none() {
            return Err(ServiceError::not_found("work", work_id));
        }

        if favorited {
            self.db.add_favorite(caller.as_str(), work_id, now()).await?;
        } else {
            self.db.remove_favorite(caller.as_str(), work_id).await?;
        }
        Ok(())
    }

    pub async fn add_comment(
        &self,
        caller: &Caller,
        work_id: &str,
        content: &str,
    ) -> ServiceResult<Comment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ServiceError::MissingParameters(vec!["content"]));
        }
        if self.db.get_work(work_id).await?.is_none() {
            return Err(ServiceError::not_found("work", work_id));
        }

        let comment = Comment {
            id: format!("cm_{}", Uuid::new_v4().simple()),
            work_id: work_id.to_string(),
            author_id: caller.as_str().to_string(),
            content: content.to_string(),
            created_at: now(),
        };
        self.db.insert_comment(&comment).await?;
        Ok(comment)
    }

    async fn owns_work(&self, caller: &Caller, work: &Work) -> ServiceResult<bool> {
        if work.owner_id == caller.as_str() || work.photographer_id == caller.as_str() {
            return Ok(true);
        }
        Ok(self
            .db
            .find_photographer_by_owner(caller.as_str())
            .await?
            .is_some_and(|photographer| photographer.id == work.photographer_id))
    }
}
