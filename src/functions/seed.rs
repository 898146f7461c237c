//! Sample data for an empty store: the default photographer and a handful of works.

use chrono::Duration;
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    caller::Caller,
    db::{helpers::now, Photographer, Work, WorkPhoto},
    error::ServiceResult,
};

use super::Functions;

pub const DEFAULT_PHOTOGRAPHER_ID: &str = "default";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InitDataRequest {
    /// Wipe existing works and the default profile before seeding.
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    pub photographer_created: bool,
    pub works_created: usize,
    pub message: String,
}

// (title, style, description, camera, lens, likes)
const SAMPLE_WORKS: [(&str, &str, &str, &str, &str, i64); 6] = [
    ("午后的光", "人像", "窗边自然光下的一组人像", "Canon EOS R5", "RF 85mm F1.2", 128),
    ("城市夜行", "街拍", "霓虹与雨夜的街头", "Sony A7M4", "FE 35mm F1.4", 96),
    ("山海之间", "风光", "清晨的海岸线", "Nikon Z7 II", "Z 14-24mm F2.8", 210),
    ("白色誓言", "婚纱", "教堂外景婚纱", "Canon EOS R5", "RF 50mm F1.2", 175),
    ("旧时光", "复古", "胶片质感的复古写真", "Fujifilm X-T4", "XF 56mm F1.2", 83),
    ("童年夏日", "儿童", "草地上的夏日亲子照", "Sony A7M4", "FE 85mm F1.8", 64),
];

fn default_photographer(owner: &Caller) -> Photographer {
    let at = now();
    Photographer {
        id: DEFAULT_PHOTOGRAPHER_ID.to_string(),
        owner_id: Some(owner.as_str().to_string()),
        name: "光影诗人".to_string(),
        title: "资深人像摄影师".to_string(),
        location: "上海".to_string(),
        bio: "用镜头记录每一个动人瞬间".to_string(),
        avatar: "https://picsum.photos/seed/photographer/200".to_string(),
        wechat_id: "guangying_poet".to_string(),
        phone: "13800000000".to_string(),
        styles: vec!["人像".into(), "风光".into(), "婚纱".into(), "街拍".into()],
        created_at: at,
        updated_at: at,
    }
}

fn sample_works(owner: &Caller) -> Vec<Work> {
    let base = now();
    SAMPLE_WORKS
        .iter()
        .enumerate()
        .map(|(index, (title, style, description, camera, lens, likes))| {
            let id = format!("wk_sample_{}", index + 1);
            let at = base - Duration::hours(index as i64 * 24);
            let photos = (1..=3)
                .map(|n| WorkPhoto {
                    id: format!("{id}_{n}"),
                    url: format!("https://picsum.photos/seed/{id}_{n}/800/1200"),
                    size: "800x1200".to_string(),
                    desc: String::new(),
                })
                .collect();
            Work {
                id,
                photographer_id: DEFAULT_PHOTOGRAPHER_ID.to_string(),
                owner_id: owner.as_str().to_string(),
                title: title.to_string(),
                description: description.to_string(),
                style: style.to_string(),
                photos,
                camera: camera.to_string(),
                lens: lens.to_string(),
                likes: *likes,
                views: likes * 5,
                created_at: at,
                updated_at: at,
            }
        })
        .collect()
}

impl Functions {
    /// Seed the default photographer and sample works, owned by `caller`.
    /// Without `force` an already seeded store is left untouched.
    pub async fn init_data(&self, caller: &Caller, force: bool) -> ServiceResult<SeedReport> {
        if force {
            let removed = self.db.delete_all_works().await?;
            self.db.delete_photographer(DEFAULT_PHOTOGRAPHER_ID).await?;
            info!("Cleared {removed} works before reseeding");
        }

        let photographer_created = match self.db.get_photographer(DEFAULT_PHOTOGRAPHER_ID).await? {
            Some(_) => false,
            None => {
                self.db
                    .upsert_photographer(&default_photographer(caller))
                    .await?;
                true
            }
        };

        let (_, existing) = self
            .db
            .list_works(DEFAULT_PHOTOGRAPHER_ID, None, 0, 1)
            .await?;
        let mut works_created = 0;
        if existing == 0 {
            for work in sample_works(caller) {
                self.db.insert_work(&work).await?;
                works_created += 1;
            }
        }

        let message = if photographer_created || works_created > 0 {
            format!("seeded {works_created} works")
        } else {
            "data already initialized".to_string()
        };
        info!("initData: {message}");

        Ok(SeedReport {
            photographer_created,
            works_created,
            message,
        })
    }
}
