//! *arr 应用配置探测
//!
//! 根据卷挂载推断每个 *arr 应用的配置目录、媒体根目录和下载目录

use crate::domain::container::ARR_APP_KEYWORDS;
use crate::domain::{ArrConfig, ContainerRecord};

/// 各应用的媒体根目录候选（容器内路径）
const ROOT_FOLDER_HINTS: &[(&str, &[&str])] = &[
    ("sonarr", &["/tv", "/series", "/shows", "/anime"]),
    ("radarr", &["/movies", "/films"]),
    ("lidarr", &["/music"]),
    ("readarr", &["/books", "/audiobooks"]),
    ("whisparr", &["/xxx"]),
];

/// 下载目录关键词
const DOWNLOAD_HINTS: &[&str] = &["download", "torrent", "usenet", "complete"];

/// 通用媒体根目录
const GENERIC_ROOTS: &[&str] = &["/data", "/media"];

/// 对所有 *arr 容器做配置探测
pub fn detect_arr_configs(containers: &[ContainerRecord]) -> Vec<ArrConfig> {
    containers
        .iter()
        .filter(|c| c.is_arr_app)
        .map(detect_one)
        .collect()
}

fn detect_one(container: &ContainerRecord) -> ArrConfig {
    let app_type = app_type(container);
    let hints = ROOT_FOLDER_HINTS
        .iter()
        .find(|(app, _)| *app == app_type)
        .map_or(&[][..], |(_, hints)| *hints);

    let config_path = container.volumes.get("/config").cloned();

    let download_paths: Vec<String> = container
        .volumes
        .iter()
        .filter(|(dest, _)| {
            let dest = dest.to_lowercase();
            DOWNLOAD_HINTS.iter().any(|kw| dest.contains(kw))
        })
        .map(|(_, source)| source.clone())
        .collect();

    // 先找应用专属目录，再退回到通用根目录
    let detected_root_folder = container
        .volumes
        .iter()
        .find(|(dest, _)| hints.iter().any(|h| dest.as_str() == *h || dest.starts_with(&format!("{}/", h))))
        .or_else(|| {
            container
                .volumes
                .iter()
                .find(|(dest, _)| GENERIC_ROOTS.contains(&dest.as_str()))
        })
        .map(|(_, source)| source.clone());

    let mut issues = Vec::new();
    if !hints.is_empty() && detected_root_folder.is_none() {
        issues.push(format!(
            "No root folder mapping detected for {} (expected one of {})",
            container.name,
            hints.join(", ")
        ));
    }
    if app_type != "bazarr" && app_type != "prowlarr" && download_paths.is_empty() {
        let has_shared_root = container
            .volumes
            .keys()
            .any(|d| GENERIC_ROOTS.contains(&d.as_str()));
        if !has_shared_root {
            issues.push(format!(
                "No download path mapping detected for {}; imports from the download client will fail",
                container.name
            ));
        }
    }
    if config_path.is_none() {
        issues.push(format!(
            "No /config volume for {}; settings will be lost when the container is recreated",
            container.name
        ));
    }

    ArrConfig {
        container_name: container.name.clone(),
        app_type: app_type.to_string(),
        config_path,
        detected_root_folder,
        download_paths,
        issues,
    }
}

/// 由容器名或镜像推断应用类型
fn app_type(container: &ContainerRecord) -> &'static str {
    let name = container.name.to_lowercase();
    let image = container.image.to_lowercase();
    ARR_APP_KEYWORDS
        .iter()
        .find(|app| name.contains(*app))
        .or_else(|| ARR_APP_KEYWORDS.iter().find(|app| image.contains(*app)))
        .copied()
        .unwrap_or("unknown")
}
