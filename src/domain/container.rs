//! 容器相关领域模型

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// *arr 应用关键词（容器名或镜像名包含即视为 *arr 应用）
pub const ARR_APP_KEYWORDS: &[&str] = &[
    "sonarr", "radarr", "lidarr", "readarr", "bazarr", "prowlarr", "whisparr",
];

/// 下载客户端关键词（仅匹配容器名）
pub const DOWNLOAD_CLIENT_KEYWORDS: &[&str] = &[
    "qbit",
    "transmission",
    "deluge",
    "nzbget",
    "sabnzbd",
    "rtorrent",
];

/// 容器快照
///
/// 由发现客户端在每次分析时提供；所有字段缺失时取默认值，单条畸形记录不影响整体分析
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContainerRecord {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: String,
    /// 容器内目标路径 -> 主机源路径，保持挂载声明顺序
    pub volumes: VolumeMap,
    /// 仅保留路径相关及身份相关的环境变量
    pub env_vars: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub is_arr_app: bool,
}

impl ContainerRecord {
    /// 创建容器记录，自动推导 `is_arr_app`
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        image: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        let mut record = Self {
            id: id.into(),
            name: name.into(),
            image: image.into(),
            status: status.into(),
            ..Self::default()
        };
        record.is_arr_app = Self::detect_arr(&record.name, &record.image);
        record
    }

    /// 添加卷挂载
    pub fn with_volume(mut self, destination: impl Into<String>, source: impl Into<String>) -> Self {
        self.volumes.insert(destination, source);
        self
    }

    /// 添加环境变量（不做过滤，过滤由发现客户端负责）
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// 名称或镜像是否属于 *arr 应用
    pub fn detect_arr(name: &str, image: &str) -> bool {
        let name = name.to_lowercase();
        let image = image.to_lowercase();
        ARR_APP_KEYWORDS
            .iter()
            .any(|kw| name.contains(kw) || image.contains(kw))
    }

    /// 是否为已知下载客户端
    pub fn is_download_client(&self) -> bool {
        let name = self.name.to_lowercase();
        DOWNLOAD_CLIENT_KEYWORDS.iter().any(|kw| name.contains(kw))
    }

    /// 声明的 UID（PUID 优先于 UID）
    pub fn declared_uid(&self) -> Option<&str> {
        self.env_vars
            .get("PUID")
            .or_else(|| self.env_vars.get("UID"))
            .map(String::as_str)
    }

    /// 声明的 GID（PGID 优先于 GID）
    pub fn declared_gid(&self) -> Option<&str> {
        self.env_vars
            .get("PGID")
            .or_else(|| self.env_vars.get("GID"))
            .map(String::as_str)
    }
}

/// 卷挂载表
///
/// 按首次插入顺序保存目标路径；同一目标路径再次插入时原位替换来源。
/// 序列化为 JSON 对象，反序列化保留文档中的键顺序。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolumeMap(Vec<(String, String)>);

impl VolumeMap {
    pub fn insert(&mut self, destination: impl Into<String>, source: impl Into<String>) {
        let destination = destination.into();
        let source = source.into();
        match self.0.iter().position(|(d, _)| *d == destination) {
            Some(i) => self.0[i].1 = source,
            None => self.0.push((destination, source)),
        }
    }

    pub fn get(&self, destination: &str) -> Option<&String> {
        self.0
            .iter()
            .find(|(d, _)| d.as_str() == destination)
            .map(|(_, source)| source)
    }

    pub fn contains_key(&self, destination: &str) -> bool {
        self.get(destination).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> + '_ {
        self.0.iter().map(|(d, s)| (d, s))
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> + '_ {
        self.0.iter().map(|(d, _)| d)
    }

    pub fn values(&self) -> impl Iterator<Item = &String> + '_ {
        self.0.iter().map(|(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for VolumeMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for VolumeMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct VolumeMapVisitor;

        impl<'de> Visitor<'de> for VolumeMapVisitor {
            type Value = VolumeMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of container path to host path")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<VolumeMap, A::Error> {
                let mut volumes = VolumeMap::default();
                while let Some((destination, source)) = access.next_entry::<String, String>()? {
                    volumes.insert(destination, source);
                }
                Ok(volumes)
            }
        }

        deserializer.deserialize_map(VolumeMapVisitor)
    }
}

/// 环境变量过滤规则
pub struct EnvFilter;

impl EnvFilter {
    /// 路径相关关键词
    const PATH_KEYWORDS: &'static [&'static str] = &["path", "root", "mount", "dir", "folder"];

    /// 权限检查需要的身份变量
    const IDENTITY_KEYS: &'static [&'static str] = &["PUID", "PGID", "UID", "GID", "UMASK"];

    /// 是否保留该环境变量
    pub fn keep(key: &str) -> bool {
        if Self::IDENTITY_KEYS.contains(&key) {
            return true;
        }
        let key_lower = key.to_lowercase();
        Self::PATH_KEYWORDS.iter().any(|kw| key_lower.contains(kw))
    }
}

/// 手动路径条目
///
/// 用户声明的映射，不依赖运行中的容器；与容器卷共享同一目标路径空间
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ManualPathEntry {
    /// 持久化后分配
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub container_name: String,
    pub host_path: String,
    pub container_path: String,
    /// 路径无法推断平台时作为后备
    #[serde(alias = "platform", skip_serializing_if = "Option::is_none")]
    pub platform_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ManualPathEntry {
    pub fn new(
        container_name: impl Into<String>,
        host_path: impl Into<String>,
        container_path: impl Into<String>,
    ) -> Self {
        Self {
            container_name: container_name.into(),
            host_path: host_path.into(),
            container_path: container_path.into(),
            ..Self::default()
        }
    }

    /// 参与冲突检测时使用的来源名称
    pub fn origin_name(&self) -> &str {
        if self.container_name.is_empty() {
            "manual"
        } else {
            &self.container_name
        }
    }
}

/// 容器列表响应
#[derive(Debug, Serialize)]
pub struct ContainersResponse {
    pub containers: Vec<ContainerRecord>,
    pub total: usize,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_arr_by_name_or_image() {
        assert!(ContainerRecord::detect_arr("sonarr", "whatever"));
        assert!(ContainerRecord::detect_arr("tv", "lscr.io/linuxserver/Radarr:latest"));
        assert!(!ContainerRecord::detect_arr("nginx", "nginx:latest"));
    }

    #[test]
    fn test_download_client_matches_name_only() {
        let qbit = ContainerRecord::new("1", "qbittorrent", "x", "running");
        assert!(qbit.is_download_client());

        let hidden = ContainerRecord::new("2", "torrents", "linuxserver/qbittorrent", "running");
        assert!(!hidden.is_download_client());
    }

    #[test]
    fn test_declared_ids_prefer_puid() {
        let c = ContainerRecord::new("1", "sonarr", "x", "running")
            .with_env("UID", "99")
            .with_env("PUID", "1000")
            .with_env("GID", "100");
        assert_eq!(c.declared_uid(), Some("1000"));
        assert_eq!(c.declared_gid(), Some("100"));
    }

    #[test]
    fn test_env_filter() {
        assert!(EnvFilter::keep("PUID"));
        assert!(EnvFilter::keep("DOWNLOAD_DIR"));
        assert!(EnvFilter::keep("media_root"));
        assert!(!EnvFilter::keep("TZ"));
        assert!(!EnvFilter::keep("WEBUI_PASSWORD"));
    }

    #[test]
    fn test_malformed_record_defaults() {
        let c: ContainerRecord = serde_json::from_str(r#"{"name":"sonarr"}"#).unwrap();
        assert!(c.volumes.is_empty());
        assert!(c.env_vars.is_empty());
        assert!(!c.is_arr_app);
    }

    #[test]
    fn test_volumes_keep_declaration_order() {
        let c = ContainerRecord::new("1", "sonarr", "x", "running")
            .with_volume("/tv", "/mnt/user/tv")
            .with_volume("/config", "/mnt/user/appdata/sonarr")
            .with_volume("/downloads", "/mnt/user/dl")
            .with_volume("/tv", "/mnt/user/media/tv");
        let keys: Vec<&str> = c.volumes.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["/tv", "/config", "/downloads"]);
        assert_eq!(c.volumes.get("/tv").map(String::as_str), Some("/mnt/user/media/tv"));

        let json = serde_json::to_string(&c.volumes).unwrap();
        assert!(json.starts_with(r#"{"/tv":"#));

        let parsed: ContainerRecord =
            serde_json::from_str(r#"{"volumes":{"/tv":"/a","/movies":"/b","/books":"/c"}}"#).unwrap();
        let keys: Vec<&str> = parsed.volumes.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["/tv", "/movies", "/books"]);
    }

    #[test]
    fn test_manual_entry_accepts_platform_alias() {
        let e: ManualPathEntry = serde_json::from_str(
            r#"{"container_name":"sonarr","host_path":"/data/tv","container_path":"/tv","platform":"linux"}"#,
        )
        .unwrap();
        assert_eq!(e.platform_hint.as_deref(), Some("linux"));
        assert_eq!(e.origin_name(), "sonarr");
    }
}
