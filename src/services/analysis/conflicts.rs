//! 冲突检测
//!
//! 四个独立的检测阶段按固定顺序写入同一个冲突列表：
//! 1. 目标路径冲突（multiple_sources）
//! 2. *arr 路径一致性（arr_path_mismatch）
//! 3. 硬链接根目录（hardlink_broken）
//! 4. 权限（permission_warning / permission_mismatch）
//!
//! 目标路径按首次出现顺序遍历，相同输入总是产生相同顺序的输出

use std::collections::HashMap;

use crate::config::AnalysisSettings;
use crate::domain::{Conflict, ConflictFix, ConflictKind, ContainerRecord, ManualPathEntry};

/// 建议统一源路径时优先选择的前缀（按顺序）
pub const PREFERRED_SOURCE_PREFIXES: &[&str] = &["/data", "/mnt/user/data", "/volume1/data"];

/// 映射到某个目标路径的来源
#[derive(Debug, Clone)]
struct Mapping<'a> {
    origin: &'a str,
    source: &'a str,
}

/// 冲突检测器
pub struct ConflictDetector<'a> {
    containers: &'a [ContainerRecord],
    manual_paths: &'a [ManualPathEntry],
    settings: &'a AnalysisSettings,
}

impl<'a> ConflictDetector<'a> {
    pub fn new(
        containers: &'a [ContainerRecord],
        manual_paths: &'a [ManualPathEntry],
        settings: &'a AnalysisSettings,
    ) -> Self {
        Self {
            containers,
            manual_paths,
            settings,
        }
    }

    /// 按固定顺序运行全部检测
    pub fn detect(&self) -> Vec<Conflict> {
        let mut conflicts = self.destination_collisions();
        conflicts.extend(self.arr_consistency());
        conflicts.extend(self.hardlink_roots());
        conflicts.extend(self.permissions());
        conflicts
    }

    fn arr_containers(&self) -> Vec<&'a ContainerRecord> {
        self.containers.iter().filter(|c| c.is_arr_app).collect()
    }

    /// 目标路径 -> 来源列表，保持首次出现顺序
    fn destination_map(&self) -> Vec<(&'a str, Vec<Mapping<'a>>)> {
        let mut order: Vec<(&'a str, Vec<Mapping<'a>>)> = Vec::new();
        let mut index: HashMap<&'a str, usize> = HashMap::new();

        let container_mappings = self.containers.iter().flat_map(|c| {
            c.volumes.iter().map(move |(dest, source)| {
                (
                    dest.as_str(),
                    Mapping {
                        origin: c.name.as_str(),
                        source: source.as_str(),
                    },
                )
            })
        });
        let manual_mappings = self.manual_paths.iter().map(|m| {
            (
                m.container_path.as_str(),
                Mapping {
                    origin: m.origin_name(),
                    source: m.host_path.as_str(),
                },
            )
        });

        for (dest, mapping) in container_mappings.chain(manual_mappings) {
            if dest.is_empty() || mapping.source.is_empty() {
                continue;
            }
            match index.get(dest) {
                Some(&i) => order[i].1.push(mapping),
                None => {
                    index.insert(dest, order.len());
                    order.push((dest, vec![mapping]));
                }
            }
        }

        order
    }

    /// 同一目标路径映射到不同主机路径
    ///
    /// 多个来源但主机路径相同属于有意共享，不算冲突
    pub fn destination_collisions(&self) -> Vec<Conflict> {
        let mut conflicts = Vec::new();

        for (dest, mappings) in self.destination_map() {
            if mappings.len() < 2 {
                continue;
            }

            let mut sources: Vec<String> = Vec::new();
            for m in &mappings {
                push_unique(&mut sources, m.source);
            }
            if sources.len() < 2 {
                continue;
            }

            let containers: Vec<String> = mappings.iter().map(|m| m.origin.to_string()).collect();
            let suggested = suggest_source(&sources);
            let note = format!(
                "{} containers map {} to {} different host paths; hardlinks and atomic moves between them will fail",
                containers.len(),
                dest,
                sources.len()
            );
            let fix = ConflictFix {
                action: format!("Use the same host path for {} in every container", dest),
                example: Some(format!("{}:{}", suggested, dest)),
                suggested_source: Some(suggested),
            };

            conflicts.push(Conflict::new(
                ConflictKind::MultipleSources {
                    destination: dest.to_string(),
                    containers,
                    sources,
                },
                note,
                Some(fix),
            ));
        }

        conflicts
    }

    /// *arr 应用之间路径结构一致性
    pub fn arr_consistency(&self) -> Vec<Conflict> {
        let arr = self.arr_containers();
        if arr.len() < 2 {
            return Vec::new();
        }

        let mut union: Vec<&str> = Vec::new();
        for c in &arr {
            for dest in c.volumes.keys() {
                if !union.contains(&dest.as_str()) {
                    union.push(dest);
                }
            }
        }
        if union.is_empty() {
            return Vec::new();
        }

        let mut conflicts = Vec::new();
        for c in &arr {
            let exposed = union
                .iter()
                .filter(|d| c.volumes.contains_key(d))
                .count();
            let overlap = exposed as f64 / union.len() as f64;
            if overlap >= self.settings.arr_overlap_threshold {
                continue;
            }

            let missing_paths: Vec<String> = union
                .iter()
                .filter(|d| !c.volumes.contains_key(d))
                .map(|d| d.to_string())
                .collect();

            // 取其他 *arr 应用对第一个缺失路径的映射作为示例
            let example = missing_paths.first().and_then(|dest| {
                arr.iter()
                    .filter(|other| other.name != c.name)
                    .find_map(|other| other.volumes.get(dest))
                    .map(|source| format!("{}:{}", source, dest))
            });

            conflicts.push(Conflict::new(
                ConflictKind::ArrPathMismatch {
                    container: c.name.clone(),
                    missing_paths: missing_paths.clone(),
                    overlap,
                },
                format!(
                    "{} doesn't share paths with other arr apps (missing: {})",
                    c.name,
                    missing_paths.join(", ")
                ),
                Some(ConflictFix {
                    action: format!(
                        "Add the same volume mappings to {} as the other *arr apps",
                        c.name
                    ),
                    suggested_source: None,
                    example,
                }),
            ));
        }

        conflicts
    }

    /// *arr 与下载客户端的根目录必须有交集，否则硬链接/原子移动失效
    pub fn hardlink_roots(&self) -> Vec<Conflict> {
        let arr = self.arr_containers();
        let downloaders: Vec<&ContainerRecord> = self
            .containers
            .iter()
            .filter(|c| !c.is_arr_app && c.is_download_client())
            .collect();
        if arr.is_empty() || downloaders.is_empty() {
            return Vec::new();
        }

        let segments = self.settings.root_segments;
        let roots_of = |group: &[&ContainerRecord]| {
            let mut roots: Vec<String> = Vec::new();
            for c in group {
                for source in c.volumes.values() {
                    if let Some(root) = path_root(source, segments) {
                        push_unique(&mut roots, &root);
                    }
                }
            }
            roots
        };

        let arr_roots = roots_of(arr.as_slice());
        let download_roots = roots_of(downloaders.as_slice());
        // 任一侧没有卷时无从比较
        if arr_roots.is_empty() || download_roots.is_empty() {
            return Vec::new();
        }
        if arr_roots.iter().any(|r| download_roots.contains(r)) {
            return Vec::new();
        }

        let note = format!(
            "*arr apps ({}) and download clients ({}) have no common root folder; imports will copy instead of hardlink",
            arr_roots.join(", "),
            download_roots.join(", ")
        );

        vec![Conflict::new(
            ConflictKind::HardlinkBroken {
                arr_containers: arr.iter().map(|c| c.name.clone()).collect(),
                download_clients: downloaders.iter().map(|c| c.name.clone()).collect(),
                arr_roots,
                download_roots,
            },
            note,
            Some(ConflictFix {
                action: "Mount one shared parent folder (e.g. /data) into both the *arr apps and the download clients".to_string(),
                suggested_source: Some("/data".to_string()),
                example: Some("/data/torrents and /data/media on the same volume, mounted as /data".to_string()),
            }),
        )]
    }

    /// PUID/PGID 检查
    pub fn permissions(&self) -> Vec<Conflict> {
        let arr = self.arr_containers();
        let mut conflicts = Vec::new();

        for c in &arr {
            if c.declared_uid().is_none() && c.declared_gid().is_none() {
                conflicts.push(Conflict::new(
                    ConflictKind::PermissionWarning {
                        container: c.name.clone(),
                    },
                    format!(
                        "{} has no PUID/PGID set; files may be created with the wrong owner",
                        c.name
                    ),
                    Some(ConflictFix {
                        action: format!("Set PUID and PGID on {} to the owner of your media", c.name),
                        suggested_source: None,
                        example: Some("PUID=1000 PGID=1000".to_string()),
                    }),
                ));
            }
        }

        let mut uids: Vec<String> = Vec::new();
        let mut gids: Vec<String> = Vec::new();
        let mut declaring: Vec<String> = Vec::new();
        for c in &arr {
            let uid = c.declared_uid();
            let gid = c.declared_gid();
            if let Some(uid) = uid {
                push_unique(&mut uids, uid);
            }
            if let Some(gid) = gid {
                push_unique(&mut gids, gid);
            }
            if uid.is_some() || gid.is_some() {
                declaring.push(c.name.clone());
            }
        }

        if uids.len() > 1 || gids.len() > 1 {
            let example = format!(
                "PUID={} PGID={}",
                uids.first().map_or("1000", String::as_str),
                gids.first().map_or("1000", String::as_str)
            );
            conflicts.push(Conflict::new(
                ConflictKind::PermissionMismatch {
                    containers: declaring,
                    uids: uids.clone(),
                    gids: gids.clone(),
                },
                format!(
                    "*arr apps run with different user/group IDs (UIDs: {}; GIDs: {})",
                    uids.join(", "),
                    gids.join(", ")
                ),
                Some(ConflictFix {
                    action: "Use the same PUID/PGID for every *arr app and download client"
                        .to_string(),
                    suggested_source: None,
                    example: Some(example),
                }),
            ));
        }

        conflicts
    }
}

/// 从多个来源中挑选建议统一使用的路径
///
/// 优先匹配 `PREFERRED_SOURCE_PREFIXES`，否则取最短的（并列取先出现的）
pub fn suggest_source(sources: &[String]) -> String {
    for prefix in PREFERRED_SOURCE_PREFIXES {
        if let Some(source) = sources.iter().find(|s| s.starts_with(prefix)) {
            return source.clone();
        }
    }
    sources
        .iter()
        .min_by_key(|s| s.len())
        .cloned()
        .unwrap_or_default()
}

/// 路径的"根"：前 N 段，作为"同一文件系统"的粗略判断
///
/// `/data/media/tv` -> `/data/media`；反斜杠按斜杠处理
pub fn path_root(path: &str, segments: usize) -> Option<String> {
    let normalized = path.replace('\\', "/");
    let parts: Vec<&str> = normalized
        .split('/')
        .filter(|s| !s.is_empty())
        .take(segments)
        .collect();
    if parts.is_empty() {
        return None;
    }

    let joined = parts.join("/");
    if normalized.starts_with('/') {
        Some(format!("/{}", joined))
    } else {
        Some(joined)
    }
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}
