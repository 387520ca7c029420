//! 建议生成
//!
//! `(platform, conflicts)` 的纯函数：有高严重程度冲突时先插入一条 critical 汇总，
//! 然后追加该平台的固定建议表

use crate::domain::{
    Conflict, HardlinkLayout, LayoutTemplate, Platform, Priority, Recommendation,
};

/// 生成建议列表
pub fn generate(platform: Platform, conflicts: &[Conflict]) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    let critical: Vec<&Conflict> = conflicts.iter().filter(|c| c.is_high()).collect();
    if !critical.is_empty() {
        recommendations.push(
            Recommendation::new(
                Priority::Critical,
                "Resolve Critical Conflicts",
                format!(
                    "{} critical path conflict(s) will break hardlinks or atomic moves",
                    critical.len()
                ),
                "Fix the conflicts listed below before changing anything else",
            )
            .with_examples(critical.iter().map(|c| c.headline())),
        );
    }

    recommendations.extend(platform_advice(platform));
    recommendations
}

/// Docker 不可达时返回的唯一建议
pub fn degraded() -> Vec<Recommendation> {
    vec![Recommendation::new(
        Priority::Critical,
        "Connect Docker Socket",
        "MapArr needs access to Docker to analyze your setup",
        "Mount /var/run/docker.sock in compose file",
    )
    .with_examples(["/var/run/docker.sock:/var/run/docker.sock:ro"])]
}

/// 平台固定建议表
fn platform_advice(platform: Platform) -> Vec<Recommendation> {
    match platform {
        Platform::Windows => vec![
            Recommendation::new(
                Priority::High,
                "WSL2 Path Conversion",
                "Windows-style paths were found. Docker Desktop runs containers inside WSL2, so Windows paths are translated through a slow 9P bridge and cannot be hardlinked across mounts.",
                "Convert Windows paths to their WSL2 form and keep media inside the WSL2 filesystem where possible",
            )
            .with_examples(["C:\\data → /mnt/c/data", "D:\\media\\tv → /mnt/d/media/tv"]),
            Recommendation::new(
                Priority::Medium,
                "Single Drive for Media and Downloads",
                "Hardlinks cannot cross drive letters. Downloads and the media library must live on the same drive.",
                "Place downloads and media under one folder on one drive, e.g. D:\\data",
            )
            .with_examples(["D:\\data\\torrents", "D:\\data\\media"]),
        ],
        Platform::Wsl2 => vec![
            Recommendation::new(
                Priority::High,
                "Avoid /mnt/c for Media",
                "Paths under /mnt/c or /mnt/d cross the Windows/WSL2 boundary, which is slow and does not support hardlinks reliably.",
                "Move media into the WSL2 filesystem (e.g. ~/data) or keep everything on one Windows drive",
            )
            .with_examples(["/mnt/c/data → /home/<user>/data"]),
            Recommendation::new(
                Priority::Medium,
                "Use One Mount Root",
                "Mount a single parent folder into every *arr app and download client.",
                "Map the same host folder to /data in every container",
            )
            .with_examples(["/mnt/d/data:/data"]),
        ],
        Platform::Unraid => vec![
            Recommendation::new(
                Priority::High,
                "Use /mnt/user for Hardlinks",
                "Unraid shares under /mnt/user span cache and array. Mixing /mnt/user with /mnt/cache or disk paths breaks hardlinks.",
                "Map one share (e.g. /mnt/user/data) into every container as /data",
            )
            .with_examples([
                "/mnt/user/data:/data",
                "/mnt/cache/downloads → /mnt/user/data/torrents",
            ]),
            Recommendation::new(
                Priority::Medium,
                "Single Share for Media and Downloads",
                "Separate shares for downloads and media are separate mount points inside containers, so hardlinks fail between them.",
                "Create one 'data' share with torrents/ and media/ subfolders",
            ),
        ],
        Platform::Synology => vec![
            Recommendation::new(
                Priority::High,
                "Synology Volume Paths",
                "Hardlinks only work within one Synology volume and one shared folder.",
                "Keep downloads and media in one shared folder on one volume, e.g. /volume1/data",
            )
            .with_examples([
                "/volume1/data:/data",
                "/volume1/downloads → /volume1/data/torrents",
            ]),
            Recommendation::new(
                Priority::Medium,
                "Match the Container User",
                "DSM permissions are per user; containers should run as the user that owns the shared folder.",
                "Set PUID/PGID to the DSM user's IDs (check with `id <user>` over SSH)",
            )
            .with_examples(["PUID=1026 PGID=100"]),
        ],
        Platform::Linux | Platform::Docker => vec![
            Recommendation::new(
                Priority::Medium,
                "Single Data Root",
                "Mount one parent folder into every container so downloads and media share a filesystem.",
                "Use the same host folder mapped to /data in every *arr app and download client",
            )
            .with_examples(["/srv/data:/data", "/data/torrents + /data/media"]),
            Recommendation::new(
                Priority::Info,
                "Prefer Bind Mounts Over Named Volumes",
                "Named volumes under /var/lib/docker are separate filesystems per volume from the container's view.",
                "Replace named media volumes with bind mounts of one host folder",
            ),
        ],
        Platform::Unknown => vec![Recommendation::new(
            Priority::Medium,
            "Platform Not Detected",
            "We couldn't auto-detect your platform from the mounted paths",
            "Tell us your setup (or add manual paths with a platform hint) and we'll provide specific guidance",
        )],
    }
}

/// 硬链接安全布局建议
pub fn hardlink_layout(platform: Platform) -> HardlinkLayout {
    let (template, root) = match platform {
        Platform::Unraid => (LayoutTemplate::Unraid, "/mnt/user/data"),
        Platform::Synology => (LayoutTemplate::Synology, "/volume1/data"),
        _ => (LayoutTemplate::Standard, "/data"),
    };

    let structure = [
        root.to_string(),
        "├── torrents".to_string(),
        "│   ├── movies".to_string(),
        "│   └── tv".to_string(),
        "├── usenet".to_string(),
        "│   ├── movies".to_string(),
        "│   └── tv".to_string(),
        "└── media".to_string(),
        "    ├── movies".to_string(),
        "    └── tv".to_string(),
    ]
    .join("\n");

    let volume_mapping = vec![
        format!("qbittorrent: {}/torrents:/data/torrents", root),
        format!("sabnzbd: {}/usenet:/data/usenet", root),
        format!("sonarr: {}:/data", root),
        format!("radarr: {}:/data", root),
    ];

    HardlinkLayout {
        template,
        root: root.to_string(),
        structure,
        volume_mapping,
        explanation: format!(
            "Everything lives under {} on one filesystem, so imports from torrents/ or usenet/ into media/ are instant hardlinks instead of copies.",
            root
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConflictKind, Severity};

    fn titles(recs: &[Recommendation]) -> Vec<&str> {
        recs.iter().map(|r| r.title.as_str()).collect()
    }

    fn high_conflict() -> Conflict {
        Conflict::new(
            ConflictKind::MultipleSources {
                destination: "/data".into(),
                containers: vec!["sonarr".into(), "radarr".into()],
                sources: vec!["/a".into(), "/b".into()],
            },
            "",
            None,
        )
    }

    #[test]
    fn test_platform_titles() {
        assert!(titles(&generate(Platform::Windows, &[])).contains(&"WSL2 Path Conversion"));
        assert!(titles(&generate(Platform::Unraid, &[])).contains(&"Use /mnt/user for Hardlinks"));
        assert!(titles(&generate(Platform::Synology, &[])).contains(&"Synology Volume Paths"));
        assert!(titles(&generate(Platform::Unknown, &[])).contains(&"Platform Not Detected"));
        assert_eq!(
            titles(&generate(Platform::Linux, &[])),
            titles(&generate(Platform::Docker, &[]))
        );
    }

    #[test]
    fn test_critical_advisory_prepended() {
        let conflicts = vec![high_conflict(), high_conflict()];
        let recs = generate(Platform::Docker, &conflicts);
        assert_eq!(recs[0].priority, Priority::Critical);
        assert_eq!(recs[0].title, "Resolve Critical Conflicts");
        assert!(recs[0].description.starts_with("2 "));
        assert_eq!(recs[0].examples.len(), 2);
    }

    #[test]
    fn test_medium_conflicts_do_not_add_critical() {
        let warning = Conflict::new(
            ConflictKind::PermissionWarning {
                container: "sonarr".into(),
            },
            "",
            None,
        );
        assert_eq!(warning.severity, Severity::Medium);
        let recs = generate(Platform::Docker, &[warning]);
        assert!(recs.iter().all(|r| r.priority != Priority::Critical));
    }

    #[test]
    fn test_degraded_advisory() {
        let recs = degraded();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].priority, Priority::Critical);
    }

    #[test]
    fn test_layout_templates() {
        let standard = hardlink_layout(Platform::Docker);
        assert_eq!(standard.template, LayoutTemplate::Standard);
        assert!(standard.structure.starts_with("/data"));

        let unraid = hardlink_layout(Platform::Unraid);
        assert_eq!(unraid.template, LayoutTemplate::Unraid);
        assert!(unraid.structure.contains("/mnt/user/data"));

        let synology = hardlink_layout(Platform::Synology);
        assert_eq!(synology.template, LayoutTemplate::Synology);
        assert!(synology.structure.contains("/volume1/data"));

        assert_eq!(hardlink_layout(Platform::Windows).template, LayoutTemplate::Standard);
    }
}
