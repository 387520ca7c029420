//! 平台推断
//!
//! 按优先级依次匹配，第一个命中的规则生效

use crate::domain::Platform;

/// 根据主机路径集合推断平台
pub fn classify<I, S>(paths: I) -> Platform
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let paths: Vec<S> = paths.into_iter().collect();
    let paths: Vec<&str> = paths.iter().map(AsRef::as_ref).collect();

    if any_path(&paths, |p| p.contains('\\')) {
        return Platform::Windows;
    }
    if any_path(&paths, |p| p.contains("/mnt/user")) {
        return Platform::Unraid;
    }
    if any_path(&paths, |p| {
        p.contains("/volume1") || p.contains("/volume2") || p.to_lowercase().contains("synology")
    }) {
        return Platform::Synology;
    }
    if any_path(&paths, |p| p.contains("/mnt/c/") || p.contains("/mnt/d/")) {
        return Platform::Wsl2;
    }
    if any_path(&paths, |p| p.contains("/var/lib/docker")) {
        return Platform::Linux;
    }
    if any_path(&paths, |p| p.contains("/data") || p.contains("/media")) {
        return Platform::Docker;
    }

    Platform::Unknown
}

fn any_path(paths: &[&str], pred: impl Fn(&str) -> bool) -> bool {
    paths.iter().any(|&p| pred(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_platform() {
        assert_eq!(classify(["C:\\Users\\media\\tv"]), Platform::Windows);
        assert_eq!(classify(["/mnt/user/data/media/tv"]), Platform::Unraid);
        assert_eq!(classify(["/volume1/data/media/tv"]), Platform::Synology);
        assert_eq!(classify(["/volume2/tv"]), Platform::Synology);
        assert_eq!(classify(["/srv/Synology/tv"]), Platform::Synology);
        assert_eq!(classify(["/mnt/c/data/media/tv"]), Platform::Wsl2);
        assert_eq!(classify(["/mnt/d/tv"]), Platform::Wsl2);
        assert_eq!(classify(["/var/lib/docker/volumes/media"]), Platform::Linux);
        assert_eq!(classify(["/data/media/tv"]), Platform::Docker);
        assert_eq!(classify(["/srv/media"]), Platform::Docker);
        assert_eq!(classify(["/opt/sonarr/config"]), Platform::Unknown);
    }

    #[test]
    fn test_empty_is_unknown() {
        assert_eq!(classify(Vec::<String>::new()), Platform::Unknown);
    }

    #[test]
    fn test_priority_order() {
        // 反斜杠优先于 /mnt/user，与出现顺序无关
        assert_eq!(
            classify(["/mnt/user/data", "D:\\media"]),
            Platform::Windows
        );
        assert_eq!(classify(["/volume1/data", "/mnt/user/tv"]), Platform::Unraid);
        // /mnt/user/data 同时包含 /data，但 unraid 优先
        assert_eq!(classify(["/mnt/user/data"]), Platform::Unraid);
        assert_eq!(
            classify(["/mnt/c/media", "/var/lib/docker/volumes/x"]),
            Platform::Wsl2
        );
    }

    #[test]
    fn test_classification_is_pure() {
        let paths = vec!["/data/tv".to_string(), "/opt/config".to_string()];
        let first = classify(&paths);
        for _ in 0..3 {
            assert_eq!(classify(&paths), first);
        }
    }
}
