/// Object key utility functions / 对象键工具函数

/// Split a file name into stem and extension (with dot) / 分离文件名和扩展名
/// "a.png" -> ("a", ".png"), ".env" -> (".env", ""), "archive.tar.gz" -> ("archive.tar", ".gz")
pub fn split_ext(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 && pos + 1 < name.len() => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    }
}

/// Generate a collision-free object key from a file name / 生成不冲突的对象键
/// Input: "photo.png" / 输入
/// Output: "photo-7b0d4e2c-....png" / 输出
///
/// Only the last path component is kept, so the key is always a single
/// location segment.
pub fn unique_object_name(name: &str) -> String {
    let base = name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(name)
        .trim();

    let (stem, ext) = split_ext(base);
    let stem = if stem.is_empty() { "file" } else { stem };

    format!("{}-{}{}", stem, uuid::Uuid::new_v4(), ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_split_ext() {
        assert_eq!(split_ext("a.png"), ("a", ".png"));
        assert_eq!(split_ext("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_ext("README"), ("README", ""));
        assert_eq!(split_ext(".env"), (".env", ""));
        assert_eq!(split_ext("trailing."), ("trailing.", ""));
    }

    #[test]
    fn test_unique_object_name_keeps_extension() {
        let key = unique_object_name("a.png");
        assert!(key.starts_with("a-"));
        assert!(key.ends_with(".png"));
        // "a-" + uuid (36) + ".png"
        assert_eq!(key.len(), 2 + 36 + 4);
    }

    #[test]
    fn test_unique_object_name_never_collides() {
        let keys: HashSet<String> = (0..1000).map(|_| unique_object_name("a.png")).collect();
        assert_eq!(keys.len(), 1000);
    }

    #[test]
    fn test_unique_object_name_keeps_basename() {
        let key = unique_object_name("../etc/passwd");
        assert!(key.starts_with("passwd-"), "{}", key);
        // "passwd-" + uuid, no extension
        assert_eq!(key.len(), 7 + 36);

        let key = unique_object_name("C:\\Users\\me\\photo.png");
        assert!(key.starts_with("photo-") && key.ends_with(".png"), "{}", key);

        let key = unique_object_name("dir/x.tar.gz");
        assert!(key.starts_with("x.tar-") && key.ends_with(".gz"), "{}", key);
    }

    #[test]
    fn test_unique_object_name_empty_stem() {
        assert!(unique_object_name("").starts_with("file-"));
        assert!(unique_object_name("uploads/").starts_with("file-"));
        assert!(!unique_object_name("a/b\\").contains(|c: char| c == '/' || c == '\\'));
    }
}
