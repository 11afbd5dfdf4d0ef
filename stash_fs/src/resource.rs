use serde::{Deserialize, Serialize};

use crate::{
    error::{FsError, FsResult},
    path::{split_name_and_parent, strip_user_root},
};

/// File or folder, derived purely from the trailing-slash key convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceKind {
    File,
    Directory,
}

impl ResourceKind {
    pub fn of_key(key: &str) -> Self {
        if key.ends_with('/') {
            ResourceKind::Directory
        } else {
            ResourceKind::File
        }
    }
}

/// A file or folder as reported to callers.
///
/// `parent_path + name` is the user-relative path of the resource. `size` is
/// present for every file, zero-byte files included, and absent for folders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "path")]
    pub parent_path: String,
    pub name: String,
    pub size: Option<u64>,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
}

impl Resource {
    /// Derives a resource from a backend key and the stored object size.
    ///
    /// The user root itself is not a resource and is rejected.
    pub fn from_key(key: &str, size: u64) -> FsResult<Self> {
        if key.is_empty() {
            return Err(FsError::bad_path("invalid path"));
        }
        let relative = strip_user_root(key);
        if relative.is_empty() {
            return Err(FsError::bad_path("the root folder has no name"));
        }

        let (parent_path, name) = split_name_and_parent(relative);
        let kind = ResourceKind::of_key(name);
        let size = match kind {
            ResourceKind::File => Some(size),
            ResourceKind::Directory => None,
        };

        Ok(Self {
            parent_path: parent_path.to_string(),
            name: name.to_string(),
            size,
            kind,
        })
    }

    /// User-relative path of this resource.
    pub fn path(&self) -> String {
        format!("{}{}", self.parent_path, self.name)
    }

    pub fn is_dir(&self) -> bool {
        self.kind == ResourceKind::Directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_resource() {
        let resource = Resource::from_key("user-8-files/docs/test.txt", 123).unwrap();
        assert_eq!(
            resource,
            Resource {
                parent_path: "docs/".into(),
                name: "test.txt".into(),
                size: Some(123),
                kind: ResourceKind::File,
            }
        );
    }

    #[test]
    fn folder_resource() {
        let resource = Resource::from_key("user-8-files/docs/", 123).unwrap();
        assert_eq!(resource.parent_path, "");
        assert_eq!(resource.name, "docs/");
        assert_eq!(resource.size, None);
        assert_eq!(resource.kind, ResourceKind::Directory);
    }

    #[test]
    fn zero_byte_file_keeps_its_size() {
        let resource = Resource::from_key("user-8-files/empty.bin", 0).unwrap();
        assert_eq!(resource.size, Some(0));
        assert!(!resource.is_dir());
    }

    #[test]
    fn nested_resource_reconstructs_relative_path() {
        let resource = Resource::from_key("user-8-files/a/b/c/", 0).unwrap();
        assert_eq!(resource.parent_path, "a/b/");
        assert_eq!(resource.path(), "a/b/c/");
    }

    #[test]
    fn invalid_keys() {
        assert!(matches!(
            Resource::from_key("", 10),
            Err(FsError::BadPathFormat(_))
        ));
        assert!(matches!(
            Resource::from_key("user-8-files/", 0),
            Err(FsError::BadPathFormat(_))
        ));
    }

    #[test]
    fn serializes_in_api_shape() {
        let resource = Resource::from_key("user-8-files/docs/test.txt", 5).unwrap();
        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "path": "docs/",
                "name": "test.txt",
                "size": 5,
                "type": "FILE",
            })
        );
        let folder = Resource::from_key("user-8-files/docs/", 0).unwrap();
        let json = serde_json::to_value(&folder).unwrap();
        assert_eq!(json["size"], serde_json::Value::Null);
        assert_eq!(json["type"], "DIRECTORY");
    }
}
