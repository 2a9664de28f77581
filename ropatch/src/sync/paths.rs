use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathError {
    #[error("package filename is empty")]
    Empty,
    #[error("package filename escapes the local root: {0}")]
    Traversal(String),
}

/// Maps a manifest-declared filename to its destination under the local root.
///
/// Filenames are relative fragments ("data/a.grf"); anything that would walk
/// out of the root is rejected rather than normalized.
pub fn local_path_for(root: &Path, filename: &str) -> Result<PathBuf, PathError> {
    if filename.is_empty() {
        return Err(PathError::Empty);
    }

    let mut out = root.to_path_buf();
    for component in Path::new(filename).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::RootDir | Component::CurDir => continue,
            Component::ParentDir | Component::Prefix(_) => {
                return Err(PathError::Traversal(filename.to_string()));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_filename_under_root() {
        let root = PathBuf::from("/srv/ro");
        let mapped = local_path_for(&root, "data/a.grf").unwrap();
        assert_eq!(mapped, PathBuf::from("/srv/ro/data/a.grf"));
    }

    #[test]
    fn strips_a_leading_slash() {
        let root = PathBuf::from("/srv/ro");
        let mapped = local_path_for(&root, "/a.grf").unwrap();
        assert_eq!(mapped, PathBuf::from("/srv/ro/a.grf"));
    }

    #[test]
    fn rejects_parent_dir_components() {
        let root = PathBuf::from("/srv/ro");
        assert!(matches!(
            local_path_for(&root, "../outside.grf"),
            Err(PathError::Traversal(_))
        ));
        assert!(matches!(
            local_path_for(&root, "data/../../outside.grf"),
            Err(PathError::Traversal(_))
        ));
    }

    #[test]
    fn rejects_empty_filename() {
        let root = PathBuf::from("/srv/ro");
        assert!(matches!(local_path_for(&root, ""), Err(PathError::Empty)));
    }
}
