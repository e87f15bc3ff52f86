//! Folder tree built from a flat listing.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::services::storage::Entry;

/// A node in the browser tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    /// Last path segment; empty for the root.
    pub name: String,
    /// Path relative to the browse root; empty for the root.
    pub path: String,
    pub is_folder: bool,
    pub size: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
    /// Children in first-appearance order.
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// The unnamed root folder.
    pub fn root() -> Self {
        Self::folder(String::new(), String::new())
    }

    fn folder(name: String, path: String) -> Self {
        Self {
            name,
            path,
            is_folder: true,
            size: None,
            last_modified: None,
            children: Vec::new(),
        }
    }

    /// Fold a flat listing into a tree.
    ///
    /// Folders implied by file paths are created on the way down; explicit
    /// folder entries merge into them. The same input order always gives the
    /// same tree.
    pub fn build(entries: &[Entry]) -> Self {
        let mut root = Self::root();
        for entry in entries {
            root.insert(entry);
        }
        root
    }

    fn insert(&mut self, entry: &Entry) {
        let segments: Vec<&str> = entry.path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((leaf, parents)) = segments.split_last() else {
            return;
        };

        let mut node = self;
        let mut path = String::new();
        for segment in parents {
            path = join(&path, segment);
            node = node.child_folder(segment, &path);
        }
        let path = join(&path, leaf);

        if entry.is_folder {
            let folder = node.child_folder(leaf, &path);
            folder.last_modified = folder.last_modified.or(entry.last_modified);
        } else if !node.children.iter().any(|c| !c.is_folder && c.name == *leaf) {
            node.children.push(TreeNode {
                name: leaf.to_string(),
                path,
                is_folder: false,
                size: entry.size,
                last_modified: entry.last_modified,
                children: Vec::new(),
            });
        }
    }

    /// Find or create the child folder `name`.
    fn child_folder(&mut self, name: &str, path: &str) -> &mut TreeNode {
        let index = match self
            .children
            .iter()
            .position(|c| c.is_folder && c.name == name)
        {
            Some(index) => index,
            None => {
                self.children
                    .push(TreeNode::folder(name.to_string(), path.to_string()));
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }

    /// Find the folder at `path`. The empty path is the root.
    pub fn find_folder(&self, path: &str) -> Option<&TreeNode> {
        self.find(path, true)
    }

    /// Find the file at `path`.
    pub fn find_file(&self, path: &str) -> Option<&TreeNode> {
        self.find(path, false)
    }

    /// A file and a folder may share a path, so the last segment is matched
    /// by kind. Every segment before it is a folder.
    fn find(&self, path: &str, folder: bool) -> Option<&TreeNode> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((leaf, parents)) = segments.split_last() else {
            return folder.then_some(self);
        };

        let mut node = self;
        for segment in parents {
            node = node.children.iter().find(|c| c.is_folder && c.name == *segment)?;
        }
        node.children
            .iter()
            .find(|c| c.is_folder == folder && c.name == *leaf)
    }

    /// Number of files below this node.
    pub fn file_count(&self) -> usize {
        self.children
            .iter()
            .map(|c| if c.is_folder { c.file_count() } else { 1 })
            .sum()
    }
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::EntryFilter;

    fn names(node: &TreeNode) -> Vec<&str> {
        node.children.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_filtered_example_tree() {
        let entries = vec![
            Entry::file("a/b.txt", 1),
            Entry::file("a/c.png", 2),
            Entry::file("d.txt", 3),
        ];
        let filtered = EntryFilter::new(&["**/*"])
            .unwrap()
            .with_extensions(&["txt"])
            .apply(entries);

        let tree = TreeNode::build(&filtered);
        assert_eq!(names(&tree), vec!["a", "d.txt"]);

        let a = &tree.children[0];
        assert!(a.is_folder);
        assert_eq!(a.path, "a");
        assert_eq!(names(a), vec!["b.txt"]);
        assert_eq!(a.children[0].path, "a/b.txt");
        assert!(!tree.children[1].is_folder);
        assert_eq!(tree.file_count(), 2);
    }

    #[test]
    fn test_no_duplicate_root_nodes() {
        let entries = vec![
            Entry::folder("a"),
            Entry::file("a/x.txt", 1),
            Entry::file("a/y/z.txt", 1),
            Entry::folder("a/y"),
            Entry::file("b.txt", 1),
            Entry::file("b.txt", 1),
        ];

        let tree = TreeNode::build(&entries);
        assert_eq!(names(&tree), vec!["a", "b.txt"]);
        assert_eq!(names(tree.find_folder("a").unwrap()), vec!["x.txt", "y"]);
        assert_eq!(names(tree.find_folder("a/y").unwrap()), vec!["z.txt"]);
    }

    #[test]
    fn test_file_and_folder_may_share_a_name() {
        let entries = vec![Entry::file("data", 1), Entry::file("data/inner.csv", 1)];

        let tree = TreeNode::build(&entries);
        assert_eq!(tree.children.len(), 2);
        assert!(!tree.children[0].is_folder);
        assert!(tree.children[1].is_folder);

        let folder = tree.find_folder("data").unwrap();
        assert!(folder.is_folder);
        assert_eq!(names(folder), vec!["inner.csv"]);
        let file = tree.find_file("data").unwrap();
        assert!(!file.is_folder);
        assert_eq!(file.size, Some(1));
        assert!(tree.find_file("data/inner.csv").is_some());
        assert!(tree.find_folder("data/inner.csv").is_none());
    }

    #[test]
    fn test_build_is_deterministic() {
        let entries = vec![
            Entry::file("z/1.txt", 1),
            Entry::file("a/2.txt", 1),
            Entry::file("m.txt", 1),
        ];
        assert_eq!(TreeNode::build(&entries), TreeNode::build(&entries));
        assert_eq!(names(&TreeNode::build(&entries)), vec!["z", "a", "m.txt"]);
    }

    #[test]
    fn test_empty_listing() {
        let tree = TreeNode::build(&[]);
        assert!(tree.children.is_empty());
        assert!(tree.find_folder("").is_some());
        assert!(tree.find_file("").is_none());
        assert!(tree.find_folder("missing").is_none());
    }
}
