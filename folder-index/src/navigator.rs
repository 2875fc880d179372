//! Display strings for folders and their resolution back to roots.
//!
//! With a single root, a folder is shown as its relative path. With several
//! roots, every folder is prefixed with its root's name and
//! [`ROOT_SEPARATOR`], and each root gets an entry of its own (`app/`).

use std::path::PathBuf;

use crate::root::ProjectRoot;

/// Separator between a root name and a folder path. A display string ending
/// with it names a root.
pub const ROOT_SEPARATOR: char = '/';

/// Entry naming the root itself.
pub fn root_entry(root: &ProjectRoot) -> String {
    format!("{}{ROOT_SEPARATOR}", root.name())
}

/// Entry for a folder of `root` in a multi-root listing.
pub fn prefixed_entry(root: &ProjectRoot, relative_path: &str) -> String {
    format!("{}{ROOT_SEPARATOR}{relative_path}", root.name())
}

/// A display string mapped back onto a root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection<'a> {
    pub root: &'a ProjectRoot,

    /// Slash-separated path below the root; empty for the root itself.
    pub relative_path: String,
}

impl Selection<'_> {
    /// Absolute location of the selection.
    pub fn path(&self) -> PathBuf {
        self.root.join(&self.relative_path)
    }
}

/// Map `selected` back to a root and relative path.
///
/// Best effort: when no root name matches, the first root is assumed and
/// the whole string is taken as the relative path. Returns `None` only when
/// `roots` is empty.
pub fn resolve<'a>(selected: &str, roots: &'a [ProjectRoot]) -> Option<Selection<'a>> {
    let first = roots.first()?;

    if let Some(name) = selected.strip_suffix(ROOT_SEPARATOR) {
        let root = find_by_name(roots, name).unwrap_or(first);
        return Some(Selection {
            root,
            relative_path: String::new(),
        });
    }

    if roots.len() == 1 {
        return Some(Selection {
            root: first,
            relative_path: selected.to_string(),
        });
    }

    if let Some((name, rest)) = selected.split_once(ROOT_SEPARATOR) {
        if let Some(root) = find_by_name(roots, name) {
            return Some(Selection {
                root,
                relative_path: rest.to_string(),
            });
        }
    }

    Some(Selection {
        root: first,
        relative_path: selected.to_string(),
    })
}

fn find_by_name<'a>(roots: &'a [ProjectRoot], name: &str) -> Option<&'a ProjectRoot> {
    roots.iter().find(|root| root.name() == name)
}
