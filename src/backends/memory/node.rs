//! Stored entry representation for the in-memory adapter.

use crate::types::Head;

/// Stored entry - either a file or a directory
#[derive(Debug, Clone)]
pub(super) enum Node<D> {
    File {
        head: Head,
        data: Option<D>,
        version: u32,
    },
    Dir {
        head: Head,
    },
}

impl<D: Clone> Node<D> {
    pub fn new_file(head: Head, data: Option<D>) -> Self {
        Node::File {
            head,
            data,
            version: 0,
        }
    }

    pub fn new_dir(head: Head) -> Self {
        Node::Dir { head }
    }

    /// Builds the node matching `head.is_dir`; directories drop `data`.
    pub fn from_head(head: Head, data: Option<D>) -> Self {
        if head.is_dir {
            Node::new_dir(head)
        } else {
            Node::new_file(head, data)
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Node::File { .. })
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Node::Dir { .. })
    }

    pub fn head(&self) -> &Head {
        match self {
            Node::File { head, .. } | Node::Dir { head } => head,
        }
    }

    pub fn set_head(&mut self, new_head: Head) {
        match self {
            Node::File { head, .. } | Node::Dir { head } => *head = new_head,
        }
    }

    pub fn data(&self) -> Option<&D> {
        match self {
            Node::File { data, .. } => data.as_ref(),
            Node::Dir { .. } => None,
        }
    }

    /// Write counter (0 for directories)
    pub fn version(&self) -> u32 {
        match self {
            Node::File { version, .. } => *version,
            Node::Dir { .. } => 0,
        }
    }

    /// Copy of this node addressed by `path`.
    pub fn relocated(&self, path: &str) -> Self {
        let mut node = self.clone();
        let mut head = node.head().clone();
        head.path = path.to_string();
        node.set_head(head);
        node
    }
}
