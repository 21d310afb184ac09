//! Logical tree of decoded archive entries
//!

use binrw::Endian;
use indexmap::IndexMap;
use tracing::warn;

use crate::chunk;
use crate::error::{Error, Result};
use crate::kind::{EntryKind, DUMMY_PAYLOAD};

/// Bytes held by an [`Entry`]
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Chunk stream exactly as stored in the archive, not yet inflated
    Packed(Vec<u8>),

    /// Entry content
    Plain(Vec<u8>),
}

/// A file stored in a BIN archive
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    kind: EntryKind,
    index: u32,
    inflated_size: u32,
    payload: Payload,
}

impl Entry {
    /// Create an entry from its content.
    ///
    /// `index` is the 1-based directory position. [`EntryKind::Empty`] and
    /// [`EntryKind::Dummy`] entries ignore `data` and hold their fixed content.
    pub fn new(kind: EntryKind, index: u32, data: Vec<u8>) -> Self {
        let data = match kind {
            EntryKind::Empty => Vec::new(),
            EntryKind::Dummy => DUMMY_PAYLOAD.to_vec(),
            _ => data,
        };

        Entry {
            kind,
            index,
            inflated_size: if kind.is_compressed() {
                data.len() as u32
            } else {
                0
            },
            payload: Payload::Plain(data),
        }
    }

    /// Create a compressed entry still holding its stored chunk stream
    pub(crate) fn packed(kind: EntryKind, index: u32, inflated_size: u32, stored: Vec<u8>) -> Self {
        Entry {
            kind,
            index,
            inflated_size,
            payload: Payload::Packed(stored),
        }
    }

    /// Create an uncompressed entry holding the bytes found in the archive
    pub(crate) fn stored(kind: EntryKind, index: u32, stored: Vec<u8>) -> Self {
        Entry {
            kind,
            index,
            inflated_size: 0,
            payload: Payload::Plain(stored),
        }
    }

    /// How this entry is stored in the archive
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// The 1-based directory position of this entry
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Size of the content once inflated, zero for entries that are not compressed
    pub fn inflated_size(&self) -> u32 {
        self.inflated_size
    }

    /// The bytes currently held, see [`Entry::is_packed`]
    pub fn data(&self) -> &[u8] {
        match &self.payload {
            Payload::Packed(data) | Payload::Plain(data) => data,
        }
    }

    /// Get a reference to the payload
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Whether [`Entry::data`] is still a chunk stream rather than the content
    pub fn is_packed(&self) -> bool {
        matches!(self.payload, Payload::Packed(_))
    }

    /// Unwrap and return the held bytes
    pub fn into_data(self) -> Vec<u8> {
        match self.payload {
            Payload::Packed(data) | Payload::Plain(data) => data,
        }
    }

    /// Inflate a packed chunk stream in place.
    ///
    /// `archive` is the byte order of the archive the entry came from. Entries that
    /// are not packed are left untouched.
    pub fn inflate(&mut self, archive: Endian) -> Result<()> {
        let Payload::Packed(stored) = &self.payload else {
            return Ok(());
        };

        let data = chunk::decode(stored, self.kind.chunk_endian(archive))?;
        if data.len() as u64 != u64::from(self.inflated_size) {
            warn!(
                index = self.index,
                declared = self.inflated_size,
                actual = data.len(),
                "directory inflated size disagrees with chunk stream"
            );
            self.inflated_size = data.len() as u32;
        }

        self.payload = Payload::Plain(data);
        Ok(())
    }

    /// Replace the content of this entry.
    ///
    /// Compressed entries keep their kind and take the new inflated size; they are
    /// recompressed when written. Empty and placeholder entries become
    /// [`EntryKind::Normal`] so the new content is kept.
    pub fn replace(&mut self, data: Vec<u8>) {
        match self.kind {
            kind if kind.is_compressed() => self.inflated_size = data.len() as u32,
            EntryKind::Empty | EntryKind::Dummy => {
                self.kind = if data.is_empty() {
                    EntryKind::Empty
                } else {
                    EntryKind::Normal
                };
                self.inflated_size = 0;
            }
            _ => {}
        }

        self.payload = Payload::Plain(data);
    }
}

/// A node of the entry tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A named container of further nodes
    Directory(Directory),

    /// An archive entry
    File(Entry),
}

/// An ordered container of named nodes.
///
/// Paths are `/` separated; empty segments are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directory {
    children: IndexMap<Box<str>, Node>,
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Normalize a path to the form returned by [`Directory::files`]
pub fn normalize(path: &str) -> String {
    segments(&path.replace('\\', "/")).collect::<Vec<_>>().join("/")
}

impl Directory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `entry` at `path`, creating intermediate directories as needed
    pub fn insert(&mut self, path: &str, entry: Entry) -> Result<()> {
        let invalid = || Error::InvalidPath(path.to_owned());

        let mut parts = segments(path).collect::<Vec<_>>();
        let name = parts.pop().ok_or_else(invalid)?;

        let mut current = self;
        for part in parts {
            let node = current
                .children
                .entry(part.into())
                .or_insert_with(|| Node::Directory(Directory::default()));
            current = match node {
                Node::Directory(directory) => directory,
                Node::File(_) => return Err(invalid()),
            };
        }

        if current.children.contains_key(name) {
            return Err(invalid());
        }
        current.children.insert(name.into(), Node::File(entry));

        Ok(())
    }

    /// Search for a node by path
    pub fn node(&self, path: &str) -> Option<&Node> {
        let mut parts = segments(path);
        let mut node = self.children.get(parts.next()?)?;
        for part in parts {
            node = match node {
                Node::Directory(directory) => directory.children.get(part)?,
                Node::File(_) => return None,
            };
        }
        Some(node)
    }

    /// Search for an entry by path
    pub fn get(&self, path: &str) -> Option<&Entry> {
        match self.node(path)? {
            Node::File(entry) => Some(entry),
            Node::Directory(_) => None,
        }
    }

    /// Search for an entry by path, returning a mutable reference
    pub fn get_mut(&mut self, path: &str) -> Option<&mut Entry> {
        let mut parts = segments(path).peekable();
        let mut current = self;
        while let Some(part) = parts.next() {
            let node = current.children.get_mut(part)?;
            match node {
                Node::File(entry) if parts.peek().is_none() => return Some(entry),
                Node::Directory(directory) => current = directory,
                Node::File(_) => return None,
            }
        }
        None
    }

    /// Iterate over the direct children of this directory
    pub fn children(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.children.iter().map(|(name, node)| (name.as_ref(), node))
    }

    /// All entries below this directory with their full paths, depth first
    pub fn files(&self) -> Vec<(String, &Entry)> {
        let mut files = Vec::new();
        self.collect_files("", &mut files);
        files
    }

    /// All entries below this directory with their full paths, depth first
    pub fn files_mut(&mut self) -> Vec<(String, &mut Entry)> {
        let mut files = Vec::new();
        self.collect_files_mut("", &mut files);
        files
    }

    /// Number of entries below this directory
    pub fn len(&self) -> usize {
        self.children
            .values()
            .map(|node| match node {
                Node::Directory(directory) => directory.len(),
                Node::File(_) => 1,
            })
            .sum()
    }

    /// Whether there are no entries below this directory
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn collect_files<'a>(&'a self, prefix: &str, files: &mut Vec<(String, &'a Entry)>) {
        for (name, node) in &self.children {
            let path = join(prefix, name);
            match node {
                Node::Directory(directory) => directory.collect_files(&path, files),
                Node::File(entry) => files.push((path, entry)),
            }
        }
    }

    fn collect_files_mut<'a>(&'a mut self, prefix: &str, files: &mut Vec<(String, &'a mut Entry)>) {
        for (name, node) in self.children.iter_mut() {
            let path = join(prefix, name);
            match node {
                Node::Directory(directory) => directory.collect_files_mut(&path, files),
                Node::File(entry) => files.push((path, entry)),
            }
        }
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_owned()
    } else {
        format!("{prefix}/{name}")
    }
}
