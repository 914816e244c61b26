/*!
In-memory document tree for tests.

Children keep insertion order, and individual calls can be made to fail so the
best-effort paths of discovery can be exercised. Call counters let tests check how
often the (possibly expensive) provider was queried.
*/

use super::DocumentTree;
use crate::{Result, VaultError};
use std::collections::{HashMap, HashSet};
use std::io::{self, Cursor, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Handle into a [`MemoryDocumentTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
struct Node {
    name: String,
    is_dir: bool,
    children: Vec<NodeId>,
    content: Arc<Mutex<Vec<u8>>>,
    deleted: bool,
}

#[derive(Debug, Default)]
struct Faults {
    list: HashSet<NodeId>,
    find: HashSet<NodeId>,
    delete: HashSet<NodeId>,
    create: HashSet<String>,
}

/// Memory-backed document tree with fault injection
#[derive(Debug)]
pub struct MemoryDocumentTree {
    nodes: Mutex<Vec<Node>>,
    locations: Mutex<HashMap<String, NodeId>>,
    faults: Mutex<Faults>,
    name_calls: AtomicUsize,
    is_directory_calls: AtomicUsize,
}

impl Default for MemoryDocumentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentTree {
    /// Authority reported for registered locations
    pub const AUTHORITY: &'static str = "setvault.memory";

    pub fn new() -> Self {
        let top = Node {
            name: String::new(),
            is_dir: true,
            children: Vec::new(),
            content: Arc::default(),
            deleted: false,
        };
        Self {
            nodes: Mutex::new(vec![top]),
            locations: Mutex::new(HashMap::new()),
            faults: Mutex::new(Faults::default()),
            name_calls: AtomicUsize::new(0),
            is_directory_calls: AtomicUsize::new(0),
        }
    }

    /// The unnamed top-level directory
    pub fn top(&self) -> NodeId {
        NodeId(0)
    }

    /// Make `location` resolve to `dir`
    pub fn register_location(&self, location: &str, dir: NodeId) {
        self.locations
            .lock()
            .unwrap()
            .insert(location.to_string(), dir);
    }

    /// Build a directory path below `parent`, creating missing parts
    pub fn mkdirs(&self, parent: NodeId, path: &str) -> NodeId {
        path.split('/')
            .filter(|p| !p.is_empty())
            .fold(parent, |dir, part| {
                self.create_or_get_directory(&dir, part).unwrap()
            })
    }

    /// Create a file at `path` below `parent` with the given content
    pub fn put_file(&self, parent: NodeId, path: &str, content: &[u8]) -> NodeId {
        let (dirs, name) = path.rsplit_once('/').unwrap_or(("", path));
        let dir = self.mkdirs(parent, dirs);
        let file = self.create_or_get_file(&dir, name).unwrap();
        self.open_write(&file).unwrap().write_all(content).unwrap();
        file
    }

    pub fn fail_listing(&self, dir: NodeId) {
        self.faults.lock().unwrap().list.insert(dir);
    }

    pub fn fail_find(&self, dir: NodeId) {
        self.faults.lock().unwrap().find.insert(dir);
    }

    pub fn fail_delete(&self, doc: NodeId) {
        self.faults.lock().unwrap().delete.insert(doc);
    }

    /// Fail every creation of a document with this name
    pub fn fail_create(&self, name: &str) {
        self.faults.lock().unwrap().create.insert(name.to_string());
    }

    pub fn name_calls(&self) -> usize {
        self.name_calls.load(Ordering::SeqCst)
    }

    pub fn is_directory_calls(&self) -> usize {
        self.is_directory_calls.load(Ordering::SeqCst)
    }

    fn injected(op: &str) -> VaultError {
        VaultError::Io(io::Error::new(
            io::ErrorKind::Other,
            format!("injected {op} failure"),
        ))
    }

    fn live(nodes: &[Node], id: NodeId) -> Result<&Node> {
        nodes
            .get(id.0)
            .filter(|n| !n.deleted)
            .ok_or_else(|| VaultError::Io(io::Error::new(io::ErrorKind::NotFound, "stale handle")))
    }

    fn create(&self, parent: NodeId, name: &str, is_dir: bool) -> Result<NodeId> {
        if self.faults.lock().unwrap().create.contains(name) {
            return Err(Self::injected("create"));
        }
        let mut nodes = self.nodes.lock().unwrap();
        let parent_node = Self::live(&nodes, parent)?;
        if !parent_node.is_dir {
            return Err(VaultError::io("parent is not a directory"));
        }
        let clash = parent_node
            .children
            .iter()
            .any(|c| !nodes[c.0].deleted && nodes[c.0].name == name);
        if clash {
            return Err(VaultError::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{name} already exists"),
            )));
        }
        let id = NodeId(nodes.len());
        nodes.push(Node {
            name: name.to_string(),
            is_dir,
            children: Vec::new(),
            content: Arc::default(),
            deleted: false,
        });
        nodes[parent.0].children.push(id);
        Ok(id)
    }

    fn mark_deleted(nodes: &mut [Node], id: NodeId) {
        let children = std::mem::take(&mut nodes[id.0].children);
        for child in children {
            Self::mark_deleted(nodes, child);
        }
        nodes[id.0].deleted = true;
    }
}

/// Writer that replaces a node's content when dropped or flushed
struct MemoryWriter {
    target: Arc<Mutex<Vec<u8>>>,
    buffer: Vec<u8>,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        self.flush()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        *self.target.lock().unwrap() = self.buffer.clone();
        Ok(())
    }
}

impl DocumentTree for MemoryDocumentTree {
    type Handle = NodeId;

    fn name(&self, doc: &NodeId) -> Option<String> {
        self.name_calls.fetch_add(1, Ordering::SeqCst);
        let nodes = self.nodes.lock().unwrap();
        Self::live(&nodes, *doc).ok().map(|n| n.name.clone())
    }

    fn is_directory(&self, doc: &NodeId) -> bool {
        self.is_directory_calls.fetch_add(1, Ordering::SeqCst);
        let nodes = self.nodes.lock().unwrap();
        Self::live(&nodes, *doc).map(|n| n.is_dir).unwrap_or(false)
    }

    fn list_children(&self, dir: &NodeId) -> Result<Vec<NodeId>> {
        if self.faults.lock().unwrap().list.contains(dir) {
            return Err(Self::injected("list"));
        }
        let nodes = self.nodes.lock().unwrap();
        let node = Self::live(&nodes, *dir)?;
        Ok(node
            .children
            .iter()
            .copied()
            .filter(|c| !nodes[c.0].deleted)
            .collect())
    }

    fn find_child(&self, dir: &NodeId, name: &str) -> Result<Option<NodeId>> {
        if self.faults.lock().unwrap().find.contains(dir) {
            return Err(Self::injected("find"));
        }
        let nodes = self.nodes.lock().unwrap();
        let node = Self::live(&nodes, *dir)?;
        Ok(node
            .children
            .iter()
            .copied()
            .find(|c| !nodes[c.0].deleted && nodes[c.0].name == name))
    }

    fn create_directory(&self, parent: &NodeId, name: &str) -> Result<NodeId> {
        self.create(*parent, name, true)
    }

    fn create_file(&self, parent: &NodeId, name: &str) -> Result<NodeId> {
        self.create(*parent, name, false)
    }

    fn delete(&self, doc: &NodeId) -> Result<()> {
        if self.faults.lock().unwrap().delete.contains(doc) {
            return Err(Self::injected("delete"));
        }
        let mut nodes = self.nodes.lock().unwrap();
        Self::live(&nodes, *doc)?;
        Self::mark_deleted(&mut nodes, *doc);
        Ok(())
    }

    fn open_read(&self, doc: &NodeId) -> Result<Box<dyn Read + Send>> {
        let nodes = self.nodes.lock().unwrap();
        let node = Self::live(&nodes, *doc)?;
        let content = node.content.lock().unwrap().clone();
        Ok(Box::new(Cursor::new(content)))
    }

    fn open_write(&self, doc: &NodeId) -> Result<Box<dyn Write + Send>> {
        let nodes = self.nodes.lock().unwrap();
        let node = Self::live(&nodes, *doc)?;
        node.content.lock().unwrap().clear();
        Ok(Box::new(MemoryWriter {
            target: Arc::clone(&node.content),
            buffer: Vec::new(),
        }))
    }

    fn resolve(&self, location: &str) -> Option<NodeId> {
        self.locations.lock().unwrap().get(location).copied()
    }

    fn authority(&self, location: &str) -> Option<String> {
        self.resolve(location).map(|_| Self::AUTHORITY.to_string())
    }
}
