//! The editable document: a tree of JSX elements with JSON prop bags.
//!
//! This is the in-memory stand-in for the project source. Elements live in a
//! `StableDiGraph` so indices survive reorders and reparents; an index from
//! `ElementPath` to `NodeIndex` is rebuilt whenever the tree shape changes.
//!
//! Mutations only ever arrive as [`DocumentPatch`] values through the
//! [`DocumentPatchSink`] trait.

use crate::path::{ElementPath, Uid};
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

// ─── Elements ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    #[default]
    Element,
    /// `<>...</>`: renders its children with no box of its own.
    Fragment,
}

/// One JSX element in the document tree.
#[derive(Debug, Clone, PartialEq)]
pub struct JsxElement {
    pub uid: Uid,
    /// Tag or component name (`div`, `Group`, `App`).
    pub name: String,
    pub kind: ElementKind,
    /// Component instance: its children start a new path part.
    pub instance: bool,
    pub props: Map<String, Value>,
}

// ─── Property paths ─────────────────────────────────────────────────────

/// Dotted key into an element's prop bag, e.g. `style.left`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    keys: SmallVec<[String; 3]>,
}

impl PropertyPath {
    pub fn new<S: AsRef<str>>(keys: &[S]) -> Self {
        Self {
            keys: keys.iter().map(|k| k.as_ref().to_string()).collect(),
        }
    }

    /// `style.<key>`
    pub fn style(key: &str) -> Self {
        Self::new(&["style", key])
    }

    pub fn parse(dotted: &str) -> Self {
        Self {
            keys: dotted.split('.').filter(|k| !k.is_empty()).map(String::from).collect(),
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn last_key(&self) -> Option<&str> {
        self.keys.last().map(String::as_str)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.keys.join("."))
    }
}

impl fmt::Debug for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyPath({self})")
    }
}

impl Serialize for PropertyPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PropertyPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(PropertyPath::parse(&s))
    }
}

/// Read a nested value out of a prop bag.
pub fn get_prop<'a>(props: &'a Map<String, Value>, prop: &PropertyPath) -> Option<&'a Value> {
    let (first, rest) = prop.keys.split_first()?;
    let mut current = props.get(first)?;
    for key in rest {
        current = current.as_object()?.get(key)?;
    }
    Some(current)
}

/// `style.<key>` shortcut used all over the measurer and strategies.
pub fn style_prop<'a>(props: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    props.get("style")?.as_object()?.get(key)
}

// ─── Patches ────────────────────────────────────────────────────────────

/// One structural mutation of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentPatch {
    SetProp {
        path: ElementPath,
        prop: PropertyPath,
        value: Value,
    },
    RemoveProp {
        path: ElementPath,
        prop: PropertyPath,
    },
    /// Move an element to `index` among its siblings.
    Reorder { path: ElementPath, index: usize },
    /// Move an element under `new_parent`, appended when `index` is `None`.
    Reparent {
        path: ElementPath,
        new_parent: ElementPath,
        index: Option<usize>,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum DocumentError {
    #[error("element {0} not found")]
    ElementNotFound(ElementPath),
    #[error("property {prop} cannot be resolved on {path}")]
    PropertyPathUnresolvable { path: ElementPath, prop: PropertyPath },
    #[error("cannot move {path} under {new_parent}")]
    InvalidReparent {
        path: ElementPath,
        new_parent: ElementPath,
    },
    #[error("duplicate element path {0}")]
    DuplicatePath(ElementPath),
    #[error("invalid scene: {0}")]
    Scene(String),
}

/// Receives document mutations. Source rewriting is the implementor's job.
pub trait DocumentPatchSink {
    fn apply_patches(&mut self, patches: &[DocumentPatch]) -> Result<(), DocumentError>;
}

// ─── Scene fixtures ─────────────────────────────────────────────────────

/// Serializable description of an element tree.
///
/// ```json
/// { "uid": "sb", "children": [{ "uid": "scene", "props": { "style": { "width": 400 } } }] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneElement {
    pub uid: String,
    #[serde(default = "default_element_name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub fragment: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub instance: bool,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub props: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SceneElement>,
}

fn default_element_name() -> String {
    "div".to_string()
}

fn is_false(b: &bool) -> bool {
    !*b
}

// ─── Document ───────────────────────────────────────────────────────────

/// The element tree. Edges go parent → child.
#[derive(Debug, Clone)]
pub struct Document {
    pub graph: StableDiGraph<JsxElement, ()>,
    pub root: NodeIndex,
    path_index: HashMap<ElementPath, NodeIndex>,
    node_paths: HashMap<NodeIndex, ElementPath>,
    child_order: HashMap<NodeIndex, Vec<NodeIndex>>,
}

impl Document {
    /// Build a document from a scene description.
    pub fn from_scene(scene: &SceneElement) -> Result<Self, DocumentError> {
        let mut graph = StableDiGraph::new();
        let mut child_order = HashMap::new();
        let root = add_scene_element(&mut graph, &mut child_order, scene);
        let mut doc = Self {
            graph,
            root,
            path_index: HashMap::new(),
            node_paths: HashMap::new(),
            child_order,
        };
        doc.rebuild_index()?;
        Ok(doc)
    }

    /// Parse a JSON scene fixture.
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        let scene: SceneElement =
            serde_json::from_str(json).map_err(|e| DocumentError::Scene(e.to_string()))?;
        Self::from_scene(&scene)
    }

    /// Serialize back to a scene description (used to compare documents).
    pub fn to_scene(&self) -> SceneElement {
        self.scene_of(self.root)
    }

    fn scene_of(&self, idx: NodeIndex) -> SceneElement {
        let el = &self.graph[idx];
        SceneElement {
            uid: el.uid.as_str().to_string(),
            name: el.name.clone(),
            fragment: el.kind == ElementKind::Fragment,
            instance: el.instance,
            props: el.props.clone(),
            children: self
                .children_of(idx)
                .into_iter()
                .map(|c| self.scene_of(c))
                .collect(),
        }
    }

    pub fn root_path(&self) -> Option<&ElementPath> {
        self.node_paths.get(&self.root)
    }

    pub fn index_of(&self, path: &ElementPath) -> Option<NodeIndex> {
        self.path_index.get(path).copied()
    }

    pub fn path_of(&self, idx: NodeIndex) -> Option<&ElementPath> {
        self.node_paths.get(&idx)
    }

    pub fn element(&self, path: &ElementPath) -> Option<&JsxElement> {
        self.index_of(path).map(|idx| &self.graph[idx])
    }

    pub fn props(&self, path: &ElementPath) -> Option<&Map<String, Value>> {
        self.element(path).map(|el| &el.props)
    }

    pub fn get_prop(&self, path: &ElementPath, prop: &PropertyPath) -> Option<&Value> {
        self.props(path).and_then(|props| get_prop(props, prop))
    }

    pub fn parent_of(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .next()
    }

    /// Children in document order.
    pub fn children_of(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.child_order.get(&idx).cloned().unwrap_or_default()
    }

    pub fn children_paths(&self, path: &ElementPath) -> Vec<ElementPath> {
        self.index_of(path)
            .map(|idx| {
                self.children_of(idx)
                    .into_iter()
                    .filter_map(|c| self.node_paths.get(&c).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All paths, pre-order (parents before children, siblings in order).
    pub fn paths(&self) -> Vec<ElementPath> {
        let mut out = Vec::with_capacity(self.node_paths.len());
        let mut stack = vec![self.root];
        while let Some(idx) = stack.pop() {
            if let Some(path) = self.node_paths.get(&idx) {
                out.push(path.clone());
            }
            stack.extend(self.children_of(idx).into_iter().rev());
        }
        out
    }

    /// Path a child with `uid` would get under `parent`.
    pub fn child_path(&self, parent: &ElementPath, uid: Uid) -> Option<ElementPath> {
        let el = self.element(parent)?;
        Some(if el.instance {
            parent.append_part(uid)
        } else {
            parent.child(uid)
        })
    }

    /// Prop bags keyed by path.
    pub fn all_element_props(&self) -> HashMap<ElementPath, Map<String, Value>> {
        self.path_index
            .iter()
            .map(|(path, idx)| (path.clone(), self.graph[*idx].props.clone()))
            .collect()
    }

    /// Recompute every element path from the tree shape. The old index is
    /// left untouched when two elements would share a path.
    fn rebuild_index(&mut self) -> Result<(), DocumentError> {
        let mut path_index = HashMap::with_capacity(self.path_index.len());
        let mut node_paths = HashMap::with_capacity(self.node_paths.len());
        let root_uid = self.graph[self.root].uid;
        let mut stack = vec![(self.root, ElementPath::from_uids(&[root_uid.as_str()]))];
        while let Some((idx, path)) = stack.pop() {
            let instance = self.graph[idx].instance;
            for child in self.children_of(idx) {
                let uid = self.graph[child].uid;
                let child_path = if instance {
                    path.append_part(uid)
                } else {
                    path.child(uid)
                };
                stack.push((child, child_path));
            }
            if path_index.insert(path.clone(), idx).is_some() {
                return Err(DocumentError::DuplicatePath(path));
            }
            node_paths.insert(idx, path);
        }
        self.path_index = path_index;
        self.node_paths = node_paths;
        Ok(())
    }

    fn node_for(&self, path: &ElementPath) -> Result<NodeIndex, DocumentError> {
        self.index_of(path)
            .ok_or_else(|| DocumentError::ElementNotFound(path.clone()))
    }

    fn set_prop(
        &mut self,
        path: &ElementPath,
        prop: &PropertyPath,
        value: Value,
    ) -> Result<(), DocumentError> {
        let idx = self.node_for(path)?;
        let unresolvable = || DocumentError::PropertyPathUnresolvable {
            path: path.clone(),
            prop: prop.clone(),
        };
        let (last, parents) = prop.keys.split_last().ok_or_else(unresolvable)?;
        let mut current = &mut self.graph[idx].props;
        for key in parents {
            let entry = current
                .entry(key.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            current = entry.as_object_mut().ok_or_else(unresolvable)?;
        }
        current.insert(last.clone(), value);
        Ok(())
    }

    /// Removing a prop that is already absent is not an error.
    fn remove_prop(&mut self, path: &ElementPath, prop: &PropertyPath) -> Result<(), DocumentError> {
        let idx = self.node_for(path)?;
        let Some((last, parents)) = prop.keys.split_last() else {
            return Err(DocumentError::PropertyPathUnresolvable {
                path: path.clone(),
                prop: prop.clone(),
            });
        };
        let mut current = &mut self.graph[idx].props;
        for key in parents {
            match current.get_mut(key).and_then(Value::as_object_mut) {
                Some(next) => current = next,
                None => return Ok(()),
            }
        }
        current.remove(last);
        Ok(())
    }

    fn reorder(&mut self, path: &ElementPath, index: usize) -> Result<(), DocumentError> {
        let idx = self.node_for(path)?;
        let parent = self
            .parent_of(idx)
            .ok_or_else(|| DocumentError::ElementNotFound(path.clone()))?;
        let order = self.child_order.entry(parent).or_default();
        order.retain(|&c| c != idx);
        let index = index.min(order.len());
        order.insert(index, idx);
        Ok(())
    }

    fn reparent(
        &mut self,
        path: &ElementPath,
        new_parent: &ElementPath,
        index: Option<usize>,
    ) -> Result<(), DocumentError> {
        let idx = self.node_for(path)?;
        let new_parent_idx = self.node_for(new_parent)?;
        if new_parent.is_descendant_or_equal(path) {
            return Err(DocumentError::InvalidReparent {
                path: path.clone(),
                new_parent: new_parent.clone(),
            });
        }
        // a sibling with the same uid under the new parent
        let moved_path = self
            .child_path(new_parent, self.graph[idx].uid)
            .ok_or_else(|| DocumentError::ElementNotFound(new_parent.clone()))?;
        if self.index_of(&moved_path).is_some_and(|other| other != idx) {
            return Err(DocumentError::DuplicatePath(moved_path));
        }
        if let Some(old_parent) = self.parent_of(idx) {
            if let Some(edge) = self.graph.find_edge(old_parent, idx) {
                self.graph.remove_edge(edge);
            }
            if let Some(order) = self.child_order.get_mut(&old_parent) {
                order.retain(|&c| c != idx);
            }
        }
        self.graph.add_edge(new_parent_idx, idx, ());
        let order = self.child_order.entry(new_parent_idx).or_default();
        let index = index.unwrap_or(order.len()).min(order.len());
        order.insert(index, idx);
        self.rebuild_index()
    }
}

fn add_scene_element(
    graph: &mut StableDiGraph<JsxElement, ()>,
    child_order: &mut HashMap<NodeIndex, Vec<NodeIndex>>,
    scene: &SceneElement,
) -> NodeIndex {
    let idx = graph.add_node(JsxElement {
        uid: Uid::intern(&scene.uid),
        name: scene.name.clone(),
        kind: if scene.fragment {
            ElementKind::Fragment
        } else {
            ElementKind::Element
        },
        instance: scene.instance,
        props: scene.props.clone(),
    });
    let children: Vec<NodeIndex> = scene
        .children
        .iter()
        .map(|child| {
            let c = add_scene_element(graph, child_order, child);
            graph.add_edge(idx, c, ());
            c
        })
        .collect();
    child_order.insert(idx, children);
    idx
}

impl DocumentPatchSink for Document {
    fn apply_patches(&mut self, patches: &[DocumentPatch]) -> Result<(), DocumentError> {
        for patch in patches {
            log::trace!("document patch: {patch:?}");
            match patch {
                DocumentPatch::SetProp { path, prop, value } => {
                    self.set_prop(path, prop, value.clone())?
                }
                DocumentPatch::RemoveProp { path, prop } => self.remove_prop(path, prop)?,
                DocumentPatch::Reorder { path, index } => self.reorder(path, *index)?,
                DocumentPatch::Reparent {
                    path,
                    new_parent,
                    index,
                } => self.reparent(path, new_parent, *index)?,
            }
        }
        Ok(())
    }
}
