//! Machine definitions: loading and validation.
//!
//! A definition is built once from a [`MachineDocument`] (or from templates)
//! and never mutated afterwards. Runtimes share it through an `Arc`.

use crate::document::{MachineDocument, NodeDocument, TransitionDocument};
use crate::error::{CoreError, DefinitionError};
use crate::node::NodeTemplate;
use crate::transition::TransitionTemplate;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Validated and indexed machine definition.
#[derive(Debug, Clone)]
pub struct MachineDefinition {
    /// Machine name.
    pub name: String,

    /// Variant of the machine.
    pub variant: String,

    /// Several entry nodes may exist.
    pub is_forest: bool,

    /// Node templates in declared order.
    nodes: Vec<NodeTemplate>,

    /// Node type -> position in `nodes`.
    node_index: HashMap<String, usize>,

    /// Transition templates in declared order.
    transitions: Vec<TransitionTemplate>,

    /// Transition id -> position in `transitions`.
    transition_index: HashMap<String, usize>,

    /// Hash of the definition for integrity checks.
    pub checksum: String,
}

impl MachineDefinition {
    /// Validates a parsed document.
    pub fn load(document: MachineDocument) -> Result<Self, DefinitionError> {
        let nodes = document.nodes.into_iter().map(node_from_document).collect();
        let transitions = document
            .events
            .into_iter()
            .map(transition_from_document)
            .collect();

        Self::from_templates(
            document.name,
            document.variant,
            document.is_forest,
            nodes,
            transitions,
        )
    }

    /// Builds a definition from templates, running every load-time check.
    pub fn from_templates(
        name: impl Into<String>,
        variant: impl Into<String>,
        is_forest: bool,
        nodes: Vec<NodeTemplate>,
        transitions: Vec<TransitionTemplate>,
    ) -> Result<Self, DefinitionError> {
        let transitions: Vec<TransitionTemplate> = transitions
            .into_iter()
            .map(|mut t| {
                t.to_type = t.to_type.filter(|to| !to.is_empty());
                t
            })
            .collect();

        let mut node_index = HashMap::with_capacity(nodes.len());
        for (pos, node) in nodes.iter().enumerate() {
            if node_index.insert(node.node_type.clone(), pos).is_some() {
                return Err(DefinitionError::DuplicateNodeType {
                    node_type: node.node_type.clone(),
                });
            }
        }

        let entries: Vec<String> = nodes
            .iter()
            .filter(|n| n.is_entry)
            .map(|n| n.node_type.clone())
            .collect();
        if entries.is_empty() {
            return Err(DefinitionError::NoEntryNode);
        }

        if !nodes.iter().any(|n| n.is_resolve) {
            return Err(DefinitionError::NoResolveNode);
        }

        if !is_forest && entries.len() > 1 {
            return Err(DefinitionError::MultipleEntryNodesNotAllowed { entries });
        }

        let mut transition_index = HashMap::with_capacity(transitions.len());
        for (pos, t) in transitions.iter().enumerate() {
            if transition_index.insert(t.id.clone(), pos).is_some() {
                return Err(DefinitionError::DuplicateTransitionId {
                    transition_id: t.id.clone(),
                });
            }
        }

        for t in transitions.iter().filter(|t| t.is_resolve) {
            if let Some(target) = &t.to_type {
                return Err(DefinitionError::ResolveTransitionHasTarget {
                    transition_id: t.id.clone(),
                    target: target.clone(),
                });
            }
        }

        for t in &transitions {
            if t.id.is_empty() {
                return Err(DefinitionError::EmptyTransitionId {
                    from_type: t.from_type.clone(),
                });
            }

            if !node_index.contains_key(&t.from_type) {
                return Err(DefinitionError::UnknownSourceType {
                    transition_id: t.id.clone(),
                    from_type: t.from_type.clone(),
                });
            }

            if t.is_resolve {
                continue;
            }

            match &t.to_type {
                None => {
                    return Err(DefinitionError::MissingTarget {
                        transition_id: t.id.clone(),
                    })
                }
                Some(to) if !node_index.contains_key(to) => {
                    return Err(DefinitionError::UnknownTargetType {
                        transition_id: t.id.clone(),
                        to_type: to.clone(),
                    })
                }
                Some(_) => {}
            }
        }

        let mut definition = Self {
            name: name.into(),
            variant: variant.into(),
            is_forest,
            nodes,
            node_index,
            transitions,
            transition_index,
            checksum: String::new(),
        };
        definition.checksum = definition.compute_checksum();

        let reachable = definition.reachable_types();
        let unreachable: Vec<&str> = definition
            .nodes
            .iter()
            .map(|n| n.node_type.as_str())
            .filter(|t| !reachable.contains(t))
            .collect();
        if !unreachable.is_empty() {
            tracing::debug!(
                machine = %definition.label(),
                unreachable = ?unreachable,
                "definition has nodes unreachable from its entry nodes"
            );
        }

        Ok(definition)
    }

    /// Parses and validates a definition from a JSON value.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, CoreError> {
        let document: MachineDocument = serde_json::from_value(json.clone())?;
        Ok(Self::load(document)?)
    }

    /// Parses and validates a definition from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let document: MachineDocument = serde_json::from_str(json)?;
        Ok(Self::load(document)?)
    }

    /// Parses and validates a definition from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, CoreError> {
        let document: MachineDocument = serde_yaml::from_str(yaml)?;
        Ok(Self::load(document)?)
    }

    /// Loads a definition from a file. `.yaml` and `.yml` files are read as
    /// YAML, anything else as JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        let definition = if is_yaml {
            Self::from_yaml_str(&content)?
        } else {
            Self::from_json_str(&content)?
        };

        tracing::debug!(
            path = %path.display(),
            machine = %definition.label(),
            checksum = %definition.checksum,
            "loaded machine definition"
        );

        Ok(definition)
    }

    /// Returns `name/variant`.
    pub fn label(&self) -> String {
        format!("{}/{}", self.name, self.variant)
    }

    /// Returns node templates in declared order.
    pub fn nodes(&self) -> &[NodeTemplate] {
        &self.nodes
    }

    /// Looks up a node template by type.
    pub fn node(&self, node_type: &str) -> Option<&NodeTemplate> {
        self.node_index.get(node_type).map(|&pos| &self.nodes[pos])
    }

    /// Returns entry templates in declared order.
    pub fn entry_nodes(&self) -> impl Iterator<Item = &NodeTemplate> {
        self.nodes.iter().filter(|n| n.is_entry)
    }

    /// Returns transition templates in declared order.
    pub fn transitions(&self) -> &[TransitionTemplate] {
        &self.transitions
    }

    /// Looks up a transition template by id.
    pub fn transition(&self, id: &str) -> Option<&TransitionTemplate> {
        self.transition_index
            .get(id)
            .map(|&pos| &self.transitions[pos])
    }

    /// Returns all transitions leaving `node_type`, in declared order.
    pub fn transitions_from<'a>(
        &'a self,
        node_type: &'a str,
    ) -> impl Iterator<Item = &'a TransitionTemplate> + 'a {
        self.transitions
            .iter()
            .filter(move |t| t.from_type == node_type)
    }

    /// Projects the definition back to its document form.
    pub fn to_document(&self) -> MachineDocument {
        MachineDocument {
            name: self.name.clone(),
            variant: self.variant.clone(),
            is_forest: self.is_forest,
            nodes: self
                .nodes
                .iter()
                .map(|n| NodeDocument {
                    node_type: n.node_type.clone(),
                    is_entry_node: n.is_entry,
                    is_resolve_node: n.is_resolve,
                    is_duplicate_allowed: n.allow_duplicate_instance,
                    payload: n.default_payload.clone(),
                })
                .collect(),
            events: self
                .transitions
                .iter()
                .map(|t| TransitionDocument {
                    id: t.id.clone(),
                    name: t.name.clone(),
                    from: t.from_type.clone(),
                    to: t.to_type.clone(),
                    match_condition: t.guard.clone(),
                    create_new_target: t.mint_new_instance_on_self_loop,
                    max_event_retry: t.max_retry.unwrap_or(0),
                    is_resolve_event: t.is_resolve,
                })
                .collect(),
        }
    }

    /// Collects the node types reachable from the entry nodes.
    pub fn reachable_types(&self) -> HashSet<&str> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = self.entry_nodes().map(|n| n.node_type.as_str()).collect();

        while let Some(node_type) = stack.pop() {
            if !seen.insert(node_type) {
                continue;
            }
            for t in self.transitions_from(node_type) {
                if let Some(to) = t.to_type.as_deref() {
                    stack.push(to);
                }
            }
        }

        seen
    }

    fn compute_checksum(&self) -> String {
        fn field(crc: u32, bytes: &[u8]) -> u32 {
            crc32c::crc32c_append(crc32c::crc32c_append(crc, bytes), &[0])
        }

        let mut crc = field(0, self.name.as_bytes());
        crc = field(crc, self.variant.as_bytes());
        crc = field(crc, &[self.is_forest as u8]);

        for n in &self.nodes {
            crc = field(crc, n.node_type.as_bytes());
            crc = field(
                crc,
                &[
                    n.is_entry as u8,
                    n.is_resolve as u8,
                    n.allow_duplicate_instance as u8,
                ],
            );
            crc = field(crc, n.default_payload.to_string().as_bytes());
        }

        for t in &self.transitions {
            crc = field(crc, t.id.as_bytes());
            crc = field(crc, t.name.as_bytes());
            crc = field(crc, t.from_type.as_bytes());
            crc = field(crc, t.to_type.as_deref().unwrap_or("").as_bytes());
            crc = field(crc, t.guard.to_string().as_bytes());
            crc = field(
                crc,
                &[t.mint_new_instance_on_self_loop as u8, t.is_resolve as u8],
            );
            crc = field(crc, &t.max_retry.unwrap_or(0).to_le_bytes());
        }

        format!("{:08x}", crc)
    }
}

fn node_from_document(doc: NodeDocument) -> NodeTemplate {
    NodeTemplate {
        node_type: doc.node_type,
        is_entry: doc.is_entry_node,
        is_resolve: doc.is_resolve_node,
        allow_duplicate_instance: doc.is_duplicate_allowed,
        default_payload: doc.payload,
    }
}

fn transition_from_document(doc: TransitionDocument) -> TransitionTemplate {
    let name = if doc.name.is_empty() {
        doc.id.clone()
    } else {
        doc.name
    };

    TransitionTemplate {
        id: doc.id,
        name,
        from_type: doc.from,
        to_type: doc.to,
        guard: doc.match_condition,
        mint_new_instance_on_self_loop: doc.create_new_target,
        is_resolve: doc.is_resolve_event,
        max_retry: (doc.max_event_retry > 0).then_some(doc.max_event_retry),
    }
}
