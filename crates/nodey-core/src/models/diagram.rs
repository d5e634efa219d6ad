//! The flowchart under construction.
//!
//! Field names on the wire (`type`, `x`, `y`) match the files written by
//! earlier releases so that any saved `*_flow.json` loads as a baseline.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Minimum number of nodes an accepted diagram must carry.
pub const MIN_NODES: usize = 2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Start,
    Trigger,
    Action,
    Decision,
    End,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Trigger => "trigger",
            Self::Action => "action",
            Self::Decision => "decision",
            Self::End => "end",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionLabel {
    #[default]
    Out,
    Yes,
    No,
}

impl ConnectionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Out => "out",
            Self::Yes => "yes",
            Self::No => "no",
        }
    }

    /// `yes`/`no` are reserved for edges leaving a decision node.
    pub fn is_branch(&self) -> bool {
        matches!(self, Self::Yes | Self::No)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Overview {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
}

/// Advisory layout hint; the orchestrator never recomputes it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Position {
    #[serde(default)]
    pub x: i64,
    #[serde(default)]
    pub y: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(flatten)]
    pub position: Position,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub notes: String,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            position: Position::default(),
            title: title.into(),
            notes: String::new(),
        }
    }

    pub fn at(mut self, x: i64, y: i64) -> Self {
        self.position = Position { x, y };
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Connection {
    pub from: String,
    pub to: String,
    #[serde(rename = "type", default)]
    pub label: ConnectionLabel,
}

impl Connection {
    pub fn new(from: impl Into<String>, to: impl Into<String>, label: ConnectionLabel) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            label,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Diagram {
    #[serde(default)]
    pub overview: Overview,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl Diagram {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn has_minimum_nodes(&self) -> bool {
        self.nodes.len() >= MIN_NODES
    }

    /// Check the structural rules a drafted diagram must satisfy before it is
    /// handed to review: enough nodes, unique ids, no dangling edges, and
    /// branch labels only on edges leaving a decision.
    pub fn validate(&self) -> Result<(), String> {
        if !self.has_minimum_nodes() {
            return Err(format!(
                "diagram has {} node(s), at least {} required",
                self.nodes.len(),
                MIN_NODES
            ));
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if node.id.trim().is_empty() {
                return Err("node with empty id".to_string());
            }
            if !seen.insert(node.id.as_str()) {
                return Err(format!("duplicate node id '{}'", node.id));
            }
        }

        for conn in &self.connections {
            let Some(from) = self.node(&conn.from) else {
                return Err(format!("connection from unknown node '{}'", conn.from));
            };
            if self.node(&conn.to).is_none() {
                return Err(format!("connection to unknown node '{}'", conn.to));
            }
            if conn.label.is_branch() && from.kind != NodeKind::Decision {
                return Err(format!(
                    "'{}' edge leaves non-decision node '{}'",
                    conn.label.as_str(),
                    conn.from
                ));
            }
        }

        Ok(())
    }
}
