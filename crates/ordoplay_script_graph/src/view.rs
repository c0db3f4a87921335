// SPDX-License-Identifier: MIT OR Apache-2.0
//! Presentation data for rendering collaborators.
//!
//! Views are plain data computed from the model in graph space. Building a
//! view never mutates the model, and the same node always yields the same
//! view.

use crate::connection::ConnectionId;
use crate::node::{CompareOp, Node, NodeCategory, NodeId, NodeKind};
use crate::port::{PortDirection, PortId};
use crate::state::State;

/// Node visual dimensions
pub const NODE_WIDTH: f32 = 180.0;
/// Height of the title bar
pub const NODE_HEADER_HEIGHT: f32 = 24.0;
/// Vertical space per port row
pub const PORT_HEIGHT: f32 = 22.0;
const NODE_FOOTER: f32 = 8.0;

/// Port as drawn on a node
#[derive(Debug, Clone, PartialEq)]
pub struct PortView {
    /// Port ID
    pub id: PortId,
    /// Label
    pub name: String,
    /// Side of the node
    pub direction: PortDirection,
    /// Whether this is an event port
    pub is_event: bool,
    /// Pin color
    pub color: [u8; 3],
    /// Pin center in graph space
    pub anchor: [f32; 2],
    /// Literal default shown next to an unconnected input
    pub default_label: Option<String>,
}

/// Node as drawn on the canvas
#[derive(Debug, Clone, PartialEq)]
pub struct NodeView {
    /// Node ID
    pub id: NodeId,
    /// Title bar text
    pub title: String,
    /// Palette category
    pub category: NodeCategory,
    /// Title bar color
    pub header_color: [u8; 3],
    /// Top-left corner in graph space
    pub location: [f32; 2],
    /// Width and height
    pub size: [f32; 2],
    /// Comment bubble text, empty for none
    pub comment: String,
    /// Ports in port order
    pub ports: Vec<PortView>,
}

impl NodeView {
    /// Whether a graph-space point lies inside the node
    pub fn contains(&self, point: [f32; 2]) -> bool {
        let [x, y] = self.location;
        let [w, h] = self.size;
        point[0] >= x && point[0] <= x + w && point[1] >= y && point[1] <= y + h
    }

    /// Anchor of one of the node's ports
    pub fn anchor(&self, port: PortId) -> Option<[f32; 2]> {
        self.ports.iter().find(|p| p.id == port).map(|p| p.anchor)
    }
}

/// Connection as drawn between two nodes
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionView {
    /// Connection ID
    pub id: ConnectionId,
    /// Source pin in graph space
    pub from: [f32; 2],
    /// Target pin in graph space
    pub to: [f32; 2],
    /// Wire color, taken from the source port
    pub color: [u8; 3],
}

fn title(kind: &NodeKind) -> String {
    match kind {
        NodeKind::EventReceiver { event } => format!("On {event}"),
        NodeKind::EventEmitter { event } => format!("Emit {event}"),
        NodeKind::Action { action } => action.clone(),
        NodeKind::Condition { op: CompareOp::IsTrue } => String::from("Branch"),
        NodeKind::Condition { op } => format!("Branch (A {} B)", op.symbol()),
        NodeKind::Variable { variable } => variable.clone(),
        NodeKind::Constant { value } => value.to_string(),
        NodeKind::StateSwitch { .. } => String::from("Switch State"),
    }
}

impl Node {
    /// Build the presentation view of this node
    pub fn create_view(&self) -> NodeView {
        let [x, y] = self.location();
        let mut rows = [0usize; 2];
        let ports: Vec<PortView> = self
            .ports()
            .iter()
            .map(|port| {
                let (side, px) = match port.direction() {
                    PortDirection::Input => (0, x),
                    PortDirection::Output => (1, x + NODE_WIDTH),
                };
                let row = rows[side];
                rows[side] += 1;

                PortView {
                    id: port.id(),
                    name: port.name().to_string(),
                    direction: port.direction(),
                    is_event: port.is_event(),
                    color: port.kind().color(),
                    anchor: [px, y + NODE_HEADER_HEIGHT + row as f32 * PORT_HEIGHT + PORT_HEIGHT / 2.0],
                    default_label: port.effective_default().map(ToString::to_string),
                }
            })
            .collect();

        let row_count = rows[0].max(rows[1]);
        let category = self.kind().category();
        NodeView {
            id: self.id(),
            title: title(self.kind()),
            category,
            header_color: category.header_color(),
            location: [x, y],
            size: [NODE_WIDTH, NODE_HEADER_HEIGHT + row_count as f32 * PORT_HEIGHT + NODE_FOOTER],
            comment: self.comment().to_string(),
            ports,
        }
    }
}

impl State {
    /// Views of every node in node order
    pub fn node_views(&self) -> Vec<NodeView> {
        self.nodes().map(Node::create_view).collect()
    }

    /// Views of every connection whose endpoints exist
    pub fn connection_views(&self) -> Vec<ConnectionView> {
        self.connections()
            .filter_map(|c| {
                let from_node = self.node(c.from_node)?;
                let to_node = self.node(c.to_node)?;
                let color = from_node.port(c.from_port)?.kind().color();
                Some(ConnectionView {
                    id: c.id,
                    from: from_node.create_view().anchor(c.from_port)?,
                    to: to_node.create_view().anchor(c.to_port)?,
                    color,
                })
            })
            .collect()
    }
}
