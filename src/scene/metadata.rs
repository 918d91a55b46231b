use crate::scene::model::NodeDef;

/// Timeline shape of a scene, reduced to what duration discovery needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimelineNode {
    /// Children play one after another.
    SequentialGroup(Vec<TimelineNode>),
    /// Children play together.
    ParallelGroup(Vec<TimelineNode>),
    /// A single animation with a declared duration.
    AnimationLeaf {
        /// Declared duration in logical milliseconds.
        duration_ms: u64,
    },
    /// Anything else (visual items); only its children matter.
    Other(Vec<TimelineNode>),
}

impl TimelineNode {
    /// Reduce a document node and its subtree.
    pub fn from_node(node: &NodeDef) -> Self {
        match node {
            NodeDef::SequentialAnimation(g) => {
                Self::SequentialGroup(g.children.iter().map(Self::from_node).collect())
            }
            NodeDef::ParallelAnimation(g) => {
                Self::ParallelGroup(g.children.iter().map(Self::from_node).collect())
            }
            NodeDef::NumberAnimation(a)
            | NodeDef::PropertyAnimation(a)
            | NodeDef::RotationAnimation(a) => Self::AnimationLeaf {
                duration_ms: a.duration,
            },
            NodeDef::ColorAnimation(a) => Self::AnimationLeaf {
                duration_ms: a.duration,
            },
            NodeDef::PauseAnimation(p) => Self::AnimationLeaf {
                duration_ms: p.duration,
            },
            NodeDef::Item(_)
            | NodeDef::Rectangle(_)
            | NodeDef::Text(_)
            | NodeDef::Image(_)
            | NodeDef::Svg(_) => Self::Other(
                node.item()
                    .map(|item| item.children.iter().map(Self::from_node).collect())
                    .unwrap_or_default(),
            ),
        }
    }
}

/// Aggregate timeline duration in logical milliseconds.
///
/// Sequential groups sum their children, parallel groups take the maximum (0 when empty),
/// leaves report their declared duration, and any other node reports the first nonzero
/// duration found among its children.
pub fn compute_duration(node: &TimelineNode) -> u64 {
    match node {
        TimelineNode::SequentialGroup(children) => children
            .iter()
            .map(compute_duration)
            .fold(0u64, u64::saturating_add),
        TimelineNode::ParallelGroup(children) => {
            children.iter().map(compute_duration).max().unwrap_or(0)
        }
        TimelineNode::AnimationLeaf { duration_ms } => *duration_ms,
        TimelineNode::Other(children) => children
            .iter()
            .map(compute_duration)
            .find(|&d| d > 0)
            .unwrap_or(0),
    }
}

/// Whole seconds of a millisecond duration, truncating.
pub fn duration_secs(duration_ms: u64) -> u64 {
    duration_ms / 1000
}

#[cfg(test)]
#[path = "../../tests/unit/scene/metadata.rs"]
mod tests;
