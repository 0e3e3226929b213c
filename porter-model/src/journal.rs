/// One node of a structured log line.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum LogNode {
    Text { text: String },
    /// Non-textual marker, e.g. a separator or progress tick.
    Marker { label: String },
}

/// One structured task log line: an ordered sequence of nodes, serialized as
/// a single JSON object per line in the on-disk log.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogLine {
    pub nodes: Vec<LogNode>,
}

impl LogLine {
    /// Line holding a single text node.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            nodes: vec![LogNode::Text { text: text.into() }],
        }
    }
}

impl std::fmt::Display for LogLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            match node {
                LogNode::Text { text } => write!(f, "{text}")?,
                LogNode::Marker { label } => write!(f, "[{label}]")?,
            }
        }
        Ok(())
    }
}
