use serde::{Deserialize, Serialize};

/// Estado de un nodo del grafo.
///
/// Transiciones válidas:
/// - PENDING -> READY (todas las dependencias SUCCEEDED)
/// - PENDING -> CANCELLED (alguna dependencia falló o se canceló la run)
/// - PENDING -> FAILED (settings inválidos, sin lanzar proceso)
/// - READY -> RUNNING | CANCELLED
/// - RUNNING -> SUCCEEDED | FAILED | CANCELLED
///
/// Los tres últimos son terminales y no cambian nunca más.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    Pending,
    Ready,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl NodeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, NodeStatus::Succeeded | NodeStatus::Failed | NodeStatus::Cancelled)
    }

    pub fn can_transition_to(self, next: NodeStatus) -> bool {
        use NodeStatus::*;
        matches!((self, next),
                 (Pending, Ready)
                 | (Pending, Cancelled)
                 | (Pending, Failed)
                 | (Ready, Running)
                 | (Ready, Cancelled)
                 | (Running, Succeeded)
                 | (Running, Failed)
                 | (Running, Cancelled))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeStatus::Pending => "PENDING",
            NodeStatus::Ready => "READY",
            NodeStatus::Running => "RUNNING",
            NodeStatus::Succeeded => "SUCCEEDED",
            NodeStatus::Failed => "FAILED",
            NodeStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::NodeStatus::*;

    #[test]
    fn terminal_states_never_move() {
        for t in [Succeeded, Failed, Cancelled] {
            assert!(t.is_terminal());
            for n in [Pending, Ready, Running, Succeeded, Failed, Cancelled] {
                assert!(!t.can_transition_to(n));
            }
        }
        assert!(!Pending.can_transition_to(Running));
        assert!(Ready.can_transition_to(Running));
    }
}
