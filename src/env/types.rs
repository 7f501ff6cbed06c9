use serde::{Deserialize, Serialize};

/// Result of a single environment step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition<O> {
    pub obs: O,
    pub reward: f64,
    /// The environment reached a terminal state.
    pub terminated: bool,
    /// The episode was cut short, e.g. by a time limit.
    pub truncated: bool,
}

impl<O> Transition<O> {
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Space {
    Discrete(usize),
    Box { low: Vec<f64>, high: Vec<f64> },
}

impl Space {
    pub fn contains_action(&self, action: usize) -> bool {
        match self {
            Space::Discrete(n) => action < *n,
            Space::Box { .. } => false,
        }
    }

    /// Number of scalar components.
    pub fn dim(&self) -> usize {
        match self {
            Space::Discrete(n) => *n,
            Space::Box { low, .. } => low.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderMode {
    #[default]
    None,
    /// Text frames meant for a terminal.
    Human,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvMetadata {
    pub render_fps: u32,
}
