use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_LINK_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Upper bound on link hops followed when borrowing through a capability.
    pub max_link_depth: usize,
    /// Forward transaction `log` lines to the `log` facade at info level.
    pub echo_logs: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_link_depth: DEFAULT_MAX_LINK_DEPTH,
            echo_logs: false,
        }
    }
}
