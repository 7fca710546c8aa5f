use super::lua_limits::{LUAI_MAXSTACK, MAX_CALL_DEPTH};

/// Runtime limits for a VM instance
#[derive(Debug, Clone)]
pub struct SafeOption {
    /// Hard cap on the slots of a single frame
    pub max_stack_size: usize,
    /// Nested calls beyond this depth raise a stack overflow
    pub max_call_depth: usize,
    /// Instructions the VM may execute before failing; `None` is unbounded
    pub instruction_budget: Option<u64>,
}

impl Default for SafeOption {
    fn default() -> Self {
        Self {
            max_stack_size: LUAI_MAXSTACK,
            max_call_depth: MAX_CALL_DEPTH,
            instruction_budget: None,
        }
    }
}
