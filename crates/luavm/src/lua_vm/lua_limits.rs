//! Centralized VM limits and configuration constants.
//!
//! Mirrors Lua 5.3's `luaconf.h` / `llimits.h` / `lua.h` values.

// ===== Stack =====

/// Minimum guaranteed stack slots available to a called function.
/// Matches Lua 5.3's LUA_MINSTACK.
pub const LUA_MINSTACK: usize = 20;

/// Default maximum stack size (number of slots).
/// Matches Lua 5.3's LUAI_MAXSTACK.
pub const LUAI_MAXSTACK: usize = 1_000_000;

/// Pseudo-index of the registry; upvalue pseudo-indices lie below it.
pub const LUA_REGISTRYINDEX: i32 = -(LUAI_MAXSTACK as i32) - 1000;

/// Registry slot holding the globals table.
pub const LUA_RIDX_GLOBALS: i64 = 2;

/// "Return every result" marker for call result counts.
pub const LUA_MULTRET: i32 = -1;

/// Default maximum function call nesting depth. Calls recurse on the host
/// stack, so hosts running deep recursion should give the VM a thread with a
/// large stack (the `lua` binary uses 16 MB).
pub const MAX_CALL_DEPTH: usize = 1000;

// ===== Instructions =====

/// Number of list items to flush per SETLIST instruction in table constructors.
pub const LFIELDS_PER_FLUSH: i64 = 50;

/// Pseudo-index of the `i`-th upvalue of the running function (1-based)
pub const fn lua_upvalue_index(i: i32) -> i32 {
    LUA_REGISTRYINDEX - i
}
