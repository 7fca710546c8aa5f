use crate::lua_value::{LuaValue, TableRef};
use crate::lua_vm::{ArithOp, LuaResult, LuaType, LuaVM};

/// Metamethod events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TmKind {
    Index,
    NewIndex,
    Eq,
    Add,
    Sub,
    Mul,
    Mod,
    Pow,
    Div,
    IDiv,
    BAnd,
    BOr,
    BXor,
    Shl,
    Shr,
    Unm,
    BNot,
    Lt,
    Le,
    Concat,
    Len,
    Call,
    ToString,
    Pairs,
    Metatable,
}

impl TmKind {
    pub const fn name(self) -> &'static str {
        match self {
            TmKind::Index => "__index",
            TmKind::NewIndex => "__newindex",
            TmKind::Eq => "__eq",
            TmKind::Add => "__add",
            TmKind::Sub => "__sub",
            TmKind::Mul => "__mul",
            TmKind::Mod => "__mod",
            TmKind::Pow => "__pow",
            TmKind::Div => "__div",
            TmKind::IDiv => "__idiv",
            TmKind::BAnd => "__band",
            TmKind::BOr => "__bor",
            TmKind::BXor => "__bxor",
            TmKind::Shl => "__shl",
            TmKind::Shr => "__shr",
            TmKind::Unm => "__unm",
            TmKind::BNot => "__bnot",
            TmKind::Lt => "__lt",
            TmKind::Le => "__le",
            TmKind::Concat => "__concat",
            TmKind::Len => "__len",
            TmKind::Call => "__call",
            TmKind::ToString => "__tostring",
            TmKind::Pairs => "__pairs",
            TmKind::Metatable => "__metatable",
        }
    }

    pub const fn from_arith(op: ArithOp) -> TmKind {
        match op {
            ArithOp::Add => TmKind::Add,
            ArithOp::Sub => TmKind::Sub,
            ArithOp::Mul => TmKind::Mul,
            ArithOp::Mod => TmKind::Mod,
            ArithOp::Pow => TmKind::Pow,
            ArithOp::Div => TmKind::Div,
            ArithOp::IDiv => TmKind::IDiv,
            ArithOp::BAnd => TmKind::BAnd,
            ArithOp::BOr => TmKind::BOr,
            ArithOp::BXor => TmKind::BXor,
            ArithOp::Shl => TmKind::Shl,
            ArithOp::Shr => TmKind::Shr,
            ArithOp::Unm => TmKind::Unm,
            ArithOp::BNot => TmKind::BNot,
        }
    }
}

/// Registry key of the shared metatable for a non-table type
fn type_metatable_key(tp: LuaType) -> LuaValue {
    LuaValue::string(&format!("_MT{}", tp as i32))
}

impl LuaVM {
    /// Tables carry their own metatable; other types share one per type in the registry
    pub(crate) fn metatable_of(&self, val: &LuaValue) -> Option<TableRef> {
        if let LuaValue::Table(t) = val {
            return t.borrow().metatable();
        }
        let key = type_metatable_key(LuaType::of(val));
        match self.registry.borrow().get(&key) {
            LuaValue::Table(mt) => Some(mt),
            _ => None,
        }
    }

    pub(crate) fn set_metatable_of(&mut self, val: &LuaValue, mt: Option<TableRef>) -> LuaResult<()> {
        if let LuaValue::Table(t) = val {
            t.borrow_mut().set_metatable(mt);
            return Ok(());
        }
        let key = type_metatable_key(LuaType::of(val));
        let mt = mt.map(LuaValue::Table).unwrap_or_default();
        self.registry.borrow_mut().put(key, mt)
    }

    pub(crate) fn get_metafield(&self, val: &LuaValue, event: TmKind) -> LuaValue {
        match self.metatable_of(val) {
            Some(mt) => mt.borrow().get_str(event.name()),
            None => LuaValue::Nil,
        }
    }

    /// Call `mm` with `args` and keep its first result
    pub(crate) fn call_metamethod(&mut self, mm: LuaValue, args: &[LuaValue]) -> LuaResult<LuaValue> {
        self.ensure_stack(args.len() + 1)?;
        self.push(mm)?;
        for arg in args {
            self.push(arg.clone())?;
        }
        self.call(args.len(), 1)?;
        self.pop_value()
    }

    /// Binary event handler from the first operand, else the second
    pub(crate) fn try_bin_metamethod(
        &mut self,
        a: &LuaValue,
        b: &LuaValue,
        event: TmKind,
    ) -> LuaResult<Option<LuaValue>> {
        let mut mm = self.get_metafield(a, event);
        if mm.is_nil() {
            mm = self.get_metafield(b, event);
        }
        if mm.is_nil() {
            return Ok(None);
        }
        self.call_metamethod(mm, &[a.clone(), b.clone()]).map(Some)
    }
}
