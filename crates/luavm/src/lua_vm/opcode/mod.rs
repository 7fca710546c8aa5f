mod instruction;

pub use instruction::Instruction;

/// Instruction format modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpMode {
    IABC,
    IABx,
    IAsBx,
    IAx,
}

/// How an instruction uses its B or C operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpArgMask {
    /// argument is not used
    N,
    /// argument is used
    U,
    /// argument is a register or a jump offset
    R,
    /// argument is a constant or register/constant
    K,
}

/// Complete Lua 5.3 opcode set (47 opcodes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    Move = 0, // R(A) := R(B)
    LoadK,    // R(A) := Kst(Bx)
    LoadKX,   // R(A) := Kst(extra arg)
    LoadBool, // R(A) := (Bool)B; if (C) pc++
    LoadNil,  // R(A), R(A+1), ..., R(A+B) := nil
    GetUpval, // R(A) := UpValue[B]
    GetTabUp, // R(A) := UpValue[B][RK(C)]
    GetTable, // R(A) := R(B)[RK(C)]
    SetTabUp, // UpValue[A][RK(B)] := RK(C)
    SetUpval, // UpValue[B] := R(A)
    SetTable, // R(A)[RK(B)] := RK(C)
    NewTable, // R(A) := {} (size = B,C)
    Self_,    // R(A+1) := R(B); R(A) := R(B)[RK(C)]
    Add,      // R(A) := RK(B) + RK(C)
    Sub,      // R(A) := RK(B) - RK(C)
    Mul,      // R(A) := RK(B) * RK(C)
    Mod,      // R(A) := RK(B) % RK(C)
    Pow,      // R(A) := RK(B) ^ RK(C)
    Div,      // R(A) := RK(B) / RK(C)
    IDiv,     // R(A) := RK(B) // RK(C)
    BAnd,     // R(A) := RK(B) & RK(C)
    BOr,      // R(A) := RK(B) | RK(C)
    BXor,     // R(A) := RK(B) ~ RK(C)
    Shl,      // R(A) := RK(B) << RK(C)
    Shr,      // R(A) := RK(B) >> RK(C)
    Unm,      // R(A) := -R(B)
    BNot,     // R(A) := ~R(B)
    Not,      // R(A) := not R(B)
    Len,      // R(A) := length of R(B)
    Concat,   // R(A) := R(B).. ... ..R(C)
    Jmp,      // pc+=sBx; if (A) close all upvalues >= R(A - 1)
    Eq,       // if ((RK(B) == RK(C)) ~= A) then pc++
    Lt,       // if ((RK(B) <  RK(C)) ~= A) then pc++
    Le,       // if ((RK(B) <= RK(C)) ~= A) then pc++
    Test,     // if not (R(A) <=> C) then pc++
    TestSet,  // if (R(B) <=> C) then R(A) := R(B) else pc++
    Call,     // R(A), ... ,R(A+C-2) := R(A)(R(A+1), ... ,R(A+B-1))
    TailCall, // return R(A)(R(A+1), ... ,R(A+B-1))
    Return,   // return R(A), ... ,R(A+B-2)
    ForLoop,  // R(A)+=R(A+2); if R(A) <?= R(A+1) then { pc+=sBx; R(A+3)=R(A) }
    ForPrep,  // R(A)-=R(A+2); pc+=sBx
    TForCall, // R(A+3), ... ,R(A+2+C) := R(A)(R(A+1), R(A+2))
    TForLoop, // if R(A+1) ~= nil then { R(A)=R(A+1); pc += sBx }
    SetList,  // R(A)[(C-1)*FPF+i] := R(A+i), 1 <= i <= B
    Closure,  // R(A) := closure(KPROTO[Bx])
    Vararg,   // R(A), R(A+1), ..., R(A+B-2) = vararg
    ExtraArg, // extra (larger) argument for previous opcode
}

pub const NUM_OPCODES: usize = OpCode::ExtraArg as usize + 1;

/// Static properties of an opcode
#[derive(Debug, Clone, Copy)]
pub struct OpInfo {
    /// instruction is a test and the next one is a jump
    pub test_flag: bool,
    /// instruction sets register A
    pub set_a_flag: bool,
    pub arg_b_mode: OpArgMask,
    pub arg_c_mode: OpArgMask,
    pub op_mode: OpMode,
    pub name: &'static str,
}

const fn info(
    test_flag: bool,
    set_a_flag: bool,
    arg_b_mode: OpArgMask,
    arg_c_mode: OpArgMask,
    op_mode: OpMode,
    name: &'static str,
) -> OpInfo {
    OpInfo {
        test_flag,
        set_a_flag,
        arg_b_mode,
        arg_c_mode,
        op_mode,
        name,
    }
}

use OpArgMask::{K, N, R, U};
use OpMode::{IABC, IABx, IAsBx, IAx};

#[rustfmt::skip]
static OPCODE_INFO: [OpInfo; NUM_OPCODES] = [
    //    T      A      B  C  mode   name
    info(false, true,  R, N, IABC,  "MOVE"),
    info(false, true,  K, N, IABx,  "LOADK"),
    info(false, true,  N, N, IABx,  "LOADKX"),
    info(false, true,  U, U, IABC,  "LOADBOOL"),
    info(false, true,  U, N, IABC,  "LOADNIL"),
    info(false, true,  U, N, IABC,  "GETUPVAL"),
    info(false, true,  U, K, IABC,  "GETTABUP"),
    info(false, true,  R, K, IABC,  "GETTABLE"),
    info(false, false, K, K, IABC,  "SETTABUP"),
    info(false, false, U, N, IABC,  "SETUPVAL"),
    info(false, false, K, K, IABC,  "SETTABLE"),
    info(false, true,  U, U, IABC,  "NEWTABLE"),
    info(false, true,  R, K, IABC,  "SELF"),
    info(false, true,  K, K, IABC,  "ADD"),
    info(false, true,  K, K, IABC,  "SUB"),
    info(false, true,  K, K, IABC,  "MUL"),
    info(false, true,  K, K, IABC,  "MOD"),
    info(false, true,  K, K, IABC,  "POW"),
    info(false, true,  K, K, IABC,  "DIV"),
    info(false, true,  K, K, IABC,  "IDIV"),
    info(false, true,  K, K, IABC,  "BAND"),
    info(false, true,  K, K, IABC,  "BOR"),
    info(false, true,  K, K, IABC,  "BXOR"),
    info(false, true,  K, K, IABC,  "SHL"),
    info(false, true,  K, K, IABC,  "SHR"),
    info(false, true,  R, N, IABC,  "UNM"),
    info(false, true,  R, N, IABC,  "BNOT"),
    info(false, true,  R, N, IABC,  "NOT"),
    info(false, true,  R, N, IABC,  "LEN"),
    info(false, true,  R, R, IABC,  "CONCAT"),
    info(false, false, R, N, IAsBx, "JMP"),
    info(true,  false, K, K, IABC,  "EQ"),
    info(true,  false, K, K, IABC,  "LT"),
    info(true,  false, K, K, IABC,  "LE"),
    info(true,  false, N, U, IABC,  "TEST"),
    info(true,  true,  R, U, IABC,  "TESTSET"),
    info(false, true,  U, U, IABC,  "CALL"),
    info(false, true,  U, U, IABC,  "TAILCALL"),
    info(false, false, U, N, IABC,  "RETURN"),
    info(false, true,  R, N, IAsBx, "FORLOOP"),
    info(false, true,  R, N, IAsBx, "FORPREP"),
    info(false, false, N, U, IABC,  "TFORCALL"),
    info(false, true,  R, N, IAsBx, "TFORLOOP"),
    info(false, false, U, U, IABC,  "SETLIST"),
    info(false, true,  U, N, IABx,  "CLOSURE"),
    info(false, true,  U, N, IABC,  "VARARG"),
    info(false, false, U, U, IAx,   "EXTRAARG"),
];

impl OpCode {
    const ALL: [OpCode; NUM_OPCODES] = [
        OpCode::Move,
        OpCode::LoadK,
        OpCode::LoadKX,
        OpCode::LoadBool,
        OpCode::LoadNil,
        OpCode::GetUpval,
        OpCode::GetTabUp,
        OpCode::GetTable,
        OpCode::SetTabUp,
        OpCode::SetUpval,
        OpCode::SetTable,
        OpCode::NewTable,
        OpCode::Self_,
        OpCode::Add,
        OpCode::Sub,
        OpCode::Mul,
        OpCode::Mod,
        OpCode::Pow,
        OpCode::Div,
        OpCode::IDiv,
        OpCode::BAnd,
        OpCode::BOr,
        OpCode::BXor,
        OpCode::Shl,
        OpCode::Shr,
        OpCode::Unm,
        OpCode::BNot,
        OpCode::Not,
        OpCode::Len,
        OpCode::Concat,
        OpCode::Jmp,
        OpCode::Eq,
        OpCode::Lt,
        OpCode::Le,
        OpCode::Test,
        OpCode::TestSet,
        OpCode::Call,
        OpCode::TailCall,
        OpCode::Return,
        OpCode::ForLoop,
        OpCode::ForPrep,
        OpCode::TForCall,
        OpCode::TForLoop,
        OpCode::SetList,
        OpCode::Closure,
        OpCode::Vararg,
        OpCode::ExtraArg,
    ];

    /// Decode an opcode number; `None` for values outside the instruction set
    pub fn from_u8(byte: u8) -> Option<Self> {
        Self::ALL.get(byte as usize).copied()
    }

    pub fn info(self) -> &'static OpInfo {
        &OPCODE_INFO[self as usize]
    }

    pub fn get_mode(self) -> OpMode {
        self.info().op_mode
    }

    pub fn arg_b_mode(self) -> OpArgMask {
        self.info().arg_b_mode
    }

    pub fn arg_c_mode(self) -> OpArgMask {
        self.info().arg_c_mode
    }

    pub fn test_flag(self) -> bool {
        self.info().test_flag
    }

    pub fn set_a_flag(self) -> bool {
        self.info().set_a_flag
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }
}
