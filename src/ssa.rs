//! Lowered SSA-style program representation.
//!
//! This is the instruction graph the analysis consumes. It is produced by
//! an external front end (the lowering itself is out of scope here) and
//! handed over fully materialized, either built through [`ProgramBuilder`]
//! or deserialized from JSON. Everything in this module is a plain value
//! graph keyed by integer IDs; the analysis only ever reads it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a function in the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FuncId(pub u32);

/// Identifier of an SSA value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueId(pub u32);

/// Identifier of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstrId(pub u32);

/// Identifier of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub u32);

/// Source position (1-based line and column; zero means unknown).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pos {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Pos {
    pub fn new(file: &str, line: u32, column: u32) -> Self {
        Self {
            file: file.to_string(),
            line,
            column,
        }
    }

    /// An unknown position.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_known(&self) -> bool {
        !self.file.is_empty() || self.line > 0
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.column > 0 {
            write!(f, "{}:{}:{}", self.file, self.line, self.column)
        } else {
            write!(f, "{}:{}", self.file, self.line)
        }
    }
}

/// Static type of a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Bool,
    Int,
    Float,
    Str,
    /// Pointer to another type.
    Pointer(TypeId),
    /// A named struct type, e.g. `"schema.Resource"`.
    Struct(String),
    /// A function type.
    Func,
    /// Anything the front end did not care to describe further.
    Opaque,
}

/// A compile-time constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// How a value came to exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueDef {
    /// Function parameter (`index` into the function's parameter list).
    Param { func: FuncId, index: usize },
    /// A constant.
    Const(Literal),
    /// A reference to a function in the program (a bound closure or a
    /// plain function value).
    FuncRef(FuncId),
    /// A package-level variable, identified by symbol name.
    Global(String),
    /// The result of an instruction.
    Instr(InstrId),
}

/// An SSA value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Value {
    pub id: ValueId,
    pub ty: TypeId,
    pub def: ValueDef,
    /// Optional source-level name, for diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// The callee of a call instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Callee {
    /// Direct call to a function defined in this program.
    Static(FuncId),
    /// Call into an imported package, identified by its symbol name,
    /// e.g. `"(*schema.ResourceData).Set"`.
    Symbol(String),
    /// Indirect call through a value.
    Dynamic(ValueId),
}

/// Instruction kinds.
///
/// Method calls carry the receiver as the first argument, so for
/// `d.Set(name, value)` the argument list is `[d, name, value]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrKind {
    Call {
        callee: Callee,
        args: Vec<ValueId>,
    },
    /// Unary `*`: load through a pointer.
    Deref { addr: ValueId },
    /// Address of a struct field.
    FieldAddr { base: ValueId, field: String },
    /// Address of a container element.
    IndexAddr { base: ValueId, index: ValueId },
    /// Type conversion / interface wrapping; value-preserving.
    Convert { operand: ValueId },
    /// Lowered composite struct literal.
    StructLit { fields: Vec<(String, ValueId)> },
    /// Lowered composite map literal.
    MapLit { entries: Vec<(ValueId, ValueId)> },
    Store { addr: ValueId, value: ValueId },
    Return { values: Vec<ValueId> },
}

/// One instruction. `result` is the value it defines, if any (`Store` and
/// `Return` define none).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instr {
    pub id: InstrId,
    pub kind: InstrKind,
    /// Static type of the result.
    pub ty: TypeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ValueId>,
    #[serde(default)]
    pub pos: Pos,
}

/// A basic block: an ordered run of instructions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Block {
    pub instrs: Vec<InstrId>,
}

/// A function in the program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub id: FuncId,
    pub name: String,
    pub package: String,
    pub params: Vec<ValueId>,
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub pos: Pos,
}

/// The whole-program representation: arenas of functions, values,
/// instructions and types, cross-referenced by ID.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    functions: Vec<Function>,
    values: Vec<Value>,
    instrs: Vec<Instr>,
    types: Vec<TypeKind>,
}

impl Program {
    pub fn builder() -> ProgramBuilder {
        ProgramBuilder::default()
    }

    pub fn func(&self, id: FuncId) -> &Function {
        &self.functions[id.0 as usize]
    }

    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id.0 as usize]
    }

    pub fn instr(&self, id: InstrId) -> &Instr {
        &self.instrs[id.0 as usize]
    }

    pub fn type_kind(&self, id: TypeId) -> &TypeKind {
        &self.types[id.0 as usize]
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter()
    }

    /// Functions belonging to the given package.
    pub fn functions_in<'a>(&'a self, package: &'a str) -> impl Iterator<Item = &'a Function> {
        self.functions.iter().filter(move |f| f.package == package)
    }

    /// Look up a function by name within a package.
    pub fn func_by_name(&self, package: &str, name: &str) -> Option<&Function> {
        self.functions
            .iter()
            .find(|f| f.package == package && f.name == name)
    }

    /// The instruction that defines a value, if any. Parameters,
    /// constants, function references and globals have none.
    pub fn defining_instr(&self, value: ValueId) -> Option<InstrId> {
        match self.value(value).def {
            ValueDef::Instr(id) => Some(id),
            _ => None,
        }
    }

    /// Extract a string constant.
    pub fn const_str(&self, value: ValueId) -> Option<&str> {
        match &self.value(value).def {
            ValueDef::Const(Literal::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Extract a bool constant.
    pub fn const_bool(&self, value: ValueId) -> Option<bool> {
        match self.value(value).def {
            ValueDef::Const(Literal::Bool(b)) => Some(b),
            _ => None,
        }
    }

    /// Extract an integer constant.
    pub fn const_int(&self, value: ValueId) -> Option<i64> {
        match self.value(value).def {
            ValueDef::Const(Literal::Int(i)) => Some(i),
            _ => None,
        }
    }

    /// Number of pointer indirections carried by a type (`**T` → 2).
    pub fn pointer_depth(&self, ty: TypeId) -> usize {
        let mut depth = 0;
        let mut cur = ty;
        while let TypeKind::Pointer(inner) = self.type_kind(cur) {
            depth += 1;
            cur = *inner;
        }
        depth
    }

    /// Instructions of a function, in block order.
    pub fn instrs_of<'a>(&'a self, func: &'a Function) -> impl Iterator<Item = &'a Instr> {
        func.blocks
            .iter()
            .flat_map(|b| b.instrs.iter())
            .map(move |&id| self.instr(id))
    }
}

/// Incrementally constructs a [`Program`]. This is the surface a front
/// end uses to materialize the lowered representation; tests use it to
/// build synthetic programs.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
}

impl ProgramBuilder {
    /// Intern a type.
    pub fn ty(&mut self, kind: TypeKind) -> TypeId {
        if let Some(idx) = self.program.types.iter().position(|t| *t == kind) {
            return TypeId(idx as u32);
        }
        let id = TypeId(self.program.types.len() as u32);
        self.program.types.push(kind);
        id
    }

    /// Shorthand for a pointer to `inner`.
    pub fn ptr(&mut self, inner: TypeId) -> TypeId {
        self.ty(TypeKind::Pointer(inner))
    }

    /// Start a new function with a single (entry) basic block.
    pub fn func(&mut self, package: &str, name: &str, pos: Pos) -> FuncId {
        let id = FuncId(self.program.functions.len() as u32);
        self.program.functions.push(Function {
            id,
            name: name.to_string(),
            package: package.to_string(),
            params: Vec::new(),
            blocks: vec![Block::default()],
            pos,
        });
        id
    }

    /// Append an additional basic block to a function; returns its index.
    pub fn block(&mut self, func: FuncId) -> usize {
        let f = &mut self.program.functions[func.0 as usize];
        f.blocks.push(Block::default());
        f.blocks.len() - 1
    }

    fn push_value(&mut self, ty: TypeId, def: ValueDef, name: Option<&str>) -> ValueId {
        let id = ValueId(self.program.values.len() as u32);
        self.program.values.push(Value {
            id,
            ty,
            def,
            name: name.map(String::from),
        });
        id
    }

    /// Add a parameter to a function.
    pub fn param(&mut self, func: FuncId, ty: TypeId, name: &str) -> ValueId {
        let index = self.program.functions[func.0 as usize].params.len();
        let v = self.push_value(ty, ValueDef::Param { func, index }, Some(name));
        self.program.functions[func.0 as usize].params.push(v);
        v
    }

    pub fn const_str(&mut self, s: &str) -> ValueId {
        let ty = self.ty(TypeKind::Str);
        self.push_value(ty, ValueDef::Const(Literal::Str(s.to_string())), None)
    }

    pub fn const_bool(&mut self, b: bool) -> ValueId {
        let ty = self.ty(TypeKind::Bool);
        self.push_value(ty, ValueDef::Const(Literal::Bool(b)), None)
    }

    pub fn const_int(&mut self, i: i64) -> ValueId {
        let ty = self.ty(TypeKind::Int);
        self.push_value(ty, ValueDef::Const(Literal::Int(i)), None)
    }

    /// A value referring to a function in the program.
    pub fn func_ref(&mut self, func: FuncId) -> ValueId {
        let ty = self.ty(TypeKind::Func);
        self.push_value(ty, ValueDef::FuncRef(func), None)
    }

    /// A package-level variable.
    pub fn global(&mut self, symbol: &str, ty: TypeId) -> ValueId {
        self.push_value(ty, ValueDef::Global(symbol.to_string()), Some(symbol))
    }

    /// Emit an instruction that defines a result value of type `ty` into
    /// the given block of `func`; returns the result value.
    pub fn emit_in(
        &mut self,
        func: FuncId,
        block: usize,
        kind: InstrKind,
        ty: TypeId,
        pos: Pos,
    ) -> ValueId {
        let instr_id = InstrId(self.program.instrs.len() as u32);
        let result = self.push_value(ty, ValueDef::Instr(instr_id), None);
        self.program.instrs.push(Instr {
            id: instr_id,
            kind,
            ty,
            result: Some(result),
            pos,
        });
        self.program.functions[func.0 as usize].blocks[block]
            .instrs
            .push(instr_id);
        result
    }

    /// Emit into the entry block.
    pub fn emit(&mut self, func: FuncId, kind: InstrKind, ty: TypeId, pos: Pos) -> ValueId {
        self.emit_in(func, 0, kind, ty, pos)
    }

    /// Emit an instruction with no result (`Store`, `Return`).
    pub fn emit_void(&mut self, func: FuncId, kind: InstrKind, pos: Pos) {
        let ty = self.ty(TypeKind::Opaque);
        let instr_id = InstrId(self.program.instrs.len() as u32);
        self.program.instrs.push(Instr {
            id: instr_id,
            kind,
            ty,
            result: None,
            pos,
        });
        self.program.functions[func.0 as usize].blocks[0]
            .instrs
            .push(instr_id);
    }

    pub fn finish(self) -> Program {
        self.program
    }
}
