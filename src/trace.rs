//! Backward def-use tracing over the SSA graph.

use crate::ssa::{InstrId, InstrKind, Program, ValueId};
use std::collections::HashSet;

/// The ordered chain of instructions that produced `value`, from the use
/// site back toward its root.
///
/// Each step resolves the instruction defining the current value, appends
/// it, and continues from that instruction's single operand: the address
/// for a dereference, the base for field/element address-of, the operand
/// for a conversion. Instructions with no single well-defined operand
/// (calls, composite literals) are appended and terminate the walk. A
/// value with no defining instruction at all (parameter, constant,
/// function reference, global) yields an empty path.
///
/// This is a pure read of the program. A visited set guards against
/// malformed cyclic def-use links from a buggy front end; revisiting an
/// instruction terminates the path instead of looping.
pub fn value_path(program: &Program, value: ValueId) -> Vec<InstrId> {
    let mut path = Vec::new();
    let mut seen: HashSet<InstrId> = HashSet::new();
    let mut current = value;

    while let Some(instr_id) = program.defining_instr(current) {
        if !seen.insert(instr_id) {
            break;
        }
        path.push(instr_id);

        let next = match &program.instr(instr_id).kind {
            InstrKind::Deref { addr } => Some(*addr),
            InstrKind::FieldAddr { base, .. } => Some(*base),
            InstrKind::IndexAddr { base, .. } => Some(*base),
            InstrKind::Convert { operand } => Some(*operand),
            _ => None,
        };

        match next {
            Some(v) => current = v,
            None => break,
        }
    }

    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssa::{Callee, Pos, TypeKind};

    #[test]
    fn test_root_value_yields_empty_path() {
        let mut b = Program::builder();
        let s = b.ty(TypeKind::Str);
        let f = b.func("pkg", "f", Pos::none());
        let p = b.param(f, s, "x");
        let c = b.const_str("lit");
        let prog = b.finish();

        assert!(value_path(&prog, p).is_empty());
        assert!(value_path(&prog, c).is_empty());
    }

    #[test]
    fn test_chain_of_n_instructions_yields_n_elements() {
        let mut b = Program::builder();
        let s = b.ty(TypeKind::Str);
        let f = b.func("pkg", "f", Pos::none());
        let mut cur = b.param(f, s, "x");
        for _ in 0..4 {
            cur = b.emit(f, InstrKind::Convert { operand: cur }, s, Pos::none());
        }
        let prog = b.finish();

        let path = value_path(&prog, cur);
        assert_eq!(path.len(), 4);
        // Use-to-root order: the last conversion emitted comes first.
        let first = prog.instr(path[0]);
        assert_eq!(first.result, Some(cur));
    }

    #[test]
    fn test_call_result_terminates_path() {
        let mut b = Program::builder();
        let s = b.ty(TypeKind::Str);
        let f = b.func("pkg", "f", Pos::none());
        let arg = b.const_str("in");
        let call = b.emit(
            f,
            InstrKind::Call {
                callee: Callee::Symbol("strings.ToLower".to_string()),
                args: vec![arg],
            },
            s,
            Pos::none(),
        );
        let converted = b.emit(f, InstrKind::Convert { operand: call }, s, Pos::none());
        let prog = b.finish();

        // The call itself is included, then the walk stops: a call result
        // is a root.
        let path = value_path(&prog, converted);
        assert_eq!(path.len(), 2);
        assert!(matches!(
            prog.instr(path[1]).kind,
            InstrKind::Call { .. }
        ));
    }

    #[test]
    fn test_deref_of_field_addr_walks_to_base() {
        let mut b = Program::builder();
        let s = b.ty(TypeKind::Str);
        let obj = b.ty(TypeKind::Struct("pkg.Config".to_string()));
        let pobj = b.ptr(obj);
        let ps = b.ptr(s);
        let f = b.func("pkg", "f", Pos::none());
        let base = b.param(f, pobj, "cfg");
        let field = b.emit(
            f,
            InstrKind::FieldAddr {
                base,
                field: "name".to_string(),
            },
            ps,
            Pos::none(),
        );
        let loaded = b.emit(f, InstrKind::Deref { addr: field }, s, Pos::none());
        let prog = b.finish();

        let path = value_path(&prog, loaded);
        assert_eq!(path.len(), 2);
        assert!(matches!(prog.instr(path[0]).kind, InstrKind::Deref { .. }));
        assert!(matches!(
            prog.instr(path[1]).kind,
            InstrKind::FieldAddr { .. }
        ));
    }

    #[test]
    fn test_cyclic_links_terminate() {
        // Hand-build a malformed graph where a conversion defines its own
        // operand, which no front end should ever emit.
        use crate::ssa::ValueId;
        let mut b = Program::builder();
        let s = b.ty(TypeKind::Str);
        let f = b.func("pkg", "f", Pos::none());
        let seed = b.param(f, s, "x");
        let v1 = b.emit(f, InstrKind::Convert { operand: ValueId(2) }, s, Pos::none());
        let _v2 = b.emit(f, InstrKind::Convert { operand: v1 }, s, Pos::none());
        let _ = seed;
        let prog = b.finish();

        // v1's operand is v2's result and vice versa; the guard must stop
        // the walk after visiting each once.
        let path = value_path(&prog, v1);
        assert!(path.len() <= 2);
    }
}
