use luavm::Chunk;
use luavm::binchunk::undump;
use luavm::lua_vm::{Instruction, OpArgMask, OpMode};
use std::env;
use std::fs;

fn main() {
    let args: Vec<String> = env::args().collect();

    let data = if args.len() > 1 {
        let filename = &args[1];
        match fs::read(filename) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error reading file '{}': {}", filename, e);
                std::process::exit(1);
            }
        }
    } else {
        println!("Usage: bytecode_dump <luac.out>");
        std::process::exit(0);
    };

    match undump(&data) {
        Ok(chunk) => list_chunk(&chunk),
        Err(e) => {
            eprintln!("Load error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print a prototype and its nested prototypes in `luac -l` style
fn list_chunk(chunk: &Chunk) {
    print_header(chunk);
    print_code(chunk);
    print_detail(chunk);
    for proto in &chunk.protos {
        list_chunk(proto);
    }
}

fn print_header(chunk: &Chunk) {
    let kind = if chunk.line_defined == 0 { "main" } else { "function" };
    let source = chunk
        .source
        .strip_prefix('@')
        .or_else(|| chunk.source.strip_prefix('='))
        .unwrap_or("?");
    let vararg = if chunk.is_vararg { "+" } else { "" };

    println!(
        "\n{} <{}:{},{}> ({} instructions)",
        kind,
        source,
        chunk.line_defined,
        chunk.last_line_defined,
        chunk.code.len()
    );
    println!(
        "{}{} params, {} slots, {} upvalues, {} locals, {} constants, {} functions",
        chunk.num_params,
        vararg,
        chunk.max_stack_size,
        chunk.upvalues.len(),
        chunk.loc_vars.len(),
        chunk.constants.len(),
        chunk.protos.len()
    );
}

fn print_code(chunk: &Chunk) {
    for (pc, &raw) in chunk.code.iter().enumerate() {
        let line = chunk
            .line_at(pc)
            .map(|l| l.to_string())
            .unwrap_or_else(|| "-".to_string());
        let instr = Instruction::from_u32(raw);
        match instr.get_opcode() {
            Some(op) => println!("\t{}\t[{}]\t{:<9}\t{}", pc + 1, line, op.name(), operands(instr)),
            None => println!("\t{}\t[{}]\t<unknown opcode {}>", pc + 1, line, instr.opcode_bits()),
        }
    }
}

/// Operands as `luac -l` shows them: constants are `-1 - index`
fn operands(instr: Instruction) -> String {
    let Some(op) = instr.get_opcode() else {
        return String::new();
    };
    let a = instr.get_a() as i64;
    let rk = |v: u32| -> i64 {
        if Instruction::is_k(v) {
            -1 - Instruction::rk_index(v) as i64
        } else {
            v as i64
        }
    };

    match op.get_mode() {
        OpMode::IABC => {
            let mut out = a.to_string();
            if op.arg_b_mode() != OpArgMask::N {
                out.push_str(&format!(" {}", rk(instr.get_b())));
            }
            if op.arg_c_mode() != OpArgMask::N {
                out.push_str(&format!(" {}", rk(instr.get_c())));
            }
            out
        }
        OpMode::IABx => match op.arg_b_mode() {
            OpArgMask::K => format!("{} {}", a, -1 - instr.get_bx() as i64),
            _ => format!("{} {}", a, instr.get_bx()),
        },
        OpMode::IAsBx => format!("{} {}", a, instr.get_sbx()),
        OpMode::IAx => format!("{}", -1 - instr.get_ax() as i64),
    }
}

fn print_detail(chunk: &Chunk) {
    println!("constants ({}):", chunk.constants.len());
    for (i, k) in chunk.constants.iter().enumerate() {
        let shown = if k.is_string() {
            format!("{:?}", k)
        } else {
            k.to_string()
        };
        println!("\t{}\t{}", i + 1, shown);
    }

    println!("locals ({}):", chunk.loc_vars.len());
    for (i, v) in chunk.loc_vars.iter().enumerate() {
        println!("\t{}\t{}\t{}\t{}", i, v.name, v.start_pc + 1, v.end_pc + 1);
    }

    println!("upvalues ({}):", chunk.upvalues.len());
    for (i, uv) in chunk.upvalues.iter().enumerate() {
        let name = chunk.upvalue_names.get(i).map(String::as_str).unwrap_or("-");
        println!("\t{}\t{}\t{}\t{}", i, name, uv.instack as u8, uv.idx);
    }
}
