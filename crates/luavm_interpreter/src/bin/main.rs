use luavm::lua_vm::{LUA_MULTRET, SafeOption};
use luavm::{LuaStatus, LuaVM};
use std::env;
use std::fs;
use std::io::{self, Read};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

const VERSION: &str = "Lua 5.3 (luavm)";

fn print_usage() {
    eprintln!("usage: lua [options] [chunk [args]]");
    eprintln!("Runs a precompiled Lua 5.3 chunk (luac output).");
    eprintln!("Available options are:");
    eprintln!("  -v          show version information");
    eprintln!("  --budget n  stop after executing n instructions");
    eprintln!("  --          stop handling options");
    eprintln!("  -           stop handling options and read the chunk from stdin");
}

#[derive(Default)]
struct Options {
    chunk_file: Option<String>,
    chunk_args: Vec<String>,
    show_version: bool,
    read_stdin: bool,
    budget: Option<u64>,
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = env::args().collect();
    let mut opts = Options::default();
    let mut i = 1;
    let mut stop_options = false;

    while i < args.len() {
        let arg = &args[i];

        if !stop_options && arg.starts_with('-') {
            match arg.as_str() {
                "-v" => {
                    opts.show_version = true;
                }
                "--budget" => {
                    i += 1;
                    let n = args
                        .get(i)
                        .ok_or_else(|| "'--budget' needs argument".to_string())?;
                    let n = n
                        .parse::<u64>()
                        .map_err(|_| format!("invalid budget '{}'", n))?;
                    opts.budget = Some(n);
                }
                "--" => {
                    stop_options = true;
                }
                "-" => {
                    opts.read_stdin = true;
                    stop_options = true;
                }
                _ => {
                    return Err(format!("unrecognized option '{}'", arg));
                }
            }
        } else {
            opts.chunk_file = Some(arg.clone());
            i += 1;
            // everything after the chunk goes to the chunk as varargs
            opts.chunk_args.extend(args[i..].iter().cloned());
            break;
        }
        i += 1;
    }

    Ok(opts)
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn read_chunk(opts: &Options) -> Result<(String, Vec<u8>), String> {
    if let Some(filename) = &opts.chunk_file {
        let data = fs::read(filename).map_err(|e| format!("cannot open {}: {}", filename, e))?;
        return Ok((filename.clone(), data));
    }
    let mut data = Vec::new();
    io::stdin()
        .read_to_end(&mut data)
        .map_err(|e| format!("error reading stdin: {}", e))?;
    Ok(("stdin".to_string(), data))
}

/// Load and run a binary chunk under a protected call
fn run_chunk(vm: &mut LuaVM, name: &str, data: &[u8], args: &[String]) -> Result<(), String> {
    vm.load_binary(data).map_err(|e| format!("{}: {}", name, e))?;
    for arg in args {
        vm.push_string(arg).map_err(|e| e.to_string())?;
    }

    let status = vm.pcall(args.len(), LUA_MULTRET, 0);
    if status == LuaStatus::Ok {
        debug!(results = vm.get_top(), "chunk finished");
        return Ok(());
    }
    let msg = vm
        .to_display_string(-1)
        .map(|s| String::from_utf8_lossy(&s).into_owned())
        .unwrap_or_else(|_| "(error object is not a string)".to_string());
    Err(msg)
}

fn main() {
    init_logging();

    // Lua calls recurse on the host stack; give the VM room for the default call depth
    let stack_size = 16 * 1024 * 1024;
    let worker = std::thread::Builder::new()
        .name("lua-main".into())
        .stack_size(stack_size)
        .spawn(lua_main);

    let code = match worker.map(|handle| handle.join()) {
        Ok(Ok(code)) => code,
        Ok(Err(_)) => {
            eprintln!("lua: internal error (thread panicked)");
            1
        }
        Err(e) => {
            eprintln!("lua: cannot start interpreter thread: {}", e);
            1
        }
    };
    std::process::exit(code);
}

fn lua_main() -> i32 {
    let opts = match parse_args() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("lua: {}", e);
            print_usage();
            return 1;
        }
    };

    if opts.show_version {
        println!("{}", VERSION);
        if opts.chunk_file.is_none() && !opts.read_stdin {
            return 0;
        }
    }
    if opts.chunk_file.is_none() && !opts.read_stdin {
        print_usage();
        return 1;
    }

    let mut vm = LuaVM::with_options(SafeOption {
        instruction_budget: opts.budget,
        ..Default::default()
    });
    if let Err(e) = vm.open_libs() {
        eprintln!("lua: {}", e);
        return 1;
    }

    let result = read_chunk(&opts)
        .and_then(|(name, data)| run_chunk(&mut vm, &name, &data, &opts.chunk_args));
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("lua: {}", e);
            1
        }
    }
}
