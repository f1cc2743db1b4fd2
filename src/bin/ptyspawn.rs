//! ptyspawn - run a command on a PTY and relay its I/O
//!
//! Spawns the command (or `$SHELL`) on a new pseudoterminal, copies stdin to
//! the master and the master to stdout, then exits with the child's status.

use std::fs::File;
use std::io::{self, Read, Write};
use std::process::ExitCode;
use std::thread;

use ptyspawn::{wait_for, PtyCommand, SpawnRequest, TerminalMode, UNCLASSIFIED_EXIT};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut cwd: Option<String> = None;
    let mut request: Option<String> = None;
    let mut echo = true;
    let mut canonical = true;
    let mut clear_env = false;
    let mut command: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-C" | "--cwd" => {
                i += 1;
                cwd = args.get(i).cloned();
            },
            "-r" | "--request" => {
                i += 1;
                request = args.get(i).cloned();
            },
            "--no-echo" => echo = false,
            "--raw" => canonical = false,
            "--clear-env" => clear_env = true,
            "-h" | "--help" => {
                print_help();
                return ExitCode::SUCCESS;
            },
            "--" => {
                command.extend(args[i + 1..].iter().cloned());
                break;
            },
            other => {
                command.extend(args[i..].iter().cloned());
                if other.starts_with('-') {
                    eprintln!("Unknown option: {}", other);
                    return ExitCode::FAILURE;
                }
                break;
            },
        }
        i += 1;
    }

    if request.is_some() && (!echo || !canonical || clear_env || !command.is_empty()) {
        eprintln!("--request cannot be combined with --no-echo, --raw, --clear-env or a command");
        return ExitCode::FAILURE;
    }

    let cmd = match &request {
        Some(path) => match SpawnRequest::from_path(path).and_then(|r| r.to_command()) {
            Ok(cmd) => cmd,
            Err(e) => {
                eprintln!("Failed to load request {}: {}", path, e);
                return ExitCode::FAILURE;
            },
        },
        None => {
            let mut argv = command.into_iter();
            let program = argv.next().unwrap_or_else(|| {
                std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
            });
            let mut cmd = PtyCommand::new(&program).args(argv).mode(
                TerminalMode::default()
                    .with_echo(echo)
                    .with_canonical(canonical),
            );
            if clear_env {
                cmd = cmd.env_clear();
            }
            cmd
        },
    };
    let cmd = match cwd {
        Some(dir) => cmd.current_dir(dir),
        None => cmd,
    };

    tracing::info!("Spawning {:?}", cmd.get_argv());

    let handle = match cmd.spawn() {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Failed to spawn PTY: {}", e);
            return ExitCode::FAILURE;
        },
    };
    let (pid, master) = handle.into_parts();
    tracing::info!("PTY spawned, child PID: {}", pid);

    let mut reader = File::from(master);
    let mut writer = match reader.try_clone() {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Failed to duplicate PTY master: {}", e);
            return ExitCode::FAILURE;
        },
    };

    // Detached: blocks on stdin until EOF, the process exit tears it down
    thread::spawn(move || {
        let mut stdin = io::stdin();
        let mut buf = [0u8; 1024];
        loop {
            match stdin.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if writer.write_all(&buf[..n]).is_err() {
                        break;
                    }
                },
            }
        }
    });

    let mut stdout = io::stdout();
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if stdout.write_all(&buf[..n]).is_err() {
                    break;
                }
                let _ = stdout.flush();
            },
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            // EIO once the slave side is gone
            Err(e) => {
                tracing::debug!("PTY read ended: {}", e);
                break;
            },
        }
    }

    match wait_for(pid) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(UNCLASSIFIED_EXIT) => {
            tracing::info!("Child terminated abnormally");
            ExitCode::FAILURE
        },
        Ok(code) => {
            tracing::info!("Child exited with code: {}", code);
            ExitCode::from(code as u8)
        },
        Err(e) => {
            tracing::error!("Wait error: {}", e);
            ExitCode::FAILURE
        },
    }
}

fn print_help() {
    println!("ptyspawn - run a command on a pseudoterminal");
    println!();
    println!("Usage: ptyspawn [OPTIONS] [--] [COMMAND [ARGS...]]");
    println!();
    println!("Options:");
    println!("  -C, --cwd <DIR>        Working directory for the child");
    println!("  -r, --request <FILE>   Read command, env and mode from a JSON file");
    println!("                         (only --cwd may be combined with it)");
    println!("      --no-echo          Spawn with echo disabled");
    println!("      --raw              Spawn with canonical mode disabled");
    println!("      --clear-env        Do not pass the current environment on");
    println!("  -h, --help             Show this help message");
    println!();
    println!("Without a command, $SHELL (or /bin/sh) is started.");
    println!("The exit status is the child's, or 1 if it was killed by a signal.");
}
