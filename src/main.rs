use std::env;
use std::io;
use std::process;

use vglog_filter::{
    is_large_file, open_file, options, read_file_lines, report_memory, resolve_path, Input,
    LineReader, LogFilter, Options, ProgressReporter,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn usage(exe: &str) {
    eprintln!(
        "Usage: {exe} [options] [valgrind_log]\n\
         \n\
         Input\n\
         \x20 valgrind_log            Path to Valgrind log file (default: stdin if omitted)\n\
         \x20 -                       Read from stdin (explicit)\n\
         \n\
         Options\n\
         \x20 -k, --keep-debug-info   Keep everything; do not trim above last debug marker.\n\
         \x20 -v, --verbose           Show completely raw blocks (no address scrub).\n\
         \x20 -d N, --depth N         Signature depth (default: {}, 0 = unlimited).\n\
         \x20 -m S, --marker S        Marker string (default: \"{}\").\n\
         \x20 -s, --stream            Force stream processing mode (auto for files >=5MB).\n\
         \x20 -p, --progress          Show progress for large files.\n\
         \x20 -M, --memory            Monitor memory usage during processing.\n\
         \x20 -V, --version           Show version information.\n\
         \x20 -h, --help              Show this help.\n\
         \n\
         In stream mode (including stdin) only the region after the last marker\n\
         is emitted; if no marker is found, nothing is (use -k to keep all).",
        options::DEFAULT_DEPTH,
        String::from_utf8_lossy(options::DEFAULT_MARKER),
    );
}

fn usage_error(exe: &str, msg: &str) -> ! {
    eprintln!("Error: {msg}");
    usage(exe);
    process::exit(2);
}

/// Parses the command line; exits directly for help/version/usage errors.
fn parse_args() -> Options {
    let mut args = env::args_os();
    let exe = args
        .next()
        .map_or_else(|| "vglog-filter".to_string(), |s| s.to_string_lossy().into_owned());
    let mut opt = Options::default();
    let mut positional: Option<String> = None;

    while let Some(arg) = args.next() {
        let Some(arg) = arg.to_str().map(str::to_string) else {
            usage_error(&exe, "argument is not valid UTF-8");
        };
        match arg.as_str() {
            "-k" | "--keep-debug-info" => opt.trim = false,
            "-v" | "--verbose" => opt.scrub_raw = false,
            "-s" | "--stream" => opt.stream_mode = true,
            "-p" | "--progress" => opt.show_progress = true,
            "-M" | "--memory" => opt.monitor_memory = true,
            "-d" | "--depth" => {
                let value = args
                    .next()
                    .and_then(|v| v.to_str().map(str::to_string))
                    .unwrap_or_else(|| usage_error(&exe, "missing value for --depth"));
                opt.depth = options::parse_depth(&value)
                    .unwrap_or_else(|err| usage_error(&exe, &err.to_string()));
            }
            "-m" | "--marker" => {
                let value = args
                    .next()
                    .and_then(|v| v.to_str().map(str::to_string))
                    .unwrap_or_else(|| usage_error(&exe, "missing value for --marker"));
                opt.marker = options::parse_marker(value.as_bytes())
                    .unwrap_or_else(|err| usage_error(&exe, &err.to_string()));
            }
            "-V" | "--version" => {
                println!("vglog-filter version {VERSION}");
                process::exit(0);
            }
            "-h" | "--help" => {
                usage(&exe);
                process::exit(0);
            }
            flag if flag.starts_with('-') && flag.len() > 1 => {
                usage_error(&exe, &format!("unknown option: {flag}"));
            }
            _ => {
                if positional.is_some() {
                    usage_error(&exe, "multiple input files given");
                }
                positional = Some(arg);
            }
        }
    }

    opt.input = match positional.as_deref() {
        None | Some("-") => Input::Stdin,
        Some(path) => Input::Path(path.into()),
    };
    opt
}

fn run(mut opt: Options) -> Result<(), Box<dyn std::error::Error>> {
    // Resolve the input and auto-detect streaming before anything runs.
    let resolved = match &opt.input {
        Input::Stdin => None,
        Input::Path(path) => {
            let display = path.display().to_string();
            Some((resolve_path(&display)?, display))
        }
    };
    if !opt.stream_mode {
        match &resolved {
            None => opt.stream_mode = true,
            Some((path, _)) => {
                if is_large_file(path) {
                    opt.stream_mode = true;
                    eprintln!("Info: Large file detected, using stream processing mode");
                }
            }
        }
    }

    let label = resolved
        .as_ref()
        .map_or_else(|| "-".to_string(), |(_, name)| name.clone());
    if opt.monitor_memory {
        report_memory("starting processing", &label);
    }

    let monitor_memory = opt.monitor_memory;
    let stdout = io::stdout();
    let sink = io::BufWriter::new(stdout.lock());

    if opt.stream_mode {
        let total = resolved
            .as_ref()
            .filter(|_| opt.show_progress)
            .and_then(|(path, _)| std::fs::metadata(path).ok())
            .map_or(0, |m| m.len());
        let mut progress = ProgressReporter::new(&label, total);
        let show_progress = opt.show_progress;
        let mut filter = LogFilter::new(opt, sink);
        match resolved {
            None => {
                let stdin = io::stdin();
                let mut reader = LineReader::new(stdin.lock());
                filter.run_streaming(&mut reader, None)?;
            }
            Some((path, _)) => {
                let file = open_file(&path)?;
                let mut reader = LineReader::new(file);
                let hook = show_progress.then_some(&mut progress);
                filter.run_streaming(&mut reader, hook)?;
            }
        }
    } else {
        // Buffered mode implies a file input.
        let (path, name) = resolved.expect("buffered mode requires a file");
        let lines = read_file_lines(&path)?;
        if lines.is_empty() {
            eprintln!("Warning: Input file '{name}' is empty");
            return Ok(());
        }
        let mut filter = LogFilter::new(opt, sink);
        filter.run_buffered(&lines)?;
    }

    if monitor_memory {
        report_memory("completed processing", &label);
    }
    Ok(())
}

fn main() {
    let opt = parse_args();
    if let Err(err) = run(opt) {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}
