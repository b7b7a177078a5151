//! Wuffs/Puffs C code generator CLI.
//!
//! Reads one or more JSON-encoded checked `ast::File`s — this crate never
//! parses DSL source text itself — and writes the generated C
//! translation unit for each, optionally piping it through an external C
//! formatter.

use clap::{CommandFactory, Parser as ClapParser, Subcommand};
use clap_complete::{Shell, generate};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{self, Command, Stdio};

use wuffs_cgen::ast::File as AstFile;
use wuffs_cgen::config::GenConfig;

#[derive(ClapParser)]
#[command(name = "wuffsc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate C code from a checked Wuffs/Puffs AST", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate C code for one or more checked ASTs (JSON; `-` for stdin)
    Gen {
        /// Input JSON AST file(s). Reads stdin if none are given.
        inputs: Vec<PathBuf>,

        /// Write output here instead of `<input>.c` (only valid for a
        /// single input, or stdin).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Path to the C formatter to pipe output through.
        #[arg(long)]
        cformatter: Option<PathBuf>,

        /// Skip the external C formatter entirely.
        #[arg(long)]
        no_format: bool,

        /// Omit the optional C++ wrapper section of the header.
        #[arg(long)]
        no_cpp_wrapper: bool,

        /// Override the derived package prefix.
        #[arg(long)]
        package_prefix: Option<String>,
    },

    /// Generate shell completion scripts
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Gen {
            inputs,
            output,
            cformatter,
            no_format,
            no_cpp_wrapper,
            package_prefix,
        } => run_gen(&inputs, output.as_deref(), cformatter, no_format, no_cpp_wrapper, package_prefix),
        Commands::Completions { shell } => run_completions(shell),
    }
}

fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "wuffsc", &mut io::stdout());
}

fn build_config(cformatter: Option<PathBuf>, no_format: bool, no_cpp_wrapper: bool, package_prefix: Option<String>) -> GenConfig {
    let mut config = GenConfig::new();
    config = match (no_format, cformatter) {
        (true, _) => config.without_cformatter(),
        (false, Some(path)) => config.with_cformatter(path),
        (false, None) => config,
    };
    config = config.with_cpp_wrapper(!no_cpp_wrapper);
    if let Some(prefix) = package_prefix {
        config = config.with_package_prefix(prefix);
    }
    config
}

fn run_gen(
    inputs: &[PathBuf],
    output: Option<&Path>,
    cformatter: Option<PathBuf>,
    no_format: bool,
    no_cpp_wrapper: bool,
    package_prefix: Option<String>,
) {
    let config = build_config(cformatter, no_format, no_cpp_wrapper, package_prefix);

    if inputs.is_empty() {
        let mut buf = String::new();
        if let Err(e) = io::stdin().read_to_string(&mut buf) {
            eprintln!("Error: failed to read stdin: {}", e);
            process::exit(1);
        }
        generate_one("<stdin>", &buf, output, &config);
        return;
    }

    if inputs.len() > 1 && output.is_some() {
        eprintln!("Error: --output only makes sense with a single input file");
        process::exit(1);
    }

    for input in inputs {
        let content = match fs::read_to_string(input) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error: failed to read {}: {}", input.display(), e);
                process::exit(1);
            }
        };
        let out_path = output
            .map(PathBuf::from)
            .unwrap_or_else(|| input.with_extension("c"));
        generate_one(&input.display().to_string(), &content, Some(&out_path), &config);
    }
}

fn generate_one(label: &str, json: &str, output: Option<&Path>, config: &GenConfig) {
    let mut file: AstFile = match serde_json::from_str(json) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: {}: invalid AST JSON: {}", label, e);
            process::exit(1);
        }
    };
    file.interner.rehash();

    let generated = match wuffs_cgen::gen_package(&file, config.clone()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}: {}", label, e);
            process::exit(1);
        }
    };

    let formatted = match &config.cformatter {
        Some(formatter) => match run_cformatter(formatter, &generated) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Warning: {}: c formatter failed ({}), writing unformatted output", label, e);
                generated
            }
        },
        None => generated,
    };

    match output {
        Some(path) => {
            if let Err(e) = fs::write(path, &formatted) {
                eprintln!("Error: {}: failed to write {}: {}", label, path.display(), e);
                process::exit(1);
            }
            println!("{} -> {}", label, path.display());
        }
        None => {
            print!("{}", formatted);
        }
    }
}

fn run_cformatter(formatter: &Path, source: &str) -> io::Result<String> {
    let mut child = Command::new(formatter)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()?;
    child
        .stdin
        .take()
        .expect("piped stdin")
        .write_all(source.as_bytes())?;
    let output = child.wait_with_output()?;
    if !output.status.success() {
        return Err(io::Error::other(format!(
            "{} exited with {:?}",
            formatter.display(),
            output.status.code()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_gen_writes_a_c_file_next_to_the_input() {
        use tempfile::tempdir;

        let temp = tempdir().unwrap();
        let input = temp.path().join("noop.json");

        let mut interner = wuffs_cgen::ast::Interner::new();
        let name = interner.intern("noop");
        let file = AstFile {
            package: "noop".to_string(),
            interner,
            uses: vec![],
            consts: vec![],
            statuses: vec![],
            structs: vec![],
            funcs: vec![wuffs_cgen::ast::Func {
                name,
                receiver: None,
                public: true,
                coroutine: false,
                args: vec![],
                ret: wuffs_cgen::types::TypeExpr::Status,
                locals: vec![],
                body: vec![],
            }],
        };
        fs::write(&input, serde_json::to_string(&file).unwrap()).unwrap();

        run_gen(&[input.clone()], None, None, true, false, None);

        let out_path = input.with_extension("c");
        let generated = fs::read_to_string(&out_path).unwrap();
        assert!(generated.contains("wuffs_noop__noop"));
    }
}
