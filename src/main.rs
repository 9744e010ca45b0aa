//! Code Computer - CLI Entry Point
//!
//! Commands:
//! - `codecomputer run <program>` - Run a .ccp image or .asm source
//! - `codecomputer multiply <a> <b>` - Multiply two bytes on the machine
//! - `codecomputer debug <program>` - Interactive front panel
//! - `codecomputer asm <source>` - Assemble to a .ccp image
//! - `codecomputer disasm <image>` - Disassemble a .ccp image

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use codecomputer::asm::disassemble_image;
use codecomputer::computer::programs;
use codecomputer::{assemble, load_image, save_image, Computer, ComputerConfig, ProgramImage};

#[derive(Parser)]
#[command(name = "codecomputer")]
#[command(author = "Yigit")]
#[command(version = "0.1.0")]
#[command(about = "A stored-program 8-bit computer simulated relay by relay")]
struct Cli {
    /// Log machine events (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON machine configuration (bus widths, initial registers)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the .ccp or .asm file to execute
        program: String,
        /// Maximum number of clock ticks to run
        #[arg(short, long, default_value = "100000")]
        max_ticks: u64,
        /// Memory addresses (hex) to print after the run
        #[arg(short, long, num_args = 1.., value_parser = parse_address)]
        dump: Vec<u64>,
        /// Print the whole memory as JSON
        #[arg(long)]
        json: bool,
    },
    /// Multiply two bytes with the built-in program
    Multiply {
        a: u8,
        b: u8,
    },
    /// Interactive front panel
    Debug {
        /// Path to the .ccp or .asm file to debug
        program: String,
    },
    /// Assemble source to a .ccp image
    Asm {
        /// Path to the source file
        source: String,
        /// Output image file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble a .ccp image to readable text
    Disasm {
        /// Path to the image file
        image: String,
    },
}

fn parse_address(text: &str) -> Result<u64, String> {
    let digits = text.trim_start_matches("0x").trim_start_matches("0X");
    u64::from_str_radix(digits, 16).map_err(|_| format!("invalid hex address '{text}'"))
}

fn init_logging(verbose: bool) {
    let default = if verbose { "codecomputer=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Run { program, max_ticks, dump, json }) => {
            run_program(&program, cli.config.as_deref(), max_ticks, &dump, json);
        }
        Some(Commands::Multiply { a, b }) => {
            multiply(a, b);
        }
        Some(Commands::Debug { program }) => {
            debug_program(&program, cli.config.as_deref());
        }
        Some(Commands::Asm { source, output }) => {
            assemble_file(&source, output);
        }
        Some(Commands::Disasm { image }) => {
            disassemble_file(&image);
        }
        None => {
            println!("Code Computer v0.1.0");
            println!("A stored-program computer built from signal nodes");
            println!();
            println!("Use --help for available commands");
            println!();
            multiply(12, 13);
        }
    }
}

/// Load a program, assembling it first if it is `.asm` source.
fn load_program(path: &str) -> ProgramImage {
    if path.ends_with(".asm") {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("❌ Failed to read file: {}", e);
                std::process::exit(1);
            }
        };

        match assemble(&source) {
            Ok(image) => {
                println!("📝 Assembled {} bytes", image.len());
                image
            }
            Err(e) => {
                eprintln!("❌ Assembly error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        match load_image(path) {
            Ok(image) => {
                println!("📂 Loaded {} bytes", image.len());
                image
            }
            Err(e) => {
                eprintln!("❌ Failed to load image: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn load_config(path: Option<&str>) -> ComputerConfig {
    let Some(path) = path else {
        return ComputerConfig::default();
    };
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read config: {}", e);
            std::process::exit(1);
        }
    };
    match ComputerConfig::from_json(&text) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Invalid config: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_program(path: &str, config: Option<&str>, max_ticks: u64, dump: &[u64], json: bool) {
    println!("🔧 Running: {}", path);
    let image = load_program(path);

    let mut computer = match Computer::with_config(load_config(config)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("❌ Invalid config: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = image.load_into(&mut computer) {
        eprintln!("❌ Failed to load program: {}", e);
        std::process::exit(1);
    }

    let result = computer.run_limited(max_ticks);

    println!();
    println!("━━━ Result ━━━");
    match &result {
        Ok(ticks) => println!("Ticks:   {}", ticks),
        Err(e) => println!("⚠️  {}. Use --max-ticks to increase.", e),
    }
    println!("PC:      {:02x}", computer.program_counter());
    println!("Code:    {:02x}", computer.code());
    println!("Address: {:02x}", computer.address());
    println!("Data:    {:02x} ({})", computer.data(), computer.data());
    println!("Carry:   {}", computer.carry());
    println!("Zero:    {}", computer.zero());

    for &address in dump {
        match computer.read_ram(address) {
            Ok(word) => println!("[{:02x}] = {:02x} ({})", address, word, word),
            Err(e) => eprintln!("❌ {}", e),
        }
    }

    if json {
        match serde_json::to_string_pretty(&computer.dump_ram()) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("❌ Failed to serialize memory: {}", e);
                std::process::exit(1);
            }
        }
    }

    if result.is_err() {
        std::process::exit(2);
    }
}

fn multiply(a: u8, b: u8) {
    match programs::multiply(a, b) {
        Ok(product) => println!("{} × {} = {}", a, b, product),
        Err(e) => {
            eprintln!("❌ Multiplication failed: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "tui")]
fn debug_program(path: &str, config: Option<&str>) {
    use codecomputer::tui::run_debugger;

    println!("🔍 Loading: {}", path);
    let image = load_program(path);
    let config = load_config(config);

    if image.is_empty() {
        eprintln!("❌ No bytes to execute");
        std::process::exit(1);
    }

    println!("🚀 Launching front panel...");
    println!();

    if let Err(e) = run_debugger(image, config) {
        eprintln!("❌ Debugger error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_path: &str, _config: Option<&str>) {
    eprintln!("❌ Built without the `tui` feature");
    std::process::exit(1);
}

fn assemble_file(source_path: &str, output: Option<String>) {
    let out_path = output.unwrap_or_else(|| source_path.replace(".asm", ".ccp"));

    println!("📝 Assembling: {} → {}", source_path, out_path);

    let source = match std::fs::read_to_string(source_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read file: {}", e);
            std::process::exit(1);
        }
    };

    let image = match assemble(&source) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("❌ Assembly error: {}", e);
            std::process::exit(1);
        }
    };

    println!("✓ Assembled {} bytes in {} segments", image.len(), image.segments.len());

    if let Err(e) = save_image(&out_path, &image) {
        eprintln!("❌ Failed to save image: {}", e);
        std::process::exit(1);
    }

    println!("✓ Saved to {}", out_path);
}

fn disassemble_file(image_path: &str) {
    println!("📖 Disassembling: {}", image_path);
    println!();

    let image = match load_image(image_path) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("❌ Failed to load image: {}", e);
            std::process::exit(1);
        }
    };

    print!("{}", disassemble_image(&image));
}
