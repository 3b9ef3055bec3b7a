use std::path::PathBuf;

use structopt::StructOpt;

use wte::errors::*;
use wte::fetch::HttpFetcher;
use wte::report::{Console, Report};
use wte::source::{Context, Registry};
use wte::OnConflict;

#[derive(StructOpt, Debug)]
#[structopt(name = "wte", about = "Easily convert websites into book")]
struct Args {
    #[structopt(help = "Url of the page you want to convert to an ebook")]
    url: String,
    #[structopt(short = "o", long = "output", help = "Output file")]
    output: Option<String>,
    #[structopt(short = "q", long = "quiet", help = "Quiet mode")]
    quiet: bool,
    #[structopt(
        long = "on-conflict",
        default_value = "prompt",
        possible_values = &["prompt", "overwrite", "skip"],
        help = "What to do when the output file already exists"
    )]
    on_conflict: OnConflict,
}

fn output_path(output: Option<String>, default: String) -> PathBuf {
    let mut output = output.unwrap_or(default);
    if !output.ends_with(".epub") {
        output.push_str(".epub");
    }
    PathBuf::from(output)
}

fn run(args: Args) -> Result<()> {
    let report = Console::new(args.quiet);
    let registry = Registry::default();

    let source = match registry.find(&args.url) {
        Some(source) => source,
        None => {
            // handled: the user is told, the exit status stays 0
            report.error(&ErrorKind::UnsupportedSource(args.url.trim().to_string()).to_string());
            return Ok(());
        }
    };

    let fetch = HttpFetcher::new(source.user_agent())?;
    let ctx = Context {
        fetch: &fetch,
        report: &report,
    };
    let mut book = source.extract(args.url.trim(), &ctx)?;

    let dest = output_path(args.output, book.epub_name());
    book.to_epub(Some(&dest), args.on_conflict, &report)?;
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(ref e) = run(Args::from_args()) {
        eprintln!("Error: {}", e);
        for e in e.iter().skip(1) {
            eprintln!("caused by: {}", e);
        }

        if let Some(backtrace) = e.backtrace() {
            eprintln!("Backtrace: {:?}", backtrace);
        }

        ::std::process::exit(1);
    }
}
