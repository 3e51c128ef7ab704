use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;
use yield_markdown::{PageRecord, Pages, RunSummary};

mod args;
use args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    let input = match args.run_input() {
        Ok(input) => input,
        Err(e) => {
            ::log::error!("Failed to read run input: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut pages = Pages::new(input);
    if let Some(path) = &args.config {
        pages = match pages.with_config_file(path) {
            Ok(pages) => pages,
            Err(e) => {
                ::log::error!("Failed to load config {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        };
    }
    if args.no_fast_path {
        pages = pages.with_fast_path(false);
    }
    if let Some(concurrency) = args.concurrency {
        pages = pages.with_max_concurrency(concurrency);
    }
    if let Some(url) = &args.webdriver_url {
        pages = pages.with_webdriver_url(url.clone());
    }

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => match File::create(path) {
            Ok(file) => Box::new(BufWriter::new(file)),
            Err(e) => {
                ::log::error!("Failed to create {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let start_time = std::time::Instant::now();
    let mut rx = match pages.generate().await {
        Ok(rx) => rx,
        Err(e) => {
            ::log::error!("Failed to start: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut summary = RunSummary::default();
    while let Some(record) = rx.recv().await {
        summary.record(&record);
        if let Err(e) = write_record(&mut out, &record) {
            ::log::error!("Failed to write record for {}: {}", record.url, e);
            return ExitCode::FAILURE;
        }
    }
    summary.duration = start_time.elapsed();

    if let Err(e) = out.flush() {
        ::log::error!("Failed to flush output: {}", e);
        return ExitCode::FAILURE;
    }

    ::log::info!(
        "Done - {} pages, {} failed ({:.1}% success) in {:.2} seconds, {:.2} seconds per page",
        summary.processed,
        summary.failed,
        summary.success_rate(),
        summary.duration.as_secs_f64(),
        summary.average_per_page().as_secs_f64()
    );

    ExitCode::SUCCESS
}

// One JSON object per line
fn write_record(out: &mut dyn Write, record: &PageRecord) -> io::Result<()> {
    serde_json::to_writer(&mut *out, record)?;
    out.write_all(b"\n")
}
