use chrono::{DateTime, NaiveDateTime};
use clap::{Parser, Subcommand};
use mediaq::query::{self, control, Filter, Paging};
use mediaq::timeline::{self, BucketRecord, Interval, TimeBucket, Zoom};
use mediaq::views;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mediaq", about = "Parse, serialize and bucket media library filter expressions")]
struct Cli {
    #[arg(long, global = true, env = "MEDIAQ_DATE_KEY", default_value = "created_at", help = "Filter key holding the media timestamp")]
    date_key: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a filter and print its canonical text
    Check { filter: String },

    /// Print the filter with ordering and paging clauses for the media endpoint
    Query {
        filter: String,
        #[arg(long, default_value = "created_at")]
        order_by: String,
        #[arg(long)]
        asc: bool,
        #[arg(long, default_value_t = 100)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, help = "Drop ordering and paging, as sent for a count")]
        count: bool,
    },

    /// Print the date range of the filter and the interval it calls for
    Range { filter: String },

    /// Fill gaps in server bucket counts
    Fill {
        filter: String,
        #[arg(long, help = "YAML or JSON bucket list, '-' for stdin")]
        buckets: PathBuf,
        #[arg(long, help = "month, day or hour; chosen from the filter when omitted")]
        interval: Option<Interval>,
    },

    /// Print the first and last bucket index covering a time range
    Locate {
        filter: String,
        #[arg(long, help = "YAML or JSON bucket list, '-' for stdin")]
        buckets: PathBuf,
        #[arg(long)]
        interval: Option<Interval>,
        #[arg(long, help = "Range start, unix seconds")]
        from: i64,
        #[arg(long, help = "Range end, unix seconds")]
        to: i64,
    },

    /// Print the interval one zoom step away, if it stays under the bucket ceiling
    Zoom {
        filter: String,
        #[arg(long)]
        interval: Interval,
        #[arg(long = "in", conflicts_with = "zoom_out", required_unless_present = "zoom_out")]
        zoom_in: bool,
        #[arg(long = "out")]
        zoom_out: bool,
    },

    /// List saved views, marking those equal to the filter
    Views {
        filter: Option<String>,
        #[arg(long, env = "MEDIAQ_VIEWS")]
        dir: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Check { filter } => run_check(&filter),
        Command::Query {
            filter,
            order_by,
            asc,
            limit,
            page,
            count,
        } => {
            let paging = Paging {
                order_by,
                asc,
                limit,
                page,
            };
            run_query(&filter, &paging, count)
        }
        Command::Range { filter } => run_range(&filter, &cli.date_key),
        Command::Fill {
            filter,
            buckets,
            interval,
        } => run_fill(&filter, &cli.date_key, &buckets, interval),
        Command::Locate {
            filter,
            buckets,
            interval,
            from,
            to,
        } => run_locate(&filter, &cli.date_key, &buckets, interval, (from, to)),
        Command::Zoom {
            filter,
            interval,
            zoom_in,
            ..
        } => {
            let zoom = if zoom_in { Zoom::In } else { Zoom::Out };
            run_zoom(&filter, &cli.date_key, interval, zoom)
        }
        Command::Views { filter, dir } => run_views(filter.as_deref(), dir.as_deref()),
    }
}

fn init_logging() {
    let filter = std::env::var("MEDIAQ_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "warn".to_string());

    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .with_env_filter(EnvFilter::new(filter))
        .init();
}

fn parse_filter(text: &str) -> Option<Filter> {
    match query::parse(text) {
        Ok(filter) => Some(filter),
        Err(e) => {
            eprintln!("Filter error: {}", e);
            None
        }
    }
}

fn run_check(text: &str) -> ExitCode {
    let Some(filter) = parse_filter(text) else {
        return ExitCode::from(2);
    };

    println!("{}", filter);

    if let Err(e) = control::validate(&filter) {
        eprintln!("Warning: {}", e);
    }

    ExitCode::from(0)
}

fn run_query(text: &str, paging: &Paging, count: bool) -> ExitCode {
    let Some(filter) = parse_filter(text) else {
        return ExitCode::from(2);
    };

    if count {
        println!("{}", filter.without_controls());
    } else {
        println!("{}", filter.to_media_query(paging));
    }

    ExitCode::from(0)
}

fn run_range(text: &str, date_key: &str) -> ExitCode {
    let Some(filter) = parse_filter(text) else {
        return ExitCode::from(2);
    };

    let range = filter.date_range(date_key);
    let show = |bound: Option<NaiveDateTime>| {
        bound.map_or_else(|| "-".to_string(), |ts| ts.to_string())
    };

    println!("start: {}", show(range.start));
    println!("end: {}", show(range.end));
    println!("interval: {}", Interval::for_range(&range));

    ExitCode::from(0)
}

fn read_buckets(path: &Path) -> Result<Vec<TimeBucket>, String> {
    let content = if path == Path::new("-") {
        let mut content = String::new();
        io::stdin()
            .read_to_string(&mut content)
            .map_err(|e| format!("failed to read stdin: {}", e))?;
        content
    } else {
        fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?
    };

    let records: Vec<BucketRecord> =
        serde_yaml::from_str(&content).map_err(|e| format!("invalid bucket list: {}", e))?;

    records
        .into_iter()
        .map(|record| record.into_bucket().map_err(|e| e.to_string()))
        .collect()
}

fn load_filled(
    text: &str,
    date_key: &str,
    buckets: &Path,
    interval: Option<Interval>,
) -> Option<(Interval, Vec<TimeBucket>)> {
    let filter = parse_filter(text)?;
    let raw = match read_buckets(buckets) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("Error: {}", e);
            return None;
        }
    };

    let range = filter.date_range(date_key);
    let interval = interval.unwrap_or_else(|| Interval::for_range(&range));
    Some((interval, timeline::fill(&raw, interval, &range)))
}

fn run_fill(text: &str, date_key: &str, buckets: &Path, interval: Option<Interval>) -> ExitCode {
    let Some((_, filled)) = load_filled(text, date_key, buckets, interval) else {
        return ExitCode::from(2);
    };

    for bucket in &filled {
        println!("{}\t{}", bucket, bucket.count);
    }

    ExitCode::from(0)
}

fn run_locate(
    text: &str,
    date_key: &str,
    buckets: &Path,
    interval: Option<Interval>,
    (from, to): (i64, i64),
) -> ExitCode {
    let Some((interval, filled)) = load_filled(text, date_key, buckets, interval) else {
        return ExitCode::from(2);
    };

    let (Some(start), Some(end)) = (DateTime::from_timestamp(from, 0), DateTime::from_timestamp(to, 0))
    else {
        eprintln!("Error: timestamp out of range");
        return ExitCode::from(2);
    };

    match timeline::locate(start.naive_utc(), end.naive_utc(), interval, &filled) {
        Ok((first, last)) => {
            println!("{}\t{}", first, last);
            ExitCode::from(0)
        }
        Err(e) => {
            tracing::debug!(error = %e, "range not located");
            ExitCode::from(1)
        }
    }
}

fn run_zoom(text: &str, date_key: &str, interval: Interval, zoom: Zoom) -> ExitCode {
    let Some(filter) = parse_filter(text) else {
        return ExitCode::from(2);
    };

    let range = filter.date_range(date_key);
    match interval.step(zoom) {
        Some(target) if interval.can_change(zoom, &range) => {
            println!("{}", target);
            ExitCode::from(0)
        }
        _ => ExitCode::from(1),
    }
}

fn run_views(text: Option<&str>, dir: Option<&Path>) -> ExitCode {
    let Some(dir) = dir else {
        eprintln!("Error: No views directory specified. Use --dir or set MEDIAQ_VIEWS");
        return ExitCode::from(2);
    };

    let active = match text.map(parse_filter) {
        Some(None) => return ExitCode::from(2),
        Some(Some(filter)) => Some(filter),
        None => None,
    };

    let saved = views::load_dir(dir);
    if saved.is_empty() {
        return ExitCode::from(1);
    }

    let matching: Vec<&str> = active
        .as_ref()
        .map(|filter| {
            views::find_matching(&saved, filter)
                .map(|view| view.name.as_str())
                .collect()
        })
        .unwrap_or_default();

    for view in &saved {
        let marker = if matching.contains(&view.name.as_str()) { "*" } else { " " };
        println!("{} {}\t{}", marker, view.name, view.filter);
    }

    ExitCode::from(0)
}
