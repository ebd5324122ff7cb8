use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use serde::{Deserialize, Serialize};
use sitewalk_crawler::{crawl_site, CrawlerConfig, PageRecord, ResourcePool};
use sitewalk_fetch::{fetch_page, FetcherConfig, HttpFetcher};
use tokio::runtime;

/// Breadth-first single site crawler
#[derive(Debug, Parser)]
#[clap(version)]
pub struct Args {
    #[clap(subcommand)]
    pub cmd: SubCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum SubCommand {
    #[clap(name = "crawl")]
    Crawl(CrawlArgs),
    #[clap(name = "fetch")]
    Fetch(FetchArgs),
    #[clap(hide = true)]
    Completion,
}

/// Crawl a site and write the text of its pages as csv
#[derive(Debug, clap::Args)]
pub struct CrawlArgs {
    /// Url the crawl starts from
    pub seed: String,
    /// Path to the output csv file, stdout when missing
    #[clap(parse(from_os_str), long, short)]
    pub output_file: Option<PathBuf>,
    /// Optional yaml configuration file
    #[clap(env = "SITEWALK_CONFIG", parse(from_os_str), long)]
    pub config: Option<PathBuf>,
    /// Override crawler's maximum BFS depth
    #[clap(long)]
    pub max_depth: Option<usize>,
    /// Override crawler's maximum number of fetched pages
    #[clap(long)]
    pub max_pages: Option<usize>,
    /// Override the number of pooled fetchers
    #[clap(long)]
    pub pool_size: Option<usize>,
    /// Override crawler's per page timeout
    #[clap(long)]
    pub task_timeout_ms: Option<u64>,
    /// Override fetcher's user agent
    #[clap(long)]
    pub user_agent: Option<String>,
    /// Override fetcher's delay before reading a loaded page
    #[clap(long)]
    pub settle_delay_ms: Option<u64>,
    /// Override fetcher's Accept-Language header
    #[clap(long)]
    pub accept_language: Option<String>,
    /// Request www.<domain> instead of <domain>
    #[clap(long)]
    pub prefix_www: bool,
    /// Override the number of runtime worker threads
    #[clap(long)]
    pub num_workers: Option<usize>,
    /// No SIGINT handling, an interrupted crawl writes nothing
    #[clap(long)]
    pub no_sigint: bool,
    /// When quiet no logs are outputted
    #[clap(long, short)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitewalkConfig {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
}

impl Default for SitewalkConfig {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            fetcher: FetcherConfig::default(),
            num_workers: default_num_workers(),
        }
    }
}

fn default_num_workers() -> usize {
    usize::max(1, num_cpus::get().saturating_sub(2))
}

impl TryFrom<&CrawlArgs> for SitewalkConfig {
    type Error = anyhow::Error;

    fn try_from(args: &CrawlArgs) -> Result<Self, Self::Error> {
        let mut conf = if let Some(path) = &args.config {
            let file = File::open(path).with_context(|| format!("Couldn't open {path:?}"))?;
            serde_yaml::from_reader(file)?
        } else {
            SitewalkConfig::default()
        };
        if let Some(max_depth) = args.max_depth {
            conf.crawler.max_depth = max_depth;
        }
        if let Some(max_pages) = args.max_pages {
            conf.crawler.max_pages = max_pages;
        }
        if let Some(pool_size) = args.pool_size {
            conf.crawler.pool_size = pool_size;
        }
        if let Some(task_timeout_ms) = args.task_timeout_ms {
            conf.crawler.task_timeout_ms = Some(task_timeout_ms);
        }
        conf.crawler.handle_sigint = !args.no_sigint;
        if let Some(user_agent) = &args.user_agent {
            conf.fetcher.user_agent = user_agent.to_string();
        }
        if let Some(settle_delay_ms) = args.settle_delay_ms {
            conf.fetcher.settle_delay_ms = settle_delay_ms;
        }
        if let Some(accept_language) = &args.accept_language {
            conf.fetcher.accept_language = Some(accept_language.to_string());
        }
        if args.prefix_www {
            conf.fetcher.prefix_www = true;
        }
        if let Some(num_workers) = args.num_workers {
            conf.num_workers = num_workers;
        }
        Ok(conf)
    }
}

pub fn crawl(args: CrawlArgs) -> anyhow::Result<()> {
    let conf = SitewalkConfig::try_from(&args)?;
    let rt = runtime::Builder::new_multi_thread()
        .worker_threads(conf.num_workers)
        .enable_all()
        .build()?;

    let report = rt.block_on(async {
        let pool = ResourcePool::build(conf.crawler.pool_size, || HttpFetcher::new(&conf.fetcher))?;
        let pool = Arc::new(pool);
        let crawled = crawl_site(&args.seed, pool.clone(), conf.crawler.clone()).await;
        if let Err(e) = pool.shutdown().await {
            log::warn!("Couldn't shut fetchers down: {e:#}");
        }
        crawled
    })?;

    write_pages(&report.pages, args.output_file.as_deref())
}

#[derive(Debug, Serialize)]
struct PageRow<'a> {
    domain: &'a str,
    depth: usize,
    text: &'a str,
}

impl<'a> From<&'a PageRecord> for PageRow<'a> {
    fn from(page: &'a PageRecord) -> Self {
        Self {
            domain: page.domain(),
            depth: page.depth(),
            text: page.text.as_deref().unwrap_or_default(),
        }
    }
}

fn write_pages(pages: &[PageRecord], output: Option<&Path>) -> anyhow::Result<()> {
    let out: Box<dyn Write> = match output {
        Some(path) => {
            Box::new(File::create(path).with_context(|| format!("Couldn't create {path:?}"))?)
        }
        None => Box::new(io::stdout()),
    };
    let mut wtr = csv::Writer::from_writer(out);
    // Headers are only written along with the first row
    if pages.is_empty() {
        wtr.write_record(["domain", "depth", "text"])?;
    }
    for page in pages {
        wtr.serialize(PageRow::from(page))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Fetch a single page and print its links and text to stdout
#[derive(Debug, clap::Args)]
pub struct FetchArgs {
    /// Url of the page
    pub url: String,
    /// Custom user agent to download the page
    #[clap(long)]
    pub user_agent: Option<String>,
    /// Custom Accept-Language header
    #[clap(long)]
    pub accept_language: Option<String>,
    /// Delay before reading the loaded page
    #[clap(long, default_value_t = 0)]
    pub settle_delay_ms: u64,
    /// Request www.<domain> instead of <domain>
    #[clap(long)]
    pub prefix_www: bool,
}

impl From<&FetchArgs> for FetcherConfig {
    fn from(args: &FetchArgs) -> Self {
        let mut conf = FetcherConfig {
            settle_delay_ms: args.settle_delay_ms,
            accept_language: args.accept_language.clone(),
            prefix_www: args.prefix_www,
            ..Default::default()
        };
        if let Some(user_agent) = &args.user_agent {
            conf.user_agent = user_agent.to_string();
        }
        conf
    }
}

pub fn fetch(args: FetchArgs) -> anyhow::Result<()> {
    let conf = FetcherConfig::from(&args);
    let rt = runtime::Builder::new_current_thread().enable_all().build()?;
    let page = rt.block_on(fetch_page(&conf, &args.url))?;

    let mut out = io::stdout().lock();
    writeln!(out, "{}", page.resolved)?;
    writeln!(out)?;
    for link in &page.links {
        writeln!(out, "{link}")?;
    }
    writeln!(out)?;
    writeln!(out, "{}", page.text)?;
    Ok(())
}

fn init_logger(filters: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filters)).init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.cmd {
        SubCommand::Crawl(args) => {
            if !args.quiet {
                init_logger("sitewalk_crawler=info,sitewalk_fetch=warn");
            }
            crawl(args)
        }
        SubCommand::Fetch(args) => {
            init_logger("sitewalk_fetch=warn");
            fetch(args)
        }
        SubCommand::Completion => {
            generate(Shell::Bash, &mut Args::command(), "sitewalk", &mut io::stdout());
            Ok(())
        }
    }
}
