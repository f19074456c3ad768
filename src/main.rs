use std::env;
use std::sync::Arc;
use std::time::Duration;

use leadsite::analytics::configure;
use leadsite::estimator::parse_number;
use leadsite::{
    AnalyticsEvent, AnalyticsSink, Error, FileStore, HttpFetcher, LogAnalytics, NoAnalytics,
    OfflineCache, OpenOutcome, SectionStore, ShareNetwork, SiteConfig, SnapshotBuilder,
    SubscribeForm, SubscribeOutcome, add_section, classify, render_plan, service_worker_js,
    share_text, to_embed_url, track,
};

fn print_usage() {
    eprintln!("Usage: leadsite <COMMAND> [OPTIONS]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  estimate            Compute the snapshot from saved and given inputs");
    eprintln!("      --types <a,b>         Task types (emails, scraping, files, reports, integration)");
    eprintln!("      --volume <N>          Requests per week");
    eprintln!("      --complexity <N>      Complexity, 1 to 5");
    eprintln!("      --budget <N>          Indicated budget in euros");
    eprintln!("      --email <E>           Contact address");
    eprintln!("      --json | --copy | --mailto");
    eprintln!("  embed <url>         Show how a video link would be embedded");
    eprintln!("  video get|set|remove|open <section> [url]");
    eprintln!("  video add <title>   Create a custom section");
    eprintln!("  share <twitter|linkedin> <page-url> <title>");
    eprintln!("  cta                 Report a call-to-action click");
    eprintln!("  subscribe <email>   Post to the configured newsletter endpoint");
    eprintln!("  sw [--install]      Print the service worker, or precache from cache.origin");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <PATH> Config file (default: {})", SiteConfig::default_path().display());
    eprintln!("  -h, --help          Show this help");
}

fn usage_error(message: &str) -> ! {
    eprintln!("Error: {message}");
    eprintln!();
    print_usage();
    std::process::exit(2);
}

/// Returns the value following the flag at `args[*i]`, advancing past it.
fn flag_value(args: &[String], i: &mut usize) -> String {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .cloned()
        .unwrap_or_else(|| usage_error(&format!("{flag} requires a value")))
}

fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
}

struct App {
    config: SiteConfig,
    store: Arc<FileStore>,
    analytics: Arc<dyn AnalyticsSink>,
}

impl App {
    fn builder(&self) -> SnapshotBuilder<Arc<FileStore>, Arc<dyn AnalyticsSink>> {
        SnapshotBuilder::new(
            Arc::clone(&self.store),
            Arc::clone(&self.analytics),
            self.config.snapshot.clone(),
        )
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum EstimateOutput {
    Summary,
    Json,
    Copy,
    Mailto,
}

fn estimate(app: &App, args: &[String]) -> leadsite::Result<()> {
    let builder = app.builder();
    let mut inputs = builder.load();
    let mut output = EstimateOutput::Summary;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--types" => {
                inputs.types = flag_value(args, &mut i)
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(ToString::to_string)
                    .collect();
            }
            "--volume" => inputs.volume = parse_number(&flag_value(args, &mut i)),
            "--complexity" => inputs.complexity = parse_number(&flag_value(args, &mut i)),
            "--budget" => inputs.budget = parse_number(&flag_value(args, &mut i)),
            "--email" => {
                let email = flag_value(args, &mut i).trim().to_string();
                inputs.email = (!email.is_empty()).then_some(email);
            }
            "--json" => output = EstimateOutput::Json,
            "--copy" => output = EstimateOutput::Copy,
            "--mailto" => output = EstimateOutput::Mailto,
            other => usage_error(&format!("unknown estimate option: {other}")),
        }
        i += 1;
    }

    match output {
        EstimateOutput::Summary => {
            let snapshot = builder.generate_manual(&inputs);
            println!("{}", snapshot.headline);
            println!("{}", snapshot.description);
            println!("Plazo estimado: {} semanas", snapshot.result.lead_weeks);
            for bullet in &snapshot.result.bullets {
                println!("  - {bullet}");
            }
        }
        EstimateOutput::Json => println!("{}", builder.download(&inputs)?.body),
        EstimateOutput::Copy => println!("{}", builder.copy_summary(&inputs)),
        EstimateOutput::Mailto => println!("{}", builder.generate(&inputs).contact_link),
    }
    Ok(())
}

fn embed(args: &[String]) -> leadsite::Result<()> {
    let [url] = args else {
        usage_error("embed takes exactly one URL");
    };
    let kind = classify(url);
    println!("kind:  {kind}");
    println!(
        "embed: {}",
        to_embed_url(url, kind).unwrap_or_else(|| url.clone())
    );
    println!("plan:  {}", serde_json::to_string(&render_plan(url))?);
    Ok(())
}

fn video(app: &App, args: &[String]) -> leadsite::Result<()> {
    let sections = SectionStore::new(Arc::clone(&app.store));
    match args {
        [cmd, key] if cmd == "get" => {
            println!("{}", serde_json::to_string_pretty(&sections.render(key))?);
        }
        [cmd, key, url] if cmd == "set" => {
            let plan = sections.edit(key, Some(url.as_str()));
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        [cmd, key] if cmd == "remove" => {
            let plan = sections.remove(key, true);
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        [cmd, key] if cmd == "open" => match sections.open(key) {
            OpenOutcome::Open(url) => println!("{url}"),
            OpenOutcome::NoVideo => {
                eprintln!("No hay vídeo para esta sección.");
                std::process::exit(1);
            }
        },
        [cmd, title @ ..] if cmd == "add" => match add_section(Some(&title.join(" "))) {
            Some(section) => println!("{}\t{}", section.key, section.title),
            None => usage_error("video add requires a title"),
        },
        _ => usage_error("expected: video get|set|remove|open <section> [url]"),
    }
    Ok(())
}

fn share(app: &App, args: &[String]) {
    let [network, page_url, title] = args else {
        usage_error("expected: share <twitter|linkedin> <page-url> <title>");
    };
    let network: ShareNetwork = match network.parse() {
        Ok(network) => network,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let text = share_text(title, &app.config.share.title_suffix);
    track(
        app.analytics.as_ref(),
        &AnalyticsEvent::Share {
            network: network.as_str().to_string(),
        },
    );
    println!("{}", network.share_url(page_url, &text));
}

fn cta(app: &App) {
    let label = app.config.share.cta_label.clone();
    println!("{label}");
    track(app.analytics.as_ref(), &AnalyticsEvent::CtaClick { label });
}

async fn subscribe(app: &App, args: &[String]) -> leadsite::Result<()> {
    let [email] = args else {
        usage_error("subscribe takes exactly one email address");
    };
    let action = app
        .config
        .subscribe
        .action
        .clone()
        .ok_or_else(|| Error::Config("subscribe.action is not set".to_string()))?;

    let form = SubscribeForm::new(build_http_client()?, action);
    let outcome = form
        .submit(&[("email", email.as_str())], app.analytics.as_ref())
        .await;
    if let Some(message) = outcome.message() {
        println!("{message}");
    }
    if outcome != SubscribeOutcome::Accepted {
        std::process::exit(1);
    }
    Ok(())
}

async fn service_worker(app: &App, args: &[String]) -> leadsite::Result<()> {
    if !args.iter().any(|a| a == "--install") {
        print!("{}", service_worker_js(&app.config.cache)?);
        return Ok(());
    }

    let origin = app
        .config
        .cache
        .origin
        .clone()
        .ok_or_else(|| Error::Config("cache.origin is not set".to_string()))?;
    let cache = OfflineCache::new(
        HttpFetcher::new(build_http_client()?, origin),
        &app.config.cache,
    );
    cache.install().await?;
    cache.activate().await;
    for path in &app.config.cache.assets {
        if let Some(response) = cache.lookup(path).await {
            println!("{:>4} {:>8}  {path}", response.status, response.body.len());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> leadsite::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() || args.iter().any(|a| a == "-h" || a == "--help") {
        print_usage();
        std::process::exit(0);
    }

    let mut config_path = SiteConfig::default_path();
    if let Some(pos) = args.iter().position(|a| a == "-c" || a == "--config") {
        let mut i = pos;
        config_path = flag_value(&args, &mut i).into();
        args.drain(pos..=i);
    }

    let config = SiteConfig::load_or_create(&config_path)?;
    let store = Arc::new(FileStore::new(config.storage_path()));
    let analytics: Arc<dyn AnalyticsSink> = if config.analytics.enabled {
        Arc::new(LogAnalytics)
    } else {
        Arc::new(NoAnalytics)
    };
    configure(analytics.as_ref(), &config.analytics.measurement_id);

    let app = App {
        config,
        store,
        analytics,
    };

    let Some((command, rest)) = args.split_first() else {
        usage_error("missing command");
    };
    match command.as_str() {
        "estimate" => estimate(&app, rest),
        "embed" => embed(rest),
        "video" => video(&app, rest),
        "share" => {
            share(&app, rest);
            Ok(())
        }
        "cta" => {
            cta(&app);
            Ok(())
        }
        "subscribe" => subscribe(&app, rest).await,
        "sw" => service_worker(&app, rest).await,
        other => usage_error(&format!("unknown command: {other}")),
    }
}
