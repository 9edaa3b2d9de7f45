use anyhow::{Context, Result};
use linkshelf_config::{ClassifierConfig, Config, FetcherConfig};
use linkshelf_engine::{
    DocumentStore, FileStore, KeywordRule, KeywordTable, Outline, Resolver, plan_section_sort,
};
use linkshelf_pipeline::{ChatClassifier, HttpFetcher, ReorganizeSettings, Reorganizer};
use relative_path::RelativePathBuf;
use std::{
    env,
    path::{Path, PathBuf},
    process,
};

enum Cli {
    Reorganize { dry_run: bool, path: Option<PathBuf> },
    Sort { heading: String, path: Option<PathBuf> },
}

const USAGE: &str = "Usage: linkshelf [--dry-run] [document-path]\n       linkshelf sort <heading> [document-path]";

fn parse_args(args: &[String]) -> Result<Cli, String> {
    if args.get(1).map(String::as_str) == Some("sort") {
        let heading = args
            .get(2)
            .ok_or_else(|| format!("Error: sort needs a heading\n{USAGE}"))?;
        if args.len() > 4 {
            return Err(format!("Error: too many arguments\n{USAGE}"));
        }
        return Ok(Cli::Sort {
            heading: heading.clone(),
            path: args.get(3).map(PathBuf::from),
        });
    }

    let mut dry_run = false;
    let mut path = None;
    for arg in &args[1..] {
        if arg == "--dry-run" {
            dry_run = true;
        } else if !arg.starts_with('-') && path.is_none() {
            path = Some(PathBuf::from(arg));
        } else {
            return Err(format!("Error: unexpected argument '{arg}'\n{USAGE}"));
        }
    }
    Ok(Cli::Reorganize { dry_run, path })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(message) => {
            eprintln!("{message}");
            process::exit(2);
        }
    };

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to load config file: {e}");
            process::exit(1);
        }
    };

    let cli_path = match &cli {
        Cli::Reorganize { path, .. } | Cli::Sort { path, .. } => path.clone(),
    };
    let document_path;
    let from_config;
    match (cli_path, &config) {
        (Some(path), _) => {
            document_path = path;
            from_config = false;
        }
        (None, Some(config)) => {
            document_path = config.document_path.clone();
            from_config = true;
        }
        (None, None) => {
            eprintln!("Error: no document path provided and no config file found");
            eprintln!("{USAGE}");
            eprintln!("Or create a config file at {}", Config::config_path().display());
            process::exit(1);
        }
    }

    if !document_path.is_file() {
        let source = if from_config {
            format!(" from config file '{}'", Config::config_path().display())
        } else {
            String::new()
        };
        eprintln!(
            "Error: document path '{}'{} is not a file",
            document_path.display(),
            source
        );
        process::exit(1);
    }

    let root = document_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();
    let name = document_path
        .file_name()
        .context("document path has no file name")?
        .to_string_lossy()
        .into_owned();
    let id = RelativePathBuf::from(name);
    let store = FileStore::new(root);

    let fallback_heading = config
        .as_ref()
        .map(|c| c.fallback_heading.clone())
        .unwrap_or_else(|| "Unsorted".to_string());

    match cli {
        Cli::Sort { heading, .. } => {
            let bytes = store.fetch(&id)?;
            let outline = Outline::from_bytes(&bytes, &fallback_heading)?;
            let Some(target) = outline.heading_by_text(&heading) else {
                eprintln!("Error: no heading '{heading}' in {}", document_path.display());
                process::exit(1);
            };
            let ops = plan_section_sort(&outline, target);
            if ops.is_empty() {
                println!("Section '{heading}' is already sorted.");
            } else {
                store.commit(&id, &ops)?;
                println!("Sorted section '{heading}'.");
            }
        }
        Cli::Reorganize { dry_run, .. } => {
            let classifier_config = config
                .as_ref()
                .map(|c| c.classifier.clone())
                .unwrap_or_else(ClassifierConfig::default);
            let fetcher_config = config
                .as_ref()
                .map(|c| c.fetcher.clone())
                .unwrap_or_else(FetcherConfig::default);
            let rules: Vec<KeywordRule> = config
                .as_ref()
                .map(|c| {
                    c.categories
                        .iter()
                        .map(|r| KeywordRule {
                            heading: r.heading.clone(),
                            keywords: r.keywords.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default();
            let threshold = config
                .as_ref()
                .map(|c| c.similarity_threshold)
                .unwrap_or(Resolver::DEFAULT_THRESHOLD);

            let api_key = env::var(&classifier_config.api_key_env).with_context(|| {
                format!(
                    "environment variable {} is not set",
                    classifier_config.api_key_env
                )
            })?;
            let classifier = ChatClassifier::new(
                api_key,
                classifier_config.base_url.clone(),
                classifier_config.model.clone(),
                classifier_config.timeout_secs,
            );
            let fetcher = HttpFetcher::new(
                fetcher_config.timeout_secs,
                fetcher_config.max_content_chars,
            );
            let reorganizer = Reorganizer::new(
                store,
                fetcher,
                classifier,
                Resolver::new(KeywordTable::new(rules), threshold),
                fallback_heading,
                ReorganizeSettings {
                    batch_size: classifier_config.batch_size,
                    max_retries: classifier_config.max_retries,
                },
            );

            if dry_run {
                let (plan, errors) = reorganizer.plan(&id).await?;
                println!(
                    "Would move {} links, skip {}.",
                    plan.moved,
                    plan.skipped.len()
                );
                for op in &plan.ops {
                    println!("  {op}");
                }
                for error in &errors {
                    eprintln!("  {error}");
                }
            } else {
                let summary = reorganizer.reorganize(&id).await?;
                println!("Moved {} links, skipped {}.", summary.moved, summary.skipped);
                for error in &summary.errors {
                    eprintln!("  {error}");
                }
            }
        }
    }

    Ok(())
}
