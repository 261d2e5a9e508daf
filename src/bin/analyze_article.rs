use anyhow::{bail, Context, Result};
use biaslens_lib::init_logging;
use biaslens_lib::models::{ArticleAnalysis, BiasStatus};
use biaslens_lib::services::{AnalyzeOptions, ArticleAnalyzer, ConfigStore, Credentials};

const USAGE: &str = "Usage:
  analyze_article <path.txt> [--title <title>] [--summary-file <path>] [--no-drama] [--no-summary] [--no-score] [--out <json_path>]
  analyze_article --set-key <provider>=<key>
  analyze_article --delete-key <provider>

Notes:
  - API keys come from .env / the environment (GEMINI_API_KEY, OPENAI_API_KEY, DEEPSEEK_API_KEY, HF_API_TOKEN)
    or from apiKeys in config.json.
  - BIASLENS_PROVIDER=openai:gpt-4o-mini switches the generation provider for one run.
  - --set-key / --delete-key edit apiKeys in config.json (the previous file is backed up).
  - Use - as the path to read the article from stdin.";

fn preview(s: &str, max_chars: usize) -> String {
    let mut out: String = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        out.push_str("...");
    }
    out.replace('\n', " ")
}

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf).context("read stdin failed")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("read file failed: {}", path))
}

fn print_report(result: &ArticleAnalysis) {
    println!("Request: {}", result.request_id);
    println!(
        "Paragraphs: {} (biased={}, status={:?})",
        result.paragraphs.len(),
        result.biased_count,
        result.bias_status
    );
    if let Some(ref score) = result.bias_score {
        println!("Bias score: {}/100", score.score);
        for reason in &score.reasons {
            println!("  - {}", reason);
        }
    }
    match (&result.drama, &result.drama_error) {
        (Some(drama), _) => println!(
            "Drama index: {}/100 (dominant={}, emotional={:.3}, narrative={:.3})",
            drama.drama_index,
            drama.emotion_profile.dominant().as_str(),
            drama.emotional_intensity,
            drama.narrative_intensity
        ),
        (None, Some(err)) => println!("Drama index: unavailable ({})", err),
        (None, None) => {}
    }
    if let Some(ref s) = result.bias_summary {
        println!("Bias summary: {}", s);
    }
    if let Some(ref s) = result.drama_summary {
        println!("Drama summary: {}", s);
    }
    println!();

    for (i, p) in result.paragraphs.iter().enumerate() {
        let marker = if p.is_biased {
            "BIASED"
        } else if p.status == "failed" {
            "FAILED"
        } else {
            "ok"
        };
        println!("[P{:03}] {:<6} {}", i, marker, preview(&p.text, 120));
        if p.is_biased {
            println!("        -> {}", preview(&p.unbiased_replacement, 120));
            if !p.reason_biased.is_empty() {
                println!("        reason: {}", preview(&p.reason_biased, 160));
            }
        }
        if let Some(ref err) = p.error {
            println!("        error: {}", err);
        }
    }
    println!();
    println!("Latency: {} ms", result.latency_ms);
}

/// Handle `--set-key` / `--delete-key`. Returns false when neither is present.
fn run_key_command(args: &[String], store: &ConfigStore) -> Result<bool> {
    if let Some(entry) = parse_arg_value(args, "--set-key") {
        let (provider, key) = entry
            .split_once('=')
            .map(|(p, k)| (p.trim(), k.trim()))
            .filter(|(p, k)| !p.is_empty() && !k.is_empty())
            .context("--set-key expects <provider>=<key>")?;
        store
            .set_api_key(provider, key)
            .with_context(|| format!("save config failed: {}", store.config_file().display()))?;
        println!("Stored key for {} in {}", provider, store.config_file().display());
        return Ok(true);
    }
    if let Some(provider) = parse_arg_value(args, "--delete-key") {
        store
            .delete_api_key(provider.trim())
            .with_context(|| format!("save config failed: {}", store.config_file().display()))?;
        println!("Removed key for {} from {}", provider.trim(), store.config_file().display());
        return Ok(true);
    }
    Ok(false)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Before anything reads the environment.
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || has_flag(&args, "--help") || has_flag(&args, "-h") {
        eprintln!("{}", USAGE);
        return Ok(());
    }

    init_logging();

    let store = ConfigStore::open_default()?;
    if run_key_command(&args, &store)? {
        return Ok(());
    }

    let path = args[1].clone();
    let text = read_input(&path)?;
    let summary_text = match parse_arg_value(&args, "--summary-file") {
        Some(p) => Some(read_input(&p)?),
        None => None,
    };
    let options = AnalyzeOptions {
        title: parse_arg_value(&args, "--title").unwrap_or_default(),
        summary_text,
        include_drama: !has_flag(&args, "--no-drama"),
        include_summaries: !has_flag(&args, "--no-summary"),
        include_score: !has_flag(&args, "--no-score"),
    };
    let out_path = parse_arg_value(&args, "--out");

    let mut config = store
        .load()
        .with_context(|| format!("load config failed: {}", store.config_file().display()))?;
    config.apply_env_overrides();
    let credentials = Credentials::resolve(&config)?;
    let analyzer = ArticleAnalyzer::from_config(&config, &credentials)?;

    println!("File: {}", path);
    println!("Input: {} chars", text.chars().count());
    println!("Provider: {}", config.generation.provider);
    println!();

    let result = analyzer.analyze(&text, &options).await;
    print_report(&result);

    if let Some(out_path) = out_path {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(&out_path, json).with_context(|| format!("write out failed: {}", out_path))?;
        println!("Wrote JSON: {}", out_path);
    }

    if result.bias_status == BiasStatus::Failed {
        bail!("bias analysis failed for every paragraph");
    }
    Ok(())
}
