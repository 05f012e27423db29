use std::env;

use sdgchat_core::config::Config;
use sdgchat_core::types::Language;
use sdgchat_pipeline::ChatService;

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {} <ask|cache-info|cache-clear> [args...]", prog);
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "ask" => {
            let question = args.first().cloned().unwrap_or_else(|| {
                eprintln!("Usage: sdgchat ask \"<question>\" [en|fr]");
                std::process::exit(1)
            });
            let lang = args
                .get(1)
                .and_then(|s| Language::parse(s))
                .unwrap_or(Language::English);
            let service = ChatService::initialize(&config)?;
            let answer = service.answer(&question, lang).await;
            println!("{}", answer);
        }
        "cache-info" => {
            let service = ChatService::initialize(&config)?;
            let info = service.cache_info()?;
            if info.files.is_empty() {
                println!("Cache is empty.");
            } else {
                for file in &info.files {
                    println!("{:>10} B  {}", file.size_bytes, file.name);
                }
                println!("{} files, {} bytes total", info.file_count(), info.total_size_bytes);
            }
        }
        "cache-clear" => {
            let service = ChatService::initialize(&config)?;
            service.clear_cache()?;
            println!("✅ Cache cleared. Next startup will be slower.");
        }
        _ => {
            eprintln!("Unknown command: {}", cmd);
            std::process::exit(1);
        }
    }
    Ok(())
}
