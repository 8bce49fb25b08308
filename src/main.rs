use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser};
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;
use text_collector::render::{self, spinner};
use text_collector::{
    answer_question, create_index, create_provider, query_index, EmbeddingClient, Settings,
    VectorStore,
};
use tracing_subscriber::EnvFilter;

/// Semantic search and question answering over your text files
#[derive(Parser, Debug)]
#[command(name = "text-collector", version, about)]
#[command(group(
    ArgGroup::new("action")
        .required(true)
        .args(["index", "query", "ask"])
))]
struct Cli {
    /// Text files or directories to index
    #[arg(long, num_args = 1.., value_name = "PATH")]
    index: Option<Vec<PathBuf>>,

    /// Search the collection and show the closest chunks
    #[arg(long, value_name = "TEXT")]
    query: Option<String>,

    /// Retrieve with QUERY, then have the language model answer QUESTION
    #[arg(long, num_args = 2, value_names = ["QUERY", "QUESTION"])]
    ask: Option<Vec<String>>,

    /// Collection to index into or search [default: text_collection]
    #[arg(long, env = "TEXT_COLLECTOR_COLLECTION")]
    collection_name: Option<String>,

    /// SQLite index file [default: text_collector.db]
    #[arg(long, env = "TEXT_COLLECTOR_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Maximum characters per chunk [default: 1000]
    #[arg(long, allow_negative_numbers = true)]
    chunk_size: Option<i64>,

    /// Characters shared between adjacent chunks [default: 100]
    #[arg(long, allow_negative_numbers = true)]
    chunk_overlap: Option<i64>,

    /// Number of chunks to retrieve [default: 5]
    #[arg(long)]
    num_results: Option<usize>,

    /// Sentence embedding model served by the embedding server
    #[arg(long, env = "TEXT_COLLECTOR_EMBEDDING_MODEL")]
    embedding_model: Option<String>,

    /// Base URL of the embedding server [default: http://localhost:18115]
    #[arg(long, env = "TEXT_COLLECTOR_EMBEDDING_ENDPOINT")]
    embedding_endpoint: Option<String>,

    /// Language model for --ask; names starting with "deepseek" use DeepSeek
    #[arg(long, env = "TEXT_COLLECTOR_MODEL")]
    model: Option<String>,

    /// Sampling temperature between 0 and 1 [default: 0.7]
    #[arg(long, allow_negative_numbers = true)]
    temperature: Option<f32>,

    /// Re-index files even if they have not changed
    #[arg(long)]
    force: bool,

    /// Settings file [default: ./text_collector.toml if present]
    #[arg(long, env = "TEXT_COLLECTOR_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Flags given on the command line win over the settings file
    fn apply(&self, settings: &mut Settings) {
        if let Some(name) = &self.collection_name {
            settings.collection_name = name.clone();
        }
        if let Some(path) = &self.db_path {
            settings.db_path = path.clone();
        }
        if let Some(size) = self.chunk_size {
            settings.chunk_size = size;
        }
        if let Some(overlap) = self.chunk_overlap {
            settings.chunk_overlap = overlap;
        }
        if let Some(n) = self.num_results {
            settings.num_results = n;
        }
        if let Some(model) = &self.embedding_model {
            settings.embedding_model = model.clone();
        }
        if let Some(endpoint) = &self.embedding_endpoint {
            settings.embedding_endpoint = endpoint.clone();
        }
        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        if let Some(temperature) = self.temperature {
            settings.temperature = temperature;
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "text_collector=debug"
    } else {
        "text_collector=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    cli.apply(&mut settings);
    settings.chunk_config()?;

    let embedder = EmbeddingClient::with_model(
        settings.embedding_endpoint.clone(),
        settings.embedding_model_info(),
    );
    let mut store = VectorStore::open(&settings.db_path).context(format!(
        "Failed to open index at {}",
        settings.db_path.display()
    ))?;

    if let Some(paths) = &cli.index {
        let report = create_index(paths, &settings, cli.force, &embedder, &mut store).await?;

        println!(
            "{} {} files ({} chunks) into '{}'",
            style("Indexed").green().bold(),
            report.files_indexed,
            report.chunks,
            settings.collection_name
        );
        if report.files_skipped > 0 {
            println!(
                "{} {} unchanged files (use --force to re-index)",
                style("Skipped").yellow(),
                report.files_skipped
            );
        }
        if report.files_failed > 0 {
            println!(
                "{} {} files could not be read",
                style("Failed").red(),
                report.files_failed
            );
        }
    } else if let Some(query) = &cli.query {
        println!("{}", render::query_panel(query));

        let pb = spinner(format!("Querying {}...", settings.collection_name));
        let hits = query_index(query, &settings, &embedder, &store).await;
        pb.finish_and_clear();
        let hits = hits?;

        if hits.is_empty() {
            println!("No matching results found.");
        }
        for hit in &hits {
            println!("{}", render::result_panel(hit));
        }
    } else if let Some(ask) = &cli.ask {
        let [search_query, question] = ask.as_slice() else {
            bail!("--ask takes a search query and a question");
        };

        // Fail on a missing API key before doing any retrieval
        let llm = create_provider(&settings.model)?;

        println!("{}", render::question_panel(question));

        let pb = spinner(format!("Querying {}...", settings.collection_name));
        let answer = answer_question(
            search_query,
            question,
            &settings,
            &embedder,
            &store,
            llm.as_ref(),
        )
        .await;
        pb.finish_and_clear();

        match answer? {
            Some(answer) => println!("{}", render::answer_panel(&answer.text)),
            None => println!("No relevant context found to answer the question."),
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("text-collector").chain(args.iter().copied()))
    }

    #[test]
    fn test_action_required() {
        let err = parse(&["--num-results", "3"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_actions_exclusive() {
        let err = parse(&["--query", "moon", "--index", "notes"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_index_many_paths() {
        let cli = parse(&["--index", "a.txt", "docs", "--force"]).unwrap();
        assert_eq!(
            cli.index,
            Some(vec![PathBuf::from("a.txt"), PathBuf::from("docs")])
        );
        assert!(cli.force);
    }

    #[test]
    fn test_ask_takes_two_values() {
        let cli = parse(&["--ask", "moon orbit", "What does the moon do?"]).unwrap();
        assert_eq!(
            cli.ask,
            Some(vec![
                "moon orbit".to_string(),
                "What does the moon do?".to_string()
            ])
        );

        assert!(parse(&["--ask", "only one"]).is_err());
    }

    #[test]
    fn test_negative_chunk_size_reaches_validation() {
        let cli = parse(&["--query", "q", "--chunk-size", "-5"]).unwrap();
        let mut settings = Settings::default();
        cli.apply(&mut settings);

        assert_eq!(settings.chunk_size, -5);
        assert!(settings.chunk_config().is_err());
    }

    #[test]
    fn test_flags_override_settings() {
        let cli = parse(&[
            "--query",
            "q",
            "--collection-name",
            "books",
            "--num-results",
            "9",
            "--model",
            "deepseek-chat",
            "--temperature",
            "0.1",
        ])
        .unwrap();

        let mut settings = Settings::from_toml_str("collection_name = \"file\"\nchunk_size = 300").unwrap();
        cli.apply(&mut settings);

        assert_eq!(settings.collection_name, "books");
        assert_eq!(settings.num_results, 9);
        assert_eq!(settings.model, "deepseek-chat");
        assert_eq!(settings.chunk_size, 300);
        assert!((settings.temperature - 0.1).abs() < 1e-6);
    }
}
