//! skosq - Command-line interface
//!
//! Usage:
//!   skosq search <term> [--vocab <id>]...
//!   skosq transitive <vocab> <uri>
//!   skosq breadcrumbs <vocab> <uri>
//!   skosq alphabetical <vocab> <letter>
//!   skosq --dry-run children <vocab> <uri>

use anyhow::Context;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use skos_core::{
    AppConfig, LoggingConfig, Pagination, QueryForm, RawResult, RequestContext, ResultTable,
    SearchQuery, Transport,
};
use skos_sparql::{Engine, HttpTransport};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "skosq")]
#[command(about = "Query SKOS vocabularies stored in SPARQL endpoints")]
#[command(version)]
struct Cli {
    /// TOML configuration file; environment variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// UI language for labels
    #[arg(short, long, global = true, default_value = "en")]
    lang: String,

    /// Content language, when different from the UI language
    #[arg(long, global = true)]
    content_lang: Option<String>,

    /// Print the generated SPARQL instead of contacting the store
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Free-text concept search
    Search {
        term: String,
        /// Vocabulary ids to search (all when omitted)
        #[arg(short, long = "vocab")]
        vocabs: Vec<String>,
        /// Language to match labels in
        #[arg(long)]
        search_lang: Option<String>,
        /// Class URIs or prefixed names to limit results to
        #[arg(long = "type")]
        types: Vec<String>,
        #[arg(long = "scheme")]
        schemes: Vec<String>,
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        parent: Option<String>,
        /// One best match per concept
        #[arg(long)]
        unique: bool,
        /// Skip hiddenLabel matches
        #[arg(long)]
        no_hidden: bool,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        offset: Option<i64>,
    },
    /// Labels of a resource by language
    Label {
        uri: String,
        #[arg(long)]
        vocab: Option<String>,
    },
    /// Values of one property of a concept
    Property {
        vocab: String,
        uri: String,
        property: String,
        #[arg(long)]
        any_lang: bool,
    },
    /// Transitive closure along the hierarchy properties
    Transitive {
        vocab: String,
        uri: String,
        /// Hierarchy properties (the vocabulary's when omitted)
        #[arg(long = "prop")]
        props: Vec<String>,
        #[arg(long, default_value_t = 1000)]
        limit: usize,
    },
    /// Narrower concepts, collections expanded
    Children { vocab: String, uri: String },
    /// Top concepts of concept schemes
    TopConcepts {
        vocab: String,
        #[arg(long = "scheme")]
        schemes: Vec<String>,
    },
    /// Ancestor tree with siblings
    Parents { vocab: String, uri: String },
    /// Breadcrumb paths to a concept
    Breadcrumbs { vocab: String, uri: String },
    /// Concept groups
    Groups { vocab: String },
    /// Members of a concept group
    GroupContents { vocab: String, group: String },
    /// Recently created or modified concepts
    Changes {
        vocab: String,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Alphabetical index letters
    Alphabet { vocab: String },
    /// Concepts listed under an index letter
    Alphabetical {
        vocab: String,
        letter: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        offset: Option<usize>,
    },
    /// Concept schemes of a vocabulary
    Schemes { vocab: String },
    /// Description of one concept scheme
    Scheme { vocab: String, uri: String },
    /// Descriptions of concepts
    Info {
        vocab: String,
        #[arg(required = true)]
        uris: Vec<String>,
    },
    /// Classes used in a vocabulary
    Types { vocab: String },
    /// Concept counts per type
    Count { vocab: String },
    /// Label counts per language
    CountLang {
        vocab: String,
        #[arg(long = "language")]
        languages: Vec<String>,
    },
    /// Vocabulary a URI belongs to
    Guess {
        uri: String,
        #[arg(long)]
        prefer: Option<String>,
    },
}

// ============================================================================
// Dry-run transport
// ============================================================================

/// Prints every query and answers with an empty result
struct PrintingTransport;

#[async_trait]
impl Transport for PrintingTransport {
    async fn execute(
        &self,
        endpoint: &str,
        query: &str,
        form: QueryForm,
        timeout: Duration,
    ) -> skos_core::Result<RawResult> {
        println!("# endpoint: {endpoint} (timeout {}s)\n{query}\n", timeout.as_secs());
        Ok(match form {
            QueryForm::Select => RawResult::Table(ResultTable::default()),
            QueryForm::Construct => RawResult::Graph(Vec::new()),
        })
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}

// ============================================================================
// Main
// ============================================================================

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.level.as_str().into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?
            .with_env_override()?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    init_tracing(&config.logging);

    let transport: Arc<dyn Transport> = if cli.dry_run {
        Arc::new(PrintingTransport)
    } else {
        Arc::new(HttpTransport::new()?)
    };
    let engine = Engine::new(&config, transport)?;

    let mut ctx = RequestContext::new(&cli.lang);
    if let Some(lang) = &cli.content_lang {
        ctx = ctx.with_content_language(lang);
    }

    let output = run(&engine, &ctx, cli.command, config.sparql.search_results_size).await?;
    if !cli.dry_run {
        println!("{output}");
    }
    Ok(())
}

async fn run(
    engine: &Engine,
    ctx: &RequestContext,
    command: Commands,
    page_size: usize,
) -> anyhow::Result<String> {
    let json = match command {
        Commands::Search {
            term,
            vocabs,
            search_lang,
            types,
            schemes,
            group,
            parent,
            unique,
            no_hidden,
            limit,
            offset,
        } => {
            let mut search = SearchQuery::new(term)
                .with_lang(ctx.content_lang())
                .with_unique(unique)
                .with_hidden(!no_hidden)
                .with_pagination(limit.or(i64::try_from(page_size).ok()), offset);
            for id in vocabs {
                search = search.with_vocabulary(id);
            }
            for class in types {
                search = search.with_type(class);
            }
            for scheme in schemes {
                search = search.with_scheme(scheme);
            }
            if let Some(lang) = search_lang {
                search = search.with_search_lang(lang);
            }
            if let Some(group) = group {
                search = search.with_group(group);
            }
            if let Some(parent) = parent {
                search = search.with_parent(parent);
            }
            serde_json::to_string_pretty(&engine.search_concepts(&search).await?)?
        }
        Commands::Label { uri, vocab } => serde_json::to_string_pretty(
            &engine
                .query_label(vocab.as_deref(), &uri, Some(ctx.content_lang()))
                .await?,
        )?,
        Commands::Property {
            vocab,
            uri,
            property,
            any_lang,
        } => serde_json::to_string_pretty(
            &engine
                .query_property(&vocab, &uri, &property, ctx, any_lang)
                .await?,
        )?,
        Commands::Transitive {
            vocab,
            uri,
            props,
            limit,
        } => serde_json::to_string_pretty(
            &engine
                .query_transitive(&vocab, &uri, &props, ctx, limit, false)
                .await?,
        )?,
        Commands::Children { vocab, uri } => {
            serde_json::to_string_pretty(&engine.query_children(&vocab, &uri, ctx).await?)?
        }
        Commands::TopConcepts { vocab, schemes } => serde_json::to_string_pretty(
            &engine.query_top_concepts(&vocab, &schemes, ctx).await?,
        )?,
        Commands::Parents { vocab, uri } => {
            serde_json::to_string_pretty(&engine.query_parent_list(&vocab, &uri, ctx).await?)?
        }
        Commands::Breadcrumbs { vocab, uri } => {
            let crumbs = engine.breadcrumbs(&vocab, &uri, ctx).await?;
            if engine.diagnostics().cycles() > 0 {
                tracing::warn!(
                    cycles = engine.diagnostics().cycles(),
                    "Broader cycles were truncated"
                );
            }
            if engine.diagnostics().dangling() > 0 {
                tracing::warn!(
                    dangling = engine.diagnostics().dangling(),
                    "Broader concepts outside the closure were left out"
                );
            }
            serde_json::to_string_pretty(&crumbs)?
        }
        Commands::Groups { vocab } => {
            serde_json::to_string_pretty(&engine.list_concept_groups(&vocab, ctx).await?)?
        }
        Commands::GroupContents { vocab, group } => serde_json::to_string_pretty(
            &engine.list_group_contents(&vocab, &group, ctx).await?,
        )?,
        Commands::Changes { vocab, offset } => {
            serde_json::to_string_pretty(&engine.query_change_list(&vocab, ctx, offset).await?)?
        }
        Commands::Alphabet { vocab } => {
            serde_json::to_string_pretty(&engine.alphabet(&vocab, ctx).await?)?
        }
        Commands::Alphabetical {
            vocab,
            letter,
            limit,
            offset,
        } => serde_json::to_string_pretty(
            &engine
                .query_concepts_alphabetical(&vocab, &letter, ctx, Pagination::new(limit, offset))
                .await?,
        )?,
        Commands::Schemes { vocab } => {
            serde_json::to_string_pretty(&engine.query_concept_schemes(&vocab, ctx).await?)?
        }
        Commands::Scheme { vocab, uri } => {
            serde_json::to_string_pretty(&engine.query_concept_scheme(&vocab, &uri).await?)?
        }
        Commands::Info { vocab, uris } => {
            serde_json::to_string_pretty(&engine.query_concept_info(&vocab, &uris).await?)?
        }
        Commands::Types { vocab } => {
            serde_json::to_string_pretty(&engine.query_types(&vocab, ctx).await?)?
        }
        Commands::Count { vocab } => {
            serde_json::to_string_pretty(&engine.count_concepts(&vocab, ctx).await?)?
        }
        Commands::CountLang { vocab, languages } => serde_json::to_string_pretty(
            &engine.count_lang_concepts(&vocab, &languages).await?,
        )?,
        Commands::Guess { uri, prefer } => {
            let guess = engine
                .guess_vocabulary(&uri, prefer.as_deref())
                .map(|v| serde_json::json!({ "id": v.id(), "uri_space": v.uri_space() }));
            serde_json::to_string_pretty(&guess)?
        }
    };
    Ok(json)
}
