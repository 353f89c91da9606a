//! Command-line interface for estate-rs

mod table;

use anyhow::{Context as _, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use estate_advisor::{
    AdvisorConfig, DocumentRetriever, InvestmentResponse, KeywordIndex, LlmSynthesizer,
    MarkdownReportRenderer, OfflineSynthesizer, Orchestrator, ReportQueue, SearchFilter,
    Synthesizer,
};
use estate_core::protocol::InvestmentAnalysisRequest;
use estate_core::{InvestmentContext, InvestmentGoal, PropertyFacts, PropertyType, RiskLevel};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const REPORT_QUEUE_CAPACITY: usize = 8;

#[derive(Parser, Debug)]
#[command(name = "estate")]
#[command(about = "Property investment analysis", long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Document corpus (overrides DOCUMENTS_PATH)
    #[arg(long, global = true)]
    documents: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze an investment opportunity
    Analyze(AnalyzeArgs),
    /// Search the document corpus
    Search {
        #[arg(short, long)]
        query: String,
        #[arg(short = 'k', long, default_value_t = 5)]
        top_k: usize,
        /// Exact category, e.g. rera_compliance
        #[arg(long)]
        category: Option<String>,
        /// Restrict to documents tagged for this city (or All/Multiple)
        #[arg(long)]
        city: Option<String>,
    },
    /// Show corpus statistics
    Stats,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// JSON file holding `property_data` and `investment_context`
    #[arg(long, conflicts_with_all = ["city", "locality", "size"])]
    request: Option<PathBuf>,

    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    locality: Option<String>,
    #[arg(long, default_value = "Apartment")]
    property_type: PropertyType,
    /// Built-up area in square feet
    #[arg(long)]
    size: Option<f64>,
    #[arg(long, default_value_t = 2)]
    bedrooms: u32,
    #[arg(long, default_value_t = 2)]
    bathrooms: u32,
    /// Age in years
    #[arg(long, default_value_t = 0)]
    age: u32,
    /// Distance to the nearest metro station in km
    #[arg(long)]
    distance: Option<f64>,
    #[arg(long)]
    parking: bool,

    /// Holding horizon in years
    #[arg(long, default_value_t = 5)]
    horizon: u32,
    #[arg(long, default_value = "both")]
    goal: InvestmentGoal,
    #[arg(long, default_value = "medium")]
    risk: RiskLevel,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Skip writing the Markdown report
    #[arg(long)]
    no_report: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

impl AnalyzeArgs {
    async fn into_request(&self) -> anyhow::Result<InvestmentAnalysisRequest> {
        if let Some(path) = &self.request {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading request {}", path.display()))?;
            return serde_json::from_str(&raw)
                .with_context(|| format!("parsing request {}", path.display()));
        }

        let (Some(city), Some(locality), Some(size)) = (&self.city, &self.locality, self.size)
        else {
            bail!("either --request or all of --city, --locality and --size are required");
        };

        Ok(InvestmentAnalysisRequest {
            property_data: PropertyFacts {
                city: city.clone(),
                locality: locality.clone(),
                property_type: self.property_type,
                size_sqft: size,
                bedrooms: self.bedrooms,
                bathrooms: self.bathrooms,
                property_age: self.age,
                distance_to_transit_km: self.distance,
                has_parking: self.parking,
                floor: None,
                amenities: Vec::new(),
            },
            investment_context: InvestmentContext {
                investment_horizon_years: self.horizon,
                primary_goal: self.goal,
                risk_tolerance: self.risk,
                budget_range_min: None,
                budget_range_max: None,
            },
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.json_logs {
        estate_utils::init_tracing_json("info");
    } else {
        estate_utils::init_tracing("info");
    }

    let mut builder = AdvisorConfig::builder().with_env();
    if let Some(path) = &cli.documents {
        builder = builder.documents_path(path.clone());
    }
    let config = Arc::new(builder.build()?);

    match &cli.command {
        Commands::Analyze(args) => analyze(config, args).await,
        Commands::Search {
            query,
            top_k,
            category,
            city,
        } => {
            let index = KeywordIndex::load(&config.documents_path).await?;
            let mut filter = category
                .as_ref()
                .map_or_else(SearchFilter::none, SearchFilter::category);
            if let Some(city) = city {
                filter = filter.with_locations(SearchFilter::city_scope(city));
            }
            let hits = index.search(query, *top_k, &filter).await?;
            println!("{}", table::search_results(&hits));
            Ok(())
        }
        Commands::Stats => {
            let index = KeywordIndex::load(&config.documents_path).await?;
            println!("{}", table::corpus_stats(&index.stats()));
            Ok(())
        }
    }
}

async fn analyze(config: Arc<AdvisorConfig>, args: &AnalyzeArgs) -> anyhow::Result<()> {
    let request = args.into_request().await?;
    request.property_data.validate()?;
    request.investment_context.validate()?;

    let retriever = Arc::new(KeywordIndex::load(&config.documents_path).await?);
    let synthesizer: Arc<dyn Synthesizer> = if config.has_llm_credentials() {
        Arc::new(LlmSynthesizer::from_config(Arc::clone(&config))?)
    } else {
        info!("No LLM credentials configured, narrative will use the fallback analysis");
        Arc::new(OfflineSynthesizer)
    };

    let orchestrator = Orchestrator::builder()
        .config(Arc::clone(&config))
        .retriever(retriever)
        .synthesizer(synthesizer)
        .build()?;

    let request_id = Uuid::new_v4();
    info!("Processing investment analysis request {}", request_id);

    // Dropping the analysis future cancels whichever collaborator call is in flight
    let analysis = tokio::select! {
        result = orchestrator.analyze(&request.property_data, &request.investment_context) => result?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, abandoning request {}", request_id);
            bail!("analysis cancelled");
        }
    };

    let mut response = InvestmentResponse::from_analysis(
        request_id,
        &request.property_data,
        analysis,
        config.response_document_limit,
    );

    let queue = if args.no_report {
        None
    } else {
        let queue = ReportQueue::spawn(
            Arc::new(MarkdownReportRenderer::new(&config.reports_dir)),
            REPORT_QUEUE_CAPACITY,
        );
        response.report_path = Some(config.reports_dir.join(response.report_file_name()));
        queue.submit(response.clone()).await?;
        Some(queue)
    };

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
        OutputFormat::Table => println!("{}", table::analysis_report(&response)),
    }

    if let Some(queue) = queue {
        let stats = queue.shutdown().await?;
        if stats.failed() > 0 {
            warn!("{} report(s) failed to render", stats.failed());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze_args(argv: &[&str]) -> AnalyzeArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Commands::Analyze(args) => args,
            other => panic!("Expected analyze, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_request_from_flags() {
        let args = analyze_args(&[
            "estate", "analyze", "--city", "Mumbai", "--locality", "Andheri", "--size", "1200",
            "--age", "5", "--distance", "1.5", "--goal", "rental", "--risk", "low",
            "--property-type", "villa",
        ]);

        let request = args.into_request().await.unwrap();

        assert_eq!(request.property_data.city, "Mumbai");
        assert_eq!(request.property_data.property_type, PropertyType::Villa);
        assert_eq!(request.property_data.distance_to_transit_km, Some(1.5));
        assert_eq!(request.investment_context.primary_goal, InvestmentGoal::Rental);
        assert_eq!(request.investment_context.risk_tolerance, RiskLevel::Low);
        assert_eq!(args.format, OutputFormat::Table);
    }

    #[tokio::test]
    async fn test_missing_flags_rejected() {
        let args = analyze_args(&["estate", "analyze", "--city", "Pune"]);
        assert!(args.into_request().await.is_err());
    }

    #[test]
    fn test_request_conflicts_with_flags() {
        let result = Cli::try_parse_from(["estate", "analyze", "--request", "r.json", "--city", "Pune"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_goal_rejected() {
        let result = Cli::try_parse_from(["estate", "analyze", "--goal", "flip"]);
        assert!(result.is_err());
    }
}
