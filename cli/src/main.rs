//! planscope CLI - plan-to-estimate pipeline tool

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use planscope::model::{FactorSource, Permit, Severity};
use planscope::pipeline::NoopProgress;
use planscope::render::{to_json, JsonFormat};
use planscope::{
    CostBook, Diagnostic, ExtractOptions, Jurisdiction, LocationKey, Pipeline, PricingEngine,
    PricingOptions, QuantityExtractor, RegionalFactorResolver, RegionalTable, RuleEngine,
    RunRequest, SourceDocument, SpecTier, Stage,
};

#[derive(Parser)]
#[command(name = "planscope")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Extract quantities, check code compliance and estimate costs from plan sets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: extract, check and estimate
    Run {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        jurisdiction: JurisdictionArgs,

        #[command(flatten)]
        location: LocationArgs,

        #[command(flatten)]
        pricing: PricingArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Extract the plan graph only
    Extract {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Check plan sets against building-code rule packs
    Check {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        jurisdiction: JurisdictionArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show the regional factor resolved for a location
    Factors {
        #[command(flatten)]
        location: LocationArgs,
    },

    /// Show version information
    Version,
}

#[derive(Args)]
struct InputArgs {
    /// Plan documents (PDF, text, CSV or JSON)
    #[arg(value_name = "FILES", required = true)]
    files: Vec<PathBuf>,

    /// Characters kept in each sheet excerpt
    #[arg(long, default_value = "500")]
    excerpt_chars: usize,

    /// Fail a document when any of its pages cannot be read
    #[arg(long)]
    strict: bool,
}

#[derive(Args)]
struct JurisdictionArgs {
    /// Two-letter state code
    #[arg(long, env = "PLANSCOPE_STATE", default_value = planscope::model::DEFAULT_STATE)]
    state: String,

    /// Adopted code set (e.g. IRC2018_IECC2015_NEC2017_GA)
    #[arg(long, env = "PLANSCOPE_CODE_SET", default_value = planscope::model::DEFAULT_CODE_SET)]
    code_set: String,
}

#[derive(Args)]
struct LocationArgs {
    /// Project ZIP code
    #[arg(long, env = "PLANSCOPE_ZIP")]
    zip: Option<String>,

    /// Core-based statistical area code
    #[arg(long, env = "PLANSCOPE_CBSA")]
    cbsa: Option<String>,

    /// Region name (e.g. Atlanta_GA)
    #[arg(long, env = "PLANSCOPE_REGION")]
    region: Option<String>,

    /// Regional tables JSON file (built-in tables if not specified)
    #[arg(long, env = "PLANSCOPE_REGIONS", value_name = "FILE")]
    regions: Option<PathBuf>,
}

#[derive(Args)]
struct PricingArgs {
    /// Spec tier: standard, premium or luxury
    #[arg(long, env = "PLANSCOPE_TIER", default_value = "standard")]
    tier: String,

    /// Overhead percentage
    #[arg(long, default_value = "10")]
    overhead: f64,

    /// Profit percentage
    #[arg(long, default_value = "10")]
    profit: f64,

    /// Contingency percentage
    #[arg(long, default_value = "5")]
    contingency: f64,

    /// Cost book JSON file (built-in catalog if not specified)
    #[arg(long, env = "PLANSCOPE_CATALOG", value_name = "FILE")]
    catalog: Option<PathBuf>,
}

#[derive(Args)]
struct OutputArgs {
    /// Output file (stdout if not specified)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output compact JSON
    #[arg(long)]
    compact: bool,
}

impl InputArgs {
    fn documents(&self) -> Result<Vec<SourceDocument>, Box<dyn std::error::Error>> {
        let mut documents = Vec::with_capacity(self.files.len());
        for path in &self.files {
            documents.push(SourceDocument::from_path(path)?);
        }
        log::debug!("Read {} documents", documents.len());
        Ok(documents)
    }

    fn options(&self) -> ExtractOptions {
        let options = ExtractOptions::new().with_excerpt_chars(self.excerpt_chars);
        if self.strict {
            options
        } else {
            options.lenient()
        }
    }
}

impl JurisdictionArgs {
    fn jurisdiction(&self) -> Jurisdiction {
        Jurisdiction::new(self.state.trim().to_uppercase(), self.code_set.trim())
    }
}

impl LocationArgs {
    fn key(&self) -> LocationKey {
        LocationKey {
            zip: self.zip.clone(),
            cbsa: self.cbsa.clone(),
            region: self.region.clone(),
        }
    }

    fn resolver(&self) -> Result<RegionalFactorResolver, Box<dyn std::error::Error>> {
        let table = match &self.regions {
            Some(path) => RegionalTable::from_path(path)?,
            None => RegionalTable::builtin(),
        };
        Ok(RegionalFactorResolver::new(Arc::new(table)))
    }
}

impl PricingArgs {
    fn tier(&self) -> SpecTier {
        self.tier.parse().unwrap_or_else(|e| {
            eprintln!("{}: {}; using Standard", "Warning".yellow().bold(), e);
            SpecTier::Standard
        })
    }

    fn engine(&self) -> Result<PricingEngine, Box<dyn std::error::Error>> {
        let options = PricingOptions::new()
            .with_overhead(self.overhead)
            .with_profit(self.profit)
            .with_contingency(self.contingency);
        options.validate()?;
        let book = match &self.catalog {
            Some(path) => CostBook::from_path(path)?,
            None => CostBook::builtin(),
        };
        Ok(PricingEngine::new(Arc::new(book), options))
    }
}

impl OutputArgs {
    fn format(&self) -> JsonFormat {
        if self.compact {
            JsonFormat::Compact
        } else {
            JsonFormat::Pretty
        }
    }

    fn write(&self, json: &str) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(path) = &self.output {
            fs::write(path, json)?;
            eprintln!("{} {}", "Saved to".green(), path.display());
        } else {
            println!("{}", json);
        }
        Ok(())
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Run {
            input,
            jurisdiction,
            location,
            pricing,
            output,
        }) => cmd_run(&input, &jurisdiction, &location, &pricing, &output),
        Some(Commands::Extract { input, output }) => cmd_extract(&input, &output),
        Some(Commands::Check {
            input,
            jurisdiction,
            output,
        }) => cmd_check(&input, &jurisdiction, &output),
        Some(Commands::Factors { location }) => cmd_factors(&location),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            println!("{}", "Usage: planscope <COMMAND> [FILES]...".yellow());
            println!("       planscope --help for more information");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn cmd_run(
    input: &InputArgs,
    jurisdiction: &JurisdictionArgs,
    location: &LocationArgs,
    pricing: &PricingArgs,
    output: &OutputArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = RunRequest::new(input.documents()?)
        .with_jurisdiction(jurisdiction.jurisdiction())
        .with_location(location.key())
        .with_spec_tier(pricing.tier());

    let pipeline = Pipeline::new()
        .with_extractor(QuantityExtractor::new(input.options()))
        .with_rule_engine(RuleEngine::default())
        .with_resolver(location.resolver()?)
        .with_pricing_engine(pricing.engine()?)
        .with_progress(Arc::new(NoopProgress));

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")?
            .progress_chars("#>-"),
    );

    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(async {
        let handle = pipeline.spawn(request);
        let mut status = handle.subscribe();
        while status.changed().await.is_ok() {
            let event = status.borrow_and_update().clone();
            pb.set_position(u64::from(event.percent));
            pb.set_message(event.message);
        }
        handle.wait().await
    });

    if outcome.status != Stage::Complete {
        pb.abandon_with_message(format!("{}", outcome.status));
        let cause = outcome.error.unwrap_or_else(|| outcome.status.to_string());
        return Err(format!("run {} stopped at {}: {}", outcome.run_id, outcome.stage, cause).into());
    }
    pb.finish_with_message("Done!");

    let Some(result) = outcome.result else {
        return Err("run completed without a result".into());
    };

    let summary = &result.estimate.summary;
    eprintln!("\n{}", "Estimate".cyan().bold());
    eprintln!("{}", "─".repeat(40).dimmed());
    eprintln!("{}: {}", "Quantities".bold(), result.plan_graph.quantities.len());
    eprintln!("{}: {}", "Findings".bold(), result.compliance.findings.len());
    eprintln!("{}: {:.2}", "Subtotal".bold(), summary.subtotal);
    eprintln!("{}: {:.2}", "Grand total".bold(), summary.grand_total);
    eprintln!("{}: {:.2}", "Allowances".bold(), result.estimate.allowance_total());
    print_diagnostics(&outcome.diagnostics);

    output.write(&to_json(&result, output.format())?)
}

fn cmd_extract(input: &InputArgs, output: &OutputArgs) -> Result<(), Box<dyn std::error::Error>> {
    let documents = input.documents()?;
    let graph = QuantityExtractor::new(input.options()).extract(&documents);

    let summary = &graph.metadata.confidence_summary;
    eprintln!(
        "{} {} quantities ({} high, {} medium, {} low) from {} pages",
        "Extracted".green(),
        graph.quantities.len(),
        summary.high,
        summary.medium,
        summary.low,
        graph.metadata.total_pages
    );
    print_diagnostics(&graph.document_errors);

    output.write(&to_json(&graph, output.format())?)
}

fn cmd_check(
    input: &InputArgs,
    jurisdiction: &JurisdictionArgs,
    output: &OutputArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let documents = input.documents()?;
    let graph = QuantityExtractor::new(input.options()).extract(&documents);
    let report = RuleEngine::default().evaluate(&graph, &jurisdiction.jurisdiction());

    eprintln!(
        "{} {} ({})",
        "Compliance".cyan().bold(),
        report.jurisdiction,
        report.activated_packs.join(", ")
    );
    eprintln!("{}", "─".repeat(40).dimmed());
    for finding in &report.findings {
        let code = match finding.severity {
            Severity::Red => finding.code().red().bold(),
            Severity::Orange => finding.code().truecolor(255, 165, 0).bold(),
            Severity::Yellow => finding.code().yellow(),
            Severity::Unknown => finding.code().normal(),
        };
        eprintln!("  {} {} {}", code, finding.location, finding.code_citation.dimmed());
    }
    print_diagnostics(&report.errors);

    output.write(&to_json(&report, output.format())?)
}

fn cmd_factors(location: &LocationArgs) -> Result<(), Box<dyn std::error::Error>> {
    let key = location.key();
    let (factor, misses) = location.resolver()?.resolve(&key);

    println!("{}", "Regional Factor".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Location".bold(), key);
    println!("{}: {}", "Region".bold(), factor.region);
    let source = match factor.source {
        FactorSource::Zip => "ZIP override",
        FactorSource::Cbsa => "CBSA override",
        FactorSource::Region => "regional base",
        FactorSource::Neutral => "neutral default",
    };
    println!("{}: {}", "Source".bold(), source);
    println!("{}: {:.2}", "Labor index".bold(), factor.labor_idx);
    println!("{}: {:.2}", "Material index".bold(), factor.material_idx);
    println!("{}: {:.2}", "Demo index".bold(), factor.demo_idx);
    match factor.permit {
        Permit::Index(idx) => println!("{}: index {:.2}", "Permit".bold(), idx),
        Permit::FlatFee(fee) => println!("{}: flat fee {:.2}", "Permit".bold(), fee),
    }
    if let Some(date) = factor.effective_date {
        println!("{}: {}", "Effective".bold(), date);
    }
    print_diagnostics(&misses);

    Ok(())
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for d in diagnostics {
        eprintln!("{} {}", "warning:".yellow().bold(), d);
    }
}

fn cmd_version() {
    println!("{} {}", "planscope".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Construction plan-to-estimate pipeline");
    println!();
    println!("License: MIT");
}
