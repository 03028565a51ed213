//! TrialGraph CLI — dual-store clinical-trial metadata repository.
//!
//! Usage:
//!   trialgraph create-trial <TITLE> --phase 3 --status active ... [--db-dir path]
//!   trialgraph create-drug <NAME> --molecule-type peptide ...
//!   trialgraph link <SOURCE> <TARGET> <KIND>
//!   trialgraph search [--status active] [--sponsor Novo] [--drug-name semaglutide]
//!   trialgraph reconcile [ID] [--repair]

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use trialgraph::store::{FieldFilter, SqliteDocumentStore, SqliteGraphStore};
use trialgraph::{
    DrugRecord, EntityId, EntityKind, EntityPayload, FederatedQuery, Properties, RepositoryApi,
    TrialPhase, TrialRecord, TrialStatus,
};

#[derive(Parser)]
#[command(
    name = "trialgraph",
    version,
    about = "Dual-store coordination layer for clinical-trial metadata"
)]
struct Cli {
    /// Directory holding the two store databases
    #[arg(long, global = true)]
    db_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a clinical trial
    CreateTrial {
        /// Trial title
        title: String,
        /// ClinicalTrials.gov identifier
        #[arg(long)]
        nct_id: Option<String>,
        /// Trial phase (1-4)
        #[arg(long)]
        phase: TrialPhase,
        /// Lifecycle status
        #[arg(long, default_value = "planned")]
        status: TrialStatus,
        /// Trial start date (RFC 3339)
        #[arg(long)]
        start_date: DateTime<Utc>,
        /// Trial end date (RFC 3339)
        #[arg(long)]
        end_date: Option<DateTime<Utc>>,
        /// Trial description
        #[arg(long)]
        description: String,
        /// Primary outcome measure
        #[arg(long)]
        primary_outcome: String,
        /// Sponsoring organization
        #[arg(long)]
        sponsor: String,
        /// Use this identifier instead of generating one
        #[arg(long)]
        id: Option<String>,
    },
    /// Register a drug compound
    CreateDrug {
        /// Compound name
        name: String,
        /// Molecule type (e.g. small-molecule, peptide, antibody)
        #[arg(long)]
        molecule_type: String,
        /// Mechanism of action
        #[arg(long)]
        mechanism: String,
        /// Target protein (repeatable)
        #[arg(long = "target-protein")]
        target_proteins: Vec<String>,
        /// Use this identifier instead of generating one
        #[arg(long)]
        id: Option<String>,
    },
    /// Fetch an entity with its relationships
    Get {
        /// Entity identifier
        id: String,
    },
    /// Delete an entity and its incident edges
    Delete {
        /// Entity identifier
        id: String,
    },
    /// Create a relationship between two entities
    Link {
        /// Source entity identifier
        source: String,
        /// Target entity identifier
        target: String,
        /// Relationship kind (tests, produces, related-to, or custom)
        kind: String,
    },
    /// Remove a relationship
    Unlink {
        /// Source entity identifier
        source: String,
        /// Target entity identifier
        target: String,
        /// Relationship kind
        kind: String,
    },
    /// Search entities with field filters and graph constraints
    Search {
        /// Entity kind (clinical_trial, drug_compound)
        #[arg(long, default_value = "clinical_trial")]
        kind: EntityKind,
        /// Filter trials by phase
        #[arg(long)]
        phase: Option<TrialPhase>,
        /// Filter by lifecycle status
        #[arg(long)]
        status: Option<TrialStatus>,
        /// Filter by sponsor substring
        #[arg(long)]
        sponsor: Option<String>,
        /// Only trials linked to a drug whose name contains this
        #[arg(long)]
        drug_name: Option<String>,
        /// Only trials starting on or after this date (RFC 3339)
        #[arg(long)]
        starts_after: Option<DateTime<Utc>>,
        /// Only trials starting on or before this date (RFC 3339)
        #[arg(long)]
        starts_before: Option<DateTime<Utc>>,
        /// Maximum number of results
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Number of results to skip
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Compare the registry cache against the stores and report drift
    Reconcile {
        /// Entity identifier (all known entities if omitted)
        id: Option<String>,
        /// Delete dangling edges found during reconciliation
        #[arg(long)]
        repair: bool,
    },
    /// Probe both stores
    Health,
}

/// Get the default database directory (~/.local/share/trialgraph)
fn default_db_dir() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("trialgraph")
}

fn open_api(db_dir: Option<PathBuf>) -> Result<RepositoryApi, String> {
    let dir = db_dir.unwrap_or_else(default_db_dir);
    std::fs::create_dir_all(&dir)
        .map_err(|e| format!("Failed to create {}: {}", dir.display(), e))?;
    let documents = SqliteDocumentStore::open(dir.join("documents.db"))
        .map_err(|e| format!("Failed to open document store: {}", e))?;
    let graph = SqliteGraphStore::open(dir.join("graph.db"))
        .map_err(|e| format!("Failed to open graph store: {}", e))?;
    Ok(RepositoryApi::new(Arc::new(documents), Arc::new(graph)))
}

async fn cmd_create(api: &RepositoryApi, id: Option<String>, payload: EntityPayload) -> i32 {
    let result = match id {
        Some(id) => api.create_entity_with_id(EntityId::from(id), payload).await,
        None => api.create_entity(payload).await,
    };
    match result {
        Ok((id, version)) => {
            println!("Created {} (version {})", id, version);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn cmd_get(api: &RepositoryApi, id: &str) -> i32 {
    let id = EntityId::from(id);
    let document = match api.get_entity(&id).await {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    match serde_json::to_string_pretty(&document) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    }
    match api.edges_of(&id).await {
        Ok(edges) => {
            for edge in &edges {
                println!("  {}", edge.key());
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn cmd_delete(api: &RepositoryApi, id: &str) -> i32 {
    match api.delete_entity(&EntityId::from(id)).await {
        Ok(()) => {
            println!("Deleted {}", id);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn cmd_link(api: &RepositoryApi, source: &str, target: &str, kind: &str) -> i32 {
    match api
        .link_entities(
            &EntityId::from(source),
            &EntityId::from(target),
            kind,
            Properties::new(),
        )
        .await
    {
        Ok(edge) => {
            println!("Linked {}", edge.key());
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn cmd_unlink(api: &RepositoryApi, source: &str, target: &str, kind: &str) -> i32 {
    match api
        .unlink_entities(&EntityId::from(source), &EntityId::from(target), kind)
        .await
    {
        Ok(()) => {
            println!("Unlinked {} -[{}]-> {}", source, kind, target);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn cmd_search(
    api: &RepositoryApi,
    kind: EntityKind,
    phase: Option<TrialPhase>,
    status: Option<TrialStatus>,
    sponsor: Option<String>,
    drug_name: Option<String>,
    starts_after: Option<DateTime<Utc>>,
    starts_before: Option<DateTime<Utc>>,
    limit: usize,
    offset: usize,
) -> i32 {
    let mut query = FederatedQuery::new().with_kind(kind).limit(limit).offset(offset);
    if let Some(phase) = phase {
        query = query.with_filter(FieldFilter::eq("phase", phase.as_str()));
    }
    if let Some(status) = status {
        query = query.with_filter(FieldFilter::eq("status", status.as_str()));
    }
    if let Some(sponsor) = sponsor {
        query = query.with_filter(FieldFilter::contains("sponsor", sponsor));
    }
    if let Some(after) = starts_after {
        query = query.with_filter(FieldFilter::gte("start_date", after.to_rfc3339()));
    }
    if let Some(before) = starts_before {
        query = query.with_filter(FieldFilter::lte("start_date", before.to_rfc3339()));
    }
    if let Some(name) = drug_name {
        return match api.trials_testing_drug(&name, query).await {
            Ok(results) => print_results(&results),
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        };
    }

    match api.query(&query).await {
        Ok(results) => print_results(&results),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn print_results(results: &[trialgraph::EnrichedEntity]) -> i32 {
    if results.is_empty() {
        println!("No results");
        return 0;
    }
    for entity in results {
        let doc = &entity.document;
        println!("{} [{}] version {}", doc.id, doc.kind.as_str(), doc.version);
        match serde_json::to_string_pretty(&doc.payload) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
        for edge in &entity.edges {
            println!("  {}", edge.key());
        }
    }
    0
}

async fn cmd_reconcile(api: &RepositoryApi, id: Option<String>, repair: bool) -> i32 {
    let reports = match id {
        Some(id) => match api.reconcile(&EntityId::from(id)).await {
            Ok(report) => vec![report],
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        },
        None => match api.reconcile_all().await {
            Ok(reports) => reports,
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        },
    };

    let mut dirty = 0;
    for report in &reports {
        if report.is_clean() {
            continue;
        }
        dirty += 1;
        println!("{}: drift detected", report.id);
        if report.cached_version != report.actual_version {
            println!(
                "  version cached={:?} actual={:?}",
                report.cached_version, report.actual_version
            );
        }
        for edge in &report.missing_edges {
            println!("  cached edge no longer in store: {}", edge);
        }
        for edge in &report.unknown_edges {
            println!("  store edge not in cache: {}", edge);
        }
        for edge in &report.dangling_edges {
            println!("  dangling edge: {}", edge.key());
        }
        if repair {
            match api.repair_drift(report).await {
                Ok(removed) => println!("  removed {} dangling edge(s)", removed),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return 1;
                }
            }
        }
    }
    println!("{} of {} entities drifted", dirty, reports.len());
    0
}

async fn cmd_health(api: &RepositoryApi) -> i32 {
    let health = api.health().await;
    println!(
        "documents: {}",
        if health.documents_ok { "ok" } else { "unavailable" }
    );
    println!("graph: {}", if health.graph_ok { "ok" } else { "unavailable" });
    if health.healthy() {
        0
    } else {
        1
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let api = match open_api(cli.db_dir) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::CreateTrial {
            title,
            nct_id,
            phase,
            status,
            start_date,
            end_date,
            description,
            primary_outcome,
            sponsor,
            id,
        } => {
            let payload = EntityPayload::ClinicalTrial(TrialRecord {
                title,
                nct_id,
                phase,
                status,
                start_date,
                end_date,
                description,
                primary_outcome,
                secondary_outcomes: Vec::new(),
                inclusion_criteria: Vec::new(),
                exclusion_criteria: Vec::new(),
                locations: Vec::new(),
                sponsor,
                metadata: Properties::new(),
            });
            cmd_create(&api, id, payload).await
        }
        Commands::CreateDrug { name, molecule_type, mechanism, target_proteins, id } => {
            let payload = EntityPayload::DrugCompound(DrugRecord {
                name,
                molecule_type,
                mechanism_of_action: mechanism,
                target_proteins,
                metadata: Properties::new(),
            });
            cmd_create(&api, id, payload).await
        }
        Commands::Get { id } => cmd_get(&api, &id).await,
        Commands::Delete { id } => cmd_delete(&api, &id).await,
        Commands::Link { source, target, kind } => cmd_link(&api, &source, &target, &kind).await,
        Commands::Unlink { source, target, kind } => {
            cmd_unlink(&api, &source, &target, &kind).await
        }
        Commands::Search {
            kind,
            phase,
            status,
            sponsor,
            drug_name,
            starts_after,
            starts_before,
            limit,
            offset,
        } => {
            cmd_search(
                &api,
                kind,
                phase,
                status,
                sponsor,
                drug_name,
                starts_after,
                starts_before,
                limit,
                offset,
            )
            .await
        }
        Commands::Reconcile { id, repair } => cmd_reconcile(&api, id, repair).await,
        Commands::Health => cmd_health(&api).await,
    };
    std::process::exit(code);
}
