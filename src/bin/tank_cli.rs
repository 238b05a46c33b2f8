use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tank_ledger::{
    config,
    db::{self, DbPool},
    entities::{movement, tank, MovementType},
    services::{movements::RecordMovement, LedgerServices},
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Init => handle_init(&context, cli.json).await?,
        Commands::Seed(args) => handle_seed(&context, args, cli.json).await?,
        Commands::Tanks => handle_tanks(&context, cli.json).await?,
        Commands::Movements(args) => handle_movements(&context, args, cli.json).await?,
        Commands::Record(args) => handle_record(&context, args, cli.json).await?,
        Commands::Summary => handle_summary(&context, cli.json).await?,
        Commands::Counts => handle_counts(&context, cli.json).await?,
        Commands::Reconcile(args) => handle_reconcile(&context, args, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "tank-cli", about = "Nitrogen tank ledger from the command line", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    Init,
    /// Register tanks that do not exist yet
    Seed(SeedArgs),
    /// List every tank with its status
    Tanks,
    /// List movements, newest first
    Movements(MovementsArgs),
    /// Record a dispatch or a receipt
    Record(RecordArgs),
    /// Tanks currently out, per responsible engineer
    Summary,
    /// Dispatch and receipt totals per tank
    Counts,
    /// Rebuild tank status from movement history
    Reconcile(ReconcileArgs),
}

#[derive(Args)]
struct SeedArgs {
    #[arg(required = true, value_name = "SERIAL")]
    serials: Vec<String>,
}

#[derive(Args)]
struct MovementsArgs {
    #[arg(long)]
    serial: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum MovementTypeArg {
    Dispatch,
    Receipt,
}

impl From<MovementTypeArg> for MovementType {
    fn from(value: MovementTypeArg) -> Self {
        match value {
            MovementTypeArg::Dispatch => MovementType::Dispatch,
            MovementTypeArg::Receipt => MovementType::Receipt,
        }
    }
}

#[derive(Args)]
struct RecordArgs {
    #[arg(long)]
    serial: String,
    #[arg(long = "type", value_enum)]
    movement_type: MovementTypeArg,
    /// Movement date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,
    #[arg(long)]
    smt: String,
    #[arg(long)]
    project: Option<String>,
    #[arg(long)]
    engineer: Option<String>,
    #[arg(long)]
    contractor: Option<String>,
}

#[derive(Args)]
struct ReconcileArgs {
    /// Only report drift, change nothing
    #[arg(long, action = ArgAction::SetTrue)]
    dry_run: bool,
}

struct CliContext {
    db: Arc<DbPool>,
    services: LedgerServices,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        let db = Arc::new(db_pool);
        let services = LedgerServices::new(db.clone());

        Ok(Self { db, services })
    }
}

async fn handle_init(context: &CliContext, json: bool) -> Result<()> {
    db::init_db(&context.db)
        .await
        .context("failed to initialise the schema")?;

    if json {
        print_json(&serde_json::json!({ "initialized": true }))?;
    } else {
        println!("Schema is up to date");
    }
    Ok(())
}

async fn handle_seed(context: &CliContext, args: SeedArgs, json: bool) -> Result<()> {
    let created = context
        .services
        .tanks
        .seed_tanks(&args.serials)
        .await
        .context("failed to seed tanks")?;

    if json {
        print_json(&serde_json::json!({ "created": created }))?;
    } else {
        println!("{} tank(s) created", created);
    }
    Ok(())
}

async fn handle_tanks(context: &CliContext, json: bool) -> Result<()> {
    let tanks = context
        .services
        .tanks
        .list_tanks()
        .await
        .context("failed to list tanks")?;

    if json {
        return print_json(&tanks);
    }
    if tanks.is_empty() {
        println!("No tanks registered");
    }
    for t in &tanks {
        render_tank(t);
    }
    Ok(())
}

async fn handle_movements(context: &CliContext, args: MovementsArgs, json: bool) -> Result<()> {
    let movements = context
        .services
        .tanks
        .list_movements(args.serial.as_deref())
        .await
        .context("failed to list movements")?;

    if json {
        return print_json(&movements);
    }
    if movements.is_empty() {
        println!("No movements recorded");
    }
    for m in &movements {
        render_movement(m);
    }
    Ok(())
}

async fn handle_record(context: &CliContext, args: RecordArgs, json: bool) -> Result<()> {
    let command = RecordMovement {
        serial: args.serial.trim().to_string(),
        movement_type: args.movement_type.into(),
        movement_date: args.date.unwrap_or_else(|| Local::now().date_naive()),
        project: args.project,
        engineer: args.engineer,
        contractor: args.contractor,
        smt_number: Some(args.smt),
    };

    let recorded = context
        .services
        .movements
        .record_movement(command)
        .await
        .context("movement rejected")?;

    if json {
        print_json(&recorded)?;
    } else {
        println!("Recorded movement {}", recorded.id);
        render_movement(&recorded);
    }
    Ok(())
}

async fn handle_summary(context: &CliContext, json: bool) -> Result<()> {
    let rows = context
        .services
        .reports
        .summary_current_out_by_engineer()
        .await
        .context("failed to build the summary")?;

    if json {
        return print_json(&rows);
    }
    if rows.is_empty() {
        println!("No tanks are out");
    }
    for row in &rows {
        println!("- {}: {}", row.responsible_engineer, row.count);
    }
    Ok(())
}

async fn handle_counts(context: &CliContext, json: bool) -> Result<()> {
    let rows = context
        .services
        .reports
        .movement_counts_by_tank()
        .await
        .context("failed to count movements")?;

    if json {
        return print_json(&rows);
    }
    for row in &rows {
        println!(
            "- {} [{}] dispatches {} • receipts {} • total {}",
            row.serial, row.status, row.dispatches, row.receipts, row.total
        );
    }
    Ok(())
}

async fn handle_reconcile(context: &CliContext, args: ReconcileArgs, json: bool) -> Result<()> {
    let reconciliation = &context.services.reconciliation;

    if args.dry_run {
        let drift = reconciliation
            .detect_drift()
            .await
            .context("failed to detect drift")?;
        if json {
            return print_json(&drift);
        }
        if drift.is_empty() {
            println!("All tanks match their movement history");
        }
        for d in &drift {
            println!(
                "- {}: stored {} ({}) • expected {} ({})",
                d.serial,
                d.stored_status,
                format_date(d.stored_last_movement_date),
                d.expected_status,
                d.expected_last_movement_date
            );
        }
        return Ok(());
    }

    let updated = reconciliation
        .recompute_tank_states_from_history()
        .await
        .context("failed to recompute tank states")?;

    if json {
        print_json(&serde_json::json!({ "updated": updated }))?;
    } else {
        println!("{} tank(s) updated", updated);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
}

fn render_tank(t: &tank::Model) {
    println!(
        "- {} • {} • last movement {}",
        t.serial,
        t.status,
        format_date(t.last_movement_date)
    );
}

fn render_movement(m: &movement::Model) {
    println!(
        "- #{} {} {} on {} • SMT {} • project {} • engineer {} • contractor {}",
        m.id,
        m.serial,
        m.movement_type,
        m.movement_date,
        m.smt_number.as_deref().unwrap_or("-"),
        m.project.as_deref().unwrap_or("-"),
        m.responsible_engineer.as_deref().unwrap_or("-"),
        m.responsible_contractor.as_deref().unwrap_or("-"),
    );
}
