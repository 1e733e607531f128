use clap::Parser;
use roster_migrate::app::commands::{self, MigrateRequest, PlanRequest};
use roster_migrate::config::{self, cli::Command};
use roster_migrate::domain::model::Session;
use roster_migrate::utils::error::ErrorSeverity;
use roster_migrate::utils::logger;
use roster_migrate::{
    AuthClient, CliConfig, MigrateError, MigrationOutcome, MigrationPlanner, MigrationPreview,
    RestStore, TomlConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let config = match config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if cli.json_logs || config.json_logs() {
        logger::init_json_logger(cli.verbose, config.log_level());
    } else {
        logger::init_cli_logger(cli.verbose, config.log_level());
    }

    tracing::info!("Starting roster-migrate against {}", config.store.url);

    if let Err(e) = run(&cli, &config).await {
        tracing::error!(
            "❌ {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 4,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        std::process::exit(exit_code);
    }

    Ok(())
}

async fn run(cli: &CliConfig, config: &TomlConfig) -> Result<(), MigrateError> {
    let session = sign_in(config).await?;

    let mut store = RestStore::new(config)?;
    if let Some(session) = &session {
        store = store.with_session(session);
    }
    let mut planner = MigrationPlanner::new(store, config.professor_role());

    match &cli.command {
        Command::Periods => {
            for period in planner.list_periods().await? {
                let status = if period.active { "" } else { " (inactive)" };
                println!("{:>5}  {}{}", period.id, period.name, status);
            }
        }
        Command::Whoami => match &session {
            Some(session) => println!(
                "{} <{}> ({})",
                session.display_name, session.email, session.role
            ),
            None => println!("anonymous (no [auth] credentials configured)"),
        },
        Command::Preview(args) => {
            let preview = commands::prepare_plan(&mut planner, &PlanRequest::from(args)).await?;
            print_preview(&preview, args.output.as_deref())?;
        }
        Command::Migrate(args) => {
            commands::ensure_admin(session.as_ref())?;
            let (preview, report) =
                commands::migrate(&mut planner, &MigrateRequest::from(args)).await?;
            print_preview(&preview, args.plan.output.as_deref())?;

            match report.outcome {
                MigrationOutcome::Migrated { count } => {
                    println!(
                        "✅ Migration succeeded: {} enrollments copied from {} classes",
                        count, report.offerings
                    );
                }
                MigrationOutcome::DryRun { count } => {
                    println!(
                        "🔍 Dry run: {} enrollments from {} classes would be copied",
                        count, report.offerings
                    );
                }
                MigrationOutcome::NothingToMigrate => println!("⚠️ Nothing to migrate"),
            }
        }
    }

    Ok(())
}

async fn sign_in(config: &TomlConfig) -> Result<Option<Session>, MigrateError> {
    match config.credentials() {
        Some((email, password)) => {
            let session = AuthClient::new(config)?
                .login(config, email, password)
                .await?;
            Ok(Some(session))
        }
        None => {
            tracing::warn!("No [auth] credentials configured, using the API key only");
            Ok(None)
        }
    }
}

fn print_preview(preview: &MigrationPreview, output: Option<&str>) -> Result<(), MigrateError> {
    println!("{}", preview.render_table());
    if let Some(path) = output {
        preview.save(path)?;
        println!("📁 Preview saved to: {}", path);
    }
    Ok(())
}
