use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use leadflow::api::CallDirection;
use leadflow::cli::{
    AuthCommands, DirectionArg, DocsCommands, FormatArg, LeadCommands, ScheduleCommands,
    ShowroomCommands, init_context,
};
use leadflow::export::ExportFormat;

#[derive(Parser)]
#[command(name = "leadflow")]
#[command(about = "Lead lifecycle tools for a dealership CRM", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "LEADFLOW_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage server credentials
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Inspect and update leads
    Lead {
        #[command(subcommand)]
        command: LeadCommands,
    },

    /// List the pipeline stages
    Stages,

    /// Appointments and follow-ups
    Schedule {
        #[command(subcommand)]
        command: ScheduleCommands,
    },

    /// Showroom check-in and check-out
    Showroom {
        #[command(subcommand)]
        command: ShowroomCommands,
    },

    /// Stip documents
    Docs {
        #[command(subcommand)]
        command: DocsCommands,
    },

    /// Export a lead's full history
    Export {
        lead_id: String,

        #[arg(long, value_enum, default_value = "archive")]
        format: FormatArg,

        /// Directory to write the export to
        #[arg(long, short)]
        output_dir: Option<PathBuf>,

        /// Don't print progress
        #[arg(long, short)]
        quiet: bool,
    },

    /// Apply push events (one JSON object per line on stdin) to watched leads
    Watch {
        #[arg(required = true)]
        lead_ids: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("leadflow=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Auth { command } => match command {
            AuthCommands::Login {
                server,
                token,
                non_interactive,
            } => leadflow::cli::run_auth_login(server, token, non_interactive).await?,
            AuthCommands::Logout => leadflow::cli::run_auth_logout()?,
        },
        Commands::Lead { command } => {
            let ctx = init_context(config)?;
            match command {
                LeadCommands::Show { lead_id, json } => {
                    leadflow::cli::run_lead_show(&ctx, &lead_id, json).await?;
                }
                LeadCommands::Stage {
                    lead_id,
                    stage,
                    note,
                    confirm,
                    non_interactive,
                } => {
                    leadflow::cli::run_lead_stage(&ctx, &lead_id, stage, note, confirm, non_interactive)
                        .await?;
                }
                LeadCommands::Note {
                    lead_id,
                    content,
                    reply_to,
                    mentions,
                    confirm,
                } => {
                    leadflow::cli::run_lead_note(&ctx, &lead_id, content, reply_to, mentions, confirm)
                        .await?;
                }
                LeadCommands::Call {
                    lead_id,
                    direction,
                    outcome,
                    duration,
                    notes,
                    confirm,
                } => {
                    let direction = match direction {
                        DirectionArg::Inbound => CallDirection::Inbound,
                        DirectionArg::Outbound => CallDirection::Outbound,
                    };
                    leadflow::cli::run_lead_call(
                        &ctx, &lead_id, direction, outcome, duration, notes, confirm,
                    )
                    .await?;
                }
            }
        }
        Commands::Stages => {
            let ctx = init_context(config)?;
            leadflow::cli::run_stages(&ctx).await?;
        }
        Commands::Schedule { command } => {
            let ctx = init_context(config)?;
            match command {
                ScheduleCommands::Show { lead_id, json } => {
                    leadflow::cli::run_schedule_show(&ctx, &lead_id, json).await?;
                }
                ScheduleCommands::Appointment {
                    lead_id,
                    appointment_id,
                    status,
                    reschedule,
                } => {
                    leadflow::cli::run_schedule_appointment(
                        &ctx,
                        &lead_id,
                        &appointment_id,
                        status,
                        reschedule,
                    )
                    .await?;
                }
                ScheduleCommands::FollowUp {
                    lead_id,
                    follow_up_id,
                } => {
                    leadflow::cli::run_schedule_follow_up(&ctx, &lead_id, &follow_up_id).await?;
                }
            }
        }
        Commands::Showroom { command } => {
            let ctx = init_context(config)?;
            match command {
                ShowroomCommands::Status { lead_id } => {
                    leadflow::cli::run_showroom_status(&ctx, &lead_id).await?;
                }
                ShowroomCommands::CheckIn {
                    lead_id,
                    appointment,
                    no_appointment,
                    non_interactive,
                } => {
                    leadflow::cli::run_showroom_check_in(
                        &ctx,
                        &lead_id,
                        appointment,
                        no_appointment,
                        non_interactive,
                    )
                    .await?;
                }
                ShowroomCommands::CheckOut {
                    lead_id,
                    outcome,
                    notes,
                    reschedule_at,
                } => {
                    leadflow::cli::run_showroom_check_out(
                        &ctx,
                        &lead_id,
                        &outcome,
                        notes,
                        reschedule_at,
                    )
                    .await?;
                }
            }
        }
        Commands::Docs { command } => {
            let ctx = init_context(config)?;
            match command {
                DocsCommands::List { lead_id, category } => {
                    leadflow::cli::run_docs_list(&ctx, &lead_id, category).await?;
                }
                DocsCommands::Delete {
                    lead_id,
                    document_id,
                    force,
                } => {
                    leadflow::cli::run_docs_delete(&ctx, &lead_id, &document_id, force).await?;
                }
            }
        }
        Commands::Export {
            lead_id,
            format,
            output_dir,
            quiet,
        } => {
            let ctx = init_context(config)?;
            let format = match format {
                FormatArg::Archive => ExportFormat::Archive,
                FormatArg::Document => ExportFormat::Document,
            };
            leadflow::cli::run_export(&ctx, &lead_id, format, output_dir, quiet).await?;
        }
        Commands::Watch { lead_ids } => {
            let ctx = init_context(config)?;
            leadflow::cli::run_watch(&ctx, &lead_ids).await?;
        }
    }

    Ok(())
}
