mod display;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use soa_ai::{AssessmentRequest, LlmConfig, OpenAiClient};
use soa_core::api::EntityType;
use soa_core::{
    Applicability, ControlEdit, ControlRecord, ControlRef, ControlStats, apply_assessments,
    assessment_date, load_control_sheet, sort_controls,
};
use soa_store::{ExportMeta, LocalStore, StoredApiConfig};
use soa_sync::{ApiConfig, ComplianceClient};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "soa")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "ISO 27001 Statement of Applicability toolkit", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Directory holding the saved register and API configuration
    #[arg(long, global = true, env = "SOA_DATA_DIR", default_value = ".soa")]
    data_dir: PathBuf,

    #[command(flatten)]
    api: ApiArgs,

    #[command(flatten)]
    llm: LlmArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ApiArgs {
    /// Compliance API base URL
    #[arg(long, global = true, env = "SOA_API_URL")]
    api_url: Option<String>,

    /// Compliance API key
    #[arg(long, global = true, env = "SOA_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Organization sent as X-Organization-Id
    #[arg(long, global = true, env = "SOA_ORGANIZATION_ID")]
    organization_id: Option<String>,
}

#[derive(Args)]
struct LlmArgs {
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    #[arg(long, global = true, env = "OPENAI_BASE_URL")]
    openai_base_url: Option<String>,

    #[arg(long, global = true, env = "OPENAI_MODEL")]
    openai_model: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a control sheet export and save it as the register
    Parse {
        /// Comma-delimited sheet export
        csv: PathBuf,

        /// Print the parsed records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Applicability counts for the saved register
    Stats,

    /// Show one control
    Show {
        /// Control number, e.g. 5.23
        number: String,
    },

    /// Change the applicability of one control
    Edit {
        number: String,

        #[arg(long, conflicts_with = "not_applicable", required_unless_present = "not_applicable")]
        applicable: bool,

        #[arg(long)]
        not_applicable: bool,

        /// Why the control is not applicable
        #[arg(long, default_value = "")]
        reason: String,

        #[arg(long, conflicts_with = "not_required")]
        required: bool,

        #[arg(long)]
        not_required: bool,
    },

    /// Assess every control against the organisation's context entries
    Assess {
        /// Parse this sheet instead of using the saved register
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Generate a systems description from the context entries
    Describe,

    /// Export the register as a Statement of Applicability sheet
    Export {
        #[arg(long)]
        company: String,

        /// Output file (default: generated name in the current directory)
        #[arg(long)]
        out: Option<PathBuf>,

        #[arg(long)]
        prepared_by: Option<String>,

        #[arg(long)]
        approved_by: Option<String>,
    },

    /// List compliance tasks
    Tasks,

    /// List organisational context entries
    Context,

    /// List comments on an entity
    Comments {
        entity_id: String,

        /// task, vendor, risk or policy
        #[arg(long, default_value = "task")]
        entity_type: EntityType,
    },

    /// Save compliance API credentials in the data directory
    Configure {
        #[arg(long)]
        url: Option<String>,

        #[arg(long)]
        key: String,

        #[arg(long)]
        organization: Option<String>,
    },

    /// Delete the saved register
    Reset {
        /// Also delete saved API credentials
        #[arg(long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = LocalStore::open(&cli.data_dir)
        .with_context(|| format!("opening data dir {}", cli.data_dir.display()))?;
    info!(version = env!("CARGO_PKG_VERSION"), data_dir = %cli.data_dir.display(), "soa");

    match cli.command {
        Commands::Parse { ref csv, json } => cmd_parse(&store, csv, json),
        Commands::Stats => {
            let records = saved_controls(&store)?;
            display::print_stats(&ControlStats::from_records(&records));
            Ok(())
        }
        Commands::Show { ref number } => {
            let records = saved_controls(&store)?;
            let record = records
                .iter()
                .find(|c| &c.control_number == number)
                .with_context(|| format!("no control numbered {number}"))?;
            display::print_control_card(record);
            Ok(())
        }
        Commands::Edit {
            ref number,
            applicable,
            ref reason,
            required,
            not_required,
            ..
        } => {
            let mut records = saved_controls(&store)?;
            let current = records
                .iter()
                .find(|c| &c.control_number == number)
                .map(|c| c.is_required)
                .unwrap_or(true);
            let edit = ControlEdit {
                is_applicable: if applicable {
                    Applicability::Applicable
                } else {
                    Applicability::NotApplicable
                },
                not_applicable_reason: reason.clone(),
                is_required: match (required, not_required) {
                    (true, _) => true,
                    (_, true) => false,
                    _ => current,
                },
            };
            store.save_control_edit(&mut records, number, &edit, &today())?;
            if let Some(record) = records.iter().find(|c| &c.control_number == number) {
                display::print_control_card(record);
            }
            Ok(())
        }
        Commands::Assess { ref csv } => cmd_assess(&cli, &store, csv.as_deref()).await,
        Commands::Describe => {
            let entries = compliance_client(&cli.api, &store)?
                .context_entries()
                .await
                .context("fetching context entries")?;
            let description = llm_client(&cli.llm)?
                .generate_systems_description(&entries.data)
                .await
                .context("generating systems description")?;
            println!("{description}");
            Ok(())
        }
        Commands::Export {
            ref company,
            ref out,
            ref prepared_by,
            ref approved_by,
        } => {
            let records = saved_controls(&store)?;
            let date = Local::now().date_naive();
            let meta = ExportMeta {
                company: company.clone(),
                prepared_by: prepared_by.clone(),
                approved_by: approved_by.clone(),
                date,
            };
            let path = out
                .clone()
                .unwrap_or_else(|| PathBuf::from(soa_store::export_file_name(company, date)));
            soa_store::write_sheet(&path, &soa_store::sheet_rows(&records, &meta))?;
            let stats = ControlStats::from_records(&records);
            println!(
                "Exported {} controls ({} applicable, {} not applicable) to {}",
                stats.total,
                stats.applicable,
                stats.not_applicable,
                path.display()
            );
            Ok(())
        }
        Commands::Tasks => {
            let tasks = compliance_client(&cli.api, &store)?
                .tasks()
                .await
                .context("fetching tasks")?;
            display::print_tasks(&tasks);
            Ok(())
        }
        Commands::Context => {
            let entries = compliance_client(&cli.api, &store)?
                .context_entries()
                .await
                .context("fetching context entries")?;
            display::print_context(&entries.data);
            Ok(())
        }
        Commands::Comments {
            ref entity_id,
            entity_type,
        } => {
            let comments = compliance_client(&cli.api, &store)?
                .comments(entity_id, entity_type)
                .await
                .context("fetching comments")?;
            display::print_comments(&comments);
            Ok(())
        }
        Commands::Configure {
            ref url,
            ref key,
            ref organization,
        } => {
            store.save_api_config(&StoredApiConfig {
                base_url: url
                    .clone()
                    .unwrap_or_else(|| soa_sync::http::DEFAULT_BASE_URL.to_string()),
                api_key: key.clone(),
                organization_id: organization.clone(),
            })?;
            println!("Saved API configuration to {}", store.dir().display());
            Ok(())
        }
        Commands::Reset { all } => {
            store.clear_controls()?;
            if all {
                store.clear_api_config()?;
            }
            println!("Cleared saved data in {}", store.dir().display());
            Ok(())
        }
    }
}

fn cmd_parse(store: &LocalStore, csv: &Path, json: bool) -> anyhow::Result<()> {
    let mut records = load_control_sheet(csv)?;
    if records.is_empty() {
        bail!("no controls found in {}", csv.display());
    }
    sort_controls(&mut records);
    store.save_controls(&records)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        display::print_control_table(&records);
        println!();
        display::print_stats(&ControlStats::from_records(&records));
    }
    Ok(())
}

async fn cmd_assess(cli: &Cli, store: &LocalStore, csv: Option<&Path>) -> anyhow::Result<()> {
    let mut records = match csv {
        Some(path) => {
            let mut records = load_control_sheet(path)?;
            sort_controls(&mut records);
            records
        }
        None => saved_controls(store)?,
    };
    if records.is_empty() {
        bail!("no controls to assess");
    }

    let llm = llm_client(&cli.llm)?;
    let entries = compliance_client(&cli.api, store)?
        .context_entries()
        .await
        .context("fetching context entries")?;

    let request = AssessmentRequest {
        context_entries: entries.data,
        controls: records.iter().map(ControlRef::from).collect(),
    };
    let run = llm
        .assess_controls(&request)
        .await
        .context("assessing controls")?;

    let applied = apply_assessments(&mut records, &run.results, &today());
    store.save_controls(&records)?;
    info!(applied, "saved assessed controls");

    display::print_run(&run);
    Ok(())
}

fn saved_controls(store: &LocalStore) -> anyhow::Result<Vec<ControlRecord>> {
    store
        .load_controls()?
        .context("no saved controls; run `soa parse <csv>` first")
}

fn today() -> String {
    assessment_date(Local::now().date_naive())
}

/// Flags and env take precedence over the stored configuration.
fn compliance_client(args: &ApiArgs, store: &LocalStore) -> anyhow::Result<ComplianceClient> {
    let stored = store.load_api_config()?;
    let api_key = args
        .api_key
        .clone()
        .or_else(|| stored.as_ref().map(|s| s.api_key.clone()))
        .filter(|k| !k.is_empty())
        .context("compliance API key not configured; set SOA_API_KEY or run `soa configure`")?;

    let mut config = ApiConfig::new(api_key);
    if let Some(url) = args
        .api_url
        .clone()
        .or_else(|| stored.as_ref().map(|s| s.base_url.clone()))
    {
        config.base_url = url;
    }
    config.organization_id = args
        .organization_id
        .clone()
        .or_else(|| stored.and_then(|s| s.organization_id));
    Ok(ComplianceClient::new(config))
}

fn llm_client(args: &LlmArgs) -> anyhow::Result<OpenAiClient> {
    let api_key = args
        .openai_api_key
        .clone()
        .filter(|k| !k.is_empty())
        .context("OpenAI API key not configured; set OPENAI_API_KEY")?;
    let mut config = LlmConfig::new(api_key);
    if let Some(url) = &args.openai_base_url {
        config.base_url = url.clone();
    }
    if let Some(model) = &args.openai_model {
        config.model = model.clone();
    }
    Ok(OpenAiClient::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn edit_requires_an_applicability_flag() {
        assert!(Cli::try_parse_from(["soa", "edit", "5.1"]).is_err());
        assert!(
            Cli::try_parse_from(["soa", "edit", "5.1", "--applicable", "--not-applicable"])
                .is_err()
        );
        assert!(
            Cli::try_parse_from(["soa", "edit", "5.1", "--not-applicable", "--reason", "x"])
                .is_ok()
        );
    }

    #[test]
    fn comments_entity_type_parses() {
        let cli = Cli::try_parse_from(["soa", "comments", "tsk_1", "--entity-type", "risk"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Comments {
                entity_type: EntityType::Risk,
                ..
            }
        ));
    }

    #[test]
    fn stored_api_config_used_when_flags_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        let args = ApiArgs {
            api_url: None,
            api_key: None,
            organization_id: None,
        };
        assert!(compliance_client(&args, &store).is_err());

        store
            .save_api_config(&StoredApiConfig {
                base_url: "http://localhost:4000/v1".into(),
                api_key: "key_1".into(),
                organization_id: Some("org_1".into()),
            })
            .unwrap();
        assert!(compliance_client(&args, &store).is_ok());
    }
}
