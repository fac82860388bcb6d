mod config;
mod display;
mod image;

use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use habicase_ai::AnalysisRequest;
use habicase_core::model::new_id;
use habicase_core::timeline::parse_timestamp;
use habicase_core::{
    Communication, ContactField, ContactMethod, IssueDraft, IssueStatus, LandlordPromise,
    LayoutConfig, LeaseField, MetadataUpdate, PromiseStatus, Severity,
};
use habicase_host::CaseSession;
use habicase_store::FileStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::GlobalArgs;

/// Document a rental habitability dispute: issues, photos, landlord
/// communications, and a timeline of it all.
#[derive(Parser, Debug)]
#[command(name = "habicase", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the case card.
    Show,
    /// Set property, landlord contact, or lease details.
    Metadata(MetadataArgs),
    /// Record issues.
    #[command(subcommand)]
    Issue(IssueCommand),
    /// Attach photos to issues.
    #[command(subcommand)]
    Evidence(EvidenceCommand),
    /// Log landlord communications.
    #[command(subcommand)]
    Comm(CommCommand),
    /// Draw the issue and communication timeline.
    Timeline {
        /// Reference time for open bars (defaults to the current time)
        #[arg(long)]
        now: Option<String>,
        /// Chart width in characters
        #[arg(long, default_value_t = 60)]
        width: usize,
    },
    /// Generate a narrative report.
    Report {
        /// Write markdown here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the case snapshot as JSON.
    Export,
    /// Replace the case with a snapshot file.
    Import { file: PathBuf },
    /// Discard the case and start empty.
    Reset,
}

#[derive(clap::Args, Debug)]
struct MetadataArgs {
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    landlord_name: Option<String>,
    #[arg(long)]
    landlord_phone: Option<String>,
    #[arg(long)]
    landlord_email: Option<String>,
    #[arg(long)]
    landlord_other: Option<String>,
    #[arg(long)]
    lease_start: Option<String>,
    #[arg(long)]
    lease_end: Option<String>,
}

impl MetadataArgs {
    fn into_updates(self) -> Vec<MetadataUpdate> {
        let contact = |field, value: Option<String>| {
            value.map(|value| MetadataUpdate::Contact { field, value })
        };
        let lease = |field, value: Option<String>| {
            value.map(|value| MetadataUpdate::Lease { field, value })
        };
        [
            self.address.map(MetadataUpdate::PropertyAddress),
            contact(ContactField::Name, self.landlord_name),
            contact(ContactField::Phone, self.landlord_phone),
            contact(ContactField::Email, self.landlord_email),
            contact(ContactField::Other, self.landlord_other),
            lease(LeaseField::StartDate, self.lease_start),
            lease(LeaseField::EndDate, self.lease_end),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[derive(Subcommand, Debug)]
enum IssueCommand {
    /// Add an issue by hand. Omitted fields get defaults.
    Add {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        room: Option<String>,
        #[arg(long)]
        severity: Option<Severity>,
        #[arg(long)]
        status: Option<IssueStatus>,
        /// Date first noticed (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        noticed: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
        /// Habitability tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Describe a problem and let the model fill in the details.
    Analyze {
        description: String,
        /// Photo to analyze and attach as evidence
        #[arg(long)]
        image: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum EvidenceCommand {
    /// Attach a photo to an existing issue.
    Add {
        #[arg(long)]
        issue: String,
        #[arg(long)]
        image: PathBuf,
        #[arg(long, default_value = "")]
        caption: String,
        /// Ask the model for a caption
        #[arg(long)]
        analyze: bool,
    },
}

#[derive(Subcommand, Debug)]
enum CommCommand {
    /// Log one communication with the landlord.
    Log {
        #[arg(long)]
        method: ContactMethod,
        /// What the tenant said or sent
        #[arg(long)]
        message: String,
        #[arg(long, default_value = "")]
        response: String,
        /// Date of the exchange (defaults to today)
        #[arg(long)]
        date: Option<String>,
        /// Issue id this concerns (repeatable; none means general)
        #[arg(long = "link")]
        links: Vec<String>,
        /// A commitment the landlord made
        #[arg(long)]
        promise: Option<String>,
        #[arg(long, requires = "promise")]
        promise_date: Option<String>,
        #[arg(long, requires = "promise")]
        promised_by: Option<String>,
        #[arg(long, requires = "promise")]
        promise_status: Option<PromiseStatus>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = FileStore::open(&cli.global.data_dir)
        .with_context(|| format!("failed to open data dir {}", cli.global.data_dir.display()))?;
    let session = CaseSession::open(store);
    let now = Utc::now();

    match cli.command {
        Commands::Show => {
            print!("{}", display::CaseCard(&session.case()));
            return Ok(());
        }
        Commands::Metadata(args) => {
            let updates = args.into_updates();
            if updates.is_empty() {
                bail!("nothing to update; see `habicase metadata --help`");
            }
            session.update_metadata_all(updates);
        }
        Commands::Issue(IssueCommand::Add {
            title,
            category,
            room,
            severity,
            status,
            noticed,
            description,
            tags,
        }) => {
            let draft = IssueDraft {
                title,
                category,
                room,
                severity: severity.map(|s| s.to_string()),
                status: status.map(|s| s.to_string()),
                first_noticed_at: noticed,
                description: None,
                habitability_categories: Some(tags),
            };
            let issue = draft.resolve(new_id("issue"), &description, &today(now));
            println!("{}", issue.id);
            session.add_issue(issue);
        }
        Commands::Issue(IssueCommand::Analyze { description, image }) => {
            let client = cli.global.llm_client()?;
            let mut request = AnalysisRequest::text(description);
            if let Some(path) = image {
                request = request.with_image(image::load_image(&path)?);
            }
            let intake = session
                .analyze_issue(&client, request, now)
                .await
                .context("issue analysis failed")?;
            let issue = &intake.issue;
            println!("{}", issue.id);
            println!("  {:<26} {}", "title", issue.title);
            println!("  {:<26} {}", "category", issue.category);
            println!("  {:<26} {}", "room", issue.room);
            println!("  {:<26} {}", "severity", issue.severity);
            if let Some(item) = &intake.evidence {
                println!("  {:<26} {}", "photo", item.display_caption());
            }
            if let Some(summary) = &intake.summary {
                println!("\n{summary}");
            }
            for d in &intake.disclaimers {
                println!("note: {d}");
            }
        }
        Commands::Evidence(EvidenceCommand::Add {
            issue,
            image,
            caption,
            analyze,
        }) => {
            let photo = image::load_image(&image)?;
            let client = if analyze {
                Some(cli.global.llm_client()?)
            } else {
                None
            };
            let classifier = client.as_ref().map(|c| c as &dyn habicase_ai::Classifier);
            let item = session
                .attach_evidence(classifier, &issue, photo, &caption, now)
                .await?;
            println!("{}", item.id);
            if !item.ai_caption.is_empty() {
                println!("  {:<26} {}", "caption", item.ai_caption);
            }
        }
        Commands::Comm(CommCommand::Log {
            method,
            message,
            response,
            date,
            links,
            promise,
            promise_date,
            promised_by,
            promise_status,
        }) => {
            let promises = promise
                .map(|description| {
                    let mut p = LandlordPromise::new(
                        new_id("promise"),
                        description,
                        promise_date.unwrap_or_default(),
                    );
                    if let Some(by) = promised_by.filter(|b| !b.trim().is_empty()) {
                        p.promised_by = by;
                    }
                    if let Some(status) = promise_status {
                        p.status = status;
                    }
                    p
                })
                .into_iter()
                .collect();
            let comm = Communication {
                id: new_id("comm"),
                date: date.unwrap_or_else(|| today(now)),
                method,
                tenant_message: message,
                landlord_response: response,
                linked_issue_ids: links,
                promises,
            };
            println!("{}", comm.id);
            session.log_communication(comm);
        }
        Commands::Timeline { now: at, width } => {
            let at = match at {
                Some(s) => parse_timestamp(&s).with_context(|| format!("unreadable date: {s}"))?,
                None => now,
            };
            let layout = session.timeline(at, &LayoutConfig::default());
            print!("{}", display::TimelineChart { layout: &layout, cols: width });
            return Ok(());
        }
        Commands::Report { out } => {
            let client = cli.global.llm_client()?;
            let report = session
                .generate_report(&client)
                .await
                .context("report generation failed")?;
            let markdown = report.to_markdown();
            match out {
                Some(path) => {
                    std::fs::write(&path, markdown)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!(path = %path.display(), "report written");
                }
                None => print!("{markdown}"),
            }
            return Ok(());
        }
        Commands::Export => {
            println!("{}", session.export_snapshot()?);
            return Ok(());
        }
        Commands::Import { file } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            session
                .import_snapshot(&json)
                .with_context(|| format!("{} is not a valid case snapshot", file.display()))?;
        }
        Commands::Reset => session.reset(),
    }

    session.save().context("failed to save case")?;
    Ok(())
}

fn today(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn metadata_args_become_updates() {
        let cli = Cli::try_parse_from([
            "habicase",
            "metadata",
            "--address",
            "12 Elm St",
            "--landlord-phone",
            "555",
            "--lease-end",
            "2025-05-31",
        ])
        .unwrap();
        let Commands::Metadata(args) = cli.command else {
            panic!("expected metadata command");
        };
        assert_eq!(
            args.into_updates(),
            vec![
                MetadataUpdate::PropertyAddress("12 Elm St".into()),
                MetadataUpdate::Contact {
                    field: ContactField::Phone,
                    value: "555".into()
                },
                MetadataUpdate::Lease {
                    field: LeaseField::EndDate,
                    value: "2025-05-31".into()
                },
            ]
        );
    }

    #[test]
    fn comm_log_parses_method_and_links() {
        let cli = Cli::try_parse_from([
            "habicase",
            "comm",
            "log",
            "--method",
            "in-person",
            "--message",
            "Asked about the heater",
            "--link",
            "i1",
            "--link",
            "i2",
        ])
        .unwrap();
        let Commands::Comm(CommCommand::Log { method, links, .. }) = cli.command else {
            panic!("expected comm log");
        };
        assert_eq!(method, ContactMethod::InPerson);
        assert_eq!(links, ["i1", "i2"]);
    }

    #[test]
    fn promise_details_require_promise() {
        let err = Cli::try_parse_from([
            "habicase",
            "comm",
            "log",
            "--method",
            "email",
            "--message",
            "hi",
            "--promise-date",
            "2024-02-01",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn unknown_severity_is_rejected() {
        let err = Cli::try_parse_from(["habicase", "issue", "add", "--severity", "dire"]);
        assert!(err.is_err());
    }

    #[test]
    fn data_dir_flag_overrides_default() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from([
            "habicase",
            "--data-dir",
            dir.path().to_str().unwrap(),
            "show",
        ])
        .unwrap();
        assert_eq!(cli.global.data_dir, dir.path());
    }
}
