use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;

use medscan_lib::{
    camera::StillImageSource,
    default_notifier,
    pipeline::{PipelineProfile, ScanPipeline, TesseractRecognizer},
    resolve_data_dir,
    scanner::ScanSession,
    speech::LogSpeaker,
    utils::init_logging,
    AppState,
};

#[derive(Parser)]
#[command(name = "medscan")]
#[command(about = "Read drug labels and keep medication reminders")]
#[command(version)]
struct Cli {
    /// Directory holding the database and settings (default ./medscan-data)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a label photo and print the parsed fields
    Scan {
        image: PathBuf,
        /// Rule profile; defaults to the one in settings.json
        #[arg(long, value_enum)]
        profile: Option<ProfileArg>,
        /// Append the result to history
        #[arg(long)]
        save: bool,
        /// Replace the detected name before saving
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        dose: Option<String>,
        #[arg(long)]
        meals: Option<String>,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// List saved drugs
    History,
    /// Manage day-of-month reminders
    Remind {
        #[command(subcommand)]
        action: RemindAction,
    },
    /// Run the reminder clock until Ctrl-C
    Watch,
}

#[derive(Subcommand)]
enum RemindAction {
    Set {
        /// Day of month, 1-31
        day: u32,
        /// HH:MM
        time: String,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    Delete {
        day: u32,
    },
    List,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProfileArg {
    Basic,
    Enhanced,
}

impl From<ProfileArg> for PipelineProfile {
    fn from(value: ProfileArg) -> Self {
        match value {
            ProfileArg::Basic => PipelineProfile::Basic,
            ProfileArg::Enhanced => PipelineProfile::Enhanced,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let app = AppState::open(&resolve_data_dir(cli.data_dir))?;

    match cli.command {
        Commands::Scan {
            image,
            profile,
            save,
            name,
            dose,
            meals,
            json,
        } => {
            let mut session = match profile {
                Some(profile) => {
                    let mut scanner = app.settings.scanner();
                    scanner.profile = profile.into();
                    ScanSession::new(
                        ScanPipeline::new(scanner.pipeline_config()),
                        Arc::new(TesseractRecognizer::new(scanner.tesseract_binary)),
                        Arc::new(LogSpeaker),
                    )
                }
                None => app.scan_session(Arc::new(LogSpeaker)),
            };
            session.start_camera(&StillImageSource::new(image)).await?;

            let cancel = CancellationToken::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    ctrl_c.cancel();
                }
            });

            let outcome = session.scan(&cancel).await?;
            let mut record = outcome.record.clone();
            if let Some(name) = name {
                record.name = name;
            }
            if let Some(dose) = dose {
                record.dose = dose;
            }
            if let Some(meals) = meals {
                record.meal_timing = meals;
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                println!("ชื่อยา:   {}", record.name);
                println!("ขนาด:    {}", record.dose);
                println!("เวลาทาน: {}", record.meal_timing);
            }

            if save {
                let entry = session.commit(&record, &app.history).await?;
                println!("saved: {} {} ({})", entry.name, entry.description, entry.timestamp);
            }
            session.dismiss();
            session.stop_camera();
        }
        Commands::History => {
            let entries = app.history.list().await?;
            if entries.is_empty() {
                println!("no saved drugs");
            }
            for entry in entries {
                println!("{}  {}  {}", entry.timestamp, entry.name, entry.description);
            }
        }
        Commands::Remind { action } => {
            let mut schedule = app.schedule().await?;
            match action {
                RemindAction::Set { day, time, text } => {
                    schedule.set(day, &time, &text.join(" ")).await?;
                    println!("day {day}: {time} {}", text.join(" "));
                }
                RemindAction::Delete { day } => {
                    if schedule.delete(day).await? {
                        println!("day {day}: removed");
                    } else {
                        println!("day {day}: no reminder");
                    }
                }
                RemindAction::List => {
                    for day in schedule.active_days() {
                        if let Some(entry) = schedule.get(day) {
                            println!("{day:>2}  {}  {}", entry.time, entry.text);
                        }
                    }
                }
            }
        }
        Commands::Watch => {
            let clock = app.reminder_clock(default_notifier()).await?;
            clock.start().await;
            tokio::signal::ctrl_c().await?;
            clock.stop().await;
        }
    }

    Ok(())
}
