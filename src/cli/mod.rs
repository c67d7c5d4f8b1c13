use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::application::{AppError, ExpenseService, analytics};
use crate::config::Settings;
use crate::domain::{
    Coordinates, ExpenseForm, ExpenseId, ExpenseRecord, format_amount, format_cents, parse_cents,
};
use crate::photos::PhotoUpload;
use crate::storage::{BackendKind, SHEET_HEADER, SheetRow};

/// WanderLog - Travel Expense Logger
#[derive(Parser)]
#[command(name = "wanderlog")]
#[command(about = "Log travel expenses with places, photos and spending analytics")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to ./wanderlog.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Storage backend: sqlite, sheet
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Database file path (sqlite backend)
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the store and the photo directory
    Init,

    /// Record a new expense
    Add {
        /// Date of the expense (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Category: Flight, Hotel, Food, Transport, Sightseeing, Shopping, Other
        #[arg(short, long)]
        category: String,

        /// Amount spent (e.g., "1200" or "1,250.50")
        #[arg(short, long)]
        amount: String,

        /// Where the money was spent
        #[arg(short, long)]
        location: String,

        /// Trip name
        #[arg(short, long)]
        trip: Option<String>,

        /// Emoji tag (e.g., "🍛")
        #[arg(short, long)]
        emoji: Option<String>,

        /// Short description or memory
        #[arg(long)]
        description: Option<String>,

        /// Photo to attach (png, jpg, jpeg, webp)
        #[arg(short, long)]
        photo: Option<PathBuf>,
    },

    /// List all expenses, newest first
    List {
        /// Output format: table, json, csv
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show expense details
    Show {
        /// Expense ID
        id: ExpenseId,
    },

    /// Edit an expense; omitted fields keep their current values
    Edit {
        /// Expense ID
        id: ExpenseId,

        #[arg(long)]
        date: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long)]
        amount: Option<String>,

        #[arg(short, long)]
        location: Option<String>,

        #[arg(short, long, conflicts_with = "clear_trip")]
        trip: Option<String>,

        #[arg(short, long, conflicts_with = "clear_emoji")]
        emoji: Option<String>,

        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,

        /// Replace the attached photo
        #[arg(short, long)]
        photo: Option<PathBuf>,

        /// Remove the trip name
        #[arg(long)]
        clear_trip: bool,

        /// Remove the emoji tag
        #[arg(long)]
        clear_emoji: bool,

        /// Remove the description
        #[arg(long)]
        clear_description: bool,
    },

    /// Delete an expense and its photo
    Delete {
        /// Expense ID
        id: ExpenseId,
    },

    /// Show expenses in date order
    Timeline {
        /// Output format: table, json
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show expenses with known coordinates
    Map {
        /// Latitude to center the map on
        #[arg(long, requires = "center_lon", allow_hyphen_values = true)]
        center_lat: Option<f64>,

        /// Longitude to center the map on
        #[arg(long, requires = "center_lat", allow_hyphen_values = true)]
        center_lon: Option<f64>,

        /// Zoom level
        #[arg(short, long)]
        zoom: Option<u8>,

        /// Output format: table, json
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Spending analytics
    #[command(subcommand)]
    Analytics(AnalyticsCommands),

    /// Export expenses to CSV or JSON
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Format: csv, json
        #[arg(short, long, default_value = "csv")]
        format: String,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Subcommand)]
pub enum AnalyticsCommands {
    /// Totals, average and top location/category
    Summary {
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Spending per category
    Categories {
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Top spending locations
    Locations {
        /// Number of locations to show
        #[arg(short, long, default_value_t = analytics::TOP_LOCATIONS)]
        limit: usize,

        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Spending per month
    Monthly {
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Spending against the trip budget
    Budget {
        /// Budget amount (defaults to `budget` from the config file)
        #[arg(short, long)]
        amount: Option<String>,

        #[arg(short, long, default_value = "table")]
        format: String,
    },
}

impl Cli {
    /// Effective settings: config file, then environment, then command-line flags.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref())?;
        settings.apply_env()?;

        if let Some(backend) = &self.backend {
            settings.storage.backend = BackendKind::from_str(backend).ok_or_else(|| {
                anyhow::anyhow!("Invalid backend '{}'. Valid: sqlite, sheet", backend)
            })?;
        }
        if let Some(database) = &self.database {
            settings.storage.database = database.clone();
        }
        Ok(settings)
    }

    pub async fn run(self) -> Result<()> {
        let settings = self.settings()?;
        let symbol = settings.display.currency_symbol.as_str();

        match self.command {
            Commands::Init => {
                let service = ExpenseService::from_settings(&settings).await?;
                service.photos().ensure_dir()?;
                let location = match settings.storage.backend {
                    BackendKind::Sqlite => settings.storage.database.display(),
                    BackendKind::Sheet => settings.storage.sheet.display(),
                };
                println!(
                    "Store initialized: {} ({})",
                    location, settings.storage.backend
                );
                println!("Photos directory: {}", service.photos().dir().display());
            }

            Commands::Add {
                date,
                category,
                amount,
                location,
                trip,
                emoji,
                description,
                photo,
            } => {
                let service = ExpenseService::from_settings(&settings).await?;
                let form = ExpenseForm {
                    date: parse_date(&date)?,
                    trip_name: trip,
                    category,
                    amount,
                    location,
                    description,
                    emoji,
                };
                let upload = load_photo(photo.as_deref())?;

                let record = service
                    .add(&form, upload.as_ref())
                    .await
                    .map_err(report_error)?;

                println!(
                    "Added expense {}: {} {} at {}",
                    record.id,
                    record.category,
                    format_amount(record.amount_cents, symbol),
                    record.location
                );
                if !record.has_coordinates() {
                    println!("(location not found on the map)");
                }
            }

            Commands::List { format } => {
                let service = ExpenseService::from_settings(&settings).await?;
                let records = service.list().await?;
                run_list_command(records, &format, symbol)?;
            }

            Commands::Show { id } => {
                let service = ExpenseService::from_settings(&settings).await?;
                let record = service.get(id).await?;
                print_record(&record, symbol);
            }

            Commands::Edit {
                id,
                date,
                category,
                amount,
                location,
                trip,
                emoji,
                description,
                photo,
                clear_trip,
                clear_emoji,
                clear_description,
            } => {
                let service = ExpenseService::from_settings(&settings).await?;
                let current = service.get(id).await?;
                let form = ExpenseForm {
                    date: match date {
                        Some(d) => parse_date(&d)?,
                        None => current.date,
                    },
                    trip_name: edited(trip, clear_trip, &current.trip_name),
                    category: category.unwrap_or_else(|| current.category.to_string()),
                    amount: amount.unwrap_or_else(|| format_cents(current.amount_cents)),
                    location: location.unwrap_or_else(|| current.location.clone()),
                    description: edited(description, clear_description, &current.description),
                    emoji: edited(emoji, clear_emoji, &current.emoji),
                };
                let upload = load_photo(photo.as_deref())?;

                let record = service
                    .update(id, &form, upload.as_ref())
                    .await
                    .map_err(report_error)?;

                println!("Updated expense {}", record.id);
                print_record(&record, symbol);
            }

            Commands::Delete { id } => {
                let service = ExpenseService::from_settings(&settings).await?;
                let record = service.delete(id).await?;
                println!(
                    "Deleted expense {}: {} {} at {}",
                    record.id,
                    record.category,
                    format_amount(record.amount_cents, symbol),
                    record.location
                );
            }

            Commands::Timeline { format } => {
                let service = ExpenseService::from_settings(&settings).await?;
                let records = service.list().await?;
                run_timeline_command(&records, &format, symbol)?;
            }

            Commands::Map {
                center_lat,
                center_lon,
                zoom,
                format,
            } => {
                let center = match (center_lat, center_lon) {
                    (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon).ok_or_else(|| {
                        anyhow::anyhow!("Center coordinates out of range: {}, {}", lat, lon)
                    })?),
                    _ => None,
                };
                let params = analytics::MapParams { center, zoom };

                let service = ExpenseService::from_settings(&settings).await?;
                let records = service.list().await?;
                run_map_command(&records, &params, &format, symbol)?;
            }

            Commands::Analytics(cmd) => {
                let service = ExpenseService::from_settings(&settings).await?;
                let records = service.list().await?;
                run_analytics_command(&records, cmd, &settings)?;
            }

            Commands::Export { output, format } => {
                let service = ExpenseService::from_settings(&settings).await?;
                run_export_command(&service, output.as_deref(), &format).await?;
            }

            Commands::Config => {
                print!("{}", settings.to_toml()?);
            }
        }

        Ok(())
    }
}

/// Print each validation message on its own line before handing the error back.
fn report_error(err: AppError) -> anyhow::Error {
    if let Some(messages) = err.validation_messages() {
        eprintln!("Expense not saved:");
        for message in messages {
            eprintln!("  - {}", message);
        }
    }
    err.into()
}

fn edited(new: Option<String>, clear: bool, current: &Option<String>) -> Option<String> {
    if clear { None } else { new.or_else(|| current.clone()) }
}

fn load_photo(path: Option<&Path>) -> Result<Option<PhotoUpload>> {
    path.map(PhotoUpload::from_path).transpose()
}

fn run_list_command(mut records: Vec<ExpenseRecord>, format: &str, symbol: &str) -> Result<()> {
    records.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        "csv" => {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(std::io::stdout());
            writer.write_record(SHEET_HEADER)?;
            for record in &records {
                writer.serialize(SheetRow::from_record(record))?;
            }
            writer.flush()?;
        }
        _ => {
            if records.is_empty() {
                println!("No expenses found.");
                return Ok(());
            }

            println!(
                "{:<6} {:<10} {:<20} {:<12} {:<20} {:>14} {:<5}",
                "ID", "DATE", "TRIP", "CATEGORY", "LOCATION", "AMOUNT", "EMOJI"
            );
            println!("{}", "-".repeat(93));
            for record in &records {
                println!(
                    "{:<6} {:<10} {:<20} {:<12} {:<20} {:>14} {:<5}",
                    record.id,
                    record.date.format("%Y-%m-%d"),
                    truncate(record.trip_name.as_deref().unwrap_or("-"), 20),
                    record.category.as_str(),
                    truncate(&record.location, 20),
                    format_amount(record.amount_cents, symbol),
                    record.emoji.as_deref().unwrap_or("")
                );
            }
            println!("{}", "-".repeat(93));
            println!(
                "{} expense(s), total {}",
                records.len(),
                format_amount(analytics::total(&records), symbol)
            );
        }
    }
    Ok(())
}

fn print_record(record: &ExpenseRecord, symbol: &str) {
    println!("Expense {}", record.id);
    println!("  Date:        {}", record.date.format("%Y-%m-%d"));
    if let Some(trip) = &record.trip_name {
        println!("  Trip:        {}", trip);
    }
    println!("  Category:    {}", record.category);
    println!("  Amount:      {}", format_amount(record.amount_cents, symbol));
    println!("  Location:    {}", record.location);
    match record.coordinates {
        Some(c) => println!("  Coordinates: {:.5}, {:.5}", c.latitude, c.longitude),
        None => println!("  Coordinates: -"),
    }
    if let Some(emoji) = &record.emoji {
        println!("  Emoji:       {}", emoji);
    }
    if let Some(description) = &record.description {
        println!("  Description: {}", description);
    }
    if let Some(photo) = &record.photo_path {
        let status = if record.existing_photo().is_some() {
            ""
        } else {
            " (missing)"
        };
        println!("  Photo:       {}{}", photo, status);
    }
}

fn run_timeline_command(records: &[ExpenseRecord], format: &str, symbol: &str) -> Result<()> {
    let entries = analytics::timeline(records, symbol);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        _ => {
            if entries.is_empty() {
                println!("No expenses found.");
                return Ok(());
            }
            for entry in &entries {
                println!("{}  {}", entry.record.date.format("%Y-%m-%d"), entry.label);
                if let Some(description) = &entry.record.description {
                    println!("{:>12}{}", "", description);
                }
            }
        }
    }
    Ok(())
}

fn run_map_command(
    records: &[ExpenseRecord],
    params: &analytics::MapParams,
    format: &str,
    symbol: &str,
) -> Result<()> {
    let view = analytics::map_view(records, params, symbol);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        _ => {
            match view.center {
                Some(c) => println!(
                    "Map center: {:.5}, {:.5} (zoom {})",
                    c.latitude, c.longitude, view.zoom
                ),
                None => println!("Map center: - (zoom {})", view.zoom),
            }
            println!();

            if view.points.is_empty() {
                println!("No expenses with known coordinates.");
                return Ok(());
            }

            println!(
                "{:<6} {:>10} {:>11}  {}",
                "ID", "LATITUDE", "LONGITUDE", "LABEL"
            );
            println!("{}", "-".repeat(60));
            for point in &view.points {
                println!(
                    "{:<6} {:>10.5} {:>11.5}  {}",
                    point.id, point.coordinates.latitude, point.coordinates.longitude, point.label
                );
            }

            let hidden = records.len() - view.points.len();
            if hidden > 0 {
                println!();
                println!("{} expense(s) without coordinates not shown", hidden);
            }
        }
    }
    Ok(())
}

fn run_analytics_command(
    records: &[ExpenseRecord],
    cmd: AnalyticsCommands,
    settings: &Settings,
) -> Result<()> {
    let symbol = settings.display.currency_symbol.as_str();

    match cmd {
        AnalyticsCommands::Summary { format } => {
            let summary = analytics::summary(records);

            match format.as_str() {
                "json" => {
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                }
                "csv" => {
                    println!("count,total,average,top_location,top_category");
                    println!(
                        "{},{},{},{},{}",
                        summary.count,
                        format_cents(summary.total),
                        format_cents(summary.average),
                        csv_field(&summary.top_location),
                        summary.top_category
                    );
                }
                _ => {
                    println!("Travel Dashboard");
                    println!();
                    println!("Expenses:       {:>15}", summary.count);
                    println!("Total Spent:    {:>15}", format_amount(summary.total, symbol));
                    println!("Average:        {:>15}", format_amount(summary.average, symbol));
                    println!("{}", "-".repeat(32));
                    println!("Top Location:   {:>15}", summary.top_location);
                    println!("Top Category:   {:>15}", summary.top_category);
                }
            }
        }

        AnalyticsCommands::Categories { format } => {
            let shares = analytics::category_shares(records);

            match format.as_str() {
                "json" => {
                    println!("{}", serde_json::to_string_pretty(&shares)?);
                }
                "csv" => {
                    println!("category,total,count,average,percentage");
                    for share in &shares {
                        println!(
                            "{},{},{},{},{:.2}",
                            share.category,
                            format_cents(share.total),
                            share.count,
                            format_cents(share.average),
                            share.percentage
                        );
                    }
                }
                _ => {
                    println!("Spending by Category");
                    println!();
                    println!(
                        "{:<14} {:>14} {:>8} {:>14} {:>8}",
                        "CATEGORY", "TOTAL", "COUNT", "AVERAGE", "PERCENT"
                    );
                    println!("{}", "-".repeat(62));
                    for share in &shares {
                        println!(
                            "{:<14} {:>14} {:>8} {:>14} {:>7.1}%",
                            share.category.as_str(),
                            format_amount(share.total, symbol),
                            share.count,
                            format_amount(share.average, symbol),
                            share.percentage
                        );
                    }
                    println!("{}", "-".repeat(62));
                    println!(
                        "{:<14} {:>14}",
                        "TOTAL",
                        format_amount(analytics::total(records), symbol)
                    );
                }
            }
        }

        AnalyticsCommands::Locations { limit, format } => {
            let locations = analytics::top_locations(records, limit);
            print_group_totals("Top Spending Locations", "LOCATION", &locations, &format, symbol)?;
        }

        AnalyticsCommands::Monthly { format } => {
            let months = analytics::monthly_totals(records);
            print_group_totals("Monthly Spending", "MONTH", &months, &format, symbol)?;
        }

        AnalyticsCommands::Budget { amount, format } => {
            let budget = match amount {
                Some(a) => parse_cents(&a)
                    .with_context(|| format!("Invalid budget amount '{}'", a))?,
                None => settings.budget_cents().ok_or_else(|| {
                    anyhow::anyhow!("No budget set. Use --amount or set `budget` in the config file")
                })?,
            };
            let status = analytics::budget_status(records, budget);

            match format.as_str() {
                "json" => {
                    println!("{}", serde_json::to_string_pretty(&status)?);
                }
                "csv" => {
                    println!("budget,spent,remaining");
                    println!(
                        "{},{},{}",
                        format_cents(status.budget),
                        format_cents(status.spent),
                        format_cents(status.remaining)
                    );
                }
                _ => {
                    println!("Budget:         {:>15}", format_amount(status.budget, symbol));
                    println!("Spent:          {:>15}", format_amount(status.spent, symbol));
                    println!("{}", "-".repeat(32));
                    println!(
                        "Remaining:      {:>15}",
                        format_amount(status.remaining, symbol)
                    );
                    if status.is_over_budget() {
                        println!();
                        println!("Over budget!");
                    }
                }
            }
        }
    }
    Ok(())
}

fn print_group_totals(
    title: &str,
    key_header: &str,
    groups: &[analytics::GroupTotal],
    format: &str,
    symbol: &str,
) -> Result<()> {
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(groups)?);
        }
        "csv" => {
            println!("{},total", key_header.to_lowercase());
            for group in groups {
                println!("{},{}", csv_field(&group.key), format_cents(group.total));
            }
        }
        _ => {
            println!("{}", title);
            println!();
            if groups.is_empty() {
                println!("No expenses found.");
                return Ok(());
            }
            println!("{:<24} {:>15}", key_header, "TOTAL");
            println!("{}", "-".repeat(40));
            for group in groups {
                println!(
                    "{:<24} {:>15}",
                    truncate(&group.key, 24),
                    format_amount(group.total, symbol)
                );
            }
        }
    }
    Ok(())
}

async fn run_export_command(
    service: &ExpenseService,
    output: Option<&Path>,
    format: &str,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    let count = match format {
        "csv" => exporter.export_csv(writer).await?,
        "json" => exporter.export_json(writer).await?.expenses.len(),
        _ => anyhow::bail!("Invalid export format '{}'. Valid formats: csv, json", format),
    };

    if output.is_some() {
        eprintln!("Exported {} expenses", count);
    }
    Ok(())
}

/// Quote a free-text value for single-line CSV output.
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}'. Use YYYY-MM-DD", date_str))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("Goa", 10), "Goa");
        assert_eq!(truncate("Thiruvananthapuram", 10), "Thiruva...");
        assert_eq!(truncate("Zürich Hauptbahnhof", 9), "Zürich...");
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(parse_date("29/02/2024").is_err());
        assert!(parse_date("2023-02-29").is_err());
    }

    #[test]
    fn test_edited_optional_fields() {
        let current = Some("Kerala Trip".to_string());
        assert_eq!(edited(None, false, &current), current);
        assert_eq!(
            edited(Some("Goa".to_string()), false, &current).as_deref(),
            Some("Goa")
        );
        assert_eq!(edited(None, true, &current), None);
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("Goa"), "Goa");
        assert_eq!(csv_field("Paris, France"), "\"Paris, France\"");
    }

    #[test]
    fn test_cli_flags_override_settings() -> Result<()> {
        let cli = Cli::parse_from([
            "wanderlog",
            "--config",
            "/nonexistent/wanderlog.toml",
            "list",
        ]);
        assert!(cli.settings().is_err());

        let temp = tempfile::TempDir::new()?;
        let config = temp.path().join("wanderlog.toml");
        std::fs::write(&config, "[storage]\nbackend = \"sqlite\"\ndatabase = \"file.db\"\n")?;
        let config = config.to_string_lossy().into_owned();

        let cli = Cli::parse_from([
            "wanderlog",
            "--config",
            config.as_str(),
            "--backend",
            "sheet",
            "--database",
            "trips.db",
            "list",
            "--format",
            "json",
        ]);
        let settings = cli.settings()?;
        assert_eq!(settings.storage.backend, BackendKind::Sheet);
        assert_eq!(settings.storage.database, PathBuf::from("trips.db"));
        assert!(matches!(cli.command, Commands::List { ref format } if format == "json"));

        let cli = Cli::parse_from(["wanderlog", "--backend", "mongo", "list"]);
        assert!(cli.settings().is_err());
        Ok(())
    }

    #[test]
    fn test_map_center_requires_both_coordinates() {
        assert!(Cli::try_parse_from(["wanderlog", "map", "--center-lat", "10"]).is_err());
        let cli = Cli::try_parse_from([
            "wanderlog",
            "map",
            "--center-lat",
            "-33.86",
            "--center-lon",
            "151.2",
        ]);
        assert!(cli.is_ok());
    }
}
