use anyhow::{Context, Result, bail};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use voyagenie::models::BUDGET_PRESETS;
use voyagenie::{Category, Config, DateMode, TripPlanner, TripQuery, ViewState};

const USAGE: &str = "usage: voyagenie <destination> [--duration TEXT | --dates TEXT] [--budget TEXT] \
[--adults N] [--children N] [--from CITY] [--itinerary] [--translate TEXT] [--convert AMOUNT]";

#[derive(Debug, Default)]
struct Args {
    query: TripQuery,
    itinerary: bool,
    translate: Option<String>,
    convert: Option<String>,
}

fn parse_args(mut argv: impl Iterator<Item = String>) -> Result<Args> {
    let mut args = Args {
        query: TripQuery {
            date_mode: DateMode::Duration,
            date_value: "3 days".to_string(),
            budget: BUDGET_PRESETS[1].to_string(),
            ..Default::default()
        },
        ..Default::default()
    };

    while let Some(arg) = argv.next() {
        let mut value = |flag: &str| argv.next().with_context(|| format!("{flag} needs a value"));
        match arg.as_str() {
            "--duration" => {
                args.query.date_mode = DateMode::Duration;
                args.query.date_value = value("--duration")?;
            }
            "--dates" => {
                args.query.date_mode = DateMode::ExactDates;
                args.query.date_value = value("--dates")?;
            }
            "--budget" => args.query.budget = value("--budget")?,
            "--from" => args.query.origin = value("--from")?,
            "--adults" => args.query.travelers.adults = value("--adults")?.parse()?,
            "--children" => args.query.travelers.children = value("--children")?.parse()?,
            "--itinerary" => args.itinerary = true,
            "--translate" => args.translate = Some(value("--translate")?),
            "--convert" => args.convert = Some(value("--convert")?),
            "-h" | "--help" => bail!(USAGE),
            flag if flag.starts_with("--") => bail!("unknown flag {flag}\n{USAGE}"),
            destination if args.query.destination.is_empty() => {
                args.query.destination = destination.to_string();
            }
            extra => bail!("unexpected argument {extra}\n{USAGE}"),
        }
    }

    if args.query.destination.is_empty() {
        bail!(USAGE);
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the view state JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load();
    let args = parse_args(std::env::args().skip(1))?;
    tracing::info!(
        destination = %args.query.destination,
        travelers = %args.query.travelers.summary(),
        "main: Planning trip"
    );

    let planner = TripPlanner::from_config(&config);
    let state = Mutex::new(ViewState::new());

    planner.load_destination(&state, &args.query).await?;
    if args.itinerary {
        planner.generate_itinerary(&state, &args.query).await?;
    }
    if let Some(text) = &args.translate {
        planner
            .translate(&state, &args.query, text, None, None)
            .await;
    }

    if let Some(amount) = args.convert {
        let mut converter = planner.converter_for(&args.query);
        converter.amount = amount;
        match planner.refresh_rates(&mut converter).await {
            Ok(()) => tracing::info!(
                from = %converter.from,
                to = %converter.to,
                amount = %converter.amount,
                output = %converter.output,
                "main: Currency converted"
            ),
            Err(e) => tracing::warn!(error = %e, "main: Exchange rates unavailable"),
        }
    }

    let state = state.into_inner();
    for category in state.pending() {
        tracing::warn!(category = %category, "main: Category still loading");
    }
    if let Some(message) = &state.slot(Category::Itinerary).error_message {
        tracing::warn!(error = %message, "main: Itinerary failed");
    }

    let json = serde_json::to_string_pretty(&state)?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> impl Iterator<Item = String> {
        items
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn test_parse_defaults() {
        let args = parse_args(argv(&["Goa"])).unwrap();
        assert_eq!(args.query.destination, "Goa");
        assert_eq!(args.query.date_mode, DateMode::Duration);
        assert_eq!(args.query.budget, "₹20k - ₹50k");
        assert_eq!(args.query.travelers.adults, 2);
        assert!(args.query.validate().is_ok());
    }

    #[test]
    fn test_parse_flags() {
        let args = parse_args(argv(&[
            "--dates", "Dec 1 - Dec 5", "Paris", "--adults", "1", "--children", "2", "--itinerary",
        ]))
        .unwrap();
        assert_eq!(args.query.destination, "Paris");
        assert_eq!(args.query.date_mode, DateMode::ExactDates);
        assert_eq!(args.query.travelers.children, 2);
        assert!(args.itinerary);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_args(argv(&[])).is_err());
        assert!(parse_args(argv(&["Goa", "--adults"])).is_err());
        assert!(parse_args(argv(&["Goa", "--adults", "two"])).is_err());
        assert!(parse_args(argv(&["Goa", "Paris"])).is_err());
    }
}
