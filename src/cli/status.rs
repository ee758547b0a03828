use crate::core::models::{CatPayload, RefreshInterval};
use crate::core::settings::Settings;
use crate::core::store::{self, JsonFileStore};
use anyhow::Result;
use chrono::{DateTime, FixedOffset, Local};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct StatusOutput {
    interval_minutes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    current: Option<CatPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_due_in: Option<String>,
    history_len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    history: Option<Vec<CatPayload>>,
    state_path: PathBuf,
}

pub async fn run(json: bool, show_history: bool) -> Result<()> {
    let settings = Settings::load()?;
    let store = JsonFileStore::new(settings.state_path()?);

    let interval = store::read_interval(&store, settings.default_interval());
    let current = store::read_current(&store)?;
    let history = store::read_history(&store)?;

    let next_due_in = current
        .as_ref()
        .and_then(|c| c.created_at_instant())
        .map(|created| format_due(created, Local::now().fixed_offset(), interval));

    let output = StatusOutput {
        interval_minutes: interval.minutes(),
        current,
        next_due_in,
        history_len: history.len(),
        history: show_history.then_some(history),
        state_path: store.path().to_path_buf(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_text_output(&output);
    }

    Ok(())
}

fn format_due(
    created: DateTime<FixedOffset>,
    now: DateTime<FixedOffset>,
    interval: RefreshInterval,
) -> String {
    let remaining = (created + interval.as_chrono()).signed_duration_since(now);

    if remaining.num_seconds() <= 0 {
        return "now".to_string();
    }

    let total_minutes = remaining.num_minutes();
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    let seconds = remaining.num_seconds() % 60;

    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

fn print_text_output(output: &StatusOutput) {
    println!("Interval:  every {} minute(s)", output.interval_minutes);

    match &output.current {
        Some(cat) => {
            let id = if cat.id.is_empty() { "-" } else { cat.id.as_str() };
            println!("Current:   {} ({})", cat.cached_path, id);
            println!("Fetched:   {}", cat.created_at);
            if let Some(due) = &output.next_due_in {
                println!("Next due:  {}", due);
            }
        }
        None => println!("Current:   none"),
    }

    println!("History:   {} cat(s)", output.history_len);

    if let Some(history) = &output.history {
        for (i, cat) in history.iter().enumerate() {
            println!("  {:>2}. {}  {}", i + 1, cat.created_at, cat.cached_path);
        }
    }
}
