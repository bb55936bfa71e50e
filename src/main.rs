use chrono::{Local, NaiveDate};
use uuid::Uuid;

use timebox::config::{self, TimeboxConfig};
use timebox::core::day_plan::DayPlan;
use timebox::core::transition::{DragEvent, MoveOutcome, Zone};
use timebox::organizer::anthropic::AnthropicOrganizer;
use timebox::organizer::{OrganizeMode, TextOrganizer, keyring};
use timebox::store::{OrganizeResolution, PlanStore};

const USAGE: &str = "\
Usage: timebox [--date YYYY-MM-DD] [--debug] <command> [args]

Commands:
  show                          print the plan for the date
  dump <text>                   replace the brain dump
  organize [--delegate]         turn the brain dump into processed items
  add <text>                    add a processed item by hand
  slot <hour> <task> [notes]    set the task and notes of an hour
  clear <hour>                  empty an hour
  toggle <hour> [item-id]       toggle completion of an hour or one of its items
  promote <item-id>             move a processed item to the priorities
  schedule <item-id> <hour>     move a processed or priority item into an hour
  unpromote <item-id>           move a priority back to the processed items
  set-key <api-key>             store the Anthropic API key in the keyring";

#[derive(Debug)]
enum Command {
    Show,
    Dump(String),
    Organize { delegate: bool },
    Add(String),
    Slot { hour: u8, task: String, notes: String },
    Clear(u8),
    Toggle { hour: u8, item: Option<String> },
    Promote(String),
    Schedule { item: String, hour: u8 },
    Unpromote(String),
    SetKey(String),
}

struct Invocation {
    date: Option<NaiveDate>,
    debug: bool,
    command: Command,
}

fn parse_hour(s: &str) -> Result<u8, String> {
    s.parse::<u8>().map_err(|_| format!("not an hour: {}", s))
}

fn parse_args(args: &[String]) -> Result<Invocation, String> {
    let mut date = None;
    let mut debug = false;
    let mut rest: Vec<&str> = Vec::new();

    let mut iter = args.iter().map(String::as_str);
    while let Some(arg) = iter.next() {
        match arg {
            "--date" => {
                let value = iter.next().ok_or("--date needs a value")?;
                let parsed = NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .map_err(|e| format!("bad date {}: {}", value, e))?;
                date = Some(parsed);
            }
            "--debug" => debug = true,
            other => rest.push(other),
        }
    }

    let command = match rest.as_slice() {
        [] | ["show"] => Command::Show,
        ["dump", text @ ..] => Command::Dump(text.join(" ")),
        ["organize"] => Command::Organize { delegate: false },
        ["organize", "--delegate"] => Command::Organize { delegate: true },
        ["add", text @ ..] if !text.is_empty() => Command::Add(text.join(" ")),
        ["slot", hour, task] => Command::Slot {
            hour: parse_hour(hour)?,
            task: task.to_string(),
            notes: String::new(),
        },
        ["slot", hour, task, notes @ ..] => Command::Slot {
            hour: parse_hour(hour)?,
            task: task.to_string(),
            notes: notes.join(" "),
        },
        ["clear", hour] => Command::Clear(parse_hour(hour)?),
        ["toggle", hour] => Command::Toggle {
            hour: parse_hour(hour)?,
            item: None,
        },
        ["toggle", hour, item] => Command::Toggle {
            hour: parse_hour(hour)?,
            item: Some(item.to_string()),
        },
        ["promote", item] => Command::Promote(item.to_string()),
        ["schedule", item, hour] => Command::Schedule {
            item: item.to_string(),
            hour: parse_hour(hour)?,
        },
        ["unpromote", item] => Command::Unpromote(item.to_string()),
        ["set-key", key] => Command::SetKey(key.to_string()),
        _ => return Err(format!("unrecognized command: {}", rest.join(" "))),
    };

    Ok(Invocation { date, debug, command })
}

/// Resolve a full id or a unique prefix of one.
fn resolve_item(plan: &DayPlan, needle: &str) -> Option<Uuid> {
    let ids = plan
        .processed_items
        .iter()
        .map(|item| item.id)
        .chain(plan.priorities.iter().map(|entry| entry.id()))
        .chain(plan.time_slots.iter().flat_map(|slot| slot.dragged_items.iter().map(|item| item.id)));

    let mut matches = ids.filter(|id| id.to_string().starts_with(needle));
    let first = matches.next()?;
    matches.next().is_none().then_some(first)
}

fn lookup(plan: &DayPlan, needle: &str) -> Result<Uuid, String> {
    resolve_item(plan, needle).ok_or_else(|| format!("no unique item matches {}", needle))
}

fn short(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}

fn print_plan(plan: &DayPlan) {
    println!("{}", plan.date.format("%A, %B %-d, %Y"));

    if !plan.brain_dump.is_empty() {
        println!("\nBrain dump:");
        for line in plan.brain_dump.lines() {
            println!("  {}", line);
        }
    }

    println!("\nPriorities:");
    for entry in &plan.priorities {
        println!("  {}. [{}] {}", entry.priority, short(entry.id()), entry.item.text);
    }

    println!("\nProcessed:");
    for item in &plan.processed_items {
        let category = item.category.as_deref().unwrap_or("General");
        println!("  [{}] {} ({})", short(item.id), item.text, category);
    }

    println!("\nSchedule:");
    let now = Local::now().naive_local();
    for (row, slot) in plan.overview(now).iter().zip(&plan.time_slots) {
        if slot.is_empty() && !row.is_current {
            continue;
        }
        let marker = if row.is_current { ">" } else { " " };
        let check = if row.completed { "x" } else { " " };
        println!("{} [{}] {:>8}  {}", marker, check, slot.label(), slot.task);
        if !slot.notes.is_empty() {
            println!("                  {}", slot.notes);
        }
        for item in &slot.dragged_items {
            let check = if item.completed { "x" } else { " " };
            println!("                  [{}] [{}] {}", check, short(item.id), item.text);
        }
    }
}

async fn build_organizer(config: &TimeboxConfig, delegate: bool) -> TextOrganizer {
    if !delegate && config.organizer.mode == OrganizeMode::Local {
        return TextOrganizer::local();
    }
    match keyring::resolve_api_key().await {
        Ok(key) => TextOrganizer::delegated(AnthropicOrganizer::new(key, &config.organizer)),
        Err(e) => {
            log::warn!("{}; organizing locally", e);
            eprintln!("warning: {}; organizing locally", e);
            TextOrganizer::local()
        }
    }
}

fn report_drag(result: Result<MoveOutcome, timebox::core::transition::TransitionError>) {
    match result {
        Ok(MoveOutcome::Moved { .. }) => {}
        Ok(MoveOutcome::Ignored(reason)) => eprintln!("nothing moved: {:?}", reason),
        Err(e) => eprintln!("{}", e),
    }
}

async fn run(store: &mut PlanStore, config: &TimeboxConfig, command: Command) -> Result<(), String> {
    match command {
        Command::Show => print_plan(store.plan()),
        Command::Dump(text) => store.set_brain_dump(text),
        Command::Organize { delegate } => {
            let organizer = build_organizer(config, delegate).await;
            log::debug!("Organizing {} in {:?} mode", store.date(), organizer.mode());
            match store.organize(&organizer).await.map_err(|e| e.to_string())? {
                OrganizeResolution::Applied { count } => println!("{} items", count),
                OrganizeResolution::Discarded => {}
                OrganizeResolution::Failed(e) => return Err(format!("organizing failed: {}", e)),
            }
        }
        Command::Add(text) => match store.add_manual_item(&text) {
            Some(id) => println!("{}", short(id)),
            None => return Err("item text is empty".into()),
        },
        Command::Slot { hour, task, notes } => {
            if !store.update_slot(hour, task, notes) {
                return Err(format!("no such hour: {}", hour));
            }
        }
        Command::Clear(hour) => {
            if !store.clear_slot(hour) {
                return Err(format!("no such hour: {}", hour));
            }
        }
        Command::Toggle { hour, item } => {
            let item_id = item.map(|needle| lookup(store.plan(), &needle)).transpose()?;
            if !store.toggle_complete(hour, item_id) {
                return Err(format!("nothing to toggle at hour {}", hour));
            }
        }
        Command::Promote(needle) => {
            let id = lookup(store.plan(), &needle)?;
            let source = store.plan().locate(id).unwrap_or(Zone::Processed);
            report_drag(store.apply_drag(DragEvent::new(id, source, Some(Zone::Priorities))));
        }
        Command::Schedule { item, hour } => {
            let id = lookup(store.plan(), &item)?;
            let source = store.plan().locate(id).unwrap_or(Zone::Processed);
            report_drag(store.apply_drag(DragEvent::new(id, source, Some(Zone::Slot(hour)))));
        }
        Command::Unpromote(needle) => {
            let id = lookup(store.plan(), &needle)?;
            if !store.remove_priority(id) {
                return Err(format!("{} is not a priority", needle));
            }
        }
        Command::SetKey(key) => keyring::store_api_key(&key).await.map_err(|e| e.to_string())?,
    }
    Ok(())
}

fn init_logging(debug: bool) {
    // Log to the systemd user journal (`journalctl --user -t timebox -f`).
    // timebox targets at info/debug, everything else at warn.
    struct FilteredJournal {
        inner: systemd_journal_logger::JournalLog,
    }

    impl log::Log for FilteredJournal {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            if metadata.target().starts_with("timebox") {
                let max = if timebox::debug_logging() { log::LevelFilter::Debug } else { log::LevelFilter::Info };
                metadata.level() <= max
            } else {
                metadata.level() <= log::LevelFilter::Warn
            }
        }
        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.inner.log(record);
            }
        }
        fn flush(&self) {
            self.inner.flush();
        }
    }

    timebox::set_debug_logging(debug);

    let journal = match systemd_journal_logger::JournalLog::new() {
        Ok(journal) => journal.with_syslog_identifier("timebox".to_string()),
        Err(e) => {
            eprintln!("warning: journal unavailable, logging disabled: {}", e);
            return;
        }
    };
    if log::set_boxed_logger(Box::new(FilteredJournal { inner: journal })).is_ok() {
        // Global max must be Debug so debug logs can pass when toggled
        log::set_max_level(log::LevelFilter::Debug);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = TimeboxConfig::load(&config::default_config_path())?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = match parse_args(&args) {
        Ok(invocation) => invocation,
        Err(msg) => {
            eprintln!("{}\n\n{}", msg, USAGE);
            std::process::exit(2);
        }
    };

    init_logging(config.debug_logging || invocation.debug);
    config.ensure_dirs()?;

    let date = invocation.date.unwrap_or_else(|| Local::now().date_naive());
    let mut store = PlanStore::open(config.storage(), date);

    let outcome = run(&mut store, &config, invocation.command).await;
    if let Some(err) = store.last_persist_error() {
        eprintln!("warning: changes were not saved: {}", err);
    }
    if let Err(msg) = outcome {
        eprintln!("{}", msg);
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use timebox::core::item::Item;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_date_and_command() {
        let inv = parse_args(&args(&["--date", "2026-10-19", "slot", "9", "Standup", "room", "4"])).unwrap();
        assert_eq!(inv.date, NaiveDate::from_ymd_opt(2026, 10, 19));
        match inv.command {
            Command::Slot { hour, task, notes } => {
                assert_eq!(hour, 9);
                assert_eq!(task, "Standup");
                assert_eq!(notes, "room 4");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn defaults_to_show() {
        let inv = parse_args(&[]).unwrap();
        assert!(matches!(inv.command, Command::Show));
        assert!(!inv.debug);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_args(&args(&["clear", "noon"])).is_err());
        assert!(parse_args(&args(&["--date", "19/10/2026", "show"])).is_err());
        assert!(parse_args(&args(&["fly"])).is_err());
        assert!(parse_args(&args(&["add"])).is_err());
    }

    #[test]
    fn resolves_unique_prefixes() {
        let mut plan = DayPlan::new(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        let item = Item::new("a", None);
        let id = item.id;
        plan.slot_mut(3).unwrap().dragged_items.push(item);

        assert_eq!(resolve_item(&plan, &id.to_string()), Some(id));
        assert_eq!(resolve_item(&plan, &id.to_string()[..6]), Some(id));
        assert_eq!(resolve_item(&plan, "zz"), None);
    }
}
