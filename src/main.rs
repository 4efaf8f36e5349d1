use std::collections::HashMap;
use std::io::BufRead;
use std::sync::Arc;

use callme::config::ClientConfig;
use callme::controller::delete::DeleteOutcome;
use callme::controller::retry::{RetryDelay, RetryOutcome};
use callme::controller::EditGate;
use callme::core::clock::SystemClock;
use callme::core::phone::{format_phone_for_display, normalize_phone};
use callme::core::reminder::{NewReminder, ReminderId, wire_time};
use callme::core::view::{SortKey, StatusFilter, ViewFilter};
use callme::message::Message;
use callme::notify::{Notification, Notifier, Severity};
use callme::sync::http::HttpStore;
use callme::LifecycleController;
use chrono::NaiveDateTime;
use tokio::sync::broadcast::error::RecvError;

const USAGE: &str = "\
usage: callme <command> [args]

  list [--status S] [--search Q] [--sort due|created|title]
  create --title T --message M --phone P --at YYYY-MM-DDTHH:MM [--tz ZONE]
  edit ID [--title T] [--message M] [--phone P] [--at YYYY-MM-DDTHH:MM]
  reschedule ID YYYY-MM-DDTHH:MM
  retry ID 5m|15m|1h|MINUTES
  delete ID
  watch
  health";

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Prints notifications. An undoable one arms Enter as its undo key.
struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, n: Notification) {
        let tag = match n.severity {
            Severity::Info => "info",
            Severity::Success => "ok",
            Severity::Warning => "warn",
            Severity::Error => "error",
        };
        println!("[{}] {}: {}", tag, n.title, n.description);

        if let Some(undo) = n.undo {
            println!(
                "      press Enter within {}s to undo",
                n.duration.as_secs()
            );
            std::thread::spawn(move || {
                let mut line = String::new();
                if std::io::stdin().lock().read_line(&mut line).is_ok() && undo.undo() {
                    log::info!("Undo requested from terminal");
                }
            });
        }
    }
}

/// `command pos... --flag value...`
struct Args {
    command: String,
    positional: Vec<String>,
    flags: HashMap<String, String>,
}

impl Args {
    fn parse(raw: impl Iterator<Item = String>) -> Result<Self, String> {
        let mut raw = raw.skip(1);
        let command = raw.next().ok_or_else(|| USAGE.to_string())?;
        let mut positional = Vec::new();
        let mut flags = HashMap::new();
        while let Some(arg) = raw.next() {
            if let Some(name) = arg.strip_prefix("--") {
                let value = raw
                    .next()
                    .ok_or_else(|| format!("missing value for --{}", name))?;
                flags.insert(name.to_string(), value);
            } else {
                positional.push(arg);
            }
        }
        Ok(Self {
            command,
            positional,
            flags,
        })
    }

    fn flag(&self, name: &str) -> Option<&str> {
        self.flags.get(name).map(String::as_str)
    }

    fn required(&self, name: &str) -> Result<&str, String> {
        self.flag(name).ok_or_else(|| format!("--{} is required", name))
    }

    fn id(&self) -> Result<ReminderId, String> {
        let raw = self.positional.first().ok_or("missing reminder id")?;
        raw.parse().map_err(|_| format!("invalid reminder id: {}", raw))
    }

    fn positional(&self, index: usize, what: &str) -> Result<&str, String> {
        self.positional
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| format!("missing {}", what))
    }
}

fn parse_time(raw: &str) -> Result<NaiveDateTime, String> {
    wire_time::parse(raw).ok_or_else(|| format!("invalid date-time (want YYYY-MM-DDTHH:MM): {}", raw))
}

fn init_logging() {
    struct FilteredJournal {
        inner: systemd_journal_logger::JournalLog,
    }

    impl log::Log for FilteredJournal {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            if metadata.target().starts_with("callme") {
                let max = if callme::debug_logging() {
                    log::LevelFilter::Debug
                } else {
                    log::LevelFilter::Info
                };
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

    // `journalctl --user -t callme -f`
    let journal = match systemd_journal_logger::JournalLog::new() {
        Ok(journal) => journal.with_syslog_identifier("callme".to_string()),
        Err(e) => {
            eprintln!("warning: journal unavailable, logging disabled: {}", e);
            return;
        }
    };
    if log::set_boxed_logger(Box::new(FilteredJournal { inner: journal })).is_ok() {
        // Global max must be Debug so debug logs can pass through when toggled.
        log::set_max_level(log::LevelFilter::Debug);
    }
}

#[tokio::main]
async fn main() -> CliResult {
    let config = match ClientConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("warning: {}; using defaults", e);
            ClientConfig::default()
        }
    };
    callme::set_debug_logging(config.debug_logging);
    init_logging();

    let args = match Args::parse(std::env::args()) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{}", msg);
            std::process::exit(2);
        }
    };

    let store = HttpStore::new(&config.api_base_url, config.request_timeout())?;
    log::debug!("Using reminder service at {}", store.base_url());

    if args.command == "health" {
        let health = store.health().await?;
        println!("{}: {}", store.base_url(), health.status);
        return Ok(());
    }

    let controller = LifecycleController::new(
        Arc::new(store),
        Arc::new(TerminalNotifier),
        Arc::new(SystemClock),
        config.controller_settings(),
    );

    let result = match args.command.as_str() {
        "list" => list(&controller, &args).await,
        "create" => create(&controller, &args, &config).await,
        "edit" => edit(&controller, &args).await,
        "reschedule" => reschedule(&controller, &args).await,
        "retry" => retry(&controller, &args).await,
        "delete" => delete(&controller, &args).await,
        "watch" => watch(&controller).await,
        other => Err(format!("unknown command: {}\n\n{}", other, USAGE).into()),
    };
    if let Err(ref e) = result {
        log::error!("{} failed: {}", args.command, e);
    }
    result
}

async fn list(controller: &LifecycleController, args: &Args) -> CliResult {
    controller.refresh().await?;

    let mut filter = ViewFilter::default();
    if let Some(status) = args.flag("status") {
        filter.status = StatusFilter::parse(status).ok_or(format!("unknown status: {}", status))?;
    }
    if let Some(sort) = args.flag("sort") {
        filter.sort = SortKey::parse(sort).ok_or(format!("unknown sort: {}", sort))?;
    }
    filter.query = args.flag("search").unwrap_or_default().to_string();

    for r in controller.visible(&filter) {
        let countdown = controller
            .countdown(r.id)
            .filter(|_| r.status.is_active())
            .map(|c| c.label)
            .unwrap_or_default();
        println!(
            "{:>5}  {:<9}  {}  {:<12}  {}  {}",
            r.id,
            r.status,
            r.scheduled_time.format("%Y-%m-%d %H:%M"),
            countdown,
            format_phone_for_display(&r.phone_number),
            r.title
        );
    }

    let counts = controller.status_counts();
    println!(
        "\n{} total: {} scheduled, {} completed, {} failed, {} urgent",
        counts.all,
        counts.scheduled,
        counts.completed,
        counts.failed,
        controller.urgent_count()
    );
    Ok(())
}

async fn create(controller: &LifecycleController, args: &Args, config: &ClientConfig) -> CliResult {
    let data = NewReminder {
        title: args.required("title")?.trim().to_string(),
        message: args.required("message")?.trim().to_string(),
        phone_number: normalize_phone(args.required("phone")?),
        scheduled_time: parse_time(args.required("at")?)?,
        timezone: args
            .flag("tz")
            .unwrap_or(config.default_timezone.as_str())
            .to_string(),
    };
    let created = controller.create(data).await?;
    println!("{}", created.id);
    Ok(())
}

async fn edit(controller: &LifecycleController, args: &Args) -> CliResult {
    let id = args.id()?;
    controller.refresh().await?;

    let mut form = match controller.begin_edit(id).await {
        EditGate::Open(form) => form,
        EditGate::Redirect(reason) => return Err(format!("cannot edit {}: {:?}", id, reason).into()),
    };
    if let Some(title) = args.flag("title") {
        form.title = title.to_string();
    }
    if let Some(message) = args.flag("message") {
        form.message = message.to_string();
    }
    if let Some(phone) = args.flag("phone") {
        form.phone_number = phone.to_string();
    }
    if let Some(at) = args.flag("at") {
        let at = parse_time(at)?;
        form.date = at.format("%Y-%m-%d").to_string();
        form.time = at.format("%H:%M").to_string();
    }

    controller.save_edit(id, form.to_patch()?).await?;
    Ok(())
}

async fn reschedule(controller: &LifecycleController, args: &Args) -> CliResult {
    let id = args.id()?;
    let at = parse_time(args.positional(1, "new time")?)?;
    controller.refresh().await?;
    controller.reschedule(id, at).await?;
    Ok(())
}

async fn retry(controller: &LifecycleController, args: &Args) -> CliResult {
    let id = args.id()?;
    let delay = RetryDelay::parse(args.positional(1, "delay")?)?;
    controller.refresh().await?;
    match controller.retry(id, delay).await? {
        RetryOutcome::Scheduled(_) => Ok(()),
        RetryOutcome::Failed => Err(format!("retry of {} failed", id).into()),
    }
}

async fn delete(controller: &LifecycleController, args: &Args) -> CliResult {
    let id = args.id()?;
    controller.refresh().await?;
    let ticket = controller.delete(id)?;
    match ticket.finished().await? {
        DeleteOutcome::Confirmed => println!("deleted {}", id),
        DeleteOutcome::Restored => println!("kept {}", id),
        DeleteOutcome::RolledBack => return Err(format!("delete of {} failed", id).into()),
    }
    Ok(())
}

async fn watch(controller: &LifecycleController) -> CliResult {
    controller.refresh().await?;
    let mut events = controller.subscribe();
    controller.mount();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(Message::Tick { urgent, countdowns }) => {
                    println!("{} urgent", urgent);
                    for (id, countdown) in countdowns.iter().filter(|(_, c)| c.urgency.is_urgent()) {
                        println!("  {:>5}  {}", id, countdown.label);
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => log::warn!("Watch skipped {} events", n),
                Err(RecvError::Closed) => break,
            },
        }
    }

    controller.unmount();
    Ok(())
}
