use chrono::Local;
use nu_ansi_term::{Color, Style};
use std::fmt;
use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    prelude::*,
    registry::LookupSpan,
    Layer,
};

/// Installs the global subscriber: colorized console output plus daily
/// rotated plain-text files under `logs/`.
///
/// Action outcomes go to the `task_result` target so they always reach both
/// sinks; everything else is INFO on the console and WARN in the file.
/// The returned guard must be kept alive for file logging to flush.
pub fn setup_logger() -> Option<WorkerGuard> {
    std::fs::create_dir_all("logs").ok();

    let file_appender = tracing_appender::rolling::daily("logs", "bot");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_filter = tracing_subscriber::filter::Targets::new()
        .with_target("task_result", tracing::Level::INFO)
        .with_default(tracing::Level::WARN);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(FileFormatter)
        .with_filter(file_filter);

    let console_filter = tracing_subscriber::filter::Targets::new()
        .with_target("task_result", tracing::Level::INFO)
        .with_default(tracing::Level::INFO);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .event_format(TerminalFormatter)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .init();

    Some(guard)
}

/// Pulls the `message` field out of an event; other fields are ignored.
#[derive(Default)]
struct MessageExtractor(Option<String>);

impl MessageExtractor {
    fn take(event: &Event<'_>) -> String {
        let mut extractor = Self::default();
        event.record(&mut extractor);
        extractor.0.unwrap_or_default()
    }
}

impl tracing::field::Visit for MessageExtractor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.0 = Some(value.to_owned());
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = Some(format!("{:?}", value));
        }
    }
}

/// Recolors the first occurrence of `needle`, leaving the rest of the line
/// untouched. `None` when the needle is absent.
fn highlight(line: &str, needle: &str, style: Style) -> Option<String> {
    let at = line.find(needle)?;
    let mut out = String::with_capacity(line.len() + 16);
    out.push_str(&line[..at]);
    out.push_str(&style.paint(needle).to_string());
    out.push_str(&line[at + needle.len()..]);
    Some(out)
}

const SUCCESS_WORDS: [&str; 2] = ["SUCCESS", "Success"];
const FAILURE_WORDS: [&str; 2] = ["FAILED", "Failed"];

fn colorize_status(line: String) -> String {
    let green = Style::new().fg(Color::LightGreen).bold();
    for word in SUCCESS_WORDS {
        if let Some(colored) = highlight(&line, word, green) {
            return colored;
        }
    }
    let red = Style::new().fg(Color::LightRed).bold();
    for word in FAILURE_WORDS {
        if let Some(colored) = highlight(&line, word, red) {
            return colored;
        }
    }
    line
}

pub struct TerminalFormatter;

impl<S, N> FormatEvent<S, N> for TerminalFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let msg = MessageExtractor::take(event);
        writeln!(writer, "{}", colorize_status(msg))
    }
}

pub struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        writeln!(
            writer,
            "{} {:<5} {}: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            meta.level(),
            meta.target(),
            MessageExtractor::take(event)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlight_recolors_only_the_first_match() {
        let style = Style::new().fg(Color::LightGreen).bold();
        let out = highlight("a Success b Success", "Success", style).unwrap();
        let painted = style.paint("Success").to_string();
        assert_eq!(out.matches(&painted).count(), 1);
        assert!(out.ends_with(" b Success"));
    }

    #[test]
    fn highlight_misses_return_none() {
        let style = Style::new().fg(Color::LightRed).bold();
        assert!(highlight("nothing to see", "Failed", style).is_none());
    }

    #[test]
    fn status_words_get_their_own_colors() {
        let ok = colorize_status("[WL:1] Success [01_swap] done".to_string());
        assert!(ok.contains("\x1b["));
        let bad = colorize_status("[WL:1] Failed  [01_swap] boom".to_string());
        assert!(bad.contains("\x1b["));
        let plain = colorize_status("just an info line".to_string());
        assert_eq!(plain, "just an info line");
    }
}
