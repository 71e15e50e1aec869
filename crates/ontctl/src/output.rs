//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one tab-separated line per item.

use std::fmt::Write as _;
use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use ontctl_core::{
    AttributeOutcome, DeviceContext, Notice, OutcomeStatus, ReconciliationPlan, RunReport, Tag,
    WriteDirective,
};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn new(mode: ColorMode) -> Self {
        Self {
            enabled: should_color(mode),
        }
    }

    fn paint(self, text: &str, style: impl Fn(&str) -> String) -> String {
        if self.enabled {
            style(text)
        } else {
            text.to_owned()
        }
    }

    fn heading(self, text: &str) -> String {
        self.paint(text, |t| t.bold().cyan().to_string())
    }

    fn good(self, text: &str) -> String {
        self.paint(text, |t| t.green().to_string())
    }

    fn warn(self, text: &str) -> String {
        self.paint(text, |t| t.yellow().to_string())
    }

    fn bad(self, text: &str) -> String {
        self.paint(text, |t| t.red().to_string())
    }

    fn dim(self, text: &str) -> String {
        self.paint(text, |t| t.dimmed().to_string())
    }
}

// ── Result envelope ──────────────────────────────────────────────────

/// An item paired with the snapshot file it came from.
#[derive(Debug, Serialize)]
pub struct Sourced<T> {
    pub source: String,
    #[serde(flatten)]
    pub item: T,
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable items in the chosen format.
///
/// - `table`: `to_row` builds one `Tabled` row per item
/// - `json` / `json-compact` / `yaml`: serializes the original data
/// - `plain`: `line_fn` emits one line per item
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    line_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Plain => Ok(data.iter().map(line_fn).collect::<Vec<_>>().join("\n")),
        structured => render_structured(structured, data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// Report a per-device failure on stderr without aborting the fleet.
pub fn print_device_error(source: &str, err: &dyn std::fmt::Display, palette: Palette) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "{} {source}: {err}", palette.bad("error:"));
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_structured<T: Serialize + ?Sized>(
    format: OutputFormat,
    data: &T,
) -> Result<String, CliError> {
    let rendered = match format {
        OutputFormat::JsonCompact => serde_json::to_string(data).map_err(output_err)?,
        OutputFormat::Yaml => serde_yaml::to_string(data).map_err(output_err)?,
        _ => serde_json::to_string_pretty(data).map_err(output_err)?,
    };
    Ok(rendered)
}

fn output_err(err: impl std::fmt::Display) -> CliError {
    CliError::Output(err.to_string())
}

// ── Plans ────────────────────────────────────────────────────────────

#[derive(Tabled)]
struct DirectiveRow {
    #[tabled(rename = "Capability")]
    capability: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Desired")]
    desired: String,
}

impl From<&WriteDirective> for DirectiveRow {
    fn from(d: &WriteDirective) -> Self {
        let current = match (&d.current, &d.instance) {
            (_, Some(_)) => "(new)".into(),
            (Some(v), None) => v.clone(),
            (None, None) => "-".into(),
        };
        Self {
            capability: d.capability.to_string(),
            path: d.path.clone(),
            current,
            desired: d.value.to_string(),
        }
    }
}

pub fn render_plans(
    format: OutputFormat,
    plans: &[Sourced<ReconciliationPlan>],
    palette: Palette,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => Ok(plans
            .iter()
            .map(|p| plan_table(p, palette))
            .collect::<Vec<_>>()
            .join("\n")),
        OutputFormat::Plain => Ok(plans
            .iter()
            .flat_map(|p| {
                p.item
                    .directives
                    .iter()
                    .map(move |d| format!("{}\t{}\t{}", p.source, d.path, d.value))
            })
            .collect::<Vec<_>>()
            .join("\n")),
        structured => render_structured(structured, plans),
    }
}

fn plan_table(sourced: &Sourced<ReconciliationPlan>, palette: Palette) -> String {
    let plan = &sourced.item;
    let mut out = device_heading(&sourced.source, &plan.device, palette);

    if plan.directives.is_empty() {
        let _ = writeln!(out, "{}", palette.good("converged: no writes needed"));
    } else {
        let rows: Vec<DirectiveRow> = plan.directives.iter().map(DirectiveRow::from).collect();
        let _ = writeln!(out, "{}", render_table(&rows));
    }
    let _ = writeln!(
        out,
        "{}",
        palette.dim(&format!("{} capabilities in sync", plan.in_sync.len()))
    );
    push_tags(&mut out, &plan.tags, palette);
    push_notices(&mut out, &plan.notices, palette);
    out
}

fn device_heading(source: &str, device: &DeviceContext, palette: Palette) -> String {
    let id = &device.identity;
    format!(
        "{} {}\n",
        palette.heading(&format!("── {source}")),
        palette.dim(&format!(
            "{} / {} ({} {} SN:{})",
            device.vendor_name(),
            device.schema,
            id.manufacturer,
            id.product_class,
            id.serial
        ))
    )
}

fn push_tags(out: &mut String, tags: &[Tag], palette: Palette) {
    let set: Vec<&str> = tags.iter().filter(|t| t.value).map(|t| t.name.as_str()).collect();
    let cleared: Vec<&str> = tags.iter().filter(|t| !t.value).map(|t| t.name.as_str()).collect();
    let _ = writeln!(out, "tags: {}", set.join(", "));
    if !cleared.is_empty() {
        let _ = writeln!(out, "{}", palette.dim(&format!("cleared: {}", cleared.join(", "))));
    }
}

fn push_notices(out: &mut String, notices: &[Notice], palette: Palette) {
    for notice in notices {
        let _ = writeln!(out, "{} {notice}", palette.warn("!"));
    }
}

// ── Reports ──────────────────────────────────────────────────────────

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Capability")]
    capability: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Result")]
    status: String,
}

fn status_text(status: &OutcomeStatus) -> String {
    match status {
        OutcomeStatus::Written => "written".into(),
        OutcomeStatus::Rejected { kind } => format!("rejected: {kind}"),
        OutcomeStatus::Error { message } => format!("error: {message}"),
    }
}

impl From<&AttributeOutcome> for OutcomeRow {
    fn from(o: &AttributeOutcome) -> Self {
        Self {
            capability: o.capability.to_string(),
            path: o.path.clone(),
            status: status_text(&o.status),
        }
    }
}

pub fn render_reports(
    format: OutputFormat,
    reports: &[Sourced<RunReport>],
    palette: Palette,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => Ok(reports
            .iter()
            .map(|r| report_table(r, palette))
            .collect::<Vec<_>>()
            .join("\n")),
        OutputFormat::Plain => Ok(reports
            .iter()
            .flat_map(|r| {
                r.item.outcomes.iter().map(move |o| {
                    format!("{}\t{}\t{}", r.source, o.path, status_text(&o.status))
                })
            })
            .collect::<Vec<_>>()
            .join("\n")),
        structured => render_structured(structured, reports),
    }
}

fn report_table(sourced: &Sourced<RunReport>, palette: Palette) -> String {
    let report = &sourced.item;
    let mut out = device_heading(&sourced.source, &report.plan.device, palette);

    if !report.outcomes.is_empty() {
        let rows: Vec<OutcomeRow> = report.outcomes.iter().map(OutcomeRow::from).collect();
        let _ = writeln!(out, "{}", render_table(&rows));
    }
    let failed = report.failures().count();
    let summary = format!(
        "{} written, {failed} failed, {} in sync",
        report.written(),
        report.plan.in_sync.len()
    );
    let summary = if report.is_clean() {
        palette.good(&summary)
    } else {
        palette.bad(&summary)
    };
    let _ = writeln!(out, "{summary}");
    if !report.failed_tags.is_empty() {
        let _ = writeln!(
            out,
            "{}",
            palette.bad(&format!("tags refused: {}", report.failed_tags.join(", ")))
        );
    }
    push_tags(&mut out, &report.plan.tags, palette);
    push_notices(&mut out, &report.plan.notices, palette);
    out
}

// ── Detection ────────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct DetectRow {
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Manufacturer")]
    manufacturer: String,
    #[tabled(rename = "Model")]
    product_class: String,
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Vendor")]
    vendor: String,
    #[tabled(rename = "Schema")]
    schema: String,
}

pub fn detect_row(s: &Sourced<DeviceContext>) -> DetectRow {
    let ctx = &s.item;
    DetectRow {
        source: s.source.clone(),
        manufacturer: ctx.identity.manufacturer.clone(),
        product_class: ctx.identity.product_class.clone(),
        serial: ctx.identity.serial.clone(),
        vendor: ctx.vendor_name().into(),
        schema: ctx.schema.to_string(),
    }
}

pub fn detect_line(s: &Sourced<DeviceContext>) -> String {
    format!("{}\t{}\t{}", s.source, s.item.vendor_name(), s.item.schema)
}

// ── Capability reads ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CapabilityValue {
    pub capability: String,
    pub value: Option<String>,
}

#[derive(Tabled)]
pub struct CapabilityRow {
    #[tabled(rename = "Capability")]
    capability: String,
    #[tabled(rename = "Value")]
    value: String,
}

pub fn capability_row(c: &CapabilityValue) -> CapabilityRow {
    CapabilityRow {
        capability: c.capability.clone(),
        value: c.value.clone().unwrap_or_else(|| "-".into()),
    }
}

pub fn capability_line(c: &CapabilityValue) -> String {
    c.value.clone().unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ontctl_api::ParamValue;
    use ontctl_core::{CapabilityKey, DeviceIdentity, SchemaGeneration, VendorTag};

    fn plan() -> Sourced<ReconciliationPlan> {
        let device = DeviceContext::new(
            DeviceIdentity {
                manufacturer: "Huawei Technologies Co., Ltd".into(),
                product_class: "HG8245H".into(),
                serial: "4857544300000001".into(),
            },
            Some(VendorTag::Huawei),
            SchemaGeneration::Legacy,
        );
        let mut plan = ReconciliationPlan::new(device);
        plan.directives.push(WriteDirective {
            capability: CapabilityKey::new("wifi.band.2.4.password"),
            path: "InternetGatewayDevice.LANDevice.1.WLANConfiguration.1.KeyPassphrase".into(),
            value: ParamValue::secret("hunter22"),
            current: None,
            existed_before: true,
            instance: None,
        });
        plan.tags.push(Tag::new("huawei", true));
        plan.tags.push(Tag::new("schema_unified", false));
        Sourced {
            source: "hg8245h.json".into(),
            item: plan,
        }
    }

    #[test]
    fn secrets_never_reach_any_format() {
        let plans = [plan()];
        let off = Palette { enabled: false };
        for format in [
            OutputFormat::Table,
            OutputFormat::Json,
            OutputFormat::JsonCompact,
            OutputFormat::Yaml,
            OutputFormat::Plain,
        ] {
            let text = render_plans(format, &plans, off).unwrap();
            assert!(!text.contains("hunter22"), "{format:?} leaked a secret");
        }
    }

    #[test]
    fn table_lists_tags_and_heading() {
        let text = render_plans(OutputFormat::Table, &[plan()], Palette { enabled: false }).unwrap();
        assert!(text.contains("── hg8245h.json"));
        assert!(text.contains("huawei / legacy"));
        assert!(text.contains("tags: huawei"));
        assert!(text.contains("cleared: schema_unified"));
    }

    #[test]
    fn json_carries_source_alongside_plan() {
        let text = render_plans(OutputFormat::Json, &[plan()], Palette { enabled: false }).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[0]["source"], "hg8245h.json");
        assert_eq!(parsed[0]["device"]["vendor"], "huawei");
    }
}
