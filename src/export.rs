use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};
use serde::{Deserialize, Serialize};

use crate::error::QuinielaError;
use crate::model::{Match, Outcome, Ticket, TicketKind};
use crate::pipeline::PortfolioRun;

const RECORD_VERSION: u32 = 1;

/// Structured export: generation metadata plus the full run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioRecord {
    pub version: u32,
    pub generated_at: String,
    pub generator: String,
    pub run: PortfolioRun,
}

impl PortfolioRecord {
    pub fn new(run: PortfolioRun) -> Self {
        Self {
            version: RECORD_VERSION,
            generated_at: chrono::Utc::now().to_rfc3339(),
            generator: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            run,
        }
    }
}

// ---- tickets table ----

fn ticket_rows(tickets: &[Ticket]) -> Vec<Vec<String>> {
    let slots = tickets.first().map(|t| t.outcomes.len()).unwrap_or(14);
    let mut header = vec!["id".to_string(), "kind".to_string()];
    header.extend((1..=slots).map(|i| format!("P{i}")));
    header.push("draws".to_string());
    header.push("hit_pct".to_string());

    let mut rows = vec![header];
    for t in tickets {
        let mut row = vec![t.id.to_string(), t.kind.label().to_string()];
        row.extend(t.outcomes.iter().map(|o| o.symbol().to_string()));
        row.push(t.draw_count.to_string());
        row.push(format!("{}", t.hit_probability * 100.0));
        rows.push(row);
    }
    rows
}

pub fn tickets_table(tickets: &[Ticket]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in ticket_rows(tickets) {
        writer.write_record(&row).context("write ticket row")?;
    }
    let bytes = writer.into_inner().context("flush tickets table")?;
    String::from_utf8(bytes).context("tickets table is not utf-8")
}

pub fn parse_tickets_table(raw: &str) -> Result<Vec<Ticket>, QuinielaError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());
    let columns = reader.headers().map_err(csv_err)?.len();
    if columns == 0 {
        return Ok(Vec::new());
    }
    if columns < 5 {
        return Err(parse_err(1, "header has too few columns"));
    }
    let slots = columns - 4;

    let mut tickets = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let line_no = record_line(&record);
        let cell = |col: usize| record.get(col).unwrap_or_default();
        let id = cell(0)
            .parse::<usize>()
            .map_err(|_| parse_err(line_no, format!("bad id `{}`", cell(0))))?;
        let kind = TicketKind::from_label(cell(1))
            .ok_or_else(|| parse_err(line_no, format!("bad kind `{}`", cell(1))))?;
        let outcomes = (2..2 + slots)
            .map(|col| {
                Outcome::from_symbol(cell(col))
                    .ok_or_else(|| parse_err(line_no, format!("bad outcome `{}`", cell(col))))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let draws = cell(2 + slots)
            .parse::<usize>()
            .map_err(|_| parse_err(line_no, "bad draw count"))?;
        let hit_pct = cell(3 + slots)
            .parse::<f64>()
            .map_err(|_| parse_err(line_no, "bad hit percentage"))?;

        let mut ticket = Ticket::new(id, kind, outcomes);
        if ticket.draw_count != draws {
            return Err(parse_err(
                line_no,
                format!("draw count {draws} does not match picks ({})", ticket.draw_count),
            ));
        }
        ticket.hit_probability = hit_pct / 100.0;
        tickets.push(ticket);
    }
    Ok(tickets)
}

pub fn write_tickets_table(path: &Path, tickets: &[Ticket]) -> Result<()> {
    write_atomic(path, &tickets_table(tickets)?)
}

// ---- match input ----

/// Positional match row; the trailing context columns are optional.
#[derive(Debug, Deserialize)]
struct MatchRow {
    local: String,
    visitor: String,
    p_local: f64,
    p_draw: f64,
    p_visitor: f64,
    #[serde(default)]
    form_diff: Option<i32>,
    #[serde(default)]
    injury_impact: Option<i32>,
    #[serde(default)]
    is_decider: Option<String>,
}

impl From<MatchRow> for Match {
    fn from(row: MatchRow) -> Self {
        let mut m = Match::new(&row.local, &row.visitor, row.p_local, row.p_draw, row.p_visitor);
        m.form_diff = row.form_diff.unwrap_or(0);
        m.injury_impact = row.injury_impact.unwrap_or(0);
        m.is_decider = matches!(
            row.is_decider.map(|c| c.to_ascii_lowercase()).as_deref(),
            Some("true" | "1" | "yes")
        );
        m
    }
}

/// Matches from a JSON array or a CSV table
/// (`local,visitor,p_local,p_draw,p_visitor[,form_diff,injury_impact,is_decider]`).
pub fn read_matches(path: &Path) -> Result<Vec<Match>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading matches from {}", path.display()))?;
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        serde_json::from_str(&raw).context("parse matches json")
    } else {
        Ok(parse_matches_table(&raw)?)
    }
}

pub fn parse_matches_table(raw: &str) -> Result<Vec<Match>, QuinielaError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());

    let mut out = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        // Header row.
        if record.get(0).is_some_and(|c| c.eq_ignore_ascii_case("local")) {
            continue;
        }
        let line_no = record_line(&record);
        if record.len() < 5 {
            return Err(parse_err(line_no, "expected at least 5 columns"));
        }
        let row: MatchRow = record
            .deserialize(None)
            .map_err(|err| parse_err(line_no, csv_reason(&err)))?;
        out.push(row.into());
    }
    Ok(out)
}

fn record_line(record: &csv::StringRecord) -> usize {
    record.position().map(|p| p.line() as usize).unwrap_or(0)
}

fn csv_reason(err: &csv::Error) -> String {
    match err.kind() {
        csv::ErrorKind::Deserialize { err, .. } => match err.field() {
            Some(field) => format!("column {}: {}", field + 1, err.kind()),
            None => err.kind().to_string(),
        },
        _ => err.to_string(),
    }
}

fn csv_err(err: csv::Error) -> QuinielaError {
    let line = err.position().map(|p| p.line() as usize).unwrap_or(0);
    parse_err(line, csv_reason(&err))
}

// ---- json record ----

pub fn write_record(path: &Path, record: &PortfolioRecord) -> Result<()> {
    let json = serde_json::to_string_pretty(record).context("serialize portfolio record")?;
    write_atomic(path, &json)
}

pub fn read_record(path: &Path) -> Result<PortfolioRecord> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading record {}", path.display()))?;
    let record: PortfolioRecord = serde_json::from_str(&raw).context("parse portfolio record")?;
    if record.version != RECORD_VERSION {
        anyhow::bail!(
            "unsupported record version {} (expected {RECORD_VERSION})",
            record.version
        );
    }
    Ok(record)
}

// ---- workbook ----

pub fn write_workbook(path: &Path, run: &PortfolioRun) -> Result<()> {
    let ticket_rows = ticket_rows(&run.tickets);

    let mut match_rows = vec![vec![
        "Slot".to_string(),
        "Local".to_string(),
        "Visitor".to_string(),
        "P Local".to_string(),
        "P Draw".to_string(),
        "P Visitor".to_string(),
        "Category".to_string(),
        "Suggested".to_string(),
        "Confidence".to_string(),
    ]];
    for (idx, m) in run.matches.iter().enumerate() {
        match_rows.push(vec![
            (idx + 1).to_string(),
            m.raw.local.clone(),
            m.raw.visitor.clone(),
            format!("{:.3}", m.probs.home),
            format!("{:.3}", m.probs.draw),
            format!("{:.3}", m.probs.away),
            format!("{:?}", m.category),
            m.suggested.symbol().to_string(),
            format!("{:.3}", m.confidence),
        ]);
    }

    let metrics = &run.report.metrics;
    let mut report_rows = vec![
        vec!["Valid".to_string(), run.report.is_valid.to_string()],
        vec![
            "Portfolio Pr[>=min hits]".to_string(),
            format!("{:.4}", metrics.portfolio_hit_probability),
        ],
        vec![
            "Joint Pr[>=min hits]".to_string(),
            opt_to_string(metrics.joint_hit_probability.map(|p| format!("{p:.4}"))),
        ],
        vec!["Mean ticket Pr".to_string(), format!("{:.4}", metrics.hit_mean)],
        vec!["Mean draws".to_string(), format!("{:.2}", metrics.draw_mean)],
        vec!["Total cost".to_string(), format!("{:.2}", metrics.total_cost)],
        vec!["Efficiency".to_string(), format!("{:.4}", metrics.efficiency)],
    ];
    report_rows.extend(
        run.report
            .errors
            .iter()
            .map(|e| vec!["Error".to_string(), e.clone()]),
    );
    report_rows.extend(
        run.report
            .warnings
            .iter()
            .map(|w| vec!["Warning".to_string(), w.clone()]),
    );

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Tickets")?;
        write_rows(sheet, &ticket_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Matches")?;
        write_rows(sheet, &match_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Report")?;
        write_rows(sheet, &report_rows)?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(())
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

fn opt_to_string<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create output dir {}", parent.display()))?;
    }
    let tmp = match path.extension() {
        Some(ext) => path.with_extension(format!("{}.tmp", ext.to_string_lossy())),
        None => path.with_extension("tmp"),
    };
    fs::write(&tmp, contents).with_context(|| format!("write {}", tmp.display()))?;
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(err).with_context(|| format!("swap {}", path.display()));
    }
    Ok(())
}

fn parse_err(line: usize, reason: impl Into<String>) -> QuinielaError {
    QuinielaError::Parse {
        line,
        reason: reason.into(),
    }
}
