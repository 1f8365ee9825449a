//! CSV and JSON export of run results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::runner::PolicyResults;
use crate::sim::accounting::{LoadSample, PerformanceReport};
use crate::sim::policy::Policy;
use crate::sim::types::CABLE_COUNT;
use crate::stats::Metric;

fn observation_header() -> Vec<&'static str> {
    let mut header = vec!["policy", "run", "steady_cycle_day"];
    header.extend(Metric::ALL.iter().map(|m| m.key()));
    header
}

/// Exports per-run observations of every policy to a CSV file.
///
/// Writes a header row followed by one row per run, policies in batch order.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(results: &[PolicyResults], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(results, buf)
}

/// Writes per-run observations as CSV to any writer.
///
/// Runs that never reached a steady cycle leave `steady_cycle_day` empty.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(results: &[PolicyResults], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(observation_header())?;

    for batch in results {
        for (run, outcome) in batch.outcomes.iter().enumerate() {
            let report = &outcome.report;
            let mut record = vec![
                batch.policy.to_string(),
                run.to_string(),
                report
                    .steady_cycle_day
                    .map_or_else(String::new, |d| d.to_string()),
            ];
            record.extend(Metric::ALL.iter().map(|m| format!("{:.6}", m.of(report))));
            wtr.write_record(&record)?;
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Exports a cable load trace to a CSV file.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_trace_csv(trace: &[LoadSample], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_trace_csv(trace, io::BufWriter::new(file))
}

/// Writes a cable load trace (time, one column per cable, transformer) as CSV.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_trace_csv(trace: &[LoadSample], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    let mut header = vec!["time".to_string()];
    header.extend((0..CABLE_COUNT).map(|c| format!("cable_{c}")));
    header.push("transformer".to_string());
    wtr.write_record(&header)?;

    for sample in trace {
        let mut record = Vec::with_capacity(CABLE_COUNT + 2);
        record.push(format!("{:.4}", sample.time));
        record.extend(sample.cables.iter().map(|kw| format!("{kw:.2}")));
        record.push(format!("{:.2}", sample.transformer));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct RunRecord<'a> {
    policy: Policy,
    run: usize,
    end_time: f64,
    events_processed: u64,
    report: &'a PerformanceReport,
}

/// Exports every run report as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns an `io::Error` if file creation, serialization or writing fails.
pub fn export_json(results: &[PolicyResults], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_json(results, io::BufWriter::new(file))
}

/// Writes every run report as a JSON array to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if serialization or writing fails.
pub fn write_json(results: &[PolicyResults], mut writer: impl Write) -> io::Result<()> {
    let records: Vec<RunRecord<'_>> = results
        .iter()
        .flat_map(|batch| {
            batch
                .outcomes
                .iter()
                .enumerate()
                .map(|(run, o)| RunRecord {
                    policy: batch.policy,
                    run,
                    end_time: o.end_time,
                    events_processed: o.events_processed,
                    report: &o.report,
                })
        })
        .collect();
    serde_json::to_writer_pretty(&mut writer, &records)?;
    writer.write_all(b"\n")?;
    writer.flush()
}
