//! Consumers of finished model runs
//!
//! The solver and simulator only produce data. Anything that displays a run
//! implements `VisualizationSink` and receives the final `ModelRun` once.

use std::io::Write;

use tracing::{info, warn};

use crate::error::KyleResult;
use crate::model::ModelRun;

pub trait VisualizationSink {
    fn consume(&mut self, run: &ModelRun) -> KyleResult<()>;
}

/// Writes a human-readable summary through `tracing`
pub struct LogSink {
    /// Rows of the order-flow table; 0 prints every period
    pub max_rows: usize,
}

impl Default for LogSink {
    fn default() -> Self {
        Self { max_rows: 11 }
    }
}

impl LogSink {
    fn row_indices(&self, len: usize) -> Vec<usize> {
        if self.max_rows == 0 || len <= self.max_rows {
            return (0..len).collect();
        }
        let stride = (len - 1) as f64 / (self.max_rows - 1).max(1) as f64;
        let mut rows: Vec<usize> =
            (0..self.max_rows).map(|k| (k as f64 * stride).round() as usize).collect();
        rows.dedup();
        rows
    }
}

impl VisualizationSink for LogSink {
    fn consume(&mut self, run: &ModelRun) -> KyleResult<()> {
        let m = &run.multiperiod;

        info!("📊 Kyle Model Run");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("   V0: {:.4}   V_N: {:.4}", run.parameters.initial_value(), run.terminal_value);
        info!("   MM Price: {:.6}", run.one_period.mm_price);
        info!("   Informed Profit: {:.6}", run.one_period.informed_profit);
        info!(
            "   Iterations: {}   Termination: {:?}   SIGMA_0: {:.6}",
            m.iterations, m.termination, m.sigma_post[0]
        );
        if !m.converged {
            warn!("⚠️  Initial variance target not reached");
        }
        if !m.root_diagnostics.is_empty() {
            warn!("⚠️  {} inadmissible depth root(s) kept", m.root_diagnostics.len());
        }

        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("{:>5} {:>12} {:>12} {:>12} {:>12}", "t", "Informed", "Noise", "LAMBDA", "Price");
        for i in self.row_indices(m.cumulative_informed.len()) {
            info!(
                "{:>5} {:>12.6} {:>12.6} {:>12.6} {:>12.6}",
                i, m.cumulative_informed[i], m.cumulative_noise[i], m.lambda[i], m.price_path[i]
            );
        }
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        Ok(())
    }
}

/// Serializes the whole run as JSON to any writer (stdout in the CLI)
pub struct JsonSink<W: Write> {
    writer: W,
    pretty: bool,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W, pretty: bool) -> Self {
        Self { writer, pretty }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> VisualizationSink for JsonSink<W> {
    fn consume(&mut self, run: &ModelRun) -> KyleResult<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, run)?;
        } else {
            serde_json::to_writer(&mut self.writer, run)?;
        }
        writeln!(self.writer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{KyleModel, ModelConfig};

    fn small_run() -> ModelRun {
        let params = ModelConfig { steps: 5, ..Default::default() }.build().unwrap();
        KyleModel::seeded(params, 9).unwrap().run().unwrap()
    }

    #[test]
    fn test_json_sink_contains_sequences() {
        let run = small_run();
        let mut sink = JsonSink::new(Vec::new(), false);
        sink.consume(&run).unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let value: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert!(value["multiperiod"]["lambda"].is_object());
        assert_eq!(value["multiperiod"]["iterations"], run.multiperiod.iterations);
        assert_eq!(value["seed"], 9);
    }

    #[test]
    fn test_log_sink_row_selection() {
        let sink = LogSink { max_rows: 5 };
        let rows = sink.row_indices(51);
        assert_eq!(rows.first(), Some(&0));
        assert_eq!(rows.last(), Some(&50));
        assert_eq!(rows.len(), 5);

        let all = LogSink { max_rows: 0 };
        assert_eq!(all.row_indices(4), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_log_sink_consumes() {
        let run = small_run();
        LogSink::default().consume(&run).unwrap();
    }
}
