//! Result export.
//!
//! TSV is meant for pasting into a spreadsheet: one header row, one row per
//! test, settings columns first and metric columns directly after. Failed
//! metrics, including every slot of a timed-out test, are written as `NaN`.

use std::fmt::Write as _;

use super::experiment::{TestResult, TestSettings};

/// Render `results` as tab-separated values.
///
/// With `decimal_comma` every real-valued cell uses `,` as the decimal
/// separator. Metric columns are taken from the first result. An empty
/// slice renders as an empty string.
pub fn results_to_tsv(results: &[TestResult], decimal_comma: bool) -> String {
	let Some(first) = results.first() else {
		return String::new();
	};

	let mut out = String::new();
	let header = TestSettings::KEYS
		.iter()
		.copied()
		.chain(first.metrics.iter().map(|m| m.name.as_str()))
		.map(escape)
		.collect::<Vec<_>>()
		.join("\t");
	out.push_str(&header);
	out.push('\n');

	let real = |value: f64| {
		let text = if value.is_nan() {
			"NaN".to_owned()
		} else {
			value.to_string()
		};
		if decimal_comma {
			text.replace('.', ",")
		} else {
			text
		}
	};

	for result in results {
		let s = &result.settings;
		let mut row = vec![
			real(s.link_strength),
			real(s.charge),
			s.vertex_count.to_string(),
			s.edge_count.to_string(),
			s.graph_iteration.to_string(),
			s.repeat_iteration.to_string(),
		];
		row.extend(
			first
				.metrics
				.iter()
				.map(|column| match result.metric(&column.name) {
					Some(Ok(value)) => real(value),
					_ => "NaN".to_owned(),
				}),
		);
		let _ = writeln!(out, "{}", row.join("\t"));
	}
	out
}

/// Render `results` as a JSON array.
pub fn results_to_json(results: &[TestResult]) -> Result<String, serde_json::Error> {
	serde_json::to_string_pretty(results)
}

fn escape(cell: &str) -> String {
	cell.replace(['\t', '\n', '\r'], " ")
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::research::{MetricError, MetricValue, TestStatus};
	use pretty_assertions::assert_eq;

	fn result(index: usize, crossings: Result<f64, MetricError>, average: f64) -> TestResult {
		TestResult {
			index,
			settings: TestSettings {
				link_strength: 0.5,
				charge: -30.0,
				vertex_count: 4,
				edge_count: 3,
				graph_iteration: 0,
				repeat_iteration: index,
			},
			status: TestStatus::Settled,
			metrics: vec![
				MetricValue {
					name: "edgeCrossings".to_owned(),
					value: crossings,
				},
				MetricValue {
					name: "edgeLengthAverage".to_owned(),
					value: Ok(average),
				},
			],
		}
	}

	#[test]
	fn empty_results_render_nothing() {
		assert_eq!(results_to_tsv(&[], false), "");
	}

	#[test]
	fn tsv_has_header_and_one_row_per_test() {
		let tsv = results_to_tsv(&[result(0, Ok(1.0), 2.5), result(1, Ok(0.0), 3.0)], false);
		assert_eq!(
			tsv,
			"linkStrength\tcharge\tvertexCount\tedgeCount\tgraphIteration\trepeatIteration\tedgeCrossings\tedgeLengthAverage\n\
			 0.5\t-30\t4\t3\t0\t0\t1\t2.5\n\
			 0.5\t-30\t4\t3\t0\t1\t0\t3\n"
		);
	}

	#[test]
	fn decimal_comma_and_failed_metrics() {
		let tsv = results_to_tsv(&[result(0, Err(MetricError::NoEdges), 2.25)], true);
		let row = tsv.lines().nth(1).unwrap();
		assert_eq!(row, "0,5\t-30\t4\t3\t0\t0\tNaN\t2,25");
	}

	#[test]
	fn timed_out_tests_have_no_extra_column() {
		let mut skipped = result(0, Err(MetricError::Unsettled), 0.0);
		skipped.status = TestStatus::TimedOut;
		skipped.metrics[1].value = Err(MetricError::Unsettled);
		let tsv = results_to_tsv(&[skipped], false);
		let mut lines = tsv.lines();
		assert_eq!(lines.next().unwrap().split('\t').count(), 8);
		assert_eq!(lines.next().unwrap(), "0.5\t-30\t4\t3\t0\t0\tNaN\tNaN");
	}

	#[test]
	fn json_keeps_metric_errors() {
		let json = results_to_json(&[result(0, Err(MetricError::Unsettled), 1.0)]).unwrap();
		let value: serde_json::Value = serde_json::from_str(&json).unwrap();
		assert_eq!(value[0]["settings"]["linkStrength"], 0.5);
		assert_eq!(value[0]["metrics"][0]["value"]["Err"], "Unsettled");
		assert_eq!(value[0]["metrics"][1]["value"]["Ok"], 1.0);
		assert_eq!(value[0]["status"], "Settled");
	}
}
