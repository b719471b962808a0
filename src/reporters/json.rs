//! JSON reporter
//!
//! Outputs reports, edit lists and profiles as pretty-printed JSON.
//! Useful for machine consumption, piping to jq, or further processing.

use anyhow::Result;
use serde::Serialize;

/// Render any serializable result as JSON
pub fn render<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::test_report;

    #[test]
    fn test_json_render_valid() {
        let report = test_report();
        let json_str = render(&report).expect("render JSON");
        let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("parse JSON");
        assert_eq!(parsed["marker"], 2.0);
        assert_eq!(parsed["outliers"]["anon"]["Hot page"], 2.5);
        assert_eq!(parsed["flagged_accounts"]["192.0.2.1"][0], "Hot page");
        assert_eq!(parsed["table"]["rows"]["Calm page"]["anon"], -0.3);
    }

    #[test]
    fn test_json_report_roundtrips() {
        let report = test_report();
        let json_str = render(&report).expect("render JSON");
        let back: crate::pipeline::AnalysisReport =
            serde_json::from_str(&json_str).expect("parse report");
        assert_eq!(back.sets, report.sets);
        assert_eq!(back.flagged_accounts, report.flagged_accounts);
    }
}
