//! Printable report content for one dataset.
//!
//! Produces ordered lines only. Page size, fonts and positions belong to
//! whatever renders the document.

use serde::{Deserialize, Serialize};

use crate::model::{Parameter, SummaryRecord};

pub const UNDEFINED_VALUE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Title,
    Field,
    Heading,
    Entry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLine {
    pub kind: LineKind,
    pub label: String,
    pub value: Option<String>,
    pub indent: u8,
}

impl ReportLine {
    fn new(kind: LineKind, label: impl Into<String>, value: Option<String>, indent: u8) -> Self {
        Self {
            kind,
            label: label.into(),
            value,
            indent,
        }
    }

    pub fn text(&self) -> String {
        match &self.value {
            Some(v) => format!("{}: {}", self.label, v),
            None => self.label.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub dataset_name: String,
    pub lines: Vec<ReportLine>,
}

impl ReportDocument {
    /// File name the rendered document is attached under.
    pub fn attachment_name(&self) -> String {
        format!("report_{}.pdf", self.dataset_name)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            for _ in 0..line.indent {
                out.push_str("  ");
            }
            out.push_str(&line.text());
            out.push('\n');
        }
        out
    }

    pub fn entries(&self) -> impl Iterator<Item = &ReportLine> {
        self.lines.iter().filter(|l| l.kind == LineKind::Entry)
    }
}

fn two_decimals(v: Option<f64>) -> String {
    match v {
        Some(x) => format!("{:.2}", x),
        None => UNDEFINED_VALUE.to_string(),
    }
}

fn average_label(param: Parameter) -> &'static str {
    match param {
        Parameter::Flowrate => "Average Flowrate",
        Parameter::Pressure => "Average Pressure",
        Parameter::Temperature => "Average Temperature",
    }
}

pub fn compose(dataset_name: &str, summary: &SummaryRecord) -> ReportDocument {
    let mut lines = vec![
        ReportLine::new(LineKind::Title, format!("Equipment Analysis Report - {}", dataset_name), None, 0),
        ReportLine::new(LineKind::Field, "Total Equipment", Some(summary.total_count.to_string()), 0),
    ];
    for param in Parameter::ALL {
        lines.push(ReportLine::new(
            LineKind::Field,
            average_label(param),
            Some(two_decimals(summary.average(param))),
            0,
        ));
    }
    lines.push(ReportLine::new(LineKind::Heading, "Equipment Type Distribution:", None, 0));
    for (label, count) in summary.type_distribution.iter() {
        lines.push(ReportLine::new(LineKind::Entry, label, Some(count.to_string()), 1));
    }

    ReportDocument {
        dataset_name: dataset_name.to_string(),
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EquipmentRecord, EquipmentTable};
    use crate::summary::summarize;

    #[test]
    fn test_line_order_and_formatting() {
        let table = EquipmentTable::new(vec![
            EquipmentRecord::new("Pump-1", "Pump", 10.0, 2.0, 25.0),
            EquipmentRecord::new("Valve-1", "Valve", 5.0, 1.0, 20.0),
            EquipmentRecord::new("Pump-2", "Pump", 1.0, 1.0 / 3.0, 20.0),
        ]);
        let doc = compose("plant.csv", &summarize(&table));
        let text: Vec<String> = doc.lines.iter().map(|l| l.text()).collect();
        assert_eq!(
            text,
            vec![
                "Equipment Analysis Report - plant.csv",
                "Total Equipment: 3",
                "Average Flowrate: 5.33",
                "Average Pressure: 1.11",
                "Average Temperature: 21.67",
                "Equipment Type Distribution:",
                "Pump: 2",
                "Valve: 1",
            ]
        );
        assert_eq!(doc.entries().count(), 2);
        assert_eq!(doc.attachment_name(), "report_plant.csv.pdf");
    }

    #[test]
    fn test_empty_summary_still_composes() {
        let doc = compose("empty.csv", &summarize(&EquipmentTable::default()));
        assert_eq!(doc.lines.len(), 6);
        assert_eq!(doc.lines[1].value.as_deref(), Some("0"));
        assert_eq!(doc.lines[2].value.as_deref(), Some(UNDEFINED_VALUE));
        assert_eq!(doc.entries().count(), 0);
    }

    #[test]
    fn test_render_text_indents_entries() {
        let table = EquipmentTable::new(vec![EquipmentRecord::new("P", "Pump", 1.0, 1.0, 1.0)]);
        let text = compose("x", &summarize(&table)).render_text();
        assert!(text.ends_with("Equipment Type Distribution:\n  Pump: 1\n"));
    }
}
