//! Console summary of the analysis run

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::pipeline::{
    BootstrapSummary, CleaningReport, PremiumGapTest, PremiumSummary, SegmentAnalysis,
    ValidationReport,
};

/// Everything the end-of-run console report needs.
pub struct AnalysisSummary<'a> {
    pub cleaning: &'a CleaningReport,
    pub premiums: &'a [PremiumSummary],
    pub gap_test: &'a PremiumGapTest,
    pub gap_bootstrap: &'a BootstrapSummary,
    pub segments: &'a SegmentAnalysis,
    pub validation: &'a ValidationReport,
}

impl AnalysisSummary<'_> {
    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("PREMIUM SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![
            Cell::new("🧹 Listings analyzed"),
            Cell::new(self.cleaning.rows_out),
        ]);
        table.add_row(vec![
            Cell::new("🗑️  Rows dropped"),
            Cell::new(self.cleaning.rows_in - self.cleaning.rows_out),
        ]);

        for premium in self.premiums {
            let value = match premium.premium_pct {
                Some(pct) => format!("{:+.1}%", pct),
                None => "undefined".to_string(),
            };
            let color = match premium.premium_pct {
                Some(pct) if pct > 0.0 => Color::Green,
                Some(_) => Color::Red,
                None => Color::White,
            };
            table.add_row(vec![
                Cell::new(format!("🏠 Premium ({})", premium.room.display())),
                Cell::new(value).fg(color).add_attribute(Attribute::Bold),
            ]);
        }

        table.add_row(vec![
            Cell::new("↔️  Premium gap (private - entire)"),
            Cell::new(format!("{:+.1} pp", self.gap_test.gap_pp))
                .fg(Color::Cyan)
                .add_attribute(Attribute::Bold),
        ]);
        table.add_row(vec![
            Cell::new("📏 Bootstrap 95% CI"),
            Cell::new(format!(
                "[{:+.1}, {:+.1}] pp",
                self.gap_bootstrap.ci_lower, self.gap_bootstrap.ci_upper
            )),
        ]);

        if let Some(test) = &self.gap_test.test {
            let significant = test.p_value < 0.05;
            table.add_row(vec![
                Cell::new("🧪 Gap p-value (Welch)"),
                Cell::new(format!("{:.2e}", test.p_value)).fg(if significant {
                    Color::Green
                } else {
                    Color::Yellow
                }),
            ]);
        }

        if let Some(best) = self
            .validation
            .models
            .iter()
            .min_by(|a, b| a.test.rmse.total_cmp(&b.test.rmse))
        {
            table.add_row(vec![
                Cell::new("🎯 Best hold-out model"),
                Cell::new(format!("{} (RMSE {:.1})", best.name, best.test.rmse)),
            ]);
        }

        // Indent the table
        for line in table.to_string().lines() {
            println!("    {}", line);
        }

        self.display_segments();
    }

    fn display_segments(&self) {
        println!();
        println!(
            "    {} {}",
            style("📊").cyan(),
            style("PREMIUM BY PRICE SEGMENT").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Room").add_attribute(Attribute::Bold),
            Cell::new("Segment").add_attribute(Attribute::Bold),
            Cell::new("Premium").add_attribute(Attribute::Bold),
            Cell::new("n (super/reg)").add_attribute(Attribute::Bold),
        ]);

        for cell in &self.segments.cells {
            let premium = match cell.premium_pct {
                Some(pct) => format!("{:+.1}%", pct),
                None => "undefined".to_string(),
            };
            let marker = if cell.adequate_sample { "" } else { " *" };
            table.add_row(vec![
                Cell::new(cell.room.display()),
                Cell::new(cell.segment.label()),
                Cell::new(format!("{}{}", premium, marker)),
                Cell::new(format!("{}/{}", cell.superhost_n, cell.regular_n)),
            ]);
        }

        for line in table.to_string().lines() {
            println!("    {}", line);
        }
        if self.segments.cells.iter().any(|c| !c.adequate_sample) {
            println!(
                "      {}",
                style("* cell below the adequate-sample threshold").dim()
            );
        }
    }
}
