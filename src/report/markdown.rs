use crate::report::ReportSection;
use crate::LoadSuiteError;
use num_format::{Locale, ToFormattedString};
use std::io::Write;

/// Text used in place of the metrics table when no metrics could be computed.
pub(crate) const METRICS_UNAVAILABLE: &str = "Performance metrics could not be calculated.";

/// Resource usage tables left for manual fill-in after a run.
const DETAILED_PLACEHOLDERS: &str = r#"
### CPU Usage
| Server | Min  | Max  | Mean |
| ------ | ---- | ---- | ---- |
| int-1  | FILL | FILL | FILL |
| int-2  | FILL | FILL | FILL |

### Memory Usage
| Server | Last | Mean |
| ------ | ---- | ---- |
| int-1  | FILL | FILL |
| int-2  | FILL | FILL |

### Disk I/O
| Metric                        | Value     |
| ----------------------------- | --------- |
| `integration1-vm.sdb` Read Time  | FILL ms   |
| `integration2-vm.sdb` Read Time  | FILL µs   |
| `integration1-vm.sdb` Read Bytes | FILL kB/s |
| `integration2-vm.sdb` Read Bytes | FILL kB/s |
"#;

struct Markdown<'s, 'w, W: Write> {
    w: &'w mut W,
    section: &'s ReportSection<'s>,
}

/// Write one test's section of the run report.
pub fn write_report_section<W: Write>(
    w: &mut W,
    section: &ReportSection,
) -> Result<(), LoadSuiteError> {
    Markdown { w, section }.write()
}

/// Write the header of a new run report.
pub(crate) fn write_report_header<W: Write>(
    w: &mut W,
    suite_name: &str,
    date: &str,
    template: &str,
) -> Result<(), LoadSuiteError> {
    write!(
        w,
        r#"# Test Suite Report: {suite_name}

**Date:** {date}

This report contains the results of all executed tests.

---

{template}
---
"#
    )?;

    Ok(())
}

impl<W: Write> Markdown<'_, '_, W> {
    pub fn write(mut self) -> Result<(), LoadSuiteError> {
        self.write_title()?;
        self.write_metrics()?;
        self.write_chart()?;
        self.write_detailed()?;
        self.write_monitoring_links()?;

        Ok(())
    }

    fn write_title(&mut self) -> Result<(), LoadSuiteError> {
        write!(
            self.w,
            r#"
## Test Results: {}
"#,
            self.section.test_name
        )?;

        Ok(())
    }

    fn write_metrics(&mut self) -> Result<(), LoadSuiteError> {
        writeln!(self.w, "\n### Performance Metrics")?;

        let Some(summary) = self.section.summary else {
            writeln!(self.w, "{}", METRICS_UNAVAILABLE)?;
            return Ok(());
        };

        write!(
            self.w,
            r#"| Metric                | Value |
| --------------------- | ----: |
| Requests              | {requests} |
| Mean Request Duration | {mean:.2} ms |
| 90th Percentile       | {p90:.2} ms |
| 95th Percentile       | {p95:.2} ms |
"#,
            requests = summary.count.to_formatted_string(&Locale::en),
            mean = summary.mean,
            p90 = summary.p90,
            p95 = summary.p95,
        )?;

        Ok(())
    }

    fn write_chart(&mut self) -> Result<(), LoadSuiteError> {
        writeln!(
            self.w,
            "\n![Performance Graph](./{})",
            self.section.chart_file
        )?;

        Ok(())
    }

    fn write_detailed(&mut self) -> Result<(), LoadSuiteError> {
        if self.section.detailed {
            write!(self.w, "{}", DETAILED_PLACEHOLDERS)?;
        }

        Ok(())
    }

    fn write_monitoring_links(&mut self) -> Result<(), LoadSuiteError> {
        write!(
            self.w,
            r#"
### Monitoring Links
- [View in dashboard]({dashboard})
- [View in trace explorer]({traces})

---
"#,
            dashboard = self.section.links.dashboard_link(&self.section.window),
            traces = self.section.links.trace_link(&self.section.window),
        )?;

        Ok(())
    }
}
