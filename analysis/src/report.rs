use crate::{
    stats::{histogram, summarize, Bucket},
    timing::TimeInfo,
};
use std::{
    io::{self, Write},
    path::{Component, Path},
};

const HOURS: &str = " hrs";
const SEPARATOR: &str = "=================================";
const HISTOGRAM_WIDTH: usize = 50;

/// Short run label of a log directory such as `/results/results_june-JUNE/log`
pub fn directory_label(directory: &Path) -> String {
    let parent = directory
        .components()
        .filter(|component| matches!(component, Component::Normal(_)))
        .rev()
        .nth(1)
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .unwrap_or_else(|| directory.to_string_lossy().into_owned());

    let label = parent.replace("results_", "");

    match label.split_once(".run-") {
        Some((label, _)) => label.to_string(),
        None => label,
    }
}

pub fn write_short_header<W: Write>(out: &mut W) -> io::Result<()> {
    let header = format!(
        "{:55} {:17}      {:17}",
        "Runcard", "Average time", "Total time"
    );

    writeln!(out, "{header}")?;
    writeln!(out, "{}", "=".repeat(header.len()))
}

/// One line: label, mean +/- stdev, total and number of samples
pub fn write_short<W: Write>(out: &mut W, directory: &Path, info: &TimeInfo) -> io::Result<()> {
    let summary = summarize(&info.samples);

    writeln!(
        out,
        "{:55} {:<5.2} +/- {:<5.2} {HOURS}   {:<5.2} {HOURS} [{} runs]",
        directory_label(directory),
        summary.mean,
        summary.stdev,
        summary.total,
        info.samples.len()
    )
}

pub fn write_full<W: Write>(
    out: &mut W,
    directory: &Path,
    info: &TimeInfo,
    with_histogram: bool,
) -> io::Result<()> {
    let summary = summarize(&info.samples);

    writeln!(out, "Input directory:    {}", directory.display())?;
    writeln!(out, "{SEPARATOR}")?;
    writeln!(out, "Total time:         {:<8.1} {HOURS}", summary.total)?;
    writeln!(out, "Total no. runs:     {:<8}", info.total)?;
    writeln!(out, "No. +ve time runs:  {:<8}", info.samples.len())?;
    writeln!(out, "No. skipped runs:   {:<8}", info.skipped)?;
    writeln!(out, "---------------------------------")?;
    writeln!(out, "Longest Run:        {:<8.4} {HOURS}", summary.max)?;
    writeln!(out, "Shortest run:       {:<8.4} {HOURS}", summary.min)?;
    writeln!(out, "Mean time:          {:<8.4} {HOURS}", summary.mean)?;
    writeln!(out, "Standard Deviation: {:<8.4} {HOURS}", summary.stdev)?;
    writeln!(out, "{SEPARATOR}")?;

    if with_histogram {
        write_histogram(out, &histogram(&info.samples))?;
    }

    Ok(())
}

/// Text bar chart of `buckets`, bars scaled to the fullest bucket
pub fn write_histogram<W: Write>(out: &mut W, buckets: &[Bucket]) -> io::Result<()> {
    writeln!(out, "Run time histogram")?;

    let fullest = buckets.iter().map(|bucket| bucket.count).max().unwrap_or(0);

    if fullest == 0 {
        return writeln!(out, "(no samples)");
    }

    for bucket in buckets {
        let width = (bucket.count * HISTOGRAM_WIDTH + fullest - 1) / fullest;

        writeln!(
            out,
            "{:>6.1} | {:<HISTOGRAM_WIDTH$} {}",
            bucket.centre,
            "#".repeat(width),
            bucket.count
        )?;
    }

    writeln!(out, "No. hours")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render<F: FnOnce(&mut Vec<u8>) -> io::Result<()>>(write: F) -> String {
        let mut buffer = Vec::new();
        write(&mut buffer).unwrap();

        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn labels() {
        assert_eq!(
            directory_label(Path::new("/ResultsRunGrids/results_june-JUNE/log")),
            "june-JUNE"
        );
        assert_eq!(
            directory_label(Path::new("/ResultsRunGrids/LO/Z.LO.run-JUNE/log/")),
            "Z.LO"
        );
        assert_eq!(directory_label(Path::new("log")), "log");
    }

    #[test]
    fn short_report() {
        let info = TimeInfo {
            samples: vec![1.0, 3.0],
            skipped: 1,
            total: 3,
        };
        let output = render(|out| {
            write_short_header(out)?;
            write_short(out, Path::new("/r/results_june-JUNE/log"), &info)
        });
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Runcard"));
        assert_eq!(lines[1].len(), lines[0].len());
        assert!(lines[1].chars().all(|c| c == '='));
        assert_eq!(
            lines[2],
            format!(
                "{:55} 2.00  +/- 1.00   hrs   4.00   hrs [2 runs]",
                "june-JUNE"
            )
        );
    }

    #[test]
    fn full_report_of_empty_directory() {
        let output = render(|out| write_full(out, Path::new("d/log"), &TimeInfo::default(), true));

        assert!(output.contains("Longest Run:        0.0000    hrs"));
        assert!(output.contains("Shortest run:       0.0000    hrs"));
        assert!(output.contains("Total no. runs:     0       "));
        assert!(output.contains("(no samples)"));
    }

    #[test]
    fn histogram_bars() {
        let output = render(|out| {
            write_histogram(
                out,
                &[
                    Bucket { centre: 0.5, count: 4 },
                    Bucket { centre: 1.5, count: 1 },
                ],
            )
        });
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "Run time histogram");
        assert!(lines[1].starts_with("   0.5 | "));
        assert_eq!(lines[1].matches('#').count(), HISTOGRAM_WIDTH);
        assert!(lines[1].ends_with(" 4"));
        assert_eq!(lines[2].matches('#').count(), 13);
        assert_eq!(lines[3], "No. hours");
    }
}
