/// Upper edge of the histogram, samples beyond it are not binned
pub const HISTOGRAM_HOURS: usize = 71;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Summary {
    pub mean: f64,
    pub stdev: f64,
    pub total: f64,
    pub max: f64,
    pub min: f64,
}

/// Population statistics of `samples`, all zero for an empty slice
pub fn summarize(samples: &[f64]) -> Summary {
    if samples.is_empty() {
        return Summary::default();
    }

    let count = samples.len() as f64;
    let total: f64 = samples.iter().sum();
    let mean = total / count;
    let variance = samples
        .iter()
        .map(|sample| (sample - mean).powi(2))
        .sum::<f64>()
        / count;

    Summary {
        mean,
        stdev: variance.sqrt(),
        total,
        max: samples.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        min: samples.iter().copied().fold(f64::INFINITY, f64::min),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bucket {
    /// centre of the one hour wide bucket
    pub centre: f64,
    pub count: usize,
}

/// One hour buckets from 0 up to the last non-empty one.
/// The final bucket `[70, 71]` is closed on both ends.
pub fn histogram(samples: &[f64]) -> Vec<Bucket> {
    let mut counts = [0usize; HISTOGRAM_HOURS];

    for sample in samples {
        if !(0.0..=HISTOGRAM_HOURS as f64).contains(sample) {
            continue;
        }

        let index = (sample.floor() as usize).min(HISTOGRAM_HOURS - 1);
        counts[index] += 1;
    }

    let used = counts
        .iter()
        .rposition(|count| *count != 0)
        .map_or(0, |last| last + 1);

    counts[..used]
        .iter()
        .enumerate()
        .map(|(index, count)| Bucket {
            centre: index as f64 + 0.5,
            count: *count,
        })
        .collect()
}
