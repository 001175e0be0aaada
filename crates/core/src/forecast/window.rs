use crate::domain::sales::{DailySeries, WindowSample};
use crate::errors::DomainError;

/// Slices a daily series into consecutive `window_size` inputs and next-day labels.
///
/// Samples keep series order. A series no longer than the window cannot produce a
/// single sample and is reported as insufficient data.
pub fn build_windows(
    series: &DailySeries,
    window_size: usize,
) -> Result<Vec<WindowSample>, DomainError> {
    if window_size == 0 {
        return Err(DomainError::invalid("window_size", "must be greater than zero"));
    }
    if series.len() <= window_size {
        return Err(DomainError::InsufficientData {
            required: window_size + 1,
            available: series.len(),
        });
    }

    let quantities = series.quantities();
    let samples = quantities
        .windows(window_size + 1)
        .map(|slice| WindowSample {
            features: slice[..window_size].to_vec(),
            label: slice[window_size],
        })
        .collect();

    Ok(samples)
}
