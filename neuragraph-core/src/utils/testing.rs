use crate::tensor::Tensor;
use crate::types::FloatT;

/// Asserts that `actual` holds `expected_samples` samples whose flattened
/// values match `expected_data` within `tolerance`.
///
/// Panics with the first offending index otherwise.
pub fn check_tensor_near(
    actual: &Tensor,
    expected_samples: usize,
    expected_data: &[FloatT],
    tolerance: FloatT,
) {
    assert_eq!(actual.sample_count(), expected_samples, "Sample count mismatch");
    assert_eq!(
        actual.as_slice().len(),
        expected_data.len(),
        "Data length mismatch"
    );
    for (i, (a, e)) in actual.as_slice().iter().zip(expected_data).enumerate() {
        let diff = (a - e).abs();
        if diff > tolerance {
            panic!(
                "Data mismatch at index {} (sample {}): actual={:?}, expected={:?}, diff={:?}, tolerance={:?}",
                i,
                i / actual.sample_len().max(1),
                a,
                e,
                diff,
                tolerance
            );
        }
    }
}

/// True when every element of `a` and `b` agree within `tolerance`.
pub fn slices_near(a: &[FloatT], b: &[FloatT], tolerance: FloatT) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= tolerance)
}
