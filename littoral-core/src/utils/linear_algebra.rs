//! Small dense solves used by the implicit benthic step.

/// Solve the 2x2 system `a * x = b` by Cramer's rule.
///
/// Returns `None` when the determinant magnitude falls below `tolerance`,
/// leaving the caller to report the singular system with its own context.
pub fn solve2(a: [[f64; 2]; 2], b: [f64; 2], tolerance: f64) -> Option<[f64; 2]> {
    let determinant = a[0][0] * a[1][1] - a[0][1] * a[1][0];
    if determinant.abs() < tolerance {
        return None;
    }
    Some([
        (b[0] * a[1][1] - b[1] * a[0][1]) / determinant,
        (a[0][0] * b[1] - a[1][0] * b[0]) / determinant,
    ])
}
