use dbdiag_shared::AppError;

/// Threshold for determining if L2 normalization is needed.
const L2_NORM_TOLERANCE: f32 = 1e-6;

/// Process embedding vector to ensure it's L2 normalized with exactly
/// `target_dim` dimensions.
///
/// - If dim > target: truncate and L2 normalize
/// - If dim == target: check if already L2 normalized, normalize if not
/// - If dim < target: return error
pub fn process_embedding(mut vec: Vec<f32>, target_dim: usize) -> Result<Vec<f32>, AppError> {
  match vec.len() {
    d if d > target_dim => {
      vec.truncate(target_dim);
      l2_normalize(&mut vec);
      Ok(vec)
    }
    d if d == target_dim => {
      let norm_sq: f32 = vec.iter().map(|x| x * x).sum();
      if (norm_sq - 1.0).abs() > L2_NORM_TOLERANCE {
        l2_normalize(&mut vec);
      }
      Ok(vec)
    }
    d => Err(AppError::new(anyhow::anyhow!(
      "embedding dimension {} is less than required {}",
      d,
      target_dim
    ))),
  }
}

/// L2 normalize a vector in-place.
fn l2_normalize(vec: &mut [f32]) {
  let norm_sq: f32 = vec.iter().map(|x| x * x).sum();
  let norm = norm_sq.sqrt();
  if norm > 1e-12 {
    for x in vec.iter_mut() {
      *x /= norm;
    }
  }
}
