/// In-place L2 normalization helper to keep allocations down during hot paths.
/// Uses f32 throughout for better SIMD auto-vectorization.
pub(crate) fn l2_normalize_in_place(v: &mut [f32]) {
    let norm_sq: f32 = v.iter().map(|x| x * x).sum();
    if norm_sq > 0.0 {
        let inv_norm = norm_sq.sqrt().recip();
        for x in v.iter_mut() {
            *x *= inv_norm;
        }
    }
}

/// Attention-weighted mean over the token axis of one sequence.
///
/// `tokens` is laid out row-major as `[seq_len, hidden]`; padding rows carry a
/// mask of 0 and do not contribute.
pub(crate) fn mean_pool(tokens: &[f32], mask: &[i64], hidden: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; hidden];
    let mut weight = 0.0f32;

    for (row, &m) in tokens.chunks_exact(hidden).zip(mask.iter()) {
        if m == 0 {
            continue;
        }
        let m = m as f32;
        weight += m;
        for (acc, &val) in pooled.iter_mut().zip(row) {
            *acc += val * m;
        }
    }

    let denom = weight.max(1e-9);
    for val in &mut pooled {
        *val /= denom;
    }
    pooled
}
