// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Merge sort and k-way merge.

/// Sort ascending, in place. Stable.
pub fn merge_sort<T: Ord + Copy>(values: &mut [T]) {
    if values.len() < 2 {
        return;
    }
    let mut scratch = values.to_vec();
    sort_range(values, &mut scratch);
}

fn sort_range<T: Ord + Copy>(values: &mut [T], scratch: &mut [T]) {
    let n = values.len();
    if n < 2 {
        return;
    }
    let mid = n / 2;
    {
        let (left, right) = values.split_at_mut(mid);
        let (scratch_left, scratch_right) = scratch.split_at_mut(mid);
        sort_range(left, scratch_left);
        sort_range(right, scratch_right);
    }
    merge_halves(values, mid, scratch);
}

/// Merge the sorted runs `values[..mid]` and `values[mid..]`.
fn merge_halves<T: Ord + Copy>(values: &mut [T], mid: usize, scratch: &mut [T]) {
    let n = values.len();
    let (mut l, mut r, mut k) = (0, mid, 0);
    while l < mid && r < n {
        // Left wins ties.
        if values[r] < values[l] {
            scratch[k] = values[r];
            r += 1;
        } else {
            scratch[k] = values[l];
            l += 1;
        }
        k += 1;
    }
    let rest_left = mid - l;
    scratch[k..k + rest_left].copy_from_slice(&values[l..mid]);
    k += rest_left;
    scratch[k..n].copy_from_slice(&values[r..n]);
    values.copy_from_slice(&scratch[..n]);
}

/// Merge already-sorted inputs into one ascending sequence.
///
/// Each step takes the smallest current head across all inputs; on equal
/// heads the earlier input goes first.
pub fn merge_sorted<T: Ord + Copy>(inputs: &[Vec<T>]) -> Vec<T> {
    let total = inputs.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(total);
    let mut heads = vec![0usize; inputs.len()];

    while out.len() < total {
        let mut best: Option<(usize, T)> = None;
        for (i, input) in inputs.iter().enumerate() {
            let Some(&v) = input.get(heads[i]) else {
                continue;
            };
            match best {
                Some((_, b)) if b <= v => {}
                _ => best = Some((i, v)),
            }
        }
        let Some((i, v)) = best else {
            break;
        };
        out.push(v);
        heads[i] += 1;
    }
    out
}
