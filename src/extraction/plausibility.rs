//! Predicates deciding whether a computed amount is a believable OCR fix
//! of the amount that was read.
//!
//! Each predicate compares the whole-unit decimal text of the two amounts.
//! They are combined with a logical OR by [`is_plausible_correction`].

use bigdecimal::BigDecimal;

/// Similarity ratio above which two amounts are considered the same figure
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Decimal text of the whole-unit part of an amount
pub fn integer_text(amount: &BigDecimal) -> String {
    let (digits, _) = amount.with_scale(0).into_bigint_and_exponent();
    digits.to_string()
}

/// Same text
pub fn is_identical(read: &str, candidate: &str) -> bool {
    read == candidate
}

/// The candidate is the read text minus stray leading or trailing digits
pub fn is_truncated_spillover(read: &str, candidate: &str) -> bool {
    read.len() > candidate.len() && (read.starts_with(candidate) || read.ends_with(candidate))
}

/// The two texts are close by matching-block similarity
pub fn is_similar(read: &str, candidate: &str, threshold: f64) -> bool {
    similarity_ratio(read, candidate) > threshold
}

/// Deleting exactly one character from the read text yields the candidate
pub fn is_single_digit_insertion(read: &str, candidate: &str) -> bool {
    let read: Vec<char> = read.chars().collect();
    let candidate: Vec<char> = candidate.chars().collect();
    if read.len() != candidate.len() + 1 {
        return false;
    }
    (0..read.len()).any(|skip| {
        read.iter()
            .enumerate()
            .filter(|(i, _)| *i != skip)
            .map(|(_, c)| c)
            .eq(candidate.iter())
    })
}

/// Whether `candidate` is a credible correction of the `read` amount
pub fn is_plausible_correction(read: &BigDecimal, candidate: &BigDecimal, threshold: f64) -> bool {
    let read = integer_text(read);
    let candidate = integer_text(candidate);

    is_identical(&read, &candidate)
        || is_truncated_spillover(&read, &candidate)
        || is_similar(&read, &candidate, threshold)
        || is_single_digit_insertion(&read, &candidate)
}

/// Ratcliff/Obershelp similarity: twice the number of characters in
/// matching blocks over the combined length. Two empty texts are identical.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = matching_characters(&a, &b, 0, a.len(), 0, b.len());
    2.0 * matched as f64 / total as f64
}

fn matching_characters(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> usize {
    let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
    if size == 0 {
        return 0;
    }
    size + matching_characters(a, b, alo, i, blo, j)
        + matching_characters(a, b, i + size, ahi, j + size, bhi)
}

/// Longest common block in `a[alo..ahi]` and `b[blo..bhi]`; ties go to the
/// block starting earliest in `a`, then earliest in `b`
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    let width = bhi.saturating_sub(blo);
    let mut previous = vec![0usize; width + 1];

    for i in alo..ahi {
        let mut current = vec![0usize; width + 1];
        for j in blo..bhi {
            if a[i] == b[j] {
                let k = previous[j - blo] + 1;
                current[j - blo + 1] = k;
                if k > best_size {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_size = k;
                }
            }
        }
        previous = current;
    }

    (best_i, best_j, best_size)
}
