//! 部分对齐相似度（partial ratio）
//!
//! 将较短串与较长串中所有等长窗口（以及首尾的截断窗口）逐一比较，
//! 取最高的 Indel 相似度，结果范围 0-100。按 Unicode 码点计算。

use std::collections::HashMap;

/// 短串长度 m、长串长度 n 时按 64 位字计的对齐工作量
///
/// 共约 n + m 个窗口，每个窗口逐字符推进 ⌈m/64⌉ 个字。
pub fn alignment_cost(a: &str, b: &str) -> u64 {
    let (m, n) = {
        let la = a.chars().count() as u64;
        let lb = b.chars().count() as u64;
        (la.min(lb), la.max(lb))
    };
    let words = m.div_ceil(64);
    (n + m).saturating_mul(m).saturating_mul(words)
}

pub fn partial_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    if long.contains(short) {
        return 100.0;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.len() == b.len() {
        return best_window(&a, &b).max(best_window(&b, &a));
    }
    if a.len() < b.len() {
        best_window(&a, &b)
    } else {
        best_window(&b, &a)
    }
}

/// needle 长度 m，遍历 haystack 的所有窗口：
/// 前缀 [0, k)（k < m）、完整窗口 [i, i+m)、后缀 [i, n)
fn best_window(needle: &[char], haystack: &[char]) -> f64 {
    let m = needle.len();
    let n = haystack.len();
    let masks = PatternMasks::new(needle);
    let mut scratch = Vec::with_capacity(masks.words);
    let mut best = 0.0f64;

    let mut consider = |window: &[char]| -> bool {
        let lcs = masks.lcs_len(window, &mut scratch);
        let score = 200.0 * lcs as f64 / (m + window.len()) as f64;
        if score > best {
            best = score;
        }
        best >= 100.0
    };

    for k in 1..m {
        if consider(&haystack[..k]) {
            return 100.0;
        }
    }
    for start in 0..=(n - m) {
        if consider(&haystack[start..start + m]) {
            return 100.0;
        }
    }
    for start in (n - m + 1)..n {
        if consider(&haystack[start..]) {
            return 100.0;
        }
    }

    best
}

/// 模式串的逐字符位掩码，用于位并行 LCS（Hyyrö）
struct PatternMasks {
    len: usize,
    words: usize,
    masks: HashMap<char, Vec<u64>>,
}

impl PatternMasks {
    fn new(pattern: &[char]) -> Self {
        let words = pattern.len().div_ceil(64);
        let mut masks: HashMap<char, Vec<u64>> = HashMap::new();
        for (i, &c) in pattern.iter().enumerate() {
            masks.entry(c).or_insert_with(|| vec![0; words])[i / 64] |= 1u64 << (i % 64);
        }
        Self {
            len: pattern.len(),
            words,
            masks,
        }
    }

    /// V' = (V + (V & PM[c])) | (V & !PM[c])，结束后 V 中 0 位的个数即 LCS 长度
    fn lcs_len(&self, text: &[char], v: &mut Vec<u64>) -> usize {
        v.clear();
        v.resize(self.words, u64::MAX);

        for c in text {
            let Some(pm) = self.masks.get(c) else {
                continue;
            };
            let mut carry = 0u64;
            for (word, &mask) in v.iter_mut().zip(pm) {
                let u = *word & mask;
                let (sum, c1) = word.overflowing_add(u);
                let (sum, c2) = sum.overflowing_add(carry);
                carry = u64::from(c1 || c2);
                *word = sum | (*word & !mask);
            }
        }

        let tail = self.len % 64;
        v.iter()
            .enumerate()
            .map(|(i, word)| {
                let valid = if i + 1 == self.words && tail != 0 {
                    (1u64 << tail) - 1
                } else {
                    u64::MAX
                };
                (!word & valid).count_ones() as usize
            })
            .sum()
    }
}
