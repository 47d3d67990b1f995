//! Synthetic roster generation for demos and local development.
//!
//! Students are drawn from three performance tiers. Each student gets a
//! target total from the tier's normal distribution, which is split across
//! subjects with Dirichlet weights (strong subjects get a boosted weight,
//! one weak subject a reduced one) and then nudged point by point until
//! the subject scores add up to the target again.

use std::collections::HashSet;

use rand::Rng;
use rand_distr::{Distribution, Gamma, Normal};

use crate::models::{NewStudent, Subject, SubjectScores};

const SURNAMES: &[&str] = &[
    "王", "李", "张", "刘", "陈", "杨", "赵", "黄", "周", "吴", "徐", "孙", "胡", "朱", "高", "林",
    "何", "郭", "马", "罗", "梁", "宋", "郑", "谢", "韩", "唐", "冯", "于", "董", "萧", "程", "曹",
    "袁", "邓", "许", "傅", "沈", "曾", "彭", "吕", "苏", "卢", "蒋", "蔡", "贾", "丁", "魏", "薛",
];

const GIVEN_CHARS: &[&str] = &[
    "子", "宇", "浩", "晨", "泽", "嘉", "俊", "博", "奕", "铭", "思", "雅", "欣", "雨", "诗", "依",
    "雪", "语", "文", "轩", "航", "宁", "清", "彦", "昊", "瑶", "可", "涵", "安", "辰", "悦", "彤",
    "远", "睿", "哲", "楠", "楷", "逸", "祺", "琪", "雯", "然", "霖", "妍", "珂", "宸", "凡", "阳",
];

/// Base Dirichlet concentration per subject, in catalog order.
const BASE_ALPHA: [f64; 6] = [3.3, 3.3, 3.1, 2.1, 1.9, 1.8];

pub const DEFAULT_COUNT: usize = 40;
pub const MIN_COUNT: usize = 10;
pub const MAX_COUNT: usize = 120;

#[derive(Debug)]
struct TierProfile {
    prob: f64,
    mean: f64,
    std_dev: f64,
    range: (i64, i64),
    mins: [i64; 6],
}

const TIERS: [TierProfile; 3] = [
    TierProfile {
        prob: 0.18,
        mean: 675.0,
        std_dev: 24.0,
        range: (620, 730),
        mins: [92, 90, 90, 58, 56, 56],
    },
    TierProfile {
        prob: 0.57,
        mean: 545.0,
        std_dev: 40.0,
        range: (470, 620),
        mins: [55, 52, 52, 32, 32, 30],
    },
    TierProfile {
        prob: 0.25,
        mean: 410.0,
        std_dev: 42.0,
        range: (300, 500),
        mins: [35, 30, 30, 18, 18, 18],
    },
];

pub fn clamp_count(count: usize) -> usize {
    count.clamp(MIN_COUNT, MAX_COUNT)
}

/// Draws `count` distinct names, falling back to `学生NN` once random
/// draws keep colliding.
pub fn generate_names<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<String> {
    let mut names = Vec::with_capacity(count);
    let mut used = HashSet::new();
    let max_attempts = count * 60;

    let mut attempts = 0;
    while names.len() < count && attempts < max_attempts {
        let given_len = if rng.random_bool(0.25) { 1 } else { 2 };
        let mut name = SURNAMES[rng.random_range(0..SURNAMES.len())].to_string();
        for _ in 0..given_len {
            name.push_str(GIVEN_CHARS[rng.random_range(0..GIVEN_CHARS.len())]);
        }
        if used.insert(name.clone()) {
            names.push(name);
        }
        attempts += 1;
    }

    let mut serial = names.len();
    while names.len() < count {
        serial += 1;
        let fallback = format!("学生{serial:02}");
        if used.insert(fallback.clone()) {
            names.push(fallback);
        }
    }

    names
}

pub fn generate_roster<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<NewStudent> {
    generate_names(rng, count)
        .into_iter()
        .map(|name| generate_student(rng, name))
        .collect()
}

pub fn generate_student<R: Rng + ?Sized>(rng: &mut R, name: String) -> NewStudent {
    let tier = sample_tier(rng);
    let (low, high) = tier.range;
    let drawn = Normal::new(tier.mean, tier.std_dev)
        .map(|normal| normal.sample(rng))
        .unwrap_or(tier.mean);
    let target = (drawn as i64).clamp(low, high);

    let maxs = Subject::ALL.map(|subject| subject.max_score() as i64);

    let mut alpha = BASE_ALPHA;
    let strengths = if rng.random_bool(0.42) { 2 } else { 1 };
    for idx in rand::seq::index::sample(rng, alpha.len(), strengths) {
        alpha[idx] += rng.random_range(0.8..1.7);
    }
    let weak = rng.random_range(0..alpha.len());
    alpha[weak] *= rng.random_range(0.72..0.92);

    let weights = dirichlet(rng, &alpha);
    let raw = weights.map(|weight| (target as f64 * weight) as i64);
    let balanced = rebalance(rng, raw, target, &tier.mins, &maxs);

    let mut noisy = balanced;
    for (idx, score) in noisy.iter_mut().enumerate() {
        *score = (*score + rng.random_range(-3..=3)).clamp(tier.mins[idx], maxs[idx]);
    }
    let scores = rebalance(rng, noisy, target, &tier.mins, &maxs);

    NewStudent {
        name,
        scores: SubjectScores::from_array(scores.map(|score| score as f64)),
    }
}

fn sample_tier<R: Rng + ?Sized>(rng: &mut R) -> &'static TierProfile {
    let p: f64 = rng.random();
    let mut cumulative = 0.0;
    for tier in &TIERS {
        cumulative += tier.prob;
        if p <= cumulative {
            return tier;
        }
    }
    &TIERS[TIERS.len() - 1]
}

fn dirichlet<R: Rng + ?Sized>(rng: &mut R, alpha: &[f64; 6]) -> [f64; 6] {
    let raw = alpha.map(|shape| {
        Gamma::new(shape, 1.0)
            .map(|gamma| gamma.sample(rng))
            .unwrap_or(1.0)
    });
    let sum: f64 = raw.iter().sum();
    if sum == 0.0 {
        return [1.0 / alpha.len() as f64; 6];
    }
    raw.map(|value| value / sum)
}

/// Clamps each score into `[mins[i], maxs[i]]`, then moves single points
/// between random subjects with headroom until the scores sum to `target`.
fn rebalance<R: Rng + ?Sized>(
    rng: &mut R,
    scores: [i64; 6],
    target: i64,
    mins: &[i64; 6],
    maxs: &[i64; 6],
) -> [i64; 6] {
    let mut adjusted = scores;
    for (idx, score) in adjusted.iter_mut().enumerate() {
        *score = (*score).clamp(mins[idx], maxs[idx]);
    }

    let mut diff = target - adjusted.iter().sum::<i64>();
    let mut guard = 0;
    while diff != 0 && guard < 10_000 {
        let candidates: Vec<usize> = (0..adjusted.len())
            .filter(|&idx| {
                if diff > 0 {
                    adjusted[idx] < maxs[idx]
                } else {
                    adjusted[idx] > mins[idx]
                }
            })
            .collect();
        if candidates.is_empty() {
            break;
        }
        let idx = candidates[rng.random_range(0..candidates.len())];
        let step = diff.signum();
        adjusted[idx] += step;
        diff -= step;
        guard += 1;
    }

    adjusted
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    #[test]
    fn names_are_unique() {
        let mut rng = Pcg64Mcg::seed_from_u64(7);
        let names = generate_names(&mut rng, MAX_COUNT);
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(names.len(), MAX_COUNT);
        assert_eq!(unique.len(), MAX_COUNT);
        assert!(names.iter().all(|name| !name.is_empty()));
    }

    #[test]
    fn rebalance_hits_target_within_bounds() {
        let mut rng = Pcg64Mcg::seed_from_u64(11);
        let mins = [35, 30, 30, 18, 18, 18];
        let maxs = [150, 150, 150, 100, 100, 100];
        let result = rebalance(&mut rng, [10, 200, 90, 60, 60, 60], 420, &mins, &maxs);
        assert_eq!(result.iter().sum::<i64>(), 420);
        for idx in 0..6 {
            assert!(mins[idx] <= result[idx] && result[idx] <= maxs[idx]);
        }
    }

    #[test]
    fn generated_students_are_valid_and_in_tier_range() {
        let mut rng = Pcg64Mcg::seed_from_u64(2024);
        for student in generate_roster(&mut rng, 200) {
            for subject in Subject::ALL {
                let score = student.scores.get(subject);
                assert!(subject.validate_score(score).is_ok(), "{subject}: {score}");
                assert_eq!(score.fract(), 0.0);
            }
            let total = student.scores.total();
            assert!((300.0..=730.0).contains(&total), "total {total}");
        }
    }

    #[test]
    fn same_seed_same_roster() {
        let first = generate_roster(&mut Pcg64Mcg::seed_from_u64(5), 20);
        let second = generate_roster(&mut Pcg64Mcg::seed_from_u64(5), 20);
        assert_eq!(first, second);
    }

    #[test]
    fn count_is_clamped() {
        assert_eq!(clamp_count(1), MIN_COUNT);
        assert_eq!(clamp_count(500), MAX_COUNT);
        assert_eq!(clamp_count(DEFAULT_COUNT), DEFAULT_COUNT);
    }
}
